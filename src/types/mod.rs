//! Data model for one config file: repos, groups and their rules.
//!
//! Canonical line forms:
//! - Group: `@name = member member ...` (members sorted, `@other` for nesting)
//! - Repo: `repo name` followed by `  LEVEL [refex] = user ...` rules and
//!   `  config key = value` settings
//! - Gitweb: `name ["owner"] = "description"`

mod group;
mod key;
mod permission;
mod repo;

pub use group::{GROUP_MARKER, Group, is_group_token};
pub use key::{ConfigKey, GroupKey, RepoKey, normalize_group_name, normalize_repo_name};
pub use permission::{Access, MERGE_QUALIFIER, Permission, PermissionBlock};
pub use repo::Repo;
