// src/lib.rs
pub use error::ConfError;
pub use parser::LoadOptions;
pub use parser::directive::{Directive, DirectiveKind, classify};
pub use parser::line::normalize;
pub use traits::ConfEntity;
pub use tree::{Config, ConfigId, ConfigTree, DEFAULT_FILENAME};
pub use types::{
    Access, ConfigKey, GROUP_MARKER, Group, GroupKey, MERGE_QUALIFIER, Permission, PermissionBlock,
    Repo, RepoKey, is_group_token, normalize_group_name, normalize_repo_name,
};
pub use writer::WriteOptions;

mod dependency;
mod error;
mod parser;
mod traits;
mod tree;
mod types;
mod writer;

#[cfg(test)]
mod tests;
