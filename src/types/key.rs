//! Lookup keys accepted by the config accessors.
//!
//! Each accessor takes either a plain name or a reference to the entity
//! itself; these unions make that explicit instead of guessing at runtime.

use std::borrow::Cow;
use std::path::Path;

use super::group::{Group, strip_markers};
use super::repo::Repo;
use crate::traits::ConfEntity;
use crate::tree::{Config, ConfigId};

/// Identifies a repo by name or by value.
#[derive(Debug, Clone, Copy)]
pub enum RepoKey<'a> {
    Name(&'a str),
    Repo(&'a Repo),
}

/// Identifies a group by name (with or without the marker) or by value.
#[derive(Debug, Clone, Copy)]
pub enum GroupKey<'a> {
    Name(&'a str),
    Group(&'a Group),
}

/// Identifies an included config by its include path, a filesystem path,
/// a handle into the tree, or a detached config value.
#[derive(Debug, Clone, Copy)]
pub enum ConfigKey<'a> {
    Name(&'a str),
    Path(&'a Path),
    Id(ConfigId),
    Config(&'a Config),
}

/// The repo name a key refers to.
pub fn normalize_repo_name<'a>(key: impl Into<RepoKey<'a>>) -> &'a str {
    match key.into() {
        RepoKey::Name(name) => name,
        RepoKey::Repo(repo) => repo.conf_name(),
    }
}

/// The group name a key refers to, stripped of markers the way
/// [`Group::new`] strips them.
pub fn normalize_group_name<'a>(key: impl Into<GroupKey<'a>>) -> Cow<'a, str> {
    match key.into() {
        GroupKey::Name(name) => strip_markers(name),
        GroupKey::Group(group) => Cow::Borrowed(group.conf_name()),
    }
}

impl<'a> From<&'a str> for RepoKey<'a> {
    fn from(name: &'a str) -> Self {
        RepoKey::Name(name)
    }
}

impl<'a> From<&'a String> for RepoKey<'a> {
    fn from(name: &'a String) -> Self {
        RepoKey::Name(name)
    }
}

impl<'a> From<&'a Repo> for RepoKey<'a> {
    fn from(repo: &'a Repo) -> Self {
        RepoKey::Repo(repo)
    }
}

impl<'a> From<&'a str> for GroupKey<'a> {
    fn from(name: &'a str) -> Self {
        GroupKey::Name(name)
    }
}

impl<'a> From<&'a String> for GroupKey<'a> {
    fn from(name: &'a String) -> Self {
        GroupKey::Name(name)
    }
}

impl<'a> From<&'a Group> for GroupKey<'a> {
    fn from(group: &'a Group) -> Self {
        GroupKey::Group(group)
    }
}

impl<'a> From<&'a str> for ConfigKey<'a> {
    fn from(name: &'a str) -> Self {
        ConfigKey::Name(name)
    }
}

impl<'a> From<&'a String> for ConfigKey<'a> {
    fn from(name: &'a String) -> Self {
        ConfigKey::Name(name)
    }
}

impl<'a> From<&'a Path> for ConfigKey<'a> {
    fn from(path: &'a Path) -> Self {
        ConfigKey::Path(path)
    }
}

impl<'a> From<&'a std::path::PathBuf> for ConfigKey<'a> {
    fn from(path: &'a std::path::PathBuf) -> Self {
        ConfigKey::Path(path)
    }
}

impl From<ConfigId> for ConfigKey<'_> {
    fn from(id: ConfigId) -> Self {
        ConfigKey::Id(id)
    }
}

impl<'a> From<&'a Config> for ConfigKey<'a> {
    fn from(config: &'a Config) -> Self {
        ConfigKey::Config(config)
    }
}
