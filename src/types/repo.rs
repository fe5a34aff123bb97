//! Repositories with their ordered rules, git config and gitweb metadata.

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::ConfError;
use crate::traits::ConfEntity;
use crate::writer::{PERMISSION_COLUMN, REFEX_COLUMN, REPO_COLUMN, column};

use super::permission::{Permission, PermissionBlock};

/// A `repo` section.
///
/// Rules are stored as a list of [`PermissionBlock`]s: every deny rule opens
/// a new block, so the relative order of rules on either side of a deny
/// survives a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    name: String,
    permissions: Vec<PermissionBlock>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    config: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl Repo {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Repo {
            name: name.into(),
            permissions: vec![PermissionBlock::default()],
            config: IndexMap::new(),
            owner: None,
            description: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn permissions(&self) -> &[PermissionBlock] {
        &self.permissions
    }

    /// Add a rule given the level as written in a config, e.g. `"RW+"`.
    pub fn add_permission<I, S>(&mut self, permission: &str, refex: &str, users: I) -> Result<(), ConfError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let permission: Permission = permission.parse()?;
        self.add_rule(permission, refex, users);
        Ok(())
    }

    /// Add a rule to the last block, opening a new block first for deny rules.
    pub fn add_rule<I, S>(&mut self, permission: Permission, refex: &str, users: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self.permissions.last_mut() {
            Some(block) if !permission.is_deny() => block.add(permission, refex, users),
            _ => {
                let mut block = PermissionBlock::default();
                block.add(permission, refex, users);
                self.permissions.push(block);
            }
        }
    }

    /// Drop every rule, leaving a single empty block.
    pub fn clear_permissions(&mut self) {
        self.permissions = vec![PermissionBlock::default()];
    }

    /// Every rule as (block index, level, ref, users), in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = (usize, &Permission, &str, &[String])> {
        self.permissions
            .iter()
            .enumerate()
            .flat_map(|(idx, block)| {
                block
                    .iter()
                    .map(move |(permission, refex, users)| (idx, permission, refex, users))
            })
    }

    /// Set a git config option, returning the value it replaced.
    pub fn set_config<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> Option<String> {
        self.config.insert(key.into(), value.into())
    }

    /// Remove a git config option, returning its value.
    pub fn unset_config(&mut self, key: &str) -> Option<String> {
        self.config.shift_remove(key)
    }

    pub fn config(&self) -> &IndexMap<String, String> {
        &self.config
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn set_owner<S: Into<String>>(&mut self, owner: Option<S>) {
        self.owner = owner.map(Into::into);
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description<S: Into<String>>(&mut self, description: Option<S>) {
        self.description = description.map(Into::into);
    }

    /// The gitweb line for this repo, `None` unless a description is set.
    pub fn description_line(&self) -> Option<String> {
        let description = self.description.as_ref()?;
        Some(match &self.owner {
            Some(owner) => format!(r#"{} "{owner}" = "{description}""#, self.name),
            None => format!(r#"{} = "{description}""#, self.name),
        })
    }

    /// Fold `other` into this repo: its rules are replayed in order after the
    /// existing ones, its settings overwrite ours, and its metadata replaces
    /// ours where present.
    pub fn merge(&mut self, other: Repo) {
        for block in other.permissions {
            for (permission, refex, users) in block.iter() {
                self.add_rule(*permission, refex, users.iter().cloned());
            }
        }
        self.config.extend(other.config);
        if other.owner.is_some() {
            self.owner = other.owner;
        }
        if other.description.is_some() {
            self.description = other.description;
        }
    }
}

impl ConfEntity for Repo {
    fn conf_name(&self) -> &str {
        &self.name
    }

    fn write_conf(&self, out: &mut String) {
        out.push_str(&column("repo", REPO_COLUMN));
        out.push_str(&self.name);
        out.push('\n');

        // A rule without users cannot be parsed back, so it is not emitted.
        for (_, permission, refex, users) in self.rules().filter(|(.., users)| !users.is_empty()) {
            out.push_str("  ");
            out.push_str(&column(&permission.to_string(), PERMISSION_COLUMN));
            out.push_str(&column(refex, REFEX_COLUMN));
            out.push_str("= ");
            out.push_str(&users.iter().join(" "));
            out.push('\n');
        }

        for (key, value) in &self.config {
            out.push_str(&format!("  config {key} = {value}\n"));
        }
    }
}
