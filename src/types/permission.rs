//! Permission levels and deny-delimited rule blocks.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString};

use crate::error::ConfError;

/// Suffix marking a rule whose users may also push merge commits.
pub const MERGE_QUALIFIER: char = 'M';

/// The access levels a rule may grant, in their canonical spelling.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumString,
    StrumDisplay,
    AsRefStr,
    EnumIter,
)]
pub enum Access {
    #[strum(to_string = "-")]
    Deny,
    #[strum(to_string = "C")]
    Create,
    #[strum(to_string = "R")]
    Read,
    #[strum(to_string = "RW")]
    Write,
    #[strum(to_string = "RW+")]
    Rewind,
    #[strum(to_string = "RWC")]
    WriteCreate,
    #[strum(to_string = "RW+C")]
    RewindCreate,
    #[strum(to_string = "RWD")]
    WriteDelete,
    #[strum(to_string = "RW+D")]
    RewindDelete,
    #[strum(to_string = "RWCD")]
    WriteCreateDelete,
    #[strum(to_string = "RW+CD")]
    RewindCreateDelete,
}

/// A validated permission level, e.g. `RW+` or `RWCDM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Permission {
    access: Access,
    merge: bool,
}

impl Permission {
    pub fn new(access: Access, merge: bool) -> Self {
        Permission { access, merge }
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn allows_merge(&self) -> bool {
        self.merge
    }

    /// Deny rules start a new permission block.
    pub fn is_deny(&self) -> bool {
        self.access == Access::Deny
    }
}

impl From<Access> for Permission {
    fn from(access: Access) -> Self {
        Permission::new(access, false)
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.merge {
            write!(f, "{}{MERGE_QUALIFIER}", self.access)
        } else {
            write!(f, "{}", self.access)
        }
    }
}

impl FromStr for Permission {
    type Err = ConfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, merge) = match s.strip_suffix(MERGE_QUALIFIER) {
            Some(base) => (base, true),
            None => (s, false),
        };
        let access =
            Access::from_str(base).map_err(|_| ConfError::InvalidPermission(s.to_string()))?;
        if merge && access == Access::Deny {
            return Err(ConfError::InvalidPermission(s.to_string()));
        }
        Ok(Permission::new(access, merge))
    }
}

impl From<Permission> for String {
    fn from(p: Permission) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for Permission {
    type Error = ConfError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Rules between two deny rules: level → ref pattern → users.
///
/// Both map levels keep insertion order, since rules are evaluated first
/// match wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionBlock(IndexMap<Permission, IndexMap<String, Vec<String>>>);

impl PermissionBlock {
    /// Record `users` under (`permission`, `refex`), appending only tokens not
    /// already listed for that pair.
    pub fn add<I, S>(&mut self, permission: Permission, refex: &str, users: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self
            .0
            .entry(permission)
            .or_default()
            .entry(refex.to_string())
            .or_default();
        let merged = entry
            .drain(..)
            .chain(users.into_iter().map(Into::into))
            .unique()
            .collect();
        *entry = merged;
    }

    /// Users listed for one (level, ref) pair.
    pub fn users(&self, permission: Permission, refex: &str) -> Option<&[String]> {
        self.0
            .get(&permission)
            .and_then(|refs| refs.get(refex))
            .map(Vec::as_slice)
    }

    pub fn refexes(&self, permission: Permission) -> Option<&IndexMap<String, Vec<String>>> {
        self.0.get(&permission)
    }

    pub fn levels(&self) -> impl Iterator<Item = &Permission> {
        self.0.keys()
    }

    /// Number of distinct levels in the block.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Number of distinct (level, ref) pairs in the block.
    pub fn rule_count(&self) -> usize {
        self.0.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flattened (level, ref, users) triples in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&Permission, &str, &[String])> {
        self.0.iter().flat_map(|(permission, refs)| {
            refs.iter()
                .map(move |(refex, users)| (permission, refex.as_str(), users.as_slice()))
        })
    }
}
