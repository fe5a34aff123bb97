//! User groups (`@name = member ...`).

use std::borrow::Cow;
use std::collections::BTreeSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::traits::ConfEntity;
use crate::writer::{GROUP_COLUMN, column};

/// Prefix distinguishing group names from user names.
pub const GROUP_MARKER: char = '@';

/// True when `token` names a group rather than a user.
pub fn is_group_token(token: &str) -> bool {
    token.starts_with(GROUP_MARKER)
}

/// `name` with every marker character removed.
pub(crate) fn strip_markers(name: &str) -> Cow<'_, str> {
    if name.contains(GROUP_MARKER) {
        Cow::Owned(name.replace(GROUP_MARKER, ""))
    } else {
        Cow::Borrowed(name)
    }
}

/// A named set of users and nested group references.
///
/// Members are kept sorted and unique, so the rendered line does not depend
/// on the order users were added in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    name: String,
    members: BTreeSet<String>,
}

impl Group {
    /// Create an empty group. Any marker characters are dropped from `name`.
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        Group {
            name: strip_markers(name.as_ref()).into_owned(),
            members: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name as written in the config, e.g. `@staff`.
    pub fn marked_name(&self) -> String {
        format!("{GROUP_MARKER}{}", self.name)
    }

    pub fn add_user<S: Into<String>>(&mut self, user: S) -> bool {
        self.members.insert(user.into())
    }

    pub fn add_users<I, S>(&mut self, users: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members.extend(users.into_iter().map(Into::into));
    }

    pub fn remove_user(&mut self, user: &str) -> bool {
        self.members.remove(user)
    }

    pub fn has_user(&self, user: &str) -> bool {
        self.members.contains(user)
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in ascending order.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    /// Names (without marker) of the groups listed as members.
    pub fn group_refs(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .filter_map(|m| m.strip_prefix(GROUP_MARKER))
    }
}

impl ConfEntity for Group {
    fn conf_name(&self) -> &str {
        &self.name
    }

    fn write_conf(&self, out: &mut String) {
        out.push_str(&column(&self.marked_name(), GROUP_COLUMN));
        out.push_str("= ");
        out.push_str(&self.members().join(" "));
        out.push('\n');
    }
}
