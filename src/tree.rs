//! The tree of config files joined by `include` directives.
//!
//! Configs live in an arena owned by [`ConfigTree`] and refer to each other
//! through [`ConfigId`] handles. The arena only ever holds a tree: every
//! operation that links a config under another checks the include chain
//! first and fails with [`ConfError::ConfigDependency`] instead of creating
//! a cycle.

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::{Index, IndexMut};
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::debug;

use crate::dependency::{self, IncludeNode};
use crate::error::ConfError;
use crate::types::{
    ConfigKey, Group, GroupKey, Repo, RepoKey, normalize_group_name, normalize_repo_name,
};

/// File name used for a config created without one.
pub const DEFAULT_FILENAME: &str = "gitolite.conf";

/// Handle of a config inside a [`ConfigTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigId(usize);

impl Display for ConfigId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "config #{}", self.0)
    }
}

/// The repos and groups declared in one file.
#[derive(Debug, Clone)]
pub struct Config {
    filename: String,
    repos: IndexMap<String, Repo>,
    groups: IndexMap<String, Group>,
    children: IndexMap<String, ConfigId>,
    parent: Option<ConfigId>,
    source: Option<PathBuf>,
}

impl Config {
    pub(crate) fn new<S: Into<String>>(filename: S) -> Self {
        Config {
            filename: filename.into(),
            repos: IndexMap::new(),
            groups: IndexMap::new(),
            children: IndexMap::new(),
            parent: None,
            source: None,
        }
    }

    pub(crate) fn with_source(mut self, source: PathBuf) -> Self {
        self.source = Some(source);
        self
    }

    /// Path of this file relative to the directory of the file including
    /// it (or, for the root, its bare file name).
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Rename the file. Renaming an included config does not re-key it in
    /// its parent; use [`ConfigTree::remove_subconf`] and
    /// [`ConfigTree::add_subconf`] for that.
    pub fn set_filename<S: Into<String>>(&mut self, filename: S) {
        self.filename = filename.into();
    }

    /// Canonical path the config was read from, if it was loaded from disk.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn parent(&self) -> Option<ConfigId> {
        self.parent
    }

    /// Included configs keyed by include path, in include order.
    pub fn children(&self) -> impl Iterator<Item = (&str, ConfigId)> {
        self.children.iter().map(|(key, id)| (key.as_str(), *id))
    }

    pub fn repos(&self) -> &IndexMap<String, Repo> {
        &self.repos
    }

    pub fn groups(&self) -> &IndexMap<String, Group> {
        &self.groups
    }

    pub fn get_repo<'k>(&self, key: impl Into<RepoKey<'k>>) -> Option<&Repo> {
        self.repos.get(normalize_repo_name(key))
    }

    pub fn get_repo_mut<'k>(&mut self, key: impl Into<RepoKey<'k>>) -> Option<&mut Repo> {
        self.repos.get_mut(normalize_repo_name(key))
    }

    pub fn has_repo<'k>(&self, key: impl Into<RepoKey<'k>>) -> bool {
        self.repos.contains_key(normalize_repo_name(key))
    }

    /// Add `repo`. An existing repo of the same name is replaced when
    /// `overwrite` is set and merged with `repo` otherwise.
    pub fn add_repo(&mut self, repo: Repo, overwrite: bool) -> &mut Repo {
        match self.repos.entry(repo.name().to_string()) {
            Entry::Occupied(mut entry) => {
                if overwrite {
                    entry.insert(repo);
                } else {
                    entry.get_mut().merge(repo);
                }
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(repo),
        }
    }

    /// The repo called `name`, created empty if it does not exist yet.
    pub fn repo_or_insert(&mut self, name: &str) -> &mut Repo {
        self.repos
            .entry(name.to_string())
            .or_insert_with(|| Repo::new(name))
    }

    pub fn remove_repo<'k>(&mut self, key: impl Into<RepoKey<'k>>) -> Option<Repo> {
        self.repos.shift_remove(normalize_repo_name(key))
    }

    pub fn get_group<'k>(&self, key: impl Into<GroupKey<'k>>) -> Option<&Group> {
        self.groups.get(&*normalize_group_name(key))
    }

    pub fn get_group_mut<'k>(&mut self, key: impl Into<GroupKey<'k>>) -> Option<&mut Group> {
        self.groups.get_mut(&*normalize_group_name(key))
    }

    pub fn has_group<'k>(&self, key: impl Into<GroupKey<'k>>) -> bool {
        self.groups.contains_key(&*normalize_group_name(key))
    }

    /// Add `group`, replacing any group of the same name.
    pub fn add_group(&mut self, group: Group) -> &mut Group {
        match self.groups.entry(group.name().to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(group);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(group),
        }
    }

    /// The group called `name` (marker optional), created empty if needed.
    pub fn group_or_insert(&mut self, name: &str) -> &mut Group {
        let group = Group::new(name);
        self.groups
            .entry(group.name().to_string())
            .or_insert(group)
    }

    pub fn remove_group<'k>(&mut self, key: impl Into<GroupKey<'k>>) -> Option<Group> {
        self.groups.shift_remove(&*normalize_group_name(key))
    }

    /// Groups ordered so no group is listed before a group it references.
    pub fn ordered_groups(&self) -> Result<Vec<&Group>, ConfError> {
        dependency::order_groups(&self.groups)
    }
}

/// A root config and every config it transitively includes.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    nodes: Vec<Option<Config>>,
    root: ConfigId,
    checkpoint: Option<Vec<(String, String)>>,
}

impl Default for ConfigTree {
    fn default() -> Self {
        ConfigTree::new(DEFAULT_FILENAME)
    }
}

impl Index<ConfigId> for ConfigTree {
    type Output = Config;

    fn index(&self, id: ConfigId) -> &Config {
        match self.get(id) {
            Some(config) => config,
            None => panic!("{id} is not part of this tree"),
        }
    }
}

impl IndexMut<ConfigId> for ConfigTree {
    fn index_mut(&mut self, id: ConfigId) -> &mut Config {
        match self.get_mut(id) {
            Some(config) => config,
            None => panic!("{id} is not part of this tree"),
        }
    }
}

impl ConfigTree {
    /// An empty tree whose root config is written as `filename`.
    pub fn new<S: Into<String>>(filename: S) -> Self {
        ConfigTree::from_root(Config::new(filename))
    }

    pub(crate) fn from_root(config: Config) -> Self {
        ConfigTree {
            nodes: vec![Some(config)],
            root: ConfigId(0),
            checkpoint: None,
        }
    }

    pub fn root(&self) -> ConfigId {
        self.root
    }

    pub fn root_config(&self) -> &Config {
        &self[self.root]
    }

    pub fn root_config_mut(&mut self) -> &mut Config {
        let root = self.root;
        &mut self[root]
    }

    pub fn set_root_filename<S: Into<String>>(&mut self, filename: S) {
        self.root_config_mut().filename = filename.into();
    }

    pub fn get(&self, id: ConfigId) -> Option<&Config> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ConfigId) -> Option<&mut Config> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub(crate) fn node(&self, id: ConfigId) -> Result<&Config, ConfError> {
        self.get(id)
            .ok_or_else(|| ConfError::InvalidArgument(format!("{id} is not part of this tree")))
    }

    pub fn contains(&self, id: ConfigId) -> bool {
        self.get(id).is_some()
    }

    pub fn parent(&self, id: ConfigId) -> Option<ConfigId> {
        self.get(id)?.parent
    }

    pub fn children(&self, id: ConfigId) -> impl Iterator<Item = ConfigId> + '_ {
        self.get(id)
            .into_iter()
            .flat_map(|config| config.children.values().copied())
    }

    /// `id` followed by its parent, grandparent and so on up to the root.
    pub fn ancestors(&self, id: ConfigId) -> Vec<ConfigId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).map(|_| id);
        while let Some(next) = current {
            chain.push(next);
            current = self.parent(next);
        }
        chain
    }

    /// Every config in the tree, depth first, parents before children.
    pub fn ids(&self) -> Vec<ConfigId> {
        self.subtree(self.root)
    }

    pub fn config_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    fn subtree(&self, id: ConfigId) -> Vec<ConfigId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(config) = self.get(next) {
                out.push(next);
                stack.extend(config.children.values().rev().copied());
            }
        }
        out
    }

    /// Path of `id` relative to the root file's directory.
    pub fn logical_path(&self, id: ConfigId) -> String {
        let mut path = PathBuf::new();
        for ancestor in self.ancestors(id).into_iter().rev() {
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            path = dir.join(&self[ancestor].filename);
        }
        lexical_key(&path)
    }

    pub(crate) fn dir_of(&self, id: ConfigId) -> PathBuf {
        Path::new(&self.logical_path(id))
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    pub(crate) fn include_chain(&self, parent: ConfigId) -> Vec<IncludeNode<'_>> {
        self.ancestors(parent)
            .into_iter()
            .map(|id| IncludeNode {
                logical: self.logical_path(id),
                source: self[id].source(),
            })
            .collect()
    }

    /// The include key `key` maps to under `parent`. Absolute paths inside
    /// the parent's directory on disk become relative to it.
    pub fn normalize_config_name<'k>(
        &self,
        parent: ConfigId,
        key: impl Into<ConfigKey<'k>>,
    ) -> Option<String> {
        match key.into() {
            ConfigKey::Name(name) => Some(self.relative_key(parent, Path::new(name))),
            ConfigKey::Path(path) => Some(self.relative_key(parent, path)),
            ConfigKey::Id(id) => self.get(id).map(|config| config.filename.clone()),
            ConfigKey::Config(config) => Some(config.filename.clone()),
        }
    }

    pub(crate) fn relative_key(&self, parent: ConfigId, path: &Path) -> String {
        let dir = self
            .get(parent)
            .and_then(Config::source)
            .and_then(Path::parent);
        let relative = match dir {
            Some(dir) if path.is_absolute() => path.strip_prefix(dir).unwrap_or(path),
            _ => path,
        };
        lexical_key(relative)
    }

    pub fn get_subconf<'k>(&self, parent: ConfigId, key: impl Into<ConfigKey<'k>>) -> Option<ConfigId> {
        let key = key.into();
        if let ConfigKey::Id(id) = key {
            return self.children(parent).find(|child| *child == id);
        }
        let name = self.normalize_config_name(parent, key)?;
        self.get(parent)?.children.get(&name).copied()
    }

    pub fn has_subconf<'k>(&self, parent: ConfigId, key: impl Into<ConfigKey<'k>>) -> bool {
        self.get_subconf(parent, key).is_some()
    }

    /// Create an empty config included from `parent` as `filename`.
    pub fn new_subconf<S: AsRef<str>>(&mut self, parent: ConfigId, filename: S) -> Result<ConfigId, ConfError> {
        self.node(parent)?;
        let key = self.relative_key(parent, Path::new(filename.as_ref()));
        self.check_free_key(parent, &key)?;

        let logical = lexical_key(&self.dir_of(parent).join(&key));
        dependency::check_include_chain(
            &self.include_chain(parent),
            &[IncludeNode { logical, source: None }],
        )?;

        Ok(self.attach(parent, Config::new(key)))
    }

    /// Graft a whole tree under `parent`, returning the handle of its root.
    pub fn add_subconf(&mut self, parent: ConfigId, mut sub: ConfigTree) -> Result<ConfigId, ConfError> {
        self.node(parent)?;
        let key = sub.root_config().filename.clone();
        self.check_free_key(parent, &key)?;

        let dir = self.dir_of(parent);
        let order = sub.ids();
        {
            let candidates: Vec<IncludeNode<'_>> = order
                .iter()
                .map(|id| IncludeNode {
                    logical: lexical_key(&dir.join(sub.logical_path(*id))),
                    source: sub[*id].source(),
                })
                .collect();
            dependency::check_include_chain(&self.include_chain(parent), &candidates)?;
        }

        let mut remap = HashMap::with_capacity(order.len());
        for old in &order {
            if let Some(config) = sub.nodes[old.0].take() {
                remap.insert(*old, ConfigId(self.nodes.len()));
                self.nodes.push(Some(config));
            }
        }
        for new in remap.values() {
            if let Some(config) = self.get_mut(*new) {
                config.parent = config.parent.and_then(|p| remap.get(&p).copied());
                for child in config.children.values_mut() {
                    if let Some(mapped) = remap.get(child) {
                        *child = *mapped;
                    }
                }
            }
        }

        let grafted = remap
            .get(&sub.root)
            .copied()
            .ok_or_else(|| ConfError::InvalidArgument("cannot add an empty tree".to_string()))?;
        self[grafted].parent = Some(parent);
        self[parent].children.insert(key, grafted);

        debug!(
            event = "Include",
            phase = "Graft",
            parent = %self[parent].filename,
            child = %self[grafted].filename,
            configs = order.len()
        );
        Ok(grafted)
    }

    /// Move `child` (and everything it includes) under `parent`.
    pub fn link_subconf(&mut self, parent: ConfigId, child: ConfigId) -> Result<(), ConfError> {
        self.node(parent)?;
        let key = self.node(child)?.filename.clone();

        if self.ancestors(parent).contains(&child) {
            return Err(ConfError::ConfigDependency(format!(
                "{} cannot include {}, which already includes it",
                self[parent].filename, key
            )));
        }
        match self[parent].children.get(&key) {
            Some(existing) if *existing == child => return Ok(()),
            Some(_) => self.check_free_key(parent, &key)?,
            None => {}
        }

        // Paths below `child` are relative to the directory it is included from.
        let dir = self.dir_of(parent);
        let base = self
            .parent(child)
            .map(|old| self.dir_of(old))
            .unwrap_or_default();
        {
            let candidates: Vec<IncludeNode<'_>> = self
                .subtree(child)
                .into_iter()
                .map(|id| {
                    let logical = self.logical_path(id);
                    let below = Path::new(&logical)
                        .strip_prefix(&base)
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|_| PathBuf::from(&logical));
                    IncludeNode {
                        logical: lexical_key(&dir.join(below)),
                        source: self[id].source(),
                    }
                })
                .collect();
            dependency::check_include_chain(&self.include_chain(parent), &candidates)?;
        }

        if let Some(old) = self[child].parent {
            self.detach(old, child);
        }
        self[child].parent = Some(parent);
        self[parent].children.insert(key, child);
        Ok(())
    }

    /// Detach the config `key` from `parent` and return it, with everything
    /// it includes, as a tree of its own.
    pub fn remove_subconf<'k>(&mut self, parent: ConfigId, key: impl Into<ConfigKey<'k>>) -> Option<ConfigTree> {
        let child = self.get_subconf(parent, key)?;
        self.detach(parent, child);

        let order = self.subtree(child);
        let mut remap = HashMap::with_capacity(order.len());
        let mut nodes = Vec::with_capacity(order.len());
        for old in &order {
            remap.insert(*old, ConfigId(nodes.len()));
            nodes.push(self.nodes[old.0].take());
        }
        for config in nodes.iter_mut().flatten() {
            config.parent = config.parent.and_then(|p| remap.get(&p).copied());
            for id in config.children.values_mut() {
                if let Some(mapped) = remap.get(id) {
                    *id = *mapped;
                }
            }
        }

        Some(ConfigTree {
            nodes,
            root: ConfigId(0),
            checkpoint: None,
        })
    }

    /// Drop `child` from `parent`'s includes, whatever key it is listed
    /// under. A renamed config keeps the key it was included with.
    fn detach(&mut self, parent: ConfigId, child: ConfigId) {
        if let Some(config) = self.get_mut(parent) {
            config.children.retain(|_, id| *id != child);
        }
    }

    fn check_free_key(&self, parent: ConfigId, key: &str) -> Result<(), ConfError> {
        if self.node(parent)?.children.contains_key(key) {
            return Err(ConfError::InvalidArgument(format!(
                "{} already includes {key}",
                self[parent].filename
            )));
        }
        Ok(())
    }

    pub(crate) fn attach(&mut self, parent: ConfigId, mut config: Config) -> ConfigId {
        let id = ConfigId(self.nodes.len());
        config.parent = Some(parent);
        let key = config.filename.clone();
        self.nodes.push(Some(config));
        self[parent].children.insert(key, id);
        id
    }

    /// Record the current state as saved.
    pub fn mark_clean(&mut self) {
        self.checkpoint = Some(self.fingerprint());
    }

    /// Whether anything changed since the last [`ConfigTree::mark_clean`],
    /// load or write. A tree that was never saved is dirty.
    pub fn is_dirty(&self) -> bool {
        match &self.checkpoint {
            Some(saved) => *saved != self.fingerprint(),
            None => true,
        }
    }

    fn fingerprint(&self) -> Vec<(String, String)> {
        self.ids()
            .into_iter()
            .map(|id| (self.logical_path(id), self.render_unordered(id)))
            .collect()
    }
}

/// Lexically normalize a relative path into an include key: `.` parts are
/// dropped, `..` cancels the preceding part, separators become `/`.
pub(crate) fn lexical_key(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => match parts.last() {
                Some(last) if last != ".." => {
                    parts.pop();
                }
                _ => parts.push("..".to_string()),
            },
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    let key = parts.join("/");
    if path.has_root() { format!("/{key}") } else { key }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn tree_with_child() -> (ConfigTree, ConfigId) {
        let mut tree = ConfigTree::new("test_deptree.conf");
        let child = tree.new_subconf(tree.root(), "subconf1.conf").unwrap();
        (tree, child)
    }

    #[parameterized(
        plain = { "bar.conf", "bar.conf" },
        current_dir = { "./bar.conf", "bar.conf" },
        nested = { "sub/./bar.conf", "sub/bar.conf" },
        parent_cancels = { "sub/../bar.conf", "bar.conf" },
        leading_parent = { "../bar.conf", "../bar.conf" },
        absolute = { "/etc/bar.conf", "/etc/bar.conf" },
    )]
    fn test_lexical_key(input: &str, expected: &str) {
        assert_eq!(lexical_key(Path::new(input)), expected);
    }

    #[test]
    fn test_default_tree() {
        let tree = ConfigTree::default();
        assert_eq!(tree.root_config().filename(), DEFAULT_FILENAME);
        assert!(tree.root_config().repos().is_empty());
        assert!(tree.root_config().groups().is_empty());
        assert_eq!(tree.config_count(), 1);
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn test_repo_management() {
        let mut tree = ConfigTree::default();
        let config = tree.root_config_mut();
        config.add_repo(Repo::new("cool_repo"), false);
        assert!(config.has_repo("cool_repo"));
        assert!(!config.has_repo("glite"));

        let repo = config.get_repo("cool_repo").cloned().unwrap();
        assert!(config.has_repo(&repo));

        let removed = config.remove_repo(&repo).unwrap();
        assert_eq!(removed.name(), "cool_repo");
        assert!(config.get_repo("cool_repo").is_none());
    }

    #[test]
    fn test_add_repo_merges_or_overwrites() {
        let mut config = Config::new("gitolite.conf");

        let mut repo1 = Repo::new("cool_repo");
        repo1.add_permission("RW+", "", ["bob", "joe", "sam"]).unwrap();
        let mut repo2 = Repo::new("cool_repo");
        repo2.add_permission("RW+", "", ["jim", "cynthia"]).unwrap();
        let mut repo3 = Repo::new("cool_repo");
        repo3.add_permission("R", "", ["daniel"]).unwrap();

        config.add_repo(repo1, false);
        config.add_repo(repo2, false);
        let rules: Vec<_> = config.get_repo("cool_repo").unwrap().rules().collect();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].3, ["bob", "joe", "sam", "jim", "cynthia"]);

        config.add_repo(repo3, true);
        let rules: Vec<_> = config.get_repo("cool_repo").unwrap().rules().collect();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].1.to_string(), "R");
        assert_eq!(config.repos().len(), 1);
    }

    #[test]
    fn test_group_management() {
        let mut config = Config::new("gitolite.conf");
        config.group_or_insert("@staff").add_users(["bob", "joe"]);
        assert!(config.has_group("staff"));
        assert!(config.has_group("@staff"));
        assert!(config.has_group(&Group::new("staff")));
        assert_eq!(config.get_group("staff").unwrap().len(), 2);

        config.add_group(Group::new("cool_group"));
        assert_eq!(config.groups().len(), 2);

        let removed = config.remove_group("@staff").unwrap();
        assert_eq!(removed.name(), "staff");
        assert!(!config.has_group("staff"));
    }

    #[test]
    fn test_group_lookup_strips_inner_markers() {
        let mut config = Config::new("gitolite.conf");
        config.group_or_insert("te@st").add_user("bob");
        assert_eq!(config.groups().keys().collect::<Vec<_>>(), vec!["test"]);

        assert!(config.has_group("te@st"));
        assert!(config.get_group("@te@st").unwrap().has_user("bob"));
        assert!(config.get_group_mut("te@st").is_some());
        assert!(config.remove_group("te@st").is_some());
    }

    #[test]
    fn test_new_subconf_links_parent() {
        let (tree, child) = tree_with_child();
        assert_eq!(tree.parent(child), Some(tree.root()));
        assert!(tree.has_subconf(tree.root(), "subconf1.conf"));
        assert!(tree.has_subconf(tree.root(), child));
        assert!(tree.has_subconf(tree.root(), &tree[child]));
        assert!(!tree.has_subconf(tree.root(), "none"));
        assert_eq!(tree.ids(), vec![tree.root(), child]);
    }

    #[test]
    fn test_new_subconf_rejects_duplicate_key() {
        let (mut tree, _) = tree_with_child();
        let err = tree.new_subconf(tree.root(), "./subconf1.conf").unwrap_err();
        assert!(matches!(err, ConfError::InvalidArgument(_)));
    }

    #[test]
    fn test_new_subconf_rejects_self_include() {
        let mut tree = ConfigTree::new("gitolite.conf");
        let err = tree.new_subconf(tree.root(), "gitolite.conf").unwrap_err();
        assert!(matches!(err, ConfError::ConfigDependency(_)));
    }

    #[test]
    fn test_link_ancestor_is_a_dependency_error() {
        let (mut tree, child) = tree_with_child();
        let root = tree.root();
        let err = tree.link_subconf(child, root).unwrap_err();
        assert!(matches!(err, ConfError::ConfigDependency(_)));

        let err = tree.link_subconf(child, child).unwrap_err();
        assert!(matches!(err, ConfError::ConfigDependency(_)));
    }

    #[test]
    fn test_link_moves_subtree() {
        let mut tree = ConfigTree::new("gitolite.conf");
        let root = tree.root();
        let a = tree.new_subconf(root, "a.conf").unwrap();
        let b = tree.new_subconf(root, "b.conf").unwrap();

        tree.link_subconf(a, b).unwrap();
        assert_eq!(tree.parent(b), Some(a));
        assert!(!tree.has_subconf(root, "b.conf"));
        assert!(tree.has_subconf(a, "b.conf"));
        assert_eq!(tree.ids(), vec![root, a, b]);
    }

    #[test]
    fn test_link_renamed_child_leaves_old_parent() {
        let mut tree = ConfigTree::new("gitolite.conf");
        let root = tree.root();
        let a = tree.new_subconf(root, "a.conf").unwrap();
        let b = tree.new_subconf(root, "b.conf").unwrap();
        tree[b].set_filename("renamed.conf");

        tree.link_subconf(a, b).unwrap();
        assert_eq!(tree.ids(), vec![root, a, b]);
        assert_eq!(tree.children(root).collect::<Vec<_>>(), vec![a]);
        assert!(tree.has_subconf(a, "renamed.conf"));
        assert_eq!(tree.parent(b), Some(a));
    }

    #[test]
    fn test_remove_renamed_child() {
        let mut tree = ConfigTree::new("gitolite.conf");
        let root = tree.root();
        let b = tree.new_subconf(root, "b.conf").unwrap();
        tree[b].set_filename("renamed.conf");

        let removed = tree.remove_subconf(root, b).unwrap();
        assert_eq!(removed.root_config().filename(), "renamed.conf");
        assert_eq!(tree.root_config().children().count(), 0);
        assert_eq!(tree.to_text(root).unwrap(), "");
    }

    #[test]
    fn test_add_subconf_grafts_tree() {
        let mut tree = ConfigTree::new("gitolite.conf");
        let mut sub = ConfigTree::new("cool_config");
        let nested = sub.new_subconf(sub.root(), "nested.conf").unwrap();
        sub[nested].add_group(Group::new("groupa"));

        let grafted = tree.add_subconf(tree.root(), sub).unwrap();
        assert!(tree.has_subconf(tree.root(), "cool_config"));
        assert_eq!(tree.config_count(), 3);

        let nested = tree.get_subconf(grafted, "nested.conf").unwrap();
        assert_eq!(tree.parent(nested), Some(grafted));
        assert!(tree[nested].has_group("groupa"));
    }

    #[test]
    fn test_add_subconf_rejects_cycle() {
        let (mut tree, child) = tree_with_child();
        let err = tree
            .add_subconf(child, ConfigTree::new("test_deptree.conf"))
            .unwrap_err();
        assert!(matches!(err, ConfError::ConfigDependency(_)));
    }

    #[test]
    fn test_remove_subconf_detaches_subtree() {
        let mut tree = ConfigTree::new("gitolite.conf");
        let root = tree.root();
        let bar = tree.new_subconf(root, "bar.conf").unwrap();
        let baz = tree.new_subconf(bar, "baz.conf").unwrap();
        tree[baz].add_group(Group::new("deep"));

        let removed = tree.remove_subconf(root, "bar.conf").unwrap();
        assert!(!tree.has_subconf(root, "bar.conf"));
        assert!(!tree.contains(bar));
        assert!(!tree.contains(baz));
        assert_eq!(tree.config_count(), 1);

        assert_eq!(removed.root_config().filename(), "bar.conf");
        assert_eq!(removed.parent(removed.root()), None);
        let baz = removed.get_subconf(removed.root(), "baz.conf").unwrap();
        assert!(removed[baz].has_group("deep"));
    }

    #[test]
    fn test_logical_paths() {
        let mut tree = ConfigTree::new("gitolite.conf");
        let sub = tree.new_subconf(tree.root(), "sub/a.conf").unwrap();
        let nested = tree.new_subconf(sub, "b.conf").unwrap();
        assert_eq!(tree.logical_path(tree.root()), "gitolite.conf");
        assert_eq!(tree.logical_path(sub), "sub/a.conf");
        assert_eq!(tree.logical_path(nested), "sub/b.conf");
    }

    #[test]
    fn test_dirty_tracking() {
        let mut tree = ConfigTree::default();
        assert!(tree.is_dirty());
        tree.mark_clean();
        assert!(!tree.is_dirty());

        tree.root_config_mut()
            .repo_or_insert("foo")
            .add_permission("RW+", "", ["bob"])
            .unwrap();
        assert!(tree.is_dirty());
        tree.mark_clean();

        tree.root_config_mut()
            .get_repo_mut("foo")
            .unwrap()
            .add_permission("RW+", "", ["bob"])
            .unwrap();
        assert!(!tree.is_dirty());
    }

    #[test]
    fn test_stale_handle() {
        let mut tree = ConfigTree::new("gitolite.conf");
        let bar = tree.new_subconf(tree.root(), "bar.conf").unwrap();
        tree.remove_subconf(tree.root(), bar).unwrap();
        assert!(tree.get(bar).is_none());
        assert!(matches!(
            tree.new_subconf(bar, "x.conf"),
            Err(ConfError::InvalidArgument(_))
        ));
    }
}
