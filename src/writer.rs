//! Canonical text rendering and writing a tree back to disk.

use std::fs;
use std::path::{Component, Path, PathBuf};

use itertools::Itertools;
use tracing::{debug, info};

use crate::error::ConfError;
use crate::traits::ConfEntity;
use crate::tree::{Config, ConfigId, ConfigTree};
use crate::types::{Group, Repo};

/// Width of `@name` before the `=` of a group line.
pub const GROUP_COLUMN: usize = 20;
/// Width of the `repo` keyword in a repo header.
pub const REPO_COLUMN: usize = 8;
/// Width of the access level in a rule line.
pub const PERMISSION_COLUMN: usize = 7;
/// Width of the ref pattern in a rule line.
pub const REFEX_COLUMN: usize = 25;
/// Width of the `include` keyword.
pub const INCLUDE_COLUMN: usize = 11;

/// Left-align `text` in a column of `width`, always leaving one space.
pub(crate) fn column(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.chars().count()).max(1);
    format!("{text}{}", " ".repeat(pad))
}

/// Knobs for [`ConfigTree::write_to_directory`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    create_dirs: bool,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create missing directories for included files instead of failing.
    pub fn with_create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }

    pub fn create_dirs(&self) -> bool {
        self.create_dirs
    }
}

impl ConfigTree {
    /// Render the config `id` as it would be written to its file.
    ///
    /// Fails with [`ConfError::GroupDependency`] when the config's groups
    /// reference each other in a cycle.
    pub fn to_text(&self, id: ConfigId) -> Result<String, ConfError> {
        let config = self.node(id)?;
        let groups = config.ordered_groups()?;
        Ok(render(config, groups))
    }

    /// Render with groups in declaration order. Never fails, so it can back
    /// change tracking even while groups are cyclic.
    pub(crate) fn render_unordered(&self, id: ConfigId) -> String {
        self.get(id)
            .map(|config| render(config, config.groups().values().collect()))
            .unwrap_or_default()
    }

    /// Write every config of the tree below `dir`, the root as
    /// `dir/<filename>` and each included config at its path relative to
    /// the root's directory. Returns the written paths, parents first.
    ///
    /// Everything is rendered before the first file is written, so a group
    /// cycle in any config leaves the directory untouched. A config with an
    /// absolute path, or one whose path climbs above `dir` through `..`, is
    /// refused with [`ConfError::InvalidArgument`] the same way.
    pub fn write_to_directory<P: AsRef<Path>>(
        &mut self,
        dir: P,
        options: &WriteOptions,
    ) -> Result<Vec<PathBuf>, ConfError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ConfError::InvalidArgument(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut rendered = Vec::new();
        for id in self.ids() {
            let filename = self[id].filename();
            let logical = self.logical_path(id);
            if Path::new(filename).is_absolute() || escapes(Path::new(&logical)) {
                return Err(ConfError::InvalidArgument(format!(
                    "cannot write {filename} outside of {}",
                    dir.display()
                )));
            }
            rendered.push((dir.join(logical), self.to_text(id)?));
        }

        let mut written = Vec::with_capacity(rendered.len());
        for (path, text) in rendered {
            if let Some(parent) = path.parent() {
                if !parent.is_dir() {
                    if !options.create_dirs {
                        return Err(ConfError::InvalidArgument(format!(
                            "{} does not exist",
                            parent.display()
                        )));
                    }
                    fs::create_dir_all(parent).map_err(|err| ConfError::io(parent, err))?;
                }
            }
            fs::write(&path, text).map_err(|err| ConfError::io(&path, err))?;
            debug!(
                event = "Write",
                phase = "File",
                path = path.display().to_string()
            );
            written.push(path);
        }

        self.mark_clean();
        info!(
            event = "Write",
            phase = "Complete",
            dir = dir.display().to_string(),
            files = written.len()
        );
        Ok(written)
    }
}

fn escapes(path: &Path) -> bool {
    matches!(path.components().next(), Some(Component::ParentDir))
}

fn render(config: &Config, groups: Vec<&Group>) -> String {
    let mut sections: Vec<String> = Vec::with_capacity(4);

    if !groups.is_empty() {
        let mut out = String::new();
        for group in groups {
            group.write_conf(&mut out);
        }
        sections.push(out);
    }

    if !config.repos().is_empty() {
        sections.push(config.repos().values().map(ConfEntity::to_conf).join("\n"));
    }

    let descriptions: String = config
        .repos()
        .values()
        .filter_map(Repo::description_line)
        .map(|line| line + "\n")
        .collect();
    if !descriptions.is_empty() {
        sections.push(descriptions);
    }

    let includes: String = config
        .children()
        .map(|(key, _)| format!("{}\"{key}\"\n", column("include", INCLUDE_COLUMN)))
        .collect();
    if !includes.is_empty() {
        sections.push(includes);
    }

    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        short = { "repo", 8, "repo    " },
        exact = { "abcdefg", 7, "abcdefg " },
        overflow = { "RW+CDM", 3, "RW+CDM " },
        empty = { "", 4, "    " },
    )]
    fn test_column(text: &str, width: usize, expected: &str) {
        assert_eq!(column(text, width), expected);
    }

    #[test]
    fn test_empty_config_renders_empty() {
        let tree = ConfigTree::default();
        assert_eq!(tree.to_text(tree.root()).unwrap(), "");
    }

    #[test]
    fn test_groups_render_after_dependencies() {
        let mut tree = ConfigTree::default();
        let config = tree.root_config_mut();
        config.group_or_insert("staff").add_users(["@admins", "bob"]);
        config.group_or_insert("admins").add_users(["sam", "joe"]);

        insta::assert_snapshot!(tree.to_text(tree.root()).unwrap(), @r"
        @admins             = joe sam
        @staff              = @admins bob
        ");
    }

    #[test]
    fn test_group_cycle_fails_only_on_render() {
        let mut tree = ConfigTree::default();
        let config = tree.root_config_mut();
        config.group_or_insert("a").add_user("@b");
        config.group_or_insert("b").add_user("@a");

        assert!(matches!(
            tree.to_text(tree.root()),
            Err(ConfError::GroupDependency(_))
        ));
        assert!(!tree.render_unordered(tree.root()).is_empty());
    }

    #[test]
    fn test_full_layout() {
        let mut tree = ConfigTree::default();
        let root = tree.root();
        tree.new_subconf(root, "sub/bar.conf").unwrap();

        let config = tree.root_config_mut();
        config.group_or_insert("staff").add_users(["bob", "joe"]);
        let foo = config.repo_or_insert("foo");
        foo.add_permission("RW+", "", ["@staff"]).unwrap();
        foo.add_permission("-", "refs/tags/v[0-9]", ["joe"]).unwrap();
        foo.add_permission("RW", "refs/tags/", ["joe"]).unwrap();
        foo.set_config("hooks.mailinglist", "dev@example.com");
        let gitolite = config.repo_or_insert("gitolite");
        gitolite.add_permission("R", "", ["@all"]).unwrap();
        gitolite.set_owner(Some("Sitaram Chamarty"));
        gitolite.set_description(Some("fast, secure, access control"));

        insta::assert_snapshot!(tree.to_text(root).unwrap(), @r#"
        @staff              = bob joe

        repo    foo
          RW+                             = @staff
          -      refs/tags/v[0-9]         = joe
          RW     refs/tags/               = joe
          config hooks.mailinglist = dev@example.com

        repo    gitolite
          R                               = @all

        gitolite "Sitaram Chamarty" = "fast, secure, access control"

        include    "sub/bar.conf"
        "#);
    }

    #[test]
    fn test_write_options_builder() {
        assert!(!WriteOptions::new().create_dirs());
        assert!(WriteOptions::new().with_create_dirs(true).create_dirs());
    }

    #[test]
    fn test_write_rejects_missing_directory() {
        let mut tree = ConfigTree::default();
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        assert!(matches!(
            tree.write_to_directory(&missing, &WriteOptions::default()),
            Err(ConfError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_write_creates_dirs_only_when_asked() {
        let mut tree = ConfigTree::default();
        let root = tree.root();
        let sub = tree.new_subconf(root, "sub/bar.conf").unwrap();
        tree[sub].group_or_insert("nested").add_user("bob");

        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            tree.write_to_directory(tmp.path(), &WriteOptions::default()),
            Err(ConfError::InvalidArgument(_))
        ));

        let written = tree
            .write_to_directory(tmp.path(), &WriteOptions::new().with_create_dirs(true))
            .unwrap();
        assert_eq!(
            written,
            vec![
                tmp.path().join("gitolite.conf"),
                tmp.path().join("sub/bar.conf")
            ]
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join("sub/bar.conf")).unwrap(),
            "@nested             = bob\n"
        );
        assert!(!tree.is_dirty());
    }

    #[test]
    fn test_write_rejects_absolute_child() {
        let mut tree = ConfigTree::default();
        let root = tree.root();
        tree.new_subconf(root, "/etc/gitolite/other.conf").unwrap();

        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            tree.write_to_directory(tmp.path(), &WriteOptions::default()),
            Err(ConfError::InvalidArgument(_))
        ));
        assert!(!tmp.path().join("gitolite.conf").exists());
    }

    #[test]
    fn test_write_rejects_escaping_child() {
        let mut tree = ConfigTree::default();
        let root = tree.root();
        tree.new_subconf(root, "../x.conf").unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("conf");
        fs::create_dir(&dir).unwrap();
        assert!(matches!(
            tree.write_to_directory(&dir, &WriteOptions::default()),
            Err(ConfError::InvalidArgument(_))
        ));
        assert!(!dir.join("gitolite.conf").exists());
        assert!(!tmp.path().join("x.conf").exists());
    }

    #[test]
    fn test_write_allows_parent_dir_inside_root() {
        let mut tree = ConfigTree::default();
        let root = tree.root();
        let sub = tree.new_subconf(root, "sub/a.conf").unwrap();
        tree.new_subconf(sub, "../b.conf").unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let options = WriteOptions::new().with_create_dirs(true);
        let written = tree.write_to_directory(tmp.path(), &options).unwrap();
        assert_eq!(written.last(), Some(&tmp.path().join("b.conf")));

        let deeper = tree.new_subconf(sub, "../../c.conf").unwrap();
        assert_eq!(tree.logical_path(deeper), "../c.conf");
        assert!(matches!(
            tree.write_to_directory(tmp.path(), &options),
            Err(ConfError::InvalidArgument(_))
        ));
    }
}
