//! Reading config files into a [`ConfigTree`].

pub mod directive;
pub mod line;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::dependency::{self, IncludeNode};
use crate::error::ConfError;
use crate::tree::{Config, ConfigId, ConfigTree, DEFAULT_FILENAME, lexical_key};
use crate::types::{Permission, is_group_token};

use self::directive::{Directive, classify};
use self::line::normalize;

/// Knobs for [`ConfigTree::load_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    max_include_depth: Option<usize>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail once includes nest deeper than `depth` levels below the root.
    /// Include cycles are always detected; this only bounds legitimate
    /// nesting.
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = Some(depth);
        self
    }

    pub fn max_include_depth(&self) -> Option<usize> {
        self.max_include_depth
    }
}

impl ConfigTree {
    /// Read `path` and every file it includes.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfError> {
        Self::load_with(path, &LoadOptions::default())
    }

    pub fn load_with<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Self, ConfError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ConfError::InvalidArgument(format!("{} does not name a file", path.display()))
            })?;
        let source = path.canonicalize().map_err(|err| ConfError::io(path, err))?;
        let text = fs::read_to_string(&source).map_err(|err| ConfError::io(path, err))?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let root = Config::new(filename).with_source(source);
        let tree = Parser::new(options, root).run(&text, &dir)?;

        info!(
            event = "Load",
            phase = "Complete",
            file = path.display().to_string(),
            configs = tree.config_count()
        );
        Ok(tree)
    }

    /// Parse `text` as the root file. Includes resolve against the current
    /// working directory.
    ///
    /// Example:
    /// ```rust
    /// use gitolite_conf::ConfigTree;
    /// let tree = ConfigTree::parse("repo foo\n  RW+ = bob\n").unwrap();
    /// let repo = tree.root_config().get_repo("foo").unwrap();
    /// assert_eq!(repo.rules().count(), 1);
    /// ```
    pub fn parse(text: &str) -> Result<Self, ConfError> {
        Parser::new(&LoadOptions::default(), Config::new(DEFAULT_FILENAME)).run(text, Path::new("."))
    }
}

/// Builds a fresh tree; nothing is handed out unless every file parses.
struct Parser<'o> {
    options: &'o LoadOptions,
    tree: ConfigTree,
}

impl<'o> Parser<'o> {
    fn new(options: &'o LoadOptions, root: Config) -> Self {
        Parser {
            options,
            tree: ConfigTree::from_root(root),
        }
    }

    fn run(mut self, text: &str, dir: &Path) -> Result<ConfigTree, ConfError> {
        let root = self.tree.root();
        self.parse_text(root, text, dir)?;
        self.tree.mark_clean();
        Ok(self.tree)
    }

    /// Parse one file's text into the config `id`. Repo context is local to
    /// the file.
    fn parse_text(&mut self, id: ConfigId, text: &str, dir: &Path) -> Result<(), ConfError> {
        let file = self.tree.logical_path(id);
        debug!(event = "Parse", phase = "Start", file = file.as_str());

        let mut context: Vec<String> = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = normalize(raw);
            if line.is_empty() {
                continue;
            }

            let directive = classify(&line).ok_or_else(|| {
                ConfError::parse(&file, line_no, format!("unrecognized line '{raw}'"))
            })?;

            match directive {
                Directive::Repo(names) => {
                    let config = &mut self.tree[id];
                    for name in &names {
                        config.repo_or_insert(name);
                    }
                    context = names.into_iter().map(str::to_string).collect();
                }
                Directive::Rule { .. } | Directive::Setting { .. } if context.is_empty() => {
                    warn!(
                        event = "Parse",
                        phase = "Context",
                        file = file.as_str(),
                        line = line_no,
                        kind = directive.kind().as_ref(),
                        "ignored outside of a repo section"
                    );
                }
                Directive::Rule { level, refex, users } => {
                    let permission: Permission = level.parse()?;
                    let config = &mut self.tree[id];
                    for name in &context {
                        config
                            .repo_or_insert(name)
                            .add_rule(permission, refex, users.iter().copied());
                    }
                }
                Directive::Setting { key, value } => {
                    let config = &mut self.tree[id];
                    for name in &context {
                        config.repo_or_insert(name).set_config(key, value);
                    }
                }
                Directive::Group { name, members } => {
                    self.tree[id].group_or_insert(name).add_users(members);
                }
                Directive::Description { name, owner, description } => {
                    if is_group_token(name) {
                        return Err(ConfError::parse(
                            &file,
                            line_no,
                            format!("cannot describe group {name}"),
                        ));
                    }
                    let repo = self.tree[id].repo_or_insert(name);
                    if owner.is_some() {
                        repo.set_owner(owner);
                    }
                    repo.set_description(Some(description));
                }
                Directive::Include(target) => {
                    self.include(id, dir, target, &file, line_no)?;
                }
            }
        }

        debug!(
            event = "Parse",
            phase = "Finish",
            file = file.as_str(),
            repos = self.tree[id].repos().len(),
            groups = self.tree[id].groups().len()
        );
        Ok(())
    }

    fn include(
        &mut self,
        parent: ConfigId,
        dir: &Path,
        target: &str,
        file: &str,
        line: usize,
    ) -> Result<(), ConfError> {
        let resolved = dir.join(target);
        if !resolved.is_file() {
            return Err(ConfError::parse(
                file,
                line,
                format!("included file {target} does not exist"),
            ));
        }
        let source = resolved
            .canonicalize()
            .map_err(|err| ConfError::io(&resolved, err))?;

        let key = self.tree.relative_key(parent, Path::new(target));
        if self.tree[parent].children().any(|(existing, _)| existing == key) {
            warn!(
                event = "Parse",
                phase = "Include",
                file = file,
                line = line,
                include = key.as_str(),
                "already included, skipping"
            );
            return Ok(());
        }

        // 1. The target must not already be open further up the chain.
        let candidate = IncludeNode {
            logical: lexical_key(&self.tree.dir_of(parent).join(&key)),
            source: Some(source.as_path()),
        };
        dependency::check_include_chain(&self.tree.include_chain(parent), std::slice::from_ref(&candidate))
            .map_err(|err| ConfError::parse(file, line, format!("recursive include: {err}")))?;

        // 2. Nesting is bounded only when asked for.
        let depth = self.tree.ancestors(parent).len();
        if let Some(max) = self.options.max_include_depth {
            if depth > max {
                return Err(ConfError::parse(
                    file,
                    line,
                    format!("include of {target} nests deeper than {max} levels"),
                ));
            }
        }

        // 3. Parse the child with its own directory as include base.
        let text = fs::read_to_string(&source).map_err(|err| ConfError::io(&resolved, err))?;
        let child_dir: PathBuf = resolved.parent().map(Path::to_path_buf).unwrap_or_default();
        let child = self.tree.attach(parent, Config::new(key).with_source(source));

        debug!(
            event = "Parse",
            phase = "Include",
            file = file,
            include = self.tree[child].filename(),
            depth = depth
        );
        self.parse_text(child, &text, &child_dir)
    }
}
