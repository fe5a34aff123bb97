//! Recognition of normalized config lines.
//!
//! Lines are matched against a fixed table of patterns in priority order and
//! the first match wins, so e.g. `config x = "y"` is a setting and never a
//! description.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumIter};

/// The kinds of line a config file may contain, in matching priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, StrumDisplay, EnumIter)]
pub enum DirectiveKind {
    Repo,
    Rule,
    Setting,
    Group,
    Description,
    Include,
}

impl DirectiveKind {
    fn pattern(self) -> &'static str {
        match self {
            DirectiveKind::Repo => r"^repo (.+)$",
            DirectiveKind::Rule => r"^(-|CM?|RM?|RW\+?(?:C?D?|D?C?)M?) (.* )?= (.+)$",
            DirectiveKind::Setting => r"^config (.+?) = ?(.*)$",
            DirectiveKind::Group => r"^@(\S+) = ?(.*)$",
            DirectiveKind::Description => r#"^(\S+)(?: "(.*?)")? = "(.*)"$"#,
            DirectiveKind::Include => r#"^(?:include|subconf) "(.+)"$"#,
        }
    }
}

static DIRECTIVES: Lazy<Vec<(DirectiveKind, Regex)>> = Lazy::new(|| {
    use strum::IntoEnumIterator;
    DirectiveKind::iter()
        .map(|kind| {
            let regex = Regex::new(kind.pattern()).expect("directive patterns are valid regexes");
            (kind, regex)
        })
        .collect()
});

/// A classified line, borrowing from the normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    Repo(Vec<&'a str>),
    Rule {
        level: &'a str,
        refex: &'a str,
        users: Vec<&'a str>,
    },
    Setting {
        key: &'a str,
        value: &'a str,
    },
    Group {
        name: &'a str,
        members: Vec<&'a str>,
    },
    Description {
        name: &'a str,
        owner: Option<&'a str>,
        description: &'a str,
    },
    Include(&'a str),
}

impl Directive<'_> {
    pub fn kind(&self) -> DirectiveKind {
        match self {
            Directive::Repo(_) => DirectiveKind::Repo,
            Directive::Rule { .. } => DirectiveKind::Rule,
            Directive::Setting { .. } => DirectiveKind::Setting,
            Directive::Group { .. } => DirectiveKind::Group,
            Directive::Description { .. } => DirectiveKind::Description,
            Directive::Include(_) => DirectiveKind::Include,
        }
    }
}

/// Classify a normalized line, `None` when no pattern matches.
pub fn classify(line: &str) -> Option<Directive<'_>> {
    DIRECTIVES.iter().find_map(|(kind, regex)| {
        let caps = regex.captures(line)?;
        Some(build(*kind, &caps))
    })
}

fn group<'a>(caps: &Captures<'a>, idx: usize) -> &'a str {
    caps.get(idx).map_or("", |m| m.as_str())
}

fn build<'a>(kind: DirectiveKind, caps: &Captures<'a>) -> Directive<'a> {
    match kind {
        DirectiveKind::Repo => Directive::Repo(group(caps, 1).split_whitespace().collect()),
        DirectiveKind::Rule => Directive::Rule {
            level: group(caps, 1),
            refex: group(caps, 2).trim(),
            users: group(caps, 3).split_whitespace().collect(),
        },
        DirectiveKind::Setting => Directive::Setting {
            key: group(caps, 1),
            value: group(caps, 2),
        },
        DirectiveKind::Group => Directive::Group {
            name: group(caps, 1),
            members: group(caps, 2).split_whitespace().collect(),
        },
        DirectiveKind::Description => Directive::Description {
            name: group(caps, 1),
            owner: caps.get(2).map(|m| m.as_str()),
            description: group(caps, 3),
        },
        DirectiveKind::Include => Directive::Include(group(caps, 1)),
    }
}
