//! Structured tree paths
//!
//! Paths address nodes in a [`Tree`](crate::Tree). They are built from typed
//! segments rather than interpolated strings, so a label or predicate value
//! containing `/`, `]` or `"` can never change the shape of the path.
//!
//! # Text form
//!
//! - `/files/home/alice/.ssh/authorized_keys` - labels separated by `/`
//! - `/files/home/*/.ssh/authorized_keys` - `*` matches any child
//! - `.../key[2]` - the second child labelled `key` (1-based)
//! - `.../key[comment="bob@host"]` - children labelled `key` whose `comment`
//!   child has the given value
//!
//! Labels that are empty, equal to `*`, or contain whitespace or any of
//! `/ [ ] " \ =` are written double-quoted with `\` escapes.
//!
//! ```
//! use keys_lens::TreePath;
//!
//! let path = TreePath::root()
//!     .label("files")
//!     .any()
//!     .where_child("key", "comment", "a/b");
//! assert_eq!(path.to_string(), r#"/files/*/key[comment="a/b"]"#);
//! assert_eq!(TreePath::parse(&path.to_string()).unwrap(), path);
//! ```

use std::fmt;
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

use keys_fs::NormalizedPath;

use crate::error::{Error, Result};

/// Label of the subtree that holds every loaded file.
pub const FILES_LABEL: &str = "files";

/// One step of a [`TreePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Every child with this label
    Label(String),
    /// Every child
    Any,
    /// The `position`-th child (1-based) with this label
    Nth { label: String, position: usize },
    /// Every child with this label whose `child` has exactly `value`
    Where {
        label: String,
        child: String,
        value: String,
    },
}

impl Segment {
    /// The label this segment requires, if any.
    pub fn required_label(&self) -> Option<&str> {
        match self {
            Self::Label(label) | Self::Nth { label, .. } | Self::Where { label, .. } => Some(label),
            Self::Any => None,
        }
    }

    /// Whether this segment names exactly one node by position or label.
    pub fn is_concrete(&self) -> bool {
        matches!(self, Self::Label(_) | Self::Nth { .. })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write_label(f, label),
            Self::Any => f.write_str("*"),
            Self::Nth { label, position } => {
                write_label(f, label)?;
                write!(f, "[{position}]")
            }
            Self::Where {
                label,
                child,
                value,
            } => {
                write_label(f, label)?;
                f.write_str("[")?;
                write_label(f, child)?;
                f.write_str("=")?;
                write_quoted(f, value)?;
                f.write_str("]")
            }
        }
    }
}

/// An absolute path into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TreePath {
    segments: Vec<Segment>,
}

impl TreePath {
    /// The root of the tree, `/`.
    pub fn root() -> Self {
        Self::default()
    }

    /// The `/files` subtree.
    pub fn files() -> Self {
        Self::root().label(FILES_LABEL)
    }

    /// The node holding a loaded file: `/files` plus one label per component.
    pub fn for_file(path: &NormalizedPath) -> Self {
        path.components()
            .fold(Self::files(), |tree_path, component| tree_path.label(component))
    }

    pub fn push(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn label(self, label: impl Into<String>) -> Self {
        self.push(Segment::Label(label.into()))
    }

    pub fn any(self) -> Self {
        self.push(Segment::Any)
    }

    pub fn nth(self, label: impl Into<String>, position: usize) -> Self {
        self.push(Segment::Nth {
            label: label.into(),
            position,
        })
    }

    pub fn where_child(
        self,
        label: impl Into<String>,
        child: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.push(Segment::Where {
            label: label.into(),
            child: child.into(),
            value: value.into(),
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    /// Whether every segment names a single node.
    pub fn is_concrete(&self) -> bool {
        self.segments.iter().all(Segment::is_concrete)
    }

    pub fn starts_with(&self, prefix: &TreePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// The segments following `prefix`, if `prefix` is a prefix of this path.
    pub fn strip_prefix(&self, prefix: &TreePath) -> Option<Self> {
        self.segments
            .strip_prefix(prefix.segments.as_slice())
            .map(|rest| Self {
                segments: rest.to_vec(),
            })
    }

    /// Parse the textual form described in the module docs.
    pub fn parse(text: &str) -> Result<Self> {
        PathParser::new(text).parse()
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for TreePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn is_special(c: char) -> bool {
    c.is_whitespace() || matches!(c, '/' | '[' | ']' | '"' | '\\' | '=')
}

fn needs_quotes(label: &str) -> bool {
    label.is_empty() || label == "*" || label.chars().any(is_special)
}

fn write_label(f: &mut fmt::Formatter<'_>, label: &str) -> fmt::Result {
    if needs_quotes(label) {
        write_quoted(f, label)
    } else {
        f.write_str(label)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in text.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str("\"")
}

struct PathParser<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> PathParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().peekable(),
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::invalid_path(self.text, message)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn expect(&mut self, wanted: char) -> Result<()> {
        match self.chars.next() {
            Some((_, c)) if c == wanted => Ok(()),
            Some((at, c)) => Err(self.error(format!("expected '{wanted}' at {at}, found '{c}'"))),
            None => Err(self.error(format!("expected '{wanted}', found end of path"))),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.chars.next();
        }
    }

    fn parse(mut self) -> Result<TreePath> {
        self.expect('/')?;
        let mut path = TreePath::root();
        if self.peek().is_none() {
            return Ok(path);
        }
        loop {
            path = path.push(self.segment()?);
            match self.chars.next() {
                None => return Ok(path),
                Some((_, '/')) => {}
                Some((at, c)) => {
                    return Err(self.error(format!("unexpected '{c}' at {at}")));
                }
            }
        }
    }

    fn segment(&mut self) -> Result<Segment> {
        if self.peek() == Some('*') {
            self.chars.next();
            return Ok(Segment::Any);
        }
        let label = self.label()?;
        if self.peek() != Some('[') {
            return Ok(Segment::Label(label));
        }
        self.chars.next();
        self.skip_whitespace();

        let quoted = self.peek() == Some('"');
        let first = self.label()?;
        self.skip_whitespace();
        let segment = match self.peek() {
            Some(']') => {
                let position = first
                    .parse::<usize>()
                    .ok()
                    .filter(|p| !quoted && *p > 0)
                    .ok_or_else(|| self.error(format!("invalid position '{first}'")))?;
                Segment::Nth { label, position }
            }
            Some('=') => {
                self.chars.next();
                self.skip_whitespace();
                let value = self.label()?;
                self.skip_whitespace();
                Segment::Where {
                    label,
                    child: first,
                    value,
                }
            }
            _ => return Err(self.error("unterminated predicate")),
        };
        self.expect(']')?;
        Ok(segment)
    }

    fn label(&mut self) -> Result<String> {
        if self.peek() == Some('"') {
            return self.quoted();
        }
        let mut label = String::new();
        while let Some(c) = self.peek() {
            if is_special(c) {
                break;
            }
            label.push(c);
            self.chars.next();
        }
        if label.is_empty() {
            return Err(self.error("empty label"));
        }
        Ok(label)
    }

    fn quoted(&mut self) -> Result<String> {
        self.expect('"')?;
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(text),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, c)) => text.push(c),
                    None => break,
                },
                Some((_, c)) => text.push(c),
                None => break,
            }
        }
        Err(self.error("unterminated quote"))
    }
}
