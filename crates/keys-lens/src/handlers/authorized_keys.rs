//! Lens for OpenSSH `authorized_keys` files
//!
//! Each line maps to one node:
//!
//! ```text
//! no-pty,from="10.0.0.1" ssh-ed25519 AAAAC3Nz... bob@host
//!
//! key = "AAAAC3Nz..."
//!   options
//!     no-pty
//!     from = "10.0.0.1"
//!   type = "ssh-ed25519"
//!   comment = "bob@host"
//! ```
//!
//! Blank lines become `#empty` nodes and `#` lines become `#comment` nodes so
//! that unmanaged content survives a rewrite.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::lens::Lens;
use crate::node::Node;

/// Node labels produced by [`AuthorizedKeysLens`].
pub mod labels {
    pub const KEY: &str = "key";
    pub const OPTIONS: &str = "options";
    pub const TYPE: &str = "type";
    pub const COMMENT: &str = "comment";
    pub const LINE_COMMENT: &str = "#comment";
    pub const EMPTY: &str = "#empty";
}

/// Recognised public key algorithms, including certificate variants
static KEY_TYPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:ssh-[a-z0-9]+|ecdsa-sha2-[a-z0-9]+|sk-(?:ssh-ed25519|ecdsa-sha2-nistp256))(?:-cert-v01)?(?:@openssh\.com)?$",
    )
    .unwrap()
});

/// Whether `token` names a public key algorithm.
pub fn is_key_type(token: &str) -> bool {
    KEY_TYPE_PATTERN.is_match(token)
}

/// The `authorized_keys` grammar.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthorizedKeysLens;

impl Lens for AuthorizedKeysLens {
    fn name(&self) -> &'static str {
        "authorized_keys"
    }

    fn parse_line(&self, line: &str) -> std::result::Result<Node, String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Node::new(labels::EMPTY));
        }
        if let Some(comment) = trimmed.strip_prefix('#') {
            return Ok(Node::with_value(labels::LINE_COMMENT, comment.trim()));
        }
        parse_entry(trimmed)
    }

    fn render_line(&self, node: &Node) -> Result<String> {
        match node.label() {
            labels::EMPTY => Ok(String::new()),
            labels::LINE_COMMENT => Ok(match node.value() {
                Some(text) if !text.is_empty() => format!("# {text}"),
                _ => "#".to_string(),
            }),
            labels::KEY => render_entry(node),
            other => Err(Error::invalid_node(format!(
                "no authorized_keys rendering for '{other}' nodes"
            ))),
        }
    }
}

/// Byte cursor over one trimmed line.
struct Cursor<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn skip_whitespace(&mut self) {
        let rest = &self.line[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Next whitespace-delimited token.
    fn token(&mut self) -> &'a str {
        self.skip_whitespace();
        let rest = &self.line[self.pos..];
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// The leading options-or-type token. Whitespace inside double quotes
    /// does not end it, and `\"` inside quotes is a literal quote.
    fn options_token(&mut self) -> std::result::Result<&'a str, String> {
        self.skip_whitespace();
        let start = self.pos;
        let mut quoted = false;
        let mut prev = None;
        for (offset, c) in self.line[start..].char_indices() {
            match c {
                '"' if quoted && prev == Some('\\') => {}
                '"' => quoted = !quoted,
                c if c.is_whitespace() && !quoted => {
                    self.pos = start + offset;
                    return Ok(&self.line[start..self.pos]);
                }
                _ => {}
            }
            prev = Some(c);
        }
        if quoted {
            return Err("unterminated quote in options".to_string());
        }
        self.pos = self.line.len();
        Ok(&self.line[start..])
    }

    fn rest(&mut self) -> &'a str {
        self.skip_whitespace();
        let rest = &self.line[self.pos..];
        self.pos = self.line.len();
        rest.trim_end()
    }
}

fn parse_entry(line: &str) -> std::result::Result<Node, String> {
    let mut cursor = Cursor { line, pos: 0 };

    let first = cursor.options_token()?;
    let (options, key_type) = if is_key_type(first) {
        (None, first)
    } else {
        let options = parse_options(first)?;
        let key_type = cursor.token();
        if key_type.is_empty() {
            return Err("missing key type".to_string());
        }
        if !is_key_type(key_type) {
            return Err(format!("unrecognised key type '{key_type}'"));
        }
        (Some(options), key_type)
    };

    let key = cursor.token();
    if key.is_empty() {
        return Err("missing key material".to_string());
    }
    let comment = cursor.rest();

    let mut node = Node::with_value(labels::KEY, key);
    if let Some(options) = options {
        node.push_child(options);
    }
    node.push_child(Node::with_value(labels::TYPE, key_type));
    if !comment.is_empty() {
        node.push_child(Node::with_value(labels::COMMENT, comment));
    }
    Ok(node)
}

/// Split `a,b="x,y",c` into option nodes.
fn parse_options(text: &str) -> std::result::Result<Node, String> {
    let mut options = Node::new(labels::OPTIONS);
    let mut current = String::new();
    let mut quoted = false;
    let mut prev = None;

    for c in text.chars() {
        match c {
            '"' if quoted && prev == Some('\\') => current.push(c),
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => {
                options.push_child(parse_option(&current)?);
                current.clear();
            }
            _ => current.push(c),
        }
        prev = Some(c);
    }
    if quoted {
        return Err("unterminated quote in options".to_string());
    }
    options.push_child(parse_option(&current)?);
    Ok(options)
}

fn parse_option(text: &str) -> std::result::Result<Node, String> {
    let (label, value) = match text.split_once('=') {
        Some((label, value)) => (label, Some(unquote(value))),
        None => (text, None),
    };
    if label.is_empty() {
        return Err(format!("empty option name in '{text}'"));
    }
    Ok(match value {
        Some(value) => Node::with_value(label, value),
        None => Node::new(label),
    })
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };
    inner.replace("\\\"", "\"")
}

fn render_entry(node: &Node) -> Result<String> {
    let key = node
        .value()
        .ok_or_else(|| Error::invalid_node("key entry has no key material"))?;
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(Error::invalid_node(format!("unwritable key material '{key}'")));
    }
    let key_type = node
        .child_value(labels::TYPE)
        .ok_or_else(|| Error::invalid_node(format!("key entry '{key}' has no type")))?;

    let mut line = String::new();
    if let Some(options) = node.child(labels::OPTIONS)
        && !options.children().is_empty()
    {
        line.push_str(&render_options(options)?);
        line.push(' ');
    }
    line.push_str(key_type);
    line.push(' ');
    line.push_str(key);
    if let Some(comment) = node.child_value(labels::COMMENT)
        && !comment.is_empty()
    {
        line.push(' ');
        line.push_str(comment);
    }
    Ok(line)
}

fn render_options(options: &Node) -> Result<String> {
    let mut rendered = Vec::with_capacity(options.children().len());
    for option in options.children() {
        let label = option.label();
        if label.is_empty()
            || label.contains(|c: char| c.is_whitespace() || matches!(c, ',' | '=' | '"'))
            || is_key_type(label)
        {
            return Err(Error::invalid_node(format!("invalid option name '{label}'")));
        }
        // A trailing backslash would escape the closing quote
        if let Some(value) = option.value()
            && (value.ends_with('\\') || value.contains(['\n', '\r']))
        {
            return Err(Error::invalid_node(format!(
                "unwritable value for option '{label}'"
            )));
        }
        rendered.push(match option.value() {
            Some(value) => format!("{label}=\"{}\"", value.replace('"', "\\\"")),
            None => label.to_string(),
        });
    }
    Ok(rendered.join(","))
}
