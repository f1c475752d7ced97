//! Lens trait and line-oriented text mapping
//!
//! A lens is a bidirectional grammar: it parses one line of a file into a
//! node and renders a node back into a line. Line splitting, line endings and
//! the final newline are handled here, once, for every line-oriented lens.

use keys_fs::NormalizedPath;

use crate::error::{Error, Result};
use crate::node::Node;

/// A bidirectional mapping between lines of text and tree nodes.
pub trait Lens: Send + Sync {
    /// Grammar identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Parse one line (without its terminator) into a node.
    ///
    /// Returns a human-readable message when the line does not conform.
    fn parse_line(&self, line: &str) -> std::result::Result<Node, String>;

    /// Render a node canonically as one line (without terminator).
    fn render_line(&self, node: &Node) -> Result<String>;
}

/// Formatting facts about a file that are not carried by any node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLayout {
    /// Lines are terminated by `\r\n`, judged from the first line
    pub crlf: bool,
    /// The last line is followed by a terminator
    pub trailing_newline: bool,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            crlf: false,
            trailing_newline: true,
        }
    }
}

/// Parse a whole file into one node per line.
pub fn parse_text(
    lens: &dyn Lens,
    path: &NormalizedPath,
    text: &str,
) -> Result<(Vec<Node>, TextLayout)> {
    if text.is_empty() {
        return Ok((Vec::new(), TextLayout::default()));
    }

    let body = text.strip_suffix('\n').unwrap_or(text);
    let layout = TextLayout {
        crlf: body.split('\n').next().is_some_and(|l| l.ends_with('\r')),
        trailing_newline: text.ends_with('\n'),
    };

    let mut nodes = Vec::new();
    for (idx, raw) in body.split('\n').enumerate() {
        let content = raw.strip_suffix('\r').unwrap_or(raw);
        let node = lens
            .parse_line(content)
            .map_err(|message| Error::ParseError {
                path: path.clone(),
                line: idx + 1,
                message,
            })?;
        nodes.push(node.with_origin(raw));
    }
    Ok((nodes, layout))
}

/// Render line nodes back into file text.
///
/// Nodes that still carry their origin are emitted verbatim; edited or new
/// nodes are rendered by the lens using the file's line ending.
pub fn render_text(lens: &dyn Lens, nodes: &[Node], layout: TextLayout) -> Result<String> {
    let mut lines = Vec::with_capacity(nodes.len());
    for node in nodes {
        let line = match node.origin() {
            Some(origin) => origin.to_string(),
            None if layout.crlf => format!("{}\r", lens.render_line(node)?),
            None => lens.render_line(node)?,
        };
        lines.push(line);
    }

    let mut text = lines.join("\n");
    if layout.trailing_newline && !nodes.is_empty() {
        text.push('\n');
    }
    Ok(text)
}
