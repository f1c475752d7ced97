//! The addressable tree and detached subtrees
//!
//! A [`Tree`] holds every loaded file under `/files`, one node per path
//! component, with the lens's line nodes beneath each file node. Edits go
//! through path-addressed operations:
//!
//! - [`Tree::match_paths`] resolves a pattern to concrete paths in document order
//! - [`Tree::move_into`] places a [`Subtree`] built off to the side
//! - [`Tree::remove`] deletes matching nodes
//!
//! Entries are never assembled in place. A [`Subtree`] is populated while
//! detached and only becomes visible once moved, so a failed build leaves the
//! tree untouched.

use std::collections::BTreeMap;
use std::fmt;

use keys_fs::NormalizedPath;
use tracing::debug;

use crate::error::{Error, Result};
use crate::lens::{Lens, TextLayout, parse_text, render_text};
use crate::node::Node;
use crate::path::{FILES_LABEL, Segment, TreePath};

/// Bookkeeping for one loaded file.
#[derive(Debug, Clone)]
struct LoadedFile {
    tree_path: TreePath,
    original: Option<String>,
    layout: TextLayout,
}

/// Index path from the root to a node.
type Position = Vec<usize>;

/// Parsed files addressable by [`TreePath`].
pub struct Tree {
    root: Node,
    lens: Box<dyn Lens>,
    files: BTreeMap<NormalizedPath, LoadedFile>,
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("lens", &self.lens.name())
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Tree {
    /// An empty tree using `lens` for every file.
    pub fn new(lens: impl Lens + 'static) -> Self {
        Self {
            root: Node::new("").with_child(Node::new(FILES_LABEL)),
            lens: Box::new(lens),
            files: BTreeMap::new(),
        }
    }

    /// Parse `text` as the content of `path` and mount it under `/files`.
    ///
    /// `None` mounts an empty skeleton for a file that does not exist yet.
    /// Loading the same path again replaces the earlier content.
    pub fn add_file(&mut self, path: &NormalizedPath, text: Option<&str>) -> Result<TreePath> {
        let (lines, layout) = match text {
            Some(text) => parse_text(self.lens.as_ref(), path, text)?,
            None => (Vec::new(), TextLayout::default()),
        };
        debug!(
            path = %path,
            lens = self.lens.name(),
            entries = lines.len(),
            "Mounted file"
        );

        let tree_path = TreePath::for_file(path);
        let mut node = child_or_insert(&mut self.root, FILES_LABEL);
        for component in path.components() {
            node = child_or_insert(node, component);
        }
        *node.children_mut() = lines;

        self.files.insert(
            path.clone(),
            LoadedFile {
                tree_path: tree_path.clone(),
                original: text.map(str::to_string),
                layout,
            },
        );
        Ok(tree_path)
    }

    /// Every loaded file, in path order.
    pub fn files(&self) -> impl Iterator<Item = &NormalizedPath> {
        self.files.keys()
    }

    pub fn contains_file(&self, path: &NormalizedPath) -> bool {
        self.files.contains_key(path)
    }

    /// The tree path of a loaded file.
    pub fn file_path(&self, path: &NormalizedPath) -> Result<&TreePath> {
        self.loaded(path).map(|file| &file.tree_path)
    }

    /// The loaded file a concrete tree path lies in, if any.
    pub fn file_of(&self, tree_path: &TreePath) -> Option<&NormalizedPath> {
        self.files
            .iter()
            .find(|(_, file)| tree_path.starts_with(&file.tree_path))
            .map(|(path, _)| path)
    }

    /// Concrete paths of every node matching `pattern`, in document order.
    pub fn match_paths(&self, pattern: &TreePath) -> Vec<TreePath> {
        self.match_positions(pattern)
            .iter()
            .map(|position| self.concrete_path(position))
            .collect()
    }

    /// Every node matching `pattern`, in document order.
    pub fn nodes(&self, pattern: &TreePath) -> Vec<&Node> {
        self.match_positions(pattern)
            .iter()
            .filter_map(|position| self.node_at(position))
            .collect()
    }

    /// The single node matching `pattern`.
    ///
    /// Returns `Ok(None)` when nothing matches and
    /// [`Error::MultipleMatches`] when more than one node does.
    pub fn get(&self, pattern: &TreePath) -> Result<Option<&Node>> {
        let mut nodes = self.nodes(pattern);
        match nodes.len() {
            0 => Ok(None),
            1 => Ok(nodes.pop()),
            count => Err(Error::MultipleMatches {
                path: pattern.to_string(),
                count,
            }),
        }
    }

    /// Value of the single node matching `pattern`.
    pub fn value(&self, pattern: &TreePath) -> Result<Option<&str>> {
        Ok(self.get(pattern)?.and_then(Node::value))
    }

    /// Move a detached subtree to `dest`.
    ///
    /// The parent of `dest` must resolve to exactly one node inside a loaded
    /// file. The last segment decides the slot:
    ///
    /// - nothing matches: the subtree is appended under the last segment's
    ///   label (`key[n]` only when `n` is the next free position, and
    ///   `key[comment="x"]` only when the subtree satisfies the predicate)
    /// - one node matches: the subtree replaces it in place, unless both are
    ///   structurally identical, in which case the existing node and its
    ///   original text are kept
    /// - several nodes match: [`Error::MultipleMatches`]
    ///
    /// Returns the concrete path of the placed node.
    pub fn move_into(&mut self, subtree: Subtree, dest: &TreePath) -> Result<TreePath> {
        let (Some(last), Some(parent_path)) = (dest.last(), dest.parent()) else {
            return Err(Error::invalid_path(dest, "cannot move onto the tree root"));
        };
        let Some(label) = last.required_label() else {
            return Err(Error::invalid_path(dest, "destination must end in a label"));
        };

        let parent = self.single_position(&parent_path)?;
        if self.owning_file(&parent).is_none() {
            return Err(Error::invalid_path(dest, "destination is outside every loaded file"));
        }

        let mut node = subtree.into_node();
        if node.label() != label {
            node.set_label(label);
        }
        if let Segment::Where { child, value, .. } = last
            && !has_child_value(&node, child, value)
        {
            return Err(Error::invalid_path(
                dest,
                format!("subtree has no '{child}' child equal to \"{value}\""),
            ));
        }

        let parent_node = self
            .node_at(&parent)
            .ok_or_else(|| Error::PathNotFound {
                path: parent_path.to_string(),
            })?;
        let occupants = select(parent_node, last);

        let index = match occupants.as_slice() {
            [] => {
                if let Segment::Nth { position, .. } = last {
                    let taken = parent_node.children_labelled(label).count();
                    if *position != taken + 1 {
                        return Err(Error::PathNotFound {
                            path: dest.to_string(),
                        });
                    }
                }
                let children = self.children_mut_at(&parent)?;
                children.push(node);
                debug!(dest = %dest, "Appended subtree");
                children.len() - 1
            }
            [index] => {
                let index = *index;
                if parent_node.children()[index].same_shape(&node) {
                    debug!(dest = %dest, "Subtree unchanged");
                } else {
                    self.children_mut_at(&parent)?[index] = node;
                    debug!(dest = %dest, "Replaced subtree");
                }
                index
            }
            many => {
                return Err(Error::MultipleMatches {
                    path: dest.to_string(),
                    count: many.len(),
                });
            }
        };

        let mut position = parent;
        position.push(index);
        Ok(self.concrete_path(&position))
    }

    /// Remove every node matching `pattern` together with its children.
    ///
    /// Returns how many nodes were removed. Fails with
    /// [`Error::PathNotFound`] when nothing matches. File nodes and the
    /// directories above them cannot be removed.
    pub fn remove(&mut self, pattern: &TreePath) -> Result<usize> {
        let mut positions = self.match_positions(pattern);
        if positions.is_empty() {
            return Err(Error::PathNotFound {
                path: pattern.to_string(),
            });
        }
        for position in &positions {
            let inside = self
                .owning_file(position)
                .is_some_and(|file| position.len() > file.tree_path.segments().len());
            if !inside {
                return Err(Error::invalid_path(
                    self.concrete_path(position),
                    "only nodes inside a loaded file can be removed",
                ));
            }
        }

        // Later siblings and descendants first, so earlier indices stay valid.
        positions.reverse();
        for position in &positions {
            if let Some((index, parent)) = position.split_last() {
                self.children_mut_at(parent)?.remove(*index);
            }
        }
        debug!(pattern = %pattern, count = positions.len(), "Removed nodes");
        Ok(positions.len())
    }

    /// Render a loaded file back to text.
    pub fn render_file(&self, path: &NormalizedPath) -> Result<String> {
        let file = self.loaded(path)?;
        let position = self.single_position(&file.tree_path)?;
        let node = self
            .node_at(&position)
            .ok_or_else(|| Error::FileNotLoaded { path: path.clone() })?;
        render_text(self.lens.as_ref(), node.children(), file.layout)
    }

    /// The text a file had when loaded, `None` if it did not exist.
    pub fn original_text(&self, path: &NormalizedPath) -> Result<Option<&str>> {
        Ok(self.loaded(path)?.original.as_deref())
    }

    /// Whether rendering the file would change what was loaded.
    pub fn is_modified(&self, path: &NormalizedPath) -> Result<bool> {
        let rendered = self.render_file(path)?;
        let original = self.original_text(path)?.unwrap_or_default();
        Ok(rendered != original)
    }

    fn loaded(&self, path: &NormalizedPath) -> Result<&LoadedFile> {
        self.files
            .get(path)
            .ok_or_else(|| Error::FileNotLoaded { path: path.clone() })
    }

    fn owning_file(&self, position: &[usize]) -> Option<&LoadedFile> {
        let concrete = self.concrete_path(position);
        self.files
            .values()
            .find(|file| concrete.starts_with(&file.tree_path))
    }

    fn match_positions(&self, pattern: &TreePath) -> Vec<Position> {
        let mut current: Vec<Position> = vec![Vec::new()];
        for segment in pattern.segments() {
            let mut next = Vec::new();
            for position in &current {
                let Some(node) = self.node_at(position) else {
                    continue;
                };
                for index in select(node, segment) {
                    let mut child = position.clone();
                    child.push(index);
                    next.push(child);
                }
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }
        current
    }

    fn single_position(&self, pattern: &TreePath) -> Result<Position> {
        let mut positions = self.match_positions(pattern);
        match positions.len() {
            0 => Err(Error::PathNotFound {
                path: pattern.to_string(),
            }),
            1 => Ok(positions.remove(0)),
            count => Err(Error::MultipleMatches {
                path: pattern.to_string(),
                count,
            }),
        }
    }

    fn node_at(&self, position: &[usize]) -> Option<&Node> {
        position
            .iter()
            .try_fold(&self.root, |node, &index| node.children().get(index))
    }

    fn children_mut_at(&mut self, position: &[usize]) -> Result<&mut Vec<Node>> {
        let mut node = &mut self.root;
        for &index in position {
            node = node
                .children_mut()
                .get_mut(index)
                .ok_or_else(|| Error::invalid_node("stale tree position"))?;
        }
        Ok(node.children_mut())
    }

    /// Name a node by label, adding a position only where siblings share it.
    fn concrete_path(&self, position: &[usize]) -> TreePath {
        let mut path = TreePath::root();
        let mut node = &self.root;
        for &index in position {
            let children = node.children();
            let Some(child) = children.get(index) else {
                break;
            };
            let same_label: Vec<usize> = children
                .iter()
                .enumerate()
                .filter(|(_, c)| c.label() == child.label())
                .map(|(i, _)| i)
                .collect();
            path = if same_label.len() == 1 {
                path.label(child.label())
            } else {
                let rank = same_label.iter().take_while(|&&i| i != index).count();
                path.nth(child.label(), rank + 1)
            };
            node = child;
        }
        path
    }
}

/// Indices of the children of `node` selected by `segment`.
fn select(node: &Node, segment: &Segment) -> Vec<usize> {
    let children = node.children().iter().enumerate();
    match segment {
        Segment::Label(label) => children
            .filter(|(_, c)| c.label() == label)
            .map(|(i, _)| i)
            .collect(),
        Segment::Any => children.map(|(i, _)| i).collect(),
        Segment::Nth { label, position } => children
            .filter(|(_, c)| c.label() == label)
            .nth(position.saturating_sub(1))
            .filter(|_| *position > 0)
            .map(|(i, _)| i)
            .into_iter()
            .collect(),
        Segment::Where {
            label,
            child,
            value,
        } => children
            .filter(|(_, c)| c.label() == label && has_child_value(c, child, value))
            .map(|(i, _)| i)
            .collect(),
    }
}

fn has_child_value(node: &Node, child: &str, value: &str) -> bool {
    node.children_labelled(child)
        .any(|c| c.value() == Some(value))
}

fn child_or_insert<'a>(node: &'a mut Node, label: &str) -> &'a mut Node {
    let children = node.children_mut();
    let index = match children.iter().position(|c| c.label() == label) {
        Some(index) => index,
        None => {
            children.push(Node::new(label));
            children.len() - 1
        }
    };
    &mut children[index]
}

/// A detached subtree under construction.
///
/// ```
/// use keys_lens::Subtree;
///
/// let mut entry = Subtree::new("key", "AAAA");
/// entry
///     .append(&["options"], "no-pty", None)
///     .set(&["type"], "ssh-ed25519")
///     .set(&["comment"], "bob@host");
/// assert_eq!(entry.node().child_value("type"), Some("ssh-ed25519"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtree {
    node: Node,
}

impl Subtree {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            node: Node::with_value(label, value),
        }
    }

    /// Set the value at `path` below the root, creating missing nodes.
    /// The first node with each label along the way is reused.
    pub fn set(&mut self, path: &[&str], value: impl Into<String>) -> &mut Self {
        let target = path
            .iter()
            .fold(&mut self.node, |node, label| child_or_insert(node, label));
        target.set_value(Some(value.into()));
        self
    }

    /// Append a new `label` node under `parent`, creating missing parents.
    pub fn append(&mut self, parent: &[&str], label: &str, value: Option<&str>) -> &mut Self {
        let target = parent
            .iter()
            .fold(&mut self.node, |node, segment| child_or_insert(node, segment));
        let child = match value {
            Some(value) => Node::with_value(label, value),
            None => Node::new(label),
        };
        target.push_child(child);
        self
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }
}
