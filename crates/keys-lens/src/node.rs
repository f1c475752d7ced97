//! Tree nodes

/// One labelled node of a lens tree.
///
/// A node parsed from a file remembers the exact text it came from. As long
/// as the node is not edited, rendering reproduces that text byte for byte;
/// any mutable access through the tree forgets it and the lens renders the
/// node canonically instead.
#[derive(Debug, Clone)]
pub struct Node {
    label: String,
    value: Option<String>,
    children: Vec<Node>,
    origin: Option<String>,
}

impl Node {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
            children: Vec::new(),
            origin: None,
        }
    }

    pub fn with_value(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(label)
        }
    }

    /// Attach the source text this node was parsed from.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
        self.origin = None;
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: Option<String>) {
        self.value = value;
        self.origin = None;
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Mutable access to the children. Counts as an edit of this node.
    pub(crate) fn children_mut(&mut self) -> &mut Vec<Node> {
        self.origin = None;
        &mut self.children
    }

    pub fn push_child(&mut self, child: Node) {
        self.children_mut().push(child);
    }

    /// First child with the given label.
    pub fn child(&self, label: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.label == label)
    }

    /// Value of the first child with the given label.
    pub fn child_value(&self, label: &str) -> Option<&str> {
        self.child(label).and_then(Node::value)
    }

    pub fn children_labelled<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children.iter().filter(move |c| c.label == label)
    }

    /// Structural equality: label, value and children, ignoring origin text.
    pub fn same_shape(&self, other: &Node) -> bool {
        self.label == other.label
            && self.value == other.value
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.same_shape(b))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.same_shape(other)
    }
}

impl Eq for Node {}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Node {
        Node::with_value("key", "AAAA")
            .with_child(Node::with_value("type", "ssh-ed25519"))
            .with_child(Node::with_value("comment", "bob@host"))
            .with_origin("ssh-ed25519  AAAA bob@host")
    }

    #[test]
    fn test_child_lookup() {
        let node = entry();
        assert_eq!(node.child_value("type"), Some("ssh-ed25519"));
        assert_eq!(node.child_value("options"), None);
        assert_eq!(node.children_labelled("comment").count(), 1);
    }

    #[test]
    fn test_edit_forgets_origin() {
        let mut node = entry();
        assert!(node.origin().is_some());
        node.set_value(Some("BBBB".into()));
        assert!(node.origin().is_none());
    }

    #[test]
    fn test_same_shape_ignores_origin() {
        let parsed = entry();
        let built = Node::with_value("key", "AAAA")
            .with_child(Node::with_value("type", "ssh-ed25519"))
            .with_child(Node::with_value("comment", "bob@host"));
        assert_eq!(parsed, built);

        let reordered = Node::with_value("key", "AAAA")
            .with_child(Node::with_value("comment", "bob@host"))
            .with_child(Node::with_value("type", "ssh-ed25519"));
        assert_ne!(parsed, reordered);
    }
}
