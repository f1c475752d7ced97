//! Structured tree editor for key files
//!
//! Parses files through a line grammar into one addressable tree, edits it
//! through path-addressed operations, and writes changed files back while
//! leaving untouched lines byte-identical.

pub mod diff;
pub mod error;
pub mod handlers;
pub mod lens;
pub mod node;
pub mod path;
pub mod session;
pub mod tree;

pub use diff::FileDiff;
pub use error::{Error, Result};
pub use handlers::{AuthorizedKeysLens, labels};
pub use lens::{Lens, TextLayout};
pub use node::Node;
pub use path::{FILES_LABEL, Segment, TreePath};
pub use session::{CommitReport, SaveMode, Session};
pub use tree::{Subtree, Tree};
