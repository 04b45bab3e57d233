pub mod edge;
pub mod node;
pub mod title;

pub use edge::{EdgeKey, EdgeKind, EdgeWeight, GraphEdge};
pub use node::{Depth, WalkNode, PLACEHOLDER_SUMMARY};
pub use title::{canonicalize, prettify, TITLE_SEPARATOR};
