mod load;
mod model;
mod parse;

pub use load::load_blueprint;
pub use model::{Blueprint, GraphEdge, GraphNode, NodeKind, NodeStatus, SecurityReport};
