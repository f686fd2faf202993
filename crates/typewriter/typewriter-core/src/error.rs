use thiserror::Error;

use crate::ids::NodeId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypewriterError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("cannot insert {child:?} into {parent:?}: it would become its own ancestor")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("reference node {reference:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, reference: NodeId },

    #[error("node {node:?} could not be measured (height {height})")]
    Layout { node: NodeId, height: f32 },

    #[error("markup parse error: {0}")]
    Markup(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TypewriterError>;
