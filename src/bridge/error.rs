//! Error types for the shadow graph

use thiserror::Error;

use super::node::ShadowKind;
use super::table::NodeId;
use crate::backend::BackendError;
use crate::host::HostId;
use crate::resources::ShaderError;

/// Rejected graph edit. The edit is a no-op and prior state is kept.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Node {child} already has parent {existing}; only one parent transform is supported")]
    SecondParent { child: NodeId, existing: NodeId },
    #[error("Nodes {0} and {1} are not connected")]
    NotConnected(NodeId, NodeId),
    #[error("Node {0} cannot connect to itself")]
    SelfConnection(NodeId),
    #[error("Node {node} is not a {expected:?} node")]
    WrongKind { node: NodeId, expected: ShadowKind },
    #[error("Node {0} is not part of the DAG hierarchy")]
    NotDagNode(NodeId),
    #[error("Node {0} does not exist")]
    StaleNode(NodeId),
    #[error("Host node {0} is not mirrored")]
    UnknownHostNode(HostId),
    #[error("Mesh {mesh} already has an instance under {transform}")]
    DuplicateInstance { mesh: NodeId, transform: NodeId },
    #[error("Parenting {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
}

/// Error surfaced to the driving application. Everything else is recovered
/// inside the graph.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Render device unavailable")]
    DeviceUnavailable,
    #[error("Default shader technique {0} is not in the shader library")]
    MissingDefaultShader(String),
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_nodes() {
        let err = TopologyError::UnknownHostNode(HostId(7));
        assert_eq!(err.to_string(), "Host node #7 is not mirrored");

        let err = BridgeError::MissingDefaultShader("SimpleMesh".into());
        assert!(err.to_string().contains("SimpleMesh"));
    }
}
