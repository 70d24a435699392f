//! Read access to the host scene graph

use super::types::*;

/// The externally owned scene graph the bridge mirrors.
///
/// Queries return `None` for unknown nodes or attributes; the bridge treats
/// that as a recoverable notification error.
pub trait HostGraph {
    fn kind(&self, node: HostId) -> Option<HostNodeKind>;

    /// Host type name, e.g. the plugin node type
    fn type_name(&self, node: HostId) -> Option<&str>;

    fn name(&self, node: HostId) -> Option<&str>;

    /// Namespace the node lives in; empty for the root namespace
    fn namespace(&self, node: HostId) -> Option<&str>;

    fn find_by_name(&self, name: &str) -> Option<HostId>;

    /// Current value of an attribute, looked up by long or short name
    fn attribute(&self, node: HostId, attribute: &str) -> Option<AttributeValue>;

    /// Long names of every attribute on the node
    fn attribute_names(&self, node: HostId) -> Vec<String>;

    /// Incoming connections as (own destination plug, source plug)
    fn incoming_connections(&self, node: HostId) -> Vec<(Plug, Plug)>;

    /// DAG children of a transform
    fn children(&self, node: HostId) -> Vec<HostId>;

    /// Own visibility of a DAG node, including indirect mechanisms such as
    /// display layers
    fn is_visible(&self, node: HostId) -> Option<bool>;

    fn local_transform(&self, node: HostId) -> Option<LocalTransform>;

    fn material_assignment(&self, mesh: HostId) -> Result<MaterialAssignment, HostError>;

    fn extract_geometry(
        &self,
        mesh: HostId,
        request: &GeometryRequest,
    ) -> Result<ExtractedGeometry, HostError>;

    /// Sources connected into one attribute of a node
    fn incoming(&self, node: HostId, attribute: &str) -> Vec<Plug> {
        self.incoming_connections(node)
            .into_iter()
            .filter(|(own, _)| own.is(attribute))
            .map(|(_, source)| source)
            .collect()
    }
}
