//! Scene graph arena
//!
//! Nodes live in a slot map and address each other through [`NodeHandle`]s.
//! A node owns its list of child handles; the parent link is a plain handle
//! used for lookups only, so the graph can never hold an ownership cycle.
//!
//! World transforms are cached per node. Changing a local transform marks the
//! node and its whole subtree dirty, which keeps one invariant true at all
//! times: a clean node only has clean ancestors. Recomputing a node therefore
//! only needs to walk up to the first clean ancestor and then compose
//! matrices top-down.

use crate::foundation::collections::{NodeHandle, SlotMap};
use crate::foundation::math::{Mat4, Transform};
use crate::render::drawable::Drawable;
use crate::render::resources::material::Material;

/// Result type for scene graph operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors raised by scene graph mutation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The handle does not refer to a live node
    #[error("Invalid node handle: {0:?}")]
    InvalidHandle(NodeHandle),

    /// Re-parenting would make a node its own ancestor
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    CycleDetected {
        /// Node being moved
        child: NodeHandle,
        /// Requested new parent
        parent: NodeHandle,
    },

    /// The root node cannot be removed or re-parented
    #[error("The root node cannot be removed or re-parented")]
    RootRemoval,

    /// The node has no drawable attached
    #[error("Node {0:?} has no drawable")]
    NotDrawable(NodeHandle),
}

/// A single node of the scene graph
#[derive(Debug, Clone)]
pub struct SceneNode {
    name: Option<String>,
    local: Transform,
    world: Mat4,
    dirty: bool,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
    visible: bool,
    layer: i32,
    drawable: Option<Drawable>,
}

impl SceneNode {
    /// Create a transform-only node
    pub fn new(local: Transform) -> Self {
        Self {
            name: None,
            local,
            world: Mat4::identity(),
            dirty: true,
            parent: None,
            children: Vec::new(),
            visible: true,
            layer: 0,
            drawable: None,
        }
    }

    /// Create a node carrying a drawable
    pub fn with_drawable(local: Transform, drawable: impl Into<Drawable>) -> Self {
        Self {
            drawable: Some(drawable.into()),
            ..Self::new(local)
        }
    }

    /// Builder pattern: set the debug name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder pattern: set the render layer
    pub fn on_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    /// Debug name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Local transform relative to the parent
    pub fn local_transform(&self) -> &Transform {
        &self.local
    }

    /// Parent handle, `None` for the root
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Child handles in insertion order
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Whether the node and its subtree are drawn
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Render layer, lower layers draw first
    pub fn layer(&self) -> i32 {
        self.layer
    }

    /// Attached drawable
    pub fn drawable(&self) -> Option<&Drawable> {
        self.drawable.as_ref()
    }
}

/// Arena-backed hierarchical scene
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: SlotMap<NodeHandle, SceneNode>,
    root: NodeHandle,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create a graph containing only an identity root node
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::new(Transform::identity()).named("root"));
        Self { nodes, root }
    }

    /// Handle of the root node
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the root remains
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Whether the handle refers to a live node
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(handle)
    }

    /// Borrow a node
    pub fn node(&self, handle: NodeHandle) -> SceneResult<&SceneNode> {
        self.nodes.get(handle).ok_or(SceneError::InvalidHandle(handle))
    }

    fn node_mut(&mut self, handle: NodeHandle) -> SceneResult<&mut SceneNode> {
        self.nodes.get_mut(handle).ok_or(SceneError::InvalidHandle(handle))
    }

    /// Insert `node` as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeHandle, mut node: SceneNode) -> SceneResult<NodeHandle> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::InvalidHandle(parent));
        }
        node.parent = Some(parent);
        node.children.clear();
        node.dirty = true;
        let handle = self.nodes.insert(node);
        self.node_mut(parent)?.children.push(handle);
        Ok(handle)
    }

    /// Remove a node together with its whole subtree
    ///
    /// Returns the number of nodes removed.
    pub fn remove(&mut self, handle: NodeHandle) -> SceneResult<usize> {
        if handle == self.root {
            return Err(SceneError::RootRemoval);
        }
        let parent = self.node(handle)?.parent;
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|&child| child != handle);
        }

        let mut removed = 0;
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        log::trace!("Removed {} scene node(s)", removed);
        Ok(removed)
    }

    /// Move `child` (with its subtree) under `new_parent`
    pub fn reparent(&mut self, child: NodeHandle, new_parent: NodeHandle) -> SceneResult<()> {
        if child == self.root {
            return Err(SceneError::RootRemoval);
        }
        self.node(child)?;
        self.node(new_parent)?;

        let mut ancestor = Some(new_parent);
        while let Some(current) = ancestor {
            if current == child {
                return Err(SceneError::CycleDetected { child, parent: new_parent });
            }
            ancestor = self.nodes[current].parent;
        }

        if let Some(old_parent) = self.nodes[child].parent {
            self.nodes[old_parent].children.retain(|&c| c != child);
        }
        self.nodes[new_parent].children.push(child);
        self.nodes[child].parent = Some(new_parent);
        self.mark_subtree_dirty(child);
        Ok(())
    }

    /// Replace a node's local transform and invalidate its subtree
    pub fn set_local_transform(&mut self, handle: NodeHandle, transform: Transform) -> SceneResult<()> {
        self.node_mut(handle)?.local = transform;
        self.mark_subtree_dirty(handle);
        Ok(())
    }

    /// Mutate a node's local transform in place and invalidate its subtree
    pub fn update_local_transform(
        &mut self,
        handle: NodeHandle,
        mutation: impl FnOnce(&mut Transform),
    ) -> SceneResult<()> {
        mutation(&mut self.node_mut(handle)?.local);
        self.mark_subtree_dirty(handle);
        Ok(())
    }

    /// Show or hide a node and its subtree
    pub fn set_visible(&mut self, handle: NodeHandle, visible: bool) -> SceneResult<()> {
        self.node_mut(handle)?.visible = visible;
        Ok(())
    }

    /// Change a node's render layer
    pub fn set_layer(&mut self, handle: NodeHandle, layer: i32) -> SceneResult<()> {
        self.node_mut(handle)?.layer = layer;
        Ok(())
    }

    /// Attach or replace the drawable of a node
    pub fn set_drawable(&mut self, handle: NodeHandle, drawable: impl Into<Drawable>) -> SceneResult<()> {
        self.node_mut(handle)?.drawable = Some(drawable.into());
        Ok(())
    }

    /// Mutable access to a node's drawable; changes apply to the next submission
    pub fn drawable_mut(&mut self, handle: NodeHandle) -> SceneResult<&mut Drawable> {
        self.node_mut(handle)?
            .drawable
            .as_mut()
            .ok_or(SceneError::NotDrawable(handle))
    }

    /// Mutable access to a node's material (shader, uniforms, texture, blending)
    pub fn material_mut(&mut self, handle: NodeHandle) -> SceneResult<&mut Material> {
        Ok(self.drawable_mut(handle)?.material_mut())
    }

    fn mark_subtree_dirty(&mut self, handle: NodeHandle) {
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current) {
                node.dirty = true;
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Cached world transform, `None` if the node is dirty or missing
    pub fn cached_world_transform(&self, handle: NodeHandle) -> Option<Mat4> {
        self.nodes.get(handle).filter(|node| !node.dirty).map(|node| node.world)
    }

    /// World transform of a node, recomputing stale ancestors top-down
    pub fn world_transform(&mut self, handle: NodeHandle) -> SceneResult<Mat4> {
        let mut chain = Vec::new();
        let mut current = Some(handle);
        while let Some(h) = current {
            let node = self.node(h)?;
            if !node.dirty {
                break;
            }
            chain.push(h);
            current = node.parent;
        }

        let mut parent_world = current.map_or_else(Mat4::identity, |clean| self.nodes[clean].world);
        for h in chain.into_iter().rev() {
            let node = &mut self.nodes[h];
            node.world = parent_world * node.local.to_matrix();
            node.dirty = false;
            parent_world = node.world;
        }
        Ok(parent_world)
    }

    /// Recompute every dirty world transform in one top-down pass
    ///
    /// Returns the number of nodes recomputed.
    pub fn update_world_transforms(&mut self) -> usize {
        let mut updated = 0;
        let mut stack = vec![(self.root, Mat4::identity(), false)];
        while let Some((handle, parent_world, parent_changed)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(handle) else { continue };
            let changed = node.dirty || parent_changed;
            if changed {
                node.world = parent_world * node.local.to_matrix();
                node.dirty = false;
                updated += 1;
            }
            let world = node.world;
            stack.extend(node.children.iter().rev().map(|&child| (child, world, changed)));
        }
        updated
    }

    /// Advance time-dependent drawables such as particle systems by `dt` seconds
    pub fn update_drawables(&mut self, dt: f32) {
        for node in self.nodes.values_mut() {
            if let Some(drawable) = node.drawable.as_mut() {
                drawable.update(dt);
            }
        }
    }

    /// Visible drawable nodes in depth-first pre-order
    ///
    /// Hidden nodes prune their subtree. This order is the submission order of
    /// a frame.
    pub fn visible_drawables(&self) -> Vec<NodeHandle> {
        let mut visible = Vec::new();
        let mut stack = vec![self.root];
        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get(handle) else { continue };
            if !node.visible {
                continue;
            }
            if node.drawable.is_some() {
                visible.push(handle);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4Ext, Vec3};
    use approx::assert_relative_eq;

    fn offset(x: f32) -> Transform {
        Transform::from_position(Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn test_root_world_transform_is_identity() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        assert_eq!(graph.world_transform(root).unwrap(), Mat4::identity());
    }

    #[test]
    fn test_world_transform_composes_with_parent() {
        let mut graph = SceneGraph::new();
        let parent = graph.add_child(graph.root(), SceneNode::new(offset(10.0))).unwrap();
        let child = graph.add_child(parent, SceneNode::new(offset(5.0))).unwrap();

        let world = graph.world_transform(child).unwrap();
        assert_relative_eq!(world.translation_part().x, 15.0);
        // computing the child also cleaned the parent
        assert!(graph.cached_world_transform(parent).is_some());
    }

    #[test]
    fn test_parent_change_invalidates_descendants() {
        let mut graph = SceneGraph::new();
        let parent = graph.add_child(graph.root(), SceneNode::new(offset(1.0))).unwrap();
        let child = graph.add_child(parent, SceneNode::new(offset(1.0))).unwrap();
        let grandchild = graph.add_child(child, SceneNode::new(offset(1.0))).unwrap();
        graph.update_world_transforms();
        assert!(graph.cached_world_transform(grandchild).is_some());

        graph.set_local_transform(parent, offset(100.0)).unwrap();
        assert!(graph.cached_world_transform(child).is_none());
        assert!(graph.cached_world_transform(grandchild).is_none());

        let world = graph.world_transform(grandchild).unwrap();
        assert_relative_eq!(world.translation_part().x, 102.0);
    }

    #[test]
    fn test_update_world_transforms_only_touches_dirty_subtrees() {
        let mut graph = SceneGraph::new();
        let a = graph.add_child(graph.root(), SceneNode::new(offset(1.0))).unwrap();
        let b = graph.add_child(graph.root(), SceneNode::new(offset(2.0))).unwrap();
        graph.add_child(a, SceneNode::new(offset(3.0))).unwrap();
        assert_eq!(graph.update_world_transforms(), 4);
        assert_eq!(graph.update_world_transforms(), 0);

        graph.set_local_transform(b, offset(4.0)).unwrap();
        assert_eq!(graph.update_world_transforms(), 1);
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut graph = SceneGraph::new();
        let parent = graph.add_child(graph.root(), SceneNode::new(offset(1.0))).unwrap();
        let child = graph.add_child(parent, SceneNode::new(offset(1.0))).unwrap();

        assert_eq!(graph.remove(parent).unwrap(), 2);
        assert!(!graph.contains(child));
        assert!(graph.is_empty());
        assert_eq!(graph.remove(graph.root()), Err(SceneError::RootRemoval));
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let mut graph = SceneGraph::new();
        let parent = graph.add_child(graph.root(), SceneNode::new(offset(1.0))).unwrap();
        let child = graph.add_child(parent, SceneNode::new(offset(1.0))).unwrap();

        assert!(matches!(graph.reparent(parent, child), Err(SceneError::CycleDetected { .. })));

        graph.reparent(child, graph.root()).unwrap();
        assert_eq!(graph.node(child).unwrap().parent(), Some(graph.root()));
        assert!(graph.node(parent).unwrap().children().is_empty());
        assert_relative_eq!(graph.world_transform(child).unwrap().translation_part().x, 1.0);
    }

    #[test]
    fn test_stale_handle_is_reported() {
        let mut graph = SceneGraph::new();
        let node = graph.add_child(graph.root(), SceneNode::new(offset(1.0))).unwrap();
        graph.remove(node).unwrap();
        assert_eq!(graph.set_local_transform(node, offset(2.0)), Err(SceneError::InvalidHandle(node)));
    }
}
