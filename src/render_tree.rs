//! Arena-backed render tree with doubly-linked child lists.

use std::collections::HashSet;
use std::sync::Arc;

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::error::LayoutError;
use crate::render_node::{
    BoxData, BoxType, Geometry, InstanceId, NodeId, NodeKind, RenderNode, RenderableText,
    SpacerNode,
};
use crate::text::TextStyle;

/// Owner of every render node of one layout.
///
/// Mutations validate all inputs before touching any link, so a rejected call
/// leaves the tree exactly as it was.
#[derive(Clone, Debug, Default)]
pub struct RenderTree {
    nodes: SlotMap<NodeId, RenderNode>,
}

impl RenderTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: SlotMap::with_capacity_and_key(capacity),
        }
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&RenderNode> {
        self.nodes.get(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&RenderNode, LayoutError> {
        self.nodes.get(id).ok_or(LayoutError::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut RenderNode, LayoutError> {
        self.nodes.get_mut(id).ok_or(LayoutError::UnknownNode(id))
    }

    pub fn create_box(&mut self, box_type: BoxType) -> NodeId {
        self.create_box_with(BoxData::new(box_type))
    }

    /// Insert a box from prepared data. Child links in `data` are ignored.
    pub fn create_box_with(&mut self, mut data: BoxData) -> NodeId {
        data.first_child = None;
        data.last_child = None;
        self.nodes.insert(RenderNode::new(NodeKind::Box(data)))
    }

    /// Insert a text leaf already measured by the caller.
    pub fn create_text(
        &mut self,
        text: impl Into<String>,
        style: Arc<TextStyle>,
        width: f32,
        height: f32,
    ) -> NodeId {
        let mut node = RenderNode::new(NodeKind::Text(RenderableText {
            text: text.into(),
            style,
        }));
        node.geometry.width = width;
        node.geometry.height = height;
        node.geometry.min_chunk_width = width;
        self.nodes.insert(node)
    }

    pub fn create_spacer(&mut self, spacer: SpacerNode, height: f32) -> NodeId {
        let mut node = RenderNode::new(NodeKind::Spacer(spacer));
        node.geometry.width = spacer.width();
        node.geometry.height = height;
        node.geometry.min_chunk_width = spacer.min_width;
        self.nodes.insert(node)
    }

    pub fn box_data(&self, id: NodeId) -> Result<&BoxData, LayoutError> {
        self.node(id)?.as_box().ok_or(LayoutError::NotABox(id))
    }

    /// Mutable access to box properties. Child links stay owned by the tree.
    pub fn box_data_mut(&mut self, id: NodeId) -> Result<&mut BoxData, LayoutError> {
        self.node_mut(id)?
            .as_box_mut()
            .ok_or(LayoutError::NotABox(id))
    }

    pub fn box_type(&self, id: NodeId) -> Result<BoxType, LayoutError> {
        Ok(self.box_data(id)?.box_type)
    }

    pub fn set_instance_id(
        &mut self,
        id: NodeId,
        instance: Option<InstanceId>,
    ) -> Result<(), LayoutError> {
        self.node_mut(id)?.instance_id = instance;
        Ok(())
    }

    pub fn geometry(&self, id: NodeId) -> Result<Geometry, LayoutError> {
        Ok(self.node(id)?.geometry)
    }

    pub(crate) fn geometry_mut(&mut self, id: NodeId) -> Result<&mut Geometry, LayoutError> {
        Ok(&mut self.node_mut(id)?.geometry)
    }

    /// Replace a node's geometry. Coordinates must be finite, sizes finite
    /// and non-negative.
    pub fn set_geometry(&mut self, id: NodeId, geometry: Geometry) -> Result<(), LayoutError> {
        check_geometry(id, &geometry)?;
        self.node_mut(id)?.geometry = geometry;
        Ok(())
    }

    pub fn set_position(&mut self, id: NodeId, x: f32, y: f32) -> Result<(), LayoutError> {
        let mut geometry = self.geometry(id)?;
        geometry.x = x;
        geometry.y = y;
        self.set_geometry(id, geometry)
    }

    /// Pin `id` at `(x, y)` relative to its canvas parent's content box.
    pub fn set_canvas_offset(&mut self, id: NodeId, x: f32, y: f32) -> Result<(), LayoutError> {
        self.node_mut(id)?.canvas_offset = Some((x, y));
        Ok(())
    }

    pub fn set_size(&mut self, id: NodeId, width: f32, height: f32) -> Result<(), LayoutError> {
        let mut geometry = self.geometry(id)?;
        geometry.width = width;
        geometry.height = height;
        self.set_geometry(id, geometry)
    }

    /// Move a node and all of its descendants.
    pub fn translate_subtree(&mut self, id: NodeId, dx: f32, dy: f32) -> Result<(), LayoutError> {
        if !dx.is_finite() || !dy.is_finite() {
            return Err(LayoutError::NonFiniteGeometry {
                node: id,
                field: if dx.is_finite() { "dy" } else { "dx" },
                value: if dx.is_finite() { dy } else { dx },
            });
        }
        let ids: SmallVec<[NodeId; 16]> = self.descendants(id)?.collect();
        for node_id in ids {
            let geometry = self.geometry_mut(node_id)?;
            geometry.x += dx;
            geometry.y += dy;
        }
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, LayoutError> {
        Ok(self.node(id)?.parent)
    }

    pub fn first_child(&self, id: NodeId) -> Result<Option<NodeId>, LayoutError> {
        Ok(self.box_data(id)?.first_child)
    }

    pub fn last_child(&self, id: NodeId) -> Result<Option<NodeId>, LayoutError> {
        Ok(self.box_data(id)?.last_child)
    }

    /// Children of `id` in order. Leaves have no children.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        let next = self
            .nodes
            .get(id)
            .and_then(RenderNode::as_box)
            .and_then(|data| data.first_child);
        Children { tree: self, next }
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Pre-order walk over `root` and everything below it.
    pub fn descendants(&self, root: NodeId) -> Result<Descendants<'_>, LayoutError> {
        self.node(root)?;
        Ok(Descendants {
            tree: self,
            root,
            next: Some(root),
        })
    }

    /// `true` if `ancestor` is `node` or lies on `node`'s parent chain.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Append `child` to the end of `parent`'s child list.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), LayoutError> {
        self.check_linkable(parent, child)?;
        let last = self.box_data(parent)?.last_child;
        {
            let node = self.node_mut(child)?;
            node.parent = Some(parent);
            node.prev = last;
            node.next = None;
        }
        match last {
            Some(last) => self.node_mut(last)?.next = Some(child),
            None => self.box_data_mut(parent)?.first_child = Some(child),
        }
        self.box_data_mut(parent)?.last_child = Some(child);
        Ok(())
    }

    /// Put `new` where `old` is. `old` ends up fully unlinked.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> Result<(), LayoutError> {
        self.check_child_of(parent, old)?;
        self.check_linkable(parent, new)?;
        let (prev, next) = self.unlink(old)?;
        self.link_between(parent, prev, next, &[new])
    }

    /// Put the ordered `new_nodes` where `old` is. An empty list removes
    /// `old`.
    pub fn replace_childs(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new_nodes: &[NodeId],
    ) -> Result<(), LayoutError> {
        self.check_child_of(parent, old)?;
        let mut seen = HashSet::with_capacity(new_nodes.len());
        for &node in new_nodes {
            self.check_linkable(parent, node)?;
            if !seen.insert(node) {
                return Err(LayoutError::AlreadyLinked(node));
            }
        }
        let (prev, next) = self.unlink(old)?;
        self.link_between(parent, prev, next, new_nodes)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), LayoutError> {
        self.check_child_of(parent, child)?;
        self.unlink(child)?;
        Ok(())
    }

    /// Unlink `id` from its parent, if it has one.
    pub fn detach(&mut self, id: NodeId) -> Result<(), LayoutError> {
        if self.node(id)?.parent.is_some() {
            self.unlink(id)?;
        }
        Ok(())
    }

    /// Detach `id` and drop it together with its descendants.
    pub fn free_subtree(&mut self, id: NodeId) -> Result<(), LayoutError> {
        self.detach(id)?;
        let ids: Vec<NodeId> = self.descendants(id)?.collect();
        for node_id in ids {
            self.nodes.remove(node_id);
        }
        Ok(())
    }

    /// Full structural check of the subtree under `root`.
    pub fn validate(&self, root: NodeId) -> Result<(), LayoutError> {
        let mut pending: SmallVec<[NodeId; 16]> = SmallVec::new();
        pending.push(root);
        let mut visited = 0usize;
        while let Some(id) = pending.pop() {
            let node = self.node(id)?;
            if node.parent.is_none() && (node.prev.is_some() || node.next.is_some()) {
                return Err(LayoutError::AlreadyLinked(id));
            }
            check_geometry(id, &node.geometry)?;
            let Some(data) = node.as_box() else {
                continue;
            };
            let mut prev = None;
            let mut cursor = data.first_child;
            while let Some(child_id) = cursor {
                visited += 1;
                if visited > self.nodes.len() {
                    return Err(LayoutError::WouldCreateCycle {
                        parent: id,
                        child: child_id,
                    });
                }
                let child = self.node(child_id)?;
                if child.parent != Some(id) || child.prev != prev {
                    return Err(LayoutError::NotAChild {
                        parent: id,
                        child: child_id,
                    });
                }
                pending.push(child_id);
                prev = Some(child_id);
                cursor = child.next;
            }
            if data.last_child != prev {
                return Err(LayoutError::NotAChild {
                    parent: id,
                    child: data.last_child.or(prev).unwrap_or(id),
                });
            }
        }
        Ok(())
    }

    fn check_child_of(&self, parent: NodeId, child: NodeId) -> Result<(), LayoutError> {
        self.box_data(parent)?;
        if self.node(child)?.parent != Some(parent) {
            return Err(LayoutError::NotAChild { parent, child });
        }
        Ok(())
    }

    fn check_linkable(&self, parent: NodeId, child: NodeId) -> Result<(), LayoutError> {
        self.box_data(parent)?;
        let node = self.node(child)?;
        if node.parent.is_some() || node.prev.is_some() || node.next.is_some() {
            return Err(LayoutError::AlreadyLinked(child));
        }
        if self.is_ancestor_of(child, parent) {
            return Err(LayoutError::WouldCreateCycle { parent, child });
        }
        Ok(())
    }

    /// Remove `id` from its sibling chain. Returns its former neighbours.
    fn unlink(&mut self, id: NodeId) -> Result<(Option<NodeId>, Option<NodeId>), LayoutError> {
        let (parent, prev, next) = {
            let node = self.node_mut(id)?;
            let links = (node.parent, node.prev, node.next);
            node.parent = None;
            node.prev = None;
            node.next = None;
            links
        };
        let Some(parent) = parent else {
            return Ok((None, None));
        };
        match prev {
            Some(prev) => self.node_mut(prev)?.next = next,
            None => self.box_data_mut(parent)?.first_child = next,
        }
        match next {
            Some(next) => self.node_mut(next)?.prev = prev,
            None => self.box_data_mut(parent)?.last_child = prev,
        }
        Ok((prev, next))
    }

    /// Splice already validated, unlinked nodes between `prev` and `next`.
    fn link_between(
        &mut self,
        parent: NodeId,
        prev: Option<NodeId>,
        next: Option<NodeId>,
        nodes: &[NodeId],
    ) -> Result<(), LayoutError> {
        let mut cursor = prev;
        for &id in nodes {
            let node = self.node_mut(id)?;
            node.parent = Some(parent);
            node.prev = cursor;
            node.next = None;
            match cursor {
                Some(before) => self.node_mut(before)?.next = Some(id),
                None => self.box_data_mut(parent)?.first_child = Some(id),
            }
            cursor = Some(id);
        }
        match next {
            Some(after) => {
                self.node_mut(after)?.prev = cursor;
                match cursor {
                    Some(before) => self.node_mut(before)?.next = Some(after),
                    None => self.box_data_mut(parent)?.first_child = Some(after),
                }
            }
            None => self.box_data_mut(parent)?.last_child = cursor,
        }
        Ok(())
    }
}

fn check_geometry(id: NodeId, geometry: &Geometry) -> Result<(), LayoutError> {
    let fields = [
        ("x", geometry.x, false),
        ("y", geometry.y, false),
        ("width", geometry.width, true),
        ("height", geometry.height, true),
        ("min_chunk_width", geometry.min_chunk_width, true),
    ];
    for (field, value, is_size) in fields {
        if !value.is_finite() || (is_size && value < 0.0) {
            return Err(LayoutError::NonFiniteGeometry {
                node: id,
                field,
                value,
            });
        }
    }
    Ok(())
}

/// Iterator over a box's children.
pub struct Children<'a> {
    tree: &'a RenderTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.nodes.get(current).and_then(|n| n.next);
        Some(current)
    }
}

/// Pre-order iterator over a subtree, root included.
pub struct Descendants<'a> {
    tree: &'a RenderTree,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let node = self.tree.nodes.get(current)?;
        if let Some(first) = node.as_box().and_then(|data| data.first_child) {
            self.next = Some(first);
            return Some(current);
        }
        let mut cursor = current;
        self.next = loop {
            if cursor == self.root {
                break None;
            }
            let Some(node) = self.tree.nodes.get(cursor) else {
                break None;
            };
            if let Some(next) = node.next {
                break Some(next);
            }
            match node.parent {
                Some(parent) => cursor = parent,
                None => break None,
            }
        };
        Some(current)
    }
}
