//! Render node primitives: node-type tags, geometry and per-kind payloads.
//!
//! Nodes live in a [`RenderTree`](crate::RenderTree) arena and refer to each
//! other through [`NodeId`] handles. Links are non-owning; the arena owns every
//! node, attached or not.

use std::sync::Arc;

use crate::alignment::TextAlign;
use crate::text::TextStyle;

slotmap::new_key_type! {
    /// Generational arena handle for a render node.
    pub struct NodeId;
}

/// Opaque token correlating a box with the content element that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

/// Box categories known to the layout core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoxType {
    /// Generic block container, children stacked top to bottom.
    Block,
    /// Inline container inside a paragraph (e.g. a styled span).
    Inline,
    /// Paragraph: holds an inline pool before packing, line boxes after.
    Paragraph,
    /// One packed line produced by the alignment processor.
    Line,
    Table,
    TableSection,
    /// Table row: cells side by side.
    TableRow,
    TableCell,
    /// Absolutely positioned children.
    Canvas,
    /// Children side by side.
    Row,
    /// Structural wrapper with no layout meaning of its own.
    Auto,
    /// Root of one logical page.
    LogicalPage,
}

impl BoxType {
    /// Every box type, in declaration order.
    pub const ALL: [BoxType; 12] = [
        BoxType::Block,
        BoxType::Inline,
        BoxType::Paragraph,
        BoxType::Line,
        BoxType::Table,
        BoxType::TableSection,
        BoxType::TableRow,
        BoxType::TableCell,
        BoxType::Canvas,
        BoxType::Row,
        BoxType::Auto,
        BoxType::LogicalPage,
    ];

    pub fn is_auto(self) -> bool {
        matches!(self, BoxType::Auto)
    }
}

/// Node-type tag discriminating leaves from boxes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Text,
    Spacer,
    Box(BoxType),
}

/// Position and size in logical page coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Geometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Narrowest width this node can be laid out in without breaking it.
    pub min_chunk_width: f32,
}

impl Geometry {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Combined border and padding per edge.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Insets {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Insets {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// Text leaf payload.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderableText {
    /// Source slice this node renders, kept verbatim.
    pub text: String,
    pub style: Arc<TextStyle>,
}

/// Breakable whitespace leaf payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpacerNode {
    pub min_width: f32,
    /// Stretch assigned on top of `min_width` (justification).
    pub extra_width: f32,
    /// Relative break preference. On overflow the packer breaks at the last
    /// spacer carrying the highest weight on the line.
    pub break_weight: u8,
}

impl SpacerNode {
    pub const DEFAULT_BREAK_WEIGHT: u8 = 2;
    pub const PRESERVED_BREAK_WEIGHT: u8 = 1;

    pub fn new(min_width: f32) -> Self {
        Self {
            min_width,
            extra_width: 0.0,
            break_weight: Self::DEFAULT_BREAK_WEIGHT,
        }
    }

    pub fn width(&self) -> f32 {
        self.min_width + self.extra_width
    }
}

/// Box payload: child list ends plus box-level layout properties.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxData {
    pub box_type: BoxType,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    pub insets: Insets,
    /// Width requested by content; side-by-side layout honours it first.
    pub preferred_width: Option<f32>,
    /// Avoid page breaks inside this box when it fits on one page.
    pub keep_together: bool,
    /// Paragraph-level alignment override.
    pub text_align: Option<TextAlign>,
}

impl BoxData {
    pub fn new(box_type: BoxType) -> Self {
        Self {
            box_type,
            first_child: None,
            last_child: None,
            insets: Insets::default(),
            preferred_width: None,
            keep_together: false,
            text_align: None,
        }
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    pub fn last_child(&self) -> Option<NodeId> {
        self.last_child
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Text(RenderableText),
    Spacer(SpacerNode),
    Box(BoxData),
}

/// A node of the render tree.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderNode {
    pub(crate) kind: NodeKind,
    pub(crate) geometry: Geometry,
    pub(crate) parent: Option<NodeId>,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) instance_id: Option<InstanceId>,
    /// Position relative to the content box of a canvas parent, captured on
    /// the first canvas layout.
    pub(crate) canvas_offset: Option<(f32, f32)>,
}

impl RenderNode {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            geometry: Geometry::default(),
            parent: None,
            prev: None,
            next: None,
            instance_id: None,
            canvas_offset: None,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match &self.kind {
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Spacer(_) => NodeType::Spacer,
            NodeKind::Box(data) => NodeType::Box(data.box_type),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.prev
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next
    }

    pub fn instance_id(&self) -> Option<InstanceId> {
        self.instance_id
    }

    pub fn canvas_offset(&self) -> Option<(f32, f32)> {
        self.canvas_offset
    }

    pub fn is_box(&self) -> bool {
        matches!(self.kind, NodeKind::Box(_))
    }

    pub fn is_spacer(&self) -> bool {
        matches!(self.kind, NodeKind::Spacer(_))
    }

    pub fn box_type(&self) -> Option<BoxType> {
        match &self.kind {
            NodeKind::Box(data) => Some(data.box_type),
            _ => None,
        }
    }

    pub fn as_box(&self) -> Option<&BoxData> {
        match &self.kind {
            NodeKind::Box(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_box_mut(&mut self) -> Option<&mut BoxData> {
        match &mut self.kind {
            NodeKind::Box(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&RenderableText> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_spacer(&self) -> Option<&SpacerNode> {
        match &self.kind {
            NodeKind::Spacer(spacer) => Some(spacer),
            _ => None,
        }
    }

    pub(crate) fn as_spacer_mut(&mut self) -> Option<&mut SpacerNode> {
        match &mut self.kind {
            NodeKind::Spacer(spacer) => Some(spacer),
            _ => None,
        }
    }

    /// `true` while the node sits in some box's child list.
    pub fn is_linked(&self) -> bool {
        self.parent.is_some()
    }
}
