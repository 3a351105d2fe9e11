use std::collections::HashMap;

use pagebox::{BoxType, NodeId, NodeKind, PageGrid, RenderTree};
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

/// Bumped whenever the encoded layout of [`PageSnapshot`] changes.
pub const SNAPSHOT_SCHEMA_VERSION: u8 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotBoxType {
    Block,
    Inline,
    Paragraph,
    Line,
    Table,
    TableSection,
    TableRow,
    TableCell,
    Canvas,
    Row,
    Auto,
    LogicalPage,
}

impl From<BoxType> for SnapshotBoxType {
    fn from(value: BoxType) -> Self {
        match value {
            BoxType::Block => Self::Block,
            BoxType::Inline => Self::Inline,
            BoxType::Paragraph => Self::Paragraph,
            BoxType::Line => Self::Line,
            BoxType::Table => Self::Table,
            BoxType::TableSection => Self::TableSection,
            BoxType::TableRow => Self::TableRow,
            BoxType::TableCell => Self::TableCell,
            BoxType::Canvas => Self::Canvas,
            BoxType::Row => Self::Row,
            BoxType::Auto => Self::Auto,
            BoxType::LogicalPage => Self::LogicalPage,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SnapshotKind {
    Text {
        text: String,
        family: String,
        size_px: f32,
        weight: u16,
        italic: bool,
    },
    Spacer {
        min_width: f32,
        extra_width: f32,
    },
    Box {
        box_type: SnapshotBoxType,
    },
}

/// One captured node. Nodes are stored in pre-order; `parent` indexes into
/// the same list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub parent: Option<u32>,
    pub depth: u16,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub instance_id: Option<u64>,
    pub kind: SnapshotKind,
}

impl SnapshotNode {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            SnapshotKind::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Flat copy of a finished logical page box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub version: u8,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<SnapshotNode>,
}

/// A captured node placed on one physical page, in page-local coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageItem {
    /// Index into [`PageSnapshot::nodes`].
    pub node: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalPage {
    /// Row-major page number, starting at zero.
    pub index: usize,
    pub row: usize,
    pub column: usize,
    pub items: Vec<PageItem>,
}

impl PageSnapshot {
    /// Capture `page` and everything below it. The subtree is validated first.
    pub fn capture(tree: &RenderTree, page: NodeId) -> Result<Self, SnapshotError> {
        tree.validate(page)?;
        let mut index_of: HashMap<NodeId, u32> = HashMap::with_capacity(tree.len());
        let mut nodes = Vec::with_capacity(tree.len());

        for id in tree.descendants(page)? {
            let node = tree.node(id)?;
            let (parent, depth) = match node.parent().and_then(|p| index_of.get(&p)) {
                Some(&parent) if id != page => {
                    let depth = nodes
                        .get(parent as usize)
                        .map_or(0, |p: &SnapshotNode| p.depth.saturating_add(1));
                    (Some(parent), depth)
                }
                _ => (None, 0),
            };
            let kind = match node.kind() {
                NodeKind::Text(text) => SnapshotKind::Text {
                    text: text.text.clone(),
                    family: text.style.family.clone(),
                    size_px: text.style.size_px,
                    weight: text.style.weight,
                    italic: text.style.italic,
                },
                NodeKind::Spacer(spacer) => SnapshotKind::Spacer {
                    min_width: spacer.min_width,
                    extra_width: spacer.extra_width,
                },
                NodeKind::Box(data) => SnapshotKind::Box {
                    box_type: data.box_type.into(),
                },
            };
            let geometry = node.geometry();
            index_of.insert(id, nodes.len() as u32);
            nodes.push(SnapshotNode {
                parent,
                depth,
                x: geometry.x,
                y: geometry.y,
                width: geometry.width,
                height: geometry.height,
                instance_id: node.instance_id().map(|i| i.0),
                kind,
            });
        }

        let root = tree.geometry(page)?;
        log::debug!("captured page {:?}: {} nodes", page, nodes.len());
        Ok(Self {
            version: SNAPSHOT_SCHEMA_VERSION,
            width: root.width,
            height: root.height,
            nodes,
        })
    }

    /// Text runs in reading order.
    pub fn text_runs(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(SnapshotNode::text)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.check_version()
    }

    pub fn to_postcard(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn from_postcard(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = postcard::from_bytes(bytes)?;
        snapshot.check_version()
    }

    fn check_version(self) -> Result<Self, SnapshotError> {
        if self.version != SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotError::Version {
                found: self.version,
                expected: SNAPSHOT_SCHEMA_VERSION,
            });
        }
        Ok(self)
    }

    /// Distribute every captured node except the page root onto physical
    /// pages by its top-left corner. Pages are returned row-major; empty
    /// pages inside the covered area are kept.
    pub fn split_pages(&self, grid: &PageGrid) -> Vec<PhysicalPage> {
        let columns = usize::from(grid.columns());
        let bottom = self
            .nodes
            .iter()
            .map(SnapshotNode::bottom)
            .fold(self.height, f32::max);
        let mut rows = grid.page_count(bottom);

        let mut placed = Vec::with_capacity(self.nodes.len().saturating_sub(1));
        for (index, node) in self.nodes.iter().enumerate().skip(1) {
            let row = grid.page_index(node.y);
            let column = if grid.column_width() > 0.0 && node.x > 0.0 {
                ((node.x / grid.column_width()) as usize).min(columns - 1)
            } else {
                0
            };
            rows = rows.max(row + 1);
            placed.push((
                row,
                column,
                PageItem {
                    node: index,
                    x: node.x - grid.column_width() * column as f32,
                    y: node.y - grid.page_top(row),
                    width: node.width,
                    height: node.height,
                },
            ));
        }

        let mut pages: Vec<PhysicalPage> = (0..rows * columns)
            .map(|index| PhysicalPage {
                index,
                row: index / columns,
                column: index % columns,
                items: Vec::new(),
            })
            .collect();
        for (row, column, item) in placed {
            if let Some(page) = pages.get_mut(row * columns + column) {
                page.items.push(item);
            }
        }
        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagebox::{InstanceId, SpacerNode, TextStyle};
    use std::sync::Arc;

    fn sample() -> (RenderTree, NodeId) {
        let mut tree = RenderTree::new();
        let page = tree.create_box(BoxType::LogicalPage);
        tree.set_size(page, 100.0, 150.0).expect("page size should be valid");
        let block = tree.create_box(BoxType::Block);
        tree.set_instance_id(block, Some(InstanceId(7)))
            .expect("block should exist");
        let style = Arc::new(TextStyle::default());
        let first = tree.create_text("first", Arc::clone(&style), 30.0, 10.0);
        let second = tree.create_text("second", style, 30.0, 10.0);
        let gap = tree.create_spacer(SpacerNode::new(4.0), 10.0);
        tree.set_position(second, 60.0, 120.0)
            .expect("position should be valid");
        tree.add_child(page, block).expect("link block");
        tree.add_child(block, first).expect("link first");
        tree.add_child(block, gap).expect("link gap");
        tree.add_child(page, second).expect("link second");
        (tree, page)
    }

    #[test]
    fn capture_flattens_in_pre_order_with_parent_links() {
        let (tree, page) = sample();
        let snapshot = PageSnapshot::capture(&tree, page).expect("capture should pass");
        assert_eq!(snapshot.nodes.len(), 5);
        assert_eq!(snapshot.nodes[0].parent, None);
        assert_eq!(snapshot.nodes[1].parent, Some(0));
        assert_eq!(snapshot.nodes[1].instance_id, Some(7));
        assert_eq!(snapshot.nodes[2].parent, Some(1));
        assert_eq!(snapshot.nodes[2].depth, 2);
        assert_eq!(snapshot.nodes[4].depth, 1);
        assert_eq!(snapshot.text_runs().collect::<Vec<_>>(), vec!["first", "second"]);
        assert_eq!((snapshot.width, snapshot.height), (100.0, 150.0));
    }

    #[test]
    fn json_and_postcard_preserve_the_snapshot() {
        let (tree, page) = sample();
        let snapshot = PageSnapshot::capture(&tree, page).expect("capture should pass");

        let json = snapshot.to_json().expect("json encode should pass");
        assert!(json.contains("\"LogicalPage\""));
        assert_eq!(PageSnapshot::from_json(&json).expect("json decode"), snapshot);

        let bytes = snapshot.to_postcard().expect("postcard encode should pass");
        assert!(bytes.len() < json.len());
        assert_eq!(PageSnapshot::from_postcard(&bytes).expect("postcard decode"), snapshot);
    }

    #[test]
    fn foreign_schema_versions_are_rejected() {
        let (tree, page) = sample();
        let mut snapshot = PageSnapshot::capture(&tree, page).expect("capture should pass");
        snapshot.version = SNAPSHOT_SCHEMA_VERSION + 1;
        let bytes = snapshot.to_postcard().expect("postcard encode should pass");
        assert!(matches!(
            PageSnapshot::from_postcard(&bytes),
            Err(SnapshotError::Version { found: 2, expected: 1 })
        ));
        assert!(matches!(
            PageSnapshot::from_postcard(&[0xff, 0xff]),
            Err(SnapshotError::Postcard(_))
        ));
    }

    #[test]
    fn split_assigns_nodes_to_physical_pages() {
        let (tree, page) = sample();
        let snapshot = PageSnapshot::capture(&tree, page).expect("capture should pass");
        let grid = PageGrid::new(50.0, 100.0, 2);
        let pages = snapshot.split_pages(&grid);
        assert_eq!(pages.len(), 4);
        assert_eq!(pages[0].items.len(), 3);
        let second = &pages[3].items[0];
        assert_eq!((pages[3].row, pages[3].column), (1, 1));
        assert_eq!(second.node, 4);
        assert_eq!((second.x, second.y), (10.0, 20.0));
        assert!(pages[1].items.is_empty());
        assert!(pages[2].items.is_empty());
    }

    #[test]
    fn capture_rejects_unknown_pages() {
        let (mut tree, page) = sample();
        tree.free_subtree(page).expect("free should pass");
        assert!(matches!(
            PageSnapshot::capture(&tree, page),
            Err(SnapshotError::Layout(_))
        ));
    }
}
