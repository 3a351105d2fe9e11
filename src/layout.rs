//! Box layout: positions the subtree of a logical page box.
//!
//! Runs before pagination. Geometry is absolute, in logical page coordinates.

use smallvec::SmallVec;

use crate::config::{LayoutConfig, PageGrid};
use crate::error::LayoutError;
use crate::non_auto::NonAutoBoxIterator;
use crate::paragraph::ParagraphLayout;
use crate::render_node::{BoxType, Geometry, NodeId};
use crate::render_tree::RenderTree;

/// Block, row, canvas, table and paragraph layout for one logical page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutEngine {
    config: LayoutConfig,
    grid: PageGrid,
    paragraphs: ParagraphLayout,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            grid: PageGrid::from_config(&config),
            paragraphs: ParagraphLayout::new(&config),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn grid(&self) -> PageGrid {
        self.grid
    }

    /// Position everything below `page`. Returns the page's content height.
    pub fn layout(&self, tree: &mut RenderTree, page: NodeId) -> Result<f32, LayoutError> {
        let width = self.grid.logical_width();
        let height = self.layout_stack(tree, page, 0.0, 0.0, width)?;
        log::debug!(
            "laid out page {:?}: {:.1}x{:.1}, {} nodes in tree",
            page,
            width,
            height,
            tree.len()
        );
        Ok(height)
    }

    /// Lay out `node` in the column `[x, x + width)` at `y`; returns its
    /// height.
    fn layout_node(
        &self,
        tree: &mut RenderTree,
        node: NodeId,
        x: f32,
        y: f32,
        width: f32,
    ) -> Result<f32, LayoutError> {
        let Some(box_type) = tree.node(node)?.box_type() else {
            return place_atomic(tree, node, x, y);
        };
        let width = match tree.box_data(node)?.preferred_width {
            Some(preferred) if preferred.is_finite() => preferred.clamp(0.0, width.max(0.0)),
            _ => width,
        };
        match box_type {
            BoxType::Paragraph => self.paragraphs.layout(tree, node, x, y, width),
            BoxType::Row | BoxType::TableRow => self.layout_row(tree, node, x, y, width),
            BoxType::Table | BoxType::TableSection => self.layout_table(tree, node, x, y, width),
            BoxType::Canvas => self.layout_canvas(tree, node, x, y, width),
            BoxType::Line => place_atomic(tree, node, x, y),
            BoxType::Block
            | BoxType::Inline
            | BoxType::TableCell
            | BoxType::Auto
            | BoxType::LogicalPage => self.layout_stack(tree, node, x, y, width),
        }
    }

    /// Children top to bottom at full content width.
    fn layout_stack(
        &self,
        tree: &mut RenderTree,
        node: NodeId,
        x: f32,
        y: f32,
        width: f32,
    ) -> Result<f32, LayoutError> {
        let data = tree.box_data(node)?;
        let insets = data.insets;
        let gap = match data.box_type {
            BoxType::Block | BoxType::LogicalPage => self.config.block_gap_px,
            _ => 0.0,
        };
        let inner_x = x + insets.left;
        let inner_width = (width - insets.horizontal()).max(0.0);
        let children: SmallVec<[NodeId; 16]> = tree.children(node).collect();

        let mut cursor = y + insets.top;
        for (index, child) in children.iter().enumerate() {
            if index > 0 {
                cursor += gap;
            }
            cursor += self.layout_node(tree, *child, inner_x, cursor, inner_width)?;
        }
        set_frame(tree, node, x, y, width, cursor + insets.bottom - y)
    }

    /// Rows and sections stacked top to bottom, found through auto wrappers.
    fn layout_table(
        &self,
        tree: &mut RenderTree,
        node: NodeId,
        x: f32,
        y: f32,
        width: f32,
    ) -> Result<f32, LayoutError> {
        let insets = tree.box_data(node)?.insets;
        let inner_x = x + insets.left;
        let inner_width = (width - insets.horizontal()).max(0.0);
        let parts: SmallVec<[NodeId; 16]> = NonAutoBoxIterator::new(tree, node).collect();

        let mut cursor = y + insets.top;
        for part in parts {
            cursor += self.layout_node(tree, part, inner_x, cursor, inner_width)?;
        }
        fit_auto_wrappers(tree, node)?;
        set_frame(tree, node, x, y, width, cursor + insets.bottom - y)
    }

    /// Children side by side: preferred widths first, the rest shared equally.
    fn layout_row(
        &self,
        tree: &mut RenderTree,
        node: NodeId,
        x: f32,
        y: f32,
        width: f32,
    ) -> Result<f32, LayoutError> {
        let data = tree.box_data(node)?;
        let insets = data.insets;
        let table_row = data.box_type == BoxType::TableRow;
        let items: SmallVec<[NodeId; 8]> = if table_row {
            NonAutoBoxIterator::new(tree, node).collect()
        } else {
            tree.children(node).collect()
        };

        let inner_width = (width - insets.horizontal()).max(0.0);
        let mut remaining = inner_width;
        let mut flexible = 0usize;
        let mut widths: SmallVec<[Option<f32>; 8]> = SmallVec::with_capacity(items.len());
        for &item in &items {
            let preferred = tree
                .get(item)
                .and_then(|n| n.as_box())
                .and_then(|data| data.preferred_width)
                .filter(|w| w.is_finite());
            match preferred {
                Some(preferred) => {
                    let taken = preferred.clamp(0.0, remaining);
                    remaining -= taken;
                    widths.push(Some(taken));
                }
                None => {
                    flexible += 1;
                    widths.push(None);
                }
            }
        }
        let share = if flexible > 0 {
            remaining / flexible as f32
        } else {
            0.0
        };

        let top = y + insets.top;
        let mut cursor = x + insets.left;
        let mut tallest = 0.0f32;
        for (&item, width) in items.iter().zip(widths) {
            let item_width = width.unwrap_or(share);
            let height = self.layout_node(tree, item, cursor, top, item_width)?;
            tallest = tallest.max(height);
            cursor += item_width;
        }
        if table_row {
            for &cell in &items {
                tree.geometry_mut(cell)?.height = tallest;
            }
            fit_auto_wrappers(tree, node)?;
        }
        set_frame(tree, node, x, y, width, tallest + insets.vertical())
    }

    /// Children keep their own offsets, relative to the canvas content box.
    /// An unpinned child's position on the first pass becomes its offset.
    fn layout_canvas(
        &self,
        tree: &mut RenderTree,
        node: NodeId,
        x: f32,
        y: f32,
        width: f32,
    ) -> Result<f32, LayoutError> {
        let insets = tree.box_data(node)?.insets;
        let own = tree.geometry(node)?;
        let inner_x = x + insets.left;
        let inner_y = y + insets.top;
        let inner_width = (width - insets.horizontal()).max(0.0);
        let children: SmallVec<[NodeId; 8]> = tree.children(node).collect();

        let mut bottom = inner_y;
        for child in children {
            let geometry = tree.geometry(child)?;
            let pinned = tree.node(child)?.canvas_offset();
            let (offset_x, offset_y) = match pinned {
                Some(offset) => offset,
                None => {
                    tree.set_canvas_offset(child, geometry.x, geometry.y)?;
                    (geometry.x, geometry.y)
                }
            };
            let child_width = if geometry.width > 0.0 {
                geometry.width
            } else {
                (inner_width - offset_x).max(0.0)
            };
            let child_y = inner_y + offset_y;
            let height = if tree.node(child)?.is_box() {
                self.layout_node(tree, child, inner_x + offset_x, child_y, child_width)?
            } else {
                place_atomic(tree, child, inner_x + offset_x, child_y)?
            };
            bottom = bottom.max(child_y + height);
        }
        let height = (bottom + insets.bottom - y).max(own.height);
        set_frame(tree, node, x, y, width, height)
    }
}

/// Move a node that is not laid out by this engine (leaf, packed line) with
/// its subtree to `(x, y)`. Returns its height.
fn place_atomic(tree: &mut RenderTree, node: NodeId, x: f32, y: f32) -> Result<f32, LayoutError> {
    let geometry = tree.geometry(node)?;
    tree.translate_subtree(node, x - geometry.x, y - geometry.y)?;
    Ok(geometry.height)
}

fn set_frame(
    tree: &mut RenderTree,
    node: NodeId,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) -> Result<f32, LayoutError> {
    let min_chunk_width = tree.geometry(node)?.min_chunk_width;
    let geometry = Geometry {
        x,
        y,
        width: width.max(0.0),
        height: height.max(0.0),
        min_chunk_width,
    };
    tree.set_geometry(node, geometry)?;
    Ok(geometry.height)
}

/// Size every auto wrapper below `root` to the union of its children.
fn fit_auto_wrappers(tree: &mut RenderTree, root: NodeId) -> Result<(), LayoutError> {
    let wrappers: SmallVec<[NodeId; 8]> = tree
        .descendants(root)?
        .skip(1)
        .filter(|&id| tree.get(id).and_then(|n| n.box_type()) == Some(BoxType::Auto))
        .collect();
    // reverse pre-order visits children before parents
    for wrapper in wrappers.into_iter().rev() {
        let mut bounds: Option<(f32, f32, f32, f32)> = None;
        for child in tree.children(wrapper) {
            let g = tree.geometry(child)?;
            bounds = Some(match bounds {
                None => (g.x, g.y, g.right(), g.bottom()),
                Some((l, t, r, b)) => (l.min(g.x), t.min(g.y), r.max(g.right()), b.max(g.bottom())),
            });
        }
        if let Some((left, top, right, bottom)) = bounds {
            let geometry = tree.geometry_mut(wrapper)?;
            geometry.x = left;
            geometry.y = top;
            geometry.width = right - left;
            geometry.height = bottom - top;
        }
    }
    Ok(())
}
