//! Paragraph layout: inline content to stacked line boxes.

use smallvec::SmallVec;

use crate::alignment::{AlignmentProcessor, LineWindow, TextAlign};
use crate::config::{LayoutConfig, PageGrid};
use crate::error::LayoutError;
use crate::render_node::{BoxType, NodeId};
use crate::render_tree::RenderTree;
use crate::sequence::SequenceList;

/// Packs a paragraph's inline content into lines and stacks them.
///
/// The inline content is either held in a single auto "pool" child, which is
/// swapped for the lines, or sits directly in the paragraph. A paragraph whose
/// children are already lines is only re-stacked.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParagraphLayout {
    grid: PageGrid,
    text_align: TextAlign,
    keep_first_line_spacers: bool,
}

impl ParagraphLayout {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            grid: PageGrid::from_config(config),
            text_align: config.text_align,
            keep_first_line_spacers: config.keep_first_line_leading_spacers,
        }
    }

    pub fn with_grid(mut self, grid: PageGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Lay out `paragraph` in the column `[x, x + width)` with its top at
    /// `y`. Returns the paragraph's height.
    pub fn layout(
        &self,
        tree: &mut RenderTree,
        paragraph: NodeId,
        x: f32,
        y: f32,
        width: f32,
    ) -> Result<f32, LayoutError> {
        let data = tree.box_data(paragraph)?;
        let insets = data.insets;
        let align = data.text_align.unwrap_or(self.text_align);
        let window = LineWindow::new(x + insets.left, x + width - insets.right);

        let children: SmallVec<[NodeId; 8]> = tree.children(paragraph).collect();
        let already_packed = !children.is_empty()
            && children
                .iter()
                .all(|&id| tree.get(id).and_then(|n| n.box_type()) == Some(BoxType::Line));

        let lines: SmallVec<[NodeId; 8]> = if already_packed {
            children
        } else {
            let pool = match children.as_slice() {
                [only] if tree.get(*only).and_then(|n| n.box_type()) == Some(BoxType::Auto) => {
                    Some(*only)
                }
                _ => None,
            };
            let container = pool.unwrap_or(paragraph);
            let list = SequenceList::from_inline_content(tree, container)?;
            let lines = AlignmentProcessor::new(&list, window, self.grid)?
                .with_text_align(align)
                .keep_first_line_leading_spacers(self.keep_first_line_spacers)
                .layout_lines(tree)?;

            match pool {
                Some(pool) => {
                    tree.replace_childs(paragraph, pool, &lines)?;
                    tree.free_subtree(pool)?;
                }
                None => {
                    // only emptied auto wrappers are still linked here
                    for leftover in children {
                        if tree.get(leftover).and_then(|n| n.parent()) == Some(paragraph) {
                            tree.free_subtree(leftover)?;
                        }
                    }
                    for &line in &lines {
                        tree.add_child(paragraph, line)?;
                    }
                }
            }
            log::debug!("paragraph {:?}: {} lines", paragraph, lines.len());
            lines.into_iter().collect()
        };

        let mut cursor = y + insets.top;
        let mut widest = 0.0f32;
        for line in lines {
            let geometry = tree.geometry(line)?;
            tree.translate_subtree(line, window.start_x - geometry.x, cursor - geometry.y)?;
            cursor += geometry.height;
            widest = widest.max(geometry.min_chunk_width);
        }

        let height = cursor + insets.bottom - y;
        let geometry = tree.geometry_mut(paragraph)?;
        geometry.x = x;
        geometry.y = y;
        geometry.width = width.max(0.0);
        geometry.height = height.max(0.0);
        geometry.min_chunk_width = widest + insets.horizontal();
        Ok(geometry.height)
    }
}
