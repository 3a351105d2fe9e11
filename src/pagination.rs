//! Pagination pass: pushes unbreakable content below page boundaries.

use smallvec::SmallVec;

use crate::config::{PageGrid, EPSILON};
use crate::error::LayoutError;
use crate::render_node::{BoxType, NodeId, NodeKind};
use crate::render_tree::RenderTree;
use crate::shift_state::{PaginationShiftStatePool, ShiftPropagation, ShiftStateId};

/// Outcome of one pagination pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PaginationSummary {
    /// Physical page rows the page box spans after shifting.
    pub page_count: usize,
    /// Atomic nodes moved to a page boundary.
    pub pushes: usize,
    /// Total growth of the page box.
    pub total_shift: f32,
}

struct Frame {
    node: NodeId,
    state: ShiftStateId,
    next_child: Option<NodeId>,
}

/// Walks a laid-out page box with the shift-state stack.
///
/// Each node first moves by the shift its parent reports for the next child.
/// An atomic node straddling a page boundary is pushed to the boundary and
/// the push is handed to its parent like a popped child's shift. Breakable
/// boxes grow by the shift they propagate when popped.
#[derive(Clone, Debug)]
pub struct PaginationPass {
    grid: PageGrid,
    pool: PaginationShiftStatePool,
}

impl PaginationPass {
    pub fn new(grid: PageGrid) -> Self {
        Self {
            grid,
            pool: PaginationShiftStatePool::new(),
        }
    }

    pub fn grid(&self) -> PageGrid {
        self.grid
    }

    pub fn run(&mut self, tree: &mut RenderTree, page: NodeId) -> Result<PaginationSummary, LayoutError> {
        let page_type = tree.box_type(page)?;
        self.pool.reset();
        let initial = self.pool.initial();
        let root_state = self.pool.reuse_for_box(initial, page_type)?;
        let mut frames: SmallVec<[Frame; 32]> = SmallVec::new();
        frames.push(Frame {
            node: page,
            state: root_state,
            next_child: tree.first_child(page)?,
        });
        let mut pushes = 0usize;

        while let Some(frame) = frames.last_mut() {
            let Some(child) = frame.next_child else {
                let node = frame.node;
                let state = frame.state;
                frames.pop();
                let contribution = self.pool.pop(state)?;
                if contribution > 0.0 {
                    tree.geometry_mut(node)?.height += contribution;
                    log::trace!("box {:?} grows by {:.1}", node, contribution);
                }
                continue;
            };
            let parent_state = frame.state;
            frame.next_child = tree.node(child)?.next_sibling();

            let shift = self.pool.shift_for_next_child(parent_state)?;
            if self.is_atomic(tree, child)? {
                if shift != 0.0 {
                    tree.translate_subtree(child, 0.0, shift)?;
                }
                if self.push_atomic(tree, child, parent_state)? {
                    pushes += 1;
                }
                continue;
            }

            if shift != 0.0 {
                tree.geometry_mut(child)?.y += shift;
            }
            let box_type = tree.box_type(child)?;
            let state = self.pool.reuse_for_box(parent_state, box_type)?;
            frames.push(Frame {
                node: child,
                state,
                next_child: tree.first_child(child)?,
            });
        }

        let total_shift = self.pool.shift_for_next_child(initial)?;
        let page_geometry = tree.geometry(page)?;
        let summary = PaginationSummary {
            page_count: self.grid.page_count(page_geometry.bottom()),
            pushes,
            total_shift,
        };
        log::debug!(
            "paginated {:?}: {} pages, {} pushes, shift {:.1}",
            page,
            summary.page_count,
            summary.pushes,
            summary.total_shift
        );
        Ok(summary)
    }

    /// Atomic nodes are never split across pages: leaves, lines, canvases,
    /// childless boxes and keep-together boxes that fit on one page.
    fn is_atomic(&self, tree: &RenderTree, id: NodeId) -> Result<bool, LayoutError> {
        let node = tree.node(id)?;
        let NodeKind::Box(data) = node.kind() else {
            return Ok(true);
        };
        Ok(match data.box_type {
            BoxType::Line | BoxType::Canvas => true,
            _ => {
                data.first_child().is_none()
                    || (data.keep_together
                        && node.geometry().height <= self.grid.page_height() + EPSILON)
            }
        })
    }

    /// Push `id` to the boundary it straddles. Returns `true` if it moved.
    fn push_atomic(
        &mut self,
        tree: &mut RenderTree,
        id: NodeId,
        parent_state: ShiftStateId,
    ) -> Result<bool, LayoutError> {
        let geometry = tree.geometry(id)?;
        let Some(boundary) = self.grid.straddled_boundary(geometry.y, geometry.bottom()) else {
            return Ok(false);
        };
        if geometry.height > self.grid.page_height() + EPSILON {
            log::warn!(
                "node {:?} is taller than a page ({:.1} > {:.1}); leaving it in place",
                id,
                geometry.height,
                self.grid.page_height()
            );
            return Ok(false);
        }
        let delta = boundary - geometry.y;
        tree.translate_subtree(id, 0.0, delta)?;
        let push = self.pool.reuse(parent_state, ShiftPropagation::Block)?;
        self.pool.increase_shift(push, delta)?;
        self.pool.pop(push)?;
        log::trace!("pushed {:?} by {:.1} to page boundary {:.1}", id, delta, boundary);
        Ok(true)
    }
}
