//! Pagination shift states.
//!
//! One state per box on the current traversal path. Block-level states add
//! a popped child's shift to their running total immediately. Row-level
//! states keep the largest child shift aside and hand it up only when the
//! row itself pops, so side-by-side children never push each other down.

use crate::error::LayoutError;
use crate::render_node::BoxType;

/// How a box propagates the shifts of its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShiftPropagation {
    /// Children stacked top to bottom: shifts add up.
    Block,
    /// Children side by side: the largest shift wins, once.
    Row,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShiftStateKind {
    /// Root of the stack, shift starts at zero and is never popped.
    Initial,
    BlockLevel,
    RowLevel,
}

impl From<ShiftPropagation> for ShiftStateKind {
    fn from(value: ShiftPropagation) -> Self {
        match value {
            ShiftPropagation::Block => ShiftStateKind::BlockLevel,
            ShiftPropagation::Row => ShiftStateKind::RowLevel,
        }
    }
}

/// Handle to a live shift state. Invalidated by `pop`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShiftStateId {
    depth: usize,
    generation: u32,
}

impl ShiftStateId {
    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[derive(Clone, Copy, Debug)]
struct ShiftSlot {
    kind: ShiftStateKind,
    local: f32,
    /// Largest contribution of a popped child (row states only).
    row_max: f32,
    generation: u32,
}

impl ShiftSlot {
    fn initial() -> Self {
        Self {
            kind: ShiftStateKind::Initial,
            local: 0.0,
            row_max: 0.0,
            generation: 0,
        }
    }
}

/// Depth-indexed pool of shift states forming the active stack.
///
/// Slots are reused across visits; every reuse bumps the slot generation so a
/// handle from an earlier visit is rejected.
#[derive(Clone, Debug)]
pub struct PaginationShiftStatePool {
    slots: Vec<ShiftSlot>,
    /// Depth of the current top state.
    top: usize,
}

impl Default for PaginationShiftStatePool {
    fn default() -> Self {
        Self::new()
    }
}

impl PaginationShiftStatePool {
    pub fn new() -> Self {
        Self::with_depth_capacity(16)
    }

    pub fn with_depth_capacity(depth: usize) -> Self {
        let mut slots = Vec::with_capacity(depth.max(1));
        slots.push(ShiftSlot::initial());
        Self { slots, top: 0 }
    }

    /// Propagation rule for a box type.
    pub fn classify(box_type: BoxType) -> ShiftPropagation {
        match box_type {
            BoxType::Table
            | BoxType::TableCell
            | BoxType::Paragraph
            | BoxType::TableSection
            | BoxType::Block
            | BoxType::Auto
            | BoxType::LogicalPage => ShiftPropagation::Block,
            BoxType::Canvas
            | BoxType::Row
            | BoxType::Inline
            | BoxType::TableRow
            | BoxType::Line => ShiftPropagation::Row,
        }
    }

    /// Handle of the initial state.
    pub fn initial(&self) -> ShiftStateId {
        ShiftStateId {
            depth: 0,
            generation: self.slots[0].generation,
        }
    }

    /// Handle of the state on top of the stack.
    pub fn top(&self) -> ShiftStateId {
        ShiftStateId {
            depth: self.top,
            generation: self.slots[self.top].generation,
        }
    }

    /// Number of states above the initial one.
    pub fn depth(&self) -> usize {
        self.top
    }

    /// Drop every state above the initial one and zero the initial shift.
    pub fn reset(&mut self) {
        for slot in &mut self.slots[1..=self.top] {
            slot.generation = slot.generation.wrapping_add(1);
        }
        self.top = 0;
        let initial = &mut self.slots[0];
        initial.local = 0.0;
        initial.row_max = 0.0;
        initial.generation = initial.generation.wrapping_add(1);
    }

    /// Link a fresh state under `parent`, which must be the top of the stack.
    pub fn reuse(
        &mut self,
        parent: ShiftStateId,
        propagation: ShiftPropagation,
    ) -> Result<ShiftStateId, LayoutError> {
        self.check_live(parent)?;
        if parent.depth != self.top {
            return Err(self.mismatch(parent));
        }
        let depth = self.top + 1;
        if depth == self.slots.len() {
            self.slots.push(ShiftSlot {
                generation: 0,
                ..ShiftSlot::initial()
            });
        }
        let slot = &mut self.slots[depth];
        slot.kind = propagation.into();
        slot.local = 0.0;
        slot.row_max = 0.0;
        slot.generation = slot.generation.wrapping_add(1);
        self.top = depth;
        Ok(ShiftStateId {
            depth,
            generation: slot.generation,
        })
    }

    /// Convenience for `reuse(parent, classify(box_type))`.
    pub fn reuse_for_box(
        &mut self,
        parent: ShiftStateId,
        box_type: BoxType,
    ) -> Result<ShiftStateId, LayoutError> {
        self.reuse(parent, Self::classify(box_type))
    }

    pub fn kind(&self, id: ShiftStateId) -> Result<ShiftStateKind, LayoutError> {
        self.check_live(id)?;
        Ok(self.slots[id.depth].kind)
    }

    /// Shift accumulated by this state alone.
    pub fn local_shift(&self, id: ShiftStateId) -> Result<f32, LayoutError> {
        self.check_live(id)?;
        Ok(self.slots[id.depth].local)
    }

    pub fn increase_shift(&mut self, id: ShiftStateId, delta: f32) -> Result<(), LayoutError> {
        self.check_live(id)?;
        self.slots[id.depth].local += delta;
        Ok(())
    }

    /// Shift the next child of this state starts from: its local shift plus
    /// everything its ancestors report.
    pub fn shift_for_next_child(&self, id: ShiftStateId) -> Result<f32, LayoutError> {
        self.check_live(id)?;
        Ok(self.slots[..=id.depth].iter().map(|slot| slot.local).sum())
    }

    /// Pop the top state and hand its contribution to the parent. Returns the
    /// contribution.
    pub fn pop(&mut self, id: ShiftStateId) -> Result<f32, LayoutError> {
        self.check_live(id)?;
        if id.depth == 0 {
            return Err(LayoutError::PopInitialShiftState);
        }
        if id.depth != self.top {
            return Err(self.mismatch(id));
        }
        let slot = &mut self.slots[id.depth];
        let contribution = match slot.kind {
            ShiftStateKind::RowLevel => slot.local + slot.row_max,
            ShiftStateKind::Initial | ShiftStateKind::BlockLevel => slot.local,
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.top -= 1;

        let parent = &mut self.slots[self.top];
        match parent.kind {
            ShiftStateKind::RowLevel => parent.row_max = parent.row_max.max(contribution),
            ShiftStateKind::Initial | ShiftStateKind::BlockLevel => parent.local += contribution,
        }
        Ok(contribution)
    }

    fn check_live(&self, id: ShiftStateId) -> Result<(), LayoutError> {
        if id.depth > self.top || self.slots[id.depth].generation != id.generation {
            return Err(self.mismatch(id));
        }
        Ok(())
    }

    fn mismatch(&self, id: ShiftStateId) -> LayoutError {
        LayoutError::ShiftStateMismatch {
            depth: id.depth,
            expected_depth: self.top,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_siblings_add_up_in_the_parent() {
        let mut pool = PaginationShiftStatePool::new();
        let root = pool.initial();

        let first = pool.reuse(root, ShiftPropagation::Block).expect("reuse should pass");
        pool.increase_shift(first, 5.0).expect("increase shift should pass");
        assert_eq!(pool.pop(first).expect("pop should pass"), 5.0);

        let second = pool.reuse(root, ShiftPropagation::Block).expect("reuse should pass");
        pool.increase_shift(second, 5.0).expect("increase shift should pass");
        pool.pop(second).expect("pop should pass");

        assert_eq!(
            pool.shift_for_next_child(root).expect("shift for next child should pass"),
            10.0
        );
    }

    #[test]
    fn nested_block_composes_and_contributes_its_local_shift_once() {
        let mut pool = PaginationShiftStatePool::new();
        let root = pool.initial();
        let parent = pool.reuse(root, ShiftPropagation::Block).expect("reuse should pass");
        for _ in 0..2 {
            let child = pool.reuse(parent, ShiftPropagation::Block).expect("reuse should pass");
            pool.increase_shift(child, 5.0).expect("increase shift should pass");
            pool.pop(child).expect("pop should pass");
        }
        assert_eq!(
            pool.shift_for_next_child(parent).expect("shift for next child should pass"),
            10.0
        );

        let nested = pool.reuse(parent, ShiftPropagation::Block).expect("reuse should pass");
        assert_eq!(
            pool.shift_for_next_child(nested).expect("shift for next child should pass"),
            10.0
        );
        pool.increase_shift(nested, 5.0).expect("increase shift should pass");
        assert_eq!(
            pool.shift_for_next_child(nested).expect("shift for next child should pass"),
            15.0
        );
        assert_eq!(pool.pop(nested).expect("pop should pass"), 5.0);

        assert_eq!(
            pool.shift_for_next_child(parent).expect("shift for next child should pass"),
            15.0
        );
        assert_eq!(pool.pop(parent).expect("pop should pass"), 15.0);
        assert_eq!(
            pool.shift_for_next_child(root).expect("shift for next child should pass"),
            15.0
        );
    }

    #[test]
    fn row_children_share_the_row_shift_until_the_row_pops() {
        let mut pool = PaginationShiftStatePool::new();
        let root = pool.initial();
        let parent = pool.reuse(root, ShiftPropagation::Block).expect("reuse should pass");
        pool.increase_shift(parent, 2.0).expect("increase shift should pass");
        let row = pool.reuse(parent, ShiftPropagation::Row).expect("reuse should pass");

        let left = pool.reuse(row, ShiftPropagation::Block).expect("reuse should pass");
        assert_eq!(pool.shift_for_next_child(left).expect("shift for next child should pass"), 2.0);
        pool.increase_shift(left, 7.0).expect("increase shift should pass");
        pool.pop(left).expect("pop should pass");

        let right = pool.reuse(row, ShiftPropagation::Block).expect("reuse should pass");
        assert_eq!(
            pool.shift_for_next_child(right).expect("shift for next child should pass"),
            2.0
        );
        pool.increase_shift(right, 3.0).expect("increase shift should pass");
        pool.pop(right).expect("pop should pass");

        assert_eq!(pool.shift_for_next_child(row).expect("shift for next child should pass"), 2.0);
        assert_eq!(pool.local_shift(parent).expect("local shift should pass"), 2.0);

        assert_eq!(pool.pop(row).expect("pop should pass"), 7.0);
        assert_eq!(pool.local_shift(parent).expect("local shift should pass"), 9.0);
    }

    #[test]
    fn row_children_increasing_the_row_see_the_shared_total() {
        let mut pool = PaginationShiftStatePool::new();
        let root = pool.initial();
        let parent = pool.reuse(root, ShiftPropagation::Block).expect("reuse should pass");
        let row = pool.reuse(parent, ShiftPropagation::Row).expect("reuse should pass");

        let left = pool.reuse(row, ShiftPropagation::Block).expect("reuse should pass");
        pool.increase_shift(row, 3.0).expect("increase shift should pass");
        assert_eq!(
            pool.shift_for_next_child(left).expect("shift for next child should pass"),
            3.0
        );
        // siblings share one depth slot, so the next one opens only after this pops
        assert!(pool.reuse(row, ShiftPropagation::Block).is_err());
        assert_eq!(pool.local_shift(parent).expect("local shift should pass"), 0.0);
        assert_eq!(pool.pop(left).expect("pop should pass"), 0.0);
        assert_eq!(pool.local_shift(parent).expect("local shift should pass"), 0.0);

        let right = pool.reuse(row, ShiftPropagation::Block).expect("reuse should pass");
        assert_eq!(
            pool.shift_for_next_child(right).expect("shift for next child should pass"),
            3.0
        );
        pool.increase_shift(row, 5.0).expect("increase shift should pass");
        assert_eq!(
            pool.shift_for_next_child(right).expect("shift for next child should pass"),
            8.0
        );
        assert!(pool.shift_for_next_child(left).is_err());
        assert_eq!(pool.local_shift(parent).expect("local shift should pass"), 0.0);
        pool.pop(right).expect("pop should pass");

        assert_eq!(pool.local_shift(row).expect("local shift should pass"), 8.0);
        assert_eq!(pool.local_shift(parent).expect("local shift should pass"), 0.0);
        assert_eq!(pool.pop(row).expect("pop should pass"), 8.0);
        assert_eq!(pool.local_shift(parent).expect("local shift should pass"), 8.0);
        assert_eq!(
            pool.shift_for_next_child(parent).expect("shift for next child should pass"),
            8.0
        );
    }

    #[test]
    fn nested_rows_fold_into_the_maximum() {
        let mut pool = PaginationShiftStatePool::new();
        let root = pool.initial();
        let outer = pool.reuse(root, ShiftPropagation::Row).expect("reuse should pass");
        let inner = pool.reuse(outer, ShiftPropagation::Row).expect("reuse should pass");
        let cell = pool.reuse(inner, ShiftPropagation::Block).expect("reuse should pass");
        pool.increase_shift(cell, 4.0).expect("increase shift should pass");
        pool.pop(cell).expect("pop should pass");
        pool.increase_shift(inner, 1.0).expect("increase shift should pass");
        assert_eq!(pool.pop(inner).expect("pop should pass"), 5.0);
        let sibling = pool.reuse(outer, ShiftPropagation::Block).expect("reuse should pass");
        pool.increase_shift(sibling, 3.0).expect("increase shift should pass");
        pool.pop(sibling).expect("pop should pass");
        assert_eq!(pool.pop(outer).expect("pop should pass"), 5.0);
        assert_eq!(pool.shift_for_next_child(root).expect("shift for next child should pass"), 5.0);
    }

    #[test]
    fn stale_and_out_of_order_handles_are_rejected() {
        let mut pool = PaginationShiftStatePool::new();
        let root = pool.initial();
        let parent = pool.reuse(root, ShiftPropagation::Block).expect("reuse should pass");
        let child = pool.reuse(parent, ShiftPropagation::Block).expect("reuse should pass");

        assert_eq!(
            pool.pop(parent),
            Err(LayoutError::ShiftStateMismatch {
                depth: 1,
                expected_depth: 2
            })
        );
        assert!(pool.reuse(parent, ShiftPropagation::Row).is_err());

        pool.pop(child).expect("pop should pass");
        assert!(pool.shift_for_next_child(child).is_err());
        assert!(pool.increase_shift(child, 1.0).is_err());

        let again = pool.reuse(parent, ShiftPropagation::Row).expect("reuse should pass");
        assert_eq!(again.depth(), child.depth());
        assert!(pool.pop(child).is_err());
        assert_eq!(pool.kind(again).expect("kind should pass"), ShiftStateKind::RowLevel);
    }

    #[test]
    fn initial_state_cannot_be_popped() {
        let mut pool = PaginationShiftStatePool::new();
        let root = pool.initial();
        assert_eq!(pool.pop(root), Err(LayoutError::PopInitialShiftState));
        assert_eq!(pool.kind(root).expect("kind should pass"), ShiftStateKind::Initial);
    }

    #[test]
    fn reset_invalidates_every_handle() {
        let mut pool = PaginationShiftStatePool::new();
        let root = pool.initial();
        let child = pool.reuse(root, ShiftPropagation::Block).expect("reuse should pass");
        pool.increase_shift(root, 3.0).expect("increase shift should pass");
        pool.reset();
        assert!(pool.local_shift(root).is_err());
        assert!(pool.local_shift(child).is_err());
        assert_eq!(
            pool.shift_for_next_child(pool.initial()).expect("shift for next child should pass"),
            0.0
        );
        assert_eq!(pool.depth(), 0);
    }

    #[test]
    fn classification_covers_every_box_type() {
        let blocks: Vec<BoxType> = BoxType::ALL
            .into_iter()
            .filter(|t| PaginationShiftStatePool::classify(*t) == ShiftPropagation::Block)
            .collect();
        assert_eq!(
            blocks,
            vec![
                BoxType::Block,
                BoxType::Paragraph,
                BoxType::Table,
                BoxType::TableSection,
                BoxType::TableCell,
                BoxType::Auto,
                BoxType::LogicalPage,
            ]
        );
    }
}
