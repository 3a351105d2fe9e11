//! Line packing: chunks into line boxes inside a width window.

use std::collections::VecDeque;

use smallvec::SmallVec;

use crate::chunk::{AlignmentChunk, ChunkIterator};
use crate::config::{PageGrid, EPSILON};
use crate::error::LayoutError;
use crate::render_node::{BoxType, NodeId};
use crate::render_tree::RenderTree;
use crate::sequence::{ElementKind, SequenceList};

/// Horizontal alignment of packed lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    /// Free space goes to the spacers between chunks, except on the last line.
    Justify,
}

/// Usable horizontal extent of a line, in logical page coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineWindow {
    pub start_x: f32,
    pub end_x: f32,
}

impl LineWindow {
    pub fn new(start_x: f32, end_x: f32) -> Self {
        Self {
            start_x,
            end_x: end_x.max(start_x),
        }
    }

    pub fn width(&self) -> f32 {
        self.end_x - self.start_x
    }
}

#[derive(Clone, Copy, Debug)]
struct Placed {
    chunk: AlignmentChunk,
    x: f32,
    /// Moved to a column boundary.
    shifted: bool,
}

/// Packs the chunks of one sequence list into line boxes.
///
/// Lines are produced one at a time by [`next_line`](Self::next_line). Line
/// boxes are created at `y = 0`; the caller stacks them. Nodes end up owned
/// by the line that shows them, spacers trimmed from line edges are freed.
#[derive(Debug)]
pub struct AlignmentProcessor<'a> {
    list: &'a SequenceList,
    chunks: ChunkIterator<'a>,
    pending: VecDeque<AlignmentChunk>,
    window: LineWindow,
    grid: PageGrid,
    align: TextAlign,
    keep_first_line_spacers: bool,
    content_end: usize,
    lines: usize,
}

impl<'a> AlignmentProcessor<'a> {
    pub fn new(
        list: &'a SequenceList,
        window: LineWindow,
        grid: PageGrid,
    ) -> Result<Self, LayoutError> {
        list.ensure_balanced()?;
        let content_end = list
            .elements()
            .iter()
            .rposition(|e| e.kind != ElementKind::Spacer)
            .map_or(0, |index| index + 1);
        Ok(Self {
            list,
            chunks: ChunkIterator::new(list, 0)?,
            pending: VecDeque::new(),
            window,
            grid,
            align: TextAlign::Left,
            keep_first_line_spacers: false,
            content_end,
            lines: 0,
        })
    }

    pub fn with_text_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    /// Exempt the first produced line from leading-spacer suppression.
    pub fn keep_first_line_leading_spacers(mut self, keep: bool) -> Self {
        self.keep_first_line_spacers = keep;
        self
    }

    /// Lines produced so far.
    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn has_more(&self) -> bool {
        !self.pending.is_empty() || self.chunks.has_next()
    }

    fn has_more_content(&self) -> bool {
        self.pending.iter().any(|chunk| !chunk.is_spacer_only())
            || self.chunks.position() < self.content_end
    }

    fn pull(&mut self) -> Option<AlignmentChunk> {
        self.pending.pop_front().or_else(|| self.chunks.next())
    }

    /// Pack and return the next line box, or `None` once every chunk is used.
    pub fn next_line(&mut self, tree: &mut RenderTree) -> Result<Option<NodeId>, LayoutError> {
        loop {
            let keep_leading = self.lines == 0 && self.keep_first_line_spacers;
            let mut line = self.fill_line(tree, keep_leading)?;
            while line.last().is_some_and(|p| p.chunk.is_spacer_only()) {
                if let Some(placed) = line.pop() {
                    self.free_chunk(tree, placed.chunk)?;
                }
            }
            if line.is_empty() {
                if self.has_more() {
                    continue;
                }
                return Ok(None);
            }
            let line_box = self.build_line(tree, &line)?;
            self.lines += 1;
            return Ok(Some(line_box));
        }
    }

    /// Drain the processor into a vector of line boxes.
    pub fn layout_lines(&mut self, tree: &mut RenderTree) -> Result<Vec<NodeId>, LayoutError> {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line(tree)? {
            lines.push(line);
        }
        Ok(lines)
    }

    fn fill_line(
        &mut self,
        tree: &mut RenderTree,
        keep_leading: bool,
    ) -> Result<SmallVec<[Placed; 16]>, LayoutError> {
        let mut line: SmallVec<[Placed; 16]> = SmallVec::new();
        let mut cursor = self.window.start_x;

        while let Some(chunk) = self.pull() {
            if line.is_empty() && chunk.is_spacer_only() && !keep_leading {
                self.free_chunk(tree, chunk)?;
                continue;
            }
            let (x, shifted) = self.place(cursor, &chunk);
            let end = x + chunk.width();
            if end <= self.window.end_x + EPSILON {
                line.push(Placed { chunk, x, shifted });
                cursor = end;
                continue;
            }

            if chunk.is_spacer_only() {
                self.free_chunk(tree, chunk)?;
                if line.is_empty() {
                    continue;
                }
                break;
            }
            if line.is_empty() {
                log::warn!(
                    "chunk of width {:.1} exceeds line window of {:.1}; placing it alone",
                    chunk.width(),
                    self.window.width()
                );
                line.push(Placed { chunk, x, shifted });
                break;
            }
            self.pending.push_front(chunk);
            if let Some(index) = self.best_break(tree, &line)? {
                for placed in line.drain(index + 1..).rev() {
                    self.pending.push_front(placed.chunk);
                }
            }
            break;
        }
        Ok(line)
    }

    /// Start position for `chunk` at `cursor`, moved to the next column if it
    /// would straddle a column boundary and fits there.
    fn place(&self, cursor: f32, chunk: &AlignmentChunk) -> (f32, bool) {
        if chunk.is_spacer_only() {
            return (cursor, false);
        }
        let Some(boundary) = self.grid.next_column_boundary(cursor) else {
            return (cursor, false);
        };
        let width = chunk.width();
        let straddles = cursor < boundary - EPSILON && cursor + width > boundary + EPSILON;
        let fits = width <= self.grid.column_width() + EPSILON
            && boundary + width <= self.window.end_x + EPSILON;
        if straddles && fits {
            (boundary, true)
        } else {
            (cursor, false)
        }
    }

    /// Index of the last spacer chunk with the highest break weight that has
    /// content before it.
    fn best_break(
        &self,
        tree: &RenderTree,
        line: &[Placed],
    ) -> Result<Option<usize>, LayoutError> {
        let mut best: Option<(usize, u8)> = None;
        let mut seen_content = false;
        for (index, placed) in line.iter().enumerate() {
            if !placed.chunk.is_spacer_only() {
                seen_content = true;
                continue;
            }
            if !seen_content {
                continue;
            }
            let weight = self.break_weight(tree, &placed.chunk)?;
            if best.map_or(true, |(_, w)| weight >= w) {
                best = Some((index, weight));
            }
        }
        Ok(best.map(|(index, _)| index))
    }

    fn break_weight(&self, tree: &RenderTree, chunk: &AlignmentChunk) -> Result<u8, LayoutError> {
        let mut weight = 0;
        for element in &self.list.elements()[chunk.range()] {
            if let Some(spacer) = tree.node(element.node)?.as_spacer() {
                weight = weight.max(spacer.break_weight);
            }
        }
        Ok(weight)
    }

    fn free_chunk(&self, tree: &mut RenderTree, chunk: AlignmentChunk) -> Result<(), LayoutError> {
        for element in &self.list.elements()[chunk.range()] {
            if tree.contains(element.node) {
                tree.free_subtree(element.node)?;
            }
        }
        Ok(())
    }

    fn build_line(&self, tree: &mut RenderTree, line: &[Placed]) -> Result<NodeId, LayoutError> {
        let line_box = tree.create_box(BoxType::Line);
        let mut widest = 0.0f32;
        let mut shifted = false;

        for placed in line {
            widest = widest.max(placed.chunk.width());
            shifted |= placed.shifted;
            self.place_chunk(tree, line_box, placed)?;
        }

        let mut height = 0.0f32;
        for child in tree.children(line_box).collect::<SmallVec<[NodeId; 16]>>() {
            height = height.max(tree.geometry(child)?.bottom());
        }
        {
            let geometry = tree.geometry_mut(line_box)?;
            geometry.x = self.window.start_x;
            geometry.y = 0.0;
            geometry.width = self.window.width();
            geometry.height = height;
            geometry.min_chunk_width = widest;
        }

        let used = line
            .last()
            .map_or(self.window.start_x, |p| p.x + p.chunk.width());
        let free = self.window.end_x - used;
        if free > EPSILON && !shifted {
            self.align_line(tree, line_box, free)?;
        }
        log::trace!(
            "line {} packed {} chunks, free {:.1}",
            self.lines,
            line.len(),
            free
        );
        Ok(line_box)
    }

    /// Position the elements of one chunk left to right and move its top-level
    /// nodes into `line_box`.
    fn place_chunk(
        &self,
        tree: &mut RenderTree,
        line_box: NodeId,
        placed: &Placed,
    ) -> Result<(), LayoutError> {
        let mut x = placed.x;
        let mut y = 0.0f32;
        // (inline box, top inset) of every open span
        let mut open: SmallVec<[(NodeId, f32); 4]> = SmallVec::new();

        for element in &self.list.elements()[placed.chunk.range()] {
            let node = element.node;
            if open.is_empty() && element.kind != ElementKind::End {
                tree.detach(node)?;
                tree.add_child(line_box, node)?;
            }
            match element.kind {
                ElementKind::Start => {
                    let geometry = tree.geometry_mut(node)?;
                    geometry.x = x;
                    geometry.y = y;
                    let top = tree.box_data(node)?.insets.top;
                    open.push((node, top));
                    y += top;
                    x += element.min_width;
                }
                ElementKind::End => {
                    x += element.min_width;
                    if let Some((inline, top)) = open.pop() {
                        y -= top;
                        self.close_inline(tree, inline, x)?;
                    }
                }
                ElementKind::Content | ElementKind::Spacer => {
                    if let Some(spacer) = tree.node_mut(node)?.as_spacer_mut() {
                        spacer.extra_width = 0.0;
                    }
                    let geometry = tree.geometry_mut(node)?;
                    geometry.x = x;
                    geometry.y = y;
                    if element.kind == ElementKind::Spacer {
                        geometry.width = element.min_width;
                    }
                    x += element.min_width;
                }
            }
        }
        Ok(())
    }

    fn close_inline(&self, tree: &mut RenderTree, inline: NodeId, right: f32) -> Result<(), LayoutError> {
        let origin = tree.geometry(inline)?;
        let bottom_inset = tree.box_data(inline)?.insets.bottom;
        let mut bottom = origin.y;
        for id in tree.descendants(inline)?.skip(1) {
            let node = tree.node(id)?;
            if !node.is_box() {
                bottom = bottom.max(node.geometry().bottom());
            }
        }
        let geometry = tree.geometry_mut(inline)?;
        geometry.width = (right - origin.x).max(0.0);
        geometry.height = (bottom - origin.y + bottom_inset).max(0.0);
        geometry.min_chunk_width = geometry.width;
        Ok(())
    }

    fn align_line(&self, tree: &mut RenderTree, line_box: NodeId, free: f32) -> Result<(), LayoutError> {
        let children: SmallVec<[NodeId; 16]> = tree.children(line_box).collect();
        match self.align {
            TextAlign::Left => Ok(()),
            TextAlign::Center => {
                for child in children {
                    tree.translate_subtree(child, free / 2.0, 0.0)?;
                }
                Ok(())
            }
            TextAlign::Right => {
                for child in children {
                    tree.translate_subtree(child, free, 0.0)?;
                }
                Ok(())
            }
            TextAlign::Justify => {
                if !self.has_more_content() {
                    return Ok(());
                }
                let spacers = children
                    .iter()
                    .filter(|&&id| tree.get(id).is_some_and(|n| n.is_spacer()))
                    .count();
                if spacers == 0 {
                    return Ok(());
                }
                let extra = free / spacers as f32;
                let mut offset = 0.0f32;
                for child in children {
                    if offset > 0.0 {
                        tree.translate_subtree(child, offset, 0.0)?;
                    }
                    let node = tree.node_mut(child)?;
                    if let Some(spacer) = node.as_spacer_mut() {
                        spacer.extra_width = extra;
                        node.geometry.width += extra;
                        offset += extra;
                    }
                }
                Ok(())
            }
        }
    }
}
