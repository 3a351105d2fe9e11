//! Atomic chunking of an inline sequence.
//!
//! A chunk is the smallest run of elements line packing must keep together.
//! Nesting is tracked with a plain depth counter; the input is flat.

use core::iter::FusedIterator;
use core::ops::Range;

use crate::error::LayoutError;
use crate::sequence::{ElementKind, SequenceList};

/// Contiguous `[start, end)` span of a [`SequenceList`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlignmentChunk {
    start: usize,
    end: usize,
    width: f32,
    spacer_only: bool,
}

impl AlignmentChunk {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Sum of the element minimum widths.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// `true` if every element is a spacer.
    pub fn is_spacer_only(&self) -> bool {
        self.spacer_only
    }
}

/// Forward-only chunk cursor over a sequence list.
#[derive(Clone, Debug)]
pub struct ChunkIterator<'a> {
    list: &'a SequenceList,
    position: usize,
}

impl<'a> ChunkIterator<'a> {
    /// Start chunking at `offset`, which must be a depth-0 position of `list`.
    pub fn new(list: &'a SequenceList, offset: usize) -> Result<Self, LayoutError> {
        match list.depth_at(offset) {
            Some(0) => Ok(Self {
                list,
                position: offset,
            }),
            _ => Err(LayoutError::InvalidChunkOffset {
                offset,
                len: list.len(),
            }),
        }
    }

    pub fn has_next(&self) -> bool {
        self.position < self.list.len()
    }

    /// Index of the first element of the next chunk.
    pub fn position(&self) -> usize {
        self.position
    }

    fn starts_span(&self, index: usize) -> bool {
        matches!(
            self.list.get(index).map(|e| e.kind),
            Some(ElementKind::Start)
        )
    }
}

impl Iterator for ChunkIterator<'_> {
    type Item = AlignmentChunk;

    fn next(&mut self) -> Option<AlignmentChunk> {
        let elements = self.list.elements();
        if self.position >= elements.len() {
            return None;
        }
        let start = self.position;
        let mut depth = 0usize;
        let mut width = 0.0f32;
        let mut spacer_only = true;

        while self.position < elements.len() {
            let element = elements[self.position];
            self.position += 1;
            width += element.min_width;
            match element.kind {
                ElementKind::Spacer => {
                    if depth == 0 {
                        break;
                    }
                }
                ElementKind::Content => {
                    spacer_only = false;
                    if depth == 0 && !self.starts_span(self.position) {
                        break;
                    }
                }
                ElementKind::Start => {
                    spacer_only = false;
                    depth += 1;
                }
                ElementKind::End => {
                    spacer_only = false;
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                }
            }
        }

        Some(AlignmentChunk {
            start,
            end: self.position,
            width,
            spacer_only,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.list.len() - self.position;
        (usize::from(remaining > 0), Some(remaining))
    }
}

impl FusedIterator for ChunkIterator<'_> {}
