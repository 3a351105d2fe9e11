//! Flat inline sequence fed to chunking and line packing.

use crate::error::LayoutError;
use crate::render_node::{BoxType, NodeId, NodeKind};
use crate::render_tree::RenderTree;

/// Classification of one inline sequence element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Opening edge of an inline box.
    Start,
    /// Unbreakable content: a text run or an atomic inline box.
    Content,
    /// Closing edge of an inline box opened by a matching `Start`.
    End,
    /// Breakable whitespace.
    Spacer,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InlineSequenceElement {
    pub kind: ElementKind,
    pub node: NodeId,
    /// Width this element occupies on a line. For `Start`/`End` this is the
    /// inline box's left/right inset.
    pub min_width: f32,
}

/// Ordered inline elements with balanced `Start`/`End` nesting.
///
/// An `End` without an open `Start` is rejected when pushed. Open markers are
/// allowed while the list is being built; [`ensure_balanced`](Self::ensure_balanced)
/// checks the finished list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SequenceList {
    elements: Vec<InlineSequenceElement>,
    depth: usize,
}

impl SequenceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
            depth: 0,
        }
    }

    pub fn push(
        &mut self,
        kind: ElementKind,
        node: NodeId,
        min_width: f32,
    ) -> Result<(), LayoutError> {
        if !min_width.is_finite() || min_width < 0.0 {
            return Err(LayoutError::NonFiniteGeometry {
                node,
                field: "min_width",
                value: min_width,
            });
        }
        match kind {
            ElementKind::Start => self.depth += 1,
            ElementKind::End => {
                if self.depth == 0 {
                    return Err(LayoutError::UnbalancedSequence {
                        index: self.elements.len(),
                        depth: 0,
                    });
                }
                self.depth -= 1;
            }
            ElementKind::Content | ElementKind::Spacer => {}
        }
        self.elements.push(InlineSequenceElement {
            kind,
            node,
            min_width,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&InlineSequenceElement> {
        self.elements.get(index)
    }

    pub fn elements(&self) -> &[InlineSequenceElement] {
        &self.elements
    }

    /// Number of `Start` markers still open at the end of the list.
    pub fn open_depth(&self) -> usize {
        self.depth
    }

    pub fn is_balanced(&self) -> bool {
        self.depth == 0
    }

    pub fn ensure_balanced(&self) -> Result<(), LayoutError> {
        if self.depth == 0 {
            Ok(())
        } else {
            Err(LayoutError::UnbalancedSequence {
                index: self.elements.len(),
                depth: self.depth,
            })
        }
    }

    /// Nesting depth right before `offset`, or `None` past the end.
    pub fn depth_at(&self, offset: usize) -> Option<usize> {
        if offset > self.elements.len() {
            return None;
        }
        let mut depth = 0usize;
        for element in &self.elements[..offset] {
            match element.kind {
                ElementKind::Start => depth += 1,
                ElementKind::End => depth = depth.saturating_sub(1),
                ElementKind::Content | ElementKind::Spacer => {}
            }
        }
        Some(depth)
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.depth = 0;
    }

    /// Flatten the inline content held by `container` into a sequence.
    ///
    /// Inline boxes become `Start`, their content, `End`. Auto boxes are
    /// transparent. Any other box is a single atomic `Content` element.
    pub fn from_inline_content(tree: &RenderTree, container: NodeId) -> Result<Self, LayoutError> {
        let mut list = Self::with_capacity(tree.child_count(container));
        // (next sibling to visit, inline box to close when the level ends)
        let mut stack: Vec<(Option<NodeId>, Option<NodeId>)> =
            vec![(tree.box_data(container)?.first_child(), None)];

        while let Some(&(cursor, closing)) = stack.last() {
            let Some(id) = cursor else {
                stack.pop();
                if let Some(inline) = closing {
                    let right = tree.box_data(inline)?.insets.right;
                    list.push(ElementKind::End, inline, right)?;
                }
                continue;
            };
            let node = tree.node(id)?;
            let top = stack.len() - 1;
            stack[top].0 = node.next_sibling();

            match node.kind() {
                NodeKind::Text(_) => {
                    list.push(ElementKind::Content, id, node.geometry().min_chunk_width)?;
                }
                NodeKind::Spacer(spacer) => {
                    list.push(ElementKind::Spacer, id, spacer.min_width)?;
                }
                NodeKind::Box(data) => match data.box_type {
                    BoxType::Inline => {
                        list.push(ElementKind::Start, id, data.insets.left)?;
                        stack.push((data.first_child(), Some(id)));
                    }
                    BoxType::Auto => stack.push((data.first_child(), None)),
                    _ => {
                        let geometry = node.geometry();
                        let width = geometry.width.max(geometry.min_chunk_width);
                        list.push(ElementKind::Content, id, width)?;
                    }
                },
            }
        }
        Ok(list)
    }
}
