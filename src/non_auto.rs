//! Traversal that looks through auto wrapper boxes.

use core::iter::FusedIterator;

use smallvec::SmallVec;

use crate::render_node::{BoxType, NodeId};
use crate::render_tree::RenderTree;

/// Pre-order walk over the boxes below `start`, descending into auto boxes
/// instead of yielding them. A yielded box's own children are not visited.
/// Leaves are skipped. `start` itself is never yielded.
#[derive(Clone, Debug)]
pub struct NonAutoBoxIterator<'a> {
    tree: &'a RenderTree,
    /// Next sibling to visit at each open auto level.
    stack: SmallVec<[Option<NodeId>; 8]>,
}

impl<'a> NonAutoBoxIterator<'a> {
    pub fn new(tree: &'a RenderTree, start: NodeId) -> Self {
        let mut stack = SmallVec::new();
        stack.push(tree.children(start).next());
        Self { tree, stack }
    }
}

impl Iterator for NonAutoBoxIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            let top = self.stack.last_mut()?;
            let Some(id) = *top else {
                self.stack.pop();
                continue;
            };
            let node = self.tree.get(id)?;
            *top = node.next_sibling();
            match node.box_type() {
                Some(BoxType::Auto) => {
                    self.stack.push(self.tree.children(id).next());
                }
                Some(_) => return Some(id),
                None => {}
            }
        }
    }
}

impl FusedIterator for NonAutoBoxIterator<'_> {}
