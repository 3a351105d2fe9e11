//! Paginated render-box layout.
//!
//! `pagebox` turns a tree of styled content into positioned boxes spread over
//! physical pages. Text runs are segmented into text and spacer leaves, packed
//! into line boxes, the page box is laid out top to bottom, and a pagination
//! pass pushes unbreakable content below page boundaries.
//!
//! ```
//! use std::sync::Arc;
//!
//! use pagebox::{
//!     BoxType, LayoutConfig, LayoutEngine, MonospaceMeasurer, PageGrid, PaginationPass,
//!     RenderTree, TextSegmenter, TextStyle,
//! };
//!
//! # fn main() -> Result<(), pagebox::LayoutError> {
//! let config = LayoutConfig::for_page(300.0, 200.0);
//! let mut tree = RenderTree::new();
//! let page = tree.create_box(BoxType::LogicalPage);
//! let paragraph = tree.create_box(BoxType::Paragraph);
//! let pool = tree.create_box(BoxType::Auto);
//! tree.add_child(page, paragraph)?;
//! tree.add_child(paragraph, pool)?;
//!
//! let mut segmenter = TextSegmenter::new(Arc::new(MonospaceMeasurer { advance_px: 8.0 }));
//! let style = Arc::new(TextStyle::default());
//! segmenter.segment_into(&mut tree, pool, "Lines are packed greedily.", &style)?;
//!
//! LayoutEngine::new(config).layout(&mut tree, page)?;
//! let summary = PaginationPass::new(PageGrid::from_config(&config)).run(&mut tree, page)?;
//! assert_eq!(summary.page_count, 1);
//! tree.validate(page)?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod alignment;
mod chunk;
mod config;
mod error;
mod layout;
mod non_auto;
mod pagination;
mod paragraph;
mod render_node;
mod render_tree;
mod sequence;
mod shift_state;
mod text;

pub use alignment::{AlignmentProcessor, LineWindow, TextAlign};
pub use chunk::{AlignmentChunk, ChunkIterator};
pub use config::{LayoutConfig, PageGrid};
pub use error::LayoutError;
pub use layout::LayoutEngine;
pub use non_auto::NonAutoBoxIterator;
pub use pagination::{PaginationPass, PaginationSummary};
pub use paragraph::ParagraphLayout;
pub use render_node::{
    BoxData, BoxType, Geometry, InstanceId, Insets, NodeId, NodeKind, NodeType, RenderNode,
    RenderableText, SpacerNode,
};
pub use render_tree::{Children, Descendants, RenderTree};
pub use sequence::{ElementKind, InlineSequenceElement, SequenceList};
pub use shift_state::{
    PaginationShiftStatePool, ShiftPropagation, ShiftStateId, ShiftStateKind,
};
pub use text::{
    HeuristicTextMeasurer, MonospaceMeasurer, TextExtents, TextMeasurer, TextSegmenter,
    TextStyle, WhiteSpace,
};
