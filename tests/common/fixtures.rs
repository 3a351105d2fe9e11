use std::sync::Arc;

use pagebox::{
    BoxType, LayoutConfig, MonospaceMeasurer, NodeId, RenderTree, TextSegmenter, TextStyle,
};

/// Every grapheme is 10px wide, every line 10px tall.
pub const ADVANCE_PX: f32 = 10.0;

pub const PROSE: &str = "The quick brown fox jumps over the lazy dog while the \
sleepy cat watches from the warm windowsill and the kettle starts to sing.";

pub fn style() -> Arc<TextStyle> {
    Arc::new(TextStyle {
        size_px: ADVANCE_PX,
        line_height: 1.0,
        ..TextStyle::default()
    })
}

pub fn segmenter() -> TextSegmenter {
    TextSegmenter::new(Arc::new(MonospaceMeasurer {
        advance_px: ADVANCE_PX,
    }))
}

/// Page with no margins so logical coordinates equal page coordinates.
pub fn bare_config(width: f32, height: f32) -> LayoutConfig {
    LayoutConfig {
        margin_left: 0.0,
        margin_right: 0.0,
        margin_top: 0.0,
        margin_bottom: 0.0,
        block_gap_px: 0.0,
        ..LayoutConfig::for_page(width, height)
    }
}

/// Append a paragraph whose text sits in an auto pool child.
pub fn add_paragraph(tree: &mut RenderTree, parent: NodeId, text: &str) -> NodeId {
    let paragraph = tree.create_box(BoxType::Paragraph);
    let pool = tree.create_box(BoxType::Auto);
    tree.add_child(parent, paragraph)
        .expect("link paragraph should pass");
    tree.add_child(paragraph, pool).expect("link pool should pass");
    let mut segmenter = segmenter();
    segmenter
        .segment_into(tree, pool, text, &style())
        .expect("segment should pass");
    paragraph
}

/// Logical page holding `paragraphs` copies of [`PROSE`].
pub fn prose_document(tree: &mut RenderTree, paragraphs: usize) -> NodeId {
    let page = tree.create_box(BoxType::LogicalPage);
    for _ in 0..paragraphs {
        add_paragraph(tree, page, PROSE);
    }
    page
}

/// Concatenated text of every text leaf under `root`, in tree order, with
/// spacers written as single spaces.
pub fn visible_text(tree: &RenderTree, root: NodeId) -> String {
    let mut out = String::new();
    for id in tree.descendants(root).expect("descendants should pass") {
        let node = tree.node(id).expect("node should exist");
        if let Some(text) = node.as_text() {
            out.push_str(&text.text);
        } else if node.is_spacer() {
            out.push(' ');
        } else if node.box_type() == Some(BoxType::Line) && !out.is_empty() {
            out.push('\n');
        }
    }
    out
}
