//! Renderable text segmentation.
//!
//! Turns runs of text into text and spacer leaves. Break opportunities come
//! from UAX #14 and are only honoured on grapheme cluster boundaries, so a
//! combining sequence or an emoji ZWJ sequence never ends up split across two
//! leaves.

use std::collections::BTreeSet;
use std::sync::Arc;

use unicode_linebreak::{linebreaks, BreakOpportunity};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::LayoutError;
use crate::render_node::{NodeId, SpacerNode};
use crate::render_tree::RenderTree;

/// Whitespace handling for a text run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WhiteSpace {
    /// Runs of whitespace collapse into one spacer; leading whitespace of a
    /// paragraph is dropped.
    #[default]
    Collapse,
    /// Every whitespace grapheme becomes its own spacer.
    Preserve,
    /// Whitespace is dropped; it still ends the current word.
    Discard,
}

/// Resolved text style attached to text leaves.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    pub family: String,
    pub size_px: f32,
    pub weight: u16,
    pub italic: bool,
    /// Line height as a multiple of `size_px`.
    pub line_height: f32,
    pub letter_spacing: f32,
    pub white_space: WhiteSpace,
}

impl TextStyle {
    pub fn line_height_px(&self) -> f32 {
        (self.size_px * self.line_height).max(0.0)
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            family: "serif".to_string(),
            size_px: 16.0,
            weight: 400,
            italic: false,
            line_height: 1.2,
            letter_spacing: 0.0,
            white_space: WhiteSpace::Collapse,
        }
    }
}

/// Minimum and maximum advance of a measured run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextExtents {
    pub min_width: f32,
    pub max_width: f32,
}

/// Font metrics collaborator.
///
/// Implementations must be pure: the same text and style always measure the
/// same. Widths must be finite and non-negative.
pub trait TextMeasurer: Send + Sync {
    /// Advance width of `text` rendered with `style`.
    fn measure_text_px(&self, text: &str, style: &TextStyle) -> f32;

    /// Minimum/maximum width pair. Defaults to the plain advance for both.
    fn text_extents(&self, text: &str, style: &TextStyle) -> TextExtents {
        let width = self.measure_text_px(text, style);
        TextExtents {
            min_width: width,
            max_width: width,
        }
    }
}

/// Glyph-class width estimate used when no font backend is installed.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicTextMeasurer;

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure_text_px(&self, text: &str, style: &TextStyle) -> f32 {
        let family = style.family.to_ascii_lowercase();
        let monospace = family.contains("mono") || family.contains("fixed");
        let mut em = 0.0f32;
        let mut glyphs = 0usize;
        for ch in text.chars() {
            glyphs += 1;
            em += if monospace {
                0.6
            } else {
                proportional_em_width(ch)
            };
        }
        if glyphs == 0 {
            return 0.0;
        }
        let mut scale = 1.0;
        if style.weight >= 700 {
            scale += 0.04;
        }
        if style.italic {
            scale += 0.01;
        }
        em * style.size_px * scale + (glyphs as f32 - 1.0) * style.letter_spacing
    }
}

fn proportional_em_width(ch: char) -> f32 {
    match ch {
        ' ' | '\u{00A0}' => 0.3,
        '\t' => 1.2,
        'i' | 'j' | 'l' | 'I' | '|' | '!' | '.' | ',' | ':' | ';' | '\'' => 0.25,
        'f' | 'r' | 't' | '-' | '(' | ')' | '[' | ']' => 0.33,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.78,
        c if c.is_ascii_uppercase() => 0.66,
        c if c.is_ascii_digit() || c.is_ascii_lowercase() => 0.52,
        c if c.is_ascii_punctuation() => 0.4,
        _ => 0.6,
    }
}

/// Every grapheme cluster advances by the same amount, whitespace included.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonospaceMeasurer {
    pub advance_px: f32,
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure_text_px(&self, text: &str, _style: &TextStyle) -> f32 {
        text.graphemes(true).count() as f32 * self.advance_px
    }
}

/// Converts text runs into text and spacer leaves.
///
/// Collapse state carries over between calls so a paragraph delivered as
/// several runs collapses whitespace across run boundaries. Call
/// [`begin_paragraph`](Self::begin_paragraph) between paragraphs.
pub struct TextSegmenter {
    measurer: Arc<dyn TextMeasurer>,
    after_whitespace: bool,
}

impl core::fmt::Debug for TextSegmenter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TextSegmenter")
            .field("after_whitespace", &self.after_whitespace)
            .finish()
    }
}

impl TextSegmenter {
    pub fn new(measurer: Arc<dyn TextMeasurer>) -> Self {
        Self {
            measurer,
            after_whitespace: true,
        }
    }

    pub fn measurer(&self) -> &Arc<dyn TextMeasurer> {
        &self.measurer
    }

    /// Reset collapse state; leading whitespace of the next run is dropped.
    pub fn begin_paragraph(&mut self) {
        self.after_whitespace = true;
    }

    /// Segment `text` into new, unlinked leaves in reading order.
    pub fn segment(
        &mut self,
        tree: &mut RenderTree,
        text: &str,
        style: &Arc<TextStyle>,
    ) -> Result<Vec<NodeId>, LayoutError> {
        let mut out = Vec::with_capacity(text.len() / 4 + 1);
        let breaks: BTreeSet<usize> = linebreaks(text)
            .filter(|(offset, kind)| {
                *kind == BreakOpportunity::Allowed && *offset > 0 && *offset < text.len()
            })
            .map(|(offset, _)| offset)
            .collect();
        let height = style.line_height_px();
        let mut word_start: Option<usize> = None;

        for (offset, grapheme) in text.grapheme_indices(true) {
            if is_breaking_whitespace(grapheme) {
                if let Some(start) = word_start.take() {
                    self.push_text(tree, &mut out, &text[start..offset], style, height)?;
                }
                self.push_whitespace(tree, &mut out, grapheme, style, height)?;
                continue;
            }
            if let Some(start) = word_start {
                if breaks.contains(&offset) {
                    self.push_text(tree, &mut out, &text[start..offset], style, height)?;
                    word_start = Some(offset);
                }
            } else {
                word_start = Some(offset);
            }
        }
        if let Some(start) = word_start {
            self.push_text(tree, &mut out, &text[start..], style, height)?;
        }
        Ok(out)
    }

    /// Segment `text` and append the leaves to `parent`.
    pub fn segment_into(
        &mut self,
        tree: &mut RenderTree,
        parent: NodeId,
        text: &str,
        style: &Arc<TextStyle>,
    ) -> Result<usize, LayoutError> {
        tree.box_data(parent)?;
        let nodes = self.segment(tree, text, style)?;
        for &node in &nodes {
            tree.add_child(parent, node)?;
        }
        Ok(nodes.len())
    }

    fn push_text(
        &mut self,
        tree: &mut RenderTree,
        out: &mut Vec<NodeId>,
        text: &str,
        style: &Arc<TextStyle>,
        height: f32,
    ) -> Result<(), LayoutError> {
        let extents = self.checked_extents(text, style)?;
        let node = tree.create_text(text, Arc::clone(style), extents.max_width, height);
        tree.geometry_mut(node)?.min_chunk_width = extents.min_width;
        out.push(node);
        self.after_whitespace = false;
        Ok(())
    }

    fn push_whitespace(
        &mut self,
        tree: &mut RenderTree,
        out: &mut Vec<NodeId>,
        grapheme: &str,
        style: &Arc<TextStyle>,
        height: f32,
    ) -> Result<(), LayoutError> {
        match style.white_space {
            WhiteSpace::Discard => Ok(()),
            WhiteSpace::Collapse => {
                if self.after_whitespace {
                    return Ok(());
                }
                let width = self.checked_extents(" ", style)?.min_width;
                out.push(tree.create_spacer(SpacerNode::new(width), height));
                self.after_whitespace = true;
                Ok(())
            }
            WhiteSpace::Preserve => {
                let width = self.checked_extents(grapheme, style)?.min_width;
                let mut spacer = SpacerNode::new(width);
                spacer.break_weight = SpacerNode::PRESERVED_BREAK_WEIGHT;
                out.push(tree.create_spacer(spacer, height));
                self.after_whitespace = true;
                Ok(())
            }
        }
    }

    fn checked_extents(&self, text: &str, style: &TextStyle) -> Result<TextExtents, LayoutError> {
        let extents = self.measurer.text_extents(text, style);
        for width in [extents.min_width, extents.max_width] {
            if !width.is_finite() || width < 0.0 {
                return Err(LayoutError::InvalidMeasurement {
                    text: text.to_string(),
                    width,
                });
            }
        }
        Ok(TextExtents {
            min_width: extents.min_width.min(extents.max_width),
            max_width: extents.max_width.max(extents.min_width),
        })
    }
}

/// Whitespace that offers a break. No-break spaces stay part of the word.
fn is_breaking_whitespace(grapheme: &str) -> bool {
    grapheme
        .chars()
        .all(|c| c.is_whitespace() && !matches!(c, '\u{00A0}' | '\u{2007}' | '\u{202F}'))
}
