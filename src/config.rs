//! Page geometry configuration.

use crate::alignment::TextAlign;

/// Tolerance for page-boundary comparisons on accumulated float geometry.
pub(crate) const EPSILON: f32 = 1e-3;

/// Layout configuration for one logical page.
///
/// A logical page spans `horizontal_pages` physical pages side by side. Its
/// coordinate space starts at the top-left corner of the first physical
/// page's content area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutConfig {
    /// Physical page width.
    pub page_width: f32,
    /// Physical page height.
    pub page_height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    /// Physical pages across one logical page.
    pub horizontal_pages: u16,
    /// Alignment for paragraphs without their own override.
    pub text_align: TextAlign,
    /// Keep leading spacers on a paragraph's first line (indentation).
    pub keep_first_line_leading_spacers: bool,
    /// Vertical gap after each block-level child.
    pub block_gap_px: f32,
}

impl LayoutConfig {
    /// Convenience for a page size with sensible defaults.
    pub fn for_page(width: f32, height: f32) -> Self {
        Self {
            page_width: width,
            page_height: height,
            ..Self::default()
        }
    }

    /// Usable width of one physical page.
    pub fn content_width(&self) -> f32 {
        (self.page_width - self.margin_left - self.margin_right).max(0.0)
    }

    /// Usable height of one physical page.
    pub fn content_height(&self) -> f32 {
        (self.page_height - self.margin_top - self.margin_bottom).max(0.0)
    }

    /// Width of the whole logical page.
    pub fn logical_width(&self) -> f32 {
        self.content_width() * f32::from(self.horizontal_pages.max(1))
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: 595.0,
            page_height: 842.0,
            margin_left: 36.0,
            margin_right: 36.0,
            margin_top: 36.0,
            margin_bottom: 36.0,
            horizontal_pages: 1,
            text_align: TextAlign::Left,
            keep_first_line_leading_spacers: false,
            block_gap_px: 0.0,
        }
    }
}

/// Physical page boundaries over logical page coordinates.
///
/// Rows of pages break every `page_height` vertically; columns break every
/// `column_width` horizontally. A non-positive page height disables vertical
/// breaks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGrid {
    page_height: f32,
    column_width: f32,
    columns: u16,
}

impl PageGrid {
    pub fn new(column_width: f32, page_height: f32, columns: u16) -> Self {
        Self {
            page_height: sanitize(page_height),
            column_width: sanitize(column_width),
            columns: columns.max(1),
        }
    }

    /// One column, no horizontal breaks.
    pub fn single_column(width: f32, page_height: f32) -> Self {
        Self::new(width, page_height, 1)
    }

    pub fn from_config(config: &LayoutConfig) -> Self {
        Self::new(
            config.content_width(),
            config.content_height(),
            config.horizontal_pages,
        )
    }

    pub fn page_height(&self) -> f32 {
        self.page_height
    }

    pub fn column_width(&self) -> f32 {
        self.column_width
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    pub fn logical_width(&self) -> f32 {
        self.column_width * f32::from(self.columns)
    }

    fn paginates(&self) -> bool {
        self.page_height > EPSILON
    }

    /// Page row containing `y`.
    pub fn page_index(&self, y: f32) -> usize {
        if !self.paginates() || y <= 0.0 {
            return 0;
        }
        ((y + EPSILON) / self.page_height).floor() as usize
    }

    pub fn page_top(&self, index: usize) -> f32 {
        self.page_height * index as f32
    }

    /// First page boundary strictly below `y`.
    pub fn next_page_boundary(&self, y: f32) -> Option<f32> {
        if !self.paginates() {
            return None;
        }
        Some(self.page_top(self.page_index(y) + 1))
    }

    /// Boundary crossed by the span `[top, bottom)`, if any.
    pub fn straddled_boundary(&self, top: f32, bottom: f32) -> Option<f32> {
        let boundary = self.next_page_boundary(top)?;
        (bottom > boundary + EPSILON).then_some(boundary)
    }

    /// Page rows needed to show content reaching down to `bottom`.
    pub fn page_count(&self, bottom: f32) -> usize {
        if !self.paginates() || bottom <= self.page_height + EPSILON {
            return 1;
        }
        ((bottom - EPSILON) / self.page_height).ceil().max(1.0) as usize
    }

    /// First interior column boundary strictly right of `x`.
    pub fn next_column_boundary(&self, x: f32) -> Option<f32> {
        if self.columns <= 1 || self.column_width <= EPSILON {
            return None;
        }
        let index = ((x + EPSILON) / self.column_width).floor().max(0.0) + 1.0;
        (index < f32::from(self.columns)).then(|| index * self.column_width)
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_box_subtracts_margins() {
        let config = LayoutConfig {
            horizontal_pages: 2,
            ..LayoutConfig::for_page(200.0, 300.0)
        };
        assert_eq!(config.content_width(), 128.0);
        assert_eq!(config.content_height(), 228.0);
        assert_eq!(config.logical_width(), 256.0);

        let grid = PageGrid::from_config(&config);
        assert_eq!(grid.columns(), 2);
        assert_eq!(grid.logical_width(), 256.0);
    }

    #[test]
    fn vertical_boundaries() {
        let grid = PageGrid::single_column(100.0, 100.0);
        assert_eq!(grid.page_index(0.0), 0);
        assert_eq!(grid.page_index(99.0), 0);
        assert_eq!(grid.page_index(100.0), 1);
        assert_eq!(grid.next_page_boundary(0.0), Some(100.0));
        assert_eq!(grid.next_page_boundary(100.0), Some(200.0));
        assert_eq!(grid.straddled_boundary(90.0, 110.0), Some(100.0));
        assert_eq!(grid.straddled_boundary(90.0, 100.0), None);
        assert_eq!(grid.straddled_boundary(100.0, 150.0), None);
        assert_eq!(grid.page_count(0.0), 1);
        assert_eq!(grid.page_count(100.0), 1);
        assert_eq!(grid.page_count(100.5), 2);
        assert_eq!(grid.page_count(300.0), 3);
    }

    #[test]
    fn zero_height_grid_never_breaks() {
        let grid = PageGrid::single_column(100.0, 0.0);
        assert_eq!(grid.next_page_boundary(50.0), None);
        assert_eq!(grid.straddled_boundary(0.0, 1e6), None);
        assert_eq!(grid.page_count(1e6), 1);
    }

    #[test]
    fn column_boundaries_are_interior_only() {
        let grid = PageGrid::new(50.0, 100.0, 3);
        assert_eq!(grid.next_column_boundary(0.0), Some(50.0));
        assert_eq!(grid.next_column_boundary(50.0), Some(100.0));
        assert_eq!(grid.next_column_boundary(120.0), None);
        assert_eq!(PageGrid::single_column(50.0, 100.0).next_column_boundary(0.0), None);
    }
}
