//! Categorical colour palette for the choropleth.

use plotters::style::RGBColor;

/// Matplotlib's Dark2 without its final grey.
pub const DARK2_SEVEN: [(u8, u8, u8); 7] = [
    (27, 158, 119),  // Teal
    (217, 95, 2),    // Orange
    (117, 112, 179), // Purple
    (231, 41, 138),  // Magenta
    (102, 166, 30),  // Green
    (230, 171, 2),   // Mustard
    (166, 118, 29),  // Brown
];

/// Maps category codes onto a fixed list of colours.
///
/// Codes past the end of the list clip to the last colour rather than
/// cycling, so a code never shares a colour with a lower code except in the
/// overflow bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<(u8, u8, u8)>,
}

impl Palette {
    pub fn new(colors: Vec<(u8, u8, u8)>) -> Self {
        Self { colors }
    }

    pub fn dark2() -> Self {
        Self::new(DARK2_SEVEN.to_vec())
    }

    pub fn color_for(&self, code: u32) -> RGBColor {
        let Some(last) = self.colors.len().checked_sub(1) else {
            return RGBColor(0, 0, 0);
        };
        let (r, g, b) = self.colors[(code as usize).min(last)];
        RGBColor(r, g, b)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark2()
    }
}
