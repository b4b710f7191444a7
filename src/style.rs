//! Run formatting – the two styles the substitution engine emits and the
//! WordprocessingML run properties (`w:rPr`) they serialise to.

use serde::{Deserialize, Serialize};

/// An sRGB color as stored in `w:color/@w:val`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// The blue used for substituted values (`#0070C0`).
    pub const HIGHLIGHT_BLUE: Self = Self {
        r: 0x00,
        g: 0x70,
        b: 0xC0,
    };

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Self { r, g, b })
        } else if hex.len() == 3 {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
            Some(Self { r, g, b })
        } else {
            None
        }
    }

    /// Upper-case `RRGGBB`, the form Word writes.
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Formatting of one emitted text run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStyle {
    pub font_family: String,
    pub font_size_pt: f32,
    pub bold: bool,
    pub color: Option<Color>,
}

impl RunStyle {
    /// Font size in half-points, the unit of `w:sz`.
    pub fn half_points(&self) -> u32 {
        (self.font_size_pt * 2.0).round().max(1.0) as u32
    }

    pub fn is_highlighted(&self) -> bool {
        self.color.is_some()
    }

    /// `(local name, attributes)` for each child of `w:rPr`, in schema order.
    pub fn properties(&self) -> Vec<(&'static str, Vec<(&'static str, String)>)> {
        let mut props = vec![(
            "rFonts",
            vec![
                ("ascii", self.font_family.clone()),
                ("hAnsi", self.font_family.clone()),
            ],
        )];
        if self.bold {
            props.push(("b", Vec::new()));
        }
        if let Some(color) = self.color {
            props.push(("color", vec![("val", color.to_hex())]));
        }
        props.push(("sz", vec![("val", self.half_points().to_string())]));
        props
    }
}

/// User-facing style settings for generated runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Font family for every rebuilt run (default: Arial).
    pub font_family: String,
    /// Font size in points (default: 12).
    pub font_size_pt: f32,
    /// Hex color for substituted values (default: 0070C0).
    pub highlight_color: String,
    /// Whether substituted values are bold (default: true).
    pub highlight_bold: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size_pt: 12.0,
            highlight_color: Color::HIGHLIGHT_BLUE.to_hex(),
            highlight_bold: true,
        }
    }
}

impl StyleConfig {
    /// Style for static template text: family and size only.
    pub fn plain(&self) -> RunStyle {
        RunStyle {
            font_family: self.font_family.clone(),
            font_size_pt: self.font_size_pt,
            bold: false,
            color: None,
        }
    }

    /// Style for substituted values. An unparsable color falls back to the
    /// default blue.
    pub fn highlight(&self) -> RunStyle {
        let color = Color::from_hex(&self.highlight_color).unwrap_or_else(|| {
            log::warn!(
                "Invalid highlight color '{}', using {}",
                self.highlight_color,
                Color::HIGHLIGHT_BLUE.to_hex()
            );
            Color::HIGHLIGHT_BLUE
        });
        RunStyle {
            font_family: self.font_family.clone(),
            font_size_pt: self.font_size_pt,
            bold: self.highlight_bold,
            color: Some(color),
        }
    }
}
