//! # Font Management
//!
//! Text is measured during layout and drawn by the canvas, and both must agree
//! on glyph widths. This module is the single source for those widths.
//!
//! The standard PDF fonts (Helvetica, Times, Courier) need no embedding and
//! use the AFM width tables in [`metrics`]. TrueType fonts registered by the
//! host are parsed with ttf-parser for their advance widths and glyph ids.

pub mod metrics;

pub use metrics::StandardFontMetrics;
use std::collections::HashMap;

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontKey {
    pub family: String,
    pub weight: u32,
}

impl FontKey {
    /// Key with the weight snapped to regular (400) or bold (700).
    pub fn snapped(family: &str, weight: u32) -> Self {
        FontKey {
            family: family.to_string(),
            weight: snap_weight(weight),
        }
    }
}

pub fn snap_weight(weight: u32) -> u32 {
    if weight >= 600 {
        700
    } else {
        400
    }
}

/// A resolved font, borrowed from the registry.
#[derive(Debug, Clone, Copy)]
pub enum FontData<'a> {
    /// One of the standard PDF fonts. No embedding needed.
    Standard(StandardFont),
    /// A registered TrueType font that needs to be embedded.
    Custom {
        key: &'a FontKey,
        font: &'a CustomFont,
    },
}

impl FontData<'_> {
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        match self {
            FontData::Standard(std_font) => std_font.metrics().char_width(ch, font_size),
            FontData::Custom { font, .. } => font.metrics.char_width(ch, font_size),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CustomFont {
    pub data: Vec<u8>,
    pub metrics: CustomFontMetrics,
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    /// Maps characters to their glyph IDs in the font.
    pub glyph_ids: HashMap<char, u16>,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, 0).ok()?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        let mut default_advance = 0u16;

        for code in 32u32..=0xFFFF {
            let Some(ch) = char::from_u32(code) else {
                continue;
            };
            if let Some(glyph_id) = face.glyph_index(ch) {
                let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                advance_widths.insert(ch, advance);
                glyph_ids.insert(ch, glyph_id.0);
                if ch == ' ' {
                    default_advance = advance;
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Some(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            glyph_ids,
        })
    }
}

/// The standard PDF fonts Quire knows metrics for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    TimesRoman,
    TimesBold,
    Courier,
    CourierBold,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
        }
    }

    /// Standard font for a family name, accepting the usual aliases.
    pub fn for_family(family: &str, weight: u32) -> Option<Self> {
        let bold = snap_weight(weight) == 700;
        let family = family.trim().to_ascii_lowercase();
        let font = match family.as_str() {
            "helvetica" | "arial" | "sans-serif" | "sans" => {
                if bold {
                    Self::HelveticaBold
                } else {
                    Self::Helvetica
                }
            }
            "times" | "times-roman" | "times new roman" | "serif" => {
                if bold {
                    Self::TimesBold
                } else {
                    Self::TimesRoman
                }
            }
            "courier" | "courier new" | "monospace" => {
                if bold {
                    Self::CourierBold
                } else {
                    Self::Courier
                }
            }
            _ => return None,
        };
        Some(font)
    }
}

/// Custom fonts by key. Standard fonts are resolved by name and never stored.
#[derive(Debug, Default)]
pub struct FontRegistry {
    custom: HashMap<FontKey, CustomFont>,
    /// Family tried before Helvetica when a requested family is unknown.
    fallback: Option<String>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a font, falling back to the fallback family, then Helvetica.
    pub fn resolve(&self, family: &str, weight: u32) -> FontData<'_> {
        if let Some(font) = self.lookup(family, weight) {
            return font;
        }
        if let Some(font) = self.fallback.as_deref().and_then(|f| self.lookup(f, weight)) {
            return font;
        }
        if snap_weight(weight) == 700 {
            FontData::Standard(StandardFont::HelveticaBold)
        } else {
            FontData::Standard(StandardFont::Helvetica)
        }
    }

    fn lookup(&self, family: &str, weight: u32) -> Option<FontData<'_>> {
        // a bold request for a family only registered regular still uses it
        for candidate in [weight, 400] {
            if let Some((key, font)) = self
                .custom
                .get_key_value(&FontKey::snapped(family, candidate))
            {
                return Some(FontData::Custom { key, font });
            }
        }
        StandardFont::for_family(family, weight).map(FontData::Standard)
    }

    pub fn set_fallback_family(&mut self, family: Option<String>) {
        self.fallback = family.filter(|f| !f.is_empty());
    }

    /// Register a TrueType font. Fails when the data does not parse.
    pub fn register(&mut self, family: &str, weight: u32, data: Vec<u8>) -> bool {
        let Some(metrics) = CustomFontMetrics::from_font_data(&data) else {
            log::warn!("font data for '{}' is not a parsable TrueType font", family);
            return false;
        };
        self.custom
            .insert(FontKey::snapped(family, weight), CustomFont { data, metrics });
        true
    }

    pub fn is_custom(&self, family: &str, weight: u32) -> bool {
        matches!(self.resolve(family, weight), FontData::Custom { .. })
    }
}

/// Shared font context used by layout and the canvases.
#[derive(Debug, Default)]
pub struct FontContext {
    registry: FontRegistry,
}

impl FontContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, family: &str, weight: u32, font_size: f64) -> f64 {
        self.registry.resolve(family, weight).char_width(ch, font_size)
    }

    /// Measure the width of a string in points.
    pub fn measure_string(&self, text: &str, family: &str, weight: u32, font_size: f64) -> f64 {
        let font = self.registry.resolve(family, weight);
        text.chars().map(|ch| font.char_width(ch, font_size)).sum()
    }

    pub fn resolve(&self, family: &str, weight: u32) -> FontData<'_> {
        self.registry.resolve(family, weight)
    }

    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut FontRegistry {
        &mut self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_families_keep_the_requested_weight() {
        let registry = FontRegistry::new();
        assert!(matches!(
            registry.resolve("Inter", 400),
            FontData::Standard(StandardFont::Helvetica)
        ));
        assert!(matches!(
            registry.resolve("Inter", 800),
            FontData::Standard(StandardFont::HelveticaBold)
        ));
    }

    #[test]
    fn fallback_family_is_resolved_with_the_requested_weight() {
        let mut registry = FontRegistry::new();
        registry.set_fallback_family(Some("serif".to_string()));
        assert!(matches!(
            registry.resolve("Inter", 700),
            FontData::Standard(StandardFont::TimesBold)
        ));
        // a known family never reaches the fallback
        assert!(matches!(
            registry.resolve("monospace", 400),
            FontData::Standard(StandardFont::Courier)
        ));
    }

    #[test]
    fn empty_fallback_family_is_ignored() {
        let mut registry = FontRegistry::new();
        registry.set_fallback_family(Some(String::new()));
        assert!(matches!(
            registry.resolve("Inter", 400),
            FontData::Standard(StandardFont::Helvetica)
        ));
    }

    #[test]
    fn strings_measure_in_the_resolved_font() {
        let ctx = FontContext::new();
        assert_eq!(ctx.measure_string("abc", "Courier New", 400, 10.0), 18.0);
    }

    #[test]
    fn family_aliases() {
        assert_eq!(StandardFont::for_family("Arial", 400), Some(StandardFont::Helvetica));
        assert_eq!(StandardFont::for_family("Times New Roman", 700), Some(StandardFont::TimesBold));
        assert_eq!(StandardFont::for_family("monospace", 400), Some(StandardFont::Courier));
        assert_eq!(StandardFont::for_family("Inter", 400), None);
    }

    #[test]
    fn unknown_families_use_the_configured_fallback() {
        let mut ctx = FontContext::new();
        ctx.registry_mut().set_fallback_family(Some("Courier".to_string()));
        assert_eq!(ctx.char_width('i', "Inter", 400, 10.0), 6.0);
        assert_eq!(ctx.char_width('i', "Times", 400, 10.0), ctx.char_width('i', "Times-Roman", 400, 10.0));
    }

    #[test]
    fn garbage_font_data_is_rejected() {
        let mut ctx = FontContext::new();
        assert!(!ctx.registry_mut().register("Broken", 400, vec![0, 1, 2, 3]));
        assert!(!ctx.registry().is_custom("Broken", 400));
    }
}
