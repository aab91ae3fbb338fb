//! Font loading and glyph decoding errors.

use std::io;

use crate::tables::TableTag;

/// Errors that can occur when loading a font or decoding its glyphs.
///
/// `Io`, `FontNotFound`, `InvalidFontData` and `MissingTable` abort the current
/// font load. `UnsupportedFeature` and `GlyphNotFound` are recoverable: they are
/// only ever reported through `tracing::warn!` while decoding continues.
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("cannot read TrueType font data: {0}")]
    Io(#[from] io::Error),

    #[error("cannot open font file `{0}`")]
    FontNotFound(String),

    #[error("invalid TrueType font data: {0}")]
    InvalidFontData(String),

    #[error("invalid TrueType font headers: missing `{0}` table")]
    MissingTable(TableTag),

    #[error("unsupported TrueType feature: {0}")]
    UnsupportedFeature(String),

    #[error("character U+{0:04X} not found in any character map")]
    GlyphNotFound(u32),
}

impl FontError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidFontData(msg.into())
    }

    /// True for errors that leave the font usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnsupportedFeature(_) | Self::GlyphNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_table_names_the_tag() {
        let err = FontError::MissingTable(TableTag::GLYF);
        assert_eq!(
            err.to_string(),
            "invalid TrueType font headers: missing `glyf` table"
        );
    }

    #[test]
    fn recoverable_classification() {
        assert!(FontError::GlyphNotFound(0x41).is_recoverable());
        assert!(FontError::UnsupportedFeature("kern format 2".into()).is_recoverable());
        assert!(!FontError::invalid("bad magic").is_recoverable());
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(!FontError::from(eof).is_recoverable());
    }

    #[test]
    fn glyph_not_found_formats_codepoint() {
        assert_eq!(
            FontError::GlyphNotFound(0xF041).to_string(),
            "character U+F041 not found in any character map"
        );
    }
}
