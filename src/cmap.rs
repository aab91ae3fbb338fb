//! Character to glyph index mapping through the `cmap` table.
//!
//! Formats 0 (byte encoding), 4 (segment mapping) and 6 (trimmed table) are
//! understood. Subtables are searched in the order given by the configured
//! string encoding; the first subtable whose platform matches and whose format
//! is supported answers the query, even when it has no glyph for the code
//! point.

use std::io::{Read, Seek};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::StringEncoding;
use crate::error::FontError;
use crate::reader::BinaryReader;

/// Microsoft symbol fonts place their glyphs at U+F000..U+F0FF.
pub const SYMBOL_BASE: u32 = 0xF000;

/// A (platform, platform-specific encoding) pair from the cmap directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodingId {
    pub platform: u16,
    pub specific: u16,
}

impl EncodingId {
    pub const UNICODE_BMP: Self = Self { platform: 0, specific: 3 };
    pub const MAC_ROMAN: Self = Self { platform: 1, specific: 0 };
    pub const WINDOWS_SYMBOL: Self = Self { platform: 3, specific: 0 };
    pub const WINDOWS_UNICODE: Self = Self { platform: 3, specific: 1 };
}

/// Subtable search order for a string encoding.
pub fn encoding_preferences(encoding: StringEncoding) -> [EncodingId; 4] {
    match encoding {
        StringEncoding::Ascii => [
            EncodingId::MAC_ROMAN,
            EncodingId::WINDOWS_UNICODE,
            EncodingId::UNICODE_BMP,
            EncodingId::WINDOWS_SYMBOL,
        ],
        StringEncoding::Utf8 | StringEncoding::System => [
            EncodingId::UNICODE_BMP,
            EncodingId::WINDOWS_UNICODE,
            EncodingId::MAC_ROMAN,
            EncodingId::WINDOWS_SYMBOL,
        ],
    }
}

/// Segment arrays of a format 4 subtable, decoded once per font.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Format4Segments {
    subtable: u64,
    end_count: Vec<u16>,
    start_count: Vec<u16>,
    id_delta: Vec<u16>,
    id_range_offset: Vec<u16>,
    /// Absolute file position of `id_range_offset[0]`.
    id_range_offset_pos: u64,
}

impl Format4Segments {
    /// `subtable` is the absolute offset of the subtable's format field.
    fn read<R: Read + Seek>(r: &mut BinaryReader<R>, subtable: u64) -> Result<Self, FontError> {
        r.seek(subtable + 6)?;
        let seg_count = usize::from(r.read_u16()? >> 1);
        let _search_range = r.read_u16()?;
        let _entry_selector = r.read_u16()?;
        let _range_shift = r.read_u16()?;

        let read_array = |r: &mut BinaryReader<R>| -> Result<Vec<u16>, FontError> {
            (0..seg_count).map(|_| r.read_u16()).collect()
        };

        let end_count = read_array(r)?;
        let _reserved_pad = r.read_u16()?;
        let start_count = read_array(r)?;
        let id_delta = read_array(r)?;
        let id_range_offset_pos = r.position()?;
        let id_range_offset = read_array(r)?;

        debug!("cmap format 4: {seg_count} segments");
        Ok(Format4Segments {
            subtable,
            end_count,
            start_count,
            id_delta,
            id_range_offset,
            id_range_offset_pos,
        })
    }

    pub fn seg_count(&self) -> usize {
        self.end_count.len()
    }

    /// Single pass over the segments for one code point.
    fn lookup<R: Read + Seek>(&self, r: &mut BinaryReader<R>, codepoint: u32) -> Result<u16, FontError> {
        let Some(i) = self.end_count.iter().position(|&end| codepoint <= u32::from(end)) else {
            return Ok(0);
        };
        let start = u32::from(self.start_count[i]);
        if codepoint < start {
            return Ok(0);
        }

        let delta = self.id_delta[i];
        if self.id_range_offset[i] == 0 {
            return Ok((codepoint as u16).wrapping_add(delta));
        }

        // id_range_offset is relative to its own slot in the array.
        let pos = self.id_range_offset_pos
            + 2 * i as u64
            + u64::from(self.id_range_offset[i])
            + 2 * u64::from(codepoint - start);
        r.seek(pos)?;
        let glyph = r.read_u16()?;
        Ok(if glyph == 0 { 0 } else { glyph.wrapping_add(delta) })
    }
}

/// Resolves code points to glyph indices for one font.
#[derive(Clone, Debug)]
pub struct CharMap {
    cmap_offset: u32,
    preferences: [EncodingId; 4],
    format4: Option<Format4Segments>,
}

impl CharMap {
    pub fn new(cmap_offset: u32, preferences: [EncodingId; 4]) -> Self {
        CharMap {
            cmap_offset,
            preferences,
            format4: None,
        }
    }

    pub fn preferences(&self) -> &[EncodingId; 4] {
        &self.preferences
    }

    /// Cached format 4 segments, if a format 4 subtable has been used.
    pub fn format4(&self) -> Option<&Format4Segments> {
        self.format4.as_ref()
    }

    /// Glyph index for `codepoint`, or 0 (the missing glyph) when no
    /// preferred subtable maps it.
    pub fn resolve<R: Read + Seek>(
        &mut self,
        r: &mut BinaryReader<R>,
        codepoint: u32,
    ) -> Result<u16, FontError> {
        let base = u64::from(self.cmap_offset);
        r.seek(base + 2)?;
        let table_count = r.read_u16()?;
        let entries: Vec<(EncodingId, u32)> = (0..table_count)
            .map(|_| -> Result<_, FontError> {
                let platform = r.read_u16()?;
                let specific = r.read_u16()?;
                let offset = r.read_u32()?;
                Ok((EncodingId { platform, specific }, offset))
            })
            .collect::<Result<_, _>>()?;

        for wanted in self.preferences {
            for &(id, offset) in &entries {
                // Match on platform only: (3,0) symbol fonts are found through (3,1).
                if id.platform != wanted.platform {
                    continue;
                }
                let subtable = base + u64::from(offset);
                r.seek(subtable)?;
                let format = r.read_u16()?;
                trace!("cmap subtable {}/{} format {format}", id.platform, id.specific);
                match format {
                    0 => return lookup_format0(r, subtable, codepoint),
                    4 => return self.lookup_format4(r, subtable, codepoint),
                    6 => return lookup_format6(r, subtable, codepoint),
                    other => warn!(
                        "{}",
                        FontError::UnsupportedFeature(format!("cmap format {other}"))
                    ),
                }
            }
        }
        Ok(0)
    }

    fn lookup_format4<R: Read + Seek>(
        &mut self,
        r: &mut BinaryReader<R>,
        subtable: u64,
        codepoint: u32,
    ) -> Result<u16, FontError> {
        if self.format4.as_ref().map(|s| s.subtable) != Some(subtable) {
            self.format4 = Some(Format4Segments::read(r, subtable)?);
        }
        let Some(segments) = self.format4.as_ref() else {
            return Ok(0);
        };

        let glyph = segments.lookup(r, codepoint)?;
        if glyph != 0 || codepoint >= 0x100 {
            return Ok(glyph);
        }
        trace!("looking for U+{codepoint:04X} in the symbol area");
        segments.lookup(r, codepoint + SYMBOL_BASE)
    }
}

fn lookup_format0<R: Read + Seek>(
    r: &mut BinaryReader<R>,
    subtable: u64,
    codepoint: u32,
) -> Result<u16, FontError> {
    if codepoint > 0xFF {
        return Ok(0);
    }
    r.seek(subtable + 6 + u64::from(codepoint))?;
    Ok(u16::from(r.read_u8()?))
}

fn lookup_format6<R: Read + Seek>(
    r: &mut BinaryReader<R>,
    subtable: u64,
    codepoint: u32,
) -> Result<u16, FontError> {
    r.seek(subtable + 6)?;
    let first_code = u32::from(r.read_u16()?);
    let entry_count = u32::from(r.read_u16()?);
    if codepoint < first_code || codepoint >= first_code + entry_count {
        return Ok(0);
    }
    r.skip(2 * i64::from(codepoint - first_code))?;
    r.read_u16()
}
