//! sfnt table directory and the fixed-layout tables needed before any glyph
//! can be decoded: `head`, `maxp`, `loca`, `hhea` and `hmtx`.

use std::fmt;
use std::io::{Read, Seek};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::FontError;
use crate::reader::BinaryReader;

/// Only the first 40 directory entries are scanned.
pub const MAX_TABLES: u16 = 40;

pub const HEAD_MAGIC: u32 = 0x5F0F3CF5;

pub const MIN_UNITS_PER_EM: u16 = 16;
pub const MAX_UNITS_PER_EM: u16 = 16384;

/// A 4-byte table tag identifying a TrueType table.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableTag(pub [u8; 4]);

impl TableTag {
    pub const CMAP: Self = Self(*b"cmap");
    pub const GLYF: Self = Self(*b"glyf");
    pub const HEAD: Self = Self(*b"head");
    pub const LOCA: Self = Self(*b"loca");
    pub const MAXP: Self = Self(*b"maxp");
    pub const KERN: Self = Self(*b"kern");
    pub const HHEA: Self = Self(*b"hhea");
    pub const HMTX: Self = Self(*b"hmtx");
    pub const TTCF: Self = Self(*b"ttcf");
}

impl fmt::Debug for TableTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableTag('{self}')")
    }
}

impl fmt::Display for TableTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = std::str::from_utf8(&self.0).unwrap_or("????");
        write!(f, "{s}")
    }
}

/// Absolute byte offsets of the tables this crate understands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableOffsets {
    pub cmap: u32,
    pub glyf: u32,
    pub head: u32,
    pub loca: u32,
    pub maxp: u32,
    pub hhea: u32,
    pub hmtx: u32,
    pub kern: Option<u32>,
}

/// Parse the (optionally TTC-wrapped) table directory.
///
/// Unknown tags are ignored. A mandatory table that is absent fails with
/// `MissingTable`; `kern` is optional.
pub fn read_table_directory<R: Read + Seek>(
    r: &mut BinaryReader<R>,
    font_name: &str,
) -> Result<TableOffsets, FontError> {
    r.seek(0)?;
    let tag = TableTag(r.read_tag()?);
    if tag == TableTag::TTCF {
        let _version = r.read_fixed()?;
        let _num_fonts = r.read_u32()?;
        let first = r.read_u32()?;
        debug!("{font_name}: TrueType collection, first font at {first}");
        r.seek(u64::from(first))?;
    } else {
        r.seek(0)?;
    }

    let _sfnt_version = r.read_fixed()?;
    let num_tables = r.read_u16()?;
    let _search_range = r.read_u16()?;
    let _entry_selector = r.read_u16()?;
    let _range_shift = r.read_u16()?;

    if num_tables > MAX_TABLES {
        warn!(
            "More than {MAX_TABLES} ({num_tables}) TTF tables in {font_name} - some info may be lost"
        );
    }

    let mut found: [Option<u32>; 8] = [None; 8];
    const KNOWN: [TableTag; 8] = [
        TableTag::CMAP,
        TableTag::GLYF,
        TableTag::HEAD,
        TableTag::LOCA,
        TableTag::MAXP,
        TableTag::KERN,
        TableTag::HHEA,
        TableTag::HMTX,
    ];

    for _ in 0..num_tables.min(MAX_TABLES) {
        let tag = TableTag(r.read_tag()?);
        let _checksum = r.read_u32()?;
        let offset = r.read_u32()?;
        let length = r.read_u32()?;
        if let Some(slot) = KNOWN.iter().position(|k| *k == tag) {
            debug!("{font_name}: table {tag} at {offset} ({length} bytes)");
            found[slot] = Some(offset);
        }
    }

    let require = |slot: usize| found[slot].ok_or(FontError::MissingTable(KNOWN[slot]));
    Ok(TableOffsets {
        cmap: require(0)?,
        glyf: require(1)?,
        head: require(2)?,
        loca: require(3)?,
        hhea: require(6)?,
        hmtx: require(7)?,
        maxp: require(4)?,
        kern: found[5],
    })
}

/// Layout of the `loca` table, selected by `head.indexToLocFormat`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocaFormat {
    /// u16 offsets, stored halved.
    Short,
    /// u32 offsets.
    Long,
}

/// Parsed `head` table.
#[derive(Clone, Debug)]
pub struct HeadTable {
    pub units_per_em: u16,
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
    pub mac_style: u16,
    pub index_to_loc_format: LocaFormat,
}

impl HeadTable {
    /// Read and validate the font header: magic number, units per em and
    /// the loca format are all checked here.
    pub fn read<R: Read + Seek>(r: &mut BinaryReader<R>, offset: u32) -> Result<Self, FontError> {
        r.seek(u64::from(offset))?;
        let _version = r.read_fixed()?;
        let _font_revision = r.read_fixed()?;
        let _checksum_adjustment = r.read_u32()?;
        let magic = r.read_u32()?;
        if magic != HEAD_MAGIC {
            return Err(FontError::invalid(format!("bad magic number (0x{magic:08X})")));
        }
        let _flags = r.read_u16()?;
        let units_per_em = r.read_u16()?;
        r.skip(16)?; // created + modified
        let x_min = r.read_i16()?;
        let y_min = r.read_i16()?;
        let x_max = r.read_i16()?;
        let y_max = r.read_i16()?;
        let mac_style = r.read_u16()?;
        let _lowest_rec_ppem = r.read_u16()?;
        let _font_direction_hint = r.read_i16()?;
        let index_to_loc_format = match r.read_i16()? {
            0 => LocaFormat::Short,
            1 => LocaFormat::Long,
            other => {
                return Err(FontError::invalid(format!("indexToLocFormat {other}")));
            }
        };

        if !(MIN_UNITS_PER_EM..=MAX_UNITS_PER_EM).contains(&units_per_em) {
            return Err(FontError::invalid(format!(
                "unitsPerEm {units_per_em} outside [{MIN_UNITS_PER_EM}, {MAX_UNITS_PER_EM}]"
            )));
        }

        Ok(HeadTable {
            units_per_em,
            x_min,
            y_min,
            x_max,
            y_max,
            mac_style,
            index_to_loc_format,
        })
    }
}

/// Read `maxp.numGlyphs`, rejecting fonts without glyphs.
pub fn read_num_glyphs<R: Read + Seek>(r: &mut BinaryReader<R>, offset: u32) -> Result<u16, FontError> {
    r.seek(u64::from(offset) + 4)?;
    let num_glyphs = r.read_u16()?;
    if num_glyphs == 0 {
        return Err(FontError::invalid("maxp declares zero glyphs"));
    }
    Ok(num_glyphs)
}

/// Read the glyph location table: `num_glyphs + 1` absolute offsets into
/// `glyf`, the last one being the end sentinel.
pub fn read_loca<R: Read + Seek>(
    r: &mut BinaryReader<R>,
    offset: u32,
    format: LocaFormat,
    num_glyphs: u16,
) -> Result<Vec<u32>, FontError> {
    r.seek(u64::from(offset))?;
    let count = usize::from(num_glyphs) + 1;
    let mut loca = Vec::with_capacity(count);
    for _ in 0..count {
        let entry = match format {
            LocaFormat::Short => u32::from(r.read_u16()?) << 1,
            LocaFormat::Long => r.read_u32()?,
        };
        loca.push(entry);
    }
    Ok(loca)
}

/// Parsed `hhea` table.
#[derive(Clone, Debug)]
pub struct HheaTable {
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub advance_width_max: u16,
    pub number_of_h_metrics: u16,
}

impl HheaTable {
    pub fn read<R: Read + Seek>(r: &mut BinaryReader<R>, offset: u32) -> Result<Self, FontError> {
        r.seek(u64::from(offset))?;
        let _version = r.read_fixed()?;
        let ascender = r.read_i16()?;
        let descender = r.read_i16()?;
        let line_gap = r.read_i16()?;
        let advance_width_max = r.read_u16()?;
        r.skip(22)?; // extents, caret slope, reserved, metricDataFormat
        let number_of_h_metrics = r.read_u16()?;
        if number_of_h_metrics == 0 {
            return Err(FontError::invalid("hhea declares zero horizontal metrics"));
        }
        Ok(HheaTable {
            ascender,
            descender,
            line_gap,
            advance_width_max,
            number_of_h_metrics,
        })
    }
}

/// Horizontal metrics for a glyph, in font units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizontalMetric {
    pub advance_width: u16,
    pub lsb: i16,
}

/// The decoded `hmtx` table, one entry per glyph.
#[derive(Clone, Debug, Default)]
pub struct HorizontalMetrics {
    metrics: Vec<HorizontalMetric>,
}

impl HorizontalMetrics {
    /// Entries beyond `number_of_h_metrics` repeat the last advance width with
    /// their own left side bearing.
    pub fn read<R: Read + Seek>(
        r: &mut BinaryReader<R>,
        offset: u32,
        number_of_h_metrics: u16,
        num_glyphs: u16,
    ) -> Result<Self, FontError> {
        r.seek(u64::from(offset))?;
        let long = number_of_h_metrics.min(num_glyphs);
        let mut metrics = Vec::with_capacity(usize::from(num_glyphs));
        let mut last_advance = 0;
        for _ in 0..long {
            last_advance = r.read_u16()?;
            let lsb = r.read_i16()?;
            metrics.push(HorizontalMetric { advance_width: last_advance, lsb });
        }
        for _ in long..num_glyphs {
            let lsb = r.read_i16()?;
            metrics.push(HorizontalMetric { advance_width: last_advance, lsb });
        }
        Ok(HorizontalMetrics { metrics })
    }

    pub fn get(&self, glyph_index: u16) -> HorizontalMetric {
        self.metrics
            .get(usize::from(glyph_index))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
