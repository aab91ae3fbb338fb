use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::cmap::{encoding_preferences, CharMap};
use crate::config::StringEncoding;
use crate::error::FontError;
use crate::glyph::{BoundingBox, Glyph};
use crate::kern::{KernAdjustment, KerningTables};
use crate::outline::{extract_outline, GlyphLocations};
use crate::reader::{BinaryReader, ReadSeek};
use crate::tables::{
    read_loca, read_num_glyphs, read_table_directory, HeadTable, HheaTable, HorizontalMetric,
    HorizontalMetrics, LocaFormat, TableOffsets,
};

type FontReader = BinaryReader<Box<dyn ReadSeek>>;

/// Where a font's bytes come from; used to reopen a closed stream.
#[derive(Clone, Debug)]
pub enum FontSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

impl FontSource {
    fn open(&self) -> Result<Box<dyn ReadSeek>, FontError> {
        match self {
            FontSource::Path(path) => match File::open(path) {
                Ok(file) => Ok(Box::new(BufReader::new(file))),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(FontError::FontNotFound(path.display().to_string()))
                }
                Err(e) => Err(e.into()),
            },
            FontSource::Memory(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
        }
    }
}

/// An opened TrueType font: decoded tables plus a cache of built glyphs.
///
/// Vertical metrics are in em units.
pub struct FontFile {
    pub name: String,
    pub ascender: f64,
    pub descender: f64,
    pub line_gap: f64,
    pub bbox: BoundingBox,
    pub units_per_em: u16,
    pub loca_format: LocaFormat,
    pub num_glyphs: u16,
    source: FontSource,
    reader: Option<FontReader>,
    offsets: TableOffsets,
    loca: Vec<u32>,
    metrics: HorizontalMetrics,
    kerning: KerningTables,
    cmap: CharMap,
    glyphs: HashMap<u16, Arc<Glyph>>,
    glyph_map: HashMap<u32, u16>,
}

impl fmt::Debug for FontFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFile")
            .field("name", &self.name)
            .field("units_per_em", &self.units_per_em)
            .field("num_glyphs", &self.num_glyphs)
            .field("open", &self.reader.is_some())
            .field("cached_glyphs", &self.glyphs.len())
            .finish_non_exhaustive()
    }
}

fn open_reader<'a>(
    slot: &'a mut Option<FontReader>,
    source: &FontSource,
    name: &str,
) -> Result<&'a mut FontReader, FontError> {
    if slot.is_none() {
        debug!("{name}: opening font stream");
        *slot = Some(BinaryReader::new(source.open()?));
    }
    slot.as_mut().ok_or_else(|| FontError::FontNotFound(name.to_string()))
}

impl FontFile {
    /// Open and decode the font file at `path`.
    pub fn open(path: impl AsRef<Path>, encoding: StringEncoding) -> Result<Self, FontError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::load(name, FontSource::Path(path.to_path_buf()), encoding)
    }

    /// Decode a font held in memory.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
        encoding: StringEncoding,
    ) -> Result<Self, FontError> {
        Self::load(name.into(), FontSource::Memory(bytes.into()), encoding)
    }

    fn load(name: String, source: FontSource, encoding: StringEncoding) -> Result<Self, FontError> {
        let mut r = BinaryReader::new(source.open()?);

        let offsets = read_table_directory(&mut r, &name)?;
        let head = HeadTable::read(&mut r, offsets.head)?;
        let num_glyphs = read_num_glyphs(&mut r, offsets.maxp)?;
        let loca = read_loca(&mut r, offsets.loca, head.index_to_loc_format, num_glyphs)?;
        let hhea = HheaTable::read(&mut r, offsets.hhea)?;
        let metrics =
            HorizontalMetrics::read(&mut r, offsets.hmtx, hhea.number_of_h_metrics, num_glyphs)?;
        let kerning = match offsets.kern {
            Some(offset) => KerningTables::read(&mut r, offset)?,
            None => KerningTables::default(),
        };

        debug!(
            "{name}: {num_glyphs} glyphs, {} units per em, {:?} loca, {} kerning subtables",
            head.units_per_em,
            head.index_to_loc_format,
            kerning.subtables.len()
        );

        let upem = f64::from(head.units_per_em);
        Ok(FontFile {
            ascender: f64::from(hhea.ascender) / upem,
            descender: f64::from(hhea.descender) / upem,
            line_gap: f64::from(hhea.line_gap) / upem,
            bbox: BoundingBox::new(
                f64::from(head.x_min) / upem,
                f64::from(head.y_min) / upem,
                f64::from(head.x_max) / upem,
                f64::from(head.y_max) / upem,
            ),
            units_per_em: head.units_per_em,
            loca_format: head.index_to_loc_format,
            num_glyphs,
            cmap: CharMap::new(offsets.cmap, encoding_preferences(encoding)),
            reader: Some(r),
            source,
            offsets,
            loca,
            metrics,
            kerning,
            glyphs: HashMap::new(),
            glyph_map: HashMap::new(),
            name,
        })
    }

    pub fn source(&self) -> &FontSource {
        &self.source
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Drop the stream. Decoded tables and glyphs are kept; the next query
    /// that needs font data reopens it.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!("{}: closed font stream", self.name);
        }
    }

    pub fn reopen(&mut self) -> Result<(), FontError> {
        open_reader(&mut self.reader, &self.source, &self.name).map(|_| ())
    }

    pub fn metrics(&self, glyph_index: u16) -> HorizontalMetric {
        self.metrics.get(glyph_index)
    }

    pub fn kerning_tables(&self) -> &KerningTables {
        &self.kerning
    }

    /// Kerning between two glyphs, in font units.
    pub fn kerning(&self, left: u16, right: u16) -> KernAdjustment {
        self.kerning.lookup(left, right, self.units_per_em)
    }

    pub fn cached_glyphs(&self) -> usize {
        self.glyphs.len()
    }

    /// Glyph index for a code point, without building its outline.
    pub fn glyph_index(&mut self, codepoint: u32) -> Result<u16, FontError> {
        if let Some(&index) = self.glyph_map.get(&codepoint) {
            return Ok(index);
        }
        let reader = open_reader(&mut self.reader, &self.source, &self.name)?;
        let index = self.cmap.resolve(reader, codepoint)?;
        if index == 0 {
            warn!("{}", FontError::GlyphNotFound(codepoint));
        }
        self.glyph_map.insert(codepoint, index);
        Ok(index)
    }

    /// The decoded glyph for `codepoint` and its glyph index. Unmapped code
    /// points yield the missing glyph (index 0).
    pub fn glyph(&mut self, codepoint: u32) -> Result<(Arc<Glyph>, u16), FontError> {
        let index = self.glyph_index(codepoint)?;
        if let Some(glyph) = self.glyphs.get(&index) {
            trace!("{}: glyph {index} cached", self.name);
            return Ok((Arc::clone(glyph), index));
        }

        let reader = open_reader(&mut self.reader, &self.source, &self.name)?;
        let locations = GlyphLocations {
            glyf_offset: self.offsets.glyf,
            loca: &self.loca,
            units_per_em: self.units_per_em,
        };
        let outline = extract_outline(reader, &locations, index)?;
        let glyph = Arc::new(Glyph::build(codepoint, index, self.units_per_em, &outline));
        debug!(
            "{}: built glyph {index} for U+{codepoint:04X} ({} contours)",
            self.name,
            glyph.num_contours()
        );
        self.glyphs.insert(index, Arc::clone(&glyph));
        Ok((glyph, index))
    }
}
