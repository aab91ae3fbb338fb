//! The `kern` table: format 0 pair subtables and pair lookup.

use std::io::{Read, Seek};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::FontError;
use crate::reader::BinaryReader;

/// Coverage bits of a kerning subtable. The high byte holds the format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernCoverage(pub u16);

impl KernCoverage {
    pub const HORIZONTAL: u16 = 0x01;
    pub const MINIMUM: u16 = 0x02;
    pub const CROSS_STREAM: u16 = 0x04;
    pub const OVERRIDE: u16 = 0x08;

    pub fn format(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn horizontal(self) -> bool {
        self.0 & Self::HORIZONTAL != 0
    }

    pub fn minimum(self) -> bool {
        self.0 & Self::MINIMUM != 0
    }

    pub fn cross_stream(self) -> bool {
        self.0 & Self::CROSS_STREAM != 0
    }

    pub fn is_override(self) -> bool {
        self.0 & Self::OVERRIDE != 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernPair {
    pub left: u16,
    pub right: u16,
    pub value: i16,
}

/// A format 0 subtable. Pairs are sorted by left glyph, then right glyph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernSubtable {
    pub coverage: KernCoverage,
    pub pairs: Vec<KernPair>,
}

impl KernSubtable {
    fn find(&self, left: u16, right: u16) -> Option<i16> {
        for pair in &self.pairs {
            if pair.left == left && pair.right == right {
                return Some(pair.value);
            }
            if pair.left > left {
                break;
            }
        }
        None
    }
}

/// Kerning adjustment for a glyph pair, in font units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KernAdjustment {
    pub x: i32,
    pub y: i32,
}

/// Cross-stream value that resets the accumulated adjustment.
const CROSS_STREAM_RESET: i16 = i16::MIN;

/// All decoded kerning subtables of a font; empty when `kern` is absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KerningTables {
    pub subtables: Vec<KernSubtable>,
}

impl KerningTables {
    /// Decode the `kern` table. Subtables in formats other than 0 are skipped
    /// by their length with a warning.
    pub fn read<R: Read + Seek>(r: &mut BinaryReader<R>, offset: u32) -> Result<Self, FontError> {
        r.seek(u64::from(offset) + 2)?;
        let n_tables = r.read_u16()?;
        debug!("kern: {n_tables} subtables");

        let mut subtables = Vec::with_capacity(usize::from(n_tables));
        for i in 0..n_tables {
            let _version = r.read_u16()?;
            let length = r.read_u16()?;
            let coverage = KernCoverage(r.read_u16()?);

            if coverage.format() != 0 {
                warn!(
                    "{}",
                    FontError::UnsupportedFeature(format!(
                        "format {} kerning subtable {i}",
                        coverage.format()
                    ))
                );
                r.skip(i64::from(length) - 6)?;
                continue;
            }

            let n_pairs = r.read_u16()?;
            let _search_range = r.read_u16()?;
            let _entry_selector = r.read_u16()?;
            let _range_shift = r.read_u16()?;

            let mut pairs = Vec::with_capacity(usize::from(n_pairs));
            for _ in 0..n_pairs {
                let left = r.read_u16()?;
                let right = r.read_u16()?;
                let value = r.read_i16()?;
                trace!("kern pair <{left},{right}> = {value}");
                pairs.push(KernPair { left, right, value });
            }
            subtables.push(KernSubtable { coverage, pairs });
        }

        Ok(KerningTables { subtables })
    }

    pub fn is_empty(&self) -> bool {
        self.subtables.is_empty()
    }

    /// Combined adjustment for `left` followed by `right`.
    ///
    /// Only horizontal subtables apply. Override subtables replace the running
    /// value for their axis, others accumulate; minimum subtables set a floor
    /// which defaults to `-units_per_em`.
    pub fn lookup(&self, left: u16, right: u16, units_per_em: u16) -> KernAdjustment {
        let mut x = 0i32;
        let mut y = 0i32;
        let mut min_x = -i32::from(units_per_em);
        let mut min_y = -i32::from(units_per_em);

        for table in &self.subtables {
            let coverage = table.coverage;
            if !coverage.horizontal() {
                continue;
            }
            let Some(value) = table.find(left, right) else {
                continue;
            };
            trace!("kerning <{left}, {right}> = {value} (coverage 0x{:X})", coverage.0);

            if coverage.minimum() {
                if coverage.cross_stream() {
                    min_y = i32::from(value);
                } else {
                    min_x = i32::from(value);
                }
            } else if coverage.cross_stream() {
                if value == CROSS_STREAM_RESET {
                    y = 0;
                } else if coverage.is_override() {
                    y = i32::from(value);
                } else {
                    y += i32::from(value);
                }
            } else if coverage.is_override() {
                x = i32::from(value);
            } else {
                x += i32::from(value);
            }
        }

        KernAdjustment {
            x: x.max(min_x),
            y: y.max(min_y),
        }
    }
}
