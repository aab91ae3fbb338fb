//! Decoding of `glyf` entries into raw point streams.
//!
//! Simple glyphs are read directly; composite glyphs recurse into their
//! components and append the transformed points. All coordinates are
//! normalized by units per em as they are produced.

use std::io::{Read, Seek};

use tracing::{trace, warn};

use crate::error::FontError;
use crate::glyph::{BoundingBox, OutlinePoint};
use crate::reader::BinaryReader;

// Simple glyph flags.
const ON_CURVE: u8 = 0x01;
const X_SHORT: u8 = 0x02;
const Y_SHORT: u8 = 0x04;
const REPEAT: u8 = 0x08;
const X_SAME_OR_POSITIVE: u8 = 0x10;
const Y_SAME_OR_POSITIVE: u8 = 0x20;

// Composite glyph flags.
const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const ARGS_ARE_XY_VALUES: u16 = 0x0002;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
const USE_MY_METRICS: u16 = 0x0200;

/// Composite chains nested deeper than this are rejected as cyclic.
pub const MAX_COMPOSITE_DEPTH: usize = 16;

/// Where glyph data lives in the font.
#[derive(Clone, Copy, Debug)]
pub struct GlyphLocations<'a> {
    pub glyf_offset: u32,
    /// `num_glyphs + 1` absolute offsets relative to `glyf`.
    pub loca: &'a [u32],
    pub units_per_em: u16,
}

impl GlyphLocations<'_> {
    pub fn num_glyphs(&self) -> usize {
        self.loca.len().saturating_sub(1)
    }
}

/// Flat decoded outline: all points of all contours, split by `end_points`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawOutline {
    /// Index of the last point of each contour.
    pub end_points: Vec<usize>,
    pub points: Vec<OutlinePoint>,
    pub bbox: BoundingBox,
    /// Glyph whose horizontal metrics apply.
    pub metrics_glyph: u16,
}

impl RawOutline {
    fn empty(metrics_glyph: u16) -> Self {
        RawOutline {
            metrics_glyph,
            ..Default::default()
        }
    }

    pub fn num_contours(&self) -> usize {
        self.end_points.len()
    }

    fn include_points(&mut self) {
        let mut points = self.points.iter();
        if let Some(first) = points.next() {
            let mut bbox = BoundingBox::at(first.x, first.y);
            for p in points {
                bbox.include(p.x, p.y);
            }
            self.bbox = bbox;
        }
    }
}

/// Affine placement of a composite component, in normalized units.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ComponentTransform {
    xx: f64,
    xy: f64,
    yx: f64,
    yy: f64,
    dx: f64,
    dy: f64,
}

impl ComponentTransform {
    /// Scales are stored as (xscale, scale01, scale10, yscale), with
    /// x' = xscale·x + scale10·y and y' = scale01·x + yscale·y.
    fn apply(&self, p: OutlinePoint) -> OutlinePoint {
        OutlinePoint::new(
            self.xx * p.x + self.yx * p.y + self.dx,
            self.xy * p.x + self.yy * p.y + self.dy,
            p.on_curve,
        )
    }
}

/// Decode the outline of `glyph_index`.
pub fn extract_outline<R: Read + Seek>(
    r: &mut BinaryReader<R>,
    glyphs: &GlyphLocations<'_>,
    glyph_index: u16,
) -> Result<RawOutline, FontError> {
    extract(r, glyphs, glyph_index, 0)
}

fn extract<R: Read + Seek>(
    r: &mut BinaryReader<R>,
    glyphs: &GlyphLocations<'_>,
    glyph_index: u16,
    depth: usize,
) -> Result<RawOutline, FontError> {
    let idx = usize::from(glyph_index);
    let (Some(&start), Some(&end)) = (glyphs.loca.get(idx), glyphs.loca.get(idx + 1)) else {
        return Err(FontError::invalid(format!(
            "glyph {glyph_index} outside loca table ({} glyphs)",
            glyphs.num_glyphs()
        )));
    };
    if end <= start {
        trace!("glyph {glyph_index}: no outline data");
        return Ok(RawOutline::empty(glyph_index));
    }

    r.seek(u64::from(glyphs.glyf_offset) + u64::from(start))?;
    let num_contours = r.read_i16()?;
    let upem = f64::from(glyphs.units_per_em);
    let header_bbox = BoundingBox::new(
        f64::from(r.read_i16()?) / upem,
        f64::from(r.read_i16()?) / upem,
        f64::from(r.read_i16()?) / upem,
        f64::from(r.read_i16()?) / upem,
    );
    trace!("glyph {glyph_index}: {num_contours} contours");

    match num_contours {
        0 => Ok(RawOutline::empty(glyph_index)),
        n if n > 0 => read_simple(r, glyph_index, n as usize, upem, header_bbox),
        _ => read_composite(r, glyphs, glyph_index, depth),
    }
}

fn read_simple<R: Read + Seek>(
    r: &mut BinaryReader<R>,
    glyph_index: u16,
    num_contours: usize,
    upem: f64,
    header_bbox: BoundingBox,
) -> Result<RawOutline, FontError> {
    let mut end_points = Vec::with_capacity(num_contours);
    for _ in 0..num_contours {
        let end = usize::from(r.read_u16()?);
        if end_points.last().is_some_and(|&prev| end <= prev) {
            return Err(FontError::invalid(format!(
                "glyph {glyph_index}: contour end points are not increasing"
            )));
        }
        end_points.push(end);
    }

    let instruction_len = r.read_u16()?;
    r.skip(i64::from(instruction_len))?;

    let num_points = end_points.last().map_or(0, |&last| last + 1);
    let flags = read_flags(r, glyph_index, num_points)?;

    let xs = read_coordinates(r, &flags, X_SHORT, X_SAME_OR_POSITIVE)?;
    let ys = read_coordinates(r, &flags, Y_SHORT, Y_SAME_OR_POSITIVE)?;

    let mut bbox = header_bbox;
    let points = flags
        .iter()
        .zip(xs.iter().zip(&ys))
        .map(|(&flag, (&x, &y))| {
            let p = OutlinePoint::new(f64::from(x) / upem, f64::from(y) / upem, flag & ON_CURVE != 0);
            bbox.include(p.x, p.y);
            p
        })
        .collect();

    Ok(RawOutline {
        end_points,
        points,
        bbox,
        metrics_glyph: glyph_index,
    })
}

/// Read exactly `num_points` flags, expanding repeat runs. A run that would
/// overshoot the point count is cut short.
fn read_flags<R: Read + Seek>(
    r: &mut BinaryReader<R>,
    glyph_index: u16,
    num_points: usize,
) -> Result<Vec<u8>, FontError> {
    let mut flags = Vec::with_capacity(num_points);
    while flags.len() < num_points {
        let flag = r.read_u8()?;
        flags.push(flag);
        if flag & REPEAT == 0 {
            continue;
        }
        let count = usize::from(r.read_u8()?);
        let room = num_points - flags.len();
        if count > room {
            warn!(
                "glyph {glyph_index}: flag repeat of {count} overruns {num_points} points, truncating"
            );
        }
        flags.extend(std::iter::repeat(flag).take(count.min(room)));
    }
    Ok(flags)
}

/// Delta-decode one coordinate axis.
fn read_coordinates<R: Read + Seek>(
    r: &mut BinaryReader<R>,
    flags: &[u8],
    short: u8,
    same_or_positive: u8,
) -> Result<Vec<i32>, FontError> {
    let mut coord = 0i32;
    let mut out = Vec::with_capacity(flags.len());
    for &flag in flags {
        if flag & short != 0 {
            let delta = i32::from(r.read_u8()?);
            if flag & same_or_positive != 0 {
                coord += delta;
            } else {
                coord -= delta;
            }
        } else if flag & same_or_positive == 0 {
            coord += i32::from(r.read_i16()?);
        }
        out.push(coord);
    }
    Ok(out)
}

fn read_composite<R: Read + Seek>(
    r: &mut BinaryReader<R>,
    glyphs: &GlyphLocations<'_>,
    glyph_index: u16,
    depth: usize,
) -> Result<RawOutline, FontError> {
    if depth >= MAX_COMPOSITE_DEPTH {
        return Err(FontError::invalid(format!(
            "glyph {glyph_index}: composite nesting deeper than {MAX_COMPOSITE_DEPTH}"
        )));
    }

    let upem = f64::from(glyphs.units_per_em);
    let mut outline = RawOutline::empty(glyph_index);

    loop {
        let flags = r.read_u16()?;
        let component = r.read_u16()?;
        if usize::from(component) >= glyphs.num_glyphs() {
            return Err(FontError::invalid(format!(
                "glyph {glyph_index}: component {component} out of range"
            )));
        }

        let (arg1, arg2) = if flags & ARG_1_AND_2_ARE_WORDS != 0 {
            (r.read_i16()?, r.read_i16()?)
        } else {
            (i16::from(r.read_i8()?), i16::from(r.read_i8()?))
        };

        let (xx, xy, yx, yy) = if flags & WE_HAVE_A_SCALE != 0 {
            let s = r.read_f2dot14()?;
            (s, 0.0, 0.0, s)
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            (r.read_f2dot14()?, 0.0, 0.0, r.read_f2dot14()?)
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            (r.read_f2dot14()?, r.read_f2dot14()?, r.read_f2dot14()?, r.read_f2dot14()?)
        } else {
            (1.0, 0.0, 0.0, 1.0)
        };

        if flags & ARGS_ARE_XY_VALUES == 0 {
            warn!(
                "{}",
                FontError::UnsupportedFeature(format!(
                    "point-matched component {component} of glyph {glyph_index}"
                ))
            );
        } else {
            if flags & USE_MY_METRICS != 0 {
                outline.metrics_glyph = component;
            }
            let transform = ComponentTransform {
                xx,
                xy,
                yx,
                yy,
                dx: f64::from(arg1) / upem,
                dy: f64::from(arg2) / upem,
            };

            let resume = r.position()?;
            let sub = extract(r, glyphs, component, depth + 1)?;
            r.seek(resume)?;

            let base = outline.points.len();
            outline.end_points.extend(sub.end_points.iter().map(|e| e + base));
            outline.points.extend(sub.points.into_iter().map(|p| transform.apply(p)));
        }

        if flags & MORE_COMPONENTS == 0 {
            break;
        }
    }

    outline.include_points();
    Ok(outline)
}
