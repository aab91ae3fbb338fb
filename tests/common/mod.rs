//! Builds small TrueType fonts in memory.

#![allow(dead_code)]

use std::collections::BTreeMap;

pub const UNITS_PER_EM: u16 = 1000;

fn push16(buf: &mut Vec<u8>, v: i16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// A simple glyph with uncompressed flags and 16-bit deltas.
pub fn simple_glyph(points: &[(i16, i16, bool)], end_points: &[u16]) -> Vec<u8> {
    let mut buf = Vec::new();
    push16(&mut buf, end_points.len() as i16);
    let min_x = points.iter().map(|p| p.0).min().unwrap_or(0);
    let min_y = points.iter().map(|p| p.1).min().unwrap_or(0);
    let max_x = points.iter().map(|p| p.0).max().unwrap_or(0);
    let max_y = points.iter().map(|p| p.1).max().unwrap_or(0);
    for v in [min_x, min_y, max_x, max_y] {
        push16(&mut buf, v);
    }
    for &e in end_points {
        push_u16(&mut buf, e);
    }
    push_u16(&mut buf, 0);
    for p in points {
        buf.push(u8::from(p.2));
    }
    let mut prev = 0;
    for p in points {
        push16(&mut buf, p.0 - prev);
        prev = p.0;
    }
    prev = 0;
    for p in points {
        push16(&mut buf, p.1 - prev);
        prev = p.1;
    }
    buf
}

/// Placement matrix of a composite component.
#[derive(Clone, Copy, Debug)]
pub enum Scale {
    Identity,
    Uniform(f64),
    XY(f64, f64),
    /// (xscale, scale01, scale10, yscale) in file order.
    TwoByTwo([f64; 4]),
}

/// One component of a composite glyph.
#[derive(Clone, Copy, Debug)]
pub struct Component {
    pub glyph: u16,
    pub dx: i16,
    pub dy: i16,
    pub byte_args: bool,
    pub scale: Scale,
    pub use_my_metrics: bool,
}

impl Component {
    pub fn offset(glyph: u16, dx: i16, dy: i16) -> Self {
        Component {
            glyph,
            dx,
            dy,
            byte_args: false,
            scale: Scale::Identity,
            use_my_metrics: false,
        }
    }

    pub fn with_glyph(mut self, glyph: u16) -> Self {
        self.glyph = glyph;
        self
    }

    /// Store the offsets as signed bytes.
    pub fn bytes(mut self) -> Self {
        self.byte_args = true;
        self
    }

    pub fn scaled(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    pub fn use_my_metrics(mut self) -> Self {
        self.use_my_metrics = true;
        self
    }
}

fn push_f2dot14(buf: &mut Vec<u8>, v: f64) {
    push16(buf, (v * 16384.0).round() as i16);
}

/// A composite glyph with offset components.
pub fn composite_glyph(components: &[Component]) -> Vec<u8> {
    const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
    const ARGS_ARE_XY_VALUES: u16 = 0x0002;
    const WE_HAVE_A_SCALE: u16 = 0x0008;
    const MORE_COMPONENTS: u16 = 0x0020;
    const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
    const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
    const USE_MY_METRICS: u16 = 0x0200;

    let mut buf = Vec::new();
    push16(&mut buf, -1);
    buf.extend_from_slice(&[0u8; 8]);
    for (i, c) in components.iter().enumerate() {
        let mut flags = ARGS_ARE_XY_VALUES;
        if !c.byte_args {
            flags |= ARG_1_AND_2_ARE_WORDS;
        }
        if i + 1 < components.len() {
            flags |= MORE_COMPONENTS;
        }
        if c.use_my_metrics {
            flags |= USE_MY_METRICS;
        }
        flags |= match c.scale {
            Scale::Identity => 0,
            Scale::Uniform(_) => WE_HAVE_A_SCALE,
            Scale::XY(..) => WE_HAVE_AN_X_AND_Y_SCALE,
            Scale::TwoByTwo(_) => WE_HAVE_A_TWO_BY_TWO,
        };
        push_u16(&mut buf, flags);
        push_u16(&mut buf, c.glyph);
        if c.byte_args {
            buf.push(c.dx as i8 as u8);
            buf.push(c.dy as i8 as u8);
        } else {
            push16(&mut buf, c.dx);
            push16(&mut buf, c.dy);
        }
        match c.scale {
            Scale::Identity => {}
            Scale::Uniform(s) => push_f2dot14(&mut buf, s),
            Scale::XY(x, y) => {
                push_f2dot14(&mut buf, x);
                push_f2dot14(&mut buf, y);
            }
            Scale::TwoByTwo(m) => {
                for v in m {
                    push_f2dot14(&mut buf, v);
                }
            }
        }
    }
    buf
}

/// Triangle with its left edge at `x`.
pub fn triangle(x: i16) -> Vec<u8> {
    simple_glyph(&[(x, 0, true), (x + 600, 0, true), (x + 300, 700, true)], &[2])
}

/// Axis-aligned square.
pub fn square(x0: i16, y0: i16, x1: i16, y1: i16) -> Vec<u8> {
    simple_glyph(&[(x0, y0, true), (x1, y0, true), (x1, y1, true), (x0, y1, true)], &[3])
}

/// An 800 unit square with a 400 unit square hole.
pub fn ring() -> Vec<u8> {
    simple_glyph(
        &[
            (0, 0, true),
            (800, 0, true),
            (800, 800, true),
            (0, 800, true),
            (200, 200, true),
            (200, 600, true),
            (600, 600, true),
            (600, 200, true),
        ],
        &[3, 7],
    )
}

struct Entry {
    data: Vec<u8>,
    advance: u16,
    lsb: i16,
}

pub struct FontBuilder {
    units_per_em: u16,
    magic: u32,
    long_loca: bool,
    omit: Option<[u8; 4]>,
    fillers: Vec<[u8; 4]>,
    zero_counts: bool,
    glyphs: Vec<Entry>,
    cmap: BTreeMap<u16, u16>,
    kern: Option<Vec<(u16, u16, i16)>>,
    ascender: i16,
    descender: i16,
    line_gap: i16,
}

impl FontBuilder {
    /// A font holding only an empty `.notdef` glyph.
    pub fn new() -> Self {
        FontBuilder {
            units_per_em: UNITS_PER_EM,
            magic: 0x5F0F3CF5,
            long_loca: false,
            omit: None,
            fillers: Vec::new(),
            zero_counts: false,
            glyphs: vec![Entry {
                data: Vec::new(),
                advance: 500,
                lsb: 0,
            }],
            cmap: BTreeMap::new(),
            kern: None,
            ascender: 800,
            descender: -200,
            line_gap: 90,
        }
    }

    /// The font used by most tests.
    ///
    /// | char | glyph | outline                    | advance | lsb |
    /// |------|-------|----------------------------|---------|-----|
    /// | A    | 1     | triangle at x = 50         | 700     | 50  |
    /// | B    | 2     | square 100..500 x 0..500   | 600     | 100 |
    /// | O    | 3     | ring 0..800                | 900     | 0   |
    /// | C    | 4     | composite of two A's       | 1400    | 50  |
    ///
    /// Kerning: A B = -80, B A = +40.
    pub fn standard() -> Self {
        let mut b = Self::new();
        let a = b.glyph(triangle(50), 700, 50);
        let sq = b.glyph(square(100, 0, 500, 500), 600, 100);
        let o = b.glyph(ring(), 900, 0);
        let c = b.glyph(
            composite_glyph(&[Component::offset(a, 0, 0), Component::offset(a, 700, 0)]),
            1400,
            50,
        );
        b.map('A', a).map('B', sq).map('O', o).map('C', c);
        b.kern_pair(a, sq, -80).kern_pair(sq, a, 40);
        b
    }

    /// Append a glyph and return its index.
    pub fn glyph(&mut self, data: Vec<u8>, advance: u16, lsb: i16) -> u16 {
        self.glyphs.push(Entry { data, advance, lsb });
        (self.glyphs.len() - 1) as u16
    }

    pub fn map(&mut self, ch: char, glyph: u16) -> &mut Self {
        self.cmap.insert(ch as u16, glyph);
        self
    }

    pub fn kern_pair(&mut self, left: u16, right: u16, value: i16) -> &mut Self {
        self.kern.get_or_insert_with(Vec::new).push((left, right, value));
        self
    }

    pub fn long_loca(&mut self) -> &mut Self {
        self.long_loca = true;
        self
    }

    pub fn magic(&mut self, magic: u32) -> &mut Self {
        self.magic = magic;
        self
    }

    pub fn omit(&mut self, tag: &[u8; 4]) -> &mut Self {
        self.omit = Some(*tag);
        self
    }

    /// Add `count` unused 4-byte tables whose tags start with `prefix`.
    /// Tags sort with the rest of the directory.
    pub fn filler_tables(&mut self, prefix: u8, count: usize) -> &mut Self {
        for i in 0..count {
            let digits = format!("{:03}", i);
            let d = digits.as_bytes();
            self.fillers.push([prefix, d[0], d[1], d[2]]);
        }
        self
    }

    /// Declare zero glyphs in `maxp` and zero metrics in `hhea`.
    pub fn zero_counts(&mut self) -> &mut Self {
        self.zero_counts = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_at(0)
    }

    /// A TrueType collection holding this font as its only member.
    pub fn build_collection(&self) -> Vec<u8> {
        const HEADER_LEN: usize = 16;
        let mut ttc = Vec::new();
        ttc.extend_from_slice(b"ttcf");
        push_u32(&mut ttc, 0x00010000);
        push_u32(&mut ttc, 1);
        push_u32(&mut ttc, HEADER_LEN as u32);
        ttc.extend_from_slice(&self.build_at(HEADER_LEN));
        ttc
    }

    /// The sfnt bytes, with table offsets relative to a file position `base`.
    fn build_at(&self, base: usize) -> Vec<u8> {
        let (glyf, loca) = self.glyf_and_loca();
        let mut tables: Vec<([u8; 4], Vec<u8>)> = vec![
            (*b"cmap", self.cmap_table()),
            (*b"glyf", glyf),
            (*b"head", self.head_table()),
            (*b"hhea", self.hhea_table()),
            (*b"hmtx", self.hmtx_table()),
        ];
        if let Some(kern) = self.kern_table() {
            tables.push((*b"kern", kern));
        }
        tables.push((*b"loca", loca));
        tables.push((*b"maxp", self.maxp_table()));
        tables.extend(self.fillers.iter().map(|tag| (*tag, vec![0u8; 4])));
        tables.retain(|(tag, _)| Some(*tag) != self.omit);
        tables.sort_by_key(|(tag, _)| *tag);

        let num_tables = tables.len() as u16;
        let entry_selector = 15 - num_tables.leading_zeros() as u16;
        let search_range = 16 << entry_selector;

        let mut font = Vec::new();
        push_u32(&mut font, 0x00010000);
        push_u16(&mut font, num_tables);
        push_u16(&mut font, search_range);
        push_u16(&mut font, entry_selector);
        push_u16(&mut font, num_tables * 16 - search_range);

        let mut offset = base + 12 + 16 * tables.len();
        for (tag, data) in &tables {
            font.extend_from_slice(tag);
            push_u32(&mut font, 0);
            push_u32(&mut font, offset as u32);
            push_u32(&mut font, data.len() as u32);
            offset += (data.len() + 3) & !3;
        }
        for (_, data) in &tables {
            font.extend_from_slice(data);
            font.resize((font.len() + 3) & !3, 0);
        }
        font
    }

    fn glyf_and_loca(&self) -> (Vec<u8>, Vec<u8>) {
        let mut glyf = Vec::new();
        let mut offsets = vec![0u32];
        for g in &self.glyphs {
            glyf.extend_from_slice(&g.data);
            if glyf.len() % 2 == 1 {
                glyf.push(0);
            }
            offsets.push(glyf.len() as u32);
        }
        let mut loca = Vec::new();
        for o in offsets {
            if self.long_loca {
                push_u32(&mut loca, o);
            } else {
                push_u16(&mut loca, (o / 2) as u16);
            }
        }
        (glyf, loca)
    }

    fn head_table(&self) -> Vec<u8> {
        let mut head = vec![0u8; 54];
        head[0..4].copy_from_slice(&0x00010000u32.to_be_bytes());
        head[12..16].copy_from_slice(&self.magic.to_be_bytes());
        head[18..20].copy_from_slice(&self.units_per_em.to_be_bytes());
        head[36..38].copy_from_slice(&0i16.to_be_bytes());
        head[38..40].copy_from_slice(&(-200i16).to_be_bytes());
        head[40..42].copy_from_slice(&1400i16.to_be_bytes());
        head[42..44].copy_from_slice(&800i16.to_be_bytes());
        let loca_format: i16 = if self.long_loca { 1 } else { 0 };
        head[50..52].copy_from_slice(&loca_format.to_be_bytes());
        head
    }

    fn hhea_table(&self) -> Vec<u8> {
        let mut hhea = vec![0u8; 36];
        hhea[0..4].copy_from_slice(&0x00010000u32.to_be_bytes());
        hhea[4..6].copy_from_slice(&self.ascender.to_be_bytes());
        hhea[6..8].copy_from_slice(&self.descender.to_be_bytes());
        hhea[8..10].copy_from_slice(&self.line_gap.to_be_bytes());
        let max_advance = self.glyphs.iter().map(|g| g.advance).max().unwrap_or(0);
        hhea[10..12].copy_from_slice(&max_advance.to_be_bytes());
        let metrics = if self.zero_counts { 0 } else { self.glyphs.len() as u16 };
        hhea[34..36].copy_from_slice(&metrics.to_be_bytes());
        hhea
    }

    fn hmtx_table(&self) -> Vec<u8> {
        let mut hmtx = Vec::new();
        for g in &self.glyphs {
            push_u16(&mut hmtx, g.advance);
            push16(&mut hmtx, g.lsb);
        }
        hmtx
    }

    fn maxp_table(&self) -> Vec<u8> {
        let mut maxp = Vec::new();
        push_u32(&mut maxp, 0x00005000);
        push_u16(&mut maxp, if self.zero_counts { 0 } else { self.glyphs.len() as u16 });
        maxp
    }

    /// Format 4 (3,1) subtable with one segment per mapped character.
    fn cmap_table(&self) -> Vec<u8> {
        let mut segments: Vec<(u16, u16)> = self.cmap.iter().map(|(&c, &g)| (c, g)).collect();
        segments.push((0xFFFF, 0));
        let seg_count = segments.len() as u16;
        let entry_selector = 15 - seg_count.leading_zeros() as u16;
        let search_range = 2 << entry_selector;

        let mut sub = Vec::new();
        push_u16(&mut sub, 4);
        push_u16(&mut sub, 16 + 8 * seg_count);
        push_u16(&mut sub, 0);
        push_u16(&mut sub, seg_count * 2);
        push_u16(&mut sub, search_range);
        push_u16(&mut sub, entry_selector);
        push_u16(&mut sub, seg_count * 2 - search_range);
        for &(c, _) in &segments {
            push_u16(&mut sub, c);
        }
        push_u16(&mut sub, 0);
        for &(c, _) in &segments {
            push_u16(&mut sub, c);
        }
        for &(c, g) in &segments {
            let delta = if c == 0xFFFF { 1 } else { g.wrapping_sub(c) };
            push_u16(&mut sub, delta);
        }
        for _ in &segments {
            push_u16(&mut sub, 0);
        }

        let mut cmap = Vec::new();
        push_u16(&mut cmap, 0);
        push_u16(&mut cmap, 1);
        push_u16(&mut cmap, 3);
        push_u16(&mut cmap, 1);
        push_u32(&mut cmap, 12);
        cmap.extend_from_slice(&sub);
        cmap
    }

    /// Version 0 table with one horizontal format 0 subtable.
    fn kern_table(&self) -> Option<Vec<u8>> {
        let mut pairs = self.kern.clone()?;
        pairs.sort_by_key(|&(l, r, _)| (l, r));
        let n = pairs.len() as u16;

        let mut kern = Vec::new();
        push_u16(&mut kern, 0);
        push_u16(&mut kern, 1);
        push_u16(&mut kern, 0);
        push_u16(&mut kern, 14 + 6 * n);
        push_u16(&mut kern, 0x0001);
        push_u16(&mut kern, n);
        let entry_selector = if n == 0 { 0 } else { 15 - n.leading_zeros() as u16 };
        let search_range = if n == 0 { 0 } else { 6 << entry_selector };
        push_u16(&mut kern, search_range);
        push_u16(&mut kern, entry_selector);
        push_u16(&mut kern, (6 * n).saturating_sub(search_range));
        for (l, r, v) in pairs {
            push_u16(&mut kern, l);
            push_u16(&mut kern, r);
            push16(&mut kern, v);
        }
        Some(kern)
    }
}
