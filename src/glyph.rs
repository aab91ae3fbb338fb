//! Closed quadratic contours built from decoded glyph outlines.

use lyon::geom::{point, LineSegment, Point, QuadraticBezierSegment};
use lyon::path::Path;
use serde::{Deserialize, Serialize};

use crate::geometry;
use crate::outline::RawOutline;

/// A control point in em-square units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutlinePoint {
    pub x: f64,
    pub y: f64,
    pub on_curve: bool,
}

impl OutlinePoint {
    pub fn new(x: f64, y: f64, on_curve: bool) -> Self {
        OutlinePoint { x, y, on_curve }
    }

    pub fn to_point(self) -> Point<f64> {
        point(self.x, self.y)
    }

    fn midpoint(self, other: OutlinePoint) -> OutlinePoint {
        OutlinePoint::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y), true)
    }
}

/// Axis-aligned bounds in em-square units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        BoundingBox { x_min, y_min, x_max, y_max }
    }

    /// Degenerate box at a single point.
    pub fn at(x: f64, y: f64) -> Self {
        BoundingBox::new(x, y, x, y)
    }

    pub fn include(&mut self, x: f64, y: f64) {
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x);
        self.y_max = self.y_max.max(y);
    }

    pub fn union(mut self, other: &BoundingBox) -> Self {
        self.include(other.x_min, other.y_min);
        self.include(other.x_max, other.y_max);
        self
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.x_min <= other.x_min
            && self.y_min <= other.y_min
            && self.x_max >= other.x_max
            && self.y_max >= other.y_max
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

/// One edge of a contour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Edge {
    Line(LineSegment<f64>),
    Quad(QuadraticBezierSegment<f64>),
}

/// A closed contour. The first point is on-curve and is repeated at the end,
/// and no two consecutive points are off-curve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    points: Vec<OutlinePoint>,
}

impl Contour {
    /// Build a closed contour from one contour's raw points.
    ///
    /// The point list is rotated to start on-curve (or, when every point is
    /// off-curve, started at the implied midpoint of the last and first), and
    /// implied on-curve midpoints are inserted between off-curve neighbours.
    pub fn from_points(raw: &[OutlinePoint]) -> Option<Contour> {
        let first = *raw.first()?;
        let last = *raw.last()?;

        let (start, rest): (OutlinePoint, Vec<OutlinePoint>) =
            match raw.iter().position(|p| p.on_curve) {
                Some(k) => (raw[k], raw[k + 1..].iter().chain(&raw[..k]).copied().collect()),
                None => (last.midpoint(first), raw.to_vec()),
            };

        let mut points = Vec::with_capacity(2 * raw.len() + 1);
        points.push(start);
        for p in rest.into_iter().chain(std::iter::once(start)) {
            let prev = points[points.len() - 1];
            if !prev.on_curve && !p.on_curve {
                points.push(prev.midpoint(p));
            }
            points.push(p);
        }
        Some(Contour { points })
    }

    /// Points including the closing duplicate of the first.
    pub fn points(&self) -> &[OutlinePoint] {
        &self.points
    }

    /// Number of distinct points.
    pub fn count(&self) -> usize {
        self.points.len() - 1
    }

    pub fn edges(&self) -> Edges<'_> {
        Edges {
            points: &self.points,
            prev: self.points[0],
            next: 1,
        }
    }
}

/// Walks a contour as line and quadratic edges.
pub struct Edges<'a> {
    points: &'a [OutlinePoint],
    prev: OutlinePoint,
    next: usize,
}

impl Iterator for Edges<'_> {
    type Item = Edge;

    fn next(&mut self) -> Option<Edge> {
        let p = *self.points.get(self.next)?;
        let from = self.prev.to_point();
        if p.on_curve {
            self.prev = p;
            self.next += 1;
            return Some(Edge::Line(LineSegment { from, to: p.to_point() }));
        }

        // An off-curve point is always followed by another point: the
        // contour ends on its on-curve start.
        let far = self.points.get(self.next + 1).copied().unwrap_or(self.points[0]);
        let (end, step) = if far.on_curve { (far, 2) } else { (p.midpoint(far), 1) };
        self.prev = end;
        self.next += step;
        Some(Edge::Quad(QuadraticBezierSegment {
            from,
            ctrl: p.to_point(),
            to: end.to_point(),
        }))
    }
}

/// A decoded glyph ready for geometric queries. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    /// Code point that first produced this glyph.
    pub codepoint: u32,
    pub glyph_index: u16,
    /// Glyph whose horizontal metrics apply (differs under USE_MY_METRICS).
    pub metrics_glyph: u16,
    pub bbox: BoundingBox,
    pub contours: Vec<Contour>,
    pub units_per_em: u16,
}

impl Glyph {
    /// Split a raw outline into closed contours.
    pub fn build(codepoint: u32, glyph_index: u16, units_per_em: u16, outline: &RawOutline) -> Glyph {
        let mut contours = Vec::with_capacity(outline.end_points.len());
        let mut start = 0;
        for &end in &outline.end_points {
            if let Some(contour) = outline.points.get(start..=end).and_then(Contour::from_points) {
                contours.push(contour);
            }
            start = end + 1;
        }

        Glyph {
            codepoint,
            glyph_index,
            metrics_glyph: outline.metrics_glyph,
            bbox: outline.bbox,
            contours,
            units_per_em,
        }
    }

    pub fn num_contours(&self) -> usize {
        self.contours.len()
    }

    /// Crossing-parity point-in-glyph test in em-square units.
    pub fn inside(&self, x: f64, y: f64) -> bool {
        geometry::inside(x, y, self)
    }

    /// The outline as a lyon path, one closed sub-path per contour.
    pub fn to_path(&self) -> Path {
        let mut builder = Path::builder();
        for contour in &self.contours {
            let start = contour.points[0];
            builder.begin(lyon::math::point(start.x as f32, start.y as f32));
            for edge in contour.edges() {
                match edge {
                    Edge::Line(line) => {
                        builder.line_to(lyon::math::point(line.to.x as f32, line.to.y as f32));
                    }
                    Edge::Quad(quad) => {
                        builder.quadratic_bezier_to(
                            lyon::math::point(quad.ctrl.x as f32, quad.ctrl.y as f32),
                            lyon::math::point(quad.to.x as f32, quad.to.y as f32),
                        );
                    }
                }
            }
            builder.close();
        }
        builder.build()
    }
}
