//! Point containment and ray intersection for glyph contours extruded along
//! local Z.
//!
//! Everything here works in glyph space: em-square units, with the extrusion
//! running from `z = 0` to `z = depth`.

use std::ops::Deref;

use lyon::geom::euclid::default::{Point3D, Vector3D};
use lyon::geom::{LineSegment, QuadraticBezierSegment};

use crate::glyph::{Edge, Glyph};

/// Tolerance for parameter and direction comparisons.
pub const EPSILON: f64 = 1e-6;

/// Leading coefficients below this are treated as zero.
pub const COEFF_LIMIT: f64 = 1e-20;

/// Up to two real roots, in discovery order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Roots {
    values: [f64; 2],
    len: usize,
}

impl Roots {
    fn push(&mut self, root: f64) {
        self.values[self.len] = root;
        self.len += 1;
    }
}

impl Deref for Roots {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.values[..self.len]
    }
}

/// Real roots of `c[0]·t² + c[1]·t + c[2] = 0` that fall in `[min, max]`.
///
/// A vanishing leading coefficient degrades to the linear solution; a
/// discriminant below `EPSILON` counts as no real root.
pub fn solve_quad(c: [f64; 3], min: f64, max: f64) -> Roots {
    let a = c[0];
    let b = -c[1];
    let c = c[2];
    let in_range = |q: f64| q >= min && q <= max;
    let mut roots = Roots::default();

    if a.abs() < COEFF_LIMIT {
        if b.abs() < COEFF_LIMIT {
            return roots;
        }
        let q = c / b;
        if in_range(q) {
            roots.push(q);
        }
        return roots;
    }

    let d = b * b - 4.0 * a * c;
    if d < EPSILON {
        return roots;
    }
    let d = d.sqrt();
    let t = 2.0 * a;
    for q in [(b + d) / t, (b - d) / t] {
        if in_range(q) {
            roots.push(q);
        }
    }
    roots
}

/// Power-basis coefficients `[t², t, 1]` of one axis of a quadratic Bezier.
fn power_basis(p0: f64, p1: f64, p2: f64) -> [f64; 3] {
    [p0 - 2.0 * p1 + p2, 2.0 * (p1 - p0), p0]
}

fn eval(c: [f64; 3], t: f64) -> f64 {
    (c[0] * t + c[1]) * t + c[2]
}

/// Whether the horizontal ray from `(x, y)` towards +X crosses a line edge.
/// Endpoints are half-open in Y so a shared vertex counts once.
fn line_crosses(x: f64, y: f64, line: &LineSegment<f64>) -> bool {
    let (p0, p1) = (line.from, line.to);
    if p0.y == p1.y || (p0.y < y) == (p1.y < y) {
        return false;
    }
    match (p0.x > x, p1.x > x) {
        (true, true) => true,
        (false, false) => false,
        _ => {
            let xc = p0.x + (y - p0.y) * (p1.x - p0.x) / (p1.y - p0.y);
            xc - x > -EPSILON
        }
    }
}

/// Number of times the horizontal ray from `(x, y)` crosses a curve edge.
fn curve_crossings(x: f64, y: f64, quad: &QuadraticBezierSegment<f64>) -> u32 {
    let (y0, y1, y2) = (quad.from.y, quad.ctrl.y, quad.to.y);
    if (y0 < y && y1 < y && y2 < y) || (y0 > y && y1 > y && y2 > y) {
        return 0;
    }

    let mut yt = power_basis(y0, y1, y2);
    yt[2] -= y;
    let xt = power_basis(quad.from.x, quad.ctrl.x, quad.to.x);

    let mut crossings = 0;
    for &t in solve_quad(yt, 0.0, 1.0).iter() {
        // A root at an end of the curve only counts if the curve actually
        // passes through the scan line there.
        if t <= EPSILON {
            if (y <= y0 && y < y1) || (y >= y0 && y > y1) {
                continue;
            }
        } else if t >= 1.0 - EPSILON && ((y < y2 && y < y1) || (y > y2 && y > y1)) {
            continue;
        }
        if eval(xt, t) > x {
            crossings += 1;
        }
    }
    crossings
}

/// Even-odd containment of `(x, y)` in the glyph's contours.
pub fn inside(x: f64, y: f64, glyph: &Glyph) -> bool {
    let mut crossings = 0u32;
    for contour in &glyph.contours {
        for edge in contour.edges() {
            crossings += match edge {
                Edge::Line(line) => u32::from(line_crosses(x, y, &line)),
                Edge::Quad(quad) => curve_crossings(x, y, &quad),
            };
        }
    }
    crossings & 1 == 1
}

/// A ray hit in glyph space. `t` is the ray parameter; the normal is not
/// normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalHit {
    pub t: f64,
    pub normal: Vector3D<f64>,
}

/// Hits on the bottom (`z = 0`) and top (`z = depth`) caps.
fn cap_hits(glyph: &Glyph, p: Point3D<f64>, d: Vector3D<f64>, depth: f64, hits: &mut Vec<LocalHit>) {
    if d.z.abs() < EPSILON {
        return;
    }
    let t0 = -p.z / d.z;
    let t1 = t0 + depth / d.z;
    for (t, nz) in [(t0, -1.0), (t1, 1.0)] {
        if t > 0.0 && inside(p.x + t * d.x, p.y + t * d.y, glyph) {
            hits.push(LocalHit {
                t,
                normal: Vector3D::new(0.0, 0.0, nz),
            });
        }
    }
}

/// All intersections of the ray `p + t·d` with the glyph extruded to `depth`,
/// caps first, then side walls in contour order.
pub fn intersect_glyph(glyph: &Glyph, p: Point3D<f64>, d: Vector3D<f64>, depth: f64) -> Vec<LocalHit> {
    let mut hits = Vec::new();
    cap_hits(glyph, p, d, depth, &mut hits);

    // Parallel to the walls: only the caps can be hit.
    if d.x.abs() < EPSILON && d.y.abs() < EPSILON {
        return hits;
    }
    let solve_in_x = d.x.abs() >= EPSILON;

    // The ray projected into the XY plane as a·x + b·y + c = 0.
    let a = d.y;
    let b = -d.x;
    let c = p.y * d.x - p.x * d.y;

    let ray_param = |x: f64, y: f64| {
        if solve_in_x {
            (x - p.x) / d.x
        } else {
            (y - p.y) / d.y
        }
    };
    let mut accept = |t: f64, nx: f64, ny: f64| {
        let z = p.z + t * d.z;
        if z >= 0.0 && z <= depth {
            hits.push(LocalHit {
                t,
                normal: Vector3D::new(nx, ny, 0.0),
            });
        }
    };

    for contour in &glyph.contours {
        for edge in contour.edges() {
            match edge {
                Edge::Line(line) => {
                    let d0 = line.to.x - line.from.x;
                    let d1 = line.to.y - line.from.y;
                    let den = d1 * d.x - d0 * d.y;
                    if den.abs() < EPSILON {
                        continue;
                    }
                    let s = (d.x * (p.y - line.from.y) - d.y * (p.x - line.from.x)) / den;
                    if !(0.0..=1.0).contains(&s) {
                        continue;
                    }
                    let t = ray_param(line.from.x + s * d0, line.from.y + s * d1);
                    accept(t, d1, -d0);
                }
                Edge::Quad(quad) => {
                    let xt = power_basis(quad.from.x, quad.ctrl.x, quad.to.x);
                    let yt = power_basis(quad.from.y, quad.ctrl.y, quad.to.y);
                    let coeffs = [
                        a * xt[0] + b * yt[0],
                        a * xt[1] + b * yt[1],
                        a * xt[2] + b * yt[2] + c,
                    ];
                    for &s in solve_quad(coeffs, 0.0, 1.0).iter() {
                        let t = ray_param(eval(xt, s), eval(yt, s));
                        accept(t, 2.0 * yt[0] * s + yt[1], -(2.0 * xt[0] * s + xt[1]));
                    }
                }
            }
        }
    }
    hits
}
