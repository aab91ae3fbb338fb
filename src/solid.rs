//! A glyph extruded into a transformable, ray-traceable solid.

use std::fmt;
use std::sync::Arc;

use lyon::geom::euclid::default::{Box3D, Point3D, Transform3D, Vector3D};
use lyon::geom::euclid::Angle;

use crate::geometry;
use crate::glyph::Glyph;

/// Default minimum distance for an accepted ray hit.
pub const DEFAULT_RAY_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3D<f64>,
    pub direction: Vector3D<f64>,
}

impl Ray {
    pub fn new(origin: Point3D<f64>, direction: Vector3D<f64>) -> Self {
        Ray { origin, direction }
    }

    pub fn at(&self, t: f64) -> Point3D<f64> {
        self.origin + self.direction * t
    }
}

/// A ray hit in world space. `depth` is the ray parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    pub depth: f64,
    pub point: Point3D<f64>,
    pub normal: Vector3D<f64>,
}

/// Restricts which hits a solid reports.
pub trait ClipRegion: fmt::Debug + Send + Sync {
    fn contains(&self, point: Point3D<f64>) -> bool;
}

/// Accepts every point.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoClip;

impl ClipRegion for NoClip {
    fn contains(&self, _point: Point3D<f64>) -> bool {
        true
    }
}

/// One glyph extruded along local Z from 0 to `depth`.
///
/// The glyph is shared: solids for repeated characters point at the same
/// decoded outline.
#[derive(Clone, Debug)]
pub struct TtfSolid {
    glyph: Arc<Glyph>,
    depth: f64,
    transform: Transform3D<f64>,
    inverse: Option<Transform3D<f64>>,
    inverted: bool,
    clip: Arc<dyn ClipRegion>,
    tolerance: f64,
    bounds: Box3D<f64>,
}

impl TtfSolid {
    pub fn new(glyph: Arc<Glyph>, depth: f64) -> Self {
        let mut solid = TtfSolid {
            glyph,
            depth,
            transform: Transform3D::identity(),
            inverse: Some(Transform3D::identity()),
            inverted: false,
            clip: Arc::new(NoClip),
            tolerance: DEFAULT_RAY_TOLERANCE,
            bounds: Box3D::zero(),
        };
        solid.update_bounds();
        solid
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self.update_bounds();
        self
    }

    pub fn with_clip(mut self, clip: Arc<dyn ClipRegion>) -> Self {
        self.clip = clip;
        self
    }

    pub fn glyph(&self) -> &Arc<Glyph> {
        &self.glyph
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    pub fn transform_matrix(&self) -> &Transform3D<f64> {
        &self.transform
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// World-space bounds, kept current with the transform.
    pub fn bounds(&self) -> Box3D<f64> {
        self.bounds
    }

    pub fn translate(&mut self, v: Vector3D<f64>) {
        self.transform(&Transform3D::translation(v.x, v.y, v.z));
    }

    pub fn scale(&mut self, v: Vector3D<f64>) {
        self.transform(&Transform3D::scale(v.x, v.y, v.z));
    }

    /// Rotate about X, then Y, then Z by the given angles in degrees.
    pub fn rotate(&mut self, degrees: Vector3D<f64>) {
        let rx = Transform3D::rotation(1.0, 0.0, 0.0, Angle::degrees(degrees.x));
        let ry = Transform3D::rotation(0.0, 1.0, 0.0, Angle::degrees(degrees.y));
        let rz = Transform3D::rotation(0.0, 0.0, 1.0, Angle::degrees(degrees.z));
        self.transform(&rx.then(&ry).then(&rz));
    }

    /// Apply `t` after the current transform.
    pub fn transform(&mut self, t: &Transform3D<f64>) {
        self.transform = self.transform.then(t);
        self.inverse = self.transform.inverse();
        self.update_bounds();
    }

    pub fn invert(&mut self) {
        self.inverted = !self.inverted;
    }

    fn update_bounds(&mut self) {
        let b = self.glyph.bbox;
        let (z0, z1) = (-self.tolerance, self.depth + self.tolerance);
        let corners = [
            Point3D::new(b.x_min, b.y_min, z0),
            Point3D::new(b.x_max, b.y_min, z0),
            Point3D::new(b.x_min, b.y_max, z0),
            Point3D::new(b.x_max, b.y_max, z0),
            Point3D::new(b.x_min, b.y_min, z1),
            Point3D::new(b.x_max, b.y_min, z1),
            Point3D::new(b.x_min, b.y_max, z1),
            Point3D::new(b.x_max, b.y_max, z1),
        ];
        self.bounds = Box3D::from_points(
            corners
                .iter()
                .filter_map(|&c| self.transform.transform_point3d(c)),
        );
    }

    /// Map a glyph-space normal to world space through the inverse transpose.
    fn world_normal(inverse: &Transform3D<f64>, n: Vector3D<f64>) -> Vector3D<f64> {
        let m = inverse;
        let world = Vector3D::new(
            n.x * m.m11 + n.y * m.m12 + n.z * m.m13,
            n.x * m.m21 + n.y * m.m22 + n.z * m.m23,
            n.x * m.m31 + n.y * m.m32 + n.z * m.m33,
        );
        let len = world.length();
        if len > 0.0 {
            world / len
        } else {
            world
        }
    }

    /// Every hit of `ray`, nearest first. Hits closer than the tolerance or
    /// outside the clip region are dropped.
    pub fn intersect(&self, ray: &Ray) -> Vec<Intersection> {
        let Some(inverse) = self.inverse else {
            return Vec::new();
        };
        let Some(p) = inverse.transform_point3d(ray.origin) else {
            return Vec::new();
        };
        let d = inverse.transform_vector3d(ray.direction);

        let mut hits: Vec<Intersection> = geometry::intersect_glyph(&self.glyph, p, d, self.depth)
            .into_iter()
            .filter(|hit| hit.t > self.tolerance)
            .map(|hit| Intersection {
                depth: hit.t,
                point: ray.at(hit.t),
                normal: Self::world_normal(&inverse, hit.normal),
            })
            .filter(|hit| self.clip.contains(hit.point))
            .collect();
        hits.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        hits
    }

    /// Whether a world-space point lies in the solid (outside, if inverted).
    pub fn inside(&self, point: Point3D<f64>) -> bool {
        let local = self.inverse.and_then(|inv| inv.transform_point3d(point));
        let contained = local.is_some_and(|p| {
            p.z >= 0.0 && p.z <= self.depth && self.glyph.inside(p.x, p.y)
        });
        contained != self.inverted
    }
}
