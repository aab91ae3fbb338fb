use std::sync::Arc;

use lyon::geom::euclid::default::{Box3D, Point3D, Transform3D, Vector3D};
use rctree::{Node, NodeEdge};
use tracing::{debug, trace};

use crate::cache::FontCache;
use crate::error::FontError;
use crate::font::FontFile;
use crate::solid::{Intersection, Ray, TtfSolid};

/// A node of the text union: the union itself, or one positioned glyph.
#[derive(Clone, Debug)]
pub enum TextNode {
    Union,
    Glyph(TtfSolid),
}

/// A string laid out as a union of extruded glyphs.
pub struct TextObject {
    root: Node<TextNode>,
    bounds: Box3D<f64>,
}

impl TextObject {
    /// Lay out `text` with the font registered as `font_name`, closing the
    /// font stream afterwards.
    pub fn new(
        cache: &mut FontCache,
        font_name: &str,
        text: &str,
        depth: f64,
        spacing: Vector3D<f64>,
    ) -> Result<Self, FontError> {
        let tolerance = cache.config().ray_tolerance;
        let font = cache.font(font_name)?;
        let object = Self::layout(font, text, depth, spacing, tolerance);
        font.close();
        object
    }

    /// Position one solid per character, left to right.
    ///
    /// The first glyph is shifted so its left edge sits at the origin. Each
    /// later glyph is placed at the pen plus its left side bearing and the
    /// kerning against the previous glyph; the pen then moves by the advance
    /// plus kerning. `spacing` is added to the pen after every character.
    pub fn layout(
        font: &mut FontFile,
        text: &str,
        depth: f64,
        spacing: Vector3D<f64>,
        tolerance: f64,
    ) -> Result<Self, FontError> {
        let upem = f64::from(font.units_per_em);
        let mut solids = Vec::new();
        let mut pen: Vector3D<f64> = Vector3D::zero();
        let mut previous: Option<u16> = None;

        for ch in text.chars() {
            let (glyph, index) = font.glyph(u32::from(ch))?;
            let metrics = font.metrics(glyph.metrics_glyph);
            let advance = f64::from(metrics.advance_width);
            let lsb = f64::from(metrics.lsb);

            let mut solid = TtfSolid::new(Arc::clone(&glyph), depth).with_tolerance(tolerance);
            match previous {
                None => {
                    solid.translate(Vector3D::new(-glyph.bbox.x_min, 0.0, 0.0));
                    pen.x = (advance - lsb) / upem;
                }
                Some(left) => {
                    let kern = font.kerning(left, glyph.metrics_glyph);
                    let kern_x = f64::from(kern.x);
                    solid.translate(Vector3D::new(
                        pen.x + (lsb + kern_x) / upem - glyph.bbox.x_min,
                        pen.y + f64::from(kern.y) / upem,
                        pen.z,
                    ));
                    pen.x += (advance + kern_x) / upem;
                }
            }
            pen += spacing;
            trace!("{ch:?}: glyph {index}, next pen at {:.4}", pen.x);

            solids.push(solid);
            previous = Some(glyph.metrics_glyph);
        }

        debug!("laid out {} glyphs with {}", solids.len(), font.name);
        Ok(Self::from_solids(solids))
    }

    /// Union of already positioned solids.
    pub fn from_solids(solids: impl IntoIterator<Item = TtfSolid>) -> Self {
        let root = Node::new(TextNode::Union);
        for solid in solids {
            root.append(Node::new(TextNode::Glyph(solid)));
        }
        let mut object = TextObject {
            root,
            bounds: Box3D::zero(),
        };
        object.update_bounds();
        object
    }

    pub fn root(&self) -> &Node<TextNode> {
        &self.root
    }

    fn nodes(&self) -> impl Iterator<Item = Node<TextNode>> {
        self.root.traverse().filter_map(|edge| match edge {
            NodeEdge::Start(node) => Some(node),
            NodeEdge::End(_) => None,
        })
    }

    /// Number of glyph solids.
    pub fn len(&self) -> usize {
        self.nodes()
            .filter(|node| matches!(&*node.borrow(), TextNode::Glyph(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies of the glyph solids in layout order.
    pub fn solids(&self) -> Vec<TtfSolid> {
        self.nodes()
            .filter_map(|node| {
                let data = node.borrow();
                match &*data {
                    TextNode::Glyph(solid) => Some(solid.clone()),
                    TextNode::Union => None,
                }
            })
            .collect()
    }

    pub fn bounds(&self) -> Box3D<f64> {
        self.bounds
    }

    fn update_bounds(&mut self) {
        let mut bounds: Option<Box3D<f64>> = None;
        for node in self.nodes() {
            if let TextNode::Glyph(solid) = &*node.borrow() {
                let b = solid.bounds();
                bounds = Some(bounds.map_or(b, |acc| acc.union(&b)));
            }
        }
        self.bounds = bounds.unwrap_or_else(Box3D::zero);
    }

    pub fn transform(&mut self, t: &Transform3D<f64>) {
        for node in self.nodes() {
            if let TextNode::Glyph(solid) = &mut *node.borrow_mut() {
                solid.transform(t);
            }
        }
        self.update_bounds();
    }

    pub fn translate(&mut self, v: Vector3D<f64>) {
        self.transform(&Transform3D::translation(v.x, v.y, v.z));
    }

    /// Hits on every glyph, nearest first.
    pub fn intersect(&self, ray: &Ray) -> Vec<Intersection> {
        let mut hits = Vec::new();
        for node in self.nodes() {
            if let TextNode::Glyph(solid) = &*node.borrow() {
                hits.extend(solid.intersect(ray));
            }
        }
        hits.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        hits
    }

    pub fn inside(&self, point: Point3D<f64>) -> bool {
        self.nodes().any(|node| {
            let data = node.borrow();
            match &*data {
                TextNode::Glyph(solid) => solid.inside(point),
                TextNode::Union => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::{BoundingBox, Glyph, OutlinePoint};
    use crate::outline::RawOutline;

    fn unit_square() -> Arc<Glyph> {
        let outline = RawOutline {
            end_points: vec![3],
            points: vec![
                OutlinePoint::new(0.0, 0.0, true),
                OutlinePoint::new(1.0, 0.0, true),
                OutlinePoint::new(1.0, 1.0, true),
                OutlinePoint::new(0.0, 1.0, true),
            ],
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            metrics_glyph: 1,
        };
        Arc::new(Glyph::build('a' as u32, 1, 1000, &outline))
    }

    fn two_squares() -> TextObject {
        let glyph = unit_square();
        let first = TtfSolid::new(Arc::clone(&glyph), 0.5);
        let mut second = TtfSolid::new(glyph, 0.5);
        second.translate(Vector3D::new(2.0, 0.0, 0.0));
        TextObject::from_solids([first, second])
    }

    #[test]
    fn counts_glyph_nodes_only() {
        let text = two_squares();
        assert_eq!(text.len(), 2);
        assert_eq!(text.root().children().count(), 2);
        assert!(TextObject::from_solids(Vec::new()).is_empty());
    }

    #[test]
    fn bounds_cover_every_glyph() {
        let b = two_squares().bounds();
        assert!((b.min.x - 0.0).abs() < 1e-12);
        assert!((b.max.x - 3.0).abs() < 1e-12);
        assert!((b.max.z - 0.5).abs() < 1e-5);
    }

    #[test]
    fn ray_along_x_hits_both_glyphs_in_order() {
        let text = two_squares();
        let ray = Ray::new(Point3D::new(-1.0, 0.5, 0.25), Vector3D::new(1.0, 0.0, 0.0));
        let depths: Vec<f64> = text.intersect(&ray).iter().map(|h| h.depth).collect();
        assert_eq!(depths.len(), 4);
        for (got, want) in depths.iter().zip([1.0, 2.0, 3.0, 4.0]) {
            assert!((got - want).abs() < 1e-9, "{got} != {want}");
        }
    }

    #[test]
    fn inside_is_union_of_glyphs() {
        let text = two_squares();
        assert!(text.inside(Point3D::new(0.5, 0.5, 0.25)));
        assert!(text.inside(Point3D::new(2.5, 0.5, 0.25)));
        assert!(!text.inside(Point3D::new(1.5, 0.5, 0.25)));
    }

    #[test]
    fn transform_moves_every_glyph() {
        let mut text = two_squares();
        text.translate(Vector3D::new(0.0, 10.0, 0.0));
        assert!(text.inside(Point3D::new(2.5, 10.5, 0.25)));
        assert!(!text.inside(Point3D::new(2.5, 0.5, 0.25)));
        assert!((text.bounds().min.y - 10.0).abs() < 1e-12);
    }
}
