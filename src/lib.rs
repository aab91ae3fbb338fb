//! TrueType glyph decoding and exact ray intersection with extruded text.

pub mod cache;
pub mod cmap;
pub mod config;
pub mod error;
pub mod font;
pub mod geometry;
pub mod glyph;
pub mod kern;
pub mod outline;
pub mod reader;
pub mod solid;
pub mod tables;
pub mod text;

pub use cache::{FontCache, FontLocator, SearchPathLocator};
pub use config::{Config, ConfigError, StringEncoding};
pub use error::FontError;
pub use font::{FontFile, FontSource};
pub use glyph::{BoundingBox, Contour, Glyph, OutlinePoint};
pub use solid::{ClipRegion, Intersection, NoClip, Ray, TtfSolid};
pub use text::{TextNode, TextObject};
