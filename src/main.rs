use std::fmt::{self, Write as _};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lyon::geom::euclid::default::{Point3D, Transform3D, Vector3D};
use lyon::geom::euclid::Angle;
use lyon::path::PathEvent;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ttf_extrude::{Config, FontCache, Glyph, Ray, TextObject};

/// Inspect TrueType fonts and ray trace extruded text.
///
/// Examples:
///   ttf-extrude info DejaVuSans.ttf
///   ttf-extrude glyph DejaVuSans.ttf g --json
///   ttf-extrude render DejaVuSans.ttf "Hello" --angle 25
#[derive(Parser, Debug, Clone)]
#[clap(name = "ttf-extrude", version, about = "TrueType outlines as extruded solids")]
struct CliArgs {
    #[clap(long = "config", short = 'c', help = "JSON configuration file")]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Print font-wide metrics
    Info {
        #[clap(help = "Font file, or a name found on the configured font paths")]
        font: String,
    },
    /// Print the decoded outline of one character
    Glyph {
        font: String,
        character: char,
        #[clap(long = "json", help = "Dump the glyph as JSON instead of SVG path data")]
        json: bool,
    },
    /// Ray trace a string and print it as ASCII art
    Render {
        font: String,
        text: String,
        #[clap(long = "depth", default_value_t = 0.2, help = "Extrusion depth in em units")]
        depth: f64,
        #[clap(long = "width", default_value_t = 80)]
        width: usize,
        #[clap(long = "height", default_value_t = 24)]
        height: usize,
        #[clap(long = "angle", default_value_t = 30.0, help = "Rotation about Y in degrees")]
        angle: f64,
    },
}

const RAMP: &[u8] = b"@%#*+=-:.";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {path:?}"))?,
        None => Config::default(),
    };
    let mut cache = FontCache::new(config);

    match args.command {
        Command::Info { font } => print_info(&mut cache, &font),
        Command::Glyph {
            font,
            character,
            json,
        } => print_glyph(&mut cache, &font, character, json),
        Command::Render {
            font,
            text,
            depth,
            width,
            height,
            angle,
        } => render(&mut cache, &font, &text, depth, width, height, angle),
    }
}

fn print_info(cache: &mut FontCache, name: &str) -> Result<()> {
    let font = cache.font(name).with_context(|| format!("opening {name}"))?;
    println!("name:          {}", font.name);
    println!("units per em:  {}", font.units_per_em);
    println!("glyphs:        {}", font.num_glyphs);
    println!("loca format:   {:?}", font.loca_format);
    println!("ascender:      {:.4}", font.ascender);
    println!("descender:     {:.4}", font.descender);
    println!("line gap:      {:.4}", font.line_gap);
    println!(
        "bbox:          ({:.4}, {:.4}) - ({:.4}, {:.4})",
        font.bbox.x_min, font.bbox.y_min, font.bbox.x_max, font.bbox.y_max
    );
    println!("kern tables:   {}", font.kerning_tables().subtables.len());
    Ok(())
}

fn print_glyph(cache: &mut FontCache, name: &str, ch: char, json: bool) -> Result<()> {
    let font = cache.font(name).with_context(|| format!("opening {name}"))?;
    let (glyph, index) = font.glyph(u32::from(ch))?;
    font.close();
    debug!("{ch:?} is glyph {index}");

    if json {
        println!("{}", serde_json::to_string_pretty(&*glyph)?);
    } else {
        println!("{}", svg_path_data(&glyph)?);
    }
    Ok(())
}

fn svg_path_data(glyph: &Glyph) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for event in glyph.to_path().iter() {
        match event {
            PathEvent::Begin { at } => write!(out, "M{} {} ", at.x, at.y),
            PathEvent::Line { to, .. } => write!(out, "L{} {} ", to.x, to.y),
            PathEvent::Quadratic { ctrl, to, .. } => {
                write!(out, "Q{} {} {} {} ", ctrl.x, ctrl.y, to.x, to.y)
            }
            PathEvent::Cubic {
                ctrl1, ctrl2, to, ..
            } => write!(
                out,
                "C{} {} {} {} {} {} ",
                ctrl1.x, ctrl1.y, ctrl2.x, ctrl2.y, to.x, to.y
            ),
            PathEvent::End { close: true, .. } => write!(out, "Z "),
            PathEvent::End { .. } => Ok(()),
        }?;
    }
    Ok(out.trim_end().to_string())
}

fn render(
    cache: &mut FontCache,
    name: &str,
    text: &str,
    depth: f64,
    width: usize,
    height: usize,
    angle: f64,
) -> Result<()> {
    let mut object = TextObject::new(cache, name, text, depth, Vector3D::zero())
        .with_context(|| format!("laying out {text:?} with {name}"))?;
    object.transform(&Transform3D::rotation(0.0, 1.0, 0.0, Angle::degrees(angle)));

    let b = object.bounds();
    let (cols, rows) = (width.max(1), height.max(1));
    info!("rendering {} glyphs into {cols}x{rows}", object.len());

    let mut depths = vec![None; cols * rows];
    for row in 0..rows {
        for col in 0..cols {
            let x = b.min.x + (col as f64 + 0.5) / cols as f64 * (b.max.x - b.min.x);
            let y = b.max.y - (row as f64 + 0.5) / rows as f64 * (b.max.y - b.min.y);
            let ray = Ray::new(Point3D::new(x, y, b.min.z - 1.0), Vector3D::new(0.0, 0.0, 1.0));
            depths[row * cols + col] = object.intersect(&ray).first().map(|hit| hit.depth);
        }
    }

    let near = depths.iter().flatten().copied().fold(f64::INFINITY, f64::min);
    let far = depths.iter().flatten().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = (far - near).max(f64::EPSILON);

    for line in depths.chunks(cols) {
        let row: String = line
            .iter()
            .map(|hit| match hit {
                Some(t) => {
                    let shade = ((t - near) / span * (RAMP.len() - 1) as f64).round() as usize;
                    RAMP[shade.min(RAMP.len() - 1)] as char
                }
                None => ' ',
            })
            .collect();
        println!("{}", row.trim_end());
    }
    Ok(())
}
