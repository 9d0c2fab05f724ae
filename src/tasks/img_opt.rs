// src/tasks/img_opt.rs

//! In-place image optimization of the source tree.
//!
//! PNG files are palette-quantized (when enabled) and recompressed; SVG
//! files are minified. JPEG and GIF pass through untouched. A file is
//! replaced only when the optimized bytes are strictly smaller.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use globset::GlobSet;
use imagequant::RGBA;
use regex::Regex;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::fs::{collect_matching_files, FileSystem};
use crate::tasks::{file_name, StageError, StageResultExt, Task, TaskContext};
use crate::watch::build_globset;

const STAGE: &str = "imagemin";

static SVG_NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<\?xml.*?\?>|<!DOCTYPE[^>]*>|<!--.*?-->|<metadata\b.*?</metadata>")
        .expect("svg noise pattern is valid")
});

static SVG_GAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("svg gap pattern is valid"));

#[derive(Debug, Clone)]
pub struct ImgOptTask {
    source_root: PathBuf,
    images: GlobSet,
    exclude: Vec<String>,
    png_level: u8,
    png_quality: Option<[u8; 2]>,
}

impl ImgOptTask {
    pub fn new(cfg: &ConfigFile) -> Result<Self> {
        Ok(Self {
            source_root: cfg.source_root(),
            images: build_globset(&[cfg.img.source_glob()])?,
            exclude: cfg.img.optimize_exclude.clone(),
            png_level: cfg.img.png_level.min(6),
            png_quality: cfg.img.png_quantize.then_some(cfg.img.png_quality),
        })
    }

    fn optimize(&self, fs: &dyn FileSystem, path: &Path) -> Result<Option<Vec<u8>>, StageError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "png" => {
                let data = fs.read(path).stage(STAGE)?;
                let invalid = |e: &dyn std::fmt::Display| {
                    StageError::content(STAGE, format!("{}: {e}", file_name(path)))
                };

                let mut best = optimize_png(&data, self.png_level).map_err(|e| invalid(&e))?;
                if let Some(quality) = self.png_quality {
                    if let Some(quantized) = quantize_png(&data, quality).map_err(|e| invalid(&e))? {
                        let quantized = optimize_png(&quantized, self.png_level).unwrap_or(quantized);
                        if quantized.len() < best.len() {
                            best = quantized;
                        }
                    }
                }
                Ok(smaller(best, data.len()))
            }
            "svg" => {
                let text = fs.read_to_string(path).stage(STAGE)?;
                Ok(smaller(minify_svg(&text).into_bytes(), text.len()))
            }
            _ => Ok(None),
        }
    }
}

fn smaller(candidate: Vec<u8>, original_len: usize) -> Option<Vec<u8>> {
    (candidate.len() < original_len).then_some(candidate)
}

/// Lossless PNG recompression at the given oxipng preset.
pub fn optimize_png(data: &[u8], level: u8) -> Result<Vec<u8>, oxipng::PngError> {
    oxipng::optimize_from_memory(data, &oxipng::Options::from_preset(level))
}

/// Reduce a PNG to a palette of at most 256 colors.
///
/// Returns `None` when the quantizer cannot reach `quality[0]`. The indexed
/// PNG it returns is meant to be recompressed with [`optimize_png`].
pub fn quantize_png(data: &[u8], quality: [u8; 2]) -> Result<Option<Vec<u8>>> {
    let (pixels, width, height) = decode_rgba(data)?;
    if pixels.is_empty() {
        return Ok(None);
    }

    let mut attr = imagequant::new();
    attr.set_quality(quality[0], quality[1])?;
    let mut image = attr.new_image(pixels.into_boxed_slice(), width, height, 0.0)?;
    let mut quantized = match attr.quantize(&mut image) {
        Ok(result) => result,
        Err(imagequant::Error::QualityTooLow) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    quantized.set_dithering_level(1.0)?;
    let (palette, indexed) = quantized.remapped(&mut image)?;

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width as u32, height as u32);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_palette(palette.iter().flat_map(|c| [c.r, c.g, c.b]).collect::<Vec<u8>>());
        if palette.iter().any(|c| c.a < u8::MAX) {
            encoder.set_trns(palette.iter().map(|c| c.a).collect::<Vec<u8>>());
        }
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&indexed)?;
        writer.finish()?;
    }
    Ok(Some(out))
}

/// Decode any PNG into 8-bit RGBA pixels.
fn decode_rgba(data: &[u8]) -> Result<(Vec<RGBA>, usize, usize)> {
    let mut decoder = png::Decoder::new(data);
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf)?;
    let bytes = &buf[..frame.buffer_size()];

    let pixels = match frame.color_type {
        png::ColorType::Rgba => bytes
            .chunks_exact(4)
            .map(|p| RGBA::new(p[0], p[1], p[2], p[3]))
            .collect(),
        png::ColorType::Rgb => bytes
            .chunks_exact(3)
            .map(|p| RGBA::new(p[0], p[1], p[2], u8::MAX))
            .collect(),
        png::ColorType::GrayscaleAlpha => bytes
            .chunks_exact(2)
            .map(|p| RGBA::new(p[0], p[0], p[0], p[1]))
            .collect(),
        png::ColorType::Grayscale => bytes
            .iter()
            .map(|&g| RGBA::new(g, g, g, u8::MAX))
            .collect(),
        png::ColorType::Indexed => return Err(anyhow!("palette was not expanded")),
    };
    Ok((pixels, frame.width as usize, frame.height as usize))
}

/// Drop prolog, doctype, comments, metadata and inter-tag whitespace.
/// The `viewBox` and all drawing attributes are kept as they are.
pub fn minify_svg(svg: &str) -> String {
    let stripped = SVG_NOISE_RE.replace_all(svg, "");
    SVG_GAP_RE.replace_all(stripped.trim(), "><").into_owned()
}

impl Task for ImgOptTask {
    fn name(&self) -> &str {
        "img:opt"
    }

    fn run(&self, ctx: &TaskContext) -> Result<(), StageError> {
        let fs = ctx.fs.as_ref();
        let images = collect_matching_files(fs, &self.source_root, &self.images).stage(STAGE)?;

        let mut rewritten = 0;
        for path in images.iter() {
            if self.exclude.contains(&file_name(path)) {
                debug!(path = ?path, "excluded from optimization");
                continue;
            }
            if let Some(bytes) = self.optimize(fs, path)? {
                fs.write(path, &bytes).stage(STAGE)?;
                debug!(path = ?path, size = bytes.len(), "image optimized");
                rewritten += 1;
            }
        }

        info!(rewritten, scanned = images.len(), "images optimized");
        Ok(())
    }
}
