// tests/img_opt.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::fixtures::ICON_SVG;
use crate::common::{init_tracing, mock_context, site_root};

use std::error::Error;
use std::path::Path;

use assetdag::fs::mock::MockFileSystem;
use assetdag::fs::FileSystem;
use assetdag::tasks::img_opt::{minify_svg, optimize_png, quantize_png};
use assetdag::tasks::{ImgOptTask, Task};

type TestResult = Result<(), Box<dyn Error>>;

/// 64x64 RGB noise: thousands of distinct colors, so only a lossy palette
/// can index it.
fn noisy_png() -> Vec<u8> {
    let (width, height) = (64u32, 64u32);
    let mut state: u32 = 0x2545_f491;
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for _ in 0..width * height * 3 {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        pixels.push((state >> 24) as u8);
    }

    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&pixels).unwrap();
    writer.finish().unwrap();
    out
}

/// `(color type, width, height)` of an encoded PNG.
fn png_header(data: &[u8]) -> (png::ColorType, u32, u32) {
    let reader = png::Decoder::new(data).read_info().unwrap();
    let info = reader.info();
    (info.color_type, info.width, info.height)
}

#[test]
fn minify_svg_drops_noise_and_keeps_drawing() {
    let out = minify_svg(ICON_SVG);
    assert!(out.starts_with("<svg"));
    assert!(out.contains(r#"viewBox="0 0 10 10""#));
    assert!(out.contains(r#"<rect width="10" height="10"/>"#));
    assert!(!out.contains("<?xml"));
    assert!(!out.contains("<!--"));
    assert!(!out.contains("metadata"));
    assert!(!out.contains(">\n"));
}

#[test]
fn optimize_png_rejects_garbage() {
    assert!(optimize_png(b"definitely not a png", 2).is_err());
}

#[test]
fn img_opt_rewrites_smaller_files_in_place() -> TestResult {
    init_tracing();

    let tidy = r#"<svg viewBox="0 0 1 1"><path d="M0 0h1v1z"/></svg>"#;

    let fs = MockFileSystem::new();
    fs.add_file("/site/src/img/icon.svg", ICON_SVG);
    fs.add_file("/site/src/img/sprite-svg.svg", ICON_SVG);
    fs.add_file("/site/src/img/tidy.svg", tidy);
    fs.add_file("/site/src/img/photo.jpg", "jpeg bytes");
    fs.add_file("/site/src/img/anim.gif", "gif bytes");
    fs.add_file("/site/src/img/nested/deep.svg", ICON_SVG);

    let cfg = ConfigFileBuilder::new().rooted_at(site_root()).build();
    let (ctx, notifier) = mock_context(&fs);
    ImgOptTask::new(&cfg)?.run(&ctx)?;

    let read = |p: &str| fs.read_to_string(Path::new(p)).unwrap();
    assert_eq!(read("/site/src/img/icon.svg"), minify_svg(ICON_SVG));
    assert_eq!(read("/site/src/img/sprite-svg.svg"), ICON_SVG);
    assert_eq!(read("/site/src/img/tidy.svg"), tidy);
    assert_eq!(read("/site/src/img/photo.jpg"), "jpeg bytes");
    assert_eq!(read("/site/src/img/anim.gif"), "gif bytes");
    assert_eq!(read("/site/src/img/nested/deep.svg"), ICON_SVG);

    // Nothing lands in the build tree.
    assert!(!fs.exists(Path::new("/site/build")));
    assert!(notifier.notices().is_empty());
    Ok(())
}

#[test]
fn broken_png_is_a_content_error() {
    let fs = MockFileSystem::new();
    fs.add_file("/site/src/img/logo.png", b"\x89PNG\r\n\x1a\ntruncated".to_vec());
    let cfg = ConfigFileBuilder::new().rooted_at(site_root()).build();
    let (ctx, _) = mock_context(&fs);

    let err = ImgOptTask::new(&cfg).unwrap().run(&ctx).unwrap_err();
    assert!(err.is_content());
    assert_eq!(err.stage(), "imagemin");
    assert!(err.message().contains("logo.png"));
}

#[test]
fn quantize_png_produces_an_indexed_image() -> TestResult {
    let original = noisy_png();
    let quantized = quantize_png(&original, [0, 100])?.expect("quality floor of 0 is always met");

    assert_eq!(png_header(&quantized), (png::ColorType::Indexed, 64, 64));
    assert!(quantize_png(b"not a png", [0, 100]).is_err());
    Ok(())
}

#[test]
fn img_opt_quantizes_png_by_default() -> TestResult {
    init_tracing();

    let original = noisy_png();
    let fs = MockFileSystem::new();
    fs.add_file("/site/src/img/noise.png", original.clone());

    let cfg = ConfigFileBuilder::new().rooted_at(site_root()).build();
    let (ctx, notifier) = mock_context(&fs);
    ImgOptTask::new(&cfg)?.run(&ctx)?;

    let rewritten = fs.read(Path::new("/site/src/img/noise.png"))?;
    assert!(rewritten.len() < original.len());
    assert_eq!(png_header(&rewritten), (png::ColorType::Indexed, 64, 64));
    assert!(notifier.notices().is_empty());
    Ok(())
}

#[test]
fn img_opt_without_quantization_stays_lossless() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/site/src/img/noise.png", noisy_png());

    let cfg = ConfigFileBuilder::new()
        .rooted_at(site_root())
        .with_png_quantize(false)
        .build();
    let (ctx, _) = mock_context(&fs);
    ImgOptTask::new(&cfg)?.run(&ctx)?;

    let after = fs.read(Path::new("/site/src/img/noise.png"))?;
    assert_eq!(png_header(&after), (png::ColorType::Rgb, 64, 64));
    Ok(())
}
