//! Citation compositing: append a rendered attribution band below an image.
//!
//! The transformation is pure image-in/image-out: the original pixels are
//! copied unmodified and a white band with the citation line in black is
//! added below them. Vector input is rejected at load time; transparency is
//! flattened onto white so the band never looks inconsistent against the
//! source. Citing an already-cited image stacks a second band — callers own
//! the at-most-once guarantee.

use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};

use ab_glyph::{Font as _, FontVec, PxScale};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::error::CompositeError;
use crate::metadata::CitationMetadata;

/// Vertical padding above and below the citation text, in pixels.
pub const PADDING: u32 = 20;

/// Floor for the citation font size, for legibility on small images.
pub const MIN_FONT_SIZE: u32 = 16;

/// Divisor for proportional font sizing against the smaller dimension.
const FONT_SIZE_DIVISOR: u32 = 40;

/// Cell edge of the built-in bitmap font.
const BITMAP_CELL: u32 = 8;

/// JPEG re-encode quality, matching the rest of the pipeline's output.
const JPEG_QUALITY: u8 = 95;

/// `max(16, min(w, h) / 40)` — proportional to the smaller image dimension
/// with a floor, so citations stay legible on small images without
/// dominating large ones.
pub fn font_size_for(width: u32, height: u32) -> u32 {
    MIN_FONT_SIZE.max(width.min(height) / FONT_SIZE_DIVISOR)
}

// ---------------------------------------------------------------------------
// Font fallback chain
// ---------------------------------------------------------------------------

/// One loaded font in the fallback chain.
enum LoadedFont {
    /// An outline font loaded from a configured TTF/OTF path.
    Outline { path: PathBuf, font: FontVec },
    /// The built-in 8×8 bitmap font; always available, ASCII/Latin-1/Greek
    /// coverage only.
    Builtin,
}

impl LoadedFont {
    /// Whether every character of `text` has a glyph in this font.
    fn can_render(&self, text: &str) -> bool {
        match self {
            Self::Outline { font, .. } => text
                .chars()
                .all(|c| c.is_whitespace() || font.glyph_id(c).0 != 0),
            Self::Builtin => text.chars().all(|c| bitmap_glyph(c).is_some()),
        }
    }

    /// Measured pixel size of `text` at `font_size`.
    fn measure(&self, text: &str, font_size: u32) -> (u32, u32) {
        match self {
            Self::Outline { font, .. } => {
                let scale = PxScale::from(font_size as f32);
                imageproc::drawing::text_size(scale, font, text)
            }
            Self::Builtin => {
                let cell = bitmap_scale(font_size) * BITMAP_CELL;
                (text.chars().count() as u32 * cell, cell)
            }
        }
    }

    /// Draw `text` in black at `(x, y)` (top-left of the text box).
    fn draw(&self, canvas: &mut RgbImage, text: &str, x: i32, y: i32, font_size: u32) {
        const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
        match self {
            Self::Outline { font, .. } => {
                let scale = PxScale::from(font_size as f32);
                imageproc::drawing::draw_text_mut(canvas, BLACK, x, y, scale, font, text);
            }
            Self::Builtin => {
                let scale = bitmap_scale(font_size);
                let (width, height) = canvas.dimensions();
                for (index, ch) in text.chars().enumerate() {
                    // can_render ran first; a hole here renders as a blank cell.
                    let Some(glyph) = bitmap_glyph(ch) else {
                        continue;
                    };
                    let cell_x = x + (index as u32 * BITMAP_CELL * scale) as i32;
                    for (row, bits) in glyph.iter().enumerate() {
                        for col in 0..BITMAP_CELL {
                            if bits & (1 << col) == 0 {
                                continue;
                            }
                            for dy in 0..scale {
                                for dx in 0..scale {
                                    let px = cell_x + (col * scale + dx) as i32;
                                    let py = y + (row as u32 * scale + dy) as i32;
                                    if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                                        canvas.put_pixel(px as u32, py as u32, BLACK);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Integer upscale factor for the bitmap font at a target size.
fn bitmap_scale(font_size: u32) -> u32 {
    (font_size / BITMAP_CELL).max(1)
}

/// Glyph lookup across the built-in font's basic, Latin-1, and Greek blocks.
fn bitmap_glyph(c: char) -> Option<[u8; 8]> {
    use font8x8::{BASIC_FONTS, GREEK_FONTS, LATIN_FONTS, UnicodeFonts};
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| GREEK_FONTS.get(c))
}

/// Ordered font fallback chain for citation rendering.
///
/// Configured TTF/OTF paths are tried in declared order; paths that fail to
/// load are skipped with a warning. The chain always terminates in the
/// built-in bitmap font, so a usable font exists even on systems with no
/// font files at all.
pub struct FontStack {
    fonts: Vec<LoadedFont>,
}

impl FontStack {
    /// Load the given font files in order, appending the built-in terminal
    /// fallback.
    pub fn new(paths: &[PathBuf]) -> Self {
        let mut fonts = Vec::with_capacity(paths.len() + 1);
        for path in paths {
            match std::fs::read(path).map(FontVec::try_from_vec) {
                Ok(Ok(font)) => fonts.push(LoadedFont::Outline {
                    path: path.clone(),
                    font,
                }),
                Ok(Err(_)) => {
                    tracing::warn!(path = %path.display(), "not a loadable font, skipping");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot read font, skipping");
                }
            }
        }
        fonts.push(LoadedFont::Builtin);
        Self { fonts }
    }

    /// Just the built-in bitmap font.
    pub fn builtin_only() -> Self {
        Self {
            fonts: vec![LoadedFont::Builtin],
        }
    }

    /// First font in the chain with full glyph coverage for `text`.
    fn first_renderable(&self, text: &str) -> Option<&LoadedFont> {
        self.fonts.iter().find(|font| font.can_render(text))
    }

    /// Names of the loaded outline fonts, for diagnostics.
    pub fn outline_paths(&self) -> Vec<&Path> {
        self.fonts
            .iter()
            .filter_map(|font| match font {
                LoadedFont::Outline { path, .. } => Some(path.as_path()),
                LoadedFont::Builtin => None,
            })
            .collect()
    }
}

impl Default for FontStack {
    fn default() -> Self {
        Self::builtin_only()
    }
}

// ---------------------------------------------------------------------------
// Compositing
// ---------------------------------------------------------------------------

/// Render `metadata`'s citation line onto a copy of `image`.
///
/// The output keeps the input width and grows by the text height plus
/// `2 * PADDING`. The input is never mutated; transparency and non-RGB
/// color are flattened onto opaque white first.
pub fn composite(
    image: &DynamicImage,
    metadata: &CitationMetadata,
    fonts: &FontStack,
) -> Result<RgbImage, CompositeError> {
    let flat = flatten_to_rgb(image);
    let (width, height) = flat.dimensions();
    let font_size = font_size_for(width, height);
    let line = metadata.citation_line();

    let font = fonts
        .first_renderable(&line)
        .ok_or_else(|| CompositeError::RenderFailure {
            reason: format!("no font in the chain covers all characters of {line:?}"),
        })?;
    let (text_width, text_height) = font.measure(&line, font_size);

    let band_height = text_height + 2 * PADDING;
    let mut out = RgbImage::from_pixel(width, height + band_height, Rgb([255, 255, 255]));
    image::imageops::replace(&mut out, &flat, 0, 0);

    let text_x = width.saturating_sub(text_width) / 2;
    let text_y = height + PADDING;
    font.draw(&mut out, &line, text_x as i32, text_y as i32, font_size);

    Ok(out)
}

/// Flatten any decoded image to opaque RGB.
///
/// Alpha is composited over white; opaque RGB passes through unchanged.
pub(crate) fn flatten_to_rgb(image: &DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb.clone(),
        other if other.color().has_alpha() => {
            let rgba = other.to_rgba8();
            let mut out = RgbImage::new(rgba.width(), rgba.height());
            for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
                let alpha = src.0[3] as u16;
                for channel in 0..3 {
                    let value = src.0[channel] as u16;
                    dst.0[channel] = ((value * alpha + 255 * (255 - alpha)) / 255) as u8;
                }
            }
            out
        }
        other => other.to_rgb8(),
    }
}

/// Load a raster image from disk, refusing vector formats outright.
pub fn load_raster(path: &Path) -> Result<DynamicImage, CompositeError> {
    if is_vector(path)? {
        return Err(CompositeError::UnsupportedFormat {
            path: path.display().to_string(),
        });
    }
    image::open(path).map_err(|source| CompositeError::Decode {
        path: path.display().to_string(),
        source,
    })
}

/// SVG detection: extension first, then a content sniff for mislabeled
/// files (Commons thumbnails occasionally arrive as XML under a raster
/// extension).
fn is_vector(path: &Path) -> Result<bool, CompositeError> {
    let by_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    if by_extension {
        return Ok(true);
    }

    let io_err = |source: std::io::Error| CompositeError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut head = [0u8; 256];
    let mut file = File::open(path).map_err(io_err)?;
    let n = file.read(&mut head).map_err(io_err)?;
    let head = String::from_utf8_lossy(&head[..n]);
    let head = head.trim_start();
    Ok(head.starts_with("<svg") || head.starts_with("<?xml"))
}

/// Composite a citation onto the image at `path`, replacing the file.
///
/// The composite runs fully in memory and the result is written through a
/// temp file renamed over the original, so no failure mode leaves a partial
/// or uncited-but-modified asset behind.
pub fn cite_in_place(
    path: &Path,
    metadata: &CitationMetadata,
    fonts: &FontStack,
) -> Result<(), CompositeError> {
    let image = load_raster(path)?;
    let cited = composite(&image, metadata, fonts)?;

    let format = ImageFormat::from_path(path).map_err(|source| CompositeError::Encode { source })?;
    let tmp = path.with_extension("tmp.quizfig");
    let result = write_encoded(&cited, &tmp, format).and_then(|()| {
        std::fs::rename(&tmp, path).map_err(|source| CompositeError::Io {
            path: path.display().to_string(),
            source,
        })
    });
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

fn write_encoded(image: &RgbImage, dest: &Path, format: ImageFormat) -> Result<(), CompositeError> {
    let io_err = |source: std::io::Error| CompositeError::Io {
        path: dest.display().to_string(),
        source,
    };
    match format {
        ImageFormat::Jpeg => {
            let file = File::create(dest).map_err(io_err)?;
            let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
            image
                .write_with_encoder(encoder)
                .map_err(|source| CompositeError::Encode { source })
        }
        other => image
            .save_with_format(dest, other)
            .map_err(|source| CompositeError::Encode { source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::LicenseTag;

    fn metadata(title: &str, author: &str, license: LicenseTag) -> CitationMetadata {
        CitationMetadata {
            title: title.to_string(),
            author: author.to_string(),
            author_url: None,
            license,
            source_url: String::new(),
            file_title: String::new(),
        }
    }

    #[test]
    fn font_size_has_a_floor_of_16() {
        assert_eq!(font_size_for(400, 300), 16);
        assert_eq!(font_size_for(100, 80), 16);
    }

    #[test]
    fn font_size_scales_with_smaller_dimension() {
        assert_eq!(font_size_for(4000, 2000), 50);
        assert_eq!(font_size_for(2000, 4000), 50);
    }

    #[test]
    fn band_geometry_matches_reference_example() {
        // 400x300 opaque RGB, empty title/author, CC0: font size 16, builtin
        // text height 16, band 56 — final 400x356.
        let base = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 300, Rgb([10, 20, 30])));
        let cited = composite(
            &base,
            &metadata("", "", LicenseTag::Cc0),
            &FontStack::builtin_only(),
        )
        .unwrap();
        assert_eq!(cited.dimensions(), (400, 356));
    }

    #[test]
    fn original_pixels_are_preserved() {
        let base = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([200, 10, 10])));
        let cited = composite(
            &base,
            &metadata("t", "a", LicenseTag::Cc),
            &FontStack::builtin_only(),
        )
        .unwrap();
        for y in 0..48 {
            for x in 0..64 {
                assert_eq!(cited.get_pixel(x, y), &Rgb([200, 10, 10]));
            }
        }
    }

    #[test]
    fn compositing_is_deterministic() {
        let base = DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 90, Rgb([0, 0, 0])));
        let meta = metadata("Scan", "Doe", LicenseTag::CcBy(None));
        let fonts = FontStack::builtin_only();
        let a = composite(&base, &meta, &fonts).unwrap();
        let b = composite(&base, &meta, &fonts).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn compositing_twice_stacks_bands() {
        let base = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let meta = metadata("t", "a", LicenseTag::Cc);
        let fonts = FontStack::builtin_only();
        let once = composite(&base, &meta, &fonts).unwrap();
        let twice = composite(&DynamicImage::ImageRgb8(once.clone()), &meta, &fonts).unwrap();
        assert!(twice.height() > once.height());
        assert_eq!(twice.width(), once.width());
    }

    #[test]
    fn alpha_is_flattened_onto_white() {
        let mut rgba = image::RgbaImage::new(10, 10);
        for pixel in rgba.pixels_mut() {
            *pixel = image::Rgba([0, 0, 0, 0]); // fully transparent
        }
        let cited = composite(
            &DynamicImage::ImageRgba8(rgba),
            &metadata("t", "a", LicenseTag::Cc),
            &FontStack::builtin_only(),
        )
        .unwrap();
        assert_eq!(cited.get_pixel(5, 5), &Rgb([255, 255, 255]));
    }

    #[test]
    fn semi_transparent_pixels_blend_toward_white() {
        let mut rgba = image::RgbaImage::new(4, 4);
        for pixel in rgba.pixels_mut() {
            *pixel = image::Rgba([0, 0, 0, 128]);
        }
        let flat = flatten_to_rgb(&DynamicImage::ImageRgba8(rgba));
        let value = flat.get_pixel(0, 0).0[0];
        // 50% black over white is mid-gray.
        assert!((126..=128).contains(&value), "got {value}");
    }

    #[test]
    fn unrenderable_characters_fail_rendering() {
        let base = DynamicImage::ImageRgb8(RgbImage::new(50, 50));
        let err = composite(
            &base,
            &metadata("心電図", "а", LicenseTag::Cc),
            &FontStack::builtin_only(),
        )
        .unwrap_err();
        assert!(matches!(err, CompositeError::RenderFailure { .. }));
    }

    #[test]
    fn text_is_horizontally_centered() {
        let base = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 300, Rgb([255, 255, 255])));
        let cited = composite(
            &base,
            &metadata("x", "y", LicenseTag::Cc),
            &FontStack::builtin_only(),
        )
        .unwrap();
        // Scan the band for black pixels; the ink must straddle the midline.
        let band_top = 300 + PADDING;
        let mut min_x = u32::MAX;
        let mut max_x = 0;
        for y in band_top..cited.height() {
            for x in 0..cited.width() {
                if cited.get_pixel(x, y) == &Rgb([0, 0, 0]) {
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                }
            }
        }
        assert!(min_x < 150 && max_x >= 150, "ink spans {min_x}..{max_x}");
    }
}
