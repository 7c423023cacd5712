//! SVG rasterization (feature `svg`).
//!
//! The compositor categorically refuses vector input, so SVG downloads are
//! converted to raster here first: parse with usvg, render into a tiny-skia
//! pixmap at the document's intrinsic size, and hand back an opaque-capable
//! RGBA buffer for the normal flatten-and-cite path.

use std::path::Path;

use image::{DynamicImage, RgbaImage};
use resvg::{tiny_skia, usvg};

use crate::error::RasterError;

/// Rasterize the SVG at `path` at its intrinsic size.
pub fn rasterize_svg(path: &Path) -> Result<DynamicImage, RasterError> {
    let io_err = |source: std::io::Error| RasterError::Io {
        path: path.display().to_string(),
        source,
    };
    let data = std::fs::read(path).map_err(io_err)?;

    let tree = usvg::Tree::from_data(&data, &usvg::Options::default()).map_err(|e| {
        RasterError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    })?;

    let size = tree.size();
    let width = size.width().ceil() as u32;
    let height = size.height().ceil() as u32;
    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or(RasterError::Degenerate {
        path: path.display().to_string(),
        width: size.width(),
        height: size.height(),
    })?;

    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied RGBA; demultiply before handing the
    // buffer to the image crate.
    let mut rgba = RgbaImage::new(width, height);
    for (pixel, out) in pixmap.pixels().iter().zip(rgba.pixels_mut()) {
        let color = pixel.demultiply();
        *out = image::Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    Ok(DynamicImage::ImageRgba8(rgba))
}
