//! Image download: HTTP GET to a local file.
//!
//! Enforces a timeout and a maximum body size so one oversized file cannot
//! stall or fill the disk mid-batch. Persistence format is whatever the
//! server sent; the extension is sniffed from the URL and file title.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::error::FetchError;

/// Maximum accepted image body (20 MB).
pub const MAX_DOWNLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Raster/vector extensions the pipeline knows how to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageExt {
    Jpg,
    Png,
    Gif,
    Svg,
}

impl ImageExt {
    /// Sniff an extension from the download URL and the Commons file title,
    /// defaulting to `.jpg` when neither is conclusive.
    pub fn sniff(url: &str, file_title: &str) -> Self {
        let url = url.to_lowercase();
        let title = file_title.to_lowercase();
        for (marker, ext) in [
            (".png", Self::Png),
            (".gif", Self::Gif),
            (".svg", Self::Svg),
        ] {
            if url.contains(marker) || title.contains(marker) {
                return ext;
            }
        }
        Self::Jpg
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Svg => "svg",
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Svg)
    }
}

/// Download `url` to `dest`, streaming in chunks.
///
/// The body is written directly to the destination; on any error the
/// partially-written file is removed so a failed download leaves nothing
/// behind.
pub fn download(agent: &ureq::Agent, user_agent: &str, url: &str, dest: &Path) -> Result<(), FetchError> {
    let response = match agent
        .get(url)
        .set("User-Agent", user_agent)
        .timeout(Duration::from_secs(30))
        .call()
    {
        Ok(response) => response,
        Err(ureq::Error::Status(code, _)) => {
            return Err(FetchError::Status {
                code,
                url: url.to_string(),
            });
        }
        Err(ureq::Error::Transport(transport)) => {
            return Err(FetchError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            });
        }
    };

    let result = write_body(response, url, dest);
    if result.is_err() {
        let _ = std::fs::remove_file(dest);
    }
    result
}

fn write_body(response: ureq::Response, url: &str, dest: &Path) -> Result<(), FetchError> {
    let io_err = |source: io::Error| FetchError::Io {
        path: dest.display().to_string(),
        source,
    };

    let mut reader = response.into_reader().take(MAX_DOWNLOAD_BYTES + 1);
    let mut file = File::create(dest).map_err(io_err)?;

    let mut total: u64 = 0;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        total += n as u64;
        if total > MAX_DOWNLOAD_BYTES {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit: MAX_DOWNLOAD_BYTES,
            });
        }
        file.write_all(&buf[..n]).map_err(io_err)?;
    }
    file.flush().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_prefers_marker_in_url() {
        assert_eq!(
            ImageExt::sniff("https://upload/x.png?width=800", "File:X"),
            ImageExt::Png
        );
    }

    #[test]
    fn sniff_falls_back_to_file_title() {
        assert_eq!(
            ImageExt::sniff("https://upload/thumb/abc", "File:Diagram.svg"),
            ImageExt::Svg
        );
    }

    #[test]
    fn sniff_defaults_to_jpg() {
        assert_eq!(
            ImageExt::sniff("https://upload/thumb/abc", "File:Photo"),
            ImageExt::Jpg
        );
    }

    #[test]
    fn only_svg_is_vector() {
        assert!(ImageExt::Svg.is_vector());
        assert!(!ImageExt::Png.is_vector());
        assert!(!ImageExt::Gif.is_vector());
        assert!(!ImageExt::Jpg.is_vector());
    }
}
