//! Rich diagnostic error types for quizfig.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for quizfig.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source chains) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum QuizfigError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Commons(#[from] CommonsError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Composite(#[from] CompositeError),

    #[cfg(feature = "svg")]
    #[error(transparent)]
    #[diagnostic(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Log(#[from] LogError),
}

// ---------------------------------------------------------------------------
// Quiz parsing errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("no questions found in content ({bytes} bytes scanned)")]
    #[diagnostic(
        code(quizfig::parse::no_questions),
        help(
            "The content text must contain blocks of the form \
             `Question N: ... Answer: ...`. Check that you passed the \
             right file and that it is plain text, not a binary export."
        )
    )]
    NoQuestions { bytes: usize },

    #[error("failed to read content file {path}: {source}")]
    #[diagnostic(
        code(quizfig::parse::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Wikimedia Commons API errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CommonsError {
    #[error("transport error talking to the Commons API: {message}")]
    #[diagnostic(
        code(quizfig::commons::transport),
        help(
            "The request never completed — check network connectivity, \
             DNS, and the configured API base URL."
        )
    )]
    Transport { message: String },

    #[error("Commons API returned HTTP {code} for {endpoint}")]
    #[diagnostic(
        code(quizfig::commons::status),
        help(
            "A non-success status usually means the query parameters are \
             malformed or the API is rate-limiting. The pipeline's polite \
             delay is fixed; slow down by raising `polite_delay` if this \
             recurs."
        )
    )]
    Status { code: u16, endpoint: String },

    #[error("malformed Commons API response: {message}")]
    #[diagnostic(
        code(quizfig::commons::malformed),
        help(
            "The response body did not match the expected MediaWiki query \
             shape. The API may have changed, or an intermediary returned \
             an error page."
        )
    )]
    Malformed { message: String },
}

// ---------------------------------------------------------------------------
// Download errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("transport error downloading {url}: {message}")]
    #[diagnostic(
        code(quizfig::fetch::transport),
        help("The download never completed — check network connectivity.")
    )]
    Transport { url: String, message: String },

    #[error("HTTP {code} downloading {url}")]
    #[diagnostic(
        code(quizfig::fetch::status),
        help(
            "The image URL was resolved from the Commons API but the file \
             server refused it. The file may have been deleted or renamed \
             since the search result was produced."
        )
    )]
    Status { code: u16, url: String },

    #[error("download exceeds size limit: {url} is over {limit} bytes")]
    #[diagnostic(
        code(quizfig::fetch::too_large),
        help(
            "Raise `max_download_bytes` in the pipeline configuration if \
             you genuinely need files this large."
        )
    )]
    TooLarge { url: String, limit: u64 },

    #[error("I/O error writing {path}: {source}")]
    #[diagnostic(
        code(quizfig::fetch::io),
        help("Check that the output directory exists and has free space.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Citation compositing errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CompositeError {
    #[error("unsupported format: {path} is a vector image")]
    #[diagnostic(
        code(quizfig::composite::unsupported_format),
        help(
            "The compositor only accepts raster input (JPEG/PNG/GIF). \
             Rasterize vector files first — with the `svg` feature enabled, \
             `quizfig convert-svg` does this."
        )
    )]
    UnsupportedFormat { path: String },

    #[error("no configured font can render the citation line: {reason}")]
    #[diagnostic(
        code(quizfig::composite::render_failure),
        help(
            "Every font in the fallback chain was tried, including the \
             built-in bitmap font. The citation text likely contains \
             characters outside their coverage — add a TTF with wider \
             coverage via `--font`."
        )
    )]
    RenderFailure { reason: String },

    #[error("failed to decode image {path}: {source}")]
    #[diagnostic(
        code(quizfig::composite::decode),
        help(
            "The file is not a decodable raster image. It may be truncated \
             or mislabeled; re-download it."
        )
    )]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode cited image: {source}")]
    #[diagnostic(
        code(quizfig::composite::encode),
        help("The composited image could not be written in the target format.")
    )]
    Encode {
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error on {path}: {source}")]
    #[diagnostic(
        code(quizfig::composite::io),
        help(
            "Compositing writes through a temp file and renames over the \
             original; check directory permissions and free space."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// SVG rasterization errors (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "svg")]
#[derive(Debug, Error, Diagnostic)]
pub enum RasterError {
    #[error("failed to parse SVG {path}: {message}")]
    #[diagnostic(
        code(quizfig::raster::parse),
        help("The file is not well-formed SVG, or uses features resvg does not support.")
    )]
    Parse { path: String, message: String },

    #[error("SVG {path} has a degenerate size ({width}x{height})")]
    #[diagnostic(
        code(quizfig::raster::degenerate),
        help("The SVG declares a zero or negative dimension and cannot be rendered.")
    )]
    Degenerate {
        path: String,
        width: f32,
        height: f32,
    },

    #[error("I/O error on {path}: {source}")]
    #[diagnostic(code(quizfig::raster::io), help("Check file permissions."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Download log errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LogError {
    #[error("I/O error on log file {path}: {source}")]
    #[diagnostic(
        code(quizfig::log::io),
        help("Check that the output directory exists and is writable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no downloads recoverable from log {path}")]
    #[diagnostic(
        code(quizfig::log::empty),
        help(
            "The log contains no `Downloading:` entries. Either the \
             download run found nothing, or this is not a quizfig \
             download_log.txt."
        )
    )]
    Empty { path: String },
}

/// Convenience alias for functions returning quizfig results.
pub type QuizfigResult<T> = std::result::Result<T, QuizfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_converts_to_quizfig_error() {
        let err = ParseError::NoQuestions { bytes: 42 };
        let top: QuizfigError = err.into();
        assert!(matches!(top, QuizfigError::Parse(ParseError::NoQuestions { .. })));
    }

    #[test]
    fn composite_error_converts_to_quizfig_error() {
        let err = CompositeError::UnsupportedFormat {
            path: "figure.svg".into(),
        };
        let top: QuizfigError = err.into();
        assert!(matches!(
            top,
            QuizfigError::Composite(CompositeError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = FetchError::Status {
            code: 404,
            url: "https://upload.wikimedia.org/x.jpg".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("404"));
        assert!(msg.contains("x.jpg"));
    }
}
