//! Citation metadata: who made an image, under which license.
//!
//! Built from Commons extmetadata, which is messy: titles are often absent,
//! authors arrive as HTML fragments, licenses as machine markers. All of
//! that is normalized here so the compositor only ever sees a clean record.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::license::LicenseTag;

/// Rendered author label when attribution cannot be resolved.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Provenance record for one image, as used in citation lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationMetadata {
    /// Display title; falls back to the Commons file title at construction.
    pub title: String,
    /// Attribution, HTML-stripped. May be empty; rendered as `Unknown`.
    pub author: String,
    /// Commons user page for the author, when one can be derived.
    pub author_url: Option<String>,
    pub license: LicenseTag,
    /// Description page for the file.
    pub source_url: String,
    /// Commons file title without the `File:` prefix.
    pub file_title: String,
}

impl CitationMetadata {
    /// Assemble a record from raw extmetadata fields, applying the title,
    /// author, and license normalizations.
    pub fn from_extmetadata(
        file_title: &str,
        object_name: Option<&str>,
        artist_html: Option<&str>,
        revision_user: Option<&str>,
        raw_license: Option<&str>,
        description_url: Option<&str>,
    ) -> Self {
        let file_title = file_title.trim_start_matches("File:").trim().to_string();

        let title = object_name
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&file_title)
            .to_string();

        let author = artist_html
            .map(strip_html)
            .filter(|a| !a.is_empty())
            .or_else(|| {
                revision_user
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty())
            })
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

        let author_url = (author != UNKNOWN_AUTHOR).then(|| {
            format!(
                "https://commons.wikimedia.org/wiki/User:{}",
                author.replace(' ', "_")
            )
        });

        let source_url = description_url
            .map(str::to_string)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "https://commons.wikimedia.org/wiki/File:{}",
                    file_title.replace(' ', "_")
                )
            });

        Self {
            title,
            author,
            author_url,
            license: LicenseTag::parse(raw_license.unwrap_or_default()),
            source_url,
            file_title,
        }
    }

    /// The exact line rendered into the citation band:
    /// `"<title>" by <author> <license>`.
    pub fn citation_line(&self) -> String {
        let author = if self.author.is_empty() {
            UNKNOWN_AUTHOR
        } else {
            &self.author
        };
        format!("\"{}\" by {} {}", self.title, author, self.license)
    }
}

/// Drop HTML tags and collapse the remainder to trimmed plain text.
fn strip_html(fragment: &str) -> String {
    HTML_TAG.replace_all(fragment, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::CcVersion;

    #[test]
    fn citation_line_format() {
        let meta = CitationMetadata::from_extmetadata(
            "File:Mayo Clinic CT scan.jpg",
            Some("Mayo Clinic CT scan"),
            Some("Jane Doe"),
            None,
            Some("cc-by-2.0"),
            None,
        );
        assert_eq!(
            meta.citation_line(),
            "\"Mayo Clinic CT scan\" by Jane Doe CC BY 2.0"
        );
    }

    #[test]
    fn author_html_is_stripped() {
        let meta = CitationMetadata::from_extmetadata(
            "File:X.png",
            None,
            Some("<a href=\"//commons.wikimedia.org/wiki/User:Jdoe\">J. Doe</a>"),
            None,
            Some("cc-by-sa-3.0"),
            None,
        );
        assert_eq!(meta.author, "J. Doe");
        assert_eq!(meta.license, LicenseTag::CcBySa(Some(CcVersion::V3)));
    }

    #[test]
    fn tag_only_artist_falls_back_to_revision_user() {
        let meta = CitationMetadata::from_extmetadata(
            "File:X.png",
            None,
            Some("<span></span>"),
            Some("UploaderBot"),
            None,
            None,
        );
        assert_eq!(meta.author, "UploaderBot");
    }

    #[test]
    fn missing_everything_yields_unknown_author() {
        let meta =
            CitationMetadata::from_extmetadata("File:X.png", None, None, None, None, None);
        assert_eq!(meta.author, UNKNOWN_AUTHOR);
        assert!(meta.author_url.is_none());
    }

    #[test]
    fn empty_title_falls_back_to_file_title() {
        let meta = CitationMetadata::from_extmetadata(
            "File:Blood smear.jpg",
            Some("  "),
            None,
            None,
            None,
            None,
        );
        assert_eq!(meta.title, "Blood smear.jpg");
    }

    #[test]
    fn empty_author_renders_as_unknown_in_line() {
        let meta = CitationMetadata {
            title: String::new(),
            author: String::new(),
            author_url: None,
            license: LicenseTag::Cc0,
            source_url: String::new(),
            file_title: String::new(),
        };
        assert_eq!(meta.citation_line(), "\"\" by Unknown CC0");
    }

    #[test]
    fn source_url_defaults_to_description_page() {
        let meta =
            CitationMetadata::from_extmetadata("File:A B.png", None, None, None, None, None);
        assert_eq!(
            meta.source_url,
            "https://commons.wikimedia.org/wiki/File:A_B.png"
        );
    }
}
