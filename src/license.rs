//! License short-codes derived from raw Commons license strings.
//!
//! Commons extmetadata reports licenses as free-text markers like
//! `cc-by-sa-4.0` or `Public domain`; citations only ever carry the
//! normalized short code.

use std::fmt;

use serde::Serialize;

/// Creative Commons license versions that appear in Commons metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CcVersion {
    V2,
    V3,
    V4,
}

impl CcVersion {
    fn detect(raw: &str) -> Option<Self> {
        if raw.contains("4.0") {
            Some(Self::V4)
        } else if raw.contains("3.0") {
            Some(Self::V3)
        } else if raw.contains("2.0") {
            Some(Self::V2)
        } else {
            None
        }
    }
}

impl fmt::Display for CcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V2 => write!(f, "2.0"),
            Self::V3 => write!(f, "3.0"),
            Self::V4 => write!(f, "4.0"),
        }
    }
}

/// Normalized license short-code, the closed set used in citation lines.
///
/// Derived by substring inspection of the raw license string. `cc-by-sa`
/// is tested before `cc-by` (every BY-SA marker contains `cc-by`, so the
/// reverse order would make share-alike codes unreachable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LicenseTag {
    /// CC0 or public domain.
    Cc0,
    CcBy(Option<CcVersion>),
    CcBySa(Option<CcVersion>),
    /// Creative Commons, flavor unrecognized.
    Cc,
}

impl LicenseTag {
    /// Inspect a raw license string and produce its short-code.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("cc-by-sa") || lower.contains("cc by-sa") {
            Self::CcBySa(CcVersion::detect(&lower))
        } else if lower.contains("cc-by") || lower.contains("cc by") {
            Self::CcBy(CcVersion::detect(&lower))
        } else if lower.contains("cc0") || lower.contains("public domain") {
            Self::Cc0
        } else {
            Self::Cc
        }
    }

    /// Whether the license is some Creative Commons flavor (always true for
    /// this closed set; present so callers can gate on future additions).
    pub fn is_creative_commons(&self) -> bool {
        true
    }
}

impl fmt::Display for LicenseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cc0 => write!(f, "CC0"),
            Self::CcBy(None) => write!(f, "CC BY"),
            Self::CcBy(Some(v)) => write!(f, "CC BY {v}"),
            Self::CcBySa(None) => write!(f, "CC BY-SA"),
            Self::CcBySa(Some(v)) => write!(f, "CC BY-SA {v}"),
            Self::Cc => write!(f, "CC"),
        }
    }
}
