//! Wikimedia Commons API client.
//!
//! Uses `ureq` for synchronous requests against the MediaWiki `action=query`
//! API: File-namespace search, direct image URL resolution, and extmetadata
//! lookup. Every request carries a User-Agent (the API rejects anonymous
//! clients) and a timeout. Rate limiting beyond the pipeline's polite delay
//! is out of scope.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::CommonsError;
use crate::metadata::CitationMetadata;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://commons.wikimedia.org/w/api.php";

/// Default User-Agent, in the contact-bearing form the API asks for.
pub const DEFAULT_USER_AGENT: &str =
    "quizfig/0.4 (https://github.com/Toasterson/quizfig)";

/// Width hint for resolved image URLs; keeps downloads at a reasonable size.
const IMAGE_WIDTH: u32 = 800;

/// One File-namespace search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    /// Page title, normally prefixed `File:`.
    pub title: String,
}

impl SearchHit {
    /// Hits whose title lacks the `File:` prefix are not downloadable files.
    pub fn is_file(&self) -> bool {
        self.title.starts_with("File:")
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<QueryBody>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    search: Vec<SearchHit>,
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
    #[serde(default)]
    revisions: Vec<Revision>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    thumburl: Option<String>,
    #[serde(default)]
    descriptionurl: Option<String>,
    #[serde(default)]
    extmetadata: Option<ExtMetadata>,
}

#[derive(Debug, Deserialize)]
struct Revision {
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExtMetadata {
    #[serde(rename = "ObjectName", default)]
    object_name: Option<ValueField>,
    #[serde(rename = "Artist", default)]
    artist: Option<ValueField>,
    #[serde(rename = "License", default)]
    license: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    #[serde(default)]
    value: Option<String>,
}

impl ValueField {
    fn as_deref(field: &Option<Self>) -> Option<&str> {
        field
            .as_ref()
            .and_then(|f| f.value.as_deref())
            .filter(|v| !v.is_empty())
    }
}

/// Synchronous Commons API client.
pub struct CommonsClient {
    agent: ureq::Agent,
    base_url: String,
    user_agent: String,
}

impl CommonsClient {
    /// Client against the production Commons endpoint with a 10 s timeout.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, user_agent)
    }

    /// Client against an alternative endpoint (tests point this at a fixture
    /// server).
    pub fn with_base_url(base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .build();
        Self {
            agent,
            base_url: base_url.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Search the File namespace for `query`, returning up to `limit` hits.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, CommonsError> {
        let response = self.call(&[
            ("action", "query"),
            ("format", "json"),
            ("list", "search"),
            ("srsearch", query),
            ("srnamespace", "6"),
            ("srlimit", &limit.to_string()),
            ("srprop", "size|wordcount|timestamp|snippet"),
        ])?;
        Ok(response.query.map(|q| q.search).unwrap_or_default())
    }

    /// Resolve the direct download URL for a file title, preferring the
    /// width-bounded thumbnail URL when the API provides one.
    pub fn image_url(&self, file_title: &str) -> Result<Option<String>, CommonsError> {
        let title = normalize_file_title(file_title);
        let response = self.call(&[
            ("action", "query"),
            ("format", "json"),
            ("titles", &title),
            ("prop", "imageinfo"),
            ("iiprop", "url"),
            ("iiurlwidth", &IMAGE_WIDTH.to_string()),
        ])?;

        let url = response
            .query
            .into_iter()
            .flat_map(|q| q.pages.into_values())
            .flat_map(|page| page.imageinfo)
            .find_map(|info| info.thumburl.or(info.url));
        Ok(url)
    }

    /// Fetch citation metadata for a file title. `Ok(None)` when the page
    /// does not exist or carries no imageinfo.
    pub fn metadata(&self, file_title: &str) -> Result<Option<CitationMetadata>, CommonsError> {
        let title = normalize_file_title(file_title);
        let response = self.call(&[
            ("action", "query"),
            ("format", "json"),
            ("titles", &title),
            ("prop", "imageinfo|revisions"),
            ("iiprop", "url|extmetadata"),
            ("rvprop", "user"),
            ("rvlimit", "1"),
        ])?;

        let Some(query) = response.query else {
            return Ok(None);
        };
        for page in query.pages.into_values() {
            let Some(info) = page.imageinfo.into_iter().next() else {
                continue;
            };
            let ext = info.extmetadata.unwrap_or_default();
            let revision_user = page
                .revisions
                .first()
                .and_then(|r| r.user.as_deref());
            return Ok(Some(CitationMetadata::from_extmetadata(
                &title,
                ValueField::as_deref(&ext.object_name),
                ValueField::as_deref(&ext.artist),
                revision_user,
                ValueField::as_deref(&ext.license),
                info.descriptionurl.as_deref(),
            )));
        }
        Ok(None)
    }

    fn call(&self, params: &[(&str, &str)]) -> Result<ApiResponse, CommonsError> {
        let mut request = self
            .agent
            .get(&self.base_url)
            .set("User-Agent", &self.user_agent);
        for &(key, value) in params {
            request = request.query(key, value);
        }

        match request.call() {
            Ok(response) => response.into_json().map_err(|e| CommonsError::Malformed {
                message: e.to_string(),
            }),
            Err(ureq::Error::Status(code, _)) => Err(CommonsError::Status {
                code,
                endpoint: self.base_url.clone(),
            }),
            Err(ureq::Error::Transport(transport)) => Err(CommonsError::Transport {
                message: transport.to_string(),
            }),
        }
    }
}

/// Ensure a page title carries exactly one `File:` prefix.
fn normalize_file_title(file_title: &str) -> String {
    format!("File:{}", file_title.trim_start_matches("File:").trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_hit_file_detection() {
        let file = SearchHit {
            title: "File:Blood smear.jpg".into(),
        };
        let category = SearchHit {
            title: "Category:Hematology".into(),
        };
        assert!(file.is_file());
        assert!(!category.is_file());
    }

    #[test]
    fn file_title_normalization_is_idempotent() {
        assert_eq!(normalize_file_title("X.jpg"), "File:X.jpg");
        assert_eq!(normalize_file_title("File:X.jpg"), "File:X.jpg");
    }

    #[test]
    fn search_response_deserializes() {
        let body = r#"{"query":{"search":[{"title":"File:A.png","size":1}]}}"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        let hits = parsed.query.unwrap().search;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "File:A.png");
    }

    #[test]
    fn imageinfo_response_prefers_thumburl() {
        let body = r#"{
            "query": {"pages": {"123": {"imageinfo": [
                {"url": "https://upload/full.png",
                 "thumburl": "https://upload/800px-full.png"}
            ]}}}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        let url = parsed
            .query
            .into_iter()
            .flat_map(|q| q.pages.into_values())
            .flat_map(|p| p.imageinfo)
            .find_map(|i| i.thumburl.or(i.url));
        assert_eq!(url.as_deref(), Some("https://upload/800px-full.png"));
    }

    #[test]
    fn metadata_response_extracts_extmetadata_values() {
        let body = r#"{
            "query": {"pages": {"7": {
                "imageinfo": [{
                    "descriptionurl": "https://commons.wikimedia.org/wiki/File:A.png",
                    "extmetadata": {
                        "ObjectName": {"value": "A nice scan"},
                        "Artist": {"value": "<b>Jane</b>"},
                        "License": {"value": "cc-by-sa-4.0"}
                    }
                }],
                "revisions": [{"user": "Uploader"}]
            }}}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        let page = parsed.query.unwrap().pages.into_values().next().unwrap();
        let ext = page.imageinfo[0].extmetadata.as_ref().unwrap();
        assert_eq!(ValueField::as_deref(&ext.object_name), Some("A nice scan"));
        assert_eq!(page.revisions[0].user.as_deref(), Some("Uploader"));
    }

    #[test]
    fn missing_page_yields_no_metadata_fields() {
        let body = r#"{"query":{"pages":{"-1":{"missing":""}}}}"#;
        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        let page = parsed.query.unwrap().pages.into_values().next().unwrap();
        assert!(page.imageinfo.is_empty());
    }
}
