//! The flat download audit log.
//!
//! One `download_log.txt` per output directory records, per question, the
//! derived topic, which Commons files were fetched, and whether the
//! citation was applied. The format is the only persistence the pipeline
//! has, so it is also parseable: `cite` re-reads it to apply citations to
//! images downloaded in an earlier run.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::LogError;
use crate::question::QuestionRecord;

/// Standard log file name inside an output directory.
pub const LOG_FILE_NAME: &str = "download_log.txt";

/// How much of the question/answer text the log keeps.
const PREVIEW_CHARS: usize = 100;

static QUESTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Question (\d+): ").unwrap());
static DOWNLOAD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Downloading(?: option ([a-z]))?: (File:[^\n]+)\n\s*URL: ([^\n]+)").unwrap()
});

/// Append-only writer for the download log.
pub struct DownloadLog {
    path: PathBuf,
    file: File,
}

impl DownloadLog {
    /// Create (truncating) the log with its heading block.
    pub fn create(path: &Path, heading: &str) -> Result<Self, LogError> {
        let file = File::create(path).map_err(|source| LogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut log = Self {
            path: path.to_path_buf(),
            file,
        };
        log.write(&format!("{heading}\n{}\n\n", "=".repeat(50)))?;
        Ok(log)
    }

    /// Start a question block: number, topic, and text previews.
    pub fn begin_question(&mut self, record: &QuestionRecord, topic: &str) -> Result<(), LogError> {
        self.write(&format!(
            "Question {}: {}\n  Question: {}\n  Answer: {}\n",
            record.number,
            topic,
            preview(&record.question),
            preview(&record.answer),
        ))
    }

    /// Record a download attempt. `option` is the per-question slot letter
    /// when more than one image is fetched per question.
    pub fn downloading(
        &mut self,
        option: Option<char>,
        file_title: &str,
        url: &str,
    ) -> Result<(), LogError> {
        match option {
            Some(letter) => self.write(&format!(
                "  Downloading option {letter}: {file_title}\n  URL: {url}\n"
            )),
            None => self.write(&format!("  Downloading: {file_title}\n  URL: {url}\n")),
        }
    }

    pub fn saved_with_citation(&mut self, citation_line: &str) -> Result<(), LogError> {
        self.write(&format!(
            "  ✓ Successfully saved with citation\n  Citation: {citation_line}\n\n"
        ))
    }

    pub fn saved_without_citation(&mut self, reason: &str) -> Result<(), LogError> {
        self.write(&format!("  ✓ Saved ({reason})\n\n"))
    }

    pub fn download_failed(&mut self) -> Result<(), LogError> {
        self.write("  ✗ Download failed\n")
    }

    pub fn no_image_found(&mut self) -> Result<(), LogError> {
        self.write("  ERROR: No CC-licensed image found\n\n")
    }

    pub fn no_usable_topic(&mut self) -> Result<(), LogError> {
        self.write("  ERROR: No usable topic could be derived\n\n")
    }

    pub fn partial(&mut self, downloaded: usize) -> Result<(), LogError> {
        self.write(&format!("  Note: Only {downloaded} image(s) downloaded\n\n"))
    }

    fn write(&mut self, text: &str) -> Result<(), LogError> {
        self.file
            .write_all(text.as_bytes())
            .map_err(|source| LogError::Io {
                path: self.path.display().to_string(),
                source,
            })
    }
}

/// Truncate to the log's preview length, marking elided text.
fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let head: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}

/// One download recovered from a log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedDownload {
    pub question: u32,
    /// Slot letter when the run fetched multiple options per question.
    pub option: Option<char>,
    /// Commons title including the `File:` prefix.
    pub file_title: String,
    pub url: String,
}

impl LoggedDownload {
    /// The local file this entry would have been saved as, given its
    /// extension; probes the known extensions and returns the first that
    /// exists in `dir`.
    pub fn locate_in(&self, dir: &Path) -> Option<PathBuf> {
        let stem = match self.option {
            Some(letter) => format!("question_{:02}_option_{letter}", self.question),
            None => format!("question_{:02}", self.question),
        };
        ["jpg", "png", "gif", "svg"]
            .iter()
            .map(|ext| dir.join(format!("{stem}.{ext}")))
            .find(|candidate| candidate.exists())
    }
}

/// Parse a download log back into its download entries.
pub fn parse_log(path: &Path) -> Result<Vec<LoggedDownload>, LogError> {
    let content = std::fs::read_to_string(path).map_err(|source| LogError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let headers: Vec<(usize, u32)> = QUESTION_LINE
        .captures_iter(&content)
        .filter_map(|caps| {
            let m = caps.get(0)?;
            let number = caps.get(1)?.as_str().parse().ok()?;
            Some((m.start(), number))
        })
        .collect();

    let mut downloads = Vec::new();
    for (idx, &(start, question)) in headers.iter().enumerate() {
        let end = headers.get(idx + 1).map_or(content.len(), |&(s, _)| s);
        for caps in DOWNLOAD_LINE.captures_iter(&content[start..end]) {
            downloads.push(LoggedDownload {
                question,
                option: caps.get(1).and_then(|m| m.as_str().chars().next()),
                file_title: caps[2].trim().to_string(),
                url: caps[3].trim().to_string(),
            });
        }
    }

    if downloads.is_empty() {
        return Err(LogError::Empty {
            path: path.display().to_string(),
        });
    }
    Ok(downloads)
}
