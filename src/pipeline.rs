//! Sequential batch orchestration: questions in, cited images out.
//!
//! One polite, single-threaded loop per run. Every per-item failure is
//! logged and skipped; the batch itself only fails on setup errors
//! (unwritable output directory, unreadable log). Download order is
//! deck order, with a fixed inter-question delay toward the API.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::commons::{CommonsClient, DEFAULT_USER_AGENT};
use crate::composite::{FontStack, cite_in_place};
use crate::error::{FetchError, LogError, QuizfigResult};
use crate::fetch::{self, ImageExt};
use crate::logfile::{DownloadLog, LOG_FILE_NAME, parse_log};
use crate::question::QuestionRecord;
use crate::topic::TopicExtractor;

/// Configuration for a download run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory images and the log are written into; created if absent.
    pub output_dir: PathBuf,
    /// How many image options to fetch per question.
    pub images_per_question: usize,
    /// Search hits requested per query.
    pub search_limit: usize,
    /// Fixed delay between questions, politeness toward the API.
    pub polite_delay: Duration,
    /// User-Agent for API and file requests.
    pub user_agent: String,
    /// Ordered TTF/OTF paths for the citation font chain.
    pub font_paths: Vec<PathBuf>,
    /// First line of the download log.
    pub log_heading: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloaded_images"),
            images_per_question: 2,
            search_limit: 20,
            polite_delay: Duration::from_millis(500),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            font_paths: Vec::new(),
            log_heading: "Question Image Download Log".to_string(),
        }
    }
}

/// Outcome counts for a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub questions: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub cited: usize,
}

/// Run the full download pipeline over parsed question records.
pub fn run_download(
    records: &[QuestionRecord],
    extractor: &TopicExtractor,
    client: &CommonsClient,
    config: &PipelineConfig,
) -> QuizfigResult<BatchStats> {
    std::fs::create_dir_all(&config.output_dir).map_err(|source| LogError::Io {
        path: config.output_dir.display().to_string(),
        source,
    })?;
    let log_path = config.output_dir.join(LOG_FILE_NAME);
    let mut log = DownloadLog::create(&log_path, &config.log_heading)?;

    let fonts = FontStack::new(&config.font_paths);
    let download_agent = ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(30))
        .build();

    let mut stats = BatchStats {
        questions: records.len(),
        ..Default::default()
    };

    for (idx, record) in records.iter().enumerate() {
        let topic = extractor.extract(&record.answer, &record.question);
        if topic.is_empty() {
            warn!(question = record.number, "no usable topic, skipping");
            log.begin_question(record, "(no topic)")?;
            log.no_usable_topic()?;
            stats.failed += 1;
            continue;
        }

        info!(
            question = record.number,
            topic = %topic,
            "processing {}/{}",
            idx + 1,
            records.len()
        );
        log.begin_question(record, &topic)?;

        let hits = search_with_alternatives(client, &topic, record, config.search_limit);

        let mut saved = 0usize;
        for hit in &hits {
            if saved >= config.images_per_question {
                break;
            }
            if !hit.is_file() {
                continue;
            }

            let url = match client.image_url(&hit.title) {
                Ok(Some(url)) => url,
                Ok(None) => continue,
                Err(e) => {
                    warn!(file = %hit.title, error = %e, "could not resolve image URL");
                    continue;
                }
            };

            let ext = ImageExt::sniff(&url, &hit.title);
            let option = (config.images_per_question > 1)
                .then(|| (b'a' + saved as u8) as char);
            let dest = config.output_dir.join(match option {
                Some(letter) => {
                    format!("question_{:02}_option_{letter}.{}", record.number, ext.as_str())
                }
                None => format!("question_{:02}.{}", record.number, ext.as_str()),
            });

            log.downloading(option, &hit.title, &url)?;
            if let Err(e) = fetch::download(&download_agent, &config.user_agent, &url, &dest) {
                warn!(url = %url, error = %e, "download failed");
                log.download_failed()?;
                if matches!(e, FetchError::Io { .. }) {
                    // Disk-level failure: no point continuing the batch.
                    return Err(e.into());
                }
                continue;
            }

            annotate_download(client, &mut log, &fonts, &dest, &hit.title, ext, &mut stats)?;
            saved += 1;
            stats.downloaded += 1;
        }

        if saved == 0 {
            warn!(question = record.number, topic = %topic, "no image found");
            log.no_image_found()?;
            stats.failed += 1;
        } else if saved < config.images_per_question {
            log.partial(saved)?;
        }

        std::thread::sleep(config.polite_delay);
        if (idx + 1) % 10 == 0 {
            info!(
                processed = idx + 1,
                total = records.len(),
                downloaded = stats.downloaded,
                failed = stats.failed,
                "progress"
            );
        }
    }

    info!(
        downloaded = stats.downloaded,
        failed = stats.failed,
        dir = %config.output_dir.display(),
        "download complete"
    );
    Ok(stats)
}

/// Search for the topic; on an empty result set, retry the alternative
/// terms the deck convention suggests (underscored topic, lowercased
/// topic, first answer word).
fn search_with_alternatives(
    client: &CommonsClient,
    topic: &str,
    record: &QuestionRecord,
    limit: usize,
) -> Vec<crate::commons::SearchHit> {
    let mut terms = vec![topic.to_string()];
    terms.push(topic.replace(' ', "_"));
    terms.push(topic.to_lowercase());
    if let Some(first) = record.answer.split_whitespace().next() {
        terms.push(first.to_string());
    }

    for term in terms {
        match client.search(&term, limit) {
            Ok(hits) if !hits.is_empty() => return hits,
            Ok(_) => continue,
            Err(e) => {
                warn!(term = %term, error = %e, "search failed");
            }
        }
    }
    Vec::new()
}

/// Post-download step: look up metadata and stamp the citation, downgrading
/// gracefully when either is unavailable.
fn annotate_download(
    client: &CommonsClient,
    log: &mut DownloadLog,
    fonts: &FontStack,
    dest: &std::path::Path,
    file_title: &str,
    ext: ImageExt,
    stats: &mut BatchStats,
) -> QuizfigResult<()> {
    if ext.is_vector() {
        log.saved_without_citation("vector image kept uncited; run convert-svg")?;
        return Ok(());
    }

    let metadata = match client.metadata(file_title) {
        Ok(Some(metadata)) => metadata,
        Ok(None) => {
            log.saved_without_citation("metadata not available")?;
            return Ok(());
        }
        Err(e) => {
            warn!(file = %file_title, error = %e, "metadata lookup failed");
            log.saved_without_citation("metadata not available")?;
            return Ok(());
        }
    };

    match cite_in_place(dest, &metadata, fonts) {
        Ok(()) => {
            stats.cited += 1;
            log.saved_with_citation(&metadata.citation_line())?;
        }
        Err(e) => {
            warn!(file = %dest.display(), error = %e, "citation overlay failed");
            log.saved_without_citation("citation overlay failed")?;
        }
    }
    Ok(())
}

/// Apply citations to images from an earlier run by replaying the log.
pub fn run_cite(
    dir: &std::path::Path,
    client: &CommonsClient,
    fonts: &FontStack,
) -> QuizfigResult<BatchStats> {
    let entries = parse_log(&dir.join(LOG_FILE_NAME))?;
    let mut stats = BatchStats {
        questions: entries.len(),
        ..Default::default()
    };

    for entry in &entries {
        let Some(path) = entry.locate_in(dir) else {
            warn!(question = entry.question, file = %entry.file_title, "local file missing");
            stats.failed += 1;
            continue;
        };
        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("svg")) {
            info!(file = %path.display(), "skipping vector file");
            continue;
        }

        let metadata = match client.metadata(&entry.file_title) {
            Ok(Some(metadata)) => metadata,
            Ok(None) | Err(_) => {
                warn!(file = %entry.file_title, "no metadata, skipping");
                stats.failed += 1;
                continue;
            }
        };

        match cite_in_place(&path, &metadata, fonts) {
            Ok(()) => {
                info!(file = %path.display(), citation = %metadata.citation_line(), "cited");
                stats.cited += 1;
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "citation failed");
                stats.failed += 1;
            }
        }
    }
    Ok(stats)
}

/// Rasterize logged SVG downloads to JPEG and cite them (feature `svg`).
#[cfg(feature = "svg")]
pub fn run_convert_svg(
    dir: &std::path::Path,
    client: &CommonsClient,
    fonts: &FontStack,
) -> QuizfigResult<BatchStats> {
    use crate::raster::rasterize_svg;

    let entries = parse_log(&dir.join(LOG_FILE_NAME))?;
    let mut stats = BatchStats::default();

    for entry in &entries {
        let Some(path) = entry.locate_in(dir) else {
            continue;
        };
        if !path.extension().is_some_and(|e| e.eq_ignore_ascii_case("svg")) {
            continue;
        }
        stats.questions += 1;

        let raster = match rasterize_svg(&path) {
            Ok(raster) => raster,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "conversion failed");
                stats.failed += 1;
                continue;
            }
        };

        let jpg_path = path.with_extension("jpg");
        if let Err(e) = save_jpeg(&raster, &jpg_path) {
            warn!(file = %jpg_path.display(), error = %e, "could not write converted file");
            stats.failed += 1;
            continue;
        }
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(file = %path.display(), error = %e, "could not remove source SVG");
        }
        stats.downloaded += 1;
        info!(from = %path.display(), to = %jpg_path.display(), "converted");

        if let Ok(Some(metadata)) = client.metadata(&entry.file_title) {
            match cite_in_place(&jpg_path, &metadata, fonts) {
                Ok(()) => stats.cited += 1,
                Err(e) => warn!(file = %jpg_path.display(), error = %e, "citation failed"),
            }
        } else {
            info!(file = %jpg_path.display(), "no metadata, left uncited");
        }
    }
    Ok(stats)
}

#[cfg(feature = "svg")]
fn save_jpeg(image: &image::DynamicImage, dest: &std::path::Path) -> QuizfigResult<()> {
    use crate::error::CompositeError;
    use image::codecs::jpeg::JpegEncoder;

    // Flatten alpha the same way the compositor does before JPEG encoding.
    let rgb = crate::composite::flatten_to_rgb(image);

    let file = std::fs::File::create(dest).map_err(|source| CompositeError::Io {
        path: dest.display().to_string(),
        source,
    })?;
    let encoder = JpegEncoder::new_with_quality(std::io::BufWriter::new(file), 95);
    rgb.write_with_encoder(encoder)
        .map_err(|source| CompositeError::Encode { source })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_polite_and_sequential() {
        let config = PipelineConfig::default();
        assert_eq!(config.images_per_question, 2);
        assert_eq!(config.polite_delay, Duration::from_millis(500));
        assert!(config.polite_delay > Duration::ZERO);
    }

    #[test]
    fn option_letters_follow_slot_order() {
        let letters: Vec<char> = (0..3).map(|i| (b'a' + i as u8) as char).collect();
        assert_eq!(letters, vec!['a', 'b', 'c']);
    }
}
