//! quizfig CLI: CC-licensed figures for quiz decks.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use quizfig::commons::CommonsClient;
use quizfig::composite::FontStack;
use quizfig::pipeline::{self, PipelineConfig};
use quizfig::question::parse_questions;
use quizfig::topic::{SynonymTable, TopicExtractor};

#[derive(Parser)]
#[command(name = "quizfig", version, about = "CC-licensed figures for quiz decks")]
struct Cli {
    /// User-Agent for Commons API and file requests.
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// TOML synonym table overriding the built-in one (repeatable flag not
    /// needed; one file holds the whole ordered table).
    #[arg(long, global = true)]
    synonyms: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a deck, search Commons, download and cite images.
    Download {
        /// Plain-text quiz deck.
        #[arg(long)]
        content: PathBuf,

        /// Output directory for images and the download log.
        #[arg(long, default_value = "downloaded_images")]
        out: PathBuf,

        /// Image options to fetch per question.
        #[arg(long, default_value = "2")]
        options: usize,

        /// Search hits requested per query.
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Delay between questions, in milliseconds.
        #[arg(long, default_value = "500")]
        delay_ms: u64,

        /// TTF/OTF font files for the citation band, tried in order before
        /// the built-in fallback.
        #[arg(long = "font")]
        fonts: Vec<PathBuf>,

        /// First line of the download log.
        #[arg(long, default_value = "Question Image Download Log")]
        heading: String,
    },

    /// Apply citations to images from an earlier run by replaying its log.
    Cite {
        /// Directory containing images and download_log.txt.
        #[arg(long, default_value = "downloaded_images")]
        dir: PathBuf,

        /// TTF/OTF font files for the citation band.
        #[arg(long = "font")]
        fonts: Vec<PathBuf>,
    },

    /// Parse a deck and print the records with their derived topics as JSON.
    Parse {
        /// Plain-text quiz deck.
        #[arg(long)]
        content: PathBuf,
    },

    /// Rasterize logged SVG downloads to JPEG and cite them.
    #[cfg(feature = "svg")]
    ConvertSvg {
        /// Directory containing images and download_log.txt.
        #[arg(long, default_value = "downloaded_images")]
        dir: PathBuf,

        /// TTF/OTF font files for the citation band.
        #[arg(long = "font")]
        fonts: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let user_agent = cli
        .user_agent
        .clone()
        .unwrap_or_else(|| quizfig::commons::DEFAULT_USER_AGENT.to_string());

    let table = match &cli.synonyms {
        Some(path) => {
            let doc = std::fs::read_to_string(path).into_diagnostic()?;
            SynonymTable::from_toml(&doc).into_diagnostic()?
        }
        None => SynonymTable::default(),
    };
    let extractor = TopicExtractor::new(table);

    match cli.command {
        Commands::Download {
            content,
            out,
            options,
            limit,
            delay_ms,
            fonts,
            heading,
        } => {
            let text = std::fs::read_to_string(&content).into_diagnostic()?;
            let records = parse_questions(&text).into_diagnostic()?;
            println!("Found {} questions", records.len());

            let config = PipelineConfig {
                output_dir: out,
                images_per_question: options,
                search_limit: limit,
                polite_delay: Duration::from_millis(delay_ms),
                user_agent: user_agent.clone(),
                font_paths: fonts,
                log_heading: heading,
            };
            let client = CommonsClient::new(user_agent);
            let stats = pipeline::run_download(&records, &extractor, &client, &config)
                .into_diagnostic()?;

            println!(
                "Download complete: {} downloaded ({} cited), {} questions failed",
                stats.downloaded, stats.cited, stats.failed
            );
            println!("Images saved to: {}", config.output_dir.display());
        }

        Commands::Cite { dir, fonts } => {
            let client = CommonsClient::new(user_agent);
            let font_stack = FontStack::new(&fonts);
            let stats = pipeline::run_cite(&dir, &client, &font_stack).into_diagnostic()?;
            println!(
                "Citations applied: {} cited, {} failed of {} logged downloads",
                stats.cited, stats.failed, stats.questions
            );
        }

        Commands::Parse { content } => {
            let text = std::fs::read_to_string(&content).into_diagnostic()?;
            let records = parse_questions(&text).into_diagnostic()?;

            #[derive(serde::Serialize)]
            struct ParsedRecord<'a> {
                #[serde(flatten)]
                record: &'a quizfig::question::QuestionRecord,
                topic: String,
            }
            let out: Vec<ParsedRecord> = records
                .iter()
                .map(|record| ParsedRecord {
                    record,
                    topic: extractor.extract(&record.answer, &record.question),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
        }

        #[cfg(feature = "svg")]
        Commands::ConvertSvg { dir, fonts } => {
            let client = CommonsClient::new(user_agent);
            let font_stack = FontStack::new(&fonts);
            let stats =
                pipeline::run_convert_svg(&dir, &client, &font_stack).into_diagnostic()?;
            println!(
                "Converted {} SVG file(s): {} cited, {} failed",
                stats.downloaded, stats.cited, stats.failed
            );
        }
    }

    Ok(())
}
