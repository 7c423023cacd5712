//! # quizfig
//!
//! Downloads Creative-Commons-licensed illustration images for plain-text
//! quiz decks and stamps a citation band onto each one.
//!
//! ## Architecture
//!
//! - **Quiz parsing** (`question`): `Question N: … Answer: …` blocks → records
//! - **Topic extraction** (`topic`): answer text → search query via an ordered
//!   synonym table with keyword fallback; pure and total
//! - **Commons client** (`commons`): File-namespace search, URL resolution,
//!   extmetadata lookup over synchronous HTTP
//! - **Citation compositing** (`composite`): raster image + metadata → new
//!   image with a centered attribution band, explicit font fallback chain
//! - **Pipeline** (`pipeline`): the sequential, polite batch loop with a
//!   parseable flat audit log (`logfile`)
//!
//! ## Library usage
//!
//! ```no_run
//! use quizfig::question::parse_questions;
//! use quizfig::topic::TopicExtractor;
//!
//! let records = parse_questions("Question 1: stem?\nAnswer: Iron deficiency anemia").unwrap();
//! let extractor = TopicExtractor::default();
//! let topic = extractor.extract(&records[0].answer, &records[0].question);
//! assert_eq!(topic, "iron deficiency anemia");
//! ```

pub mod commons;
pub mod composite;
pub mod error;
pub mod fetch;
pub mod license;
pub mod logfile;
pub mod metadata;
pub mod pipeline;
pub mod question;
#[cfg(feature = "svg")]
pub mod raster;
pub mod topic;
