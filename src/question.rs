//! Quiz-deck segmentation: plain text → structured question records.
//!
//! The input format is the loose tutoring-deck convention: numbered
//! `Question N:` blocks, each followed by `Answer:` and usually
//! `Explanation:`/`Note:` paragraphs, with free-form section headings in
//! between. Only the question and answer texts are extracted; everything
//! from `Explanation:` onward is ignored.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::ParseError;

/// One parsed quiz entry. `number` is the deck's own numbering, unique
/// within a batch; records are returned in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionRecord {
    pub number: u32,
    pub question: String,
    pub answer: String,
}

static QUESTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Question\s+(\d+):").unwrap());

/// Parse all `Question N: ... Answer: ...` blocks out of a content text.
///
/// Blocks without an `Answer:` marker, or with an empty question or answer
/// text, are skipped. Returns `ParseError::NoQuestions` only when nothing
/// at all could be recovered.
pub fn parse_questions(content: &str) -> Result<Vec<QuestionRecord>, ParseError> {
    // Locate every header first, then slice the text between consecutive
    // headers so each segment can be split without backtracking.
    let headers: Vec<(usize, usize, u32)> = QUESTION_HEADER
        .captures_iter(content)
        .filter_map(|caps| {
            let m = caps.get(0)?;
            let number = caps.get(1)?.as_str().parse().ok()?;
            Some((m.start(), m.end(), number))
        })
        .collect();

    let mut records = Vec::with_capacity(headers.len());
    for (idx, &(_, body_start, number)) in headers.iter().enumerate() {
        let body_end = headers
            .get(idx + 1)
            .map_or(content.len(), |&(next_start, _, _)| next_start);
        if let Some(record) = parse_segment(number, &content[body_start..body_end]) {
            records.push(record);
        }
    }

    if records.is_empty() {
        return Err(ParseError::NoQuestions {
            bytes: content.len(),
        });
    }
    Ok(records)
}

/// Split one question segment (everything between two headers) at its
/// `Answer:` marker, truncating the answer at `Explanation:` if present.
fn parse_segment(number: u32, segment: &str) -> Option<QuestionRecord> {
    let answer_at = segment.find("Answer:")?;
    let question = segment[..answer_at].trim();

    let rest = &segment[answer_at + "Answer:".len()..];
    let answer = match rest.find("Explanation:") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    };

    if question.is_empty() || answer.is_empty() {
        return None;
    }
    Some(QuestionRecord {
        number,
        question: question.to_string(),
        answer: answer.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECK: &str = "\
IvyTutoring

ANEMIA

Question 1: A 28-year-old woman presents with fatigue and pica.

Answer: Iron deficiency anemia

Explanation: Low ferritin and high TIBC reflect depleted iron stores.

Note: Treat with oral iron.

SICKLE CELL DISEASE

Question 2: A patient with sickle cell trait presents with painless hematuria.

 Answer: Renal papillary necrosis

 Explanation: Ischemic necrosis of the renal papillae.
";

    #[test]
    fn parses_blocks_in_document_order() {
        let records = parse_questions(DECK).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].number, 1);
        assert_eq!(records[0].answer, "Iron deficiency anemia");
        assert_eq!(records[1].number, 2);
        assert_eq!(records[1].answer, "Renal papillary necrosis");
    }

    #[test]
    fn question_text_excludes_section_heading_noise() {
        let records = parse_questions(DECK).unwrap();
        assert!(records[0].question.starts_with("A 28-year-old woman"));
        // The heading between the blocks belongs to question 1's ignored
        // tail, not to question 2's text.
        assert!(records[1].question.starts_with("A patient with sickle cell trait"));
    }

    #[test]
    fn answer_stops_at_explanation_marker() {
        let records = parse_questions(DECK).unwrap();
        assert!(!records[0].answer.contains("Explanation"));
        assert!(!records[0].answer.contains("ferritin"));
    }

    #[test]
    fn answerless_block_is_skipped() {
        let text = "Question 1: orphaned question with no answer\n\nQuestion 2: ok\nAnswer: yes";
        let records = parse_questions(text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number, 2);
    }

    #[test]
    fn empty_content_is_an_error() {
        assert!(matches!(
            parse_questions(""),
            Err(ParseError::NoQuestions { .. })
        ));
    }

    #[test]
    fn answer_without_explanation_runs_to_segment_end() {
        let text = "Question 7: stem?\nAnswer: Hemoglobin electrophoresis\n\nNote: trailing note";
        let records = parse_questions(text).unwrap();
        // No Explanation marker: the note is part of the trailing text and
        // stays in the answer, matching the deck convention.
        assert!(records[0].answer.starts_with("Hemoglobin electrophoresis"));
    }
}
