//! End-to-end tests for the text side of the pipeline: deck parsing into
//! records, topic derivation, and the log roundtrip used by `cite`.

use quizfig::logfile::{DownloadLog, LOG_FILE_NAME, parse_log};
use quizfig::question::parse_questions;
use quizfig::topic::{SynonymTable, TopicExtractor};

const DECK: &str = "\
IvyTutoring

ANEMIA

Question 1: A 35-year-old man reports dark, cola-colored urine each morning.

Answer: Paroxysmal nocturnal hemoglobinuria (PNH)

Explanation: PNH results from an acquired PIGA gene mutation.

Note: Eculizumab prevents further destruction.

Question 2: A 28-year-old woman presents with fatigue and pica (craving ice).

Answer: Iron deficiency anemia

Explanation: Low ferritin and high TIBC reflect depleted iron stores.

SICKLE CELL DISEASE

Question 3: What is the mechanism of warfarin?

Answer: Inhibits vitamin K epoxide reductase, reducing synthesis of factors II, VII, IX, X

Explanation: Warfarin decreases vitamin K-dependent clotting factors.

Question 4: A child presents with distinctive facial features.

Answer: Beta-thalassemia major

Explanation: Elevated HbA\u{2082} and HbF with no HbA.
";

#[test]
fn deck_parses_into_ordered_records() {
    let records = parse_questions(DECK).unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(
        records.iter().map(|r| r.number).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
}

#[test]
fn every_record_gets_a_topic() {
    let records = parse_questions(DECK).unwrap();
    let extractor = TopicExtractor::default();
    for record in &records {
        let topic = extractor.extract(&record.answer, &record.question);
        assert!(!topic.is_empty(), "question {} got no topic", record.number);
    }
}

#[test]
fn configured_answers_resolve_through_the_table() {
    let records = parse_questions(DECK).unwrap();
    let extractor = TopicExtractor::default();

    let topics: Vec<String> = records
        .iter()
        .map(|r| extractor.extract(&r.answer, &r.question))
        .collect();

    assert_eq!(topics[0], "paroxysmal nocturnal hemoglobinuria");
    assert_eq!(topics[1], "iron deficiency anemia");
    // The broad "vitamin k" entry precedes "inhibits vitamin k" in the
    // table, so the warfarin-mechanism answer resolves to the earlier,
    // less specific topic. First-match-wins is load-bearing here.
    assert_eq!(topics[2], "vitamin k deficiency bleeding");
    assert_eq!(topics[3], "beta thalassemia major");
}

#[test]
fn unknown_answer_falls_back_to_keywords() {
    let extractor = TopicExtractor::new(SynonymTable::empty());
    let records =
        parse_questions("Question 9: stem?\nAnswer: An otherwise unremarkable splenic infarct")
            .unwrap();
    let topic = extractor.extract(&records[0].answer, &records[0].question);
    assert_eq!(topic, "otherwise unremarkable splenic");
}

#[test]
fn log_roundtrip_recovers_what_cite_needs() {
    let records = parse_questions(DECK).unwrap();
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join(LOG_FILE_NAME);

    {
        let mut log = DownloadLog::create(&path, "Anemia/Hematology Question Image Download Log")
            .unwrap();
        let extractor = TopicExtractor::default();
        for record in &records {
            let topic = extractor.extract(&record.answer, &record.question);
            log.begin_question(record, &topic).unwrap();
            log.downloading(
                Some('a'),
                &format!("File:Q{}.jpg", record.number),
                &format!("https://upload.example/{}.jpg", record.number),
            )
            .unwrap();
            log.saved_with_citation("\"T\" by A CC BY 4.0").unwrap();
        }
    }

    let entries = parse_log(&path).unwrap();
    assert_eq!(entries.len(), records.len());
    for (entry, record) in entries.iter().zip(&records) {
        assert_eq!(entry.question, record.number);
        assert_eq!(entry.option, Some('a'));
        assert_eq!(entry.file_title, format!("File:Q{}.jpg", record.number));
    }
}
