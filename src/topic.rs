//! Topic extraction: free-text answer → normalized image-search query.
//!
//! A curated synonym table maps answer phrases to search topics; entries are
//! tried in declared order and the first substring match wins. Answers that
//! miss the table fall back to naive keyword extraction, and finally to the
//! opening words of the question itself, so the extractor is total: it
//! always returns *some* string (possibly empty, which callers must treat
//! as "no usable topic").

use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

/// One ordered table entry: if `phrase` occurs as a substring of the
/// lowercased answer, `topic` is the search query to use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SynonymEntry {
    /// Lowercase phrase to look for in the answer.
    pub phrase: String,
    /// Canonical search topic emitted on match.
    pub topic: String,
}

/// An ordered, immutable synonym table.
///
/// The scan is strictly first-match-wins over the declared order — there is
/// no scoring and no longest-match preference, so an early, broad phrase
/// shadows a later, more specific one. Keep broad phrases late when editing
/// a table.
#[derive(Debug, Clone, Deserialize)]
pub struct SynonymTable {
    pub entries: Vec<SynonymEntry>,
}

impl SynonymTable {
    /// An empty table: every extraction falls through to keyword extraction.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Load a table from a TOML document of the form
    /// `[[entries]] phrase = "..." topic = "..."`.
    pub fn from_toml(doc: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(doc)
    }

    /// The canonical topic for the first entry whose phrase occurs in
    /// `answer` (already NFKC-normalized and lowercased), if any.
    fn lookup(&self, answer: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| answer.contains(entry.phrase.as_str()))
            .map(|entry| entry.topic.as_str())
    }
}

impl Default for SynonymTable {
    /// The built-in hematology/oncology table.
    fn default() -> Self {
        let entries = BUILTIN_TABLE
            .iter()
            .map(|&(phrase, topic)| SynonymEntry {
                phrase: phrase.to_string(),
                topic: topic.to_string(),
            })
            .collect();
        Self { entries }
    }
}

impl FromIterator<(String, String)> for SynonymTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(phrase, topic)| SynonymEntry { phrase, topic })
                .collect(),
        }
    }
}

/// Leading articles stripped before keyword extraction.
const ARTICLES: [&str; 3] = ["the", "a", "an"];

/// Tokens never used as keywords.
const STOPWORDS: [&str; 5] = ["the", "and", "or", "for", "with"];

/// How many keyword tokens make up a fallback topic.
const KEYWORD_COUNT: usize = 3;

/// Derives search topics from answers against an injected synonym table.
#[derive(Debug, Clone, Default)]
pub struct TopicExtractor {
    table: SynonymTable,
}

impl TopicExtractor {
    pub fn new(table: SynonymTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SynonymTable {
        &self.table
    }

    /// Extract a search topic from `answer`, falling back to `question`.
    ///
    /// Total: never fails, but may return an empty string when neither text
    /// yields a usable keyword.
    pub fn extract(&self, answer: &str, question: &str) -> String {
        // NFKC folds typographic variants (subscript digits, ligatures)
        // so table phrases written in plain ASCII still match.
        let normalized: String = answer.nfkc().collect::<String>().to_lowercase();

        if let Some(topic) = self.table.lookup(&normalized) {
            return topic.to_string();
        }

        let keywords = keyword_topic(&normalized);
        if !keywords.is_empty() {
            return keywords;
        }

        question
            .split_whitespace()
            .take(KEYWORD_COUNT)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

/// Naive keyword extraction: strip leading articles, then join the first
/// three tokens that are neither short (≤ 2 chars) nor stopwords.
fn keyword_topic(answer: &str) -> String {
    let mut tokens = answer.split_whitespace().peekable();
    while let Some(&tok) = tokens.peek() {
        if ARTICLES.contains(&tok) {
            tokens.next();
        } else {
            break;
        }
    }

    tokens
        .filter(|tok| tok.chars().count() > 2 && !STOPWORDS.contains(tok))
        .take(KEYWORD_COUNT)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The built-in answer-phrase → search-topic table for hematology/oncology
/// decks. Order matters: the scan is first-match-wins.
const BUILTIN_TABLE: &[(&str, &str)] = &[
    ("paroxysmal nocturnal hemoglobinuria", "paroxysmal nocturnal hemoglobinuria"),
    ("pnh", "paroxysmal nocturnal hemoglobinuria"),
    ("hemoglobin electrophoresis", "hemoglobin electrophoresis thalassemia"),
    ("vitamin b12 deficiency", "vitamin b12 deficiency anemia"),
    ("vitamin b6", "vitamin b6 pyridoxine sideroblastic anemia"),
    ("pyridoxine", "vitamin b6 pyridoxine sideroblastic anemia"),
    ("iron deficiency anemia", "iron deficiency anemia"),
    ("beta-thalassemia major", "beta thalassemia major"),
    ("warm autoimmune hemolytic anemia", "autoimmune hemolytic anemia"),
    ("treat the underlying disease", "anemia of chronic disease"),
    ("glucose-6-phosphate dehydrogenase", "g6pd deficiency hemolytic anemia"),
    ("g6pd deficiency", "g6pd deficiency hemolytic anemia"),
    ("autoimmune destruction", "pernicious anemia vitamin b12"),
    ("folate deficiency", "folate deficiency megaloblastic anemia"),
    ("stem cell transplant", "fanconi anemia"),
    ("pigmented gallstones", "hereditary spherocytosis"),
    ("splenic sequestration crisis", "sickle cell disease"),
    ("pyruvate kinase deficiency", "pyruvate kinase deficiency hemolytic anemia"),
    ("basophilic stippling", "lead poisoning anemia"),
    ("vaccination and prophylactic antibiotics", "sickle cell disease asplenia"),
    ("acute chest syndrome", "sickle cell disease acute chest syndrome"),
    ("renal papillary necrosis", "sickle cell trait"),
    ("hydroxyurea", "sickle cell disease hydroxyurea"),
    ("abo incompatibility", "abo incompatibility hemolytic disease newborn"),
    ("rh incompatibility", "rh incompatibility hemolytic disease newborn"),
    ("porphyria cutanea tarda", "porphyria cutanea tarda"),
    ("pct", "porphyria cutanea tarda"),
    ("immune thrombocytopenic purpura", "immune thrombocytopenic purpura itp"),
    ("itp", "immune thrombocytopenic purpura"),
    ("acute intermittent porphyria", "acute intermittent porphyria"),
    ("bernard-soulier syndrome", "bernard-soulier syndrome"),
    ("vitamin k", "vitamin k deficiency bleeding"),
    ("desmopressin", "von willebrand disease"),
    ("uremic platelet dysfunction", "uremic platelet dysfunction"),
    ("hemophilia", "hemophilia bleeding disorder"),
    ("increased pt/ptt/bt/d-dimer", "disseminated intravascular coagulation dic"),
    ("disseminated intravascular coagulation", "disseminated intravascular coagulation"),
    ("dic", "disseminated intravascular coagulation"),
    ("factor v leiden", "factor v leiden thrombophilia"),
    ("antithrombin iii deficiency", "antithrombin deficiency"),
    ("antiphospholipid syndrome", "antiphospholipid syndrome"),
    ("heparin-induced thrombocytopenia", "heparin induced thrombocytopenia"),
    ("hit", "heparin induced thrombocytopenia"),
    ("factor xa inhibitor", "rivaroxaban anticoagulant"),
    ("bridging with heparin", "warfarin skin necrosis"),
    ("monitor with ptt", "heparin anticoagulation"),
    ("inhibits vitamin k", "warfarin anticoagulation"),
    ("irreversibly inhibits cox", "aspirin antiplatelet"),
    ("bcr-abl fusion", "chronic myeloid leukemia cml"),
    ("t-cell acute lymphoblastic leukemia", "t-all acute lymphoblastic leukemia"),
    ("t-all", "t-cell acute lymphoblastic leukemia"),
    ("reed-sternberg cells", "hodgkin lymphoma"),
    ("cladribine", "hairy cell leukemia"),
    ("all-trans retinoic acid", "acute promyelocytic leukemia apl"),
    ("atra", "acute promyelocytic leukemia"),
    ("thrombolytics", "thrombolytic therapy tpa"),
    ("chronic lymphocytic leukemia", "chronic lymphocytic leukemia cll"),
    ("cll", "chronic lymphocytic leukemia"),
    ("burkitt lymphoma", "burkitt lymphoma"),
    ("dilated cardiomyopathy", "doxorubicin cardiomyopathy"),
    ("marginal zone lymphoma", "malt lymphoma"),
    ("neutropenic fever", "neutropenic fever chemotherapy"),
    ("busulfan, bleomycin", "pulmonary fibrosis chemotherapy"),
    ("mycosis fungoides", "mycosis fungoides cutaneous lymphoma"),
    ("6-mp is degraded", "mercaptopurine allopurinol"),
    ("elevated uric acid", "tumor lysis syndrome"),
    ("inhibits microtubule", "vincristine chemotherapy"),
    ("primary cns lymphoma", "primary cns lymphoma"),
    ("waldenström macroglobulinemia", "waldenstrom macroglobulinemia"),
    ("hemorrhagic cystitis", "cyclophosphamide chemotherapy"),
    ("proteasome inhibitor", "bortezomib multiple myeloma"),
    ("leucovorin", "methotrexate leucovorin rescue"),
    ("multiple myeloma", "multiple myeloma"),
];
