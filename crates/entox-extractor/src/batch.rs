//! Corpus-level bookkeeping
//!
//! Splits a set of documents into per-sentence rows and reports, for each
//! sentence that mentions both entity types, what the matcher found.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use entox_core::{Document, Relation};

use crate::cooccurrence::find_entity_types;
use crate::extract::CausalExtractor;
use crate::NlpPipeline;

/// One sentence of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceRow {
    pub pmid: String,
    pub sentence: String,
}

/// Matcher outcome for a sentence that mentions both entity types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentenceReport {
    pub pmid: String,
    pub sentence: String,
    pub has_match: bool,
    /// Cause-type mentions found by the recognizer
    pub causes: Vec<String>,
    /// Effect-type mentions found by the recognizer
    pub effects: Vec<String>,
    /// Verbs of the extracted relations, in relation order
    pub verbs: Vec<String>,
    pub relations: Vec<Relation>,
}

/// Totals over a processed corpus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusSummary {
    pub documents: usize,
    pub sentences: usize,
    pub matched_sentences: usize,
    pub relations: usize,
}

/// Segment every document into sentence rows
///
/// Documents the pipeline cannot segment are skipped with a warning.
pub fn sentence_rows(pipeline: &dyn NlpPipeline, documents: &[Document]) -> Vec<SentenceRow> {
    let mut rows = Vec::new();
    for document in documents {
        match pipeline.parse(&document.text) {
            Ok(sentences) => rows.extend(sentences.iter().map(|sentence| SentenceRow {
                pmid: document.id.clone(),
                sentence: sentence.text().replace('\n', " "),
            })),
            Err(e) => tracing::warn!(pmid = %document.id, error = %e, "skipping document"),
        }
    }
    rows
}

/// Run the extractor over every row mentioning both entity types
pub fn analyze(extractor: &CausalExtractor, rows: &[SentenceRow]) -> Vec<SentenceReport> {
    let config = extractor.config();
    let pipeline = extractor.pipeline().as_ref();
    let mut reports = Vec::new();

    for row in rows {
        let found = match find_entity_types(pipeline, &row.sentence, config.cause, config.effect) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(pmid = %row.pmid, error = %e, "skipping sentence");
                continue;
            }
        };
        if !found.has_both {
            continue;
        }

        let relations = match extractor.match_sentence(&row.sentence) {
            Ok(relations) => relations,
            Err(e) => {
                tracing::warn!(pmid = %row.pmid, error = %e, "skipping sentence");
                continue;
            }
        };

        reports.push(SentenceReport {
            pmid: row.pmid.clone(),
            sentence: row.sentence.clone(),
            has_match: !relations.is_empty(),
            causes: found.causes,
            effects: found.effects,
            verbs: relations.iter().map(|r| r.verb.clone()).collect(),
            relations,
        });
    }

    reports
}

pub fn summarize(rows: &[SentenceRow], reports: &[SentenceReport]) -> CorpusSummary {
    let documents: BTreeSet<&str> = rows.iter().map(|row| row.pmid.as_str()).collect();
    CorpusSummary {
        documents: documents.len(),
        sentences: rows.len(),
        matched_sentences: reports.iter().filter(|r| r.has_match).count(),
        relations: reports.iter().map(|r| r.relations.len()).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractionConfig;
    use crate::pipeline::TreebankPipeline;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const TREEBANK: &str = "# text = Aspirin induces fever.
1	Aspirin	aspirin	NOUN	_	_	2	nsubj	_	NER=B-COMPOUND
2	induces	induce	VERB	_	_	0	root	_	_
3	fever	fever	NOUN	_	_	2	obj	_	NER=B-PHENOTYPE|SpaceAfter=No
4	.	.	PUNCT	_	_	2	punct	_	_

# text = Aspirin shows fever.
1	Aspirin	aspirin	NOUN	_	_	2	nsubj	_	NER=B-COMPOUND
2	shows	show	VERB	_	_	0	root	_	_
3	fever	fever	NOUN	_	_	2	obj	_	NER=B-PHENOTYPE|SpaceAfter=No
4	.	.	PUNCT	_	_	2	punct	_	_

# text = Rats were used.
1	Rats	rat	NOUN	_	_	3	nsubj	_	_
2	were	be	AUX	_	_	3	aux	_	_
3	used	use	VERB	_	_	0	root	_	SpaceAfter=No
4	.	.	PUNCT	_	_	3	punct	_	_
";

    fn extractor() -> CausalExtractor {
        let pipeline = Arc::new(TreebankPipeline::from_conllu(TREEBANK).unwrap());
        CausalExtractor::new(pipeline, ExtractionConfig::default()).unwrap()
    }

    fn documents() -> Vec<Document> {
        vec![
            Document::new("100", "Aspirin induces fever. Rats were used."),
            Document::new("200", "Aspirin shows fever."),
            Document::new("300", "Not in the treebank."),
        ]
    }

    /// Counts parse calls made through it
    struct CountingPipeline {
        inner: TreebankPipeline,
        parses: AtomicUsize,
    }

    impl NlpPipeline for CountingPipeline {
        fn labels(&self) -> &[entox_core::EntityLabel] {
            self.inner.labels()
        }

        fn parse(&self, text: &str) -> Result<Vec<crate::Sentence>, entox_core::ParseFailure> {
            self.parses.fetch_add(1, Ordering::SeqCst);
            self.inner.parse(text)
        }

        fn abbreviations(&self, text: &str) -> Vec<String> {
            self.inner.abbreviations(text)
        }
    }

    #[test]
    fn test_analyze_runs_prefilter_once_per_row() {
        let counting = Arc::new(CountingPipeline {
            inner: TreebankPipeline::from_conllu(TREEBANK).unwrap(),
            parses: AtomicUsize::new(0),
        });
        let extractor = CausalExtractor::new(counting.clone(), ExtractionConfig::default()).unwrap();
        let rows = vec![SentenceRow {
            pmid: "100".to_string(),
            sentence: "Aspirin induces fever.".to_string(),
        }];

        let reports = analyze(&extractor, &rows);
        assert!(reports[0].has_match);
        // One parse for the entity types, one for the stripped re-parse
        assert_eq!(counting.parses.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_sentence_rows() {
        let extractor = extractor();
        let rows = sentence_rows(extractor.pipeline().as_ref(), &documents());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].pmid, "100");
        assert_eq!(rows[1].sentence, "Rats were used.");
        assert_eq!(rows[2].pmid, "200");
    }

    #[test]
    fn test_analyze_and_summarize() {
        let extractor = extractor();
        let rows = sentence_rows(extractor.pipeline().as_ref(), &documents());
        let reports = analyze(&extractor, &rows);

        // "Rats were used." lacks both entity types
        assert_eq!(reports.len(), 2);
        assert!(reports[0].has_match);
        assert_eq!(reports[0].verbs, vec!["induces"]);
        assert_eq!(reports[0].causes, vec!["Aspirin"]);
        assert!(!reports[1].has_match);
        assert!(reports[1].verbs.is_empty());

        let summary = summarize(&rows, &reports);
        assert_eq!(
            summary,
            CorpusSummary {
                documents: 2,
                sentences: 3,
                matched_sentences: 1,
                relations: 1,
            }
        );
    }
}
