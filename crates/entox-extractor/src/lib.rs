//! Entox Extractor - Causal relation extraction pipeline
//!
//! Finds `(cause, verb, effect)` triples in biomedical text by matching a
//! linking-verb pattern over dependency parses:
//!
//! 1. segment the document and parse each sentence ([`NlpPipeline`])
//! 2. drop sentences lacking both entity types ([`cooccurrence`])
//! 3. strip parenthesized abbreviations and re-parse ([`abbreviation`])
//! 4. collapse every entity mention into one tree node ([`merge`])
//! 5. find verbs governing a cause and an effect ([`matcher`])
//! 6. keep verbs from the causal vocabulary ([`causal`])

use entox_core::{EntityLabel, ParseFailure};

pub mod abbreviation;
pub mod batch;
pub mod causal;
pub mod conllu;
pub mod cooccurrence;
pub mod extract;
pub mod matcher;
pub mod merge;
pub mod pipeline;
pub mod sentence;

pub use abbreviation::{
    detect_abbreviations, strip_abbreviations, strip_sentence, Abbreviation,
};
pub use batch::{analyze, sentence_rows, summarize, CorpusSummary, SentenceReport, SentenceRow};
pub use causal::CausalFilter;
pub use cooccurrence::{find_entity_types, has_both_types, Cooccurrence};
pub use extract::{extract_relations, CausalExtractor, ExtractionConfig};
pub use matcher::{DependencyMatcher, Match, NodeConstraint, Pattern, RelOp};
pub use merge::{merge_entities, remove_tokens};
pub use pipeline::TreebankPipeline;
pub use sentence::{EntitySpan, EntityTag, Sentence, Token};

/// Trait for the external NLP pipeline (tokenizer, tagger, parser, NER,
/// abbreviation detector)
///
/// Implementations are expensive to build and are shared read-only across
/// extraction calls.
pub trait NlpPipeline: Send + Sync {
    /// Entity labels the recognizer can produce
    fn labels(&self) -> &[EntityLabel];

    /// Segment text into sentences and annotate each one
    fn parse(&self, text: &str) -> Result<Vec<Sentence>, ParseFailure>;

    /// Short forms of abbreviations defined in the text
    fn abbreviations(&self, text: &str) -> Vec<String>;
}
