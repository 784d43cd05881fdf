//! Sentence and document extraction
//!
//! Ties the stages together. Per sentence: prefilter, parse, strip
//! abbreviations, re-parse, merge entities, match the linking-verb pattern
//! and keep causal verbs.

use std::sync::Arc;

use entox_core::{
    CausalVerbs, Document, EntityLabel, EntoxError, Extraction, ExtractionSettings, ParseFailure,
    Relation, Result,
};

use crate::abbreviation::strip_abbreviations;
use crate::causal::CausalFilter;
use crate::cooccurrence::has_both_types;
use crate::matcher::{DependencyMatcher, Pattern};
use crate::merge::merge_entities;
use crate::NlpPipeline;

/// What to extract: the entity type pair and the causal vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    pub cause: EntityLabel,
    pub effect: EntityLabel,
    pub causal_verbs: CausalVerbs,
    /// Skip sentences that do not mention both entity types
    pub prefilter: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            cause: EntityLabel::Compound,
            effect: EntityLabel::Phenotype,
            causal_verbs: CausalVerbs::default(),
            prefilter: true,
        }
    }
}

impl ExtractionConfig {
    /// Build from caller-supplied strings
    ///
    /// Labels are matched case-insensitively; an unknown label or an empty
    /// vocabulary is an `InvalidConfiguration`.
    pub fn from_strings<I, S>(cause: &str, effect: &str, verbs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            cause: cause.parse()?,
            effect: effect.parse()?,
            causal_verbs: CausalVerbs::new(verbs)?,
            prefilter: true,
        })
    }

    pub fn with_prefilter(mut self, prefilter: bool) -> Self {
        self.prefilter = prefilter;
        self
    }
}

impl From<&ExtractionSettings> for ExtractionConfig {
    fn from(settings: &ExtractionSettings) -> Self {
        Self {
            cause: settings.cause,
            effect: settings.effect,
            causal_verbs: settings.causal_verbs.clone(),
            prefilter: settings.prefilter,
        }
    }
}

/// Extracts causal relations using a shared NLP pipeline
pub struct CausalExtractor {
    pipeline: Arc<dyn NlpPipeline>,
    config: ExtractionConfig,
    pattern: Pattern,
    matcher: DependencyMatcher,
    filter: CausalFilter,
}

impl CausalExtractor {
    /// Create an extractor, checking the entity types against the labels
    /// the pipeline's recognizer can produce
    pub fn new(pipeline: Arc<dyn NlpPipeline>, config: ExtractionConfig) -> Result<Self> {
        for label in [config.cause, config.effect] {
            if !pipeline.labels().contains(&label) {
                return Err(EntoxError::InvalidConfiguration(format!(
                    "entity type {label} is not produced by the recognizer"
                )));
            }
        }

        Ok(Self {
            pattern: Pattern::linking_verb(config.cause, config.effect),
            matcher: DependencyMatcher::new(),
            filter: CausalFilter::new(config.causal_verbs.clone()),
            pipeline,
            config,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Arc<dyn NlpPipeline> {
        &self.pipeline
    }

    /// Whether a sentence passes the co-occurrence prefilter
    ///
    /// Always true when the prefilter is disabled.
    pub fn passes_prefilter(&self, text: &str) -> std::result::Result<bool, ParseFailure> {
        if !self.config.prefilter {
            return Ok(true);
        }
        has_both_types(
            self.pipeline.as_ref(),
            text,
            self.config.cause,
            self.config.effect,
        )
    }

    /// Relations in a single sentence
    pub fn extract_sentence(&self, text: &str) -> std::result::Result<Vec<Relation>, ParseFailure> {
        if !self.passes_prefilter(text)? {
            tracing::debug!("sentence lacks one of the entity types, skipped");
            return Ok(Vec::new());
        }
        self.match_sentence(text)
    }

    /// Relations in a single sentence, without the co-occurrence prefilter
    ///
    /// For callers that have already checked both entity types are present.
    pub fn match_sentence(&self, text: &str) -> std::result::Result<Vec<Relation>, ParseFailure> {
        // The recognizer tags "(VPA)" as a second mention of the entity it
        // abbreviates; parse again without it so it cannot match twice.
        let abbreviations = self.pipeline.abbreviations(text);
        let stripped = strip_abbreviations(text, &abbreviations);
        let sentences = self.pipeline.parse(&stripped)?;

        let mut relations = Vec::new();
        for sentence in &sentences {
            let merged = merge_entities(sentence);
            let matches = self.matcher.find(&merged, &self.pattern);
            relations.extend(self.filter.apply(&merged, &matches));
        }

        tracing::debug!(
            abbreviations = abbreviations.len(),
            relations = relations.len(),
            "extracted sentence"
        );
        Ok(relations)
    }

    /// Relations across all sentences of a document, in sentence order
    ///
    /// A sentence that cannot be parsed is skipped with a warning, as is
    /// text the pipeline cannot segment. A document with no parseable
    /// sentence at all yields `NoRelationFound`.
    pub fn extract_document(&self, document: &Document) -> Extraction {
        let sentences = match self.pipeline.parse(&document.text) {
            Ok(sentences) => sentences,
            Err(e) => {
                tracing::warn!(id = %document.id, error = %e, "failed to segment document");
                return Extraction::NoRelationFound;
            }
        };

        let mut relations = Vec::new();
        for sentence in &sentences {
            let text = sentence.text().replace('\n', " ");
            match self.extract_sentence(&text) {
                Ok(found) => relations.extend(found),
                Err(e) => {
                    tracing::warn!(id = %document.id, error = %e, "skipping sentence");
                }
            }
        }

        tracing::info!(
            id = %document.id,
            sentences = sentences.len(),
            relations = relations.len(),
            "processed document"
        );
        Extraction::from_relations(relations)
    }
}

/// Extract relations from raw text with a one-off configuration
///
/// Labels and verbs are validated before the text is touched.
pub fn extract_relations<I, S>(
    pipeline: Arc<dyn NlpPipeline>,
    text: &str,
    cause: &str,
    effect: &str,
    verbs: I,
) -> Result<Extraction>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let config = ExtractionConfig::from_strings(cause, effect, verbs)?;
    let extractor = CausalExtractor::new(pipeline, config)?;
    Ok(extractor.extract_document(&Document::new("", text)))
}
