//! Entox Core - Domain models, errors, and shared types
//!
//! This crate defines the core abstractions used throughout the entox system:
//! - Entity labels produced by the biomedical recognizer
//! - Documents, relations, and extraction outcomes
//! - The causal-verb vocabulary
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, ExtractionSettings, FetchConfig, LoggingConfig, PipelineConfig,
    ServerConfig,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// A sentence or document the NLP pipeline could not process
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}{}", line_suffix(.line))]
pub struct ParseFailure {
    pub message: String,
    pub line: Option<usize>,
}

impl ParseFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|line| format!(" (line {line})")).unwrap_or_default()
}

/// Core error types for entox operations
#[derive(Error, Debug)]
pub enum EntoxError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Parse failure: {0}")]
    ParseFailure(#[from] ParseFailure),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EntoxError>;

// ============================================================================
// Entity Labels
// ============================================================================

/// Entity types emitted by the biomedical recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityLabel {
    Compound,
    Phenotype,
}

impl EntityLabel {
    /// Every label the recognizer can produce
    pub const ALL: [EntityLabel; 2] = [EntityLabel::Compound, EntityLabel::Phenotype];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compound => "COMPOUND",
            Self::Phenotype => "PHENOTYPE",
        }
    }
}

impl std::fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityLabel {
    type Err = EntoxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "COMPOUND" => Ok(Self::Compound),
            "PHENOTYPE" => Ok(Self::Phenotype),
            _ => Err(EntoxError::InvalidConfiguration(format!(
                "unknown entity type '{s}'"
            ))),
        }
    }
}

// ============================================================================
// Documents and Relations
// ============================================================================

/// An article abstract to analyze
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Bibliographic identifier (e.g. a PMID)
    pub id: String,

    /// Raw abstract text
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A cause -> verb -> effect triple found in one sentence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub cause: String,
    pub verb: String,
    pub effect: String,
}

impl Relation {
    pub fn new(
        cause: impl Into<String>,
        verb: impl Into<String>,
        effect: impl Into<String>,
    ) -> Self {
        Self {
            cause: cause.into(),
            verb: verb.into(),
            effect: effect.into(),
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{}]-> {}", self.cause, self.verb, self.effect)
    }
}

/// Marker rendered when a processed document yields no relation
pub const NO_RELATIONSHIP_FOUND: &str = "No relationship found";

/// Outcome of running extraction over a document
///
/// `Relations` is never empty; a document that was processed but produced
/// nothing is `NoRelationFound`, so callers can tell it apart from a
/// document that was never processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Relations(Vec<Relation>),
    NoRelationFound,
}

impl Extraction {
    pub fn from_relations(relations: Vec<Relation>) -> Self {
        if relations.is_empty() {
            Self::NoRelationFound
        } else {
            Self::Relations(relations)
        }
    }

    pub fn relations(&self) -> &[Relation] {
        match self {
            Self::Relations(relations) => relations,
            Self::NoRelationFound => &[],
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Relations(_))
    }
}

impl Serialize for Extraction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Relations(relations) => relations.serialize(serializer),
            Self::NoRelationFound => serializer.serialize_str(NO_RELATIONSHIP_FOUND),
        }
    }
}

// ============================================================================
// Causal Verbs
// ============================================================================

/// Lemmas of verbs taken to denote a cause -> effect relation
pub const DEFAULT_CAUSAL_VERBS: &[&str] = &[
    "increase",
    "produce",
    "cause",
    "induce",
    "generate",
    "effect",
    "provoke",
    "arouse",
    "elicit",
    "lead",
    "trigger",
    "derive",
    "associate",
    "relate",
    "link",
    "stem",
    "originate",
    "bring",
    "result",
    "inhibit",
    "elevate",
    "diminish",
    "exacerbate",
    "decrease",
];

/// Fixed vocabulary of causal-verb lemmas, matched exactly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CausalVerbs {
    lemmas: BTreeSet<String>,
}

impl CausalVerbs {
    /// Build a vocabulary, rejecting an empty set or blank lemmas
    pub fn new<I, S>(lemmas: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for lemma in lemmas {
            let lemma = lemma.into();
            let trimmed = lemma.trim();
            if trimmed.is_empty() {
                return Err(EntoxError::InvalidConfiguration(
                    "causal verb lemmas must not be blank".to_string(),
                ));
            }
            set.insert(trimmed.to_string());
        }

        if set.is_empty() {
            return Err(EntoxError::InvalidConfiguration(
                "causal verb set is empty".to_string(),
            ));
        }

        Ok(Self { lemmas: set })
    }

    /// Parse a comma-separated list ("induce, cause")
    pub fn parse_list(list: &str) -> Result<Self> {
        Self::new(list.split(',').map(str::trim).filter(|s| !s.is_empty()))
    }

    pub fn contains(&self, lemma: &str) -> bool {
        self.lemmas.contains(lemma)
    }

    pub fn len(&self) -> usize {
        self.lemmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lemmas.iter().map(String::as_str)
    }
}

impl Default for CausalVerbs {
    fn default() -> Self {
        Self {
            lemmas: DEFAULT_CAUSAL_VERBS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for CausalVerbs {
    type Error = EntoxError;

    fn try_from(lemmas: Vec<String>) -> Result<Self> {
        Self::new(lemmas)
    }
}

impl From<CausalVerbs> for Vec<String> {
    fn from(verbs: CausalVerbs) -> Self {
        verbs.lemmas.into_iter().collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
