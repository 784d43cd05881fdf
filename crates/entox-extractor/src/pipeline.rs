//! Treebank-backed NLP pipeline
//!
//! Serves pre-computed parses read from CoNLL-U. Sentences are looked up by
//! their whitespace-normalized text; a multi-sentence document is segmented
//! by repeatedly consuming the longest known sentence at the current
//! position. Text matching no known sentence is skipped up to the next
//! sentence boundary.
//!
//! Entries that define abbreviations also answer for their stripped text,
//! so the re-parse after abbreviation removal needs no extra annotation.

use std::collections::HashMap;
use std::path::Path;

use entox_core::{EntityLabel, EntoxError, ParseFailure, Result};

use crate::abbreviation::{detect_abbreviations, strip_sentence};
use crate::conllu::{ConlluReader, TreebankEntry};
use crate::sentence::Sentence;
use crate::NlpPipeline;

/// An `NlpPipeline` answering from a fixed set of parses
#[derive(Debug, Clone)]
pub struct TreebankPipeline {
    entries: HashMap<String, TreebankEntry>,
    /// Parses derived by stripping abbreviations, keyed by stripped text
    stripped: HashMap<String, TreebankEntry>,
    /// Entry keys, longest first
    keys: Vec<String>,
    labels: Vec<EntityLabel>,
}

impl TreebankPipeline {
    /// Build from parsed entries
    ///
    /// When two entries share the same text the later one wins. An entry
    /// written for a stripped text takes precedence over a derived one.
    pub fn new(entries: impl IntoIterator<Item = TreebankEntry>) -> Self {
        let mut map = HashMap::new();
        for entry in entries {
            map.insert(normalize(entry.sentence.text()), entry);
        }

        let stripped: HashMap<String, TreebankEntry> = map
            .values()
            .filter_map(stripped_entry)
            .filter(|(key, _)| !map.contains_key(key))
            .collect();

        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Self {
            entries: map,
            stripped,
            keys,
            labels: EntityLabel::ALL.to_vec(),
        }
    }

    /// Load a CoNLL-U string
    pub fn from_conllu(text: &str) -> std::result::Result<Self, ParseFailure> {
        let entries = ConlluReader::from_text(text).collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::new(entries))
    }

    /// Load a CoNLL-U file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = ConlluReader::from_file(path).map_err(|e| {
            EntoxError::Other(anyhow::anyhow!("failed to open {}: {e}", path.display()))
        })?;
        let entries = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        tracing::info!(path = %path.display(), sentences = entries.len(), "loaded treebank");
        Ok(Self::new(entries))
    }

    /// Restrict the labels the recognizer reports
    pub fn with_labels(mut self, labels: Vec<EntityLabel>) -> Self {
        self.labels = labels;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, normalized: &str) -> Option<&TreebankEntry> {
        self.entries
            .get(normalized)
            .or_else(|| self.stripped.get(normalized))
    }

    /// The longest known sentence that `text` starts with
    fn known_prefix(&self, text: &str) -> Option<&str> {
        self.keys
            .iter()
            .find(|key| {
                text.starts_with(key.as_str())
                    && text[key.len()..].chars().next().map_or(true, |c| c == ' ')
            })
            .map(String::as_str)
    }

    /// Split normalized text into known sentences, longest match first
    ///
    /// Unknown fragments are skipped with a warning.
    fn segment<'a>(&'a self, normalized: &str) -> Vec<&'a TreebankEntry> {
        let mut found = Vec::new();
        let mut rest = normalized.trim_start();

        while !rest.is_empty() {
            match self.known_prefix(rest) {
                Some(key) => {
                    found.push(&self.entries[key]);
                    rest = rest[key.len()..].trim_start();
                }
                None => {
                    let end = fragment_end(rest);
                    tracing::warn!(
                        fragment = %preview(&rest[..end]),
                        "no parse available, skipping text"
                    );
                    rest = rest[end..].trim_start();
                }
            }
        }

        found
    }
}

impl NlpPipeline for TreebankPipeline {
    fn labels(&self) -> &[EntityLabel] {
        &self.labels
    }

    fn parse(&self, text: &str) -> std::result::Result<Vec<Sentence>, ParseFailure> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Err(ParseFailure::new("cannot parse empty text"));
        }

        if let Some(entry) = self.lookup(&normalized) {
            return Ok(vec![entry.sentence.clone()]);
        }

        let sentences: Vec<Sentence> = self
            .segment(&normalized)
            .into_iter()
            .map(|entry| entry.sentence.clone())
            .collect();
        if sentences.is_empty() {
            return Err(ParseFailure::new(format!(
                "no parse available for text at '{}'",
                preview(&normalized)
            )));
        }
        Ok(sentences)
    }

    fn abbreviations(&self, text: &str) -> Vec<String> {
        if let Some(listed) = self
            .lookup(&normalize(text))
            .and_then(|entry| entry.abbreviations.clone())
        {
            return listed;
        }

        detect_abbreviations(text)
            .into_iter()
            .map(|abbreviation| abbreviation.short)
            .collect()
    }
}

/// The stripped-text parse of an entry that defines abbreviations
fn stripped_entry(entry: &TreebankEntry) -> Option<(String, TreebankEntry)> {
    let abbreviations = match &entry.abbreviations {
        Some(listed) => listed.clone(),
        None => detect_abbreviations(entry.sentence.text())
            .into_iter()
            .map(|abbreviation| abbreviation.short)
            .collect(),
    };
    if abbreviations.is_empty() {
        return None;
    }

    let Some(sentence) = strip_sentence(&entry.sentence, &abbreviations) else {
        tracing::trace!(text = entry.sentence.text(), "no stripped parse derived");
        return None;
    };

    Some((
        normalize(sentence.text()),
        TreebankEntry {
            sentence,
            abbreviations: Some(Vec::new()),
        },
    ))
}

/// Byte offset just past the next sentence terminator followed by a
/// space, or the end of the text
fn fragment_end(text: &str) -> usize {
    text.char_indices()
        .find(|&(i, c)| matches!(c, '.' | '!' | '?') && text[i + 1..].starts_with(' '))
        .map_or(text.len(), |(i, _)| i + 1)
}

fn preview(text: &str) -> String {
    text.chars().take(40).collect()
}

/// Collapse runs of whitespace (including newlines) into single spaces
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
