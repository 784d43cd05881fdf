//! Entity co-occurrence prefilter
//!
//! A cheap test run before the matcher: does the text mention both entity
//! types at all? It ignores dependency structure, so a passing sentence may
//! still yield no relation.

use serde::Serialize;

use entox_core::{EntityLabel, ParseFailure};

use crate::NlpPipeline;

/// Entity mentions of the two target types found in a text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cooccurrence {
    pub has_both: bool,
    pub causes: Vec<String>,
    pub effects: Vec<String>,
}

/// Collect the cause- and effect-type mentions of `text`
///
/// When both types are the same label, both lists hold the same mentions
/// and `has_both` requires at least two of them.
pub fn find_entity_types(
    pipeline: &dyn NlpPipeline,
    text: &str,
    cause: EntityLabel,
    effect: EntityLabel,
) -> Result<Cooccurrence, ParseFailure> {
    let mut causes = Vec::new();
    let mut effects = Vec::new();

    for sentence in pipeline.parse(text)? {
        for span in sentence.entities() {
            let mention = sentence.span_text(span.start, span.end);
            if span.label == cause {
                causes.push(mention.clone());
            }
            if span.label == effect {
                effects.push(mention);
            }
        }
    }

    let has_both = if cause == effect {
        causes.len() >= 2
    } else {
        !causes.is_empty() && !effects.is_empty()
    };

    Ok(Cooccurrence {
        has_both,
        causes,
        effects,
    })
}

/// Whether `text` mentions both types (or two mentions when they coincide)
pub fn has_both_types(
    pipeline: &dyn NlpPipeline,
    text: &str,
    cause: EntityLabel,
    effect: EntityLabel,
) -> Result<bool, ParseFailure> {
    find_entity_types(pipeline, text, cause, effect).map(|found| found.has_both)
}
