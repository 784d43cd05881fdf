//! Causal verb filter

use entox_core::{CausalVerbs, Relation};

use crate::matcher::{Match, Pattern};
use crate::sentence::Sentence;

/// Keeps matches whose verb lemma belongs to the causal vocabulary
#[derive(Debug, Clone, Default)]
pub struct CausalFilter {
    verbs: CausalVerbs,
}

impl CausalFilter {
    pub fn new(verbs: CausalVerbs) -> Self {
        Self { verbs }
    }

    pub fn verbs(&self) -> &CausalVerbs {
        &self.verbs
    }

    /// Turn linking-verb matches into relations, in match order
    ///
    /// The lemma comparison is exact; the relation carries the surface text
    /// of the verb and of both entity tokens.
    pub fn apply(&self, sentence: &Sentence, matches: &[Match]) -> Vec<Relation> {
        let tokens = sentence.tokens();
        let mut relations = Vec::with_capacity(matches.len());

        for m in matches {
            let (Some(verb), Some(cause), Some(effect)) = (
                m.get(Pattern::VERB),
                m.get(Pattern::CAUSE),
                m.get(Pattern::EFFECT),
            ) else {
                continue;
            };

            let verb = &tokens[verb];
            if !self.verbs.contains(&verb.lemma) {
                tracing::trace!(verb = %verb.text, lemma = %verb.lemma, "dropped non-causal match");
                continue;
            }

            relations.push(Relation::new(
                tokens[cause].text.as_str(),
                verb.text.as_str(),
                tokens[effect].text.as_str(),
            ));
        }

        relations
    }
}
