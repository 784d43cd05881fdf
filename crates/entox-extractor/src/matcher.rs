//! Dependency pattern matching
//!
//! A pattern is a small tree of node templates. The first node is the
//! anchor; each further node is attached to an earlier one either as an
//! immediate child (`>`) or as a descendant at any depth (`>>`). Matching
//! binds the anchor to every token that satisfies it and then extends the
//! binding node by node, drawing candidates from the tree below the token
//! bound to the attachment node.

use serde::{Deserialize, Serialize};

use entox_core::{EntityLabel, EntoxError, Result};

use crate::sentence::{descendants_in, Sentence, Token};

/// Attribute test on a single token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeConstraint {
    Pos(String),
    Lemma(String),
    Entity(EntityLabel),
}

impl NodeConstraint {
    pub fn matches(&self, token: &Token) -> bool {
        match self {
            Self::Pos(pos) => token.pos == *pos,
            Self::Lemma(lemma) => token.lemma == *lemma,
            Self::Entity(label) => token.entity_label() == Some(*label),
        }
    }
}

/// Structural relation between a node and the node it is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOp {
    /// `>`: immediate child
    Child,
    /// `>>`: descendant at any depth >= 1
    Descendant,
}

/// One node template of a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternNode {
    pub name: String,
    pub constraints: Vec<NodeConstraint>,
    /// Earlier node this one hangs from; `None` only for the anchor
    pub attach: Option<(usize, RelOp)>,
}

impl PatternNode {
    fn accepts(&self, token: &Token) -> bool {
        self.constraints.iter().all(|c| c.matches(token))
    }
}

/// A tree-shaped template over dependency parses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    nodes: Vec<PatternNode>,
}

impl Pattern {
    /// Node positions of the linking-verb pattern
    pub const VERB: usize = 0;
    pub const CAUSE: usize = 1;
    pub const EFFECT: usize = 2;

    /// Start a pattern from its anchor node
    pub fn new(anchor: &str, constraints: Vec<NodeConstraint>) -> Self {
        Self {
            nodes: vec![PatternNode {
                name: anchor.to_string(),
                constraints,
                attach: None,
            }],
        }
    }

    /// Attach a new node below an existing one
    pub fn attach(
        mut self,
        head: &str,
        op: RelOp,
        name: &str,
        constraints: Vec<NodeConstraint>,
    ) -> Result<Self> {
        if self.node_index(name).is_some() {
            return Err(EntoxError::InvalidConfiguration(format!(
                "pattern node '{name}' defined twice"
            )));
        }
        let head_index = self.node_index(head).ok_or_else(|| {
            EntoxError::InvalidConfiguration(format!("pattern node '{head}' is not defined"))
        })?;

        self.nodes.push(PatternNode {
            name: name.to_string(),
            constraints,
            attach: Some((head_index, op)),
        });
        Ok(self)
    }

    /// A VERB with a cause-type and an effect-type entity among its
    /// descendants
    pub fn linking_verb(cause: EntityLabel, effect: EntityLabel) -> Self {
        Self {
            nodes: vec![
                PatternNode {
                    name: "linking_verb".to_string(),
                    constraints: vec![NodeConstraint::Pos("VERB".to_string())],
                    attach: None,
                },
                PatternNode {
                    name: "cause".to_string(),
                    constraints: vec![NodeConstraint::Entity(cause)],
                    attach: Some((Self::VERB, RelOp::Descendant)),
                },
                PatternNode {
                    name: "effect".to_string(),
                    constraints: vec![NodeConstraint::Entity(effect)],
                    attach: Some((Self::VERB, RelOp::Descendant)),
                },
            ],
        }
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.name == name)
    }

    pub fn nodes(&self) -> &[PatternNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Token indices bound to each pattern node, in node order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Match {
    bindings: Vec<usize>,
}

impl Match {
    pub fn new(bindings: Vec<usize>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[usize] {
        &self.bindings
    }

    /// Token bound to the node at `node`
    pub fn get(&self, node: usize) -> Option<usize> {
        self.bindings.get(node).copied()
    }
}

/// Finds every binding of a pattern in a sentence
///
/// Stateless; output is sorted by bindings so identical inputs always give
/// identical sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyMatcher;

impl DependencyMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn find(&self, sentence: &Sentence, pattern: &Pattern) -> Vec<Match> {
        let Some(anchor) = pattern.nodes.first() else {
            return Vec::new();
        };

        let search = Search {
            sentence,
            pattern,
            children: sentence.children_index(),
        };

        let mut matches = Vec::new();
        let mut bindings = Vec::with_capacity(pattern.len());

        for token in sentence.tokens() {
            if anchor.accepts(token) {
                bindings.push(token.index);
                search.extend(&mut bindings, &mut matches);
                bindings.pop();
            }
        }

        matches.sort();
        tracing::trace!(count = matches.len(), "pattern matches");
        matches
    }
}

struct Search<'a> {
    sentence: &'a Sentence,
    pattern: &'a Pattern,
    children: Vec<Vec<usize>>,
}

impl Search<'_> {
    fn extend(&self, bindings: &mut Vec<usize>, matches: &mut Vec<Match>) {
        let k = bindings.len();
        if k == self.pattern.len() {
            matches.push(Match::new(bindings.clone()));
            return;
        }

        let node = &self.pattern.nodes[k];
        let Some((head, op)) = node.attach else {
            return;
        };

        let bound = bindings[head];
        let candidates = match op {
            RelOp::Child => self.children[bound].clone(),
            RelOp::Descendant => descendants_in(&self.children, bound),
        };

        for candidate in candidates {
            if bindings.contains(&candidate) {
                continue;
            }
            if node.accepts(&self.sentence.tokens()[candidate]) {
                bindings.push(candidate);
                self.extend(bindings, matches);
                bindings.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_entities;
    use proptest::prelude::*;

    /// Treatment with cisplatin in rats led to a marked increase of nephrotoxicity
    ///
    /// 0 Treatment <- 6 led
    /// 1 with <- 2
    /// 2 cisplatin (B-COMPOUND) <- 0
    /// 3 in <- 4
    /// 4 rats <- 2
    /// 5 has <- 6   (AUX)
    /// 6 led (VERB, root)
    /// 7 to <- 8
    /// 8 increase <- 6
    /// 9 of <- 10
    /// 10 nephrotoxicity (B-PHENOTYPE) <- 8
    fn deep_sentence() -> Sentence {
        Sentence::from_tokens(vec![
            Token::new(0, "Treatment", "treatment", "NOUN").with_head(6),
            Token::new(1, "with", "with", "ADP").with_head(2),
            Token::new(2, "cisplatin", "cisplatin", "NOUN")
                .with_head(0)
                .begins(EntityLabel::Compound),
            Token::new(3, "in", "in", "ADP").with_head(4),
            Token::new(4, "rats", "rat", "NOUN").with_head(2),
            Token::new(5, "has", "have", "AUX").with_head(6),
            Token::new(6, "led", "lead", "VERB"),
            Token::new(7, "to", "to", "ADP").with_head(8),
            Token::new(8, "increase", "increase", "NOUN").with_head(6),
            Token::new(9, "of", "of", "ADP").with_head(10),
            Token::new(10, "nephrotoxicity", "nephrotoxicity", "NOUN")
                .with_head(8)
                .begins(EntityLabel::Phenotype),
        ])
        .unwrap()
    }

    /// X and Y both induce Z
    fn coordinated_sentence() -> Sentence {
        Sentence::from_tokens(vec![
            Token::new(0, "Cocaine", "cocaine", "NOUN")
                .with_head(4)
                .begins(EntityLabel::Compound),
            Token::new(1, "and", "and", "CCONJ").with_head(2),
            Token::new(2, "amphetamine", "amphetamine", "NOUN")
                .with_head(0)
                .begins(EntityLabel::Compound),
            Token::new(3, "both", "both", "DET").with_head(4),
            Token::new(4, "induce", "induce", "VERB"),
            Token::new(5, "psychosis", "psychosis", "NOUN")
                .with_head(4)
                .begins(EntityLabel::Phenotype),
        ])
        .unwrap()
    }

    fn linking() -> Pattern {
        Pattern::linking_verb(EntityLabel::Compound, EntityLabel::Phenotype)
    }

    #[test]
    fn test_descendants_at_depth() {
        let sentence = deep_sentence();
        let matches = DependencyMatcher::new().find(&sentence, &linking());

        // cisplatin is a grandchild of "led", nephrotoxicity a grandchild too
        assert_eq!(matches, vec![Match::new(vec![6, 2, 10])]);
        assert_eq!(sentence.depth(2), 2);
        assert_eq!(sentence.depth(10), 2);
    }

    #[test]
    fn test_child_only_pattern_misses_deep_entities() {
        let pattern = Pattern::new("verb", vec![NodeConstraint::Pos("VERB".to_string())])
            .attach(
                "verb",
                RelOp::Child,
                "cause",
                vec![NodeConstraint::Entity(EntityLabel::Compound)],
            )
            .unwrap();
        assert!(DependencyMatcher::new()
            .find(&deep_sentence(), &pattern)
            .is_empty());
    }

    #[test]
    fn test_multiple_causes_yield_separate_matches() {
        let matches = DependencyMatcher::new().find(&coordinated_sentence(), &linking());
        assert_eq!(
            matches,
            vec![Match::new(vec![4, 0, 5]), Match::new(vec![4, 2, 5])]
        );
    }

    #[test]
    fn test_same_type_needs_two_tokens() {
        let pattern = Pattern::linking_verb(EntityLabel::Phenotype, EntityLabel::Phenotype);
        let one = coordinated_sentence();
        assert!(DependencyMatcher::new().find(&one, &pattern).is_empty());

        let two = Sentence::from_tokens(vec![
            Token::new(0, "Obesity", "obesity", "NOUN")
                .with_head(1)
                .begins(EntityLabel::Phenotype),
            Token::new(1, "causes", "cause", "VERB"),
            Token::new(2, "diabetes", "diabetes", "NOUN")
                .with_head(1)
                .begins(EntityLabel::Phenotype),
        ])
        .unwrap();
        let matches = DependencyMatcher::new().find(&two, &pattern);
        assert_eq!(
            matches,
            vec![Match::new(vec![1, 0, 2]), Match::new(vec![1, 2, 0])]
        );
    }

    #[test]
    fn test_only_governing_verb_matches() {
        // "Cocaine was shown to induce psychosis": the subject hangs off
        // "shown", so "induce" does not dominate both entities
        let sentence = Sentence::from_tokens(vec![
            Token::new(0, "Cocaine", "cocaine", "NOUN")
                .with_head(2)
                .begins(EntityLabel::Compound),
            Token::new(1, "was", "be", "AUX").with_head(2),
            Token::new(2, "shown", "show", "VERB"),
            Token::new(3, "to", "to", "PART").with_head(4),
            Token::new(4, "induce", "induce", "VERB").with_head(2),
            Token::new(5, "psychosis", "psychosis", "NOUN")
                .with_head(4)
                .begins(EntityLabel::Phenotype),
        ])
        .unwrap();

        let matches = DependencyMatcher::new().find(&sentence, &linking());
        assert_eq!(matches, vec![Match::new(vec![2, 0, 5])]);
    }

    #[test]
    fn test_pattern_construction_errors() {
        let base = Pattern::new("verb", vec![]);
        assert!(matches!(
            base.clone().attach("missing", RelOp::Child, "x", vec![]),
            Err(EntoxError::InvalidConfiguration(_))
        ));
        assert!(base.attach("verb", RelOp::Child, "verb", vec![]).is_err());
    }

    #[test]
    fn test_lemma_constraint() {
        let pattern = Pattern::new("verb", vec![NodeConstraint::Lemma("induce".to_string())]);
        let matches = DependencyMatcher::new().find(&coordinated_sentence(), &pattern);
        assert_eq!(matches, vec![Match::new(vec![4])]);
        assert_eq!(matches[0].get(Pattern::VERB), Some(4));
        assert_eq!(matches[0].get(Pattern::CAUSE), None);
    }

    #[test]
    fn test_matches_on_merged_sentence() {
        let sentence = Sentence::from_tokens(vec![
            Token::new(0, "Valproic", "valproic", "ADJ")
                .with_head(1)
                .begins(EntityLabel::Compound),
            Token::new(1, "acid", "acid", "NOUN")
                .with_head(2)
                .inside(EntityLabel::Compound),
            Token::new(2, "induces", "induce", "VERB"),
            Token::new(3, "seizures", "seizure", "NOUN")
                .with_head(2)
                .begins(EntityLabel::Phenotype),
        ])
        .unwrap();

        // Unmerged, both tokens of the compound match separately
        assert_eq!(DependencyMatcher::new().find(&sentence, &linking()).len(), 2);

        let merged = merge_entities(&sentence);
        let matches = DependencyMatcher::new().find(&merged, &linking());
        assert_eq!(matches, vec![Match::new(vec![1, 0, 2])]);
    }

    fn arbitrary_sentence() -> impl Strategy<Value = Sentence> {
        (2usize..10)
            .prop_flat_map(|n| {
                (
                    Just(n),
                    proptest::collection::vec(any::<prop::sample::Index>(), n),
                    proptest::collection::vec(0u8..4, n),
                )
            })
            .prop_map(|(n, parents, kinds)| {
                let tokens = (0..n)
                    .map(|i| {
                        let token = match kinds[i] {
                            0 => Token::new(i, "v", "induce", "VERB"),
                            1 => Token::new(i, "c", "c", "NOUN").begins(EntityLabel::Compound),
                            2 => Token::new(i, "p", "p", "NOUN").begins(EntityLabel::Phenotype),
                            _ => Token::new(i, "x", "x", "ADP"),
                        };
                        if i > 0 {
                            token.with_head(parents[i].index(i))
                        } else {
                            token
                        }
                    })
                    .collect();
                Sentence::from_tokens(tokens).unwrap()
            })
    }

    proptest! {
        #[test]
        fn prop_matcher_is_deterministic_and_sound(sentence in arbitrary_sentence()) {
            let matcher = DependencyMatcher::new();
            let pattern = linking();
            let first = matcher.find(&sentence, &pattern);
            let second = matcher.find(&sentence, &pattern);
            prop_assert_eq!(&first, &second);

            let mut sorted = first.clone();
            sorted.sort();
            prop_assert_eq!(&first, &sorted);

            for m in &first {
                let verb = m.get(Pattern::VERB).unwrap();
                let descendants = sentence.descendants(verb);
                prop_assert_eq!(&sentence.tokens()[verb].pos, "VERB");
                prop_assert!(descendants.contains(&m.get(Pattern::CAUSE).unwrap()));
                prop_assert!(descendants.contains(&m.get(Pattern::EFFECT).unwrap()));
            }
        }
    }
}
