//! Parsed sentence representation
//!
//! Wraps the output of an external NLP pipeline (tokens with POS, lemma,
//! entity tag and dependency head) into the structure the matcher runs on.
//! A `Sentence` is only ever built from a valid rooted dependency tree.

use serde::{Deserialize, Serialize};

use entox_core::{EntityLabel, ParseFailure};

/// Entity annotation on a single token (IOB style)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTag {
    pub label: EntityLabel,
    /// True when this token opens a new mention (`B-`), false for `I-`
    pub begin: bool,
}

/// A token of a parsed sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Position in the sentence (0-based)
    pub index: usize,
    /// Surface text
    pub text: String,
    pub lemma: String,
    /// Coarse part-of-speech tag (UPOS)
    pub pos: String,
    pub entity: Option<EntityTag>,
    /// Index of the syntactic head, `None` for the root
    pub head: Option<usize>,
    /// Whether the token is followed by whitespace in the source text
    pub space_after: bool,
}

impl Token {
    /// Create a root token without entity annotation
    pub fn new(index: usize, text: &str, lemma: &str, pos: &str) -> Self {
        Self {
            index,
            text: text.to_string(),
            lemma: lemma.to_string(),
            pos: pos.to_string(),
            entity: None,
            head: None,
            space_after: true,
        }
    }

    pub fn with_head(mut self, head: usize) -> Self {
        self.head = Some(head);
        self
    }

    /// Tag the token as the first token of an entity mention
    pub fn begins(mut self, label: EntityLabel) -> Self {
        self.entity = Some(EntityTag { label, begin: true });
        self
    }

    /// Tag the token as continuing an entity mention
    pub fn inside(mut self, label: EntityLabel) -> Self {
        self.entity = Some(EntityTag {
            label,
            begin: false,
        });
        self
    }

    pub fn no_space_after(mut self) -> Self {
        self.space_after = false;
        self
    }

    pub fn entity_label(&self) -> Option<EntityLabel> {
        self.entity.map(|tag| tag.label)
    }
}

/// A contiguous run of tokens carrying one entity label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub start: usize,
    /// Exclusive
    pub end: usize,
    pub label: EntityLabel,
}

impl EntitySpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

/// A parsed sentence whose heads form a rooted tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sentence {
    text: String,
    tokens: Vec<Token>,
}

impl Sentence {
    /// Build a sentence from an external parse, validating the tree
    ///
    /// The tokens must be numbered by position, have exactly one root,
    /// and every head must be in range with no cycles.
    pub fn new(text: impl Into<String>, tokens: Vec<Token>) -> Result<Self, ParseFailure> {
        validate_tree(&tokens)?;
        Ok(Self {
            text: text.into(),
            tokens,
        })
    }

    /// Build a sentence whose text is reconstructed from its tokens
    pub fn from_tokens(tokens: Vec<Token>) -> Result<Self, ParseFailure> {
        let text = join_tokens(&tokens);
        Self::new(text, tokens)
    }

    /// Trusted constructor for transformations that preserve tree validity
    pub(crate) fn from_validated(text: String, tokens: Vec<Token>) -> Self {
        debug_assert!(validate_tree(&tokens).is_ok());
        Self { text, tokens }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Index of the root token
    pub fn root(&self) -> usize {
        self.tokens
            .iter()
            .position(|t| t.head.is_none())
            .unwrap_or_default()
    }

    /// Child lists for every token, each in ascending order
    pub fn children_index(&self) -> Vec<Vec<usize>> {
        let mut children = vec![Vec::new(); self.tokens.len()];
        for token in &self.tokens {
            if let Some(head) = token.head {
                children[head].push(token.index);
            }
        }
        children
    }

    /// Immediate children of a token, ascending
    pub fn children(&self, index: usize) -> Vec<usize> {
        self.tokens
            .iter()
            .filter(|t| t.head == Some(index))
            .map(|t| t.index)
            .collect()
    }

    /// All tokens reachable from `index` by one or more head -> child steps,
    /// ascending
    pub fn descendants(&self, index: usize) -> Vec<usize> {
        descendants_in(&self.children_index(), index)
    }

    /// Number of edges between a token and the root
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.tokens[index].head;
        while let Some(head) = current {
            depth += 1;
            current = self.tokens[head].head;
        }
        depth
    }

    /// Entity mentions derived from the token tags
    ///
    /// A mention opens on a `B-` tag, or on an `I-` tag that does not
    /// continue a mention of the same label.
    pub fn entities(&self) -> Vec<EntitySpan> {
        let mut spans: Vec<EntitySpan> = Vec::new();
        let mut open: Option<EntitySpan> = None;

        for token in &self.tokens {
            match token.entity {
                Some(tag) => {
                    let continues =
                        matches!(open, Some(span) if !tag.begin && span.label == tag.label);
                    if continues {
                        if let Some(span) = open.as_mut() {
                            span.end = token.index + 1;
                        }
                    } else {
                        spans.extend(open.take());
                        open = Some(EntitySpan {
                            start: token.index,
                            end: token.index + 1,
                            label: tag.label,
                        });
                    }
                }
                None => spans.extend(open.take()),
            }
        }
        spans.extend(open);
        spans
    }

    /// Surface text of tokens `start..end`, whitespace as in the source
    pub fn span_text(&self, start: usize, end: usize) -> String {
        join_tokens(&self.tokens[start..end])
    }
}

/// Descendants of `index` given precomputed child lists, ascending
pub(crate) fn descendants_in(children: &[Vec<usize>], index: usize) -> Vec<usize> {
    let mut found = Vec::new();
    let mut stack: Vec<usize> = children[index].clone();
    while let Some(node) = stack.pop() {
        found.push(node);
        stack.extend(children[node].iter().copied());
    }
    found.sort_unstable();
    found
}

/// Concatenate token texts, inserting a space where `space_after` is set
pub(crate) fn join_tokens(tokens: &[Token]) -> String {
    join_with_spacing(tokens, |t| t.text.as_str())
}

pub(crate) fn join_with_spacing<'a>(tokens: &'a [Token], field: impl Fn(&'a Token) -> &'a str) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        out.push_str(field(token));
        if token.space_after && i + 1 < tokens.len() {
            out.push(' ');
        }
    }
    out
}

fn validate_tree(tokens: &[Token]) -> Result<(), ParseFailure> {
    if tokens.is_empty() {
        return Err(ParseFailure::new("sentence has no tokens"));
    }

    let mut roots = 0;
    for (position, token) in tokens.iter().enumerate() {
        if token.index != position {
            return Err(ParseFailure::new(format!(
                "token '{}' has index {} at position {}",
                token.text, token.index, position
            )));
        }
        match token.head {
            None => roots += 1,
            Some(head) if head >= tokens.len() => {
                return Err(ParseFailure::new(format!(
                    "token {position} has head {head} outside the sentence"
                )));
            }
            Some(head) if head == position => {
                return Err(ParseFailure::new(format!(
                    "token {position} is its own head"
                )));
            }
            Some(_) => {}
        }
    }

    if roots != 1 {
        return Err(ParseFailure::new(format!(
            "expected exactly one root, found {roots}"
        )));
    }

    // Walking up from any token must reach the root within n steps
    for start in 0..tokens.len() {
        let mut current = tokens[start].head;
        let mut steps = 0;
        while let Some(head) = current {
            steps += 1;
            if steps > tokens.len() {
                return Err(ParseFailure::new(format!(
                    "dependency cycle through token {start}"
                )));
            }
            current = tokens[head].head;
        }
    }

    Ok(())
}
