//! Entity merging
//!
//! Collapses every entity mention into a single token so a multi-token
//! entity ("valproic acid") is one node with one edge to its governor.
//! The input sentence is left untouched; a new sentence with renumbered
//! tokens and heads is returned.

use crate::sentence::{join_with_spacing, EntitySpan, EntityTag, Sentence, Token};

/// Contract each entity span of `sentence` into one token
///
/// The merged token takes the head of the span root (the span token closest
/// to the sentence root, leftmost on ties). Tokens outside the span that
/// were attached to any span token are attached to the merged token.
pub fn merge_entities(sentence: &Sentence) -> Sentence {
    let spans = sentence.entities();
    if spans.iter().all(|span| span.len() == 1) {
        return sentence.clone();
    }

    let tokens = sentence.tokens();
    let mut span_of: Vec<Option<usize>> = vec![None; tokens.len()];
    for (i, span) in spans.iter().enumerate() {
        for index in span.start..span.end {
            span_of[index] = Some(i);
        }
    }

    // Old index -> new index
    let mut remap = vec![0; tokens.len()];
    let mut next = 0;
    for (index, token) in tokens.iter().enumerate() {
        match span_of[index] {
            Some(i) if spans[i].start != token.index => remap[index] = remap[spans[i].start],
            _ => {
                remap[index] = next;
                next += 1;
            }
        }
    }

    let mut merged = Vec::with_capacity(next);
    for (index, token) in tokens.iter().enumerate() {
        match span_of[index] {
            Some(i) if spans[i].start == index => {
                merged.push(merge_span(sentence, &spans[i], remap[index], &remap));
            }
            Some(_) => {}
            None => merged.push(Token {
                index: remap[index],
                head: token.head.map(|head| remap[head]),
                ..token.clone()
            }),
        }
    }

    tracing::trace!(
        before = tokens.len(),
        after = merged.len(),
        "merged entity spans"
    );

    Sentence::from_validated(sentence.text().to_string(), merged)
}

fn merge_span(sentence: &Sentence, span: &EntitySpan, index: usize, remap: &[usize]) -> Token {
    let tokens = &sentence.tokens()[span.start..span.end];
    let root = span_root(sentence, span);
    let last = &tokens[tokens.len() - 1];

    Token {
        index,
        text: sentence.span_text(span.start, span.end),
        lemma: join_with_spacing(tokens, |t| t.lemma.as_str()),
        pos: sentence.tokens()[root].pos.clone(),
        entity: Some(EntityTag {
            label: span.label,
            begin: true,
        }),
        head: sentence.tokens()[root].head.map(|head| remap[head]),
        space_after: last.space_after,
    }
}

/// Delete the tokens flagged in `removed`, renumbering the rest
///
/// A dependent of a removed token is attached to its nearest kept
/// ancestor. Returns `None` when the root would be removed.
pub fn remove_tokens(
    sentence: &Sentence,
    text: impl Into<String>,
    removed: &[bool],
) -> Option<Sentence> {
    let tokens = sentence.tokens();
    if removed.len() != tokens.len() || removed[sentence.root()] {
        return None;
    }

    // Old index -> new index, for kept tokens
    let mut remap = vec![0; tokens.len()];
    let mut next = 0;
    for index in 0..tokens.len() {
        if !removed[index] {
            remap[index] = next;
            next += 1;
        }
    }

    let kept_ancestor = |mut head: Option<usize>| {
        while let Some(index) = head {
            if !removed[index] {
                return Some(remap[index]);
            }
            head = tokens[index].head;
        }
        None
    };

    let kept: Vec<Token> = tokens
        .iter()
        .filter(|token| !removed[token.index])
        .map(|token| Token {
            index: remap[token.index],
            head: kept_ancestor(token.head),
            ..token.clone()
        })
        .collect();

    Some(Sentence::from_validated(text.into(), kept))
}

/// The span token with the smallest depth, leftmost on ties
fn span_root(sentence: &Sentence, span: &EntitySpan) -> usize {
    (span.start..span.end)
        .min_by_key(|&index| (sentence.depth(index), index))
        .unwrap_or(span.start)
}
