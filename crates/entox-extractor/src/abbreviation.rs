//! Abbreviation detection and removal
//!
//! An abbreviation written in parentheses right after its long form
//! ("Valproic acid (VPA)") is tagged by the recognizer as a second mention
//! of the same entity. Stripping the short form before re-parsing keeps the
//! matcher from counting that entity twice.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::merge::remove_tokens;
use crate::sentence::{Sentence, Token};

/// A short form and the long form it abbreviates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abbreviation {
    pub short: String,
    pub long: String,
}

/// Remove every occurrence of each abbreviation from the text
///
/// Only the abbreviation itself is erased; surrounding parentheses and
/// punctuation stay in place ("Valproic acid (VPA)" -> "Valproic acid ()").
pub fn strip_abbreviations<S: AsRef<str>>(text: &str, abbreviations: &[S]) -> String {
    let mut stripped = text.to_string();
    for abbreviation in abbreviations {
        let abbreviation = abbreviation.as_ref();
        if !abbreviation.is_empty() && stripped.contains(abbreviation) {
            stripped = stripped.replace(abbreviation, "");
        }
    }
    stripped
}

/// Apply `strip_abbreviations` to an already parsed sentence
///
/// Each token loses the short forms it contains; tokens left empty are
/// removed and their dependents attached to the nearest kept ancestor.
/// The result reads as the stripped text would, so it stands in for a
/// parse of that text. `None` when nothing changes or the root would go.
pub fn strip_sentence<S: AsRef<str>>(
    sentence: &Sentence,
    abbreviations: &[S],
) -> Option<Sentence> {
    let text = strip_abbreviations(sentence.text(), abbreviations);
    if text == sentence.text() {
        return None;
    }

    let tokens: Vec<Token> = sentence
        .tokens()
        .iter()
        .map(|token| Token {
            text: strip_abbreviations(&token.text, abbreviations),
            ..token.clone()
        })
        .collect();
    let removed: Vec<bool> = tokens.iter().map(|token| token.text.is_empty()).collect();

    let rewritten = Sentence::from_validated(sentence.text().to_string(), tokens);
    remove_tokens(&rewritten, text, &removed)
}

fn parenthesized() -> &'static Regex {
    static PAREN: OnceLock<Regex> = OnceLock::new();
    PAREN.get_or_init(|| Regex::new(r"\(([^()]+)\)").expect("valid regex"))
}

/// Detect `long form (SF)` definitions (Schwartz & Hearst, 2003)
///
/// Results are unique by short form, in order of first definition.
pub fn detect_abbreviations(text: &str) -> Vec<Abbreviation> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for captures in parenthesized().captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let short = inner.as_str().trim();
        if !is_short_form_candidate(short) {
            continue;
        }

        let window = long_form_window(&text[..whole.start()], short);
        let Some(long) = best_long_form(short, &window) else {
            continue;
        };

        if seen.insert(short.to_string()) {
            found.push(Abbreviation {
                short: short.to_string(),
                long,
            });
        }
    }

    found
}

fn is_short_form_candidate(candidate: &str) -> bool {
    let length = candidate.chars().count();
    (2..=10).contains(&length)
        && candidate.split_whitespace().count() <= 2
        && candidate.chars().any(char::is_alphabetic)
        && candidate.chars().next().is_some_and(char::is_alphanumeric)
}

/// The last `min(|SF| + 5, 2 * |SF|)` words before the parenthesis
fn long_form_window(preceding: &str, short: &str) -> String {
    let length = short.chars().count();
    let max_words = (length + 5).min(length * 2);
    let words: Vec<&str> = preceding.split_whitespace().collect();
    let start = words.len().saturating_sub(max_words);
    words[start..].join(" ")
}

/// Shortest suffix of `window` whose characters cover the short form in
/// order, with the first short-form character starting a word
fn best_long_form(short: &str, window: &str) -> Option<String> {
    let short: Vec<char> = short.to_lowercase().chars().collect();
    let long: Vec<char> = window.chars().collect();
    let lower: Vec<char> = window.to_lowercase().chars().collect();
    if lower.len() != long.len() {
        return None;
    }

    let mut s_index = short.len() as isize - 1;
    let mut l_index = long.len() as isize - 1;

    while s_index >= 0 {
        let current = short[s_index as usize];
        if !current.is_alphanumeric() {
            s_index -= 1;
            continue;
        }

        while (l_index >= 0 && lower[l_index as usize] != current)
            || (s_index == 0 && l_index > 0 && long[l_index as usize - 1].is_alphanumeric())
        {
            l_index -= 1;
        }
        if l_index < 0 {
            return None;
        }

        l_index -= 1;
        s_index -= 1;
    }

    let start = (l_index + 1) as usize;
    let candidate: String = long[start..].iter().collect();
    let candidate = candidate.trim().to_string();

    if candidate.chars().count() <= short.len()
        || candidate.to_lowercase().contains(&short.iter().collect::<String>())
    {
        return None;
    }

    Some(candidate)
}
