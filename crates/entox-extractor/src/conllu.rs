//! CoNLL-U treebank reading
//!
//! Reads pre-computed parses (tokens, lemmas, UPOS tags, heads) with entity
//! annotations carried in the MISC column:
//!
//! ```text
//! # text = Valproic acid induces seizures
//! # abbreviations = VPA
//! 1	Valproic	valproic	ADJ	_	_	2	amod	_	NER=B-COMPOUND
//! 2	acid	acid	NOUN	_	_	3	nsubj	_	NER=I-COMPOUND
//! 3	induces	induce	VERB	_	_	0	root	_	_
//! 4	seizures	seizure	NOUN	_	_	3	obj	_	NER=B-PHENOTYPE|SpaceAfter=No
//! ```
//!
//! Multiword token ranges (`1-2`) and empty nodes (`1.1`) are skipped.
//! CoNLL-U format: https://universaldependencies.org/format.html

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use entox_core::{EntityLabel, ParseFailure};

use crate::sentence::{EntityTag, Sentence, Token};

/// A parsed sentence plus the annotations stored alongside it
#[derive(Debug, Clone)]
pub struct TreebankEntry {
    pub sentence: Sentence,
    /// Abbreviations listed in a `# abbreviations = A|B` comment
    pub abbreviations: Option<Vec<String>>,
}

/// CoNLL-U reader that iterates over sentences
pub struct ConlluReader<R: BufRead> {
    lines: Lines<R>,
    line_num: usize,
}

impl ConlluReader<BufReader<File>> {
    /// Create a reader from a file path
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl ConlluReader<BufReader<std::io::Cursor<String>>> {
    /// Create a reader from a string
    pub fn from_text(text: &str) -> Self {
        let cursor = std::io::Cursor::new(text.to_string());
        Self::new(BufReader::new(cursor))
    }
}

impl<R: BufRead> ConlluReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
        }
    }
}

impl<R: BufRead> Iterator for ConlluReader<R> {
    type Item = Result<TreebankEntry, ParseFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut token_lines = Vec::new();
        let mut text = None;
        let mut abbreviations = None;
        let mut first_line = self.line_num + 1;

        loop {
            self.line_num += 1;
            match self.lines.next() {
                None => {
                    if token_lines.is_empty() {
                        return None;
                    }
                    break;
                }
                Some(Err(e)) => {
                    return Some(Err(
                        ParseFailure::new(format!("IO error: {e}")).at_line(self.line_num)
                    ));
                }
                Some(Ok(line)) => {
                    let line = line.trim_end_matches(['\r', '\n']);

                    if line.trim().is_empty() {
                        if !token_lines.is_empty() {
                            break;
                        }
                        first_line = self.line_num + 1;
                        continue;
                    }

                    if let Some(comment) = line.strip_prefix('#') {
                        parse_comment(comment, &mut text, &mut abbreviations);
                        continue;
                    }

                    token_lines.push((self.line_num, line.to_string()));
                }
            }
        }

        Some(build_entry(token_lines, text, abbreviations, first_line))
    }
}

/// Read every sentence of a CoNLL-U string
pub fn read_treebank(text: &str) -> Result<Vec<TreebankEntry>, ParseFailure> {
    ConlluReader::from_text(text).collect()
}

/// Parse a comment line (starts with #)
fn parse_comment(
    comment: &str,
    text: &mut Option<String>,
    abbreviations: &mut Option<Vec<String>>,
) {
    let Some((key, value)) = comment.split_once('=') else {
        return;
    };

    match key.trim() {
        "text" => *text = Some(value.trim().to_string()),
        "abbreviations" => {
            *abbreviations = Some(
                value
                    .split('|')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        _ => {}
    }
}

fn build_entry(
    lines: Vec<(usize, String)>,
    text: Option<String>,
    abbreviations: Option<Vec<String>>,
    first_line: usize,
) -> Result<TreebankEntry, ParseFailure> {
    let mut tokens = Vec::with_capacity(lines.len());

    for (line_num, line) in lines {
        if let Some(token) = parse_line(&line, tokens.len())
            .map_err(|e| e.at_line(line_num))?
        {
            tokens.push(token);
        }
    }

    let sentence = match text {
        Some(text) => Sentence::new(text, tokens),
        None => Sentence::from_tokens(tokens),
    }
    .map_err(|e| e.at_line(first_line))?;

    Ok(TreebankEntry {
        sentence,
        abbreviations,
    })
}

/// Parse a single CoNLL-U line into a Token
/// Returns None for multiword tokens and empty nodes
fn parse_line(line: &str, position: usize) -> Result<Option<Token>, ParseFailure> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() != 10 {
        return Err(ParseFailure::new(format!(
            "expected 10 fields, found {}",
            fields.len()
        )));
    }

    // Field 0: ID
    if fields[0].contains(['-', '.']) {
        return Ok(None);
    }
    let id: usize = fields[0]
        .parse()
        .map_err(|_| ParseFailure::new(format!("invalid ID: {}", fields[0])))?;
    if id != position + 1 {
        return Err(ParseFailure::new(format!(
            "expected token ID {}, found {}",
            position + 1,
            id
        )));
    }

    // Field 1: FORM
    let form = fields[1];

    // Field 2: LEMMA, defaulting to the form
    let lemma = if fields[2] == "_" { form } else { fields[2] };

    // Field 3: UPOS
    let pos = fields[3];

    let mut token = Token::new(position, form, lemma, pos);

    // Field 6: HEAD
    token.head = parse_head(fields[6])?;

    // Field 9: MISC
    for pair in fields[9].split('|') {
        match pair.split_once('=') {
            Some(("NER", value)) => token.entity = parse_entity_tag(value),
            Some(("SpaceAfter", "No")) => token.space_after = false,
            _ => {}
        }
    }

    Ok(Some(token))
}

/// Parse HEAD field (0 for root, otherwise 1-indexed)
fn parse_head(s: &str) -> Result<Option<usize>, ParseFailure> {
    let head: usize = s
        .parse()
        .map_err(|_| ParseFailure::new(format!("invalid HEAD: {s}")))?;
    Ok(head.checked_sub(1))
}

/// Parse an IOB entity value (`B-COMPOUND`, `I-PHENOTYPE`, `O`)
///
/// Labels the recognizer does not declare leave the token untagged.
fn parse_entity_tag(value: &str) -> Option<EntityTag> {
    let (prefix, label) = value.split_once('-')?;
    let begin = match prefix {
        "B" => true,
        "I" => false,
        _ => return None,
    };
    match label.parse::<EntityLabel>() {
        Ok(label) => Some(EntityTag { label, begin }),
        Err(_) => {
            tracing::trace!(label, "ignoring unknown entity label");
            None
        }
    }
}
