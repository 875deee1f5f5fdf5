//! Query-string parsing and matching.
//!
//! The grammar is a small subset of the Lucene query-string syntax:
//!
//! ```text
//! query   := clause (WS clause)*
//! clause  := ["-"] [field ":"] (word | word "*" | '"' phrase '"')
//! ```
//!
//! Clauses are combined with AND. A bare `*` matches every document.
//! Matching is case-insensitive and looks at every string, number and
//! boolean leaf of the document (or of the named field).

use std::iter::Peekable;
use std::str::Chars;

use serde_json::Value;

use super::evaluate::{leaf_text, lookup};
use crate::error::SearchError;

/// Characters that may not start a term.
const RESERVED: &[char] = &[
    '+', '!', '(', ')', '{', '}', '[', ']', '^', '~', ':', '\\', '/',
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum TermKind {
    Word,
    Prefix,
    Phrase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    field: Option<String>,
    text: String,
    kind: TermKind,
    negated: bool,
}

/// A parsed query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    clauses: Vec<Clause>,
}

impl QueryString {
    /// Parses a query string. Blank input matches everything.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::QueryParseError`] on unterminated quotes,
    /// reserved characters, and empty fields or values.
    pub fn parse(input: &str) -> Result<Self, SearchError> {
        let mut chars = input.chars().peekable();
        let mut clauses = Vec::new();

        loop {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            let Some(&first) = chars.peek() else {
                break;
            };

            let negated = first == '-';
            if negated {
                chars.next();
                match chars.peek() {
                    None => return Err(parse_error("dangling '-' at end of query")),
                    Some(c) if c.is_whitespace() => {
                        return Err(parse_error("'-' must be followed by a term"));
                    }
                    _ => {}
                }
            }

            if let Some(clause) = parse_clause(&mut chars, negated)? {
                clauses.push(clause);
            }
        }

        Ok(Self { clauses })
    }

    /// Returns true when the query places no restriction on documents.
    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluates the query against a document.
    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses
            .iter()
            .all(|clause| clause.matches(doc) != clause.negated)
    }
}

fn parse_error(message: impl Into<String>) -> SearchError {
    SearchError::QueryParseError {
        message: message.into(),
    }
}

fn read_phrase(chars: &mut Peekable<Chars<'_>>) -> Result<String, SearchError> {
    // opening quote
    chars.next();
    let mut phrase = String::new();
    loop {
        match chars.next() {
            Some('"') => break,
            Some(c) => phrase.push(c),
            None => return Err(parse_error("unterminated quoted phrase")),
        }
    }
    if let Some(&c) = chars.peek()
        && !c.is_whitespace()
    {
        return Err(parse_error(format!("unexpected '{c}' after quoted phrase")));
    }
    if phrase.trim().is_empty() {
        return Err(parse_error("empty quoted phrase"));
    }
    Ok(phrase.trim().to_lowercase())
}

fn parse_clause(
    chars: &mut Peekable<Chars<'_>>,
    negated: bool,
) -> Result<Option<Clause>, SearchError> {
    let mut raw = String::new();
    let mut phrase = None;

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            break;
        }
        if c == '"' {
            if !raw.is_empty() && !raw.ends_with(':') {
                return Err(parse_error(format!("unexpected '\"' in term '{raw}'")));
            }
            phrase = Some(read_phrase(chars)?);
            break;
        }
        raw.push(c);
        chars.next();
    }

    if let Some(text) = phrase {
        let field = match raw.strip_suffix(':') {
            Some("") => return Err(parse_error("empty field name")),
            Some(field) => {
                check_term_start(field)?;
                Some(field.to_string())
            }
            None => None,
        };
        return Ok(Some(Clause {
            field,
            text,
            kind: TermKind::Phrase,
            negated,
        }));
    }

    check_term_start(&raw)?;
    let (field, value) = match raw.split_once(':') {
        Some((_, "")) => return Err(parse_error(format!("missing value for '{raw}'"))),
        Some((field, value)) => {
            check_term_start(value)?;
            (Some(field.to_string()), value)
        }
        None => (None, raw.as_str()),
    };

    if value == "*" {
        // `*` and `field:*` only require existence
        return Ok(match field {
            None if !negated => None,
            _ => Some(Clause {
                field,
                text: String::new(),
                kind: TermKind::Prefix,
                negated,
            }),
        });
    }

    let (text, kind) = match value.strip_suffix('*') {
        Some(stem) => (stem, TermKind::Prefix),
        None => (value, TermKind::Word),
    };
    if text.contains(['*', '"']) {
        return Err(parse_error(format!("unsupported wildcard in '{value}'")));
    }

    Ok(Some(Clause {
        field,
        text: text.to_lowercase(),
        kind,
        negated,
    }))
}

fn check_term_start(term: &str) -> Result<(), SearchError> {
    match term.chars().next() {
        None => Err(parse_error("empty term")),
        Some(c) if RESERVED.contains(&c) || c == '-' => {
            Err(parse_error(format!("reserved character '{c}' in '{term}'")))
        }
        Some(_) => Ok(()),
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

fn is_plain(text: &str) -> bool {
    text.chars().all(char::is_alphanumeric)
}

impl Clause {
    fn matches(&self, doc: &Value) -> bool {
        let leaves: Vec<String> = match &self.field {
            Some(field) => lookup(doc, field)
                .into_iter()
                .flat_map(collect_leaves)
                .collect(),
            None => collect_leaves(doc),
        };

        leaves.iter().any(|leaf| {
            let leaf = leaf.to_lowercase();
            match self.kind {
                TermKind::Phrase => leaf.contains(&self.text),
                TermKind::Word if is_plain(&self.text) => tokens(&leaf).any(|t| t == self.text),
                TermKind::Word => leaf == self.text || leaf.contains(&self.text),
                TermKind::Prefix if is_plain(&self.text) => {
                    tokens(&leaf).any(|t| t.starts_with(&self.text)) || self.text.is_empty()
                }
                TermKind::Prefix => leaf.starts_with(&self.text),
            }
        })
    }
}

fn collect_leaves(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![value];
    while let Some(value) = stack.pop() {
        match value {
            Value::Array(items) => stack.extend(items.iter().rev()),
            Value::Object(map) => stack.extend(map.values().rev()),
            other => out.extend(leaf_text(other)),
        }
    }
    out
}
