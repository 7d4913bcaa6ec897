//! Tokenization of containerData strings.
//!
//! Splits the raw string into pipe-delimited tokens and each token into
//! colon-delimited segments, then classifies the leading segment with `nom`
//! so the parser can dispatch on it.

use appmount_common::constants::{
    COMPONENT_DIRECTORY_PREFIX, COMPONENT_FILE_PREFIX, DIRECTORY_PREFIX, FILE_PREFIX,
    SEGMENT_SEPARATOR, TOKEN_SEPARATOR,
};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::digit1,
    combinator::{all_consuming, map, value},
};

/// One pipe-delimited mount token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken<'a> {
    /// Zero-based position in the containerData string.
    pub index: usize,
    /// Token text as it appeared on the wire.
    pub text: &'a str,
    /// Colon-delimited segments of the token.
    pub segments: Vec<&'a str>,
}

impl RawToken<'_> {
    /// Number of colon-delimited segments.
    pub fn arity(&self) -> usize {
        self.segments.len()
    }
}

/// Classification of a token's leading segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Head<'a> {
    /// `m`
    Directory,
    /// `f`
    File,
    /// `c`
    ComponentDirectory,
    /// `cf`
    ComponentFile,
    /// All digits: legacy component-primary reference.
    Index(&'a str),
    /// Anything else.
    Other,
}

fn head(input: &str) -> IResult<&str, Head<'_>> {
    alt((
        value(Head::ComponentFile, tag(COMPONENT_FILE_PREFIX)),
        value(Head::ComponentDirectory, tag(COMPONENT_DIRECTORY_PREFIX)),
        value(Head::Directory, tag(DIRECTORY_PREFIX)),
        value(Head::File, tag(FILE_PREFIX)),
        map(digit1, Head::Index),
    ))
    .parse(input)
}

/// Classifies a leading segment by exact match.
///
/// `cf` and `c` are distinct keywords; `cfx` or `12a` classify as [`Head::Other`].
pub fn classify_head(segment: &str) -> Head<'_> {
    all_consuming(head)
        .parse(segment)
        .map_or(Head::Other, |(_, h)| h)
}

/// Returns the segment if it is a non-empty run of ASCII digits.
pub fn digits(segment: &str) -> Option<&str> {
    all_consuming(digit1::<&str, nom::error::Error<&str>>)
        .parse(segment)
        .ok()
        .map(|(_, d)| d)
}

/// Splits a containerData string into tokens.
///
/// Always yields at least one token; an empty string yields one empty token.
pub fn tokenize(input: &str) -> Vec<RawToken<'_>> {
    input
        .split(TOKEN_SEPARATOR)
        .enumerate()
        .map(|(index, text)| RawToken {
            index,
            text,
            segments: text.split(SEGMENT_SEPARATOR).collect(),
        })
        .collect()
}
