//! Labelled `nom` parse errors that render as `miette` diagnostics

use std::fmt;

// External Crate Imports
use ahash::HashMap;
use miette::{Diagnostic, LabeledSpan, SourceSpan};
use nom::{
    Err, Finish, IResult, Parser,
    combinator::{all_consuming, complete, consumed},
    error::{ErrorKind, ParseError},
};
use thiserror::Error;

// Public API ==========================================================================================================

/// A finished parse error, owning a copy of the full input so that its labels can be rendered
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{tree}")]
pub struct LabeledError<E: LabeledErrorKind> {
    source_code: String,
    labels: Vec<LabeledSpan>,
    tree: ErrorTree<E>,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ErrorTree<E: LabeledErrorKind> {
    #[error("{kind}")]
    Node {
        kind: E,
        #[source]
        source: Option<Box<LabeledError<E>>>,
    },
    #[error("attempted {} parse branches unsuccessfully", .0.len())]
    Branch(Vec<LabeledError<E>>),
}

/// An in-flight parse error, still borrowing the input it failed on
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LabeledParseError<'a, E> {
    input: &'a str,
    length: usize,
    kind: E,
    alternatives: Vec<LabeledParseError<'a, E>>,
    source: Option<Box<LabeledParseError<'a, E>>>,
}

pub trait LabeledErrorKind: Diagnostic + Clone + Eq + From<ErrorKind> {
    fn label(&self) -> Option<&'static str> {
        None
    }
}

/// Lets an error kind absorb the error of a fallible mapping (like a database lookup) inside of a parser
pub trait FromExternalError<'a, X>: Sized {
    /// Fatal errors stop `alt` from trying any further branches
    const FATAL: bool = false;

    fn from_external_error(input: &'a str, error: X) -> LabeledParseError<'a, Self>;
}

impl<E: LabeledErrorKind> LabeledError<E> {
    /// The kind of this error, if it didn't come from several failed branches
    #[must_use]
    pub fn kind(&self) -> Option<&E> {
        match &self.tree {
            ErrorTree::Node { kind, .. } => Some(kind),
            ErrorTree::Branch(_) => None,
        }
    }

    /// The innermost error kind, following sources and the first of any failed branches
    #[must_use]
    pub fn root_kind(&self) -> Option<&E> {
        match &self.tree {
            ErrorTree::Node {
                source: Some(source),
                ..
            } => source.root_kind(),
            ErrorTree::Node { kind, .. } => Some(kind),
            ErrorTree::Branch(branches) => branches.first().and_then(Self::root_kind),
        }
    }

    /// Checks the whole error tree for a particular kind of error
    pub fn contains(&self, predicate: impl Fn(&E) -> bool + Copy) -> bool {
        match &self.tree {
            ErrorTree::Node { kind, source } => {
                predicate(kind) || source.as_ref().is_some_and(|s| s.contains(predicate))
            }
            ErrorTree::Branch(branches) => branches.iter().any(|b| b.contains(predicate)),
        }
    }
}

impl<'a, E: LabeledErrorKind> LabeledParseError<'a, E> {
    pub fn new(input: &'a str, kind: E) -> Self {
        Self::new_with_source(input, kind, None)
    }

    pub fn new_with_source(input: &'a str, kind: E, source: Option<Self>) -> Self {
        Self {
            input,
            length: 0,
            kind,
            alternatives: Vec::new(),
            source: source.map(Box::new),
        }
    }

    /// Widens the labelled span to cover the first `length` bytes of the failed input
    #[must_use]
    pub fn spanning(self, length: usize) -> Self {
        Self { length, ..self }
    }
}

/// Runs `parser` over a complete input, failing if any input is left unconsumed
pub fn final_parser<'a, O, P, E>(parser: P) -> impl FnMut(&'a str) -> Result<O, LabeledError<E>>
where
    E: LabeledErrorKind,
    P: Parser<&'a str, O, LabeledParseError<'a, E>>,
{
    let mut parser = all_consuming(complete(parser));
    move |input| {
        parser
            .parse(input)
            .finish()
            .map(|(_, output)| output)
            .map_err(|e| {
                let mut error = e.into_final_error(input);
                error.bubble_labels();
                error
            })
    }
}

/// Like `nom::combinator::map_res`, but keeps the error returned by `f` as part of the diagnostic
pub fn map_res<'a, O1, O2, X, E, P, F>(
    parser: P,
    mut f: F,
) -> impl FnMut(&'a str) -> IResult<&'a str, O2, LabeledParseError<'a, E>>
where
    E: LabeledErrorKind + FromExternalError<'a, X>,
    P: Parser<&'a str, O1, LabeledParseError<'a, E>>,
    F: FnMut(O1) -> Result<O2, X>,
{
    let mut parser = consumed(parser);
    move |input| {
        let (rest, (matched, output)) = parser.parse(input)?;
        match f(output) {
            Ok(output) => Ok((rest, output)),
            Err(x) => {
                let e = E::from_external_error(input, x).spanning(matched.len());
                Err(if E::FATAL {
                    Err::Failure(e)
                } else {
                    Err::Error(e)
                })
            }
        }
    }
}

/// Wraps any error from `parser` in a new error of `kind`, keeping the original as its source
pub fn wrap_err<'a, O, P, E>(
    mut parser: P,
    kind: E,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, LabeledParseError<'a, E>>
where
    E: LabeledErrorKind,
    P: Parser<&'a str, O, LabeledParseError<'a, E>>,
{
    move |i| {
        parser
            .parse(i)
            .map_err(|e| e.map(|e| LabeledParseError::new_with_source(i, kind.clone(), Some(e))))
    }
}

/// Replaces any error from `parser` with a new error of `kind`, discarding the original
pub fn expect<'a, O, P, E>(
    mut parser: P,
    kind: E,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, LabeledParseError<'a, E>>
where
    E: LabeledErrorKind,
    P: Parser<&'a str, O, LabeledParseError<'a, E>>,
{
    move |i| {
        parser
            .parse(i)
            .map_err(|e| e.map(|_| LabeledParseError::new(i, kind.clone())))
    }
}

/// Converts the error kind of `parser`, so that parsers from other crates can be reused as building blocks
pub fn into<'a, O, P, E1, E2>(
    mut parser: P,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, LabeledParseError<'a, E2>>
where
    E2: From<E1>,
    P: Parser<&'a str, O, LabeledParseError<'a, E1>>,
{
    move |i| parser.parse(i).map_err(|e| e.map(LabeledParseError::convert))
}

// Diagnostic Trait Implementation =====================================================================================

impl<E: LabeledErrorKind> Diagnostic for LabeledError<E> {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.tree {
            ErrorTree::Node { kind, .. } => kind.help(),
            ErrorTree::Branch(_) => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(self.labels.iter().cloned()))
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        match &self.tree {
            ErrorTree::Branch(related) => {
                Some(Box::new(related.iter().map(|e| e as &dyn Diagnostic)))
            }
            ErrorTree::Node { .. } => None,
        }
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        match &self.tree {
            ErrorTree::Node { source, .. } => source.as_deref().map(|e| e as &dyn Diagnostic),
            ErrorTree::Branch(_) => None,
        }
    }
}

// nom Trait Implementation ============================================================================================

impl<'a, E: LabeledErrorKind> ParseError<&'a str> for LabeledParseError<'a, E> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        Self::new(input, kind.into())
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn or(mut self, other: Self) -> Self {
        self.alternatives.push(other);
        self
    }
}

// Private Helper Methods ==============================================================================================

impl<E: LabeledErrorKind> LabeledError<E> {
    // Errors that wrap others have no labels of their own, so they borrow the labels of whatever they wrap
    fn bubble_labels(&mut self) {
        if !self.labels.is_empty() {
            return;
        }

        match &mut self.tree {
            ErrorTree::Node {
                source: Some(child),
                ..
            } => {
                child.bubble_labels();
                self.labels = child.labels.drain(..).collect();
            }
            ErrorTree::Branch(branches) => {
                let labels = branches.iter_mut().flat_map(|child| {
                    child.bubble_labels();
                    child.labels.drain(..)
                });
                self.labels = merge_labels(labels);
            }
            ErrorTree::Node { source: None, .. } => (),
        }
    }
}

// Labels sharing a span are joined with "or", and the results are ordered by their position in the input
fn merge_labels(labels: impl Iterator<Item = LabeledSpan>) -> Vec<LabeledSpan> {
    let mut spans: Vec<SourceSpan> = Vec::new();
    let mut texts: HashMap<SourceSpan, Vec<String>> = HashMap::default();
    for labeled_span in labels {
        let span = *labeled_span.inner();
        let text = labeled_span.label().unwrap_or_default().to_owned();
        texts
            .entry(span)
            .or_insert_with(|| {
                spans.push(span);
                Vec::new()
            })
            .push(text);
    }

    spans.sort_by_key(|span| (span.offset(), span.len()));
    spans
        .into_iter()
        .map(|span| {
            let text = texts.remove(&span).unwrap_or_default().join(" or ");
            LabeledSpan::new_with_span(Some(text), span)
        })
        .collect()
}

impl<'a, E: LabeledErrorKind> LabeledParseError<'a, E> {
    fn into_final_error(self, full_input: &str) -> LabeledError<E> {
        // NOTE: The trailing space lets labels point just past the end of the input
        let source_code = format!("{full_input} ");

        if !self.alternatives.is_empty() {
            let Self {
                input,
                length,
                kind,
                alternatives,
                source,
            } = self;
            let first = Self {
                input,
                length,
                kind,
                alternatives: Vec::new(),
                source,
            };
            let branches = std::iter::once(first)
                .chain(alternatives)
                .map(|e| e.into_final_error(full_input))
                .collect();
            return LabeledError {
                source_code,
                labels: Vec::new(),
                tree: ErrorTree::Branch(branches),
            };
        }

        let span = self.span_in(full_input);
        let labels = self
            .kind
            .label()
            .map(|label| LabeledSpan::new_with_span(Some(label.to_owned()), span))
            .into_iter()
            .collect();
        let source = self
            .source
            .map(|source| Box::new(source.into_final_error(full_input)));
        LabeledError {
            source_code,
            labels,
            tree: ErrorTree::Node {
                kind: self.kind,
                source,
            },
        }
    }

    // NOTE: `input` is always a suffix of `full_input`, so the offset is just the difference in their lengths
    fn span_in(&self, full_input: &str) -> SourceSpan {
        let start = full_input.len().saturating_sub(self.input.len());
        SourceSpan::from(start..start + self.length)
    }
}

impl<'a, E1> LabeledParseError<'a, E1> {
    fn convert<E2: From<E1>>(self) -> LabeledParseError<'a, E2> {
        LabeledParseError {
            input: self.input,
            length: self.length,
            kind: self.kind.into(),
            alternatives: self
                .alternatives
                .into_iter()
                .map(|e| e.convert())
                .collect(),
            source: self.source.map(|e| Box::new(e.convert())),
        }
    }
}

// Module Tests ========================================================================================================
