use lipochem::parsers::errors::{CompositionError, LipochemErrorKind};
use miette::Diagnostic;
use nom::{IResult, error::ErrorKind};
use nom_miette::{FromExternalError, LabeledError, LabeledErrorKind, LabeledParseError};
use thiserror::Error;

pub type RuleSyntaxError = LabeledError<RulesErrorKind>;
pub type ParseResult<'a, O> = IResult<&'a str, O, LabeledParseError<'a, RulesErrorKind>>;

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum RulesErrorKind {
    #[error(
        "expected a fragment formula: $PRECURSOR, a chain ($CHAIN, $ALKYLCHAIN, $ALKENYLCHAIN, or $LCB), \
        previously defined fragments, and runs of elements, joined by '+' or '-'"
    )]
    ExpectedFragmentFormula,

    #[error("expected a fragment, a chain, $PRECURSOR, or a run of elements")]
    ExpectedFormulaTerm,

    #[diagnostic(help(
        "fragments must be defined in previous rows before use, and formulae may only contain elements from the \
        atomic database"
    ))]
    #[error("found an undefined fragment or element")]
    UndefinedFragment,

    #[diagnostic(help("$PRECURSOR can only be added to a fragment, so try removing the '-'"))]
    #[error("the precursor can't be subtracted from a fragment")]
    SubtractedPrecursor,

    #[diagnostic(help("add a '+' or '-' before the name to say if it is added or removed"))]
    #[error("only the first part of a formula may omit its sign")]
    ExpectedSign,

    #[error("expected an equation comparing two sides with '>' or '<'")]
    ExpectedEquation,

    #[error("expected a sum of fragments, optionally multiplied by a factor and wrapped in parentheses")]
    ExpectedExpression,

    #[error("expected a fragment or $BASEPEAK, optionally multiplied by a factor and tagged with a [position]")]
    ExpectedEquationTerm,

    #[error("expected a decimal number")]
    ExpectedDecimal,

    #[diagnostic(help("numbers like 0.5 or 2 are supported, but not ones with exponents or more than 28 digits"))]
    #[error("the number couldn't be represented exactly: {0}")]
    InvalidDecimal(String),

    #[error("expected a chain position in square brackets, like [1]")]
    ExpectedPosition,

    #[error("expected a closing parenthesis")]
    ExpectedClosingParen,

    #[diagnostic(help("the comparison must be either '>' or '<'"))]
    #[error("expected a comparison operator")]
    ExpectedComparison,

    #[error(
        "expected a comma-separated list of hydroxylations, each an optional chain, an OH count, and an optional \
        mandatory level, like $LCB2:true"
    )]
    ExpectedHydroxyList,

    #[error("expected an OH count")]
    ExpectedHydroxyCount,

    #[diagnostic(help("mandatory levels are true, false, other, quant, or class"))]
    #[error("the mandatory level {0:?} is not recognised")]
    UnknownMandatoryLevel(String),

    #[error("expected a [SECTION] header, a !BLOCK header, or tab-separated Key=Value fields")]
    ExpectedRuleLine,

    #[diagnostic(help("fields are written as Key=Value, and separated by tabs"))]
    #[error("expected a Key=Value field")]
    ExpectedField,

    #[error("expected a closing bracket")]
    ExpectedClosingBracket,

    #[diagnostic(help("remove the leftover text, or check it for errors"))]
    #[error("could not interpret the full input")]
    Incomplete,

    #[diagnostic(transparent)]
    #[error(transparent)]
    Chemistry(LipochemErrorKind),

    #[diagnostic(help(
        "this is an internal error that you shouldn't ever see! If you have gotten this error, \
        then please report it as a bug!"
    ))]
    #[error("internal `nom` error: {0:?}")]
    NomError(ErrorKind),
}

impl LabeledErrorKind for RulesErrorKind {
    fn label(&self) -> Option<&'static str> {
        Some(match self {
            Self::UndefinedFragment => "undefined",
            Self::SubtractedPrecursor => "subtracted precursor",
            Self::ExpectedSign => "expected '+' or '-'",
            Self::ExpectedDecimal => "expected decimal",
            Self::InvalidDecimal(_) => "invalid decimal",
            Self::ExpectedPosition => "expected position",
            Self::ExpectedClosingParen => "expected ')'",
            Self::ExpectedComparison => "expected '>' or '<'",
            Self::ExpectedHydroxyCount => "expected OH count",
            Self::UnknownMandatoryLevel(_) => "unknown level",
            Self::ExpectedField => "expected Key=Value",
            Self::ExpectedClosingBracket => "expected ']'",
            Self::Incomplete => "input was valid up until this point",
            Self::Chemistry(kind) => return kind.label(),
            Self::NomError(_) => "the region that triggered this bug!",
            _ => return None,
        })
    }
}

impl From<LipochemErrorKind> for RulesErrorKind {
    fn from(kind: LipochemErrorKind) -> Self {
        Self::Chemistry(kind)
    }
}

impl From<ErrorKind> for RulesErrorKind {
    fn from(value: ErrorKind) -> Self {
        match value {
            ErrorKind::Eof => Self::Incomplete,
            kind => Self::NomError(kind),
        }
    }
}

// NOTE: Any token that isn't a known fragment also fails to parse as a chemical formula, so that failure is reported
// as an undefined fragment over the whole token
impl<'a> FromExternalError<'a, CompositionError> for RulesErrorKind {
    const FATAL: bool = true;

    fn from_external_error(input: &'a str, _e: CompositionError) -> LabeledParseError<'a, Self> {
        LabeledParseError::new(input, Self::UndefinedFragment)
    }
}

impl<'a> FromExternalError<'a, rust_decimal::Error> for RulesErrorKind {
    const FATAL: bool = true;

    fn from_external_error(input: &'a str, e: rust_decimal::Error) -> LabeledParseError<'a, Self> {
        LabeledParseError::new(input, Self::InvalidDecimal(e.to_string()))
    }
}

// NOTE: `MandatoryLevel::from_str` returns the unrecognised level as its error
impl<'a> FromExternalError<'a, String> for RulesErrorKind {
    const FATAL: bool = true;

    fn from_external_error(input: &'a str, level: String) -> LabeledParseError<'a, Self> {
        LabeledParseError::new(input, Self::UnknownMandatoryLevel(level))
    }
}
