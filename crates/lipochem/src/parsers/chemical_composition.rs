// External Crate Imports
use nom::{
    branch::alt,
    character::complete::multispace0,
    combinator::{cut, map, opt, recognize, success},
    multi::{many0, many1},
    sequence::{pair, preceded, terminated},
};
use nom_miette::{into, map_res, wrap_err};

// Local Crate Imports
use super::{
    errors::{LipochemErrorKind, ParseResult, UserErrorKind},
    primitives::{count, lowercase, offset_kind, uppercase},
};
use crate::{AtomicDatabase, ChemicalComposition, Count, Element, OffsetKind};

// Public API ==========================================================================================================

/// Chemical Composition = { [ whitespace ] , Atomic Run } , [ whitespace ] ;
///
/// A run without a sign of its own keeps the sign of the run before it, and the very first run is positive unless
/// told otherwise. An empty input is the empty composition.
pub fn chemical_composition<'a, 's, K: UserErrorKind>(
    db: &'a AtomicDatabase,
) -> impl FnMut(&'s str) -> ParseResult<'s, ChemicalComposition<'a>, K> {
    let runs = many0(preceded(multispace0, atomic_run(db)));
    let parser = map(terminated(runs, multispace0), |runs| {
        let mut current_kind = OffsetKind::Add;
        let mut composition = ChemicalComposition::default();
        for (offset_kind, formula) in runs {
            current_kind = offset_kind.unwrap_or(current_kind);
            match current_kind {
                OffsetKind::Add => composition += &formula,
                OffsetKind::Remove => composition -= &formula,
            }
        }
        composition
    });
    into(wrap_err(
        parser,
        LipochemErrorKind::ExpectedChemicalComposition,
    ))
}

/// Chemical Formula = { Atomic Offset }- ;
pub fn chemical_formula<'a, 's, K: UserErrorKind>(
    db: &'a AtomicDatabase,
) -> impl FnMut(&'s str) -> ParseResult<'s, ChemicalComposition<'a>, K> {
    into(formula(db))
}

// Private Sub-Parsers =================================================================================================

/// Atomic Run = [ Offset Kind ] , Chemical Formula ;
fn atomic_run<'a, 's>(
    db: &'a AtomicDatabase,
) -> impl FnMut(&'s str) -> ParseResult<'s, (Option<OffsetKind>, ChemicalComposition<'a>)> {
    let signed = pair(map(offset_kind, Some), cut(formula(db)));
    let unsigned = pair(success(None), formula(db));
    alt((signed, unsigned))
}

/// Chemical Formula = { Atomic Offset }- ;
fn formula<'a, 's>(
    db: &'a AtomicDatabase,
) -> impl FnMut(&'s str) -> ParseResult<'s, ChemicalComposition<'a>> {
    let parser = map(many1(atomic_offset(db)), ChemicalComposition::from_offsets);
    wrap_err(parser, LipochemErrorKind::ExpectedChemicalFormula)
}

/// Atomic Offset = Element , [ Count ] ;
fn atomic_offset<'a, 's>(
    db: &'a AtomicDatabase,
) -> impl FnMut(&'s str) -> ParseResult<'s, (Element<'a>, Count)> {
    let optional_count = map(opt(count), Option::unwrap_or_default);
    let parser = pair(element(db), optional_count);
    wrap_err(parser, LipochemErrorKind::ExpectedAtomicOffset)
}

// ---------------------------------------------------------------------------------------------------------------------

/// Element = uppercase , [ lowercase ] ;
fn element<'a, 's>(db: &'a AtomicDatabase) -> impl FnMut(&'s str) -> ParseResult<'s, Element<'a>> {
    map_res(element_symbol, |symbol| Element::new(db, symbol))
}

/// Element = uppercase , [ lowercase ] ;
fn element_symbol(i: &str) -> ParseResult<&str> {
    let parser = recognize(pair(uppercase, opt(lowercase)));
    wrap_err(parser, LipochemErrorKind::ExpectedElementSymbol)(i)
}

// Module Tests ========================================================================================================
