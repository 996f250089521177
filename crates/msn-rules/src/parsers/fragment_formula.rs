// External Crate Imports
use lipochem::{
    ChemicalComposition, OffsetKind,
    parsers::{chemical_formula, errors::LipochemErrorKind, primitives::offset_kind},
};
use nom::{
    branch::alt,
    bytes::complete::take_till1,
    character::complete::multispace0,
    combinator::{map, opt},
    multi::many0,
    sequence::{preceded, terminated},
};
use nom_miette::{LabeledParseError, final_parser, map_res, wrap_err};

// Local Crate Imports
use super::errors::{ParseResult, RulesErrorKind};
use crate::{ChainType, FragmentRegistry, FragmentRule, PRECURSOR};

/// The building blocks a fragment formula is made from
#[derive(Clone, PartialEq, Debug)]
pub enum FormulaTerm<'r, 'a> {
    Precursor,
    Chain(ChainType),
    Fragment(&'r FragmentRule<'a>),
    Atoms(ChemicalComposition<'a>),
}

// Public API ==========================================================================================================

/// Fragment Formula = [ whitespace ] , Term , { [ whitespace ] , Term } , [ whitespace ] ;
///
/// Only the first term may go without a sign, except for runs of elements, which keep the sign of the term before
/// them. The first term is added unless told otherwise, and is read as a fragment name before its sign, so that
/// names like `-H2O` can lead a formula.
pub fn fragment_formula<'r, 'a, 's>(
    registry: &'r FragmentRegistry<'a>,
) -> impl FnMut(&'s str) -> ParseResult<'s, Vec<(OffsetKind, FormulaTerm<'r, 'a>)>> {
    let unsigned = map(fragment_name(registry), |rule| (None, FormulaTerm::Fragment(rule)));
    let mut first = preceded(multispace0, alt((unsigned, term(registry, true))));
    let mut rest = terminated(many0(preceded(multispace0, term(registry, false))), multispace0);
    let parser = move |i: &'s str| -> ParseResult<'s, Vec<_>> {
        let (i, head) = first(i)?;
        let (i, tail) = rest(i)?;
        let mut current_kind = OffsetKind::Add;
        let terms = std::iter::once(head)
            .chain(tail)
            .map(|(offset_kind, term)| {
                current_kind = offset_kind.unwrap_or(current_kind);
                (current_kind, term)
            })
            .collect();
        Ok((i, terms))
    };
    wrap_err(parser, RulesErrorKind::ExpectedFragmentFormula)
}

// Private Sub-Parsers =================================================================================================

/// Term = [ Offset Kind , [ whitespace ] ] , ( Placeholder | Fragment Name | Atomic Run | Undefined ) ;
fn term<'r, 'a, 's>(
    registry: &'r FragmentRegistry<'a>,
    first: bool,
) -> impl FnMut(&'s str) -> ParseResult<'s, (Option<OffsetKind>, FormulaTerm<'r, 'a>)> {
    let mut sign = opt(terminated(offset_kind::<RulesErrorKind>, multispace0));
    let mut operand = alt((
        placeholder,
        map(fragment_name(registry), FormulaTerm::Fragment),
        map(atomic_run(registry), FormulaTerm::Atoms),
    ));
    move |i| {
        let (rest, offset_kind) = sign(i)?;
        let (rest, term) = operand(rest)?;
        let error_kind = if offset_kind == Some(OffsetKind::Remove) && matches!(term, FormulaTerm::Precursor) {
            Some(RulesErrorKind::SubtractedPrecursor)
        } else if offset_kind.is_none() && !first && !matches!(term, FormulaTerm::Atoms(_)) {
            Some(RulesErrorKind::ExpectedSign)
        } else {
            None
        };
        if let Some(kind) = error_kind {
            let consumed = i.len() - rest.len();
            return Err(nom::Err::Failure(LabeledParseError::new(i, kind).spanning(consumed)));
        }
        Ok((rest, (offset_kind, term)))
    }
}

/// Placeholder = "$PRECURSOR" | "$CHAIN" | "$ALKYLCHAIN" | "$ALKENYLCHAIN" | "$LCB" ;
fn placeholder<'r, 'a>(i: &str) -> ParseResult<FormulaTerm<'r, 'a>> {
    let (rest, token) = token(i)?;
    let term = if token == PRECURSOR {
        FormulaTerm::Precursor
    } else if let Some(chain_type) = ChainType::from_token(token) {
        FormulaTerm::Chain(chain_type)
    } else {
        return Err(nom::Err::Error(LabeledParseError::new(i, RulesErrorKind::ExpectedFormulaTerm)));
    };
    Ok((rest, term))
}

/// Fragment Name = ? any previously defined fragment, followed by a delimiter ? ;
fn fragment_name<'r, 'a, 's>(
    registry: &'r FragmentRegistry<'a>,
) -> impl FnMut(&'s str) -> ParseResult<'s, &'r FragmentRule<'a>> {
    let names = registry.names_longest_first();
    move |i| {
        names
            .iter()
            .find_map(|&name| {
                let rest = i.strip_prefix(name)?;
                let delimited = rest.chars().next().is_none_or(is_delimiter);
                Some((rest, registry.get(name)?)).filter(|_| delimited)
            })
            .ok_or_else(|| nom::Err::Error(LabeledParseError::new(i, RulesErrorKind::ExpectedFormulaTerm)))
    }
}

/// Atomic Run = Chemical Formula , followed by a delimiter ;
///
/// Any other token lands here too, and is reported as undefined.
fn atomic_run<'r, 'a, 's>(
    registry: &'r FragmentRegistry<'a>,
) -> impl FnMut(&'s str) -> ParseResult<'s, ChemicalComposition<'a>> {
    let db = registry.db();
    map_res(token, move |token| {
        final_parser(chemical_formula::<LipochemErrorKind>(db))(token)
    })
}

/// Token = { ? anything but whitespace, "+", or "-" ? }- ;
fn token(i: &str) -> ParseResult<&str> {
    take_till1(is_delimiter)(i)
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '+' || c == '-'
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use once_cell::sync::Lazy;

    use super::*;
    use crate::testing_tools::assert_error_labels;
    use lipochem::AtomicDatabase;

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);

    static REGISTRY: Lazy<FragmentRegistry> = Lazy::new(|| {
        let mut registry = FragmentRegistry::new(&DB);
        let head = FragmentRule::new(&registry, "PC", "C5H15NO4P").unwrap();
        registry.push_head(head).unwrap();
        let head = FragmentRule::new(&registry, "PC-H2O", "PC-H2O").unwrap();
        registry.push_head(head).unwrap();
        let head = FragmentRule::new(&registry, "-Me", "$PRECURSOR-CH3").unwrap();
        registry.push_head(head).unwrap();
        let chain = FragmentRule::new(&registry, "FA", "$CHAIN").unwrap();
        registry.push_chain(chain).unwrap();
        registry
    });

    // NOTE: Renders terms as (sign, description) pairs so they can be compared without building rules
    fn parse(formula: &str) -> Vec<(String, String)> {
        let mut parser = final_parser(fragment_formula(&REGISTRY));
        parser(formula)
            .unwrap()
            .into_iter()
            .map(|(offset_kind, term)| {
                let description = match term {
                    FormulaTerm::Precursor => PRECURSOR.to_owned(),
                    FormulaTerm::Chain(chain_type) => chain_type.token().to_owned(),
                    FormulaTerm::Fragment(rule) => rule.name().to_owned(),
                    FormulaTerm::Atoms(composition) => composition.to_string(),
                };
                (offset_kind.to_string(), description)
            })
            .collect()
    }

    fn terms(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|&(sign, term)| (sign.to_owned(), term.to_owned()))
            .collect()
    }

    #[test]
    fn placeholders() {
        assert_eq!(
            parse("$PRECURSOR-$CHAIN"),
            terms(&[("+", "$PRECURSOR"), ("-", "$CHAIN")])
        );
        assert_eq!(
            parse("+$PRECURSOR -$ALKENYLCHAIN"),
            terms(&[("+", "$PRECURSOR"), ("-", "$ALKENYLCHAIN")])
        );
        assert_eq!(parse("$LCB"), terms(&[("+", "$LCB")]));
        assert_eq!(parse("-$ALKYLCHAIN"), terms(&[("-", "$ALKYLCHAIN")]));
    }

    #[test]
    fn sticky_signs() {
        assert_eq!(
            parse("$PRECURSOR-C5H14NO4P"),
            terms(&[("+", "$PRECURSOR"), ("-", "C5H14NO4P")])
        );
        assert_eq!(
            parse("$PRECURSOR -H2O C2"),
            terms(&[("+", "$PRECURSOR"), ("-", "H2O"), ("-", "C2")])
        );
        assert_eq!(
            parse("$CHAIN-H2O+Na"),
            terms(&[("+", "$CHAIN"), ("-", "H2O"), ("+", "Na")])
        );
    }

    #[test]
    fn longest_name_first() {
        assert_eq!(parse("PC-H2O"), terms(&[("+", "PC-H2O")]));
        assert_eq!(parse("PC -H2O"), terms(&[("+", "PC"), ("-", "H2O")]));
        assert_eq!(parse("-Me-H2O"), terms(&[("+", "-Me"), ("-", "H2O")]));
        assert_eq!(parse("-PC"), terms(&[("-", "PC")]));
        assert_eq!(
            parse("$PRECURSOR-FA+PC"),
            terms(&[("+", "$PRECURSOR"), ("-", "FA"), ("+", "PC")])
        );
    }

    #[test]
    fn formula_errors() {
        let fragment_formula = |formula| final_parser(fragment_formula(&REGISTRY))(formula);
        // Fragments must be defined before they are used
        assert_error_labels!(fragment_formula("$PRECURSOR-FA2"), vec![("undefined", 11, 3)]);
        assert_error_labels!(fragment_formula("$PRECURSOR-Xy"), vec![("undefined", 11, 2)]);
        assert_error_labels!(fragment_formula("$CHAINS"), vec![("undefined", 0, 7)]);
        // The precursor can't be removed
        assert_error_labels!(
            fragment_formula("$CHAIN-$PRECURSOR"),
            vec![("subtracted precursor", 6, 11)]
        );
        // Only the first named term can go without a sign
        assert_error_labels!(fragment_formula("PC FA"), vec![("expected '+' or '-'", 3, 2)]);
        assert_error_labels!(
            fragment_formula("$PRECURSOR $CHAIN"),
            vec![("expected '+' or '-'", 11, 6)]
        );
        // Dangling signs
        assert_error_labels!(
            fragment_formula("$PRECURSOR -"),
            vec![("input was valid up until this point", 11, 0)]
        );
        assert!(fragment_formula("").is_err());
    }
}
