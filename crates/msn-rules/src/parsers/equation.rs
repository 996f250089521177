// External Crate Imports
use lipochem::{OffsetKind, parsers::primitives::offset_kind};
use nom::{
    branch::alt,
    bytes::complete::take_till1,
    character::complete::{char, digit1, multispace0, u32},
    combinator::{cut, map, opt, recognize, success},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
};
use nom_miette::{LabeledParseError, expect, map_res, wrap_err};
use rust_decimal::Decimal;

// Local Crate Imports
use super::errors::{ParseResult, RulesErrorKind};
use crate::{BASE_PEAK, ChainType, Comparison, Expression, FragmentMult, FragmentRegistry};

// Public API ==========================================================================================================

/// Equation = Side , Comparison , Side ;
/// Comparison = ">" | "<" ;
pub fn equation<'r, 'a, 's>(
    registry: &'r FragmentRegistry<'a>,
) -> impl FnMut(&'s str) -> ParseResult<'s, (Expression, Comparison, Expression)> {
    let comparison = alt((
        map(char('>'), |_| Comparison::Greater),
        map(char('<'), |_| Comparison::Less),
    ));
    let parser = tuple((
        side(registry),
        expect(comparison, RulesErrorKind::ExpectedComparison),
        side(registry),
    ));
    wrap_err(parser, RulesErrorKind::ExpectedEquation)
}

// Private Sub-Parsers =================================================================================================

/// Side = [ whitespace ] , ( Grouped Terms | Terms ) , [ whitespace ] ;
/// Grouped Terms = [ Decimal , "*" ] , "(" , Terms , ")" ;
fn side<'r, 'a, 's>(registry: &'r FragmentRegistry<'a>) -> impl FnMut(&'s str) -> ParseResult<'s, Expression> {
    let multiplier = terminated(decimal, tuple((multispace0, char('*'), multispace0)));
    let closing_paren = expect(preceded(multispace0, char(')')), RulesErrorKind::ExpectedClosingParen);
    let grouped = map(
        pair(
            opt(multiplier),
            preceded(char('('), cut(terminated(terms(registry), closing_paren))),
        ),
        |(global_multiplier, fragments)| Expression::new(global_multiplier.unwrap_or(Decimal::ONE), fragments),
    );
    let plain = map(terms(registry), |fragments| Expression::new(Decimal::ONE, fragments));
    wrap_err(
        delimited(multispace0, alt((grouped, plain)), multispace0),
        RulesErrorKind::ExpectedExpression,
    )
}

/// Terms = [ whitespace ] , [ Sign ] , Term , { [ whitespace ] , Sign , Term } ;
/// Sign = ( "+" | "-" ) , [ whitespace ] ;
///
/// The first term is read as a fragment name before its sign, so that names like `-H2O` can lead an expression.
fn terms<'r, 'a, 's>(registry: &'r FragmentRegistry<'a>) -> impl FnMut(&'s str) -> ParseResult<'s, Vec<FragmentMult>> {
    let sign = || terminated(offset_kind::<RulesErrorKind>, multispace0);
    let unsigned = pair(success(None::<OffsetKind>), term(registry));
    let mut first = preceded(multispace0, alt((unsigned, pair(opt(sign()), term(registry)))));
    let mut rest = many0(pair(preceded(multispace0, sign()), cut(term(registry))));
    move |i| {
        let (i, (offset_kind, head)) = first(i)?;
        let (i, tail) = rest(i)?;
        let fragments = std::iter::once((offset_kind.unwrap_or(OffsetKind::Add), head))
            .chain(tail)
            .map(|(offset_kind, fragment)| FragmentMult {
                positive: offset_kind == OffsetKind::Add,
                ..fragment
            })
            .collect();
        Ok((i, fragments))
    }
}

/// Term = [ Decimal , "*" ] , Operand , { [ whitespace ] , ( "*" , Decimal | "[" , Position , "]" ) } ;
///
/// Every factor multiplies into one, and the last position wins.
fn term<'r, 'a, 's>(registry: &'r FragmentRegistry<'a>) -> impl FnMut(&'s str) -> ParseResult<'s, FragmentMult> {
    enum Suffix {
        Factor(Decimal),
        Position(usize),
    }

    let mut prefix = opt(terminated(decimal, tuple((multispace0, char('*'), multispace0))));
    let mut operand = operand(registry);
    let factor = map(preceded(pair(char('*'), multispace0), cut(decimal)), Suffix::Factor);
    let position = map(
        delimited(
            char('['),
            cut(expect(u32, RulesErrorKind::ExpectedPosition)),
            cut(expect(char(']'), RulesErrorKind::ExpectedPosition)),
        ),
        |position| Suffix::Position(position as usize),
    );
    let mut suffixes = many0(preceded(multispace0, alt((factor, position))));
    move |i| {
        let (i, leading_factor) = prefix(i)?;
        let (i, (fragment_name, chain_type)) = operand(i)?;
        let (i, suffixes) = suffixes(i)?;
        let mut mult_factor = leading_factor.unwrap_or(Decimal::ONE);
        let mut position = None;
        for suffix in suffixes {
            match suffix {
                Suffix::Factor(factor) => mult_factor *= factor,
                Suffix::Position(p) => position = Some(p),
            }
        }
        let fragment = FragmentMult::new(fragment_name, chain_type, mult_factor, true, position);
        Ok((i, fragment))
    }
}

/// Operand = "$BASEPEAK" | Fragment Name | Undefined ;
fn operand<'r, 'a, 's>(
    registry: &'r FragmentRegistry<'a>,
) -> impl FnMut(&'s str) -> ParseResult<'s, (&'r str, Option<ChainType>)> {
    let mut names = registry.names_longest_first();
    names.insert(0, BASE_PEAK);
    move |i| {
        let matched = names.iter().find_map(|&name| {
            let rest = i.strip_prefix(name)?;
            rest.chars().next().is_none_or(is_delimiter).then_some((rest, name))
        });
        if let Some((rest, name)) = matched {
            let chain_type = registry.get(name).and_then(|rule| rule.chain_type());
            return Ok((rest, (name, chain_type)));
        }

        // Anything else that looks like a name is an undefined fragment
        let (_, token) = expect(token, RulesErrorKind::ExpectedEquationTerm)(i)?;
        let error = LabeledParseError::new(i, RulesErrorKind::UndefinedFragment).spanning(token.len());
        Err(nom::Err::Failure(error))
    }
}

/// Decimal = digit , { digit } , [ "." , digit , { digit } ] ;
fn decimal(i: &str) -> ParseResult<Decimal> {
    let digits = recognize(pair(digit1, opt(pair(char('.'), digit1))));
    map_res(expect(digits, RulesErrorKind::ExpectedDecimal), str::parse::<Decimal>)(i)
}

/// Token = { ? anything but whitespace, an operator, or a bracket ? }- ;
fn token(i: &str) -> ParseResult<&str> {
    take_till1(is_delimiter)(i)
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || "+-*[]()<>".contains(c)
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use lipochem::AtomicDatabase;
    use nom_miette::final_parser;
    use once_cell::sync::Lazy;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{FragmentRule, testing_tools::assert_error_labels};

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);

    static REGISTRY: Lazy<FragmentRegistry> = Lazy::new(|| {
        let mut registry = FragmentRegistry::new(&DB);
        for (name, formula) in [("PC", "C5H15NO4P"), ("PC-H2O", "PC-H2O"), ("-Na", "$PRECURSOR-Na")] {
            let rule = FragmentRule::new(&registry, name, formula).unwrap();
            registry.push_head(rule).unwrap();
        }
        for (name, formula) in [("FA1", "$CHAIN"), ("FA1a", "$CHAIN-H2O"), ("LCB", "$LCB")] {
            let rule = FragmentRule::new(&registry, name, formula).unwrap();
            registry.push_chain(rule).unwrap();
        }
        registry
    });

    fn parse(input: &str) -> (String, Comparison, String) {
        let (bigger, comparison, smaller) = final_parser(equation(&REGISTRY))(input).unwrap();
        (bigger.to_string(), comparison, smaller.to_string())
    }

    #[test]
    fn simple_comparisons() {
        assert_eq!(
            parse("PC > $BASEPEAK"),
            ("PC".to_owned(), Comparison::Greater, "$BASEPEAK".to_owned())
        );
        assert_eq!(
            parse("FA1<0.5*FA1a"),
            ("FA1".to_owned(), Comparison::Less, "FA1a*0.5".to_owned())
        );
    }

    #[test]
    fn longest_names_win() {
        assert_eq!(
            parse("PC-H2O > PC - -Na"),
            ("PC-H2O".to_owned(), Comparison::Greater, "PC - -Na".to_owned())
        );
        let (bigger, _, _) = final_parser(equation(&REGISTRY))("FA1a > FA1").unwrap();
        assert_eq!(bigger.fragments()[0].fragment_name(), "FA1a");
        assert_eq!(bigger.fragments()[0].chain_type(), Some(ChainType::Acyl));
    }

    #[test]
    fn factors_and_positions() {
        let (bigger, _, smaller) = final_parser(equation(&REGISTRY))("2*FA1[1]*1.5 > 0.1*($BASEPEAK - FA1a[2])")
            .unwrap();
        let fragment = &bigger.fragments()[0];
        assert_eq!(fragment.mult_factor(), dec!(3.0));
        assert_eq!(fragment.position(), Some(1));
        assert_eq!(smaller.global_multiplier(), dec!(0.1));
        assert_eq!(smaller.position(), Some(2));
        assert!(smaller.is_absolute_comparison());
        assert_eq!(
            parse("-FA1 + LCB[2] > 3 * (PC)"),
            ("-FA1 + LCB[2]".to_owned(), Comparison::Greater, "3*(PC)".to_owned())
        );
    }

    #[test]
    fn equation_errors() {
        let equation = |input| final_parser(equation(&REGISTRY))(input);
        assert_error_labels!(equation("PC > FA2"), vec![("undefined", 5, 3)]);
        assert_error_labels!(equation("PE > PC"), vec![("undefined", 0, 2)]);
        assert_error_labels!(equation("PC = FA1"), vec![("expected '>' or '<'", 3, 0)]);
        assert_error_labels!(equation("PC > 0.5*(FA1"), vec![("expected ')'", 13, 0)]);
        assert_error_labels!(equation("FA1[x] > PC"), vec![("expected position", 4, 0)]);
        assert_error_labels!(
            equation("99999999999999999999999999999*PC > FA1"),
            vec![("invalid decimal", 0, 29)]
        );
        assert!(equation("PC >").is_err());
        assert!(equation("> PC").is_err());
        assert!(equation("").is_err());
    }
}
