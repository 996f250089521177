use nom::{
    branch::alt,
    bytes::complete::{take_till, take_while1},
    character::complete::{alpha1, char},
    combinator::{cut, map},
    multi::separated_list1,
    sequence::{delimited, preceded, separated_pair},
};
use nom_miette::{expect, wrap_err};

use super::errors::{ParseResult, RulesErrorKind};

/// One line of a rule file, with comments and surrounding whitespace already removed
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum RuleLine<'s> {
    Section(&'s str),
    Block(&'s str),
    Fields(Vec<(&'s str, &'s str)>),
}

/// Rule Line = Section Header | Block Header | Fields ;
pub fn rule_line(i: &str) -> ParseResult<RuleLine> {
    let parser = alt((
        map(section_header, RuleLine::Section),
        map(block_header, RuleLine::Block),
        map(fields, RuleLine::Fields),
    ));
    wrap_err(parser, RulesErrorKind::ExpectedRuleLine)(i)
}

/// Section Header = "[" , { letter }- , "]" ;
fn section_header(i: &str) -> ParseResult<&str> {
    let closing_bracket = expect(char(']'), RulesErrorKind::ExpectedClosingBracket);
    let name = expect(alpha1, RulesErrorKind::ExpectedRuleLine);
    delimited(char('['), cut(name), cut(closing_bracket))(i)
}

/// Block Header = "!" , { letter }- ;
fn block_header(i: &str) -> ParseResult<&str> {
    preceded(char('!'), cut(expect(alpha1, RulesErrorKind::ExpectedRuleLine)))(i)
}

/// Fields = Field , { { tab }- , Field } ;
fn fields(i: &str) -> ParseResult<Vec<(&str, &str)>> {
    separated_list1(take_while1(|c| c == '\t'), cut(field))(i)
}

/// Field = Key , "=" , { ? anything but a tab ? } ;
/// Key = { letter | digit | "_" }- ;
fn field(i: &str) -> ParseResult<(&str, &str)> {
    let key = take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_');
    let value = take_till(|c| c == '\t');
    expect(separated_pair(key, char('='), value), RulesErrorKind::ExpectedField)(i)
}

#[cfg(test)]
mod tests {
    use nom_miette::final_parser;

    use super::*;
    use crate::testing_tools::assert_error_labels;

    #[test]
    fn line_kinds() {
        let rule_line = |i| final_parser(rule_line)(i);
        assert_eq!(rule_line("[GENERAL]"), Ok(RuleLine::Section("GENERAL")));
        assert_eq!(rule_line("!FRAGMENTS"), Ok(RuleLine::Block("FRAGMENTS")));
        assert_eq!(
            rule_line("Name=NL_PC\tFormula=$PRECURSOR -C5H14NO4P\t\tCharge=1"),
            Ok(RuleLine::Fields(vec![
                ("Name", "NL_PC"),
                ("Formula", "$PRECURSOR -C5H14NO4P"),
                ("Charge", "1")
            ]))
        );
        assert_eq!(
            rule_line("Equation=FA1[1] > 0.5*FA1[2]"),
            Ok(RuleLine::Fields(vec![("Equation", "FA1[1] > 0.5*FA1[2]")]))
        );
        assert_eq!(rule_line("oh="), Ok(RuleLine::Fields(vec![("oh", "")])));
    }

    #[test]
    fn malformed_lines() {
        let rule_line = |i| final_parser(rule_line)(i);
        assert_error_labels!(rule_line("[HEAD"), vec![("expected ']'", 5, 0)]);
        assert_error_labels!(rule_line("Name=PC\tFormula"), vec![("expected Key=Value", 8, 0)]);
        assert!(rule_line("[]").is_err());
        assert!(rule_line("!").is_err());
        assert!(rule_line("= PC").is_err());
    }
}
