use nom::{
    character::complete::{char, one_of, satisfy, u32},
    combinator::{cut, map, map_opt, not},
    sequence::preceded,
};
use nom_miette::{expect, into};

use crate::{Count, OffsetKind};

use super::errors::{LipochemErrorKind, ParseResult, UserErrorKind};

/// Uppercase = ? any ASCII uppercase letter ? ;
pub fn uppercase<K: UserErrorKind>(i: &str) -> ParseResult<char, K> {
    let parser = satisfy(|c| c.is_ascii_uppercase());
    into(expect(parser, LipochemErrorKind::ExpectedUppercase))(i)
}

/// Lowercase = ? any ASCII lowercase letter ? ;
pub fn lowercase<K: UserErrorKind>(i: &str) -> ParseResult<char, K> {
    let parser = satisfy(|c| c.is_ascii_lowercase());
    into(expect(parser, LipochemErrorKind::ExpectedLowercase))(i)
}

/// Count = digit - "0" , { digit } ;
///
/// Counts must fit in an `i32`, so that they can later be negated.
pub fn count<K: UserErrorKind>(i: &str) -> ParseResult<Count, K> {
    let no_leading_zero = expect(cut(not(char('0'))), LipochemErrorKind::ExpectedNoLeadingZero);
    let digits = map_opt(u32, |c| i32::try_from(c).ok().and_then(Count::new));
    into(preceded(no_leading_zero, expect(digits, LipochemErrorKind::ExpectedDigit)))(i)
}

/// Offset Kind = "+" | "-" ;
pub fn offset_kind<K: UserErrorKind>(i: &str) -> ParseResult<OffsetKind, K> {
    let kind = |c| match c {
        '+' => OffsetKind::Add,
        _ => OffsetKind::Remove,
    };
    map(one_of("+-"), kind)(i)
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters() {
        let uppercase = uppercase::<LipochemErrorKind>;
        let lowercase = lowercase::<LipochemErrorKind>;
        assert!(('A'..='Z').all(|c| uppercase(&c.to_string()) == Ok(("", c))));
        assert!(('a'..='z').all(|c| lowercase(&c.to_string()) == Ok(("", c))));
        assert!(('a'..='z').all(|c| uppercase(&c.to_string()).is_err()));
        assert!(('A'..='Z').all(|c| lowercase(&c.to_string()).is_err()));
        assert_eq!(uppercase("Na"), Ok(("a", 'N')));
        assert_eq!(lowercase("a+"), Ok(("+", 'a')));
    }

    #[test]
    fn counts() {
        let count = |i| count::<LipochemErrorKind>(i).map(|(rest, c)| (rest, c.get()));
        assert_eq!(count("16"), Ok(("", 16)));
        assert_eq!(count("32O2"), Ok(("O2", 32)));
        assert!(count("0").is_err());
        assert!(count("02").is_err());
        assert!(count("O").is_err());
        assert!(count("-2").is_err());
        assert!(count("2147483648").is_err());
        assert_eq!(count("2147483647"), Ok(("", i32::MAX)));
    }

    #[test]
    fn offset_kinds() {
        let offset_kind = offset_kind::<LipochemErrorKind>;
        assert_eq!(offset_kind("+H"), Ok(("H", OffsetKind::Add)));
        assert_eq!(offset_kind("-H2O"), Ok(("H2O", OffsetKind::Remove)));
        assert!(offset_kind("H2O").is_err());
        assert!(offset_kind("").is_err());
    }
}
