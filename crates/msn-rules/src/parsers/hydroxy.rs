use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0, u32},
    combinator::{map, opt},
    multi::separated_list1,
    sequence::{delimited, preceded, tuple},
};
use nom_miette::{expect, map_res, wrap_err};

use super::errors::{ParseResult, RulesErrorKind};
use crate::{ChainType, HydroxyRequirement, HydroxyRequirements, MandatoryLevel};

/// Hydroxy Requirements = Hydroxy Requirement , { "," , Hydroxy Requirement } ;
pub fn hydroxy_requirements(i: &str) -> ParseResult<HydroxyRequirements> {
    let entry = delimited(multispace0, hydroxy_requirement, multispace0);
    let parser = map(separated_list1(char(','), entry), HydroxyRequirements);
    wrap_err(parser, RulesErrorKind::ExpectedHydroxyList)(i)
}

/// Hydroxy Requirement = [ Chain Token ] , OH Count , [ ":" , Mandatory Level ] ;
fn hydroxy_requirement(i: &str) -> ParseResult<HydroxyRequirement> {
    let oh_count = expect(u32, RulesErrorKind::ExpectedHydroxyCount);
    let level = preceded(char(':'), mandatory_level);
    map(
        tuple((opt(chain_token), oh_count, opt(level))),
        |(chain_type, oh, mandatory)| HydroxyRequirement {
            oh,
            chain_type,
            mandatory: mandatory.unwrap_or_default(),
        },
    )(i)
}

/// Chain Token = "$CHAIN" | "$ALKYLCHAIN" | "$ALKENYLCHAIN" | "$LCB" ;
fn chain_token(i: &str) -> ParseResult<ChainType> {
    alt((
        map(tag("$CHAIN"), |_| ChainType::Acyl),
        map(tag("$ALKYLCHAIN"), |_| ChainType::Alkyl),
        map(tag("$ALKENYLCHAIN"), |_| ChainType::Alkenyl),
        map(tag("$LCB"), |_| ChainType::Lcb),
    ))(i)
}

/// Mandatory Level = "true" | "false" | "other" | "quant" | "class" ;
fn mandatory_level(i: &str) -> ParseResult<MandatoryLevel> {
    map_res(take_while1(|c: char| c.is_ascii_alphabetic()), str::parse::<MandatoryLevel>)(i)
}
