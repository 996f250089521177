// Standard Library Imports
use std::{num::NonZeroU32, ops::Deref, str::FromStr};

// External Crate Imports
use ahash::HashMap;
use knuffel::{
    Decode, DecodeScalar,
    ast::{self, Integer, Literal, Radix, TypeName},
    decode::{Context, Kind},
    errors::{DecodeError, ExpectedType},
    span::Spanned,
    traits::ErrorSpan,
};
use miette::{Diagnostic, Result};
use rust_decimal::Decimal;
use thiserror::Error;

// Local Crate Imports
use crate::{Isotope, Mass, MassNumber};

// Public API ==========================================================================================================

pub const DEFAULT_KDL: &str = include_str!("../../atomic_database.kdl");

/// The table of elements that chemical formulae may reference, along with their isotopic masses
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct AtomicDatabase {
    pub(crate) elements: HashMap<String, ElementDescription>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) struct ElementDescription {
    pub(crate) name: String,
    pub(crate) isotopes: HashMap<MassNumber, Isotope>,
}

impl AtomicDatabase {
    pub fn new(file_name: impl AsRef<str>, kdl_text: impl AsRef<str>) -> Result<Self> {
        let parsed_db: AtomicDatabaseKdl = knuffel::parse(file_name.as_ref(), kdl_text.as_ref())?;
        let elements = parsed_db
            .elements
            .into_iter()
            .map(ElementEntry::from)
            .collect();
        Ok(Self { elements })
    }

    /// Whether `symbol` names an element in this database
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.elements.contains_key(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }
}

impl Default for AtomicDatabase {
    fn default() -> Self {
        // SAFETY: The bundled database is checked by the tests below, so parsing it can't fail
        Self::new("atomic_database.kdl", DEFAULT_KDL).unwrap()
    }
}

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
struct AtomicDatabaseKdl {
    #[knuffel(child, unwrap(children))]
    elements: Vec<ElementKdl>,
}

#[derive(Debug, Decode)]
struct ElementKdl {
    #[knuffel(node_name)]
    symbol: ElementSymbol,
    #[knuffel(argument)]
    name: String,
    #[knuffel(children(name = "isotope", non_empty))]
    isotopes: Vec<IsotopeKdl>,
}

#[derive(Debug, Decode)]
struct IsotopeKdl {
    #[knuffel(argument)]
    mass_number: MassNumberKdl,
    #[knuffel(argument)]
    relative_mass: DecimalKdl,
    #[knuffel(argument)]
    abundance: Option<DecimalKdl>,
}

// Lossless Parsing of KDL Numbers ====================================================================================

#[derive(Debug, Default)]
struct DecimalKdl(Decimal);

impl<S: ErrorSpan> DecodeScalar<S> for DecimalKdl {
    fn type_check(type_name: &Option<Spanned<TypeName, S>>, ctx: &mut Context<S>) {
        reject_type_annotations(type_name, ctx, "Decimal");
    }

    fn raw_decode(
        value: &Spanned<Literal, S>,
        ctx: &mut Context<S>,
    ) -> Result<Self, DecodeError<S>> {
        let (Literal::Decimal(ast::Decimal(s)) | Literal::Int(Integer(Radix::Dec, s))) = &**value
        else {
            ctx.emit_error(DecodeError::unsupported(
                value,
                format!("expected a decimal number, found {}", Kind::from(&**value)),
            ));
            return Ok(Self::default());
        };

        let parsed = if s.contains(['e', 'E']) {
            Decimal::from_scientific(s)
        } else {
            Decimal::from_str_exact(s)
        };
        match parsed {
            Ok(d) => Ok(Self(d)),
            Err(e) => {
                ctx.emit_error(DecodeError::conversion(value, Box::new(e)));
                Ok(Self::default())
            }
        }
    }
}

#[derive(Debug)]
struct MassNumberKdl(MassNumber);

impl<S: ErrorSpan> DecodeScalar<S> for MassNumberKdl {
    fn type_check(type_name: &Option<Spanned<TypeName, S>>, ctx: &mut Context<S>) {
        reject_type_annotations(type_name, ctx, "MassNumber");
    }

    fn raw_decode(
        value: &Spanned<Literal, S>,
        ctx: &mut Context<S>,
    ) -> Result<Self, DecodeError<S>> {
        let mass_number = match &**value {
            Literal::Int(Integer(Radix::Dec, s)) => s.parse().ok().and_then(NonZeroU32::new),
            _ => None,
        };
        mass_number.map(|n| Self(MassNumber(n))).ok_or_else(|| {
            DecodeError::unsupported(value, "expected a positive, whole mass number")
        })
    }
}

fn reject_type_annotations<S: ErrorSpan>(
    type_name: &Option<Spanned<TypeName, S>>,
    ctx: &mut Context<S>,
    rust_type: &'static str,
) {
    if let Some(t) = type_name {
        ctx.emit_error(DecodeError::TypeName {
            span: t.span().clone(),
            found: Some(t.deref().clone()),
            expected: ExpectedType::no_type(),
            rust_type,
        });
    }
}

// Element Symbol Validation ===========================================================================================

#[derive(Debug)]
struct ElementSymbol(String);

impl FromStr for ElementSymbol {
    type Err = InvalidElementSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chrs: Vec<_> = s.chars().collect();
        match chrs[..] {
            [f] if f.is_ascii_uppercase() => Ok(Self(s.to_owned())),
            [f, l] if f.is_ascii_uppercase() && l.is_ascii_lowercase() => Ok(Self(s.to_owned())),
            _ => Err(InvalidElementSymbolError(s.to_owned())),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Diagnostic, Error)]
#[error(
    "expected a single uppercase ASCII letter optionally followed by a lowercase ASCII letter, got {0:?}"
)]
struct InvalidElementSymbolError(String);

// Conversion From Parsed KDL to Internal Representation ===============================================================

type ElementEntry = (String, ElementDescription);

impl From<ElementKdl> for ElementEntry {
    fn from(
        ElementKdl {
            symbol,
            name,
            isotopes,
        }: ElementKdl,
    ) -> Self {
        let isotopes = isotopes
            .into_iter()
            .map(
                |IsotopeKdl {
                     mass_number,
                     relative_mass,
                     abundance,
                 }| {
                    let isotope = Isotope {
                        relative_mass: Mass(relative_mass.0),
                        abundance: abundance.map(|a| a.0),
                    };
                    (mass_number.0, isotope)
                },
            )
            .collect();
        (symbol.0, ElementDescription { name, isotopes })
    }
}

// Module Tests ========================================================================================================
