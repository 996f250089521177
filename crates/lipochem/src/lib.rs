//! Signed chemical-formula arithmetic for annotating lipid fragment ions

pub mod atoms;
pub mod errors;
pub mod parsers;
#[cfg(test)]
mod testing_tools;

// Standard Library Imports
use std::{
    collections::BTreeMap,
    num::{NonZeroI32, NonZeroU32},
};

// External Crate Imports
use ahash::HashMap;
use derive_more::{Add, AddAssign, Display, From, Into, Neg, Sub, SubAssign, Sum};
use rust_decimal::Decimal;

pub use atoms::atomic_database::AtomicDatabase;
pub use errors::{LipochemError, Result};

// NOTE: For the types in this crate, 'a lifetimes indicate references to the AtomicDatabase

/// A mapping from elements to signed counts, used for whole molecules and for the formula differences between them
///
/// No element is ever stored with a count of zero: any element that nets out to zero is removed entirely.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ChemicalComposition<'a> {
    atoms: BTreeMap<Element<'a>, Count>,
}

#[derive(Copy, Clone, Debug)]
pub struct Element<'a> {
    symbol: &'a str,
    name: &'a str,
    isotopes: &'a HashMap<MassNumber, Isotope>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Count(NonZeroI32);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum OffsetKind {
    Add,
    Remove,
}

// ---------------------------------------------------------------------------------------------------------------------

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From, Into)]
pub struct MassNumber(NonZeroU32);

#[derive(Clone, Eq, PartialEq, Debug)]
struct Isotope {
    relative_mass: Mass,
    abundance: Option<Decimal>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, From, Into)]
pub struct Charge(i64);

// ---------------------------------------------------------------------------------------------------------------------

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Display, From, Into, Add, Sub, Neg, Sum,
)]
struct Mass(Decimal);

#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    Default,
    Display,
    From,
    Into,
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Neg,
    Sum,
)]
pub struct MonoisotopicMass(Decimal);

#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    Default,
    Display,
    From,
    Into,
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Neg,
    Sum,
)]
pub struct AverageMass(Decimal);

#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    Default,
    Display,
    From,
    Into,
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Neg,
    Sum,
)]
pub struct Mz(Decimal);

// =====================================================================================================================

pub trait Massive {
    fn monoisotopic_mass(&self) -> MonoisotopicMass;
    fn average_mass(&self) -> AverageMass;
}

// Blanket impls

macro_rules! massive_ref_impls {
    ($($ref_type:ty),+ $(,)?) => {
        $(
            impl<T: Massive> Massive for $ref_type {
                fn monoisotopic_mass(&self) -> MonoisotopicMass {
                    (**self).monoisotopic_mass()
                }

                fn average_mass(&self) -> AverageMass {
                    (**self).average_mass()
                }
            }
        )+
    };
}

massive_ref_impls!(&T, &mut T, Box<T>);
