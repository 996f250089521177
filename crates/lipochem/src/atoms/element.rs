// Standard Library Imports
use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
};

// External Crate Imports
use rust_decimal::Decimal;

// Local Crate Imports
use super::{
    atomic_database::{AtomicDatabase, ElementDescription},
    errors::AtomicLookupError,
};
use crate::{AverageMass, Element, Isotope, Mass, Massive, MonoisotopicMass};

// Public API ==========================================================================================================

impl<'a> Element<'a> {
    pub(crate) fn new(
        db: &'a AtomicDatabase,
        symbol: impl AsRef<str>,
    ) -> Result<Self, AtomicLookupError> {
        let symbol = symbol.as_ref();
        let (symbol, ElementDescription { name, isotopes }) = db
            .elements
            .get_key_value(symbol)
            .ok_or_else(|| AtomicLookupError::element(symbol))?;

        let element = Self {
            symbol,
            name,
            isotopes,
        };

        if element.natural_isotopes().next().is_none() {
            return Err(AtomicLookupError::abundance(
                symbol,
                name,
                isotopes.keys(),
            ));
        }

        Ok(element)
    }

    #[must_use]
    pub const fn symbol(&self) -> &'a str {
        self.symbol
    }

    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }
}

// Ordering, Equality, and Display =====================================================================================

// NOTE: Elements are ordered using the Hill system: carbon first, hydrogen second, then everything else alphabetically
impl Ord for Element<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hill_key().cmp(&other.hill_key())
    }
}

impl PartialOrd for Element<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Element<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for Element<'_> {}

impl Hash for Element<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

impl Display for Element<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

// Massive Trait Implementation ========================================================================================

impl Massive for Element<'_> {
    fn monoisotopic_mass(&self) -> MonoisotopicMass {
        MonoisotopicMass(self.most_abundant_mass().0)
    }

    fn average_mass(&self) -> AverageMass {
        AverageMass(
            self.natural_isotopes()
                .map(|(relative_mass, abundance)| relative_mass.0 * abundance)
                .sum(),
        )
    }
}

// Private Helper Methods ==============================================================================================

impl Element<'_> {
    fn hill_key(&self) -> (u8, &str) {
        let rank = match self.symbol {
            "C" => 0,
            "H" => 1,
            _ => 2,
        };
        (rank, self.symbol)
    }

    fn natural_isotopes(&self) -> impl Iterator<Item = (Mass, Decimal)> + '_ {
        self.isotopes.values().filter_map(
            |&Isotope {
                 relative_mass,
                 abundance,
             }| abundance.map(|a| (relative_mass, a)),
        )
    }

    // NOTE: `new()` guarantees there is at least one isotope with abundance data, so the fallback is never used
    fn most_abundant_mass(&self) -> Mass {
        self.natural_isotopes()
            .max_by_key(|&(_, abundance)| abundance)
            .map(|(relative_mass, _)| relative_mass)
            .unwrap_or_default()
    }
}

// Module Tests ========================================================================================================
