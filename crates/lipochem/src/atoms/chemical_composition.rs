// Standard Library Imports
use std::{
    collections::btree_map::Entry,
    fmt::{self, Display, Formatter},
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

// External Crate Imports
use nom_miette::final_parser;

// Local Crate Imports
use crate::{
    AtomicDatabase, AverageMass, ChemicalComposition, Count, Element, Massive, MonoisotopicMass,
    OffsetKind, Result,
    parsers::{chemical_composition::chemical_composition, errors::LipochemErrorKind},
};

// Public API ==========================================================================================================

impl<'a> ChemicalComposition<'a> {
    /// Parses a signed formula like `C16H32O2`, `+C2 -H4`, or `-H2O`
    ///
    /// # Errors
    ///
    /// Fails if the formula can't be parsed, or if it names an element missing from `db`
    pub fn new(db: &'a AtomicDatabase, formula: impl AsRef<str>) -> Result<Self> {
        let mut parser = final_parser(chemical_composition::<LipochemErrorKind>(db));
        parser(formula.as_ref()).map_err(|e| Box::new(e.into()))
    }

    /// Builds a composition from `(symbol, count)` pairs, summing repeated symbols and skipping zeroes
    ///
    /// # Errors
    ///
    /// Fails if any symbol is missing from `db`
    pub fn from_counts<S: AsRef<str>>(
        db: &'a AtomicDatabase,
        counts: impl IntoIterator<Item = (S, i32)>,
    ) -> Result<Self> {
        let mut composition = Self::default();
        for (symbol, n) in counts {
            let element = Element::new(db, symbol)?;
            if let Some(count) = Count::new(n) {
                composition.offset_element(element, count);
            }
        }
        Ok(composition)
    }

    /// The signed count of the element `symbol`, which is zero if it's absent
    #[must_use]
    pub fn count(&self, symbol: &str) -> i32 {
        self.atoms
            .iter()
            .find(|(element, _)| element.symbol() == symbol)
            .map_or(0, |(_, count)| count.get())
    }

    /// Element symbols and their (never zero) signed counts, in Hill order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, i32)> + '_ {
        self.atoms
            .iter()
            .map(|(element, count)| (element.symbol(), count.get()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Multiplies every count by `factor`, so scaling by zero gives the empty composition
    #[must_use]
    pub fn scaled(&self, factor: i32) -> Self {
        let atoms = self
            .atoms
            .iter()
            .filter_map(|(&element, count)| Some((element, count.checked_mul(factor)?)))
            .collect();
        Self { atoms }
    }
}

// Arithmetic Trait Implementations ====================================================================================

impl<'a> AddAssign<&Self> for ChemicalComposition<'a> {
    fn add_assign(&mut self, rhs: &Self) {
        for (&element, &count) in &rhs.atoms {
            self.offset_element(element, count);
        }
    }
}

impl<'a> SubAssign<&Self> for ChemicalComposition<'a> {
    fn sub_assign(&mut self, rhs: &Self) {
        for (&element, &count) in &rhs.atoms {
            self.offset_element(element, OffsetKind::Remove.offset(count));
        }
    }
}

impl<'a> Add for &ChemicalComposition<'a> {
    type Output = ChemicalComposition<'a>;

    fn add(self, rhs: Self) -> Self::Output {
        let mut sum = self.clone();
        sum += rhs;
        sum
    }
}

impl<'a> Sub for &ChemicalComposition<'a> {
    type Output = ChemicalComposition<'a>;

    fn sub(self, rhs: Self) -> Self::Output {
        let mut difference = self.clone();
        difference -= rhs;
        difference
    }
}

impl<'a> Neg for &ChemicalComposition<'a> {
    type Output = ChemicalComposition<'a>;

    fn neg(self) -> Self::Output {
        self.scaled(-1)
    }
}

// Massive Trait Implementation ========================================================================================

impl Massive for ChemicalComposition<'_> {
    fn monoisotopic_mass(&self) -> MonoisotopicMass {
        self.atoms
            .iter()
            .map(|(element, &count)| count * element.monoisotopic_mass())
            .sum()
    }

    fn average_mass(&self) -> AverageMass {
        self.atoms
            .iter()
            .map(|(element, &count)| count * element.average_mass())
            .sum()
    }
}

// Display Trait Implementation ========================================================================================

// NOTE: Signs are only written when they change, so `C2-H4O` is +2 carbon, -4 hydrogen, and -1 oxygen. This is
// exactly how the parser reads formulae, so any displayed composition can be parsed back into itself
impl Display for ChemicalComposition<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut current_kind = OffsetKind::Add;
        for (element, &count) in &self.atoms {
            let offset_kind = count.offset_kind();
            if offset_kind != current_kind {
                write!(f, "{offset_kind}")?;
                current_kind = offset_kind;
            }
            write!(f, "{element}{count}")?;
        }
        Ok(())
    }
}

// Private Helper Methods ==============================================================================================

impl<'a> ChemicalComposition<'a> {
    pub(crate) fn from_offsets(offsets: Vec<(Element<'a>, Count)>) -> Self {
        let mut composition = Self::default();
        for (element, count) in offsets {
            composition.offset_element(element, count);
        }
        composition
    }

    fn offset_element(&mut self, element: Element<'a>, count: Count) {
        match self.atoms.entry(element) {
            Entry::Vacant(e) => {
                e.insert(count);
            }
            Entry::Occupied(mut e) => {
                if let Some(sum) = e.get().checked_add(count) {
                    e.insert(sum);
                } else {
                    e.remove();
                }
            }
        }
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use once_cell::sync::Lazy;
    use rust_decimal_macros::dec;

    use crate::testing_tools::assert_error_labels;

    use super::*;

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);

    fn formula(text: &str) -> ChemicalComposition<'static> {
        ChemicalComposition::new(&DB, text).unwrap()
    }

    #[test]
    fn composition_errors() {
        let chemical_composition = |formula| ChemicalComposition::new(&DB, formula);
        // Looking up non-existent elements
        assert_error_labels!(chemical_composition("NH2XyO4"), vec![("element not found", 3, 2)]);
        // Check counts are non-zero (no leading zeroes either!)
        assert_error_labels!(chemical_composition("C3H0N4"), vec![("expected non-zero", 3, 0)]);
        assert_error_labels!(chemical_composition("C3H06N4"), vec![("expected non-zero", 3, 0)]);
        // Signs must be followed by elements
        assert_error_labels!(chemical_composition("H2O+"), vec![("expected uppercase", 4, 0)]);
        assert_error_labels!(chemical_composition("H2O -2H"), vec![("expected uppercase", 5, 0)]);
        // Check for partially valid input
        assert_error_labels!(
            chemical_composition("C2H4,O"),
            vec![("input was valid up until this point", 4, 0)]
        );
        assert!(chemical_composition("c2").is_err());
        assert!(chemical_composition("[13C]2").is_err());
    }

    #[test]
    fn composition_error_messages() {
        let error = ChemicalComposition::new(&DB, "C2Zz").unwrap_err();
        assert_snapshot!(error.to_string(), @"expected a chemical composition: runs of elements (like C16H32O2), each optionally preceded by a '+' or '-' that applies until the next sign");
    }

    #[test]
    fn composition_display() {
        let formulae = [
            "",
            "C16H32O2",
            "C40H80NO8P",
            "C2-H4",
            "-C2H4+O",
            "-H2O",
            "H3N",
            "CH3Cl-Na",
            "D9C",
            "-K+Na",
        ];
        for text in formulae {
            let composition = formula(text);
            let displayed = composition.to_string();
            assert_eq!(formula(&displayed), composition, "{text}");
        }
        assert_eq!(formula("O2C16H32").to_string(), "C16H32O2");
        assert_eq!(formula("+C2 -H4").to_string(), "C2-H4");
        assert_eq!(formula("-O +C2H4 -C4").to_string(), "-C2+H4-O");
    }

    #[test]
    fn composition_arithmetic() {
        let precursor = formula("C40H80NO8P");
        let chain = formula("C16H32O2");
        let difference = &precursor - &chain;
        assert_eq!(difference.to_string(), "C24H48NO6P");
        assert_eq!((&difference + &chain), precursor);
        assert_eq!((-&chain).to_string(), "-C16H32O2");
        assert_eq!(&chain - &chain, ChemicalComposition::default());
        assert!((&chain - &chain).is_empty());

        let mut water = formula("H2O");
        water -= &formula("H2O");
        assert!(water.is_empty());
        water += &formula("-H");
        assert_eq!(water.to_string(), "-H");
    }

    #[test]
    fn composition_scaling_and_counts() {
        let water = formula("H2O");
        assert_eq!(water.scaled(3).to_string(), "H6O3");
        assert_eq!(water.scaled(-2).to_string(), "-H4O2");
        assert!(water.scaled(0).is_empty());
        assert_eq!(water.count("H"), 2);
        assert_eq!(water.count("C"), 0);
        assert_eq!(water.scaled(-1).count("O"), -1);
        let counts: Vec<_> = formula("C2-H4O").iter().collect();
        assert_eq!(counts, vec![("C", 2), ("H", -4), ("O", -1)]);
    }

    #[test]
    fn composition_from_counts() {
        let chain = ChemicalComposition::from_counts(&DB, [("C", 16), ("H", 32), ("O", 2), ("N", 0)]);
        assert_eq!(chain.unwrap(), formula("C16H32O2"));
        let summed = ChemicalComposition::from_counts(&DB, [("H", 2), ("H", -2), ("O", 1)]);
        assert_eq!(summed.unwrap().to_string(), "O");
        assert!(ChemicalComposition::from_counts(&DB, [("Xx", 1)]).is_err());
    }

    #[test]
    fn composition_monoisotopic_mass() {
        let water = formula("H2O");
        assert_eq!(
            water.monoisotopic_mass(),
            MonoisotopicMass(dec!(18.01056468403))
        );
        let palmitic_acid = formula("C16H32O2");
        assert_eq!(
            palmitic_acid.monoisotopic_mass(),
            MonoisotopicMass(dec!(256.24023027050))
        );
        // Negative counts subtract mass
        let loss = formula("-H2O");
        assert_eq!(
            loss.monoisotopic_mass(),
            MonoisotopicMass(dec!(-18.01056468403))
        );
        assert_eq!(
            formula("").monoisotopic_mass(),
            MonoisotopicMass::default()
        );
    }

    #[test]
    fn composition_average_mass() {
        let carbon = formula("C2");
        assert_eq!(carbon.average_mass(), AverageMass(dec!(24.021471793470498)));
    }
}
