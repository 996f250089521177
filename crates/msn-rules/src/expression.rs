// Standard Library Imports
use std::fmt::{self, Display, Formatter};

// External Crate Imports
use rust_decimal::{Decimal, prelude::ToPrimitive};

// Local Crate Imports
use crate::{BASE_PEAK, ChainType, Evidence, Expression, FattyAcid, FragmentMult};

// Public API ==========================================================================================================

impl FragmentMult {
    #[must_use]
    pub fn new(
        fragment_name: impl Into<String>,
        chain_type: Option<ChainType>,
        mult_factor: Decimal,
        positive: bool,
        position: Option<usize>,
    ) -> Self {
        Self {
            fragment_name: fragment_name.into(),
            chain_type,
            mult_factor,
            positive,
            position,
        }
    }

    #[must_use]
    pub fn fragment_name(&self) -> &str {
        &self.fragment_name
    }

    /// The chain this fragment comes from, or `None` for head group fragments and the base peak
    #[must_use]
    pub const fn chain_type(&self) -> Option<ChainType> {
        self.chain_type
    }

    #[must_use]
    pub const fn mult_factor(&self) -> Decimal {
        self.mult_factor
    }

    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.positive
    }

    #[must_use]
    pub const fn position(&self) -> Option<usize> {
        self.position
    }

    #[must_use]
    pub fn is_base_peak(&self) -> bool {
        self.fragment_name == BASE_PEAK
    }
}

impl Expression {
    #[must_use]
    pub const fn new(global_multiplier: Decimal, fragments: Vec<FragmentMult>) -> Self {
        Self {
            global_multiplier,
            fragments,
        }
    }

    #[must_use]
    pub const fn global_multiplier(&self) -> Decimal {
        self.global_multiplier
    }

    #[must_use]
    pub fn fragments(&self) -> &[FragmentMult] {
        &self.fragments
    }

    /// Sums the weighted areas of every fragment, then scales the sum by the global multiplier
    ///
    /// Fragments that weren't found count as zero, so [`Self::enough_fragments_found`] should be checked before
    /// trusting the result.
    #[must_use]
    pub fn evaluate(&self, found: &Evidence, base_peak: Option<f64>) -> f64 {
        let sum: f64 = self
            .fragments
            .iter()
            .map(|fragment| {
                let area = if fragment.is_base_peak() {
                    base_peak.unwrap_or_default()
                } else {
                    found.get(&fragment.fragment_name).map_or(0.0, |f| f.area)
                };
                let value = area * to_f64(fragment.mult_factor);
                if fragment.positive { value } else { -value }
            })
            .sum();
        sum * to_f64(self.global_multiplier)
    }

    /// Whether this side compares against an absolute intensity (a fraction of the base peak)
    #[must_use]
    pub fn is_absolute_comparison(&self) -> bool {
        self.global_multiplier > Decimal::ZERO
            && self.fragments.iter().any(|f| f.positive && f.is_base_peak())
    }

    /// The chain position of the first fragment that isn't the base peak
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        self.fragments
            .iter()
            .find(|f| !f.is_base_peak())
            .and_then(|f| f.position)
    }

    /// Whether this side refers to the base peak, or to at least one positive fragment that was found
    #[must_use]
    pub fn enough_fragments_found(&self, found: &Evidence) -> bool {
        self.fragments.iter().any(|f| f.is_base_peak()) || self.found_positive_in(found)
    }

    /// Whether any positive fragment of this side was found in `found`
    #[must_use]
    pub fn found_positive_in(&self, found: &Evidence) -> bool {
        self.fragments
            .iter()
            .any(|f| f.positive && !f.is_base_peak() && found.contains_key(&f.fragment_name))
    }

    pub fn chain_types(&self) -> impl Iterator<Item = ChainType> + '_ {
        self.fragments.iter().filter_map(|f| f.chain_type)
    }

    /// Renames every chain fragment to `NAME(chain)`, using `chain_for` to pick the chain, as found fragments of
    /// chains are stored under these names
    #[must_use]
    pub fn instantiate<'c>(&self, chain_for: impl Fn(&FragmentMult) -> Option<&'c FattyAcid>) -> Self {
        let fragments = self
            .fragments
            .iter()
            .map(|fragment| match chain_for(fragment) {
                Some(chain) if fragment.chain_type.is_some() => FragmentMult {
                    fragment_name: chain_fragment_key(&fragment.fragment_name, chain),
                    ..fragment.clone()
                },
                _ => fragment.clone(),
            })
            .collect();
        Self {
            fragments,
            ..*self
        }
    }
}

/// The name a chain fragment is found under, like `FA1(16:0)`
#[must_use]
pub fn chain_fragment_key(fragment_name: &str, chain: &FattyAcid) -> String {
    format!("{fragment_name}({chain})")
}

// Display Trait Implementations =======================================================================================

impl Display for FragmentMult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fragment_name)?;
        if self.mult_factor != Decimal::ONE {
            write!(f, "*{}", self.mult_factor)?;
        }
        if let Some(position) = self.position {
            write!(f, "[{position}]")?;
        }
        Ok(())
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let grouped = self.global_multiplier != Decimal::ONE;
        if grouped {
            write!(f, "{}*(", self.global_multiplier)?;
        }
        for (i, fragment) in self.fragments.iter().enumerate() {
            match (i, fragment.positive) {
                (0, true) => (),
                (0, false) => write!(f, "-")?,
                (_, true) => write!(f, " + ")?,
                (_, false) => write!(f, " - ")?,
            }
            write!(f, "{fragment}")?;
        }
        if grouped {
            write!(f, ")")?;
        }
        Ok(())
    }
}

// Private Helper Functions ============================================================================================

fn to_f64(decimal: Decimal) -> f64 {
    decimal.to_f64().unwrap_or_default()
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;
    use insta::assert_snapshot;
    use lipochem::AtomicDatabase;
    use once_cell::sync::Lazy;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::FoundFragment;

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);

    fn term(name: &str, mult_factor: Decimal, positive: bool) -> FragmentMult {
        FragmentMult::new(name, None, mult_factor, positive, None)
    }

    fn evidence(areas: &[(&str, f64)]) -> Evidence {
        areas
            .iter()
            .map(|&(name, area)| (name.to_owned(), FoundFragment::new(area, 100.0, 2)))
            .collect()
    }

    #[test]
    fn base_peak_alone() {
        let expression = Expression::new(Decimal::ONE, vec![term(BASE_PEAK, Decimal::ONE, true)]);
        assert_float_absolute_eq!(expression.evaluate(&Evidence::default(), Some(5.0)), 5.0);
        assert_float_absolute_eq!(expression.evaluate(&Evidence::default(), None), 0.0);
    }

    #[test]
    fn weighted_sums() {
        let found = evidence(&[("A", 100.0), ("B", 40.0)]);
        let expression = Expression::new(
            dec!(0.5),
            vec![
                term("A", Decimal::ONE, true),
                term("B", dec!(2), false),
                term("Missing", dec!(3), true),
            ],
        );
        assert_float_absolute_eq!(expression.evaluate(&found, None), 10.0);
        assert!(expression.enough_fragments_found(&found));

        // Missing fragments count as zero, but leave too little to evaluate
        assert!(!expression.enough_fragments_found(&Evidence::default()));
        assert_float_absolute_eq!(expression.evaluate(&Evidence::default(), None), 0.0);

        // Only positive fragments count towards having enough evidence
        let negative_only = Expression::new(Decimal::ONE, vec![term("B", Decimal::ONE, false)]);
        assert!(!negative_only.enough_fragments_found(&found));
    }

    #[test]
    fn absolute_comparisons() {
        let absolute = Expression::new(dec!(0.1), vec![term(BASE_PEAK, Decimal::ONE, true)]);
        assert!(absolute.is_absolute_comparison());
        assert!(absolute.enough_fragments_found(&Evidence::default()));
        let negated = Expression::new(dec!(0.1), vec![term(BASE_PEAK, Decimal::ONE, false)]);
        assert!(!negated.is_absolute_comparison());
        let relative = Expression::new(Decimal::ONE, vec![term("A", Decimal::ONE, true)]);
        assert!(!relative.is_absolute_comparison());
    }

    #[test]
    fn positions() {
        let expression = Expression::new(
            Decimal::ONE,
            vec![
                term(BASE_PEAK, Decimal::ONE, true),
                FragmentMult::new("FA", Some(ChainType::Acyl), Decimal::ONE, true, Some(2)),
                FragmentMult::new("FA-H2O", Some(ChainType::Acyl), Decimal::ONE, true, Some(1)),
            ],
        );
        assert_eq!(expression.position(), Some(2));
        let unpositioned = Expression::new(Decimal::ONE, vec![term("A", Decimal::ONE, true)]);
        assert_eq!(unpositioned.position(), None);
    }

    #[test]
    fn instantiated_display() {
        let chain = FattyAcid::decode(&DB, "16:0", ChainType::Acyl).unwrap();
        let expression = Expression::new(
            dec!(0.5),
            vec![
                FragmentMult::new("FA", Some(ChainType::Acyl), Decimal::ONE, true, Some(1)),
                FragmentMult::new("FA-H2O", Some(ChainType::Acyl), dec!(2), false, Some(1)),
                term("PC", Decimal::ONE, true),
            ],
        );
        assert_snapshot!(expression, @"0.5*(FA[1] - FA-H2O*2[1] + PC)");
        let instantiated = expression.instantiate(|_| Some(&chain));
        assert_snapshot!(instantiated, @"0.5*(FA(16:0)[1] - FA-H2O(16:0)*2[1] + PC)");
        assert_eq!(instantiated.chain_types().count(), 2);

        let negative_first = Expression::new(Decimal::ONE, vec![term("A", dec!(1.5), false)]);
        assert_snapshot!(negative_first, @"-A*1.5");
    }
}
