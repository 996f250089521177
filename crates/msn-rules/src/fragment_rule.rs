// Standard Library Imports
use std::collections::BTreeSet;

// External Crate Imports
use lipochem::{Charge, ChemicalComposition, Massive, OffsetKind};
use nom_miette::final_parser;
use rust_decimal::Decimal;

// Local Crate Imports
use crate::{
    ChainType, FattyAcid, FragmentRegistry, FragmentRule, HydroxyRequirements, MandatoryLevel, Result, RuleChainType,
    RulesError,
    parsers::fragment_formula::{FormulaTerm, fragment_formula},
};

// NOTE: Masses of fragments are computed from their hydrogen and oxygen content relative to the precursor or chain
const REQUIRED_ELEMENTS: [&str; 2] = ["H", "O"];

// Public API ==========================================================================================================

impl<'a> FragmentRule<'a> {
    /// Builds a singly-charged, MS2 fragment from a formula like `$PRECURSOR-$CHAIN-H2O`
    ///
    /// The formula may only refer to fragments already in `registry`, so rules must be defined before they are used.
    /// Any fragments referred to are folded in, leaving a rule that only depends on the precursor, at most one chain,
    /// and a fixed offset of elements.
    ///
    /// # Errors
    ///
    /// Fails if the formula can't be parsed or refers to an undefined fragment, if it contains the precursor or a
    /// chain more than once, if it mixes chain types, or if the atomic database lacks hydrogen or oxygen
    pub fn new(registry: &FragmentRegistry<'a>, name: impl Into<String>, formula: impl Into<String>) -> Result<Self> {
        let (name, formula) = (name.into(), formula.into());
        let db = registry.db();
        if let Some(symbol) = REQUIRED_ELEMENTS.into_iter().find(|&s| !db.contains(s)) {
            return Err(Box::new(RulesError::MissingElement(symbol)));
        }

        let terms = final_parser(fragment_formula(registry))(&formula)?;

        let mut precursors = 0;
        let mut chains = 0;
        let mut chain_type = None;
        let mut composition = ChemicalComposition::default();
        for (offset_kind, term) in terms {
            let polarity = i32::from(offset_kind);
            match term {
                FormulaTerm::Precursor => precursors += polarity,
                FormulaTerm::Chain(new_type) => {
                    merge_chain_types(&name, &mut chain_type, new_type)?;
                    chains += polarity;
                }
                FormulaTerm::Fragment(rule) => {
                    if rule.contains_precursor {
                        precursors += polarity;
                    }
                    if let Some((rule_kind, new_type)) = rule.chain {
                        merge_chain_types(&name, &mut chain_type, new_type)?;
                        chains += polarity * i32::from(rule_kind);
                    }
                    composition += &rule.composition.scaled(polarity);
                }
                FormulaTerm::Atoms(atoms) => composition += &atoms.scaled(polarity),
            }
        }

        if !(0..=1).contains(&precursors) {
            return Err(Box::new(RulesError::PrecursorMultiplicity {
                name,
                count: precursors,
            }));
        }
        let chain = match (chains, chain_type) {
            (0, _) | (_, None) => None,
            (1, Some(chain_type)) => Some((OffsetKind::Add, chain_type)),
            (-1, Some(chain_type)) => Some((OffsetKind::Remove, chain_type)),
            (count, Some(_)) => return Err(Box::new(RulesError::ChainMultiplicity { name, count })),
        };

        Ok(Self {
            db,
            name,
            formula,
            charge: Charge::new(1),
            ms_level: 2,
            mandatory: MandatoryLevel::default(),
            contains_precursor: precursors == 1,
            chain,
            composition,
            allowed_ohs: None,
            combi_ohs: None,
        })
    }

    /// # Errors
    ///
    /// Fails if `charge` is less than one
    pub fn with_charge(self, charge: i64) -> Result<Self> {
        if charge < 1 {
            return Err(Box::new(RulesError::Charge {
                name: self.name,
                charge,
            }));
        }
        Ok(Self {
            charge: Charge::new(charge),
            ..self
        })
    }

    #[must_use]
    pub fn with_ms_level(self, ms_level: u8) -> Self {
        Self { ms_level, ..self }
    }

    #[must_use]
    pub fn with_mandatory(self, mandatory: MandatoryLevel) -> Self {
        Self { mandatory, ..self }
    }

    /// Restricts the fragment to chains with the listed OH counts, optionally overriding how mandatory it is for each
    ///
    /// # Errors
    ///
    /// Fails if a requirement names a chain type other than the one this fragment refers to
    pub fn with_allowed_ohs(self, mut allowed_ohs: HydroxyRequirements) -> Result<Self> {
        let present: BTreeSet<_> = self.chain_type().into_iter().collect();
        let rule_chain_type = RuleChainType::classify(&present);
        allowed_ohs.check_and_correct_chain_types(rule_chain_type, &present, self.chain.is_none())?;
        Ok(Self {
            allowed_ohs: Some(allowed_ohs),
            ..self
        })
    }

    /// Overrides how mandatory the fragment is depending on the OH count of the partner chain in a combination
    #[must_use]
    pub fn with_combi_ohs(self, combi_ohs: HydroxyRequirements) -> Self {
        Self {
            combi_ohs: Some(combi_ohs),
            ..self
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn formula(&self) -> &str {
        &self.formula
    }

    #[must_use]
    pub const fn charge(&self) -> Charge {
        self.charge
    }

    #[must_use]
    pub const fn ms_level(&self) -> u8 {
        self.ms_level
    }

    #[must_use]
    pub const fn mandatory(&self) -> MandatoryLevel {
        self.mandatory
    }

    #[must_use]
    pub const fn contains_precursor(&self) -> bool {
        self.contains_precursor
    }

    /// Whether this fragment adds or removes a chain, and which kind
    #[must_use]
    pub const fn chain(&self) -> Option<(OffsetKind, ChainType)> {
        self.chain
    }

    #[must_use]
    pub fn chain_type(&self) -> Option<ChainType> {
        self.chain.map(|(_, chain_type)| chain_type)
    }

    /// The elements this fragment adds or removes, on top of any precursor or chain
    #[must_use]
    pub const fn composition(&self) -> &ChemicalComposition<'a> {
        &self.composition
    }

    #[must_use]
    pub const fn allowed_ohs(&self) -> Option<&HydroxyRequirements> {
        self.allowed_ohs.as_ref()
    }

    #[must_use]
    pub const fn combi_ohs(&self) -> Option<&HydroxyRequirements> {
        self.combi_ohs.as_ref()
    }

    /// Computes the chemical formula and m/z of this fragment for a particular precursor and chain
    ///
    /// The precursor is given as the m/z of the ion, while the chain is given as a neutral mass; both the chain and
    /// the elemental offset of this rule are divided by `charge`.
    ///
    /// # Errors
    ///
    /// Fails if a formula can't be parsed, if no chain is given to a fragment that needs one, or if `charge` is less
    /// than one
    pub fn formula_and_mass(
        &self,
        precursor_formula: &str,
        precursor_mz: Decimal,
        chain_formula: Option<&str>,
        chain_mass: Decimal,
        charge: Charge,
    ) -> Result<(String, Decimal)> {
        if !charge.is_positive() {
            return Err(Box::new(RulesError::Charge {
                name: self.name.clone(),
                charge: charge.into(),
            }));
        }
        let divisor = Decimal::from(i64::from(charge));

        let mut composition = ChemicalComposition::default();
        let mut mz = Decimal::ZERO;

        if self.contains_precursor {
            composition += &ChemicalComposition::new(self.db, precursor_formula)?;
            mz += precursor_mz;
        }

        if let Some((offset_kind, _)) = self.chain {
            let chain_formula =
                chain_formula.ok_or_else(|| RulesError::NoChainProvided(self.name.clone()))?;
            let chain = ChemicalComposition::new(self.db, chain_formula)?;
            match offset_kind {
                OffsetKind::Add => {
                    composition += &chain;
                    mz += chain_mass / divisor;
                }
                OffsetKind::Remove => {
                    composition -= &chain;
                    mz -= chain_mass / divisor;
                }
            }
        }

        composition += &self.composition;
        mz += Decimal::from(self.composition.monoisotopic_mass() / charge);

        Ok((composition.to_string(), mz))
    }

    /// Like [`Self::formula_and_mass`], but at the charge declared for this fragment, and taking the chain (if any) as
    /// a [`FattyAcid`]
    ///
    /// # Errors
    ///
    /// Fails if the precursor formula can't be parsed, or if no chain is given to a fragment that needs one
    pub fn ion(
        &self,
        precursor_formula: &str,
        precursor_mz: Decimal,
        chain: Option<&FattyAcid>,
    ) -> Result<(String, Decimal)> {
        let chain_formula = chain.map(FattyAcid::formula);
        let chain_mass = chain.map_or(Decimal::ZERO, FattyAcid::mass);
        self.formula_and_mass(precursor_formula, precursor_mz, chain_formula, chain_mass, self.charge)
    }

    /// How mandatory this fragment is for a chain with `oh` hydroxylations
    #[must_use]
    pub fn is_mandatory(&self, oh: u32) -> MandatoryLevel {
        override_or(self.allowed_ohs.as_ref(), oh, self.chain_type(), self.mandatory)
    }

    /// How mandatory this fragment is when the other chain of a combination is a `chain_type` with `oh`
    /// hydroxylations
    #[must_use]
    pub fn is_mandatory_in_combi(&self, chain_type: ChainType, oh: u32) -> MandatoryLevel {
        override_or(self.combi_ohs.as_ref(), oh, Some(chain_type), self.mandatory)
    }

    /// Whether this fragment applies at all to a chain with `oh` hydroxylations
    #[must_use]
    pub fn hydroxylation_valid(&self, oh: u32) -> bool {
        self.allowed_ohs.as_ref().is_none_or(|ohs| ohs.contains_oh(oh))
    }
}

// Private Helper Functions ============================================================================================

fn merge_chain_types(name: &str, current: &mut Option<ChainType>, new: ChainType) -> Result<()> {
    match *current {
        Some(first) if first != new => Err(Box::new(RulesError::ChainTypeConflict {
            name: name.to_owned(),
            first,
            second: new,
        })),
        _ => {
            *current = Some(new);
            Ok(())
        }
    }
}

fn override_or(
    requirements: Option<&HydroxyRequirements>,
    oh: u32,
    chain_type: Option<ChainType>,
    default: MandatoryLevel,
) -> MandatoryLevel {
    requirements
        .and_then(|r| r.get(oh, chain_type))
        .map(|r| r.mandatory())
        .filter(|&level| level != MandatoryLevel::Undefined)
        .unwrap_or(default)
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use lipochem::AtomicDatabase;
    use once_cell::sync::Lazy;
    use rust_decimal_macros::dec;

    use super::*;

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);

    fn registry() -> FragmentRegistry<'static> {
        let mut registry = FragmentRegistry::new(&DB);
        let head = FragmentRule::new(&registry, "-H2O", "$PRECURSOR-H2O").unwrap();
        registry.push_head(head).unwrap();
        let chain = FragmentRule::new(&registry, "FA1", "$CHAIN").unwrap();
        registry.push_chain(chain).unwrap();
        let chain = FragmentRule::new(&registry, "NL", "$PRECURSOR-$CHAIN").unwrap();
        registry.push_chain(chain).unwrap();
        registry
    }

    #[test]
    fn precursor_minus_chain() {
        let registry = registry();
        let rule = FragmentRule::new(&registry, "-FA1", "+$PRECURSOR -FA1").unwrap();
        assert!(rule.contains_precursor());
        assert_eq!(rule.chain(), Some((OffsetKind::Remove, ChainType::Acyl)));
        assert!(rule.composition().is_empty());

        let (formula, mz) = rule
            .formula_and_mass("C40H80NO8P", dec!(750.0), Some("C16H32O2"), dec!(256.24), Charge::new(1))
            .unwrap();
        assert_eq!(formula, "C24H48NO6P");
        assert_eq!(mz, dec!(493.76));
    }

    #[test]
    fn referenced_fragments_are_folded_in() {
        let registry = registry();

        let rule = FragmentRule::new(&registry, "NL-H2O", "NL-H2O").unwrap();
        assert!(rule.contains_precursor());
        assert_eq!(rule.chain(), Some((OffsetKind::Remove, ChainType::Acyl)));
        assert_eq!(rule.composition().to_string(), "-H2O");

        // Removing a neutral loss from the precursor leaves just the chain
        let rule = FragmentRule::new(&registry, "Chain", "$PRECURSOR-NL").unwrap();
        assert!(!rule.contains_precursor());
        assert_eq!(rule.chain(), Some((OffsetKind::Add, ChainType::Acyl)));

        let rule = FragmentRule::new(&registry, "Water", "$PRECURSOR - -H2O").unwrap();
        assert!(!rule.contains_precursor());
        assert_eq!(rule.chain(), None);
        assert_eq!(rule.composition().to_string(), "H2O");
    }

    #[test]
    fn fragment_masses() {
        let registry = registry();
        let rule = FragmentRule::new(&registry, "FA-H", "$CHAIN-H").unwrap();
        let (formula, mz) = rule
            .formula_and_mass("C40H80NO8P", dec!(750.0), Some("C16H32O2"), dec!(256.24023027050), Charge::new(1))
            .unwrap();
        assert_eq!(formula, "C16H31O2");
        assert_eq!(mz, dec!(255.23240523827));

        let rule = FragmentRule::new(&registry, "Doubly", "$PRECURSOR-H2O")
            .unwrap()
            .with_charge(2)
            .unwrap();
        let (formula, mz) = rule
            .formula_and_mass("C40H80NO8P", dec!(375.0), None, Decimal::ZERO, rule.charge())
            .unwrap();
        assert_eq!(formula, "C40H78NO7P");
        assert_eq!(mz, dec!(365.994717657985));

        let rule = FragmentRule::new(&registry, "PC", "C5H15NO4P").unwrap();
        let (formula, mz) = rule
            .formula_and_mass("not even parsed", dec!(750.0), None, Decimal::ZERO, Charge::new(1))
            .unwrap();
        assert_eq!(formula, "C5H15NO4P");
        assert_eq!(mz, dec!(184.07386996458));
    }

    #[test]
    fn fragment_mass_errors() {
        let registry = registry();
        let rule = registry.get("NL").unwrap();
        assert_eq!(
            *rule
                .formula_and_mass("C40H80NO8P", dec!(750.0), None, Decimal::ZERO, Charge::new(1))
                .unwrap_err(),
            RulesError::NoChainProvided("NL".to_owned())
        );
        assert!(
            rule.formula_and_mass("C40H80NO8P", dec!(750.0), Some("C16H32O2"), dec!(256.24), Charge::new(0))
                .is_err()
        );
        assert!(
            rule.formula_and_mass("C40Xx", dec!(750.0), Some("C16H32O2"), dec!(256.24), Charge::new(1))
                .is_err()
        );
    }

    #[test]
    fn rules_must_be_defined_in_order() {
        let mut registry = registry();
        let result = FragmentRule::new(&registry, "NL2", "$PRECURSOR-FA2");
        assert!(matches!(result.map_err(|e| *e), Err(RulesError::Syntax { .. })));

        let chain = FragmentRule::new(&registry, "FA2", "$CHAIN+H").unwrap();
        registry.push_chain(chain).unwrap();
        assert!(FragmentRule::new(&registry, "NL2", "$PRECURSOR-FA2").is_ok());
    }

    #[test]
    fn construction_errors() {
        let registry = registry();
        let error = |formula| *FragmentRule::new(&registry, "X", formula).unwrap_err();
        assert_eq!(
            error("$PRECURSOR+$PRECURSOR"),
            RulesError::PrecursorMultiplicity {
                name: "X".to_owned(),
                count: 2
            }
        );
        assert_eq!(
            error("$CHAIN-NL"),
            RulesError::PrecursorMultiplicity {
                name: "X".to_owned(),
                count: -1
            }
        );
        assert_eq!(
            error("$CHAIN+FA1"),
            RulesError::ChainMultiplicity {
                name: "X".to_owned(),
                count: 2
            }
        );
        assert_eq!(
            error("$PRECURSOR-$CHAIN+$LCB"),
            RulesError::ChainTypeConflict {
                name: "X".to_owned(),
                first: ChainType::Acyl,
                second: ChainType::Lcb
            }
        );
        assert!(matches!(error("$PRECURSOR-Xy"), RulesError::Syntax { .. }));

        let rule = FragmentRule::new(&registry, "X", "$CHAIN").unwrap();
        assert_eq!(
            *rule.with_charge(0).unwrap_err(),
            RulesError::Charge {
                name: "X".to_owned(),
                charge: 0
            }
        );
    }

    #[test]
    fn missing_elements() {
        let limited = AtomicDatabase::new(
            "test.kdl",
            "elements {\n  C \"Carbon\" {\n    isotope 12 12 1\n  }\n}\n",
        )
        .unwrap();
        let registry = FragmentRegistry::new(&limited);
        assert_eq!(
            *FragmentRule::new(&registry, "FA", "$CHAIN").unwrap_err(),
            RulesError::MissingElement("H")
        );
    }

    #[test]
    fn mandatory_overrides() {
        let registry = registry();
        let rule = FragmentRule::new(&registry, "FA-H", "$CHAIN-H")
            .unwrap()
            .with_mandatory(MandatoryLevel::True)
            .with_allowed_ohs(HydroxyRequirements::new("0,1:false,2:quant").unwrap())
            .unwrap()
            .with_combi_ohs(HydroxyRequirements::new("$LCB2:false").unwrap());

        assert_eq!(rule.is_mandatory(0), MandatoryLevel::True);
        assert_eq!(rule.is_mandatory(1), MandatoryLevel::False);
        assert_eq!(rule.is_mandatory(2), MandatoryLevel::Quant);
        assert_eq!(rule.is_mandatory(3), MandatoryLevel::True);
        assert!(rule.hydroxylation_valid(2));
        assert!(!rule.hydroxylation_valid(3));

        assert_eq!(rule.is_mandatory_in_combi(ChainType::Lcb, 2), MandatoryLevel::False);
        assert_eq!(rule.is_mandatory_in_combi(ChainType::Lcb, 3), MandatoryLevel::True);
        assert_eq!(rule.is_mandatory_in_combi(ChainType::Acyl, 2), MandatoryLevel::True);

        let unrestricted = registry.get("FA1").unwrap();
        assert!(unrestricted.hydroxylation_valid(7));
        assert_eq!(unrestricted.is_mandatory(1), MandatoryLevel::Undefined);

        // Chain fragments only accept requirements for their own chain type
        let lcb_only = HydroxyRequirements::new("$LCB2").unwrap();
        assert!(unrestricted.clone().with_allowed_ohs(lcb_only).is_err());
    }
}
