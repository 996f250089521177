// Standard Library Imports
use std::{
    cmp::Reverse,
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
};

// External Crate Imports
use indexmap::IndexMap;
use itertools::Itertools;
use nom_miette::final_parser;

// Local Crate Imports
use crate::{
    ChainType, Comparison, EncodingError, Evidence, Expression, FattyAcid, FragmentMult, FragmentRegistry,
    HydroxyRequirements, IntensityRule, MandatoryLevel, PositionContext, Result, RuleChainType, RuleContext,
    RuleSection, RulesError,
    parsers::equation::equation,
};

// Public API ==========================================================================================================

impl IntensityRule {
    /// Parses an equation like `FA1 > 0.5*(PC-H2O + $BASEPEAK)`, normalising `<` equations so that the bigger side
    /// always comes first
    ///
    /// # Errors
    ///
    /// Fails if the equation doesn't contain exactly one comparison, can't be parsed, refers to undefined fragments, or
    /// breaks the rules of its `section`
    pub fn new(
        registry: &FragmentRegistry,
        section: RuleSection,
        equation_text: impl Into<String>,
        mandatory: bool,
    ) -> Result<Self> {
        let equation_text = equation_text.into();
        let greater = equation_text.matches('>').count();
        let less = equation_text.matches('<').count();
        if greater > 0 && less > 0 {
            return Err(Box::new(RulesError::MixedComparison(equation_text)));
        }
        if greater + less != 1 {
            return Err(Box::new(RulesError::ComparisonCount(equation_text)));
        }

        let (left, written, right) = final_parser(equation(registry))(&equation_text)?;
        let (bigger, smaller) = match written {
            Comparison::Greater => (left, right),
            Comparison::Less => (right, left),
        };

        match section {
            RuleSection::Head => {
                let chain_fragment = bigger
                    .fragments()
                    .iter()
                    .chain(smaller.fragments())
                    .find(|f| f.chain_type().is_some());
                if let Some(fragment) = chain_fragment {
                    return Err(Box::new(RulesError::HeadRuleWithChain {
                        fragment: fragment.fragment_name().to_owned(),
                    }));
                }
            }
            RuleSection::Chains => (),
            RuleSection::Position => {
                let bigger_position = side_position(&bigger)?;
                let smaller_position = side_position(&smaller)?;
                if let (Some(b), Some(s)) = (bigger_position, smaller_position)
                    && b == s
                {
                    return Err(Box::new(RulesError::SamePosition(b)));
                }
            }
        }

        let chain_types: BTreeSet<_> = bigger.chain_types().chain(smaller.chain_types()).collect();
        Ok(Self {
            section,
            equation: equation_text,
            mandatory,
            bigger,
            smaller,
            chain_type: RuleChainType::classify(&chain_types),
            written,
            hydroxy: None,
            context: RuleContext::Base,
        })
    }

    /// Restricts the rule to chains with the listed OH counts
    ///
    /// # Errors
    ///
    /// Fails if the chain types named by the requirements don't fit the chains this rule refers to
    pub fn with_hydroxy(self, mut hydroxy: HydroxyRequirements) -> Result<Self> {
        let present = self.chain_types();
        let is_head = self.section == RuleSection::Head;
        hydroxy.check_and_correct_chain_types(self.chain_type, &present, is_head)?;
        Ok(Self {
            hydroxy: Some(hydroxy),
            ..self
        })
    }

    #[must_use]
    pub const fn section(&self) -> RuleSection {
        self.section
    }

    /// The equation as it was written
    #[must_use]
    pub fn equation(&self) -> &str {
        &self.equation
    }

    #[must_use]
    pub const fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    #[must_use]
    pub const fn bigger(&self) -> &Expression {
        &self.bigger
    }

    #[must_use]
    pub const fn smaller(&self) -> &Expression {
        &self.smaller
    }

    #[must_use]
    pub const fn chain_type(&self) -> RuleChainType {
        self.chain_type
    }

    /// Which way round the comparison was written, before normalisation
    #[must_use]
    pub const fn written(&self) -> Comparison {
        self.written
    }

    #[must_use]
    pub const fn hydroxy(&self) -> Option<&HydroxyRequirements> {
        self.hydroxy.as_ref()
    }

    #[must_use]
    pub const fn context(&self) -> &RuleContext {
        &self.context
    }

    /// Every chain type referred to by either side
    #[must_use]
    pub fn chain_types(&self) -> BTreeSet<ChainType> {
        self.bigger.chain_types().chain(self.smaller.chain_types()).collect()
    }

    /// The position of the chain fragments on the bigger side of a position rule
    #[must_use]
    pub fn bigger_position(&self) -> Option<usize> {
        chain_position(&self.bigger)
    }

    /// The position of the chain fragments on the smaller side of a position rule
    #[must_use]
    pub fn smaller_position(&self) -> Option<usize> {
        chain_position(&self.smaller)
    }

    /// Whether this rule applies to a chain of `chain_type` with `oh` hydroxylations
    ///
    /// Chain types that none of the OH requirements concern are never excluded.
    #[must_use]
    pub fn hydroxylation_valid(&self, chain_type: ChainType, oh: u32) -> bool {
        self.hydroxy.as_ref().is_none_or(|h| {
            let concerned = h.iter().any(|r| r.chain_type().is_none_or(|t| t == chain_type));
            !concerned || h.get(oh, Some(chain_type)).is_some()
        })
    }

    /// Whether this rule must be fulfilled for a chain of `chain_type` with `oh` hydroxylations, taking any
    /// OH-specific override into account
    #[must_use]
    pub fn is_mandatory_for(&self, chain_type: ChainType, oh: u32) -> bool {
        self.hydroxy
            .as_ref()
            .and_then(|h| h.get(oh, Some(chain_type)))
            .map(|r| r.mandatory())
            .filter(|&level| level != MandatoryLevel::Undefined)
            .map_or(self.mandatory, MandatoryLevel::is_required)
    }

    // Evaluation ------------------------------------------------------------------------------------------------------

    /// Whether the bigger side is strictly bigger than the smaller side
    #[must_use]
    pub fn is_fulfilled(&self, found: &Evidence, base_peak: Option<f64>) -> bool {
        self.bigger.evaluate(found, base_peak) > self.smaller.evaluate(found, base_peak)
    }

    /// Like [`Self::is_fulfilled`], but with evidence split over two pools
    ///
    /// Each side is evaluated against `found1` if any of its positive fragments were found there, and against
    /// `found2` otherwise.
    #[must_use]
    pub fn is_fulfilled_across(&self, found1: &Evidence, found2: &Evidence, base_peak: Option<f64>) -> bool {
        let pool = |side: &Expression| {
            if side.found_positive_in(found1) {
                found1
            } else {
                found2
            }
        };
        let bigger = self.bigger.evaluate(pool(&self.bigger), base_peak);
        let smaller = self.smaller.evaluate(pool(&self.smaller), base_peak);
        bigger > smaller
    }

    /// Whether both sides refer to something that was found, without which the rule can't be evaluated at all
    #[must_use]
    pub fn enough_fragments_found(&self, found: &Evidence) -> bool {
        self.bigger.enough_fragments_found(found) && self.smaller.enough_fragments_found(found)
    }

    #[must_use]
    pub fn enough_fragments_found_across(&self, found1: &Evidence, found2: &Evidence) -> bool {
        let enough = |side: &Expression| side.enough_fragments_found(found1) || side.enough_fragments_found(found2);
        enough(&self.bigger) && enough(&self.smaller)
    }

    // Instantiation ---------------------------------------------------------------------------------------------------

    /// Binds the chain fragments of this rule to chains, preferring `bigger_fa` whenever its type fits
    ///
    /// Rules of a single chain type are bound to one chain by passing it twice.
    #[must_use]
    pub fn with_chains(&self, bigger_fa: &FattyAcid, smaller_fa: &FattyAcid) -> Self {
        let chain_for = |fragment: &FragmentMult| {
            let chain_type = fragment.chain_type()?;
            [bigger_fa, smaller_fa].into_iter().find(|fa| fa.chain_type() == chain_type)
        };
        Self {
            bigger: self.bigger.instantiate(chain_for),
            smaller: self.smaller.instantiate(chain_for),
            context: RuleContext::Chain {
                bigger_fa: bigger_fa.clone(),
                smaller_fa: smaller_fa.clone(),
            },
            ..self.clone()
        }
    }

    /// Binds the bigger side of a position rule to `bigger_fa` and the smaller side to `smaller_fa`
    ///
    /// A side is marked as missed when none of its positive fragments appear in `found`, in which case the rule says
    /// nothing about the position of that side's chain.
    #[must_use]
    pub fn with_positions(&self, bigger_fa: &FattyAcid, smaller_fa: &FattyAcid, found: &Evidence) -> Self {
        let bigger = self.bigger.instantiate(|_| Some(bigger_fa));
        let smaller = self.smaller.instantiate(|_| Some(smaller_fa));
        let context = PositionContext {
            bigger_chains: side_chains(&self.bigger, bigger_fa),
            smaller_chains: side_chains(&self.smaller, smaller_fa),
            has_oh_info: bigger_fa.oh_number() > 0 || smaller_fa.oh_number() > 0,
            negated: false,
            derived_position: None,
            bigger_only_missed: !bigger.found_positive_in(found),
            smaller_only_missed: !smaller.found_positive_in(found),
        };
        Self {
            bigger,
            smaller,
            context: RuleContext::Position(context),
            ..self.clone()
        }
    }

    /// Records that `chain` was placed at `position` by elimination, after this rule failed to place it directly
    #[must_use]
    pub fn negated(&self, chain: &FattyAcid, position: usize) -> Self {
        let context = PositionContext {
            bigger_chains: side_chains(&self.bigger, chain),
            smaller_chains: IndexMap::new(),
            has_oh_info: chain.oh_number() > 0,
            negated: true,
            derived_position: Some(position),
            bigger_only_missed: false,
            smaller_only_missed: false,
        };
        Self {
            bigger: self.bigger.instantiate(|_| Some(chain)),
            context: RuleContext::Position(context),
            ..self.clone()
        }
    }

    /// The position this rule assigns to `fa`, if any
    #[must_use]
    pub fn position_by_fa(&self, fa: &FattyAcid) -> Option<usize> {
        let RuleContext::Position(context) = &self.context else {
            return None;
        };
        if context.negated {
            return context.derived_position;
        }
        if !context.bigger_only_missed && context.bigger_chains.values().any(|c| c == fa) {
            self.bigger_position()
        } else if !context.smaller_only_missed && context.smaller_chains.values().any(|c| c == fa) {
            self.smaller_position()
        } else {
            None
        }
    }

    // Readable Form ---------------------------------------------------------------------------------------------------

    /// The equation as it was written, with any bound chains after their fragments, like `FA1(16:0)[1] < FA1(18:1)[2]`
    #[must_use]
    pub fn readable(&self) -> String {
        let Some(split) = self.equation.find(['>', '<']) else {
            return self.equation.clone();
        };
        let (left, right) = match self.written {
            Comparison::Greater => (&self.bigger, &self.smaller),
            Comparison::Less => (&self.smaller, &self.bigger),
        };
        let (left_text, rest) = self.equation.split_at(split);
        let (operator, right_text) = rest.split_at(1);
        format!(
            "{}{operator}{}",
            bind_chains(left_text, left),
            bind_chains(right_text, right)
        )
    }

    /// Recovers the fragments and chains from the [readable form](Self::readable) of a rule
    ///
    /// Fragment names are tried longest first, so that a name is never matched inside of a longer one.
    ///
    /// # Errors
    ///
    /// Fails if a fragment's chain isn't closed by a parenthesis, or can't be decoded
    pub fn fatty_acids_from_readable(
        readable: &str,
        registry: &FragmentRegistry,
    ) -> Result<Vec<(String, FattyAcid)>, EncodingError> {
        let names: Vec<_> = registry
            .names_longest_first()
            .into_iter()
            .filter(|name| registry.is_chain_fragment(name))
            .collect();

        let mut chains = Vec::new();
        let mut rest = readable;
        while let Some(c) = rest.chars().next() {
            let matched = names.iter().find_map(|&name| Some((name, rest.strip_prefix(name)?.strip_prefix('(')?)));
            let Some((name, after_paren)) = matched else {
                rest = &rest[c.len_utf8()..];
                continue;
            };
            let (id, after_chain) = after_paren.split_once(')').ok_or_else(|| EncodingError::MissingChain {
                fragment: name.to_owned(),
            })?;
            let chain_type = registry
                .get(name)
                .and_then(|rule| rule.chain_type())
                .ok_or_else(|| EncodingError::MissingChain {
                    fragment: name.to_owned(),
                })?;
            chains.push((name.to_owned(), FattyAcid::decode(registry.db(), id, chain_type)?));
            rest = after_chain;
        }
        Ok(chains)
    }
}

impl PositionContext {
    /// The chains bound to the bigger side, keyed by fragment name
    #[must_use]
    pub const fn bigger_chains(&self) -> &IndexMap<String, FattyAcid> {
        &self.bigger_chains
    }

    #[must_use]
    pub const fn smaller_chains(&self) -> &IndexMap<String, FattyAcid> {
        &self.smaller_chains
    }

    #[must_use]
    pub const fn has_oh_info(&self) -> bool {
        self.has_oh_info
    }

    /// Whether the position was derived by elimination rather than by this rule being fulfilled
    #[must_use]
    pub const fn is_negated(&self) -> bool {
        self.negated
    }

    #[must_use]
    pub const fn derived_position(&self) -> Option<usize> {
        self.derived_position
    }

    #[must_use]
    pub const fn bigger_only_missed(&self) -> bool {
        self.bigger_only_missed
    }

    #[must_use]
    pub const fn smaller_only_missed(&self) -> bool {
        self.smaller_only_missed
    }

    /// Every distinct chain bound by this context
    pub fn chains(&self) -> impl Iterator<Item = &FattyAcid> {
        let mut seen = Vec::new();
        self.bigger_chains.values().chain(self.smaller_chains.values()).filter(move |&fa| {
            let new = !seen.contains(&fa);
            if new {
                seen.push(fa);
            }
            new
        })
    }
}

impl Display for IntensityRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} > {}", self.bigger, self.smaller)
    }
}

// Private Helper Functions ============================================================================================

fn chain_position(side: &Expression) -> Option<usize> {
    side.fragments()
        .iter()
        .find(|f| f.chain_type().is_some())
        .and_then(FragmentMult::position)
}

/// Checks that every chain fragment on one side of a position rule carries the same position
fn side_position(side: &Expression) -> Result<Option<usize>> {
    let mut position = None;
    for fragment in side.fragments().iter().filter(|f| f.chain_type().is_some()) {
        let Some(current) = fragment.position() else {
            return Err(Box::new(RulesError::MissingPosition {
                fragment: fragment.fragment_name().to_owned(),
            }));
        };
        match position {
            Some(previous) if previous != current => {
                return Err(Box::new(RulesError::MixedPositions(previous, current)));
            }
            _ => position = Some(current),
        }
    }
    Ok(position)
}

/// Rewrites the fragment names in `text` to the chain-bound names used by `side`, trying longer names first
fn bind_chains(text: &str, side: &Expression) -> String {
    let names: Vec<_> = side
        .fragments()
        .iter()
        .map(|f| {
            let key = f.fragment_name();
            let name = match f.chain_type() {
                Some(_) => key.split_once('(').map_or(key, |(name, _)| name),
                None => key,
            };
            (name, key)
        })
        .sorted_by_key(|&(name, _)| Reverse(name.len()))
        .collect();

    let mut bound = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if let Some(&(name, key)) = names.iter().find(|(name, _)| rest.starts_with(name)) {
            bound.push_str(key);
            rest = &rest[name.len()..];
        } else {
            bound.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    bound
}

fn side_chains(side: &Expression, fa: &FattyAcid) -> IndexMap<String, FattyAcid> {
    side.fragments()
        .iter()
        .filter(|f| f.chain_type().is_some())
        .map(|f| (f.fragment_name().to_owned(), fa.clone()))
        .collect()
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use lipochem::AtomicDatabase;
    use once_cell::sync::Lazy;

    use super::*;
    use crate::{FoundFragment, FragmentRule};

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);

    static REGISTRY: Lazy<FragmentRegistry> = Lazy::new(|| {
        let mut registry = FragmentRegistry::new(&DB);
        for (name, formula) in [("PC", "C5H15NO4P"), ("-Me", "$PRECURSOR-CH3")] {
            let rule = FragmentRule::new(&registry, name, formula).unwrap();
            registry.push_head(rule).unwrap();
        }
        for (name, formula) in [
            ("FA16:0", "$CHAIN"),
            ("FA16:0a", "$CHAIN-H2O"),
            ("-FA", "$PRECURSOR-$CHAIN"),
            ("LCB", "$LCB-H2O"),
        ] {
            let rule = FragmentRule::new(&registry, name, formula).unwrap();
            registry.push_chain(rule).unwrap();
        }
        registry
    });

    fn rule(section: RuleSection, equation: &str) -> IntensityRule {
        IntensityRule::new(&REGISTRY, section, equation, false).unwrap()
    }

    fn chain(id: &str) -> FattyAcid {
        FattyAcid::decode(&DB, id, ChainType::Acyl).unwrap()
    }

    fn evidence(areas: &[(&str, f64)]) -> Evidence {
        areas
            .iter()
            .map(|&(name, area)| (name.to_owned(), FoundFragment::new(area, 100.0, 2)))
            .collect()
    }

    #[test]
    fn normalised_comparisons() {
        let rule = rule(RuleSection::Head, "PC < 0.5*-Me");
        assert_eq!(rule.written(), Comparison::Less);
        assert_snapshot!(rule, @"-Me*0.5 > PC");
        assert_eq!(rule.readable(), "PC < 0.5*-Me");
        assert_eq!(rule.chain_type(), RuleChainType::NoChain);
    }

    #[test]
    fn strict_comparison() {
        let rule = rule(RuleSection::Head, "PC > -Me");
        let found = evidence(&[("PC", 10.0), ("-Me", 10.0)]);
        assert!(rule.enough_fragments_found(&found));
        assert!(!rule.is_fulfilled(&found, None));
        let found = evidence(&[("PC", 10.5), ("-Me", 10.0)]);
        assert!(rule.is_fulfilled(&found, None));
        assert!(!rule.enough_fragments_found(&evidence(&[("PC", 1.0)])));
    }

    #[test]
    fn two_pools() {
        let rule = rule(RuleSection::Chains, "FA16:0 > 0.1*PC").with_chains(&chain("16:0"), &chain("16:0"));
        let head = evidence(&[("PC", 100.0)]);
        let chains = evidence(&[("FA16:0(16:0)", 20.0)]);
        assert!(rule.enough_fragments_found_across(&chains, &head));
        assert!(rule.is_fulfilled_across(&chains, &head, None));
        assert!(!rule.enough_fragments_found(&chains));
        let weak = evidence(&[("FA16:0(16:0)", 5.0)]);
        assert!(!rule.is_fulfilled_across(&weak, &head, None));
    }

    #[test]
    fn comparison_errors() {
        let new = |section, equation| *IntensityRule::new(&REGISTRY, section, equation, true).unwrap_err();
        assert_eq!(
            new(RuleSection::Head, "PC > -Me > $BASEPEAK"),
            RulesError::ComparisonCount("PC > -Me > $BASEPEAK".to_owned())
        );
        assert_eq!(new(RuleSection::Head, "PC"), RulesError::ComparisonCount("PC".to_owned()));
        assert_eq!(
            new(RuleSection::Head, "PC > -Me < $BASEPEAK"),
            RulesError::MixedComparison("PC > -Me < $BASEPEAK".to_owned())
        );
        assert!(matches!(new(RuleSection::Head, "PC > PE"), RulesError::Syntax { .. }));
        assert_eq!(
            new(RuleSection::Head, "PC > FA16:0"),
            RulesError::HeadRuleWithChain {
                fragment: "FA16:0".to_owned()
            }
        );
    }

    #[test]
    fn position_rule_checks() {
        let new = |equation| *IntensityRule::new(&REGISTRY, RuleSection::Position, equation, false).unwrap_err();
        assert_eq!(
            new("-FA[1] > -FA"),
            RulesError::MissingPosition {
                fragment: "-FA".to_owned()
            }
        );
        assert_eq!(new("-FA[1] + FA16:0[2] > -FA[2]"), RulesError::MixedPositions(1, 2));
        assert_eq!(new("-FA[2] > 2*FA16:0a[2]"), RulesError::SamePosition(2));

        let rule = rule(RuleSection::Position, "-FA[2] > 0.5*(FA16:0a[1] + PC)");
        assert_eq!(rule.bigger_position(), Some(2));
        assert_eq!(rule.smaller_position(), Some(1));
    }

    #[test]
    fn mixed_chain_types() {
        let lcb_rule = rule(RuleSection::Chains, "LCB > FA16:0");
        assert_eq!(lcb_rule.chain_type(), RuleChainType::DiffChainTypes);
        let with_oh = lcb_rule
            .clone()
            .with_hydroxy(HydroxyRequirements::new("2:true").unwrap())
            .unwrap();
        let corrected = with_oh.hydroxy().unwrap().get(2, Some(ChainType::Lcb));
        assert!(corrected.is_some());
        assert!(with_oh.is_mandatory_for(ChainType::Lcb, 2));
        assert!(!with_oh.is_mandatory_for(ChainType::Acyl, 0));
        assert!(!with_oh.hydroxylation_valid(ChainType::Lcb, 3));
        assert!(with_oh.hydroxylation_valid(ChainType::Acyl, 0));

        let lcb = FattyAcid::decode(&DB, "18:1;O2", ChainType::Lcb).unwrap();
        let instantiated = lcb_rule.with_chains(&lcb, &chain("16:0"));
        assert_snapshot!(instantiated, @"LCB(18:1;O2) > FA16:0(16:0)");
        assert_eq!(instantiated.readable(), "LCB(18:1;O2) > FA16:0(16:0)");

        let error = rule(RuleSection::Chains, "FA16:0a > FA16:0")
            .with_hydroxy(HydroxyRequirements::new("$LCB1").unwrap())
            .unwrap_err();
        assert_eq!(
            *error,
            RulesError::HydroxyChainTypeMismatch {
                oh: 1,
                requested: ChainType::Lcb,
                actual: ChainType::Acyl
            }
        );
    }

    #[test]
    fn readable_round_trip() {
        let rule = rule(RuleSection::Position, "FA16:0a[1] > FA16:0[2]");
        let found = evidence(&[("FA16:0a(16:0)", 10.0), ("FA16:0(18:1)", 2.0)]);
        let instantiated = rule.with_positions(&chain("16:0"), &chain("18:1"), &found);
        let readable = instantiated.readable();
        assert_snapshot!(readable, @"FA16:0a(16:0)[1] > FA16:0(18:1)[2]");

        let chains = IntensityRule::fatty_acids_from_readable(&readable, &REGISTRY).unwrap();
        let chains: Vec<_> = chains.iter().map(|(name, fa)| format!("{name} {fa}")).collect();
        assert_eq!(chains, vec!["FA16:0a 16:0", "FA16:0 18:1"]);

        // Longer names are bound before the names they start with, on whichever side they were written
        let equation = "FA16:0 < 2*FA16:0a - 0.5*PC";
        let rule = IntensityRule::new(&REGISTRY, RuleSection::Chains, equation, false).unwrap();
        let instantiated = rule.with_chains(&chain("18:1"), &chain("18:1"));
        let readable = instantiated.readable();
        assert_snapshot!(readable, @"FA16:0(18:1) < 2*FA16:0a(18:1) - 0.5*PC");
        let chains = IntensityRule::fatty_acids_from_readable(&readable, &REGISTRY).unwrap();
        assert_eq!(chains.len(), 2);
        assert!(chains.iter().all(|(_, fa)| fa.to_string() == "18:1"));

        let error = IntensityRule::fatty_acids_from_readable("FA16:0(16:0", &REGISTRY).unwrap_err();
        assert_eq!(
            error,
            EncodingError::MissingChain {
                fragment: "FA16:0".to_owned()
            }
        );
        let error = IntensityRule::fatty_acids_from_readable("FA16:0(16-0)", &REGISTRY).unwrap_err();
        assert!(matches!(error, EncodingError::Malformed(_)));
    }

    #[test]
    fn positions_by_fatty_acid() {
        let rule = rule(RuleSection::Position, "-FA[1] > -FA[2]");
        let (palmitate, oleate) = (chain("16:0"), chain("18:1"));
        let found = evidence(&[("-FA(16:0)", 10.0), ("-FA(18:1)", 2.0)]);
        let instantiated = rule.with_positions(&palmitate, &oleate, &found);
        assert!(instantiated.is_fulfilled(&found, None));
        assert_eq!(instantiated.position_by_fa(&palmitate), Some(1));
        assert_eq!(instantiated.position_by_fa(&oleate), Some(2));
        assert_eq!(instantiated.position_by_fa(&chain("18:0")), None);

        // Missed sides say nothing about where their chain sits
        let found = evidence(&[("-FA(16:0)", 10.0)]);
        let instantiated = rule.with_positions(&palmitate, &oleate, &found);
        let RuleContext::Position(context) = instantiated.context() else {
            panic!("expected a position context");
        };
        assert!(context.smaller_only_missed());
        assert!(!context.bigger_only_missed());
        assert_eq!(instantiated.position_by_fa(&palmitate), Some(1));
        assert_eq!(instantiated.position_by_fa(&oleate), None);

        // Eliminated positions are returned unconditionally
        let negated = rule.negated(&oleate, 2);
        assert_eq!(negated.position_by_fa(&oleate), Some(2));
        assert_eq!(negated.position_by_fa(&palmitate), Some(2));

        assert_eq!(rule.position_by_fa(&palmitate), None);
    }
}
