// Standard Library Imports
use std::fmt::{self, Display, Formatter};

// External Crate Imports
use itertools::Itertools;
use tracing::debug;

// Local Crate Imports
use crate::{
    Annotation, ChainType, DiscoveryStatus, Evidence, FattyAcid, FoundFragment, FragmentRule, IntensityRule,
    MandatoryLevel, Rejection, RuleChainType, RuleContext, RuleSet, SpectrumEvidence,
    expression::chain_fragment_key,
    position::{last_unassigned, merge_positions},
};

// Public API ==========================================================================================================

impl FoundFragment {
    #[must_use]
    pub const fn new(area: f64, mz: f64, ms_level: u8) -> Self {
        Self {
            area,
            mz,
            ms_level,
            from_other_species: false,
        }
    }

    /// Marks the fragment as observed in the spectrum of a co-eluting species
    #[must_use]
    pub const fn from_other_species(self) -> Self {
        Self {
            from_other_species: true,
            ..self
        }
    }

    #[must_use]
    pub const fn area(&self) -> f64 {
        self.area
    }

    #[must_use]
    pub const fn mz(&self) -> f64 {
        self.mz
    }

    #[must_use]
    pub const fn ms_level(&self) -> u8 {
        self.ms_level
    }

    #[must_use]
    pub const fn is_from_other_species(&self) -> bool {
        self.from_other_species
    }
}

impl SpectrumEvidence {
    #[must_use]
    pub fn new(base_peak: Option<f64>) -> Self {
        Self {
            base_peak,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_head_fragment(mut self, name: impl Into<String>, found: FoundFragment) -> Self {
        self.head.insert(name.into(), found);
        self
    }

    /// Records a chain fragment under the `NAME(chain)` key that chain rules look it up by
    #[must_use]
    pub fn with_chain_fragment(mut self, name: &str, chain: &FattyAcid, found: FoundFragment) -> Self {
        self.chains.insert(chain_fragment_key(name, chain), found);
        self
    }

    #[must_use]
    pub const fn head(&self) -> &Evidence {
        &self.head
    }

    #[must_use]
    pub const fn chains(&self) -> &Evidence {
        &self.chains
    }

    #[must_use]
    pub const fn base_peak(&self) -> Option<f64> {
        self.base_peak
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.chains.is_empty()
    }
}

impl Annotation {
    #[must_use]
    pub const fn status(&self) -> DiscoveryStatus {
        self.status
    }

    #[must_use]
    pub fn chains(&self) -> &[FattyAcid] {
        &self.chains
    }

    /// For every backbone slot, the index of the chain placed there
    #[must_use]
    pub fn positions(&self) -> &[Option<usize>] {
        &self.positions
    }

    /// Names the chain combination like `16:0/18:1` once any position is known, using `-` for unknown slots, and
    /// like `16:0_18:1` otherwise
    #[must_use]
    pub fn name(&self) -> String {
        if self.positions.iter().any(Option::is_some) {
            self.positions
                .iter()
                .map(|slot| {
                    slot.and_then(|i| self.chains.get(i))
                        .map_or_else(|| "-".to_owned(), ToString::to_string)
                })
                .join("/")
        } else {
            self.chains.iter().sorted().join("_")
        }
    }
}

impl Display for Annotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.status)
    }
}

impl RuleSet<'_> {
    /// Checks one chain combination against every rule of the set, working out how much of the lipid's structure
    /// the evidence reveals
    ///
    /// # Errors
    ///
    /// Rejects the combination if it has the wrong number of chains, if a mandatory fragment is missing, or if an
    /// intensity rule is violated
    pub fn annotate(&self, evidence: &SpectrumEvidence, combination: &[FattyAcid]) -> Result<Annotation, Rejection> {
        let expected = self.settings().amount_of_chains();
        if combination.len() != expected {
            return Err(Rejection::ChainCount {
                expected,
                found: combination.len(),
            });
        }

        let mut annotation = Annotation {
            status: DiscoveryStatus::NoMsnPresent,
            chains: combination.to_vec(),
            positions: vec![None; combination.len()],
        };
        if evidence.is_empty() {
            debug!("no MSn evidence to annotate");
            return Ok(annotation);
        }

        self.check_head(evidence)?;
        annotation.status.elevate(DiscoveryStatus::HeadGroupDetected);

        let chains: Vec<_> = combination.iter().unique().collect();
        if self.check_chains(evidence, &chains)? {
            annotation.status.elevate(DiscoveryStatus::FragmentsDetected);
            annotation.positions = self.assign_positions(evidence, combination, &chains);
            if annotation.positions.iter().any(Option::is_some) {
                annotation.status.elevate(DiscoveryStatus::PositionDetected);
            }
        }

        debug!(name = %annotation.name(), status = %annotation.status, "annotated chain combination");
        Ok(annotation)
    }
}

// Private Methods =====================================================================================================

impl RuleSet<'_> {
    fn check_head(&self, evidence: &SpectrumEvidence) -> Result<(), Rejection> {
        for fragment in self.registry().head_fragments() {
            let level = fragment.mandatory();
            if level.is_required() && !observed(evidence.head(), fragment.name(), fragment, level) {
                return Err(Rejection::MissingFragment {
                    fragment: fragment.name().to_owned(),
                });
            }
        }

        for rule in self.head_rules() {
            let evaluable = rule.enough_fragments_found(evidence.head());
            verdict(rule, rule.is_mandatory(), evaluable, || {
                rule.is_fulfilled(evidence.head(), evidence.base_peak())
            })?;
        }

        debug!("head group detected");
        Ok(())
    }

    /// Returns whether every chain had at least one of its fragments found
    fn check_chains(&self, evidence: &SpectrumEvidence, chains: &[&FattyAcid]) -> Result<bool, Rejection> {
        let mut all_detected = true;
        for &chain in chains {
            let (chain_type, oh) = (chain.chain_type(), chain.oh_number());
            let partner = chains.iter().find(|c| c.chain_type() != chain_type);

            let mut detected = false;
            for fragment in self
                .registry()
                .chain_fragments()
                .filter(|f| f.chain_type() == Some(chain_type) && f.hydroxylation_valid(oh))
            {
                let level = match partner {
                    Some(partner) if fragment.combi_ohs().is_some() => {
                        fragment.is_mandatory_in_combi(partner.chain_type(), partner.oh_number())
                    }
                    _ => fragment.is_mandatory(oh),
                };
                let key = chain_fragment_key(fragment.name(), chain);
                if observed(evidence.chains(), &key, fragment, level) {
                    detected = true;
                } else if level.is_required() {
                    return Err(Rejection::MissingChainFragment {
                        fragment: fragment.name().to_owned(),
                        chain: chain.to_string(),
                    });
                }
            }
            debug!(%chain, detected, "checked chain fragments");
            all_detected &= detected;
        }

        for rule in self.chain_rules() {
            for (instance, mandatory) in chain_rule_instances(rule, chains) {
                let evaluable = instance.enough_fragments_found_across(evidence.chains(), evidence.head());
                verdict(&instance, mandatory, evaluable, || {
                    instance.is_fulfilled_across(evidence.chains(), evidence.head(), evidence.base_peak())
                })?;
            }
        }

        Ok(all_detected)
    }

    fn assign_positions(
        &self,
        evidence: &SpectrumEvidence,
        combination: &[FattyAcid],
        chains: &[&FattyAcid],
    ) -> Vec<Option<usize>> {
        let found = evidence.chains();
        let mut fulfilled = Vec::new();
        let mut failed = Vec::new();
        for rule in self.position_rules() {
            let bigger_type = rule.bigger().chain_types().next();
            let smaller_type = rule.smaller().chain_types().next();
            let fits = |fa: &FattyAcid, chain_type: Option<ChainType>| {
                chain_type.is_none_or(|t| t == fa.chain_type())
                    && rule.hydroxylation_valid(fa.chain_type(), fa.oh_number())
            };

            for (&bigger_fa, &smaller_fa) in chains.iter().cartesian_product(chains) {
                if bigger_fa == smaller_fa || !fits(bigger_fa, bigger_type) || !fits(smaller_fa, smaller_type) {
                    continue;
                }
                let instance = rule.with_positions(bigger_fa, smaller_fa, found);
                if !instance.bigger().found_positive_in(found) && !instance.smaller().found_positive_in(found) {
                    continue;
                }
                if instance.is_fulfilled(found, evidence.base_peak()) {
                    debug!(rule = %instance, "position rule fulfilled");
                    fulfilled.push(instance);
                } else if instance.enough_fragments_found(found) {
                    debug!(rule = %instance, "position rule not fulfilled");
                    failed.push(instance);
                } else {
                    debug!(rule = %instance, "position rule can't be evaluated");
                }
            }
        }

        let mut positions = merge_positions(combination, &fulfilled);
        if let Some((slot, index)) = last_unassigned(&positions)
            && let Some(chain) = combination.get(index)
            && let Some(refuted) = failed.iter().find(|rule| involves(rule, chain))
        {
            debug!(%chain, position = slot + 1, "chain position assigned by elimination");
            fulfilled.push(refuted.negated(chain, slot + 1));
            positions = merge_positions(combination, &fulfilled);
        }
        positions
    }
}

// Private Helper Functions ============================================================================================

/// Whether `key` was found at the MS level of `fragment`, where fragments from other species only count for
/// fragments that allow them
fn observed(found: &Evidence, key: &str, fragment: &FragmentRule, level: MandatoryLevel) -> bool {
    found.get(key).is_some_and(|f| {
        f.ms_level == fragment.ms_level() && (!f.from_other_species || level == MandatoryLevel::OtherSpecies)
    })
}

/// Mandatory rules must be evaluable, and every evaluable rule must be fulfilled
fn verdict(
    rule: &IntensityRule,
    mandatory: bool,
    evaluable: bool,
    fulfilled: impl FnOnce() -> bool,
) -> Result<(), Rejection> {
    if !evaluable {
        debug!(%rule, mandatory, "intensity rule can't be evaluated");
        return if mandatory {
            Err(Rejection::RuleNotEvaluable { rule: rule.readable() })
        } else {
            Ok(())
        };
    }
    if fulfilled() {
        debug!(%rule, "intensity rule fulfilled");
        Ok(())
    } else {
        Err(Rejection::RuleNotFulfilled { rule: rule.readable() })
    }
}

/// Binds a chain rule to each chain it applies to, or to each pair of chains for rules mixing chain types, along with
/// whether the rule is mandatory for them
///
/// Pairs are ordered so that the chain of the higher type comes first, which is also the chain whose OH count decides
/// whether the rule is mandatory.
fn chain_rule_instances(rule: &IntensityRule, chains: &[&FattyAcid]) -> Vec<(IntensityRule, bool)> {
    let applies = |fa: &FattyAcid| rule.hydroxylation_valid(fa.chain_type(), fa.oh_number());
    match rule.chain_type() {
        RuleChainType::NoChain => vec![(rule.clone(), rule.is_mandatory())],
        RuleChainType::Single(chain_type) => chains
            .iter()
            .filter(|&&fa| fa.chain_type() == chain_type && applies(fa))
            .map(|&fa| (rule.with_chains(fa, fa), rule.is_mandatory_for(chain_type, fa.oh_number())))
            .collect(),
        RuleChainType::DiffChainTypes => {
            let types = rule.chain_types();
            chains
                .iter()
                .cartesian_product(chains)
                .filter(|&(&a, &b)| {
                    a.chain_type() > b.chain_type()
                        && types.contains(&a.chain_type())
                        && types.contains(&b.chain_type())
                        && applies(a)
                        && applies(b)
                })
                .map(|(&a, &b)| (rule.with_chains(a, b), rule.is_mandatory_for(a.chain_type(), a.oh_number())))
                .collect()
        }
    }
}

fn involves(rule: &IntensityRule, chain: &FattyAcid) -> bool {
    matches!(rule.context(), RuleContext::Position(context) if context.chains().any(|fa| fa == chain))
}

// Module Tests ========================================================================================================
