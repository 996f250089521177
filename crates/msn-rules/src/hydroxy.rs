// Standard Library Imports
use std::collections::BTreeSet;

// External Crate Imports
use nom_miette::final_parser;

// Local Crate Imports
use crate::{
    ChainType, HydroxyRequirement, HydroxyRequirements, MandatoryLevel, Result, RuleChainType, RulesError,
    parsers::hydroxy::hydroxy_requirements,
};

// Public API ==========================================================================================================

impl HydroxyRequirement {
    #[must_use]
    pub const fn oh(&self) -> u32 {
        self.oh
    }

    /// The chain this requirement applies to, where `None` means any chain
    #[must_use]
    pub const fn chain_type(&self) -> Option<ChainType> {
        self.chain_type
    }

    #[must_use]
    pub const fn mandatory(&self) -> MandatoryLevel {
        self.mandatory
    }

    fn applies_to(&self, oh: u32, chain_type: Option<ChainType>) -> bool {
        self.oh == oh && (self.chain_type.is_none() || chain_type.is_none() || self.chain_type == chain_type)
    }
}

impl HydroxyRequirements {
    /// Parses a list like `1,2:true` or `$LCB2:true,$CHAIN0`
    ///
    /// # Errors
    ///
    /// Fails if the list can't be parsed
    pub fn new(text: &str) -> Result<Self> {
        let mut parser = final_parser(hydroxy_requirements);
        Ok(parser(text)?)
    }

    /// Finds the requirement for `oh` hydroxylations, restricted to one chain type if `chain_type` is given
    #[must_use]
    pub fn get(&self, oh: u32, chain_type: Option<ChainType>) -> Option<&HydroxyRequirement> {
        self.0.iter().find(|r| r.applies_to(oh, chain_type))
    }

    #[must_use]
    pub fn contains_oh(&self, oh: u32) -> bool {
        self.0.iter().any(|r| r.oh == oh)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HydroxyRequirement> {
        self.0.iter()
    }

    /// Fills in the chain type of any requirement that didn't name one, and checks that named types fit the rule
    ///
    /// Rules referring to a single chain type lend it to every requirement. For rules mixing chain types, unnamed
    /// requirements are taken to mean the long-chain base, but only if the rule refers to one.
    ///
    /// # Errors
    ///
    /// Fails if a requirement names a chain the rule doesn't refer to, or if an unnamed requirement is ambiguous
    pub fn check_and_correct_chain_types(
        &mut self,
        rule_chain_type: RuleChainType,
        present: &BTreeSet<ChainType>,
        is_head: bool,
    ) -> Result<()> {
        if is_head {
            return Ok(());
        }

        for requirement in &mut self.0 {
            let oh = requirement.oh;
            match (rule_chain_type, requirement.chain_type) {
                (RuleChainType::NoChain, None) => (),
                (RuleChainType::NoChain, Some(chain_type)) => {
                    return Err(Box::new(RulesError::HydroxyWithoutChains { oh, chain_type }));
                }
                (RuleChainType::Single(actual), None) => requirement.chain_type = Some(actual),
                (RuleChainType::Single(actual), Some(requested)) if requested != actual => {
                    return Err(Box::new(RulesError::HydroxyChainTypeMismatch {
                        oh,
                        requested,
                        actual,
                    }));
                }
                (RuleChainType::Single(_), Some(_)) => (),
                (RuleChainType::DiffChainTypes, None) => {
                    if !present.contains(&ChainType::Lcb) {
                        return Err(Box::new(RulesError::AmbiguousHydroxyChainType { oh }));
                    }
                    requirement.chain_type = Some(ChainType::Lcb);
                }
                (RuleChainType::DiffChainTypes, Some(chain_type)) => {
                    if !present.contains(&chain_type) {
                        return Err(Box::new(RulesError::HydroxyChainTypeAbsent { oh, chain_type }));
                    }
                }
            }
        }
        Ok(())
    }
}

// Module Tests ========================================================================================================
