// Standard Library Imports
use std::collections::BTreeSet;

// Local Crate Imports
use crate::{ChainType, RuleChainType};

// Public API ==========================================================================================================

impl ChainType {
    pub const ALL: [Self; 4] = [Self::Acyl, Self::Alkyl, Self::Alkenyl, Self::Lcb];

    /// The placeholder standing in for this kind of chain in fragment formulae
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Acyl => "$CHAIN",
            Self::Alkyl => "$ALKYLCHAIN",
            Self::Alkenyl => "$ALKENYLCHAIN",
            Self::Lcb => "$LCB",
        }
    }

    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.token() == token)
    }
}

impl RuleChainType {
    /// Classifies the distinct chain types referenced by the fragments of a rule
    #[must_use]
    pub fn classify(chain_types: &BTreeSet<ChainType>) -> Self {
        let mut chain_types = chain_types.iter().copied();
        match (chain_types.next(), chain_types.next()) {
            (None, _) => Self::NoChain,
            (Some(chain_type), None) => Self::Single(chain_type),
            (Some(_), Some(_)) => Self::DiffChainTypes,
        }
    }
}

// Module Tests ========================================================================================================
