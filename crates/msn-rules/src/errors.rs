use lipochem::LipochemError;
use miette::Diagnostic;
use thiserror::Error;

use crate::{ChainType, parsers::errors::RuleSyntaxError};

pub type Result<T, E = Box<RulesError>> = std::result::Result<T, E>;

/// Problems with the definition of a fragment or intensity rule, all of which abort loading the rule set
#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum RulesError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax {
        #[from]
        error: RuleSyntaxError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Chemistry {
        #[from]
        error: LipochemError,
    },

    #[diagnostic(help("fragments are singly charged by default, so try removing the charge"))]
    #[error("the charge of the fragment {name:?} must be at least 1, but was {charge}")]
    Charge { name: String, charge: i64 },

    #[diagnostic(help(
        "after adding and removing the fragments it references, a fragment must contain the precursor once or \
        not at all"
    ))]
    #[error("the fragment {name:?} contains the precursor {count} times")]
    PrecursorMultiplicity { name: String, count: i32 },

    #[diagnostic(help(
        "after adding and removing the fragments it references, a fragment must add or remove at most one chain"
    ))]
    #[error("the fragment {name:?} adds a chain {count} times")]
    ChainMultiplicity { name: String, count: i32 },

    #[error("the fragment {name:?} refers to both {first} and {second} chains")]
    ChainTypeConflict {
        name: String,
        first: ChainType,
        second: ChainType,
    },

    #[diagnostic(help("fragment masses can't be computed without hydrogen and oxygen"))]
    #[error("the element {0:?} is missing from the atomic database")]
    MissingElement(&'static str),

    #[diagnostic(help("fragment names must be unique across the head and chain sections"))]
    #[error("a fragment named {0:?} has already been defined")]
    DuplicateFragment(String),

    #[diagnostic(help("move the fragment to the [CHAINS] section, or remove the chain from its formula"))]
    #[error("the head group fragment {0:?} refers to a chain")]
    HeadFragmentWithChain(String),

    #[diagnostic(help(
        "add $CHAIN, $ALKYLCHAIN, $ALKENYLCHAIN, or $LCB to the formula, or move it to the [HEAD] section"
    ))]
    #[error("the chain fragment {0:?} doesn't refer to any chain")]
    ChainFragmentWithoutChain(String),

    #[error("head group rules can only compare head group fragments, but {fragment:?} is a chain fragment")]
    HeadRuleWithChain { fragment: String },

    #[diagnostic(help("tag the fragment with the position it belongs to, like {fragment}[1]"))]
    #[error("every chain fragment of a position rule needs a position, but {fragment:?} has none")]
    MissingPosition { fragment: String },

    #[error("all chain fragments on one side of a position rule must share a position, but found {0} and {1}")]
    MixedPositions(usize, usize),

    #[error("the two sides of a position rule must refer to different positions, but both refer to {0}")]
    SamePosition(usize),

    #[diagnostic(help("positions count from 1 up to the AmountOfChains of the [GENERAL] section"))]
    #[error("the position {position} is outside of the {chains} chain positions of this lipid class")]
    PositionOutOfRange { position: usize, chains: usize },

    #[diagnostic(help("every equation needs exactly one '>' or '<'"))]
    #[error("the equation {0:?} must contain exactly one comparison operator")]
    ComparisonCount(String),

    #[error("the equation {0:?} mixes '>' and '<'")]
    MixedComparison(String),

    #[diagnostic(help("hydroxylation requirements only make sense for rules referring to chains"))]
    #[error("the hydroxylation requirement for {oh} OH names a {chain_type} chain, but the rule has no chains")]
    HydroxyWithoutChains { oh: u32, chain_type: ChainType },

    #[error("the hydroxylation requirement for {oh} OH names a {requested} chain, but the rule refers to {actual}")]
    HydroxyChainTypeMismatch {
        oh: u32,
        requested: ChainType,
        actual: ChainType,
    },

    #[diagnostic(help("prefix the hydroxylation count with the chain it applies to, like $LCB2 or $CHAIN1"))]
    #[error(
        "the hydroxylation requirement for {oh} OH is ambiguous, since the rule refers to several chain types"
    )]
    AmbiguousHydroxyChainType { oh: u32 },

    #[error("the hydroxylation requirement for {oh} OH names a {chain_type} chain, which the rule doesn't refer to")]
    HydroxyChainTypeAbsent { oh: u32, chain_type: ChainType },

    #[error("the fragment {0:?} has no chain to substitute")]
    NoChainProvided(String),

    #[diagnostic(help("sections are [GENERAL], [HEAD], [CHAINS], and [POSITION]"))]
    #[error("the section [{0}] is not recognised")]
    UnknownSection(String),

    #[diagnostic(help("sections must appear in the order [GENERAL], [HEAD], [CHAINS], [POSITION], each at most once"))]
    #[error("the section [{0}] is out of order")]
    MisplacedSection(String),

    #[diagnostic(help(
        "[HEAD] and [CHAINS] contain !FRAGMENTS then !INTENSITIES blocks, while [POSITION] only has !INTENSITIES"
    ))]
    #[error("the block !{block} can't appear in the [{section}] section")]
    MisplacedBlock { block: String, section: String },

    #[diagnostic(help("start a section like [HEAD], then a block like !FRAGMENTS"))]
    #[error("this line isn't inside of any section or block")]
    LineOutsideBlock,

    #[error("the key {0:?} is not recognised here")]
    UnknownKey(String),

    #[error("the required key {0:?} is missing")]
    MissingKey(&'static str),

    #[error("the key {key:?} can't take the value {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Why a rule set rejected a chain combination
#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum Rejection {
    #[error("the rules describe lipids with {expected} chains, but {found} were given")]
    ChainCount { expected: usize, found: usize },

    #[diagnostic(help(
        "the fragment must be found at its MS level, and only \"other\" fragments may come from another species"
    ))]
    #[error("the mandatory fragment {fragment:?} was not found")]
    MissingFragment { fragment: String },

    #[error("the mandatory fragment {fragment:?} was not found for the chain {chain}")]
    MissingChainFragment { fragment: String, chain: String },

    #[error("the mandatory rule {rule:?} couldn't be evaluated, as too few of its fragments were found")]
    RuleNotEvaluable { rule: String },

    #[error("the rule {rule:?} is not fulfilled")]
    RuleNotFulfilled { rule: String },
}

/// A stored chain or rule description could not be decoded
#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum EncodingError {
    #[diagnostic(help("chains are written like 16:0, O-16:0, P-18:1, or 18:1;O2"))]
    #[error("the chain {0:?} could not be decoded")]
    Malformed(String),

    #[diagnostic(help(
        "alkyl chains are written like O-16:0, alkenyl chains like P-16:0, and acyl chains or long-chain bases \
        carry no marker"
    ))]
    #[error("the chain {id:?} doesn't carry the marker of {expected} chains")]
    ChainTypeMarker { id: String, expected: ChainType },

    #[error("the fragment {fragment:?} is not followed by a chain in parentheses")]
    MissingChain { fragment: String },

    #[error(
        "a chain with {c_atoms} carbon atoms, {double_bonds} double bonds, and {oh_number} hydroxylations has more \
        atoms than can be counted"
    )]
    Oversized {
        c_atoms: u32,
        double_bonds: u32,
        oh_number: u32,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Chemistry(LipochemError),
}

impl From<RuleSyntaxError> for Box<RulesError> {
    fn from(error: RuleSyntaxError) -> Self {
        Box::new(error.into())
    }
}

impl From<Box<LipochemError>> for EncodingError {
    fn from(error: Box<LipochemError>) -> Self {
        Self::Chemistry(*error)
    }
}

impl From<Box<LipochemError>> for Box<RulesError> {
    fn from(error: Box<LipochemError>) -> Self {
        Box::new((*error).into())
    }
}
