//! Fragment and intensity rules for annotating lipid species, chains, and chain positions from MSn spectra

pub mod annotation;
pub mod chain_type;
pub mod discovery;
pub mod errors;
pub mod expression;
pub mod fatty_acid;
pub mod fragment_rule;
pub mod hydroxy;
pub mod intensity_rule;
pub mod mandatory;
pub mod parsers;
pub mod position;
pub mod registry;
pub mod rule_file;
#[cfg(test)]
mod testing_tools;

// External Crate Imports
use ahash::HashMap;
use derive_more::Display;
use indexmap::IndexMap;
use lipochem::{AtomicDatabase, Charge, ChemicalComposition, OffsetKind};
use rust_decimal::Decimal;

pub use errors::{EncodingError, Rejection, Result, RulesError};
pub use rule_file::RuleFileError;

/// Stands in for the most intense peak of a spectrum in intensity rules
pub const BASE_PEAK: &str = "$BASEPEAK";
/// Stands in for the precursor ion in fragment formulae
pub const PRECURSOR: &str = "$PRECURSOR";

// NOTE: For the types in this crate, 'a lifetimes indicate references to the AtomicDatabase

// Chains ==============================================================================================================

/// The kinds of hydrocarbon chain a lipid can carry
///
/// Declared so that sorting in descending order puts long-chain bases first, then alkenyl, alkyl, and acyl chains.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum ChainType {
    #[display("acyl")]
    Acyl,
    #[display("alkyl")]
    Alkyl,
    #[display("alkenyl")]
    Alkenyl,
    #[display("long-chain base")]
    Lcb,
}

/// Which chain types the fragments of a rule refer to
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RuleChainType {
    NoChain,
    Single(ChainType),
    DiffChainTypes,
}

/// A single chain of a lipid species, like `16:0`, `O-18:1`, or `18:1;O2`
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FattyAcid {
    chain_type: ChainType,
    prefix: String,
    c_atoms: u32,
    double_bonds: u32,
    oh_number: u32,
    mass: Decimal,
    formula: String,
    omega_position: Option<u32>,
    ox_state: String,
}

// Fragment Rules ======================================================================================================

/// How strictly the presence of a fragment (or fulfilment of a rule) is required
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Display)]
pub enum MandatoryLevel {
    #[default]
    #[display("undefined")]
    Undefined,
    #[display("false")]
    False,
    #[display("true")]
    True,
    /// Required, but may be observed in the spectrum of a co-eluting species
    #[display("other")]
    OtherSpecies,
    /// Only used for quantification
    #[display("quant")]
    Quant,
    /// Required for the lipid class, but not to tell species apart
    #[display("class")]
    Class,
}

/// An OH-count-specific override of whether a fragment is mandatory
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct HydroxyRequirement {
    oh: u32,
    chain_type: Option<ChainType>,
    mandatory: MandatoryLevel,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct HydroxyRequirements(Vec<HydroxyRequirement>);

/// One named fragment ion, defined relative to the precursor, a chain, and previously defined fragments
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FragmentRule<'a> {
    db: &'a AtomicDatabase,
    name: String,
    formula: String,
    charge: Charge,
    ms_level: u8,
    mandatory: MandatoryLevel,
    contains_precursor: bool,
    chain: Option<(OffsetKind, ChainType)>,
    composition: ChemicalComposition<'a>,
    allowed_ohs: Option<HydroxyRequirements>,
    combi_ohs: Option<HydroxyRequirements>,
}

/// The fragment rules defined so far, which is all that any new rule is allowed to reference
#[derive(Clone, Debug)]
pub struct FragmentRegistry<'a> {
    db: &'a AtomicDatabase,
    head: IndexMap<String, FragmentRule<'a>>,
    chains: IndexMap<String, FragmentRule<'a>>,
}

// Intensity Rules =====================================================================================================

/// One signed and weighted fragment (or the base peak) in one side of an intensity rule
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FragmentMult {
    fragment_name: String,
    chain_type: Option<ChainType>,
    mult_factor: Decimal,
    positive: bool,
    position: Option<usize>,
}

/// One side of an intensity rule: `global_multiplier * (±f1 * m1 ±f2 * m2 ...)`
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Expression {
    global_multiplier: Decimal,
    fragments: Vec<FragmentMult>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RuleSection {
    Head,
    Chains,
    Position,
}

/// The comparison operator an equation was written with
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Comparison {
    Greater,
    Less,
}

/// A rule of the form `bigger > smaller`, optionally bound to the chains it was evaluated against
#[derive(Clone, PartialEq, Debug)]
pub struct IntensityRule {
    section: RuleSection,
    equation: String,
    mandatory: bool,
    bigger: Expression,
    smaller: Expression,
    chain_type: RuleChainType,
    written: Comparison,
    hydroxy: Option<HydroxyRequirements>,
    context: RuleContext,
}

#[derive(Clone, PartialEq, Debug)]
pub enum RuleContext {
    Base,
    Chain {
        bigger_fa: FattyAcid,
        smaller_fa: FattyAcid,
    },
    Position(PositionContext),
}

/// The chains a position rule was evaluated against, and what that says about their positions
#[derive(Clone, PartialEq, Debug)]
pub struct PositionContext {
    bigger_chains: IndexMap<String, FattyAcid>,
    smaller_chains: IndexMap<String, FattyAcid>,
    has_oh_info: bool,
    negated: bool,
    derived_position: Option<usize>,
    bigger_only_missed: bool,
    smaller_only_missed: bool,
}

// Rule Sets ===========================================================================================================

/// Class-wide settings from the `[GENERAL]` section of a rule file
///
/// Cutoffs and coverage are stored as fractions, so `0.1%` becomes `0.001`.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct GeneralSettings {
    amount_of_chains: usize,
    amount_of_lcbs: usize,
    chain_library: Option<String>,
    lcb_library: Option<String>,
    base_peak_cutoff: Option<Decimal>,
    chain_cutoff: Option<Decimal>,
    spectrum_coverage: Option<Decimal>,
    single_chain_identification: bool,
}

/// Every fragment and intensity rule of one lipid class, loaded from a rule file
#[derive(Clone, Debug)]
pub struct RuleSet<'a> {
    settings: GeneralSettings,
    registry: FragmentRegistry<'a>,
    head_rules: Vec<IntensityRule>,
    chain_rules: Vec<IntensityRule>,
    position_rules: Vec<IntensityRule>,
}

// Evidence and Annotation =============================================================================================

/// A fragment that was observed in a spectrum
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct FoundFragment {
    area: f64,
    mz: f64,
    ms_level: u8,
    from_other_species: bool,
}

/// Found fragments keyed by their name, or by `NAME(chain)` for chain fragments
pub type Evidence = HashMap<String, FoundFragment>;

/// How much of a lipid's structure the evidence has revealed, which only ever increases
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Display)]
pub enum DiscoveryStatus {
    #[default]
    #[display("no MSn spectra")]
    NoMsnPresent,
    #[display("head group detected")]
    HeadGroupDetected,
    #[display("chain fragments detected")]
    FragmentsDetected,
    #[display("chain positions detected")]
    PositionDetected,
}

/// Everything observed in the spectra of one precursor
#[derive(Clone, PartialEq, Debug, Default)]
pub struct SpectrumEvidence {
    head: Evidence,
    chains: Evidence,
    base_peak: Option<f64>,
}

/// The verdict of a rule set on one chain combination
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Annotation {
    status: DiscoveryStatus,
    chains: Vec<FattyAcid>,
    positions: Vec<Option<usize>>,
}
