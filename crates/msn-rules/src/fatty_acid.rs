// Standard Library Imports
use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
};

// External Crate Imports
use lipochem::{AtomicDatabase, ChemicalComposition, Massive};
use rust_decimal::Decimal;

// Local Crate Imports
use crate::{ChainType, EncodingError, FattyAcid};

// Public API ==========================================================================================================

impl FattyAcid {
    /// Builds a chain with the standard composition for its type, carbon atoms, double bonds, and hydroxylations
    ///
    /// # Errors
    ///
    /// Fails if `db` is missing any of the elements the chain is made of, or if any atom count overflows an `i32`
    pub fn new(
        db: &AtomicDatabase,
        chain_type: ChainType,
        c_atoms: u32,
        double_bonds: u32,
        oh_number: u32,
    ) -> Result<Self, EncodingError> {
        let composition = standard_composition(db, chain_type, c_atoms, double_bonds, oh_number)?;
        Ok(Self {
            chain_type,
            prefix: String::new(),
            c_atoms,
            double_bonds,
            oh_number,
            mass: composition.monoisotopic_mass().into(),
            formula: composition.to_string(),
            omega_position: None,
            ox_state: String::new(),
        })
    }

    /// Decodes a chain written like `16:0`, `O-16:0`, `P-18:1`, or `18:1;O2`, optionally preceded by a label prefix
    ///
    /// The type of the chain can't always be told from the text alone, so it must be supplied, and any `O-` or `P-`
    /// marker must agree with it.
    ///
    /// # Errors
    ///
    /// Fails if `id` is malformed, carries the wrong marker, or if `db` can't describe the chain
    pub fn decode(db: &AtomicDatabase, id: &str, chain_type: ChainType) -> Result<Self, EncodingError> {
        let malformed = || EncodingError::Malformed(id.to_owned());

        let (chain, oh_number) = match id.split_once(';') {
            Some((chain, "O")) => (chain, 1),
            Some((chain, oh)) => {
                let oh = oh.strip_prefix('O').and_then(|n| n.parse().ok());
                (chain, oh.ok_or_else(malformed)?)
            }
            None => (id, 0),
        };

        let (head, double_bonds) = chain.rsplit_once(':').ok_or_else(malformed)?;
        let double_bonds = double_bonds.parse().map_err(|_| malformed())?;

        let prefix_len = head.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (head, c_atoms) = head.split_at(prefix_len);
        let c_atoms = c_atoms.parse().map_err(|_| malformed())?;

        let (prefix, marker) = if let Some(prefix) = head.strip_suffix("O-") {
            (prefix, Some(ChainType::Alkyl))
        } else if let Some(prefix) = head.strip_suffix("P-") {
            (prefix, Some(ChainType::Alkenyl))
        } else {
            (head, None)
        };
        let expected_marker =
            matches!(chain_type, ChainType::Alkyl | ChainType::Alkenyl).then_some(chain_type);
        if marker != expected_marker {
            return Err(EncodingError::ChainTypeMarker {
                id: id.to_owned(),
                expected: chain_type,
            });
        }

        let fatty_acid = Self::new(db, chain_type, c_atoms, double_bonds, oh_number).map_err(|e| match e {
            EncodingError::Oversized { .. } => malformed(),
            e => e,
        })?;
        Ok(fatty_acid.with_prefix(prefix))
    }

    #[must_use]
    pub fn with_prefix(self, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_omega_position(self, omega_position: u32) -> Self {
        Self {
            omega_position: Some(omega_position),
            ..self
        }
    }

    #[must_use]
    pub fn with_ox_state(self, ox_state: impl Into<String>) -> Self {
        Self {
            ox_state: ox_state.into(),
            ..self
        }
    }

    #[must_use]
    pub const fn chain_type(&self) -> ChainType {
        self.chain_type
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub const fn c_atoms(&self) -> u32 {
        self.c_atoms
    }

    #[must_use]
    pub const fn double_bonds(&self) -> u32 {
        self.double_bonds
    }

    #[must_use]
    pub const fn oh_number(&self) -> u32 {
        self.oh_number
    }

    /// The monoisotopic mass of the neutral chain
    #[must_use]
    pub const fn mass(&self) -> Decimal {
        self.mass
    }

    #[must_use]
    pub fn formula(&self) -> &str {
        &self.formula
    }

    #[must_use]
    pub const fn omega_position(&self) -> Option<u32> {
        self.omega_position
    }

    #[must_use]
    pub fn ox_state(&self) -> &str {
        &self.ox_state
    }

    /// # Errors
    ///
    /// Fails if `db` is missing any of the elements the chain is made of
    pub fn composition<'a>(&self, db: &'a AtomicDatabase) -> lipochem::Result<ChemicalComposition<'a>> {
        ChemicalComposition::new(db, &self.formula)
    }
}

// Ordering Trait Implementations ======================================================================================

impl Ord for FattyAcid {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .chain_type
            .cmp(&self.chain_type)
            .then(self.c_atoms.cmp(&other.c_atoms))
            .then(self.double_bonds.cmp(&other.double_bonds))
            .then(self.oh_number.cmp(&other.oh_number))
            .then(self.omega_position.cmp(&other.omega_position))
            .then_with(|| self.prefix.cmp(&other.prefix))
            .then_with(|| self.ox_state.cmp(&other.ox_state))
    }
}

impl PartialOrd for FattyAcid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Display Trait Implementation ========================================================================================

impl Display for FattyAcid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let marker = match self.chain_type {
            ChainType::Alkyl => "O-",
            ChainType::Alkenyl => "P-",
            ChainType::Acyl | ChainType::Lcb => "",
        };
        write!(f, "{}{marker}{}:{}", self.prefix, self.c_atoms, self.double_bonds)?;
        match self.oh_number {
            0 => (),
            1 => write!(f, ";O")?,
            n => write!(f, ";O{n}")?,
        }
        write!(f, "{}", self.ox_state)
    }
}

// Private Helper Functions ============================================================================================

fn standard_composition(
    db: &AtomicDatabase,
    chain_type: ChainType,
    c_atoms: u32,
    double_bonds: u32,
    oh_number: u32,
) -> Result<ChemicalComposition<'_>, EncodingError> {
    let oversized = || EncodingError::Oversized {
        c_atoms,
        double_bonds,
        oh_number,
    };
    let [c, db_count, oh] = [c_atoms, double_bonds, oh_number].map(|n| i32::try_from(n).ok());
    let (Some(c), Some(db_count), Some(oh)) = (c, db_count, oh) else {
        return Err(oversized());
    };
    let hydrogens = |extra: i32| {
        c.checked_mul(2)?
            .checked_add(extra)?
            .checked_sub(db_count.checked_mul(2)?)
    };
    let counts = match chain_type {
        ChainType::Acyl => [("C", Some(c)), ("H", hydrogens(0)), ("O", oh.checked_add(2)), ("N", Some(0))],
        ChainType::Alkyl => [("C", Some(c)), ("H", hydrogens(2)), ("O", oh.checked_add(1)), ("N", Some(0))],
        ChainType::Alkenyl => [("C", Some(c)), ("H", hydrogens(0)), ("O", oh.checked_add(1)), ("N", Some(0))],
        ChainType::Lcb => [("C", Some(c)), ("H", hydrogens(3)), ("O", Some(oh)), ("N", Some(1))],
    };
    let counts: Option<Vec<_>> = counts.into_iter().map(|(s, n)| Some((s, n?))).collect();
    Ok(ChemicalComposition::from_counts(db, counts.ok_or_else(oversized)?)?)
}

// Module Tests ========================================================================================================
