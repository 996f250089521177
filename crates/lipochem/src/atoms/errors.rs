use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;

// NOTE: Public so that other parsers using `chemical_composition` as a building block can inspect errors
#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum AtomicLookupError {
    #[diagnostic(help("double-check for typos, or add a new entry to the atomic database"))]
    #[error("the element {0:?} could not be found in the supplied atomic database")]
    Element(String),

    #[diagnostic(help("monoisotopic masses need at least one isotope with a natural abundance"))]
    #[error("no natural abundance data could be found for {0} ({1}), though the following isotopes were found: {2}")]
    Abundance(String, String, String),
}

impl AtomicLookupError {
    pub(crate) fn element(symbol: &str) -> Self {
        Self::Element(symbol.to_owned())
    }

    pub(crate) fn abundance<I: ToString>(
        symbol: &str,
        name: &str,
        mass_numbers: impl IntoIterator<Item = I>,
    ) -> Self {
        Self::Abundance(
            name.to_owned(),
            symbol.to_owned(),
            Self::display_vec(mass_numbers),
        )
    }

    fn display_vec<I: ToString>(items: impl IntoIterator<Item = I>) -> String {
        let items = items.into_iter().map(|i| i.to_string()).sorted_unstable().join(", ");
        format!("[{items}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            AtomicLookupError::element("Xx").to_string(),
            r#"the element "Xx" could not be found in the supplied atomic database"#
        );
        assert_eq!(
            AtomicLookupError::abundance("Tc", "Technetium", [99, 97, 98]).to_string(),
            "no natural abundance data could be found for Technetium (Tc), though the following isotopes were \
            found: [97, 98, 99]"
        );
    }
}
