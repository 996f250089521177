use std::str::FromStr;

use crate::MandatoryLevel;

impl MandatoryLevel {
    /// Whether a fragment at this level must be found for a species to be annotated
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(self, Self::True | Self::OtherSpecies | Self::Class)
    }
}

impl FromStr for MandatoryLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "true" => Self::True,
            "false" => Self::False,
            "other" => Self::OtherSpecies,
            "quant" => Self::Quant,
            "class" => Self::Class,
            _ => return Err(s.to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mandatory_levels() {
        assert_eq!("true".parse(), Ok(MandatoryLevel::True));
        assert_eq!("FALSE".parse(), Ok(MandatoryLevel::False));
        assert_eq!("other".parse(), Ok(MandatoryLevel::OtherSpecies));
        assert_eq!("quant".parse(), Ok(MandatoryLevel::Quant));
        assert_eq!("Class".parse(), Ok(MandatoryLevel::Class));
        assert_eq!(
            "maybe".parse::<MandatoryLevel>(),
            Err("maybe".to_owned())
        );
    }

    #[test]
    fn required_levels() {
        let required: Vec<_> = [
            MandatoryLevel::Undefined,
            MandatoryLevel::False,
            MandatoryLevel::True,
            MandatoryLevel::OtherSpecies,
            MandatoryLevel::Quant,
            MandatoryLevel::Class,
        ]
        .into_iter()
        .filter(|level| level.is_required())
        .map(|level| level.to_string())
        .collect();
        assert_eq!(required, vec!["true", "other", "class"]);
    }
}
