// Standard Library Imports
use std::str::FromStr;

// External Crate Imports
use lipochem::AtomicDatabase;
use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use nom_miette::final_parser;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

// Local Crate Imports
use crate::{
    FragmentRegistry, FragmentRule, GeneralSettings, HydroxyRequirements, IntensityRule, MandatoryLevel, Result,
    RuleSection, RuleSet, RulesError,
    parsers::rule_file::{RuleLine, rule_line},
};

// Public API ==========================================================================================================

impl<'a> RuleSet<'a> {
    /// Loads the rules of a lipid class from the text of its rule file
    ///
    /// Rules are built strictly in the order they are written, so every fragment must be defined before it's used.
    ///
    /// # Errors
    ///
    /// Fails at the first line that can't be parsed or that defines an invalid rule, or if `AmountOfChains` is never
    /// set
    pub fn new(
        db: &'a AtomicDatabase,
        file_name: impl AsRef<str>,
        text: impl AsRef<str>,
    ) -> Result<Self, RuleFileError> {
        let text = text.as_ref();
        let finalize = |kind, span, line| RuleFileError {
            file: NamedSource::new(file_name.as_ref(), text.to_owned()),
            span,
            line,
            kind,
        };

        let mut loader = Loader::new(db);
        let mut offset = 0;
        let mut line_number = 0;
        for line in text.split_inclusive('\n') {
            line_number += 1;
            let content = line.split('#').next().unwrap_or_default().trim();
            let span = SourceSpan::from((offset, line.trim_end().len()));
            offset += line.len();
            if content.is_empty() {
                continue;
            }
            loader.load_line(content).map_err(|kind| finalize(kind, span, line_number))?;
        }

        let end = SourceSpan::from((text.len(), 0));
        loader.finish().map_err(|kind| finalize(kind, end, line_number + 1))
    }

    #[must_use]
    pub const fn settings(&self) -> &GeneralSettings {
        &self.settings
    }

    #[must_use]
    pub const fn registry(&self) -> &FragmentRegistry<'a> {
        &self.registry
    }

    #[must_use]
    pub fn head_rules(&self) -> &[IntensityRule] {
        &self.head_rules
    }

    #[must_use]
    pub fn chain_rules(&self) -> &[IntensityRule] {
        &self.chain_rules
    }

    #[must_use]
    pub fn position_rules(&self) -> &[IntensityRule] {
        &self.position_rules
    }
}

impl GeneralSettings {
    /// The number of chains a lipid of this class carries, including any long-chain bases
    #[must_use]
    pub const fn amount_of_chains(&self) -> usize {
        self.amount_of_chains
    }

    #[must_use]
    pub const fn amount_of_lcbs(&self) -> usize {
        self.amount_of_lcbs
    }

    #[must_use]
    pub fn chain_library(&self) -> Option<&str> {
        self.chain_library.as_deref()
    }

    #[must_use]
    pub fn lcb_library(&self) -> Option<&str> {
        self.lcb_library.as_deref()
    }

    /// The fraction of the base peak below which fragments are ignored
    #[must_use]
    pub const fn base_peak_cutoff(&self) -> Option<Decimal> {
        self.base_peak_cutoff
    }

    #[must_use]
    pub const fn chain_cutoff(&self) -> Option<Decimal> {
        self.chain_cutoff
    }

    #[must_use]
    pub const fn spectrum_coverage(&self) -> Option<Decimal> {
        self.spectrum_coverage
    }

    #[must_use]
    pub const fn single_chain_identification(&self) -> bool {
        self.single_chain_identification
    }
}

/// A rule file failed to load, pointing at the line that caused it
#[derive(Debug, Error)]
#[error("failed to load the rule file at line {line}")]
pub struct RuleFileError {
    file: NamedSource<String>,
    span: SourceSpan,
    line: usize,
    #[source]
    kind: Box<RulesError>,
}

impl RuleFileError {
    /// The 1-based line number of the offending line
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    #[must_use]
    pub fn kind(&self) -> &RulesError {
        &self.kind
    }
}

// NOTE: This is manually implemented so that the error of the offending rule is rendered beneath the file's snippet
impl Diagnostic for RuleFileError {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.file)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = LabeledSpan::new_with_span(Some("in this line".to_owned()), self.span);
        Some(Box::new(std::iter::once(label)))
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        Some(&*self.kind)
    }
}

// Line-By-Line Loading ================================================================================================

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
enum Section {
    Preamble,
    General,
    Head,
    Chains,
    Position,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Block {
    None,
    Fragments,
    Intensities,
}

struct Loader<'a> {
    settings: GeneralSettings,
    registry: FragmentRegistry<'a>,
    head_rules: Vec<IntensityRule>,
    chain_rules: Vec<IntensityRule>,
    position_rules: Vec<IntensityRule>,
    section: Section,
    block: Block,
}

impl<'a> Loader<'a> {
    fn new(db: &'a AtomicDatabase) -> Self {
        Self {
            settings: GeneralSettings::default(),
            registry: FragmentRegistry::new(db),
            head_rules: Vec::new(),
            chain_rules: Vec::new(),
            position_rules: Vec::new(),
            section: Section::Preamble,
            block: Block::None,
        }
    }

    fn load_line(&mut self, line: &str) -> Result<()> {
        match final_parser(rule_line)(line)? {
            RuleLine::Section(name) => self.enter_section(name),
            RuleLine::Block(name) => self.enter_block(name),
            RuleLine::Fields(fields) => match (self.section, self.block) {
                (Section::General, _) => fields.into_iter().try_for_each(|(k, v)| self.set_general(k, v)),
                (Section::Head | Section::Chains, Block::Fragments) => self.push_fragment(&fields),
                (Section::Head | Section::Chains | Section::Position, Block::Intensities) => {
                    self.push_intensity_rule(&fields)
                }
                _ => Err(Box::new(RulesError::LineOutsideBlock)),
            },
        }
    }

    fn enter_section(&mut self, name: &str) -> Result<()> {
        let section = match name.to_ascii_uppercase().as_str() {
            "GENERAL" => Section::General,
            "HEAD" => Section::Head,
            "CHAINS" => Section::Chains,
            "POSITION" => Section::Position,
            _ => return Err(Box::new(RulesError::UnknownSection(name.to_owned()))),
        };
        if section <= self.section {
            return Err(Box::new(RulesError::MisplacedSection(name.to_owned())));
        }
        if section > Section::General && self.section <= Section::General {
            self.check_settings()?;
        }
        debug!(?section, "entered rule file section");
        self.section = section;
        self.block = Block::None;
        Ok(())
    }

    fn enter_block(&mut self, name: &str) -> Result<()> {
        let block = match (self.section, name.to_ascii_uppercase().as_str()) {
            (Section::Head | Section::Chains, "FRAGMENTS") if self.block == Block::None => Block::Fragments,
            (Section::Head | Section::Chains | Section::Position, "INTENSITIES") if self.block != Block::Intensities => {
                Block::Intensities
            }
            (section, _) => {
                return Err(Box::new(RulesError::MisplacedBlock {
                    block: name.to_owned(),
                    section: format!("{section:?}").to_ascii_uppercase(),
                }));
            }
        };
        self.block = block;
        Ok(())
    }

    fn set_general(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || {
            Box::new(RulesError::InvalidValue {
                key: key.to_owned(),
                value: value.to_owned(),
            })
        };
        let settings = &mut self.settings;
        match key.to_ascii_lowercase().as_str() {
            "amountofchains" => {
                settings.amount_of_chains = value.parse().ok().filter(|&n| n > 0).ok_or_else(invalid)?;
            }
            "amountoflcbs" => settings.amount_of_lcbs = value.parse().map_err(|_| invalid())?,
            "chainlibrary" => settings.chain_library = Some(value.to_owned()),
            "lcblibrary" => settings.lcb_library = Some(value.to_owned()),
            "basepeakcutoff" => settings.base_peak_cutoff = Some(parse_fraction(value).ok_or_else(invalid)?),
            "chaincutoff" => settings.chain_cutoff = Some(parse_fraction(value).ok_or_else(invalid)?),
            "spectrumcoverage" => settings.spectrum_coverage = Some(parse_fraction(value).ok_or_else(invalid)?),
            "singlechainidentification" => {
                settings.single_chain_identification = value.to_ascii_lowercase().parse().map_err(|_| invalid())?;
            }
            _ => return Err(Box::new(RulesError::UnknownKey(key.to_owned()))),
        }
        debug!(key, value, "read general setting");
        Ok(())
    }

    fn check_settings(&self) -> Result<()> {
        if self.settings.amount_of_chains == 0 {
            return Err(Box::new(RulesError::MissingKey("AmountOfChains")));
        }
        Ok(())
    }

    fn push_fragment(&mut self, fields: &[(&str, &str)]) -> Result<()> {
        let fields = Fields::new(fields, &["name", "formula", "charge", "mslevel", "mandatory", "oh", "ohcombi"])?;
        let name = fields.required("Name")?;
        let formula = fields.required("Formula")?;

        let mut rule = FragmentRule::new(&self.registry, name, formula)?
            .with_mandatory(fields.parse("mandatory")?.unwrap_or(MandatoryLevel::False))
            .with_ms_level(fields.parse("MSLevel")?.unwrap_or(2));
        if let Some(charge) = fields.parse("Charge")? {
            rule = rule.with_charge(charge)?;
        }
        if let Some(ohs) = fields.get("oh") {
            rule = rule.with_allowed_ohs(HydroxyRequirements::new(ohs)?)?;
        }
        if let Some(ohs) = fields.get("ohCombi") {
            rule = rule.with_combi_ohs(HydroxyRequirements::new(ohs)?);
        }

        debug!(
            name = rule.name(),
            formula = rule.formula(),
            mandatory = %rule.mandatory(),
            "parsed fragment rule"
        );
        if self.section == Section::Head {
            self.registry.push_head(rule)
        } else {
            self.registry.push_chain(rule)
        }
    }

    fn push_intensity_rule(&mut self, fields: &[(&str, &str)]) -> Result<()> {
        let fields = Fields::new(fields, &["equation", "mandatory", "oh"])?;
        let equation = fields.required("Equation")?;
        let mandatory = fields.parse::<MandatoryLevel>("mandatory")?.is_some_and(MandatoryLevel::is_required);

        let (section, rules) = match self.section {
            Section::Head => (RuleSection::Head, &mut self.head_rules),
            Section::Chains => (RuleSection::Chains, &mut self.chain_rules),
            _ => (RuleSection::Position, &mut self.position_rules),
        };
        let mut rule = IntensityRule::new(&self.registry, section, equation, mandatory)?;
        if let Some(ohs) = fields.get("oh") {
            rule = rule.with_hydroxy(HydroxyRequirements::new(ohs)?)?;
        }

        if section == RuleSection::Position {
            let chains = self.settings.amount_of_chains;
            let positions = [rule.bigger_position(), rule.smaller_position()];
            if let Some(position) = positions.into_iter().flatten().find(|&p| p == 0 || p > chains) {
                return Err(Box::new(RulesError::PositionOutOfRange { position, chains }));
            }
        }

        debug!(equation, ?section, mandatory, "parsed intensity rule");
        rules.push(rule);
        Ok(())
    }

    fn finish(self) -> Result<RuleSet<'a>> {
        self.check_settings()?;
        Ok(RuleSet {
            settings: self.settings,
            registry: self.registry,
            head_rules: self.head_rules,
            chain_rules: self.chain_rules,
            position_rules: self.position_rules,
        })
    }
}

/// The fields of one rule line, with keys matched case-insensitively
struct Fields<'f, 's>(&'f [(&'s str, &'s str)]);

impl<'f, 's> Fields<'f, 's> {
    fn new(fields: &'f [(&'s str, &'s str)], known: &[&str]) -> Result<Self> {
        if let Some(&(key, _)) = fields.iter().find(|(k, _)| !known.contains(&k.to_ascii_lowercase().as_str())) {
            return Err(Box::new(RulesError::UnknownKey(key.to_owned())));
        }
        Ok(Self(fields))
    }

    fn get(&self, key: &str) -> Option<&'s str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|&(_, v)| v.trim())
    }

    fn required(&self, key: &'static str) -> Result<&'s str> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Box::new(RulesError::MissingKey(key)))
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|value| {
                value.parse().map_err(|_| {
                    Box::new(RulesError::InvalidValue {
                        key: key.to_owned(),
                        value: value.to_owned(),
                    })
                })
            })
            .transpose()
    }
}

/// Reads fractions written like `0.5`, `0.1%`, or `1‰`
fn parse_fraction(value: &str) -> Option<Decimal> {
    let (number, scale) = if let Some(number) = value.strip_suffix('%') {
        (number, 100)
    } else if let Some(number) = value.strip_suffix('‰') {
        (number, 1000)
    } else {
        (value, 1)
    };
    let number: Decimal = number.trim().parse().ok()?;
    Some(number / Decimal::from(scale))
}

// Module Tests ========================================================================================================
