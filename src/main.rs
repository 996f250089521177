use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::LazyLock,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lipochem::AtomicDatabase;
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme};
use msn_rules::{
    ChainType, EncodingError, FattyAcid, FragmentRule, IntensityRule, RuleFileError, RuleSet,
    expression::chain_fragment_key,
};
use rust_decimal::Decimal;
use tracing::debug;
use tracing_subscriber::EnvFilter;

static DB: LazyLock<AtomicDatabase> = LazyLock::new(AtomicDatabase::default);

/// Checks MSn fragmentation rules for lipid classes, and computes the fragment ions they predict
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Loads a rule file, then lists its settings, fragments, and intensity rules
    Check {
        /// A rule file, like `PC_H.frag.txt`
        rules: PathBuf,
    },
    /// Prints the formula and m/z of every fragment the rules predict for one precursor
    Ions {
        /// A rule file, like `PC_H.frag.txt`
        rules: PathBuf,
        /// The chemical formula of the precursor ion
        #[arg(long)]
        precursor: String,
        /// The m/z of the precursor ion
        #[arg(long)]
        mz: Decimal,
        /// Acyl, alkyl, or alkenyl chains, like `16:0`, `O-16:0`, or `P-18:0`
        #[arg(long = "chain")]
        chains: Vec<String>,
        /// Long-chain bases, like `18:1;O2`
        #[arg(long = "lcb")]
        lcbs: Vec<String>,
    },
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Args::parse().command {
        Command::Check { rules } => check(&rules),
        Command::Ions {
            rules,
            precursor,
            mz,
            chains,
            lcbs,
        } => ions(&rules, &precursor, mz, &chains, &lcbs),
    }
}

fn check(path: &Path) -> Result<ExitCode> {
    let rules = match load_rules(path)? {
        Ok(rules) => rules,
        Err(error) => return Ok(render_error(error)),
    };

    let settings = rules.settings();
    println!(
        "{}: {} chain(s), {} of them long-chain bases",
        path.display(),
        settings.amount_of_chains(),
        settings.amount_of_lcbs()
    );

    let registry = rules.registry();
    print_fragments("Head Group Fragments", registry.head_fragments());
    print_fragments("Chain Fragments", registry.chain_fragments());
    print_rules("Head Group Rules", rules.head_rules());
    print_rules("Chain Rules", rules.chain_rules());
    print_rules("Position Rules", rules.position_rules());

    Ok(ExitCode::SUCCESS)
}

fn ions(
    path: &Path,
    precursor: &str,
    mz: Decimal,
    chains: &[String],
    lcbs: &[String],
) -> Result<ExitCode> {
    let rules = match load_rules(path)? {
        Ok(rules) => rules,
        Err(error) => return Ok(render_error(error)),
    };

    let decoded: Result<Vec<_>, EncodingError> = chains
        .iter()
        .map(|id| decode_chain(id, false))
        .chain(lcbs.iter().map(|id| decode_chain(id, true)))
        .collect();
    let chains = match decoded {
        Ok(chains) => chains,
        Err(error) => return Ok(render_error(error)),
    };

    let registry = rules.registry();
    for fragment in registry.head_fragments() {
        match fragment.ion(precursor, mz, None) {
            Ok((formula, mz)) => println!("{}\t{formula}\t{}", fragment.name(), mz.round_dp(6)),
            Err(error) => return Ok(render_error(*error)),
        }
    }
    for fragment in registry.chain_fragments() {
        for chain in chains.iter().filter(|c| Some(c.chain_type()) == fragment.chain_type()) {
            let name = chain_fragment_key(fragment.name(), chain);
            match fragment.ion(precursor, mz, Some(chain)) {
                Ok((formula, mz)) => println!("{name}\t{formula}\t{}", mz.round_dp(6)),
                Err(error) => return Ok(render_error(*error)),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_rules(path: &Path) -> Result<Result<RuleSet<'static>, RuleFileError>> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    debug!(path = %path.display(), "loading rule file");
    Ok(RuleSet::new(&DB, path.display().to_string(), text))
}

fn decode_chain(id: &str, lcb: bool) -> Result<FattyAcid, EncodingError> {
    let chain_type = if lcb {
        ChainType::Lcb
    } else if id.contains("O-") {
        ChainType::Alkyl
    } else if id.contains("P-") {
        ChainType::Alkenyl
    } else {
        ChainType::Acyl
    };
    FattyAcid::decode(&DB, id, chain_type)
}

fn print_fragments<'f, 'a: 'f>(title: &str, fragments: impl Iterator<Item = &'f FragmentRule<'a>>) {
    println!("\n{title}:");
    for fragment in fragments {
        println!(
            "  {}\t{}\tcharge {}\tMS{}\tmandatory={}",
            fragment.name(),
            fragment.formula(),
            fragment.charge(),
            fragment.ms_level(),
            fragment.mandatory()
        );
    }
}

fn print_rules(title: &str, rules: &[IntensityRule]) {
    if rules.is_empty() {
        return;
    }
    println!("\n{title}:");
    for rule in rules {
        let mandatory = if rule.is_mandatory() { " (mandatory)" } else { "" };
        println!("  {rule}{mandatory}");
    }
}

fn render_error(diagnostic: impl Into<Box<dyn Diagnostic + 'static>>) -> ExitCode {
    let mut buf = String::new();
    let rendered = GraphicalReportHandler::new_themed(GraphicalTheme::unicode())
        .render_report(&mut buf, diagnostic.into().as_ref());
    if rendered.is_ok() {
        eprintln!("{buf}");
    }
    ExitCode::FAILURE
}
