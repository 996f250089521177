use divan::{AllocProfiler, black_box};
use lipochem::{AtomicDatabase, Charge};
use msn_rules::{ChainType, FattyAcid, FoundFragment, RuleSet, SpectrumEvidence};
use once_cell::sync::Lazy;
use rust_decimal_macros::dec;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

const PC_RULES: &str = include_str!("../tests/data/PC_H.frag.txt");
const CHAINS: [&str; 4] = ["16:0", "18:1", "18:0", "20:4"];

static ATOMIC_DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);

static RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet::new(&ATOMIC_DB, "PC_H.frag.txt", PC_RULES).unwrap());

static FATTY_ACIDS: Lazy<Vec<FattyAcid>> = Lazy::new(|| {
    CHAINS
        .into_iter()
        .map(|id| FattyAcid::decode(&ATOMIC_DB, id, ChainType::Acyl).unwrap())
        .collect()
});

static EVIDENCE: Lazy<SpectrumEvidence> = Lazy::new(|| {
    let found = |area| FoundFragment::new(area, 500.0, 2);
    FATTY_ACIDS.iter().zip([10.0, 20.0, 5.0, 1.0]).fold(
        SpectrumEvidence::new(Some(100.0)).with_head_fragment("PC184", found(100.0)),
        |evidence, (fa, area)| {
            evidence
                .with_chain_fragment("-FA", fa, found(area))
                .with_chain_fragment("FA", fa, found(area / 2.0))
        },
    )
});

fn main() {
    Lazy::force(&RULES);
    Lazy::force(&FATTY_ACIDS);
    Lazy::force(&EVIDENCE);
    divan::main();
}

#[divan::bench]
fn load_rule_file() -> RuleSet<'static> {
    RuleSet::new(&ATOMIC_DB, "PC_H.frag.txt", PC_RULES).unwrap()
}

#[divan::bench]
fn decode_fatty_acids() {
    for id in CHAINS {
        black_box(FattyAcid::decode(&ATOMIC_DB, id, ChainType::Acyl).unwrap());
    }
}

#[divan::bench]
fn compute_fragment_masses() {
    let registry = RULES.registry();
    let chain = &FATTY_ACIDS[1];
    for rule in registry.head_fragments().chain(registry.chain_fragments()) {
        black_box(
            rule.formula_and_mass("C42H83NO8P", dec!(760.5851), Some(chain.formula()), chain.mass(), Charge::new(1))
                .unwrap(),
        );
    }
}

#[divan::bench]
fn annotate_chain_combinations() {
    for (i, first) in FATTY_ACIDS.iter().enumerate() {
        for second in &FATTY_ACIDS[i..] {
            let _ = black_box(RULES.annotate(&EVIDENCE, &[first.clone(), second.clone()]));
        }
    }
}
