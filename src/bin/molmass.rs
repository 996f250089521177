use std::{fmt::Write, sync::LazyLock};

use lipochem::{AtomicDatabase, ChemicalComposition, Massive, Result};
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme};
use rust_decimal::Decimal;
use rustyline::DefaultEditor;

static DB: LazyLock<AtomicDatabase> = LazyLock::new(AtomicDatabase::default);

fn main() {
    let mut rl = DefaultEditor::new().unwrap();
    while let Ok(formula) = rl.readline("Formula: ") {
        rl.add_history_entry(&formula).unwrap();
        match formula_info(&formula) {
            Ok(info) => print!("{info}"),
            Err(diagnostic) => render_error(*diagnostic),
        }
    }
}

fn formula_info(formula: &str) -> Result<String> {
    let mut buf = String::new();
    let composition = ChemicalComposition::new(&DB, formula)?;

    let mono_mass = composition.monoisotopic_mass();
    let avg_mass = composition.average_mass();

    writeln!(buf, "Composition: {composition}").unwrap();
    writeln!(buf, "Monoisotopic Mass: {}", decimal_round_workaround(mono_mass, 6)).unwrap();
    writeln!(buf, "Average Mass: {}", decimal_round_workaround(avg_mass, 4)).unwrap();
    writeln!(buf).unwrap();

    Ok(buf)
}

fn render_error(diagnostic: impl Into<Box<dyn Diagnostic + 'static>>) {
    let mut buf = String::new();
    GraphicalReportHandler::new_themed(GraphicalTheme::unicode())
        .render_report(&mut buf, diagnostic.into().as_ref())
        .unwrap();
    println!("{buf}");
}

// FIXME: Really this should be fixed in `rust_decimal`...
fn decimal_round_workaround(value: impl Into<Decimal>, decimal_points: u32) -> String {
    let value = value.into().round_dp(decimal_points);
    format!("{value}")
}
