pub mod equation;
pub mod errors;
pub mod fragment_formula;
pub mod hydroxy;
pub mod rule_file;
