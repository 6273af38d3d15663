//! Profit and gas analysis for detected sandwiches.

pub mod profit;
pub mod analyzer;

pub use analyzer::{ProfitSummary, SandwichAnalysis, SandwichAnalyzer};
