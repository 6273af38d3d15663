//! Per-sandwich analysis and page level summaries.

use rust_decimal::Decimal;
use sandwich_lab_models::Sandwich;
use serde::{Deserialize, Serialize};

use crate::profit::{attacker_base_profit, attacker_quote_profit, gas_cost};

/// Derived figures for one sandwich.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandwichAnalysis {
    /// Attacker profit in the base asset.
    pub base_profit: Decimal,
    /// Attacker profit in the quote asset.
    pub quote_profit: Decimal,
    /// Gas used by frontrun and backrun, in gas units.
    pub gas_cost: u64,
    /// Number of victim trades.
    pub victim_count: usize,
}

impl SandwichAnalysis {
    /// True when the attacker ended up ahead in either asset without losing in the other.
    pub fn is_profitable(&self) -> bool {
        let gained = self.base_profit > Decimal::ZERO || self.quote_profit > Decimal::ZERO;
        let lost = self.base_profit < Decimal::ZERO || self.quote_profit < Decimal::ZERO;
        gained && !lost
    }
}

/// Totals across a set of sandwiches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitSummary {
    pub count: usize,
    pub profitable_count: usize,
    pub victim_count: usize,
    pub base_profit: Decimal,
    pub quote_profit: Decimal,
    pub gas_cost: u64,
}

/// Analyzer deriving profit figures from sandwiches.
pub struct SandwichAnalyzer;

impl SandwichAnalyzer {
    /// Analyze a single sandwich.
    pub fn analyze(sandwich: &Sandwich) -> SandwichAnalysis {
        SandwichAnalysis {
            base_profit: attacker_base_profit(sandwich),
            quote_profit: attacker_quote_profit(sandwich),
            gas_cost: gas_cost(sandwich),
            victim_count: sandwich.victim_count(),
        }
    }

    /// Sum the analysis of every sandwich in `sandwiches`.
    pub fn summarize<'a, I>(sandwiches: I) -> ProfitSummary
    where
        I: IntoIterator<Item = &'a Sandwich>,
    {
        sandwiches
            .into_iter()
            .map(Self::analyze)
            .fold(ProfitSummary::default(), |mut summary, analysis| {
                summary.count += 1;
                if analysis.is_profitable() {
                    summary.profitable_count += 1;
                }
                summary.victim_count += analysis.victim_count;
                summary.base_profit += analysis.base_profit;
                summary.quote_profit += analysis.quote_profit;
                summary.gas_cost = summary.gas_cost.saturating_add(analysis.gas_cost);
                summary
            })
    }
}
