//! Attacker profit derived from the frontrun and backrun legs.
//!
//! Victim (lunchmeat) legs never enter these figures, and gas is reported
//! on its own rather than netted out of either asset.

use rust_decimal::Decimal;
use sandwich_lab_models::Sandwich;

/// Net base-asset profit of the attacker.
///
/// Sums the round trip bought on the frontrun and sold on the backrun with
/// the opposite round trip, so legs that trade through different base/quote
/// proportions still net correctly.
pub fn attacker_base_profit(sandwich: &Sandwich) -> Decimal {
    let front = &sandwich.frontrun;
    let back = &sandwich.backrun;
    (back.base_out - front.base_in) + (front.base_out - back.base_in)
}

/// Net quote-asset profit of the attacker.
pub fn attacker_quote_profit(sandwich: &Sandwich) -> Decimal {
    let front = &sandwich.frontrun;
    let back = &sandwich.backrun;
    (back.quote_out - front.quote_in) + (front.quote_out - back.quote_in)
}

/// Gas burned by the attacker's two legs.
pub fn gas_cost(sandwich: &Sandwich) -> u64 {
    sandwich.frontrun.gas.saturating_add(sandwich.backrun.gas)
}
