//! Swap, sandwich and token metadata types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Validation failures for domain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("swap at index {index} has no transaction hash")]
    MissingHash { index: u64 },
    #[error("negative {field} amount in {hash}")]
    NegativeAmount { hash: String, field: &'static str },
    #[error("block number must be positive")]
    ZeroBlock,
    #[error("swap ordering violated in block {block_number}: index {index} after {previous}")]
    Ordering {
        block_number: u64,
        previous: u64,
        index: u64,
    },
}

/// One on-chain trade leg against the scanned pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swap {
    pub hash: String,
    /// Position of the transaction within its block.
    pub index: u64,
    pub base_in: Decimal,
    pub quote_in: Decimal,
    pub base_out: Decimal,
    pub quote_out: Decimal,
    pub gas: u64,
}

impl Swap {
    /// Check that the hash is present and every amount is a non-negative magnitude.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.hash.trim().is_empty() {
            return Err(ModelError::MissingHash { index: self.index });
        }

        let amounts = [
            ("base_in", self.base_in),
            ("quote_in", self.quote_in),
            ("base_out", self.base_out),
            ("quote_out", self.quote_out),
        ];
        for (field, amount) in amounts {
            if amount.is_sign_negative() && !amount.is_zero() {
                return Err(ModelError::NegativeAmount {
                    hash: self.hash.clone(),
                    field,
                });
            }
        }

        Ok(())
    }

    /// True if the hash is `0x` followed by 32 bytes of hex.
    pub fn has_canonical_hash(&self) -> bool {
        self.hash
            .strip_prefix("0x")
            .and_then(|digits| hex::decode(digits).ok())
            .is_some_and(|bytes| bytes.len() == 32)
    }
}

/// A detected attack: frontrun, zero or more victim trades, backrun.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sandwich {
    pub block_number: u64,
    pub frontrun: Swap,
    /// Victim trades in execution order.
    #[serde(default)]
    pub lunchmeat: Vec<Swap>,
    pub backrun: Swap,
}

impl Sandwich {
    /// Build a sandwich, rejecting it if any leg is invalid or out of order.
    pub fn new(
        block_number: u64,
        frontrun: Swap,
        lunchmeat: Vec<Swap>,
        backrun: Swap,
    ) -> Result<Self, ModelError> {
        let sandwich = Self {
            block_number,
            frontrun,
            lunchmeat,
            backrun,
        };
        sandwich.validate()?;
        Ok(sandwich)
    }

    /// Check every leg and the `frontrun < lunchmeat < backrun` index order.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.block_number == 0 {
            return Err(ModelError::ZeroBlock);
        }

        let mut previous = self.frontrun.index;
        self.frontrun.validate()?;
        for swap in self.lunchmeat.iter().chain(std::iter::once(&self.backrun)) {
            swap.validate()?;
            if swap.index <= previous {
                return Err(ModelError::Ordering {
                    block_number: self.block_number,
                    previous,
                    index: swap.index,
                });
            }
            previous = swap.index;
        }

        Ok(())
    }

    /// Every leg in execution order.
    pub fn swaps(&self) -> impl Iterator<Item = &Swap> {
        std::iter::once(&self.frontrun)
            .chain(&self.lunchmeat)
            .chain(std::iter::once(&self.backrun))
    }

    /// Number of victim trades caught between the attacker's legs.
    pub fn victim_count(&self) -> usize {
        self.lunchmeat.len()
    }
}

/// Display symbols for the scanned pair and the chain's gas token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub base_symbol: String,
    pub quote_symbol: String,
    pub native_symbol: String,
}
