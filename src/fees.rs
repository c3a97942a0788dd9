use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use crate::domain::{AccountId, AmountError, Error};

/// Fee and transfer-limit configuration. Loaded once at startup and immutable
/// afterwards; changing it never retroactively affects settled entries.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeeConfig {
    /// Fraction of the nominal amount charged as a fee, in `[0, 1)`.
    pub fee_percent: Decimal,
    pub min_transfer: Decimal,
    pub max_transfer: Decimal,
    pub decimal_places: u32,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fee_percent: Decimal::new(2, 2),  // 2%
            min_transfer: Decimal::new(1, 2), // 0.01 hours
            max_transfer: Decimal::from(1000),
            decimal_places: 2,
        }
    }
}

impl FeeConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.fee_percent < Decimal::ZERO || self.fee_percent >= Decimal::ONE {
            return Err(Error::Config(format!(
                "fee_percent must be in [0, 1), got {}",
                self.fee_percent
            )));
        }
        if self.min_transfer <= Decimal::ZERO {
            return Err(Error::Config(format!(
                "min_transfer must be positive, got {}",
                self.min_transfer
            )));
        }
        if self.max_transfer <= self.min_transfer {
            return Err(Error::Config(format!(
                "max_transfer ({}) must exceed min_transfer ({})",
                self.max_transfer, self.min_transfer
            )));
        }
        if self.decimal_places > 28 {
            return Err(Error::Config(format!(
                "decimal_places must be at most 28, got {}",
                self.decimal_places
            )));
        }
        Ok(())
    }
}

/// Full ledger configuration: fee policy plus the platform account that
/// collects fees and the balance new accounts are seeded with.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub fees: FeeConfig,
    pub platform_account: AccountId,
    pub starting_balance: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            fees: FeeConfig::default(),
            platform_account: AccountId::new("timebank"),
            starting_balance: Decimal::from(10),
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.fees.validate()?;
        if self.platform_account.as_str().is_empty() {
            return Err(Error::Config("platform_account must not be empty".to_string()));
        }
        if self.starting_balance < Decimal::ZERO {
            return Err(Error::Config(format!(
                "starting_balance must not be negative, got {}",
                self.starting_balance
            )));
        }
        Ok(())
    }
}

/// Result of a fee quote for one nominal transfer amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub transfer_amount: Decimal,
    pub fee_amount: Decimal,
    pub total_amount: Decimal,
    pub fee_percent: Decimal,
}

/// Pure fee calculation. No side effects; a function of its inputs and the
/// immutable configuration only.
#[derive(Debug, Clone)]
pub struct FeePolicy {
    config: FeeConfig,
}

impl FeePolicy {
    pub fn new(config: FeeConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Rounds half-up at the configured precision.
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(
            self.config.decimal_places,
            RoundingStrategy::MidpointAwayFromZero,
        )
    }

    /// Fee and total debit for a nominal amount. The amount is rounded to the
    /// configured precision before the fee is computed on it.
    pub fn quote(&self, amount: Decimal) -> FeeBreakdown {
        let transfer_amount = self.round(amount);
        let fee_amount = self.round(transfer_amount * self.config.fee_percent);
        FeeBreakdown {
            transfer_amount,
            fee_amount,
            total_amount: transfer_amount + fee_amount,
            fee_percent: self.config.fee_percent,
        }
    }

    /// Transfer amounts must lie in `[min_transfer, max_transfer]` inclusive.
    pub fn validate_amount(&self, amount: Decimal) -> Result<(), Error> {
        if amount < self.config.min_transfer {
            return Err(Error::InvalidAmount(AmountError::BelowMinimum {
                min: self.config.min_transfer,
            }));
        }
        if amount > self.config.max_transfer {
            return Err(Error::InvalidAmount(AmountError::AboveMaximum {
                max: self.config.max_transfer,
            }));
        }
        Ok(())
    }

    /// Admin adjustments respect the minimum unit but not the transfer cap.
    pub fn validate_adjustment(&self, amount: Decimal) -> Result<(), Error> {
        if amount < self.config.min_transfer {
            return Err(Error::InvalidAmount(AmountError::BelowMinimum {
                min: self.config.min_transfer,
            }));
        }
        Ok(())
    }
}
