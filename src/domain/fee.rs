use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Number of decimal places kept on every monetary amount
pub const MONEY_SCALE: u32 = 2;

/// Round a monetary amount half-up to two decimal places
///
/// `MidpointAwayFromZero` is half-up for the non-negative amounts this service deals with. The
/// result is always rescaled to two places so that `402.5` is rendered as `402.50`.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Tax and gross amounts derived from a net amount
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub net: Decimal,
    pub tax_amount: Decimal,
    pub gross: Decimal,
}

impl FeeBreakdown {
    pub fn zero() -> Self {
        Self {
            net: round_money(Decimal::ZERO),
            tax_amount: round_money(Decimal::ZERO),
            gross: round_money(Decimal::ZERO),
        }
    }
}

/// Compute the tax and gross amounts for a net amount
pub fn compute(amount: Decimal, tax_rate: Decimal) -> Result<FeeBreakdown, ValidationError> {
    validate_amount(amount)?;
    validate_tax_rate(tax_rate)?;

    // Amounts carry at most two places, so rescaling `net` is exact
    let net = round_money(amount);
    let tax_amount = round_money(amount * tax_rate / Decimal::ONE_HUNDRED);

    Ok(FeeBreakdown {
        net,
        tax_amount,
        gross: net + tax_amount,
    })
}

fn validate_amount(amount: Decimal) -> Result<(), ValidationError> {
    if amount < Decimal::ZERO {
        return Err(ValidationError::new(format!(
            "fee amount must not be negative, got {amount}"
        )));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(ValidationError::new(format!(
            "fee amount must have at most {MONEY_SCALE} decimal places, got {amount}"
        )));
    }
    Ok(())
}

fn validate_tax_rate(tax_rate: Decimal) -> Result<(), ValidationError> {
    if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new(format!(
            "tax rate must be between 0 and 100, got {tax_rate}"
        )));
    }
    Ok(())
}

/// Monetary amount with an associated tax rate
///
/// Only the net amount and the rate are stored, tax and gross amounts are derived on demand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTaxableFee", rename_all = "camelCase")]
pub struct TaxableFee {
    amount: Decimal,
    currency: String,
    /// Percentage between 0 and 100
    tax_rate: Decimal,
}

impl TaxableFee {
    pub fn new(
        amount: Decimal,
        currency: impl Into<String>,
        tax_rate: Decimal,
    ) -> Result<Self, ValidationError> {
        validate_amount(amount)?;
        validate_tax_rate(tax_rate)?;
        let currency = normalize_currency(&currency.into())?;

        Ok(Self {
            amount,
            currency,
            tax_rate,
        })
    }

    /// A zero fee, used for fees a plan does not charge
    pub fn free(currency: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Decimal::ZERO, currency, Decimal::ZERO)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn breakdown(&self) -> FeeBreakdown {
        // Both fields were validated on construction
        compute(self.amount, self.tax_rate).unwrap_or_else(|_| FeeBreakdown::zero())
    }

    pub fn tax_amount(&self) -> Decimal {
        self.breakdown().tax_amount
    }

    pub fn gross_amount(&self) -> Decimal {
        self.breakdown().gross
    }
}

/// Currency codes are three ASCII letters, stored upper-case
pub fn normalize_currency(currency: &str) -> Result<String, ValidationError> {
    let code = currency.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::new(format!(
            "currency must be a three-letter code, got '{currency}'"
        )));
    }
    Ok(code.to_ascii_uppercase())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTaxableFee {
    amount: Decimal,
    currency: String,
    #[serde(default)]
    tax_rate: Decimal,
}

impl TryFrom<RawTaxableFee> for TaxableFee {
    type Error = ValidationError;

    fn try_from(raw: RawTaxableFee) -> Result<Self, Self::Error> {
        Self::new(raw.amount, raw.currency, raw.tax_rate)
    }
}
