use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{fee::round_money, ValidationError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    Percentage,
    FixedAmount,
}

/// Discount granted by staff at enrollment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub value: Decimal,
}

impl Discount {
    /// Amount taken off the given subtotal
    pub fn resolve(&self, subtotal: Decimal) -> Result<Decimal, ValidationError> {
        if self.value < Decimal::ZERO {
            return Err(ValidationError::new("discount value must not be negative"));
        }
        match self.kind {
            DiscountKind::Percentage => percentage_of(subtotal, self.value),
            DiscountKind::FixedAmount => Ok(round_money(self.value)),
        }
    }
}

fn percentage_of(amount: Decimal, percent: Decimal) -> Result<Decimal, ValidationError> {
    if percent > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new(format!(
            "discount percentage must not exceed 100, got {percent}"
        )));
    }
    Ok(round_money(amount * percent / Decimal::ONE_HUNDRED))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherKind {
    Percentage(Decimal),
    FixedAmount(Decimal),
    /// Free days added to the first subscription, no price reduction
    FreeTrial(u32),
}

/// Promotional voucher as stored in the voucher catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    pub id: Uuid,
    pub code: String,
    #[serde(default = "active_by_default")]
    pub active: bool,
    pub kind: VoucherKind,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    /// Total number of redemptions allowed across all members
    #[serde(default)]
    pub max_uses: Option<u32>,
    #[serde(default = "one_use_per_member")]
    pub max_uses_per_member: u32,
    #[serde(default)]
    pub first_time_member_only: bool,
    #[serde(default)]
    pub minimum_purchase: Option<Decimal>,
    /// Plans the voucher applies to, empty for all plans
    #[serde(default)]
    pub applicable_plan_ids: Vec<Uuid>,
}

fn active_by_default() -> bool {
    true
}

fn one_use_per_member() -> u32 {
    1
}

/// Number of times a voucher was already redeemed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoucherUsage {
    pub total: u32,
    pub by_member: u32,
}

/// Everything a voucher's rules are checked against
#[derive(Clone, Copy, Debug)]
pub struct RedemptionContext {
    pub plan_id: Uuid,
    pub subtotal: Decimal,
    pub first_subscription: bool,
    pub usage: VoucherUsage,
    pub today: NaiveDate,
}

/// Outcome of a successful voucher check
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherRedemption {
    pub voucher_id: Uuid,
    pub code: String,
    pub discount_amount: Decimal,
    pub free_trial_days: u32,
    /// Limits checked again by the store when the redemption is committed
    #[serde(skip)]
    pub max_uses: Option<u32>,
    #[serde(skip)]
    pub max_uses_per_member: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VoucherRejection {
    #[error("voucher is inactive")]
    Inactive,
    #[error("voucher is not valid yet")]
    NotYetValid,
    #[error("voucher has expired")]
    Expired,
    #[error("voucher usage limit reached")]
    LimitReached,
    #[error("voucher already used by this member")]
    MemberLimitReached,
    #[error("voucher is reserved for first-time members")]
    FirstTimeOnly,
    #[error("purchase amount is below the voucher minimum")]
    MinimumNotMet,
    #[error("voucher does not apply to this plan")]
    NotApplicablePlan,
}

impl VoucherRejection {
    pub fn code(&self) -> &'static str {
        match self {
            VoucherRejection::Inactive => "INACTIVE",
            VoucherRejection::NotYetValid => "NOT_YET_VALID",
            VoucherRejection::Expired => "EXPIRED",
            VoucherRejection::LimitReached => "LIMIT_REACHED",
            VoucherRejection::MemberLimitReached => "MEMBER_LIMIT_REACHED",
            VoucherRejection::FirstTimeOnly => "FIRST_TIME_ONLY",
            VoucherRejection::MinimumNotMet => "MINIMUM_NOT_MET",
            VoucherRejection::NotApplicablePlan => "NOT_APPLICABLE_PLAN",
        }
    }

    /// Rejections caused by earlier redemptions rather than by the request itself
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            VoucherRejection::LimitReached | VoucherRejection::MemberLimitReached
        )
    }
}

/// Vouchers are looked up by upper-case, trimmed code
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

impl Voucher {
    pub fn redeem(&self, ctx: &RedemptionContext) -> Result<VoucherRedemption, VoucherRejection> {
        if !self.active {
            return Err(VoucherRejection::Inactive);
        }
        if self.valid_from.is_some_and(|from| ctx.today < from) {
            return Err(VoucherRejection::NotYetValid);
        }
        if self.valid_until.is_some_and(|until| ctx.today > until) {
            return Err(VoucherRejection::Expired);
        }
        if self.max_uses.is_some_and(|max| ctx.usage.total >= max) {
            return Err(VoucherRejection::LimitReached);
        }
        if ctx.usage.by_member >= self.max_uses_per_member {
            return Err(VoucherRejection::MemberLimitReached);
        }
        if self.first_time_member_only && !ctx.first_subscription {
            return Err(VoucherRejection::FirstTimeOnly);
        }
        if self
            .minimum_purchase
            .is_some_and(|minimum| ctx.subtotal < minimum)
        {
            return Err(VoucherRejection::MinimumNotMet);
        }
        if !self.applicable_plan_ids.is_empty() && !self.applicable_plan_ids.contains(&ctx.plan_id)
        {
            return Err(VoucherRejection::NotApplicablePlan);
        }

        let (discount_amount, free_trial_days) = match self.kind {
            // Catalog entries are trusted, out of range values are clamped
            VoucherKind::Percentage(percent) => (
                round_money(
                    ctx.subtotal * percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
                        / Decimal::ONE_HUNDRED,
                ),
                0,
            ),
            VoucherKind::FixedAmount(amount) => (round_money(amount.max(Decimal::ZERO)), 0),
            VoucherKind::FreeTrial(days) => (round_money(Decimal::ZERO), days),
        };

        Ok(VoucherRedemption {
            voucher_id: self.id,
            code: normalize_code(&self.code),
            discount_amount,
            free_trial_days,
            max_uses: self.max_uses,
            max_uses_per_member: self.max_uses_per_member,
        })
    }
}
