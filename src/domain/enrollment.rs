use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::{
    fee::{round_money, FeeBreakdown, TaxableFee},
    plan::{BillingPeriod, ContractTerm, ContractType, Plan, TerminationFeePolicy},
    voucher::{
        Discount, RedemptionContext, Voucher, VoucherRedemption, VoucherRejection, VoucherUsage,
    },
    LocalizedText, ValidationError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeKind {
    Membership,
    Administration,
    Join,
}

/// One line of the fee breakdown
///
/// Lines that do not apply carry zero amounts and are excluded from totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeLine {
    pub kind: FeeKind,
    pub label: LocalizedText,
    pub net: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub gross: Decimal,
    pub applicable: bool,
}

impl FeeLine {
    fn build(kind: FeeKind, label: LocalizedText, fee: &TaxableFee, applicable: bool) -> Self {
        if !applicable || fee.is_zero() {
            let zero = FeeBreakdown::zero();
            return Self {
                kind,
                label,
                net: zero.net,
                tax_rate: round_money(Decimal::ZERO),
                tax_amount: zero.tax_amount,
                gross: zero.gross,
                applicable: false,
            };
        }

        let breakdown = fee.breakdown();
        Self {
            kind,
            label,
            net: breakdown.net,
            tax_rate: round_money(fee.tax_rate()),
            tax_amount: breakdown.tax_amount,
            gross: breakdown.gross,
            applicable: true,
        }
    }
}

/// Contract metadata shown to the member before they commit
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSummary {
    pub contract_type: ContractType,
    pub contract_term: ContractTerm,
    /// Minimum commitment of the plan's contract policy
    pub commitment_months: u32,
    /// Months the requested term binds the member for, 0 for month-to-month
    pub term_months: u32,
    pub cooling_off_days: u32,
    pub notice_period_days: u32,
    pub early_termination_fee: TerminationFeePolicy,
}

/// Quote of fees, taxes, discounts and total due for joining a plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentPreview {
    pub plan_id: Uuid,
    pub plan_name: LocalizedText,
    pub currency: String,
    pub billing_period: BillingPeriod,
    pub duration_days: u32,
    pub membership_fee: FeeLine,
    pub administration_fee: FeeLine,
    pub join_fee: FeeLine,
    pub subtotal: Decimal,
    pub vat_total: Decimal,
    /// Discount actually applied, set whenever a voucher or discount was supplied
    pub discount_amount: Option<Decimal>,
    /// Whether the requested discount exceeded the amount due and was capped
    pub discount_clamped: bool,
    pub voucher: Option<VoucherRedemption>,
    pub grand_total: Decimal,
    pub contract: ContractSummary,
    pub is_first_subscription: bool,
}

impl EnrollmentPreview {
    pub fn free_trial_days(&self) -> u32 {
        self.voucher
            .as_ref()
            .map_or(0, |voucher| voucher.free_trial_days)
    }

    pub fn fee_lines(&self) -> [&FeeLine; 3] {
        [&self.membership_fee, &self.administration_fee, &self.join_fee]
    }
}

/// Voucher resolved from the catalog along with its redemption history
pub struct VoucherCandidate<'a> {
    pub voucher: &'a Voucher,
    pub usage: VoucherUsage,
}

pub struct PricingInput<'a> {
    pub plan: &'a Plan,
    pub contract_term: ContractTerm,
    pub first_subscription: bool,
    pub voucher: Option<VoucherCandidate<'a>>,
    pub discount: Option<Discount>,
    /// Date voucher validity windows are checked against
    pub today: NaiveDate,
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("voucher rejected: {0}")]
    Voucher(#[from] VoucherRejection),
}

/// Price an enrollment into a plan
///
/// This is a pure function of its input: the same input always produces the same preview.
pub fn price_enrollment(input: &PricingInput<'_>) -> Result<EnrollmentPreview, PricingError> {
    let plan = input.plan;
    let pricing = &plan.pricing;
    let currency = pricing.currency()?.to_string();
    let duration_days = pricing.effective_duration_days()?;
    let term_months = plan.contract.term_months(input.contract_term)?;

    let membership_fee = FeeLine::build(
        FeeKind::Membership,
        LocalizedText {
            en: format!("Membership Fee - {}", plan.name.en),
            ar: Some(match &plan.name.ar {
                Some(name) => format!("رسوم العضوية - {name}"),
                None => "رسوم العضوية".to_string(),
            }),
        },
        &pricing.membership_fee,
        true,
    );
    let administration_fee = FeeLine::build(
        FeeKind::Administration,
        LocalizedText::bilingual("Administration Fee", "رسوم إدارية"),
        &pricing.administration_fee,
        true,
    );
    let join_fee = FeeLine::build(
        FeeKind::Join,
        LocalizedText::bilingual("Joining Fee (One-time)", "رسوم الانضمام (مرة واحدة)"),
        &pricing.join_fee,
        input.first_subscription,
    );

    let lines = [&membership_fee, &administration_fee, &join_fee];
    let subtotal = round_money(
        lines
            .iter()
            .filter(|line| line.applicable)
            .map(|line| line.net)
            .sum(),
    );
    let vat_total = round_money(
        lines
            .iter()
            .filter(|line| line.applicable)
            .map(|line| line.tax_amount)
            .sum(),
    );
    let amount_due = subtotal + vat_total;

    let voucher = input
        .voucher
        .as_ref()
        .map(|candidate| {
            candidate.voucher.redeem(&RedemptionContext {
                plan_id: plan.id,
                subtotal,
                first_subscription: input.first_subscription,
                usage: candidate.usage,
                today: input.today,
            })
        })
        .transpose()?;
    let staff_discount = input
        .discount
        .map(|discount| discount.resolve(subtotal))
        .transpose()?;

    let (discount_amount, discount_clamped) = match (&voucher, staff_discount) {
        (None, None) => (None, false),
        (voucher, staff) => {
            let requested = voucher
                .as_ref()
                .map_or(Decimal::ZERO, |voucher| voucher.discount_amount)
                + staff.unwrap_or(Decimal::ZERO);
            if requested > amount_due {
                (Some(round_money(amount_due)), true)
            } else {
                (Some(round_money(requested)), false)
            }
        }
    };
    let grand_total =
        round_money((amount_due - discount_amount.unwrap_or(Decimal::ZERO)).max(Decimal::ZERO));

    Ok(EnrollmentPreview {
        plan_id: plan.id,
        plan_name: plan.name.clone(),
        currency,
        billing_period: pricing.billing_period,
        duration_days,
        membership_fee,
        administration_fee,
        join_fee,
        subtotal,
        vat_total,
        discount_amount,
        discount_clamped,
        voucher,
        grand_total,
        contract: ContractSummary {
            contract_type: plan.contract.contract_type,
            contract_term: input.contract_term,
            commitment_months: plan.contract.commitment_months,
            term_months,
            cooling_off_days: plan.contract.cooling_off_days,
            notice_period_days: plan.contract.notice_period_days,
            early_termination_fee: plan.contract.early_termination_fee,
        },
        is_first_subscription: input.first_subscription,
    })
}
