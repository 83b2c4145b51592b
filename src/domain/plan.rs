use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{fee::TaxableFee, LocalizedText, ValidationError};

/// Days during which a new contract can be cancelled without penalty
pub const DEFAULT_COOLING_OFF_DAYS: u32 = 7;
pub const DEFAULT_NOTICE_PERIOD_DAYS: u32 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingPeriod {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
    OneTime,
}

impl BillingPeriod {
    /// Default length of one period, in days
    ///
    /// One-time plans have no natural length and must carry an explicit duration.
    pub fn default_days(&self) -> Option<u32> {
        match self {
            BillingPeriod::Daily => Some(1),
            BillingPeriod::Weekly => Some(7),
            BillingPeriod::Biweekly => Some(14),
            BillingPeriod::Monthly => Some(30),
            BillingPeriod::Quarterly => Some(90),
            BillingPeriod::Yearly => Some(365),
            BillingPeriod::OneTime => None,
        }
    }
}

/// Static pricing terms of a membership plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPricing {
    pub membership_fee: TaxableFee,
    /// A zero administration fee means the plan waives it
    pub administration_fee: TaxableFee,
    /// One-time fee charged on a member's first subscription
    pub join_fee: TaxableFee,
    pub billing_period: BillingPeriod,
    #[serde(default)]
    pub duration_days: Option<u32>,
}

impl PlanPricing {
    /// Currency shared by all the fees of the plan
    pub fn currency(&self) -> Result<&str, ValidationError> {
        let currency = self.membership_fee.currency();
        for fee in [&self.administration_fee, &self.join_fee] {
            if fee.currency() != currency {
                return Err(ValidationError::new(format!(
                    "plan fees mix currencies: {} and {}",
                    currency,
                    fee.currency()
                )));
            }
        }
        Ok(currency)
    }

    pub fn effective_duration_days(&self) -> Result<u32, ValidationError> {
        match self.duration_days {
            Some(0) => Err(ValidationError::new("plan duration must be at least one day")),
            Some(days) => Ok(days),
            None => self.billing_period.default_days().ok_or_else(|| {
                ValidationError::new("one-time plans require an explicit duration")
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractType {
    #[default]
    MonthToMonth,
    FixedTerm,
}

/// Contract length requested at enrollment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractTerm {
    #[default]
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
}

impl ContractTerm {
    pub fn months(&self) -> u32 {
        match self {
            ContractTerm::Monthly => 1,
            ContractTerm::Quarterly => 3,
            ContractTerm::SemiAnnual => 6,
            ContractTerm::Annual => 12,
        }
    }
}

/// Fee charged when a member leaves during the commitment period
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationFeePolicy {
    None,
    /// Fixed amount
    FlatFee(Decimal),
    /// Gross monthly membership fee for every remaining commitment month
    #[default]
    RemainingMonths,
    /// Percentage of the remaining commitment value
    Percentage(Decimal),
}

/// Contractual terms attached to a plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContractTerms {
    pub contract_type: ContractType,
    /// Minimum commitment for fixed-term contracts
    pub commitment_months: u32,
    pub notice_period_days: u32,
    pub cooling_off_days: u32,
    pub early_termination_fee: TerminationFeePolicy,
}

impl Default for ContractTerms {
    fn default() -> Self {
        Self {
            contract_type: ContractType::MonthToMonth,
            commitment_months: 0,
            notice_period_days: DEFAULT_NOTICE_PERIOD_DAYS,
            cooling_off_days: DEFAULT_COOLING_OFF_DAYS,
            early_termination_fee: TerminationFeePolicy::default(),
        }
    }
}

impl ContractTerms {
    /// Months a contract under the requested term binds the member for
    ///
    /// Month-to-month contracts bind for 0 months. Fixed-term contracts bind for the whole
    /// term, which must cover the plan's minimum commitment.
    pub fn term_months(&self, term: ContractTerm) -> Result<u32, ValidationError> {
        match self.contract_type {
            ContractType::MonthToMonth => Ok(0),
            ContractType::FixedTerm => {
                let months = term.months();
                if months < self.commitment_months {
                    return Err(ValidationError::new(format!(
                        "contract term of {months} month(s) is shorter than the plan's {} \
                         month commitment",
                        self.commitment_months
                    )));
                }
                Ok(months)
            }
        }
    }
}

/// Membership plan as resolved from the plan catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    pub name: LocalizedText,
    #[serde(default = "active_by_default")]
    pub active: bool,
    #[serde(default)]
    pub available_from: Option<NaiveDate>,
    #[serde(default)]
    pub available_until: Option<NaiveDate>,
    #[serde(default)]
    pub minimum_age: Option<u32>,
    #[serde(default)]
    pub maximum_age: Option<u32>,
    pub pricing: PlanPricing,
    #[serde(default)]
    pub contract: ContractTerms,
}

fn active_by_default() -> bool {
    true
}

impl Plan {
    /// Whether the plan can be sold on the given date
    pub fn is_available_on(&self, date: NaiveDate) -> bool {
        let started = self.available_from.map_or(true, |from| from <= date);
        let not_ended = self.available_until.map_or(true, |until| date <= until);
        started && not_ended
    }

    pub fn has_age_restriction(&self) -> bool {
        self.minimum_age.is_some() || self.maximum_age.is_some()
    }

    pub fn is_age_eligible(&self, age: u32) -> bool {
        self.minimum_age.map_or(true, |min| age >= min)
            && self.maximum_age.map_or(true, |max| age <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use rust_decimal_macros::dec;
    use speculoos::prelude::*;

    fn pricing(billing_period: BillingPeriod, duration_days: Option<u32>) -> PlanPricing {
        PlanPricing {
            membership_fee: TaxableFee::new(dec!(200), "SAR", dec!(15)).unwrap(),
            administration_fee: TaxableFee::new(dec!(50), "SAR", dec!(15)).unwrap(),
            join_fee: TaxableFee::new(dec!(100), "SAR", dec!(15)).unwrap(),
            billing_period,
            duration_days,
        }
    }

    #[rstest]
    #[case(BillingPeriod::Daily, None, 1)]
    #[case(BillingPeriod::Weekly, None, 7)]
    #[case(BillingPeriod::Biweekly, None, 14)]
    #[case(BillingPeriod::Monthly, None, 30)]
    #[case(BillingPeriod::Quarterly, None, 90)]
    #[case(BillingPeriod::Yearly, None, 365)]
    #[case(BillingPeriod::Monthly, Some(31), 31)]
    #[case(BillingPeriod::OneTime, Some(10), 10)]
    fn test_effective_duration_days(
        #[case] billing_period: BillingPeriod,
        #[case] duration_days: Option<u32>,
        #[case] expected: u32,
    ) {
        let res = pricing(billing_period, duration_days).effective_duration_days();

        assert_that!(res).is_ok().is_equal_to(expected);
    }

    #[rstest]
    #[case(BillingPeriod::OneTime, None)]
    #[case(BillingPeriod::Monthly, Some(0))]
    fn test_effective_duration_days_invalid(
        #[case] billing_period: BillingPeriod,
        #[case] duration_days: Option<u32>,
    ) {
        assert_that!(pricing(billing_period, duration_days).effective_duration_days()).is_err();
    }

    #[test]
    fn test_currency_mismatch() {
        let mut pricing = pricing(BillingPeriod::Monthly, None);
        assert_that!(pricing.currency()).is_ok().is_equal_to("SAR");

        pricing.join_fee = TaxableFee::new(dec!(100), "USD", dec!(0)).unwrap();
        assert_that!(pricing.currency()).is_err();
    }

    #[rstest]
    #[case(ContractTerm::Monthly, 0)]
    #[case(ContractTerm::Annual, 0)]
    fn test_month_to_month_has_no_commitment(#[case] term: ContractTerm, #[case] expected: u32) {
        let terms = ContractTerms::default();

        assert_that!(terms.term_months(term))
            .is_ok()
            .is_equal_to(expected);
    }

    #[test]
    fn test_fixed_term_months() {
        let terms = ContractTerms {
            contract_type: ContractType::FixedTerm,
            commitment_months: 6,
            ..ContractTerms::default()
        };

        assert_that!(terms.term_months(ContractTerm::Annual))
            .is_ok()
            .is_equal_to(12);
        assert_that!(terms.term_months(ContractTerm::SemiAnnual))
            .is_ok()
            .is_equal_to(6);
        assert_that!(terms.term_months(ContractTerm::Quarterly)).is_err();
    }

    #[test]
    fn test_availability_and_age() {
        let plan = Plan {
            id: Uuid::new_v4(),
            name: LocalizedText::new("Gold"),
            active: true,
            available_from: NaiveDate::from_ymd_opt(2026, 1, 1),
            available_until: NaiveDate::from_ymd_opt(2026, 12, 31),
            minimum_age: Some(16),
            maximum_age: None,
            pricing: pricing(BillingPeriod::Monthly, None),
            contract: ContractTerms::default(),
        };

        assert_that!(plan.is_available_on(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap())).is_true();
        assert_that!(plan.is_available_on(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()))
            .is_false();
        assert_that!(plan.is_available_on(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap())).is_false();
        assert_that!(plan.has_age_restriction()).is_true();
        assert_that!(plan.is_age_eligible(15)).is_false();
        assert_that!(plan.is_age_eligible(16)).is_true();
    }

    #[test]
    fn test_contract_terms_deserialize_defaults() {
        let terms: ContractTerms = serde_json::from_str(
            r#"{
                "contractType": "FIXED_TERM",
                "commitmentMonths": 12,
                "earlyTerminationFee": {"type": "FLAT_FEE", "value": "150"}
            }"#,
        )
        .unwrap();

        assert_that!(terms.contract_type).is_equal_to(ContractType::FixedTerm);
        assert_that!(terms.cooling_off_days).is_equal_to(DEFAULT_COOLING_OFF_DAYS);
        assert_that!(terms.notice_period_days).is_equal_to(DEFAULT_NOTICE_PERIOD_DAYS);
        assert_that!(terms.early_termination_fee)
            .is_equal_to(TerminationFeePolicy::FlatFee(dec!(150)));
    }
}
