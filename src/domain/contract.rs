use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::{
    fee::{round_money, TaxableFee},
    plan::{ContractTerm, ContractType, TerminationFeePolicy},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    PendingSignature,
    Active,
}

/// Membership contract with locked pricing
///
/// Fees are a snapshot of the plan at signing, later plan changes do not affect them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contract {
    pub id: Uuid,
    pub contract_number: String,
    pub member_id: Uuid,
    pub plan_id: Uuid,
    pub subscription_id: Uuid,
    pub contract_type: ContractType,
    pub contract_term: ContractTerm,
    pub commitment_months: u32,
    pub notice_period_days: u32,
    pub start_date: NaiveDate,
    pub commitment_end_date: Option<NaiveDate>,
    pub cooling_off_days: u32,
    pub cooling_off_end_date: NaiveDate,
    pub locked_membership_fee: TaxableFee,
    pub locked_admin_fee: TaxableFee,
    pub locked_join_fee: TaxableFee,
    pub early_termination_fee: TerminationFeePolicy,
    pub status: ContractStatus,
}

/// Cancellation terms of a contract as they stand on a given date
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationTerms {
    pub within_cooling_off: bool,
    pub cooling_off_end_date: NaiveDate,
    pub cooling_off_days_remaining: u32,
    pub commitment_end_date: Option<NaiveDate>,
    pub commitment_months_remaining: u32,
    pub early_termination_fee: Decimal,
}

/// Terms a new contract is drawn up from
pub struct ContractDraft {
    pub member_id: Uuid,
    pub plan_id: Uuid,
    pub subscription_id: Uuid,
    pub contract_type: ContractType,
    pub contract_term: ContractTerm,
    pub commitment_months: u32,
    pub notice_period_days: u32,
    pub cooling_off_days: u32,
    pub start_date: NaiveDate,
    pub membership_fee: TaxableFee,
    pub admin_fee: TaxableFee,
    pub join_fee: TaxableFee,
    pub early_termination_fee: TerminationFeePolicy,
}

impl Contract {
    /// Build a contract pending signature
    ///
    /// The contract number is assigned by the store when the enrollment is committed.
    pub fn new(draft: ContractDraft) -> Self {
        let commitment_end_date = if draft.commitment_months > 0 {
            draft
                .start_date
                .checked_add_months(Months::new(draft.commitment_months))
        } else {
            None
        };
        let cooling_off_end_date = draft
            .start_date
            .checked_add_days(Days::new(draft.cooling_off_days.into()))
            .unwrap_or(draft.start_date);

        Self {
            id: Uuid::new_v4(),
            contract_number: String::new(),
            member_id: draft.member_id,
            plan_id: draft.plan_id,
            subscription_id: draft.subscription_id,
            contract_type: draft.contract_type,
            contract_term: draft.contract_term,
            commitment_months: draft.commitment_months,
            notice_period_days: draft.notice_period_days,
            start_date: draft.start_date,
            commitment_end_date,
            cooling_off_days: draft.cooling_off_days,
            cooling_off_end_date,
            locked_membership_fee: draft.membership_fee,
            locked_admin_fee: draft.admin_fee,
            locked_join_fee: draft.join_fee,
            early_termination_fee: draft.early_termination_fee,
            status: ContractStatus::PendingSignature,
        }
    }

    pub fn is_within_cooling_off(&self, today: NaiveDate) -> bool {
        today <= self.cooling_off_end_date
    }

    /// Days left to cancel without penalty, counting today
    pub fn cooling_off_days_remaining(&self, today: NaiveDate) -> u32 {
        if today > self.cooling_off_end_date {
            return 0;
        }
        let days = (self.cooling_off_end_date - today).num_days() + 1;
        u32::try_from(days).unwrap_or(u32::MAX)
    }

    pub fn is_within_commitment(&self, today: NaiveDate) -> bool {
        self.commitment_end_date.is_some_and(|end| today < end)
    }

    /// Whole months left before the commitment ends
    pub fn commitment_months_remaining(&self, today: NaiveDate) -> u32 {
        let Some(end) = self.commitment_end_date else {
            return 0;
        };
        let mut months = 0;
        while today
            .checked_add_months(Months::new(months + 1))
            .is_some_and(|date| date <= end)
        {
            months += 1;
        }
        months
    }

    /// Fee owed when the member terminates on `today`
    pub fn early_termination_fee(&self, today: NaiveDate) -> Decimal {
        if !self.is_within_commitment(today) {
            return round_money(Decimal::ZERO);
        }

        let remaining_value = || {
            self.locked_membership_fee.gross_amount()
                * Decimal::from(self.commitment_months_remaining(today))
        };

        let fee = match self.early_termination_fee {
            TerminationFeePolicy::None => Decimal::ZERO,
            TerminationFeePolicy::FlatFee(value) => value,
            TerminationFeePolicy::RemainingMonths => remaining_value(),
            TerminationFeePolicy::Percentage(percent) => {
                remaining_value() * percent / Decimal::ONE_HUNDRED
            }
        };
        round_money(fee)
    }

    pub fn cancellation_terms(&self, today: NaiveDate) -> CancellationTerms {
        CancellationTerms {
            within_cooling_off: self.is_within_cooling_off(today),
            cooling_off_end_date: self.cooling_off_end_date,
            cooling_off_days_remaining: self.cooling_off_days_remaining(today),
            commitment_end_date: self.commitment_end_date,
            commitment_months_remaining: self.commitment_months_remaining(today),
            early_termination_fee: self.early_termination_fee(today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use rust_decimal_macros::dec;
    use speculoos::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract(commitment_months: u32, early_termination_fee: TerminationFeePolicy) -> Contract {
        Contract::new(ContractDraft {
            member_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            subscription_id: Uuid::new_v4(),
            contract_type: ContractType::FixedTerm,
            contract_term: ContractTerm::Annual,
            commitment_months,
            notice_period_days: 30,
            cooling_off_days: 7,
            start_date: date(2026, 1, 15),
            membership_fee: TaxableFee::new(dec!(200), "SAR", dec!(15)).unwrap(),
            admin_fee: TaxableFee::free("SAR").unwrap(),
            join_fee: TaxableFee::free("SAR").unwrap(),
            early_termination_fee,
        })
    }

    #[test]
    fn test_new_derives_dates() {
        let contract = contract(12, TerminationFeePolicy::None);

        assert_that!(contract.commitment_end_date).is_equal_to(Some(date(2027, 1, 15)));
        assert_that!(contract.cooling_off_end_date).is_equal_to(date(2026, 1, 22));
        assert_that!(contract.status).is_equal_to(ContractStatus::PendingSignature);
    }

    #[test]
    fn test_no_commitment() {
        let contract = contract(0, TerminationFeePolicy::RemainingMonths);

        assert_that!(contract.commitment_end_date).is_none();
        assert_that!(contract.is_within_commitment(date(2026, 2, 1))).is_false();
        assert_that!(contract.early_termination_fee(date(2026, 2, 1))).is_equal_to(dec!(0.00));
    }

    #[rstest]
    #[case(date(2026, 1, 15), true, 8)]
    #[case(date(2026, 1, 22), true, 1)]
    #[case(date(2026, 1, 23), false, 0)]
    fn test_cooling_off(#[case] today: NaiveDate, #[case] within: bool, #[case] remaining: u32) {
        let contract = contract(12, TerminationFeePolicy::None);

        assert_that!(contract.is_within_cooling_off(today)).is_equal_to(within);
        assert_that!(contract.cooling_off_days_remaining(today)).is_equal_to(remaining);
    }

    #[rstest]
    #[case(date(2026, 1, 15), 12)]
    #[case(date(2026, 7, 15), 6)]
    #[case(date(2026, 7, 16), 5)]
    #[case(date(2027, 1, 15), 0)]
    fn test_commitment_months_remaining(#[case] today: NaiveDate, #[case] expected: u32) {
        let contract = contract(12, TerminationFeePolicy::None);

        assert_that!(contract.commitment_months_remaining(today)).is_equal_to(expected);
    }

    #[rstest]
    #[case(TerminationFeePolicy::None, dec!(0.00))]
    #[case(TerminationFeePolicy::FlatFee(dec!(150)), dec!(150.00))]
    // 6 months left at 230 gross per month
    #[case(TerminationFeePolicy::RemainingMonths, dec!(1380.00))]
    #[case(TerminationFeePolicy::Percentage(dec!(50)), dec!(690.00))]
    fn test_early_termination_fee(
        #[case] policy: TerminationFeePolicy,
        #[case] expected: Decimal,
    ) {
        let contract = contract(12, policy);

        assert_that!(contract.early_termination_fee(date(2026, 7, 15))).is_equal_to(expected);
    }

    #[test]
    fn test_cancellation_terms() {
        let contract = contract(12, TerminationFeePolicy::FlatFee(dec!(150)));

        let terms = contract.cancellation_terms(date(2026, 1, 20));

        assert_that!(terms).is_equal_to(CancellationTerms {
            within_cooling_off: true,
            cooling_off_end_date: date(2026, 1, 22),
            cooling_off_days_remaining: 3,
            commitment_end_date: Some(date(2027, 1, 15)),
            commitment_months_remaining: 11,
            early_termination_fee: dec!(150.00),
        });
    }
}
