use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tower::Service;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::{
    domain::{
        contract::{CancellationTerms, Contract, ContractDraft},
        fee::round_money,
        plan::Plan,
        Invoice, LocalizedText, Member, MemberRecord, NewEnrollment, NewMember, Subscription,
        SubscriptionStatus,
    },
    ports::{
        database::{self, DatabasePort},
        member::MemberPort,
        notification::{EnrollmentEvent, NotificationPort},
        plan::PlanCatalogPort,
        voucher::VoucherPort,
    },
};

use super::{DomainLogic, EnrollmentTerms, Error};

/// Who is being enrolled
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemberInput {
    Existing(Uuid),
    New(NewMember),
}

pub struct EnrollRequest {
    pub terms: EnrollmentTerms,
    pub member: MemberInput,
    /// First day of the subscription, defaults to the clock's date
    pub start_date: Option<NaiveDate>,
    pub auto_renew: bool,
    pub paid_amount: Option<Decimal>,
    pub create_contract: bool,
    pub create_invoice: bool,
    /// Total the member agreed to, checked against the server-side quote
    pub expected_total: Option<Decimal>,
    pub staff_notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub member_id: Uuid,
    pub member_name: String,
    pub member_created: bool,
    pub subscription_id: Uuid,
    pub status: SubscriptionStatus,
    pub contract_id: Option<Uuid>,
    pub contract_number: Option<String>,
    pub invoice_id: Option<Uuid>,
    pub invoice_number: Option<String>,
    pub plan_name: LocalizedText,
    pub total: Decimal,
    pub paid_amount: Option<Decimal>,
    pub currency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Cancellation terms of the new contract as of the enrollment date
    pub cancellation: Option<CancellationTerms>,
}

impl<C, V, M, D, N> DomainLogic<C, V, M, D, N>
where
    C: PlanCatalogPort + Send + Sync + 'static,
    V: VoucherPort + Send + Sync + 'static,
    M: MemberPort + Send + Sync + 'static,
    D: DatabasePort + Send + Sync + 'static,
    N: NotificationPort + Send + Sync + 'static,
{
    async fn enroll(
        &self,
        req: EnrollRequest,
        today: NaiveDate,
    ) -> Result<EnrollmentResponse, Error> {
        let start_date = req.start_date.unwrap_or(today);
        if req.paid_amount.is_some_and(|paid| paid < Decimal::ZERO) {
            return Err(Error::Validation("paid amount cannot be negative".into()));
        }

        let member = match req.member {
            MemberInput::Existing(member_id) => {
                MemberRecord::Existing(self.member.get_member(member_id).await?)
            }
            MemberInput::New(new_member) => {
                new_member.validate()?;
                MemberRecord::New(new_member.into_member())
            }
        };
        let existing_member_id = match &member {
            MemberRecord::Existing(member) => Some(member.member_id),
            MemberRecord::New(_) => None,
        };

        // The total is always derived again here, never taken from the caller
        let quote = self
            .quote(&req.terms, existing_member_id, today)
            .await?;
        let (plan, preview) = (quote.plan, quote.preview);

        if !plan.is_available_on(today) {
            return Err(Error::Validation(
                format!("plan '{}' is not currently available", plan.name.en).into(),
            ));
        }
        check_age(member.member(), &plan, today)?;

        if let Some(expected) = req.expected_total {
            if round_money(expected) != preview.grand_total {
                warn!(
                    plan_id = %plan.id,
                    expected = %expected,
                    total = %preview.grand_total,
                    "enrollment total mismatch"
                );
                return Err(Error::Conflict(
                    format!(
                        "expected total {expected} does not match the current total {}",
                        preview.grand_total
                    )
                    .into(),
                ));
            }
        }

        if let Some(member_id) = existing_member_id {
            if self
                .database
                .has_active_subscription(member_id, start_date)
                .await?
            {
                return Err(Error::Conflict(
                    format!("member {member_id} already has an active subscription").into(),
                ));
            }
        }

        let member_id = member.member().member_id;
        let subscription_id = Uuid::new_v4();
        let end_date = start_date
            .checked_add_days(Days::new(
                u64::from(preview.duration_days) + u64::from(preview.free_trial_days()),
            ))
            .ok_or_else(|| Error::Validation("start date is out of range".into()))?;

        let contract = req.create_contract.then(|| {
            Contract::new(ContractDraft {
                member_id,
                plan_id: plan.id,
                subscription_id,
                contract_type: preview.contract.contract_type,
                contract_term: preview.contract.contract_term,
                commitment_months: preview.contract.term_months,
                notice_period_days: preview.contract.notice_period_days,
                cooling_off_days: preview.contract.cooling_off_days,
                start_date,
                membership_fee: plan.pricing.membership_fee.clone(),
                admin_fee: plan.pricing.administration_fee.clone(),
                join_fee: plan.pricing.join_fee.clone(),
                early_termination_fee: preview.contract.early_termination_fee,
            })
        });
        let invoice = req.create_invoice.then(|| {
            Invoice::from_preview(&preview, member_id, subscription_id, req.paid_amount, today)
        });
        let subscription = Subscription {
            subscription_id,
            member_id,
            plan_id: plan.id,
            contract_id: contract.as_ref().map(|contract| contract.id),
            status: if req.paid_amount.is_some() {
                SubscriptionStatus::Active
            } else {
                SubscriptionStatus::PendingPayment
            },
            start_date,
            end_date,
            auto_renew: req.auto_renew,
            paid_amount: req.paid_amount.map(round_money),
            discount_amount: preview.discount_amount,
            voucher_code: preview.voucher.as_ref().map(|voucher| voucher.code.clone()),
            staff_notes: req.staff_notes,
        };

        let enrollment = self
            .database
            .commit_enrollment(NewEnrollment {
                member,
                subscription,
                contract,
                invoice,
                voucher: preview.voucher.clone(),
            })
            .await
            .map_err(|err| match err {
                database::Error::ActiveSubscriptionExists(_)
                | database::Error::VoucherLimitReached(_) => {
                    Error::Conflict(err.to_string().into())
                }
                err => Error::EnrollmentFailed(err),
            })?;

        info!(
            member_id = %enrollment.member.member_id,
            subscription_id = %enrollment.subscription.subscription_id,
            member_created = enrollment.member_created,
            total = %preview.grand_total,
            "enrollment committed"
        );

        // The enrollment stays committed whatever happens downstream
        let event = EnrollmentEvent {
            member_id: enrollment.member.member_id,
            member_created: enrollment.member_created,
            subscription_id: enrollment.subscription.subscription_id,
            plan_id: plan.id,
            start_date: enrollment.subscription.start_date,
            total: preview.grand_total,
            currency: preview.currency.clone(),
        };
        if let Err(err) = self.notifier.enrollment_created(event).await {
            warn!(
                subscription_id = %enrollment.subscription.subscription_id,
                error = %err,
                "enrollment notification failed"
            );
        }

        Ok(EnrollmentResponse {
            member_id: enrollment.member.member_id,
            member_name: enrollment.member.full_name(),
            member_created: enrollment.member_created,
            subscription_id: enrollment.subscription.subscription_id,
            status: enrollment.subscription.status,
            contract_id: enrollment.contract.as_ref().map(|contract| contract.id),
            contract_number: enrollment
                .contract
                .as_ref()
                .map(|contract| contract.contract_number.clone()),
            invoice_id: enrollment.invoice.as_ref().map(|invoice| invoice.invoice_id),
            invoice_number: enrollment
                .invoice
                .as_ref()
                .map(|invoice| invoice.invoice_number.clone()),
            plan_name: plan.name,
            total: preview.grand_total,
            paid_amount: enrollment.subscription.paid_amount,
            currency: preview.currency,
            start_date: enrollment.subscription.start_date,
            end_date: enrollment.subscription.end_date,
            cancellation: enrollment
                .contract
                .as_ref()
                .map(|contract| contract.cancellation_terms(today)),
        })
    }
}

fn check_age(member: &Member, plan: &Plan, today: NaiveDate) -> Result<(), Error> {
    if !plan.has_age_restriction() {
        return Ok(());
    }
    let age = member.age_on(today).ok_or_else(|| {
        Error::Validation("member date of birth is required for age-restricted plans".into())
    })?;
    if !plan.is_age_eligible(age) {
        return Err(Error::Validation(
            format!("member age ({age}) does not meet the plan age requirements").into(),
        ));
    }
    Ok(())
}

impl<C, V, M, D, N> Service<EnrollRequest> for DomainLogic<C, V, M, D, N>
where
    C: PlanCatalogPort + Send + Sync + 'static,
    V: VoucherPort + Send + Sync + 'static,
    M: MemberPort + Send + Sync + 'static,
    D: DatabasePort + Send + Sync + 'static,
    N: NotificationPort + Send + Sync + 'static,
{
    type Response = EnrollmentResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: EnrollRequest) -> Self::Future {
        let logic = self.clone();
        let today = self.clock.today();
        let span = tracing::info_span!("enroll", plan_id = %req.terms.plan_id, %today);
        Box::pin(async move { logic.enroll(req, today).await }.instrument(span))
    }
}
