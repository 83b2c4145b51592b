use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tower::Service;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    domain::enrollment::EnrollmentPreview,
    ports::{
        database::DatabasePort, member::MemberPort, notification::NotificationPort,
        plan::PlanCatalogPort, voucher::VoucherPort,
    },
};

use super::{DomainLogic, EnrollmentTerms, Error};

pub struct PreviewEnrollmentRequest {
    pub terms: EnrollmentTerms,
    /// Member re-enrolling, `None` for someone joining the club
    pub existing_member_id: Option<Uuid>,
}

impl<C, V, M, D, N> Service<PreviewEnrollmentRequest> for DomainLogic<C, V, M, D, N>
where
    C: PlanCatalogPort + Send + Sync + 'static,
    V: VoucherPort + Send + Sync + 'static,
    M: MemberPort + Send + Sync + 'static,
    D: DatabasePort + Send + Sync + 'static,
    N: NotificationPort + Send + Sync + 'static,
{
    type Response = EnrollmentPreview;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: PreviewEnrollmentRequest) -> Self::Future {
        let logic = self.clone();
        let today = self.clock.today();
        let span = tracing::info_span!(
            "preview_enrollment",
            plan_id = %req.terms.plan_id,
            %today
        );
        Box::pin(
            async move {
                // Unknown members are rejected before anything is priced
                if let Some(member_id) = req.existing_member_id {
                    logic.member.get_member(member_id).await?;
                }

                let quote = logic
                    .quote(&req.terms, req.existing_member_id, today)
                    .await?;

                tracing::debug!(
                    grand_total = %quote.preview.grand_total,
                    first_subscription = quote.preview.is_first_subscription,
                    "enrollment previewed"
                );
                Ok(quote.preview)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::{clock::system::FixedClock, database::memory::MemoryDatabase},
        commands::tests::{catalog_with, logic_with, test_today},
        domain::{
            enrollment::tests::{sample_plan, sample_voucher},
            plan::ContractTerm,
            voucher::{Discount, DiscountKind, VoucherKind},
            Member,
        },
        ports::{
            database::MockDatabasePort,
            member::MockMemberPort,
            notification::MockNotificationPort,
            plan::{self, MockPlanCatalogPort},
            voucher::{self, MockVoucherPort},
        },
    };
    use mockall::predicate::*;
    use rstest::*;
    use rust_decimal_macros::dec;
    use speculoos::prelude::*;
    use std::sync::Arc;
    use tower::{BoxError, ServiceExt};

    fn request(plan_id: Uuid) -> PreviewEnrollmentRequest {
        PreviewEnrollmentRequest {
            terms: EnrollmentTerms {
                plan_id,
                contract_term: ContractTerm::Monthly,
                voucher_code: None,
                discount: None,
            },
            existing_member_id: None,
        }
    }

    #[tokio::test]
    async fn test_call_new_member() -> Result<(), BoxError> {
        // GIVEN
        // * a plan catalog that returns the sample plan once
        // * no existing member
        let plan = sample_plan();
        let mut catalog = MockPlanCatalogPort::new();
        let returned = plan.clone();
        catalog
            .expect_get_plan()
            .times(1)
            .with(eq(plan.id))
            .returning(move |_| Ok(returned.clone()));
        let domain = logic_with(catalog, MockVoucherPort::new(), MemoryDatabase::default());

        // WHEN calling the service
        let res = domain.clone().oneshot(request(plan.id)).await;

        // THEN the join fee applies and totals match
        assert_that!(res).is_ok().matches(|preview| {
            preview.is_first_subscription
                && preview.join_fee.applicable
                && preview.subtotal == dec!(350)
                && preview.vat_total == dec!(52.50)
                && preview.grand_total == dec!(402.50)
        });
        Arc::into_inner(domain.catalog).unwrap().checkpoint();

        Ok(())
    }

    #[tokio::test]
    async fn test_call_returning_member() -> Result<(), BoxError> {
        // GIVEN a member with prior subscriptions
        let plan = sample_plan();
        let member_id = Uuid::new_v4();
        let mut member = MockMemberPort::new();
        member
            .expect_get_member()
            .times(1)
            .with(eq(member_id))
            .returning(move |_| {
                Ok(Member {
                    member_id,
                    first_name: "Omar".to_string(),
                    last_name: "Saleh".to_string(),
                    email: None,
                    phone: None,
                    date_of_birth: None,
                    national_id: None,
                })
            });
        let mut database = MockDatabasePort::new();
        database
            .expect_count_subscriptions()
            .times(1)
            .with(eq(member_id))
            .returning(|_| Ok(2));
        let domain = DomainLogic::new(
            Arc::new(catalog_with(plan.clone())),
            Arc::new(MockVoucherPort::new()),
            Arc::new(member),
            Arc::new(database),
            Arc::new(MockNotificationPort::new()),
        )
        .with_clock(FixedClock(test_today()));

        // WHEN previewing their enrollment
        let mut req = request(plan.id);
        req.existing_member_id = Some(member_id);
        let res = domain.clone().oneshot(req).await;

        // THEN the join fee does not apply
        assert_that!(res).is_ok().matches(|preview| {
            !preview.is_first_subscription
                && !preview.join_fee.applicable
                && preview.grand_total == dec!(287.50)
        });
        Arc::into_inner(domain.member).unwrap().checkpoint();
        Arc::into_inner(domain.database).unwrap().checkpoint();

        Ok(())
    }

    #[tokio::test]
    async fn test_call_with_voucher() -> Result<(), BoxError> {
        let plan = sample_plan();
        let voucher = sample_voucher(VoucherKind::FixedAmount(dec!(50)));
        let mut vouchers = MockVoucherPort::new();
        vouchers
            .expect_get_voucher()
            .times(1)
            .withf(|code| code == "WELCOME")
            .returning(move |_| Ok(voucher.clone()));
        let domain = logic_with(catalog_with(plan.clone()), vouchers, MemoryDatabase::default());

        let mut req = request(plan.id);
        req.terms.voucher_code = Some("WELCOME".to_string());
        let res = domain.clone().oneshot(req).await;

        assert_that!(res).is_ok().matches(|preview| {
            preview.discount_amount == Some(dec!(50.00)) && preview.grand_total == dec!(352.50)
        });

        Ok(())
    }

    #[tokio::test]
    async fn test_call_evaluates_voucher_on_clock_date() {
        // GIVEN a voucher that expired the day before the clock's date
        let plan = sample_plan();
        let mut voucher = sample_voucher(VoucherKind::FixedAmount(dec!(300)));
        voucher.valid_until = test_today().pred_opt();
        let mut vouchers = MockVoucherPort::new();
        vouchers
            .expect_get_voucher()
            .returning(move |_| Ok(voucher.clone()));
        let domain = logic_with(catalog_with(plan.clone()), vouchers, MemoryDatabase::default());

        // WHEN previewing with that voucher
        let mut req = request(plan.id);
        req.terms.voucher_code = Some("WELCOME".to_string());
        let res = domain.oneshot(req).await;

        // THEN the voucher is rejected as expired
        assert_that!(res).is_err().matches(|err| {
            matches!(err, Error::Validation(message) if message.contains("EXPIRED"))
        });
    }

    #[tokio::test]
    async fn test_call_is_idempotent() -> Result<(), BoxError> {
        let plan = sample_plan();
        let domain = logic_with(
            catalog_with(plan.clone()),
            MockVoucherPort::new(),
            MemoryDatabase::default(),
        );
        let discounted = || {
            let mut req = request(plan.id);
            req.terms.discount = Some(Discount {
                kind: DiscountKind::Percentage,
                value: dec!(12.5),
            });
            req
        };

        let first = domain.clone().oneshot(discounted()).await?;
        let second = domain.clone().oneshot(discounted()).await?;

        assert_that!(serde_json::to_string(&first)?).is_equal_to(serde_json::to_string(&second)?);

        Ok(())
    }

    #[rstest]
    #[case::unknown_plan(
        Err(plan::Error::PlanDoesNotExist(Uuid::nil())),
        Some(Err(voucher::Error::VoucherDoesNotExist("X".to_string())))
    )]
    #[case::unknown_voucher(
        Ok(sample_plan()),
        Some(Err(voucher::Error::VoucherDoesNotExist("NOPE".to_string())))
    )]
    #[tokio::test]
    async fn test_call_not_found(
        #[case] plan: Result<crate::domain::plan::Plan, plan::Error>,
        #[case] voucher: Option<Result<crate::domain::voucher::Voucher, voucher::Error>>,
    ) {
        // GIVEN a catalog that cannot resolve the plan or the voucher
        let mut catalog = MockPlanCatalogPort::new();
        catalog.expect_get_plan().return_once(move |_| plan);
        let mut vouchers = MockVoucherPort::new();
        if let Some(voucher) = voucher {
            vouchers.expect_get_voucher().return_once(move |_| voucher);
        }
        let domain = logic_with(catalog, vouchers, MemoryDatabase::default());

        // WHEN previewing
        let mut req = request(Uuid::new_v4());
        req.terms.voucher_code = Some("NOPE".to_string());
        let res = domain.clone().oneshot(req).await;

        // THEN it fails with a not-found error
        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_call_invalid_discount() {
        let plan = sample_plan();
        let domain = logic_with(
            catalog_with(plan.clone()),
            MockVoucherPort::new(),
            MemoryDatabase::default(),
        );

        let mut req = request(plan.id);
        req.terms.discount = Some(Discount {
            kind: DiscountKind::Percentage,
            value: dec!(150),
        });
        let res = domain.clone().oneshot(req).await;

        assert_that!(res)
            .is_err()
            .matches(|err| matches!(err, Error::Validation(_)));
    }
}
