use std::{borrow::Cow, sync::Arc};

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::clock::system::SystemClock,
    domain::{
        enrollment::{
            price_enrollment, EnrollmentPreview, PricingError, PricingInput, VoucherCandidate,
        },
        plan::{ContractTerm, Plan},
        voucher::Discount,
        ValidationError,
    },
    ports::{
        clock::ClockPort,
        database::{self, DatabasePort},
        member::{self, MemberPort},
        notification::NotificationPort,
        plan::{self, PlanCatalogPort},
        voucher::{self, VoucherPort},
    },
};

pub mod enroll;
pub mod preview_enrollment;

/// Enrollment logic wired to its collaborators
///
/// * `C`: plan catalog
/// * `V`: voucher catalog
/// * `M`: member directory
/// * `D`: transactional store
/// * `N`: notification and marketing hooks
///
/// Requests are evaluated on the date given by the clock, which defaults to the system clock.
pub struct DomainLogic<C, V, M, D, N> {
    catalog: Arc<C>,
    vouchers: Arc<V>,
    member: Arc<M>,
    database: Arc<D>,
    notifier: Arc<N>,
    clock: Arc<dyn ClockPort + Send + Sync>,
}

impl<C, V, M, D, N> DomainLogic<C, V, M, D, N> {
    pub fn new(
        catalog: Arc<C>,
        vouchers: Arc<V>,
        member: Arc<M>,
        database: Arc<D>,
        notifier: Arc<N>,
    ) -> Self {
        Self {
            catalog,
            vouchers,
            member,
            database,
            notifier,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl ClockPort + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

// The ports themselves need not be `Clone`
impl<C, V, M, D, N> Clone for DomainLogic<C, V, M, D, N> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            vouchers: self.vouchers.clone(),
            member: self.member.clone(),
            database: self.database.clone(),
            notifier: self.notifier.clone(),
            clock: self.clock.clone(),
        }
    }
}

/// Pricing inputs shared by preview and commit
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentTerms {
    pub plan_id: Uuid,
    #[serde(default)]
    pub contract_term: ContractTerm,
    #[serde(default)]
    pub voucher_code: Option<String>,
    #[serde(default)]
    pub discount: Option<Discount>,
}

/// Plan and preview resolved for a set of enrollment terms
#[derive(Debug)]
pub(crate) struct Quote {
    pub(crate) plan: Plan,
    pub(crate) preview: EnrollmentPreview,
}

impl<C, V, M, D, N> DomainLogic<C, V, M, D, N>
where
    C: PlanCatalogPort + Send + Sync + 'static,
    V: VoucherPort + Send + Sync + 'static,
    M: MemberPort + Send + Sync + 'static,
    D: DatabasePort + Send + Sync + 'static,
    N: NotificationPort + Send + Sync + 'static,
{
    /// Resolve the plan and price an enrollment
    ///
    /// Only reads from the collaborators, nothing is written.
    pub(crate) async fn quote(
        &self,
        terms: &EnrollmentTerms,
        existing_member_id: Option<Uuid>,
        today: NaiveDate,
    ) -> Result<Quote, Error> {
        let plan = self.catalog.get_plan(terms.plan_id).await?;
        if !plan.active {
            return Err(Error::NotFound(
                format!("plan {} is not active", plan.id).into(),
            ));
        }

        let first_subscription = match existing_member_id {
            Some(member_id) => self.database.count_subscriptions(member_id).await? == 0,
            // New members always enroll for the first time
            None => true,
        };

        let voucher = match terms.voucher_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                let voucher = self.vouchers.get_voucher(code).await?;
                let usage = self
                    .database
                    .voucher_usage(voucher.id, existing_member_id)
                    .await?;
                Some((voucher, usage))
            }
            _ => None,
        };

        let preview = price_enrollment(&PricingInput {
            plan: &plan,
            contract_term: terms.contract_term,
            first_subscription,
            voucher: voucher
                .as_ref()
                .map(|(voucher, usage)| VoucherCandidate {
                    voucher,
                    usage: *usage,
                }),
            discount: terms.discount,
            today,
        })
        .map_err(|err| {
            if let PricingError::Voucher(rejection) = &err {
                tracing::warn!(
                    plan_id = %plan.id,
                    code = rejection.code(),
                    "voucher rejected"
                );
            }
            err
        })?;

        Ok(Quote { plan, preview })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed input: bad amount, tax rate, date or member details
    #[error("validation error: {0}")]
    Validation(Cow<'static, str>),

    /// Unknown plan, voucher or member
    #[error("not found: {0}")]
    NotFound(Cow<'static, str>),

    /// Request conflicts with existing state, such as an active subscription or a used voucher
    #[error("conflict: {0}")]
    Conflict(Cow<'static, str>),

    /// The enrollment transaction failed and was rolled back
    #[error("enrollment failed: {0}")]
    EnrollmentFailed(#[source] database::Error),

    /// A collaborator could not be reached
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Stable error code surfaced to callers
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::EnrollmentFailed(_) => "ENROLLMENT_FAILED",
            Error::Adapter(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.0)
    }
}

impl From<PricingError> for Error {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::Validation(err) => err.into(),
            PricingError::Voucher(rejection) => {
                let message = format!("{}: {}", rejection.code(), rejection).into();
                if rejection.is_conflict() {
                    Self::Conflict(message)
                } else {
                    Self::Validation(message)
                }
            }
        }
    }
}

impl From<plan::Error> for Error {
    fn from(err: plan::Error) -> Self {
        match err {
            plan::Error::PlanDoesNotExist(_) => Self::NotFound(err.to_string().into()),
            plan::Error::Adapter(err) => Self::Adapter(err),
        }
    }
}

impl From<voucher::Error> for Error {
    fn from(err: voucher::Error) -> Self {
        match err {
            voucher::Error::VoucherDoesNotExist(_) => Self::NotFound(err.to_string().into()),
            voucher::Error::Adapter(err) => Self::Adapter(err),
        }
    }
}

impl From<member::Error> for Error {
    fn from(err: member::Error) -> Self {
        match err {
            member::Error::MemberDoesNotExist(_) => Self::NotFound(err.to_string().into()),
            member::Error::Adapter(err) => Self::Adapter(err),
        }
    }
}

/// Store errors raised while reading, outside of the enrollment transaction
impl From<database::Error> for Error {
    fn from(err: database::Error) -> Self {
        match err {
            database::Error::ActiveSubscriptionExists(_)
            | database::Error::DuplicateInvoiceNumber(_)
            | database::Error::VoucherLimitReached(_) => Self::Conflict(err.to_string().into()),
            database::Error::MemberDoesNotExist(_) => Self::NotFound(err.to_string().into()),
            database::Error::Adapter(err) => Self::Adapter(err),
        }
    }
}
