use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{voucher::VoucherUsage, Enrollment, NewEnrollment};

#[mockall::automock]
#[async_trait::async_trait]
pub trait DatabasePort {
    /// Number of subscriptions the member ever had, in any status
    async fn count_subscriptions(&self, member_id: Uuid) -> Result<u32, Error>;

    /// Whether the member holds a subscription that has not ended on the given date
    async fn has_active_subscription(&self, member_id: Uuid, on: NaiveDate)
        -> Result<bool, Error>;

    /// Redemption counts for a voucher, overall and for one member
    async fn voucher_usage(
        &self,
        voucher_id: Uuid,
        member_id: Option<Uuid>,
    ) -> Result<VoucherUsage, Error>;

    /// Persist every record of an enrollment in a single transaction
    ///
    /// Either all records are written or none of them are.
    async fn commit_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A member can only hold one live subscription at a time
    #[error("member {0} already has an active subscription")]
    ActiveSubscriptionExists(Uuid),

    /// Invoice numbers are unique across the store
    #[error("invoice number {0} is already in use")]
    DuplicateInvoiceNumber(String),

    /// Redeeming the voucher again would exceed one of its usage limits
    #[error("voucher {0} has reached its usage limit")]
    VoucherLimitReached(String),

    /// The enrollment references a member the store does not know about
    #[error("member {0} does not exist")]
    MemberDoesNotExist(Uuid),

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
