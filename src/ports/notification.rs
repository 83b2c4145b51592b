use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Event published once an enrollment has been committed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnrollmentEvent {
    pub member_id: Uuid,
    pub member_created: bool,
    pub subscription_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: NaiveDate,
    pub total: Decimal,
    pub currency: String,
}

/// Downstream notification and marketing hooks
#[mockall::automock]
#[async_trait::async_trait]
pub trait NotificationPort {
    async fn enrollment_created(&self, event: EnrollmentEvent) -> Result<(), Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Concrete adapter errors
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
