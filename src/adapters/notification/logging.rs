use crate::ports::notification::{EnrollmentEvent, Error, NotificationPort};

/// Notifier that records enrollment events in the service log
///
/// Stands in for the notification and marketing services when none is configured.
#[derive(Clone, Debug, Default)]
pub struct TracingNotifier;

#[async_trait::async_trait]
impl NotificationPort for TracingNotifier {
    async fn enrollment_created(&self, event: EnrollmentEvent) -> Result<(), Error> {
        tracing::info!(
            member_id = %event.member_id,
            subscription_id = %event.subscription_id,
            plan_id = %event.plan_id,
            member_created = event.member_created,
            start_date = %event.start_date,
            total = %event.total,
            currency = %event.currency,
            "enrollment created"
        );
        Ok(())
    }
}
