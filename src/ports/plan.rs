use uuid::Uuid;

use crate::domain::plan::Plan;

/// Read access to the plan catalog
#[mockall::automock]
#[async_trait::async_trait]
pub trait PlanCatalogPort {
    /// Fetch a plan by ID, including inactive plans
    async fn get_plan(&self, plan_id: Uuid) -> Result<Plan, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("plan {0} does not exist")]
    PlanDoesNotExist(Uuid),

    /// Concrete adapter errors
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
