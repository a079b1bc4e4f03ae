use async_trait::async_trait;
use skyway_shared::models::events::DomainEvent;

use crate::error::CoreResult;

/// Outbound notification sink. Called after a unit of work has committed;
/// a failure here never undoes the commit.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> CoreResult<()>;
}
