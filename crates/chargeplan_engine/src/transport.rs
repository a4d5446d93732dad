use async_trait::async_trait;
use chargeplan_core::{LimitationSettings, OptimizerRequest, OptimizerResponse};

use crate::EngineResult;

pub trait TransportSettings: Send + Sync {
    /// Fails with [`crate::EngineError::Configuration`] when the optimizer
    /// cannot be called with these settings.
    fn check(&self) -> EngineResult<()>;

    fn limitation(&self) -> &LimitationSettings;
}

/// One request/response exchange with the optimizer. Implementations do not
/// retry.
#[async_trait]
pub trait OptimizerTransport: Send + Sync {
    type Settings: TransportSettings;

    fn settings(&self) -> &Self::Settings;

    async fn optimize(&self, request: &OptimizerRequest) -> EngineResult<OptimizerResponse>;
}
