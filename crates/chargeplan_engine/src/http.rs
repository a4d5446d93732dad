use async_trait::async_trait;
use chargeplan_core::{LimitationSettings, OptimizerRequest, OptimizerResponse};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::{EngineError, EngineResult, OptimizerTransport, TransportSettings};

/// Connection to the optimizer and the knobs of the car models sent to it.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OptimizerSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(flatten)]
    pub limitation: LimitationSettings,
}

impl std::fmt::Debug for OptimizerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizerSettings")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"***")
            .field("limitation", &self.limitation)
            .finish()
    }
}

impl TransportSettings for OptimizerSettings {
    fn check(&self) -> EngineResult<()> {
        if self.url.is_empty() {
            return Err(EngineError::Configuration("no optimizer url".to_string()));
        }
        Url::parse(&self.url).map_err(|e| {
            EngineError::Configuration(format!("invalid optimizer url {}: {}", self.url, e))
        })?;
        if self.user.is_empty() || self.password.is_empty() {
            return Err(EngineError::Configuration(
                "no optimizer credentials".to_string(),
            ));
        }
        Ok(())
    }

    fn limitation(&self) -> &LimitationSettings {
        &self.limitation
    }
}

/// Optimizer reached over HTTP: the request is posted as JSON with basic
/// authentication.
#[derive(Clone)]
pub struct HttpOptimizer {
    settings: OptimizerSettings,
    client: Client,
}

impl HttpOptimizer {
    pub fn new(settings: OptimizerSettings) -> EngineResult<Self> {
        settings.check()?;
        let client = Client::builder().build().map_err(|e| {
            EngineError::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(HttpOptimizer { settings, client })
    }
}

#[async_trait]
impl OptimizerTransport for HttpOptimizer {
    type Settings = OptimizerSettings;

    fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    async fn optimize(&self, request: &OptimizerRequest) -> EngineResult<OptimizerResponse> {
        tracing::debug!(
            "Posting {} cars to optimizer {}",
            request.state.cars.len(),
            self.settings.url
        );
        let response = self
            .client
            .post(&self.settings.url)
            .basic_auth(&self.settings.user, Some(&self.settings.password))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!("Optimizer answered {}: {}", status, message);
            return Err(EngineError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        let response = response.json::<OptimizerResponse>().await?;
        tracing::debug!("Optimizer returned plans for {} cars", response.cars.len());
        Ok(response)
    }
}
