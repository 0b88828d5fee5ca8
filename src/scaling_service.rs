//! # Remote Scaling Service
//!
//! The scaling computation itself lives in an external service. The
//! coordinator only sees the [`ScalingService`] trait; [`HttpScalingService`]
//! is the JSON-over-HTTP adapter used by the binary.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ingredient_model::{ScaleRequest, ScaleResponse};
use crate::scaling_errors::ScaleError;

/// Remote scaling capability
///
/// Implementations must honor `cancel`: once it fires they should stop work
/// and return [`ScaleError::Cancelled`] rather than a result.
#[async_trait]
pub trait ScalingService: Send + Sync {
    async fn scale(
        &self,
        request: ScaleRequest,
        cancel: CancellationToken,
    ) -> Result<ScaleResponse, ScaleError>;
}

/// Scaling service reached over HTTP
///
/// Posts the request as JSON to `{base_url}/scale` and expects a
/// [`ScaleResponse`] body.
#[derive(Debug, Clone)]
pub struct HttpScalingService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpScalingService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for scaling service")?;

        Ok(Self {
            client,
            endpoint: scale_endpoint(base_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, request: &ScaleRequest) -> Result<ScaleResponse, ScaleError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, endpoint = %self.endpoint, "Scaling service rejected request");
            return Err(ScaleError::Remote(format!("scaling service returned {status}")));
        }

        Ok(response.json::<ScaleResponse>().await?)
    }
}

#[async_trait]
impl ScalingService for HttpScalingService {
    async fn scale(
        &self,
        request: ScaleRequest,
        cancel: CancellationToken,
    ) -> Result<ScaleResponse, ScaleError> {
        debug!(
            desired = request.desired_servings,
            items = request.ingredients.len(),
            "Posting scale request"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScaleError::Cancelled),
            result = self.post(&request) => result,
        }
    }
}

fn scale_endpoint(base_url: &str) -> String {
    format!("{}/scale", base_url.trim_end_matches('/'))
}
