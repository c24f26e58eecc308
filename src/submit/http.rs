use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{SubmitAck, TransactionSubmitter};
use crate::error::{ErrorCode, LatencyError, Result};

#[derive(Debug, Serialize)]
struct TransactionRequest<'a> {
    transaction: &'a str,
}

/// Posts `{"transaction": ...}` to the cluster's submission endpoint.
pub struct HttpSubmitter {
    client: Client,
    endpoint: String,
}

impl HttpSubmitter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            LatencyError::config(format!("Failed to create HTTP client: {}", e)).with_source(e)
        })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl TransactionSubmitter for HttpSubmitter {
    async fn submit(&self, payload: &str) -> Result<SubmitAck> {
        debug!("Submitting {} byte transaction to {}", payload.len(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&TransactionRequest {
                transaction: payload,
            })
            .send()
            .await
            .map_err(|e| {
                LatencyError::submission_with_code(
                    ErrorCode::SUBMIT_TRANSPORT,
                    format!("request to {} failed", self.endpoint),
                )
                .with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(LatencyError::submission_with_code(
                ErrorCode::SUBMIT_REJECTED,
                format!("{} answered {}: {}", self.endpoint, status, body.trim()),
            ));
        }

        info!("Transaction accepted by {} ({})", self.endpoint, status);
        Ok(SubmitAck {
            status: status.as_u16(),
            body,
        })
    }
}
