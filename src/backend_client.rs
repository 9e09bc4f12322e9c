use crate::circuit_breaker::{create_backend_circuit_breaker, BackendCircuitBreaker};
use crate::errors::AppError;
use crate::models::{LeadRecord, LeadStatus, StatusUpdate};
use failsafe::futures::CircuitBreaker;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;

/// Client for the scoring backend that owns the lead records.
///
/// Every call goes through a circuit breaker; only transport failures count
/// towards opening it, a 404 does not.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    breaker: BackendCircuitBreaker,
}

impl BackendClient {
    /// Creates a new `BackendClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the backend API (without trailing slash).
    /// * `timeout` - Per-request timeout.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create backend client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            breaker: create_backend_circuit_breaker(),
        })
    }

    async fn guarded<T, F>(&self, request: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match self
            .breaker
            .call_with(|e: &AppError| e.is_retryable(), request)
            .await
        {
            Ok(value) => Ok(value),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => Err(AppError::Transport(
                "Circuit open, backend calls suspended".to_string(),
            )),
        }
    }

    /// Turns a non-success status into an error, keeping the body for the log.
    async fn check_status(
        response: reqwest::Response,
        what: &str,
    ) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("{} not found", what)));
        }

        Err(AppError::Transport(format!(
            "Backend returned {} for {}: {}",
            status, what, error_text
        )))
    }

    /// Fetches a full snapshot of scored leads.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of leads to request.
    pub async fn fetch_records(&self, limit: usize) -> Result<Vec<LeadRecord>, AppError> {
        let url = format!("{}/customers", self.base_url);
        tracing::info!("Fetching lead snapshot from backend: {} (limit {})", url, limit);

        let records: Vec<LeadRecord> = self
            .guarded(async {
                let response = self
                    .client
                    .get(&url)
                    .query(&[("limit", limit)])
                    .send()
                    .await
                    .map_err(|e| AppError::Transport(format!("Snapshot request failed: {}", e)))?;

                Self::check_status(response, "Lead snapshot")
                    .await?
                    .json()
                    .await
                    .map_err(|e| AppError::Transport(format!("Failed to parse snapshot: {}", e)))
            })
            .await?;

        tracing::info!("✓ Snapshot fetched: {} leads", records.len());
        Ok(records)
    }

    /// Fetches a single lead for the detail view.
    pub async fn fetch_record_detail(&self, id: i64) -> Result<LeadRecord, AppError> {
        let url = format!("{}/customers/{}", self.base_url, id);
        tracing::info!("Fetching lead {} from backend", id);

        self.guarded(async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| AppError::Transport(format!("Lead request failed: {}", e)))?;

            Self::check_status(response, &format!("Lead {}", id))
                .await?
                .json()
                .await
                .map_err(|e| AppError::Transport(format!("Failed to parse lead {}: {}", id, e)))
        })
        .await
    }

    /// Changes the workflow status (and notes) of a lead.
    ///
    /// Returns the updated lead as stored by the backend. Callers must drop any
    /// cached snapshot afterwards.
    pub async fn update_status(
        &self,
        id: i64,
        status: LeadStatus,
        notes: Option<String>,
    ) -> Result<LeadRecord, AppError> {
        let url = format!("{}/customers/{}/status", self.base_url, id);
        tracing::info!("Updating lead {} status to {}", id, status);

        let body = StatusUpdate {
            lead_status: status,
            status_notes: notes,
        };

        let updated: LeadRecord = self
            .guarded(async {
                let response = self
                    .client
                    .patch(&url)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| AppError::Transport(format!("Status update failed: {}", e)))?;

                Self::check_status(response, &format!("Lead {}", id))
                    .await?
                    .json()
                    .await
                    .map_err(|e| {
                        AppError::Transport(format!("Failed to parse updated lead {}: {}", id, e))
                    })
            })
            .await?;

        tracing::info!("✓ Lead {} is now {}", id, updated.lead_status);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = BackendClient::new(
            "https://example.com/api/v1/".to_string(),
            Duration::from_secs(5),
        );
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url, "https://example.com/api/v1");
    }
}
