//! Request gateway: turns an admitted submission into one HTTP POST.
//!
//! Wire protocol of the registration service:
//! - `POST <endpoint>` with the JSON-encoded document as body
//! - `Content-Type: application/json`
//! - `Authorization: Bearer <signature>`
//! - 200 means accepted; every other status is a rejection
//!
//! One attempt per call. Retrying is left to the caller.

use std::time::Duration;

use reqwest::Url;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;

use crate::admission::Permit;
use crate::submission::{Accepted, SubmissionError, SubmissionRequest};
use crate::version::DOCGATE_VERSION;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestGateway {
    endpoint: Url,
    client: reqwest::Client,
}

impl RequestGateway {
    pub fn new(endpoint: Url, config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();

        let user_agent = format!("docgate/{}", DOCGATE_VERSION);
        if let Ok(value) = HeaderValue::from_str(&user_agent) {
            headers.insert(USER_AGENT, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self::with_client(endpoint, client))
    }

    /// Use a preconfigured client (proxies, TLS roots, pooling).
    pub fn with_client(endpoint: Url, client: reqwest::Client) -> Self {
        Self { endpoint, client }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send one admitted submission.
    ///
    /// The permit is consumed whatever the outcome. Serialization and
    /// credential problems are reported before anything is sent.
    pub async fn dispatch<T: Serialize>(
        &self,
        permit: Permit,
        request: &SubmissionRequest<T>,
    ) -> Result<Accepted, SubmissionError> {
        let submission_id = request.id();

        let body = serde_json::to_vec(request.payload()).map_err(|e| {
            tracing::warn!(%submission_id, error = %e, "Failed to serialize submission");
            SubmissionError::Serialization(e)
        })?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", request.token()))
            .map_err(|_| SubmissionError::InvalidCredential)?;
        auth.set_sensitive(true);

        tracing::debug!(
            %submission_id,
            generation = permit.generation(),
            bytes = body.len(),
            "Dispatching submission"
        );
        drop(permit);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, auth)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(%submission_id, error = %e, "Submission request failed");
                SubmissionError::Network(e)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(SubmissionError::Network)?;

        if status == 200 {
            tracing::info!(%submission_id, "Document accepted");
            Ok(Accepted {
                submission_id,
                body,
            })
        } else {
            tracing::warn!(%submission_id, status, "Document rejected");
            Err(SubmissionError::RemoteRejected { status, body })
        }
    }
}
