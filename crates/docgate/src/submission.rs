//! Submission request and outcome types.

use std::fmt;

use uuid::Uuid;

use crate::admission::AdmissionError;

/// A payload bound for the registration service plus the caller's credential.
///
/// The payload is opaque here; it only has to serialize to JSON.
#[derive(Clone)]
pub struct SubmissionRequest<T> {
    id: Uuid,
    token: String,
    payload: T,
}

impl<T> SubmissionRequest<T> {
    pub fn new(payload: T, token: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            token: token.into(),
            payload,
        }
    }

    /// Identifier carried in log fields for this submission.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

impl<T: fmt::Debug> fmt::Debug for SubmissionRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionRequest")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .field("payload", &self.payload)
            .finish()
    }
}

/// The remote service answered 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub submission_id: Uuid,
    /// Response body as returned by the service.
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    AdmissionCancelled(#[from] AdmissionError),

    #[error("Failed to serialize document: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Credential is not a valid header value")]
    InvalidCredential,

    #[error("Request to registration service failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Registration service rejected the document with status {status}")]
    RemoteRejected { status: u16, body: String },
}

impl SubmissionError {
    /// Status code of a remote rejection, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            SubmissionError::RemoteRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the request left this process.
    pub fn reached_network(&self) -> bool {
        matches!(
            self,
            SubmissionError::Network(_) | SubmissionError::RemoteRejected { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let request = SubmissionRequest::new(serde_json::json!({"doc_id": "1"}), "secret-token");
        let debug = format!("{:?}", request);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
        assert_eq!(request.token(), "secret-token");
    }

    #[test]
    fn each_request_gets_its_own_id() {
        let a = SubmissionRequest::new((), "t");
        let b = SubmissionRequest::new((), "t");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn error_display() {
        let err = SubmissionError::RemoteRejected {
            status: 500,
            body: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "Registration service rejected the document with status 500"
        );
        assert_eq!(err.status(), Some(500));
        assert!(err.reached_network());

        let err = SubmissionError::from(AdmissionError::Cancelled);
        assert_eq!(err.to_string(), "Admission cancelled by caller");
        assert_eq!(err.status(), None);
        assert!(!err.reached_network());
    }
}
