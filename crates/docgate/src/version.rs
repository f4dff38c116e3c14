//! Version information for docgate.

/// docgate version from Cargo.toml
pub const DOCGATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version information reported by the health endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VersionInfo {
    pub docgate: &'static str,
    /// Endpoint the gate forwards to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            docgate: DOCGATE_VERSION,
            endpoint: None,
        }
    }
}

impl VersionInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}
