use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Settings for the Inspection Service and the CLI.
#[derive(Clone)]
pub struct InspectorConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub http_timeout_secs: u64,
    /// Static bearer token; when absent the metadata server is asked per call.
    pub access_token: Option<String>,
    /// When absent the project is looked up on the metadata server at startup.
    pub project_id: Option<String>,
    pub vertex_location: String,
    pub vertex_model: String,
    pub vertex_endpoint: Option<String>,
}

/// Settings for the Upload Front-End.
#[derive(Clone)]
pub struct FrontendConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub http_timeout_secs: u64,
    pub access_token: Option<String>,
    pub bucket: String,
    pub inspector_url: String,
    pub upload_prefix: String,
    pub storage_endpoint: String,
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for InspectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InspectorConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("project_id", &self.project_id)
            .field("vertex_location", &self.vertex_location)
            .field("vertex_model", &self.vertex_model)
            .field("vertex_endpoint", &self.vertex_endpoint)
            .finish()
    }
}

impl std::fmt::Debug for FrontendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontendConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("bucket", &self.bucket)
            .field("inspector_url", &self.inspector_url)
            .field("upload_prefix", &self.upload_prefix)
            .field("storage_endpoint", &self.storage_endpoint)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}
