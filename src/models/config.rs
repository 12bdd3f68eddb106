//! Configuration model loaded from external sources.

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
/// Basic configuration shared across handlers and the schedule dispatcher.
pub struct ServerConfig {
    pub domain: String,
    pub address: String,
    pub port: u16,
    pub database_url: String,
    pub templates_dir: String,
    /// Signs session cookies and the identity JWT.
    pub secret: String,
    pub auth_service_url: String,
    /// Base64 encoded 32-byte key wrapping managed encryption keys.
    /// Derived from `secret` when absent.
    #[serde(default)]
    pub encryption_master_key: Option<String>,
}
