use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/a2a";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: String,
    pub storage_path: String,
    pub credentials_path: PathBuf,
    pub viewport_rows: usize,
    pub message_limit: u32,
}

impl AppConfig {
    /// Use a different backend without touching the rest of the
    /// environment derived settings.
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let api_url = env::var("NEXUS_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let storage_path = env::var("NEXUS_STORAGE_PATH").unwrap_or("./".to_string());
        let credentials_path = PathBuf::from(&storage_path).join("credentials.json");
        let viewport_rows = env::var("NEXUS_VIEWPORT_ROWS")
            .ok()
            .and_then(|rows| rows.parse().ok())
            .unwrap_or(20);
        let message_limit = env::var("NEXUS_MESSAGE_LIMIT")
            .ok()
            .and_then(|limit| limit.parse().ok())
            .unwrap_or(50);

        Self {
            api_url,
            storage_path,
            credentials_path,
            viewport_rows,
            message_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn it_uses_defaults_without_env() {
        // SAFETY: serialized with the other env tests
        unsafe {
            env::remove_var("NEXUS_API_URL");
            env::remove_var("NEXUS_STORAGE_PATH");
            env::remove_var("NEXUS_VIEWPORT_ROWS");
            env::remove_var("NEXUS_MESSAGE_LIMIT");
        }
        let config = AppConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.credentials_path, PathBuf::from("./credentials.json"));
        assert_eq!(config.viewport_rows, 20);
        assert_eq!(config.message_limit, 50);
    }

    #[test]
    #[serial]
    fn it_reads_overrides_from_env() {
        unsafe {
            env::set_var("NEXUS_API_URL", "http://localhost:9000/a2a/");
            env::set_var("NEXUS_STORAGE_PATH", "/tmp/nexus");
            env::set_var("NEXUS_VIEWPORT_ROWS", "not a number");
            env::set_var("NEXUS_MESSAGE_LIMIT", "10");
        }
        let config = AppConfig::default();
        unsafe {
            env::remove_var("NEXUS_API_URL");
            env::remove_var("NEXUS_STORAGE_PATH");
            env::remove_var("NEXUS_VIEWPORT_ROWS");
            env::remove_var("NEXUS_MESSAGE_LIMIT");
        }

        assert_eq!(config.api_url, "http://localhost:9000/a2a");
        assert_eq!(
            config.credentials_path,
            PathBuf::from("/tmp/nexus/credentials.json")
        );
        assert_eq!(config.viewport_rows, 20);
        assert_eq!(config.message_limit, 10);
    }
}
