use anyhow::{Context, Result};
use serde::Deserialize;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

pub const RUN_FULL_PATH: &str = "/nanobanana/run-full";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Where the runner sends storyboards.
///
/// The browser build fills `host`/`protocol` from `window.location`; the CLI reads
/// them from `config.yml`. `base_url` bypasses the hostname rules entirely.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BackendConfig {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default = "default_local_port")]
    pub local_port: u16,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            host: default_host(),
            protocol: default_protocol(),
            local_port: default_local_port(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_protocol() -> String {
    "http:".to_string()
}
fn default_local_port() -> u16 {
    8000
}

/// Hostnames that point at a developer machine or a private network.
fn is_local_host(host: &str) -> bool {
    host == "localhost"
        || host == "127.0.0.1"
        || host.starts_with("192.168.")
        || host.starts_with("172.")
}

/// Maps a page hostname to the backend base URL.
///
/// Local hosts talk to the backend on `local_port` over plain http. `localhost` is
/// rewritten to `127.0.0.1` so the request never goes out over IPv6 first.
/// Anything else is assumed to be served same-origin with the backend.
pub fn resolve_api_base(host: &str, protocol: &str, local_port: u16) -> String {
    if is_local_host(host) {
        let host = if host == "localhost" { "127.0.0.1" } else { host };
        return format!("http://{}:{}", host, local_port);
    }
    format!("{}//{}", protocol, host)
}

impl BackendConfig {
    pub fn for_page(host: &str, protocol: &str) -> Self {
        Self {
            host: host.to_string(),
            protocol: protocol.to_string(),
            ..Default::default()
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn from_location() -> Result<Self> {
        let window = web_sys::window().context("No window object available")?;
        let location = window.location();
        let host = location
            .hostname()
            .map_err(|e| anyhow::anyhow!("Failed to read hostname: {:?}", e))?;
        let protocol = location
            .protocol()
            .map_err(|e| anyhow::anyhow!("Failed to read protocol: {:?}", e))?;
        Ok(Self::for_page(&host, &protocol))
    }

    pub fn api_base(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => resolve_api_base(&self.host, &self.protocol, self.local_port),
        }
    }

    pub fn run_full_url(&self) -> String {
        format!("{}{}", self.api_base(), RUN_FULL_PATH)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(base) = &self.base_url {
            let parsed = url::Url::parse(base)
                .with_context(|| format!("backend.base_url is not an absolute URL: {}", base))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("backend.base_url must use http or https, got {}", parsed.scheme());
            }
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.yml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.backend.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localhost_maps_to_loopback() {
        assert_eq!(resolve_api_base("localhost", "http:", 8000), "http://127.0.0.1:8000");
        assert_eq!(resolve_api_base("127.0.0.1", "http:", 8000), "http://127.0.0.1:8000");
    }

    #[test]
    fn test_private_network_keeps_host() {
        assert_eq!(
            resolve_api_base("192.168.1.20", "https:", 8000),
            "http://192.168.1.20:8000"
        );
        assert_eq!(resolve_api_base("172.17.0.2", "http:", 9000), "http://172.17.0.2:9000");
    }

    #[test]
    fn test_public_host_is_same_origin() {
        assert_eq!(resolve_api_base("example.com", "https:", 8000), "https://example.com");
        // "10." is not treated as private
        assert_eq!(resolve_api_base("10.0.0.1", "http:", 8000), "http://10.0.0.1");
    }

    #[test]
    fn test_base_url_override_wins() {
        let backend = BackendConfig {
            base_url: Some("https://render.internal/".to_string()),
            ..Default::default()
        };
        assert_eq!(backend.api_base(), "https://render.internal");
        assert_eq!(
            backend.run_full_url(),
            "https://render.internal/nanobanana/run-full"
        );
    }

    #[test]
    fn test_validate_rejects_relative_override() {
        let backend = BackendConfig {
            base_url: Some("render.internal".to_string()),
            ..Default::default()
        };
        assert!(backend.validate().is_err());

        let backend = BackendConfig {
            base_url: Some("ftp://render.internal".to_string()),
            ..Default::default()
        };
        assert!(backend.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config::load_from(&dir.path().join("config.yml"))?;
        assert_eq!(config.backend, BackendConfig::default());
        assert_eq!(config.backend.api_base(), "http://127.0.0.1:8000");
        Ok(())
    }

    #[test]
    fn test_load_partial_yaml() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");
        fs::write(&path, "backend:\n  host: studio.example.com\n  protocol: \"https:\"\n")?;

        let config = Config::load_from(&path)?;
        assert_eq!(config.backend.local_port, 8000);
        assert_eq!(config.backend.api_base(), "https://studio.example.com");
        Ok(())
    }

    #[test]
    fn test_load_rejects_bad_override() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");
        fs::write(&path, "backend:\n  base_url: render.internal\n")?;
        assert!(Config::load_from(&path).is_err());

        fs::write(&path, "backend:\n  base_url: https://render.internal/\n")?;
        let config = Config::load_from(&path)?;
        assert_eq!(config.backend.api_base(), "https://render.internal");
        Ok(())
    }

    #[test]
    fn test_malformed_yaml_is_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");
        fs::write(&path, "backend: [unclosed")?;
        assert!(Config::load_from(&path).is_err());
        Ok(())
    }
}
