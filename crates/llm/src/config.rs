//! Azure OpenAI connection settings.

use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

/// API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2023-05-15";

pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Every Azure OpenAI resource lives under this host suffix.
const AZURE_HOST_MARKER: &str = "openai.azure.com";

/// Raw settings as read from the command line or environment.
#[derive(Debug, Clone, Default)]
pub struct AzureSettings {
    pub api_type: Option<String>,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub api_version: Option<String>,
    pub deployment: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<Duration>,
}

/// Validated connection settings.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub api_key: String,
    pub endpoint: Url,
    pub api_version: String,
    pub deployment: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl AzureConfig {
    /// Validate raw settings.
    pub fn from_settings(settings: AzureSettings) -> Result<Self, ConfigError> {
        if let Some(api_type) = non_empty(settings.api_type.as_deref()) {
            if !api_type.eq_ignore_ascii_case("azure") {
                log::warn!("OPENAI_API_TYPE is '{}'; only Azure endpoints are supported", api_type);
            }
        }

        let api_key = non_empty(settings.api_key.as_deref())
            .ok_or(ConfigError::MissingApiKey)?
            .to_string();

        let api_base =
            non_empty(settings.api_base.as_deref()).ok_or(ConfigError::MissingEndpoint)?;
        let endpoint = parse_endpoint(api_base)?;

        let deployment = non_empty(settings.deployment.as_deref())
            .ok_or(ConfigError::MissingDeployment)?
            .to_string();

        let api_version = non_empty(settings.api_version.as_deref())
            .unwrap_or(DEFAULT_API_VERSION)
            .to_string();

        let temperature = settings.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidTemperature(temperature));
        }

        let max_tokens = settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens);
        }

        Ok(Self {
            api_key,
            endpoint,
            api_version,
            deployment,
            temperature,
            max_tokens,
            timeout: settings.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }

    /// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={version}`
    pub fn completions_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "openai",
                "deployments",
                self.deployment.as_str(),
                "chat",
                "completions",
            ]);
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("api-version", &self.api_version);
        url
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts a full URL or a bare `<resource>.openai.azure.com` host.
fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    if !raw.to_ascii_lowercase().contains(AZURE_HOST_MARKER) {
        return Err(ConfigError::NotAzureEndpoint(raw.to_string()));
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&with_scheme).map_err(|e| ConfigError::InvalidEndpoint {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "https" | "http") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEndpoint {
            url: raw.to_string(),
            reason: "expected an http(s) URL".to_string(),
        });
    }

    let host_ok = url
        .host_str()
        .map(|h| h.to_ascii_lowercase().ends_with(AZURE_HOST_MARKER))
        .unwrap_or(false);
    if !host_ok {
        return Err(ConfigError::NotAzureEndpoint(raw.to_string()));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AzureSettings {
        AzureSettings {
            api_key: Some("secret".to_string()),
            api_base: Some("https://contoso.openai.azure.com/".to_string()),
            deployment: Some("gpt-35-turbo".to_string()),
            ..AzureSettings::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AzureConfig::from_settings(settings()).unwrap();
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_completions_url() {
        let mut raw = settings();
        raw.api_version = Some("2024-02-01".to_string());
        let config = AzureConfig::from_settings(raw).unwrap();

        assert_eq!(
            config.completions_url().as_str(),
            "https://contoso.openai.azure.com/openai/deployments/gpt-35-turbo/chat/completions?api-version=2024-02-01"
        );
    }

    #[test]
    fn test_bare_host_gets_https() {
        let mut raw = settings();
        raw.api_base = Some("contoso.openai.azure.com".to_string());
        let config = AzureConfig::from_settings(raw).unwrap();
        assert_eq!(config.endpoint.as_str(), "https://contoso.openai.azure.com/");
    }

    #[test]
    fn test_missing_key() {
        let mut raw = settings();
        raw.api_key = Some("   ".to_string());
        assert_eq!(
            AzureConfig::from_settings(raw).unwrap_err(),
            ConfigError::MissingApiKey
        );
    }

    #[test]
    fn test_missing_endpoint() {
        let mut raw = settings();
        raw.api_base = None;
        assert_eq!(
            AzureConfig::from_settings(raw).unwrap_err(),
            ConfigError::MissingEndpoint
        );
    }

    #[test]
    fn test_non_azure_endpoint() {
        let mut raw = settings();
        raw.api_base = Some("https://api.openai.com/v1".to_string());
        assert!(matches!(
            AzureConfig::from_settings(raw),
            Err(ConfigError::NotAzureEndpoint(_))
        ));
    }

    #[test]
    fn test_azure_marker_outside_host() {
        let mut raw = settings();
        raw.api_base = Some("https://evil.example.com/openai.azure.com".to_string());
        assert!(matches!(
            AzureConfig::from_settings(raw),
            Err(ConfigError::NotAzureEndpoint(_))
        ));
    }

    #[test]
    fn test_missing_deployment() {
        let mut raw = settings();
        raw.deployment = None;
        assert_eq!(
            AzureConfig::from_settings(raw).unwrap_err(),
            ConfigError::MissingDeployment
        );
    }

    #[test]
    fn test_temperature_range() {
        let mut raw = settings();
        raw.temperature = Some(3.5);
        assert_eq!(
            AzureConfig::from_settings(raw).unwrap_err(),
            ConfigError::InvalidTemperature(3.5)
        );
    }

    #[test]
    fn test_zero_max_tokens() {
        let mut raw = settings();
        raw.max_tokens = Some(0);
        assert_eq!(
            AzureConfig::from_settings(raw).unwrap_err(),
            ConfigError::InvalidMaxTokens
        );
    }
}
