use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub helpdesk: HelpdeskConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// When set, trigger endpoints require this key (Bearer or X-API-Key).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Helpdesk (ticketing API) configuration.
///
/// Credentials are optional at load time. A missing url, email or token is
/// reported when a client is built, so a misconfigured deployment fails each
/// invocation instead of refusing to start.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HelpdeskConfig {
    /// Base URL, e.g. "https://acme.zendesk.com"
    #[serde(default)]
    pub url: Option<String>,
    /// Service account email
    #[serde(default)]
    pub email: Option<String>,
    /// Service API token
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout in milliseconds (default: 5000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum length of a combined search query (default: 2000)
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
    /// Where the plaintext transcript goes when a voice comment exists
    #[serde(default)]
    pub transcript_destination: TranscriptDestination,
}

impl Default for HelpdeskConfig {
    fn default() -> Self {
        Self {
            url: None,
            email: None,
            token: None,
            timeout_ms: default_timeout_ms(),
            max_query_length: default_max_query_length(),
            transcript_destination: TranscriptDestination::default(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_query_length() -> usize {
    2000
}

/// Destination of the call transcript.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptDestination {
    /// Inline the HTML transcript in the ticket comment.
    #[default]
    Ticket,
    /// Attach the plaintext transcript to the voice call, if the ticket has one.
    #[serde(alias = "Voice comment")]
    VoiceComment,
}

/// Longest accepted pending-match lifetime (ten years).
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365 * 10;

/// Retry store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
    /// Lifetime of a pending match in minutes (default: 1440)
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

impl RetryConfig {
    /// Lifetime of a pending match, clamped to `MAX_TTL_MINUTES` either way.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_minutes.clamp(-MAX_TTL_MINUTES, MAX_TTL_MINUTES))
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("lensdesk.db")
}

fn default_ttl_minutes() -> i64 {
    1440
}

/// Category markers controlling which contacts are reconciled.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterConfig {
    /// Forces inclusion even when the exclusion marker matched.
    #[serde(default)]
    pub inclusion_category: Option<String>,
    #[serde(default)]
    pub exclusion_category: Option<String>,
}

/// File-backed analysis source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_analysis_root")]
    pub root_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            root_dir: default_analysis_root(),
        }
    }
}

fn default_analysis_root() -> PathBuf {
    PathBuf::from("analysis")
}

/// Comment rendering options
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RenderConfig {
    /// Contact center instance URL used to link the contact trace record.
    #[serde(default)]
    pub connect_instance_url: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Scheduled sweep configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_enabled")]
    pub enabled: bool,
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: default_sweep_enabled(),
            interval_secs: default_sweep_interval(),
        }
    }
}

fn default_sweep_enabled() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    300
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: SanitizedServerConfig,
    pub helpdesk: SanitizedHelpdeskConfig,
    pub retry: RetryConfig,
    pub filter: FilterConfig,
    pub analysis: AnalysisConfig,
    pub render: RenderConfig,
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub api_key_configured: bool,
}

/// Sanitized helpdesk config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedHelpdeskConfig {
    pub url: Option<String>,
    pub email: Option<String>,
    pub token_configured: bool,
    pub timeout_ms: u64,
    pub max_query_length: usize,
    pub transcript_destination: TranscriptDestination,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: SanitizedServerConfig {
                host: config.server.host,
                port: config.server.port,
                api_key_configured: config.server.api_key.is_some(),
            },
            helpdesk: SanitizedHelpdeskConfig {
                url: config.helpdesk.url.clone(),
                email: config.helpdesk.email.clone(),
                token_configured: config
                    .helpdesk
                    .token
                    .as_deref()
                    .is_some_and(|t| !t.is_empty()),
                timeout_ms: config.helpdesk.timeout_ms,
                max_query_length: config.helpdesk.max_query_length,
                transcript_destination: config.helpdesk.transcript_destination,
            },
            retry: config.retry.clone(),
            filter: config.filter.clone(),
            analysis: config.analysis.clone(),
            render: config.render.clone(),
            sweep: config.sweep.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_ttl() {
        let retry = RetryConfig {
            ttl_minutes: 90,
            ..RetryConfig::default()
        };
        assert_eq!(retry.ttl(), chrono::Duration::minutes(90));
    }

    #[test]
    fn test_retry_ttl_out_of_range_is_clamped() {
        let retry = RetryConfig {
            ttl_minutes: i64::MAX,
            ..RetryConfig::default()
        };
        assert_eq!(retry.ttl(), chrono::Duration::minutes(MAX_TTL_MINUTES));

        let retry = RetryConfig {
            ttl_minutes: i64::MIN,
            ..RetryConfig::default()
        };
        assert_eq!(retry.ttl(), chrono::Duration::minutes(-MAX_TTL_MINUTES));
    }

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert!(config.helpdesk.url.is_none());
        assert_eq!(config.helpdesk.timeout_ms, 5000);
        assert_eq!(config.helpdesk.max_query_length, 2000);
        assert_eq!(
            config.helpdesk.transcript_destination,
            TranscriptDestination::Ticket
        );
        assert_eq!(config.retry.ttl_minutes, 1440);
        assert_eq!(config.retry.database_path.to_str().unwrap(), "lensdesk.db");
        assert!(config.sweep.enabled);
        assert_eq!(config.sweep.interval_secs, 300);
    }

    #[test]
    fn test_deserialize_helpdesk_section() {
        let toml = r#"
[helpdesk]
url = "https://acme.zendesk.com"
email = "bot@acme.com"
token = "secret"
timeout_ms = 2500
max_query_length = 1024
transcript_destination = "voice_comment"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.helpdesk.url.as_deref(),
            Some("https://acme.zendesk.com")
        );
        assert_eq!(config.helpdesk.email.as_deref(), Some("bot@acme.com"));
        assert_eq!(config.helpdesk.timeout_ms, 2500);
        assert_eq!(config.helpdesk.max_query_length, 1024);
        assert_eq!(
            config.helpdesk.transcript_destination,
            TranscriptDestination::VoiceComment
        );
    }

    #[test]
    fn test_transcript_destination_accepts_legacy_label() {
        let toml = r#"
[helpdesk]
transcript_destination = "Voice comment"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.helpdesk.transcript_destination,
            TranscriptDestination::VoiceComment
        );
    }

    #[test]
    fn test_deserialize_filter_and_retry() {
        let toml = r#"
[filter]
inclusion_category = "force-sync"
exclusion_category = "no-sync"

[retry]
database_path = "/data/retries.db"
ttl_minutes = 60
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.filter.inclusion_category.as_deref(), Some("force-sync"));
        assert_eq!(config.filter.exclusion_category.as_deref(), Some("no-sync"));
        assert_eq!(config.retry.ttl_minutes, 60);
        assert_eq!(
            config.retry.database_path.to_str().unwrap(),
            "/data/retries.db"
        );
    }

    #[test]
    fn test_sanitized_config_hides_token() {
        let mut config = Config::default();
        config.helpdesk.url = Some("https://acme.zendesk.com".to_string());
        config.helpdesk.token = Some("secret".to_string());
        config.server.api_key = Some("key".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.helpdesk.token_configured);
        assert!(sanitized.server.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("\"key\""));
    }

    #[test]
    fn test_sanitized_config_empty_token_not_configured() {
        let mut config = Config::default();
        config.helpdesk.token = Some(String::new());
        let sanitized = SanitizedConfig::from(&config);
        assert!(!sanitized.helpdesk.token_configured);
    }
}
