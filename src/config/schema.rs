/// Configuration schema and defaults for glucochat.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[server]`, `[backend]`, `[dashboard]`, and `[logging]`.
///
/// Every field has a built-in default except `backend.url`, which must be
/// supplied by a config file or `GLUCOCHAT_BACKEND_URL`.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level glucochat configuration.
///
/// Maps directly to the `~/.glucochat/config.toml` and `.glucochat.toml`
/// file schemas. Missing sections fall back to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlucochatConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [server]
// ---------------------------------------------------------------------------

/// Embedded HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address for `glucochat serve`.
    pub addr: String,
    /// Open the dashboard in the default browser on startup.
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8787".to_string(),
            open_browser: false,
        }
    }
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

/// Field name the backend expects for the user's text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageField {
    #[default]
    Query,
    Message,
}

impl MessageField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Message => "message",
        }
    }
}

impl std::fmt::Display for MessageField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External chat backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend base URL, e.g. `http://localhost:8000`. Empty means unset,
    /// and the proxy refuses to forward.
    pub url: String,
    /// Path appended to `url`. An absolute `http(s)://` value is used as
    /// the full endpoint instead.
    pub chat_path: String,
    /// Outbound field carrying the user's text.
    pub message_field: MessageField,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            chat_path: "/chat".to_string(),
            message_field: MessageField::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// [dashboard]
// ---------------------------------------------------------------------------

/// What happens to the view mode when a reply carries no signal at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModePolicy {
    /// Keep the current mode.
    #[default]
    Sticky,
    /// Reset to the conversational mode and ignore keyword heuristics.
    Strict,
}

impl std::fmt::Display for ModePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sticky => write!(f, "sticky"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Dashboard derivation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub mode_policy: ModePolicy,
    /// Deprecated answer-text keyword fallback.
    pub keyword_heuristics: bool,
    /// Spacing of synthesized Kraft curve labels, in minutes.
    pub kraft_interval_minutes: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            mode_policy: ModePolicy::default(),
            keyword_heuristics: true,
            kraft_interval_minutes: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether diagnostics and the exchange log are written.
    pub enabled: bool,
    /// Log level: `"debug"`, `"info"`, `"warn"`, `"error"`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl GlucochatConfig {
    /// Generate the annotated default TOML config file content.
    ///
    /// Used by `glucochat config init`.
    pub fn default_toml() -> String {
        r#"# glucochat Configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (GLUCOCHAT_*)
#   2. Project config (.glucochat.toml in current directory)
#   3. User global config (~/.glucochat/config.toml)
#   4. Built-in defaults

[server]
addr = "127.0.0.1:8787"
open_browser = false

[backend]
url = ""                  # Required. Or set GLUCOCHAT_BACKEND_URL
chat_path = "/chat"       # Appended to url; an absolute http(s) URL replaces it
message_field = "query"   # query | message

[dashboard]
mode_policy = "sticky"    # sticky | strict
keyword_heuristics = true # Deprecated answer-text fallback
kraft_interval_minutes = 30

[logging]
enabled = true
level = "info"            # debug | info | warn | error
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = GlucochatConfig::default();
        assert_eq!(config.server.addr, "127.0.0.1:8787");
        assert!(config.backend.url.is_empty());
        assert_eq!(config.backend.chat_path, "/chat");
        assert_eq!(config.backend.message_field, MessageField::Query);
        assert_eq!(config.dashboard.mode_policy, ModePolicy::Sticky);
        assert!(config.dashboard.keyword_heuristics);
        assert_eq!(config.dashboard.kraft_interval_minutes, 30);
        assert!(config.logging.enabled);
    }

    #[test]
    fn deserialize_minimal_toml() {
        let toml_str = r#"
[backend]
url = "http://localhost:8000"
"#;
        let config: GlucochatConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.url, "http://localhost:8000");
        assert_eq!(config.backend.chat_path, "/chat");
        assert_eq!(config.dashboard.mode_policy, ModePolicy::Sticky);
    }

    #[test]
    fn deserialize_full_toml() {
        let toml_str = r#"
[server]
addr = "0.0.0.0:9000"
open_browser = true

[backend]
url = "https://api.example.com"
chat_path = "https://chat.example.com/v2/chat"
message_field = "message"

[dashboard]
mode_policy = "strict"
keyword_heuristics = false
kraft_interval_minutes = 15

[logging]
enabled = false
level = "debug"
"#;
        let config: GlucochatConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.addr, "0.0.0.0:9000");
        assert!(config.server.open_browser);
        assert_eq!(config.backend.message_field, MessageField::Message);
        assert_eq!(config.dashboard.mode_policy, ModePolicy::Strict);
        assert!(!config.dashboard.keyword_heuristics);
        assert_eq!(config.dashboard.kraft_interval_minutes, 15);
        assert!(!config.logging.enabled);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn empty_toml_produces_defaults() {
        let config: GlucochatConfig = toml::from_str("").unwrap();
        assert!(config.backend.url.is_empty());
        assert_eq!(config.dashboard.mode_policy, ModePolicy::Sticky);
    }

    #[test]
    fn default_toml_parses_back() {
        let config: GlucochatConfig = toml::from_str(&GlucochatConfig::default_toml()).unwrap();
        assert_eq!(config.backend.message_field, MessageField::Query);
        assert!(config.dashboard.keyword_heuristics);
    }

    #[test]
    fn enum_display() {
        assert_eq!(MessageField::Query.to_string(), "query");
        assert_eq!(MessageField::Message.to_string(), "message");
        assert_eq!(ModePolicy::Sticky.to_string(), "sticky");
        assert_eq!(ModePolicy::Strict.to_string(), "strict");
    }
}
