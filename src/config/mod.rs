/// Configuration system for glucochat.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::GlucochatConfig::default()`]
/// 2. **User global config**: `~/.glucochat/config.toml`
/// 3. **Project local config**: `.glucochat.toml` in the current working directory
/// 4. **Environment variables**: `GLUCOCHAT_*` overrides (highest precedence)
///
/// A file layer replaces the previous one wholesale; unset keys in a file
/// carry their defaults.
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::GlucochatConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> GlucochatConfig {
    let mut config = GlucochatConfig::default();

    if let Some(global) = load_toml_file(global_config_path()) {
        config = global;
    }

    if let Some(project) = load_toml_file(project_config_path()) {
        config = project;
    }

    apply_env_overrides(&mut config);

    config
}

/// Load a TOML config file from the given path (if it exists).
///
/// Malformed files are ignored so a bad edit never takes the proxy down.
fn load_toml_file(path: Option<PathBuf>) -> Option<GlucochatConfig> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    toml::from_str(&content).ok()
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Root of all per-user state: `~/.glucochat/`.
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".glucochat"))
}

fn global_config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".glucochat.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `GLUCOCHAT_BACKEND_URL`: backend base URL
/// - `GLUCOCHAT_MESSAGE_FIELD`: `query` or `message`
/// - `GLUCOCHAT_ADDR`: server listen address
/// - `GLUCOCHAT_MODE_POLICY`: `sticky` or `strict`
/// - `GLUCOCHAT_KEYWORD_HEURISTICS`: keyword fallback (`1`/`true`/`yes`/`on`)
/// - `GLUCOCHAT_LOG_LEVEL`: `debug`, `info`, `warn`, `error`
fn apply_env_overrides(config: &mut GlucochatConfig) {
    if let Ok(val) = std::env::var("GLUCOCHAT_BACKEND_URL")
        && !val.is_empty()
    {
        config.backend.url = val;
    }
    if let Ok(val) = std::env::var("GLUCOCHAT_MESSAGE_FIELD")
        && let Some(field) = parse_message_field(&val)
    {
        config.backend.message_field = field;
    }
    if let Ok(val) = std::env::var("GLUCOCHAT_ADDR")
        && !val.is_empty()
    {
        config.server.addr = val;
    }
    if let Ok(val) = std::env::var("GLUCOCHAT_MODE_POLICY")
        && let Some(policy) = parse_mode_policy(&val)
    {
        config.dashboard.mode_policy = policy;
    }
    if let Ok(val) = std::env::var("GLUCOCHAT_KEYWORD_HEURISTICS") {
        config.dashboard.keyword_heuristics = is_truthy(&val);
    }
    if let Ok(val) = std::env::var("GLUCOCHAT_LOG_LEVEL")
        && !val.is_empty()
    {
        config.logging.level = val.to_ascii_lowercase();
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_message_field(val: &str) -> Option<schema::MessageField> {
    match val.to_ascii_lowercase().as_str() {
        "query" => Some(schema::MessageField::Query),
        "message" => Some(schema::MessageField::Message),
        _ => None,
    }
}

fn parse_mode_policy(val: &str) -> Option<schema::ModePolicy> {
    match val.to_ascii_lowercase().as_str() {
        "sticky" => Some(schema::ModePolicy::Sticky),
        "strict" => Some(schema::ModePolicy::Strict),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.glucochat/config.toml`.
///
/// Returns an error if the file already exists and `force` is false.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.glucochat/ directory")?;
    }

    fs::write(&path, GlucochatConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single dotted config key (e.g. `backend.url`) in the global file.
///
/// Starts from the existing file, or from serialized defaults when there is
/// none.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let source = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&GlucochatConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&source).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Refuse writes that would leave an unloadable file behind.
    let rendered = toml::to_string_pretty(&root).context("failed to serialize config")?;
    toml::from_str::<GlucochatConfig>(&rendered)
        .with_context(|| format!("invalid value for '{key}': '{value}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, rendered).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::String(_)) => toml::Value::String(raw_value.to_string()),
        Some(_) => anyhow::bail!("'{key}' cannot be set from the command line"),
        None => anyhow::bail!("config key not found: '{key}'"),
    };

    table.insert((*leaf).to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
