//! CLI command implementations for glucochat.
//!
//! Provides subcommand handlers for:
//! - `glucochat serve`: run the chat page and proxy gateway
//! - `glucochat chat`: terminal conversation through a running gateway
//! - `glucochat stats`: exchange log summary
//! - `glucochat health`: config, backend, and log file checks
//! - `glucochat config show|init|set|reset`: configuration management

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::analytics::logger;
use crate::analytics::reporter::{self, Stats};
use crate::config::{self, GlucochatConfig};
use crate::dashboard::session;
use crate::dashboard::source::VendorCard;
use crate::dashboard::{ACTION_CHIPS, Controller, DashboardState, HttpTransport, Role, ViewMode};
use crate::logging;
use crate::web::{self, WebContext};

/// Output format for analytics commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// glucochat serve
// ---------------------------------------------------------------------------

/// Start the gateway; `addr` and `open` override the configured values.
pub fn run_serve(cfg: &GlucochatConfig, addr: Option<&str>, open: bool) -> Result<()> {
    let addr = addr.unwrap_or(&cfg.server.addr);
    web::serve(
        addr,
        WebContext::from_config(cfg),
        open || cfg.server.open_browser,
    )
}

// ---------------------------------------------------------------------------
// glucochat chat
// ---------------------------------------------------------------------------

/// Interactive conversation against a running gateway.
///
/// The session identifier is kept in `~/.glucochat/session_id` and rewritten
/// whenever the backend assigns a different one.
pub fn run_chat(cfg: &GlucochatConfig, proxy: Option<&str>) -> Result<()> {
    let base = proxy
        .map(str::to_string)
        .unwrap_or_else(|| format!("http://{}", cfg.server.addr));
    let transport = HttpTransport::new(&base);

    if !transport.is_reachable() {
        println!(
            "{} no gateway answering at {} (start one with `glucochat serve`)",
            "warning:".yellow().bold(),
            base
        );
    }

    let session_path = session::session_file();
    let session_id = match &session_path {
        Some(path) => session::load_or_create(path)?,
        None => session::new_session_id(),
    };

    println!("{}", "Metabolic Health Assistant".bold().cyan());
    println!("{}", "=".repeat(40));
    println!("  {} {}", "Session:".bold(), session_id.dimmed());
    println!(
        "  {}",
        "Type a question, /chips for suggestions, /quit to exit.".dimmed()
    );
    println!();

    let mut controller = Controller::new(
        transport,
        cfg.dashboard.clone(),
        DashboardState::new(session_id.clone()),
    );
    let mut known_session = session_id;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", ">".green().bold());
        io::stdout().flush().context("failed to flush stdout")?;

        let Some(line) = lines.next() else { break };
        let line = line.context("failed to read input")?;
        let input = match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/chips" => {
                print_chips();
                continue;
            }
            other => resolve_chip(other),
        };

        let previous_mode = controller.state().mode;
        let state = controller.send(&input);
        print_reply(state, previous_mode);

        if state.session_id != known_session && !state.session_id.is_empty() {
            known_session = state.session_id.clone();
            if let Some(path) = &session_path
                && let Err(e) = session::store(path, &known_session)
            {
                logging::warn(&format!("failed to persist session id: {e:#}"));
            }
        }
    }

    Ok(())
}

fn print_chips() {
    for (i, chip) in ACTION_CHIPS.iter().enumerate() {
        println!("  {} {}", format!("{}.", i + 1).dimmed(), chip);
    }
}

/// A bare chip number sends that chip's text.
fn resolve_chip(input: &str) -> String {
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| ACTION_CHIPS.get(i))
        .map(|chip| chip.to_string())
        .unwrap_or_else(|| input.to_string())
}

fn print_reply(state: &DashboardState, previous_mode: ViewMode) {
    let Some(message) = state.last_message() else {
        return;
    };
    if message.role != Role::Assistant {
        return;
    }

    println!("{}", message.content);
    for citation in &message.citations {
        let page = citation
            .page
            .map(|p| format!(" p.{p}"))
            .unwrap_or_default();
        let url = citation.url.as_deref().unwrap_or("");
        println!("  {} {}{} {}", "source:".dimmed(), citation.name, page, url.dimmed());
    }

    if state.mode != previous_mode {
        println!("{} {}", "panel:".dimmed(), state.mode.to_string().bold());
    }
    match state.mode {
        ViewMode::Response => {}
        ViewMode::Analysis => print_analysis_panel(state),
        ViewMode::Solution => print_solution_panel(&state.solution_panel()),
    }
    println!();
}

fn print_analysis_panel(state: &DashboardState) {
    println!();
    println!("  {} {}", "Biological age:".bold(), state.bio_age_display());
    println!(
        "  {:<10} {:>10} {:>10}",
        "Time", "Glucose", "Insulin"
    );
    println!("  {}", "-".repeat(32));
    for (i, point) in state.chart.iter().enumerate() {
        let line = format!(
            "  {:<10} {:>10.1} {:>10.1}",
            truncate(&point.time_label, 10),
            point.glucose_value,
            point.insulin_value
        );
        if i % 2 == 0 {
            println!("{}", line);
        } else {
            println!("{}", line.dimmed());
        }
    }
}

fn print_solution_panel(vendors: &[VendorCard]) {
    println!();
    for vendor in vendors {
        println!("  {}", vendor.title.bold());
        let meta: Vec<&str> = [vendor.category.as_str(), vendor.price.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        if !meta.is_empty() {
            println!("    {}", meta.join(" · ").dimmed());
        }
        if !vendor.description.is_empty() {
            println!("    {}", vendor.description);
        }
        if !vendor.tags.is_empty() {
            println!("    {}", vendor.tags.join(", ").cyan());
        }
    }
}

// ---------------------------------------------------------------------------
// glucochat stats
// ---------------------------------------------------------------------------

/// Show exchange statistics.
pub fn run_stats(format: OutputFormat, days: Option<u32>) -> Result<()> {
    let stats = reporter::compute_stats(days);

    if stats.total_requests == 0 {
        println!(
            "{}",
            "No data yet. Send some messages through `glucochat serve` to see stats.".yellow()
        );
        return Ok(());
    }

    match format {
        OutputFormat::Json => print_stats_json(&stats)?,
        OutputFormat::Csv => print_stats_csv(&stats),
        OutputFormat::Table => print_stats_table(&stats),
    }

    Ok(())
}

fn print_stats_table(stats: &Stats) {
    println!("{}", "glucochat Exchange Report".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();

    println!(
        "  {} {}",
        "Total requests: ".bold(),
        format_number(stats.total_requests)
    );
    println!(
        "  {} {}",
        "Unique sessions:".bold(),
        format_number(stats.unique_sessions)
    );
    println!(
        "  {} {}",
        "Avg latency:    ".bold(),
        stats
            .avg_latency_ms
            .map(|ms| format!("{ms:.0} ms"))
            .unwrap_or_else(|| "n/a".to_string())
    );
    println!(
        "  {} {}",
        "Max latency:    ".bold(),
        stats
            .max_latency_ms
            .map(|ms| format!("{ms} ms"))
            .unwrap_or_else(|| "n/a".to_string())
    );
    println!();

    let dist = &stats.outcomes;
    println!("{}", "Outcomes".bold().cyan());
    for (name, count) in [
        ("relayed", dist.relayed),
        ("backend_error", dist.backend_error),
        ("transport_error", dist.transport_error),
        ("bad_request", dist.bad_request),
        ("misconfigured", dist.misconfigured),
    ] {
        if count > 0 {
            println!(
                "  {:<18} {:>8} {:>6.0}%",
                colorize_outcome(name),
                format_number(count),
                dist.pct(count)
            );
        }
    }
    println!();

    println!("{}", "Status Codes".bold().cyan());
    for (status, count) in &stats.status_counts {
        println!("  {:<18} {:>8}", status, format_number(*count));
    }
}

fn print_stats_json(stats: &Stats) -> Result<()> {
    let value = serde_json::json!({
        "total_requests": stats.total_requests,
        "unique_sessions": stats.unique_sessions,
        "avg_latency_ms": stats.avg_latency_ms,
        "max_latency_ms": stats.max_latency_ms,
        "outcomes": {
            "relayed": stats.outcomes.relayed,
            "backend_error": stats.outcomes.backend_error,
            "transport_error": stats.outcomes.transport_error,
            "bad_request": stats.outcomes.bad_request,
            "misconfigured": stats.outcomes.misconfigured,
        },
        "status_counts": stats
            .status_counts
            .iter()
            .map(|(status, count)| (status.to_string(), serde_json::json!(count)))
            .collect::<serde_json::Map<_, _>>(),
    });

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_stats_csv(stats: &Stats) {
    println!("status,count");
    for (status, count) in &stats.status_counts {
        println!("{status},{count}");
    }
}

// ---------------------------------------------------------------------------
// glucochat health
// ---------------------------------------------------------------------------

/// Check configuration, backend reachability, and log files.
pub fn run_health(cfg: &GlucochatConfig) -> Result<()> {
    println!("{}", "glucochat Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file().is_some_and(|p| p.exists());
    let project_exists = config::project_config_file().is_some_and(|p| p.exists());
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.glucochat/config.toml found"
        } else {
            "not found (run `glucochat config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".glucochat.toml found"
        } else {
            "none (optional)"
        },
    );

    let ctx = WebContext::from_config(cfg);
    match ctx.gateway.endpoint() {
        Ok(endpoint) => {
            print_health_item("Backend endpoint", true, &endpoint);
            let reachable = backend_reachable(&endpoint);
            print_health_item(
                "Backend",
                reachable,
                if reachable {
                    "answering"
                } else {
                    "not reachable (is the backend running?)"
                },
            );
        }
        Err(e) => print_health_item("Backend endpoint", false, &format!("{e:#}")),
    }
    print_health_item(
        "Message field",
        true,
        cfg.backend.message_field.as_str(),
    );
    print_health_item(
        "Mode policy",
        true,
        &format!(
            "{} (keyword heuristics {})",
            cfg.dashboard.mode_policy,
            if cfg.dashboard.keyword_heuristics {
                "on"
            } else {
                "off"
            }
        ),
    );

    let log_exists = logger::exchange_log_path().is_some_and(|p| p.exists());
    print_health_item(
        "Exchange log",
        log_exists,
        &if log_exists {
            format!("{} entries", logger::read_all_entries().len())
        } else {
            "no log file yet".to_string()
        },
    );
    print_health_item(
        "Diagnostic log",
        cfg.logging.enabled,
        &format!("level {}", cfg.logging.level),
    );

    Ok(())
}

/// Any HTTP answer, even an error status, means the backend is up.
fn backend_reachable(endpoint: &str) -> bool {
    match ureq::get(endpoint)
        .timeout(std::time::Duration::from_secs(3))
        .call()
    {
        Ok(_) | Err(ureq::Error::Status(..)) => true,
        Err(_) => false,
    }
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<20} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// glucochat config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective glucochat Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file().is_some_and(|p| p.exists());
    let project_exists = config::project_config_file().is_some_and(|p| p.exists());
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.glucochat/config.toml", global_exists);
    print_source(".glucochat.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "GLUCOCHAT_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.glucochat/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!("  {}", "Set backend.url before running `glucochat serve`.".dimmed());
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Format a number with thousands separators.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Truncate to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

fn colorize_outcome(outcome: &str) -> colored::ColoredString {
    match outcome {
        "relayed" => outcome.green(),
        "backend_error" => outcome.yellow(),
        "bad_request" => outcome.normal(),
        _ => outcome.red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("0 min", 10), "0 min");
        assert_eq!(truncate("hello world", 5), "hell…");
        assert_eq!(truncate("µµµ", 2), "µ…");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("csv")), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::from_str_opt(Some("unknown")),
            OutputFormat::Table
        );
    }

    #[test]
    fn chip_numbers_expand_to_chip_text() {
        assert_eq!(resolve_chip("2"), "Find a Specialist");
        assert_eq!(resolve_chip("0"), "0");
        assert_eq!(resolve_chip("9"), "9");
        assert_eq!(resolve_chip("what is insulin?"), "what is insulin?");
    }
}
