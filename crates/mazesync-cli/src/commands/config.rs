use super::context::AppContext;
use crate::output::Output;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color, Table};
use episode_sync_config::{Config, CredentialStore};
use owo_colors::OwoColorize;
use serde_json::json;

pub fn show_config(full: bool, output: &Output) -> Result<()> {
    let context = AppContext::load()?;
    let config_file = context.paths.config_file();
    let config = &context.config;

    if !output.is_human() {
        output.json(&config_json(config, &context.credentials, full));
        return Ok(());
    }

    let mut info_table = Table::new();
    info_table.set_header(vec![
        Cell::new("Config File").add_attribute(Attribute::Bold),
        Cell::new(config_file.display().to_string()),
    ]);
    if !config_file.exists() {
        info_table.add_row(vec![Cell::new("Status"), Cell::new("not found, using defaults")]);
    }
    info_table.add_row(vec![
        Cell::new("Ledger"),
        Cell::new(context.paths.ledger_file().display().to_string()),
    ]);
    print_table(info_table);

    let mut tvmaze_table = section("TVmaze");
    tvmaze_table.add_row(vec![Cell::new("API URL"), Cell::new(&config.tvmaze.api_url)]);
    tvmaze_table.add_row(vec![Cell::new("User API URL"), Cell::new(&config.tvmaze.user_api_url)]);
    tvmaze_table.add_row(vec![Cell::new("User Agent"), Cell::new(&config.tvmaze.user_agent)]);
    match context.credentials.get_credentials() {
        Some(credentials) => {
            let api_key = if full { credentials.api_key.clone() } else { mask_string(&credentials.api_key) };
            tvmaze_table.add_row(vec![Cell::new("Authorized"), Cell::new("✓".green().to_string())]);
            tvmaze_table.add_row(vec![Cell::new("Username"), Cell::new(&credentials.username)]);
            tvmaze_table.add_row(vec![Cell::new("API Key"), Cell::new(api_key)]);
            if let Some(authorized_at) = context.credentials.get_authorized_at() {
                tvmaze_table.add_row(vec![Cell::new("Authorized At"), Cell::new(authorized_at.to_rfc3339())]);
            }
        }
        None => {
            tvmaze_table.add_row(vec![Cell::new("Authorized"), Cell::new("✗".red().to_string())]);
        }
    }
    print_table(tvmaze_table);

    let mut kodi_table = section("Kodi");
    kodi_table.add_row(vec![Cell::new("JSON-RPC URL"), Cell::new(&config.kodi.url)]);
    kodi_table.add_row(vec![Cell::new("Notifications"), Cell::new(&config.kodi.notifications)]);
    kodi_table.add_row(vec![
        Cell::new("Username"),
        Cell::new(config.kodi.username.as_deref().unwrap_or("<not set>")),
    ]);
    let password = match &config.kodi.password {
        Some(password) if full => password.clone(),
        Some(password) => mask_string(password),
        None => "<not set>".to_string(),
    };
    kodi_table.add_row(vec![Cell::new("Password"), Cell::new(password)]);
    print_table(kodi_table);

    let mut sync_table = section("Sync");
    sync_table.add_row(vec![Cell::new("Debounce"), Cell::new(format!("{}s", config.sync.debounce_seconds))]);
    sync_table.add_row(vec![Cell::new("Poll Interval"), Cell::new(format!("{}s", config.sync.poll_interval_seconds))]);
    sync_table.add_row(vec![
        Cell::new("Ledger Retention"),
        Cell::new(format!("{} days", config.sync.ledger_retention_days)),
    ]);
    sync_table.add_row(vec![
        Cell::new("Watch Pull Interval"),
        Cell::new(format!("{}s", config.watch.pull_interval_seconds)),
    ]);
    sync_table.add_row(vec![
        Cell::new("Pull On Startup"),
        Cell::new(if config.watch.pull_on_startup { "✓".green().to_string() } else { "✗".red().to_string() }),
    ]);
    print_table(sync_table);

    if !full {
        output.println(format!("{}", "Secrets are masked. Use --full to show them.".bright_black()));
    }

    Ok(())
}

fn section(title: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new(format!("{} Configuration", title)).fg(Color::Cyan).add_attribute(Attribute::Bold),
    ]);
    table
}

fn print_table(mut table: Table) {
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}", table);
    println!();
}

fn config_json(config: &Config, credentials: &CredentialStore, full: bool) -> serde_json::Value {
    let reveal = |value: &str| if full { value.to_string() } else { mask_string(value) };
    let account = credentials.get_credentials();

    json!({
        "tvmaze": {
            "api_url": config.tvmaze.api_url,
            "user_api_url": config.tvmaze.user_api_url,
            "user_agent": config.tvmaze.user_agent,
            "authorized": account.is_some(),
            "username": account.as_ref().map(|c| c.username.clone()),
            "api_key": account.as_ref().map(|c| reveal(c.api_key.as_str())),
        },
        "kodi": {
            "url": config.kodi.url,
            "notifications": config.kodi.notifications,
            "username": config.kodi.username,
            "password": config.kodi.password.as_deref().map(reveal),
        },
        "sync": {
            "debounce_seconds": config.sync.debounce_seconds,
            "poll_interval_seconds": config.sync.poll_interval_seconds,
            "ledger_retention_days": config.sync.ledger_retention_days,
        },
        "watch": {
            "pull_interval_seconds": config.watch.pull_interval_seconds,
            "pull_on_startup": config.watch.pull_on_startup,
        },
    })
}

fn mask_string(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use episode_sync_models::Credentials;

    #[test]
    fn test_mask_string() {
        assert_eq!(mask_string(""), "<not set>");
        assert_eq!(mask_string("abc"), "***");
        assert_eq!(mask_string("abcdefgh"), "ab***gh");
    }

    #[test]
    fn test_config_json_masks_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CredentialStore::new(dir.path().join("credentials.toml"));
        store.set_credentials(&Credentials::new("alice", "0123456789"));

        let mut config = Config::default();
        config.kodi.username = Some("kodi".to_string());
        config.kodi.password = Some("hunter22".to_string());

        let masked = config_json(&config, &store, false);
        assert_eq!(masked["tvmaze"]["authorized"], true);
        assert_eq!(masked["tvmaze"]["username"], "alice");
        assert_eq!(masked["tvmaze"]["api_key"], "01***89");
        assert_eq!(masked["kodi"]["password"], "hu***22");

        let full = config_json(&config, &store, true);
        assert_eq!(full["tvmaze"]["api_key"], "0123456789");
        assert_eq!(full["kodi"]["password"], "hunter22");
    }

    #[test]
    fn test_config_json_without_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.toml"));

        let value = config_json(&Config::default(), &store, false);
        assert_eq!(value["tvmaze"]["authorized"], false);
        assert!(value["tvmaze"]["api_key"].is_null());
        assert!(value["kodi"]["password"].is_null());
    }
}
