use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize, Clone)]
pub struct InventoryConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct ScannerConfig {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_ms: Option<u64>,
    pub export_timeout_ms: Option<u64>,
    pub page_size: Option<u64>,
    pub export_page_size: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct SyncConfig {
    pub name_prefix: Option<String>,
    pub group_concurrency: Option<usize>,
    pub scheduler_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    pub inventory: Option<InventoryConfig>,
    pub scanner: Option<ScannerConfig>,
    pub sync: Option<SyncConfig>,
}

pub fn load_config(path: Option<&Path>) -> Option<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new("scopesync.yaml");
            if p.exists() { p.to_path_buf() } else { return None; }
        }
    };
    let s = fs::read_to_string(path).ok()?;
    serde_yaml::from_str(&s).ok()
}

/// Fully resolved, validated settings for one run. Environment
/// variables beat file values; scanner credentials and the store path
/// have no defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub name_prefix: String,
    pub timeout_ms: u64,
    pub export_timeout_ms: u64,
    pub page_size: u64,
    pub export_page_size: u64,
    pub group_concurrency: usize,
    pub scheduler_interval_secs: u64,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

pub fn resolve(cfg: Option<Config>) -> Result<Settings> {
    let cfg = cfg.unwrap_or_default();
    let inventory = cfg.inventory.unwrap_or_default();
    let scanner = cfg.scanner.unwrap_or_default();
    let sync = cfg.sync.unwrap_or_default();

    let db_path = env_var("SCOPESYNC_DB")
        .map(PathBuf::from)
        .or(inventory.path)
        .ok_or_else(|| anyhow!("inventory store path missing (SCOPESYNC_DB or inventory.path)"))?;
    let base_url = env_var("SCOPESYNC_SCANNER_URL")
        .or(scanner.base_url)
        .ok_or_else(|| anyhow!("scanner base url missing (SCOPESYNC_SCANNER_URL or scanner.base_url)"))?;
    let username = env_var("SCOPESYNC_SCANNER_USERNAME")
        .or(scanner.username)
        .ok_or_else(|| anyhow!("scanner username missing"))?;
    let password = env_var("SCOPESYNC_SCANNER_PASSWORD")
        .or(scanner.password)
        .ok_or_else(|| anyhow!("scanner password missing"))?;
    let name_prefix = env_var("SCOPESYNC_NAME_PREFIX")
        .or(sync.name_prefix)
        .unwrap_or_default();

    Ok(Settings {
        db_path,
        base_url,
        username,
        password,
        name_prefix,
        timeout_ms: scanner.timeout_ms.unwrap_or(10_000),
        export_timeout_ms: scanner.export_timeout_ms.unwrap_or(60_000),
        page_size: scanner.page_size.unwrap_or(10),
        export_page_size: scanner.export_page_size.unwrap_or(10_000),
        group_concurrency: sync.group_concurrency.unwrap_or(8),
        scheduler_interval_secs: sync.scheduler_interval_secs.unwrap_or(86_400),
    })
}
