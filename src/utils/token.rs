//! API token lookup: env var → .env in dir → `~/.github` property file → secure prompt.

use anyhow::{Context, Result};
use colored::Colorize;
use log::{info, warn};
use std::path::{Path, PathBuf};

const ENV_KEYS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];
/// Property file and key written by older GitHub mining tools.
const PROP_FILE_NAME: &str = ".github";
const PROP_KEY_TOKEN: &str = "oauth";

fn non_empty(s: String) -> Option<String> {
    let s = s.trim().to_string();
    (!s.is_empty()).then_some(s)
}

fn from_env() -> Option<String> {
    ENV_KEYS
        .iter()
        .find_map(|k| std::env::var(k).ok().and_then(non_empty))
}

fn try_env_then_dotenv(dir: &Path) -> Option<String> {
    if let Some(s) = from_env() {
        return Some(s);
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        return from_env();
    }
    None
}

/// Value of `key` in a Java-style `key=value` property text. `#` and `!` start comments.
pub fn property_value(text: &str, key: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#') && !l.starts_with('!'))
        .filter_map(|l| l.split_once(['=', ':']))
        .find(|(k, _)| k.trim() == key)
        .and_then(|(_, v)| non_empty(v.to_string()))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

fn from_property_file() -> Option<String> {
    let path = home_dir()?.join(PROP_FILE_NAME);
    let text = std::fs::read_to_string(&path).ok()?;
    let token = property_value(&text, PROP_KEY_TOKEN)?;
    info!("Token found in {}", path.display());
    Some(token)
}

/// Resolve the API token. `ask`: prompt on the terminal when no stored token exists.
/// Returns `Ok(None)` for anonymous access.
pub fn get_token(dir: &Path, ask: bool) -> Result<Option<String>> {
    if let Some(s) = try_env_then_dotenv(dir) {
        info!("Token found in environment");
        return Ok(Some(s));
    }
    if let Some(s) = from_property_file() {
        return Ok(Some(s));
    }
    if ask {
        let label = format!("[{}]", env!("CARGO_PKG_NAME")).cyan().bold();
        let token = rpassword::prompt_password(format!("{} GitHub token: ", label))
            .context("read token")?;
        return Ok(non_empty(token));
    }
    warn!("No GitHub token found; running anonymously with a much lower rate limit");
    Ok(None)
}
