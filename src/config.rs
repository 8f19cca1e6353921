//! Configuration management

use crate::models::Principal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    // Backend
    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub supabase_anon_key: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    // Player
    #[serde(default)]
    pub external_player: String,
    #[serde(default = "default_true")]
    pub single_window_mode: bool,
    // Appearance
    #[serde(default = "default_true")]
    pub dark_mode: bool,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    // Home page rows
    #[serde(default = "default_featured_movies")]
    pub featured_movie_limit: usize,
    #[serde(default = "default_featured_series")]
    pub featured_series_limit: usize,
    #[serde(default = "default_latest_movies")]
    pub latest_movie_limit: usize,
}

fn default_connect_timeout() -> u64 { 10 }
fn default_request_timeout() -> u64 { 30 }
fn default_font_size() -> u32 { 14 }
fn default_true() -> bool { true }
fn default_featured_movies() -> usize { 1 }
fn default_featured_series() -> usize { 3 }
fn default_latest_movies() -> usize { 8 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            external_player: String::new(),
            single_window_mode: true,
            dark_mode: true,
            font_size: 14,
            featured_movie_limit: 1,
            featured_series_limit: 3,
            latest_movie_limit: 8,
        }
    }
}

pub const ENV_SUPABASE_URL: &str = "R1_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "R1_SUPABASE_ANON_KEY";

fn config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("r1_movies");
    fs::create_dir_all(&path).ok();
    path
}

impl AppConfig {
    fn config_path() -> PathBuf {
        config_dir().join("config.json")
    }

    pub fn load() -> Self {
        let path = Self::config_path();

        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => log::warn!("Ignoring unreadable config {}: {}", path.display(), e),
                },
                Err(e) => log::warn!("Could not read config {}: {}", path.display(), e),
            }
        }

        Self::default()
    }

    pub fn save(&self) {
        let path = Self::config_path();
        match serde_json::to_string_pretty(self) {
            Ok(content) => {
                if let Err(e) = fs::write(&path, content) {
                    log::error!("Failed to save config to {}: {}", path.display(), e);
                }
            }
            Err(e) => log::error!("Failed to serialize config: {}", e),
        }
    }

    /// Environment variables win over the file for the backend endpoint
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_SUPABASE_URL).ok(),
            std::env::var(ENV_SUPABASE_ANON_KEY).ok(),
        );
    }

    fn apply_overrides(&mut self, url: Option<String>, key: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.supabase_url = url.trim().to_string();
        }
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.supabase_anon_key = key.trim().to_string();
        }
    }

    pub fn backend_configured(&self) -> bool {
        !self.supabase_url.trim().is_empty() && !self.supabase_anon_key.trim().is_empty()
    }
}

/// Where the signed-in session is kept between runs
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> Self {
        Self::at(config_dir().join("session.json"))
    }

    pub fn load(&self) -> Option<Principal> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(principal) => Some(principal),
            Err(e) => {
                log::warn!("Discarding unreadable session file: {}", e);
                None
            }
        }
    }

    pub fn save(&self, principal: &Principal) {
        match serde_json::to_string_pretty(principal) {
            Ok(content) => {
                if let Err(e) = fs::write(&self.path, content) {
                    log::error!("Failed to save session: {}", e);
                }
            }
            Err(e) => log::error!("Failed to serialize session: {}", e),
        }
    }

    pub fn clear(&self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                log::warn!("Failed to remove session file: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_old_config_file_gets_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"external_player": "mpv"}"#).unwrap();
        assert_eq!(config.external_player, "mpv");
        assert_eq!(config.latest_movie_limit, 8);
        assert_eq!(config.featured_series_limit, 3);
        assert!(config.single_window_mode);
        assert!(!config.backend_configured());
    }

    #[test]
    fn test_overrides_ignore_blank_values() {
        let mut config = AppConfig {
            supabase_url: "https://file.supabase.co".into(),
            ..Default::default()
        };
        config.apply_overrides(Some("  ".into()), Some("anon".into()));
        assert_eq!(config.supabase_url, "https://file.supabase.co");
        assert_eq!(config.supabase_anon_key, "anon");
        assert!(config.backend_configured());

        config.apply_overrides(Some("https://env.supabase.co".into()), None);
        assert_eq!(config.supabase_url, "https://env.supabase.co");
    }

    #[test]
    fn test_session_file_roundtrip_and_clear() {
        let path = std::env::temp_dir().join(format!("r1_session_test_{}.json", std::process::id()));
        let file = SessionFile::at(path.clone());
        let principal = Principal {
            user_id: "u1".into(),
            email: "admin@example.com".into(),
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: 42,
        };

        file.save(&principal);
        assert_eq!(file.load(), Some(principal));

        file.clear();
        assert!(!path.exists());
        assert_eq!(file.load(), None);
    }
}
