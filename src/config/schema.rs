use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

fn default_base_url() -> String {
    "http://localhost:4545".to_string()
}

/// Client configuration, stored as TOML at `~/.capchat/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Session state directory - computed from home, not serialized
    #[serde(skip)]
    pub state_dir: PathBuf,

    /// Chat endpoint root. Prompts go to `{base_url}/chat`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            state_dir: PathBuf::new(),
            base_url: default_base_url(),
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Self::load_or_init_at(home.join(".capchat"))
    }

    /// `load_or_init` rooted at an explicit directory instead of `~/.capchat`.
    pub fn load_or_init_at(capchat_dir: PathBuf) -> Result<Self> {
        let config_path = capchat_dir.join("config.toml");
        let state_dir = capchat_dir.join("state");

        if !capchat_dir.exists() {
            fs::create_dir_all(&capchat_dir).context("Failed to create .capchat directory")?;
        }

        if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            // Set computed paths that are skipped during serialization
            config.config_path = config_path;
            config.state_dir = state_dir;
            Ok(config)
        } else {
            let mut config = Config::default();
            config.config_path = config_path;
            config.state_dir = state_dir;
            config.save()?;
            Ok(config)
        }
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        // Endpoint root: CAPCHAT_BASE_URL
        if let Ok(url) = std::env::var("CAPCHAT_BASE_URL") {
            if !url.is_empty() {
                self.base_url = url;
            }
        }

        // State directory: CAPCHAT_STATE_DIR
        if let Ok(dir) = std::env::var("CAPCHAT_STATE_DIR") {
            if !dir.is_empty() {
                self.state_dir = PathBuf::from(dir);
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;
        fs::create_dir_all(parent_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                parent_dir.display()
            )
        })?;

        let file_name = self
            .config_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("config.toml");
        let temp_path = parent_dir.join(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));
        let backup_path = parent_dir.join(format!("{file_name}.bak"));

        let mut temp_file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .with_context(|| {
                format!(
                    "Failed to create temporary config file: {}",
                    temp_path.display()
                )
            })?;
        temp_file
            .write_all(toml_str.as_bytes())
            .context("Failed to write temporary config contents")?;
        temp_file
            .sync_all()
            .context("Failed to fsync temporary config file")?;
        drop(temp_file);

        let had_existing_config = self.config_path.exists();
        if had_existing_config {
            fs::copy(&self.config_path, &backup_path).with_context(|| {
                format!(
                    "Failed to create config backup before atomic replace: {}",
                    backup_path.display()
                )
            })?;
        }

        if let Err(e) = fs::rename(&temp_path, &self.config_path) {
            let _ = fs::remove_file(&temp_path);
            if had_existing_config && backup_path.exists() {
                let _ = fs::copy(&backup_path, &self.config_path);
            }
            anyhow::bail!("Failed to atomically replace config file: {e}");
        }

        sync_directory(parent_dir)?;

        if had_existing_config {
            let _ = fs::remove_file(&backup_path);
        }

        Ok(())
    }
}

#[cfg(unix)]
fn sync_directory(path: &Path) -> Result<()> {
    let dir = File::open(path)
        .with_context(|| format!("Failed to open directory for fsync: {}", path.display()))?;
    dir.sync_all()
        .with_context(|| format!("Failed to fsync directory metadata: {}", path.display()))?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env_override_test_guard() -> std::sync::MutexGuard<'static, ()> {
        static ENV_OVERRIDE_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
        ENV_OVERRIDE_TEST_LOCK
            .lock()
            .expect("env override test lock poisoned")
    }

    // ── Defaults ─────────────────────────────────────────────

    #[test]
    fn config_default_has_sane_values() {
        let c = Config::default();
        assert_eq!(c.base_url, "http://localhost:4545");
        assert_eq!(c.config_path, PathBuf::new());
        assert_eq!(c.state_dir, PathBuf::new());
    }

    // ── Serde ────────────────────────────────────────────────

    #[test]
    fn config_toml_roundtrip() {
        let mut config = Config::default();
        config.base_url = "https://bots.example.com".into();

        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("parse");
        assert_eq!(parsed.base_url, "https://bots.example.com");
        // Computed paths never travel through the file
        assert_eq!(parsed.config_path, PathBuf::new());
        assert_eq!(parsed.state_dir, PathBuf::new());
    }

    #[test]
    fn empty_config_file_gets_default_base_url() {
        let parsed: Config = toml::from_str("").expect("parse empty config");
        assert_eq!(parsed.base_url, "http://localhost:4545");
    }

    // ── load_or_init ─────────────────────────────────────────

    #[test]
    fn load_or_init_writes_default_config_on_first_run() {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path().join(".capchat");

        let config = Config::load_or_init_at(root.clone()).expect("first init");
        assert!(root.join("config.toml").exists());
        assert_eq!(config.base_url, "http://localhost:4545");
        assert_eq!(config.state_dir, root.join("state"));
    }

    #[test]
    fn load_or_init_reads_existing_config() {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path().join(".capchat");
        fs::create_dir_all(&root).expect("mkdir");
        fs::write(
            root.join("config.toml"),
            "base_url = \"https://bots.example.com\"\n",
        )
        .expect("write config");

        let config = Config::load_or_init_at(root).expect("load");
        assert_eq!(config.base_url, "https://bots.example.com");
    }

    #[test]
    fn load_or_init_rejects_malformed_config() {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path().join(".capchat");
        fs::create_dir_all(&root).expect("mkdir");
        fs::write(root.join("config.toml"), "base_url = [not toml").expect("write config");

        assert!(Config::load_or_init_at(root).is_err());
    }

    // ── Save ─────────────────────────────────────────────────

    #[test]
    fn save_never_leaves_temp_files_behind() {
        let dir = TempDir::new().expect("tempdir");
        let mut config = Config::default();
        config.config_path = dir.path().join("config.toml");
        config.save().expect("first save");
        config.base_url = "https://other.example.com".into();
        config.save().expect("second save");

        let names: Vec<String> = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(!names.iter().any(|name| name.contains(".tmp-")));
        assert!(!names.iter().any(|name| name.ends_with(".bak")));
    }

    // ── Env overrides ────────────────────────────────────────

    #[test]
    fn env_override_base_url() {
        let _env_guard = env_override_test_guard();
        let mut config = Config::default();

        // SAFETY: env access is serialized by the test guard.
        unsafe { std::env::set_var("CAPCHAT_BASE_URL", "https://env.example.com") };
        config.apply_env_overrides();
        assert_eq!(config.base_url, "https://env.example.com");

        unsafe { std::env::remove_var("CAPCHAT_BASE_URL") };
    }

    #[test]
    fn env_override_state_dir() {
        let _env_guard = env_override_test_guard();
        let mut config = Config::default();

        // SAFETY: env access is serialized by the test guard.
        unsafe { std::env::set_var("CAPCHAT_STATE_DIR", "/custom/state") };
        config.apply_env_overrides();
        assert_eq!(config.state_dir, PathBuf::from("/custom/state"));

        unsafe { std::env::remove_var("CAPCHAT_STATE_DIR") };
    }

    #[test]
    fn env_override_empty_values_ignored() {
        let _env_guard = env_override_test_guard();
        let mut config = Config::default();

        // SAFETY: env access is serialized by the test guard.
        unsafe { std::env::set_var("CAPCHAT_BASE_URL", "") };
        config.apply_env_overrides();
        assert_eq!(config.base_url, "http://localhost:4545");

        unsafe { std::env::remove_var("CAPCHAT_BASE_URL") };
    }
}
