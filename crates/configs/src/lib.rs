use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

pub const DEFAULT_SNAP_NAME: &str = "ratings";
pub const DEFAULT_CHANNEL: &str = "latest/stable";

const RISKS: [&str; 4] = ["stable", "candidate", "beta", "edge"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub snap: SnapConfig,
    #[serde(default)]
    pub ratings: RatingsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default)]
    pub classic: bool,
    #[serde(default)]
    pub purge_on_remove: bool,
    #[serde(default = "default_snap_bin")]
    pub snap_bin: String,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            channel: default_channel(),
            classic: false,
            purge_on_remove: false,
            snap_bin: default_snap_bin(),
        }
    }
}

/// Values pushed into the snap's configuration by `ratingsctl configure`.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct RatingsConfig {
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub postgres_uri: Option<String>,
    #[serde(default)]
    pub migration_postgres_uri: Option<String>,
}

fn default_name() -> String {
    DEFAULT_SNAP_NAME.to_string()
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

fn default_snap_bin() -> String {
    "snap".to_string()
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "ratings.toml".to_string());
    if std::path::Path::new(&path).exists() {
        load_from_file(&path)
    } else {
        Ok(AppConfig::default())
    }
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.apply_env();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Overlay environment variables on top of the file values.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("RATINGS_SNAP_NAME") {
            self.snap.name = name;
        }
        if let Some(channel) = lookup("RATINGS_SNAP_CHANNEL") {
            self.snap.channel = channel;
        }
        let r = &mut self.ratings;
        for (var, slot) in [
            ("APP_JWT_SECRET", &mut r.jwt_secret),
            ("APP_LOG_LEVEL", &mut r.log_level),
            ("APP_POSTGRES_URI", &mut r.postgres_uri),
            ("APP_MIGRATION_POSTGRES_URI", &mut r.migration_postgres_uri),
        ] {
            if let Some(v) = lookup(var) {
                *slot = Some(v);
            }
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.snap.normalize()?;
        self.ratings.validate()?;
        Ok(())
    }
}

impl SnapConfig {
    fn normalize(&mut self) -> Result<()> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(anyhow!("snap.name 不能为空"));
        }
        if self.channel.trim().is_empty() {
            self.channel = default_channel();
        }
        if self.snap_bin.trim().is_empty() {
            self.snap_bin = default_snap_bin();
        }
        validate_channel(&self.channel)
    }
}

/// Channels are `[track/]risk[/branch]`.
fn validate_channel(channel: &str) -> Result<()> {
    let parts: Vec<&str> = channel.split('/').collect();
    let ok = match parts.as_slice() {
        [risk] => RISKS.contains(risk),
        [track, risk] => (!track.is_empty() && RISKS.contains(risk))
            || (RISKS.contains(track) && !risk.is_empty()),
        [track, risk, branch] => !track.is_empty() && RISKS.contains(risk) && !branch.is_empty(),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(anyhow!("snap.channel 格式无效: {channel}"))
    }
}

impl RatingsConfig {
    pub fn is_empty(&self) -> bool {
        self.jwt_secret.is_none()
            && self.log_level.is_none()
            && self.postgres_uri.is_none()
            && self.migration_postgres_uri.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(level) = &self.log_level {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(anyhow!("ratings.log_level 必须是 trace/debug/info/warn/error 之一"));
            }
        }
        for (field, uri) in [
            ("postgres_uri", &self.postgres_uri),
            ("migration_postgres_uri", &self.migration_postgres_uri),
        ] {
            if let Some(uri) = uri {
                let lower = uri.to_lowercase();
                if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
                    return Err(anyhow!("ratings.{field} 必须以 postgresql:// 或 postgres:// 开头"));
                }
            }
        }
        if let Some(secret) = &self.jwt_secret {
            if secret.is_empty() {
                return Err(anyhow!("ratings.jwt_secret 不能为空字符串"));
            }
        }
        Ok(())
    }
}
