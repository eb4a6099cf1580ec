use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::models::{DEFAULT_COUNT, DEFAULT_QUALITY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub search: SearchDefaults,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// 搜索/下载请求的超时（秒）。音频流不受此限制。
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    pub quality: u32,
    pub count: u32,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            count: DEFAULT_COUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// 提示横幅显示时长（秒）。
    pub notice_secs: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { notice_secs: 3 }
    }
}

impl UiConfig {
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_secs.max(1))
    }
}

fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("tunefetch")
        .join("config.toml")
}

pub fn load_config() -> Config {
    load_from(&config_path())
}

pub fn save_config(config: &Config) -> Result<()> {
    save_to(&config_path(), config)
}

/// 读取配置文件；文件不存在或无法解析时使用默认值。
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            warn!("ignoring unreadable config {}: {}", path.display(), e);
            Config::default()
        }),
        Err(e) => {
            warn!("cannot read config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

pub fn save_to(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("无法创建目录 {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).with_context(|| format!("无法写入 {}", path.display()))?;
    Ok(())
}
