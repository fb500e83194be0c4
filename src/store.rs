//! 自選股與顯示偏好的設定檔。
//!
//! 格式為 `{ "stocks": [...], "opacity": 0.85, "refresh_interval": 5 }`。
//! 讀取失敗一律回到預設值，不把錯誤往上拋；寫入時整份覆蓋，
//! 並以鎖保證同一時間只有一個寫入者。

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{config::SETTINGS, declare::Symbol, error::QuoteError, logging};

/// 設定檔不存在或壞掉時的預設自選股
pub const DEFAULT_STOCKS: [&str; 3] = ["600519", "000001", "600036"];
pub const DEFAULT_OPACITY: f64 = 0.85;
pub const MIN_OPACITY: f64 = 0.5;
pub const MAX_OPACITY: f64 = 1.0;
pub const DEFAULT_REFRESH_INTERVAL: u64 = 5;
pub const MIN_REFRESH_INTERVAL: u64 = 1;
pub const MAX_REFRESH_INTERVAL: u64 = 60;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    /// 依顯示順序排列的股票代碼
    #[serde(default, deserialize_with = "lenient_stocks")]
    pub stocks: Vec<String>,
    /// 視窗透明度
    #[serde(default = "default_opacity", deserialize_with = "lenient_opacity")]
    pub opacity: f64,
    /// 刷新間隔(秒)
    #[serde(
        default = "default_refresh_interval",
        deserialize_with = "lenient_refresh_interval"
    )]
    pub refresh_interval: u64,
}

fn default_opacity() -> f64 {
    DEFAULT_OPACITY
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL
}

// 各欄位各自容錯，型別不對只影響該欄位，其他欄位照常讀取

fn lenient_stocks<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let stocks = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(code) => Some(code),
                other => {
                    logging::warn_file_async(format!("Skip the stock in config: {}", other));
                    None
                }
            })
            .collect(),
        other => {
            logging::warn_file_async(format!("The stocks in config is not a list: {}", other));
            Vec::new()
        }
    };

    Ok(stocks)
}

fn lenient_opacity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().unwrap_or_else(|| {
        logging::warn_file_async(format!("Use the default opacity instead of {}", value));
        DEFAULT_OPACITY
    }))
}

/// 負數或小數也接受，之後再夾回允許範圍
fn lenient_refresh_interval<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match value.as_f64() {
        Some(seconds) if seconds.is_finite() => Ok(seconds
            .round()
            .clamp(MIN_REFRESH_INTERVAL as f64, MAX_REFRESH_INTERVAL as f64)
            as u64),
        _ => {
            logging::warn_file_async(format!(
                "Use the default refresh interval instead of {}",
                value
            ));
            Ok(DEFAULT_REFRESH_INTERVAL)
        }
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        WidgetConfig {
            stocks: DEFAULT_STOCKS.iter().map(|s| s.to_string()).collect(),
            opacity: DEFAULT_OPACITY,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl WidgetConfig {
    /// 將透明度與刷新間隔夾回允許範圍
    pub fn normalized(mut self) -> Self {
        self.opacity = clamp_opacity(self.opacity);
        self.refresh_interval = clamp_refresh_interval(self.refresh_interval);
        self
    }

    /// 只保留合法的代碼，不合法的寫進日誌後略過
    pub fn symbols(&self) -> Vec<Symbol> {
        self.stocks
            .iter()
            .filter_map(|code| match Symbol::parse(code) {
                Ok(symbol) => Some(symbol),
                Err(why) => {
                    logging::warn_file_async(format!("Skip the stock in config because {}", why));
                    None
                }
            })
            .collect()
    }
}

pub fn clamp_opacity(opacity: f64) -> f64 {
    if opacity.is_nan() {
        return DEFAULT_OPACITY;
    }
    opacity.clamp(MIN_OPACITY, MAX_OPACITY)
}

pub fn clamp_refresh_interval(seconds: u64) -> u64 {
    seconds.clamp(MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL)
}

pub struct ConfigStore {
    path: PathBuf,
    writer: Mutex<()>,
}

impl ConfigStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        ConfigStore {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    /// 使用 app.json / env 指定的路徑
    pub fn from_settings() -> Self {
        Self::new(&SETTINGS.widget.config_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 讀取設定檔，任何失敗都回傳預設值
    pub fn load(&self) -> WidgetConfig {
        match self.try_load() {
            Ok(config) => config,
            Err(why) => {
                logging::warn_file_async(format!(
                    "Use the default widget config because {}",
                    why
                ));
                WidgetConfig::default()
            }
        }
    }

    pub fn try_load(&self) -> Result<WidgetConfig, QuoteError> {
        let text = fs::read_to_string(&self.path).map_err(|why| {
            QuoteError::ConfigLoad(format!("{}: {}", self.path.display(), why))
        })?;

        serde_json::from_str::<WidgetConfig>(&text)
            .map(WidgetConfig::normalized)
            .map_err(|why| QuoteError::ConfigLoad(format!("{}: {}", self.path.display(), why)))
    }

    /// 整份覆蓋寫入。先寫暫存檔再改名，中途失敗也不會留下半份檔案
    pub fn save(&self, config: &WidgetConfig) -> Result<()> {
        let _guard = self
            .writer
            .lock()
            .map_err(|why| anyhow!("The config writer lock is poisoned: {}", why))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(config)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json.as_bytes())?;
        fs::rename(&tmp, &self.path).map_err(|why| {
            anyhow!(
                "Failed to replace {} because {:?}",
                self.path.display(),
                why
            )
        })?;

        logging::info_file_async(format!("The widget config is saved: {}", json));

        Ok(())
    }
}
