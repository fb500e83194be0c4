use std::{env, path::PathBuf, str::FromStr};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logging;

const CONFIG_PATH: &str = "app.json";

/// 程式本身的執行參數，與使用者的自選股設定檔(見 [`crate::store`])分開
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct App {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub widget: Widget,
    #[serde(default)]
    pub log: Log,
}

const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
const HTTP_CONNECT_TIMEOUT_SECS: &str = "HTTP_CONNECT_TIMEOUT_SECS";
const HTTP_MAX_ATTEMPTS: &str = "HTTP_MAX_ATTEMPTS";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Http {
    /// 單次請求的總逾時
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// 傳輸失敗時最多嘗試幾次(含第一次)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl Default for Http {
    fn default() -> Self {
        Http {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    3
}

fn default_max_attempts() -> usize {
    1
}

const WIDGET_CONFIG_PATH: &str = "WIDGET_CONFIG_PATH";
const WIDGET_PASS_DEADLINE_SECS: &str = "WIDGET_PASS_DEADLINE_SECS";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Widget {
    /// 自選股與顯示偏好的設定檔
    #[serde(default = "default_widget_config_path")]
    pub config_path: String,
    /// 一輪刷新最多花多久，超過的股票本輪略過
    #[serde(default = "default_pass_deadline_secs")]
    pub pass_deadline_secs: u64,
}

impl Default for Widget {
    fn default() -> Self {
        Widget {
            config_path: default_widget_config_path(),
            pass_deadline_secs: default_pass_deadline_secs(),
        }
    }
}

fn default_widget_config_path() -> String {
    "config.json".to_string()
}

fn default_pass_deadline_secs() -> u64 {
    30
}

const LOG_DIR: &str = "LOG_DIR";
const LOG_MAX_SIZE_MB: &str = "LOG_MAX_SIZE_MB";
const LOG_MAX_AGE_DAYS: &str = "LOG_MAX_AGE_DAYS";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Log {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_log_max_size_mb")]
    pub max_size_mb: u64,
    #[serde(default = "default_log_max_age_days")]
    pub max_age_days: i64,
}

impl Default for Log {
    fn default() -> Self {
        Log {
            dir: default_log_dir(),
            max_size_mb: default_log_max_size_mb(),
            max_age_days: default_log_max_age_days(),
        }
    }
}

fn default_log_dir() -> String {
    "log".to_string()
}

fn default_log_max_size_mb() -> u64 {
    10
}

fn default_log_max_age_days() -> i64 {
    7
}

/// 設定檔讀取失敗時不中斷程式，改用預設值。
///
/// 這裡只能寫到 console，檔案日誌本身也要讀 SETTINGS 才能初始化。
pub static SETTINGS: Lazy<App> = Lazy::new(|| match App::get() {
    Ok(app) => app,
    Err(why) => {
        logging::error_console(format!(
            "I can't read the config context because {:?}, use the defaults",
            why
        ));
        App::default().override_with_env()
    }
});

impl App {
    fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::default().override_with_env())
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        override_from_env(HTTP_TIMEOUT_SECS, &mut self.http.timeout_secs);
        override_from_env(
            HTTP_CONNECT_TIMEOUT_SECS,
            &mut self.http.connect_timeout_secs,
        );
        override_from_env(HTTP_MAX_ATTEMPTS, &mut self.http.max_attempts);

        if let Ok(path) = env::var(WIDGET_CONFIG_PATH) {
            self.widget.config_path = path;
        }
        override_from_env(
            WIDGET_PASS_DEADLINE_SECS,
            &mut self.widget.pass_deadline_secs,
        );

        if let Ok(dir) = env::var(LOG_DIR) {
            self.log.dir = dir;
        }
        override_from_env(LOG_MAX_SIZE_MB, &mut self.log.max_size_mb);
        override_from_env(LOG_MAX_AGE_DAYS, &mut self.log.max_age_days);

        self
    }
}

/// env 有值且能轉型時才覆蓋
fn override_from_env<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(value) = env::var(key) {
        match T::from_str(value.trim()) {
            Ok(v) => *target = v,
            Err(_) => logging::error_console(format!(
                "Ignore the env {}={} because it is not a valid value",
                key, value
            )),
        }
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let app = App::default();
        assert_eq!(app.http.timeout_secs, 5);
        assert_eq!(app.http.max_attempts, 1);
        assert_eq!(app.widget.config_path, "config.json");
        assert_eq!(app.widget.pass_deadline_secs, 30);
        assert_eq!(app.log.dir, "log");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let app: App = serde_json::from_str(r#"{"http":{"timeout_secs":8}}"#).unwrap();
        assert_eq!(app.http.timeout_secs, 8);
        assert_eq!(app.http.connect_timeout_secs, 3);
        assert_eq!(app.log, Log::default());
    }

    #[test]
    fn test_override_from_env() {
        let key = "STOCK_WIDGET_TEST_OVERRIDE_U64";
        let mut value = 5u64;

        env::set_var(key, "12");
        override_from_env(key, &mut value);
        assert_eq!(value, 12);

        env::set_var(key, "twelve");
        override_from_env(key, &mut value);
        assert_eq!(value, 12);

        env::remove_var(key);
    }
}
