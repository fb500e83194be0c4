use std::{fmt::Write as _, thread};

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use strum::Display;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use crate::config::SETTINGS;

pub mod rotate;

use rotate::Rotate;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

/// 一次寫入檔案的最大批量
const BATCH_SIZE: usize = 4096;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

/// 非同步檔案日誌，訊息送進 channel 後由專屬線程寫入
/// `{log.dir}/%Y-%m-%d-{name}.log`
pub struct Logger {
    writer: UnboundedSender<LogMessage>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        let (tx, mut rx) = unbounded_channel::<LogMessage>();
        let pattern = format!("{}/%Y-%m-%d-{}.log", SETTINGS.log.dir, log_name);
        let max_size = SETTINGS.log.max_size_mb.saturating_mul(1024 * 1024);
        let max_age_days = SETTINGS.log.max_age_days;

        // 寫入檔案的操作使用另一個線程處理
        let spawned = thread::Builder::new()
            .name(format!("log-{}", log_name))
            .spawn(move || {
                let mut rotate = Rotate::with_options(pattern, max_size, max_age_days);
                let mut batch = String::with_capacity(BATCH_SIZE);

                while let Some(received) = rx.blocking_recv() {
                    if writeln!(
                        &mut batch,
                        "{} {} {}",
                        received.created_at.format("%F %X%.6f"),
                        received.level,
                        received.msg
                    )
                    .is_err()
                    {
                        continue;
                    }

                    if rx.is_empty() || batch.len() >= BATCH_SIZE {
                        if let Err(why) = rotate.write_msg(received.created_at, batch.as_bytes()) {
                            error_console(format!("Failed to write log because {:?}", why));
                            info_console(batch.clone());
                        }
                        rotate.flush();
                        batch.clear();
                    }
                }
            });

        if let Err(why) = spawned {
            error_console(format!("Failed to spawn the log thread because {:?}", why));
        }

        Logger { writer: tx }
    }

    pub fn info(&self, log: String) {
        self.send(Level::Info, log);
    }

    pub fn warn(&self, log: String) {
        self.send(Level::Warn, log);
    }

    pub fn error(&self, log: String) {
        self.send(Level::Error, log);
    }

    pub fn debug(&self, log: String) {
        self.send(Level::Debug, log);
    }

    fn send(&self, level: Level, msg: String) {
        if let Err(why) = self.writer.send(LogMessage::new(level, msg)) {
            error_console(why.to_string());
        }
    }
}

pub struct LogMessage {
    pub level: Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    eprintln!(
        "{} Error {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}
