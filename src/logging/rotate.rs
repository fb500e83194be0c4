use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, TimeDelta};

use crate::logging;

/// 保留天數無法換算時改用 7 天
const DEFAULT_MAX_AGE_DAYS: i64 = 7;

/// 依日期切檔，同一天超過大小上限時再切出 `.1.log`、`.2.log`…
pub struct Rotate {
    /// 檔名模式，例如 "log/%Y-%m-%d-name.log"
    fn_pattern: String,
    /// 當前基礎檔名（不含 generation，由日期決定）
    cur_base_fn: String,
    /// 當前完整檔名
    cur_fn: String,
    out_fh: Option<BufWriter<File>>,
    /// 當前世代編號，只增不減
    generation: u32,
    max_size: u64,
    current_size: u64,
    max_age: TimeDelta,
}

impl Rotate {
    /// # Arguments
    /// * `fn_pattern` - 檔名模式，例如 "log/%Y-%m-%d-app.log"
    /// * `max_size` - 單檔最大大小 (bytes)
    /// * `max_age_days` - 日誌保留天數
    pub fn with_options(fn_pattern: String, max_size: u64, max_age_days: i64) -> Self {
        Rotate {
            fn_pattern,
            cur_base_fn: String::new(),
            cur_fn: String::new(),
            out_fh: None,
            generation: 0,
            max_size: max_size.max(1),
            current_size: 0,
            max_age: TimeDelta::try_days(max_age_days).unwrap_or(TimeDelta::days(DEFAULT_MAX_AGE_DAYS)),
        }
    }

    /// 寫入日誌訊息，自動處理日期切檔與大小輪轉
    pub fn write_msg(&mut self, now: DateTime<Local>, msg: &[u8]) -> Result<()> {
        let base_fn = now.format(&self.fn_pattern).to_string();

        // 日期變更：重設 generation
        if base_fn != self.cur_base_fn || self.out_fh.is_none() {
            if base_fn != self.cur_base_fn {
                self.generation = 0;
            }
            self.cur_base_fn = base_fn;
            self.open_new_file()?;
            self.cleanup_old_files(now);
        }

        if self.current_size > 0 && self.should_rotate_by_size(msg.len()) {
            self.rotate_generation()?;
        }

        let writer = self
            .out_fh
            .as_mut()
            .ok_or_else(|| anyhow!("No log file is opened for {}", self.cur_base_fn))?;
        writer.write_all(msg)?;
        self.current_size += msg.len() as u64;

        Ok(())
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.out_fh.as_mut() {
            if let Err(why) = writer.flush() {
                logging::error_console(format!(
                    "Failed to flush {} because {:?}",
                    self.cur_fn, why
                ));
            }
        }
    }

    /// generation = 0: "log/2025-02-03-app.log"
    /// generation = 2: "log/2025-02-03-app.2.log"
    fn generate_full_fn(base_fn: &str, generation: u32) -> String {
        if generation == 0 {
            return base_fn.to_string();
        }

        let path = Path::new(base_fn);
        let parent = path.parent().unwrap_or(Path::new(""));
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("log");

        parent
            .join(format!("{}.{}.{}", stem, generation, ext))
            .to_string_lossy()
            .to_string()
    }

    fn should_rotate_by_size(&self, additional_bytes: usize) -> bool {
        self.current_size + additional_bytes as u64 > self.max_size
    }

    fn open_new_file(&mut self) -> Result<()> {
        self.flush();

        let filename = Self::generate_full_fn(&self.cur_base_fn, self.generation);
        if let Some(parent) = Path::new(&filename).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&filename)?;

        self.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.out_fh = Some(BufWriter::with_capacity(4096, file));
        self.cur_fn = filename;

        Ok(())
    }

    fn rotate_generation(&mut self) -> Result<()> {
        self.generation += 1;
        self.open_new_file()
    }

    /// 刪除同目錄下超過保留時間的 .log 檔
    fn cleanup_old_files(&self, now: DateTime<Local>) {
        let cut_off = (now - self.max_age).timestamp().max(0) as u64;

        let files = match Self::log_files_beside(&self.cur_fn) {
            Ok(files) => files,
            Err(why) => {
                logging::error_console(format!(
                    "Failed to list the log directory because {:?}",
                    why
                ));
                return;
            }
        };

        for file in files {
            let expired = fs::metadata(&file)
                .and_then(|metadata| metadata.modified())
                .ok()
                .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
                .is_some_and(|modified| modified.as_secs() <= cut_off);

            if !expired {
                continue;
            }

            if let Err(why) = fs::remove_file(&file) {
                logging::error_console(format!(
                    "couldn't remove the file({}). because {:?}",
                    file.display(),
                    why
                ));
            }
        }
    }

    fn log_files_beside<P: AsRef<Path>>(file_path: P) -> Result<Vec<PathBuf>, io::Error> {
        let parent_dir = match file_path.as_ref().parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(parent_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "log") {
                files.push(path);
            }
        }

        Ok(files)
    }
}

impl Drop for Rotate {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!("stock_widget_{}_{}", name, nanos))
    }

    #[test]
    fn test_generation_filename() {
        let base = "log/2025-02-03-app.log";
        assert_eq!(Rotate::generate_full_fn(base, 0), "log/2025-02-03-app.log");
        assert_eq!(Rotate::generate_full_fn(base, 1), "log/2025-02-03-app.1.log");
        assert_eq!(Rotate::generate_full_fn(base, 2), "log/2025-02-03-app.2.log");
    }

    #[test]
    fn test_size_rotation() {
        let dir = temp_dir("rotate");
        let pattern = format!("{}/%Y-%m-%d-size.log", dir.display());
        let mut r = Rotate::with_options(pattern, 256, 7);
        let now = Local::now();

        for i in 0..10 {
            let msg = format!("Line {:02} - {}\r\n", i, "X".repeat(60));
            r.write_msg(now, msg.as_bytes()).unwrap();
        }
        r.flush();

        assert!(r.generation >= 2, "generation: {}", r.generation);
        let count = fs::read_dir(&dir).unwrap().count() as u32;
        assert_eq!(count, r.generation + 1);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_date_rotation() {
        let dir = temp_dir("date");
        let pattern = format!("{}/%Y-%m-%d-date.log", dir.display());
        let mut r = Rotate::with_options(pattern, 1024 * 1024, 7);
        let now = Local::now();

        r.write_msg(now, b"day 1\r\n").unwrap();
        let first = r.cur_fn.clone();
        r.write_msg(now + TimeDelta::days(1), b"day 2\r\n").unwrap();
        r.flush();

        assert_ne!(first, r.cur_fn);
        assert_eq!(r.generation, 0);
        assert_eq!(fs::read_to_string(&r.cur_fn).unwrap(), "day 2\r\n");

        fs::remove_dir_all(&dir).ok();
    }
}
