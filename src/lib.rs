//! 桌面股票監控小工具的核心引擎。
//!
//! 不含任何視窗程式碼，只負責自選股清單、報價抓取與解析、股票搜尋、
//! 分時走勢合成以及定時刷新。畫面層透過 [`engine::Intent`] 下指令，
//! 並從 [`engine::Event`] 取得結果。

pub mod calculator;
pub mod config;
pub mod console;
pub mod crawler;
pub mod declare;
pub mod engine;
pub mod error;
pub mod intraday;
pub mod logging;
pub mod scheduler;
pub mod store;
pub mod util;
pub mod watchlist;
