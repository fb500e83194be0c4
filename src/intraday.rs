//! 分時走勢。
//!
//! 目前沒有可用的逐分鐘資料源，只能抓到當日的今開、昨收與現價，
//! 再依固定公式合成 09:30 起 240 分鐘的模擬走勢，午休時段不出點。
//! 公式中的常數是展示用的數值，必須原樣保留才能產生一樣的圖。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveTime, TimeDelta, Timelike};

use crate::{
    declare::{IntradayPoint, Symbol, Trend},
    error::QuoteError,
    logging,
};

/// 從 09:30 起產生的分鐘數
pub const SESSION_MINUTES: i64 = 240;

/// 當日行情，合成分時走勢的依據
#[derive(Debug, Clone, PartialEq)]
pub struct SessionQuote {
    pub name: String,
    /// 今開
    pub open: f64,
    /// 昨收
    pub previous_close: f64,
    /// 現價
    pub price: f64,
    pub high: f64,
    pub low: f64,
}

/// 抓不到當日行情時使用的替代值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSeed {
    pub previous_close: f64,
    pub session_open: f64,
    pub last_price: f64,
}

impl Default for SessionSeed {
    fn default() -> Self {
        SessionSeed {
            previous_close: 100.0,
            session_open: 101.0,
            last_price: 101.5,
        }
    }
}

/// 交給畫面層繪圖的一整天走勢
#[derive(Debug, Clone, PartialEq)]
pub struct IntradaySeries {
    pub symbol: Symbol,
    pub previous_close: f64,
    pub session_open: f64,
    pub last_price: f64,
    /// 是否因為抓不到當日行情而使用替代值
    pub synthesized_from_placeholder: bool,
    /// 依時間遞增，沒有資料時為空
    pub points: Vec<IntradayPoint>,
}

impl IntradaySeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 現價相對昨收的方向，決定價格線顏色
    pub fn trend(&self) -> Trend {
        Trend::of(self.last_price - self.previous_close)
    }

    /// 成交量柱的顏色，第一根與昨收比，其餘與前一分鐘比
    pub fn bar_trends(&self) -> Vec<Trend> {
        let mut previous = self.previous_close;
        self.points
            .iter()
            .map(|point| {
                let trend = Trend::of(point.price - previous);
                previous = point.price;
                trend
            })
            .collect()
    }
}

/// 以今天的日期合成分時走勢
pub fn synthesize(previous_close: f64, session_open: f64) -> Vec<IntradayPoint> {
    synthesize_on(Local::now().date_naive(), previous_close, session_open)
}

/// 合成 `date` 當天的分時走勢，輸入不是正的有限數值時回傳空的序列
pub fn synthesize_on(date: NaiveDate, previous_close: f64, session_open: f64) -> Vec<IntradayPoint> {
    if !usable(previous_close) || !usable(session_open) {
        return Vec::new();
    }

    let Some(start) = date.and_hms_opt(9, 30, 0) else {
        return Vec::new();
    };

    (0..SESSION_MINUTES)
        .filter_map(|i| {
            let time = start + TimeDelta::minutes(i);
            if !in_session(time.time()) {
                return None;
            }

            let price_change = (i - 120) as f64 * 0.01 * (previous_close / 100.0);
            let price = session_open + price_change + (i % 10) as f64 * 0.02;

            let base = (100_000 + i * 500 + (i % 20) * 1000).abs() as f64;
            let factor = 1.0 + 0.1 * ((i % 3) - 1) as f64;
            let volume = ((base * factor) as i64).unsigned_abs();

            Some(IntradayPoint {
                time,
                price,
                volume,
            })
        })
        .collect()
}

fn usable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// 上午 9:30~11:30、下午 13:00~15:00，皆為左閉右開
pub fn in_session(time: NaiveTime) -> bool {
    let hours = time.hour() as f64 + time.minute() as f64 / 60.0;
    (9.5..11.5).contains(&hours) || (13.0..15.0).contains(&hours)
}

/// 當日行情的來源
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn fetch_session(&self, symbol: &Symbol) -> Result<SessionQuote, QuoteError>;
}

pub struct IntradaySeriesProvider {
    source: Arc<dyn SessionSource>,
    placeholder: SessionSeed,
}

impl IntradaySeriesProvider {
    pub fn new(source: Arc<dyn SessionSource>) -> Self {
        IntradaySeriesProvider {
            source,
            placeholder: SessionSeed::default(),
        }
    }

    /// 一定會回傳結果；抓取失敗時改用替代值合成
    pub async fn provide(&self, symbol: &Symbol) -> IntradaySeries {
        let (seed, from_placeholder) = match self.source.fetch_session(symbol).await {
            Ok(session) => (
                SessionSeed {
                    previous_close: session.previous_close,
                    session_open: session.open,
                    last_price: session.price,
                },
                false,
            ),
            Err(why) => {
                logging::warn_file_async(format!(
                    "Failed to fetch the session of {} because {}, use the placeholder",
                    symbol, why
                ));
                (self.placeholder, true)
            }
        };

        IntradaySeries {
            symbol: symbol.clone(),
            previous_close: seed.previous_close,
            session_open: seed.session_open,
            last_price: seed.last_price,
            synthesized_from_placeholder: from_placeholder,
            points: synthesize(seed.previous_close, seed.session_open),
        }
    }
}
