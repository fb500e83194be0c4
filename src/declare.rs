use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use concat_string::concat_string;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{error::QuoteError, util::text};

/// 交易所
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum Exchange {
    /// 上海證券交易所 sh
    #[strum(serialize = "sh")]
    Shanghai,
    /// 深圳證券交易所 sz
    #[strum(serialize = "sz")]
    Shenzhen,
}

impl Exchange {
    /// 代碼以 6 開頭為上海，其餘一律視為深圳
    pub fn of(code: &str) -> Self {
        if code.starts_with('6') {
            Exchange::Shanghai
        } else {
            Exchange::Shenzhen
        }
    }

    /// 對外請求時放在代碼前面的前綴
    pub fn prefix(&self) -> &str {
        self.as_ref()
    }

    /// 顯示用的簡稱
    pub fn name(&self) -> &'static str {
        match self {
            Exchange::Shanghai => "上交所",
            Exchange::Shenzhen => "深交所",
        }
    }
}

/// 6 位數字的股票代碼
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// 前後空白會先去掉，剩下的必須剛好是 6 個 ASCII 數字
    pub fn parse(code: &str) -> Result<Self, QuoteError> {
        let code = code.trim();
        if text::is_six_digits(code) {
            Ok(Symbol(code.to_string()))
        } else {
            Err(QuoteError::InvalidSymbol(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn exchange(&self) -> Exchange {
        Exchange::of(&self.0)
    }

    /// 例︰600519 => sh600519、000001 => sz000001
    pub fn request_key(&self) -> String {
        concat_string!(self.exchange().prefix(), self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = QuoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = QuoteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Symbol::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 漲跌方向，畫面層以此決定紅綠
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum Trend {
    /// 平盤也算漲
    Up,
    Down,
}

impl Trend {
    pub fn of(delta: f64) -> Self {
        if delta >= 0.0 {
            Trend::Up
        } else {
            Trend::Down
        }
    }

    pub fn sign(&self) -> &'static str {
        match self {
            Trend::Up => "+",
            Trend::Down => "",
        }
    }
}

/// 某一時間點的即時報價，每輪刷新重新取得，不保存
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteSnapshot {
    pub symbol: Symbol,
    /// 股票名稱
    pub name: String,
    /// 現價
    pub price: f64,
    /// 漲跌
    pub change: f64,
    /// 漲跌幅(%)
    pub change_percent: f64,
    /// 今開
    pub open: f64,
}

impl QuoteSnapshot {
    pub fn trend(&self) -> Trend {
        Trend::of(self.change_percent)
    }
}

/// 搜尋結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub symbol: Symbol,
    pub name: String,
    /// 拼音縮寫
    pub pinyin: String,
}

impl SearchResult {
    /// 清單上顯示的文字，例︰600519 - 贵州茅台
    pub fn display_row(&self) -> String {
        concat_string!(self.symbol.as_str(), " - ", self.name)
    }
}

/// 分時走勢上的一分鐘
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntradayPoint {
    pub time: NaiveDateTime,
    pub price: f64,
    pub volume: u64,
}
