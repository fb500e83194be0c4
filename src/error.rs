use thiserror::Error;

/// 報價、搜尋、設定與自選股操作共用的錯誤分類。
///
/// 單一股票抓取失敗只會讓該股票在本輪刷新中缺席，不會中斷整輪刷新；
/// 真正需要讓使用者知道的只有 `DuplicateSymbol`。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteError {
    /// 逾時、連線失敗或非 2xx 回應
    #[error("Transport error: {0}")]
    Transport(String),

    /// 回應內容無法解析或欄位數不足
    #[error("Parse error: {0}")]
    Parse(String),

    /// 格式正確但查無資料
    #[error("Not found: {0}")]
    NotFound(String),

    /// 設定檔無法讀取或內容不是合法的 JSON
    #[error("Config load error: {0}")]
    ConfigLoad(String),

    /// 自選股清單內已有此代碼
    #[error("Duplicate symbol: {0}")]
    DuplicateSymbol(String),

    /// 不是 6 位數字的股票代碼
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
}

pub type Result<T> = std::result::Result<T, QuoteError>;
