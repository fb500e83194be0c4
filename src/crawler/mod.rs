use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    crawler::{sina::Sina, tencent::Tencent},
    declare::{QuoteSnapshot, SearchResult, Symbol},
    error::QuoteError,
    intraday::{IntradaySeries, IntradaySeriesProvider},
};

/// 新浪財經
pub mod sina;
/// 騰訊證券
pub mod tencent;

/// 刷新排程與引擎需要的遠端資料
#[async_trait]
pub trait MarketData: Send + Sync {
    /// 取得單一股票的即時報價
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<QuoteSnapshot, QuoteError>;
    /// 搜尋股票，失敗時回傳空的結果
    async fn search(&self, keyword: &str) -> Vec<SearchResult>;
    /// 取得分時走勢，一定有結果
    async fn fetch_intraday(&self, symbol: &Symbol) -> IntradaySeries;
}

/// 報價走騰訊、搜尋與當日行情走新浪
pub struct Remote {
    intraday: IntradaySeriesProvider,
}

impl Remote {
    pub fn new() -> Self {
        Remote {
            intraday: IntradaySeriesProvider::new(Arc::new(Sina {})),
        }
    }
}

impl Default for Remote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketData for Remote {
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<QuoteSnapshot, QuoteError> {
        Tencent::fetch_quote(symbol).await
    }

    async fn search(&self, keyword: &str) -> Vec<SearchResult> {
        Sina::search(keyword).await
    }

    async fn fetch_intraday(&self, symbol: &Symbol) -> IntradaySeries {
        self.intraday.provide(symbol).await
    }
}
