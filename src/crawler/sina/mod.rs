//! # 新浪財經模組
//!
//! - **股票搜尋 (`suggest`)**：依名稱、拼音或代碼片段查詢股票。
//! - **當日行情 (`session`)**：取得今開、昨收、現價，做為分時走勢的依據。
//!
//! 兩者的回應皆為 GBK 編碼的 JavaScript 賦值語句。

/// 當日行情
pub mod session;
/// 股票搜尋
pub mod suggest;

/// 股票搜尋的主機域名
const SUGGEST_HOST: &str = "suggest3.sinajs.cn";
/// 行情的主機域名
const QUOTE_HOST: &str = "hq.sinajs.cn";
/// hq.sinajs.cn 沒帶 Referer 會回 403
const REFERER: &str = "https://finance.sina.com.cn/";

/// 新浪財經採集器
pub struct Sina {}
