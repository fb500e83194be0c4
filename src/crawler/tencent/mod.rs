//! # 騰訊證券行情模組
//!
//! 以 `qt.gtimg.cn` 取得滬深個股的即時報價。
//!
//! ## 回應格式
//!
//! `v_sh600519="1~贵州茅台~600519~1690.00~...";`，以 `~` 分隔，編碼為 GBK。
//! 查無代碼時回應 `v_pv_none_match="1";`。

/// 即時報價
pub mod quote;

/// 騰訊證券行情的主機域名
const HOST: &str = "qt.gtimg.cn";

/// 騰訊證券行情採集器
pub struct Tencent {}
