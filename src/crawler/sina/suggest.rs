use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    crawler::sina::{Sina, SUGGEST_HOST},
    declare::{SearchResult, Symbol},
    error::QuoteError,
    logging,
    util::{self, text},
};

/// 搜尋結果最多顯示幾筆
pub const DISPLAY_LIMIT: usize = 20;

/// 直接輸入 6 位數代碼時的名稱
pub const DIRECT_ADD_NAME: &str = "直接添加";

/// 每筆建議至少要有的欄位數
const MIN_FIELDS: usize = 6;

/// type=11:滬深A股 12:指數 13~15:基金、債券等
const SUGGEST_TYPES: &str = "11,12,13,14,15";

static SUGGEST_DATA: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(?s)suggestdata="(.*?)";"#).ok());

impl Sina {
    /// 依關鍵字搜尋股票，失敗時回傳空的結果。
    ///
    /// 關鍵字剛好是 6 位數字時不查詢，直接回傳一筆讓使用者加入未收錄的代碼。
    pub async fn search(keyword: &str) -> Vec<SearchResult> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Vec::new();
        }

        if let Some(direct) = direct_add(keyword) {
            return vec![direct];
        }

        let url = format!(
            "http://{host}/suggest/type={types}&key={key}&name=suggestdata",
            host = SUGGEST_HOST,
            types = SUGGEST_TYPES,
            key = urlencoding::encode(keyword)
        );

        let result = match util::http::get_use_gbk(&url, None).await {
            Ok(text) => parse_suggestions(&text),
            Err(why) => Err(QuoteError::Transport(format!("{:?}", why))),
        };

        settle(keyword, result)
    }
}

/// 最多留下 `DISPLAY_LIMIT` 筆，失敗時記錄下來並回傳空的結果
fn settle(keyword: &str, result: Result<Vec<SearchResult>, QuoteError>) -> Vec<SearchResult> {
    match result {
        Ok(mut results) => {
            results.truncate(DISPLAY_LIMIT);
            results
        }
        Err(why) => {
            logging::error_file_async(format!(
                "Failed to search '{}' because {}",
                keyword, why
            ));
            Vec::new()
        }
    }
}

/// 6 位數字的關鍵字直接視為代碼
pub fn direct_add(keyword: &str) -> Option<SearchResult> {
    if !text::is_six_digits(keyword) {
        return None;
    }

    Symbol::parse(keyword).ok().map(|symbol| SearchResult {
        symbol,
        name: DIRECT_ADD_NAME.to_string(),
        pinyin: String::new(),
    })
}

/// 解析 `var suggestdata="贵州茅台,11,600519,sh600519,贵州茅台,gzmt,贵州茅台,99,1,ESG,,;...";`
///
/// 各筆以 `;` 分隔、欄位以 `,` 分隔，第 0 欄為名稱、第 2 欄為代碼、第 5 欄為拼音。
/// 代碼不是 6 位數字的(例如指數)不收，順序維持對方的排序。
pub fn parse_suggestions(body: &str) -> Result<Vec<SearchResult>, QuoteError> {
    let regex = SUGGEST_DATA
        .as_ref()
        .ok_or_else(|| QuoteError::Parse("the suggest pattern is invalid".to_string()))?;

    let data = regex
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| QuoteError::Parse(format!("no suggestdata in: {}", body.trim())))?;

    let results = data
        .split(';')
        .filter(|item| !item.is_empty())
        .filter_map(|item| {
            let parts: Vec<&str> = item.split(',').collect();
            if parts.len() < MIN_FIELDS || !text::is_six_digits(parts[2]) {
                return None;
            }

            Some(SearchResult {
                symbol: Symbol::parse(parts[2]).ok()?,
                name: parts[0].to_string(),
                pinyin: parts[5].to_string(),
            })
        })
        .collect();

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOUTAI: &str = "var suggestdata=\"贵州茅台,11,600519,sh600519,贵州茅台,gzmt,贵州茅台,99,1,ESG,,;\
        茅台指数,12,CSI931,CSI931,茅台指数,mtzs,茅台指数,99,1,,,;\
        茅台酒业,11,abc123,xx,茅台酒业,mtjy,,,,;\
        短记录,11,000001;\
        五粮液,11,000858,sz000858,五粮液,wly,五粮液,99,1,,,\";";

    #[test]
    fn test_parse_suggestions() {
        let results = parse_suggestions(MOUTAI).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].symbol.as_str(), "600519");
        assert_eq!(results[0].name, "贵州茅台");
        assert_eq!(results[0].pinyin, "gzmt");
        assert_eq!(results[1].symbol.as_str(), "000858");
        assert_eq!(results[1].display_row(), "000858 - 五粮液");
    }

    #[test]
    fn test_parse_empty_suggestions() {
        let results = parse_suggestions("var suggestdata=\"\";").unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_parse_unexpected_body() {
        assert!(matches!(
            parse_suggestions("<html></html>"),
            Err(QuoteError::Parse(_))
        ));
    }

    #[test]
    fn test_direct_add() {
        let direct = direct_add("600519").unwrap();
        assert_eq!(direct.symbol.as_str(), "600519");
        assert_eq!(direct.name, DIRECT_ADD_NAME);
        assert!(direct_add("60051").is_none());
        assert!(direct_add("茅台").is_none());
    }

    #[test]
    fn test_settle_caps_results() {
        let data: Vec<String> = (0..25)
            .map(|i| format!("股票{i},11,{code:06},sh{code:06},股票{i},gp{i}", i = i, code = 600000 + i))
            .collect();
        let body = format!("var suggestdata=\"{}\";", data.join(";"));

        let parsed = parse_suggestions(&body).unwrap();
        assert_eq!(parsed.len(), 25);

        let results = settle("股票", Ok(parsed));
        assert_eq!(results.len(), DISPLAY_LIMIT);
        assert_eq!(results[0].symbol.as_str(), "600000");
        assert_eq!(results[DISPLAY_LIMIT - 1].symbol.as_str(), "600019");
    }

    #[tokio::test]
    async fn test_settle_failure_is_empty() {
        let transport = settle("茅台", Err(QuoteError::Transport("timed out".to_string())));
        assert!(transport.is_empty());

        let parse = settle("茅台", parse_suggestions("<html>502 Bad Gateway</html>"));
        assert!(parse.is_empty());
    }

    #[tokio::test]
    async fn test_search_six_digits_skips_network() {
        let results = Sina::search(" 600519 ").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].symbol.as_str(), "600519");
        assert_eq!(results[0].name, DIRECT_ADD_NAME);
    }

    #[tokio::test]
    async fn test_search_blank_keyword() {
        assert!(Sina::search("   ").await.is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn test_search() {
        dotenv::dotenv().ok();
        let results = Sina::search("茅台").await;
        logging::debug_file_async(format!("search : {:#?}", results));
        assert!(results.len() <= DISPLAY_LIMIT);
    }
}
