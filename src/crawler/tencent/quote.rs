use crate::{
    crawler::tencent::{Tencent, HOST},
    declare::{QuoteSnapshot, Symbol},
    error::QuoteError,
    util::{self, text},
};

/// 回應至少要有的欄位數
pub const MIN_FIELDS: usize = 33;

/// 欄位位置，對方的格式固定，不可更動
const FIELD_NAME: usize = 1;
const FIELD_PRICE: usize = 3;
const FIELD_OPEN: usize = 5;
const FIELD_CHANGE: usize = 31;
const FIELD_CHANGE_PERCENT: usize = 32;

impl Tencent {
    /// 取得單一股票的即時報價
    pub async fn fetch_quote(symbol: &Symbol) -> Result<QuoteSnapshot, QuoteError> {
        let url = format!(
            "http://{host}/q={key}",
            host = HOST,
            key = symbol.request_key()
        );
        let text = util::http::get_use_gbk(&url, None)
            .await
            .map_err(|why| QuoteError::Transport(format!("{:?}", why)))?;

        parse_quote(symbol, &text)
    }
}

/// 解析 `v_sh600519="1~贵州茅台~600519~1690.00~...";`
///
/// 先取出引號內的內容再以 `~` 切開，最後一欄才不會黏著 `";`。
pub fn parse_quote(symbol: &Symbol, text: &str) -> Result<QuoteSnapshot, QuoteError> {
    let content = text.trim();

    if !content.contains('~') {
        if content.contains("none_match") {
            return Err(QuoteError::NotFound(symbol.to_string()));
        }
        return Err(QuoteError::Parse(format!(
            "{} has no field separator: {}",
            symbol, content
        )));
    }

    let fields: Vec<&str> = quoted_value(content).split('~').collect();
    if fields.len() < MIN_FIELDS {
        return Err(QuoteError::Parse(format!(
            "{} has {} fields, at least {} are required",
            symbol,
            fields.len(),
            MIN_FIELDS
        )));
    }

    let name = fields[FIELD_NAME].trim();

    Ok(QuoteSnapshot {
        symbol: symbol.clone(),
        name: if name.is_empty() {
            symbol.to_string()
        } else {
            name.to_string()
        },
        price: number_at(&fields, FIELD_PRICE, symbol)?,
        change: number_at(&fields, FIELD_CHANGE, symbol)?,
        change_percent: number_at(&fields, FIELD_CHANGE_PERCENT, symbol)?,
        open: number_at(&fields, FIELD_OPEN, symbol)?,
    })
}

/// `v_sh600519="...";` 取出引號內的部分，沒有引號時只去掉結尾的 `;`
fn quoted_value(content: &str) -> &str {
    match (content.find('"'), content.rfind('"')) {
        (Some(open), Some(close)) if close > open => &content[open + 1..close],
        _ => content.trim_end_matches(';'),
    }
}

fn number_at(fields: &[&str], index: usize, symbol: &Symbol) -> Result<f64, QuoteError> {
    let raw = fields
        .get(index)
        .ok_or_else(|| QuoteError::Parse(format!("{} has no field {}", symbol, index)))?;

    text::parse_f64(raw, None)
        .map_err(|why| QuoteError::Parse(format!("{} field {}: {}", symbol, index, why)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;

    fn payload(len: usize) -> String {
        let mut fields = vec!["0".to_string(); len];
        fields[0] = "v_sh600519=\"1".to_string();
        fields[1] = "贵州茅台".to_string();
        fields[2] = "600519".to_string();
        fields[3] = "1690.00".to_string();
        fields[4] = "1680.00".to_string();
        fields[5] = "1685.50".to_string();
        if len > 32 {
            fields[31] = "10.00".to_string();
            fields[32] = "0.60".to_string();
        }
        format!("{}\";\n", fields.join("~"))
    }

    fn moutai() -> Symbol {
        Symbol::parse("600519").unwrap()
    }

    #[test]
    fn test_parse_quote() {
        let quote = parse_quote(&moutai(), &payload(50)).unwrap();
        assert_eq!(quote.name, "贵州茅台");
        assert_eq!(quote.price, 1690.0);
        assert_eq!(quote.open, 1685.5);
        assert_eq!(quote.change, 10.0);
        assert_eq!(quote.change_percent, 0.6);
    }

    #[test]
    fn test_exactly_min_fields() {
        assert!(parse_quote(&moutai(), &payload(MIN_FIELDS)).is_ok());
    }

    #[test]
    fn test_last_field_keeps_no_terminator() {
        let mut fields = vec!["0"; MIN_FIELDS];
        fields[1] = "平安银行";
        fields[2] = "000001";
        fields[3] = "11.20";
        fields[5] = "11.30";
        fields[31] = "-0.10";
        fields[32] = "-0.88";
        let text = format!("v_sz000001=\"51~{}\";\n", fields[1..].join("~"));

        let quote = parse_quote(&Symbol::parse("000001").unwrap(), &text).unwrap();
        assert_eq!(quote.name, "平安银行");
        assert_eq!(quote.price, 11.2);
        assert_eq!(quote.open, 11.3);
        assert_eq!(quote.change, -0.1);
        assert_eq!(quote.change_percent, -0.88);
    }

    #[test]
    fn test_short_payload_is_parse_error() {
        let result = parse_quote(&moutai(), &payload(MIN_FIELDS - 1));
        assert!(matches!(result, Err(QuoteError::Parse(_))));
    }

    #[test]
    fn test_bad_number_is_parse_error() {
        let text = payload(50).replace("1690.00", "--");
        assert!(matches!(
            parse_quote(&moutai(), &text),
            Err(QuoteError::Parse(_))
        ));
    }

    #[test]
    fn test_none_match_is_not_found() {
        let result = parse_quote(&moutai(), "v_pv_none_match=\"1\";\n");
        assert_eq!(result, Err(QuoteError::NotFound("600519".to_string())));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(
            parse_quote(&moutai(), "<html>502 Bad Gateway</html>"),
            Err(QuoteError::Parse(_))
        ));
        assert!(matches!(parse_quote(&moutai(), ""), Err(QuoteError::Parse(_))));
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch_quote() {
        dotenv::dotenv().ok();
        logging::debug_file_async("開始 fetch_quote".to_string());

        match Tencent::fetch_quote(&moutai()).await {
            Ok(quote) => {
                dbg!(&quote);
                logging::debug_file_async(format!("quote : {:#?}", quote));
            }
            Err(why) => {
                logging::debug_file_async(format!("Failed to fetch_quote because {:?}", why));
            }
        }

        logging::debug_file_async("結束 fetch_quote".to_string());
    }
}
