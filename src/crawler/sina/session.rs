use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::{
    crawler::sina::{Sina, QUOTE_HOST, REFERER},
    declare::Symbol,
    error::QuoteError,
    intraday::{SessionQuote, SessionSource},
    util::{self, text},
};

/// 切開後的欄位數必須大於此值
const MIN_FIELDS: usize = 32;

#[async_trait]
impl SessionSource for Sina {
    async fn fetch_session(&self, symbol: &Symbol) -> Result<SessionQuote, QuoteError> {
        let url = format!(
            "http://{host}/list={key}",
            host = QUOTE_HOST,
            key = symbol.request_key()
        );

        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_static(REFERER));

        let text = util::http::get_use_gbk(&url, Some(headers))
            .await
            .map_err(|why| QuoteError::Transport(format!("{:?}", why)))?;

        parse_session(&text).map_err(|why| match why {
            QuoteError::NotFound(_) => QuoteError::NotFound(symbol.to_string()),
            other => other,
        })
    }
}

/// 解析 `var hq_str_sh600519="贵州茅台,1685.50,1680.00,1690.00,1699.00,1678.00,...";`
///
/// 依序為名稱、今開、昨收、現價、最高、最低，引號內為空字串代表查無此代碼。
pub fn parse_session(body: &str) -> Result<SessionQuote, QuoteError> {
    let mut quoted = body.split('"');
    let (Some(head), Some(value)) = (quoted.next(), quoted.next()) else {
        return Err(QuoteError::Parse(format!(
            "no quoted value in: {}",
            body.trim()
        )));
    };

    if value.trim().is_empty() {
        return Err(QuoteError::NotFound(head.trim().to_string()));
    }

    let fields: Vec<&str> = value.split(',').collect();
    if fields.len() <= MIN_FIELDS {
        return Err(QuoteError::Parse(format!(
            "{} fields, more than {} are required",
            fields.len(),
            MIN_FIELDS
        )));
    }

    let number = |index: usize| {
        text::parse_f64(fields[index], None)
            .map_err(|why| QuoteError::Parse(format!("field {}: {}", index, why)))
    };

    Ok(SessionQuote {
        name: fields[0].trim().to_string(),
        open: number(1)?,
        previous_close: number(2)?,
        price: number(3)?,
        high: number(4)?,
        low: number(5)?,
    })
}
