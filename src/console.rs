//! 終端機版的畫面層，只負責把輸入轉成 [`Intent`]、把 [`Event`] 轉成文字。

use crate::{
    calculator,
    crawler::sina::suggest,
    declare::{SearchResult, Symbol, Trend},
    engine::{Event, Intent},
    intraday::IntradaySeries,
    scheduler::RefreshPass,
    store::WidgetConfig,
};

pub const HELP: &str = "\
add [代码] [名称]     添加股票，不带代码视为未选择
rm [代码]             删除股票
order 代码 代码 ...   依序重排
search 关键字         搜索股票
detail 代码           分时走势
set 透明度 刷新秒数   例: set 0.9 10
calc 买入价 卖出价 股数  做T盈亏试算
quit                  退出";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Intent(Intent),
    Calc {
        buy: String,
        sell: String,
        shares: String,
    },
    Help,
    Blank,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Command::Blank;
    };
    let args: Vec<&str> = words.collect();

    match verb.to_lowercase().as_str() {
        "add" => match args.first() {
            None => Command::Intent(Intent::AddSymbol(None)),
            Some(code) => match Symbol::parse(code) {
                Ok(symbol) => {
                    let name = if args.len() > 1 {
                        args[1..].join(" ")
                    } else {
                        suggest::DIRECT_ADD_NAME.to_string()
                    };
                    Command::Intent(Intent::AddSymbol(Some(SearchResult {
                        symbol,
                        name,
                        pinyin: String::new(),
                    })))
                }
                Err(why) => Command::Unknown(why.to_string()),
            },
        },
        "rm" | "remove" => Command::Intent(Intent::RemoveSymbol(
            args.first().map(|code| code.to_string()),
        )),
        "order" => Command::Intent(Intent::Reorder(
            args.iter().map(|code| code.to_string()).collect(),
        )),
        "search" if !args.is_empty() => Command::Intent(Intent::Search(args.join(" "))),
        "detail" if !args.is_empty() => Command::Intent(Intent::OpenDetail(args[0].to_string())),
        "set" if args.len() == 2 => {
            match (args[0].parse::<f64>(), args[1].parse::<u64>()) {
                (Ok(opacity), Ok(refresh_interval)) => Command::Intent(Intent::UpdateSettings {
                    opacity,
                    refresh_interval,
                }),
                _ => Command::Unknown(line.trim().to_string()),
            }
        }
        "calc" if args.len() == 3 => Command::Calc {
            buy: args[0].to_string(),
            sell: args[1].to_string(),
            shares: args[2].to_string(),
        },
        "quit" | "exit" => Command::Intent(Intent::Quit),
        "help" | "?" => Command::Help,
        _ => Command::Unknown(line.trim().to_string()),
    }
}

pub fn render_calc(buy: &str, sell: &str, shares: &str) -> String {
    calculator::describe(calculator::evaluate_text(buy, sell, shares).as_ref())
}

/// 代碼在上、名稱與數值在下，與桌面版的排列相同
pub fn render_pass(pass: &RefreshPass) -> String {
    let mut lines = vec![format!(
        "#{} {}  代码/名称    今开    现价    涨跌",
        pass.sequence,
        pass.started_at.format("%H:%M:%S")
    )];

    for quote in &pass.quotes {
        lines.push(quote.symbol.to_string());
        lines.push(format!(
            "{}    {:.2}    {:.2}    {}{:.2}%",
            quote.name,
            quote.open,
            quote.price,
            quote.trend().sign(),
            quote.change_percent
        ));
    }

    if !pass.omitted.is_empty() {
        let omitted: Vec<&str> = pass.omitted.iter().map(Symbol::as_str).collect();
        lines.push(format!("暂无数据: {}", omitted.join(", ")));
    }

    lines.join("\n")
}

pub fn render_detail(series: &IntradaySeries) -> String {
    let mut lines = vec![format!(
        "{} {}  分时走势  昨收 {:.2}  今开 {:.2}  现价 {:.2}  {}",
        series.symbol,
        series.symbol.exchange().name(),
        series.previous_close,
        series.session_open,
        series.last_price,
        series.trend()
    )];

    if series.synthesized_from_placeholder {
        lines.push("(无法取得当日行情，以下为示意数据)".to_string());
    }

    if let (Some(first), Some(last)) = (series.points.first(), series.points.last()) {
        let total: u64 = series.points.iter().map(|p| p.volume).sum();
        let rising = series
            .bar_trends()
            .iter()
            .filter(|trend| **trend == Trend::Up)
            .count();
        lines.push(format!(
            "{} 点  {} {:.2} → {} {:.2}  量 {} (红 {} 绿 {})",
            series.points.len(),
            first.time.format("%H:%M"),
            first.price,
            last.time.format("%H:%M"),
            last.price,
            total,
            rising,
            series.points.len() - rising
        ));
    }

    lines.join("\n")
}

fn render_settings(config: &WidgetConfig) -> String {
    format!(
        "透明度 {}%  刷新间隔 {}s",
        (config.opacity * 100.0).round(),
        config.refresh_interval
    )
}

/// 轉成要印出的文字
pub fn render_event(event: &Event) -> String {
    match event {
        Event::Refreshed(pass) => render_pass(pass),
        Event::WatchListChanged(rows) => format!("自选股: {}", rows.join(" | ")),
        Event::SearchResults { keyword, results } if results.is_empty() => {
            format!("找不到 {}", keyword)
        }
        Event::SearchResults { results, .. } => results
            .iter()
            .map(|r| format!("{}  {}", r.display_row(), r.pinyin))
            .collect::<Vec<_>>()
            .join("\n"),
        Event::Detail(series) => render_detail(series),
        Event::SettingsChanged(config) => render_settings(config),
        Event::Advisory(advisory) => format!("提示: {}", advisory),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{Local, TimeZone};

    use super::*;
    use crate::{declare::QuoteSnapshot, engine::Advisory, intraday};

    fn sym(code: &str) -> Symbol {
        Symbol::parse(code).unwrap()
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  "), Command::Blank);
        assert_eq!(parse_command("help"), Command::Help);
        assert_eq!(parse_command("QUIT"), Command::Intent(Intent::Quit));
        assert_eq!(
            parse_command("add"),
            Command::Intent(Intent::AddSymbol(None))
        );
        assert_eq!(
            parse_command("add 000858 五粮液"),
            Command::Intent(Intent::AddSymbol(Some(SearchResult {
                symbol: sym("000858"),
                name: "五粮液".to_string(),
                pinyin: String::new(),
            })))
        );
        assert_eq!(
            parse_command("rm 600519"),
            Command::Intent(Intent::RemoveSymbol(Some("600519".to_string())))
        );
        assert_eq!(
            parse_command("order 600036 600519"),
            Command::Intent(Intent::Reorder(vec![
                "600036".to_string(),
                "600519".to_string()
            ]))
        );
        assert_eq!(
            parse_command("set 0.9 10"),
            Command::Intent(Intent::UpdateSettings {
                opacity: 0.9,
                refresh_interval: 10
            })
        );
        assert_eq!(
            parse_command("calc 10 10.5 1000"),
            Command::Calc {
                buy: "10".to_string(),
                sell: "10.5".to_string(),
                shares: "1000".to_string()
            }
        );
    }

    #[test]
    fn test_parse_command_rejects_bad_input() {
        assert!(matches!(parse_command("add 12345"), Command::Unknown(_)));
        assert!(matches!(parse_command("set high 10"), Command::Unknown(_)));
        assert!(matches!(parse_command("search"), Command::Unknown(_)));
        assert!(matches!(parse_command("buy 600519"), Command::Unknown(_)));
    }

    #[test]
    fn test_render_pass() {
        let pass = RefreshPass {
            sequence: 3,
            started_at: Local.with_ymd_and_hms(2026, 10, 16, 10, 0, 5).unwrap(),
            quotes: vec![
                QuoteSnapshot {
                    symbol: sym("600519"),
                    name: "贵州茅台".to_string(),
                    price: 1690.0,
                    change: 10.0,
                    change_percent: 0.6,
                    open: 1685.5,
                },
                QuoteSnapshot {
                    symbol: sym("000001"),
                    name: "平安银行".to_string(),
                    price: 11.2,
                    change: -0.1,
                    change_percent: -0.88,
                    open: 11.3,
                },
            ],
            omitted: vec![sym("600036")],
            elapsed: Duration::from_millis(120),
        };

        let text = render_pass(&pass);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("#3 10:00:05"));
        assert_eq!(lines[1], "600519");
        assert_eq!(lines[2], "贵州茅台    1685.50    1690.00    +0.60%");
        assert_eq!(lines[4], "平安银行    11.30    11.20    -0.88%");
        assert_eq!(lines[5], "暂无数据: 600036");
    }

    #[test]
    fn test_render_detail_and_calc() {
        let series = IntradaySeries {
            symbol: sym("600519"),
            previous_close: 100.0,
            session_open: 101.0,
            last_price: 101.5,
            synthesized_from_placeholder: true,
            points: intraday::synthesize(100.0, 101.0),
        };
        let text = render_detail(&series);
        assert!(text.starts_with("600519 上交所"));
        assert!(text.contains("示意数据"));
        assert!(text.contains("150 点"));

        let rising = series.bar_trends().iter().filter(|t| **t == Trend::Up).count();
        assert!(text.contains(&format!("(红 {} 绿 {})", rising, 150 - rising)));

        let shenzhen = IntradaySeries {
            symbol: sym("000001"),
            points: Vec::new(),
            ..series
        };
        let text = render_detail(&shenzhen);
        assert!(text.starts_with("000001 深交所"));
        assert!(!text.contains("点"));

        assert_eq!(render_calc("10", "10.5", "1000"), "盈亏: +¥500.00 (+5.00%)");
        assert_eq!(render_calc("", "10.5", "1000"), calculator::EMPTY_LABEL);
        assert_eq!(render_calc("10", "10.5", "150"), "盈亏: +¥50.00 (+5.00%)");
    }

    #[test]
    fn test_render_event() {
        let advisory = Event::Advisory(Advisory::DuplicateSymbol(sym("600519")));
        assert_eq!(render_event(&advisory), "提示: 股票 600519 已在列表中");

        let empty = Event::SearchResults {
            keyword: "xyz".to_string(),
            results: Vec::new(),
        };
        assert_eq!(render_event(&empty), "找不到 xyz");

        let settings = Event::SettingsChanged(WidgetConfig::default());
        assert_eq!(render_event(&settings), "透明度 85%  刷新间隔 5s");
    }
}
