//! 做T盈虧試算。
//!
//! 數量以「股」為單位，A 股一手為 100 股。

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{declare::Trend, util::text};

/// 一手的股數
pub const BOARD_LOT: u64 = 100;

/// 沒有可計算的輸入時顯示的文字
pub const EMPTY_LABEL: &str = "盈亏: ¥0.00 (0.00%)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeOutcome {
    /// 盈虧金額，四捨五入到分
    pub profit: Decimal,
    /// 相對買入價的漲跌幅(%)，四捨五入到小數第二位
    pub percent: Decimal,
}

impl TradeOutcome {
    pub fn trend(&self) -> Trend {
        if self.profit.is_sign_negative() && !self.profit.is_zero() {
            Trend::Down
        } else {
            Trend::Up
        }
    }

    /// 例︰`盈亏: +¥500.00 (+5.00%)`、`盈亏: ¥-200.00 (-2.00%)`
    pub fn label(&self) -> String {
        let sign = self.trend().sign();
        format!(
            "盈亏: {sign}¥{:.2} ({sign}{:.2}%)",
            self.profit,
            self.percent,
            sign = sign
        )
    }
}

/// 任一輸入不是正數時回傳 `None`
pub fn evaluate(buy: Decimal, sell: Decimal, shares: u64) -> Option<TradeOutcome> {
    if buy <= Decimal::ZERO || sell <= Decimal::ZERO || shares == 0 {
        return None;
    }

    let spread = sell - buy;
    let profit = spread * Decimal::from(shares);
    let percent = spread / buy * Decimal::ONE_HUNDRED;

    Some(TradeOutcome {
        profit: profit.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        percent: percent.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    })
}

/// 直接拿使用者輸入的文字試算，股數先捨去到整手，任何無法解析的輸入都當成沒有結果
pub fn evaluate_text(buy: &str, sell: &str, shares: &str) -> Option<TradeOutcome> {
    let buy = text::parse_decimal(buy, None).ok()?;
    let sell = text::parse_decimal(sell, None).ok()?;
    let shares = text::parse_u64(shares, None).ok()?;

    evaluate(buy, sell, round_to_board_lot(shares))
}

/// 試算結果的顯示文字
pub fn describe(outcome: Option<&TradeOutcome>) -> String {
    match outcome {
        Some(outcome) => outcome.label(),
        None => EMPTY_LABEL.to_string(),
    }
}

/// 無條件捨去到整手，不足一手以一手計，0 維持 0
pub fn round_to_board_lot(shares: u64) -> u64 {
    if shares == 0 {
        return 0;
    }

    ((shares / BOARD_LOT) * BOARD_LOT).max(BOARD_LOT)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_evaluate_profit() {
        let outcome = evaluate(dec!(10.00), dec!(10.50), 1000).unwrap();
        assert_eq!(outcome.profit, dec!(500.00));
        assert_eq!(outcome.percent, dec!(5.00));
        assert_eq!(outcome.trend(), Trend::Up);
        assert_eq!(outcome.label(), "盈亏: +¥500.00 (+5.00%)");
    }

    #[test]
    fn test_evaluate_loss() {
        let outcome = evaluate(dec!(10.00), dec!(9.80), 1000).unwrap();
        assert_eq!(outcome.profit, dec!(-200.00));
        assert_eq!(outcome.trend(), Trend::Down);
        assert_eq!(outcome.label(), "盈亏: ¥-200.00 (-2.00%)");
    }

    #[test]
    fn test_evaluate_break_even_counts_as_up() {
        let outcome = evaluate(dec!(12.34), dec!(12.34), 100).unwrap();
        assert_eq!(outcome.label(), "盈亏: +¥0.00 (+0.00%)");
    }

    #[test]
    fn test_evaluate_rounds_percent() {
        let outcome = evaluate(dec!(3.00), dec!(3.01), 100).unwrap();
        assert_eq!(outcome.profit, dec!(1.00));
        assert_eq!(outcome.percent, dec!(0.33));
    }

    #[test]
    fn test_non_positive_input_has_no_outcome() {
        assert!(evaluate(dec!(0), dec!(10), 100).is_none());
        assert!(evaluate(dec!(10), dec!(-1), 100).is_none());
        assert!(evaluate(dec!(10), dec!(11), 0).is_none());
        assert_eq!(describe(None), EMPTY_LABEL);
    }

    #[test]
    fn test_evaluate_text() {
        let outcome = evaluate_text("1,680.00", "1690", "200").unwrap();
        assert_eq!(outcome.profit, dec!(2000.00));
        assert!(evaluate_text("", "1690", "200").is_none());
        assert!(evaluate_text("abc", "1690", "200").is_none());
        assert!(evaluate_text("1680", "1690", "2.5").is_none());
        assert!(evaluate_text("1680", "1690", "0").is_none());
    }

    #[test]
    fn test_evaluate_text_trades_whole_lots() {
        let odd = evaluate_text("10", "10.5", "150").unwrap();
        assert_eq!(odd.profit, dec!(50.00));
        assert_eq!(odd, evaluate_text("10", "10.5", "100").unwrap());

        let under_a_lot = evaluate_text("10", "10.5", "50").unwrap();
        assert_eq!(under_a_lot.profit, dec!(50.00));

        let lots = evaluate_text("10", "10.5", "1250").unwrap();
        assert_eq!(lots.profit, dec!(600.00));
    }

    #[test]
    fn test_round_to_board_lot() {
        assert_eq!(round_to_board_lot(0), 0);
        assert_eq!(round_to_board_lot(1), 100);
        assert_eq!(round_to_board_lot(99), 100);
        assert_eq!(round_to_board_lot(250), 200);
        assert_eq!(round_to_board_lot(1000), 1000);
    }
}
