use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock},
};

use crate::{declare::Symbol, error::QuoteError};

/// 與刷新排程共用的自選股清單
pub type SharedWatchList = Arc<RwLock<WatchList>>;

/// 有順序且不重複的自選股清單，順序即畫面上的顯示順序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchList {
    symbols: Vec<Symbol>,
    /// 代碼對應的顯示名稱，沒有時以代碼代替
    names: HashMap<Symbol, String>,
}

impl WatchList {
    pub fn new() -> Self {
        Default::default()
    }

    /// 重複的代碼只保留第一次出現的位置
    pub fn from_symbols<I: IntoIterator<Item = Symbol>>(symbols: I) -> Self {
        let mut list = WatchList::new();
        for symbol in symbols {
            if !list.contains(&symbol) {
                list.symbols.push(symbol);
            }
        }
        list
    }

    pub fn into_shared(self) -> SharedWatchList {
        Arc::new(RwLock::new(self))
    }

    /// 加到清單最後面，已存在時回傳 `DuplicateSymbol`
    pub fn add(&mut self, symbol: Symbol, name: &str) -> Result<(), QuoteError> {
        if self.contains(&symbol) {
            return Err(QuoteError::DuplicateSymbol(symbol.to_string()));
        }

        self.set_name_unchecked(&symbol, name);
        self.symbols.push(symbol);

        Ok(())
    }

    /// 不在清單內時什麼都不做，回傳是否真的移除
    pub fn remove(&mut self, symbol: &Symbol) -> bool {
        match self.symbols.iter().position(|s| s == symbol) {
            Some(index) => {
                self.symbols.remove(index);
                self.names.remove(symbol);
                true
            }
            None => false,
        }
    }

    /// 依拖曳後畫面上的順序重排。
    ///
    /// 只接受清單內已有的代碼，重複的保留第一次出現的位置，
    /// 沒出現在 `sequence` 中的代碼會被移除。項目可以是代碼本身，
    /// 也可以是 `"600519 - 贵州茅台"` 這種顯示文字。
    pub fn reorder<I, S>(&mut self, sequence: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::with_capacity(self.symbols.len());
        let mut ordered = Vec::with_capacity(self.symbols.len());

        for token in sequence {
            let code = symbol_of_row(token.as_ref());
            let Some(symbol) = self.symbols.iter().find(|s| s.as_str() == code) else {
                continue;
            };

            if seen.insert(symbol.clone()) {
                ordered.push(symbol.clone());
            }
        }

        self.names.retain(|symbol, _| seen.contains(symbol));
        self.symbols = ordered;
    }

    pub fn to_ordered_sequence(&self) -> Vec<Symbol> {
        self.symbols.clone()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn name_of<'a>(&'a self, symbol: &'a Symbol) -> &'a str {
        self.names
            .get(symbol)
            .map(String::as_str)
            .unwrap_or_else(|| symbol.as_str())
    }

    /// 只更新清單內已有的代碼
    pub fn set_name(&mut self, symbol: &Symbol, name: &str) {
        if self.contains(symbol) {
            self.set_name_unchecked(symbol, name);
        }
    }

    fn set_name_unchecked(&mut self, symbol: &Symbol, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            self.names.remove(symbol);
        } else {
            self.names.insert(symbol.clone(), name.to_string());
        }
    }

    /// 寫回設定檔用的代碼清單
    pub fn to_config_stocks(&self) -> Vec<String> {
        self.symbols.iter().map(|s| s.to_string()).collect()
    }

    /// 例︰["600519 - 贵州茅台", "000001 - 000001"]
    pub fn display_rows(&self) -> Vec<String> {
        self.symbols
            .iter()
            .map(|s| format!("{} - {}", s, self.name_of(s)))
            .collect()
    }
}

/// 從 `"代碼 - 名稱"` 取出代碼，沒有分隔符號時整段視為代碼
pub fn symbol_of_row(row: &str) -> &str {
    match row.split_once(" - ") {
        Some((code, _)) => code.trim(),
        None => row.trim(),
    }
}
