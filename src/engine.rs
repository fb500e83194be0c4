//! 畫面層與核心之間的唯一入口。
//!
//! 畫面層只送出 [`Intent`]，核心只回傳 [`Event`]，核心不會反過來呼叫任何畫面物件。
//! 會改變自選股清單的操作完成後立刻寫回設定檔並刷新一輪。

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLockReadGuard, RwLockWriteGuard},
};

use anyhow::Result;
use tokio::sync::mpsc;

use crate::{
    crawler::{sina::suggest::DIRECT_ADD_NAME, MarketData},
    declare::{SearchResult, Symbol},
    error::QuoteError,
    intraday::IntradaySeries,
    logging,
    scheduler::{RefreshPass, RefreshScheduler, SchedulerState},
    store::{clamp_opacity, clamp_refresh_interval, ConfigStore, WidgetConfig},
    watchlist::{symbol_of_row, SharedWatchList, WatchList},
};

/// 畫面層送進來的操作
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// 從搜尋結果加入，`None` 代表使用者沒有選取任何項目
    AddSymbol(Option<SearchResult>),
    /// 代碼或 `"600519 - 贵州茅台"` 這種顯示文字
    RemoveSymbol(Option<String>),
    /// 拖曳排序後的完整清單
    Reorder(Vec<String>),
    Search(String),
    OpenDetail(String),
    UpdateSettings { opacity: f64, refresh_interval: u64 },
    Quit,
}

/// 需要讓使用者知道的提示
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    NothingSelected,
    DuplicateSymbol(Symbol),
    InvalidSymbol(String),
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::NothingSelected => write!(f, "请先选择一只股票"),
            Advisory::DuplicateSymbol(symbol) => write!(f, "股票 {} 已在列表中", symbol),
            Advisory::InvalidSymbol(code) => write!(f, "无效的股票代码: {}", code),
        }
    }
}

/// 核心送給畫面層的結果
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Refreshed(RefreshPass),
    /// 目前的自選股，格式為 `"代碼 - 名稱"`
    WatchListChanged(Vec<String>),
    SearchResults {
        keyword: String,
        results: Vec<SearchResult>,
    },
    Detail(IntradaySeries),
    SettingsChanged(WidgetConfig),
    Advisory(Advisory),
}

pub struct Engine {
    market: Arc<dyn MarketData>,
    watchlist: SharedWatchList,
    store: ConfigStore,
    settings: WidgetConfig,
    scheduler: RefreshScheduler,
    passes: mpsc::UnboundedReceiver<RefreshPass>,
    events: mpsc::UnboundedSender<Event>,
}

enum Next {
    Intent(Option<Intent>),
    Pass(RefreshPass),
}

impl Engine {
    /// 讀取設定檔建立自選股清單，此時還不會開始刷新
    pub fn new(
        market: Arc<dyn MarketData>,
        store: ConfigStore,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let settings = store.load();
        let watchlist = WatchList::from_symbols(settings.symbols()).into_shared();
        let (passes_tx, passes) = mpsc::unbounded_channel();
        let scheduler =
            RefreshScheduler::with_settings(Arc::clone(&market), Arc::clone(&watchlist), passes_tx);

        Engine {
            market,
            watchlist,
            store,
            settings,
            scheduler,
            passes,
            events,
        }
    }

    pub fn settings(&self) -> &WidgetConfig {
        &self.settings
    }

    pub fn watchlist(&self) -> SharedWatchList {
        Arc::clone(&self.watchlist)
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// 開始刷新並處理操作，直到收到 `Quit` 或送入端全部關閉
    pub async fn run(mut self, mut intents: mpsc::Receiver<Intent>) -> Result<()> {
        logging::info_file_async(format!(
            "The engine is running with {:?}",
            self.settings
        ));

        self.emit(Event::WatchListChanged(self.read_list().display_rows()));
        self.emit(Event::SettingsChanged(self.settings.clone()));
        self.scheduler.start(self.settings.refresh_interval).await;

        loop {
            let next = tokio::select! {
                intent = intents.recv() => Next::Intent(intent),
                Some(pass) = self.passes.recv() => Next::Pass(pass),
            };

            match next {
                Next::Intent(None) | Next::Intent(Some(Intent::Quit)) => break,
                Next::Intent(Some(intent)) => self.handle(intent).await,
                Next::Pass(pass) => self.on_pass(pass),
            }
        }

        self.scheduler.shutdown().await;
        logging::info_file_async("The engine is stopped".to_string());

        Ok(())
    }

    pub async fn handle(&mut self, intent: Intent) {
        match intent {
            Intent::AddSymbol(None) | Intent::RemoveSymbol(None) => {
                self.advise(Advisory::NothingSelected)
            }
            Intent::AddSymbol(Some(selected)) => self.add(selected),
            Intent::RemoveSymbol(Some(row)) => self.remove(&row),
            Intent::Reorder(rows) => self.reorder(rows),
            Intent::Search(keyword) => self.search(&keyword).await,
            Intent::OpenDetail(row) => self.open_detail(&row).await,
            Intent::UpdateSettings {
                opacity,
                refresh_interval,
            } => self.update_settings(opacity, refresh_interval).await,
            Intent::Quit => self.scheduler.stop(),
        }
    }

    fn add(&mut self, selected: SearchResult) {
        // 直接輸入代碼時還不知道名稱，等第一筆報價回來再補
        let name = if selected.name == DIRECT_ADD_NAME {
            ""
        } else {
            selected.name.as_str()
        };

        let added = self.write_list().add(selected.symbol.clone(), name);
        match added {
            Ok(()) => {
                logging::info_file_async(format!("Add {} to the watch list", selected.symbol));
                self.watchlist_changed();
            }
            Err(QuoteError::DuplicateSymbol(_)) => {
                self.advise(Advisory::DuplicateSymbol(selected.symbol))
            }
            Err(why) => logging::error_file_async(format!(
                "Failed to add {} because {}",
                selected.symbol, why
            )),
        }
    }

    fn remove(&mut self, row: &str) {
        let Some(symbol) = self.parse_row(row) else {
            return;
        };

        let removed = self.write_list().remove(&symbol);
        if removed {
            logging::info_file_async(format!("Remove {} from the watch list", symbol));
            self.watchlist_changed();
        }
    }

    fn reorder(&mut self, rows: Vec<String>) {
        self.write_list().reorder(&rows);
        self.watchlist_changed();
    }

    async fn search(&self, keyword: &str) {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return;
        }

        let results = self.market.search(keyword).await;
        self.emit(Event::SearchResults {
            keyword: keyword.to_string(),
            results,
        });
    }

    async fn open_detail(&self, row: &str) {
        if let Some(symbol) = self.parse_row(row) {
            let series = self.market.fetch_intraday(&symbol).await;
            self.emit(Event::Detail(series));
        }
    }

    async fn update_settings(&mut self, opacity: f64, refresh_interval: u64) {
        self.settings.opacity = clamp_opacity(opacity);
        self.settings.refresh_interval = clamp_refresh_interval(refresh_interval);
        self.persist();

        self.scheduler.restart(self.settings.refresh_interval).await;
        self.emit(Event::SettingsChanged(self.settings.clone()));
    }

    fn on_pass(&mut self, pass: RefreshPass) {
        {
            let mut list = self.write_list();
            for quote in &pass.quotes {
                list.set_name(&quote.symbol, &quote.name);
            }
        }

        self.emit(Event::Refreshed(pass));
    }

    fn watchlist_changed(&mut self) {
        self.persist();
        self.emit(Event::WatchListChanged(self.read_list().display_rows()));
        self.scheduler.refresh_now();
    }

    /// 寫入失敗只記錄，不影響記憶體中的清單
    fn persist(&mut self) {
        let stocks = self.read_list().to_config_stocks();
        self.settings.stocks = stocks;
        if let Err(why) = self.store.save(&self.settings) {
            logging::error_file_async(format!(
                "Failed to save {} because {:?}",
                self.store.path().display(),
                why
            ));
        }
    }

    fn parse_row(&self, row: &str) -> Option<Symbol> {
        let code = symbol_of_row(row);
        match Symbol::parse(code) {
            Ok(symbol) => Some(symbol),
            Err(_) => {
                self.advise(Advisory::InvalidSymbol(code.to_string()));
                None
            }
        }
    }

    fn advise(&self, advisory: Advisory) {
        self.emit(Event::Advisory(advisory));
    }

    fn emit(&self, event: Event) {
        // 畫面層已關閉時沒有人需要這個結果
        let _ = self.events.send(event);
    }

    fn read_list(&self) -> RwLockReadGuard<'_, WatchList> {
        self.watchlist.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_list(&self) -> RwLockWriteGuard<'_, WatchList> {
        self.watchlist.write().unwrap_or_else(PoisonError::into_inner)
    }
}
