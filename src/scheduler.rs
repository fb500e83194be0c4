//! 定時刷新自選股報價。
//!
//! 狀態只有 `Idle → Running → Stopped` 三種。同一時間只有一個計時迴圈，
//! 每輪依自選股順序逐一抓取報價，整輪結束後才送出結果，所以不會有兩輪重疊。
//! `restart`、`stop` 只影響下一次觸發，正在進行的那一輪不會被打斷；
//! 但 `stop` 之後完成的那一輪結果會被丟棄。

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Local};
use strum::Display;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, Instant},
};

use crate::{
    config::SETTINGS,
    crawler::MarketData,
    declare::{QuoteSnapshot, Symbol},
    logging,
    store::clamp_refresh_interval,
    watchlist::SharedWatchList,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum SchedulerState {
    #[default]
    Idle,
    Running,
    Stopped,
}

/// 一輪刷新的結果
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshPass {
    /// 從 1 開始，每送出一輪加 1
    pub sequence: u64,
    pub started_at: DateTime<Local>,
    /// 成功的報價，順序與開始時的自選股順序相同
    pub quotes: Vec<QuoteSnapshot>,
    /// 本輪抓取失敗而缺席的代碼
    pub omitted: Vec<Symbol>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Control {
    period: Duration,
    stopped: bool,
    restarts: u64,
    nudges: u64,
}

#[derive(Default)]
struct Inner {
    state: SchedulerState,
    generation: u64,
    sequence: u64,
    control: Option<watch::Sender<Control>>,
    task: Option<JoinHandle<()>>,
}

impl Inner {
    fn running(&self) -> bool {
        self.state == SchedulerState::Running
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn period_of(seconds: u64) -> Duration {
    Duration::from_secs(clamp_refresh_interval(seconds))
}

pub struct RefreshScheduler {
    market: Arc<dyn MarketData>,
    watchlist: SharedWatchList,
    passes: mpsc::UnboundedSender<RefreshPass>,
    pass_deadline: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl RefreshScheduler {
    /// `pass_deadline` 為單輪抓取的時間上限，超過的代碼視為失敗
    pub fn new(
        market: Arc<dyn MarketData>,
        watchlist: SharedWatchList,
        passes: mpsc::UnboundedSender<RefreshPass>,
        pass_deadline: Duration,
    ) -> Self {
        RefreshScheduler {
            market,
            watchlist,
            passes,
            pass_deadline,
            inner: Default::default(),
        }
    }

    /// 使用 app.json / env 設定的單輪時限
    pub fn with_settings(
        market: Arc<dyn MarketData>,
        watchlist: SharedWatchList,
        passes: mpsc::UnboundedSender<RefreshPass>,
    ) -> Self {
        Self::new(
            market,
            watchlist,
            passes,
            Duration::from_secs(SETTINGS.widget.pass_deadline_secs),
        )
    }

    pub fn state(&self) -> SchedulerState {
        lock(&self.inner).state
    }

    /// 立即刷新一輪，之後每 `seconds` 秒刷新一次。已在執行時等同 `restart`
    pub async fn start(&self, seconds: u64) {
        let period = period_of(seconds);

        let (worker, previous) = {
            let mut inner = lock(&self.inner);
            if inner.running() {
                Self::retime(&inner, period);
                return;
            }

            let (sender, receiver) = watch::channel(Control {
                period,
                stopped: false,
                restarts: 0,
                nudges: 0,
            });

            inner.generation += 1;
            inner.state = SchedulerState::Running;
            inner.control = Some(sender);

            let worker = Worker {
                market: Arc::clone(&self.market),
                watchlist: Arc::clone(&self.watchlist),
                passes: self.passes.clone(),
                pass_deadline: self.pass_deadline,
                inner: Arc::clone(&self.inner),
                generation: inner.generation,
                control: receiver,
            };

            (worker, inner.task.take())
        };

        // 上一次 stop 時可能還有一輪沒跑完，先中止它再開始新的迴圈
        if let Some(previous) = previous {
            previous.abort();
            let _ = previous.await;
        }

        let handle = tokio::spawn(worker.run());
        if let Some(stale) = lock(&self.inner).task.replace(handle) {
            stale.abort();
        }

        logging::info_file_async(format!(
            "The refresh scheduler is running every {}s",
            period.as_secs()
        ));
    }

    /// 改用新的間隔，從現在起重新計時。不在執行中時等同 `start`
    pub async fn restart(&self, seconds: u64) {
        let period = period_of(seconds);

        {
            let inner = lock(&self.inner);
            if inner.running() {
                Self::retime(&inner, period);
                logging::info_file_async(format!(
                    "The refresh scheduler is restarted every {}s",
                    period.as_secs()
                ));
                return;
            }
        }

        self.start(seconds).await;
    }

    fn retime(inner: &Inner, period: Duration) {
        if let Some(control) = &inner.control {
            control.send_modify(|c| {
                c.period = period;
                c.restarts += 1;
            });
        }
    }

    /// 不改變間隔，馬上刷新一輪。正在刷新時會在該輪結束後立刻再跑一輪
    pub fn refresh_now(&self) -> bool {
        let inner = lock(&self.inner);
        if !inner.running() {
            return false;
        }

        if let Some(control) = &inner.control {
            control.send_modify(|c| c.nudges += 1);
        }

        true
    }

    /// 可以重複呼叫
    pub fn stop(&self) {
        let mut inner = lock(&self.inner);
        if !inner.running() {
            return;
        }

        inner.state = SchedulerState::Stopped;
        inner.generation += 1;
        if let Some(control) = inner.control.take() {
            control.send_modify(|c| c.stopped = true);
        }

        logging::info_file_async("The refresh scheduler is stopped".to_string());
    }

    /// 停止並等待計時迴圈結束
    pub async fn shutdown(&self) {
        self.stop();

        let task = lock(&self.inner).task.take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }
    }
}

struct Worker {
    market: Arc<dyn MarketData>,
    watchlist: SharedWatchList,
    passes: mpsc::UnboundedSender<RefreshPass>,
    pass_deadline: Duration,
    inner: Arc<Mutex<Inner>>,
    generation: u64,
    control: watch::Receiver<Control>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            // 在刷新前取快照，刷新期間收到的 restart / refresh_now 才不會漏掉
            let mut seen = *self.control.borrow_and_update();
            if seen.stopped {
                return;
            }

            let pass = self.refresh_once().await;
            if !self.publish(pass) {
                return;
            }

            let sleep = time::sleep(seen.period);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    changed = self.control.changed() => {
                        if changed.is_err() {
                            return;
                        }

                        let now = *self.control.borrow_and_update();
                        if now.stopped {
                            return;
                        }
                        if now.nudges != seen.nudges {
                            break;
                        }
                        if now.restarts != seen.restarts {
                            sleep.as_mut().reset(Instant::now() + now.period);
                        }

                        seen = now;
                    }
                }
            }
        }
    }

    async fn refresh_once(&self) -> RefreshPass {
        let started_at = Local::now();
        let started = Instant::now();
        let deadline = started + self.pass_deadline;

        let symbols = match self.watchlist.read() {
            Ok(list) => list.to_ordered_sequence(),
            Err(poisoned) => poisoned.into_inner().to_ordered_sequence(),
        };

        let mut quotes = Vec::with_capacity(symbols.len());
        let mut omitted = Vec::new();

        for symbol in symbols {
            match time::timeout_at(deadline, self.market.fetch_quote(&symbol)).await {
                Ok(Ok(quote)) => quotes.push(quote),
                Ok(Err(why)) => {
                    logging::warn_file_async(format!(
                        "Failed to refresh {} because {}",
                        symbol, why
                    ));
                    omitted.push(symbol);
                }
                Err(_) => {
                    logging::warn_file_async(format!(
                        "Failed to refresh {} because the pass ran over {:?}",
                        symbol, self.pass_deadline
                    ));
                    omitted.push(symbol);
                }
            }
        }

        RefreshPass {
            sequence: 0,
            started_at,
            quotes,
            omitted,
            elapsed: started.elapsed(),
        }
    }

    /// 已停止或已被新的迴圈取代時丟棄結果並回傳 false
    fn publish(&self, mut pass: RefreshPass) -> bool {
        let mut inner = lock(&self.inner);
        if !inner.running() || inner.generation != self.generation {
            return false;
        }

        inner.sequence += 1;
        pass.sequence = inner.sequence;

        self.passes.send(pass).is_ok()
    }
}
