use std::{env, sync::Arc};

use anyhow::Result;
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use stock_widget::{
    console::{self, Command},
    crawler::Remote,
    engine::{Engine, Intent},
    logging,
    store::ConfigStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let store = ConfigStore::from_settings();
    logging::info_console(format!(
        "StockWidget 已啟動 Rust OS/Arch: {}/{} config: {}",
        env::consts::OS,
        env::consts::ARCH,
        store.path().display()
    ));

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let (intents, intents_rx) = mpsc::channel::<Intent>(32);

    let engine = Engine::new(Arc::new(Remote::new()), store, events_tx);
    let running = tokio::spawn(engine.run(intents_rx));

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}\n", console::render_event(&event));
        }
    });

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                logging::info_console("收到 Ctrl-C，停止刷新".to_string());
                break;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(why) => {
                logging::error_file_async(format!("Failed to read stdin because {:?}", why));
                break;
            }
        };

        match console::parse_command(&line) {
            Command::Intent(Intent::Quit) => break,
            Command::Intent(intent) => {
                if intents.send(intent).await.is_err() {
                    break;
                }
            }
            Command::Calc { buy, sell, shares } => {
                println!("{}\n", console::render_calc(&buy, &sell, &shares))
            }
            Command::Help => println!("{}\n", console::HELP),
            Command::Blank => {}
            Command::Unknown(text) => println!("无法识别: {}\n{}\n", text, console::HELP),
        }
    }

    let _ = intents.send(Intent::Quit).await;
    running.await??;
    printer.abort();

    logging::info_console("StockWidget 已結束".to_string());

    Ok(())
}
