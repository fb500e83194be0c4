use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use tokio::sync::Semaphore;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};

use crate::{config::SETTINGS, logging::Logger, util};

pub mod user_agent;

/// A semaphore for limiting concurrent requests.
///
/// 限制最多 5 個並發請求，刷新與手動搜尋同時進行時不會打爆對方。
static SEMAPHORE: Lazy<Semaphore> = Lazy::new(|| Semaphore::new(5));

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// An asynchronous trait that provides a method to force convert a reqwest::Response body
/// from GBK encoding to UTF-8 encoding.
#[async_trait]
pub trait TextForceGbk {
    /// Reads the whole body and decodes it as GBK, whatever the `Content-Type` claims.
    async fn text_force_gbk(self) -> Result<String>;
}

#[async_trait]
impl TextForceGbk for Response {
    async fn text_force_gbk(self) -> Result<String> {
        Ok(util::text::gbk_2_utf8(self.bytes().await?.as_ref()))
    }
}

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        // 已安裝過時會回傳 Err，可忽略
        let _ = rustls::crypto::ring::default_provider().install_default();

        Client::builder()
            // ===== 壓縮 =====
            .brotli(true)
            .gzip(true)
            // ===== 超時設置 =====
            .connect_timeout(Duration::from_secs(SETTINGS.http.connect_timeout_secs))
            .timeout(Duration::from_secs(SETTINGS.http.timeout_secs))
            // ===== TCP / 連接池 =====
            .tcp_nodelay(true)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            // ===== Headers =====
            .referer(true)
            .user_agent(user_agent::gen_random_ua())
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// Performs an HTTP GET request and returns the body decoded from GBK.
///
/// # Arguments
///
/// * `url`: The URL to send the GET request to.
/// * `headers`: An optional set of headers to include with the request.
///
/// # Returns
///
/// * `Result<String>`: The UTF-8 text, or an error if the request fails,
///   the status is not successful or the body cannot be read.
pub async fn get_use_gbk(url: &str, headers: Option<header::HeaderMap>) -> Result<String> {
    send(Method::GET, url, headers)
        .await?
        .text_force_gbk()
        .await
        .map_err(|e| anyhow!("Error parsing response text use GBK: {:?}", e))
}

/// Backoff between attempts, `max_attempts - 1` delays in total.
///
/// 2 的次方乘上 250 ms 再加上 jitter，也就是最多約 500 ms、1 s、2 s...
fn retry_strategy(max_attempts: usize) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(2)
        .factor(250)
        .max_delay(Duration::from_secs(4))
        .map(jitter)
        .take(max_attempts.saturating_sub(1))
}

/// Sends an HTTP request, retrying transport failures up to `http.max_attempts` times.
///
/// A response with a non-success status is returned as an error without retrying.
async fn send(method: Method, url: &str, headers: Option<header::HeaderMap>) -> Result<Response> {
    let target = format!("{method} {url}");
    let mut request = get_client()?.request(method, url);
    if let Some(headers) = headers {
        request = request.headers(headers);
    }

    let mut attempt = 0;
    let response = Retry::spawn(retry_strategy(SETTINGS.http.max_attempts), || {
        attempt += 1;
        send_once(&request, &target, attempt)
    })
    .await
    .map_err(|why| {
        LOGGER.error(format!("Gave up {} because {:?}", target, why));
        why
    })?;

    response
        .error_for_status()
        .map_err(|why| anyhow!("{} answered {:?}", target, why.status()))
}

async fn send_once(request: &RequestBuilder, target: &str, attempt: usize) -> Result<Response> {
    let once = request
        .try_clone()
        .ok_or_else(|| anyhow!("The request to {} cannot be repeated", target))?;

    let _permit = SEMAPHORE.acquire().await?;
    let started = Instant::now();
    match once.send().await {
        Ok(response) => {
            LOGGER.info(format!(
                "{} #{} {} {} ms",
                target,
                attempt,
                response.status(),
                started.elapsed().as_millis()
            ));
            Ok(response)
        }
        Err(why) => {
            LOGGER.warn(format!(
                "{} #{} failed because {:?}. {} ms",
                target,
                attempt,
                why,
                started.elapsed().as_millis()
            ));
            Err(anyhow!("{} #{} failed because {:?}", target, attempt, why))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::logging;

    use super::*;

    #[test]
    fn test_retry_strategy() {
        assert_eq!(retry_strategy(0).count(), 0);
        assert_eq!(retry_strategy(1).count(), 0);

        let delays: Vec<Duration> = retry_strategy(4).collect();
        assert_eq!(delays.len(), 3);
        assert!(delays.iter().all(|delay| *delay <= Duration::from_secs(4)));
    }

    #[tokio::test]
    #[ignore]
    async fn test_get_use_gbk() {
        dotenv::dotenv().ok();
        match get_use_gbk("http://qt.gtimg.cn/q=sh600519", None).await {
            Ok(text) => {
                logging::debug_file_async(format!("get_use_gbk: {}", text));
                assert!(text.contains('~'));
            }
            Err(why) => {
                logging::debug_file_async(format!("Failed to get_use_gbk because {:?}", why));
            }
        }
    }
}
