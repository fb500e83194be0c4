use rand::Rng;

const CHROME_VERSIONS: [&str; 8] = [
    "131.0.0.0",
    "130.0.0.0",
    "129.0.0.0",
    "128.0.0.0",
    "127.0.0.0",
    "126.0.0.0",
    "125.0.0.0",
    "124.0.0.0",
];

const FIREFOX_VERSIONS: [&str; 6] = ["133.0", "132.0", "131.0", "130.0", "129.0", "128.0"];

const DESKTOP_OS: [&str; 4] = [
    "Windows NT 10.0; Win64; x64",
    "Windows NT 6.1; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "X11; Linux x86_64",
];

/// 隨機產生桌面版瀏覽器的 User-Agent
pub fn gen_random_ua() -> String {
    let mut rng = rand::rng();
    let os = DESKTOP_OS[rng.random_range(0..DESKTOP_OS.len())];

    if rng.random_bool(0.5) {
        let version = CHROME_VERSIONS[rng.random_range(0..CHROME_VERSIONS.len())];
        format!(
            "Mozilla/5.0 ({os}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{version} Safari/537.36"
        )
    } else {
        let version = FIREFOX_VERSIONS[rng.random_range(0..FIREFOX_VERSIONS.len())];
        format!("Mozilla/5.0 ({os}; rv:{version}) Gecko/20100101 Firefox/{version}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_random_ua() {
        for _ in 0..20 {
            let ua = gen_random_ua();
            assert!(ua.starts_with("Mozilla/5.0 ("));
            assert!(ua.contains("Chrome/") || ua.contains("Firefox/"));
        }
    }
}
