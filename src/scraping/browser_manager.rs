//! Native browser lifecycle using `chromiumoxide`.
//!
//! Single source of truth for finding a usable Chromium-family executable,
//! building the launch configuration, and owning the one browser session a
//! run gets. The session is a scoped resource: `close()` on the normal path,
//! best-effort kill on `Drop`, so no Chromium process outlives a crash.

use anyhow::{anyhow, Result};
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use rand::seq::IndexedRandom;
use std::path::Path;
use tracing::{info, warn};

use crate::core::SearchConfig;

// ── User-Agent pool ──────────────────────────────────────────────────────────

const DESKTOP_USER_AGENTS: &[&str] = &[
    // Chrome 133 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36",
    // Chrome 133 – macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36",
    // Chrome 132 – Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Edge 133 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36 Edg/133.0.0.0",
];

/// Returns a randomly-chosen realistic desktop User-Agent string.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    DESKTOP_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

// ── Browser executable discovery ─────────────────────────────────────────────

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (explicit override)
/// 2. PATH scan – finds package-manager installs on all platforms.
/// 3. OS-specific well-known install paths.
pub fn find_chrome_executable() -> Option<String> {
    if let Ok(p) = std::env::var("CHROME_EXECUTABLE") {
        if Path::new(&p).exists() {
            return Some(p);
        }
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = [
            "google-chrome",
            "chromium",
            "chromium-browser",
            "chrome",
            "brave-browser",
            "brave",
        ];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/brave-browser",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

// ── Launch config ────────────────────────────────────────────────────────────

/// Build a `BrowserConfig` with stealth defaults.
///
/// Flags chosen for:
/// * Compatibility with CI / container environments (`--no-sandbox`,
///   `--disable-dev-shm-usage`).
/// * Stealth — `--disable-blink-features=AutomationControlled` hides the
///   `navigator.webdriver` flag; the UA is drawn from `DESKTOP_USER_AGENTS`.
///
/// The default is a *visible* window: the whole point of the tool is that an
/// operator can step in and clear a challenge by hand.
pub fn build_browser_config(exe: &str, headless: bool) -> Result<BrowserConfig> {
    let ua = random_user_agent();
    let (width, height) = (1920u32, 1080u32);

    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width,
            height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(width, height)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-notifications")
        .arg("--disable-popup-blocking")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--mute-audio")
        // Stealth: suppress the CDP automation fingerprint
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", ua));

    if !headless {
        builder = builder.with_head();
    }

    builder
        .build()
        .map_err(|e| anyhow!("Failed to build browser config: {}", e))
}

/// Masks `navigator.webdriver` before any site script runs. Injected on every
/// new document via `Page.addScriptToEvaluateOnNewDocument`.
const WEBDRIVER_MASK_SCRIPT: &str = r#"
Object.defineProperty(Navigator.prototype, 'webdriver', {
    get: () => undefined,
    configurable: true,
});
Object.defineProperty(Navigator.prototype, 'languages', {
    get: () => ['de-DE', 'de', 'en-US', 'en'],
    configurable: true,
});
"#;

// ── Session ──────────────────────────────────────────────────────────────────

/// The one exclusively-owned browser instance of a run, plus the page it
/// drives and the CDP handler drain task.
pub struct BrowserSession {
    browser: Option<Browser>,
    handler_task: tokio::task::JoinHandle<()>,
    pub page: Page,
}

impl BrowserSession {
    /// Launch the browser and open a blank tab with the stealth mask
    /// installed. A failure here is fatal to the run.
    pub async fn launch(config: &SearchConfig) -> Result<Self> {
        let exe = find_chrome_executable().ok_or_else(|| {
            anyhow!(
                "No browser found. Install Chrome, Chromium, or Brave, \
                 or set CHROME_EXECUTABLE to the binary path."
            )
        })?;

        info!(
            "🚀 Launching browser: {} ({})",
            exe,
            if config.headless { "headless" } else { "visible" }
        );

        let browser_config = build_browser_config(&exe, config.headless)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| anyhow!("Failed to launch browser ({}): {}", exe, e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow!("Failed to open page: {}", e))?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            WEBDRIVER_MASK_SCRIPT,
        ))
        .await
        .map_err(|e| anyhow!("Failed to inject webdriver mask: {}", e))?;

        Ok(Self {
            browser: Some(browser),
            handler_task,
            page,
        })
    }

    /// Graceful shutdown: close the browser process, stop the handler drain.
    pub async fn close(mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Browser close error (non-fatal): {}", e);
            }
        }
        self.handler_task.abort();
        info!("🛑 Browser session closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Best-effort cleanup on non-close exit paths. Drop cannot await; if
        // we're inside a tokio runtime, spawn a task to close the browser to
        // avoid zombie Chromium processes.
        self.handler_task.abort();
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        if let Some(mut browser) = self.browser.take() {
            handle.spawn(async move {
                let _ = browser.close().await;
            });
        }
    }
}
