use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, anyhow};
use chromiumoxide::{
    Page,
    browser::{Browser, BrowserConfig},
    cdp::browser_protocol::{
        browser::BrowserContextId,
        target::{CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams},
    },
};
use futures::StreamExt;
use log::{debug, info, trace, warn};
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{Instant, sleep},
};

use super::{PageRenderer, RenderPage};

const LAUNCH_ARGS: [&str; 5] = [
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-images",
    "--disable-plugins",
    "--disable-extensions",
];

// The resource count must hold still this long for the page to count as idle.
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub executable: Option<PathBuf>,
    pub poll_interval: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            executable: None,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// One headless Chrome shared by every fetch of a run. Each fetch gets its
/// own tab in a fresh browser context, so no cookies or storage carry over.
pub struct ChromeRenderer {
    browser: Arc<Browser>,
    handler_task: JoinHandle<()>,
    poll_interval: Duration,
}

impl ChromeRenderer {
    pub async fn launch(options: &ChromeOptions) -> anyhow::Result<Self> {
        let mut builder = BrowserConfig::builder().no_sandbox().args(LAUNCH_ARGS);
        if let Some(executable) = &options.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("invalid browser configuration: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch headless Chrome")?;

        // The CDP connection only makes progress while its handler is polled.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler error: {e}");
                }
            }
        });

        info!("Headless Chrome launched");
        Ok(Self {
            browser: Arc::new(browser),
            handler_task,
            poll_interval: options.poll_interval,
        })
    }

    /// Fails if a tab is still open.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let mut browser = Arc::try_unwrap(self.browser)
            .map_err(|_| anyhow!("browser still has open tabs"))?;
        browser.close().await.context("failed to close browser")?;
        if let Err(e) = browser.wait().await {
            warn!("Browser process did not exit cleanly: {e}");
        }
        self.handler_task.abort();
        Ok(())
    }
}

fn tab_target(context_id: BrowserContextId) -> anyhow::Result<CreateTargetParams> {
    CreateTargetParams::builder()
        .url("about:blank")
        .browser_context_id(context_id)
        .build()
        .map_err(|e| anyhow!("invalid tab parameters: {e}"))
}

async fn dispose_context(browser: &Browser, context_id: BrowserContextId) -> anyhow::Result<()> {
    browser
        .execute(DisposeBrowserContextParams::new(context_id))
        .await
        .context("failed to dispose browser context")?;
    Ok(())
}

impl PageRenderer for ChromeRenderer {
    type Page = ChromePage;

    async fn new_page(&self) -> anyhow::Result<ChromePage> {
        let context_id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .context("failed to create browser context")?
            .result
            .browser_context_id;

        let opened = match tab_target(context_id.clone()) {
            Ok(target) => self.browser.new_page(target).await.map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };
        match opened {
            Ok(page) => Ok(ChromePage::new(
                page,
                context_id,
                Arc::clone(&self.browser),
                self.poll_interval,
            )),
            Err(e) => {
                if let Err(dispose) = dispose_context(&self.browser, context_id).await {
                    debug!("{dispose:#}");
                }
                Err(e)
            }
        }
    }
}

/// A browser tab and the context it lives in. Closing it explicitly is
/// preferred; a tab dropped without [`RenderPage::close`] is closed by a
/// background task.
pub struct ChromePage {
    page: Option<Page>,
    context_id: BrowserContextId,
    browser: Arc<Browser>,
    poll_interval: Duration,
    runtime_handle: Option<Handle>,
}

impl ChromePage {
    fn new(
        page: Page,
        context_id: BrowserContextId,
        browser: Arc<Browser>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            page: Some(page),
            context_id,
            browser,
            poll_interval,
            runtime_handle: Handle::try_current().ok(),
        }
    }

    fn page(&self) -> anyhow::Result<&Page> {
        self.page.as_ref().ok_or_else(|| anyhow!("page already closed"))
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: String) -> anyhow::Result<T> {
        let value = self.page()?.evaluate(script).await?.into_value()?;
        Ok(value)
    }
}

fn visibility_script(selector: &str) -> String {
    format!(
        "(() => {{ \
            const el = document.querySelector({selector:?}); \
            if (!el) return false; \
            const style = window.getComputedStyle(el); \
            const rect = el.getBoundingClientRect(); \
            return style.visibility !== 'hidden' && style.display !== 'none' \
                && rect.width > 0 && rect.height > 0; \
        }})()"
    )
}

const LOAD_STATE_SCRIPT: &str =
    "(() => [document.readyState, performance.getEntriesByType('resource').length])()";

impl RenderPage for ChromePage {
    async fn goto(&self, url: &str) -> anyhow::Result<()> {
        self.page()?.goto(url).await?;
        Ok(())
    }

    async fn wait_for_visible(&self, selector: &str) -> anyhow::Result<()> {
        let script = visibility_script(selector);
        loop {
            if self.evaluate::<bool>(script.clone()).await? {
                return Ok(());
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn wait_for_network_idle(&self) -> anyhow::Result<()> {
        let mut last_count = None;
        let mut stable_since = Instant::now();
        loop {
            let (ready_state, resources): (String, u64) =
                self.evaluate(LOAD_STATE_SCRIPT.to_string()).await?;
            if last_count != Some(resources) {
                last_count = Some(resources);
                stable_since = Instant::now();
            } else if ready_state == "complete" && stable_since.elapsed() >= NETWORK_IDLE_WINDOW {
                return Ok(());
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn content(&self) -> anyhow::Result<String> {
        Ok(self.page()?.content().await?)
    }

    async fn close(mut self) -> anyhow::Result<()> {
        let Some(page) = self.page.take() else {
            return Ok(());
        };
        let closed = page.close().await;
        dispose_context(&self.browser, self.context_id.clone()).await?;
        closed?;
        Ok(())
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        let Some(handle) = self.runtime_handle.take() else {
            return;
        };
        let browser = Arc::clone(&self.browser);
        let context_id = self.context_id.clone();
        handle.spawn(async move {
            match page.close().await {
                Ok(()) => trace!("dropped tab closed"),
                Err(e) => warn!("failed to close dropped tab: {e}"),
            }
            if let Err(e) = dispose_context(&browser, context_id).await {
                warn!("{e:#}");
            }
        });
    }
}
