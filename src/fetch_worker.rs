use std::{future::Future, sync::Arc, time::Duration};

use log::{debug, info, warn};
use tokio::time::timeout;

use crate::{
    error::{FetchError, FetchStage},
    extractor::ResultExtractor,
    ratelimit::NavigationPacer,
    record::CommissionRecord,
    render::{PageRenderer, RenderPage},
};

pub type FetchOutcome = Result<CommissionRecord, FetchError>;

/// Region of the result page that holds the vote tables.
pub const DEFAULT_CONTENT_SELECTOR: &str = ".table-responsive";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub content_selector: String,
    /// Bounds navigation and, separately, reading the final document.
    pub navigation_timeout: Duration,
    pub content_wait: Duration,
    pub network_idle_wait: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            content_selector: DEFAULT_CONTENT_SELECTOR.to_string(),
            navigation_timeout: Duration::from_secs(10),
            content_wait: Duration::from_secs(5),
            network_idle_wait: Duration::from_secs(5),
        }
    }
}

/// Fetches and extracts one page per call, in a page of its own.
///
/// A fetch is attempted once. Every failure is logged with its URL and returned
/// as a [`FetchError`]; the page is closed on every path.
pub struct FetchWorker<R: PageRenderer> {
    renderer: Arc<R>,
    extractor: ResultExtractor,
    pacer: NavigationPacer,
    settings: FetchSettings,
}

impl<R: PageRenderer> FetchWorker<R> {
    pub fn new(renderer: Arc<R>, extractor: ResultExtractor, settings: FetchSettings) -> Self {
        Self {
            renderer,
            extractor,
            pacer: NavigationPacer::unlimited(),
            settings,
        }
    }

    pub fn with_pacer(mut self, pacer: NavigationPacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let outcome = match self.renderer.new_page().await {
            Ok(page) => {
                let outcome = self.scrape(&page, url).await;
                if let Err(e) = page.close().await {
                    debug!("Failed to close page for {url}: {e}");
                }
                outcome
            }
            Err(source) => Err(FetchError::Context {
                url: url.to_string(),
                source,
            }),
        };

        match &outcome {
            Ok(record) => info!(
                "✓ {}: T={}, N={}",
                record.id, record.trzaskowski_votes, record.nawrocki_votes
            ),
            Err(e) => warn!("✗ {e}"),
        }
        outcome
    }

    async fn scrape(&self, page: &R::Page, url: &str) -> FetchOutcome {
        self.pacer.wait_until_ready().await;

        bounded(url, FetchStage::Navigation, self.settings.navigation_timeout, page.goto(url))
            .await?
            .map_err(|source| FetchError::Navigation {
                url: url.to_string(),
                source,
            })?;

        self.wait_for_content(page, url).await?;

        let html = bounded(
            url,
            FetchStage::Document,
            self.settings.navigation_timeout,
            page.content(),
        )
        .await?
        .map_err(|source| FetchError::Document {
            url: url.to_string(),
            source,
        })?;

        Ok(self.extractor.extract(&html, url))
    }

    /// Waits for the results region; if it never shows up, settles for the
    /// network going quiet and scrapes whatever is there.
    async fn wait_for_content(&self, page: &R::Page, url: &str) -> Result<(), FetchError> {
        let selector = &self.settings.content_selector;
        match timeout(self.settings.content_wait, page.wait_for_visible(selector)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => debug!("{url}: waiting for {selector} failed: {e}"),
            Err(_) => debug!("{url}: {selector} not visible, waiting for network idle"),
        }

        match bounded(
            url,
            FetchStage::NetworkIdle,
            self.settings.network_idle_wait,
            page.wait_for_network_idle(),
        )
        .await?
        {
            Ok(()) => {}
            Err(e) => debug!("{url}: network idle wait failed, scraping anyway: {e}"),
        }
        Ok(())
    }
}

async fn bounded<T>(
    url: &str,
    stage: FetchStage,
    limit: Duration,
    fut: impl Future<Output = T>,
) -> Result<T, FetchError> {
    timeout(limit, fut).await.map_err(|_| FetchError::Timeout {
        url: url.to_string(),
        stage,
    })
}
