#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::anyhow;
use obkw_scraper::{FetchSettings, PageRenderer, RenderPage};

/// How a scripted page behaves once navigated to.
#[derive(Clone, Debug)]
pub enum PageScript {
    /// Loads and shows the results region.
    Html(String),
    /// Loads, but the results region never becomes visible.
    Hidden(String),
    /// Like `Hidden`, and the network never goes quiet either.
    Busy(String),
    NavigationError(String),
    /// Navigation never completes.
    Hang,
    Panic,
}

#[derive(Default)]
pub struct RenderStats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub dropped: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl RenderStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// In-memory renderer. URLs without a script render [`result_page`] for the
/// URL's trailing ID.
pub struct ScriptedRenderer {
    scripts: HashMap<String, PageScript>,
    latency: Duration,
    pub stats: Arc<RenderStats>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            latency: Duration::from_millis(5),
            stats: Arc::new(RenderStats::default()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn script(mut self, url: impl Into<String>, script: PageScript) -> Self {
        self.scripts.insert(url.into(), script);
        self
    }
}

impl PageRenderer for ScriptedRenderer {
    type Page = ScriptedPage;

    async fn new_page(&self) -> anyhow::Result<ScriptedPage> {
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(now, Ordering::SeqCst);
        Ok(ScriptedPage {
            scripts: self.scripts.clone(),
            latency: self.latency,
            stats: Arc::clone(&self.stats),
            loaded: Mutex::new(None),
        })
    }
}

pub struct ScriptedPage {
    scripts: HashMap<String, PageScript>,
    latency: Duration,
    stats: Arc<RenderStats>,
    loaded: Mutex<Option<PageScript>>,
}

impl ScriptedPage {
    fn loaded(&self) -> anyhow::Result<PageScript> {
        self.loaded
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("nothing loaded"))
    }
}

impl Drop for ScriptedPage {
    fn drop(&mut self) {
        self.stats.dropped.fetch_add(1, Ordering::SeqCst);
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RenderPage for ScriptedPage {
    async fn goto(&self, url: &str) -> anyhow::Result<()> {
        tokio::time::sleep(self.latency).await;
        let script = self
            .scripts
            .get(url)
            .cloned()
            .unwrap_or_else(|| PageScript::Html(result_page_for_url(url)));
        match &script {
            PageScript::NavigationError(cause) => return Err(anyhow!("{cause}")),
            PageScript::Hang => std::future::pending::<()>().await,
            PageScript::Panic => panic!("renderer crashed on {url}"),
            _ => {}
        }
        *self.loaded.lock().unwrap() = Some(script);
        Ok(())
    }

    async fn wait_for_visible(&self, _selector: &str) -> anyhow::Result<()> {
        match self.loaded()? {
            PageScript::Html(_) => Ok(()),
            _ => std::future::pending().await,
        }
    }

    async fn wait_for_network_idle(&self) -> anyhow::Result<()> {
        match self.loaded()? {
            PageScript::Busy(_) => std::future::pending().await,
            _ => Ok(()),
        }
    }

    async fn content(&self) -> anyhow::Result<String> {
        match self.loaded()? {
            PageScript::Html(html) | PageScript::Hidden(html) | PageScript::Busy(html) => Ok(html),
            other => Err(anyhow!("no document for {other:?}")),
        }
    }

    async fn close(self) -> anyhow::Result<()> {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A minimal results page whose counts are derived from `id`.
pub fn result_page(id: u64) -> String {
    let (nawrocki, trzaskowski) = votes_for(id);
    format!(
        r#"<html><body>
<div class="col-xs-12 col-sm-8 col-lg-9 col-xl-10">Lokal wyborczy {id}</div>
<div class="table-responsive"><table>
<tr>
  <td>NAWROCKI Karol Tadeusz</td>
  <td>{nawrocki}</td>
</tr>
<tr>
  <td>TRZASKOWSKI Rafał Kazimierz</td>
  <td>{trzaskowski}</td>
</tr>
</table></div>
</body></html>"#
    )
}

pub fn votes_for(id: u64) -> (u64, u64) {
    (id % 1000 + 1, id % 777 + 2)
}

fn result_page_for_url(url: &str) -> String {
    let id = url.rsplit('/').next().and_then(|id| id.parse().ok()).unwrap_or(0);
    result_page(id)
}

pub fn url(round: u8, id: u64) -> String {
    format!("https://results.test/obkw/{round}/{id}")
}

pub fn fast_settings() -> FetchSettings {
    FetchSettings {
        navigation_timeout: Duration::from_millis(200),
        content_wait: Duration::from_millis(50),
        network_idle_wait: Duration::from_millis(50),
        ..FetchSettings::default()
    }
}

pub fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}
