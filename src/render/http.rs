use std::sync::Mutex;

use anyhow::anyhow;
use reqwest::{Client, ClientBuilder};
use scraper::{Html, Selector};

use super::{PageRenderer, RenderPage};

const USER_AGENT: &str = concat!("obkw_scraper/", env!("CARGO_PKG_VERSION"));

/// Renders by plain HTTP GET. No JavaScript runs, so this only suits servers
/// that deliver the results already rendered (mirrors, archived dumps).
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new() -> anyhow::Result<Self> {
        let client = ClientBuilder::new().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

impl PageRenderer for HttpRenderer {
    type Page = HttpPage;

    async fn new_page(&self) -> anyhow::Result<HttpPage> {
        Ok(HttpPage {
            client: self.client.clone(),
            body: Mutex::new(None),
        })
    }
}

pub struct HttpPage {
    client: Client,
    body: Mutex<Option<String>>,
}

impl HttpPage {
    fn body(&self) -> anyhow::Result<String> {
        self.body
            .lock()
            .map_err(|_| anyhow!("page state poisoned"))?
            .clone()
            .ok_or_else(|| anyhow!("no document loaded"))
    }
}

fn contains_selector(html: &str, selector: &str) -> anyhow::Result<bool> {
    let selector =
        Selector::parse(selector).map_err(|e| anyhow!("invalid selector {selector:?}: {e}"))?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).next().is_some())
}

impl RenderPage for HttpPage {
    async fn goto(&self, url: &str) -> anyhow::Result<()> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        *self.body.lock().map_err(|_| anyhow!("page state poisoned"))? = Some(body);
        Ok(())
    }

    async fn wait_for_visible(&self, selector: &str) -> anyhow::Result<()> {
        // Without a layout engine, present counts as visible.
        if contains_selector(&self.body()?, selector)? {
            Ok(())
        } else {
            Err(anyhow!("{selector} not present in document"))
        }
    }

    async fn wait_for_network_idle(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn content(&self) -> anyhow::Result<String> {
        self.body()
    }

    async fn close(self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_presence() {
        let html = r#"<div class="table-responsive"><table></table></div>"#;
        assert!(contains_selector(html, ".table-responsive").unwrap());
        assert!(!contains_selector(html, ".missing").unwrap());
    }

    #[tokio::test]
    async fn content_before_goto_is_an_error() {
        let renderer = HttpRenderer::new().unwrap();
        let page = renderer.new_page().await.unwrap();
        assert!(page.content().await.is_err());
    }
}
