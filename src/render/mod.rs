//! Page rendering backends.
//!
//! A [`PageRenderer`] is shared by every fetch of a round and hands out one
//! isolated [`RenderPage`] per fetch. None of the page operations time out on
//! their own; the fetch worker bounds each of them.

use std::future::Future;

mod chrome;
mod http;

pub use chrome::{ChromeOptions, ChromePage, ChromeRenderer};
pub use http::{HttpPage, HttpRenderer};

pub trait PageRenderer: Send + Sync + 'static {
    type Page: RenderPage;

    /// Opens a fresh, isolated page. The caller must [`RenderPage::close`] it.
    fn new_page(&self) -> impl Future<Output = anyhow::Result<Self::Page>> + Send;
}

pub trait RenderPage: Send + Sync + 'static {
    fn goto(&self, url: &str) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Resolves once an element matching `selector` is visible.
    fn wait_for_visible(&self, selector: &str) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Resolves once the page has stopped loading resources.
    fn wait_for_network_idle(&self) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// The current document as HTML text.
    fn content(&self) -> impl Future<Output = anyhow::Result<String>> + Send;

    fn close(self) -> impl Future<Output = anyhow::Result<()>> + Send;
}
