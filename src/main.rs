use std::sync::Arc;

use dotenv::dotenv;
use obkw_scraper::{
    ChromeOptions, ChromeRenderer, HttpRenderer, RendererKind, ScrapingContext,
};

extern crate env_logger;
extern crate log;

use log::LevelFilter;

use log::{info, warn};

async fn run_with_chrome(context: &ScrapingContext) -> anyhow::Result<()> {
    let options = ChromeOptions {
        executable: context.scraping_config.chrome_executable.clone(),
        ..ChromeOptions::default()
    };
    let renderer = Arc::new(ChromeRenderer::launch(&options).await?);
    context.run_rounds(Arc::clone(&renderer)).await?;

    match Arc::try_unwrap(renderer) {
        Ok(renderer) => {
            if let Err(e) = renderer.shutdown().await {
                warn!("Browser shutdown failed: {e:#}");
            }
        }
        Err(_) => {
            warn!("Browser still referenced at shutdown, leaving it to exit with the process")
        }
    }
    Ok(())
}

async fn run_with_http(context: &ScrapingContext) -> anyhow::Result<()> {
    let renderer = Arc::new(HttpRenderer::new()?);
    context.run_rounds(renderer).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let context = ScrapingContext::new()?;
    info!(
        "Writing results to {}",
        context.scraping_config.output_dir.display()
    );
    match context.scraping_config.renderer {
        RendererKind::Chrome => run_with_chrome(&context).await?,
        RendererKind::Http => run_with_http(&context).await?,
    }
    info!("Scraping finished");
    Ok(())
}
