mod checkpoint;
mod config;
mod error;
mod extractor;
mod fetch_worker;
mod limiter;
mod ratelimit;
mod record;
mod render;
mod scheduler;
mod scraping_context;
mod text_manipulators;

pub use checkpoint::{CheckpointWriter, HEADER, read_records, to_csv};
pub use config::{LoadFromEnv, RendererKind, ScrapingConfig, ScrapingEnv, UrlTemplate};
pub use error::{FetchError, FetchStage, TemplateError};
pub use extractor::{ADDRESS_SELECTOR, ResultExtractor};
pub use fetch_worker::{DEFAULT_CONTENT_SELECTOR, FetchOutcome, FetchSettings, FetchWorker};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use ratelimit::NavigationPacer;
pub use record::{CommissionRecord, UNKNOWN_ADDRESS};
pub use render::{
    ChromeOptions, ChromePage, ChromeRenderer, HttpPage, HttpRenderer, PageRenderer, RenderPage,
};
pub use scheduler::{BatchScheduler, RoundPlan, RoundReport, batch_ranges};
pub use scraping_context::ScrapingContext;
