use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, anyhow};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{error::TemplateError, fetch_worker::FetchSettings, scheduler::RoundPlan};

/// Prefix of every env var read into [`ScrapingEnv`], e.g. `OBKW_BATCH_SIZE`.
pub const ENV_PREFIX: &str = "OBKW_";

const PLACEHOLDER: &str = "{}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    Chrome,
    Http,
}

/// The env vars needed for scraping. Everything has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapingEnv {
    batch_size: usize,
    max_concurrent: usize,
    batch_pause_ms: u64,
    navigation_timeout_secs: u64,
    content_wait_secs: u64,
    network_idle_secs: u64,
    content_selector: String,
    output_dir: PathBuf,
    renderer: RendererKind,
    chrome_executable: Option<PathBuf>,
    requests_per_second: Option<u32>,
    first_min: u64,
    first_max: u64,
    first_url_template: String,
    second_min: u64,
    second_max: u64,
    second_url_template: String,
}

impl Default for ScrapingEnv {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            batch_size: 30,
            max_concurrent: 15,
            batch_pause_ms: 500,
            navigation_timeout_secs: fetch.navigation_timeout.as_secs(),
            content_wait_secs: fetch.content_wait.as_secs(),
            network_idle_secs: fetch.network_idle_wait.as_secs(),
            content_selector: fetch.content_selector,
            output_dir: PathBuf::from("."),
            renderer: RendererKind::Chrome,
            chrome_executable: None,
            requests_per_second: None,
            first_min: 1404408,
            first_max: 1436239,
            first_url_template: "https://wybory.gov.pl/prezydent2025/pl/obkw/1/{}".to_string(),
            second_min: 1467396,
            second_max: 1499538,
            second_url_template: "https://wybory.gov.pl/prezydent2025/pl/obkw/2/{}".to_string(),
        }
    }
}

/// A URL with a single `{}` where the commission ID goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        if template.matches(PLACEHOLDER).count() != 1 {
            return Err(TemplateError {
                template: template.to_string(),
            });
        }
        Ok(Self(template.to_string()))
    }

    pub fn url_for(&self, id: u64) -> String {
        self.0.replacen(PLACEHOLDER, &id.to_string(), 1)
    }
}

pub struct ScrapingConfig {
    pub rounds: Vec<RoundPlan>,
    pub fetch: FetchSettings,
    pub batch_pause: Duration,
    pub output_dir: PathBuf,
    pub renderer: RendererKind,
    pub chrome_executable: Option<PathBuf>,
    pub requests_per_second: Option<NonZeroU32>,
}

impl ScrapingConfig {
    pub fn new() -> anyhow::Result<Self> {
        let scraping_env = ScrapingEnv::load_from_env()?;
        Self::from_env(scraping_env)
    }

    pub fn from_env(env: ScrapingEnv) -> anyhow::Result<Self> {
        let batch_size = NonZeroUsize::new(env.batch_size)
            .ok_or_else(|| anyhow!("{ENV_PREFIX}BATCH_SIZE must be at least 1"))?;
        let concurrency = NonZeroUsize::new(env.max_concurrent)
            .ok_or_else(|| anyhow!("{ENV_PREFIX}MAX_CONCURRENT must be at least 1"))?;

        let rounds = vec![
            RoundPlan {
                name: "first".to_string(),
                first_id: env.first_min,
                last_id: env.first_max,
                template: UrlTemplate::parse(&env.first_url_template)
                    .context("invalid first round URL template")?,
                batch_size,
                concurrency,
            },
            RoundPlan {
                name: "second".to_string(),
                first_id: env.second_min,
                last_id: env.second_max,
                template: UrlTemplate::parse(&env.second_url_template)
                    .context("invalid second round URL template")?,
                batch_size,
                concurrency,
            },
        ];

        Ok(Self {
            rounds,
            fetch: FetchSettings {
                content_selector: env.content_selector,
                navigation_timeout: Duration::from_secs(env.navigation_timeout_secs),
                content_wait: Duration::from_secs(env.content_wait_secs),
                network_idle_wait: Duration::from_secs(env.network_idle_secs),
            },
            batch_pause: Duration::from_millis(env.batch_pause_ms),
            output_dir: env.output_dir,
            renderer: env.renderer,
            chrome_executable: env.chrome_executable,
            requests_per_second: env.requests_per_second.and_then(NonZeroU32::new),
        })
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config = envy::prefixed(ENV_PREFIX)
            .from_env::<Self>()
            .context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_needs_exactly_one_placeholder() {
        assert!(UrlTemplate::parse("https://host/obkw/1/{}").is_ok());
        assert!(UrlTemplate::parse("https://host/obkw/1/").is_err());
        assert!(UrlTemplate::parse("https://host/{}/obkw/{}").is_err());
    }

    #[test]
    fn template_substitutes_the_id() {
        let template = UrlTemplate::parse("https://host/obkw/2/{}").unwrap();
        assert_eq!(template.url_for(1467396), "https://host/obkw/2/1467396");
    }

    #[test]
    fn defaults_describe_both_rounds() {
        let config = ScrapingConfig::from_env(ScrapingEnv::default()).unwrap();
        assert_eq!(config.rounds.len(), 2);

        let first = &config.rounds[0];
        assert_eq!(first.name, "first");
        assert_eq!((first.first_id, first.last_id), (1404408, 1436239));
        assert_eq!(first.batch_size.get(), 30);
        assert_eq!(first.concurrency.get(), 15);
        assert_eq!(
            first.template.url_for(1404408),
            "https://wybory.gov.pl/prezydent2025/pl/obkw/1/1404408"
        );

        let second = &config.rounds[1];
        assert_eq!((second.first_id, second.last_id), (1467396, 1499538));

        assert_eq!(config.batch_pause, Duration::from_millis(500));
        assert_eq!(config.fetch.navigation_timeout, Duration::from_secs(10));
        assert_eq!(config.renderer, RendererKind::Chrome);
        assert!(config.requests_per_second.is_none());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let env = ScrapingEnv {
            batch_size: 0,
            ..ScrapingEnv::default()
        };
        assert!(ScrapingConfig::from_env(env).is_err());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let env = ScrapingEnv {
            max_concurrent: 0,
            ..ScrapingEnv::default()
        };
        assert!(ScrapingConfig::from_env(env).is_err());
    }

    #[test]
    fn bad_template_is_rejected() {
        let env = ScrapingEnv {
            second_url_template: "https://host/obkw/2/".to_string(),
            ..ScrapingEnv::default()
        };
        let err = ScrapingConfig::from_env(env).err().unwrap();
        assert!(format!("{err:#}").contains("second round"));
    }
}
