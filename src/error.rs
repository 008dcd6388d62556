use std::fmt;

/// Where in a fetch a timeout fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Navigation,
    NetworkIdle,
    Document,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            FetchStage::Navigation => "navigation",
            FetchStage::NetworkIdle => "network idle wait",
            FetchStage::Document => "document retrieval",
        };
        f.write_str(stage)
    }
}

/// Why a single page produced no record.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{url}: could not open a rendering page: {source}")]
    Context {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{url}: navigation failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{url}: timed out during {stage}")]
    Timeout { url: String, stage: FetchStage },

    #[error("{url}: could not read the rendered document: {source}")]
    Document {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{url}: fetch task panicked: {message}")]
    Panicked { url: String, message: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Context { url, .. }
            | FetchError::Navigation { url, .. }
            | FetchError::Timeout { url, .. }
            | FetchError::Document { url, .. }
            | FetchError::Panicked { url, .. } => url,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("The supplied URL template is not valid: {template:?} must contain exactly one `{{}}` placeholder")]
pub struct TemplateError {
    pub template: String,
}
