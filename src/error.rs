use thiserror::Error;

/// Error taxonomy for the scraping pipeline.
///
/// Recovery is as local as possible: `Extraction` is swallowed per element,
/// `HttpStatus`/`Transport` fail a single target, and only `Config`
/// propagates to the process/HTTP boundary. Persistence errors surface as
/// `anyhow` errors from the repository and are caught per record.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("extraction failed: {context}")]
    Extraction { context: String },

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ScrapeError {
    pub fn extraction(context: impl Into<String>) -> Self {
        ScrapeError::Extraction {
            context: context.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ScrapeError::Config {
            message: message.into(),
        }
    }
}
