use thiserror::Error;

/// Every way a single fetch can end without a bundle.
///
/// Variants fall into four groups so the presentation layer can pick a
/// specific message: configuration, input, upstream and network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error(
        "No OpenWeather API key configured.\n\
         Hint: set OPENWEATHER_API_KEY or run `skycast configure`."
    )]
    MissingCredential,

    #[error("Place name must not be empty")]
    EmptyPlaceName,

    #[error("Location '{0}' was not found by OpenWeather")]
    NotFound(String),

    #[error("OpenWeather rejected the API key (unauthorized)")]
    Unauthorized,

    #[error("OpenWeather request failed with status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Network error while contacting OpenWeather: {cause}")]
    Network { cause: String },

    #[error("OpenWeather did not answer within the request timeout")]
    Timeout,

    #[error("Failed to decode OpenWeather {endpoint} response: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
}

impl FetchError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, FetchError::MissingCredential)
    }

    pub fn is_input(&self) -> bool {
        matches!(self, FetchError::EmptyPlaceName)
    }

    /// Errors reported by the weather API itself, including bodies it sent
    /// with a success status that could not be read.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            FetchError::NotFound(_)
                | FetchError::Unauthorized
                | FetchError::Upstream { .. }
                | FetchError::Decode { .. }
        )
    }

    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network { .. } | FetchError::Timeout)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network {
                cause: err.to_string(),
            }
        }
    }
}
