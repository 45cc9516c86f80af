use thiserror::Error;

/// Transport-level failures reported by [`crate::network::NetworkService`].
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("failed to encode request body: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("failed to decode response: {0}")]
    Decoding(#[source] serde_json::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("no internet connection")]
    NoInternet,

    /// Only surfaced by the awaitable API; callback completions never see it.
    #[error("request cancelled")]
    Cancelled,

    #[error("unknown network failure")]
    Unknown,
}

/// Domain errors handed to screens. The consumer only needs to tell
/// "offline" apart from "anything else".
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("no internet connection")]
    NoInternet,
    #[error("something went wrong")]
    Unknown,
}

impl From<NetworkError> for RepositoryError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::NoInternet => RepositoryError::NoInternet,
            _ => RepositoryError::Unknown,
        }
    }
}

/// Disk tier failures. These never reach image consumers; they are logged.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_no_internet_survives_the_repository_boundary() {
        assert_eq!(RepositoryError::from(NetworkError::NoInternet), RepositoryError::NoInternet);
        assert_eq!(RepositoryError::from(NetworkError::Unknown), RepositoryError::Unknown);
        assert_eq!(RepositoryError::from(NetworkError::Cancelled), RepositoryError::Unknown);
        assert_eq!(RepositoryError::from(NetworkError::InvalidUrl("::".into())), RepositoryError::Unknown);

        let bad_json = serde_json::from_str::<u32>("nope").unwrap_err();
        assert_eq!(RepositoryError::from(NetworkError::Decoding(bad_json)), RepositoryError::Unknown);
    }
}
