//! The single capability the analyzer needs from the network: GET a URL, get JSON back.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] octocrab::Error),

    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Issues one GET per call. Implementations never retry.
///
/// `url` is fully qualified and already carries the credential.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn fetch(&self, url: &str) -> Result<Value, TransportError>;
}

/// Strips the `access_token` query parameter so URLs can be logged.
pub fn redact(url: &str) -> String {
    match url.find("access_token=") {
        Some(start) => {
            let value_start = start + "access_token=".len();
            let value_end = url[value_start..]
                .find('&')
                .map_or(url.len(), |offset| value_start + offset);
            format!("{}***{}", &url[..value_start], &url[value_end..])
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact() {
        assert_eq!(
            redact("https://api.github.com/x?page=1&access_token=secret"),
            "https://api.github.com/x?page=1&access_token=***"
        );
        assert_eq!(
            redact("https://api.github.com/x?access_token=secret&page=2"),
            "https://api.github.com/x?access_token=***&page=2"
        );
        assert_eq!(redact("https://api.github.com/x"), "https://api.github.com/x");
    }
}
