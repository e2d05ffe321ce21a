use super::LivenessProbe;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;

/// Global shared HTTP client for liveness probes.
///
/// The controller only ever probes one worker, but probe attempts are issued
/// in a tight loop; a shared client keeps one connection pool alive instead
/// of re-resolving and re-connecting per construction. The client timeout is
/// a fallback — each request carries its own short per-attempt timeout.
static SHARED_HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn shared_client() -> &'static Client {
    SHARED_HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .build()
            .expect("Failed to create shared HTTP client")
    })
}

/// HTTP-based liveness probe.
pub struct HttpProber {
    url: String,
    client: Client,
    attempt_timeout: Duration,
}

impl HttpProber {
    /// Create a prober with its own client. Prefer
    /// [`with_shared_client`](Self::with_shared_client) outside of tests.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is malformed or uses an unsupported scheme.
    pub fn new(url: String, attempt_timeout: Duration) -> Result<Self> {
        Self::validate_url(&url)?;
        let client = Client::builder().timeout(attempt_timeout).build()?;
        Ok(Self {
            url,
            client,
            attempt_timeout,
        })
    }

    /// Create a prober backed by the global shared client.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is malformed or uses an unsupported scheme.
    pub fn with_shared_client(url: String, attempt_timeout: Duration) -> Result<Self> {
        Self::validate_url(&url)?;
        Ok(Self {
            url,
            client: shared_client().clone(),
            attempt_timeout,
        })
    }

    fn validate_url(url: &str) -> Result<()> {
        match url::Url::parse(url) {
            Ok(parsed) => {
                let scheme = parsed.scheme();
                if scheme != "http" && scheme != "https" {
                    return Err(crate::error::Error::Config(format!(
                        "Invalid liveness URL '{}': scheme must be http or https, got '{}'",
                        url, scheme
                    )));
                }
                Ok(())
            }
            Err(e) => Err(crate::error::Error::Config(format!(
                "Invalid liveness URL '{}': {}",
                url, e
            ))),
        }
    }
}

#[async_trait]
impl LivenessProbe for HttpProber {
    async fn check(&self) -> Result<bool> {
        // Per-request timeout overrides the client's fallback timeout.
        match self
            .client
            .get(&self.url)
            .timeout(self.attempt_timeout)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn target(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_port_is_not_ready() {
        let prober = HttpProber::new(
            "http://127.0.0.1:59999/run".to_string(),
            Duration::from_millis(200),
        )
        .expect("Should create prober");

        assert!(!prober.check().await.unwrap());
    }

    #[tokio::test]
    async fn shared_client_prober_works() {
        let prober = HttpProber::with_shared_client(
            "http://127.0.0.1:59998/run".to_string(),
            Duration::from_millis(200),
        )
        .expect("Should create prober");

        assert!(!prober.check().await.unwrap());
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(HttpProber::new("not-a-url".to_string(), Duration::from_millis(100)).is_err());
        assert!(
            HttpProber::new("ftp://localhost/run".to_string(), Duration::from_millis(100))
                .is_err()
        );
        assert!(
            HttpProber::new("http://localhost/run".to_string(), Duration::from_millis(100))
                .is_ok()
        );
        assert!(HttpProber::new(
            "https://localhost/run".to_string(),
            Duration::from_millis(100)
        )
        .is_ok());
    }
}
