//! Authenticated endpoint fetcher
//!
//! Retrieves the raw bean envelope from the management endpoint, optionally
//! negotiating Kerberos/SPNEGO. Every failure mode is a recoverable
//! [`FetchError`]; one bad scrape must never take the serving process down.

use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use super::krb::KrbSession;
use crate::error::{FetchError, StartupError};

/// How a fetch authenticates to the management endpoint.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Plain GET; a 401 answer is an error, never empty data
    Anonymous,
    /// Kerberos login with a password credential
    Password {
        /// `user@REALM`
        principal: String,
        /// Cleartext password
        password: String,
    },
    /// Kerberos login with a keytab-derived key
    Keytab {
        /// Keytab file path
        path: PathBuf,
        /// `user@REALM`
        principal: String,
    },
}

/// HTTP fetcher with a shared connection pool and a per-request timeout.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Build the fetcher; `timeout_ms` bounds every request so a stuck poll
    /// cannot stall a concurrent scrape sharing the client.
    pub fn new(timeout_ms: u64) -> Result<Self, StartupError> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(StartupError::HttpClientInit)?;

        Ok(Self { client })
    }

    /// Fetch the raw body of `url` under the given auth mode.
    #[instrument(skip(self, auth), fields(url = %url))]
    pub async fn fetch(&self, url: &str, auth: &AuthMode) -> Result<Vec<u8>, FetchError> {
        match auth {
            AuthMode::Anonymous => self.fetch_anonymous(url).await,
            AuthMode::Password {
                principal,
                password,
            } => {
                let session = KrbSession::with_password(principal, password)?;
                self.fetch_negotiate(url, &session).await
            }
            AuthMode::Keytab { path, principal } => {
                let session = KrbSession::with_keytab(path, principal)?;
                self.fetch_negotiate(url, &session).await
            }
        }
    }

    async fn fetch_anonymous(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(FetchError::AuthRequired),
            status if !status.is_success() => Err(FetchError::HttpStatus(status.as_u16())),
            _ => Ok(response.bytes().await?.to_vec()),
        }
    }

    /// Login, build the SPNEGO token for `HTTP/<fqdn>`, and GET with an
    /// `Authorization: Negotiate` header. Reference behavior: login per
    /// fetch, no session cache across polls.
    async fn fetch_negotiate(&self, url: &str, session: &KrbSession) -> Result<Vec<u8>, FetchError> {
        session.login().await?;

        let spn = service_principal(url)?;
        let token = session.negotiate_token(&spn)?;
        debug!(spn = %spn, token_len = token.len(), "SPNEGO token ready");

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Negotiate {}", BASE64.encode(&token)))
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(FetchError::Negotiation {
                spn,
                reason: "endpoint rejected the negotiated credentials".to_string(),
            }),
            status if !status.is_success() => Err(FetchError::HttpStatus(status.as_u16())),
            _ => Ok(response.bytes().await?.to_vec()),
        }
    }
}

/// Service principal name for the endpoint host: `HTTP/<fqdn>`.
pub fn service_principal(url: &str) -> Result<String, FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;
    Ok(format!("HTTP/{}", host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_new() {
        assert!(Fetcher::new(5000).is_ok());
    }

    #[test]
    fn test_service_principal_from_url() {
        let spn = service_principal("http://nn01.example.com:50070/jmx").unwrap();
        assert_eq!(spn, "HTTP/nn01.example.com");
    }

    #[test]
    fn test_service_principal_invalid_url() {
        assert!(matches!(
            service_principal("not a url").unwrap_err(),
            FetchError::InvalidUrl(_)
        ));
    }
}
