//! Public IP lookup through an HTTP IP-echo service

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use log::debug;
use sgsync_core::provider::{BoxFuture, ProviderError, ProviderResult, PublicIpResolver};
use thiserror::Error;

/// AWS checkip service, answers with the caller's address as plain text
pub const DEFAULT_IP_SERVICE_URL: &str = "https://checkip.amazonaws.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum IpLookupError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("service answered with HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0:?}")]
    Malformed(String),

    #[error("expected an IPv4 address, got {0}")]
    NotIpv4(IpAddr),
}

/// Resolves the public IP by asking an IP-echo service
pub struct CheckIpResolver {
    client: reqwest::Client,
    url: String,
}

impl CheckIpResolver {
    pub fn new(url: impl Into<String>) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::new("Failed to build HTTP client").with_cause(e))?;

        Ok(Self::with_client(client, url))
    }

    fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn fetch(&self) -> Result<Ipv4Addr, IpLookupError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IpLookupError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let ip = parse_ip_body(&body)?;
        debug!("Detected public IP {} via {}", ip, self.url);
        Ok(ip)
    }
}

impl PublicIpResolver for CheckIpResolver {
    fn public_ip(&self) -> BoxFuture<'_, ProviderResult<Ipv4Addr>> {
        Box::pin(async move {
            self.fetch().await.map_err(|e| {
                ProviderError::new(format!("Failed to fetch public IP from {}: {}", self.url, e))
                    .with_cause(e)
            })
        })
    }
}

/// Parse the plain-text body of an IP-echo response
fn parse_ip_body(body: &str) -> Result<Ipv4Addr, IpLookupError> {
    let trimmed = body.trim();
    match trimmed.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Ok(ip),
        Ok(other) => Err(IpLookupError::NotIpv4(other)),
        Err(_) => Err(IpLookupError::Malformed(trimmed.to_string())),
    }
}
