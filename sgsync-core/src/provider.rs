//! Provider - Traits abstracting the external services a sync talks to
//!
//! A provider is responsible for turning Effects into actual API calls.
//! Identity and public IP lookups are separate traits so each can be
//! swapped independently (e.g., `--ip` bypasses the IP lookup).

use std::future::Future;
use std::net::Ipv4Addr;
use std::pin::Pin;

use crate::rule::{IngressRule, SecurityGroup};

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    /// Security group name or ID the failure relates to
    pub group: Option<String>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref group) = self.group {
            write!(f, "[{}] {}", group, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            group: None,
            cause: None,
        }
    }

    pub fn for_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Security group operations
///
/// All operations are async and involve side effects on the remote account.
pub trait SecurityGroupProvider: Send + Sync {
    /// Name of this Provider (e.g., "aws")
    fn name(&self) -> &'static str;

    /// Get every security group whose name equals `group_name`
    ///
    /// Returns an empty list if no group matches. Names are only unique per
    /// VPC, so more than one group may come back.
    fn describe_groups(&self, group_name: &str) -> BoxFuture<'_, ProviderResult<Vec<SecurityGroup>>>;

    /// Remove an ingress rule exactly as it exists on the group
    fn revoke_ingress(&self, rule: &IngressRule) -> BoxFuture<'_, ProviderResult<()>>;

    /// Add an ingress rule to the group
    fn authorize_ingress(&self, rule: &IngressRule) -> BoxFuture<'_, ProviderResult<()>>;
}

/// Resolves the user name behind the active credentials
pub trait IdentityResolver: Send + Sync {
    fn current_user(&self) -> BoxFuture<'_, ProviderResult<String>>;
}

/// Resolves the caller's public IPv4 address
pub trait PublicIpResolver: Send + Sync {
    fn public_ip(&self) -> BoxFuture<'_, ProviderResult<Ipv4Addr>>;
}

/// Fixed address, used when the caller already knows its IP
impl PublicIpResolver for Ipv4Addr {
    fn public_ip(&self) -> BoxFuture<'_, ProviderResult<Ipv4Addr>> {
        let ip = *self;
        Box::pin(async move { Ok(ip) })
    }
}

/// Provider implementation for Box<dyn SecurityGroupProvider>
/// This enables dynamic dispatch for Providers
impl SecurityGroupProvider for Box<dyn SecurityGroupProvider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn describe_groups(&self, group_name: &str) -> BoxFuture<'_, ProviderResult<Vec<SecurityGroup>>> {
        (**self).describe_groups(group_name)
    }

    fn revoke_ingress(&self, rule: &IngressRule) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).revoke_ingress(rule)
    }

    fn authorize_ingress(&self, rule: &IngressRule) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).authorize_ingress(rule)
    }
}

impl IdentityResolver for Box<dyn IdentityResolver> {
    fn current_user(&self) -> BoxFuture<'_, ProviderResult<String>> {
        (**self).current_user()
    }
}

impl PublicIpResolver for Box<dyn PublicIpResolver> {
    fn public_ip(&self) -> BoxFuture<'_, ProviderResult<Ipv4Addr>> {
        (**self).public_ip()
    }
}
