//! In-memory providers for tests

use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::provider::{
    BoxFuture, IdentityResolver, ProviderError, ProviderResult, PublicIpResolver,
    SecurityGroupProvider,
};
use crate::rule::{IngressRule, SecurityGroup};

/// A call received by [`RecordingProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Describe(String),
    Revoke(IngressRule),
    Authorize(IngressRule),
}

/// Security group provider backed by a fixed list of groups
///
/// Records every call. Mutations do not change the stored groups.
#[derive(Default)]
pub struct RecordingProvider {
    groups: Vec<SecurityGroup>,
    fail_authorize_for: Option<String>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingProvider {
    pub fn new(groups: Vec<SecurityGroup>) -> Self {
        Self {
            groups,
            ..Default::default()
        }
    }

    /// Make authorize calls against `group_id` fail
    pub fn failing_authorize(mut self, group_id: impl Into<String>) -> Self {
        self.fail_authorize_for = Some(group_id.into());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn revokes(&self) -> Vec<IngressRule> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Revoke(rule) => Some(rule),
                _ => None,
            })
            .collect()
    }

    pub fn authorizes(&self) -> Vec<IngressRule> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Authorize(rule) => Some(rule),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl SecurityGroupProvider for RecordingProvider {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn describe_groups(
        &self,
        group_name: &str,
    ) -> BoxFuture<'_, ProviderResult<Vec<SecurityGroup>>> {
        self.record(Call::Describe(group_name.to_string()));
        let groups = self
            .groups
            .iter()
            .filter(|g| g.group_name == group_name)
            .cloned()
            .collect();
        Box::pin(async move { Ok(groups) })
    }

    fn revoke_ingress(&self, rule: &IngressRule) -> BoxFuture<'_, ProviderResult<()>> {
        self.record(Call::Revoke(rule.clone()));
        Box::pin(async { Ok(()) })
    }

    fn authorize_ingress(&self, rule: &IngressRule) -> BoxFuture<'_, ProviderResult<()>> {
        self.record(Call::Authorize(rule.clone()));
        let result = match self.fail_authorize_for {
            Some(ref id) if *id == rule.group_id => Err(ProviderError::new(
                "Failed to authorize ingress: RulesPerSecurityGroupLimitExceeded",
            )
            .for_group(id.clone())),
            _ => Ok(()),
        };
        Box::pin(async move { result })
    }
}

/// Identity resolver returning a fixed user, or failing when none is set
#[derive(Default)]
pub struct StaticIdentity {
    user: Option<String>,
    lookups: AtomicUsize,
}

impl StaticIdentity {
    pub fn user(name: &str) -> Self {
        Self {
            user: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    /// Number of `current_user` calls so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl IdentityResolver for StaticIdentity {
    fn current_user(&self) -> BoxFuture<'_, ProviderResult<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let user = self.user.clone();
        Box::pin(async move {
            user.ok_or_else(|| ProviderError::new("NoSuchEntity: The user cannot be found"))
        })
    }
}

/// IP resolver that always fails
pub struct UnreachableIpService;

impl PublicIpResolver for UnreachableIpService {
    fn public_ip(&self) -> BoxFuture<'_, ProviderResult<Ipv4Addr>> {
        Box::pin(async { Err(ProviderError::new("connection refused")) })
    }
}
