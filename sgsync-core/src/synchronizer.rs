//! Synchronizer - Pin each named security group's ingress to the caller's IP
//!
//! Resolves who and where the caller is, then walks the groups one at a
//! time: describe, plan, apply. The first error aborts the run.

use std::net::Ipv4Addr;

use log::{debug, info};

use crate::differ::plan_group;
use crate::error::{SyncError, SyncResult};
use crate::interpreter::{EffectOutcome, Interpreter, InterpreterConfig};
use crate::plan::{Plan, PlanSummary};
use crate::provider::{IdentityResolver, PublicIpResolver, SecurityGroupProvider};
use crate::rule::{DEFAULT_PROTOCOL, DesiredRule, RuleIdentity};

/// What to synchronize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub group_names: Vec<String>,
    pub port: u16,
    pub location: String,
    pub protocol: String,
}

impl SyncRequest {
    pub fn new(group_names: Vec<String>, port: u16, location: impl Into<String>) -> Self {
        Self {
            group_names,
            port,
            location: location.into(),
            protocol: DEFAULT_PROTOCOL.to_string(),
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }
}

/// Outcome for one security group
#[derive(Debug)]
pub struct GroupReport {
    pub plan: Plan,
    pub outcomes: Vec<EffectOutcome>,
}

/// Outcome of a full run
#[derive(Debug)]
pub struct SyncReport {
    pub desired: DesiredRule,
    pub groups: Vec<GroupReport>,
}

impl SyncReport {
    pub fn summary(&self) -> PlanSummary {
        let mut total = PlanSummary::default();
        for group in &self.groups {
            total += group.plan.summary();
        }
        total
    }
}

/// Progress callbacks for [`Synchronizer::run`]
///
/// Called as the run goes, so output for a group appears before the next
/// group is touched.
pub trait SyncObserver {
    /// Identity and IP are known, no group has been touched yet
    fn resolved(&mut self, _desired: &DesiredRule) {}

    /// A group's plan was applied
    fn group_applied(&mut self, _report: &GroupReport) {}
}

impl SyncObserver for () {}

pub struct Synchronizer<P, I, R>
where
    P: SecurityGroupProvider,
    I: IdentityResolver,
    R: PublicIpResolver,
{
    interpreter: Interpreter<P>,
    identity: I,
    public_ip: R,
}

impl<P, I, R> Synchronizer<P, I, R>
where
    P: SecurityGroupProvider,
    I: IdentityResolver,
    R: PublicIpResolver,
{
    pub fn new(provider: P, identity: I, public_ip: R) -> Self {
        Self {
            interpreter: Interpreter::new(provider),
            identity,
            public_ip,
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.interpreter = self.interpreter.with_config(config);
        self
    }

    pub fn provider(&self) -> &P {
        self.interpreter.provider()
    }

    /// Look up the caller's user name and public IP and build the desired rule
    pub async fn resolve(&self, request: &SyncRequest) -> SyncResult<DesiredRule> {
        RuleIdentity::check_location(&request.location)?;

        let user = self
            .identity
            .current_user()
            .await
            .map_err(SyncError::Identity)?;
        let identity = RuleIdentity::new(&user, &request.location)?;
        info!("Rule identity: {}", identity);

        let ip: Ipv4Addr = self
            .public_ip
            .public_ip()
            .await
            .map_err(SyncError::PublicIp)?;
        info!("Public IP: {}", ip);

        Ok(DesiredRule::new(identity, ip, request.port).with_protocol(request.protocol.as_str()))
    }

    /// Synchronize every group matching `group_name`
    async fn sync_group(
        &self,
        group_name: &str,
        desired: &DesiredRule,
        observer: &mut impl SyncObserver,
    ) -> SyncResult<Vec<GroupReport>> {
        let groups = self
            .provider()
            .describe_groups(group_name)
            .await
            .map_err(|e| e.for_group(group_name))?;

        if groups.is_empty() {
            return Err(SyncError::group_not_found(group_name));
        }
        if groups.len() > 1 {
            info!(
                "{} security groups named {}, synchronizing each",
                groups.len(),
                group_name
            );
        }

        let mut reports = Vec::with_capacity(groups.len());
        for group in &groups {
            let plan = plan_group(group, desired);
            debug!("{} ({}): {}", group.group_name, group.group_id, plan.summary());

            let outcomes = self.interpreter.apply(&plan).await.into_result()?;
            let report = GroupReport { plan, outcomes };
            observer.group_applied(&report);
            reports.push(report);
        }

        Ok(reports)
    }

    /// Resolve, then synchronize each group in order
    pub async fn run(
        &self,
        request: &SyncRequest,
        observer: &mut impl SyncObserver,
    ) -> SyncResult<SyncReport> {
        let desired = self.resolve(request).await?;
        observer.resolved(&desired);

        let mut groups = Vec::new();
        for group_name in &request.group_names {
            groups.extend(self.sync_group(group_name, &desired, &mut *observer).await?);
        }

        Ok(SyncReport { desired, groups })
    }
}
