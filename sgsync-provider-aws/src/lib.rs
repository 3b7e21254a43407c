//! sgsync AWS Provider
//!
//! EC2 security group and IAM identity operations, plus the HTTP public IP
//! lookup.

pub mod public_ip;

pub use public_ip::{CheckIpResolver, DEFAULT_IP_SERVICE_URL};

use std::fmt;

use aws_config::Region;
use aws_sdk_ec2::Client as Ec2Client;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::{Filter, IpPermission, IpRange};
use aws_sdk_iam::Client as IamClient;
use aws_sdk_iam::operation::get_user::GetUserError;
use log::{debug, info};
use sgsync_core::provider::{
    BoxFuture, IdentityResolver, ProviderError, ProviderResult, SecurityGroupProvider,
};
use sgsync_core::rule::{IngressRule, SecurityGroup};

/// Protocol value EC2 uses for "all traffic"
const ALL_PROTOCOLS: &str = "-1";

/// Overrides for the default AWS configuration chain
#[derive(Debug, Clone, Default)]
pub struct AwsOptions {
    pub region: Option<String>,
    pub profile: Option<String>,
}

/// AWS Provider
#[derive(Clone)]
pub struct AwsProvider {
    ec2_client: Ec2Client,
    iam_client: IamClient,
    region: String,
}

impl AwsProvider {
    /// Create a new AWS Provider from the default credential and region chain
    pub async fn new(options: &AwsOptions) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(ref region) = options.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(ref profile) = options.profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;

        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        debug!("Loaded AWS config (region: {})", region);

        Self {
            ec2_client: Ec2Client::new(&config),
            iam_client: IamClient::new(&config),
            region,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    // ========== IAM Operations ==========

    /// User name of the IAM user behind the active credentials
    async fn get_iam_user_name(&self) -> ProviderResult<String> {
        let output = self.iam_client.get_user().send().await.map_err(|err| {
            ProviderError::new(get_user_error_message(
                err.as_service_error(),
                DisplayErrorContext(&err),
            ))
        })?;

        let user_name = output
            .user()
            .map(|user| user.user_name().to_string())
            .ok_or_else(|| ProviderError::new("IAM GetUser returned no user"))?;

        info!("Resolved IAM user {}", user_name);
        Ok(user_name)
    }

    // ========== EC2 Security Group Operations ==========

    /// Find Security Groups by group-name (not the Name tag)
    async fn describe_security_groups_by_name(
        &self,
        name: &str,
    ) -> ProviderResult<Vec<SecurityGroup>> {
        let filter = Filter::builder().name("group-name").values(name).build();

        let result = self
            .ec2_client
            .describe_security_groups()
            .filters(filter)
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!(
                    "Failed to describe security groups: {}",
                    DisplayErrorContext(&e)
                ))
                .for_group(name)
            })?;

        Ok(result
            .security_groups()
            .iter()
            .map(convert_security_group)
            .collect())
    }

    /// Revoke an EC2 Security Group ingress rule
    async fn revoke_ec2_ingress(&self, rule: &IngressRule) -> ProviderResult<()> {
        info!("Revoking {} on {}", rule, rule.group_id);

        let result = self
            .ec2_client
            .revoke_security_group_ingress()
            .group_id(&rule.group_id)
            .ip_permissions(to_ip_permission(rule))
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!(
                    "Failed to revoke ingress rule {}: {}",
                    rule,
                    DisplayErrorContext(&e)
                ))
                .for_group(rule.group_id.as_str())
            })?;

        check_revoke_matched(rule, result.unknown_ip_permissions())
    }

    /// Authorize an EC2 Security Group ingress rule
    async fn authorize_ec2_ingress(&self, rule: &IngressRule) -> ProviderResult<()> {
        info!("Authorizing {} on {}", rule, rule.group_id);

        let result = self
            .ec2_client
            .authorize_security_group_ingress()
            .group_id(&rule.group_id)
            .ip_permissions(to_ip_permission(rule))
            .send()
            .await
            .map_err(|e| {
                ProviderError::new(format!(
                    "Failed to authorize ingress rule {}: {}",
                    rule,
                    DisplayErrorContext(&e)
                ))
                .for_group(rule.group_id.as_str())
            })?;

        let rule_ids: Vec<&str> = result
            .security_group_rules()
            .iter()
            .filter_map(|r| r.security_group_rule_id())
            .collect();
        debug!("Created security group rules: {}", rule_ids.join(","));

        Ok(())
    }
}

impl SecurityGroupProvider for AwsProvider {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn describe_groups(&self, group_name: &str) -> BoxFuture<'_, ProviderResult<Vec<SecurityGroup>>> {
        let group_name = group_name.to_string();
        Box::pin(async move { self.describe_security_groups_by_name(&group_name).await })
    }

    fn revoke_ingress(&self, rule: &IngressRule) -> BoxFuture<'_, ProviderResult<()>> {
        let rule = rule.clone();
        Box::pin(async move { self.revoke_ec2_ingress(&rule).await })
    }

    fn authorize_ingress(&self, rule: &IngressRule) -> BoxFuture<'_, ProviderResult<()>> {
        let rule = rule.clone();
        Box::pin(async move { self.authorize_ec2_ingress(&rule).await })
    }
}

impl IdentityResolver for AwsProvider {
    fn current_user(&self) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move { self.get_iam_user_name().await })
    }
}

/// Error message for a failed IAM GetUser call
fn get_user_error_message(error: Option<&GetUserError>, detail: impl fmt::Display) -> String {
    match error {
        Some(e) if e.is_no_such_entity_exception() => format!(
            "The active credentials do not belong to an IAM user (NoSuchEntity): {}",
            detail
        ),
        Some(e) if e.is_service_failure_exception() => {
            format!("IAM service failure: {}", detail)
        }
        _ => format!("Failed to get IAM user: {}", detail),
    }
}

/// EC2 answers success for permissions it could not match and lists them
/// as unknown; treat that as a failed revoke
fn check_revoke_matched(rule: &IngressRule, unknown: &[IpPermission]) -> ProviderResult<()> {
    if unknown.is_empty() {
        return Ok(());
    }
    Err(ProviderError::new(format!("Ingress rule {} no longer exists", rule))
        .for_group(rule.group_id.as_str()))
}

/// Flatten an SDK security group into one IngressRule per IPv4 range
fn convert_security_group(sg: &aws_sdk_ec2::types::SecurityGroup) -> SecurityGroup {
    let group_id = sg.group_id().unwrap_or_default().to_string();
    let mut group = SecurityGroup::new(group_id.as_str(), sg.group_name().unwrap_or_default());
    group.vpc_id = sg.vpc_id().map(String::from);

    for permission in sg.ip_permissions() {
        let protocol = permission.ip_protocol().unwrap_or(ALL_PROTOCOLS);
        // Ports are absent for "all traffic" permissions
        let from_port = permission.from_port().unwrap_or(-1);
        let to_port = permission.to_port().unwrap_or(-1);

        for range in permission.ip_ranges() {
            let Some(cidr) = range.cidr_ip() else {
                continue;
            };
            group.ingress.push(IngressRule {
                group_id: group_id.clone(),
                protocol: protocol.to_string(),
                from_port,
                to_port,
                cidr: cidr.to_string(),
                description: range.description().map(String::from),
            });
        }
    }

    group
}

/// Build the single-range permission EC2 expects for authorize/revoke
fn to_ip_permission(rule: &IngressRule) -> IpPermission {
    let range = IpRange::builder()
        .cidr_ip(&rule.cidr)
        .set_description(rule.description.clone())
        .build();

    let mut builder = IpPermission::builder()
        .ip_protocol(&rule.protocol)
        .ip_ranges(range);
    if rule.protocol != ALL_PROTOCOLS {
        builder = builder.from_port(rule.from_port).to_port(rule.to_port);
    }
    builder.build()
}
