//! Rule - Security groups, their ingress rules, and rule ownership

use std::fmt;
use std::net::Ipv4Addr;

use crate::error::{SyncError, SyncResult};

/// Default IP protocol for synchronized rules
pub const DEFAULT_PROTOCOL: &str = "tcp";

/// Ownership tag written into an ingress rule's description
///
/// Formed as `{user}-{location}`. Two runs with the same user and location
/// always produce the same identity, which is how a previous run's rule is
/// recognized as stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleIdentity(String);

impl RuleIdentity {
    pub fn new(user: &str, location: &str) -> SyncResult<Self> {
        if user.trim().is_empty() {
            return Err(SyncError::invalid_identity("user name is empty"));
        }
        Self::check_location(location)?;
        Ok(Self(format!("{}-{}", user, location)))
    }

    /// Reject a location that cannot be part of an identity
    ///
    /// Runs before any lookup so a bad location never costs a network call.
    pub fn check_location(location: &str) -> SyncResult<()> {
        if location.trim().is_empty() {
            return Err(SyncError::invalid_identity("location is empty"));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the given description marks a rule owned by this identity
    pub fn owns(&self, description: Option<&str>) -> bool {
        description == Some(self.0.as_str())
    }
}

impl fmt::Display for RuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Single-address CIDR for an IPv4 address (e.g., 203.0.113.5/32)
pub fn host_cidr(ip: Ipv4Addr) -> String {
    format!("{}/32", ip)
}

/// One inbound permission entry, flattened to a single IPv4 range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    /// Security group ID (e.g., sg-0123456789abcdef0)
    pub group_id: String,
    /// IP protocol as EC2 reports it (tcp, udp, icmp, -1)
    pub protocol: String,
    pub from_port: i32,
    pub to_port: i32,
    pub cidr: String,
    pub description: Option<String>,
}

impl IngressRule {
    /// Rule allowing `protocol` traffic on a single port from `cidr`
    pub fn single_port(
        group_id: impl Into<String>,
        protocol: impl Into<String>,
        port: u16,
        cidr: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            protocol: protocol.into(),
            from_port: i32::from(port),
            to_port: i32::from(port),
            cidr: cidr.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Human-readable port range ("22", "8000-8080", or "all")
    pub fn port_range(&self) -> String {
        if self.protocol == "-1" {
            "all".to_string()
        } else if self.from_port == self.to_port {
            self.from_port.to_string()
        } else {
            format!("{}-{}", self.from_port, self.to_port)
        }
    }
}

impl fmt::Display for IngressRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.cidr, self.protocol, self.port_range())?;
        if let Some(ref description) = self.description {
            write!(f, " \"{}\"", description)?;
        }
        Ok(())
    }
}

/// Security group with its current inbound rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroup {
    pub group_id: String,
    pub group_name: String,
    pub vpc_id: Option<String>,
    pub ingress: Vec<IngressRule>,
}

impl SecurityGroup {
    pub fn new(group_id: impl Into<String>, group_name: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            group_name: group_name.into(),
            vpc_id: None,
            ingress: Vec::new(),
        }
    }

    pub fn with_ingress(mut self, rule: IngressRule) -> Self {
        self.ingress.push(rule);
        self
    }

    /// Ingress rules tagged with the given identity
    pub fn owned_by<'a>(
        &'a self,
        identity: &'a RuleIdentity,
    ) -> impl Iterator<Item = &'a IngressRule> + 'a {
        self.ingress
            .iter()
            .filter(move |rule| identity.owns(rule.description.as_deref()))
    }
}

/// The rule a synchronization wants present in every target group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRule {
    pub identity: RuleIdentity,
    pub ip: Ipv4Addr,
    pub port: u16,
    pub protocol: String,
}

impl DesiredRule {
    pub fn new(identity: RuleIdentity, ip: Ipv4Addr, port: u16) -> Self {
        Self {
            identity,
            ip,
            port,
            protocol: DEFAULT_PROTOCOL.to_string(),
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn cidr(&self) -> String {
        host_cidr(self.ip)
    }

    /// Concrete ingress rule for a specific group
    pub fn for_group(&self, group_id: &str) -> IngressRule {
        IngressRule::single_port(group_id, self.protocol.as_str(), self.port, self.cidr())
            .with_description(self.identity.as_str())
    }
}
