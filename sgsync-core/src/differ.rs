//! Differ - Compare a group's current ingress with the desired rule
//!
//! Every rule tagged with the caller's identity is considered stale and is
//! revoked as found; the desired rule is then authorized fresh.

use crate::effect::Effect;
use crate::plan::Plan;
use crate::rule::{DesiredRule, SecurityGroup};

/// Compute the Plan that brings `group` in line with `desired`
pub fn plan_group(group: &SecurityGroup, desired: &DesiredRule) -> Plan {
    let mut plan = Plan::new(group.group_id.as_str(), group.group_name.as_str());

    for stale in group.owned_by(&desired.identity) {
        plan.add(Effect::Revoke(stale.clone()));
    }

    plan.add(Effect::Authorize(desired.for_group(&group.group_id)));
    plan
}
