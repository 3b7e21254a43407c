//! Plan - Collection of Effects for one security group
//!
//! A Plan is an ordered list of Effects to be executed.
//! No side effects occur until the Plan is applied.

use crate::effect::Effect;

/// Plan containing Effects to be executed against a single group
#[derive(Debug, Clone, Default)]
pub struct Plan {
    group_id: String,
    group_name: String,
    effects: Vec<Effect>,
}

impl Plan {
    pub fn new(group_id: impl Into<String>, group_name: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            group_name: group_name.into(),
            effects: Vec::new(),
        }
    }

    pub fn add(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    /// Generate a summary of the Plan for display
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for effect in &self.effects {
            match effect {
                Effect::Revoke(_) => summary.revoke += 1,
                Effect::Authorize(_) => summary.authorize += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlanSummary {
    pub authorize: usize,
    pub revoke: usize,
}

impl std::ops::AddAssign for PlanSummary {
    fn add_assign(&mut self, other: Self) {
        self.authorize += other.authorize;
        self.revoke += other.revoke;
    }
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Plan: {} to authorize, {} to revoke",
            self.authorize, self.revoke
        )
    }
}
