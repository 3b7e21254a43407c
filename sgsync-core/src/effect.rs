//! Effect - A pending security group mutation, held as a value
//!
//! Nothing happens until an Interpreter executes the Effect.

use std::fmt;

use crate::rule::IngressRule;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Remove a stale ingress rule
    Revoke(IngressRule),
    /// Add an ingress rule
    Authorize(IngressRule),
}

impl Effect {
    pub fn rule(&self) -> &IngressRule {
        match self {
            Effect::Revoke(rule) | Effect::Authorize(rule) => rule,
        }
    }

    pub fn is_authorize(&self) -> bool {
        matches!(self, Effect::Authorize(_))
    }

    /// One-character marker used in plan output
    pub fn symbol(&self) -> &'static str {
        match self {
            Effect::Revoke(_) => "-",
            Effect::Authorize(_) => "+",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Effect::Revoke(_) => "revoke",
            Effect::Authorize(_) => "authorize",
        };
        write!(f, "{} {} {}", self.symbol(), verb, self.rule())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_rule() {
        let rule = IngressRule::single_port("sg-1", "tcp", 22, "203.0.113.5/32")
            .with_description("alice-home");
        let effect = Effect::Authorize(rule.clone());
        assert_eq!(
            effect.to_string(),
            "+ authorize 203.0.113.5/32 tcp/22 \"alice-home\""
        );
        assert_eq!(
            Effect::Revoke(rule).to_string(),
            "- revoke 203.0.113.5/32 tcp/22 \"alice-home\""
        );
    }
}
