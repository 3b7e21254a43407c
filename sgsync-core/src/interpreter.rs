//! Interpreter - Execute Effects using a Provider
//!
//! The Interpreter executes the Effects of a Plan in order and stops at the
//! first failure. This is where side effects actually occur.

use log::{debug, error};

use crate::effect::Effect;
use crate::plan::Plan;
use crate::provider::{ProviderError, ProviderResult, SecurityGroupProvider};

/// Result of executing each Effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectOutcome {
    Revoked,
    Authorized,
    /// Skipped (e.g., dry-run)
    Skipped { reason: String },
}

/// Result of executing the entire Plan
#[derive(Debug)]
pub struct ApplyResult {
    pub outcomes: Vec<EffectOutcome>,
    /// The failure that stopped execution, if any
    pub failure: Option<ProviderError>,
}

impl ApplyResult {
    pub fn into_result(self) -> ProviderResult<Vec<EffectOutcome>> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.outcomes),
        }
    }

    fn revoked_any(&self) -> bool {
        self.outcomes.contains(&EffectOutcome::Revoked)
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
}

/// Interpreter that executes Effects using a Provider
pub struct Interpreter<P: SecurityGroupProvider> {
    provider: P,
    config: InterpreterConfig,
}

impl<P: SecurityGroupProvider> Interpreter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Execute a Plan, interpreting all Effects and causing side effects
    pub async fn apply(&self, plan: &Plan) -> ApplyResult {
        let mut result = ApplyResult {
            outcomes: Vec::new(),
            failure: None,
        };

        for effect in plan.effects() {
            match self.execute_effect(effect).await {
                Ok(outcome) => result.outcomes.push(outcome),
                Err(err) => {
                    // No rollback: a revoke that already went through stays revoked
                    if effect.is_authorize() && result.revoked_any() {
                        error!(
                            "{} ({}) was left without an ingress rule for {}",
                            plan.group_name(),
                            plan.group_id(),
                            effect.rule().description.as_deref().unwrap_or("-")
                        );
                    }
                    result.failure = Some(err.for_group(plan.group_name()));
                    break;
                }
            }
        }

        result
    }

    /// Execute a single Effect
    async fn execute_effect(&self, effect: &Effect) -> ProviderResult<EffectOutcome> {
        if self.config.dry_run {
            return Ok(EffectOutcome::Skipped {
                reason: "dry-run mode".to_string(),
            });
        }

        debug!("{} on {}", effect, effect.rule().group_id);

        match effect {
            Effect::Revoke(rule) => {
                self.provider.revoke_ingress(rule).await?;
                Ok(EffectOutcome::Revoked)
            }
            Effect::Authorize(rule) => {
                self.provider.authorize_ingress(rule).await?;
                Ok(EffectOutcome::Authorized)
            }
        }
    }
}
