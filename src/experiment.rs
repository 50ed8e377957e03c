//! Job sets for the study's experiments

use crate::config::{LevelParam, Policy, SimConfig};
use crate::error::ConfigError;
use crate::job::{Job, Layout};
use crate::trace::TraceSet;

pub const POLICY_LABEL: &str = "policy";

/// A swept geometry parameter of one cache level
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sweep {
    pub level: String,
    pub param: LevelParam,
    pub values: Vec<usize>,
}

impl Sweep {
    /// Label under which jobs record the swept value
    pub fn label(&self) -> String {
        format!("{}_{}", self.level, self.param.name())
    }

    pub fn title(&self) -> String {
        format!("{} {}", self.level, self.param.name())
    }
}

/// One job per (policy, trace), ids `{name}-{policy}`
pub fn policy_jobs(
    name: &str,
    base: &SimConfig,
    policies: &[Policy],
    traces: &TraceSet,
    layout: &Layout,
) -> Vec<Job> {
    let mut jobs = Vec::with_capacity(policies.len() * traces.len());
    for trace in traces.iter() {
        for policy in policies {
            jobs.push(
                Job::make(
                    format!("{}-{}", name, policy),
                    base.with_policy(*policy),
                    trace.clone(),
                    layout,
                )
                .with_label(POLICY_LABEL, policy),
            );
        }
    }
    jobs
}

/// One job per (swept value, trace) for a single policy
///
/// Ids are `{name}-{policy}-{level}{param}{value}`, so every point of the
/// sweep is memoized on its own.
pub fn sweep_jobs(
    name: &str,
    base: &SimConfig,
    policy: Policy,
    sweep: &Sweep,
    traces: &TraceSet,
    layout: &Layout,
) -> Result<Vec<Job>, ConfigError> {
    let base = base.with_policy(policy);
    let mut jobs = Vec::with_capacity(sweep.values.len() * traces.len());
    for value in &sweep.values {
        let config = base.with_level_param(&sweep.level, sweep.param, *value)?;
        let job_id = format!(
            "{}-{}-{}{}{}",
            name,
            policy,
            sweep.level,
            sweep.param.name(),
            value
        );
        for trace in traces.iter() {
            jobs.push(
                Job::make(job_id.clone(), config.clone(), trace.clone(), layout)
                    .with_label(POLICY_LABEL, policy)
                    .with_label(sweep.label(), value),
            );
        }
    }
    Ok(jobs)
}
