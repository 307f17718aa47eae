//! Pluggable worker-matching policy
//!
//! The registry asks a [`MatchPolicy`] to pick a worker for a task's
//! requirements; swapping the policy never touches the registry's control
//! flow. Candidates are always presented idle-only, in registration order.

use crate::agent::AgentHandle;
use crate::task::TaskRequirements;

/// Decides which idle worker should take a task
pub trait MatchPolicy: Send + Sync {
    /// Pick a candidate index, or `None` to leave the task unrouted
    fn select(&self, requirements: &TaskRequirements, candidates: &[AgentHandle]) -> Option<usize>;
}

/// Default policy: role specificity beats general expertise beats
/// arbitrary fallback
///
/// Matching order: (1) exact role match; (2) expertise keyword overlap, in
/// registration order; (3) the first candidate; (4) none. The ordering is
/// part of the routing contract, not an optimization detail.
pub struct KeywordMatchPolicy;

impl MatchPolicy for KeywordMatchPolicy {
    fn select(&self, requirements: &TaskRequirements, candidates: &[AgentHandle]) -> Option<usize> {
        if let Some(role) = &requirements.role {
            if let Some(index) = candidates.iter().position(|a| &a.spec.role == role) {
                return Some(index);
            }
        }

        if !requirements.expertise.is_empty() {
            if let Some(index) = candidates
                .iter()
                .position(|a| expertise_overlap(&requirements.expertise, &a.spec.expertise))
            {
                return Some(index);
            }
        }

        if candidates.is_empty() {
            None
        } else {
            Some(0)
        }
    }
}

/// Case-insensitive substring overlap between requested and owned
/// expertise keywords
pub(crate) fn expertise_overlap(requested: &[String], owned: &[String]) -> bool {
    requested.iter().any(|wanted| {
        let wanted = wanted.to_lowercase();
        owned.iter().any(|have| have.to_lowercase().contains(&wanted))
    })
}
