//! Load-balancing strategies applied across the routes that all matched a
//! request (spec.md §4.7 step 3), grounded in
//! `driftwatch-health`'s [`driftwatch_health::SelectionStrategy`] shape but
//! operating over matched routes rather than health-checked resources —
//! a route carries its own priority/match-count/last-matched stats that the
//! health crate's generic context doesn't model.

use std::time::SystemTime;

use crate::router::CompiledRoute;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadBalanceStrategy {
    /// Return the first match in priority order (the default; no load
    /// balancing).
    #[default]
    FirstMatch,
    /// Select the candidate with the smallest match count so far.
    RoundRobin,
    /// Select the candidate whose `last_matched` is oldest (or never
    /// matched).
    LeastConnections,
    /// Weighted by priority; picks by a time-seeded modulo so repeated
    /// calls within the same instant still distribute across candidates.
    Weighted,
}

impl LoadBalanceStrategy {
    /// `candidates` are indices into the router's route list, already
    /// filtered to enabled, pattern-matching, breaker-closed routes and
    /// sorted by priority descending.
    pub fn select(&self, routes: &[CompiledRoute], candidates: &[usize]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        match self {
            LoadBalanceStrategy::FirstMatch => Some(candidates[0]),
            LoadBalanceStrategy::RoundRobin => candidates
                .iter()
                .copied()
                .min_by_key(|&i| routes[i].route.match_count),
            LoadBalanceStrategy::LeastConnections => candidates
                .iter()
                .copied()
                .min_by_key(|&i| routes[i].route.last_matched.map(|t| t.timestamp_millis()).unwrap_or(i64::MIN)),
            LoadBalanceStrategy::Weighted => {
                let total_weight: i64 = candidates
                    .iter()
                    .map(|&i| routes[i].route.priority.max(1) as i64)
                    .sum();
                if total_weight <= 0 {
                    return Some(candidates[0]);
                }
                let seed = SystemTime::now()
                    .duration_since(SystemTime::UNIX_EPOCH)
                    .map(|d| d.as_nanos() as i64)
                    .unwrap_or(0);
                let mut ticket = seed.rem_euclid(total_weight);
                for &i in candidates {
                    let weight = routes[i].route.priority.max(1) as i64;
                    if ticket < weight {
                        return Some(i);
                    }
                    ticket -= weight;
                }
                candidates.last().copied()
            }
        }
    }
}
