//! Eviction candidate selection

use std::time::Duration;

/// A release candidate as seen by an eviction filter: an idle, unlocked,
/// releasable slot described by its target identity and the metadata the
/// selection policy runs on.
#[derive(Debug, Clone)]
pub struct ReleaseCandidate<Target> {
    pub target: Target,
    pub name: String,
    pub priority: i32,
    pub last_use: Duration,
}

/// The default selection policy.
///
/// Expired candidates (`last_use` at or before `expire_before`) are always
/// selected, even when `to_release` is zero: an entry past its expiry age
/// has no business staying cached. The fresh remainder is ordered lowest
/// priority first, then least recently used first, and the first
/// `to_release - expired` of it are selected on top.
///
/// Candidates arrive in registration order, which makes full ties (equal
/// priority and equal stamp) resolve oldest-registration-first.
pub fn default_release_filter<Target: Clone>(
    candidates: &[ReleaseCandidate<Target>],
    to_release: usize,
    expire_before: Option<Duration>,
) -> Vec<Target> {
    let mut selected = Vec::new();
    let mut fresh: Vec<&ReleaseCandidate<Target>> = Vec::new();

    for candidate in candidates {
        match expire_before {
            Some(threshold) if candidate.last_use <= threshold => {
                selected.push(candidate.target.clone());
            }
            _ => fresh.push(candidate),
        }
    }

    let remaining = to_release.saturating_sub(selected.len());
    if remaining > 0 {
        fresh.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.last_use.cmp(&b.last_use))
        });
        selected.extend(fresh.iter().take(remaining).map(|c| c.target.clone()));
    }

    selected
}
