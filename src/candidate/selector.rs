use super::Candidate;
use crate::error::{Result, SelectionError};
use std::cmp::Ordering;
use std::path::Path;

/// Interactive fallback used when the selection policy cannot decide.
#[allow(async_fn_in_trait)]
pub trait Chooser {
    /// Pick one of `candidates`, returning its index.
    async fn choose(&mut self, candidates: &[Candidate]) -> Result<usize>;
}

/// Order candidates with versioned files first, highest version first.
///
/// Unversioned candidates keep their relative input order.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| match (&a.version, &b.version) {
        (Some(va), Some(vb)) => vb.cmp(va),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Pick exactly one candidate.
///
/// 1. no candidates is an error
/// 2. a single candidate is taken without prompting
/// 3. a candidate whose version text equals `target` is taken
/// 4. an unmatched `target` is reported and falls through
/// 5. otherwise the chooser decides over the sorted list
pub async fn select<C: Chooser>(
    mut candidates: Vec<Candidate>,
    directory: &Path,
    extension: &str,
    target: Option<&str>,
    chooser: &mut C,
) -> Result<Candidate> {
    if candidates.is_empty() {
        return Err(SelectionError::NoCandidates {
            directory: directory.to_path_buf(),
            extension: extension.to_string(),
        }
        .into());
    }

    sort_candidates(&mut candidates);

    if candidates.len() == 1 {
        let only = candidates.remove(0);
        log::info!("Only one file found, auto-selecting: {}", only.name);
        return Ok(only);
    }

    if let Some(target) = target.map(str::trim).filter(|t| !t.is_empty()) {
        if let Some(index) = candidates
            .iter()
            .position(|c| c.version.as_ref().is_some_and(|v| v.raw == target))
        {
            let matched = candidates.remove(index);
            log::info!("Auto-selecting version {}: {}", target, matched.name);
            return Ok(matched);
        }

        let available: Vec<&str> = candidates.iter().map(Candidate::version_label).collect();
        log::warn!("Requested version {} not found in downloaded files", target);
        log::warn!("Available versions: {}", available.join(", "));
        log::info!("Falling back to interactive selection");
    }

    let index = chooser.choose(&candidates).await?;
    if index >= candidates.len() {
        return Err(SelectionError::Cancelled.into());
    }
    Ok(candidates.swap_remove(index))
}
