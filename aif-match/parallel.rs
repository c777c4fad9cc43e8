use std::sync::Arc;

use aif_core::{run_indexed, ParallelOptions, Results};

use crate::error::MatchResult;
use crate::matcher::{MatchOutcome, ResultMatcher};

/// Match `query` against every matcher, one task per slot.
///
/// Output slot `i` belongs to `matchers[i]`; empty slots keep
/// [`MatchOutcome::default`]. The first incompatible-descriptor error is
/// returned; failed estimations only leave their slot unregistered.
pub fn parallel_match(
    matchers: &[Option<Arc<ResultMatcher>>],
    query: &Results,
    options: &ParallelOptions,
) -> MatchResult<Vec<MatchOutcome>> {
    let slots = run_indexed(matchers.len(), options, |i| match &matchers[i] {
        Some(matcher) => matcher.match_results(query),
        None => Ok(MatchOutcome::default()),
    })?;
    let outcomes = slots.into_iter().collect::<MatchResult<Vec<_>>>()?;
    log::debug!(
        "parallel match: {} of {} references registered",
        outcomes.iter().filter(|o| o.is_registered()).count(),
        outcomes.len()
    );
    Ok(outcomes)
}
