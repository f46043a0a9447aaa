//! Seasonal baseline selection
//!
//! Picks the historical dates that characterise normal variation at the
//! time of year of the change interval, and resolves the proxy observations
//! that stand in for the start and end dates.

use crate::error::{DetectError, Result};
use crate::seasonal::{DateTag, SeasonalWindow};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Minimum number of baseline samples a run needs
pub const MIN_BASELINE: usize = 2;

/// Parameters for baseline selection
#[derive(Debug, Clone)]
pub struct SelectorParams {
    pub window: SeasonalWindow,
    /// Calendar years counted back from the end date, inclusive of it
    pub lookback_years: u32,
    /// Maximum day distance for start/end proxy resolution; `None` is unlimited
    pub date_tolerance_days: Option<u32>,
}

/// Indices into the candidate slice chosen by [`select_baseline`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineSelection {
    /// Baseline samples in date order
    pub baseline: Vec<usize>,
    /// Observation standing in for the start date
    pub start: usize,
    /// Observation standing in for the end date
    pub end: usize,
    /// Set when one-per-year selection left too few samples
    pub fell_back: bool,
}

/// Choose the seasonal baseline and the effective start/end observations.
///
/// Candidates are filtered to the lookback years, to dates on or before the
/// start date, and to the seasonal window. Within each year the date whose
/// month-day lies closest to the window end is kept, the earliest winning
/// ties. When that leaves fewer than [`MIN_BASELINE`] samples, every
/// in-window candidate on or before the start date is used instead.
///
/// # Arguments
/// * `dates` - Candidate acquisition dates, in any order
/// * `start` - Start date of the change interval
/// * `end` - End date of the change interval
/// * `params` - Window, lookback and tolerance
///
/// # Returns
/// Indices into `dates`
pub fn select_baseline(
    dates: &[DateTag],
    start: DateTag,
    end: DateTag,
    params: &SelectorParams,
) -> Result<BaselineSelection> {
    if params.lookback_years == 0 {
        return Err(DetectError::InvalidConfig("lookback_years must be at least 1".into()));
    }
    let window = params.window;
    let span = i32::try_from(params.lookback_years - 1).unwrap_or(i32::MAX);
    let first_year = end.year().saturating_sub(span);

    let ordered = date_order(dates);
    let seasonal: Vec<usize> = ordered
        .iter()
        .copied()
        .filter(|&i| dates[i] <= start && window.contains_date(dates[i]))
        .collect();

    let mut per_year: BTreeMap<i32, usize> = BTreeMap::new();
    for &i in seasonal
        .iter()
        .filter(|&&i| (first_year..=end.year()).contains(&dates[i].year()))
    {
        let dist = dates[i].month_day().distance(&window.end);
        per_year
            .entry(dates[i].year())
            .and_modify(|best| {
                if dist < dates[*best].month_day().distance(&window.end) {
                    *best = i;
                }
            })
            .or_insert(i);
    }
    for (year, &i) in &per_year {
        debug!(year, date = %dates[i], "baseline pick for year");
    }

    let mut baseline: Vec<usize> = per_year.into_values().collect();
    let mut fell_back = false;
    if baseline.len() < MIN_BASELINE {
        fell_back = true;
        warn!(
            per_year = baseline.len(),
            in_window = seasonal.len(),
            %window,
            "too few per-year baseline dates, using every in-window candidate"
        );
        baseline = seasonal;
    }
    if baseline.len() < MIN_BASELINE {
        return Err(DetectError::InsufficientBaseline {
            found: baseline.len(),
            required: MIN_BASELINE,
        });
    }
    baseline.sort_by_key(|&i| (dates[i], i));

    let start_idx = nearest_observation(dates, start, &window, params.date_tolerance_days)?;
    let end_idx = nearest_observation(dates, end, &window, params.date_tolerance_days)?;

    Ok(BaselineSelection {
        baseline,
        start: start_idx,
        end: end_idx,
        fell_back,
    })
}

/// Observation to use for `target`.
///
/// An exact date match wins; otherwise the in-window candidate nearest in
/// days, otherwise the nearest candidate overall. Ties go to the earlier
/// date.
pub fn nearest_observation(
    dates: &[DateTag],
    target: DateTag,
    window: &SeasonalWindow,
    tolerance_days: Option<u32>,
) -> Result<usize> {
    let ordered = date_order(dates);
    if let Some(&exact) = ordered.iter().find(|&&i| dates[i] == target) {
        return Ok(exact);
    }

    let in_window = ordered.iter().copied().filter(|&i| window.contains_date(dates[i]));
    let chosen = nearest_in(dates, target, in_window)
        .or_else(|| nearest_in(dates, target, ordered.iter().copied()));

    let Some(idx) = chosen else {
        return Err(DetectError::DateResolution {
            target,
            reason: "no candidate observations".into(),
        });
    };

    let gap = dates[idx].days_between(&target);
    if let Some(tol) = tolerance_days {
        if gap > tol as i64 {
            return Err(DetectError::DateResolution {
                target,
                reason: format!(
                    "nearest candidate {} is {gap} days away (tolerance {tol})",
                    dates[idx]
                ),
            });
        }
    }
    warn!(
        %target,
        used = %dates[idx],
        gap,
        "no exact proxy match, using nearest observation"
    );
    Ok(idx)
}

fn nearest_in(
    dates: &[DateTag],
    target: DateTag,
    pool: impl Iterator<Item = usize>,
) -> Option<usize> {
    pool.min_by_key(|&i| dates[i].days_between(&target))
}

fn date_order(dates: &[DateTag]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..dates.len()).collect();
    order.sort_by_key(|&i| (dates[i], i));
    order
}
