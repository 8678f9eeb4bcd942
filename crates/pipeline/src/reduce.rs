//! Latest-value reduction of a multi-year series.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::model::{CountryCode, IndicatorObservation, ReducedIndicator};

/// Collapse `observations` to the latest non-null value per code.
///
/// A known year always beats an unknown one. Among observations sharing the
/// winning year, the first in input order is kept. Output is sorted by code.
pub fn reduce_latest(observations: &[IndicatorObservation]) -> Vec<ReducedIndicator> {
    let mut latest: BTreeMap<&CountryCode, (f64, Option<i32>)> = BTreeMap::new();

    for obs in observations {
        let Some(value) = obs.value.filter(|v| !v.is_nan()) else {
            continue;
        };
        match latest.entry(&obs.code) {
            Entry::Vacant(slot) => {
                slot.insert((value, obs.year));
            }
            // `None < Some(_)`, and strict `>` keeps the earlier of a tie
            Entry::Occupied(mut slot) => {
                if obs.year > slot.get().1 {
                    slot.insert((value, obs.year));
                }
            }
        }
    }

    latest
        .into_iter()
        .map(|(code, (value, observed_year))| ReducedIndicator {
            code: code.clone(),
            value,
            observed_year,
        })
        .collect()
}
