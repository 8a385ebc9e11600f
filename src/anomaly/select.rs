//! Anomaly selection: merge the marker sets, cap the output and balance
//! across categories so no single kind crowds out the rest.

use tracing::debug;

use super::score::ScoreSet;
use super::spike::SpikeInfo;
use super::streak::StreakInfo;
use crate::core::{AnomalyCategory, AnomalyDirection};

/// Configuration for the selector.
#[derive(Debug, Clone, Copy)]
pub struct SelectorConfig {
    /// Hard cap on reported anomalies.
    pub max_output: usize,
    /// Share of the capped output reserved for spikes (min 1 slot when
    /// any spike candidate exists).
    pub spike_share: f64,
    /// Weight of the continuity score in the ranking boost.
    pub streak_weight: f64,
    /// Continuity score above which a streak member is a candidate even
    /// without its own marker.
    pub streak_gate: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_output: 20,
            spike_share: 0.3,
            streak_weight: 1.5,
            streak_gate: 0.5,
        }
    }
}

/// One selected anomaly, by point index.
#[derive(Debug, Clone, Copy)]
pub struct SelectedAnomaly {
    pub index: usize,
    pub category: AnomalyCategory,
}

/// Merge, cap and balance the anomaly candidates.
///
/// Below the cap, candidates come back in time order. Above it, each
/// category is ranked separately (boosted combined score for rising and
/// falling, prominence for spikes) and the output is concatenated
/// rising, falling, spike.
pub fn select_anomalies(
    scores: &[ScoreSet],
    markers: &[bool],
    streaks: &[StreakInfo],
    spikes: &[SpikeInfo],
    config: &SelectorConfig,
) -> Vec<SelectedAnomaly> {
    let n = scores.len();
    let candidates: Vec<usize> = (0..n)
        .filter(|&i| {
            markers[i] || streaks[i].consecutive_score > config.streak_gate || spikes[i].is_spike
        })
        .collect();

    let categorize = |i: usize| {
        if spikes[i].is_spike {
            AnomalyCategory::Spike
        } else if scores[i].direction == AnomalyDirection::Down {
            AnomalyCategory::Falling
        } else {
            AnomalyCategory::Rising
        }
    };

    if candidates.len() <= config.max_output {
        return candidates
            .into_iter()
            .map(|index| SelectedAnomaly {
                index,
                category: categorize(index),
            })
            .collect();
    }

    let boosted = |i: usize| scores[i].combined + config.streak_weight * streaks[i].consecutive_score;

    let mut rising: Vec<usize> = Vec::new();
    let mut falling: Vec<usize> = Vec::new();
    let mut spiking: Vec<usize> = Vec::new();
    for &i in &candidates {
        match categorize(i) {
            AnomalyCategory::Spike => spiking.push(i),
            AnomalyCategory::Falling => falling.push(i),
            AnomalyCategory::Rising => rising.push(i),
        }
    }
    rising.sort_by(|&a, &b| {
        boosted(b)
            .partial_cmp(&boosted(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    falling.sort_by(|&a, &b| {
        boosted(b)
            .partial_cmp(&boosted(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    spiking.sort_by(|&a, &b| {
        spikes[b]
            .prominence
            .partial_cmp(&spikes[a].prominence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let total_slots = config.max_output;
    let spike_slots = if spiking.is_empty() {
        0
    } else {
        spiking
            .len()
            .min(((total_slots as f64 * config.spike_share) as usize).max(1))
    };

    let remaining = total_slots - spike_slots;
    let (up_slots, down_slots) = if !rising.is_empty() && !falling.is_empty() {
        let up_prop = rising.len() as f64 / (rising.len() + falling.len()) as f64;
        let up = rising.len().min(((remaining as f64 * up_prop) as usize).max(1));
        (up, falling.len().min(remaining - up))
    } else if !rising.is_empty() {
        (rising.len().min(remaining), 0)
    } else if !falling.is_empty() {
        (0, falling.len().min(remaining))
    } else {
        (0, 0)
    };

    debug!(
        candidates = candidates.len(),
        up_slots, down_slots, spike_slots, "balanced anomaly selection"
    );

    let mut selected = Vec::with_capacity(up_slots + down_slots + spike_slots);
    for &i in rising.iter().take(up_slots) {
        selected.push(SelectedAnomaly {
            index: i,
            category: AnomalyCategory::Rising,
        });
    }
    for &i in falling.iter().take(down_slots) {
        selected.push(SelectedAnomaly {
            index: i,
            category: AnomalyCategory::Falling,
        });
    }
    for &i in spiking.iter().take(spike_slots) {
        selected.push(SelectedAnomaly {
            index: i,
            category: AnomalyCategory::Spike,
        });
    }
    selected
}
