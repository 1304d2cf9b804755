// FrequencyFilter - early rejection of irrelevant peaks
//
// Peaks outside every loaded profile's tone bands can never contribute to a
// match, so they are dropped before event generation. Pure and stateless:
// the range union is computed once at construction.

use crate::analysis::spectral::Peak;
use crate::profile::{AlarmProfile, Range};

/// Retains only peaks that fall inside at least one profile's tone band.
#[derive(Debug, Clone)]
pub struct FrequencyFilter {
    ranges: Vec<Range>,
}

impl FrequencyFilter {
    /// Build the union of tone frequency ranges across all profiles.
    pub fn new(profiles: &[AlarmProfile]) -> Self {
        let ranges: Vec<Range> = profiles
            .iter()
            .flat_map(|profile| profile.tone_segments().map(|(frequency, _)| *frequency))
            .collect();

        log::debug!("Frequency filter built from {} tone range(s)", ranges.len());

        Self { ranges }
    }

    /// True when some profile's tone band contains `frequency`.
    pub fn is_relevant(&self, frequency: f64) -> bool {
        self.ranges.iter().any(|range| range.contains(frequency))
    }

    /// Keep only peaks inside at least one tone band.
    pub fn filter_peaks(&self, peaks: Vec<Peak>) -> Vec<Peak> {
        peaks
            .into_iter()
            .filter(|peak| self.is_relevant(peak.frequency))
            .collect()
    }
}
