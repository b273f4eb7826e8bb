//! Per-frame activity histograms.
//!
//! Each frame tallies the hue of every file touched in that frame into
//! a [`ColorBins`] multiset, finalized with a sorted key list for
//! deterministic rendering order. Finalized bins are appended to a
//! bounded trailing window; a second bounded window records the
//! alive-person count per frame. Rendering consumes both windows
//! read-only.

use std::collections::{BTreeMap, VecDeque};

use churn_types::Rgb;

/// Default number of color-bin frames retained (one pixel column each).
pub const DEFAULT_BIN_WINDOW: usize = 320;

/// Default number of person-count samples retained.
pub const DEFAULT_PEOPLE_WINDOW: usize = 200;

/// The color tally for a single frame.
#[derive(Debug, Clone, Default)]
pub struct ColorBins {
    counts: BTreeMap<Rgb, u32>,
    keys: Vec<Rgb>,
    total: u32,
}

impl ColorBins {
    /// Create an empty tally for a new frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally one file touch of the given hue.
    pub fn add(&mut self, hue: Rgb) {
        let count = self.counts.entry(hue).or_insert(0);
        *count = count.saturating_add(1);
        self.total = self.total.saturating_add(1);
    }

    /// Finalize the bin at frame end: fix the sorted key list.
    ///
    /// The backing map already iterates in hue order, so this just
    /// materializes the keys. The bin must not be mutated afterwards.
    pub fn finalize(&mut self) {
        self.keys = self.counts.keys().copied().collect();
    }

    /// Number of touches recorded for a hue.
    pub fn count(&self, hue: Rgb) -> u32 {
        self.counts.get(&hue).copied().unwrap_or(0)
    }

    /// The sorted hue list fixed by `finalize`.
    pub fn keys(&self) -> &[Rgb] {
        &self.keys
    }

    /// Total touches across all hues this frame.
    pub const fn total(&self) -> u32 {
        self.total
    }
}

/// Bounded trailing windows of per-frame activity.
#[derive(Debug)]
pub struct ActivityHistogram {
    bins: VecDeque<ColorBins>,
    people: VecDeque<usize>,
    bin_capacity: usize,
    people_capacity: usize,
}

impl ActivityHistogram {
    /// Create histogram windows with the given capacities.
    pub const fn new(bin_capacity: usize, people_capacity: usize) -> Self {
        Self {
            bins: VecDeque::new(),
            people: VecDeque::new(),
            bin_capacity,
            people_capacity,
        }
    }

    /// Append a finalized frame bin, evicting the oldest beyond capacity.
    pub fn push_bins(&mut self, bins: ColorBins) {
        self.bins.push_back(bins);
        while self.bins.len() > self.bin_capacity {
            let _ = self.bins.pop_front();
        }
    }

    /// Append one alive-person-count sample, evicting the oldest
    /// beyond capacity.
    pub fn push_people(&mut self, alive_people: usize) {
        self.people.push_back(alive_people);
        while self.people.len() > self.people_capacity {
            let _ = self.people.pop_front();
        }
    }

    /// The retained color-bin frames, oldest first.
    pub const fn bins(&self) -> &VecDeque<ColorBins> {
        &self.bins
    }

    /// The retained person-count samples, oldest first.
    pub const fn people(&self) -> &VecDeque<usize> {
        &self.people
    }
}

impl Default for ActivityHistogram {
    fn default() -> Self {
        Self::new(DEFAULT_BIN_WINDOW, DEFAULT_PEOPLE_WINDOW)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn add_tallies_per_hue_and_total() {
        let mut bins = ColorBins::new();
        bins.add(Rgb::new(255, 0, 0));
        bins.add(Rgb::new(255, 0, 0));
        bins.add(Rgb::new(0, 0, 255));
        assert_eq!(bins.count(Rgb::new(255, 0, 0)), 2);
        assert_eq!(bins.count(Rgb::new(0, 0, 255)), 1);
        assert_eq!(bins.total(), 3);
    }

    #[test]
    fn finalize_sorts_keys() {
        let mut bins = ColorBins::new();
        bins.add(Rgb::new(200, 0, 0));
        bins.add(Rgb::new(10, 0, 0));
        bins.add(Rgb::new(100, 0, 0));
        bins.finalize();
        assert_eq!(
            bins.keys(),
            &[Rgb::new(10, 0, 0), Rgb::new(100, 0, 0), Rgb::new(200, 0, 0)]
        );
    }

    #[test]
    fn bin_window_evicts_oldest() {
        let mut histogram = ActivityHistogram::new(2, 2);
        for i in 0..3_u32 {
            let mut bins = ColorBins::new();
            #[allow(clippy::cast_possible_truncation)]
            bins.add(Rgb::new(i as u8, 0, 0));
            bins.finalize();
            histogram.push_bins(bins);
        }
        assert_eq!(histogram.bins().len(), 2);
        // The frame tallying hue 0 was evicted.
        let front = histogram.bins().front().unwrap();
        assert_eq!(front.count(Rgb::new(1, 0, 0)), 1);
    }

    #[test]
    fn people_window_evicts_oldest() {
        let mut histogram = ActivityHistogram::new(8, 3);
        for n in [5_usize, 6, 7, 8] {
            histogram.push_people(n);
        }
        assert_eq!(histogram.people().iter().copied().collect::<Vec<_>>(), vec![6, 7, 8]);
    }
}
