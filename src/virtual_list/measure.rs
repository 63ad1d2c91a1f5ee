// session_feed - Virtualized terminal viewer for recorded AI-assistant sessions
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Measurement feedback loop.
//!
//! Providers observe mounted rows and report their rendered size through a
//! [`MeasurementSink`]. [`MeasureLoop`] keeps the observed set equal to the
//! render window and pumps queued reports into the list as one batch per
//! frame, which keeps window recomputation to once per frame.

use super::VirtualList;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement<K> {
    pub key: K,
    pub height: u32,
}

/// Where providers send measured sizes.
#[derive(Debug)]
pub struct MeasurementSink<K> {
    tx: mpsc::UnboundedSender<Measurement<K>>,
}

impl<K> Clone for MeasurementSink<K> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<K> MeasurementSink<K> {
    /// Queue a measurement. Returns `false` once the loop is gone.
    pub fn report(&self, key: K, height: u32) -> bool {
        self.tx.send(Measurement { key, height }).is_ok()
    }
}

/// Source of rendered row sizes, e.g. a size observer or a polling fallback.
pub trait MeasurementProvider<K> {
    fn observe(&mut self, key: K, sink: MeasurementSink<K>);
    fn unobserve(&mut self, key: &K);
}

#[derive(Debug)]
pub struct MeasureLoop<K> {
    tx: mpsc::UnboundedSender<Measurement<K>>,
    rx: mpsc::UnboundedReceiver<Measurement<K>>,
    observed: HashSet<K>,
}

impl<K: Eq + Hash + Clone> Default for MeasureLoop<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> MeasureLoop<K> {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx, observed: HashSet::new() }
    }

    #[must_use]
    pub fn sink(&self) -> MeasurementSink<K> {
        MeasurementSink { tx: self.tx.clone() }
    }

    #[must_use]
    pub fn observed_count(&self) -> usize {
        self.observed.len()
    }

    /// Observe rows that entered the render window and stop observing those
    /// that left it.
    pub fn sync_observed<T>(
        &mut self,
        list: &VirtualList<T, K>,
        provider: &mut impl MeasurementProvider<K>,
    ) {
        let mounted: HashSet<K> = list
            .render_window()
            .map(|w| w.indices().filter_map(|i| list.key_of(i).cloned()).collect())
            .unwrap_or_default();
        let stale: Vec<K> = self.observed.difference(&mounted).cloned().collect();
        for key in stale {
            provider.unobserve(&key);
            self.observed.remove(&key);
        }
        for key in mounted {
            if !self.observed.contains(&key) {
                provider.observe(key.clone(), self.sink());
                self.observed.insert(key);
            }
        }
    }

    /// Apply every queued measurement. Returns how many rows changed height.
    pub fn pump<T>(&mut self, list: &mut VirtualList<T, K>) -> usize {
        let batch: Vec<(K, u32)> =
            std::iter::from_fn(|| self.rx.try_recv().ok()).map(|m| (m.key, m.height)).collect();
        if batch.is_empty() {
            return 0;
        }
        list.apply_measurements(batch)
    }

    /// Unobserve everything, e.g. before a list swap.
    pub fn reset(&mut self, provider: &mut impl MeasurementProvider<K>) {
        for key in self.observed.drain() {
            provider.unobserve(&key);
        }
        while self.rx.try_recv().is_ok() {}
    }
}

/// Polling fallback: re-measures every observed row on [`PollingProvider::poll`]
/// and reports only heights that changed since the last report.
#[derive(Debug)]
pub struct PollingProvider<K> {
    observed: HashMap<K, (MeasurementSink<K>, Option<u32>)>,
}

impl<K: Eq + Hash + Clone> Default for PollingProvider<K> {
    fn default() -> Self {
        Self { observed: HashMap::new() }
    }
}

impl<K: Eq + Hash + Clone> PollingProvider<K> {
    /// Measure all observed rows. `measure` returns `None` when a row cannot
    /// be measured yet (e.g. its content has not loaded). Returns the number
    /// of reports sent.
    pub fn poll(&mut self, mut measure: impl FnMut(&K) -> Option<u32>) -> usize {
        let mut reported = 0;
        for (key, (sink, last)) in &mut self.observed {
            let Some(height) = measure(key) else {
                continue;
            };
            if *last != Some(height) && sink.report(key.clone(), height) {
                *last = Some(height);
                reported += 1;
            }
        }
        reported
    }

    /// Forget reported heights so the next poll reports everything again,
    /// e.g. after a width change.
    pub fn invalidate(&mut self) {
        for (_, last) in self.observed.values_mut() {
            *last = None;
        }
    }

    #[must_use]
    pub fn is_observing(&self, key: &K) -> bool {
        self.observed.contains_key(key)
    }
}

impl<K: Eq + Hash + Clone> MeasurementProvider<K> for PollingProvider<K> {
    fn observe(&mut self, key: K, sink: MeasurementSink<K>) {
        self.observed.insert(key, (sink, None));
    }

    fn unobserve(&mut self, key: &K) {
        self.observed.remove(key);
    }
}
