//! Legend-driven series visibility.

use std::collections::BTreeSet;

use serde::Serialize;

use super::NormalizedSeries;

/// Aliases currently hidden from the graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct HiddenSeries(BTreeSet<String>);

impl HiddenSeries {
    pub fn is_hidden(&self, alias: &str) -> bool {
        self.0.contains(alias)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Handle a legend click on `alias`.
    ///
    /// With a modifier key (`additive`) only that alias flips. Otherwise
    /// the click is exclusive: show only `alias`, or show everything when
    /// every other series is already hidden.
    pub fn toggle(&mut self, alias: &str, additive: bool, series: &[NormalizedSeries]) {
        if additive {
            if !self.0.remove(alias) {
                self.0.insert(alias.to_string());
            }
            return;
        }

        self.0.remove(alias);

        let already_exclusive = series
            .iter()
            .all(|s| s.alias == alias || self.0.contains(&s.alias));

        if already_exclusive {
            for s in series {
                self.0.remove(&s.alias);
            }
        } else {
            for s in series.iter().filter(|s| s.alias != alias) {
                self.0.insert(s.alias.clone());
            }
        }
    }
}
