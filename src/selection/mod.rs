//! Numeric-key chart selection and size adjustment.
//!
//! Several charts may share a key. Repeated presses walk through them in
//! load order and wrap around; pressing a key whose pool does not contain
//! the active chart always starts from the first member.

use std::collections::HashMap;

use log::{debug, info};

use crate::{
    charts::{ChartId, ChartRegistry},
    notify::{KioskEvent, Notifier},
    scale::{step_size, DerivedScale},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub active_chart: Option<ChartId>,
    /// Pool position last chosen for each digit.
    pub last_key_index: HashMap<u8, usize>,
}

#[derive(Debug, Default)]
pub struct SelectionController {
    state: SelectionState,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn active(&self) -> Option<ChartId> {
        self.state.active_chart
    }

    /// Shows `id` without going through a key, used for the startup chart.
    pub fn activate(
        &mut self,
        id: ChartId,
        registry: &ChartRegistry,
        notifier: &dyn Notifier,
    ) -> Option<ChartId> {
        let chart = registry.get(id)?;
        self.state.active_chart = Some(id);
        notifier.notify(&KioskEvent::chart_activated(chart));
        Some(id)
    }

    pub fn on_numeric_key(
        &mut self,
        digit: u8,
        registry: &ChartRegistry,
        notifier: &dyn Notifier,
    ) -> Option<ChartId> {
        let pool = registry.pool_for_key(digit);
        if pool.is_empty() {
            debug!("No chart on key {digit}");
            return None;
        }

        let position = if pool.len() == 1 {
            0
        } else {
            // Charts are matched by name, the same chart may appear in
            // several groups.
            let active_name = self
                .state
                .active_chart
                .and_then(|id| registry.get(id))
                .map(|chart| chart.display_name.as_str());

            active_name
                .and_then(|name| {
                    pool.iter().position(|id| {
                        registry
                            .get(*id)
                            .is_some_and(|chart| chart.display_name == name)
                    })
                })
                .filter(|found| found + 1 < pool.len())
                .map_or(0, |found| found + 1)
        };

        self.state.last_key_index.insert(digit, position);
        self.activate(pool[position], registry, notifier)
    }

    /// Steps the active font chart's size by `delta` steps. A size-locked
    /// chart carries the new size to every locked font chart on its key.
    pub fn on_size_change(
        &mut self,
        delta: i32,
        registry: &mut ChartRegistry,
        notifier: &dyn Notifier,
    ) -> Option<f64> {
        let active = registry.get_mut(self.state.active_chart?)?;
        if !active.kind.is_font() {
            return None;
        }

        active.current_size_px = step_size(active.current_size_px, delta);
        let (active_id, size, locked, key) = (
            active.id,
            active.current_size_px,
            active.size_locked,
            active.num_key,
        );
        notifier.notify(&KioskEvent::size_changed(active));

        if locked {
            for chart in registry.iter_mut() {
                if chart.id != active_id
                    && chart.kind.is_font()
                    && chart.size_locked
                    && chart.num_key == key
                {
                    chart.current_size_px = size;
                    debug!("Size lock carried {size:.2}px to '{}'", chart.display_name);
                }
            }
        }

        Some(size)
    }

    /// Returns every chart to its start size.
    pub fn reset_sizes(
        &mut self,
        registry: &mut ChartRegistry,
        scale: &DerivedScale,
        notifier: &dyn Notifier,
    ) {
        info!("Resetting chart sizes");
        registry.reset_sizes(scale);
        if let Some(active) = self.state.active_chart.and_then(|id| registry.get(id)) {
            if active.kind.is_font() {
                notifier.notify(&KioskEvent::size_changed(active));
            }
        }
    }
}
