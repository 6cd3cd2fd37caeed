//! Form state, exclusion masks and the filtered copy of cached charts

use crate::chart::{ChartConfig, ChartData};
use crate::controls::{ControlPanel, InputKind, HISTORY, LAYOUT, SIZE, SOLVER};
use benchviz_common::{BenchVizError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Checked values per control group, as posted by the browser.
///
/// A group missing from the map counts as fully checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    #[serde(default)]
    pub checked: BTreeMap<String, Vec<String>>,
}

impl FormState {
    /// Every option of every group checked, radios at their current choice
    pub fn all_checked(panel: &ControlPanel) -> Self {
        let checked = panel
            .groups
            .iter()
            .map(|group| {
                let values = group
                    .options
                    .iter()
                    .filter(|o| group.kind == InputKind::Checkbox || o.checked)
                    .map(|o| o.value.clone())
                    .collect();
                (group.name.clone(), values)
            })
            .collect();
        Self { checked }
    }

    pub fn is_checked(&self, group: &str, value: &str) -> bool {
        match self.checked.get(group) {
            Some(values) => values.iter().any(|v| v == value),
            None => true,
        }
    }

    /// Uncheck `value` in `group`; the group must already be present
    pub fn uncheck(&mut self, group: &str, value: &str) -> Result<()> {
        let values = self
            .checked
            .get_mut(group)
            .ok_or_else(|| BenchVizError::InvalidForm(format!("unknown group {}", group)))?;
        let before = values.len();
        values.retain(|v| v != value);
        if values.len() == before {
            return Err(BenchVizError::InvalidForm(format!(
                "{} is not a checked value of {}",
                value, group
            )));
        }
        Ok(())
    }

    /// First checked value of `group`, the choice of a radio group
    pub fn selected(&self, group: &str) -> Option<&str> {
        self.checked
            .get(group)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Copy the checked state onto the panel so rendered markup matches it
    pub fn apply_to(&self, panel: &mut ControlPanel) {
        for group in &mut panel.groups {
            let Some(values) = self.checked.get(&group.name) else {
                continue;
            };
            for option in &mut group.options {
                option.checked = values.contains(&option.value);
            }
        }
    }
}

/// Per-group exclusion masks, indexed like the group's options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    excluded: BTreeMap<String, Vec<bool>>,
}

impl FilterState {
    /// Derive masks from `form`, rejecting groups and values the panel lacks
    pub fn from_form(panel: &ControlPanel, form: &FormState) -> Result<Self> {
        for (name, values) in &form.checked {
            let group = panel
                .group(name)
                .ok_or_else(|| BenchVizError::InvalidForm(format!("unknown group {}", name)))?;
            if let Some(value) = values.iter().find(|v| group.position(v).is_none()) {
                return Err(BenchVizError::InvalidForm(format!(
                    "{} is not an option of {}",
                    value, name
                )));
            }
            if group.kind == InputKind::Radio && values.len() > 1 {
                return Err(BenchVizError::ControlMismatch {
                    group: name.clone(),
                    expected: 1,
                    actual: values.len(),
                });
            }
        }

        let excluded: BTreeMap<String, Vec<bool>> = panel
            .groups
            .iter()
            .filter(|group| group.kind == InputKind::Checkbox)
            .map(|group| {
                let mask = group
                    .options
                    .iter()
                    .map(|o| !form.is_checked(&group.name, &o.value))
                    .collect();
                (group.name.clone(), mask)
            })
            .collect();

        debug!("Exclusion masks: {:?}", excluded);
        Ok(Self { excluded })
    }

    /// Whether option `index` of `group` is unchecked
    pub fn excluded(&self, group: &str, index: usize) -> bool {
        self.excluded
            .get(group)
            .and_then(|mask| mask.get(index))
            .copied()
            .unwrap_or(false)
    }

    pub fn excluded_count(&self, group: &str) -> usize {
        self.excluded
            .get(group)
            .map_or(0, |mask| mask.iter().filter(|&&e| e).count())
    }
}

/// Page-specific step run after the generic exclusions
pub trait FilterHook: Send + Sync {
    fn apply(&self, chart: &mut ChartData, panel: &ControlPanel, filter: &FilterState);
}

impl<F> FilterHook for F
where
    F: Fn(&mut ChartData, &ControlPanel, &FilterState) + Send + Sync,
{
    fn apply(&self, chart: &mut ChartData, panel: &ControlPanel, filter: &FilterState) {
        self(chart, panel, filter)
    }
}

/// Drops every test whose label contains an unchecked layout token
#[derive(Debug, Clone, Default)]
pub struct LayoutFilter;

impl FilterHook for LayoutFilter {
    fn apply(&self, chart: &mut ChartData, panel: &ControlPanel, filter: &FilterState) {
        let Some(group) = panel.group(LAYOUT) else {
            return;
        };
        let hidden: Vec<&str> = group
            .options
            .iter()
            .enumerate()
            .filter(|(i, _)| filter.excluded(LAYOUT, *i))
            .map(|(_, o)| o.value.as_str())
            .collect();
        if hidden.is_empty() {
            return;
        }
        chart.retain_tests(|_, label| !hidden.iter().any(|layout| label.contains(layout)));
    }
}

/// Charts last built for a page, and the field they were built for
#[derive(Debug, Clone, Default)]
pub struct GraphCache {
    pub field: String,
    pub configs: Vec<ChartConfig>,
}

impl GraphCache {
    pub fn new<S: Into<String>>(field: S, configs: Vec<ChartConfig>) -> Self {
        Self {
            field: field.into(),
            configs,
        }
    }

    /// Filtered deep copy of the cached charts.
    ///
    /// Excluded sizes go first, then history runs, then every test whose
    /// solver option is unchecked, then `hook`.
    pub fn filtered(
        &self,
        panel: &ControlPanel,
        filter: &FilterState,
        hook: Option<&dyn FilterHook>,
    ) -> Vec<ChartConfig> {
        self.configs
            .iter()
            .enumerate()
            .filter(|(i, _)| !filter.excluded(SIZE, *i))
            .map(|(_, config)| {
                let mut config = config.clone();
                config.data.retain_runs(|run| !filter.excluded(HISTORY, run));
                config.data.retain_tests(|test, _| {
                    panel
                        .solver_of_test
                        .get(test)
                        .map_or(true, |&solver| !filter.excluded(SOLVER, solver))
                });
                if let Some(hook) = hook {
                    hook.apply(&mut config.data, panel, filter);
                }
                config
            })
            .collect()
    }
}
