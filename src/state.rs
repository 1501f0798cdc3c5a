use std::path::PathBuf;

use crate::config::Config;
use crate::data::loader::DatasetCache;
use crate::pipeline::{Evaluation, Gallery, ParamSpec, ParamValue, Params};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Chart,
    Data,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub gallery: Gallery,

    /// Id of the challenge shown in the central panel.
    pub selected: String,

    /// Parameter values as edited in the side panel.
    pub params: Params,

    /// Latest successful evaluation of `selected` with `params`.
    pub evaluation: Option<Evaluation>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    pub tab: Tab,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self::with_gallery(Gallery::new(
            DatasetCache::new(&config.data_dir),
            config.memo_capacity,
        ))
    }

    pub fn with_gallery(gallery: Gallery) -> Self {
        let first = gallery
            .pipelines()
            .first()
            .map(|p| p.id().to_string())
            .unwrap_or_default();
        let mut state = AppState {
            gallery,
            selected: String::new(),
            params: Params::new(),
            evaluation: None,
            status_message: None,
            tab: Tab::Chart,
        };
        state.select(&first);
        state
    }

    /// Declared parameters of the selected challenge.
    pub fn param_specs(&self) -> Vec<ParamSpec> {
        self.gallery
            .pipeline(&self.selected)
            .map(|p| p.params())
            .unwrap_or_default()
    }

    /// Current value of a parameter, falling back to its default.
    pub fn param_value(&self, spec: &ParamSpec) -> ParamValue {
        self.params
            .get(spec.name)
            .cloned()
            .unwrap_or_else(|| spec.default.clone())
    }

    /// Switch challenge; parameters start from the new challenge's defaults.
    pub fn select(&mut self, id: &str) {
        if self.selected == id && self.evaluation.is_some() {
            return;
        }
        self.selected = id.to_string();
        self.params = Params::defaults(&self.param_specs());
        self.on_params_changed();
    }

    pub fn set_param(&mut self, name: &str, value: ParamValue) {
        self.params.set(name, value);
        self.on_params_changed();
    }

    /// Re-evaluate the selected challenge; memoized results come back at once.
    pub fn on_params_changed(&mut self) {
        if let Ok(true) = self.gallery.is_memoized(&self.selected, &self.params) {
            log::debug!("{}: reusing memoized result", self.selected);
        }
        match self.gallery.evaluate(&self.selected, &self.params) {
            Ok(evaluation) => {
                self.evaluation = Some(evaluation);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("{}: {e}", self.selected);
                self.evaluation = None;
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Point the viewer at another data folder and recompute.
    pub fn set_data_dir(&mut self, dir: PathBuf) {
        self.gallery.set_datasets(DatasetCache::new(dir));
        self.on_params_changed();
    }

    /// Reread the selected challenge's dataset, then recompute.
    pub fn reload_selected(&mut self) {
        match self.gallery.reload_dataset(&self.selected) {
            Ok(dropped) => log::info!("{}: dataset reload (cached: {dropped})", self.selected),
            Err(e) => log::warn!("{}: {e}", self.selected),
        }
        self.on_params_changed();
    }

    /// Drop every cached dataset and evaluation, then recompute.
    pub fn reload(&mut self) {
        self.gallery.clear();
        self.on_params_changed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::SUPERSTORE;
    use crate::pipeline::test_support::three_orders;

    fn state() -> AppState {
        let mut gallery = Gallery::new(DatasetCache::new("/nonexistent"), 8);
        gallery.seed_dataset(&SUPERSTORE, three_orders());
        AppState::with_gallery(gallery)
    }

    #[test]
    fn missing_dataset_is_reported_not_fatal() {
        let state = state();
        assert_eq!(state.selected, "2018w01");
        assert!(state.evaluation.is_none());
        assert!(state.status_message.as_deref().is_some_and(|m| m.starts_with("Error")));
    }

    #[test]
    fn selecting_starts_from_defaults() {
        let mut state = state();
        state.select("2018w02");
        assert!(state.status_message.is_none());
        assert_eq!(state.params.int("start_month").unwrap(), 1);
        assert!(state.evaluation.is_some());

        state.set_param("start_month", ParamValue::Int(4));
        let evaluation = state.evaluation.as_ref().unwrap();
        assert_eq!(evaluation.params.int("start_month").unwrap(), 4);
    }

    #[test]
    fn invalid_value_keeps_the_message() {
        let mut state = state();
        state.select("2018w02");
        state.set_param("start_month", ParamValue::Int(13));
        assert!(state.evaluation.is_none());
        assert!(state.status_message.as_deref().unwrap().contains("start_month"));
    }
}
