//! Hover and selection tracking for country features.
//!
//! The machine owns the transient [`SelectionState`] while the feature flags
//! live in the [`FeatureStore`]. Every transition updates the flags before
//! any side effect runs, so a restyle triggered by an effect sees the final
//! state.

use geo::Coord;
use log::{debug, info};

use crate::data::NO_COUNTRY;
use crate::features::{CountryFeature, FeatureId, FeatureStore};
use crate::hit_test::features_at;
use crate::resolver::CountryResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureStyle {
    Default,
    Hovered,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Idle,
    Hovering(FeatureId),
    Selected(FeatureId),
}

/// Collaborators driven by selection changes.
pub trait SelectionEffects {
    fn load_narratives(&mut self, country_code: &str);
    fn clear_narratives(&mut self);
    fn fly_to(&mut self, feature: &CountryFeature);
    fn fly_out(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DisplayedCountry {
    label: String,
    code: String,
}

#[derive(Debug, Default)]
pub struct SelectionState {
    hovered: Option<FeatureId>,
    selected: Option<FeatureId>,
    displayed: Option<DisplayedCountry>,
}

impl SelectionState {
    #[cfg(test)]
    pub fn hovered(&self) -> Option<FeatureId> {
        self.hovered
    }

    #[cfg(test)]
    pub fn selected(&self) -> Option<FeatureId> {
        self.selected
    }

    /// Header text: the shown country's label, or [`NO_COUNTRY`].
    pub fn displayed_label(&self) -> &str {
        self.displayed.as_ref().map_or(NO_COUNTRY, |d| d.label.as_str())
    }

    pub fn displayed_code(&self) -> Option<&str> {
        self.displayed.as_ref().map(|d| d.code.as_str())
    }

    pub fn phase(&self) -> SelectionPhase {
        match (self.selected, self.hovered) {
            (Some(id), _) => SelectionPhase::Selected(id),
            (None, Some(id)) => SelectionPhase::Hovering(id),
            (None, None) => SelectionPhase::Idle,
        }
    }

    fn take_hovered(&mut self) -> Option<FeatureId> {
        self.hovered.take()
    }

    fn show(&mut self, label: String, code: String) {
        self.displayed = Some(DisplayedCountry { label, code });
    }
}

#[derive(Debug)]
pub struct SelectionMachine {
    state: SelectionState,
    resolver: CountryResolver,
}

impl SelectionMachine {
    pub fn new(resolver: CountryResolver) -> Self {
        Self {
            state: SelectionState::default(),
            resolver,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn style_for(&self, id: FeatureId) -> FeatureStyle {
        if self.state.selected == Some(id) {
            FeatureStyle::Selected
        } else if self.state.hovered == Some(id) {
            FeatureStyle::Hovered
        } else {
            FeatureStyle::Default
        }
    }

    /// Code to reload for the country shown right now, resolved from its
    /// label. `None` while nothing is displayed.
    pub fn reload_code(&self) -> Option<String> {
        let label = self.state.displayed_label();
        if label == NO_COUNTRY {
            return None;
        }
        Some(self.resolver.resolve(label))
    }

    pub fn pointer_moved(&mut self, store: &mut FeatureStore, coord: Coord<f64>) {
        if let Some(id) = self.state.take_hovered() {
            store.set_active(id, false);
        }
        self.hover_top(store, coord);
    }

    pub fn clicked(
        &mut self,
        store: &mut FeatureStore,
        coord: Coord<f64>,
        effects: &mut impl SelectionEffects,
    ) {
        if let Some(previous) = self.state.selected.take() {
            store.set_selected(previous, false);
        }

        // What is under the pointer right now beats the last move's hover.
        let hover = self.state.take_hovered();
        let candidate = features_at(store, coord).first().copied().or(hover);
        if let Some(stale) = hover.filter(|&h| Some(h) != candidate) {
            store.set_active(stale, false);
        }

        match candidate {
            Some(id) => self.select(store, id, effects),
            None => self.deselect(store, coord, effects),
        }
        debug!("Selection now {:?}", self.state.phase());
    }

    fn select(&mut self, store: &mut FeatureStore, id: FeatureId, effects: &mut impl SelectionEffects) {
        store.set_active(id, false);
        store.set_selected(id, true);
        self.state.selected = Some(id);

        let Some(feature) = store.get(id) else {
            return;
        };
        let label = feature.label().to_string();
        let code = self.resolver.resolve(&label);

        if self.state.displayed_code() == Some(code.as_str()) {
            debug!("{} already displayed, skipping reload", code);
        } else {
            info!("Selected {} ({})", label, code);
            effects.load_narratives(&code);
            effects.fly_to(feature);
        }
        self.state.show(label, code);
    }

    fn deselect(&mut self, store: &mut FeatureStore, coord: Coord<f64>, effects: &mut impl SelectionEffects) {
        if self.state.displayed.is_none() {
            return;
        }

        info!("Cleared selection");
        effects.clear_narratives();
        self.state.displayed = None;
        self.hover_top(store, coord);
        effects.fly_out();
    }

    fn hover_top(&mut self, store: &mut FeatureStore, coord: Coord<f64>) {
        let Some(&top) = features_at(store, coord).first() else {
            return;
        };
        if self.state.selected != Some(top) {
            store.set_active(top, true);
            self.state.hovered = Some(top);
        }
    }
}
