//! A loaded, classified dataset.
//!
//! Classification runs once on load; the records are immutable afterwards.
//! Views and facet options are recomputed from scratch for each
//! [`FilterState`] and hold no state of their own.

use crate::classify::Classifier;
use crate::config::EngineConfig;
use crate::facets::{self, Evaluation, FacetOptions, RelatedMappings};
use crate::filter::{DataBounds, Facet, FilterState, QuickFilter};
use crate::predicate::{ClauseSet, Predicate};
use crate::reports::{self, DashboardMetrics, GroupSummary};
use crate::types::{ClassifiedRecord, RawRecord};
use chrono::NaiveDateTime;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<ClassifiedRecord>,
    bounds: DataBounds,
    classified_at: NaiveDateTime,
}

impl Dataset {
    /// Classifies every record against the single timestamp `now`.
    pub fn load(raws: Vec<RawRecord>, now: NaiveDateTime, config: &EngineConfig) -> Self {
        let mut classifier = Classifier::new(config.clone());
        let records = classifier.classify_all(raws, now);
        let bounds = DataBounds::from_records(&records);
        let (hits, misses) = classifier.parser().stats();
        info!(
            records = records.len(),
            token_cache_hits = hits,
            token_cache_misses = misses,
            "classified dataset"
        );
        Self { records, bounds, classified_at: now }
    }

    pub fn records(&self) -> &[ClassifiedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn bounds(&self) -> &DataBounds {
        &self.bounds
    }

    pub fn classified_at(&self) -> NaiveDateTime {
        self.classified_at
    }

    /// The unconstrained filter state for this dataset.
    pub fn default_filters(&self) -> FilterState {
        FilterState::from_bounds(&self.bounds)
    }

    pub fn quick_filter(&self, preset: QuickFilter) -> FilterState {
        FilterState::quick(preset, &self.bounds)
    }

    /// Records passing every clause, in load order.
    pub fn filtered_view(&self, state: &FilterState) -> Vec<&ClassifiedRecord> {
        let predicate = Predicate::build(state, ClauseSet::EMPTY);
        self.records.iter().filter(|r| predicate.matches(r)).collect()
    }

    pub fn facet_options(&self, state: &FilterState) -> FacetOptions {
        facets::facet_options(&self.records, state)
    }

    /// View and options together, from one pass over the records.
    pub fn evaluate(&self, state: &FilterState) -> Evaluation<'_> {
        facets::evaluate(&self.records, state)
    }

    pub fn related_mappings(&self) -> RelatedMappings {
        RelatedMappings::from_records(&self.records)
    }

    pub fn group_by(&self, state: &FilterState, facet: Facet) -> Vec<GroupSummary> {
        reports::group_by(self.filtered_view(state), facet)
    }

    pub fn metrics(&self, state: &FilterState) -> DashboardMetrics {
        reports::dashboard_metrics(self.filtered_view(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{RangeField, SavedFilters};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn raws() -> Vec<RawRecord> {
        vec![
            RawRecord {
                frontier: "Punjab".into(),
                work_type: "BOP".into(),
                sanctioned_amount: 120.0,
                completion_fraction: 0.1,
                start_date_token: "Jan 2020".into(),
                target_date_token: "Jan 2022".into(),
                ..RawRecord::new("1")
            },
            RawRecord {
                frontier: "Assam".into(),
                work_type: "Road".into(),
                sanctioned_amount: 30.0,
                completion_fraction: 1.0,
                target_date_token: "Dec'2025".into(),
                ..RawRecord::new("2")
            },
            RawRecord {
                frontier: "Assam".into(),
                work_type: "Bridge".into(),
                sanctioned_amount: 5.0,
                completion_fraction: 0.4,
                ..RawRecord::new("3")
            },
        ]
    }

    #[test]
    fn empty_dataset_produces_empty_outputs() {
        let ds = Dataset::load(Vec::new(), now(), &EngineConfig::default());
        let state = ds.default_filters();
        assert!(ds.is_empty());
        assert!(ds.filtered_view(&state).is_empty());
        assert!(ds.facet_options(&state).iter().all(|(_, s)| s.is_empty()));
        assert_eq!(ds.metrics(&state), DashboardMetrics::default());
        assert!(ds.group_by(&state, Facet::Frontier).is_empty());
    }

    #[test]
    fn default_filters_admit_every_record() {
        let ds = Dataset::load(raws(), now(), &EngineConfig::default());
        let state = ds.default_filters();
        assert_eq!(ds.filtered_view(&state).len(), 3);
        assert_eq!(ds.records()[0].category, crate::types::WorkCategory::BorderOutpost);
        assert_eq!(ds.classified_at(), now());
        let amount = ds.bounds().get(RangeField::SanctionedAmount).unwrap();
        assert_eq!((amount.lo(), amount.hi()), (5.0, 120.0));
        let days = ds.bounds().get(RangeField::DaysToTarget).unwrap();
        assert_eq!(days.hi(), 334.0);
    }

    #[test]
    fn quick_filters_select_expected_records() {
        let ds = Dataset::load(raws(), now(), &EngineConfig::default());
        let ids = |preset| {
            ds.filtered_view(&ds.quick_filter(preset))
                .iter()
                .map(|r| r.raw.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(QuickFilter::Critical), vec!["1"]);
        assert_eq!(ids(QuickFilter::Completed), vec!["2"]);
        assert_eq!(ids(QuickFilter::Bop), vec!["1"]);
        assert_eq!(ids(QuickFilter::HighBudget), vec!["1"]);
        // record 3 has no target date and is left out of day presets
        assert_eq!(ids(QuickFilter::Overdue), vec!["1"]);
        assert_eq!(ids(QuickFilter::Overdue).len(), ds.metrics(&ds.default_filters()).overdue_works);
    }

    #[test]
    fn overdue_excludes_undated_works_when_every_dated_work_is_late() {
        let mut raws = raws();
        raws.remove(1);
        let ds = Dataset::load(raws, now(), &EngineConfig::default());
        let overdue = ds.quick_filter(QuickFilter::Overdue);
        let ids: Vec<&str> = ds.filtered_view(&overdue).iter().map(|r| r.raw.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
        assert_eq!(ds.filtered_view(&ds.default_filters()).len(), 2);
    }

    #[test]
    fn restored_snapshot_with_empty_selection_shows_everything() {
        let ds = Dataset::load(raws(), now(), &EngineConfig::default());
        let saved: SavedFilters = serde_json::from_str(
            r#"{"entries":{"stale":{"name":"stale","saved_at":"2025-01-01T00:00:00Z",
                "state":{"search":"","selections":{"risk_level":[]}}}}}"#,
        )
        .unwrap();
        let state = saved.load("stale").unwrap();
        assert!(!state.has_active_filters());
        assert_eq!(ds.filtered_view(&state).len(), ds.len());
        assert_eq!(ds.facet_options(&state), ds.facet_options(&ds.default_filters()));
    }

    #[test]
    fn evaluate_matches_separate_computations() {
        let ds = Dataset::load(raws(), now(), &EngineConfig::default());
        let mut state = ds.default_filters();
        state.set_selection(Facet::Frontier, ["Assam"]);
        let eval = ds.evaluate(&state);
        assert_eq!(eval.view, ds.filtered_view(&state));
        assert_eq!(eval.options, ds.facet_options(&state));
    }
}
