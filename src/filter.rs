//! Filter state: free-text search, per-facet selections, numeric ranges and
//! the two date windows.
//!
//! Every component defaults to "unconstrained". Setters normalize their
//! input, so a [`FilterState`] never holds an inverted range. The state is
//! a plain value: callers edit a copy and swap it in whole, which keeps
//! recomputation working from one consistent snapshot.

use crate::error::{Error, Result};
use crate::types::{ClassifiedRecord, CompletionStatus, Priority, ProjectHealth, RiskLevel, WorkCategory, UNKNOWN};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// An independent multi-valued filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    WorkType,
    WorkCategory,
    Frontier,
    SectorHq,
    CompletionStatus,
    ProjectHealth,
    RiskLevel,
    Priority,
    ApprovalYear,
    SourceGroup,
}

impl Facet {
    pub const ALL: [Facet; 10] = [
        Facet::WorkType,
        Facet::WorkCategory,
        Facet::Frontier,
        Facet::SectorHq,
        Facet::CompletionStatus,
        Facet::ProjectHealth,
        Facet::RiskLevel,
        Facet::Priority,
        Facet::ApprovalYear,
        Facet::SourceGroup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::WorkType => "work_type",
            Facet::WorkCategory => "work_category",
            Facet::Frontier => "frontier",
            Facet::SectorHq => "sector_hq",
            Facet::CompletionStatus => "completion_status",
            Facet::ProjectHealth => "project_health",
            Facet::RiskLevel => "risk_level",
            Facet::Priority => "priority",
            Facet::ApprovalYear => "approval_year",
            Facet::SourceGroup => "source_group",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Position of `value` in the facet's prescribed order, if it has one.
    fn prescribed_rank(&self, value: &str) -> Option<usize> {
        fn rank<T: fmt::Display>(all: &[T], value: &str) -> Option<usize> {
            all.iter().position(|v| v.to_string() == value)
        }
        match self {
            Facet::WorkCategory => rank(&WorkCategory::ALL, value),
            Facet::CompletionStatus => rank(&CompletionStatus::ALL, value),
            Facet::ProjectHealth => rank(&ProjectHealth::ALL, value),
            Facet::RiskLevel => rank(&RiskLevel::ALL, value),
            Facet::Priority => rank(&Priority::ALL, value),
            _ => None,
        }
    }

    /// Display order for option lists: prescribed stage/severity order where
    /// the facet has one (unknown values after it, lexically), newest first
    /// for approval years, lexical otherwise.
    pub fn compare_values(&self, a: &str, b: &str) -> std::cmp::Ordering {
        match self {
            Facet::ApprovalYear => {
                let (ya, yb) = (a.parse::<i64>().ok(), b.parse::<i64>().ok());
                yb.cmp(&ya).then_with(|| a.cmp(b))
            }
            _ => {
                let ra = self.prescribed_rank(a).unwrap_or(usize::MAX);
                let rb = self.prescribed_rank(b).unwrap_or(usize::MAX);
                ra.cmp(&rb).then_with(|| a.cmp(b))
            }
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Facet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase().replace('-', "_");
        let facet = match key.as_str() {
            "hlec_year" => Facet::ApprovalYear,
            "source_sheet" => Facet::SourceGroup,
            "health" => Facet::ProjectHealth,
            "risk" => Facet::RiskLevel,
            _ => Facet::ALL
                .into_iter()
                .find(|f| f.as_str() == key)
                .ok_or_else(|| Error::UnknownFacet(s.to_string()))?,
        };
        Ok(facet)
    }
}

/// A numeric dimension filtered by an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeField {
    /// Completion on the 0–100 scale.
    CompletionPct,
    SanctionedAmount,
    Length,
    Units,
    EfficiencyScore,
    DaysToTarget,
}

impl RangeField {
    pub const ALL: [RangeField; 6] = [
        RangeField::CompletionPct,
        RangeField::SanctionedAmount,
        RangeField::Length,
        RangeField::Units,
        RangeField::EfficiencyScore,
        RangeField::DaysToTarget,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RangeField::CompletionPct => "completion_pct",
            RangeField::SanctionedAmount => "sanctioned_amount",
            RangeField::Length => "length",
            RangeField::Units => "units",
            RangeField::EfficiencyScore => "efficiency_score",
            RangeField::DaysToTarget => "days_to_target",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// `None` only for a record with no parsable target date.
    pub fn value(&self, r: &ClassifiedRecord) -> Option<f64> {
        match self {
            RangeField::CompletionPct => Some(r.completion_pct()),
            RangeField::SanctionedAmount => Some(r.raw.sanctioned_amount),
            RangeField::Length => Some(r.raw.length),
            RangeField::Units => Some(r.raw.units),
            RangeField::EfficiencyScore => Some(r.efficiency_score),
            RangeField::DaysToTarget => r.days_to_target.map(|d| d as f64),
        }
    }
}

impl FromStr for RangeField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        RangeField::ALL
            .into_iter()
            .find(|f| f.as_str() == key)
            .ok_or_else(|| Error::UnknownRangeField(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    /// Scheduled date of commencement.
    Start,
    /// Probable date of completion.
    Target,
}

impl DateField {
    pub const ALL: [DateField; 2] = [DateField::Start, DateField::Target];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn value(&self, r: &ClassifiedRecord) -> Option<NaiveDate> {
        match self {
            DateField::Start => r.start_date,
            DateField::Target => r.target_date,
        }
    }
}

/// Inclusive `[lo, hi]`, always with `lo <= hi`. Serialized as a pair with
/// `null` for an open side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[Option<f64>; 2]", into = "[Option<f64>; 2]")]
pub struct NumericRange {
    lo: f64,
    hi: f64,
}

impl NumericRange {
    /// Swaps reversed bounds; a NaN bound is left open.
    pub fn new(a: f64, b: f64) -> Self {
        let a = if a.is_nan() { f64::NEG_INFINITY } else { a };
        let b = if b.is_nan() { f64::INFINITY } else { b };
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && v <= self.hi
    }
}

impl From<[Option<f64>; 2]> for NumericRange {
    fn from([a, b]: [Option<f64>; 2]) -> Self {
        NumericRange::new(a.unwrap_or(f64::NEG_INFINITY), b.unwrap_or(f64::INFINITY))
    }
}

impl From<NumericRange> for [Option<f64>; 2] {
    fn from(r: NumericRange) -> Self {
        let finite = |v: f64| v.is_finite().then_some(v);
        [finite(r.lo), finite(r.hi)]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct DateRangeRepr {
    enabled: bool,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

/// Optional date window; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DateRangeRepr", into = "DateRangeRepr")]
pub struct DateRange {
    enabled: bool,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) if s > e => (Some(e), Some(s)),
            other => other,
        };
        Self { enabled: true, start, end }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// An unparsable date never fails the window.
    pub fn admits(&self, date: Option<NaiveDate>) -> bool {
        let Some(date) = date else {
            return true;
        };
        if !self.enabled {
            return true;
        }
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

impl From<DateRangeRepr> for DateRange {
    fn from(r: DateRangeRepr) -> Self {
        let mut range = DateRange::new(r.start, r.end);
        range.enabled = r.enabled;
        range
    }
}

impl From<DateRange> for DateRangeRepr {
    fn from(r: DateRange) -> Self {
        DateRangeRepr { enabled: r.enabled, start: r.start, end: r.end }
    }
}

/// Observed min/max of every numeric dimension in a loaded dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataBounds {
    ranges: BTreeMap<RangeField, NumericRange>,
}

impl DataBounds {
    /// Completion and efficiency always span at least `0..=100`.
    pub fn from_records(records: &[ClassifiedRecord]) -> Self {
        let mut ranges = BTreeMap::new();
        for field in RangeField::ALL {
            let mut values = records.iter().filter_map(|r| field.value(r)).filter(|v| v.is_finite());
            let Some(first) = values.next() else {
                continue;
            };
            let (mut lo, mut hi) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
            if matches!(field, RangeField::CompletionPct | RangeField::EfficiencyScore) {
                lo = lo.min(0.0);
                hi = hi.max(100.0);
            }
            ranges.insert(field, NumericRange::new(lo, hi));
        }
        Self { ranges }
    }

    pub fn get(&self, field: RangeField) -> Option<NumericRange> {
        self.ranges.get(&field).copied()
    }
}

/// Named preset combinations of filters. Each starts from a reset state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickFilter {
    Critical,
    Completed,
    Ongoing,
    NotStarted,
    Bop,
    HighBudget,
    OnTrack,
    SevereDelay,
    Urgent,
    NearTarget,
    Overdue,
}

impl QuickFilter {
    pub const ALL: [QuickFilter; 11] = [
        QuickFilter::Critical,
        QuickFilter::Completed,
        QuickFilter::Ongoing,
        QuickFilter::NotStarted,
        QuickFilter::Bop,
        QuickFilter::HighBudget,
        QuickFilter::OnTrack,
        QuickFilter::SevereDelay,
        QuickFilter::Urgent,
        QuickFilter::NearTarget,
        QuickFilter::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuickFilter::Critical => "critical",
            QuickFilter::Completed => "completed",
            QuickFilter::Ongoing => "ongoing",
            QuickFilter::NotStarted => "not_started",
            QuickFilter::Bop => "bop",
            QuickFilter::HighBudget => "high_budget",
            QuickFilter::OnTrack => "on_track",
            QuickFilter::SevereDelay => "severe_delay",
            QuickFilter::Urgent => "urgent",
            QuickFilter::NearTarget => "near_target",
            QuickFilter::Overdue => "overdue",
        }
    }
}

impl FromStr for QuickFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        QuickFilter::ALL
            .into_iter()
            .find(|q| q.as_str() == key)
            .ok_or_else(|| Error::UnknownQuickFilter(s.to_string()))
    }
}

/// How many constraints are active, per component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterCounts {
    pub search: usize,
    pub facets: BTreeMap<Facet, usize>,
    pub ranges: usize,
    pub dates: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    search: String,
    /// Never holds an empty set; an absent facet is unconstrained.
    #[serde(deserialize_with = "non_empty_selections")]
    selections: BTreeMap<Facet, BTreeSet<String>>,
    ranges: BTreeMap<RangeField, NumericRange>,
    dates: BTreeMap<DateField, DateRange>,
    /// Observed bounds the state was derived from. A range equal to them is
    /// not narrowing anything.
    bounds: DataBounds,
}

/// Saved files may carry `"facet": []`; drop those so an empty selection
/// stays unconstrained however the state was built.
fn non_empty_selections<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<Facet, BTreeSet<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut selections = BTreeMap::<Facet, BTreeSet<String>>::deserialize(deserializer)?;
    selections.retain(|_, values| !values.is_empty());
    Ok(selections)
}

impl FilterState {
    /// The unconstrained state for a dataset: ranges span the observed data.
    pub fn from_bounds(bounds: &DataBounds) -> Self {
        Self {
            ranges: bounds.ranges.clone(),
            bounds: bounds.clone(),
            ..Self::default()
        }
    }

    pub fn reset(&mut self, bounds: &DataBounds) {
        *self = Self::from_bounds(bounds);
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into().trim().to_string();
    }

    /// The active selection, or `None` when the facet is unconstrained.
    pub fn selection(&self, facet: Facet) -> Option<&BTreeSet<String>> {
        self.selections.get(&facet)
    }

    pub fn set_selection<I, S>(&mut self, facet: Facet, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if set.is_empty() {
            self.selections.remove(&facet);
        } else {
            self.selections.insert(facet, set);
        }
    }

    /// Adds `value` if absent, removes it otherwise.
    pub fn toggle(&mut self, facet: Facet, value: &str) {
        let set = self.selections.entry(facet).or_default();
        if !set.remove(value) {
            set.insert(value.to_string());
        }
        if set.is_empty() {
            self.selections.remove(&facet);
        }
    }

    pub fn clear_selection(&mut self, facet: Facet) {
        self.selections.remove(&facet);
    }

    pub fn range(&self, field: RangeField) -> Option<NumericRange> {
        self.ranges.get(&field).copied()
    }

    pub fn set_range(&mut self, field: RangeField, lo: f64, hi: f64) {
        self.ranges.insert(field, NumericRange::new(lo, hi));
    }

    pub fn clear_range(&mut self, field: RangeField) {
        self.ranges.remove(&field);
    }

    /// True when the range for `field` was moved off the observed span.
    /// Without observed bounds any finite side counts as narrowing.
    pub fn is_narrowed(&self, field: RangeField) -> bool {
        let Some(range) = self.ranges.get(&field) else {
            return false;
        };
        match self.bounds.get(field) {
            Some(outer) => *range != outer,
            None => range.lo().is_finite() || range.hi().is_finite(),
        }
    }

    pub fn date_range(&self, field: DateField) -> DateRange {
        self.dates.get(&field).copied().unwrap_or_default()
    }

    pub fn set_date_range(&mut self, field: DateField, range: DateRange) {
        if range.enabled() {
            self.dates.insert(field, range);
        } else {
            self.dates.remove(&field);
        }
    }

    /// A fresh state with one preset applied on top of the defaults.
    pub fn quick(preset: QuickFilter, bounds: &DataBounds) -> Self {
        let mut state = Self::from_bounds(bounds);
        let bound = |field: RangeField| bounds.get(field);
        match preset {
            QuickFilter::Critical => state.set_selection(Facet::RiskLevel, [RiskLevel::Critical.as_str()]),
            QuickFilter::Completed => state.set_range(RangeField::CompletionPct, 95.0, 100.0),
            QuickFilter::Ongoing => state.set_range(RangeField::CompletionPct, 1.0, 94.0),
            QuickFilter::NotStarted => state.set_range(RangeField::CompletionPct, 0.0, 1.0),
            QuickFilter::Bop => {
                state.set_selection(Facet::WorkCategory, [WorkCategory::BorderOutpost.as_str()])
            }
            QuickFilter::HighBudget => {
                let max = bound(RangeField::SanctionedAmount).map_or(50.0, |r| r.hi());
                state.set_range(RangeField::SanctionedAmount, 50.0, max.max(50.0));
            }
            QuickFilter::OnTrack => state.set_selection(Facet::ProjectHealth, [ProjectHealth::OnTrack.as_str()]),
            QuickFilter::SevereDelay => {
                state.set_selection(Facet::ProjectHealth, [ProjectHealth::SevereDelay.as_str()])
            }
            QuickFilter::Urgent => {
                state.set_selection(Facet::Priority, [Priority::Urgent.as_str(), Priority::High.as_str()])
            }
            QuickFilter::NearTarget => state.set_range(RangeField::DaysToTarget, 0.0, 90.0),
            QuickFilter::Overdue => {
                let min = bound(RangeField::DaysToTarget).map_or(-1.0, |r| r.lo());
                state.set_range(RangeField::DaysToTarget, min.min(-1.0), -1.0);
            }
        }
        state
    }

    /// Counts constraints that actually narrow the dataset. A range only
    /// counts once it differs from the observed bounds.
    pub fn active_counts(&self) -> FilterCounts {
        let mut counts = FilterCounts {
            search: usize::from(!self.search.is_empty()),
            ..FilterCounts::default()
        };
        for (facet, set) in &self.selections {
            counts.facets.insert(*facet, set.len());
        }
        counts.ranges = self.ranges.keys().filter(|field| self.is_narrowed(**field)).count();
        counts.dates = self.dates.values().filter(|d| d.enabled()).count();
        counts.total = counts.search + counts.facets.values().sum::<usize>() + counts.ranges + counts.dates;
        counts
    }

    pub fn has_active_filters(&self) -> bool {
        self.active_counts().total > 0
    }

    pub fn snapshot(&self, name: impl Into<String>) -> FilterSnapshot {
        FilterSnapshot {
            name: name.into(),
            saved_at: Utc::now(),
            state: self.clone(),
        }
    }

    pub fn restore(snapshot: &FilterSnapshot) -> Self {
        snapshot.state.clone()
    }
}

impl ClassifiedRecord {
    /// The record's value for `facet`. Blank text and a missing approval
    /// year read as [`UNKNOWN`], so those records stay selectable.
    pub fn facet_value(&self, facet: Facet) -> Cow<'_, str> {
        fn text(s: &str) -> Cow<'_, str> {
            match s.trim() {
                "" => Cow::Borrowed(UNKNOWN),
                s => Cow::Borrowed(s),
            }
        }
        match facet {
            Facet::WorkType => text(&self.raw.work_type),
            Facet::WorkCategory => text(&self.work_category),
            Facet::Frontier => text(&self.raw.frontier),
            Facet::SectorHq => text(&self.raw.sector_hq),
            Facet::CompletionStatus => Cow::Borrowed(self.completion_status.as_str()),
            Facet::ProjectHealth => Cow::Borrowed(self.project_health.as_str()),
            Facet::RiskLevel => Cow::Borrowed(self.risk_level.as_str()),
            Facet::Priority => Cow::Borrowed(self.priority.as_str()),
            Facet::ApprovalYear => match self.approval_year {
                Some(y) => Cow::Owned(y.to_string()),
                None => Cow::Borrowed(UNKNOWN),
            },
            Facet::SourceGroup => text(&self.raw.source_group),
        }
    }
}

/// A named, timestamped copy of a filter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSnapshot {
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub state: FilterState,
}

/// Key/value store of saved filter configurations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedFilters {
    entries: BTreeMap<String, FilterSnapshot>,
}

impl SavedFilters {
    pub fn save(&mut self, snapshot: FilterSnapshot) {
        self.entries.insert(snapshot.name.clone(), snapshot);
    }

    pub fn load(&self, name: &str) -> Result<FilterState> {
        self.entries
            .get(name)
            .map(FilterState::restore)
            .ok_or_else(|| Error::UnknownSnapshot(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Option<FilterSnapshot> {
        self.entries.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bounds() -> DataBounds {
        let mut ranges = BTreeMap::new();
        ranges.insert(RangeField::CompletionPct, NumericRange::new(0.0, 100.0));
        ranges.insert(RangeField::SanctionedAmount, NumericRange::new(0.0, 240.0));
        ranges.insert(RangeField::DaysToTarget, NumericRange::new(-400.0, 900.0));
        DataBounds { ranges }
    }

    #[test]
    fn inverted_ranges_are_swapped() {
        let mut state = FilterState::default();
        state.set_range(RangeField::Length, 50.0, 10.0);
        let r = state.range(RangeField::Length).unwrap();
        assert_eq!((r.lo(), r.hi()), (10.0, 50.0));

        let open = NumericRange::new(f64::NAN, 3.0);
        assert!(open.contains(-1e12));
        assert!(!open.contains(3.5));
    }

    #[test]
    fn inverted_date_window_is_swapped_and_unparsable_passes() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1);
        let dec = NaiveDate::from_ymd_opt(2024, 12, 1);
        let range = DateRange::new(dec, jan);
        assert_eq!(range.start(), jan);
        assert_eq!(range.end(), dec);
        assert!(range.admits(None));
        assert!(range.admits(NaiveDate::from_ymd_opt(2024, 6, 1)));
        assert!(!range.admits(NaiveDate::from_ymd_opt(2025, 6, 1)));
        assert!(DateRange::new(None, jan).admits(NaiveDate::from_ymd_opt(1990, 1, 1)));
        assert!(DateRange::disabled().admits(NaiveDate::from_ymd_opt(1990, 1, 1)));
    }

    #[test]
    fn empty_selection_is_unconstrained() {
        let mut state = FilterState::default();
        state.set_selection(Facet::Frontier, ["A", "B"]);
        assert_eq!(state.selection(Facet::Frontier).map(|s| s.len()), Some(2));
        state.toggle(Facet::Frontier, "A");
        state.toggle(Facet::Frontier, "B");
        assert_eq!(state.selection(Facet::Frontier), None);
        assert_eq!(state, FilterState::default());
    }

    #[test]
    fn clearing_returns_components_to_unconstrained() {
        let b = bounds();
        let mut state = FilterState::from_bounds(&b);
        state.set_selection(Facet::Priority, ["LOW"]);
        state.set_range(RangeField::Units, 2.0, 4.0);
        assert_eq!(state.active_counts().total, 2);
        state.clear_selection(Facet::Priority);
        state.clear_range(RangeField::Units);
        assert_eq!(state, FilterState::from_bounds(&b));

        let mut saved = SavedFilters::default();
        saved.save(state.snapshot("base"));
        assert_eq!(saved.len(), 1);
        assert!(saved.remove("base").is_some());
        assert!(saved.is_empty());
    }

    #[test]
    fn reset_restores_bounds() {
        let b = bounds();
        let mut state = FilterState::quick(QuickFilter::Critical, &b);
        state.set_search("fence");
        state.reset(&b);
        assert_eq!(state, FilterState::from_bounds(&b));
        assert!(!state.has_active_filters());
    }

    #[test]
    fn quick_filters_start_from_defaults() {
        let b = bounds();
        let state = FilterState::quick(QuickFilter::Urgent, &b);
        let expected: BTreeSet<String> = ["HIGH".to_string(), "URGENT".to_string()].into();
        assert_eq!(state.selection(Facet::Priority), Some(&expected));

        let budget = FilterState::quick(QuickFilter::HighBudget, &b);
        assert_eq!(budget.range(RangeField::SanctionedAmount), Some(NumericRange::new(50.0, 240.0)));

        let overdue = FilterState::quick(QuickFilter::Overdue, &b);
        assert_eq!(overdue.range(RangeField::DaysToTarget), Some(NumericRange::new(-400.0, -1.0)));
        assert_eq!(overdue.active_counts().total, 1);
    }

    #[test]
    fn counts_each_active_component() {
        let b = bounds();
        let mut state = FilterState::from_bounds(&b);
        state.set_search("road");
        state.set_selection(Facet::Frontier, ["A", "B"]);
        state.set_range(RangeField::CompletionPct, 10.0, 100.0);
        state.set_date_range(DateField::Target, DateRange::new(None, NaiveDate::from_ymd_opt(2026, 1, 1)));
        let counts = state.active_counts();
        assert_eq!(counts.search, 1);
        assert_eq!(counts.facets.get(&Facet::Frontier), Some(&2));
        assert_eq!(counts.ranges, 1);
        assert_eq!(counts.dates, 1);
        assert_eq!(counts.total, 5);
    }

    #[test]
    fn parses_keys_and_rejects_unknown_ones() {
        assert_eq!("frontier".parse::<Facet>().unwrap(), Facet::Frontier);
        assert_eq!("hlec_year".parse::<Facet>().unwrap(), Facet::ApprovalYear);
        assert!(matches!("colour".parse::<Facet>(), Err(Error::UnknownFacet(_))));
        assert_eq!("units".parse::<RangeField>().unwrap(), RangeField::Units);
        assert!("nope".parse::<RangeField>().is_err());
        assert_eq!("near_target".parse::<QuickFilter>().unwrap(), QuickFilter::NearTarget);
        assert!(matches!("everything".parse::<QuickFilter>(), Err(Error::UnknownQuickFilter(_))));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let b = bounds();
        let mut state = FilterState::quick(QuickFilter::SevereDelay, &b);
        state.set_search("bridge");
        state.set_date_range(
            DateField::Start,
            DateRange::new(NaiveDate::from_ymd_opt(2020, 1, 1), None),
        );

        let mut saved = SavedFilters::default();
        saved.save(state.snapshot("delays"));
        let json = serde_json::to_string(&saved).unwrap();
        let back: SavedFilters = serde_json::from_str(&json).unwrap();

        assert_eq!(back.load("delays").unwrap(), state);
        assert!(matches!(back.load("missing"), Err(Error::UnknownSnapshot(_))));
        assert_eq!(back.names().collect::<Vec<_>>(), vec!["delays"]);
    }

    #[test]
    fn deserialized_ranges_are_normalized() {
        let state: FilterState =
            serde_json::from_str(r#"{"search":"","selections":{},"ranges":{"units":[9.0,1.0]},"dates":{}}"#)
                .unwrap();
        assert_eq!(state.range(RangeField::Units), Some(NumericRange::new(1.0, 9.0)));
    }

    #[test]
    fn empty_selections_in_saved_json_are_unconstrained() {
        let state: FilterState =
            serde_json::from_str(r#"{"selections":{"frontier":[],"risk_level":["HIGH"]}}"#).unwrap();
        assert_eq!(state.selection(Facet::Frontier), None);
        assert_eq!(state.selection(Facet::RiskLevel).map(|s| s.len()), Some(1));
        assert_eq!(state.active_counts().total, 1);

        let only_empty: FilterState = serde_json::from_str(r#"{"selections":{"priority":[]}}"#).unwrap();
        assert_eq!(only_empty, FilterState::default());
        assert!(!only_empty.has_active_filters());
    }

    #[test]
    fn ranges_narrow_once_moved_off_observed_bounds() {
        let b = bounds();
        let mut state = FilterState::from_bounds(&b);
        assert!(!state.is_narrowed(RangeField::DaysToTarget));
        state.set_range(RangeField::DaysToTarget, -400.0, -1.0);
        assert!(state.is_narrowed(RangeField::DaysToTarget));
        state.set_range(RangeField::DaysToTarget, -500.0, 1000.0);
        assert!(state.is_narrowed(RangeField::DaysToTarget));
        state.set_range(RangeField::DaysToTarget, -400.0, 900.0);
        assert!(!state.is_narrowed(RangeField::DaysToTarget));
        assert!(!state.is_narrowed(RangeField::Units));
        state.set_range(RangeField::Units, 0.0, f64::INFINITY);
        assert!(state.is_narrowed(RangeField::Units));
    }

    #[test]
    fn option_order_follows_domain_then_lexical() {
        let mut risks = vec!["LOW", "CRITICAL", "MEDIUM", "HIGH"];
        risks.sort_by(|a, b| Facet::RiskLevel.compare_values(a, b));
        assert_eq!(risks, vec!["CRITICAL", "HIGH", "MEDIUM", "LOW"]);

        let mut cats = vec!["Helipad", "OTHER", "ROAD", "BORDER_OUTPOST"];
        cats.sort_by(|a, b| Facet::WorkCategory.compare_values(a, b));
        assert_eq!(cats, vec!["BORDER_OUTPOST", "ROAD", "OTHER", "Helipad"]);

        let mut years = vec!["2018", "2022", "2020"];
        years.sort_by(|a, b| Facet::ApprovalYear.compare_values(a, b));
        assert_eq!(years, vec!["2022", "2020", "2018"]);

        let mut frontiers = vec!["Punjab", "Assam", "Gujarat"];
        frontiers.sort_by(|a, b| Facet::Frontier.compare_values(a, b));
        assert_eq!(frontiers, vec!["Assam", "Gujarat", "Punjab"]);
    }
}
