//! Compiles a [`FilterState`] into a record predicate.
//!
//! Each clause can be suppressed individually; the facet option calculator
//! suppresses a facet's own clause so its options ignore its own selection.

use crate::filter::{DateField, Facet, FilterState, RangeField};
use crate::types::ClassifiedRecord;
use std::fmt;

/// One independently switchable clause of the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseId {
    Search,
    Facet(Facet),
    Range(RangeField),
    Date(DateField),
}

impl ClauseId {
    const FACET_BASE: usize = 1;
    const RANGE_BASE: usize = Self::FACET_BASE + Facet::ALL.len();
    const DATE_BASE: usize = Self::RANGE_BASE + RangeField::ALL.len();

    fn bit(&self) -> u32 {
        let pos = match self {
            ClauseId::Search => 0,
            ClauseId::Facet(f) => Self::FACET_BASE + f.index(),
            ClauseId::Range(r) => Self::RANGE_BASE + r.index(),
            ClauseId::Date(d) => Self::DATE_BASE + d.index(),
        };
        1 << pos
    }

    /// Every clause, in evaluation order.
    pub fn all() -> impl Iterator<Item = ClauseId> {
        std::iter::once(ClauseId::Search)
            .chain(Facet::ALL.into_iter().map(ClauseId::Facet))
            .chain(RangeField::ALL.into_iter().map(ClauseId::Range))
            .chain(DateField::ALL.into_iter().map(ClauseId::Date))
    }
}

impl fmt::Display for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseId::Search => f.write_str("search"),
            ClauseId::Facet(facet) => write!(f, "facet:{facet}"),
            ClauseId::Range(field) => write!(f, "range:{}", field.as_str()),
            ClauseId::Date(DateField::Start) => f.write_str("date:start"),
            ClauseId::Date(DateField::Target) => f.write_str("date:target"),
        }
    }
}

/// Bit set of clause ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ClauseSet(u32);

impl ClauseSet {
    pub const EMPTY: ClauseSet = ClauseSet(0);

    pub fn of(clause: ClauseId) -> Self {
        ClauseSet(clause.bit())
    }

    pub fn insert(&mut self, clause: ClauseId) {
        self.0 |= clause.bit();
    }

    pub fn contains(&self, clause: ClauseId) -> bool {
        self.0 & clause.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// True when every member of `self` is also in `other`.
    pub fn is_subset(&self, other: ClauseSet) -> bool {
        self.0 & !other.0 == 0
    }
}

impl FromIterator<ClauseId> for ClauseSet {
    fn from_iter<I: IntoIterator<Item = ClauseId>>(iter: I) -> Self {
        let mut set = ClauseSet::EMPTY;
        for clause in iter {
            set.insert(clause);
        }
        set
    }
}

/// A compiled predicate. Borrows the state it was built from.
#[derive(Debug)]
pub struct Predicate<'a> {
    state: &'a FilterState,
    needle: String,
    /// Constrained, non-suppressed clauses only.
    active: Vec<ClauseId>,
}

impl<'a> Predicate<'a> {
    pub fn build(state: &'a FilterState, suppress: ClauseSet) -> Self {
        let active = ClauseId::all()
            .filter(|c| !suppress.contains(*c) && is_constrained(state, *c))
            .collect();
        Self {
            state,
            needle: state.search().to_lowercase(),
            active,
        }
    }

    pub fn matches(&self, r: &ClassifiedRecord) -> bool {
        self.active.iter().all(|c| self.holds(*c, r))
    }

    /// Every active clause that `r` fails.
    pub fn failures(&self, r: &ClassifiedRecord) -> ClauseSet {
        self.active.iter().copied().filter(|c| !self.holds(*c, r)).collect()
    }

    pub fn active_clauses(&self) -> &[ClauseId] {
        &self.active
    }

    fn holds(&self, clause: ClauseId, r: &ClassifiedRecord) -> bool {
        match clause {
            ClauseId::Search => search_matches(&self.needle, r),
            ClauseId::Facet(facet) => self
                .state
                .selection(facet)
                .map_or(true, |selected| selected.contains(r.facet_value(facet).as_ref())),
            // An undated work has no days to target: it survives the default
            // span but not a range moved off it.
            ClauseId::Range(field) => match (self.state.range(field), field.value(r)) {
                (Some(range), Some(v)) => range.contains(v),
                (Some(_), None) => !self.state.is_narrowed(field),
                (None, _) => true,
            },
            ClauseId::Date(field) => self.state.date_range(field).admits(field.value(r)),
        }
    }
}

/// Shorthand for `Predicate::build(state, suppress)`.
pub fn build_predicate(state: &FilterState, suppress: ClauseSet) -> Predicate<'_> {
    Predicate::build(state, suppress)
}

fn is_constrained(state: &FilterState, clause: ClauseId) -> bool {
    match clause {
        ClauseId::Search => !state.search().is_empty(),
        ClauseId::Facet(facet) => state.selection(facet).is_some_and(|s| !s.is_empty()),
        ClauseId::Range(field) => state.range(field).is_some(),
        ClauseId::Date(field) => state.date_range(field).enabled(),
    }
}

/// Case-insensitive substring match over the free-text fields, lowercased
/// once at classification.
fn search_matches(needle: &str, r: &ClassifiedRecord) -> bool {
    needle.is_empty() || r.search_fields().any(|field| field.contains(needle))
}
