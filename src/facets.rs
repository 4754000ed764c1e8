//! Cascading facet options.
//!
//! For every facet `D`, the options are the distinct values of `D` among
//! records that pass every active clause except `D`'s own. All facets are
//! computed in one traversal: a record survives the `D`-suppressed predicate
//! exactly when the set of clauses it fails is empty or is `{D}`.

use crate::filter::{Facet, FilterState};
use crate::predicate::{ClauseId, ClauseSet, Predicate};
use crate::types::{ClassifiedRecord, UNKNOWN};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Reachable values for one facet and how many records carry each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacetOptionSet {
    pub values: Vec<String>,
    pub counts: BTreeMap<String, usize>,
}

impl FacetOptionSet {
    fn from_tally(facet: Facet, tally: HashMap<String, usize>) -> Self {
        let mut values: Vec<String> = tally.keys().cloned().collect();
        values.sort_by(|a, b| facet.compare_values(a, b));
        Self {
            values,
            counts: tally.into_iter().collect(),
        }
    }

    pub fn count(&self, value: &str) -> usize {
        self.counts.get(value).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Option sets for every facet. Always holds an entry per facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetOptions {
    sets: BTreeMap<Facet, FacetOptionSet>,
}

impl FacetOptions {
    pub fn get(&self, facet: Facet) -> &FacetOptionSet {
        // every facet is inserted on construction
        &self.sets[&facet]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Facet, &FacetOptionSet)> {
        self.sets.iter().map(|(f, s)| (*f, s))
    }
}

/// The filtered view and the facet options from one traversal.
#[derive(Debug, Clone)]
pub struct Evaluation<'a> {
    pub view: Vec<&'a ClassifiedRecord>,
    pub options: FacetOptions,
}

pub fn evaluate<'a>(records: &'a [ClassifiedRecord], state: &FilterState) -> Evaluation<'a> {
    let predicate = Predicate::build(state, ClauseSet::EMPTY);
    let facet_clauses: Vec<(Facet, ClauseSet)> = Facet::ALL
        .into_iter()
        .map(|f| (f, ClauseSet::of(ClauseId::Facet(f))))
        .collect();
    let mut tallies: Vec<HashMap<String, usize>> = vec![HashMap::new(); Facet::ALL.len()];
    let mut view = Vec::new();

    for r in records {
        let failed = predicate.failures(r);
        if failed.is_empty() {
            view.push(r);
            for (facet, _) in &facet_clauses {
                tally(&mut tallies[facet.index()], *facet, r);
            }
        } else if let Some((facet, _)) = facet_clauses.iter().find(|(_, c)| *c == failed) {
            tally(&mut tallies[facet.index()], *facet, r);
        }
    }

    debug!(
        records = records.len(),
        survivors = view.len(),
        active_clauses = predicate.active_clauses().len(),
        "evaluated filters"
    );

    let sets = Facet::ALL
        .into_iter()
        .zip(tallies)
        .map(|(facet, t)| (facet, FacetOptionSet::from_tally(facet, t)))
        .collect();
    Evaluation {
        view,
        options: FacetOptions { sets },
    }
}

pub fn facet_options(records: &[ClassifiedRecord], state: &FilterState) -> FacetOptions {
    evaluate(records, state).options
}

fn known(r: &ClassifiedRecord, facet: Facet) -> Option<Cow<'_, str>> {
    Some(r.facet_value(facet)).filter(|v| v != UNKNOWN)
}

fn tally(counts: &mut HashMap<String, usize>, facet: Facet, r: &ClassifiedRecord) {
    *counts.entry(r.facet_value(facet).into_owned()).or_insert(0) += 1;
}

/// Which sector HQs sit under which frontier, and which work types occur
/// where. Built from the whole dataset, independent of any filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelatedMappings {
    pub frontier_to_sectors: BTreeMap<String, BTreeSet<String>>,
    /// First frontier seen for each sector HQ.
    pub sector_to_frontier: BTreeMap<String, String>,
    pub work_type_to_frontiers: BTreeMap<String, BTreeSet<String>>,
    pub frontier_to_work_types: BTreeMap<String, BTreeSet<String>>,
}

impl RelatedMappings {
    pub fn from_records(records: &[ClassifiedRecord]) -> Self {
        let mut m = RelatedMappings::default();
        for r in records {
            let frontier = known(r, Facet::Frontier);
            let sector = known(r, Facet::SectorHq);
            let work_type = known(r, Facet::WorkType);

            if let (Some(frontier), Some(sector)) = (&frontier, &sector) {
                m.frontier_to_sectors
                    .entry(frontier.to_string())
                    .or_default()
                    .insert(sector.to_string());
                m.sector_to_frontier
                    .entry(sector.to_string())
                    .or_insert_with(|| frontier.to_string());
            }
            if let (Some(frontier), Some(work_type)) = (&frontier, &work_type) {
                m.work_type_to_frontiers
                    .entry(work_type.to_string())
                    .or_default()
                    .insert(frontier.to_string());
                m.frontier_to_work_types
                    .entry(frontier.to_string())
                    .or_default()
                    .insert(work_type.to_string());
            }
        }
        m
    }
}
