use crate::filter::Facet;
use crate::types::{
    ClassifiedRecord, CompletionStatus, Priority, ProjectHealth, RiskLevel, WorkCategory, UNKNOWN,
};
use crate::util::{format_int, format_number, percent};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tabled::Tabled;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub count: usize,
    pub total_sanctioned: f64,
    pub total_spent: f64,
    pub total_remaining: f64,
    /// Mean completion on the 0–100 scale.
    pub avg_completion_pct: f64,
    pub avg_efficiency: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GroupSummaryRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub key: String,
    #[serde(rename = "Works")]
    #[tabled(rename = "Works")]
    pub count: String,
    #[serde(rename = "Sanctioned")]
    #[tabled(rename = "Sanctioned")]
    pub total_sanctioned: String,
    #[serde(rename = "Spent")]
    #[tabled(rename = "Spent")]
    pub total_spent: String,
    #[serde(rename = "AvgCompletion")]
    #[tabled(rename = "AvgCompletion")]
    pub avg_completion: String,
    #[serde(rename = "AvgEfficiency")]
    #[tabled(rename = "AvgEfficiency")]
    pub avg_efficiency: String,
}

impl From<&GroupSummary> for GroupSummaryRow {
    fn from(g: &GroupSummary) -> Self {
        GroupSummaryRow {
            key: g.key.clone(),
            count: format_int(g.count),
            total_sanctioned: format_number(g.total_sanctioned, 2),
            total_spent: format_number(g.total_spent, 2),
            avg_completion: format_number(g.avg_completion_pct, 1),
            avg_efficiency: format_number(g.avg_efficiency, 1),
        }
    }
}

/// One pass over `records`, accumulating sums and counts per value of
/// `facet`. Groups come back in the facet's display order.
pub fn group_by<'a, I>(records: I, facet: Facet) -> Vec<GroupSummary>
where
    I: IntoIterator<Item = &'a ClassifiedRecord>,
{
    #[derive(Default)]
    struct Acc {
        count: usize,
        sanctioned: f64,
        spent: f64,
        remaining: f64,
        completion: f64,
        efficiency: f64,
    }

    let mut map: HashMap<String, Acc> = HashMap::new();
    for r in records {
        let e = map.entry(r.facet_value(facet).into_owned()).or_default();
        e.count += 1;
        e.sanctioned += r.raw.sanctioned_amount;
        e.spent += r.spent_amount;
        e.remaining += r.remaining_amount;
        e.completion += r.completion_pct();
        e.efficiency += r.efficiency_score;
    }

    let mut rows: Vec<GroupSummary> = map
        .into_iter()
        .map(|(key, acc)| {
            let n = acc.count as f64;
            GroupSummary {
                key,
                count: acc.count,
                total_sanctioned: acc.sanctioned,
                total_spent: acc.spent,
                total_remaining: acc.remaining,
                avg_completion_pct: acc.completion / n,
                avg_efficiency: acc.efficiency / n,
            }
        })
        .collect();
    rows.sort_by(|a, b| facet.compare_values(&a.key, &b.key));
    rows
}

/// Headline numbers for the current view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub total_works: usize,
    pub total_sanctioned: f64,
    pub total_spent: f64,
    pub total_remaining: f64,
    pub avg_completion_pct: f64,
    pub avg_efficiency: f64,
    pub completed_works: usize,
    pub ongoing_works: usize,
    pub not_started_works: usize,
    pub critical_risk: usize,
    pub high_risk: usize,
    pub medium_risk: usize,
    pub low_risk: usize,
    pub on_track: usize,
    pub urgent_priority: usize,
    pub high_priority: usize,
    pub medium_priority: usize,
    pub low_priority: usize,
    pub by_category: Vec<(WorkCategory, usize)>,
    pub overdue_works: usize,
    /// Target within the next 90 days.
    pub near_target_works: usize,
    pub distinct_frontiers: usize,
    pub distinct_sector_hqs: usize,
    pub distinct_work_types: usize,
    /// Mean length over works that report one.
    pub avg_length: f64,
    pub total_units: f64,
    pub utilization_rate: f64,
    pub completion_rate: f64,
    pub critical_rate: f64,
}

pub fn dashboard_metrics<'a, I>(records: I) -> DashboardMetrics
where
    I: IntoIterator<Item = &'a ClassifiedRecord>,
{
    let mut m = DashboardMetrics::default();
    let mut completion_sum = 0.0;
    let mut efficiency_sum = 0.0;
    let mut length_sum = 0.0;
    let mut length_n = 0usize;
    let mut categories: HashMap<WorkCategory, usize> = HashMap::new();
    let mut frontiers = HashSet::new();
    let mut sectors = HashSet::new();
    let mut work_types = HashSet::new();

    for r in records {
        m.total_works += 1;
        m.total_sanctioned += r.raw.sanctioned_amount;
        m.total_spent += r.spent_amount;
        m.total_remaining += r.remaining_amount;
        completion_sum += r.completion_pct();
        efficiency_sum += r.efficiency_score;

        match r.completion_status {
            CompletionStatus::Completed => m.completed_works += 1,
            CompletionStatus::NotStarted => m.not_started_works += 1,
            _ => m.ongoing_works += 1,
        }
        match r.risk_level {
            RiskLevel::Critical => m.critical_risk += 1,
            RiskLevel::High => m.high_risk += 1,
            RiskLevel::Medium => m.medium_risk += 1,
            RiskLevel::Low => m.low_risk += 1,
        }
        match r.priority {
            Priority::Urgent => m.urgent_priority += 1,
            Priority::High => m.high_priority += 1,
            Priority::Medium => m.medium_priority += 1,
            Priority::Low => m.low_priority += 1,
        }
        if r.project_health == ProjectHealth::OnTrack {
            m.on_track += 1;
        }
        *categories.entry(r.category).or_insert(0) += 1;

        match r.days_to_target {
            Some(d) if d < 0 => m.overdue_works += 1,
            Some(d) if d <= 90 => m.near_target_works += 1,
            _ => {}
        }

        if r.raw.length > 0.0 {
            length_sum += r.raw.length;
            length_n += 1;
        }
        m.total_units += r.raw.units;

        for (set, facet) in [
            (&mut frontiers, Facet::Frontier),
            (&mut sectors, Facet::SectorHq),
            (&mut work_types, Facet::WorkType),
        ] {
            let v = r.facet_value(facet);
            if v != UNKNOWN {
                set.insert(v.into_owned());
            }
        }
    }

    if m.total_works == 0 {
        return DashboardMetrics::default();
    }

    let n = m.total_works as f64;
    m.avg_completion_pct = completion_sum / n;
    m.avg_efficiency = efficiency_sum / n;
    m.avg_length = if length_n > 0 { length_sum / length_n as f64 } else { 0.0 };
    m.by_category = WorkCategory::ALL
        .into_iter()
        .filter_map(|c| categories.get(&c).map(|n| (c, *n)))
        .collect();
    m.distinct_frontiers = frontiers.len();
    m.distinct_sector_hqs = sectors.len();
    m.distinct_work_types = work_types.len();
    m.utilization_rate = percent(m.total_spent, m.total_sanctioned);
    m.completion_rate = percent(m.completed_works as f64, n);
    m.critical_rate = percent(m.critical_risk as f64, n);
    m
}
