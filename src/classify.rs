//! Derived classification of a raw record.
//!
//! Every rule here is a pure function of the record and a captured `now`.
//! Callers classify a whole batch against one timestamp so `days_to_target`
//! is consistent across the batch. Bad inputs degrade to defaults; nothing in
//! this module fails.

use crate::config::EngineConfig;
use crate::dates::{parse_token, TokenParser};
use crate::types::{
    ClassifiedRecord, CompletionStatus, Priority, ProjectHealth, RawRecord, RiskLevel, WorkCategory,
};
use chrono::{NaiveDate, NaiveDateTime};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Non-finite fractions count as no progress.
fn sanitize(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

pub fn completion_status(f: f64) -> CompletionStatus {
    let f = sanitize(f);
    if f <= 0.0 {
        CompletionStatus::NotStarted
    } else if f < 0.25 {
        CompletionStatus::Initial
    } else if f < 0.5 {
        CompletionStatus::InProgress
    } else if f < 0.75 {
        CompletionStatus::Advanced
    } else if f < 1.0 {
        CompletionStatus::NearCompletion
    } else {
        CompletionStatus::Completed
    }
}

/// Share of the start..target span that has elapsed at `now`, in `0..=1`.
/// Zero when either date is missing or the span is not positive.
pub fn expected_progress(start: Option<NaiveDate>, target: Option<NaiveDate>, now: NaiveDateTime) -> f64 {
    let (Some(start), Some(target)) = (start, target) else {
        return 0.0;
    };
    let start = start.and_time(chrono::NaiveTime::MIN);
    let target = target.and_time(chrono::NaiveTime::MIN);
    let span = (target - start).num_milliseconds();
    if span <= 0 {
        return 0.0;
    }
    let elapsed = (now - start).num_milliseconds();
    (elapsed as f64 / span as f64).clamp(0.0, 1.0)
}

pub fn project_health(f: f64, expected: f64) -> ProjectHealth {
    let delta = sanitize(f) - expected;
    if delta >= 0.0 {
        ProjectHealth::OnTrack
    } else if delta >= -0.10 {
        ProjectHealth::MinorDelay
    } else if delta >= -0.25 {
        ProjectHealth::ModerateDelay
    } else {
        ProjectHealth::SevereDelay
    }
}

pub fn amount_risk(amount: f64) -> u8 {
    if amount > 100.0 {
        2
    } else if amount > 50.0 {
        1
    } else {
        0
    }
}

pub fn health_risk(health: ProjectHealth) -> u8 {
    match health {
        ProjectHealth::OnTrack => 0,
        ProjectHealth::MinorDelay => 1,
        ProjectHealth::ModerateDelay => 2,
        ProjectHealth::SevereDelay => 3,
    }
}

/// Additive score: budget size, schedule health, and a stall penalty for
/// severely delayed works still under a quarter done.
pub fn risk_score(amount: f64, health: ProjectHealth, f: f64) -> u8 {
    let stalled = if sanitize(f) < 0.25 && health == ProjectHealth::SevereDelay { 2 } else { 0 };
    amount_risk(sanitize(amount)) + health_risk(health) + stalled
}

pub fn risk_level(amount: f64, health: ProjectHealth, f: f64) -> RiskLevel {
    match risk_score(amount, health, f) {
        s if s >= 5 => RiskLevel::Critical,
        s if s >= 3 => RiskLevel::High,
        s if s >= 1 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

/// Category implied by free-text work type when the sheet has none.
pub fn derive_category(work_type: &str) -> WorkCategory {
    let upper = work_type.to_uppercase();
    if upper.contains("BOP") {
        WorkCategory::BorderOutpost
    } else if upper.contains("FENCE") || upper.contains("FENCING") {
        WorkCategory::Fencing
    } else if upper.contains("ROAD") {
        WorkCategory::Road
    } else if upper.contains("BRIDGE") {
        WorkCategory::Bridge
    } else if upper.contains("BUILDING") || upper.contains("QUARTER") {
        WorkCategory::Infrastructure
    } else {
        WorkCategory::Other
    }
}

/// Returns the facet label and the classification bucket. A category named
/// in the sheet is kept verbatim even when it is not one we know.
pub fn resolve_category(raw: &RawRecord) -> (String, WorkCategory) {
    let named = raw.work_category.trim();
    if named.is_empty() {
        let derived = derive_category(&raw.work_type);
        (derived.as_str().to_string(), derived)
    } else {
        (named.to_string(), WorkCategory::from_name(named))
    }
}

fn is_border_critical(category: WorkCategory, work_type: &str, config: &EngineConfig) -> bool {
    matches!(
        category,
        WorkCategory::BorderOutpost | WorkCategory::Fencing | WorkCategory::Road
    ) || config.is_legacy_priority_type(work_type)
}

pub fn priority(
    category: WorkCategory,
    work_type: &str,
    amount: f64,
    f: f64,
    risk: RiskLevel,
    config: &EngineConfig,
) -> Priority {
    let amount = sanitize(amount);
    if is_border_critical(category, work_type, config) && (amount > 50.0 || risk == RiskLevel::Critical) {
        Priority::Urgent
    } else if amount > 75.0 || risk == RiskLevel::High {
        Priority::High
    } else if amount > 25.0 || sanitize(f) > 0.5 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

pub fn efficiency_score(f: f64, health: ProjectHealth) -> f64 {
    let multiplier = match health {
        ProjectHealth::OnTrack => 1.2,
        ProjectHealth::MinorDelay => 1.0,
        ProjectHealth::ModerateDelay => 0.8,
        ProjectHealth::SevereDelay => 0.6,
    };
    (sanitize(f) * 100.0 * multiplier).clamp(0.0, 100.0)
}

/// Approval meeting tokens look like `"52nd/ 2022"`.
pub fn parse_approval(token: &str) -> (Option<String>, Option<i32>) {
    let token = token.trim();
    if token.is_empty() {
        return (None, None);
    }
    match token.split_once('/') {
        Some((meeting, year)) => {
            let meeting = meeting.trim();
            let label = (!meeting.is_empty()).then(|| meeting.to_string());
            (label, year.trim().parse::<i32>().ok())
        }
        None => (Some(token.to_string()), None),
    }
}

/// Whole days from `now` until the target month starts, rounded up.
pub fn days_to_target(target: Option<NaiveDate>, now: NaiveDateTime) -> Option<i64> {
    let target = target?.and_time(chrono::NaiveTime::MIN);
    let seconds = (target - now).num_seconds() as f64;
    Some((seconds / SECONDS_PER_DAY).ceil() as i64)
}

/// Runs the pipeline over records with one shared token cache.
#[derive(Debug)]
pub struct Classifier {
    parser: TokenParser,
    config: EngineConfig,
}

impl Classifier {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            parser: TokenParser::with_capacity(config.token_cache_capacity),
            config,
        }
    }

    pub fn classify(&mut self, raw: RawRecord, now: NaiveDateTime) -> ClassifiedRecord {
        let start = self.parser.parse(&raw.start_date_token);
        let target = self.parser.parse(&raw.target_date_token);
        build(raw, start, target, now, &self.config)
    }

    pub fn classify_all(&mut self, raws: Vec<RawRecord>, now: NaiveDateTime) -> Vec<ClassifiedRecord> {
        raws.into_iter().map(|r| self.classify(r, now)).collect()
    }

    pub fn parser(&self) -> &TokenParser {
        &self.parser
    }
}

/// One-off classification with default settings and no memoization.
pub fn classify(raw: RawRecord, now: NaiveDateTime) -> ClassifiedRecord {
    let start = parse_token(&raw.start_date_token);
    let target = parse_token(&raw.target_date_token);
    build(raw, start, target, now, &EngineConfig::default())
}

fn build(
    raw: RawRecord,
    start: Option<NaiveDate>,
    target: Option<NaiveDate>,
    now: NaiveDateTime,
    config: &EngineConfig,
) -> ClassifiedRecord {
    let f = sanitize(raw.completion_fraction);
    let amount = sanitize(raw.sanctioned_amount);

    let completion_status = completion_status(f);
    let project_health = project_health(f, expected_progress(start, target, now));
    let risk_level = risk_level(amount, project_health, f);
    let (work_category, category) = resolve_category(&raw);
    let priority = priority(category, &raw.work_type, amount, f, risk_level, config);
    let (approval_meeting_label, approval_year) = parse_approval(&raw.approval_token);

    ClassifiedRecord {
        work_category,
        category,
        completion_status,
        project_health,
        risk_level,
        priority,
        efficiency_score: efficiency_score(f, project_health),
        spent_amount: amount * f,
        remaining_amount: amount * (1.0 - f),
        start_date: start,
        target_date: target,
        days_to_target: days_to_target(target, now),
        approval_meeting_label,
        approval_year,
        search_text: raw.search_text(),
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn record(f: f64, amount: f64) -> RawRecord {
        RawRecord {
            completion_fraction: f,
            sanctioned_amount: amount,
            ..RawRecord::new("1")
        }
    }

    #[test]
    fn status_boundaries_are_half_open() {
        use CompletionStatus::*;
        let cases = [
            (0.0, NotStarted),
            (0.249999, Initial),
            (0.25, InProgress),
            (0.49999, InProgress),
            (0.5, Advanced),
            (0.74999, Advanced),
            (0.75, NearCompletion),
            (0.99999, NearCompletion),
            (1.0, Completed),
            (1.5, Completed),
        ];
        for (f, expected) in cases {
            assert_eq!(completion_status(f), expected, "f = {f}");
        }
        assert_eq!(completion_status(f64::NAN), NotStarted);
    }

    #[test]
    fn unstarted_large_work_without_dates_is_medium_risk() {
        let c = classify(record(0.0, 120.0), at(2025, 6, 1));
        assert_eq!(c.completion_status, CompletionStatus::NotStarted);
        assert_eq!(amount_risk(120.0), 2);
        assert_eq!(c.project_health, ProjectHealth::OnTrack);
        assert_eq!(c.risk_level, RiskLevel::Medium);
        assert_eq!(c.days_to_target, None);
    }

    #[test]
    fn fully_elapsed_span_at_half_done_is_severe() {
        let raw = RawRecord {
            start_date_token: "Jan 2020".into(),
            target_date_token: "Jan 2021".into(),
            ..record(0.5, 10.0)
        };
        let c = classify(raw, at(2021, 1, 1));
        assert_eq!(c.project_health, ProjectHealth::SevereDelay);
        assert_eq!(c.days_to_target, Some(0));
        assert_eq!(c.risk_level, RiskLevel::High);
        assert!((c.efficiency_score - 30.0).abs() < 1e-9);
    }

    #[test]
    fn health_thresholds() {
        assert_eq!(project_health(0.5, 0.5), ProjectHealth::OnTrack);
        assert_eq!(project_health(0.4, 0.5), ProjectHealth::MinorDelay);
        assert_eq!(project_health(0.3, 0.5), ProjectHealth::ModerateDelay);
        assert_eq!(project_health(0.2, 0.5), ProjectHealth::SevereDelay);
    }

    #[test]
    fn inverted_or_missing_span_expects_nothing() {
        let jan = NaiveDate::from_ymd_opt(2021, 1, 1);
        let dec = NaiveDate::from_ymd_opt(2020, 12, 1);
        assert_eq!(expected_progress(jan, dec, at(2022, 1, 1)), 0.0);
        assert_eq!(expected_progress(None, jan, at(2022, 1, 1)), 0.0);
        assert_eq!(expected_progress(dec, jan, at(2019, 1, 1)), 0.0);
    }

    #[test]
    fn stalled_severe_work_is_critical() {
        let raw = RawRecord {
            start_date_token: "Jan 2020".into(),
            target_date_token: "Jan 2021".into(),
            ..record(0.1, 60.0)
        };
        let c = classify(raw, at(2022, 1, 1));
        assert_eq!(risk_score(60.0, c.project_health, 0.1), 6);
        assert_eq!(c.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn priority_prefers_border_categories() {
        let cfg = EngineConfig::default();
        assert_eq!(
            priority(WorkCategory::BorderOutpost, "New BOP", 60.0, 0.0, RiskLevel::Low, &cfg),
            Priority::Urgent
        );
        assert_eq!(
            priority(WorkCategory::Other, "bop", 10.0, 0.0, RiskLevel::Critical, &cfg),
            Priority::Urgent
        );
        assert_eq!(
            priority(WorkCategory::Bridge, "Bridge", 80.0, 0.0, RiskLevel::Low, &cfg),
            Priority::High
        );
        assert_eq!(
            priority(WorkCategory::Bridge, "Bridge", 10.0, 0.0, RiskLevel::High, &cfg),
            Priority::High
        );
        assert_eq!(
            priority(WorkCategory::Other, "Misc", 30.0, 0.0, RiskLevel::Low, &cfg),
            Priority::Medium
        );
        assert_eq!(
            priority(WorkCategory::Other, "Misc", 10.0, 0.6, RiskLevel::Low, &cfg),
            Priority::Medium
        );
        assert_eq!(
            priority(WorkCategory::Other, "Misc", 10.0, 0.1, RiskLevel::Medium, &cfg),
            Priority::Low
        );
    }

    #[test]
    fn category_named_in_sheet_is_kept_verbatim() {
        let mut raw = RawRecord::new("7");
        raw.work_type = "Approach road".into();
        assert_eq!(resolve_category(&raw), ("ROAD".to_string(), WorkCategory::Road));

        raw.work_category = "Helipad".into();
        assert_eq!(resolve_category(&raw), ("Helipad".to_string(), WorkCategory::Other));

        raw.work_category = "fencing".into();
        assert_eq!(resolve_category(&raw), ("fencing".to_string(), WorkCategory::Fencing));
    }

    #[test]
    fn derives_categories_from_work_type() {
        assert_eq!(derive_category("Composite BOP"), WorkCategory::BorderOutpost);
        assert_eq!(derive_category("Border fencing"), WorkCategory::Fencing);
        assert_eq!(derive_category("Lateral Road"), WorkCategory::Road);
        assert_eq!(derive_category("bridge"), WorkCategory::Bridge);
        assert_eq!(derive_category("Married quarters"), WorkCategory::Infrastructure);
        assert_eq!(derive_category("Floodlighting"), WorkCategory::Other);
    }

    #[test]
    fn efficiency_is_clamped() {
        assert_eq!(efficiency_score(1.0, ProjectHealth::OnTrack), 100.0);
        assert_eq!(efficiency_score(0.5, ProjectHealth::OnTrack), 60.0);
        assert_eq!(efficiency_score(0.5, ProjectHealth::ModerateDelay), 40.0);
        assert_eq!(efficiency_score(-1.0, ProjectHealth::OnTrack), 0.0);
    }

    #[test]
    fn approval_tokens() {
        assert_eq!(parse_approval("52nd/ 2022"), (Some("52nd".into()), Some(2022)));
        assert_eq!(parse_approval("45th/2018"), (Some("45th".into()), Some(2018)));
        assert_eq!(parse_approval("Pending"), (Some("Pending".into()), None));
        assert_eq!(parse_approval("  "), (None, None));
        assert_eq!(parse_approval("52nd/ TBD"), (Some("52nd".into()), None));
    }

    #[test]
    fn days_to_target_rounds_up() {
        let target = NaiveDate::from_ymd_opt(2025, 2, 1);
        let now = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(days_to_target(target, now), Some(31));
        assert_eq!(days_to_target(target, at(2025, 3, 1)), Some(-28));
    }

    #[test]
    fn amounts_split_by_completion() {
        let c = classify(record(0.25, 200.0), at(2025, 1, 1));
        assert_eq!(c.spent_amount, 50.0);
        assert_eq!(c.remaining_amount, 150.0);
    }

    #[test]
    fn classification_is_deterministic() {
        let raw = RawRecord {
            work_type: "BOP".into(),
            start_date_token: "Mar' 2022".into(),
            target_date_token: "Dec'2025".into(),
            approval_token: "50th/ 2021".into(),
            ..record(0.33, 88.0)
        };
        let now = at(2024, 7, 15);
        assert_eq!(classify(raw.clone(), now), classify(raw, now));
    }

    #[test]
    fn classifier_shares_token_cache() {
        let mut classifier = Classifier::new(EngineConfig::default());
        let raws = (0..5)
            .map(|i| RawRecord {
                start_date_token: "Jan 2020".into(),
                target_date_token: "Jan 2030".into(),
                ..RawRecord::new(i.to_string())
            })
            .collect();
        let out = classifier.classify_all(raws, at(2025, 1, 1));
        assert_eq!(out.len(), 5);
        assert_eq!(classifier.parser().len(), 2);
        assert_eq!(classifier.parser().stats(), (8, 2));
    }
}
