use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// Revision of the column mapping below. Bump when a header is renamed in the
/// upstream sheets so stale exports are easy to spot.
pub const FIELD_MAPPING_VERSION: u32 = 1;

/// Facet value for a blank cell or a missing approval year.
pub const UNKNOWN: &str = "Unknown";

/// One CSV row exactly as the merged operations sheet exports it.
///
/// Every column is optional text; numeric and date coercion happens in
/// [`RawRow::normalize`] so that a malformed cell never rejects a row.
#[derive(Debug, Deserialize, Default)]
pub struct RawRow {
    #[serde(rename = "S_No", alias = "s_no")]
    pub s_no: Option<String>,
    #[serde(rename = "NAME_OF_WORK", alias = "name_of_work")]
    pub name_of_work: Option<String>,
    #[serde(rename = "WORK_TYPE", alias = "work_type")]
    pub work_type: Option<String>,
    #[serde(rename = "WORK_CATEGORY", alias = "work_category")]
    pub work_category: Option<String>,
    #[serde(rename = "FRONTIER", alias = "frontier")]
    pub frontier: Option<String>,
    #[serde(rename = "SECTOR_HQ", alias = "sector_hq")]
    pub sector_hq: Option<String>,
    #[serde(rename = "LENGTH_KM", alias = "length_km")]
    pub length_km: Option<String>,
    #[serde(rename = "UNITS_AOR", alias = "units_aor")]
    pub units_aor: Option<String>,
    #[serde(rename = "SANCTIONED_AMOUNT_CR", alias = "sanctioned_amount_cr")]
    pub sanctioned_amount_cr: Option<String>,
    #[serde(rename = "COMPLETED_PERCENTAGE", alias = "completed_percentage")]
    pub completed_percentage: Option<String>,
    #[serde(rename = "SDC", alias = "sdc")]
    pub sdc: Option<String>,
    #[serde(rename = "PDC", alias = "pdc")]
    pub pdc: Option<String>,
    #[serde(rename = "HLEC_YEAR", alias = "hlec_year")]
    pub hlec_year: Option<String>,
    #[serde(rename = "REMARKS", alias = "remarks")]
    pub remarks: Option<String>,
    #[serde(rename = "SOURCE_SHEET", alias = "source_sheet")]
    pub source_sheet: Option<String>,
}

/// A construction work after ingestion. Only `id` is mandatory; everything
/// else defaults to an empty string or zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    pub name: String,
    pub work_type: String,
    pub work_category: String,
    pub frontier: String,
    pub sector_hq: String,
    pub length: f64,
    pub units: f64,
    pub sanctioned_amount: f64,
    /// Fraction in `0..=1`; values above 1 are kept as reported.
    pub completion_fraction: f64,
    pub start_date_token: String,
    pub target_date_token: String,
    pub approval_token: String,
    pub remarks: String,
    pub source_group: String,
}

impl RawRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    /// Lowercased free-text fields, joined by a separator no needle contains.
    pub(crate) fn search_text(&self) -> String {
        [
            &self.name,
            &self.frontier,
            &self.sector_hq,
            &self.work_type,
            &self.remarks,
            &self.id,
        ]
        .map(|field| field.to_lowercase())
        .join(SEARCH_SEPARATOR)
    }
}

const SEARCH_SEPARATOR: &str = "\u{1f}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionStatus {
    NotStarted,
    Initial,
    InProgress,
    Advanced,
    NearCompletion,
    Completed,
}

impl CompletionStatus {
    /// Pipeline stage order.
    pub const ALL: [CompletionStatus; 6] = [
        CompletionStatus::NotStarted,
        CompletionStatus::Initial,
        CompletionStatus::InProgress,
        CompletionStatus::Advanced,
        CompletionStatus::NearCompletion,
        CompletionStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::NotStarted => "NOT_STARTED",
            CompletionStatus::Initial => "INITIAL",
            CompletionStatus::InProgress => "IN_PROGRESS",
            CompletionStatus::Advanced => "ADVANCED",
            CompletionStatus::NearCompletion => "NEAR_COMPLETION",
            CompletionStatus::Completed => "COMPLETED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectHealth {
    OnTrack,
    MinorDelay,
    ModerateDelay,
    SevereDelay,
}

impl ProjectHealth {
    pub const ALL: [ProjectHealth; 4] = [
        ProjectHealth::OnTrack,
        ProjectHealth::MinorDelay,
        ProjectHealth::ModerateDelay,
        ProjectHealth::SevereDelay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectHealth::OnTrack => "ON_TRACK",
            ProjectHealth::MinorDelay => "MINOR_DELAY",
            ProjectHealth::ModerateDelay => "MODERATE_DELAY",
            ProjectHealth::SevereDelay => "SEVERE_DELAY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// Most to least severe.
    pub const ALL: [RiskLevel; 4] = [RiskLevel::Critical, RiskLevel::High, RiskLevel::Medium, RiskLevel::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::High => "HIGH",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Urgent, Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "URGENT",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkCategory {
    BorderOutpost,
    Fencing,
    Road,
    Bridge,
    Infrastructure,
    Other,
}

impl WorkCategory {
    pub const ALL: [WorkCategory; 6] = [
        WorkCategory::BorderOutpost,
        WorkCategory::Fencing,
        WorkCategory::Road,
        WorkCategory::Bridge,
        WorkCategory::Infrastructure,
        WorkCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkCategory::BorderOutpost => "BORDER_OUTPOST",
            WorkCategory::Fencing => "FENCING",
            WorkCategory::Road => "ROAD",
            WorkCategory::Bridge => "BRIDGE",
            WorkCategory::Infrastructure => "INFRASTRUCTURE",
            WorkCategory::Other => "OTHER",
        }
    }

    /// Case-insensitive lookup of a canonical category name. Anything else is
    /// bucketed as `Other`.
    pub fn from_name(name: &str) -> Self {
        let upper = name.trim().to_uppercase();
        WorkCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == upper)
            .unwrap_or(WorkCategory::Other)
    }
}

macro_rules! display_as_str {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(CompletionStatus, ProjectHealth, RiskLevel, Priority, WorkCategory);

/// A raw record plus every derived field. Built once per record by
/// [`crate::classify::classify`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    pub raw: RawRecord,
    /// Facet value for the work category: the raw name verbatim when present,
    /// otherwise the canonical name derived from the work type.
    pub work_category: String,
    pub category: WorkCategory,
    pub completion_status: CompletionStatus,
    pub project_health: ProjectHealth,
    pub risk_level: RiskLevel,
    pub priority: Priority,
    pub efficiency_score: f64,
    pub spent_amount: f64,
    pub remaining_amount: f64,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub days_to_target: Option<i64>,
    pub approval_meeting_label: Option<String>,
    pub approval_year: Option<i32>,
    #[serde(skip)]
    pub(crate) search_text: String,
}

impl ClassifiedRecord {
    /// Completion on the 0–100 scale the range filters use.
    pub fn completion_pct(&self) -> f64 {
        self.raw.completion_fraction * 100.0
    }

    /// The lowercased fields free-text search looks in.
    pub fn search_fields(&self) -> impl Iterator<Item = &str> {
        self.search_text.split(SEARCH_SEPARATOR)
    }
}

/// Flat export shape; the CSV writer cannot serialize nested structs.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub id: String,
    pub name: String,
    pub work_type: String,
    pub work_category: String,
    pub frontier: String,
    pub sector_hq: String,
    pub length: f64,
    pub units: f64,
    pub sanctioned_amount: f64,
    pub completion_pct: f64,
    pub start_date: String,
    pub target_date: String,
    pub approval_meeting: String,
    pub approval_year: Option<i32>,
    pub source_group: String,
    pub completion_status: CompletionStatus,
    pub project_health: ProjectHealth,
    pub risk_level: RiskLevel,
    pub priority: Priority,
    pub efficiency_score: f64,
    pub spent_amount: f64,
    pub remaining_amount: f64,
    pub days_to_target: Option<i64>,
    pub remarks: String,
}

impl From<&ClassifiedRecord> for ExportRow {
    fn from(r: &ClassifiedRecord) -> Self {
        ExportRow {
            id: r.raw.id.clone(),
            name: r.raw.name.clone(),
            work_type: r.raw.work_type.clone(),
            work_category: r.work_category.clone(),
            frontier: r.raw.frontier.clone(),
            sector_hq: r.raw.sector_hq.clone(),
            length: r.raw.length,
            units: r.raw.units,
            sanctioned_amount: r.raw.sanctioned_amount,
            completion_pct: r.completion_pct(),
            start_date: r.raw.start_date_token.clone(),
            target_date: r.raw.target_date_token.clone(),
            approval_meeting: r.approval_meeting_label.clone().unwrap_or_default(),
            approval_year: r.approval_year,
            source_group: r.raw.source_group.clone(),
            completion_status: r.completion_status,
            project_health: r.project_health,
            risk_level: r.risk_level,
            priority: r.priority,
            efficiency_score: r.efficiency_score,
            spent_amount: r.spent_amount,
            remaining_amount: r.remaining_amount,
            days_to_target: r.days_to_target,
            remarks: r.raw.remarks.clone(),
        }
    }
}

/// Console preview of a single work.
#[derive(Debug, Tabled, Clone)]
pub struct WorkPreviewRow {
    #[tabled(rename = "Id")]
    pub id: String,
    #[tabled(rename = "Frontier")]
    pub frontier: String,
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Amount")]
    pub amount: String,
    #[tabled(rename = "Done%")]
    pub completion: String,
    #[tabled(rename = "Health")]
    pub health: String,
    #[tabled(rename = "Risk")]
    pub risk: String,
    #[tabled(rename = "Priority")]
    pub priority: String,
}
