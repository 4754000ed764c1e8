use crate::error::Result;
use crate::types::{RawRecord, RawRow, FIELD_MAPPING_VERSION};
use crate::util::{clean_text, parse_f64_safe, parse_fraction_safe};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    /// Rows the CSV reader could not decode at all.
    pub parse_errors: usize,
    /// Rows with neither a serial number nor a work name.
    pub blank_rows: usize,
}

impl RawRow {
    /// Map one sheet row onto a [`RawRecord`]. Returns `None` for rows that
    /// identify no work. A missing serial number falls back to the 1-based
    /// row position.
    pub fn normalize(self, index: usize) -> Option<RawRecord> {
        let s_no = clean_text(self.s_no);
        let name = clean_text(self.name_of_work);
        if s_no.is_empty() && name.is_empty() {
            return None;
        }
        let id = if s_no.is_empty() { (index + 1).to_string() } else { s_no };

        Some(RawRecord {
            id,
            name,
            work_type: clean_text(self.work_type),
            work_category: clean_text(self.work_category),
            frontier: clean_text(self.frontier),
            sector_hq: clean_text(self.sector_hq),
            length: parse_f64_safe(self.length_km.as_deref()).unwrap_or(0.0),
            units: parse_f64_safe(self.units_aor.as_deref()).unwrap_or(0.0),
            sanctioned_amount: parse_f64_safe(self.sanctioned_amount_cr.as_deref()).unwrap_or(0.0),
            completion_fraction: parse_fraction_safe(self.completed_percentage.as_deref()).unwrap_or(0.0),
            start_date_token: clean_text(self.sdc),
            target_date_token: clean_text(self.pdc),
            approval_token: clean_text(self.hlec_year),
            remarks: clean_text(self.remarks),
            source_group: clean_text(self.source_sheet),
        })
    }
}

pub fn load_records(path: impl AsRef<Path>) -> Result<(Vec<RawRecord>, LoadReport)> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let (records, report) = read_records(file)?;
    info!(
        path = %path.display(),
        total = report.total_rows,
        kept = report.kept_rows,
        parse_errors = report.parse_errors,
        mapping_version = FIELD_MAPPING_VERSION,
        "loaded works"
    );
    Ok((records, report))
}

/// Reads every row from `reader`. Undecodable rows are counted and skipped;
/// they never abort the load.
pub fn read_records<R: Read>(reader: R) -> Result<(Vec<RawRecord>, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let mut report = LoadReport::default();
    let mut records = Vec::new();

    for (index, result) in rdr.deserialize::<RawRow>().enumerate() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(row = index + 1, error = %e, "skipping undecodable row");
                report.parse_errors += 1;
                continue;
            }
        };
        match row.normalize(index) {
            Some(record) => records.push(record),
            None => report.blank_rows += 1,
        }
    }

    report.kept_rows = records.len();
    Ok((records, report))
}
