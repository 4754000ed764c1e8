use crate::error::Result;
use crate::filter::SavedFilters;
use crate::types::{ClassifiedRecord, ExportRow, WorkPreviewRow};
use crate::util::format_number;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Saved filters live in one JSON file; a missing file is an empty store.
pub fn load_saved_filters(path: impl AsRef<Path>) -> Result<SavedFilters> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(SavedFilters::default());
    }
    read_json(path)
}

pub fn save_saved_filters(path: impl AsRef<Path>, saved: &SavedFilters) -> Result<()> {
    write_json(path, saved)
}

pub fn export_view(path: impl AsRef<Path>, view: &[&ClassifiedRecord]) -> Result<()> {
    let rows: Vec<ExportRow> = view.iter().map(|r| ExportRow::from(*r)).collect();
    write_csv(path, &rows)
}

pub fn preview_rows(view: &[&ClassifiedRecord], max_rows: usize) -> Vec<WorkPreviewRow> {
    view.iter()
        .take(max_rows)
        .map(|r| WorkPreviewRow {
            id: r.raw.id.clone(),
            frontier: r.raw.frontier.clone(),
            category: r.work_category.clone(),
            amount: format_number(r.raw.sanctioned_amount, 2),
            completion: format_number(r.completion_pct(), 1),
            health: r.project_health.to_string(),
            risk: r.risk_level.to_string(),
            priority: r.priority.to_string(),
        })
        .collect()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
