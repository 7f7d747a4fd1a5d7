//! Dataset export: CSV and JSON files for external analysis tools.
//!
//! Any table the query surface returns can be written out. Dates are written
//! as ISO `YYYY-MM-DD`, nulls as empty cells.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use courtside_core::data::{ColumnValues, TableSnapshot};
use polars::prelude::DataFrame;

// ─── CSV export ─────────────────────────────────────────────────────

fn cell(values: &ColumnValues, row: usize) -> String {
    fn fmt<T: ToString>(v: &[Option<T>], row: usize) -> String {
        v.get(row)
            .and_then(|x| x.as_ref())
            .map(ToString::to_string)
            .unwrap_or_default()
    }
    match values {
        ColumnValues::Bool(v) => fmt(v, row),
        ColumnValues::Int32(v) => fmt(v, row),
        ColumnValues::Int64(v) => fmt(v, row),
        ColumnValues::Float32(v) => fmt(v, row),
        ColumnValues::Float64(v) => fmt(v, row),
        ColumnValues::Str(v) => fmt(v, row),
        ColumnValues::Date(v) => fmt(v, row),
    }
}

/// Render a table as CSV with a header row, column order preserved.
pub fn export_frame_csv(df: &DataFrame) -> Result<String> {
    let snapshot = TableSnapshot::from_frame(df).context("failed to read table")?;
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(snapshot.columns.iter().map(|c| c.name.as_str()))?;
    for row in 0..snapshot.height() {
        wtr.write_record(snapshot.columns.iter().map(|c| cell(&c.data, row)))?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Render a table as the same JSON form the shared cache tier stores.
pub fn export_frame_json(df: &DataFrame) -> Result<String> {
    let snapshot = TableSnapshot::from_frame(df).context("failed to read table")?;
    serde_json::to_string_pretty(&snapshot).context("failed to serialize table to JSON")
}

// ─── Files ──────────────────────────────────────────────────────────

/// Write `{name}_{timestamp}.csv` under `output_dir`, creating the directory.
///
/// Returns the path of the written file.
pub fn save_frame_csv(df: &DataFrame, output_dir: &Path, name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create export dir: {}", output_dir.display()))?;
    let filename = format!(
        "{}_{}.csv",
        name,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let path = output_dir.join(filename);
    std::fs::write(&path, export_frame_csv(df)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = df.height(), "exported table");
    Ok(path)
}
