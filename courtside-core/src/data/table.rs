//! Storage-neutral table form.
//!
//! A [`TableSnapshot`] is an ordered list of named columns, each an ordered
//! list of nullable scalars tagged with its dtype. It converts losslessly to
//! and from a polars `DataFrame` for the dtypes the assembler produces.
//!
//! The shared cache tier stores the plain column-map form
//! (`{"PTS": [110], "GAME_DATE": ["2024-11-01"]}`). Decoding that form infers
//! dtypes, so integer widths and all-null columns do not survive it.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::provider::DataError;

/// Typed values of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "values", rename_all = "lowercase")]
pub enum ColumnValues {
    Bool(Vec<Option<bool>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    Float32(Vec<Option<f32>>),
    Float64(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
    Date(Vec<Option<NaiveDate>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Bool(v) => v.len(),
            ColumnValues::Int32(v) => v.len(),
            ColumnValues::Int64(v) => v.len(),
            ColumnValues::Float32(v) => v.len(),
            ColumnValues::Float64(v) => v.len(),
            ColumnValues::Str(v) => v.len(),
            ColumnValues::Date(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    pub data: ColumnValues,
}

/// Column-major, serializable copy of a `DataFrame`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub columns: Vec<TableColumn>,
}

impl TableSnapshot {
    pub fn height(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnValues> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.data)
    }

    /// Snapshot a `DataFrame`. Unsupported dtypes are stored as strings.
    pub fn from_frame(df: &DataFrame) -> Result<Self, DataError> {
        let mut columns = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let n = series.len();
            let data = match series.dtype() {
                DataType::Boolean => {
                    let ca = series.bool()?;
                    ColumnValues::Bool((0..n).map(|i| ca.get(i)).collect())
                }
                DataType::Int32 => {
                    let ca = series.i32()?;
                    ColumnValues::Int32((0..n).map(|i| ca.get(i)).collect())
                }
                DataType::Int64 => {
                    let ca = series.i64()?;
                    ColumnValues::Int64((0..n).map(|i| ca.get(i)).collect())
                }
                DataType::Float32 => {
                    let ca = series.f32()?;
                    ColumnValues::Float32((0..n).map(|i| ca.get(i)).collect())
                }
                DataType::Float64 => {
                    let ca = series.f64()?;
                    ColumnValues::Float64((0..n).map(|i| ca.get(i)).collect())
                }
                DataType::String => {
                    let ca = series.str()?;
                    ColumnValues::Str((0..n).map(|i| ca.get(i).map(str::to_string)).collect())
                }
                DataType::Date => {
                    let ca = series.date()?;
                    ColumnValues::Date((0..n).map(|i| ca.get(i).map(days_to_date)).collect())
                }
                _ => {
                    let cast = series.cast(&DataType::String)?;
                    let ca = cast.str()?;
                    ColumnValues::Str((0..n).map(|i| ca.get(i).map(str::to_string)).collect())
                }
            };
            columns.push(TableColumn {
                name: column.name().to_string(),
                data,
            });
        }
        Ok(Self { columns })
    }

    /// Rebuild the `DataFrame`, column order preserved.
    pub fn to_frame(&self) -> Result<DataFrame, DataError> {
        let columns = self
            .columns
            .iter()
            .map(|c| column_from_values(&c.name, &c.data))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DataFrame::new(columns)?)
    }

    /// Decode a plain `{"COL": [..], ...}` map, inferring each column's dtype.
    pub fn from_plain_columns(value: &Value) -> Result<Self, DataError> {
        let map = value
            .as_object()
            .ok_or_else(|| DataError::Table("plain table is not a JSON object".into()))?;
        let mut columns = Vec::with_capacity(map.len());
        for (name, values) in map {
            let values = values.as_array().ok_or_else(|| {
                DataError::Table(format!("column '{name}' is not a list of values"))
            })?;
            columns.push(TableColumn {
                name: name.clone(),
                data: infer_column(values),
            });
        }
        let snapshot = Self { columns };
        let height = snapshot.height();
        if snapshot.columns.iter().any(|c| c.data.len() != height) {
            return Err(DataError::Table("plain table columns differ in length".into()));
        }
        Ok(snapshot)
    }

    /// Encode as a plain `{"COL": [..], ...}` map in column order. Dates are
    /// written as `YYYY-MM-DD`, nulls and NaN as `null`.
    pub fn to_plain_columns(&self) -> Value {
        let map = self
            .columns
            .iter()
            .map(|c| (c.name.clone(), plain_values(&c.data)))
            .collect::<serde_json::Map<_, _>>();
        Value::Object(map)
    }
}

/// Days since the Unix epoch → calendar date.
pub fn days_to_date(days: i32) -> NaiveDate {
    NaiveDate::default() + chrono::Duration::days(days as i64)
}

/// Calendar date → days since the Unix epoch.
pub fn date_to_days(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

/// Build a polars `Date` column from nullable calendar dates.
pub fn date_column(name: &str, dates: &[Option<NaiveDate>]) -> Result<Column, DataError> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(date_to_days)).collect();
    Ok(Column::new(name.into(), days).cast(&DataType::Date)?)
}

fn column_from_values(name: &str, values: &ColumnValues) -> Result<Column, DataError> {
    let column = match values {
        ColumnValues::Bool(v) => Column::new(name.into(), v.clone()),
        ColumnValues::Int32(v) => Column::new(name.into(), v.clone()),
        ColumnValues::Int64(v) => Column::new(name.into(), v.clone()),
        ColumnValues::Float32(v) => Column::new(name.into(), v.clone()),
        ColumnValues::Float64(v) => Column::new(name.into(), v.clone()),
        ColumnValues::Str(v) => Column::new(name.into(), v.clone()),
        ColumnValues::Date(v) => date_column(name, v)?,
    };
    Ok(column)
}

fn plain_values(values: &ColumnValues) -> Value {
    fn list<T>(values: &[Option<T>], f: impl Fn(&T) -> Value) -> Value {
        Value::Array(
            values
                .iter()
                .map(|v| v.as_ref().map_or(Value::Null, &f))
                .collect(),
        )
    }
    match values {
        ColumnValues::Bool(v) => list(v, |b| Value::Bool(*b)),
        ColumnValues::Int32(v) => list(v, |n| Value::from(*n)),
        ColumnValues::Int64(v) => list(v, |n| Value::from(*n)),
        ColumnValues::Float32(v) => list(v, |x| Value::from(f64::from(*x))),
        ColumnValues::Float64(v) => list(v, |x| Value::from(*x)),
        ColumnValues::Str(v) => list(v, |s| Value::String(s.clone())),
        ColumnValues::Date(v) => list(v, |d| Value::String(d.format("%Y-%m-%d").to_string())),
    }
}

fn infer_column(values: &[Value]) -> ColumnValues {
    let non_null = || values.iter().filter(|v| !v.is_null());

    if non_null().all(Value::is_boolean) && non_null().next().is_some() {
        return ColumnValues::Bool(values.iter().map(Value::as_bool).collect());
    }
    if non_null().all(|v| v.is_i64()) && non_null().next().is_some() {
        return ColumnValues::Int64(values.iter().map(Value::as_i64).collect());
    }
    if non_null().all(Value::is_number) && non_null().next().is_some() {
        return ColumnValues::Float64(values.iter().map(Value::as_f64).collect());
    }
    if non_null().all(|v| v.as_str().and_then(parse_iso_date).is_some())
        && non_null().next().is_some()
    {
        return ColumnValues::Date(
            values
                .iter()
                .map(|v| v.as_str().and_then(parse_iso_date))
                .collect(),
        );
    }
    ColumnValues::Str(
        values
            .iter()
            .map(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .collect(),
    )
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_frame() -> DataFrame {
        DataFrame::new(vec![
            date_column(
                "GAME_DATE",
                &[NaiveDate::from_ymd_opt(2024, 11, 1), None],
            )
            .unwrap(),
            Column::new("PTS".into(), vec![Some(110i32), Some(98)]),
            Column::new("FG_PCT".into(), vec![Some(0.481f64), None]),
            Column::new("MATCHUP".into(), vec![Some("TOR vs. BOS"), Some("TOR @ NYK")]),
        ])
        .unwrap()
    }

    #[test]
    fn frame_snapshot_preserves_dtypes_and_order() {
        let df = sample_frame();
        let snapshot = TableSnapshot::from_frame(&df).unwrap();

        let names: Vec<&str> = snapshot.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["GAME_DATE", "PTS", "FG_PCT", "MATCHUP"]);
        assert_eq!(
            snapshot.column("GAME_DATE"),
            Some(&ColumnValues::Date(vec![
                NaiveDate::from_ymd_opt(2024, 11, 1),
                None
            ]))
        );

        let rebuilt = snapshot.to_frame().unwrap();
        assert!(rebuilt.equals_missing(&df));
        assert_eq!(rebuilt.column("GAME_DATE").unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn snapshot_json_is_column_map() {
        let snapshot = TableSnapshot::from_frame(&sample_frame()).unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["columns"][1]["name"], "PTS");
        assert_eq!(json["columns"][1]["data"]["dtype"], "int32");
        assert_eq!(json["columns"][1]["data"]["values"], json!([110, 98]));
    }

    #[test]
    fn plain_columns_infer_dtypes() {
        let plain = json!({
            "GAME_DATE": ["2024-11-01", null],
            "PTS": [110, 98],
            "FG_PCT": [0.5, 1],
            "WL": ["W", "L"],
            "HOME": [true, false],
        });
        let snapshot = TableSnapshot::from_plain_columns(&plain).unwrap();
        assert!(matches!(snapshot.column("GAME_DATE"), Some(ColumnValues::Date(_))));
        assert!(matches!(snapshot.column("PTS"), Some(ColumnValues::Int64(_))));
        assert!(matches!(snapshot.column("FG_PCT"), Some(ColumnValues::Float64(_))));
        assert!(matches!(snapshot.column("WL"), Some(ColumnValues::Str(_))));
        assert!(matches!(snapshot.column("HOME"), Some(ColumnValues::Bool(_))));
        assert_eq!(snapshot.height(), 2);
    }

    #[test]
    fn plain_columns_encode_in_column_order() {
        let plain = TableSnapshot::from_frame(&sample_frame())
            .unwrap()
            .to_plain_columns();
        assert_eq!(
            plain,
            json!({
                "GAME_DATE": ["2024-11-01", null],
                "PTS": [110, 98],
                "FG_PCT": [0.481, null],
                "MATCHUP": ["TOR vs. BOS", "TOR @ NYK"],
            })
        );
        let keys: Vec<&String> = plain.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["GAME_DATE", "PTS", "FG_PCT", "MATCHUP"]);

        // read-back widens integers but keeps every value
        let back = TableSnapshot::from_plain_columns(&plain).unwrap();
        assert_eq!(
            back.column("PTS"),
            Some(&ColumnValues::Int64(vec![Some(110), Some(98)]))
        );
        assert_eq!(
            back.column("GAME_DATE"),
            Some(&ColumnValues::Date(vec![
                NaiveDate::from_ymd_opt(2024, 11, 1),
                None
            ]))
        );
    }

    #[test]
    fn plain_columns_reject_ragged_lengths() {
        let plain = json!({"PTS": [1, 2], "REB": [3]});
        assert!(TableSnapshot::from_plain_columns(&plain).is_err());
    }

    #[test]
    fn epoch_day_conversion() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();
        assert_eq!(days_to_date(date_to_days(date)), date);
        assert_eq!(date_to_days(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
    }
}
