//! Filtered reads over any registered row model
//!
//! One generic select serves every entity. Filters are checked against the
//! entity's declared columns, so asking for a project id on a sheet without
//! one is an input error rather than a SQL error.

use kams_common::db::{
    Development, Evaluation, Execution, Orientation, Performance, Project, TableSchema,
    WinProbabilityPrediction,
};
use kams_common::{Error, Result};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

/// A row model that can be selected, filtered and serialized
pub trait Record:
    TableSchema + for<'r> FromRow<'r, SqliteRow> + Serialize + Send + Sync + Unpin + 'static
{
}

impl Record for Orientation {}
impl Record for Execution {}
impl Record for Performance {}
impl Record for Evaluation {}
impl Record for Development {}
impl Record for Project {}
impl Record for WinProbabilityPrediction {}

/// Exact-match filters plus an optional case-insensitive name substring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub quarter: Option<String>,
    pub nik: Option<i64>,
    pub lop_id: Option<String>,
    pub name_contains: Option<String>,
}

impl RecordFilter {
    pub fn quarter(quarter: impl Into<String>) -> Self {
        Self {
            quarter: Some(quarter.into()),
            ..Default::default()
        }
    }

    pub fn nik(nik: i64) -> Self {
        Self {
            nik: Some(nik),
            ..Default::default()
        }
    }

    pub fn lop_id(lop_id: impl Into<String>) -> Self {
        Self {
            lop_id: Some(lop_id.into()),
            ..Default::default()
        }
    }

    pub fn in_quarter(mut self, quarter: impl Into<String>) -> Self {
        self.quarter = Some(quarter.into());
        self
    }

    /// Reject filters on columns `R` does not declare
    fn check_supported<R: Record>(&self) -> Result<()> {
        let requested = [
            ("quarter", self.quarter.is_some()),
            ("nik", self.nik.is_some()),
            ("lop_id", self.lop_id.is_some()),
            ("name", self.name_contains.is_some()),
        ];
        for (column, used) in requested {
            if used && !R::has_column(column) {
                return Err(Error::InvalidInput(format!(
                    "{} cannot be filtered by {}",
                    R::table_name(),
                    column
                )));
            }
        }
        Ok(())
    }
}

/// Escape LIKE wildcards so user text matches literally
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn build_select<R: Record>(filter: &RecordFilter) -> Result<QueryBuilder<'static, Sqlite>> {
    filter.check_supported::<R>()?;

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT * FROM {} WHERE 1 = 1", R::table_name()));

    if let Some(quarter) = &filter.quarter {
        builder.push(" AND quarter = ").push_bind(quarter.clone());
    }
    if let Some(nik) = filter.nik {
        builder.push(" AND nik = ").push_bind(nik);
    }
    if let Some(lop_id) = &filter.lop_id {
        builder.push(" AND lop_id = ").push_bind(lop_id.clone());
    }
    if let Some(name) = &filter.name_contains {
        // Case-insensitive for ASCII letters only
        builder
            .push(" AND name LIKE ")
            .push_bind(format!("%{}%", escape_like(name)))
            .push(" ESCAPE '\\'");
    }
    builder.push(" ORDER BY id");

    Ok(builder)
}

/// Every row matching `filter`; empty when nothing matches
pub async fn fetch_records<R: Record>(pool: &SqlitePool, filter: &RecordFilter) -> Result<Vec<R>> {
    let mut builder = build_select::<R>(filter)?;
    let rows = builder.build_query_as::<R>().fetch_all(pool).await?;
    debug!("{} {:?}: {} rows", R::table_name(), filter, rows.len());
    Ok(rows)
}

/// First row matching `filter`; `NotFound` when nothing matches
pub async fn fetch_one_record<R: Record>(pool: &SqlitePool, filter: &RecordFilter) -> Result<R> {
    let mut builder = build_select::<R>(filter)?;
    builder.push(" LIMIT 1");
    builder
        .build_query_as::<R>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No {} row for {}", R::table_name(), describe(filter))))
}

fn describe(filter: &RecordFilter) -> String {
    let mut parts = Vec::new();
    if let Some(nik) = filter.nik {
        parts.push(format!("nik {}", nik));
    }
    if let Some(lop_id) = &filter.lop_id {
        parts.push(format!("project {}", lop_id));
    }
    if let Some(quarter) = &filter.quarter {
        parts.push(format!("quarter {}", quarter));
    }
    if let Some(name) = &filter.name_contains {
        parts.push(format!("name like '{}'", name));
    }
    if parts.is_empty() {
        "any filter".to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("ali"), "ali");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_unsupported_filter_is_invalid_input() {
        let filter = RecordFilter::lop_id("LOP-001");
        assert!(matches!(
            filter.check_supported::<Orientation>(),
            Err(Error::InvalidInput(_))
        ));
        assert!(filter.check_supported::<Project>().is_ok());
        assert!(filter.check_supported::<WinProbabilityPrediction>().is_ok());
    }

    #[test]
    fn test_select_sql_shape() {
        let filter = RecordFilter {
            quarter: Some("Q1 2025".into()),
            nik: Some(920001),
            lop_id: None,
            name_contains: Some("ali".into()),
        };
        let builder = build_select::<Orientation>(&filter).unwrap();
        assert_eq!(
            builder.sql(),
            "SELECT * FROM orientasi WHERE 1 = 1 AND quarter = ? AND nik = ? AND name LIKE ? ESCAPE '\\' ORDER BY id"
        );
    }

    #[test]
    fn test_describe_filter() {
        let filter = RecordFilter::nik(7).in_quarter("Q2 2025");
        assert_eq!(describe(&filter), "nik 7, quarter Q2 2025");
        assert_eq!(describe(&RecordFilter::default()), "any filter");
    }
}
