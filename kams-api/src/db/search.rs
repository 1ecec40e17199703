//! Global search across the six HR sheets
//!
//! The same filter is applied to every sheet independently and each sheet
//! reports its own matches. A sheet with no match is present with an empty
//! list.

use super::records::{fetch_records, RecordFilter};
use kams_common::db::{Development, Evaluation, Execution, Orientation, Performance, Project};
use kams_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;

/// How the free-text token is interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    /// No token: match everything
    Any,
    /// All-digit token: exact employee id
    Nik(i64),
    /// Anything else: name substring
    ///
    /// Case folding covers ASCII letters only (SQLite `LIKE` without ICU), so
    /// `ali` finds `Ali Rahman` but `çelik` does not find `Çelik`.
    Name(String),
}

impl SearchTerm {
    pub fn parse(token: Option<&str>) -> Self {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return SearchTerm::Any,
        };

        if token.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(nik) = token.parse::<i64>() {
                return SearchTerm::Nik(nik);
            }
        }
        SearchTerm::Name(token.to_string())
    }

    fn to_filter(&self, quarter: Option<&str>) -> RecordFilter {
        let mut filter = RecordFilter {
            quarter: quarter.map(str::to_string),
            ..Default::default()
        };
        match self {
            SearchTerm::Any => {}
            SearchTerm::Nik(nik) => filter.nik = Some(*nik),
            SearchTerm::Name(name) => filter.name_contains = Some(name.clone()),
        }
        filter
    }
}

/// Matches per sheet
#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub orientasi: Vec<Orientation>,
    pub pelaksanaan: Vec<Execution>,
    pub kinerja: Vec<Performance>,
    pub evaluasi: Vec<Evaluation>,
    pub pengembangan: Vec<Development>,
    pub projects: Vec<Project>,
}

impl SearchResults {
    pub fn total(&self) -> usize {
        self.orientasi.len()
            + self.pelaksanaan.len()
            + self.kinerja.len()
            + self.evaluasi.len()
            + self.pengembangan.len()
            + self.projects.len()
    }
}

/// Run `query` (optionally restricted to `quarter`) against every sheet
pub async fn search(
    pool: &SqlitePool,
    query: Option<&str>,
    quarter: Option<&str>,
) -> Result<SearchResults> {
    let term = SearchTerm::parse(query);
    let quarter = quarter.map(str::trim).filter(|q| !q.is_empty());
    let filter = term.to_filter(quarter);

    Ok(SearchResults {
        orientasi: fetch_records::<Orientation>(pool, &filter).await?,
        pelaksanaan: fetch_records::<Execution>(pool, &filter).await?,
        kinerja: fetch_records::<Performance>(pool, &filter).await?,
        evaluasi: fetch_records::<Evaluation>(pool, &filter).await?,
        pengembangan: fetch_records::<Development>(pool, &filter).await?,
        projects: fetch_records::<Project>(pool, &filter).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_token_is_nik() {
        assert_eq!(SearchTerm::parse(Some("12345")), SearchTerm::Nik(12345));
        assert_eq!(SearchTerm::parse(Some(" 920001 ")), SearchTerm::Nik(920001));
    }

    #[test]
    fn test_text_token_is_name() {
        assert_eq!(SearchTerm::parse(Some("ali")), SearchTerm::Name("ali".into()));
        assert_eq!(SearchTerm::parse(Some("-5")), SearchTerm::Name("-5".into()));
        assert_eq!(SearchTerm::parse(Some("12a")), SearchTerm::Name("12a".into()));
        // Too large for an employee id
        assert_eq!(
            SearchTerm::parse(Some("99999999999999999999")),
            SearchTerm::Name("99999999999999999999".into())
        );
    }

    #[test]
    fn test_blank_token_matches_everything() {
        assert_eq!(SearchTerm::parse(None), SearchTerm::Any);
        assert_eq!(SearchTerm::parse(Some("   ")), SearchTerm::Any);
    }

    #[test]
    fn test_nik_search_never_filters_by_name() {
        let filter = SearchTerm::Nik(12345).to_filter(Some("Q1 2025"));
        assert_eq!(filter.nik, Some(12345));
        assert_eq!(filter.name_contains, None);
        assert_eq!(filter.quarter.as_deref(), Some("Q1 2025"));
    }
}
