//! Orientation summary scores

use kams_common::db::Orientation;
use serde::Serialize;

/// Orientation row reduced to its two group means and customer matching
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrientationSummary {
    pub id: i64,
    pub quarter: String,
    pub nik: Option<i64>,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub periode: Option<String>,
    pub basic_understanding: f64,
    pub twinning: f64,
    pub customer_matching: Option<f64>,
}

/// Unweighted mean; blank sub-scores count as zero
fn mean_with_blanks_as_zero(scores: &[Option<f64>]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|s| s.unwrap_or(0.0)).sum::<f64>() / scores.len() as f64
}

impl From<&Orientation> for OrientationSummary {
    fn from(row: &Orientation) -> Self {
        let basic_understanding = mean_with_blanks_as_zero(&[
            row.solution,
            row.account_profile,
            row.account_plan,
            row.sales_funnel,
            row.bidding_management,
            row.project_management,
        ]);
        let twinning = mean_with_blanks_as_zero(&[
            row.customer_introduction,
            row.visiting_customer,
            row.transfer_customer_knowledge,
            row.transfer_customer_documentation,
        ]);

        Self {
            id: row.id,
            quarter: row.quarter.clone(),
            nik: row.nik,
            name: row.name.clone(),
            unit: row.unit.clone(),
            periode: row.periode.clone(),
            basic_understanding,
            twinning,
            customer_matching: row.customer_matching,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orientation(basic: [Option<f64>; 6], twinning: [Option<f64>; 4]) -> Orientation {
        Orientation {
            id: 1,
            quarter: "Q1 2025".into(),
            sheet: Some("orientasi".into()),
            nik: Some(920001),
            name: Some("Ali Rahman".into()),
            solution: basic[0],
            account_profile: basic[1],
            account_plan: basic[2],
            sales_funnel: basic[3],
            bidding_management: basic[4],
            project_management: basic[5],
            saran_pengembangan: None,
            customer_introduction: twinning[0],
            visiting_customer: twinning[1],
            transfer_customer_knowledge: twinning[2],
            transfer_customer_documentation: twinning[3],
            customer_matching: Some(0.82),
            periode: Some("Jan-Mar".into()),
            unit: Some("Enterprise".into()),
        }
    }

    #[test]
    fn test_full_scores() {
        let row = orientation([Some(4.0); 6], [Some(3.0), Some(4.0), Some(5.0), Some(4.0)]);
        let summary = OrientationSummary::from(&row);
        assert_eq!(summary.basic_understanding, 4.0);
        assert_eq!(summary.twinning, 4.0);
        assert_eq!(summary.customer_matching, Some(0.82));
    }

    #[test]
    fn test_blank_counts_as_zero() {
        let mut basic = [Some(4.0); 6];
        basic[5] = None;
        let row = orientation(basic, [None; 4]);
        let summary = OrientationSummary::from(&row);
        assert_eq!(summary.basic_understanding, 20.0 / 6.0);
        assert_eq!(summary.twinning, 0.0);
    }

    #[test]
    fn test_identity_fields_carried() {
        let row = orientation([None; 6], [None; 4]);
        let summary = OrientationSummary::from(&row);
        assert_eq!(summary.nik, Some(920001));
        assert_eq!(summary.quarter, "Q1 2025");
        assert_eq!(summary.unit.as_deref(), Some("Enterprise"));
    }
}
