//! Aggregate shapes shared by dashboards and reports.

use serde::{Deserialize, Serialize};

/// Row count grouped by a label (status, category, action...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

/// Numeric measure grouped by a label. `None` when the ratio is undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelValue {
    pub label: String,
    pub value: Option<f64>,
}

/// Sums the counts of the given labels.
pub fn total_for(counts: &[LabelCount], labels: &[&str]) -> i64 {
    counts
        .iter()
        .filter(|c| labels.contains(&c.label.as_str()))
        .map(|c| c.count)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_for_sums_selected_labels() {
        let counts = vec![
            LabelCount {
                label: "open".into(),
                count: 3,
            },
            LabelCount {
                label: "closed".into(),
                count: 5,
            },
        ];
        assert_eq!(total_for(&counts, &["open"]), 3);
        assert_eq!(total_for(&counts, &["open", "closed", "other"]), 8);
    }
}
