//! `QueryableByName` rows returned by the aggregate `sql_query` statements.

use diesel::QueryableByName;
use diesel::sql_types::{BigInt, Double, Nullable, Text};

use crate::domain::stats::{LabelCount, LabelValue};

#[derive(Debug, QueryableByName)]
pub struct LabelCountRow {
    #[diesel(sql_type = Text)]
    pub label: String,
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

#[derive(Debug, QueryableByName)]
pub struct LabelValueRow {
    #[diesel(sql_type = Text)]
    pub label: String,
    #[diesel(sql_type = Nullable<Double>)]
    pub value: Option<f64>,
}

#[derive(Debug, QueryableByName)]
pub struct CountRow {
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

impl From<LabelCountRow> for LabelCount {
    fn from(row: LabelCountRow) -> Self {
        Self {
            label: row.label,
            count: row.count,
        }
    }
}

impl From<LabelValueRow> for LabelValue {
    fn from(row: LabelValueRow) -> Self {
        Self {
            label: row.label,
            value: row.value,
        }
    }
}
