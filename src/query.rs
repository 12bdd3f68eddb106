//! Parameterized `WHERE` clause construction for aggregate queries.
//!
//! Dashboards and reports run hand-written `GROUP BY` statements through
//! [`diesel::sql_query`]. Their optional filters are collected here as
//! `(column, operator, value)` triples, rendered with `?` placeholders and
//! bound in order. Every clause starts from the tenant condition, so a query
//! built with [`WhereClause::scoped`] cannot leak rows of another company.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{BigInt, Bool, Date, Double, Integer, Text, Timestamp};
use diesel::sqlite::Sqlite;
use serde::{Deserialize, Serialize};

use crate::domain::types::CompanyId;

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i32),
    BigInt(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::BigInt(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::DateTime(value)
    }
}

/// Comparison operator of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl Op {
    fn as_sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::NotEq => "<>",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone)]
enum Condition {
    Compare {
        column: &'static str,
        op: Op,
        value: SqlValue,
    },
    AnyLike {
        columns: Vec<&'static str>,
        pattern: String,
    },
    Raw(&'static str),
}

/// Inclusive calendar date range parsed from `date_from` / `date_to`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Parses optional `YYYY-MM-DD` strings, ignoring blank or malformed input.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Self {
        let parse = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
        };
        Self {
            from: parse(from),
            to: parse(to),
        }
    }

    /// A range where `from` is after `to` can never match anything.
    pub fn is_inverted(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }

    /// Lower bound as a timestamp at midnight.
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.from.map(|d| d.and_time(NaiveTime::MIN))
    }

    /// Exclusive upper bound: midnight of the day after `to`.
    pub fn end_exclusive(&self) -> Option<NaiveDateTime> {
        self.to
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .map(|d| d.and_time(NaiveTime::MIN))
    }
}

/// Ordered list of conditions joined with `AND`.
#[derive(Debug, Clone)]
pub struct WhereClause {
    conditions: Vec<Condition>,
}

impl WhereClause {
    /// Starts a clause restricted to one company.
    pub fn scoped(column: &'static str, company_id: CompanyId) -> Self {
        Self {
            conditions: vec![Condition::Compare {
                column,
                op: Op::Eq,
                value: SqlValue::Int(company_id.get()),
            }],
        }
    }

    pub fn and(mut self, column: &'static str, op: Op, value: impl Into<SqlValue>) -> Self {
        self.conditions.push(Condition::Compare {
            column,
            op,
            value: value.into(),
        });
        self
    }

    /// Adds the condition only when a value is present.
    pub fn and_opt<V: Into<SqlValue>>(self, column: &'static str, op: Op, value: Option<V>) -> Self {
        match value {
            Some(value) => self.and(column, op, value),
            None => self,
        }
    }

    /// Adds a fixed SQL fragment such as `status <> 'cancelled'`.
    pub fn and_raw(mut self, fragment: &'static str) -> Self {
        self.conditions.push(Condition::Raw(fragment));
        self
    }

    /// Matches `%term%` against any of the columns. Blank terms are ignored.
    pub fn search(mut self, columns: &[&'static str], term: Option<&str>) -> Self {
        let term = term.map(str::trim).filter(|t| !t.is_empty());
        if let Some(term) = term.filter(|_| !columns.is_empty()) {
            self.conditions.push(Condition::AnyLike {
                columns: columns.to_vec(),
                pattern: format!("%{term}%"),
            });
        }
        self
    }

    /// Restricts a timestamp column to the calendar days of `range`.
    pub fn date_range(self, column: &'static str, range: &DateRange) -> Self {
        self.and_opt(column, Op::Gte, range.start())
            .and_opt(column, Op::Lt, range.end_exclusive())
    }

    /// Restricts a `DATE` column to the inclusive range.
    pub fn day_range(self, column: &'static str, range: &DateRange) -> Self {
        self.and_opt(column, Op::Gte, range.from)
            .and_opt(column, Op::Lte, range.to)
    }

    /// Renders ` WHERE a = ? AND ...` (empty when there are no conditions).
    pub fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            return String::new();
        }
        let parts = self
            .conditions
            .iter()
            .map(|condition| match condition {
                Condition::Compare { column, op, .. } => format!("{column} {} ?", op.as_sql()),
                Condition::AnyLike { columns, .. } => {
                    let ors = columns
                        .iter()
                        .map(|column| format!("{column} LIKE ?"))
                        .collect::<Vec<_>>()
                        .join(" OR ");
                    format!("({ors})")
                }
                Condition::Raw(fragment) => (*fragment).to_string(),
            })
            .collect::<Vec<_>>();
        format!(" WHERE {}", parts.join(" AND "))
    }

    /// Values in placeholder order.
    pub fn binds(&self) -> Vec<SqlValue> {
        let mut values = Vec::new();
        for condition in &self.conditions {
            match condition {
                Condition::Compare { value, .. } => values.push(value.clone()),
                Condition::AnyLike { columns, pattern } => {
                    values.extend(columns.iter().map(|_| SqlValue::Text(pattern.clone())));
                }
                Condition::Raw(_) => {}
            }
        }
        values
    }

    /// Builds `prefix WHERE ... suffix` with every value bound.
    pub fn query(&self, prefix: &str, suffix: &str) -> BoxedSqlQuery<'static, Sqlite, SqlQuery> {
        let sql = format!("{prefix}{}{suffix}", self.to_sql());
        self.binds()
            .into_iter()
            .fold(diesel::sql_query(sql).into_boxed::<Sqlite>(), bind_value)
    }
}

fn bind_value(
    query: BoxedSqlQuery<'static, Sqlite, SqlQuery>,
    value: SqlValue,
) -> BoxedSqlQuery<'static, Sqlite, SqlQuery> {
    match value {
        SqlValue::Int(v) => query.bind::<Integer, _>(v),
        SqlValue::BigInt(v) => query.bind::<BigInt, _>(v),
        SqlValue::Float(v) => query.bind::<Double, _>(v),
        SqlValue::Text(v) => query.bind::<Text, _>(v),
        SqlValue::Bool(v) => query.bind::<Bool, _>(v),
        SqlValue::Date(v) => query.bind::<Date, _>(v),
        SqlValue::DateTime(v) => query.bind::<Timestamp, _>(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company() -> CompanyId {
        CompanyId::new(7).expect("valid company id")
    }

    #[test]
    fn scoped_clause_always_filters_by_company() {
        let clause = WhereClause::scoped("company_id", company());
        assert_eq!(clause.to_sql(), " WHERE company_id = ?");
        assert_eq!(clause.binds(), vec![SqlValue::Int(7)]);
    }

    #[test]
    fn optional_filters_are_skipped_when_absent() {
        let clause = WhereClause::scoped("w.company_id", company())
            .and_opt::<String>("w.status", Op::Eq, None)
            .and_opt("w.category", Op::Eq, Some("tools"));
        assert_eq!(
            clause.to_sql(),
            " WHERE w.company_id = ? AND w.category = ?"
        );
        assert_eq!(
            clause.binds(),
            vec![SqlValue::Int(7), SqlValue::Text("tools".into())]
        );
    }

    #[test]
    fn search_expands_to_grouped_or() {
        let clause =
            WhereClause::scoped("company_id", company()).search(&["name", "email"], Some(" acme "));
        assert_eq!(
            clause.to_sql(),
            " WHERE company_id = ? AND (name LIKE ? OR email LIKE ?)"
        );
        assert_eq!(
            clause.binds(),
            vec![
                SqlValue::Int(7),
                SqlValue::Text("%acme%".into()),
                SqlValue::Text("%acme%".into())
            ]
        );
    }

    #[test]
    fn blank_search_is_ignored() {
        let clause = WhereClause::scoped("company_id", company()).search(&["name"], Some("   "));
        assert_eq!(clause.binds().len(), 1);
    }

    #[test]
    fn date_range_uses_exclusive_next_day_bound() {
        let range = DateRange::parse(Some("2025-03-01"), Some("2025-03-31"));
        let clause = WhereClause::scoped("company_id", company()).date_range("created_at", &range);
        assert_eq!(
            clause.to_sql(),
            " WHERE company_id = ? AND created_at >= ? AND created_at < ?"
        );
        let binds = clause.binds();
        assert_eq!(
            binds[2],
            SqlValue::DateTime(
                NaiveDate::from_ymd_opt(2025, 4, 1)
                    .unwrap()
                    .and_time(NaiveTime::MIN)
            )
        );
    }

    #[test]
    fn malformed_dates_are_ignored() {
        let range = DateRange::parse(Some("yesterday"), Some(""));
        assert_eq!(range, DateRange::default());
    }

    #[test]
    fn inverted_range_is_detected() {
        let range = DateRange::parse(Some("2025-05-02"), Some("2025-05-01"));
        assert!(range.is_inverted());
    }

    #[test]
    fn raw_fragments_have_no_binds() {
        let clause =
            WhereClause::scoped("company_id", company()).and_raw("status <> 'cancelled'");
        assert_eq!(
            clause.to_sql(),
            " WHERE company_id = ? AND status <> 'cancelled'"
        );
        assert_eq!(clause.binds().len(), 1);
    }
}
