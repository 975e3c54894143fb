//! Aggregate engine: Count/Sum/Average/Max/Min over a column
//!
//! Pure, read-only folds. Only numeric rows (Integer, BigInteger, Decimal)
//! take part in Sum/Average/Max/Min; text, booleans and empty rows are
//! skipped. Max and Min seed from the first numeric value, never from 0.

use std::fmt;

use crate::error::{CqlError, CqlResult};
use crate::table::Column;
use crate::value::Value;

/// Aggregate functions addressable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Average,
    Max,
    Min,
}

impl Aggregate {
    pub fn name(self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Average => "AVG",
            Aggregate::Max => "MAX",
            Aggregate::Min => "MIN",
        }
    }

    /// Evaluate over `column`. Count is widened to f64.
    pub fn apply(self, column: &Column) -> CqlResult<f64> {
        match self {
            Aggregate::Count => Ok(count(column) as f64),
            Aggregate::Sum => Ok(sum(column)),
            Aggregate::Average => average(column),
            Aggregate::Max => max(column),
            Aggregate::Min => min(column),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn numeric_values(column: &Column) -> impl Iterator<Item = f64> + '_ {
    column.rows().filter_map(|r| r.value().and_then(Value::as_f64))
}

fn empty(column: &Column, function: Aggregate) -> CqlError {
    CqlError::EmptyAggregate {
        column: column.name().to_string(),
        function: function.name(),
    }
}

/// Rows currently stored, numeric or not.
pub fn count(column: &Column) -> usize {
    column.len()
}

/// Rows whose value satisfies `predicate`. Empty rows never match.
pub fn count_where<P>(column: &Column, mut predicate: P) -> usize
where
    P: FnMut(&Value) -> bool,
{
    column
        .rows()
        .filter(|r| r.value().is_some_and(&mut predicate))
        .count()
}

/// Sum of the numeric rows; 0.0 for a column without any.
pub fn sum(column: &Column) -> f64 {
    numeric_values(column).sum()
}

/// Sum divided by the number of numeric rows.
pub fn average(column: &Column) -> CqlResult<f64> {
    let (total, n) = numeric_values(column).fold((0.0, 0u64), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        return Err(empty(column, Aggregate::Average));
    }
    Ok(total / n as f64)
}

pub fn max(column: &Column) -> CqlResult<f64> {
    numeric_values(column)
        .reduce(f64::max)
        .ok_or_else(|| empty(column, Aggregate::Max))
}

pub fn min(column: &Column) -> CqlResult<f64> {
    numeric_values(column)
        .reduce(f64::min)
        .ok_or_else(|| empty(column, Aggregate::Min))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::table::Table;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn column_of(values: Vec<Option<Value>>) -> Column {
        let mut rng = StdRng::seed_from_u64(5);
        let config = Config::default();
        let mut table = Table::new("t");
        table.insert_column(&mut rng, &config, Column::new("c")).unwrap();
        for v in values {
            table.add_row(&mut rng, &config, "c", v).unwrap();
        }
        table.column("c").unwrap().clone()
    }

    fn ints(values: &[i32]) -> Column {
        column_of(values.iter().map(|v| Some(Value::Integer(*v))).collect())
    }

    #[test]
    fn test_mixed_signs() {
        let col = ints(&[30, -5, 12]);
        assert_eq!(count(&col), 3);
        assert_eq!(sum(&col), 37.0);
        assert!((average(&col).unwrap() - 37.0 / 3.0).abs() < 1e-12);
        assert_eq!(max(&col).unwrap(), 30.0);
        assert_eq!(min(&col).unwrap(), -5.0);
    }

    #[test]
    fn test_all_negative_max_is_not_zero() {
        let col = ints(&[-30, -5, -12]);
        assert_eq!(max(&col).unwrap(), -5.0);
        assert_eq!(min(&col).unwrap(), -30.0);
    }

    #[test]
    fn test_all_positive_min_is_not_zero() {
        let col = ints(&[7, 3, 9]);
        assert_eq!(min(&col).unwrap(), 3.0);
    }

    #[test]
    fn test_non_numeric_rows_are_skipped() {
        let col = column_of(vec![
            Some(Value::Text("n/a".into())),
            Some(Value::Decimal(2.5)),
            Some(Value::Boolean(true)),
            None,
            Some(Value::BigInteger(10)),
        ]);
        assert_eq!(count(&col), 5);
        assert_eq!(sum(&col), 12.5);
        assert_eq!(average(&col).unwrap(), 6.25);
        assert_eq!(max(&col).unwrap(), 10.0);
        assert_eq!(min(&col).unwrap(), 2.5);
    }

    #[test]
    fn test_empty_aggregate() {
        for col in [column_of(vec![]), column_of(vec![Some(Value::Text("x".into()))])] {
            assert_eq!(sum(&col), 0.0);
            assert!(matches!(average(&col), Err(CqlError::EmptyAggregate { function: "AVG", .. })));
            assert!(matches!(max(&col), Err(CqlError::EmptyAggregate { function: "MAX", .. })));
            assert!(matches!(min(&col), Err(CqlError::EmptyAggregate { function: "MIN", .. })));
        }
    }

    #[test]
    fn test_count_where() {
        let col = column_of(vec![
            Some(Value::Integer(1)),
            Some(Value::Text("a".into())),
            None,
            Some(Value::Integer(4)),
        ]);
        assert_eq!(count_where(&col, Value::is_numeric), 2);
        assert_eq!(count_where(&col, |v| v.as_text().is_ok()), 1);
    }

    #[test]
    fn test_apply_dispatch() {
        let col = ints(&[2, 4]);
        assert_eq!(Aggregate::Count.apply(&col).unwrap(), 2.0);
        assert_eq!(Aggregate::Sum.apply(&col).unwrap(), 6.0);
        assert_eq!(Aggregate::Average.apply(&col).unwrap(), 3.0);
        assert_eq!(Aggregate::Max.apply(&col).unwrap(), 4.0);
        assert_eq!(Aggregate::Min.apply(&col).unwrap(), 2.0);
    }
}
