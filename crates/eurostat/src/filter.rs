//! Filter expressions given on the command line.
//!
//! Supported forms:
//!
//! - `dim=v` equality
//! - `dim=v1,v2` membership
//! - `dim=a..b` inclusive range
//! - `dim!=v`, `dim>v`, `dim>=v`, `dim<v`, `dim<=v` comparisons
//!
//! Expressions are evaluated locally against every scanned row as well. Only
//! part of a predicate may be pushed down, so rows are always filtered again
//! before output.

use std::cmp::Ordering;

use eurostat_core::batch::{Array, Batch, ColumnSchema};
use eurostat_core::predicate::{ComparisonOperator, Predicate, ScalarValue, and, col, or};
use eurostat_error::{EurostatError, Result};

/// Parse a single filter expression.
pub fn parse_filter(expr: &str) -> Result<Predicate> {
    let invalid = |msg: &str| EurostatError::invalid_input(msg.to_string()).with_field("filter", expr);

    let op_start = expr
        .find(['=', '<', '>', '!'])
        .ok_or_else(|| invalid("Missing operator in filter"))?;

    let name = expr[..op_start].trim().to_lowercase();
    if name.is_empty() {
        return Err(invalid("Missing column name in filter"));
    }

    let rest = &expr[op_start..];
    let (op, value) = [
        (">=", ComparisonOperator::GtEq),
        ("<=", ComparisonOperator::LtEq),
        ("!=", ComparisonOperator::NotEq),
        ("=", ComparisonOperator::Eq),
        (">", ComparisonOperator::Gt),
        ("<", ComparisonOperator::Lt),
    ]
    .into_iter()
    .find_map(|(s, op)| rest.strip_prefix(s).map(|value| (op, value.trim())))
    .ok_or_else(|| invalid("Unknown operator in filter"))?;

    if value.is_empty() {
        return Err(invalid("Missing value in filter"));
    }

    if op != ComparisonOperator::Eq {
        return Ok(col(name).cmp(op, value));
    }

    if let Some((lower, upper)) = value.split_once("..") {
        let (lower, upper) = (lower.trim(), upper.trim());
        if lower.is_empty() || upper.is_empty() {
            return Err(invalid("Range filter requires both bounds"));
        }
        return Ok(col(name).between(lower, upper));
    }

    if value.contains(',') {
        let values: Vec<_> = value
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        return Ok(col(name).in_list(values));
    }

    Ok(col(name).eq(value))
}

/// Combine filter expressions into a single predicate.
///
/// Filters are AND-ed, or OR-ed if `any` is set. Returns `None` if there are
/// no filters.
pub fn build_predicate(filters: &[String], any: bool) -> Result<Option<Predicate>> {
    let mut predicates = filters
        .iter()
        .map(|f| parse_filter(f))
        .collect::<Result<Vec<_>>>()?;

    let predicate = match predicates.len() {
        0 => None,
        1 => predicates.pop(),
        _ if any => Some(or(predicates)),
        _ => Some(and(predicates)),
    };

    Ok(predicate)
}

/// A single value in a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Utf8(&'a str),
    Float64(f64),
}

/// Check if a row of a batch matches the predicate.
///
/// Columns not in the schema never match.
pub fn row_matches(predicate: &Predicate, schema: &ColumnSchema, batch: &Batch, row: usize) -> bool {
    evaluate(predicate, &|name: &str| {
        let idx = schema.index_of(name)?;
        match batch.arrays().get(idx)? {
            Array::Utf8(values) => values.get(row).map(|v| Cell::Utf8(v)),
            Array::Float64(values) => values.get(row).map(|v| Cell::Float64(*v)),
        }
    })
}

fn evaluate<'a>(predicate: &Predicate, lookup: &dyn Fn(&str) -> Option<Cell<'a>>) -> bool {
    match predicate {
        Predicate::Comparison(cmp) => {
            let Some(ord) = lookup(&cmp.column.name).and_then(|cell| compare(cell, &cmp.constant))
            else {
                return false;
            };
            match cmp.op {
                ComparisonOperator::Eq => ord == Ordering::Equal,
                ComparisonOperator::NotEq => ord != Ordering::Equal,
                ComparisonOperator::Lt => ord == Ordering::Less,
                ComparisonOperator::LtEq => ord != Ordering::Greater,
                ComparisonOperator::Gt => ord == Ordering::Greater,
                ComparisonOperator::GtEq => ord != Ordering::Less,
            }
        }
        Predicate::Membership(membership) => match lookup(&membership.column.name) {
            Some(cell) => membership
                .values
                .iter()
                .any(|v| compare(cell, v) == Some(Ordering::Equal)),
            None => false,
        },
        Predicate::Range(range) => match lookup(&range.column.name) {
            Some(cell) => {
                matches!(compare(cell, &range.lower), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare(cell, &range.upper), Some(Ordering::Less | Ordering::Equal))
            }
            None => false,
        },
        Predicate::And(children) => children.iter().all(|child| evaluate(child, lookup)),
        Predicate::Or(children) => children.iter().any(|child| evaluate(child, lookup)),
        Predicate::Optional(Some(child)) => evaluate(child, lookup),
        Predicate::Optional(None) => true,
    }
}

/// Compare a cell to a constant, `None` if they're not comparable.
///
/// Strings compare lexicographically, which orders time periods of the same
/// frequency correctly.
fn compare(cell: Cell<'_>, constant: &ScalarValue) -> Option<Ordering> {
    match (cell, constant) {
        (_, ScalarValue::Null) => None,
        (Cell::Float64(v), ScalarValue::Float64(c)) => v.partial_cmp(c),
        (Cell::Float64(v), ScalarValue::Int64(c)) => v.partial_cmp(&(*c as f64)),
        (Cell::Float64(v), ScalarValue::Utf8(c)) => v.partial_cmp(&c.parse::<f64>().ok()?),
        (Cell::Float64(_), ScalarValue::Boolean(_)) => None,
        (Cell::Utf8(v), c) => Some(v.cmp(c.to_literal()?.as_str())),
    }
}
