//! Predicate trees handed to a scan for pushdown.

use std::fmt;

/// A single constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// Missing constant. Never pushed down.
    Null,

    /// True or false value
    Boolean(bool),

    /// Signed 64bit int
    Int64(i64),

    /// 64bit float
    Float64(f64),

    /// Utf-8 encoded string.
    Utf8(String),
}

impl ScalarValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Get the literal text for this value as it would appear in a request,
    /// `None` if the value is null.
    pub fn to_literal(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Boolean(v) => Some(v.to_string()),
            Self::Int64(v) => Some(v.to_string()),
            Self::Float64(v) => Some(v.to_string()),
            Self::Utf8(v) => Some(v.clone()),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "'{v}'"),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int64(value as i64)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => ScalarValue::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::NotEq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::LtEq => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::GtEq => write!(f, ">="),
        }
    }
}

/// Reference to a column (dimension) by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub name: String,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Create a column reference.
pub fn col(name: impl Into<String>) -> ColumnRef {
    ColumnRef { name: name.into() }
}

impl ColumnRef {
    pub fn cmp(self, op: ComparisonOperator, constant: impl Into<ScalarValue>) -> Predicate {
        Predicate::Comparison(ComparisonPredicate {
            column: self,
            op,
            constant: constant.into(),
        })
    }

    pub fn eq(self, constant: impl Into<ScalarValue>) -> Predicate {
        self.cmp(ComparisonOperator::Eq, constant)
    }

    pub fn gt_eq(self, constant: impl Into<ScalarValue>) -> Predicate {
        self.cmp(ComparisonOperator::GtEq, constant)
    }

    pub fn lt_eq(self, constant: impl Into<ScalarValue>) -> Predicate {
        self.cmp(ComparisonOperator::LtEq, constant)
    }

    pub fn in_list<V: Into<ScalarValue>>(self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::Membership(MembershipPredicate {
            column: self,
            values: values.into_iter().map(|v| v.into()).collect(),
        })
    }

    pub fn between(
        self,
        lower: impl Into<ScalarValue>,
        upper: impl Into<ScalarValue>,
    ) -> Predicate {
        Predicate::Range(RangePredicate {
            column: self,
            lower: lower.into(),
            upper: upper.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPredicate {
    pub column: ColumnRef,
    pub op: ComparisonOperator,
    pub constant: ScalarValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MembershipPredicate {
    pub column: ColumnRef,
    pub values: Vec<ScalarValue>,
}

/// Inclusive range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangePredicate {
    pub column: ColumnRef,
    pub lower: ScalarValue,
    pub upper: ScalarValue,
}

/// A filter over the rows of a dataset.
///
/// `And` and `Or` with no children are invalid, they never match everything
/// or nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison(ComparisonPredicate),
    Membership(MembershipPredicate),
    Range(RangePredicate),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    /// Transparently unwraps to the child if present, matches everything
    /// otherwise.
    Optional(Option<Box<Predicate>>),
}

pub fn and(children: impl IntoIterator<Item = Predicate>) -> Predicate {
    Predicate::And(children.into_iter().collect())
}

pub fn or(children: impl IntoIterator<Item = Predicate>) -> Predicate {
    Predicate::Or(children.into_iter().collect())
}

pub fn optional(child: Option<Predicate>) -> Predicate {
    Predicate::Optional(child.map(Box::new))
}

impl Predicate {
    /// Get all columns referenced by this predicate, in the order they're
    /// first encountered.
    pub fn column_refs(&self) -> Vec<&ColumnRef> {
        let mut refs = Vec::new();
        self.collect_column_refs(&mut refs);
        refs
    }

    fn collect_column_refs<'a>(&'a self, refs: &mut Vec<&'a ColumnRef>) {
        let column = match self {
            Self::Comparison(cmp) => &cmp.column,
            Self::Membership(membership) => &membership.column,
            Self::Range(range) => &range.column,
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_column_refs(refs);
                }
                return;
            }
            Self::Optional(child) => {
                if let Some(child) = child {
                    child.collect_column_refs(refs);
                }
                return;
            }
        };

        if !refs.contains(&column) {
            refs.push(column);
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_children(
            f: &mut fmt::Formatter<'_>,
            children: &[Predicate],
            sep: &str,
        ) -> fmt::Result {
            write!(f, "(")?;
            for (idx, child) in children.iter().enumerate() {
                if idx > 0 {
                    write!(f, " {sep} ")?;
                }
                write!(f, "{child}")?;
            }
            write!(f, ")")
        }

        match self {
            Self::Comparison(cmp) => write!(f, "{} {} {}", cmp.column, cmp.op, cmp.constant),
            Self::Membership(membership) => {
                write!(f, "{} IN (", membership.column)?;
                for (idx, value) in membership.values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            Self::Range(range) => write!(
                f,
                "{} BETWEEN {} AND {}",
                range.column, range.lower, range.upper
            ),
            Self::And(children) => write_children(f, children, "AND"),
            Self::Or(children) => write_children(f, children, "OR"),
            Self::Optional(Some(child)) => write!(f, "{child}"),
            Self::Optional(None) => write!(f, "TRUE"),
        }
    }
}
