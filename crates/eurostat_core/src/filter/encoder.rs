use tracing::trace;

use super::branch::FilterBranchSet;
use crate::catalog::DimensionCatalog;
use crate::predicate::{ColumnRef, ComparisonOperator, Predicate, ScalarValue};

/// Encode a predicate into filter branches.
///
/// Encoding is all or nothing. If any part of the predicate can't be
/// expressed upstream, the returned set is marked unsupported and the caller
/// must fetch everything and filter itself.
pub fn encode_predicate(predicate: &Predicate, catalog: &DimensionCatalog) -> FilterBranchSet {
    let mut encoder = FilterEncoder {
        catalog,
        set: FilterBranchSet::new(catalog),
    };
    let supported = encoder.encode(predicate);
    encoder.set.set_supported(supported);
    encoder.set
}

struct FilterEncoder<'a> {
    catalog: &'a DimensionCatalog,
    set: FilterBranchSet,
}

impl FilterEncoder<'_> {
    fn encode(&mut self, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Comparison(cmp) => self.encode_comparison(&cmp.column, cmp.op, &cmp.constant),
            Predicate::Membership(membership) => {
                self.encode_membership(&membership.column, &membership.values)
            }
            Predicate::Range(range) => self.encode_range(&range.column, &range.lower, &range.upper),
            Predicate::And(children) => {
                if children.is_empty() {
                    trace!("empty conjunction");
                    return false;
                }
                // All children write into the current branch.
                children.iter().all(|child| self.encode(child))
            }
            Predicate::Or(children) => {
                if children.is_empty() {
                    trace!("empty disjunction");
                    return false;
                }
                for child in children {
                    if !self.encode(child) {
                        return false;
                    }
                    self.set.push_branch(self.catalog);
                }
                true
            }
            Predicate::Optional(child) => match child {
                Some(child) => self.encode(child),
                None => true,
            },
        }
    }

    fn encode_comparison(
        &mut self,
        column: &ColumnRef,
        op: ComparisonOperator,
        constant: &ScalarValue,
    ) -> bool {
        let Some(literal) = constant.to_literal() else {
            trace!(%column, "null constant");
            return false;
        };
        let Some(idx) = self.catalog.index_of(&column.name) else {
            trace!(%column, "column not in catalog");
            return false;
        };

        let dim = &self.catalog.dimensions()[idx];
        if dim.is_time() {
            let branch = self.set.current_mut();
            match op {
                ComparisonOperator::GtEq => branch.start_period = Some(literal),
                ComparisonOperator::LtEq => branch.end_period = Some(literal),
                ComparisonOperator::Eq => {
                    branch.start_period = Some(literal.clone());
                    branch.end_period = Some(literal);
                }
                _ => {
                    trace!(%op, "unsupported operator on time dimension");
                    return false;
                }
            }
            return true;
        }

        if dim.is_virtual() {
            trace!(%column, "virtual dimension");
            return false;
        }
        if op != ComparisonOperator::Eq {
            trace!(%column, %op, "unsupported operator");
            return false;
        }

        self.set.current_mut().push_value(idx, literal)
    }

    fn encode_membership(&mut self, column: &ColumnRef, values: &[ScalarValue]) -> bool {
        if values.is_empty() {
            return false;
        }

        let is_time = self
            .catalog
            .find(&column.name)
            .map(|dim| dim.is_time())
            .unwrap_or(false);
        // Upstream only accepts a single time value or a range.
        if is_time && values.len() > 1 {
            trace!(%column, "membership with multiple time values");
            return false;
        }

        values
            .iter()
            .all(|value| self.encode_comparison(column, ComparisonOperator::Eq, value))
    }

    fn encode_range(&mut self, column: &ColumnRef, lower: &ScalarValue, upper: &ScalarValue) -> bool {
        let is_time = self
            .catalog
            .find(&column.name)
            .map(|dim| dim.is_time())
            .unwrap_or(false);
        if !is_time {
            trace!(%column, "range on non-time dimension");
            return false;
        }

        let (Some(lower), Some(upper)) = (lower.to_literal(), upper.to_literal()) else {
            trace!(%column, "null range bound");
            return false;
        };

        let branch = self.set.current_mut();
        branch.start_period = Some(lower);
        branch.end_period = Some(upper);
        true
    }
}
