use eurostat_error::{EurostatError, Result};

use crate::batch::ColumnSchema;

/// Scan projections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projections {
    /// Column indices to project out of the scan.
    ///
    /// If None, project all columns.
    pub column_indices: Option<Vec<usize>>,
}

impl Projections {
    pub const fn all() -> Self {
        Projections {
            column_indices: None,
        }
    }

    pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
        Projections {
            column_indices: Some(indices.into_iter().collect()),
        }
    }

    /// Create projections from column names.
    ///
    /// Errors with an input error if a name isn't in the schema.
    pub fn from_names<S: AsRef<str>>(schema: &ColumnSchema, names: &[S]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                schema.index_of(name).ok_or_else(|| {
                    EurostatError::invalid_input("Unknown column").with_field("column", name)
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Projections::new(indices))
    }

    /// Resolve to concrete column indices for a schema.
    pub fn indices(&self, schema: &ColumnSchema) -> Result<Vec<usize>> {
        match &self.column_indices {
            Some(indices) => {
                if let Some(idx) = indices.iter().find(|&&idx| idx >= schema.num_fields()) {
                    return Err(EurostatError::invalid_input("Projected column out of range")
                        .with_field("index", idx)
                        .with_field("num_columns", schema.num_fields()));
                }
                Ok(indices.clone())
            }
            None => Ok((0..schema.num_fields()).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{DataType, Field};

    fn schema() -> ColumnSchema {
        ColumnSchema::new([
            Field::new("geo", DataType::Utf8, false),
            Field::new("time_period", DataType::Utf8, false),
            Field::new("observation_value", DataType::Float64, true),
        ])
    }

    #[test]
    fn all_columns() {
        assert_eq!(vec![0, 1, 2], Projections::all().indices(&schema()).unwrap());
    }

    #[test]
    fn from_names() {
        let projections = Projections::from_names(&schema(), &["observation_value", "geo"]).unwrap();
        assert_eq!(vec![2, 0], projections.indices(&schema()).unwrap());

        Projections::from_names(&schema(), &["nope"]).unwrap_err();
    }

    #[test]
    fn out_of_range() {
        Projections::new([0, 5]).indices(&schema()).unwrap_err();
    }
}
