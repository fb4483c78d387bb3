//! Columnar output of a scan.

use std::fmt;

use eurostat_error::{EurostatError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Utf8,
    Float64,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8 => write!(f, "Utf8"),
            Self::Float64 => write!(f, "Float64"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub datatype: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, datatype: DataType, nullable: bool) -> Self {
        Field {
            name: name.into(),
            datatype,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnSchema {
    pub fields: Vec<Field>,
}

impl ColumnSchema {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        ColumnSchema {
            fields: fields.into_iter().collect(),
        }
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Create a new schema containing only the given columns, in the given
    /// order.
    pub fn project(&self, indices: &[usize]) -> Result<ColumnSchema> {
        let fields = indices
            .iter()
            .map(|&idx| {
                self.fields.get(idx).cloned().ok_or_else(|| {
                    EurostatError::new("Projected column out of range").with_field("index", idx)
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ColumnSchema { fields })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    Utf8(Vec<String>),
    Float64(Vec<f64>),
}

impl Array {
    pub fn with_capacity(datatype: DataType, capacity: usize) -> Self {
        match datatype {
            DataType::Utf8 => Array::Utf8(Vec::with_capacity(capacity)),
            DataType::Float64 => Array::Float64(Vec::with_capacity(capacity)),
        }
    }

    pub fn datatype(&self) -> DataType {
        match self {
            Self::Utf8(_) => DataType::Utf8,
            Self::Float64(_) => DataType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Utf8(v) => v.len(),
            Self::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self) {
        match self {
            Self::Utf8(v) => v.clear(),
            Self::Float64(v) => v.clear(),
        }
    }

    /// Format the value at a row for display.
    pub fn format_value(&self, row: usize) -> Option<String> {
        match self {
            Self::Utf8(v) => v.get(row).cloned(),
            Self::Float64(v) => v.get(row).map(|f| f.to_string()),
        }
    }
}

/// A fixed capacity set of arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    arrays: Vec<Array>,
    num_rows: usize,
    capacity: usize,
}

impl Batch {
    pub fn new(datatypes: impl IntoIterator<Item = DataType>, capacity: usize) -> Self {
        let arrays = datatypes
            .into_iter()
            .map(|dt| Array::with_capacity(dt, capacity))
            .collect();
        Batch {
            arrays,
            num_rows: 0,
            capacity,
        }
    }

    pub fn arrays(&self) -> &[Array] {
        &self.arrays
    }

    pub fn arrays_mut(&mut self) -> &mut [Array] {
        &mut self.arrays
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of rows that can be written to this batch.
    pub fn write_capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_num_rows(&mut self, num_rows: usize) -> Result<()> {
        if num_rows > self.capacity {
            return Err(EurostatError::new("Number of rows exceeds batch capacity")
                .with_field("num_rows", num_rows)
                .with_field("capacity", self.capacity));
        }
        if let Some(arr) = self.arrays.iter().find(|arr| arr.len() != num_rows) {
            return Err(EurostatError::new("Array length doesn't match number of rows")
                .with_field("array_len", arr.len())
                .with_field("num_rows", num_rows));
        }
        self.num_rows = num_rows;
        Ok(())
    }

    /// Clear all arrays, keeping their capacity.
    pub fn reset(&mut self) {
        for arr in &mut self.arrays {
            arr.clear();
        }
        self.num_rows = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_schema() {
        let schema = ColumnSchema::new([
            Field::new("geo", DataType::Utf8, false),
            Field::new("time_period", DataType::Utf8, false),
            Field::new("observation_value", DataType::Float64, true),
        ]);

        let projected = schema.project(&[2, 0]).unwrap();
        assert_eq!(
            vec!["observation_value", "geo"],
            projected.field_names().collect::<Vec<_>>()
        );
        schema.project(&[3]).unwrap_err();
    }

    #[test]
    fn batch_rows() {
        let mut batch = Batch::new([DataType::Utf8, DataType::Float64], 2);
        assert_eq!(2, batch.write_capacity());

        match &mut batch.arrays_mut()[0] {
            Array::Utf8(v) => v.push("AL".to_string()),
            other => panic!("unexpected array: {other:?}"),
        }
        // Second array still empty.
        batch.set_num_rows(1).unwrap_err();

        match &mut batch.arrays_mut()[1] {
            Array::Float64(v) => v.push(1.5),
            other => panic!("unexpected array: {other:?}"),
        }
        batch.set_num_rows(1).unwrap();
        assert_eq!(Some("1.5".to_string()), batch.arrays()[1].format_value(0));

        batch.set_num_rows(3).unwrap_err();

        batch.reset();
        assert_eq!(0, batch.num_rows());
        assert!(batch.arrays()[0].is_empty());
    }
}
