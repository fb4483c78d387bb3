//! Rows merged from one or more data responses.

use std::sync::Arc;

use eurostat_error::{EurostatError, Result};
use hashbrown::HashSet;

use crate::catalog::{GEO_DIMENSION, GEO_LEVEL_DIMENSION};
use crate::geo::classify_geo_code;
use crate::tsv::{DataLine, TsvHeader, parse_observation};

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Index of the dimension combination this observation belongs to.
    pub combination: usize,
    pub time_period: Arc<str>,
    pub value: f64,
}

/// Dimension combinations with their observations.
///
/// Built once per scan and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowTable {
    dimension_names: Vec<String>,
    combinations: Vec<Vec<String>>,
    observations: Vec<Observation>,
}

impl RowTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Names of the dimension values in each combination, in order.
    pub fn dimension_names(&self) -> &[String] {
        &self.dimension_names
    }

    pub fn combinations(&self) -> &[Vec<String>] {
        &self.combinations
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of rows, one per observation.
    pub fn num_rows(&self) -> usize {
        self.observations.len()
    }

    /// Get the dimension values for an observation.
    pub fn combination_for(&self, obs: &Observation) -> &[String] {
        &self.combinations[obs.combination]
    }
}

/// Builds a row table from response bodies, processed in request order.
#[derive(Debug)]
pub struct RowTableBuilder {
    table: RowTable,
    header: Option<TsvHeader>,
    /// Index of the geo dimension in the header when deriving geo levels.
    geo_idx: Option<usize>,
    derive_geo_level: bool,
    /// Seen (raw dimension values, time period) pairs. Only tracked when
    /// merging multiple responses.
    seen: Option<HashSet<(String, Arc<str>)>>,
}

impl RowTableBuilder {
    pub fn new(deduplicate: bool, derive_geo_level: bool) -> Self {
        RowTableBuilder {
            table: RowTable::default(),
            header: None,
            geo_idx: None,
            derive_geo_level,
            seen: deduplicate.then(HashSet::new),
        }
    }

    /// Parse a response body and add its rows.
    ///
    /// Every body must have the same dimensions as the first.
    pub fn push_body(&mut self, body: &str) -> Result<()> {
        let mut lines = body.lines().filter(|line| !line.trim().is_empty());
        let Some(header_line) = lines.next() else {
            // Nothing at all, not even a header.
            return Ok(());
        };
        let header = TsvHeader::parse(header_line)?;
        self.set_header(&header)?;

        let periods: Vec<Arc<str>> = header
            .time_periods
            .iter()
            .map(|p| Arc::from(p.as_str()))
            .collect();

        let mut new_obs: Vec<(Arc<str>, f64)> = Vec::with_capacity(periods.len());
        for line in lines {
            let line = DataLine::parse(line, &header)?;

            new_obs.clear();
            for (idx, period) in periods.iter().enumerate() {
                if let Some(seen) = self.seen.as_mut() {
                    if !seen.insert((line.raw_dimensions.to_string(), period.clone())) {
                        continue;
                    }
                }
                if let Some(value) = parse_observation(line.field(idx)) {
                    new_obs.push((period.clone(), value));
                }
            }

            if new_obs.is_empty() {
                continue;
            }

            let values = self.combination_values(&line);
            let combination = self.table.combinations.len();
            self.table.combinations.push(values);
            self.table
                .observations
                .extend(new_obs.drain(..).map(|(time_period, value)| Observation {
                    combination,
                    time_period,
                    value,
                }));
        }

        Ok(())
    }

    pub fn finish(self) -> RowTable {
        self.table
    }

    fn set_header(&mut self, header: &TsvHeader) -> Result<()> {
        match &self.header {
            Some(existing) => {
                if existing.dimensions != header.dimensions {
                    return Err(EurostatError::format(
                        "Responses have different dimensions",
                    )
                    .with_field("expected", existing.dimensions.join(","))
                    .with_field("got", header.dimensions.join(",")));
                }
            }
            None => {
                let mut names = header.dimensions.clone();
                if self.derive_geo_level {
                    self.geo_idx = names.iter().position(|n| n == GEO_DIMENSION);
                    if let Some(idx) = self.geo_idx {
                        names.insert(idx + 1, GEO_LEVEL_DIMENSION.to_string());
                    }
                }
                self.table.dimension_names = names;
                self.header = Some(header.clone());
            }
        }
        Ok(())
    }

    fn combination_values(&self, line: &DataLine<'_>) -> Vec<String> {
        let mut values: Vec<String> = line.dimension_values().map(|v| v.to_string()).collect();
        if let Some(idx) = self.geo_idx {
            let level = classify_geo_code(&values[idx]);
            values.insert(idx + 1, level.as_str().to_string());
        }
        values
    }
}
