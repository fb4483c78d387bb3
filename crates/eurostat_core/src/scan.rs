//! Table scan over a dataset.
//!
//! A scan goes through three states, mirroring how table functions are
//! driven by an executor:
//!
//! 1. Bind: resolve the endpoint and catalog, produce the output schema.
//! 2. Operator: validate and push down the predicate, pick projected columns.
//! 3. Partition: fetch the data once, then page through it with `poll_pull`.

use eurostat_error::{EurostatError, Result};
use eurostat_http::client::HttpClient;
use tracing::debug;

use crate::batch::{Array, Batch, ColumnSchema, DataType, Field};
use crate::catalog::{CatalogProvider, DimensionCatalog, TIME_PERIOD_DIMENSION};
use crate::config::EurostatConfig;
use crate::fetch::{DataSource, fetch_and_merge};
use crate::filter::EncodedFilters;
use crate::predicate::Predicate;
use crate::projections::Projections;
use crate::table::RowTable;

pub const FUNCTION_NAME: &str = "read_eurostat";

pub const OBSERVATION_VALUE_COLUMN: &str = "observation_value";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPull {
    /// Batch was pulled, keep pulling for more batches.
    HasMore,
    /// Source is exhausted.
    ///
    /// Output batch may still contain rows.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct EurostatScanBindState {
    source: DataSource,
    catalog: DimensionCatalog,
    schema: ColumnSchema,
}

/// Bind a scan to a dataset.
///
/// Input is validated before the catalog is looked up, so an empty or unknown
/// provider never results in a request.
pub async fn bind_scan<P: CatalogProvider>(
    catalogs: &P,
    provider_id: &str,
    dataset_id: &str,
) -> Result<EurostatScanBindState> {
    if provider_id.is_empty() {
        return Err(EurostatError::invalid_input(format!(
            "{FUNCTION_NAME}: first parameter, the 'provider' identifier, cannot be empty"
        )));
    }
    if dataset_id.is_empty() {
        return Err(EurostatError::invalid_input(format!(
            "{FUNCTION_NAME}: second parameter, the 'dataset' identifier, cannot be empty"
        )));
    }

    let source = DataSource::try_new(provider_id, dataset_id)?;
    let catalog = catalogs.lookup_catalog(provider_id, dataset_id).await?;
    let schema = scan_schema(&catalog);

    debug!(%provider_id, %dataset_id, columns = schema.num_fields(), "bound scan");

    Ok(EurostatScanBindState {
        source,
        catalog,
        schema,
    })
}

/// Output schema for a catalog.
///
/// Every non-time dimension in catalog order, then the time period and the
/// observation value.
pub fn scan_schema(catalog: &DimensionCatalog) -> ColumnSchema {
    let dims = catalog
        .dimensions()
        .iter()
        .filter(|dim| !dim.is_time())
        .map(|dim| Field::new(dim.name.clone(), DataType::Utf8, false));

    ColumnSchema::new(dims.chain([
        Field::new(TIME_PERIOD_DIMENSION, DataType::Utf8, false),
        Field::new(OBSERVATION_VALUE_COLUMN, DataType::Float64, false),
    ]))
}

impl EurostatScanBindState {
    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn catalog(&self) -> &DimensionCatalog {
        &self.catalog
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Create the operator state for a scan with an optional predicate.
    ///
    /// Errors with an input error if the predicate references a column not in
    /// the schema. A predicate that can't be pushed down isn't an error, see
    /// [`EurostatScanOperatorState::filters_pushed_down`].
    pub fn create_operator_state(
        &self,
        predicate: Option<&Predicate>,
        projections: &Projections,
    ) -> Result<EurostatScanOperatorState> {
        let filters = match predicate {
            Some(predicate) => {
                if let Some(col) = predicate
                    .column_refs()
                    .into_iter()
                    .find(|col| self.schema.index_of(&col.name).is_none())
                {
                    return Err(EurostatError::invalid_input("Unknown column in predicate")
                        .with_field("column", col)
                        .with_field("dataset", &self.source.dataset_id));
                }
                EncodedFilters::from_predicate(predicate, &self.catalog)
            }
            None => EncodedFilters::unsupported(),
        };

        let projections = projections.indices(&self.schema)?;
        let output_schema = self.schema.project(&projections)?;

        Ok(EurostatScanOperatorState {
            source: self.source.clone(),
            filters,
            output_schema,
            derive_geo_level: self.catalog.has_geo_level(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct EurostatScanOperatorState {
    source: DataSource,
    filters: EncodedFilters,
    output_schema: ColumnSchema,
    derive_geo_level: bool,
}

impl EurostatScanOperatorState {
    /// If the predicate was fully pushed down. If false, every row of the
    /// dataset is returned and the caller needs to filter.
    pub fn filters_pushed_down(&self) -> bool {
        self.filters.is_supported()
    }

    pub fn filters(&self) -> &EncodedFilters {
        &self.filters
    }

    pub fn output_schema(&self) -> &ColumnSchema {
        &self.output_schema
    }

    /// Urls that will be requested on execute.
    pub fn query_urls(&self) -> Vec<String> {
        self.source.query_urls(self.filters.queries())
    }

    /// Create an output batch matching the projected schema.
    pub fn create_batch(&self, capacity: usize) -> Batch {
        Batch::new(self.output_schema.fields.iter().map(|f| f.datatype), capacity)
    }

    /// Fetch the data.
    pub async fn create_partition_state<C: HttpClient>(
        &self,
        client: &C,
        config: &EurostatConfig,
    ) -> Result<EurostatScanPartitionState> {
        let options = config.fetch_options(self.derive_geo_level);
        let table =
            fetch_and_merge(client, &self.source, self.filters.queries(), &options).await?;

        let sources = if table.num_rows() == 0 {
            Vec::new()
        } else {
            self.output_schema
                .fields
                .iter()
                .map(|field| ColumnSource::resolve(&field.name, &table))
                .collect::<Result<Vec<_>>>()
                .map_err(|e| {
                    e.with_field("provider", &self.source.provider_id)
                        .with_field("dataset", &self.source.dataset_id)
                })?
        };

        Ok(EurostatScanPartitionState {
            table,
            sources,
            offset: 0,
        })
    }
}

/// Where the values of an output column come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnSource {
    /// Index into a dimension combination.
    Dimension(usize),
    TimePeriod,
    Value,
}

impl ColumnSource {
    fn resolve(name: &str, table: &RowTable) -> Result<Self> {
        match name {
            TIME_PERIOD_DIMENSION => Ok(ColumnSource::TimePeriod),
            OBSERVATION_VALUE_COLUMN => Ok(ColumnSource::Value),
            _ => table
                .dimension_names()
                .iter()
                .position(|n| n == name)
                .map(ColumnSource::Dimension)
                .ok_or_else(|| {
                    EurostatError::format("Response is missing a dimension")
                        .with_field("dimension", name)
                }),
        }
    }
}

#[derive(Debug)]
pub struct EurostatScanPartitionState {
    table: RowTable,
    sources: Vec<ColumnSource>,
    offset: usize,
}

impl EurostatScanPartitionState {
    /// Exact number of rows this scan produces.
    pub fn cardinality(&self) -> usize {
        self.table.num_rows()
    }

    /// Write the next rows to the output batch.
    ///
    /// The batch must have been created for the projected schema. The number
    /// of rows written won't exceed the write capacity of the batch.
    pub fn poll_pull(&mut self, output: &mut Batch) -> Result<PollPull> {
        output.reset();

        let cap = output.write_capacity();
        let remaining = self.table.num_rows() - self.offset;
        if cap == 0 && remaining > 0 {
            return Err(EurostatError::new("Output batch has no write capacity")
                .with_field("remaining", remaining));
        }
        let count = usize::min(cap, remaining);
        let observations = &self.table.observations()[self.offset..self.offset + count];

        if count > 0 {
            if output.arrays().len() != self.sources.len() {
                return Err(EurostatError::new("Output batch doesn't match projections")
                    .with_field("expected", self.sources.len())
                    .with_field("got", output.arrays().len()));
            }

            for (array, source) in output.arrays_mut().iter_mut().zip(&self.sources) {
                match (array, source) {
                    (Array::Utf8(values), ColumnSource::Dimension(idx)) => values.extend(
                        observations
                            .iter()
                            .map(|obs| self.table.combination_for(obs)[*idx].clone()),
                    ),
                    (Array::Utf8(values), ColumnSource::TimePeriod) => {
                        values.extend(observations.iter().map(|obs| obs.time_period.to_string()))
                    }
                    (Array::Float64(values), ColumnSource::Value) => {
                        values.extend(observations.iter().map(|obs| obs.value))
                    }
                    (array, source) => {
                        return Err(EurostatError::new("Unexpected array type for column")
                            .with_field("datatype", array.datatype())
                            .with_field("source", format!("{source:?}")));
                    }
                }
            }
        }

        self.offset += count;
        output.set_num_rows(count)?;

        if self.offset >= self.table.num_rows() {
            Ok(PollPull::Exhausted)
        } else {
            Ok(PollPull::HasMore)
        }
    }
}
