//! Fetching data and merging responses into a single table.

use eurostat_error::Result;
use eurostat_http::client::HttpClient;
use futures::{StreamExt, stream};
use tracing::debug;

use crate::endpoint::{lookup_endpoint, validate_dataset_id};
use crate::filter::data_query_url;
use crate::request::{TextResponse, get_text};
use crate::table::{RowTable, RowTableBuilder};

/// A dataset to fetch data from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub provider_id: String,
    pub dataset_id: String,
    /// Url to the dataset's data, without any filter.
    pub dataset_url: String,
}

impl DataSource {
    /// Resolve the dataset url for a provider and dataset.
    ///
    /// Errors with an input error if either is empty or the provider is
    /// unknown.
    pub fn try_new(provider_id: &str, dataset_id: &str) -> Result<Self> {
        let endpoint = lookup_endpoint(provider_id)?;
        validate_dataset_id(dataset_id)?;

        Ok(DataSource {
            provider_id: provider_id.to_string(),
            dataset_id: dataset_id.to_string(),
            dataset_url: endpoint.data_url(dataset_id),
        })
    }

    /// Urls to request for a set of rendered filters. An empty set of
    /// filters requests the full dataset.
    pub fn query_urls(&self, filters: &[String]) -> Vec<String> {
        if filters.is_empty() {
            return vec![data_query_url(&self.dataset_url, None)];
        }
        filters
            .iter()
            .map(|filter| data_query_url(&self.dataset_url, Some(filter)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Add a geo level value after the geo dimension of each row.
    pub derive_geo_level: bool,
    /// Number of requests in flight at once. Responses are always merged in
    /// request order.
    pub max_concurrent_requests: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            derive_geo_level: true,
            max_concurrent_requests: 1,
        }
    }
}

/// Fetch every filter and merge the responses.
///
/// Rows are deduplicated across responses when more than one request is made.
/// A single request answered with a fault produces an empty table, any other
/// non-200 or fault response fails the fetch.
pub async fn fetch_and_merge<C: HttpClient>(
    client: &C,
    source: &DataSource,
    filters: &[String],
    options: &FetchOptions,
) -> Result<RowTable> {
    let urls = source.query_urls(filters);
    let single = urls.len() == 1;
    let concurrency = options.max_concurrent_requests.max(1);

    debug!(
        provider = %source.provider_id,
        dataset = %source.dataset_id,
        requests = urls.len(),
        concurrency,
        "fetching data"
    );

    let mut responses = stream::iter(urls)
        .map(|url| async move {
            let resp = get_text(client, &url).await;
            (url, resp)
        })
        .buffered(concurrency);

    let mut builder = RowTableBuilder::new(!single, options.derive_geo_level);

    while let Some((url, resp)) = responses.next().await {
        let with_context = |err: eurostat_error::EurostatError| {
            err.with_field("provider", &source.provider_id)
                .with_field("dataset", &source.dataset_id)
                .with_field("url", &url)
        };

        let resp = resp.map_err(with_context)?;

        if resp.is_ok() && !is_structured(&resp) {
            builder.push_body(&resp.body).map_err(with_context)?;
            continue;
        }

        if single && resp.fault().is_some() {
            debug!(%url, status = %resp.status, "fault for single request, returning empty result");
            return Ok(RowTable::empty());
        }

        return Err(with_context(resp.upstream_error("Failed to fetch data")));
    }

    let table = builder.finish();
    debug!(rows = table.num_rows(), combinations = table.combinations().len(), "merged responses");

    Ok(table)
}

/// If the response is an xml document rather than data.
fn is_structured(resp: &TextResponse) -> bool {
    resp.is_xml || resp.body.trim_start().starts_with('<')
}
