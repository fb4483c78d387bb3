//! Dataflow (dataset) metadata listing.

use chrono::{DateTime, FixedOffset};
use eurostat_error::{EurostatError, Result};
use eurostat_http::client::HttpClient;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::endpoint::{Endpoint, ENDPOINTS, lookup_endpoint};
use crate::request::get_text;

/// Dataflow id requesting every dataflow of a provider.
pub const ALL_DATAFLOWS: &str = "all";

/// Metadata of a single dataflow.
#[derive(Debug, Clone, PartialEq)]
pub struct DataflowInfo {
    pub provider_id: String,
    pub dataflow_id: String,
    pub class: String,
    pub version: String,
    pub label: String,
    pub language: String,
    /// Total number of observations.
    pub number_of_values: Option<i64>,
    /// Oldest and latest observed time periods.
    pub data_start: Option<String>,
    pub data_end: Option<String>,
    pub update_data: Option<DateTime<FixedOffset>>,
    pub update_structure: Option<DateTime<FixedOffset>>,
    /// Raw data structure reference, kept as json.
    pub data_structure: Option<Value>,
    /// Raw annotations, kept as json.
    pub annotations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct DataflowCollection {
    link: DataflowLinks,
}

#[derive(Debug, Deserialize)]
struct DataflowLinks {
    item: Vec<DataflowItem>,
}

#[derive(Debug, Deserialize)]
struct DataflowItem {
    #[serde(default)]
    class: String,
    #[serde(default)]
    label: String,
    extension: DataflowExtension,
}

#[derive(Debug, Deserialize)]
struct DataflowExtension {
    #[serde(default)]
    id: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    lang: String,
    annotation: Vec<Value>,
    #[serde(default)]
    datastructure: Option<Value>,
}

impl DataflowItem {
    fn into_info(self, provider_id: &str) -> DataflowInfo {
        let ext = self.extension;

        let mut info = DataflowInfo {
            provider_id: provider_id.to_string(),
            dataflow_id: ext.id,
            class: self.class,
            version: ext.version,
            label: self.label,
            language: ext.lang,
            number_of_values: None,
            data_start: None,
            data_end: None,
            update_data: None,
            update_structure: None,
            data_structure: ext.datastructure,
            annotations: Vec::new(),
        };

        for annotation in &ext.annotation {
            // Annotations that aren't objects with a string type are skipped.
            let Some(kind) = annotation.get("type").and_then(Value::as_str) else {
                continue;
            };
            let title = || annotation.get("title").and_then(Value::as_str);
            let date = || annotation.get("date").and_then(Value::as_str);

            match kind {
                "OBS_COUNT" => info.number_of_values = title().and_then(|t| t.trim().parse().ok()),
                "OBS_PERIOD_OVERALL_OLDEST" => info.data_start = title().map(String::from),
                "OBS_PERIOD_OVERALL_LATEST" => info.data_end = title().map(String::from),
                "UPDATE_DATA" => info.update_data = date().and_then(parse_timestamp),
                "UPDATE_STRUCTURE" => info.update_structure = date().and_then(parse_timestamp),
                _ => (),
            }
        }
        info.annotations = ext.annotation;

        info
    }
}

/// Parse an update timestamp.
///
/// The API isn't consistent about the offset format, both `+01:00` and `+0100`
/// show up.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
}

/// Parse a dataflow response body.
///
/// The body for the "all" dataflow is a collection with the dataflows under
/// `link.item`, otherwise it's a single dataflow.
pub fn parse_dataflows(provider_id: &str, dataflow_id: &str, body: &str) -> Result<Vec<DataflowInfo>> {
    let parse_err = |e: serde_json::Error| {
        EurostatError::format("Failed to parse dataflow metadata")
            .with_field("provider", provider_id)
            .with_field("dataflow", dataflow_id)
            .with_field("error", e)
    };

    if dataflow_id == ALL_DATAFLOWS {
        let collection: DataflowCollection = serde_json::from_str(body).map_err(parse_err)?;
        Ok(collection
            .link
            .item
            .into_iter()
            .map(|item| item.into_info(provider_id))
            .collect())
    } else {
        let item: DataflowItem = serde_json::from_str(body).map_err(parse_err)?;
        Ok(vec![item.into_info(provider_id)])
    }
}

/// List dataflow metadata.
///
/// An empty list of providers means every known provider. An empty list of
/// dataflows, or one containing "all", lists every dataflow of each provider.
/// Requests are issued sequentially in provider order.
pub async fn list_dataflows<C: HttpClient>(
    client: &C,
    providers: &[String],
    dataflows: &[String],
    language: &str,
) -> Result<Vec<DataflowInfo>> {
    let endpoints: Vec<&Endpoint> = if providers.is_empty() {
        ENDPOINTS.iter().collect()
    } else {
        providers
            .iter()
            .map(|p| lookup_endpoint(p))
            .collect::<Result<_>>()?
    };

    let dataflows: Vec<&str> = if dataflows.is_empty() || dataflows.iter().any(|d| d == ALL_DATAFLOWS) {
        vec![ALL_DATAFLOWS]
    } else {
        dataflows.iter().map(|d| d.as_str()).collect()
    };

    let language = if language.is_empty() { "en" } else { language };

    let mut infos = Vec::new();
    for endpoint in endpoints {
        for dataflow_id in &dataflows {
            let url = endpoint.dataflow_url(dataflow_id, language);
            let resp = get_text(client, &url).await?;

            if !resp.is_ok() {
                return Err(resp
                    .upstream_error("Failed to fetch dataflow metadata")
                    .with_field("provider", endpoint.provider_id)
                    .with_field("dataflow", dataflow_id)
                    .with_field("url", &url));
            }

            let parsed = parse_dataflows(endpoint.provider_id, dataflow_id, &resp.body)?;
            debug!(provider = endpoint.provider_id, %dataflow_id, count = parsed.len(), "listed dataflows");
            infos.extend(parsed);
        }
    }

    Ok(infos)
}
