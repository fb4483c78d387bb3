use eurostat_error::{EurostatError, Result};

/// API endpoint of a data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub provider_id: &'static str,
    /// Organization, also known as the agency.
    pub organization: &'static str,
    pub description: &'static str,
    /// Base url of the SDMX 2.1 api, always ends with a '/'.
    pub api_url: &'static str,
}

/// Known endpoints, sorted by provider id.
pub const ENDPOINTS: &[Endpoint] = &[
    Endpoint {
        provider_id: "ECFIN",
        organization: "DG ECFIN",
        description: "Economic and Financial Affairs",
        api_url: "https://webgate.ec.europa.eu/ecfin/redisstat/api/dissemination/sdmx/2.1/",
    },
    Endpoint {
        provider_id: "EMPL",
        organization: "DG EMPL",
        description: "Employment, Social Affairs and Inclusion",
        api_url: "https://webgate.ec.europa.eu/empl/redisstat/api/dissemination/sdmx/2.1/",
    },
    Endpoint {
        provider_id: "ESTAT",
        organization: "EUROSTAT",
        description: "EUROSTAT database",
        api_url: "https://ec.europa.eu/eurostat/api/dissemination/sdmx/2.1/",
    },
    Endpoint {
        provider_id: "GROW",
        organization: "DG GROW",
        description: "Internal Market, Industry, Entrepreneurship and SMEs",
        api_url: "https://webgate.ec.europa.eu/grow/redisstat/api/dissemination/sdmx/2.1/",
    },
    Endpoint {
        provider_id: "TAXUD",
        organization: "DG TAXUD",
        description: "Taxation and Customs Union",
        api_url: "https://webgate.ec.europa.eu/taxation_customs/redisstat/api/dissemination/sdmx/2.1/",
    },
];

pub fn list_endpoints() -> &'static [Endpoint] {
    ENDPOINTS
}

/// Find the endpoint for a provider.
///
/// Errors with an input error if the id is empty or unknown.
pub fn lookup_endpoint(provider_id: &str) -> Result<&'static Endpoint> {
    if provider_id.is_empty() {
        return Err(EurostatError::invalid_input(
            "Provider identifier cannot be empty",
        ));
    }

    ENDPOINTS
        .iter()
        .find(|e| e.provider_id == provider_id)
        .ok_or_else(|| {
            EurostatError::invalid_input("Unknown provider identifier")
                .with_field("provider", provider_id)
        })
}

/// Check that a dataset (or dataflow) id is non-empty and safe to place in a
/// url path segment.
pub fn validate_dataset_id(dataset_id: &str) -> Result<()> {
    if dataset_id.is_empty() {
        return Err(EurostatError::invalid_input(
            "Dataset identifier cannot be empty",
        ));
    }

    let valid = dataset_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(EurostatError::invalid_input(
            "Dataset identifier contains invalid characters",
        )
        .with_field("dataset", dataset_id));
    }

    Ok(())
}

impl Endpoint {
    /// Url for data of a dataset, without a filter path or query.
    pub fn data_url(&self, dataset_id: &str) -> String {
        format!("{}data/{}", self.api_url, dataset_id)
    }

    /// Url for the structure document of a dataset, including its
    /// dimensions and concepts.
    pub fn structure_url(&self, dataset_id: &str) -> String {
        format!(
            "{}dataflow/{}/{}/latest?detail=referencepartial&references=descendants",
            self.api_url, self.provider_id, dataset_id
        )
    }

    /// Url for the content constraint of a dataset, listing the values
    /// actually present for each dimension.
    pub fn constraint_url(&self, dataset_id: &str) -> String {
        format!(
            "{}contentconstraint/{}/{}",
            self.api_url, self.provider_id, dataset_id
        )
    }

    /// Url for the dataflow listing. `dataflow_id` may be "all".
    pub fn dataflow_url(&self, dataflow_id: &str, language: &str) -> String {
        format!(
            "{}dataflow/{}/{}?format=JSON&compressed=true&lang={}",
            self.api_url, self.provider_id, dataflow_id, language
        )
    }
}

#[cfg(test)]
mod tests {
    use eurostat_error::ErrorKind;

    use super::*;

    #[test]
    fn endpoints_sorted() {
        let ids: Vec<_> = list_endpoints().iter().map(|e| e.provider_id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, ids);
        assert!(ENDPOINTS.iter().all(|e| e.api_url.ends_with('/')));
    }

    #[test]
    fn lookup_known() {
        let endpoint = lookup_endpoint("ESTAT").unwrap();
        assert_eq!("EUROSTAT", endpoint.organization);
        assert_eq!(
            "https://ec.europa.eu/eurostat/api/dissemination/sdmx/2.1/data/demo_r_d2jan",
            endpoint.data_url("demo_r_d2jan")
        );
    }

    #[test]
    fn lookup_empty_and_unknown() {
        let err = lookup_endpoint("").unwrap_err();
        assert_eq!(ErrorKind::InvalidInput, err.kind());

        let err = lookup_endpoint("NOPE").unwrap_err();
        assert_eq!(ErrorKind::InvalidInput, err.kind());
        assert_eq!(Some("NOPE"), err.get_field("provider"));
    }

    #[test]
    fn structure_urls() {
        let endpoint = lookup_endpoint("ESTAT").unwrap();
        assert_eq!(
            "https://ec.europa.eu/eurostat/api/dissemination/sdmx/2.1/dataflow/ESTAT/demo_r_d2jan/latest?detail=referencepartial&references=descendants",
            endpoint.structure_url("demo_r_d2jan")
        );
        assert_eq!(
            "https://ec.europa.eu/eurostat/api/dissemination/sdmx/2.1/contentconstraint/ESTAT/demo_r_d2jan",
            endpoint.constraint_url("demo_r_d2jan")
        );
        assert_eq!(
            "https://ec.europa.eu/eurostat/api/dissemination/sdmx/2.1/dataflow/ESTAT/all?format=JSON&compressed=true&lang=de",
            endpoint.dataflow_url("all", "de")
        );
    }

    #[test]
    fn dataset_ids() {
        validate_dataset_id("demo_r_d2jan").unwrap();
        validate_dataset_id("ei_bsco_m").unwrap();
        assert_eq!(
            ErrorKind::InvalidInput,
            validate_dataset_id("").unwrap_err().kind()
        );
        assert_eq!(
            ErrorKind::InvalidInput,
            validate_dataset_id("demo/../x").unwrap_err().kind()
        );
    }
}
