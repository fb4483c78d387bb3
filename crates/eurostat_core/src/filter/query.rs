use std::fmt::Write as _;

use tracing::debug;
use url::form_urlencoded::byte_serialize;

use super::branch::{FilterBranch, FilterBranchSet, MaskEntry};
use super::encoder::encode_predicate;
use crate::catalog::DimensionCatalog;
use crate::predicate::Predicate;

/// Query parameters requesting compressed TSV data.
pub const DATA_FORMAT_PARAMS: &str = "format=TSV&compressed=true";

/// Render a branch into a filter string of the form
/// `/v1.v2.vN?startPeriod=s&endPeriod=e&`.
///
/// Virtual dimensions contribute no segment. Returns `None` for a branch that
/// doesn't restrict anything.
pub fn render_branch(branch: &FilterBranch, catalog: &DimensionCatalog) -> Option<String> {
    if branch.is_empty() {
        return None;
    }

    let mut out = String::from("/");
    for (idx, _) in catalog.physical_dimensions() {
        if let Some(MaskEntry::Values(values)) = branch.mask.get(idx) {
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.push('+');
                }
                out.push_str(&encode_literal(value));
            }
        }
        out.push('.');
    }
    if out.ends_with('.') {
        out.pop();
    }
    out.push('?');

    // Writing to a string can't fail.
    if let Some(start) = &branch.start_period {
        let _ = write!(out, "startPeriod={}&", encode_literal(start));
    }
    if let Some(end) = &branch.end_period {
        let _ = write!(out, "endPeriod={}&", encode_literal(end));
    }

    Some(out)
}

/// Percent-encode a literal for use in a filter path or query value.
///
/// `+` and `.` are separators in the path so both are always escaped, spaces
/// included.
fn encode_literal(value: &str) -> String {
    byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('.', "%2E")
}

/// Result of pushing a predicate down, the distinct filter strings to
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFilters {
    queries: Vec<String>,
    supported: bool,
}

impl EncodedFilters {
    /// Nothing was pushed down, everything needs to be fetched.
    pub fn unsupported() -> Self {
        EncodedFilters {
            queries: Vec::new(),
            supported: false,
        }
    }

    /// Encode and render a predicate.
    pub fn from_predicate(predicate: &Predicate, catalog: &DimensionCatalog) -> Self {
        let set = encode_predicate(predicate, catalog);
        let encoded = Self::from_branch_set(&set, catalog);
        debug!(%predicate, supported = encoded.supported, queries = encoded.queries.len(), "encoded predicate");
        encoded
    }

    /// Render every branch, keeping distinct non-empty filters in the order
    /// they were produced.
    ///
    /// Unsupported if the set is, or if nothing remains after discarding empty
    /// branches.
    pub fn from_branch_set(set: &FilterBranchSet, catalog: &DimensionCatalog) -> Self {
        if !set.is_supported() {
            return Self::unsupported();
        }

        let mut queries: Vec<String> = Vec::new();
        for branch in set.branches() {
            if let Some(query) = render_branch(branch, catalog) {
                if !queries.contains(&query) {
                    queries.push(query);
                }
            }
        }

        if queries.is_empty() {
            return Self::unsupported();
        }

        EncodedFilters {
            queries,
            supported: true,
        }
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    /// If the filters fully express the predicate. If false, the caller
    /// needs to filter rows itself.
    pub fn is_supported(&self) -> bool {
        self.supported
    }
}

/// Build the url for requesting data with an optional rendered filter.
pub fn data_query_url(dataset_url: &str, filter: Option<&str>) -> String {
    let Some(filter) = filter else {
        return format!("{dataset_url}?{DATA_FORMAT_PARAMS}");
    };

    let (path, params) = filter.split_once('?').unwrap_or((filter, ""));
    // Wildcard-only paths of "/", "/." or "/.." would be rewritten when
    // normalizing the url. They match everything anyway.
    let path = if matches!(path, "/" | "/." | "/..") {
        ""
    } else {
        path
    };

    format!("{dataset_url}{path}?{params}{DATA_FORMAT_PARAMS}")
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::catalog::testutil::population_catalog;
    use crate::predicate::{and, col, optional, or};

    const DATASET_URL: &str = "https://ec.europa.eu/eurostat/api/dissemination/sdmx/2.1/data/demo_r_d2jan";

    #[test]
    fn geo_and_time_range() {
        let catalog = population_catalog();
        let pred = and([
            col("geo").eq("AL"),
            and([
                col("time_period").gt_eq("2000"),
                col("time_period").lt_eq("2001"),
            ]),
        ]);

        let encoded = EncodedFilters::from_predicate(&pred, &catalog);
        assert!(encoded.is_supported());
        assert_eq!(
            vec!["/....AL?startPeriod=2000&endPeriod=2001&".to_string()],
            encoded.queries()
        );

        assert_eq!(
            "https://ec.europa.eu/eurostat/api/dissemination/sdmx/2.1/data/demo_r_d2jan/....AL?startPeriod=2000&endPeriod=2001&format=TSV&compressed=true",
            data_query_url(DATASET_URL, Some(&encoded.queries()[0]))
        );
    }

    #[test]
    fn or_renders_distinct_queries() {
        let catalog = population_catalog();
        let pred = or([
            col("geo").eq("AL"),
            col("geo").eq("DE"),
            col("geo").eq("AL"),
        ]);

        let encoded = EncodedFilters::from_predicate(&pred, &catalog);
        assert!(encoded.is_supported());
        assert_eq!(
            vec!["/....AL?".to_string(), "/....DE?".to_string()],
            encoded.queries()
        );
    }

    #[test]
    fn or_with_k_children_at_most_k_queries() {
        let catalog = population_catalog();
        let pred = or([
            col("sex").eq("F"),
            optional(None),
            col("age").in_list(["Y10", "Y11"]),
        ]);

        let encoded = EncodedFilters::from_predicate(&pred, &catalog);
        assert!(encoded.is_supported());
        assert_eq!(
            vec!["/..F..?".to_string(), "/...Y10+Y11.?".to_string()],
            encoded.queries()
        );
    }

    #[test]
    fn all_wildcard_is_unsupported() {
        let catalog = population_catalog();
        let encoded = EncodedFilters::from_predicate(&optional(None), &catalog);
        assert!(!encoded.is_supported());
        assert!(encoded.queries().is_empty());
    }

    #[test]
    fn unsupported_renders_nothing() {
        let catalog = population_catalog();
        let encoded = EncodedFilters::from_predicate(
            &and([col("geo").eq("AL"), col("time_period").in_list(["2000", "2001"])]),
            &catalog,
        );
        assert!(!encoded.is_supported());
        assert!(encoded.queries().is_empty());
    }

    #[test]
    fn segments_recover_masks() {
        let catalog = population_catalog();
        let pred = and([
            col("freq").eq("A"),
            col("sex").in_list(["F", "M"]),
            col("geo").in_list(["AL", "DE1", "FR10"]),
        ]);

        let encoded = EncodedFilters::from_predicate(&pred, &catalog);
        let query = &encoded.queries()[0];
        let path = query.trim_start_matches('/').split('?').next().unwrap();
        let segments: Vec<Vec<&str>> = path
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Vec::new()
                } else {
                    seg.split('+').collect()
                }
            })
            .collect();

        assert_eq!(
            vec![
                vec!["A"],
                vec![],
                vec!["F", "M"],
                vec![],
                vec!["AL", "DE1", "FR10"],
            ],
            segments
        );
    }

    #[test]
    fn time_only_query_keeps_wildcard_path() {
        let catalog = population_catalog();
        let encoded = EncodedFilters::from_predicate(&col("time_period").gt_eq("2015"), &catalog);
        assert_eq!(vec!["/....?startPeriod=2015&".to_string()], encoded.queries());

        assert_eq!(
            format!("{DATASET_URL}/....?startPeriod=2015&format=TSV&compressed=true"),
            data_query_url(DATASET_URL, Some(&encoded.queries()[0]))
        );
    }

    #[test]
    fn short_wildcard_path_dropped() {
        for path in ["/", "/.", "/.."] {
            assert_eq!(
                format!("{DATASET_URL}?startPeriod=2015&format=TSV&compressed=true"),
                data_query_url(DATASET_URL, Some(&format!("{path}?startPeriod=2015&")))
            );
        }
        assert_eq!(
            format!("{DATASET_URL}/...?format=TSV&compressed=true"),
            data_query_url(DATASET_URL, Some("/...?"))
        );
    }

    #[test]
    fn literals_are_escaped() {
        let catalog = population_catalog();
        let pred = and([
            col("geo").in_list(["A#B", "C.D", "E F+G"]),
            col("time_period").gt_eq("2000&x=y"),
        ]);

        let encoded = EncodedFilters::from_predicate(&pred, &catalog);
        assert_eq!(
            vec!["/....A%23B+C%2ED+E%20F%2BG?startPeriod=2000%26x%3Dy&".to_string()],
            encoded.queries()
        );

        let url = Url::parse(&data_query_url(DATASET_URL, Some(&encoded.queries()[0]))).unwrap();
        assert_eq!(None, url.fragment());
        assert!(url.path().ends_with("/demo_r_d2jan/....A%23B+C%2ED+E%20F%2BG"));
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            vec![
                ("startPeriod".to_string(), "2000&x=y".to_string()),
                ("format".to_string(), "TSV".to_string()),
                ("compressed".to_string(), "true".to_string()),
            ],
            params
        );
    }

    #[test]
    fn unfiltered_url() {
        assert_eq!(
            format!("{DATASET_URL}?format=TSV&compressed=true"),
            data_query_url(DATASET_URL, None)
        );
    }
}
