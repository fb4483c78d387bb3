//! Dimension catalogs describing the shape of a dataset.

pub mod structure;

use std::collections::HashMap;

use eurostat_error::{EurostatError, Result};

use crate::geo::GeoLevel;

pub const TIME_PERIOD_DIMENSION: &str = "time_period";
pub const GEO_DIMENSION: &str = "geo";
pub const GEO_LEVEL_DIMENSION: &str = "geo_level";

const GEO_LEVEL_LABEL: &str = "NUTS classification level";

/// Where a dimension lives in the upstream filter path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionSlot {
    /// Position in the dot separated filter path.
    Physical(usize),
    /// Not part of the filter path. This is either the time dimension or a
    /// dimension derived client side.
    Virtual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub slot: DimensionSlot,
    /// Lower-cased dimension name.
    pub name: String,
    pub label: String,
    /// Values allowed for this dimension, empty if not known.
    pub values: Vec<String>,
}

impl Dimension {
    pub fn physical(position: usize, name: impl Into<String>, label: impl Into<String>) -> Self {
        Dimension {
            slot: DimensionSlot::Physical(position),
            name: name.into(),
            label: label.into(),
            values: Vec::new(),
        }
    }

    pub fn new_virtual(name: impl Into<String>, label: impl Into<String>) -> Self {
        Dimension {
            slot: DimensionSlot::Virtual,
            name: name.into(),
            label: label.into(),
            values: Vec::new(),
        }
    }

    pub fn with_values(mut self, values: Vec<String>) -> Self {
        self.values = values;
        self
    }

    pub fn is_time(&self) -> bool {
        self.name == TIME_PERIOD_DIMENSION
    }

    pub fn is_virtual(&self) -> bool {
        self.slot == DimensionSlot::Virtual
    }

    pub fn position(&self) -> Option<usize> {
        match self.slot {
            DimensionSlot::Physical(pos) => Some(pos),
            DimensionSlot::Virtual => None,
        }
    }
}

/// Ordered set of dimensions for a dataset.
///
/// Physical dimensions appear in the order of their positions. Virtual
/// dimensions occupy an index in the catalog but never a position in the
/// filter path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionCatalog {
    dimensions: Vec<Dimension>,
}

impl DimensionCatalog {
    /// Create a catalog from dimensions that are already ordered.
    ///
    /// Errors if names are duplicated, or if physical positions are out of
    /// order or duplicated.
    pub fn try_new(dimensions: Vec<Dimension>) -> Result<Self> {
        let mut last_position: Option<usize> = None;
        for (idx, dim) in dimensions.iter().enumerate() {
            if dimensions[..idx].iter().any(|d| d.name == dim.name) {
                return Err(EurostatError::new("Duplicate dimension name")
                    .with_field("dimension", &dim.name));
            }

            if let Some(pos) = dim.position() {
                if let Some(last) = last_position {
                    if pos <= last {
                        return Err(EurostatError::new(
                            "Dimension positions must be unique and ascending",
                        )
                        .with_field("dimension", &dim.name)
                        .with_field("position", pos));
                    }
                }
                last_position = Some(pos);
            }
        }

        Ok(DimensionCatalog { dimensions })
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Dimension> {
        self.dimensions.get(idx)
    }

    /// Get the catalog index of a dimension by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name == name)
    }

    pub fn find(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn has_geo_level(&self) -> bool {
        self.find(GEO_LEVEL_DIMENSION).is_some()
    }

    pub fn num_physical(&self) -> usize {
        self.dimensions.iter().filter(|d| !d.is_virtual()).count()
    }

    /// Iterate the physical dimensions in filter path order.
    pub fn physical_dimensions(&self) -> impl Iterator<Item = (usize, &Dimension)> {
        self.dimensions
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.is_virtual())
    }
}

/// Builds a catalog from dimensions listed in any order.
#[derive(Debug)]
pub struct CatalogBuilder {
    physical: Vec<Dimension>,
    time: Option<Dimension>,
    derive_geo_level: bool,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBuilder {
    pub fn new() -> Self {
        CatalogBuilder {
            physical: Vec::new(),
            time: None,
            derive_geo_level: true,
        }
    }

    /// Toggle inserting the derived geo level dimension. Enabled by default.
    pub fn derive_geo_level(mut self, derive: bool) -> Self {
        self.derive_geo_level = derive;
        self
    }

    pub fn add_dimension(&mut self, position: usize, name: &str, label: impl Into<String>) {
        self.physical
            .push(Dimension::physical(position, name.to_lowercase(), label));
    }

    pub fn set_time_dimension(&mut self, label: impl Into<String>) {
        self.time = Some(Dimension::new_virtual(TIME_PERIOD_DIMENSION, label));
    }

    /// Attach allowed values to dimensions. Keys are matched case
    /// insensitively, unmatched keys are ignored.
    pub fn set_allowed_values(&mut self, mut values: HashMap<String, Vec<String>>) {
        for dim in &mut self.physical {
            let key = values
                .keys()
                .find(|k| k.eq_ignore_ascii_case(&dim.name))
                .cloned();
            if let Some(key) = key {
                if let Some(vals) = values.remove(&key) {
                    dim.values = vals;
                }
            }
        }
    }

    pub fn build(mut self) -> Result<DimensionCatalog> {
        self.physical.sort_by_key(|d| d.position());

        let mut dimensions = Vec::with_capacity(self.physical.len() + 2);
        for dim in self.physical {
            let is_geo = dim.name == GEO_DIMENSION;
            dimensions.push(dim);

            if is_geo && self.derive_geo_level {
                dimensions.push(
                    Dimension::new_virtual(GEO_LEVEL_DIMENSION, GEO_LEVEL_LABEL).with_values(
                        GeoLevel::ALL
                            .iter()
                            .map(|l| l.as_str().to_string())
                            .collect(),
                    ),
                );
            }
        }

        if let Some(time) = self.time {
            dimensions.push(time);
        }

        DimensionCatalog::try_new(dimensions)
    }
}

/// Looks up the catalog for a dataset.
pub trait CatalogProvider: Sync + Send {
    fn lookup_catalog(
        &self,
        provider_id: &str,
        dataset_id: &str,
    ) -> impl Future<Output = Result<DimensionCatalog>> + Send;
}

/// Catalog provider backed by catalogs computed ahead of time.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogProvider {
    catalogs: HashMap<(String, String), DimensionCatalog>,
}

impl StaticCatalogProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(
        mut self,
        provider_id: impl Into<String>,
        dataset_id: impl Into<String>,
        catalog: DimensionCatalog,
    ) -> Self {
        self.catalogs
            .insert((provider_id.into(), dataset_id.into()), catalog);
        self
    }
}

impl CatalogProvider for StaticCatalogProvider {
    async fn lookup_catalog(&self, provider_id: &str, dataset_id: &str) -> Result<DimensionCatalog> {
        self.catalogs
            .get(&(provider_id.to_string(), dataset_id.to_string()))
            .cloned()
            .ok_or_else(|| {
                EurostatError::invalid_input("Unknown dataset identifier")
                    .with_field("provider", provider_id)
                    .with_field("dataset", dataset_id)
            })
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::population_catalog;
    use super::*;

    #[test]
    fn builder_orders_and_inserts_geo_level() {
        let mut builder = CatalogBuilder::new();
        builder.set_time_dimension("Time");
        builder.add_dimension(2, "GEO", "Geo");
        builder.add_dimension(0, "FREQ", "Frequency");
        builder.add_dimension(1, "UNIT", "Unit");
        let catalog = builder.build().unwrap();

        let names: Vec<_> = catalog.dimensions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(vec!["freq", "unit", "geo", "geo_level", "time_period"], names);

        let geo_level = catalog.find("geo_level").unwrap();
        assert!(geo_level.is_virtual());
        assert_eq!(6, geo_level.values.len());
        assert!(catalog.find("time_period").unwrap().is_time());
        assert_eq!(3, catalog.num_physical());
    }

    #[test]
    fn builder_without_geo() {
        let mut builder = CatalogBuilder::new();
        builder.add_dimension(0, "freq", "Frequency");
        builder.add_dimension(1, "indic", "Indicator");
        builder.set_time_dimension("Time");
        let catalog = builder.build().unwrap();

        assert!(!catalog.has_geo_level());
        assert_eq!(3, catalog.len());
    }

    #[test]
    fn builder_geo_level_disabled() {
        let mut builder = CatalogBuilder::new().derive_geo_level(false);
        builder.add_dimension(0, "geo", "Geo");
        let catalog = builder.build().unwrap();
        assert!(!catalog.has_geo_level());
    }

    #[test]
    fn allowed_values_attached() {
        let mut builder = CatalogBuilder::new();
        builder.add_dimension(0, "freq", "Frequency");
        builder.add_dimension(1, "geo", "Geo");
        builder.set_allowed_values(HashMap::from([
            ("GEO".to_string(), vec!["AL".to_string(), "DE".to_string()]),
            ("OTHER".to_string(), vec!["X".to_string()]),
        ]));
        let catalog = builder.build().unwrap();

        assert_eq!(vec!["AL", "DE"], catalog.find("geo").unwrap().values);
        assert!(catalog.find("freq").unwrap().values.is_empty());
    }

    #[test]
    fn duplicate_positions_rejected() {
        let mut builder = CatalogBuilder::new();
        builder.add_dimension(0, "freq", "Frequency");
        builder.add_dimension(0, "unit", "Unit");
        builder.build().unwrap_err();
    }

    #[test]
    fn duplicate_names_rejected() {
        DimensionCatalog::try_new(vec![
            Dimension::physical(0, "geo", "Geo"),
            Dimension::physical(1, "geo", "Geo"),
        ])
        .unwrap_err();
    }

    #[test]
    fn lookups() {
        let catalog = population_catalog();
        assert_eq!(Some(4), catalog.index_of("geo"));
        assert_eq!(Some(5), catalog.index_of("geo_level"));
        assert_eq!(Some(6), catalog.index_of("time_period"));
        assert_eq!(None, catalog.index_of("nope"));

        let physical: Vec<_> = catalog.physical_dimensions().map(|(idx, _)| idx).collect();
        assert_eq!(vec![0, 1, 2, 3, 4], physical);
    }

    #[tokio::test]
    async fn static_provider() {
        let provider =
            StaticCatalogProvider::new().with_catalog("ESTAT", "demo_r_d2jan", population_catalog());

        let catalog = provider.lookup_catalog("ESTAT", "demo_r_d2jan").await.unwrap();
        assert_eq!(7, catalog.len());

        let err = provider.lookup_catalog("ESTAT", "missing").await.unwrap_err();
        assert_eq!(eurostat_error::ErrorKind::InvalidInput, err.kind());
    }
}
