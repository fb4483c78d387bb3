//! Discovery of dataset structure from SDMX-ML documents.

use std::collections::HashMap;

use eurostat_error::{EurostatError, Result};
use eurostat_http::StatusCode;
use eurostat_http::client::HttpClient;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;

use super::{CatalogBuilder, CatalogProvider, DimensionCatalog};
use crate::endpoint::{lookup_endpoint, validate_dataset_id};
use crate::request::get_text;

/// Dimension as declared in a data structure definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDimension {
    pub id: String,
    pub position: Option<usize>,
    pub concept_id: Option<String>,
    pub is_time: bool,
}

/// Parsed data structure document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructureDocument {
    /// Dimensions in document order, including the time dimension.
    pub dimensions: Vec<DeclaredDimension>,
    /// Concept labels by concept id.
    pub concept_labels: HashMap<String, String>,
}

impl StructureDocument {
    /// Parse a structure document, picking concept labels in the given
    /// language when available.
    pub fn parse(xml: &str, language: &str) -> Result<Self> {
        let mut parser = StructureParser {
            language,
            doc: StructureDocument::default(),
            in_dimension_list: false,
            current_dim: None,
            in_concept_identity: false,
            current_concept: None,
            name_lang: None,
        };
        walk_xml(xml, &mut parser)?;
        Ok(parser.doc)
    }

    /// Label for a dimension, falling back to its id if no concept label
    /// exists.
    pub fn label_for(&self, dim: &DeclaredDimension) -> String {
        dim.concept_id
            .as_ref()
            .and_then(|id| self.concept_labels.get(id))
            .cloned()
            .unwrap_or_else(|| dim.id.clone())
    }

    /// Build a catalog from this document and optionally allowed values per
    /// dimension.
    pub fn into_catalog(self, values: Option<HashMap<String, Vec<String>>>) -> Result<DimensionCatalog> {
        let mut builder = CatalogBuilder::new();
        let mut has_time = false;

        for dim in &self.dimensions {
            let label = self.label_for(dim);
            if dim.is_time {
                builder.set_time_dimension(label);
                has_time = true;
            } else {
                let position = dim.position.ok_or_else(|| {
                    EurostatError::format("Dimension is missing its position")
                        .with_field("dimension", &dim.id)
                })?;
                builder.add_dimension(position, &dim.id, label);
            }
        }

        if !has_time {
            builder.set_time_dimension("Time");
        }

        if let Some(values) = values {
            builder.set_allowed_values(values);
        }

        builder.build()
    }
}

/// Parse a content constraint document into the values present for each
/// dimension. Keys are lower-cased dimension ids.
pub fn parse_content_constraint(xml: &str) -> Result<HashMap<String, Vec<String>>> {
    let mut parser = ConstraintParser {
        values: HashMap::new(),
        current_key: None,
        in_value: false,
    };
    walk_xml(xml, &mut parser)?;
    Ok(parser.values)
}

/// Catalog provider fetching structure documents from the API.
#[derive(Debug, Clone)]
pub struct RemoteCatalogProvider<C: HttpClient> {
    client: C,
    language: String,
    include_values: bool,
}

impl<C: HttpClient> RemoteCatalogProvider<C> {
    pub fn new(client: C, language: impl Into<String>) -> Self {
        RemoteCatalogProvider {
            client,
            language: language.into(),
            include_values: false,
        }
    }

    /// Also fetch the values present for each dimension. Costs an extra
    /// request per lookup.
    pub fn with_values(mut self, include_values: bool) -> Self {
        self.include_values = include_values;
        self
    }
}

impl<C: HttpClient> CatalogProvider for RemoteCatalogProvider<C> {
    async fn lookup_catalog(&self, provider_id: &str, dataset_id: &str) -> Result<DimensionCatalog> {
        let endpoint = lookup_endpoint(provider_id)?;
        validate_dataset_id(dataset_id)?;

        let resp = get_text(&self.client, &endpoint.structure_url(dataset_id)).await?;
        if resp.status == StatusCode::NOT_FOUND {
            return Err(EurostatError::invalid_input("Unknown dataset identifier")
                .with_field("provider", provider_id)
                .with_field("dataset", dataset_id));
        }
        if !resp.is_ok() {
            return Err(resp
                .upstream_error("Failed to fetch dataflow metadata")
                .with_field("provider", provider_id)
                .with_field("dataset", dataset_id));
        }

        let doc = StructureDocument::parse(&resp.body, &self.language)?;
        if doc.dimensions.is_empty() {
            return Err(EurostatError::format("Structure document declares no dimensions")
                .with_field("provider", provider_id)
                .with_field("dataset", dataset_id));
        }

        let values = if self.include_values {
            let resp = get_text(&self.client, &endpoint.constraint_url(dataset_id)).await?;
            if !resp.is_ok() {
                return Err(resp
                    .upstream_error("Failed to fetch dataflow constraints")
                    .with_field("provider", provider_id)
                    .with_field("dataset", dataset_id));
            }
            Some(parse_content_constraint(&resp.body)?)
        } else {
            None
        };

        let catalog = doc.into_catalog(values)?;
        debug!(%provider_id, %dataset_id, dimensions = catalog.len(), "looked up catalog");

        Ok(catalog)
    }
}

/// Receives element events while walking a document.
///
/// Empty elements are reported as a start immediately followed by an end.
trait XmlVisitor {
    fn start(&mut self, elem: &BytesStart<'_>) -> Result<()>;
    fn end(&mut self, local_name: &[u8]);
    fn text(&mut self, text: &str);
}

fn walk_xml(xml: &str, visitor: &mut impl XmlVisitor) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => visitor.start(&e)?,
            Event::Empty(e) => {
                visitor.start(&e)?;
                visitor.end(e.local_name().as_ref());
            }
            Event::End(e) => visitor.end(e.local_name().as_ref()),
            Event::Text(t) => visitor.text(&t.unescape().map_err(xml_error)?),
            Event::Eof => return Ok(()),
            _ => (),
        }
    }
}

fn xml_error(e: impl std::fmt::Display) -> EurostatError {
    EurostatError::format("Failed to parse xml document").with_field("error", e)
}

/// Get an attribute value by its local name.
fn attribute(elem: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<String>> {
    for attr in elem.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.local_name().as_ref() == local_name {
            return Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned()));
        }
    }
    Ok(None)
}

struct StructureParser<'a> {
    language: &'a str,
    doc: StructureDocument,
    in_dimension_list: bool,
    current_dim: Option<DeclaredDimension>,
    in_concept_identity: bool,
    current_concept: Option<String>,
    /// Language of the `Name` element being read, set while inside one.
    name_lang: Option<String>,
}

impl XmlVisitor for StructureParser<'_> {
    fn start(&mut self, elem: &BytesStart<'_>) -> Result<()> {
        match elem.local_name().as_ref() {
            b"DimensionList" => self.in_dimension_list = true,
            name @ (b"Dimension" | b"TimeDimension") if self.in_dimension_list => {
                let Some(id) = attribute(elem, b"id")?.filter(|id| !id.is_empty()) else {
                    return Ok(());
                };
                let position = match attribute(elem, b"position")? {
                    Some(pos) => Some(pos.parse::<usize>().map_err(|_| {
                        EurostatError::format("Invalid dimension position")
                            .with_field("dimension", &id)
                            .with_field("position", &pos)
                    })?),
                    None => None,
                };

                self.current_dim = Some(DeclaredDimension {
                    id,
                    position,
                    concept_id: None,
                    is_time: name == b"TimeDimension",
                });
            }
            b"ConceptIdentity" if self.current_dim.is_some() => self.in_concept_identity = true,
            b"Ref" if self.in_concept_identity => {
                if let Some(dim) = self.current_dim.as_mut() {
                    dim.concept_id = attribute(elem, b"id")?;
                }
            }
            b"Concept" => self.current_concept = attribute(elem, b"id")?,
            b"Name" if self.current_concept.is_some() => {
                // Names without a language are assumed to be in the requested
                // one.
                let lang = attribute(elem, b"lang")?.unwrap_or_else(|| self.language.to_string());
                self.name_lang = Some(lang);
            }
            _ => (),
        }
        Ok(())
    }

    fn end(&mut self, local_name: &[u8]) {
        match local_name {
            b"DimensionList" => self.in_dimension_list = false,
            b"Dimension" | b"TimeDimension" => {
                if let Some(dim) = self.current_dim.take() {
                    self.doc.dimensions.push(dim);
                }
            }
            b"ConceptIdentity" => self.in_concept_identity = false,
            b"Concept" => self.current_concept = None,
            b"Name" => self.name_lang = None,
            _ => (),
        }
    }

    fn text(&mut self, text: &str) {
        let (Some(concept), Some(lang)) = (&self.current_concept, &self.name_lang) else {
            return;
        };

        let label = self.doc.concept_labels.entry(concept.clone()).or_default();
        if lang == self.language || label.is_empty() {
            *label = text.to_string();
        }
    }
}

struct ConstraintParser {
    values: HashMap<String, Vec<String>>,
    current_key: Option<String>,
    in_value: bool,
}

impl XmlVisitor for ConstraintParser {
    fn start(&mut self, elem: &BytesStart<'_>) -> Result<()> {
        match elem.local_name().as_ref() {
            b"KeyValue" => {
                self.current_key = attribute(elem, b"id")?
                    .filter(|id| !id.is_empty())
                    .map(|id| id.to_lowercase());
            }
            b"Value" if self.current_key.is_some() => self.in_value = true,
            _ => (),
        }
        Ok(())
    }

    fn end(&mut self, local_name: &[u8]) {
        match local_name {
            b"KeyValue" => self.current_key = None,
            b"Value" => self.in_value = false,
            _ => (),
        }
    }

    fn text(&mut self, text: &str) {
        if !self.in_value {
            return;
        }
        if let Some(key) = &self.current_key {
            self.values
                .entry(key.clone())
                .or_default()
                .push(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use eurostat_error::ErrorKind;

    use super::*;
    use crate::testutil::{MockHttpClient, MockResponse};

    const STRUCTURE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<m:Structure xmlns:m="http://www.sdmx.org/resources/sdmxml/schemas/v2_1/message" xmlns:s="http://www.sdmx.org/resources/sdmxml/schemas/v2_1/structure" xmlns:c="http://www.sdmx.org/resources/sdmxml/schemas/v2_1/common">
  <m:Structures>
    <s:Concepts>
      <s:ConceptScheme id="ESTAT_CS" agencyID="ESTAT" version="1.0">
        <c:Name xml:lang="en">Concept scheme</c:Name>
        <s:Concept id="FREQ">
          <c:Name xml:lang="de">Zeitliche Frequenz</c:Name>
          <c:Name xml:lang="en">Time frequency</c:Name>
        </s:Concept>
        <s:Concept id="GEO">
          <c:Name xml:lang="fr">Entité géopolitique</c:Name>
          <c:Name xml:lang="en">Geopolitical entity (reporting)</c:Name>
        </s:Concept>
        <s:Concept id="TIME_PERIOD">
          <c:Name xml:lang="en">Time</c:Name>
        </s:Concept>
        <s:Concept id="UNIT">
          <c:Name xml:lang="fr">Unité de mesure</c:Name>
        </s:Concept>
      </s:ConceptScheme>
    </s:Concepts>
    <s:DataStructures>
      <s:DataStructure id="DEMO_R_D2JAN" agencyID="ESTAT" version="1.0">
        <s:DataStructureComponents>
          <s:DimensionList id="DimensionDescriptor">
            <s:Dimension id="freq" position="1">
              <s:ConceptIdentity><Ref id="FREQ" maintainableParentID="ESTAT_CS" class="Concept"/></s:ConceptIdentity>
              <s:LocalRepresentation><s:Enumeration><Ref id="FREQ" class="Codelist"/></s:Enumeration></s:LocalRepresentation>
            </s:Dimension>
            <s:Dimension id="geo" position="3">
              <s:ConceptIdentity><Ref id="GEO" class="Concept"/></s:ConceptIdentity>
            </s:Dimension>
            <s:Dimension id="unit" position="2">
              <s:ConceptIdentity><Ref id="UNIT" class="Concept"/></s:ConceptIdentity>
            </s:Dimension>
            <s:TimeDimension id="TIME_PERIOD" position="4">
              <s:ConceptIdentity><Ref id="TIME_PERIOD" class="Concept"/></s:ConceptIdentity>
            </s:TimeDimension>
          </s:DimensionList>
        </s:DataStructureComponents>
      </s:DataStructure>
    </s:DataStructures>
  </m:Structures>
</m:Structure>"#;

    const CONSTRAINT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<m:Structure xmlns:m="m" xmlns:s="s" xmlns:c="c">
  <m:Structures>
    <s:Constraints>
      <s:ContentConstraint id="DEMO_R_D2JAN" type="Actual">
        <s:CubeRegion include="true">
          <c:KeyValue id="freq"><c:Value>A</c:Value></c:KeyValue>
          <c:KeyValue id="GEO"><c:Value>AL</c:Value><c:Value>DE</c:Value><c:Value>DE1</c:Value></c:KeyValue>
        </s:CubeRegion>
      </s:ContentConstraint>
    </s:Constraints>
  </m:Structures>
</m:Structure>"#;

    #[test]
    fn parse_structure_document() {
        let doc = StructureDocument::parse(STRUCTURE_XML, "en").unwrap();

        let ids: Vec<_> = doc.dimensions.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(vec!["freq", "geo", "unit", "TIME_PERIOD"], ids);
        assert!(doc.dimensions[3].is_time);
        assert_eq!(Some("GEO"), doc.dimensions[1].concept_id.as_deref());
        assert_eq!("Time frequency", doc.concept_labels["FREQ"]);
        // No english name, falls back to the first one.
        assert_eq!("Unité de mesure", doc.concept_labels["UNIT"]);
    }

    #[test]
    fn parse_structure_other_language() {
        let doc = StructureDocument::parse(STRUCTURE_XML, "de").unwrap();
        assert_eq!("Zeitliche Frequenz", doc.concept_labels["FREQ"]);
        assert_eq!("Entité géopolitique", doc.concept_labels["GEO"]);
    }

    #[test]
    fn structure_into_catalog() {
        let doc = StructureDocument::parse(STRUCTURE_XML, "en").unwrap();
        let catalog = doc.into_catalog(None).unwrap();

        let names: Vec<_> = catalog.dimensions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(vec!["freq", "unit", "geo", "geo_level", "time_period"], names);
        assert_eq!("Geopolitical entity (reporting)", catalog.find("geo").unwrap().label);
        assert_eq!("Time", catalog.find("time_period").unwrap().label);
    }

    #[test]
    fn invalid_position() {
        let xml = r#"<s:DimensionList><s:Dimension id="geo" position="x"/></s:DimensionList>"#;
        let err = StructureDocument::parse(xml, "en").unwrap_err();
        assert_eq!(ErrorKind::Format, err.kind());
    }

    #[test]
    fn malformed_xml() {
        let err = StructureDocument::parse("<a><b></a>", "en").unwrap_err();
        assert_eq!(ErrorKind::Format, err.kind());
    }

    #[test]
    fn parse_constraint() {
        let values = parse_content_constraint(CONSTRAINT_XML).unwrap();
        assert_eq!(vec!["A"], values["freq"]);
        assert_eq!(vec!["AL", "DE", "DE1"], values["geo"]);
    }

    #[tokio::test]
    async fn remote_lookup() {
        let endpoint = lookup_endpoint("ESTAT").unwrap();
        let client = MockHttpClient::new()
            .with_response(
                &endpoint.structure_url("demo_r_d2jan"),
                MockResponse::xml(StatusCode::OK, STRUCTURE_XML).gzipped(),
            )
            .with_response(
                &endpoint.constraint_url("demo_r_d2jan"),
                MockResponse::xml(StatusCode::OK, CONSTRAINT_XML),
            );

        let provider = RemoteCatalogProvider::new(client.clone(), "en").with_values(true);
        let catalog = provider.lookup_catalog("ESTAT", "demo_r_d2jan").await.unwrap();

        assert_eq!(vec!["AL", "DE", "DE1"], catalog.find("geo").unwrap().values);
        assert_eq!(2, client.requests().len());
    }

    #[tokio::test]
    async fn remote_lookup_unknown_dataset() {
        let endpoint = lookup_endpoint("ESTAT").unwrap();
        let client = MockHttpClient::new().with_response(
            &endpoint.structure_url("nope"),
            MockResponse::fault(StatusCode::NOT_FOUND, "No results found"),
        );

        let provider = RemoteCatalogProvider::new(client, "en");
        let err = provider.lookup_catalog("ESTAT", "nope").await.unwrap_err();
        assert_eq!(ErrorKind::InvalidInput, err.kind());
    }

    #[tokio::test]
    async fn remote_lookup_rejects_bad_input_before_requesting() {
        let client = MockHttpClient::new();
        let provider = RemoteCatalogProvider::new(client.clone(), "en");

        let err = provider.lookup_catalog("", "demo_r_d2jan").await.unwrap_err();
        assert_eq!(ErrorKind::InvalidInput, err.kind());
        let err = provider.lookup_catalog("ESTAT", "").await.unwrap_err();
        assert_eq!(ErrorKind::InvalidInput, err.kind());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn remote_lookup_server_error() {
        let endpoint = lookup_endpoint("ESTAT").unwrap();
        let client = MockHttpClient::new().with_response(
            &endpoint.structure_url("demo_r_d2jan"),
            MockResponse::fault(StatusCode::INTERNAL_SERVER_ERROR, "Internal failure"),
        );

        let provider = RemoteCatalogProvider::new(client, "en");
        let err = provider.lookup_catalog("ESTAT", "demo_r_d2jan").await.unwrap_err();
        assert_eq!(ErrorKind::Upstream, err.kind());
        assert_eq!(Some("500"), err.get_field("status"));
        assert_eq!(Some("Internal failure"), err.get_field("message"));
    }
}
