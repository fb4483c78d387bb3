use eurostat_error::{EurostatError, Result};
use eurostat_http::client::{HttpClient, HttpResponse, content_type, read_text};
use eurostat_http::{Method, Request, StatusCode, Url};
use tracing::debug;

use crate::fault::{Fault, parse_fault};

/// A fully read response.
#[derive(Debug, Clone)]
pub(crate) struct TextResponse {
    pub status: StatusCode,
    /// If the declared content type is some flavor of xml.
    pub is_xml: bool,
    /// Decompressed body.
    pub body: String,
}

impl TextResponse {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    pub fn fault(&self) -> Option<Fault> {
        parse_fault(&self.body)
    }

    /// Create an upstream error for this response, including the status and
    /// the fault string if there is one.
    pub fn upstream_error(&self, msg: &str) -> EurostatError {
        let err = EurostatError::upstream(msg).with_field("status", self.status.as_u16());
        match self.fault() {
            Some(fault) => err.with_field("message", fault.description()),
            None => {
                let reason = self.status.canonical_reason().unwrap_or("unknown");
                err.with_field("message", reason)
            }
        }
    }
}

/// Issue a GET request and read the full body as text.
pub(crate) async fn get_text<C: HttpClient>(client: &C, url: &str) -> Result<TextResponse> {
    let parsed = Url::parse(url).map_err(|e| {
        EurostatError::new("Failed to parse url")
            .with_field("url", url)
            .with_field("error", e)
    })?;

    let resp = client.do_request(Request::new(Method::GET, parsed)).await?;
    let status = resp.status();
    let is_xml = content_type(resp.headers())
        .map(|ct| ct.contains("xml"))
        .unwrap_or(false);

    let body = read_text(resp).await?;
    debug!(%url, %status, is_xml, bytes = body.len(), "read response");

    Ok(TextResponse {
        status,
        is_xml,
        body,
    })
}
