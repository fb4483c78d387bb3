//! In memory http client for tests.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use eurostat_error::{EurostatError, Result};
use eurostat_http::client::{HttpClient, HttpResponse};
use eurostat_http::header::{CONTENT_TYPE, HeaderValue};
use eurostat_http::{HeaderMap, Request, StatusCode};
use futures::future::{Ready, ready};
use futures::stream;
use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl MockResponse {
    pub fn tsv(body: &str) -> Self {
        MockResponse {
            status: StatusCode::OK,
            content_type: "application/octet-stream",
            body: Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    pub fn xml(status: StatusCode, body: &str) -> Self {
        MockResponse {
            status,
            content_type: "application/xml",
            body: Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    pub fn json(body: &str) -> Self {
        MockResponse {
            status: StatusCode::OK,
            content_type: "application/json",
            body: Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    /// A SOAP fault with the given message.
    pub fn fault(status: StatusCode, message: &str) -> Self {
        let body = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><S:Fault xmlns:S="http://schemas.xmlsoap.org/soap/envelope/"><faultcode>S:Server</faultcode><faultstring>{message}</faultstring></S:Fault>"#
        );
        Self::xml(status, &body)
    }

    pub fn gzipped(mut self) -> Self {
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(&self.body).unwrap();
        self.body = Bytes::from(enc.finish().unwrap());
        self
    }

    pub fn zstd(mut self) -> Self {
        self.body = Bytes::from(zstd::stream::encode_all(self.body.as_ref(), 3).unwrap());
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, MockResponse>,
    requests: Vec<String>,
}

/// Http client serving canned responses keyed by the full url.
///
/// Requests for unknown urls fail with a transport error.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    state: Arc<Mutex<MockState>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, url: &str, response: MockResponse) -> Self {
        self.state
            .lock()
            .responses
            .insert(url.to_string(), response);
        self
    }

    /// Urls requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }
}

impl HttpClient for MockHttpClient {
    type Response = MockHttpResponse;
    type RequestFuture = Ready<Result<MockHttpResponse>>;

    fn do_request(&self, request: Request) -> Self::RequestFuture {
        let url = request.url().to_string();
        let mut state = self.state.lock();
        state.requests.push(url.clone());

        match state.responses.get(&url) {
            Some(resp) => {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(resp.content_type));
                ready(Ok(MockHttpResponse {
                    status: resp.status,
                    headers,
                    body: resp.body.clone(),
                }))
            }
            None => ready(Err(
                EurostatError::transport("Connection refused").with_field("url", url)
            )),
        }
    }
}

#[derive(Debug)]
pub struct MockHttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse for MockHttpResponse {
    type BytesStream = stream::Iter<std::vec::IntoIter<Result<Bytes>>>;

    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn into_bytes_stream(self) -> Self::BytesStream {
        // Split the body to exercise reassembly.
        let mid = self.body.len() / 2;
        let chunks = vec![Ok(self.body.slice(..mid)), Ok(self.body.slice(mid..))];
        stream::iter(chunks)
    }
}
