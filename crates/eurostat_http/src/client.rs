use std::fmt::Debug;

use bytes::{Bytes, BytesMut};
use eurostat_error::{EurostatError, Result};
use futures::{Stream, TryStreamExt};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Request, StatusCode};
use serde::de::DeserializeOwned;

use crate::decompress::decompress_if_framed;

pub trait HttpClient: Sync + Send + Debug + Clone + 'static {
    type Response: HttpResponse;
    type RequestFuture: Future<Output = Result<Self::Response>> + Send + Unpin;

    /// Do the request.
    fn do_request(&self, request: Request) -> Self::RequestFuture;
}

pub trait HttpResponse: Send {
    type BytesStream: Stream<Item = Result<Bytes>> + Send + Unpin;

    fn status(&self) -> StatusCode;
    fn headers(&self) -> &HeaderMap;

    /// Convert the response body into a byte stream.
    fn into_bytes_stream(self) -> Self::BytesStream;
}

/// Get the content type of a response, if set and valid ascii.
pub fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

/// Collect the full body of a response.
pub async fn read_bytes(resp: impl HttpResponse) -> Result<Bytes> {
    let mut stream = resp.into_bytes_stream();
    let mut buf = BytesMut::new();
    while let Some(bs) = stream.try_next().await? {
        buf.extend_from_slice(bs.as_ref());
    }
    Ok(buf.freeze())
}

/// Collect the full body of a response, decompressing it if it's gzip or zstd
/// framed.
///
/// Compression is detected from the leading bytes, the declared content type
/// is ignored.
pub async fn read_decompressed(resp: impl HttpResponse) -> Result<Vec<u8>> {
    let bytes = read_bytes(resp).await?;
    decompress_if_framed(&bytes)
}

/// Read the (possibly compressed) body as utf8 text.
pub async fn read_text(resp: impl HttpResponse) -> Result<String> {
    let body = read_decompressed(resp).await?;
    String::from_utf8(body)
        .map_err(|e| EurostatError::format("Response body is not valid utf8").with_field("error", e))
}

/// Read the (possibly compressed) body as json.
pub async fn read_json<T: DeserializeOwned>(resp: impl HttpResponse) -> Result<T> {
    let body = read_decompressed(resp).await?;
    serde_json::from_slice(&body).map_err(|e| {
        EurostatError::format("Failed to deserialize response body as json").with_field("error", e)
    })
}
