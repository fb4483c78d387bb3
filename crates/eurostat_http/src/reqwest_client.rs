use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use eurostat_error::{EurostatError, Result, ResultExt};
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::{Request, StatusCode};
use tracing::debug;

use crate::client::{HttpClient, HttpResponse};
use crate::settings::HttpSettings;

/// Http client backed by reqwest, with requests spawned onto a tokio runtime.
///
/// Requests are spawned since the caller may be polling from outside of the
/// tokio context.
#[derive(Debug, Clone)]
pub struct TokioWrappedHttpClient {
    client: reqwest::Client,
    handle: tokio::runtime::Handle,
}

impl TokioWrappedHttpClient {
    pub fn new(client: reqwest::Client, handle: tokio::runtime::Handle) -> Self {
        TokioWrappedHttpClient { client, handle }
    }

    /// Build a client from settings.
    ///
    /// Settings are captured once, changing the settings afterwards has no
    /// effect on this client.
    pub fn try_from_settings(settings: &HttpSettings, handle: tokio::runtime::Handle) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .context("Failed to build http client")?;

        Ok(Self::new(client, handle))
    }
}

impl HttpClient for TokioWrappedHttpClient {
    type Response = ReqwestResponse;
    type RequestFuture = ResponseJoinHandle;

    fn do_request(&self, request: Request) -> Self::RequestFuture {
        debug!(url = %request.url(), method = %request.method(), "http request");

        let client = self.client.clone();
        let join_handle = self.handle.spawn(async move {
            let resp = client.execute(request).await.map_err(|e| {
                EurostatError::transport("Failed to send request")
                    .with_field("error", e)
            })?;
            Ok::<_, EurostatError>(ReqwestResponse::from(resp))
        });

        ResponseJoinHandle { join_handle }
    }
}

pub struct ResponseJoinHandle {
    join_handle: tokio::task::JoinHandle<Result<ReqwestResponse>>,
}

impl Future for ResponseJoinHandle {
    type Output = Result<ReqwestResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.join_handle.poll_unpin(cx) {
            Poll::Ready(Err(e)) => Poll::Ready(Err(EurostatError::with_source(
                "Failed to join request task",
                Box::new(e),
            ))),
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[derive(Debug)]
pub struct ReqwestResponse {
    status: StatusCode,
    headers: HeaderMap,
    response: reqwest::Response,
}

impl From<reqwest::Response> for ReqwestResponse {
    fn from(response: reqwest::Response) -> Self {
        ReqwestResponse {
            status: response.status(),
            headers: response.headers().clone(),
            response,
        }
    }
}

impl HttpResponse for ReqwestResponse {
    type BytesStream = BoxStream<'static, Result<Bytes>>;

    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn into_bytes_stream(self) -> Self::BytesStream {
        self.response
            .bytes_stream()
            .map(|result| {
                result.map_err(|e| {
                    EurostatError::transport("Failed to stream response body")
                        .with_field("error", e)
                })
            })
            .boxed()
    }
}
