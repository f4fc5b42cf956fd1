//! Request building and response decoding shared by both scoped clients.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, Result};

/// Join the configured host with a relative API path.
///
/// Only the trailing slash of the host is normalized; the path is used as is.
pub fn build_url(host: &str, api_path: &str) -> String {
    if host.is_empty() {
        api_path.to_string()
    } else if host.ends_with('/') {
        format!("{host}{api_path}")
    } else {
        format!("{host}/{api_path}")
    }
}

/// Build a JSON request. The body, when present, is serialized eagerly so
/// encoding failures surface before anything goes on the wire.
pub fn build_request<B>(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<&B>,
) -> Result<RequestBuilder>
where
    B: Serialize + ?Sized,
{
    let mut req = http
        .request(method, url)
        .header(CONTENT_TYPE, "application/json");
    if let Some(body) = body {
        let bytes = serde_json::to_vec(body).map_err(ApiError::Serialization)?;
        req = req.body(bytes);
    }
    Ok(req)
}

/// Read the response body and deserialize it into `T`.
///
/// Any status outside `200..300` becomes [`ApiError::Http`] carrying the raw body.
pub async fn decode_response<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::http(status.as_u16(), body));
    }
    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(ApiError::Decode)
}

/// Send a prepared request and decode its response.
pub(crate) async fn execute<T: DeserializeOwned>(
    req: RequestBuilder,
    method: &Method,
    api_path: &str,
) -> Result<T> {
    let result: Result<T> = async {
        let resp = req.send().await?;
        tracing::debug!(
            method = %method,
            path = %api_path,
            status = resp.status().as_u16(),
            "langfuse api call"
        );
        decode_response(resp).await
    }
    .await;

    if let Err(error) = &result {
        tracing::debug!(
            method = %method,
            path = %api_path,
            category = %error.category(),
            status = ?error.status(),
            "langfuse api call failed"
        );
    }
    result
}
