// HTTP client for the Flux query endpoint

use serde::Deserialize;
use std::time::Duration;

use super::{QueryError, QueryRequest, QueryService, ResultCursor, csv};

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for an InfluxDB 2.x compatible `/api/v2/query` endpoint.
/// Carries the identity/authorization context; the request itself is
/// just query text.
#[derive(Debug, Clone)]
pub struct FluxClient {
    host: String,
    org: Option<String>,
    token: Option<String>,
    http: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    message: String,
}

impl FluxClient {
    pub fn new(
        host: &str,
        org: Option<String>,
        token: Option<String>,
    ) -> Result<Self, QueryError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()?;

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            org,
            token,
            http,
        })
    }
}

impl QueryService for FluxClient {
    fn query(&self, request: &QueryRequest) -> Result<ResultCursor, QueryError> {
        let body = serde_json::json!({
            "query": request.query,
            "type": "flux",
            "dialect": {
                "header": true,
                "annotations": ["group", "datatype", "default"],
            },
        });

        let mut builder = self
            .http
            .post(format!("{}/api/v2/query", self.host))
            .header("Accept", "application/csv")
            .json(&body);

        if let Some(org) = &self.org {
            builder = builder.query(&[("org", org)]);
        }
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Token {token}"));
        }

        let response = builder.send()?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(backend_error(status.as_u16(), text));
        }

        let text = response.text()?;
        let decoded = csv::decode_response(&text)?;
        Ok(ResultCursor::new(decoded.results, decoded.terminal))
    }
}

/// The backend reports failures as a JSON `{code, message}` body; fall
/// back to the raw text when it is anything else.
fn backend_error(status: u16, text: String) -> QueryError {
    let message = serde_json::from_str::<BackendErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);
    QueryError::Backend { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_prefers_json_message() {
        let err = backend_error(
            400,
            r#"{"code":"invalid","message":"error compiling query"}"#.to_string(),
        );
        assert!(
            matches!(err, QueryError::Backend { status: 400, message } if message == "error compiling query")
        );
    }

    #[test]
    fn backend_error_falls_back_to_raw_body() {
        let err = backend_error(502, "bad gateway".to_string());
        assert!(
            matches!(err, QueryError::Backend { status: 502, message } if message == "bad gateway")
        );
    }

    #[test]
    fn host_trailing_slash_is_normalized() {
        let client = FluxClient::new("http://localhost:8086/", None, None).unwrap();
        assert_eq!(client.host, "http://localhost:8086");
    }
}
