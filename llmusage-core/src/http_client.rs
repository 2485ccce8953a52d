use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::error::{CoreResult, UsageError};

/// Thin wrapper around `reqwest::Client` with defaults suited to a
/// fire-and-forget metrics push: short connect timeout, bounded total time.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new_default() -> CoreResult<Self> {
        let inner = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| UsageError::Other(anyhow::anyhow!("http client build failed: {e}")))?;
        Ok(Self {
            inner,
            user_agent: "llmusage/0.1".to_string(),
        })
    }

    /// POST a JSON body; the response payload is discarded, only the status
    /// matters. Non-success statuses map to typed sink errors.
    pub async fn post_json<T: Serialize>(
        &self,
        url: &str,
        body: &T,
        headers: &[(&str, &str)],
    ) -> CoreResult<()> {
        let mut req = self
            .inner
            .post(url)
            .json(body)
            .header("User-Agent", &self.user_agent);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let resp = req.send().await.map_err(|_e| UsageError::SinkUnavailable)?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(resp.headers());
            let text = resp.text().await.unwrap_or_default();
            return Err(map_http_error(status, retry_after, &text));
        }
        Ok(())
    }
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    if let Some(v) = headers.get("retry-after")
        && let Ok(s) = v.to_str()
        && let Ok(secs) = s.trim().parse::<u64>()
    {
        return Some(secs);
    }
    None
}

fn map_http_error(status: StatusCode, retry_after: Option<u64>, body: &str) -> UsageError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => UsageError::SinkRateLimited { retry_after },
        s if s.is_server_error() => UsageError::SinkUnavailable,
        s => UsageError::SinkRejected {
            code: s.as_u16().to_string(),
            message: truncate(body, 300),
        },
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        // Back off to a char boundary; a byte slice could split a
        // multibyte character and panic.
        let mut idx = max;
        while !s.is_char_boundary(idx) {
            idx -= 1;
        }
        let mut t = s[..idx].to_string();
        t.push_str("...");
        t
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    #[tokio::test]
    async fn post_json_success() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST).path("/metrics");
            then.status(200).json_body(json!({"ok": true}));
        });

        let client = HttpClient::new_default().unwrap();
        client
            .post_json(
                &format!("{}/metrics", server.base_url()),
                &json!({"v": 1}),
                &[("X-Extra", "yes")],
            )
            .await
            .unwrap();
        m.assert();
    }

    #[tokio::test]
    async fn status_429_maps_to_rate_limited() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/metrics");
            then.status(429).header("Retry-After", "2").body("slow down");
        });
        let client = HttpClient::new_default().expect("client");
        let err = client
            .post_json(&format!("{}/metrics", server.base_url()), &json!({}), &[])
            .await
            .unwrap_err();
        match err {
            UsageError::SinkRateLimited { retry_after } => assert_eq!(retry_after, Some(2)),
            other => panic!("expected SinkRateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_503_maps_to_unavailable() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/metrics");
            then.status(503).body("oops");
        });
        let client = HttpClient::new_default().expect("client");
        let err = client
            .post_json(&format!("{}/metrics", server.base_url()), &json!({}), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, UsageError::SinkUnavailable));
    }

    #[tokio::test]
    async fn status_400_truncates_body() {
        let server = MockServer::start();
        let big = "x".repeat(1000);
        let _m = server.mock(|when, then| {
            when.method(POST).path("/metrics");
            then.status(400).body(big.clone());
        });
        let client = HttpClient::new_default().expect("client");
        let err = client
            .post_json(&format!("{}/metrics", server.base_url()), &json!({}), &[])
            .await
            .unwrap_err();
        match err {
            UsageError::SinkRejected { code, message } => {
                assert_eq!(code, "400");
                assert!(message.ends_with("..."));
            }
            other => panic!("expected SinkRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_400_with_multibyte_body_truncates_on_char_boundary() {
        let server = MockServer::start();
        // 'é' spans bytes 299..301, straddling the 300-byte cut.
        let body = format!("{}é", "x".repeat(299));
        let _m = server.mock(|when, then| {
            when.method(POST).path("/metrics");
            then.status(400).body(body.clone());
        });
        let client = HttpClient::new_default().expect("client");
        let err = client
            .post_json(&format!("{}/metrics", server.base_url()), &json!({}), &[])
            .await
            .unwrap_err();
        match err {
            UsageError::SinkRejected { code, message } => {
                assert_eq!(code, "400");
                assert_eq!(message, format!("{}...", "x".repeat(299)));
            }
            other => panic!("expected SinkRejected, got {other:?}"),
        }
    }

    #[test]
    fn truncate_backs_off_multibyte_boundary() {
        let s = format!("{}日本", "a".repeat(298));
        assert_eq!(truncate(&s, 300), format!("{}...", "a".repeat(298)));
        assert_eq!(truncate("short", 300), "short");
    }

    #[tokio::test]
    async fn network_error_maps_to_unavailable() {
        // Port 9 (discard) is typically closed; fails fast.
        let client = HttpClient::new_default().expect("client");
        let err = client
            .post_json("http://127.0.0.1:9/metrics", &json!({}), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, UsageError::SinkUnavailable));
    }
}
