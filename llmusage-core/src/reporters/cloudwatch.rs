use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::error::CoreResult;
use crate::http_client::HttpClient;
use crate::report::{TokenUsageReport, UsageReporter};

/// Forwards each report's numeric fields as named metric data points to a
/// CloudWatch-compatible HTTP endpoint (typically an agent or proxy that
/// handles request signing), tagged with `ModelName` and `CallerId`
/// dimensions.
///
/// Absent report fields produce no datum for their metric; absence is not
/// zero on the wire. Transport failures surface from `send_report`.
#[derive(Debug, Clone)]
pub struct CloudWatchReporter {
    http: HttpClient,
    endpoint: String,
    namespace: String,
    auth_token: Option<SecretString>,
}

#[derive(Serialize)]
struct PutMetricData<'a> {
    #[serde(rename = "Namespace")]
    namespace: &'a str,
    #[serde(rename = "MetricData")]
    metric_data: Vec<MetricDatum<'a>>,
}

#[derive(Serialize)]
struct MetricDatum<'a> {
    #[serde(rename = "MetricName")]
    metric_name: &'static str,
    #[serde(rename = "Value")]
    value: f64,
    #[serde(rename = "Unit")]
    unit: &'static str,
    #[serde(rename = "Timestamp")]
    timestamp_ms: i64,
    #[serde(rename = "Dimensions")]
    dimensions: &'a [Dimension],
}

#[derive(Serialize)]
struct Dimension {
    #[serde(rename = "Name")]
    name: &'static str,
    #[serde(rename = "Value")]
    value: String,
}

impl CloudWatchReporter {
    pub fn new(
        http: HttpClient,
        endpoint: String,
        namespace: String,
        auth_token: Option<SecretString>,
    ) -> Self {
        Self {
            http,
            endpoint,
            namespace,
            auth_token,
        }
    }

    fn dimensions(report: &TokenUsageReport) -> Vec<Dimension> {
        let mut dims = vec![Dimension {
            name: "ModelName",
            value: report.model_name.clone(),
        }];
        if let Some(caller) = &report.caller_id {
            dims.push(Dimension {
                name: "CallerId",
                value: caller.clone(),
            });
        }
        dims
    }

    fn metric_data<'a>(
        report: &TokenUsageReport,
        dimensions: &'a [Dimension],
    ) -> Vec<MetricDatum<'a>> {
        let ts = report.timestamp_ms;
        let datum = |metric_name, value: f64, unit| MetricDatum {
            metric_name,
            value,
            unit,
            timestamp_ms: ts,
            dimensions,
        };

        let mut data = vec![datum("SuccessfulRequests", 1.0, "Count")];
        if let Some(n) = report.prompt_tokens {
            data.push(datum("PromptTokens", f64::from(n), "Count"));
        }
        if let Some(n) = report.completion_tokens {
            data.push(datum("CompletionTokens", f64::from(n), "Count"));
        }
        if let Some(n) = report.total_tokens {
            data.push(datum("TotalTokens", f64::from(n), "Count"));
        }
        if let Some(cost) = report.total_cost {
            data.push(datum("TotalCost", cost, "None"));
        }
        if let Some(secs) = report.first_token_secs {
            data.push(datum("FirstTokenTime", secs, "Seconds"));
        }
        if let Some(secs) = report.completion_secs {
            data.push(datum("CompletionTime", secs, "Seconds"));
        }
        data
    }
}

#[async_trait]
impl UsageReporter for CloudWatchReporter {
    async fn send_report(&self, report: TokenUsageReport) -> CoreResult<()> {
        let dimensions = Self::dimensions(&report);
        let payload = PutMetricData {
            namespace: &self.namespace,
            metric_data: Self::metric_data(&report, &dimensions),
        };

        let token = self
            .auth_token
            .as_ref()
            .map(|t| format!("Bearer {}", t.expose_secret()));
        let mut headers: Vec<(&str, &str)> = Vec::new();
        if let Some(token) = &token {
            headers.push(("Authorization", token));
        }

        self.http.post_json(&self.endpoint, &payload, &headers).await
    }
}
