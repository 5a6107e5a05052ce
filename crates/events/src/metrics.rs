//! InfluxDB v2 metrics sink.
//!
//! Each scan cycle writes one `disk_health` point per reading, encoded in
//! line protocol and posted to `/api/v2/write` with second precision.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use diskwarden_core::ports::MetricsSink;
use diskwarden_core::reading::DiskReading;

/// Measurement name for disk health points.
pub const MEASUREMENT: &str = "disk_health";

/// HTTP request timeout for a single write.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_ORG: &str = "diskwarden";
const DEFAULT_BUCKET: &str = "diskwarden";
const DEFAULT_HOST_TAG: &str = "diskwarden";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("InfluxDB returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// InfluxConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// Base URL, e.g. `http://localhost:8086`.
    pub url: String,
    pub token: Option<String>,
    pub org: String,
    pub bucket: String,
    /// Value of the `host` tag on every point.
    pub host_tag: String,
}

impl InfluxConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `INFLUX_URL` is not set, which disables the sink.
    ///
    /// | Variable          | Required | Default      |
    /// |-------------------|----------|--------------|
    /// | `INFLUX_URL`      | yes      |              |
    /// | `INFLUX_TOKEN`    | no       |              |
    /// | `INFLUX_ORG`      | no       | `diskwarden` |
    /// | `INFLUX_BUCKET`   | no       | `diskwarden` |
    /// | `INFLUX_HOST_TAG` | no       | `diskwarden` |
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("INFLUX_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())?;
        let var_or = |key: &str, default: &str| {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };
        Some(Self {
            url: url.trim_end_matches('/').to_string(),
            token: std::env::var("INFLUX_TOKEN").ok(),
            org: var_or("INFLUX_ORG", DEFAULT_ORG),
            bucket: var_or("INFLUX_BUCKET", DEFAULT_BUCKET),
            host_tag: var_or("INFLUX_HOST_TAG", DEFAULT_HOST_TAG),
        })
    }
}

// ---------------------------------------------------------------------------
// Line protocol
// ---------------------------------------------------------------------------

/// Escape a tag key or value: commas, equals signs and spaces.
fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Encode one point per reading. Empty tags and absent fields are omitted.
pub fn line_protocol(readings: &[DiskReading], host: &str, timestamp_secs: i64) -> String {
    let mut body = String::new();
    for r in readings {
        body.push_str(MEASUREMENT);

        let tags = [
            ("host", Some(host)),
            ("device", Some(r.device.as_str())),
            ("serial_no", r.serial_no.as_deref()),
            ("model_id", r.model_id.as_deref()),
        ];
        for (key, value) in tags {
            if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
                let _ = write!(body, ",{key}={}", escape_tag(v));
            }
        }

        let fields = [
            ("health_percent", Some(r.health_percent)),
            ("performance_percent", r.performance),
            ("temp_c", r.temp),
            ("temp_max_c", r.highest_temp),
            ("power_on_hours", r.power_on_hours),
            ("lifetime_days", r.lifetime_days),
        ];
        let mut sep = ' ';
        for (key, value) in fields {
            if let Some(v) = value {
                let _ = write!(body, "{sep}{key}={v}i");
                sep = ',';
            }
        }

        let _ = writeln!(body, " {timestamp_secs}");
    }
    body
}

// ---------------------------------------------------------------------------
// InfluxWriter
// ---------------------------------------------------------------------------

pub struct InfluxWriter {
    client: reqwest::Client,
    config: InfluxConfig,
}

impl InfluxWriter {
    pub fn new(config: InfluxConfig) -> Result<Self, MetricsError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    /// Write the snapshot as of `timestamp_secs`.
    pub async fn write(&self, readings: &[DiskReading], timestamp_secs: i64) -> Result<(), MetricsError> {
        let body = line_protocol(readings, &self.config.host_tag, timestamp_secs);
        let mut request = self
            .client
            .post(format!("{}/api/v2/write", self.config.url))
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "s"),
            ])
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body);
        if let Some(token) = &self.config.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Token {token}"));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MetricsError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsSink for InfluxWriter {
    async fn record(&self, readings: &[DiskReading]) -> bool {
        if readings.is_empty() {
            return true;
        }
        match self.write(readings, Utc::now().timestamp()).await {
            Ok(()) => {
                tracing::debug!(points = readings.len(), "Metrics written");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Metrics write failed");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> DiskReading {
        DiskReading {
            device: "/dev/sda".to_string(),
            serial_no: Some("WD-1".to_string()),
            health_percent: 97,
            model_id: Some("WDC WD40EFRX".to_string()),
            temp: Some(34),
            highest_temp: Some(51),
            performance: None,
            power_on_hours: Some(12000),
            lifetime_days: None,
        }
    }

    #[test]
    fn encodes_tags_fields_and_timestamp() {
        let body = line_protocol(&[reading()], "nas", 1_700_000_000);
        assert_eq!(
            body,
            "disk_health,host=nas,device=/dev/sda,serial_no=WD-1,model_id=WDC\\ WD40EFRX \
             health_percent=97i,temp_c=34i,temp_max_c=51i,power_on_hours=12000i 1700000000\n"
        );
    }

    #[test]
    fn empty_tags_are_omitted() {
        let mut r = reading();
        r.serial_no = Some(String::new());
        r.model_id = None;
        let body = line_protocol(&[r], "nas", 1);
        assert!(body.starts_with("disk_health,host=nas,device=/dev/sda health_percent=97i"));
    }

    #[test]
    fn tag_escaping() {
        assert_eq!(escape_tag("a,b=c d"), "a\\,b\\=c\\ d");
    }

    #[test]
    fn one_line_per_reading() {
        let body = line_protocol(&[reading(), reading()], "nas", 1);
        assert_eq!(body.lines().count(), 2);
    }

    #[test]
    fn empty_snapshot_encodes_nothing() {
        assert!(line_protocol(&[], "nas", 1).is_empty());
    }
}
