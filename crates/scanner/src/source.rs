//! Reading source backed by an external command.
//!
//! The command prints the current snapshot to stdout as a JSON array of
//! readings. It is killed if it outlives the configured timeout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use diskwarden_core::ports::{DiskReadingSource, SourceError};
use diskwarden_core::reading::DiskReading;
use tokio::process::Command;

/// Longest stderr excerpt carried into an error message.
const STDERR_EXCERPT: usize = 512;

#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSource {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build from a whitespace-separated command line, e.g. `diskwarden-reader --json`.
    ///
    /// Returns `None` for a blank command line.
    pub fn from_command_line(command_line: &str, timeout: Duration) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect(), timeout))
    }
}

/// Decode the reader's stdout.
///
/// Output that is not a JSON array fails the whole snapshot. An element that
/// does not decode as a reading is logged and dropped; the rest still count.
pub fn parse_snapshot(stdout: &[u8]) -> Result<Vec<DiskReading>, SourceError> {
    let elements: Vec<serde_json::Value> =
        serde_json::from_slice(stdout).map_err(|e| SourceError::Malformed(e.to_string()))?;

    let readings = elements
        .into_iter()
        .enumerate()
        .filter_map(|(index, element)| {
            serde_json::from_value::<DiskReading>(element)
                .map_err(|e| tracing::warn!(index, error = %e, "Dropping malformed reading"))
                .ok()
        })
        .collect();
    Ok(readings)
}

#[async_trait]
impl DiskReadingSource for CommandSource {
    async fn read(&self) -> Result<Vec<DiskReading>, SourceError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| SourceError::Timeout(self.timeout))?
            .map_err(|e| SourceError::Unavailable(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            return Err(SourceError::Unavailable(format!(
                "{} exited with {}: {excerpt}",
                self.program, output.status
            )));
        }

        parse_snapshot(&output.stdout)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn parses_snapshot_with_optional_fields() {
        let json = br#"[
            {"device": "/dev/sda", "serial_no": "WD-1", "health_percent": 97, "temp": 33},
            {"device": "/dev/sdb", "health_percent": 40}
        ]"#;
        let readings = parse_snapshot(json).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].temp, Some(33));
        assert!(readings[1].serial_no.is_none());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_snapshot(b"Device: /dev/sda"),
            Err(SourceError::Malformed(_))
        ));
    }

    #[test]
    fn bad_element_is_dropped_not_the_snapshot() {
        let json = br#"[
            {"device": "/dev/sda", "serial_no": "WD-1", "health_percent": 40},
            {"device": "/dev/sdb", "serial_no": "WD-2", "health_percent": "?"},
            {"device": "/dev/sdc"},
            {"device": "/dev/sdd", "serial_no": "WD-4", "health_percent": 99}
        ]"#;
        let readings = parse_snapshot(json).unwrap();
        let devices: Vec<_> = readings.iter().map(|r| r.device.as_str()).collect();
        assert_eq!(devices, vec!["/dev/sda", "/dev/sdd"]);
    }

    #[test]
    fn non_array_output_is_malformed() {
        assert!(matches!(
            parse_snapshot(br#"{"device": "/dev/sda", "health_percent": 40}"#),
            Err(SourceError::Malformed(_))
        ));
    }

    #[test]
    fn command_line_is_split_on_whitespace() {
        let source = CommandSource::from_command_line("reader  --json -v", TIMEOUT).unwrap();
        assert_eq!(source.program, "reader");
        assert_eq!(source.args, vec!["--json", "-v"]);
        assert!(CommandSource::from_command_line("   ", TIMEOUT).is_none());
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let source = CommandSource::new("diskwarden-no-such-reader", Vec::new(), TIMEOUT);
        assert!(matches!(source.read().await, Err(SourceError::Unavailable(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reads_stdout_of_command() {
        let script = r#"echo '[{"device":"/dev/sda","health_percent":88}]'"#;
        let source = CommandSource::new("sh", vec!["-c".into(), script.into()], TIMEOUT);
        let readings = source.read().await.unwrap();
        assert_eq!(readings[0].health_percent, 88);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_unavailable() {
        let source = CommandSource::new("sh", vec!["-c".into(), "echo boom >&2; exit 3".into()], TIMEOUT);
        match source.read().await {
            Err(SourceError::Unavailable(msg)) => assert!(msg.contains("boom")),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let source = CommandSource::new(
            "sh",
            vec!["-c".into(), "sleep 5".into()],
            Duration::from_millis(100),
        );
        assert!(matches!(source.read().await, Err(SourceError::Timeout(_))));
    }
}
