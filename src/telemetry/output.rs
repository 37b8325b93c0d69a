//! Newline-delimited JSON emitter for telemetry and alert wire records.
//!
//! The record shape is an external contract: field order and float precision
//! are fixed, so records are hand-formatted rather than produced through
//! `serde_json`'s `Serialize` derive, which does not reproduce a fixed
//! 6-decimal float format or guarantee key order across struct changes.

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::anomaly::AnomalyResult;
use crate::classifier::ClassifierResult;
use crate::telemetry::sample::Sample;

/// Destination for emitted wire records. Abstracted behind a trait so the
/// cloud endpoint can later be swapped in without touching the formatting
/// logic.
pub trait Sink {
    fn emit_line(&mut self, line: &str) -> io::Result<()>;
}

/// Writes records to stdout, one JSON object per line.
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn emit_line(&mut self, line: &str) -> io::Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        lock.write_all(line.as_bytes())?;
        lock.write_all(b"\n")?;
        lock.flush()
    }
}

/// Formats and emits telemetry/alert records to a [`Sink`].
pub struct OutputWriter<S: Sink> {
    sink: S,
}

impl<S: Sink> OutputWriter<S> {
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Emit one telemetry record. `detection` is present once the agent has
    /// left warm-up; `classification` is present once a verdict exists.
    pub fn emit_telemetry(
        &mut self,
        sample: &Sample,
        detection: Option<&AnomalyResult>,
        classification: Option<&ClassifierResult>,
    ) -> io::Result<()> {
        let line = format_telemetry(sample, detection, classification);
        self.sink.emit_line(&line)
    }

    /// Emit an alert record. Callers are responsible for only invoking this
    /// when the verdict is `RANSOMWARE`; this function does not re-check.
    pub fn emit_alert(
        &mut self,
        sample: &Sample,
        anomaly: &AnomalyResult,
        classification: &ClassifierResult,
    ) -> io::Result<()> {
        let line = format_alert(sample, anomaly, classification);
        self.sink.emit_line(&line)
    }
}

/// Builds the `telemetry` record body in the fixed field order:
/// type, timestamp_ns, cycles_per_sec, cache_miss_rate, files_modified_per_sec,
/// disk_write_bytes_per_sec, top_pid, top_comm, then optionally
/// anomaly_score/z_score/flags, then optionally verdict/confidence/ransomware_score.
#[must_use]
pub fn format_telemetry(
    sample: &Sample,
    detection: Option<&AnomalyResult>,
    classification: Option<&ClassifierResult>,
) -> String {
    let mut out = String::with_capacity(256);
    out.push('{');
    write_kv_str(&mut out, "type", "telemetry", true);
    write_kv_num(&mut out, "timestamp_ns", sample.timestamp_ns as f64, 0);
    write_kv_num(&mut out, "cycles_per_sec", sample.cycles_per_sec, 6);
    write_kv_num(&mut out, "cache_miss_rate", sample.cache_miss_rate, 6);
    write_kv_num(
        &mut out,
        "files_modified_per_sec",
        sample.files_modified_per_sec,
        6,
    );
    write_kv_num(
        &mut out,
        "disk_write_bytes_per_sec",
        sample.disk_write_bytes_per_sec,
        6,
    );
    write_kv_num(&mut out, "top_pid", sample.top_pid as f64, 0);
    write_kv_str(&mut out, "top_comm", &sample.top_comm, false);

    if let Some(anomaly) = detection {
        write_kv_num(&mut out, "anomaly_score", anomaly.anomaly_score, 6);
        write_kv_num(&mut out, "z_score", anomaly.z_score, 6);
        write_kv_num(&mut out, "flags", anomaly.flags as f64, 0);
    }

    if let Some(classification) = classification {
        write_kv_str(&mut out, "verdict", classification.verdict.as_str(), false);
        write_kv_num(&mut out, "confidence", classification.confidence, 6);
        write_kv_num(
            &mut out,
            "ransomware_score",
            classification.ransomware_score,
            6,
        );
    }

    out.push('}');
    out
}

/// Builds the `alert` record body: type, timestamp_ns, ransomware_score,
/// flags, confidence.
#[must_use]
pub fn format_alert(
    sample: &Sample,
    anomaly: &AnomalyResult,
    classification: &ClassifierResult,
) -> String {
    let mut out = String::with_capacity(128);
    out.push('{');
    write_kv_str(&mut out, "type", "alert", true);
    write_kv_num(&mut out, "timestamp_ns", sample.timestamp_ns as f64, 0);
    write_kv_num(
        &mut out,
        "ransomware_score",
        classification.ransomware_score,
        6,
    );
    write_kv_num(&mut out, "flags", anomaly.flags as f64, 0);
    write_kv_num(&mut out, "confidence", classification.confidence, 6);
    out.push('}');
    out
}

/// Appends `"key":value` (`value` rendered with `decimals` fractional
/// digits, or as an integer when `decimals == 0`), with a leading comma
/// unless `first`.
fn write_kv_num(out: &mut String, key: &str, value: f64, decimals: usize) {
    if !out.ends_with('{') {
        out.push(',');
    }
    let _ = write!(out, "\"{key}\":");
    if decimals == 0 {
        let _ = write!(out, "{value:.0}");
    } else {
        let _ = write!(out, "{value:.decimals$}");
    }
}

/// Appends `"key":"value"` with JSON string escaping, with a leading comma
/// unless `first`.
fn write_kv_str(out: &mut String, key: &str, value: &str, first: bool) {
    if !first {
        out.push(',');
    }
    let _ = write!(out, "\"{key}\":\"");
    escape_json_string(value, out);
    out.push('"');
}

/// JSON string escaping matching the wire contract: `"` and `\` are
/// backslash-escaped, the standard short escapes are used for
/// backspace/form-feed/newline/CR/tab, and other control bytes use `\u00XX`.
fn escape_json_string(input: &str, out: &mut String) {
    for c in input.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Verdict;

    fn sample() -> Sample {
        Sample {
            timestamp_ns: 12_345,
            cycles_per_sec: 1_000_000.123_456_7,
            instructions_per_sec: 0.0,
            cache_miss_rate: 0.012_3,
            aes_instructions_per_sec: -1.0,
            files_modified_per_sec: 2.5,
            files_renamed_per_sec: 0.0,
            files_deleted_per_sec: 0.0,
            top_pid: 4242,
            top_comm: "bash".to_string(),
            disk_read_bytes_per_sec: 0.0,
            disk_write_bytes_per_sec: 10_485_760.0,
        }
    }

    #[test]
    fn telemetry_without_detection_omits_optional_fields() {
        let line = format_telemetry(&sample(), None, None);
        assert!(line.starts_with("{\"type\":\"telemetry\""));
        assert!(!line.contains("anomaly_score"));
        assert!(!line.contains("verdict"));
        assert!(line.ends_with('}'));
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["top_pid"], 4242);
    }

    #[test]
    fn telemetry_floats_have_six_decimals() {
        let line = format_telemetry(&sample(), None, None);
        assert!(line.contains("\"cycles_per_sec\":1000000.123457"));
        assert!(line.contains("\"cache_miss_rate\":0.012300"));
    }

    #[test]
    fn telemetry_with_full_pipeline_includes_all_optional_fields() {
        let anomaly = AnomalyResult {
            is_anomalous: true,
            z_score: 5.5,
            anomaly_score: 0.9,
            flags: 3,
        };
        let classification = ClassifierResult {
            verdict: Verdict::Ransomware,
            confidence: 0.9,
            ransomware_score: 0.9,
        };
        let line = format_telemetry(&sample(), Some(&anomaly), Some(&classification));
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["flags"], 3);
        assert_eq!(parsed["verdict"], "RANSOMWARE");
    }

    #[test]
    fn alert_has_exactly_five_fields() {
        let anomaly = AnomalyResult {
            is_anomalous: true,
            z_score: 5.5,
            anomaly_score: 0.95,
            flags: 9,
        };
        let classification = ClassifierResult {
            verdict: Verdict::Ransomware,
            confidence: 0.95,
            ransomware_score: 0.95,
        };
        let line = format_alert(&sample(), &anomaly, &classification);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.as_object().unwrap().len(), 5);
        assert_eq!(parsed["type"], "alert");
    }

    #[test]
    fn top_comm_is_json_escaped() {
        let mut s = sample();
        s.top_comm = "evil\"proc\\name".to_string();
        let line = format_telemetry(&s, None, None);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["top_comm"], "evil\"proc\\name");
    }

    #[test]
    fn control_bytes_are_unicode_escaped() {
        let mut out = String::new();
        escape_json_string("a\u{01}b", &mut out);
        assert_eq!(out, "a\\u0001b");
    }
}
