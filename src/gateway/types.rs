//! Wire types for the IoT gateway read/write endpoints

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

/// Number of entries a read response must carry: tag1, tag2, exit sentinel
pub const READ_RESULT_COUNT: usize = 3;

/// A tag value as reported by the gateway.
///
/// Integral JSON numbers stay integers so that `3 + 4` is written back as `7`
/// rather than `7.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    /// String, array or object; never summed and never equal to 1
    #[serde(skip)]
    Other,
}

impl TagValue {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            TagValue::Int(i) => Some(i as f64),
            TagValue::Float(f) => Some(f),
            TagValue::Bool(_) | TagValue::Other => None,
        }
    }

    /// Numeric addition; `None` when either side is not a number.
    ///
    /// Integer overflow falls back to floating point.
    pub fn checked_sum(self, other: TagValue) -> Option<TagValue> {
        match (self, other) {
            (TagValue::Int(a), TagValue::Int(b)) => Some(
                a.checked_add(b)
                    .map(TagValue::Int)
                    .unwrap_or(TagValue::Float(a as f64 + b as f64)),
            ),
            (a, b) => Some(TagValue::Float(a.as_f64()? + b.as_f64()?)),
        }
    }

    /// Exact numeric equality with 1. Booleans never match.
    pub fn is_one(&self) -> bool {
        match *self {
            TagValue::Int(i) => i == 1,
            TagValue::Float(f) => f == 1.0,
            TagValue::Bool(_) | TagValue::Other => false,
        }
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Int(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Float(value)
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Int(i) => write!(f, "{}", i),
            TagValue::Float(v) => write!(f, "{}", v),
            TagValue::Bool(b) => write!(f, "{}", b),
            TagValue::Other => write!(f, "<non-numeric>"),
        }
    }
}

/// One entry of `readResults`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagReading {
    #[serde(default)]
    pub id: String,
    /// Read succeeded on the gateway side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<bool>,
    /// Gateway reason text, usually empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<String>,
    #[serde(default, deserialize_with = "lenient_tag_value")]
    pub v: Option<TagValue>,
    /// Sample timestamp, ms since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<i64>,
}

/// Decode any JSON value; only numbers and booleans keep their value.
fn lenient_tag_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<TagValue>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Null => None,
        Value::Bool(b) => Some(TagValue::Bool(b)),
        Value::Number(n) => n
            .as_i64()
            .map(TagValue::Int)
            .or_else(|| n.as_f64().map(TagValue::Float)),
        Value::String(_) | Value::Array(_) | Value::Object(_) => Some(TagValue::Other),
    }))
}

impl TagReading {
    pub fn new(id: impl Into<String>, v: impl Into<TagValue>) -> Self {
        Self {
            id: id.into(),
            s: Some(true),
            r: None,
            v: Some(v.into()),
            t: None,
        }
    }

    pub fn is_bad_quality(&self) -> bool {
        self.s == Some(false)
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.t.and_then(DateTime::from_timestamp_millis)
    }

    fn numeric_value(&self) -> Result<TagValue, GatewayError> {
        match self.v {
            Some(v @ (TagValue::Int(_) | TagValue::Float(_))) => Ok(v),
            Some(other @ (TagValue::Bool(_) | TagValue::Other)) => Err(GatewayError::MalformedResponse(format!(
                "{} is not numeric (got {})",
                self.id, other
            ))),
            None => Err(GatewayError::MalformedResponse(format!("{} has no value", self.id))),
        }
    }
}

/// Decoded body of `GET /iotgateway/read`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResponse {
    #[serde(rename = "readResults")]
    pub read_results: Vec<TagReading>,
}

impl ReadResponse {
    pub fn new(read_results: Vec<TagReading>) -> Self {
        Self { read_results }
    }

    /// Extract tag1, tag2 and the exit sentinel by position and compute the sum.
    pub fn sample(&self) -> Result<Sample, GatewayError> {
        let [first, second, exit, ..] = self.read_results.as_slice() else {
            return Err(GatewayError::MalformedResponse(format!(
                "expected at least {} read results, got {}",
                READ_RESULT_COUNT,
                self.read_results.len()
            )));
        };

        let tag1 = first.numeric_value()?;
        let tag2 = second.numeric_value()?;
        let sum = tag1
            .checked_sum(tag2)
            .ok_or_else(|| GatewayError::MalformedResponse("tag values are not numeric".to_string()))?;

        Ok(Sample {
            tag1,
            tag2,
            exit: exit.v,
            sum,
        })
    }
}

/// Values extracted from one read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub tag1: TagValue,
    pub tag2: TagValue,
    pub exit: Option<TagValue>,
    pub sum: TagValue,
}

impl Sample {
    /// True only when the exit sentinel equals 1
    pub fn should_exit(&self) -> bool {
        self.exit.is_some_and(|v| v.is_one())
    }
}

/// One `{id, v}` record of a write body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteRecord {
    pub id: String,
    pub v: TagValue,
}

/// Body of `POST /iotgateway/write`, serialized as a JSON array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteRequest(pub Vec<WriteRecord>);

impl WriteRequest {
    pub fn single(id: impl Into<String>, v: TagValue) -> Self {
        Self(vec![WriteRecord { id: id.into(), v }])
    }

    pub fn records(&self) -> &[WriteRecord] {
        &self.0
    }
}

impl fmt::Display for WriteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|r| format!("{} = {}", r.id, r.v)).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Per-tag result in the write response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteResult {
    pub id: String,
    #[serde(default)]
    pub s: Option<bool>,
    #[serde(default)]
    pub r: Option<String>,
}

/// Decoded body of the write response; empty when the gateway sends none
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteResponse {
    #[serde(rename = "writeResults", default)]
    pub write_results: Vec<WriteResult>,
}

impl WriteResponse {
    /// Results the gateway explicitly rejected
    pub fn failures(&self) -> impl Iterator<Item = &WriteResult> {
        self.write_results.iter().filter(|r| r.s == Some(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(exit: serde_json::Value) -> ReadResponse {
        serde_json::from_value(json!({
            "readResults": [
                {"id": "Channel1.SimuDev.Tag1", "v": 3},
                {"id": "Channel1.SimuDev.Tag2", "v": 4},
                {"id": "Channel1.SimuDev.exitLoop", "v": exit}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_sample_sums_first_two_tags() {
        let sample = response(json!(0)).sample().unwrap();
        assert_eq!(sample.tag1, TagValue::Int(3));
        assert_eq!(sample.tag2, TagValue::Int(4));
        assert_eq!(sample.sum, TagValue::Int(7));
        assert!(!sample.should_exit());
    }

    #[test]
    fn test_write_payload_shape() {
        let sample = response(json!(0)).sample().unwrap();
        let request = WriteRequest::single("Channel1.PostProc.Sum of Tags", sample.sum);
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"[{"id":"Channel1.PostProc.Sum of Tags","v":7}]"#
        );
    }

    #[test]
    fn test_exit_only_on_exact_one() {
        assert!(response(json!(1)).sample().unwrap().should_exit());
        assert!(response(json!(1.0)).sample().unwrap().should_exit());
        assert!(!response(json!(0)).sample().unwrap().should_exit());
        assert!(!response(json!(2)).sample().unwrap().should_exit());
        assert!(!response(json!(0.999)).sample().unwrap().should_exit());
        assert!(!response(json!(true)).sample().unwrap().should_exit());
        assert!(!response(json!(null)).sample().unwrap().should_exit());
    }

    #[test]
    fn test_exit_value_absent() {
        let resp: ReadResponse = serde_json::from_value(json!({
            "readResults": [
                {"id": "a", "v": 1},
                {"id": "b", "v": 1},
                {"id": "c", "s": false, "r": "Unknown item"}
            ]
        }))
        .unwrap();
        let sample = resp.sample().unwrap();
        assert_eq!(sample.exit, None);
        assert!(!sample.should_exit());
    }

    #[test]
    fn test_too_few_results_is_malformed() {
        let resp = ReadResponse::new(vec![TagReading::new("a", 1), TagReading::new("b", 2)]);
        let err = resp.sample().unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
        assert!(err.to_string().contains("got 2"));
    }

    #[test]
    fn test_missing_tag_value_is_malformed() {
        let resp: ReadResponse = serde_json::from_value(json!({
            "readResults": [{"id": "a"}, {"id": "b", "v": 1}, {"id": "c", "v": 0}]
        }))
        .unwrap();
        assert!(matches!(resp.sample(), Err(GatewayError::MalformedResponse(_))));
    }

    #[test]
    fn test_boolean_tag_is_malformed() {
        let resp: ReadResponse = serde_json::from_value(json!({
            "readResults": [{"id": "a", "v": true}, {"id": "b", "v": 1}, {"id": "c", "v": 0}]
        }))
        .unwrap();
        assert!(matches!(resp.sample(), Err(GatewayError::MalformedResponse(_))));
    }

    #[test]
    fn test_extra_results_are_ignored() {
        let resp = ReadResponse::new(vec![
            TagReading::new("a", 1),
            TagReading::new("b", 2),
            TagReading::new("c", 0),
            TagReading::new("d", 100),
        ]);
        assert_eq!(resp.sample().unwrap().sum, TagValue::Int(3));
    }

    #[test]
    fn test_string_exit_value_keeps_sum() {
        let resp: ReadResponse = serde_json::from_str(
            r#"{"readResults":[{"id":"a","v":3},{"id":"b","v":4},{"id":"c","v":"0"}]}"#,
        )
        .unwrap();
        let sample = resp.sample().unwrap();
        assert_eq!(sample.sum, TagValue::Int(7));
        assert_eq!(sample.exit, Some(TagValue::Other));
        assert!(!sample.should_exit());
    }

    #[test]
    fn test_entries_without_ids_still_sample() {
        let resp: ReadResponse =
            serde_json::from_str(r#"{"readResults":[{"v":3},{"v":4},{"v":"0"}]}"#).unwrap();
        assert_eq!(resp.sample().unwrap().sum, TagValue::Int(7));
    }

    #[test]
    fn test_structured_exit_value_does_not_stop() {
        let sample = response(json!({"raw": 1})).sample().unwrap();
        assert!(!sample.should_exit());
        let sample = response(json!([1])).sample().unwrap();
        assert!(!sample.should_exit());
        assert_eq!(sample.sum, TagValue::Int(7));
    }

    #[test]
    fn test_non_numeric_fourth_entry_is_ignored() {
        let resp: ReadResponse = serde_json::from_value(json!({
            "readResults": [
                {"id": "a", "v": 3},
                {"id": "b", "v": 4},
                {"id": "c", "v": 0},
                {"id": "d", "v": "running"}
            ]
        }))
        .unwrap();
        assert_eq!(resp.sample().unwrap().sum, TagValue::Int(7));
    }

    #[test]
    fn test_string_tag_value_is_malformed() {
        let resp: ReadResponse = serde_json::from_value(json!({
            "readResults": [{"id": "a", "v": "3"}, {"id": "b", "v": 4}, {"id": "c", "v": 0}]
        }))
        .unwrap();
        let err = resp.sample().unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
        assert!(err.to_string().contains("a is not numeric"));
    }

    #[test]
    fn test_float_sum() {
        assert_eq!(
            TagValue::Float(1.5).checked_sum(TagValue::Int(2)),
            Some(TagValue::Float(3.5))
        );
    }

    #[test]
    fn test_integer_overflow_falls_back_to_float() {
        let sum = TagValue::Int(i64::MAX).checked_sum(TagValue::Int(1)).unwrap();
        assert!(matches!(sum, TagValue::Float(_)));
    }

    #[test]
    fn test_bool_sum_is_none() {
        assert_eq!(TagValue::Bool(true).checked_sum(TagValue::Int(1)), None);
    }

    #[test]
    fn test_gateway_status_fields_decode() {
        let reading: TagReading = serde_json::from_value(json!({
            "id": "Channel1.SimuDev.Tag1", "s": true, "r": "", "v": 12, "t": 1700000000000i64
        }))
        .unwrap();
        assert!(!reading.is_bad_quality());
        assert_eq!(reading.timestamp().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_write_response_failures() {
        let resp: WriteResponse = serde_json::from_value(json!({
            "writeResults": [
                {"id": "ok", "s": true, "r": ""},
                {"id": "bad", "s": false, "r": "Not writable"}
            ]
        }))
        .unwrap();
        let failures: Vec<_> = resp.failures().map(|r| r.id.as_str()).collect();
        assert_eq!(failures, vec!["bad"]);
    }
}
