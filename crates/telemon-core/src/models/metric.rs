//! 메트릭 모델.
//!
//! 와이어 포맷: `{"id": .., "type": "gauge"|"counter", "value": f64}` 또는
//! `{.., "delta": i64}`. 종류에 맞지 않는 슬롯은 직렬화하지 않는다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 메트릭 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// 마지막 값이 유지되는 측정값
    Gauge,
    /// 누적 합계
    Counter,
}

impl MetricKind {
    /// 와이어/경로에서 쓰는 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            other => Err(CoreError::InvalidMetric(format!(
                "알 수 없는 메트릭 타입: {other}"
            ))),
        }
    }
}

/// 메트릭 값. 종류와 값 슬롯이 항상 일치한다.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Gauge(f64),
    Counter(i64),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Counter(_) => MetricKind::Counter,
        }
    }

    /// 텍스트 표현을 종류에 맞게 파싱
    pub fn parse(kind: MetricKind, raw: &str) -> Result<Self, CoreError> {
        match kind {
            MetricKind::Gauge => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(MetricValue::Gauge)
                .ok_or_else(|| CoreError::InvalidMetric(format!("잘못된 gauge 값: {raw}"))),
            MetricKind::Counter => raw
                .parse::<i64>()
                .map(MetricValue::Counter)
                .map_err(|_| CoreError::InvalidMetric(format!("잘못된 counter 값: {raw}"))),
        }
    }
}

/// 텍스트 응답 포맷. gauge는 왕복 가능한 최단 표현 (`7`, `7.5`, `0.001`).
impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Gauge(v) => write!(f, "{v}"),
            MetricValue::Counter(v) => write!(f, "{v}"),
        }
    }
}

/// 단일 메트릭
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MetricWire", into = "MetricWire")]
pub struct Metric {
    /// 메트릭 이름
    pub id: String,
    /// 종류 + 값
    pub value: MetricValue,
}

impl Metric {
    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            value: MetricValue::Gauge(value),
        }
    }

    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self {
            id: id.into(),
            value: MetricValue::Counter(delta),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }
}

/// JSON 와이어 표현
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetricWire {
    id: String,
    #[serde(rename = "type")]
    kind: MetricKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
}

impl TryFrom<MetricWire> for Metric {
    type Error = CoreError;

    fn try_from(wire: MetricWire) -> Result<Self, Self::Error> {
        if wire.id.is_empty() {
            return Err(CoreError::InvalidMetric("빈 메트릭 이름".to_string()));
        }
        let value = match wire.kind {
            MetricKind::Gauge => wire.value.map(MetricValue::Gauge),
            MetricKind::Counter => wire.delta.map(MetricValue::Counter),
        }
        .ok_or_else(|| {
            CoreError::InvalidMetric(format!("{} 값 누락: {}", wire.kind, wire.id))
        })?;

        Ok(Metric { id: wire.id, value })
    }
}

impl From<Metric> for MetricWire {
    fn from(metric: Metric) -> Self {
        let (delta, value) = match metric.value {
            MetricValue::Gauge(v) => (None, Some(v)),
            MetricValue::Counter(d) => (Some(d), None),
        };
        MetricWire {
            id: metric.id,
            kind: metric.value.kind(),
            delta,
            value,
        }
    }
}

/// 값 조회 요청 (`POST /value/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
}

/// 한 번의 캐시 읽기로 캡처된 메트릭 묶음
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricBatch(pub Vec<Metric>);

impl MetricBatch {
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self(metrics)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Metric> {
        self.0.iter()
    }
}

impl IntoIterator for MetricBatch {
    type Item = Metric;
    type IntoIter = std::vec::IntoIter<Metric>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<Vec<Metric>> for MetricBatch {
    fn from(metrics: Vec<Metric>) -> Self {
        Self(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_wire_format_omits_delta() {
        let json = serde_json::to_value(Metric::gauge("Alloc", 11.5)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "Alloc", "type": "gauge", "value": 11.5})
        );
    }

    #[test]
    fn counter_wire_format_omits_value() {
        let json = serde_json::to_value(Metric::counter("PollCount", 5)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "PollCount", "type": "counter", "delta": 5})
        );
    }

    #[test]
    fn missing_slot_is_rejected() {
        let err = serde_json::from_str::<Metric>(r#"{"id":"A","type":"counter","value":1.0}"#)
            .unwrap_err();
        assert!(err.to_string().contains("counter 값 누락"));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(serde_json::from_str::<Metric>(r#"{"id":"A","type":"histogram"}"#).is_err());
        assert!("histogram".parse::<MetricKind>().is_err());
    }

    #[test]
    fn batch_is_plain_json_array() {
        let batch = MetricBatch::new(vec![Metric::counter("A", 3), Metric::counter("A", 4)]);
        let json = serde_json::to_string(&batch).unwrap();
        assert!(json.starts_with('['));
        let back: MetricBatch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, batch);
    }

    #[test]
    fn text_value_parsing() {
        assert_eq!(
            MetricValue::parse(MetricKind::Gauge, "7.5").unwrap(),
            MetricValue::Gauge(7.5)
        );
        assert_eq!(
            MetricValue::parse(MetricKind::Counter, "42").unwrap(),
            MetricValue::Counter(42)
        );
        assert!(MetricValue::parse(MetricKind::Counter, "4.2").is_err());
        assert!(MetricValue::parse(MetricKind::Gauge, "abc").is_err());
        assert!(MetricValue::parse(MetricKind::Gauge, "NaN").is_err());
    }

    #[test]
    fn text_value_format_is_shortest() {
        assert_eq!(MetricValue::Gauge(7.0).to_string(), "7");
        assert_eq!(MetricValue::Gauge(7.5).to_string(), "7.5");
        assert_eq!(MetricValue::Gauge(0.001).to_string(), "0.001");
        assert_eq!(MetricValue::Counter(-3).to_string(), "-3");
    }
}
