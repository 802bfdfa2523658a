use std::collections::BTreeMap;

/// A structured log record handed to a log sink
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub event_name: String,
    pub severity_number: SeverityNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_text: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Milliseconds relative to the page's time origin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl LogRecord {
    pub fn new(event_name: impl Into<String>, severity_number: SeverityNumber) -> Self {
        Self {
            event_name: event_name.into(),
            severity_number,
            severity_text: None,
            attributes: BTreeMap::new(),
            timestamp: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

/// Scalar attribute value
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Double(v) => Some(*v),
            AttributeValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Severity numbers from the OpenTelemetry log data model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SeverityNumber {
    Trace = 1,
    Trace2 = 2,
    Trace3 = 3,
    Trace4 = 4,
    Debug = 5,
    Debug2 = 6,
    Debug3 = 7,
    Debug4 = 8,
    Info = 9,
    Info2 = 10,
    Info3 = 11,
    Info4 = 12,
    Warn = 13,
    Warn2 = 14,
    Warn3 = 15,
    Warn4 = 16,
    Error = 17,
    Error2 = 18,
    Error3 = 19,
    Error4 = 20,
    Fatal = 21,
    Fatal2 = 22,
    Fatal3 = 23,
    Fatal4 = 24,
}

impl SeverityNumber {
    const ALL: [SeverityNumber; 24] = [
        SeverityNumber::Trace,
        SeverityNumber::Trace2,
        SeverityNumber::Trace3,
        SeverityNumber::Trace4,
        SeverityNumber::Debug,
        SeverityNumber::Debug2,
        SeverityNumber::Debug3,
        SeverityNumber::Debug4,
        SeverityNumber::Info,
        SeverityNumber::Info2,
        SeverityNumber::Info3,
        SeverityNumber::Info4,
        SeverityNumber::Warn,
        SeverityNumber::Warn2,
        SeverityNumber::Warn3,
        SeverityNumber::Warn4,
        SeverityNumber::Error,
        SeverityNumber::Error2,
        SeverityNumber::Error3,
        SeverityNumber::Error4,
        SeverityNumber::Fatal,
        SeverityNumber::Fatal2,
        SeverityNumber::Fatal3,
        SeverityNumber::Fatal4,
    ];

    /// Short severity name (the first number of each range gets the bare name)
    pub fn name(&self) -> &'static str {
        match *self as u8 {
            1..=4 => "TRACE",
            5..=8 => "DEBUG",
            9..=12 => "INFO",
            13..=16 => "WARN",
            17..=20 => "ERROR",
            _ => "FATAL",
        }
    }
}

impl From<SeverityNumber> for u8 {
    fn from(value: SeverityNumber) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for SeverityNumber {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            1..=24 => Ok(Self::ALL[(value - 1) as usize]),
            other => Err(format!("Invalid severity number: {}", other)),
        }
    }
}
