//! Payload type detection.
//!
//! Classification never fails: anything unrecognized is `Unknown`, and the
//! result only feeds telemetry, never the forwarding decision.

use serde::Serialize;

/// Shape of a request body as seen by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadType {
    Json,
    Xml,
    Unknown,
}

impl PayloadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadType::Json => "json",
            PayloadType::Xml => "xml",
            PayloadType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PayloadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a buffered body using its declared content type first and
/// its leading characters second.
pub fn classify(body: &[u8], content_type: Option<&str>) -> PayloadType {
    if body.is_empty() {
        return PayloadType::Unknown;
    }

    if let Some(content_type) = content_type {
        if content_type.contains("application/json") {
            return PayloadType::Json;
        }
        if content_type.contains("application/xml") || content_type.contains("text/xml") {
            return PayloadType::Xml;
        }
    }

    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        PayloadType::Json
    } else if trimmed.starts_with('<') {
        // Covers `<?xml` prologs as well as bare root elements.
        PayloadType::Xml
    } else {
        PayloadType::Unknown
    }
}
