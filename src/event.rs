use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::window::Stamp;

// ─── Domain types ────────────────────────────────────────────────

/// One observed request/response, in the document shape producers submit
/// and the store persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Assigned at ingestion; whatever the producer sent is replaced.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin: String,

    /// Target of the observed call. May be empty.
    #[serde(
        rename = "destino",
        alias = "destination",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub destination: String,

    /// Producer-side time, carried verbatim. Not used for windowing.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub time: String,

    #[serde(rename = "RequestHeaders", default)]
    pub request_headers: RequestHeaders,

    #[serde(rename = "ResponseHeaders", default)]
    pub response_headers: ResponseHeaders,

    /// `yyyyMMddHHmmss`, assigned at ingestion. The only windowing key.
    #[serde(rename = "Datetime", default)]
    pub recorded_at: String,

    /// Anything else the producer attached.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestHeaders {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub accept: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseHeaders {
    #[serde(default)]
    pub status: i32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub date: i64,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl Event {
    /// Minimal event, mostly for tests and tooling.
    pub fn new(destination: impl Into<String>, status: i32) -> Self {
        Self {
            id: String::new(),
            url: String::new(),
            origin: String::new(),
            destination: destination.into(),
            time: String::new(),
            request_headers: RequestHeaders::default(),
            response_headers: ResponseHeaders { status, date: 0 },
            recorded_at: String::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn status(&self) -> i32 {
        self.response_headers.status
    }

    /// `None` when the stamp was never assigned or is malformed.
    pub fn stamp(&self) -> Option<Stamp> {
        Stamp::parse(&self.recorded_at)
    }

    /// Fill in the ingestion-assigned fields.
    pub fn assign(&mut self, id: String, recorded_at: Stamp) {
        self.id = id;
        self.recorded_at = recorded_at.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_producer_payload() {
        let payload = json!({
            "url": "/api/orders",
            "origin": "gateway",
            "destino": "svcA",
            "time": "12:00:00",
            "RequestHeaders": { "accept": "application/json", "host": "svc-a.local" },
            "ResponseHeaders": { "status": 503, "date": 1714560000 }
        });
        let event: Event = serde_json::from_value(payload).unwrap();
        assert_eq!(event.destination, "svcA");
        assert_eq!(event.status(), 503);
        assert_eq!(event.request_headers.host, "svc-a.local");
        assert_eq!(event.response_headers.date, 1714560000);
        assert!(event.recorded_at.is_empty());
    }

    #[test]
    fn destination_alias_is_accepted() {
        let event: Event =
            serde_json::from_value(json!({ "destination": "svcB", "ResponseHeaders": { "status": 200 } }))
                .unwrap();
        assert_eq!(event.destination, "svcB");
    }

    #[test]
    fn unknown_fields_round_trip() {
        let payload = json!({
            "destino": "svcA",
            "RequestHeaders": {},
            "ResponseHeaders": { "status": 200 },
            "Datetime": "20240501120000",
            "traceId": "abc123"
        });
        let event: Event = serde_json::from_value(payload.clone()).unwrap();
        assert_eq!(event.extra["traceId"], "abc123");
        assert_eq!(serde_json::to_value(&event).unwrap(), payload);
    }

    #[test]
    fn missing_status_defaults_to_zero() {
        let event: Event = serde_json::from_value(json!({ "destino": "svcA" })).unwrap();
        assert_eq!(event.status(), 0);
    }
}
