//! Shared data models
//!
//! Serde field names use camelCase to match the JSON wire format consumed
//! by the kiosk, picker, and projector frontends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A song in the read-only catalog
///
/// Keyed by a deterministic slug derived from artist + title (see
/// [`crate::slug::song_id`]). Immutable from the server's perspective;
/// written only by the seeder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub category: String,
    pub artist: String,
    pub title: String,
    pub album_art_url: String,
}

/// The singleton party record
///
/// `credits` is the shared admission balance; it is only ever mutated
/// through the admission transaction and the operator refill, and the
/// schema CHECK keeps any committed value non-negative.
/// `current_play_order` is the explicit playback-position pointer: the
/// sequence key of the most recently advanced (or rewind-restored) entry,
/// NULL before the first advance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartyState {
    pub credits: i64,
    pub is_active: bool,
    pub last_play_order: i64,
    pub current_play_order: Option<i64>,
}

/// Where an admitted request came from
///
/// Every queue entry carries its source so credit-bypassing admissions
/// (emergency, prepaid web) stay auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestSource {
    #[serde(rename = "kiosk")]
    Kiosk,
    #[serde(rename = "web-payment")]
    WebPayment,
    #[serde(rename = "emergency")]
    Emergency,
}

impl RequestSource {
    /// Parse from database string representation
    pub fn from_str(s: &str) -> Option<RequestSource> {
        match s {
            "kiosk" => Some(RequestSource::Kiosk),
            "web-payment" => Some(RequestSource::WebPayment),
            "emergency" => Some(RequestSource::Emergency),
            _ => None,
        }
    }

    /// Convert to database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            RequestSource::Kiosk => "kiosk",
            RequestSource::WebPayment => "web-payment",
            RequestSource::Emergency => "emergency",
        }
    }

    /// Whether admissions from this source consume a credit
    pub fn requires_credit(&self) -> bool {
        matches!(self, RequestSource::Kiosk)
    }
}

/// One admitted request in the playback queue
///
/// The song fields are a snapshot taken at admission time; later catalog
/// edits do not reach entries already in the queue. `play_order` is the
/// strictly monotonic sequence key and the sole ordering authority.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    pub album_art_url: String,
    pub requested_by: String,
    pub source: RequestSource,
    pub play_order: i64,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Idempotency record for a payment-provider callback
///
/// Written at most once per provider event id, inside the same
/// transaction as the admission it caused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedPaymentEvent {
    pub event_id: String,
    pub song_id: String,
    pub requested_by: String,
    pub processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_source_roundtrip() {
        for source in [
            RequestSource::Kiosk,
            RequestSource::WebPayment,
            RequestSource::Emergency,
        ] {
            assert_eq!(
                RequestSource::from_str(source.to_db_string()),
                Some(source)
            );
        }
        assert_eq!(RequestSource::from_str("jukebox"), None);
    }

    #[test]
    fn test_only_kiosk_requires_credit() {
        assert!(RequestSource::Kiosk.requires_credit());
        assert!(!RequestSource::WebPayment.requires_credit());
        assert!(!RequestSource::Emergency.requires_credit());
    }

    #[test]
    fn test_source_serializes_as_wire_tag() {
        let json = serde_json::to_string(&RequestSource::WebPayment).unwrap();
        assert_eq!(json, "\"web-payment\"");
    }
}
