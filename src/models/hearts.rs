use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-authoritative hearts balance. The client only ever replaces it
/// wholesale from a RemoteSync response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartsState {
    pub hearts: u32,
    pub next_refill_at: Option<DateTime<Utc>>,
}

impl HeartsState {
    pub fn is_exhausted(&self) -> bool {
        self.hearts == 0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartsPayload {
    pub hearts: i64,
    #[serde(default)]
    pub hearts_next_refill: Option<String>,
}

/// `GET /hearts` and `PATCH /hearts/consume` body. A full balance comes back
/// without the `data` wrapper.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HeartsEnvelope {
    Wrapped { data: HeartsPayload },
    Bare(HeartsPayload),
}

impl From<HeartsEnvelope> for HeartsState {
    fn from(envelope: HeartsEnvelope) -> Self {
        let payload = match envelope {
            HeartsEnvelope::Wrapped { data } => data,
            HeartsEnvelope::Bare(payload) => payload,
        };
        HeartsState {
            hearts: payload.hearts.clamp(0, u32::MAX as i64) as u32,
            next_refill_at: payload
                .hearts_next_refill
                .as_deref()
                .and_then(parse_refill_time),
        }
    }
}

/// Accepts RFC 3339 as well as the offset-less ISO form the backend writes,
/// which is taken as UTC.
pub fn parse_refill_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn decodes_wrapped_and_bare_shapes() {
        let wrapped: HeartsEnvelope = serde_json::from_str(
            r#"{"message":"ok","data":{"hearts":2,"hearts_next_refill":"2026-10-16T12:00:00Z"}}"#,
        )
        .unwrap();
        let state = HeartsState::from(wrapped);
        assert_eq!(state.hearts, 2);
        assert_eq!(
            state.next_refill_at,
            Some(Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap())
        );

        let bare: HeartsEnvelope = serde_json::from_str(r#"{"hearts":5}"#).unwrap();
        assert_eq!(
            HeartsState::from(bare),
            HeartsState {
                hearts: 5,
                next_refill_at: None
            }
        );
    }

    #[test]
    fn naive_iso_timestamps_are_utc() {
        let parsed = parse_refill_time("2026-10-16T09:30:15.250000").unwrap();
        assert_eq!(parsed.timestamp(), Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 15).unwrap().timestamp());
        assert!(parse_refill_time("tomorrow").is_none());
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        let envelope: HeartsEnvelope = serde_json::from_str(r#"{"data":{"hearts":-1}}"#).unwrap();
        assert!(HeartsState::from(envelope).is_exhausted());
    }
}
