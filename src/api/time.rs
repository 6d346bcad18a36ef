use crate::api::response::{ok, Envelope};
use axum::Json;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::Serialize;

// Asia/Tokyo has no daylight saving
const JST_OFFSET_SECS: i32 = 9 * 3600;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CurrentTime {
    pub iso: String,
    pub jst: String,
}

impl CurrentTime {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            iso: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            jst: tokyo_time(now).format("%Y/%m/%d %H:%M:%S").to_string(),
        }
    }
}

fn tokyo_time(now: DateTime<Utc>) -> DateTime<FixedOffset> {
    match FixedOffset::east_opt(JST_OFFSET_SECS) {
        Some(offset) => now.with_timezone(&offset),
        None => now.fixed_offset(),
    }
}

/// GET /api/time
pub async fn current_time() -> Json<Envelope<CurrentTime>> {
    ok(CurrentTime::at(Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_formats_utc_and_tokyo() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 20, 30, 5).unwrap();

        assert_eq!(
            CurrentTime::at(now),
            CurrentTime {
                iso: "2025-12-31T20:30:05.000Z".to_string(),
                jst: "2026/01/01 05:30:05".to_string(),
            }
        );
    }

    #[test]
    fn test_tokyo_time_carries_its_offset() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 15, 0, 0).unwrap();
        let tokyo = tokyo_time(now);

        assert_eq!(tokyo.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(tokyo.to_rfc3339(), "2025-06-02T00:00:00+09:00");
        assert_eq!(tokyo, now);
    }
}
