//! Webhook message text.
//!
//! The lookup page is a flat block of labelled lines:
//!
//! ```text
//! 차량번호 1234
//! 입차시간 2025-03-04 08:12
//! 주차층 B2
//! 차량위치 15
//! ```
//!
//! `ParkingDetails::parse` pulls those values out; anything missing is
//! reported as `N/A` in the message. Floor and location are single
//! tokens, so filler text after them on the same line is dropped.

use chrono::{DateTime, FixedOffset};

use crate::snapshot::{Snapshot, Status};

const CAR_NUMBER_LABEL: &str = "차량번호";
const ENTRY_TIME_LABEL: &str = "입차시간";
const FLOOR_LABEL: &str = "주차층";
const LOCATION_LABEL: &str = "차량위치";

const LABELS: [&str; 4] = [CAR_NUMBER_LABEL, ENTRY_TIME_LABEL, FLOOR_LABEL, LOCATION_LABEL];

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParkingDetails {
    pub car_number: Option<String>,
    pub entry_time: Option<String>,
    pub floor: Option<String>,
    pub location: Option<String>,
}

impl ParkingDetails {
    pub fn parse(text: &str) -> Self {
        ParkingDetails {
            car_number: labelled_value(text, CAR_NUMBER_LABEL, |c| c.is_ascii_digit()),
            entry_time: labelled_value(text, ENTRY_TIME_LABEL, |c| {
                c.is_ascii_digit() || matches!(c, '-' | ':' | ' ' | '\t')
            }),
            floor: labelled_value(text, FLOOR_LABEL, |c| !c.is_whitespace()),
            location: labelled_value(text, LOCATION_LABEL, |c| !c.is_whitespace()),
        }
    }
}

/// First non-empty value following `label`.
///
/// Whitespace after the label is skipped, then characters are taken while
/// `accept` holds, stopping at a line break or at the next known label.
fn labelled_value(text: &str, label: &str, accept: impl Fn(char) -> bool) -> Option<String> {
    text.match_indices(label).find_map(|(idx, _)| {
        let rest = text[idx + label.len()..].trim_start();
        let mut end = 0;
        for (pos, c) in rest.char_indices() {
            if c == '\n' || !accept(c) || LABELS.iter().any(|l| rest[pos..].starts_with(*l)) {
                break;
            }
            end = pos + c.len_utf8();
        }
        let value = rest[..end].trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}

/// "2025-03-04 08:30:00 KST", or the numeric offset outside UTC+9.
pub fn format_timestamp(at: &DateTime<FixedOffset>) -> String {
    if at.offset().local_minus_utc() == 9 * 3600 {
        at.format("%Y-%m-%d %H:%M:%S KST").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M:%S %:z").to_string()
    }
}

pub fn render(snapshot: &Snapshot, sent_at: &DateTime<FixedOffset>) -> String {
    let timestamp = format_timestamp(sent_at);

    match snapshot.status {
        Status::Error => {
            let error = if snapshot.error_message.is_empty() {
                "알 수 없는 오류"
            } else {
                snapshot.error_message.as_str()
            };
            format!(
                "### ❌ 주차 위치 조회 실패\n\n\
                 **차량번호:** {}\n\
                 **오류 내용:** {error}\n\n\
                 ---\n\
                 _자동 알림 - {timestamp}_\n",
                snapshot.vehicle_id
            )
        }
        Status::Found => {
            let details = ParkingDetails::parse(&snapshot.details);
            let car_number = details.car_number.as_deref().unwrap_or(&snapshot.vehicle_id);
            format!(
                "### 🚗 주차 위치 알림\n\n\
                 **차량번호:** {car_number}\n\
                 **입차시간:** {}\n\
                 **주차층:** {}\n\
                 **차량위치:** {}\n\n\
                 ---\n\
                 _자동 알림 - {timestamp}_\n",
                or_na(details.entry_time.as_deref()),
                or_na(details.floor.as_deref()),
                or_na(details.location.as_deref()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-03-04T08:30:00+09:00").unwrap()
    }

    const PAGE: &str = "주차 위치 조회\n차량번호 1234\n입차시간 2025-03-04 08:12\n주차층 B2\n차량위치 15\n확인";

    #[test]
    fn parses_labelled_lines() {
        let details = ParkingDetails::parse(PAGE);
        assert_eq!(details.car_number.as_deref(), Some("1234"));
        assert_eq!(details.entry_time.as_deref(), Some("2025-03-04 08:12"));
        assert_eq!(details.floor.as_deref(), Some("B2"));
        assert_eq!(details.location.as_deref(), Some("15"));
    }

    #[test]
    fn single_line_stops_at_next_label() {
        let details = ParkingDetails::parse("차량번호 1234 주차층 B2 차량위치 15");
        assert_eq!(details.car_number.as_deref(), Some("1234"));
        assert_eq!(details.floor.as_deref(), Some("B2"));
        assert_eq!(details.location.as_deref(), Some("15"));
        assert!(details.entry_time.is_none());
    }

    #[test]
    fn filler_between_labels_is_dropped() {
        let details = ParkingDetails::parse("차량번호 1234 ... 주차층 B2 ... 차량위치 15");
        assert_eq!(details.car_number.as_deref(), Some("1234"));
        assert_eq!(details.floor.as_deref(), Some("B2"));
        assert_eq!(details.location.as_deref(), Some("15"));
    }

    #[test]
    fn car_number_skips_prompt_without_digits() {
        let details = ParkingDetails::parse("차량번호를 입력하세요\n차량번호 5678");
        assert_eq!(details.car_number.as_deref(), Some("5678"));
    }

    #[test]
    fn value_on_following_line() {
        let details = ParkingDetails::parse("주차층\nB3\n차량위치\n42");
        assert_eq!(details.floor.as_deref(), Some("B3"));
        assert_eq!(details.location.as_deref(), Some("42"));
    }

    #[test]
    fn empty_text_parses_to_nothing() {
        assert_eq!(ParkingDetails::parse(""), ParkingDetails::default());
    }

    #[test]
    fn found_message_lists_parsed_fields() {
        let snapshot = Snapshot::found("1234", PAGE, at());
        let text = render(&snapshot, &at());
        assert!(text.starts_with("### 🚗 주차 위치 알림"));
        assert!(text.contains("**차량번호:** 1234"));
        assert!(text.contains("**입차시간:** 2025-03-04 08:12"));
        assert!(text.contains("**주차층:** B2"));
        assert!(text.contains("**차량위치:** 15"));
        assert!(text.contains("_자동 알림 - 2025-03-04 08:30:00 KST_"));
    }

    #[test]
    fn found_message_falls_back_to_vehicle_id_and_na() {
        let snapshot = Snapshot::found("1234", "결과 없음", at());
        let text = render(&snapshot, &at());
        assert!(text.contains("**차량번호:** 1234"));
        assert!(text.contains("**주차층:** N/A"));
        assert!(text.contains("**차량위치:** N/A"));
    }

    #[test]
    fn error_message_carries_reason() {
        let snapshot = Snapshot::error("1234", "input field not found: no such element", None, at());
        let text = render(&snapshot, &at());
        assert!(text.starts_with("### ❌ 주차 위치 조회 실패"));
        assert!(text.contains("**오류 내용:** input field not found: no such element"));
    }

    #[test]
    fn timestamp_outside_kst_shows_offset() {
        let utc = DateTime::parse_from_rfc3339("2025-03-04T00:00:00+00:00").unwrap();
        assert_eq!(format_timestamp(&utc), "2025-03-04 00:00:00 +00:00");
    }
}
