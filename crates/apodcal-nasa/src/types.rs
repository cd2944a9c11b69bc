//! APOD records and month payloads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dates::date_key;

/// What kind of media a day's entry links to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
    /// Anything else the service publishes (interactive pages, audio...).
    #[serde(other)]
    Other,
}

/// One Astronomy Picture of the Day entry.
///
/// Field names on the wire follow the APOD service (`date`, `url`,
/// `media_type`); the same shape is used in the persisted cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayRecord {
    #[serde(rename = "date")]
    pub day: NaiveDate,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub explanation: String,
    /// Entries of kind `other` frequently have no URL.
    #[serde(rename = "url", default)]
    pub media_url: String,
    #[serde(rename = "media_type", default)]
    pub media_kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hdurl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
}

impl DayRecord {
    pub fn day_key(&self) -> String {
        date_key(self.day)
    }

    pub fn is_image(&self) -> bool {
        self.media_kind == MediaKind::Image
    }
}

/// All published records of one month, keyed by `YYYY-MM-DD`.
///
/// Days without an entry are absent; callers must not assume every day
/// of the month is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct MonthPayload(BTreeMap<String, DayRecord>);

impl MonthPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index records by day key. A later record for the same day wins.
    pub fn from_records(records: impl IntoIterator<Item = DayRecord>) -> Self {
        Self(
            records
                .into_iter()
                .map(|record| (record.day_key(), record))
                .collect(),
        )
    }

    pub fn get(&self, day: NaiveDate) -> Option<&DayRecord> {
        self.0.get(&date_key(day))
    }

    pub fn get_key(&self, day_key: &str) -> Option<&DayRecord> {
        self.0.get(day_key)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.get(day).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Records in day order.
    pub fn records(&self) -> impl Iterator<Item = &DayRecord> {
        self.0.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_record_from_api() {
        let json = r#"{
            "date": "2024-03-05",
            "title": "Comet Pons-Brooks",
            "explanation": "A periodic comet.",
            "url": "https://apod.nasa.gov/apod/image/2403/comet.jpg",
            "hdurl": "https://apod.nasa.gov/apod/image/2403/comet_big.jpg",
            "media_type": "image",
            "service_version": "v1"
        }"#;

        let record: DayRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.day, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(record.day_key(), "2024-03-05");
        assert!(record.is_image());
        assert!(record.hdurl.is_some());
        assert!(record.copyright.is_none());
    }

    #[test]
    fn test_unknown_media_type_without_url() {
        let json = r#"{
            "date": "2024-03-06",
            "title": "Interactive sky",
            "explanation": "Explore it.",
            "media_type": "other"
        }"#;

        let record: DayRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.media_kind, MediaKind::Other);
        assert!(record.media_url.is_empty());

        let json = r#"{"date": "2024-03-07", "media_type": "audio"}"#;
        let record: DayRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.media_kind, MediaKind::Other);
    }

    #[test]
    fn test_video_record() {
        let json = r#"{"date": "2024-03-08", "title": "T", "explanation": "E",
                       "url": "https://www.youtube.com/embed/x", "media_type": "video"}"#;
        let record: DayRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.media_kind, MediaKind::Video);
        assert!(!record.is_image());
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let json = r#"{"date": "2024-13-40", "title": "T"}"#;
        assert!(serde_json::from_str::<DayRecord>(json).is_err());
    }

    #[test]
    fn test_payload_keys_by_day_and_omits_missing_days() {
        let records: Vec<DayRecord> = serde_json::from_str(
            r#"[
                {"date": "2024-03-09", "title": "B", "url": "u2", "media_type": "image"},
                {"date": "2024-03-05", "title": "A", "url": "u1", "media_type": "video"}
            ]"#,
        )
        .unwrap();

        let payload = MonthPayload::from_records(records);
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.keys().collect::<Vec<_>>(), vec!["2024-03-05", "2024-03-09"]);
        assert_eq!(payload.get_key("2024-03-05").unwrap().title, "A");
        assert!(!payload.contains(NaiveDate::from_ymd_opt(2024, 3, 6).unwrap()));
    }

    #[test]
    fn test_payload_serializes_as_plain_map() {
        let payload = MonthPayload::from_records(vec![DayRecord {
            day: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            title: "T".into(),
            explanation: "E".into(),
            media_url: "U".into(),
            media_kind: MediaKind::Image,
            hdurl: None,
            copyright: None,
        }]);

        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            json,
            r#"{"2024-03-05":{"date":"2024-03-05","title":"T","explanation":"E","url":"U","media_type":"image"}}"#
        );
    }
}
