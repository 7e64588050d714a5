use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `maxRisk` value published for days whose risk has not been computed yet
pub const PENDING_RISK: f64 = -1.0;

const MAX_RISK_FIELD: &str = "maxRisk";

/// Date format used for keys and for the `date` field of every record
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One day of the seasonal risk dataset.
///
/// Only `date` is required. Every other field, `maxRisk` included, stays as
/// raw JSON in `fields` so a record of any shape is kept and written back
/// out with the same values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub date: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl SeasonRecord {
    pub fn new(date: impl Into<String>, max_risk: impl Into<serde_json::Value>) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert(MAX_RISK_FIELD.to_string(), max_risk.into());
        Self {
            date: date.into(),
            fields,
        }
    }

    /// Raw `maxRisk` value, whatever its JSON type.
    pub fn max_risk(&self) -> Option<&serde_json::Value> {
        self.fields.get(MAX_RISK_FIELD)
    }

    /// `maxRisk` as a number, when it is one.
    pub fn risk(&self) -> Option<f64> {
        self.max_risk().and_then(serde_json::Value::as_f64)
    }

    /// True while the day's risk is still the `-1` sentinel.
    /// A missing or non-numeric `maxRisk` counts as resolved.
    pub fn is_pending(&self) -> bool {
        self.risk() == Some(PENDING_RISK)
    }
}

/// Records of one yearly file, keyed by their `date` field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonDataMap {
    records: HashMap<String, SeasonRecord>,
}

impl SeasonDataMap {
    /// Re-key a source array by date. A later record with the same date
    /// replaces an earlier one.
    pub fn from_records(records: impl IntoIterator<Item = SeasonRecord>) -> Self {
        let mut map = HashMap::new();
        for record in records {
            map.insert(record.date.clone(), record);
        }
        Self { records: map }
    }

    pub fn get(&self, date: &str) -> Option<&SeasonRecord> {
        self.records.get(date)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<SeasonRecord> for SeasonDataMap {
    fn from_iter<I: IntoIterator<Item = SeasonRecord>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}

/// Year selector for a date string: its leading four characters, which must be digits.
pub fn year_of(date: &str) -> Option<&str> {
    let year = date.get(..4)?;
    year.bytes().all(|b| b.is_ascii_digit()).then_some(year)
}

/// File name of the yearly dataset holding `date`.
pub fn season_file_name(date: &str) -> Option<String> {
    year_of(date).map(|year| format!("season{year}.json"))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_passthrough_fields() {
        let json = r#"{"date":"2024-06-01","maxRisk":3,"pollen":"high","levels":[1,2]}"#;
        let record: SeasonRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.date, "2024-06-01");
        assert_eq!(record.risk(), Some(3.0));
        assert_eq!(record.fields["pollen"], "high");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["levels"], serde_json::json!([1, 2]));
        assert_eq!(back["maxRisk"], serde_json::json!(3));
    }

    #[test]
    fn test_record_serializes_unchanged() {
        let json = r#"{"date":"2024-06-01","maxRisk":3}"#;
        let record: SeasonRecord = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&record).unwrap(), json);

        let json = r#"{"date":"2024-06-02","maxRisk":null}"#;
        let record: SeasonRecord = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&record).unwrap(), json);
    }

    #[test]
    fn test_mixed_risk_types_still_index() {
        let json = r#"[
            {"date":"2024-06-01","maxRisk":3},
            {"date":"2024-06-02","maxRisk":"n/a"},
            {"date":"2024-06-03","maxRisk":-1},
            {"date":"2024-06-04","maxRisk":-1.0}
        ]"#;
        let records: Vec<SeasonRecord> = serde_json::from_str(json).unwrap();
        let map = SeasonDataMap::from_records(records);

        assert_eq!(map.len(), 4);
        let unparsed = map.get("2024-06-02").unwrap();
        assert_eq!(unparsed.max_risk(), Some(&serde_json::json!("n/a")));
        assert_eq!(unparsed.risk(), None);
        assert!(!unparsed.is_pending());
        assert!(map.get("2024-06-03").unwrap().is_pending());
        assert!(map.get("2024-06-04").unwrap().is_pending());
    }

    #[test]
    fn test_pending_sentinel() {
        assert!(SeasonRecord::new("2024-06-02", -1.0).is_pending());
        assert!(!SeasonRecord::new("2024-06-02", 0.0).is_pending());

        let missing: SeasonRecord = serde_json::from_str(r#"{"date":"2024-06-02"}"#).unwrap();
        assert!(!missing.is_pending());
    }

    #[test]
    fn test_map_keys_by_date() {
        let map = SeasonDataMap::from_records(vec![
            SeasonRecord::new("2024-06-01", 3.0),
            SeasonRecord::new("2024-06-02", -1.0),
        ]);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("2024-06-01").and_then(SeasonRecord::risk), Some(3.0));
        assert!(map.get("2024-06-02").is_some_and(SeasonRecord::is_pending));
        assert!(map.get("2024-06-03").is_none());
    }

    #[test]
    fn test_map_last_duplicate_wins() {
        let map: SeasonDataMap = vec![
            SeasonRecord::new("2024-06-01", 1.0),
            SeasonRecord::new("2024-06-02", 2.0),
            SeasonRecord::new("2024-06-01", 5.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("2024-06-01").and_then(SeasonRecord::risk), Some(5.0));
    }

    #[test]
    fn test_year_of() {
        assert_eq!(year_of("2024-06-01"), Some("2024"));
        assert_eq!(year_of("2024"), Some("2024"));
        assert_eq!(year_of("24-06-01"), None);
        assert_eq!(year_of("abcd-01-01"), None);
        assert_eq!(year_of(""), None);
    }

    #[test]
    fn test_season_file_name() {
        assert_eq!(season_file_name("2025-01-01").as_deref(), Some("season2025.json"));
        assert_eq!(season_file_name("x"), None);
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(format_date(date), "2024-03-09");
    }
}
