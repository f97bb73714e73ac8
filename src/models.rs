use chrono::{Local, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Dates are stored as text in this format.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Submitted,
    Assessment,
    Interview,
    Offer,
    Rejected,
    Accepted,
    Withdrawn,
}

impl Status {
    pub const ALL: [Status; 8] = [
        Status::Pending,
        Status::Submitted,
        Status::Assessment,
        Status::Interview,
        Status::Offer,
        Status::Rejected,
        Status::Accepted,
        Status::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Submitted => "submitted",
            Status::Assessment => "assessment",
            Status::Interview => "interview",
            Status::Offer => "offer",
            Status::Rejected => "rejected",
            Status::Accepted => "accepted",
            Status::Withdrawn => "withdrawn",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: i64,
    pub date: String, // DD/MM/YYYY
    pub company: String,
    pub job: String,
    pub description: String,
    pub status: Status,
    pub timestamp: f64, // epoch seconds derived from `date`
}

/// The editable fields of a record, everything except the id.
/// Fed to Store::add and Store::edit, which validate it.
#[derive(Debug, Clone)]
pub struct Draft {
    pub date: String,
    pub company: String,
    pub job: String,
    pub description: String,
    pub status: Status,
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// Epoch seconds for a date at UTC midnight. Using UTC keeps the value
/// independent of the machine that wrote the file.
pub fn date_timestamp(date: NaiveDate) -> f64 {
    date.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
        .timestamp() as f64
}

pub fn today() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_month_year() {
        let d = parse_date("20/03/2023").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2023, 3, 20).unwrap());
    }

    #[test]
    fn rejects_bad_dates() {
        assert!(parse_date("2023-03-20").is_none());
        assert!(parse_date("31/02/2023").is_none());
        assert!(parse_date("").is_none());
        assert!(parse_date("soon").is_none());
    }

    #[test]
    fn timestamp_is_utc_midnight() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(date_timestamp(d), 1704067200.0);
    }

    #[test]
    fn later_dates_have_larger_timestamps() {
        let a = date_timestamp(parse_date("01/01/2024").unwrap());
        let b = date_timestamp(parse_date("15/06/2024").unwrap());
        assert!(b > a);
    }

    #[test]
    fn status_round_trips_through_json() {
        for status in Status::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: Status = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }
}
