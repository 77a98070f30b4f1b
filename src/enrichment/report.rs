use std::path::Path;

use serde::Serialize;

use crate::error::{Result, Signal};
use crate::output;

pub const MISSING_VALUES_HEADER: &[&str] = &[
    "City",
    "Country",
    "Missing PlaceID",
    "Missing Internet Speed",
    "Missing Safety Score",
    "Missing Cost of Living",
    "Missing Photos",
];

/// Which signals one destination ended up without.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MissingValueReport {
    pub city: String,
    pub country: String,
    pub missing_place_id: bool,
    pub missing_speed: bool,
    pub missing_safety: bool,
    pub missing_cost_of_living: bool,
    pub missing_photos: bool,
}

impl MissingValueReport {
    pub fn new(city: &str, country: &str) -> Self {
        Self {
            city: city.to_string(),
            country: country.to_string(),
            ..Default::default()
        }
    }

    pub fn mark_missing(&mut self, signal: Signal) {
        match signal {
            Signal::PlaceId => self.missing_place_id = true,
            Signal::InternetSpeed => self.missing_speed = true,
            Signal::Safety => self.missing_safety = true,
            Signal::CostOfLiving => self.missing_cost_of_living = true,
            Signal::Photos => self.missing_photos = true,
        }
    }

    pub fn is_complete(&self) -> bool {
        !(self.missing_place_id
            || self.missing_speed
            || self.missing_safety
            || self.missing_cost_of_living
            || self.missing_photos)
    }
}

pub fn write_report(path: &Path, reports: &[MissingValueReport]) -> Result<()> {
    output::write_csv(path, MISSING_VALUES_HEADER, reports)
}

pub fn report_bytes(reports: &[MissingValueReport]) -> Result<Vec<u8>> {
    output::csv_bytes(MISSING_VALUES_HEADER, reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_rows_are_boolean_strings() {
        let mut report = MissingValueReport::new("Lima", "Peru");
        report.mark_missing(Signal::InternetSpeed);
        report.mark_missing(Signal::Photos);
        assert!(!report.is_complete());

        let csv = String::from_utf8(report_bytes(&[report]).unwrap()).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "City,Country,Missing PlaceID,Missing Internet Speed,Missing Safety Score,Missing Cost of Living,Missing Photos"
        );
        assert_eq!(lines[1], "Lima,Peru,false,true,false,false,true");
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_values_report.csv");

        write_report(&path, &[MissingValueReport::new("Quito", "Ecuador")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("Quito,Ecuador,false,false,false,false,false\n"));
    }
}
