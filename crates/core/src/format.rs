//! Display formatting for dates and statuses.

use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::domain::bill::{parse_iso_date, BillStatus};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Fr,
    En,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fr" => Ok(Self::Fr),
            "en" => Ok(Self::En),
            other => Err(format!("unsupported locale `{other}` (expected fr|en)")),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fr => "fr",
            Self::En => "en",
        })
    }
}

const MONTHS_FR: [&str; 12] =
    ["Jan", "Fév", "Mar", "Avr", "Mai", "Jui", "Jui", "Aoû", "Sep", "Oct", "Nov", "Déc"];
const MONTHS_EN: [&str; 12] =
    ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

/// `2004-04-04` becomes `4 Avr. 04`. Returns `None` for anything that is
/// not a strict ISO calendar date.
pub fn format_date(raw: &str, locale: Locale) -> Option<String> {
    let date = parse_iso_date(raw)?;
    let months = match locale {
        Locale::Fr => &MONTHS_FR,
        Locale::En => &MONTHS_EN,
    };
    let month = months[date.month0() as usize];
    Some(format!("{} {}. {:02}", date.day(), month, date.year().rem_euclid(100)))
}

pub fn status_label(status: &BillStatus, locale: Locale) -> &'static str {
    match (locale, status) {
        (Locale::Fr, BillStatus::Pending) => "En attente",
        (Locale::Fr, BillStatus::Accepted) => "Accepté",
        (Locale::Fr, BillStatus::Refused) => "Refusé",
        (Locale::Fr, BillStatus::Unrecognized(_)) => "Inconnu",
        (Locale::En, BillStatus::Pending) => "Pending",
        (Locale::En, BillStatus::Accepted) => "Accepted",
        (Locale::En, BillStatus::Refused) => "Refused",
        (Locale::En, BillStatus::Unrecognized(_)) => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::{format_date, status_label, Locale};
    use crate::domain::bill::BillStatus;

    #[test]
    fn formats_short_french_dates() {
        assert_eq!(format_date("2004-04-04", Locale::Fr).as_deref(), Some("4 Avr. 04"));
        assert_eq!(format_date("2002-02-02", Locale::Fr).as_deref(), Some("2 Fév. 02"));
        assert_eq!(format_date("2023-12-25", Locale::Fr).as_deref(), Some("25 Déc. 23"));
    }

    #[test]
    fn formats_short_english_dates() {
        assert_eq!(format_date("2001-01-01", Locale::En).as_deref(), Some("1 Jan. 01"));
    }

    #[test]
    fn malformed_dates_are_not_formatted() {
        assert_eq!(format_date("04/04/2004", Locale::Fr), None);
        assert_eq!(format_date("", Locale::Fr), None);
    }

    #[test]
    fn unknown_status_gets_neutral_label() {
        let status = BillStatus::Unrecognized("archived".to_string());
        assert_eq!(status_label(&status, Locale::Fr), "Inconnu");
        assert_eq!(status_label(&status, Locale::En), "Unknown");
        assert_eq!(status_label(&BillStatus::Pending, Locale::Fr), "En attente");
    }

    #[test]
    fn locale_parsing_is_case_insensitive() {
        assert_eq!("EN".parse::<Locale>(), Ok(Locale::En));
        assert!("de".parse::<Locale>().is_err());
    }
}
