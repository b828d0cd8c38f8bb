use std::fmt;

use chrono::NaiveDate;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillId(pub String);

impl fmt::Display for BillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Review status of a bill. Values outside the three known ones are kept
/// verbatim so that listing never fails on a corrupted record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BillStatus {
    Pending,
    Accepted,
    Refused,
    Unrecognized(String),
}

impl BillStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Refused => "refused",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

/// A missing status reads as an unrecognized empty one.
impl Default for BillStatus {
    fn default() -> Self {
        Self::Unrecognized(String::new())
    }
}

impl From<String> for BillStatus {
    fn from(value: String) -> Self {
        match value.trim() {
            "pending" => Self::Pending,
            "accepted" => Self::Accepted,
            "refused" => Self::Refused,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<BillStatus> for String {
    fn from(value: BillStatus) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExpenseType {
    #[default]
    Transports,
    RestaurantsAndBars,
    HotelAndLodging,
    OnlineServices,
    ItAndElectronics,
    Equipment,
    OfficeSupplies,
    Other(String),
}

impl ExpenseType {
    /// Categories offered by the submission form, in display order.
    pub const ALL: [ExpenseType; 7] = [
        Self::Transports,
        Self::RestaurantsAndBars,
        Self::HotelAndLodging,
        Self::OnlineServices,
        Self::ItAndElectronics,
        Self::Equipment,
        Self::OfficeSupplies,
    ];

    pub fn label(&self) -> &str {
        match self {
            Self::Transports => "Transports",
            Self::RestaurantsAndBars => "Restaurants et bars",
            Self::HotelAndLodging => "Hôtel et logement",
            Self::OnlineServices => "Services en ligne",
            Self::ItAndElectronics => "IT et électronique",
            Self::Equipment => "Equipement et matériel",
            Self::OfficeSupplies => "Fournitures de bureau",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for ExpenseType {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        Self::ALL.into_iter().find(|known| known.label() == trimmed).unwrap_or(Self::Other(value))
    }
}

impl From<ExpenseType> for String {
    fn from(value: ExpenseType) -> Self {
        value.label().to_string()
    }
}

/// A stored bill. Every field but the layout is lenient: missing, `null` or
/// mistyped values fall back to a default so one bad record never fails a
/// whole listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    #[serde(default)]
    pub id: BillId,
    #[serde(default, deserialize_with = "loose_text")]
    pub email: String,
    #[serde(rename = "type", default, deserialize_with = "loose_text")]
    pub expense_type: ExpenseType,
    #[serde(default, deserialize_with = "loose_text")]
    pub name: String,
    /// Whole euros. Fractions are rounded; negative or unreadable values read as 0.
    #[serde(default, deserialize_with = "loose_amount")]
    pub amount: u32,
    /// Raw date as stored. Expected to be `YYYY-MM-DD`, see [`parse_iso_date`].
    #[serde(default, deserialize_with = "loose_text")]
    pub date: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub status: BillStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commentary: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "loose_optional_amount"
    )]
    pub vat: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "loose_optional_amount"
    )]
    pub pct: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_admin: Option<String>,
}

impl Bill {
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_iso_date(&self.date)
    }

    /// Receipt URL, if the bill has a usable one. The legacy store wrote the
    /// string `"null"` for bills saved before the upload completed.
    pub fn receipt_url(&self) -> Option<&str> {
        self.file_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty() && *url != "null")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseText {
    Text(String),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseAmount {
    Whole(u64),
    Decimal(f64),
    Text(String),
    Other(IgnoredAny),
}

impl LooseAmount {
    fn euros(self) -> Option<u32> {
        let value = match self {
            Self::Whole(value) => return Some(u32::try_from(value).unwrap_or(u32::MAX)),
            Self::Decimal(value) => value,
            Self::Text(text) => text.trim().replace(',', ".").parse::<f64>().ok()?,
            Self::Other(_) => return None,
        };
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some(value.round().min(f64::from(u32::MAX)) as u32)
    }
}

/// Strings are kept; `null` and non-string values read as the default.
fn loose_text<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String> + Default,
{
    Ok(match LooseText::deserialize(deserializer)? {
        LooseText::Text(text) => T::from(text),
        LooseText::Other(_) => T::default(),
    })
}

fn loose_amount<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_optional_amount(deserializer)?.unwrap_or_default())
}

fn loose_optional_amount<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(LooseAmount::deserialize(deserializer)?.euros())
}

/// Strict `YYYY-MM-DD` parsing. Unpadded forms such as `2004-4-4` are
/// rejected because they do not sort lexicographically.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let bytes = raw.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// A file picked in the receipt input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptFile {
    pub path: String,
    pub media_type: String,
    #[serde(default, skip_serializing)]
    pub content: Vec<u8>,
}

impl ReceiptFile {
    pub fn new(
        path: impl Into<String>,
        media_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self { path: path.into(), media_type: media_type.into(), content: content.into() }
    }

    /// Last path segment. Browsers report `C:\fakepath\name.png`.
    pub fn file_name(&self) -> &str {
        self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path)
    }
}

/// Payload handed to the store when a bill is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBill {
    pub email: String,
    #[serde(rename = "type")]
    pub expense_type: ExpenseType,
    pub name: String,
    pub amount: u32,
    pub date: NaiveDate,
    pub vat: Option<u32>,
    pub pct: u32,
    pub commentary: String,
    pub file_url: String,
    pub file_name: String,
    pub status: BillStatus,
}

impl NewBill {
    pub fn into_bill(self, id: BillId) -> Bill {
        Bill {
            id,
            email: self.email,
            expense_type: self.expense_type,
            name: self.name,
            amount: self.amount,
            date: self.date.format("%Y-%m-%d").to_string(),
            status: self.status,
            file_url: Some(self.file_url),
            file_name: Some(self.file_name),
            commentary: Some(self.commentary),
            vat: self.vat,
            pct: Some(self.pct),
            comment_admin: None,
        }
    }
}
