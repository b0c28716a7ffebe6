//! Record schema
//!
//! A [`Schema`] is the ordered list of fields every record carries, plus the
//! subset of fields whose concatenated values form the composite key. It is
//! plain runtime data: the default media-view schema is provided, and other
//! schemas can be loaded from JSON.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, StoreError};
use crate::core::record::Record;

/// Delimiter between fields in the storage form of a record
pub const FIELD_DELIMITER: char = '|';

/// Maximum length applied to text fields of the default schema
pub const DEFAULT_TEXT_LEN: usize = 64;

/// The type of values a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text, compared lexicographically
    #[default]
    Text,
    /// Calendar date in `YYYY-MM-DD` form
    Date,
    /// Decimal number such as a price (`4.00`)
    Decimal,
    /// Elapsed time in `h:mm` form
    Duration,
}

impl FieldKind {
    /// Check that a non-empty value is well formed for this kind
    pub fn check(&self, value: &str) -> std::result::Result<(), String> {
        let valid = match self {
            FieldKind::Text => true,
            FieldKind::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
            FieldKind::Decimal => parse_decimal(value).is_some(),
            FieldKind::Duration => parse_duration(value).is_some(),
        };

        if valid {
            Ok(())
        } else {
            Err(format!("'{}' is not a valid {:?} value", value, self))
        }
    }

    /// Whether values of this kind can be summed
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Decimal | FieldKind::Duration)
    }
}

/// Parse a decimal value, returning the number and its count of fractional digits
pub fn parse_decimal(value: &str) -> Option<(f64, usize)> {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    value.parse::<f64>().ok().map(|n| (n, fraction.len()))
}

/// Parse an `h:mm` duration into minutes
pub fn parse_duration(value: &str) -> Option<u64> {
    let (hours, minutes) = value.split_once(':')?;
    if hours.is_empty() || minutes.len() != 2 {
        return None;
    }
    if !hours.bytes().all(|b| b.is_ascii_digit()) || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours: u64 = hours.parse().ok()?;
    let minutes: u64 = minutes.parse().ok()?;
    if minutes >= 60 {
        return None;
    }

    hours.checked_mul(60)?.checked_add(minutes)
}

/// Render minutes as an `h:mm` duration
pub fn format_duration(minutes: u64) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// Definition of a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name as used in queries
    pub name: String,
    /// Kind of value held by the field
    #[serde(default)]
    pub kind: FieldKind,
    /// Maximum length in characters, if bounded
    #[serde(default)]
    pub max_len: Option<usize>,
}

impl FieldDef {
    /// Create an unbounded field of the given kind
    pub fn new<S: Into<String>>(name: S, kind: FieldKind) -> Self {
        FieldDef {
            name: name.into(),
            kind,
            max_len: None,
        }
    }

    /// Bound the field to `max_len` characters
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }
}

/// Ordered field list and composite key definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDef>,
    key: Vec<String>,
}

impl Schema {
    /// Create a schema, checking that it has fields and a valid key
    pub fn new(fields: Vec<FieldDef>, key: Vec<String>) -> Result<Self> {
        let schema = Schema { fields, key };
        schema.check()?;
        Ok(schema)
    }

    /// The set-top-box media view schema, unique by `stb`, `title` and `date`
    pub fn media_views() -> Self {
        Schema {
            fields: vec![
                FieldDef::new("stb", FieldKind::Text).with_max_len(DEFAULT_TEXT_LEN),
                FieldDef::new("title", FieldKind::Text).with_max_len(DEFAULT_TEXT_LEN),
                FieldDef::new("provider", FieldKind::Text).with_max_len(DEFAULT_TEXT_LEN),
                FieldDef::new("date", FieldKind::Date),
                FieldDef::new("rev", FieldKind::Decimal),
                FieldDef::new("viewtime", FieldKind::Duration),
            ],
            key: vec!["stb".to_string(), "title".to_string(), "date".to_string()],
        }
    }

    /// Parse a schema from its JSON description
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: Schema = serde_json::from_str(json)?;
        schema.check()?;
        Ok(schema)
    }

    /// Load a schema from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("Unable to read schema {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    fn check(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(StoreError::MalformedRecord("schema defines no fields".to_string()));
        }

        for (i, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() || field.name.contains(FIELD_DELIMITER) {
                return Err(StoreError::Config(format!("invalid field name '{}'", field.name)));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(StoreError::Config(format!("duplicate field '{}'", field.name)));
            }
        }

        if self.key.is_empty() {
            return Err(StoreError::Config("schema defines no key fields".to_string()));
        }
        for name in &self.key {
            self.position(name)?;
        }

        Ok(())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field definitions in schema order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Field names in schema order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Names of the fields forming the composite key
    pub fn key_fields(&self) -> &[String] {
        &self.key
    }

    /// Position of a field, if known
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Position of a field, failing with `UnknownField`
    pub fn position(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| StoreError::UnknownField(name.to_string()))
    }

    /// Definition of a field, failing with `UnknownField`
    pub fn field(&self, name: &str) -> Result<&FieldDef> {
        self.position(name).map(|i| &self.fields[i])
    }

    /// Check that every value of a record can be stored and fits its field
    pub fn validate(&self, record: &Record) -> Result<()> {
        for (field, value) in self.fields.iter().zip(record.values()) {
            check_storable(&field.name, value)?;
            if value.is_empty() {
                continue;
            }

            if let Some(max_len) = field.max_len {
                if value.chars().count() > max_len {
                    return Err(StoreError::invalid_value(
                        &field.name,
                        format!("longer than {} characters", max_len),
                    ));
                }
            }

            field.kind.check(value)
                .map_err(|reason| StoreError::invalid_value(&field.name, reason))?;
        }

        Ok(())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::media_views()
    }
}

/// Reject values that would break the line-oriented storage form
pub fn check_storable(field: &str, value: &str) -> Result<()> {
    if value.contains(FIELD_DELIMITER) || value.contains('\n') || value.contains('\r') {
        return Err(StoreError::invalid_value(
            field,
            "contains the field delimiter or a line break",
        ));
    }
    Ok(())
}
