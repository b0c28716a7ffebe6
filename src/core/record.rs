//! Record module for flatstore
//!
//! A [`Record`] holds one string value per schema field. Records are parsed
//! from `|`-delimited lines, identified by their composite key and rendered
//! back either in full storage form or in the sparse display form used by
//! query results.

use std::fmt;
use std::sync::Arc;

use crate::core::errors::{Result, StoreError};
use crate::core::schema::{Schema, FIELD_DELIMITER};

/// Delimiter between fields in the display form of a record
pub const DISPLAY_DELIMITER: &str = ",";

/// How a record is rendered as text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializeMode {
    /// Every schema field in schema order, `|`-delimited
    Storage,
    /// Only non-empty fields in the current field ordering, `,`-delimited
    Display,
}

/// A single record with one value per schema field
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<String>,
    /// Field positions used for display; `None` means schema order
    ordering: Option<Vec<usize>>,
    /// Set once any field has been assigned by parsing or mutation
    has_data: bool,
}

impl Record {
    /// Create an empty record with every field blank
    pub fn new(schema: &Arc<Schema>) -> Self {
        Record {
            schema: Arc::clone(schema),
            values: vec![String::new(); schema.len()],
            ordering: None,
            has_data: false,
        }
    }

    /// Parse a delimited line, assigning fields positionally
    ///
    /// Missing trailing fields stay blank and surplus tokens are ignored.
    /// An empty line produces an empty record.
    pub fn parse(schema: &Arc<Schema>, line: &str) -> Result<Self> {
        if schema.is_empty() {
            return Err(StoreError::MalformedRecord("schema defines no fields".to_string()));
        }

        let mut record = Record::new(schema);
        if line.is_empty() {
            return Ok(record);
        }

        for (slot, token) in record.values.iter_mut().zip(line.split(FIELD_DELIMITER)) {
            slot.push_str(token);
        }
        record.has_data = true;

        Ok(record)
    }

    /// The schema this record follows
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// True for a record no field was ever assigned on
    pub fn is_empty(&self) -> bool {
        !self.has_data
    }

    /// True once any field has been assigned
    pub fn has_data(&self) -> bool {
        self.has_data
    }

    /// Values in schema order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Get the value of a field
    pub fn get_field(&self, name: &str) -> Result<&str> {
        let index = self.schema.position(name)?;
        Ok(&self.values[index])
    }

    /// Set the value of a field
    pub fn set_field<V: Into<String>>(&mut self, name: &str, value: V) -> Result<()> {
        let index = self.schema.position(name)?;
        self.values[index] = value.into();
        self.has_data = true;
        Ok(())
    }

    /// Composite key: concatenation of the schema's key field values
    pub fn key(&self) -> String {
        self.schema
            .key_fields()
            .iter()
            .filter_map(|name| self.schema.index_of(name))
            .map(|i| self.values[i].as_str())
            .collect()
    }

    /// Override the field ordering used for display
    pub fn set_ordering<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<()> {
        let ordering = fields
            .iter()
            .map(|f| self.schema.position(f.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.ordering = Some(ordering);
        Ok(())
    }

    /// Field names in the current display ordering
    pub fn ordering(&self) -> Vec<&str> {
        self.positions()
            .map(|i| self.schema.fields()[i].name.as_str())
            .collect()
    }

    /// Values in the current display ordering, empty ones included
    pub fn cells(&self) -> Vec<&str> {
        self.positions().map(|i| self.values[i].as_str()).collect()
    }

    /// Whether a field is part of the current display ordering
    pub fn is_projected(&self, name: &str) -> bool {
        match (&self.ordering, self.schema.index_of(name)) {
            (Some(ordering), Some(index)) => ordering.contains(&index),
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }

    /// Restrict the record to `fields`: set the ordering and blank every other field
    pub fn project<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<()> {
        self.set_ordering(fields)?;
        if let Some(ordering) = &self.ordering {
            for (i, value) in self.values.iter_mut().enumerate() {
                if !ordering.contains(&i) {
                    value.clear();
                }
            }
        }
        Ok(())
    }

    fn positions(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        match &self.ordering {
            Some(ordering) => Box::new(ordering.iter().copied()),
            None => Box::new(0..self.values.len()),
        }
    }

    /// Render the record as text
    pub fn serialize(&self, mode: SerializeMode) -> String {
        match mode {
            SerializeMode::Storage => self.values.join(FIELD_DELIMITER.to_string().as_str()),
            SerializeMode::Display => self
                .positions()
                .map(|i| self.values[i].as_str())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(DISPLAY_DELIMITER),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialize(SerializeMode::Display))
    }
}
