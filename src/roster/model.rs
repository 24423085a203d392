// SPDX-License-Identifier: MIT

//! Worker record types
//!
//! - `WorkerRecord` - a committed roster entry, the JSON shape kept in storage
//! - `WorkerRecordInput` - the add-form draft, passed by value into the store
//! - `WorkerPatch` - a partial update; absent fields are preserved

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::error::FieldError;

/// Unique, never reused worker identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for WorkerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(WorkerId)
    }
}

/// Worker record fields, keyed by their serialized names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Age,
    Phone,
    Email,
    DateOfBirth,
    StartDate,
    Picture,
}

impl Field {
    /// Fields that must be non-empty on every committed record
    pub const REQUIRED: [Field; 3] = [Field::Name, Field::Age, Field::StartDate];

    /// Serialized key
    pub fn key(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Age => "age",
            Field::Phone => "phone",
            Field::Email => "email",
            Field::DateOfBirth => "dateOfBirth",
            Field::StartDate => "startDate",
            Field::Picture => "picture",
        }
    }

    /// Human-readable label used in messages
    pub fn label(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Age => "Age",
            Field::Phone => "Phone",
            Field::Email => "Email",
            Field::DateOfBirth => "Date of birth",
            Field::StartDate => "Start date",
            Field::Picture => "Picture",
        }
    }
}

/// One "X is required." error per required field that is absent or blank
fn missing_required<'a>(value: impl Fn(Field) -> Option<&'a str>) -> Vec<FieldError> {
    Field::REQUIRED
        .into_iter()
        .filter(|field| value(*field).map_or(true, |v| v.trim().is_empty()))
        .map(FieldError::required)
        .collect()
}

/// A committed worker record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRecord {
    pub id: WorkerId,
    pub name: String,
    /// Free text on the wire; older entries may carry a JSON number
    #[serde(deserialize_with = "string_or_number")]
    pub age: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub start_date: String,
    /// The add form historically wrote this as `dob`
    #[serde(default, alias = "dob", skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    /// URI of an externally managed image; the update form wrote `image`
    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl WorkerRecord {
    /// Build a record from a validated draft with an already allocated id
    pub(crate) fn from_input(id: WorkerId, input: WorkerRecordInput) -> Self {
        Self {
            id,
            name: input.name.trim().to_string(),
            age: input.age.trim().to_string(),
            phone: normalize(input.phone),
            email: normalize(input.email),
            start_date: input.start_date.trim().to_string(),
            date_of_birth: normalize(input.date_of_birth),
            picture: normalize(input.picture),
        }
    }

    /// Apply a patch in place; the id never changes
    pub fn apply(&mut self, patch: WorkerPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(age) = patch.age {
            self.age = age.trim().to_string();
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date.trim().to_string();
        }
        if patch.phone.is_some() {
            self.phone = normalize(patch.phone);
        }
        if patch.email.is_some() {
            self.email = normalize(patch.email);
        }
        if patch.date_of_birth.is_some() {
            self.date_of_birth = normalize(patch.date_of_birth);
        }
        if patch.picture.is_some() {
            self.picture = normalize(patch.picture);
        }
    }

    /// Read a field as text, `None` when absent
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name => Some(self.name.as_str()),
            Field::Age => Some(self.age.as_str()),
            Field::StartDate => Some(self.start_date.as_str()),
            Field::Phone => self.phone.as_deref(),
            Field::Email => self.email.as_deref(),
            Field::DateOfBirth => self.date_of_birth.as_deref(),
            Field::Picture => self.picture.as_deref(),
        }
    }

    /// Lines shown by the worker info view
    pub fn info_lines(&self) -> Vec<String> {
        [
            ("Name", Field::Name),
            ("Age", Field::Age),
            ("Phone", Field::Phone),
            ("Email", Field::Email),
            ("Start Date", Field::StartDate),
            ("Date of Birth", Field::DateOfBirth),
        ]
        .iter()
        .map(|(label, field)| {
            let value = self
                .get(*field)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or("Not provided");
            format!("{}: {}", label, value)
        })
        .collect()
    }
}

/// Draft for a new worker, as collected by the add form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRecordInput {
    pub name: String,
    pub age: String,
    pub start_date: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl WorkerRecordInput {
    pub fn new(
        name: impl Into<String>,
        age: impl Into<String>,
        start_date: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            age: age.into(),
            start_date: start_date.into(),
            ..Default::default()
        }
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Set a single field from form text
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Name => self.name = value,
            Field::Age => self.age = value,
            Field::StartDate => self.start_date = value,
            Field::Phone => self.phone = Some(value),
            Field::Email => self.email = Some(value),
            Field::DateOfBirth => self.date_of_birth = Some(value),
            Field::Picture => self.picture = Some(value),
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name => Some(self.name.as_str()),
            Field::Age => Some(self.age.as_str()),
            Field::StartDate => Some(self.start_date.as_str()),
            Field::Phone => self.phone.as_deref(),
            Field::Email => self.email.as_deref(),
            Field::DateOfBirth => self.date_of_birth.as_deref(),
            Field::Picture => self.picture.as_deref(),
        }
    }

    /// Check required fields and, in strict mode, field formats.
    /// Every failing field is reported, not just the first.
    pub fn validate(&self, strict: bool) -> Result<(), Vec<FieldError>> {
        let mut errors = missing_required(|field| self.get(field));
        if strict {
            errors.extend(check_formats(
                Some(self.age.as_str()),
                Some(self.start_date.as_str()),
                self.date_of_birth.as_deref(),
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Partial update; `None` leaves a field untouched.
/// An empty string clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl WorkerPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = Some(value.into());
        match field {
            Field::Name => self.name = value,
            Field::Age => self.age = value,
            Field::Phone => self.phone = value,
            Field::Email => self.email = value,
            Field::StartDate => self.start_date = value,
            Field::DateOfBirth => self.date_of_birth = value,
            Field::Picture => self.picture = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The record as it would be after this patch. The merged record must
    /// still carry every required field; in strict mode the patched values
    /// must also be well formed.
    pub fn apply_to(
        &self,
        record: &WorkerRecord,
        strict: bool,
    ) -> Result<WorkerRecord, Vec<FieldError>> {
        let mut merged = record.clone();
        merged.apply(self.clone());

        let mut errors = missing_required(|field| merged.get(field));
        if strict {
            errors.extend(check_formats(
                self.age.as_deref(),
                self.start_date.as_deref(),
                self.date_of_birth.as_deref(),
            ));
        }
        if errors.is_empty() {
            Ok(merged)
        } else {
            Err(errors)
        }
    }
}

const MAX_AGE: u16 = 150;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Strict-mode checks; blank values are left to the required-field check
fn check_formats(
    age: Option<&str>,
    start_date: Option<&str>,
    date_of_birth: Option<&str>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if let Some(age) = age.map(str::trim).filter(|a| !a.is_empty()) {
        match age.parse::<u16>() {
            Ok(n) if n <= MAX_AGE => {}
            _ => errors.push(FieldError::new(
                Field::Age,
                format!("Age must be a whole number between 0 and {}.", MAX_AGE),
            )),
        }
    }
    for (field, value) in [
        (Field::StartDate, start_date),
        (Field::DateOfBirth, date_of_birth),
    ] {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            if NaiveDate::parse_from_str(value, DATE_FORMAT).is_err() {
                errors.push(FieldError::new(
                    field,
                    format!("{} must be a date in YYYY-MM-DD format.", field.label()),
                ));
            }
        }
    }
    errors
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
