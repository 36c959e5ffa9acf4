//! State of the investigation registration screen.
//!
//! The form is split into independent slices. Each update replaces a slice
//! with a new value carrying one changed field; nothing is mutated in place.

use super::FormError;
use crate::resources::Resource;
use case_core::{ApiClient, ClientError, Payload};
use chrono::{Local, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InvestigationFields {
    #[validate(length(min = 1, message = "File number is required"))]
    pub file_number: String,
    pub date_of_detection: NaiveDate,
    pub case_type: String,
    pub brief_facts: String,
    pub officer_name: String,
}

impl Default for InvestigationFields {
    fn default() -> Self {
        Self {
            file_number: String::new(),
            date_of_detection: Local::now().date_naive(),
            case_type: String::new(),
            brief_facts: String::new(),
            officer_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct TaxpayerInfo {
    #[validate(length(equal = 15, message = "GSTIN must be 15 characters"))]
    pub gstin: String,
    pub legal_name: String,
    pub trade_name: String,
    pub address: String,
}

/// The jurisdiction picked from the dropdown, as the dropdown reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionSelection {
    pub selected: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ContactPerson {
    pub name: String,
    pub designation: String,
    pub phone: String,
    /// Optional. A blank field is held as `None` and sent as an empty string.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        serialize_with = "none_as_blank"
    )]
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|value| !value.trim().is_empty()))
}

fn none_as_blank<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.as_deref().unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slice {
    Investigation,
    Taxpayer,
    Jurisdiction,
    Contact,
}

impl Slice {
    pub fn name(self) -> &'static str {
        match self {
            Slice::Investigation => "investigation",
            Slice::Taxpayer => "taxpayer",
            Slice::Jurisdiction => "jurisdiction",
            Slice::Contact => "contact_person",
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationForm {
    investigation: InvestigationFields,
    taxpayer: TaxpayerInfo,
    jurisdiction: JurisdictionSelection,
    contact: ContactPerson,
}

impl Default for RegistrationForm {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self {
            investigation: InvestigationFields::default(),
            taxpayer: TaxpayerInfo::default(),
            jurisdiction: JurisdictionSelection::default(),
            contact: ContactPerson::default(),
        }
    }

    pub fn investigation(&self) -> &InvestigationFields {
        &self.investigation
    }

    pub fn taxpayer(&self) -> &TaxpayerInfo {
        &self.taxpayer
    }

    pub fn jurisdiction(&self) -> &JurisdictionSelection {
        &self.jurisdiction
    }

    pub fn contact(&self) -> &ContactPerson {
        &self.contact
    }

    /// Change one field of one slice. Other slices are left untouched.
    pub fn update(&mut self, slice: Slice, field: &str, value: impl Into<Value>) -> Result<(), FormError> {
        let value = value.into();
        match slice {
            Slice::Investigation => {
                self.investigation = merge_field(&self.investigation, slice, field, value)?
            }
            Slice::Taxpayer => self.taxpayer = merge_field(&self.taxpayer, slice, field, value)?,
            Slice::Jurisdiction => {
                self.jurisdiction = merge_field(&self.jurisdiction, slice, field, value)?
            }
            Slice::Contact => self.contact = merge_field(&self.contact, slice, field, value)?,
        }
        Ok(())
    }

    /// Back to a blank form dated today.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn validate(&self) -> Result<(), FormError> {
        self.investigation.validate()?;
        self.taxpayer.validate()?;
        self.contact.validate()?;
        Ok(())
    }

    /// The investigation record in the shape the backend stores it.
    pub fn to_payload(&self) -> Result<Payload, FormError> {
        self.validate()?;

        let selected = self.jurisdiction.selected.trim();
        let jurisdiction: i64 = selected
            .parse()
            .map_err(|_| FormError::InvalidJurisdiction(selected.to_string()))?;

        let mut payload = to_object(&self.investigation)?;
        payload.insert("jurisdiction".to_string(), Value::from(jurisdiction));
        payload.insert(
            "taxpayer".to_string(),
            Value::Object(to_object(&self.taxpayer)?),
        );
        payload.insert(
            "contact_person".to_string(),
            Value::Object(to_object(&self.contact)?),
        );
        Ok(payload)
    }

    /// Register the investigation. The form is cleared only when the backend accepts it.
    pub async fn submit(&mut self, api: &ApiClient) -> Result<Value, SubmitError> {
        let payload = self.to_payload()?;
        let created = api
            .post(&Resource::Investigation.collection_path(), payload)
            .await?;

        tracing::info!(
            file_number = %self.investigation.file_number,
            "Investigation registered"
        );
        self.reset();
        Ok(created)
    }
}

fn to_object<T: Serialize>(slice: &T) -> Result<Map<String, Value>, FormError> {
    match serde_json::to_value(slice) {
        Ok(Value::Object(fields)) => Ok(fields),
        _ => Err(FormError::NotAnObject(std::any::type_name::<T>().to_string())),
    }
}

fn merge_field<T>(current: &T, slice: Slice, field: &str, value: Value) -> Result<T, FormError>
where
    T: Serialize + DeserializeOwned,
{
    let mut fields = to_object(current)?;
    if !fields.contains_key(field) {
        return Err(FormError::UnknownField {
            slice: slice.name(),
            field: field.to_string(),
        });
    }

    fields.insert(field.to_string(), value);
    serde_json::from_value(Value::Object(fields)).map_err(|e| FormError::InvalidValue {
        field: field.to_string(),
        reason: e.to_string(),
    })
}
