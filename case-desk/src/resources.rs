//! Backend resources of the investigation app and a CRUD client for each.

use case_core::http::Payload;
use case_core::{ApiClient, ClientError};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

const APP_PREFIX: &str = "investigation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Investigation,
    Taxpayer,
    Inspection,
    Search,
    Seizure,
    Summons,
    ShowCauseNotice,
    Recovery,
    ProvisionalAttachment,
    Drc,
    Arrest,
    Prosecution,
    Adjudication,
    Appeal,
}

impl Resource {
    pub const ALL: [Resource; 14] = [
        Resource::Investigation,
        Resource::Taxpayer,
        Resource::Inspection,
        Resource::Search,
        Resource::Seizure,
        Resource::Summons,
        Resource::ShowCauseNotice,
        Resource::Recovery,
        Resource::ProvisionalAttachment,
        Resource::Drc,
        Resource::Arrest,
        Resource::Prosecution,
        Resource::Adjudication,
        Resource::Appeal,
    ];

    /// Panels offered by the investigation details sidebar.
    pub const SIDEBAR: [Resource; 13] = [
        Resource::Taxpayer,
        Resource::Inspection,
        Resource::Search,
        Resource::Seizure,
        Resource::Summons,
        Resource::ShowCauseNotice,
        Resource::Recovery,
        Resource::ProvisionalAttachment,
        Resource::Drc,
        Resource::Arrest,
        Resource::Prosecution,
        Resource::Adjudication,
        Resource::Appeal,
    ];

    pub fn segment(self) -> &'static str {
        match self {
            Resource::Investigation => "investigation",
            Resource::Taxpayer => "taxpayer",
            Resource::Inspection => "inspection",
            Resource::Search => "search",
            Resource::Seizure => "seizure",
            Resource::Summons => "summons",
            Resource::ShowCauseNotice => "show-cause-notice",
            Resource::Recovery => "recovery",
            Resource::ProvisionalAttachment => "provisional-attachment",
            Resource::Drc => "drc",
            Resource::Arrest => "arrest",
            Resource::Prosecution => "prosecution",
            Resource::Adjudication => "adjudication",
            Resource::Appeal => "appeal",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Resource::Investigation => "Investigation",
            Resource::Taxpayer => "Taxpayer",
            Resource::Inspection => "Inspection",
            Resource::Search => "Search",
            Resource::Seizure => "Seizure",
            Resource::Summons => "Summons",
            Resource::ShowCauseNotice => "Show Cause Notice",
            Resource::Recovery => "Recovery",
            Resource::ProvisionalAttachment => "Provisional Attachment",
            Resource::Drc => "DRC",
            Resource::Arrest => "Arrest",
            Resource::Prosecution => "Prosecution",
            Resource::Adjudication => "Adjudication",
            Resource::Appeal => "Appeal",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Resource> {
        Resource::ALL.into_iter().find(|r| r.segment() == segment)
    }

    /// `investigation/<resource>/`
    pub fn collection_path(self) -> String {
        format!("{}/{}/", APP_PREFIX, self.segment())
    }

    /// `investigation/<resource>/<id>/`
    pub fn item_path(self, id: impl fmt::Display) -> String {
        format!(
            "{}/{}/{}/",
            APP_PREFIX,
            self.segment(),
            urlencoding::encode(&id.to_string())
        )
    }

    /// `investigation/<resource>/investigation/<file_number>/`
    ///
    /// File numbers usually contain slashes, which are percent-encoded so the
    /// number stays a single path segment.
    pub fn investigation_path(self, file_number: &str) -> String {
        format!(
            "{}/{}/investigation/{}/",
            APP_PREFIX,
            self.segment(),
            urlencoding::encode(file_number)
        )
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Read the `id` of a record, whether the backend sends it as a number or a string.
pub fn record_id(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// CRUD calls against one resource.
#[derive(Clone)]
pub struct ResourceClient {
    api: Arc<ApiClient>,
    resource: Resource,
}

impl ResourceClient {
    pub fn new(api: Arc<ApiClient>, resource: Resource) -> Self {
        Self { api, resource }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub async fn list(&self) -> Result<Vec<Value>, ClientError> {
        let body = self.api.get(&self.resource.collection_path()).await?;
        into_rows(body)
    }

    /// Records belonging to one investigation file.
    pub async fn list_for_investigation(&self, file_number: &str) -> Result<Vec<Value>, ClientError> {
        let body = self
            .api
            .get(&self.resource.investigation_path(file_number))
            .await?;
        into_rows(body)
    }

    pub async fn detail(&self, id: &str) -> Result<Value, ClientError> {
        self.api.get(&self.resource.item_path(id)).await
    }

    pub async fn create(&self, record: Payload) -> Result<Value, ClientError> {
        self.api.post(&self.resource.collection_path(), record).await
    }

    /// Replace the whole record, nested children included.
    pub async fn update(&self, id: &str, record: Payload) -> Result<Value, ClientError> {
        self.api.put(&self.resource.item_path(id), record).await
    }

    pub async fn patch(&self, id: &str, fields: Payload) -> Result<Value, ClientError> {
        self.api.patch(&self.resource.item_path(id), fields).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.api.delete(&self.resource.item_path(id)).await?;
        tracing::info!(resource = self.resource.segment(), id, "Record deleted");
        Ok(())
    }
}

/// Accept a bare array or a paginated `{ "results": [...] }` envelope.
fn into_rows(body: Value) -> Result<Vec<Value>, ClientError> {
    let rows = match body {
        Value::Object(mut envelope) if envelope.contains_key("results") => envelope
            .remove("results")
            .unwrap_or(Value::Array(Vec::new())),
        Value::Null => Value::Array(Vec::new()),
        other => other,
    };
    Ok(serde_json::from_value(rows)?)
}
