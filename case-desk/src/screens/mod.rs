//! List, detail and form state for one resource.
//!
//! Every screen follows the same flow: load the list, select a record to
//! fetch its detail, edit it as a [`FormTree`], submit and refetch. Deleting
//! takes two steps. Failures are kept in [`ResourceScreen::notice`] so the
//! caller can render them next to the screen.

mod investigation;

pub use investigation::InvestigationDetails;

use crate::forms::templates::blank_record;
use crate::forms::{FieldPath, FormError, FormTree};
use crate::resources::{record_id, Resource, ResourceClient};
use case_core::http::into_payload;
use case_core::{ClientError, ErrorKind};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error("No record is selected")]
    NothingSelected,

    #[error("Selected record has no id")]
    MissingId,

    #[error("No form is open")]
    NotEditing,

    #[error("Delete was not requested")]
    DeleteNotRequested,

    #[error("{0} is not a panel of the investigation page")]
    UnknownPanel(Resource),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenMode {
    Browsing,
    Viewing,
    Editing(FormTree),
    Creating(FormTree),
    ConfirmingDelete,
}

/// Last failure of a screen, ready to display.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
    pub requires_sign_in: bool,
}

impl From<&ClientError> for Notice {
    fn from(err: &ClientError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            requires_sign_in: err.requires_sign_in(),
        }
    }
}

pub struct ResourceScreen {
    client: ResourceClient,
    file_number: Option<String>,
    rows: Vec<Value>,
    selected: Option<Value>,
    mode: ScreenMode,
    notice: Option<Notice>,
}

impl ResourceScreen {
    pub fn new(client: ResourceClient) -> Self {
        Self {
            client,
            file_number: None,
            rows: Vec::new(),
            selected: None,
            mode: ScreenMode::Browsing,
            notice: None,
        }
    }

    /// A screen listing only the records of one investigation file.
    pub fn scoped(client: ResourceClient, file_number: impl Into<String>) -> Self {
        Self {
            file_number: Some(file_number.into()),
            ..Self::new(client)
        }
    }

    pub fn resource(&self) -> Resource {
        self.client.resource()
    }

    pub fn file_number(&self) -> Option<&str> {
        self.file_number.as_deref()
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    pub fn selected(&self) -> Option<&Value> {
        self.selected.as_ref()
    }

    pub fn mode(&self) -> &ScreenMode {
        &self.mode
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub async fn load(&mut self) -> Result<(), ScreenError> {
        let rows = match &self.file_number {
            Some(file_number) => self.client.list_for_investigation(file_number).await,
            None => self.client.list().await,
        };
        self.rows = self.noted(rows)?;
        self.notice = None;

        tracing::debug!(
            resource = self.resource().segment(),
            rows = self.rows.len(),
            "List loaded"
        );
        Ok(())
    }

    pub async fn select(&mut self, id: &str) -> Result<(), ScreenError> {
        let detail = self.client.detail(id).await;
        self.selected = Some(self.noted(detail)?);
        self.mode = ScreenMode::Viewing;
        Ok(())
    }

    /// Open the selected record in a form.
    pub fn begin_edit(&mut self) -> Result<&mut FormTree, ScreenError> {
        let detail = self.selected.clone().ok_or(ScreenError::NothingSelected)?;
        self.mode = ScreenMode::Editing(FormTree::from_value(detail));
        self.form_mut()
    }

    /// Open a blank form. Scoped screens pre-fill the file number.
    pub fn begin_create(&mut self) -> Result<&mut FormTree, ScreenError> {
        let mut form = FormTree::from_value(blank_record(self.resource()));
        if let Some(file_number) = &self.file_number {
            form.update_at(
                &FieldPath::field("file_number"),
                Value::String(file_number.clone()),
            )?;
        }
        self.mode = ScreenMode::Creating(form);
        self.form_mut()
    }

    pub fn form(&self) -> Option<&FormTree> {
        match &self.mode {
            ScreenMode::Editing(form) | ScreenMode::Creating(form) => Some(form),
            _ => None,
        }
    }

    pub fn form_mut(&mut self) -> Result<&mut FormTree, ScreenError> {
        match &mut self.mode {
            ScreenMode::Editing(form) | ScreenMode::Creating(form) => Ok(form),
            _ => Err(ScreenError::NotEditing),
        }
    }

    /// Send the open form. An edit replaces the whole record, then the list
    /// and the detail are fetched again. On failure the form stays open.
    pub async fn submit(&mut self) -> Result<(), ScreenError> {
        let (form, creating) = match &self.mode {
            ScreenMode::Editing(form) => (form, false),
            ScreenMode::Creating(form) => (form, true),
            _ => return Err(ScreenError::NotEditing),
        };
        let payload = into_payload(form.to_payload())
            .ok_or_else(|| FormError::NotAnObject("record".to_string()))?;

        if creating {
            let created = self.client.create(payload).await;
            let created = self.noted(created)?;
            tracing::info!(resource = self.resource().segment(), "Record created");

            self.mode = ScreenMode::Browsing;
            self.selected = None;
            self.load().await?;
            if let Some(id) = record_id(&created) {
                self.select(&id).await?;
            }
        } else {
            let id = self.selected_id()?;
            let updated = self.client.update(&id, payload).await;
            self.noted(updated)?;
            tracing::info!(resource = self.resource().segment(), id = %id, "Record updated");

            self.mode = ScreenMode::Viewing;
            self.load().await?;
            self.select(&id).await?;
        }
        Ok(())
    }

    pub fn request_delete(&mut self) -> Result<(), ScreenError> {
        if self.selected.is_none() {
            return Err(ScreenError::NothingSelected);
        }
        self.mode = ScreenMode::ConfirmingDelete;
        Ok(())
    }

    /// Delete the selected record after [`request_delete`](Self::request_delete).
    pub async fn confirm_delete(&mut self) -> Result<(), ScreenError> {
        if self.mode != ScreenMode::ConfirmingDelete {
            return Err(ScreenError::DeleteNotRequested);
        }
        let id = self.selected_id()?;

        if let Err(err) = self.client.delete(&id).await {
            self.mode = ScreenMode::Viewing;
            return self.noted(Err(err));
        }

        self.selected = None;
        self.mode = ScreenMode::Browsing;
        self.load().await
    }

    /// Leave the form or the delete prompt without sending anything.
    pub fn cancel(&mut self) {
        self.mode = if self.selected.is_some() {
            ScreenMode::Viewing
        } else {
            ScreenMode::Browsing
        };
    }

    fn selected_id(&self) -> Result<String, ScreenError> {
        let selected = self.selected.as_ref().ok_or(ScreenError::NothingSelected)?;
        record_id(selected).ok_or(ScreenError::MissingId)
    }

    fn noted<T>(&mut self, result: Result<T, ClientError>) -> Result<T, ScreenError> {
        result.map_err(|err| {
            tracing::warn!(
                resource = self.resource().segment(),
                error = %err,
                "Screen call failed"
            );
            self.notice = Some(Notice::from(&err));
            ScreenError::Client(err)
        })
    }
}
