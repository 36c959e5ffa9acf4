use super::{ResourceScreen, ScreenError};
use crate::resources::{Resource, ResourceClient};
use case_core::ApiClient;
use std::sync::Arc;

/// Details page of one investigation file. The sidebar picks which
/// resource panel is shown, always scoped to the file number.
pub struct InvestigationDetails {
    api: Arc<ApiClient>,
    file_number: String,
    panel: Resource,
    screen: ResourceScreen,
}

impl InvestigationDetails {
    /// Opens on the taxpayer panel. Nothing is fetched until [`show`](Self::show).
    pub fn new(api: Arc<ApiClient>, file_number: impl Into<String>) -> Self {
        let file_number = file_number.into();
        let panel = Resource::Taxpayer;
        let screen = ResourceScreen::scoped(ResourceClient::new(api.clone(), panel), &file_number);
        Self {
            api,
            file_number,
            panel,
            screen,
        }
    }

    pub fn panels() -> &'static [Resource] {
        &Resource::SIDEBAR
    }

    pub fn file_number(&self) -> &str {
        &self.file_number
    }

    pub fn active_panel(&self) -> Resource {
        self.panel
    }

    /// Swap in a fresh screen for `panel` and load its list.
    pub async fn show(&mut self, panel: Resource) -> Result<(), ScreenError> {
        if !Resource::SIDEBAR.contains(&panel) {
            return Err(ScreenError::UnknownPanel(panel));
        }

        tracing::debug!(file_number = %self.file_number, panel = panel.segment(), "Switching panel");
        self.panel = panel;
        self.screen = ResourceScreen::scoped(
            ResourceClient::new(self.api.clone(), panel),
            self.file_number.clone(),
        );
        self.screen.load().await
    }

    pub fn screen(&self) -> &ResourceScreen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut ResourceScreen {
        &mut self.screen
    }
}
