//! case-desk: GST investigation case screens on top of `case-core`.
pub mod forms;
pub mod resources;
pub mod screens;

pub use case_core;
pub use resources::{Resource, ResourceClient};
pub use screens::{InvestigationDetails, ResourceScreen, ScreenError};
