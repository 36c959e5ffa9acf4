//! case-core: authenticated API client and shared infrastructure for the GST case desk.
pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod session;

pub use error::{ClientError, ErrorKind, RefreshFailure, SessionError};
pub use http::{ApiClient, AuthEvent, Method, Payload, RequestDescriptor};
pub use session::{build_store, FileSessionStore, MemorySessionStore, Session, SessionStore};

pub use async_trait;
pub use reqwest;
pub use secrecy;
