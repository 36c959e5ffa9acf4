pub mod client;
pub mod refresher;
pub mod request;
pub mod single_flight;

pub use client::{ApiClient, AuthEvent};
pub use refresher::{HttpTokenRefresher, RefreshedTokens, TokenRefresher};
pub use request::{into_payload, parse_base_url, Method, Payload, RequestDescriptor};
pub use single_flight::{FlightPhase, SingleFlight};
