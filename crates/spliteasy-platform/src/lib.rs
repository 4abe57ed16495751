pub mod config;
pub mod contracts;
pub mod http;
pub mod session;

pub use config::ClientConfig;
pub use contracts::{HouseholdKeys, MemberEntry};
pub use http::ApiClient;
pub use session::{LocalStore, Session};
