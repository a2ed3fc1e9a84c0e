//! Authenticated API access and client-side state sync for the wallet app.
//!
//! Composition: build a [`SessionStore`], wrap it in an
//! [`UnauthorizedCoordinator`], hand that to the [`HttpClient`], and create
//! hooks over a [`WalletApi`]. The coordinator is the only place that reacts
//! to an expired session.

pub mod api;
pub mod cancel;
pub mod config;
pub mod db;
pub mod error;
pub mod hooks;
pub mod http;
pub mod logging;
pub mod models;
pub mod session;
pub mod unauthorized;
pub mod validation;

pub use api::{Connectivity, WalletApi};
pub use cancel::CancelToken;
pub use config::Config;
pub use error::ApiError;
pub use http::{ApiResponse, HttpClient, RequestOptions};
pub use session::{Session, SessionStore};
pub use unauthorized::{UnauthorizedCoordinator, UnauthorizedHandler};
