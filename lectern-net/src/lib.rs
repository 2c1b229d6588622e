// lectern-net/src/lib.rs
pub mod api;
pub mod auth;
pub mod filter;
pub mod http;
pub mod scanner;

pub use auth::ApiCredentials;
pub use filter::{asset_pattern, select_asset};
pub use scanner::{GithubScanner, RemoteScanner};
