pub mod app;
pub mod auth;
pub mod clubs;
pub mod config;
pub mod db;
pub mod error;
pub mod memory;
pub mod response;
pub mod state;
pub mod storage;

pub use app::build_app;
pub use state::AppState;
