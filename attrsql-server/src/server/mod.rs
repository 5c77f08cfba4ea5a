pub mod app;
pub mod error;
pub mod handlers;
pub mod session;

pub use app::{create_app, start_server, AppState};
pub use session::SessionManager;
