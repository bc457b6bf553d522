pub mod auth;
pub mod gate;
pub mod responses;
pub mod router;
pub mod state;
pub mod storage;
pub mod templates;
pub mod uploads;

pub use gate::AccessPolicy;
pub use responses::{ApiMessage, json_error};
pub use state::AppState;
pub use templates::escape_html;
