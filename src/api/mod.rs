pub mod auth;
pub mod health;
pub mod hygiene;
pub mod payments;
pub mod response;
pub mod routes;
pub mod time;
pub mod users;

pub use routes::{create_router, AppState};
