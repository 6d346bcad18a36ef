pub mod password;
pub mod principal;

pub use password::hash_password;
pub use principal::{AuthUser, MaybeAuthUser, Role};
