// Caller identity from trusted upstream headers

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use std::convert::Infallible;

const USER_ID_HEADER: &str = "x-user-id";
const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Case-insensitive; anything unrecognised is a plain user
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

impl AuthUser {
    /// Both headers must be present and the id a positive integer
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let id = headers.get(USER_ID_HEADER)?.to_str().ok()?;
        let role = headers.get(USER_ROLE_HEADER)?.to_str().ok()?;

        let id: i64 = id.trim().parse().ok()?;
        if id <= 0 {
            return None;
        }

        Some(Self {
            id,
            role: Role::parse(role),
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins may act on anything, users only on what they own
    pub fn can_manage(&self, owner_id: Option<i64>) -> bool {
        self.is_admin() || owner_id == Some(self.id)
    }
}

/// Extractor yielding the caller, or `None` for anonymous requests
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(AuthUser::from_headers(&parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(id: &'static str, role: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static(id));
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static(role));
        headers
    }

    #[test]
    fn test_parse_admin() {
        let user = AuthUser::from_headers(&headers("7", "admin")).unwrap();
        assert_eq!(user, AuthUser { id: 7, role: Role::Admin });
    }

    #[test]
    fn test_unknown_role_is_user() {
        let user = AuthUser::from_headers(&headers("3", "superuser")).unwrap();
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn test_invalid_ids_are_anonymous() {
        assert!(AuthUser::from_headers(&headers("0", "USER")).is_none());
        assert!(AuthUser::from_headers(&headers("-4", "USER")).is_none());
        assert!(AuthUser::from_headers(&headers("abc", "USER")).is_none());
        assert!(AuthUser::from_headers(&HeaderMap::new()).is_none());

        let mut missing_role = HeaderMap::new();
        missing_role.insert(USER_ID_HEADER, HeaderValue::from_static("5"));
        assert!(AuthUser::from_headers(&missing_role).is_none());
    }

    #[test]
    fn test_can_manage() {
        let admin = AuthUser { id: 1, role: Role::Admin };
        let user = AuthUser { id: 2, role: Role::User };

        assert!(admin.can_manage(None));
        assert!(admin.can_manage(Some(9)));
        assert!(user.can_manage(Some(2)));
        assert!(!user.can_manage(Some(9)));
        assert!(!user.can_manage(None));
    }
}
