use jsonwebtoken::{decode, DecodingKey, Validation};
use time::OffsetDateTime;

use crate::auth::jwt::Claims;

/// Client-side session derived from a stored token without a server
/// round-trip. The signature is deliberately not checked here: this
/// object only gates UI, and every request is re-authorized server-side
/// by the extractors. An expired or undecodable token reads as no
/// session at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl Session {
    pub fn from_token(token: &str) -> Option<Session> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;

        let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
        let claims = data.claims;

        if (claims.exp as i64) <= OffsetDateTime::now_utc().unix_timestamp() {
            return None;
        }

        Some(Session {
            id: claims.sub,
            username: claims.username,
            email: claims.email,
            roles: vec![claims.role],
        })
    }

    /// Any-of role membership, for conditional rendering and routing.
    pub fn has_role(&self, required: &[&str]) -> bool {
        required
            .iter()
            .any(|needed| self.roles.iter().any(|have| have == needed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRef;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    use crate::auth::jwt::JwtKeys;
    use crate::state::AppState;
    use crate::users::repo_types::{Role, User};

    fn make_token(role: Role) -> String {
        let keys = JwtKeys::from_ref(&AppState::fake());
        let user = User {
            id: 42,
            username: "alice".into(),
            email: "alice@x.com".into(),
            password_hash: "unused".into(),
            role,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        keys.sign(&user).expect("sign")
    }

    #[test]
    fn session_materializes_from_a_live_token() {
        let session = Session::from_token(&make_token(Role::User)).expect("session");
        assert_eq!(session.id, 42);
        assert_eq!(session.username, "alice");
        assert_eq!(session.email, "alice@x.com");
        assert_eq!(session.roles, vec!["User".to_string()]);
    }

    #[test]
    fn role_predicate_gates_ui() {
        let session = Session::from_token(&make_token(Role::User)).unwrap();
        assert!(session.has_role(&["User"]));
        assert!(session.has_role(&["User", "Admin"]));
        assert!(!session.has_role(&["Admin"]));

        let admin = Session::from_token(&make_token(Role::Admin)).unwrap();
        assert!(admin.has_role(&["Admin"]));
    }

    #[test]
    fn expired_token_reads_as_absent() {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: 42,
            username: "alice".into(),
            role: "User".into(),
            email: "alice@x.com".into(),
            jti: Uuid::new_v4(),
            iat: (now - 61 * 60) as usize,
            exp: (now - 31 * 60) as usize,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"whatever"),
        )
        .unwrap();
        assert_eq!(Session::from_token(&token), None);
    }

    #[test]
    fn garbage_token_reads_as_absent() {
        assert_eq!(Session::from_token("not-a-jwt"), None);
        assert_eq!(Session::from_token(""), None);
    }

    #[test]
    fn decoding_ignores_the_signature() {
        // Advisory only: a token signed with an unknown secret still
        // yields a session. Enforcement lives server-side.
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: 1,
            username: "mallory".into(),
            role: "Admin".into(),
            email: "mallory@x.com".into(),
            jti: Uuid::new_v4(),
            iat: now as usize,
            exp: (now + 30 * 60) as usize,
            iss: "elsewhere".into(),
            aud: "elsewhere".into(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"attacker-chosen"),
        )
        .unwrap();
        assert!(Session::from_token(&token).is_some());
    }
}
