//! Unverified JWT claim reading. Only used to skip restoring a session that
//! has already expired; the server remains the authority.

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct ExpiryClaims {
    exp: Option<Value>,
}

/// `exp` claim in epoch milliseconds, if `token` looks like a JWT carrying
/// a numeric one.
#[must_use]
pub fn read_jwt_expiry_ms(token: &str) -> Option<u64> {
    let mut parts = token.split('.');
    let _header = parts.next()?;
    let payload = parts.next().filter(|segment| !segment.is_empty())?;

    let decoded = decode_jwt_segment(payload)?;
    let claims = serde_json::from_slice::<ExpiryClaims>(&decoded).ok()?;
    let exp = claims.exp?.as_f64().filter(|value| value.is_finite())?;
    if exp < 0.0 {
        return None;
    }
    Some((exp * 1000.0) as u64)
}

/// Whether `token` carries an `exp` at or before `now_ms`.
#[must_use]
pub fn is_expired_at(token: &str, now_ms: u64) -> bool {
    read_jwt_expiry_ms(token).is_some_and(|expiry| now_ms >= expiry)
}

fn decode_jwt_segment(segment: &str) -> Option<Vec<u8>> {
    general_purpose::URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| general_purpose::URL_SAFE.decode(segment))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            general_purpose::URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
            general_purpose::URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn reads_exp_as_milliseconds() {
        assert_eq!(
            read_jwt_expiry_ms(&token_with(r#"{"exp":1700000000}"#)),
            Some(1_700_000_000_000)
        );
    }

    #[test]
    fn non_jwt_and_missing_exp_read_as_none() {
        assert_eq!(read_jwt_expiry_ms("opaque-token"), None);
        assert_eq!(read_jwt_expiry_ms("a..c"), None);
        assert_eq!(read_jwt_expiry_ms(&token_with(r#"{"sub":"u"}"#)), None);
        assert_eq!(read_jwt_expiry_ms(&token_with(r#"{"exp":"soon"}"#)), None);
        assert_eq!(read_jwt_expiry_ms("x.!!!.y"), None);
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let token = token_with(r#"{"exp":10}"#);
        assert!(is_expired_at(&token, 10_000));
        assert!(!is_expired_at(&token, 9_999));
        assert!(!is_expired_at("opaque", u64::MAX));
    }
}
