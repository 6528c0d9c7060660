use chrono::{DateTime, TimeDelta, Utc};
use url::form_urlencoded;

pub const SESSION_COOKIE: &str = "sessionToken";
pub const SESSION_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// `Set-Cookie` value persisting the session token for one day. The token is
/// percent-encoded so separators in it cannot break the header.
pub fn session_cookie(token: &str, issued_at: DateTime<Utc>) -> String {
    let expires = issued_at + TimeDelta::seconds(SESSION_LIFETIME_SECS);
    let value: String = form_urlencoded::byte_serialize(token.as_bytes()).collect();
    format!(
        "{SESSION_COOKIE}={value}; Path=/; Expires={}; Max-Age={SESSION_LIFETIME_SECS}",
        expires.format("%a, %d %b %Y %H:%M:%S GMT")
    )
}

/// Decodes the cookie value back into the token. An empty cookie counts as
/// no session at all.
pub fn present(cookie: Option<String>) -> Option<String> {
    cookie.map(|value| decode(&value)).filter(|token| !token.is_empty())
}

// An encoded token has no raw `&` or `=`, so it parses as a single key.
fn decode(value: &str) -> String {
    form_urlencoded::parse(value.as_bytes())
        .next()
        .map(|(token, _)| token.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cookie_expires_a_day_later() {
        let issued = Utc.with_ymd_and_hms(2024, 3, 5, 8, 9, 3).unwrap();
        assert_eq!(
            session_cookie("abc123", issued),
            "sessionToken=abc123; Path=/; Expires=Wed, 06 Mar 2024 08:09:03 GMT; Max-Age=86400"
        );
    }

    #[test]
    fn cookie_value_is_percent_encoded() {
        let issued = Utc.with_ymd_and_hms(2024, 3, 5, 8, 9, 3).unwrap();
        let cookie = session_cookie("a;b, c=d", issued);
        assert!(cookie.starts_with("sessionToken=a%3Bb%2C+c%3Dd; Path=/;"));
        assert_eq!(cookie.matches(';').count(), 3);
    }

    #[test]
    fn encoded_cookie_reads_back_as_token() {
        assert_eq!(present(Some("a%3Bb%2C+c%3Dd".into())), Some("a;b, c=d".into()));
        assert_eq!(present(Some("abc123".into())), Some("abc123".into()));
    }

    #[test]
    fn empty_token_is_absent() {
        assert_eq!(present(Some(String::new())), None);
        assert_eq!(present(None), None);
        assert_eq!(present(Some("t".into())), Some("t".into()));
    }
}
