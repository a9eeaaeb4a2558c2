// ABOUTME: Session cookie parsing and construction helpers
// ABOUTME: The auth_token cookie is HttpOnly, Secure, SameSite=None, scoped to /
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

/// Cookie helpers for session token transport
pub mod cookies {
    use crate::auth::REMEMBER_SESSION_SECS;
    use axum::http::HeaderMap;

    /// Name of the session cookie
    pub const AUTH_COOKIE: &str = "auth_token";

    /// Extract a cookie value from the request headers
    #[must_use]
    pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
        let cookie_header = headers.get("cookie")?.to_str().ok()?;
        cookie_header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_owned())
        })
    }

    /// Build the Set-Cookie value carrying a session token.
    ///
    /// Remembered sessions get a Max-Age matching the token expiry; others
    /// are session cookies that vanish with the browser session.
    #[must_use]
    pub fn session_cookie(token: &str, remember: bool) -> String {
        if remember {
            format!(
                "{AUTH_COOKIE}={token}; HttpOnly; Secure; SameSite=None; Path=/; Max-Age={REMEMBER_SESSION_SECS}"
            )
        } else {
            format!("{AUTH_COOKIE}={token}; HttpOnly; Secure; SameSite=None; Path=/")
        }
    }

    /// Build the Set-Cookie value that clears the session cookie
    #[must_use]
    pub fn clear_session_cookie() -> String {
        format!("{AUTH_COOKIE}=; HttpOnly; Secure; SameSite=None; Path=/; Max-Age=0")
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use axum::http::HeaderValue;

        #[test]
        fn extracts_cookie_from_header() {
            let mut headers = HeaderMap::new();
            headers.insert(
                "cookie",
                HeaderValue::from_static("theme=dark; auth_token=abc.def.ghi; lang=en"),
            );
            assert_eq!(
                get_cookie_value(&headers, AUTH_COOKIE).as_deref(),
                Some("abc.def.ghi")
            );
            assert_eq!(get_cookie_value(&headers, "missing"), None);
        }

        #[test]
        fn remembered_cookie_carries_max_age() {
            let cookie = session_cookie("tok", true);
            assert!(cookie.contains("Max-Age=2592000"));
            assert!(cookie.contains("HttpOnly"));
            assert!(cookie.contains("SameSite=None"));

            let session = session_cookie("tok", false);
            assert!(!session.contains("Max-Age"));
        }

        #[test]
        fn clear_cookie_expires_immediately() {
            assert!(clear_session_cookie().contains("Max-Age=0"));
        }
    }
}
