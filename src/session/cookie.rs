//! Session and correlation cookies.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::SessionConfig;

/// Lifetime of the correlation cookie set when a sign-in starts.
pub const CORRELATION_MAX_AGE_MINUTES: i64 = 15;

/// Builds and reads the cookies the service issues.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    name: String,
    correlation_name: String,
    secure: bool,
}

impl SessionCookies {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            correlation_name: format!("{}.correlation", config.cookie_name),
            secure: config.secure_cookies,
        }
    }

    pub fn session_id(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.name).map(|c| c.value().to_string())
    }

    /// Add the session cookie. It lives as long as the browser session.
    pub fn issue(&self, jar: CookieJar, session_id: String) -> CookieJar {
        let cookie = Cookie::build((self.name.clone(), session_id))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/");
        jar.add(cookie)
    }

    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(self.name.clone()).path("/"))
    }

    /// Add the correlation cookie.
    ///
    /// The provider posts the callback cross-site, so this cookie needs
    /// `SameSite=None`, which browsers only accept together with `Secure`.
    pub fn set_correlation(&self, jar: CookieJar, correlation: String) -> CookieJar {
        let cookie = Cookie::build((self.correlation_name.clone(), correlation))
            .http_only(true)
            .secure(true)
            .same_site(SameSite::None)
            .path("/")
            .max_age(time::Duration::minutes(CORRELATION_MAX_AGE_MINUTES));
        jar.add(cookie)
    }

    pub fn correlation(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.correlation_name)
            .map(|c| c.value().to_string())
    }

    pub fn clear_correlation(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(self.correlation_name.clone()).path("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn cookies() -> SessionCookies {
        SessionCookies::new(&Config::embedded().unwrap().session)
    }

    #[test]
    fn test_session_cookie_properties() {
        let cookies = cookies();
        let jar = cookies.issue(CookieJar::new(), "sid-1".into());

        let cookie = jar.get("azuread_gate_session").unwrap();
        assert_eq!(cookie.value(), "sid-1");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookies.session_id(&jar).as_deref(), Some("sid-1"));
    }

    #[test]
    fn test_correlation_cookie_is_short_lived() {
        let cookies = cookies();
        let jar = cookies.set_correlation(CookieJar::new(), "secret".into());

        let cookie = jar.get("azuread_gate_session.correlation").unwrap();
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::minutes(CORRELATION_MAX_AGE_MINUTES))
        );
        assert_eq!(cookies.correlation(&jar).as_deref(), Some("secret"));

        let jar = cookies.clear_correlation(jar);
        assert!(cookies.correlation(&jar).is_none());
    }

    #[test]
    fn test_clear_session() {
        let cookies = cookies();
        let jar = cookies.issue(CookieJar::new(), "sid-1".into());
        let jar = cookies.clear(jar);
        assert!(cookies.session_id(&jar).is_none());
    }
}
