//! Client identification for rate limiting

use http::HeaderMap;

use super::request::header_str;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const API_KEY_HEADER: &str = "x-api-key";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Who a request is counted against.
///
/// Resolution never fails: with no usable signal the request is
/// [`ClientIdentity::Anonymous`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientIdentity {
    User(String),
    ApiKey(String),
    Ip(String),
    Anonymous,
}

impl ClientIdentity {
    /// First present signal wins: user id, API key, forwarded-for, real IP.
    pub fn resolve(headers: &HeaderMap) -> Self {
        if let Some(user_id) = header_str(headers, USER_ID_HEADER) {
            return ClientIdentity::User(user_id.to_string());
        }

        if let Some(api_key) = header_str(headers, API_KEY_HEADER) {
            return ClientIdentity::ApiKey(api_key.to_string());
        }

        let forwarded = header_str(headers, FORWARDED_FOR_HEADER).and_then(|value| {
            value
                .split(',')
                .map(str::trim)
                .find(|token| !token.is_empty())
        });

        match forwarded.or_else(|| header_str(headers, REAL_IP_HEADER)) {
            Some(ip) => ClientIdentity::Ip(ip.to_string()),
            None => ClientIdentity::Anonymous,
        }
    }

    /// Kind of signal the identity came from
    pub fn kind(&self) -> &'static str {
        match self {
            ClientIdentity::User(_) => "user",
            ClientIdentity::ApiKey(_) => "api",
            ClientIdentity::Ip(_) => "ip",
            ClientIdentity::Anonymous => "anonymous",
        }
    }
}

impl std::fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientIdentity::User(id) => write!(f, "user:{}", id),
            ClientIdentity::ApiKey(key) => write!(f, "api:{}", key),
            ClientIdentity::Ip(ip) => write!(f, "ip:{}", ip),
            ClientIdentity::Anonymous => f.write_str("anonymous"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_user_beats_api_key() {
        let identity = ClientIdentity::resolve(&headers(&[
            (API_KEY_HEADER, "k-1"),
            (USER_ID_HEADER, "u-1"),
        ]));
        assert_eq!(identity.to_string(), "user:u-1");
    }

    #[test]
    fn test_api_key_beats_ip() {
        let identity = ClientIdentity::resolve(&headers(&[
            (API_KEY_HEADER, "k-1"),
            (FORWARDED_FOR_HEADER, "1.2.3.4"),
        ]));
        assert_eq!(identity, ClientIdentity::ApiKey("k-1".to_string()));
    }

    #[test]
    fn test_first_forwarded_token() {
        let identity = ClientIdentity::resolve(&headers(&[
            (FORWARDED_FOR_HEADER, " , 203.0.113.7, 10.0.0.1"),
            (REAL_IP_HEADER, "10.9.9.9"),
        ]));
        assert_eq!(identity.to_string(), "ip:203.0.113.7");
    }

    #[test]
    fn test_real_ip_fallback() {
        let identity = ClientIdentity::resolve(&headers(&[(REAL_IP_HEADER, "10.9.9.9")]));
        assert_eq!(identity, ClientIdentity::Ip("10.9.9.9".to_string()));
    }

    #[test]
    fn test_empty_forwarded_falls_back_to_real_ip() {
        let identity = ClientIdentity::resolve(&headers(&[
            (FORWARDED_FOR_HEADER, " , "),
            (REAL_IP_HEADER, "10.9.9.9"),
        ]));
        assert_eq!(identity.kind(), "ip");
    }

    #[test]
    fn test_no_signal_is_anonymous() {
        let identity = ClientIdentity::resolve(&HeaderMap::new());
        assert_eq!(identity.to_string(), "anonymous");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let map = headers(&[(FORWARDED_FOR_HEADER, "1.1.1.1, 2.2.2.2")]);
        assert_eq!(ClientIdentity::resolve(&map), ClientIdentity::resolve(&map));
    }
}
