use rocket::http::HeaderMap;
use rocket::request::{FromRequest, Outcome, Request};
use sha2::{Digest, Sha256};

use crate::config::Settings;

/// Client address used for rate limiting. Reverse-proxy headers are only
/// honoured when `trust_proxy_headers` is set; otherwise the socket peer is used.
pub struct ClientIp(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let trust = request
            .rocket()
            .state::<Settings>()
            .map(|s| s.get_bool("trust_proxy_headers"))
            .unwrap_or(false);

        if trust {
            if let Some(ip) = forwarded_ip(request.headers()) {
                return Outcome::Success(ClientIp(ip));
            }
        }

        let ip = request
            .remote()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Outcome::Success(ClientIp(ip))
    }
}

/// Address reported by a fronting proxy, if any.
fn forwarded_ip(headers: &HeaderMap<'_>) -> Option<String> {
    for name in ["CF-Connecting-IP", "True-Client-IP", "X-Real-IP"] {
        if let Some(ip) = headers.get_one(name).map(str::trim).filter(|ip| !ip.is_empty()) {
            return Some(ip.to_string());
        }
    }

    // X-Forwarded-For: client, proxy1, proxy2; take the leftmost
    headers
        .get_one("X-Forwarded-For")
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

/// Addresses are only ever stored or keyed hashed.
pub fn hash_ip(ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}
