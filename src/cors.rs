use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Request, Response};

/// CORS headers for the browser-facing proxy endpoints. The chat proxy only
/// echoes origins from the allow-list (anything else gets `null`); the
/// newsletter endpoint accepts any origin.
pub struct Cors {
    allowed_origins: Vec<String>,
}

impl Cors {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Cors { allowed_origins }
    }

    /// Value for `Access-Control-Allow-Origin` on the chat proxy.
    pub fn allow_origin(&self, origin: Option<&str>) -> String {
        match origin {
            Some(o) if self.allowed_origins.iter().any(|a| a == o) => o.to_string(),
            _ => "null".to_string(),
        }
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info { name: "Proxy CORS", kind: Kind::Response }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let path = req.uri().path();
        let allow = if path == "/api/callopenai" {
            self.allow_origin(req.headers().get_one("Origin"))
        } else if path == "/api/subscribe" {
            "*".to_string()
        } else {
            return;
        };
        res.set_header(Header::new("Access-Control-Allow-Origin", allow));
        res.set_header(Header::new("Access-Control-Allow-Methods", "GET, POST, OPTIONS"));
        res.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type"));
    }
}
