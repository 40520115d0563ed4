//! Shows what's inside the session cookie.
//!
//! Every visit stores `user = "admin"` in the session. The first visit has no cookie to show
//! and fails with a 400, but the session cookie still comes back with it. From the second
//! visit on, the page decodes the cookie the browser sent back: it's base64, not encryption,
//! so the session data is readable without the secret key.
use stlab::config::get_config;
use stlab::crypto::{base64_decode_lenient, bytes_repr, decode_unverified};
use stlab::http::Server;
use stlab::prelude::*;

use std::collections::HashMap;

#[derive(Default)]
struct Index;

#[async_trait]
impl PageController for Index {
    async fn get(&self, request: &Request) -> Result<Response, Error> {
        request.session().insert("user", "admin");

        // Missing on the very first visit, which makes this a bad request.
        let session_cookie = request
            .cookies()
            .get_required(&get_config().general.session_cookie_name)?
            .value()
            .to_string();

        let mut decoded = vec![];
        for segment in session_cookie.split('.') {
            decoded.extend(base64_decode_lenient(segment)?);
        }

        let mut context = Context::globals(request)?;
        context
            .set("session_cookie", &session_cookie)?
            .set("decoded_session_cookie", bytes_repr(&decoded))?;

        // Cookies not minted by a Flask-style serializer can't be broken down.
        let details = match decode_unverified(&session_cookie) {
            Ok(cookie) => Some(HashMap::from([
                ("payload".to_string(), cookie.payload.to_string()),
                ("compressed".to_string(), cookie.compressed.to_string()),
                ("timestamp".to_string(), cookie.timestamp.to_string()),
                ("signature".to_string(), cookie.signature_hex()),
            ])),
            Err(_) => None,
        };
        context.set("cookie", details)?;

        Ok(Response::new().html(render_template("index.html", &context)?))
    }
}

#[async_trait]
impl Controller for Index {
    async fn handle(&self, request: &Request) -> Result<Response, Error> {
        PageController::handle(self, request).await
    }
}

fn config() -> Result<Config, stlab::config::Error> {
    Ok(Config::load()?
        .secret_key("UNSAFE_SECRET")
        .port(5002)
        .debug(true)
        .templates(concat!(env!("CARGO_MANIFEST_DIR"), "/templates")))
}

#[tokio::main]
async fn main() -> Result<(), stlab::error::Error> {
    config()?.install()?;
    Logger::init();

    Server::new(vec![route!("/" => Index)]).launch().await?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn setup() {
        INIT.call_once(|| {
            let _ = config().map(|config| config.install());
        });
    }

    async fn get(cookie: Option<&str>) -> Result<Response, Error> {
        let cookie = cookie
            .map(|cookie| format!("Cookie: session={}\r\n", cookie))
            .unwrap_or_default();
        let raw = format!("GET / HTTP/1.1\r\n{}\r\n", cookie);
        let request = Request::read("127.0.0.1:5002".parse().unwrap(), raw.as_bytes()).await?;

        Index.handle_internal(request).await
    }

    #[tokio::test]
    async fn test_first_visit() -> Result<(), Error> {
        setup();
        let response = get(None).await?;

        assert_eq!(response.status().code(), 400);

        // The session is saved even though the page failed.
        let cookie = response
            .get_cookies()
            .get("session")
            .expect("session cookie on the first visit");
        let session = SessionSerializer::new("UNSAFE_SECRET").loads(cookie.value(), None)?;
        assert_eq!(session["user"], "admin");

        Ok(())
    }

    #[tokio::test]
    async fn test_second_visit() -> Result<(), Error> {
        setup();
        let first = get(None).await?;
        let cookie = first
            .get_cookies()
            .get("session")
            .expect("session cookie")
            .value()
            .to_string();

        let second = get(Some(&cookie)).await?;
        let body = second.get_body().to_string_lossy();

        assert_eq!(second.status().code(), 200);
        assert!(body.contains(&format!("<pre id=\"session-cookie\">{}</pre>", cookie)));
        assert!(body.contains("<dd id=\"payload\">{&#34;user&#34;:&#34;admin&#34;}</dd>"));

        Ok(())
    }

    #[tokio::test]
    async fn test_cookie_is_readable() -> Result<(), Error> {
        setup();
        let cookie = SessionSerializer::new("UNSAFE_SECRET")
            .dumps(&serde_json::json!({"user": "admin"}))?;

        let response = get(Some(&cookie)).await?;
        let body = response.get_body().to_string_lossy();

        assert_eq!(response.status().code(), 200);
        assert!(body.contains(&cookie));
        assert!(body.contains("b&#39;{&#34;user&#34;:&#34;admin&#34;}"));
        assert!(body.contains("<dd id=\"payload\">{&#34;user&#34;:&#34;admin&#34;}</dd>"));

        // The session is saved again.
        assert!(!response.get_cookies().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_forged_cookie_is_readable() -> Result<(), Error> {
        setup();
        let cookie = SessionSerializer::new("leaked").dumps(&serde_json::json!({"user": "root"}))?;

        let body = get(Some(&cookie)).await?.get_body().to_string_lossy();
        assert!(body.contains("&#34;user&#34;:&#34;root&#34;"));

        Ok(())
    }
}
