//! Reflects the submitted input twice: as text, and rendered as a template.
//!
//! Submitting `{{7*7}}` shows `{{7*7}}` next to `49`.
use std::collections::HashMap;

use stlab::http::Server;
use stlab::prelude::*;

#[derive(Default)]
struct Index;

#[async_trait]
impl PageController for Index {
    async fn get(&self, request: &Request) -> Result<Response, Error> {
        let context = Context::globals(request)?;
        Ok(Response::new().html(render_template("index.html", &context)?))
    }

    async fn post(&self, request: &Request) -> Result<Response, Error> {
        let input = request.form_data().get_required::<String>("input")?;

        let mut context = Context::globals(request)?;
        let rendered = render_template_string(&input, &context)?;

        context.set(
            "data",
            HashMap::from([("p1".to_string(), input), ("p2".to_string(), rendered)]),
        )?;

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
        .port(5000)
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
            let _ = config().map(|config| config.secret_key("reflect-test").install());
        });
    }

    async fn post(input: &str) -> Result<Response, Error> {
        let body = format!("input={}", stlab::http::urlencode(input));
        let raw = format!(
            "POST / HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let request = Request::read("127.0.0.1:5000".parse().unwrap(), raw.as_bytes()).await?;
        Index.handle_internal(request).await
    }

    #[tokio::test]
    async fn test_form() -> Result<(), Error> {
        setup();
        let request = Request::read(
            "127.0.0.1:5000".parse().unwrap(),
            "GET / HTTP/1.1\r\n\r\n".as_bytes(),
        )
        .await?;
        let response = Index.handle_internal(request).await?;
        let body = response.get_body().to_string_lossy();

        assert_eq!(response.status().code(), 200);
        assert!(body.contains("<form"));
        assert!(!body.contains("Rendered"));

        Ok(())
    }

    #[tokio::test]
    async fn test_input_is_evaluated() -> Result<(), Error> {
        setup();
        let body = post("{{7*7}}").await?.get_body().to_string_lossy();

        assert!(body.contains("<pre id=\"p1\">{{7*7}}</pre>"));
        assert!(body.contains("<pre id=\"p2\">49</pre>"));

        Ok(())
    }

    #[tokio::test]
    async fn test_secret_key_leaks() -> Result<(), Error> {
        setup();
        let body = post("{{ config.SECRET_KEY }}").await?.get_body().to_string_lossy();
        assert!(body.contains("<pre id=\"p2\">reflect-test</pre>"));

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_input() -> Result<(), Error> {
        setup();
        let body = "other=1";
        let raw = format!(
            "POST / HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let request = Request::read("127.0.0.1:5000".parse().unwrap(), raw.as_bytes()).await?;
        let response = Index.handle_internal(request).await?;
        assert_eq!(response.status().code(), 400);

        Ok(())
    }
}
