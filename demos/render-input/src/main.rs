//! Renders the submitted input as a template.
//!
//! Templates see the usual globals and nothing else: submitting `Hello {{ name }}` shows
//! `Hello `, while `{{ config.SECRET_KEY }}` shows the secret key.
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
        let data = render_template_string(&input, &context)?;
        context.set("data", data)?;

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
        .port(5001)
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
            let _ = config().map(|config| config.secret_key("render-input-test").install());
        });
    }

    async fn submit(input: &str) -> Result<Response, Error> {
        let body = format!("input={}", stlab::http::urlencode(input));
        let raw = format!(
            "POST / HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let request = Request::read("127.0.0.1:5001".parse().unwrap(), raw.as_bytes()).await?;
        Index.handle_internal(request).await
    }

    async fn post(input: &str) -> Result<String, Error> {
        let response = submit(input).await?;
        assert_eq!(response.status().code(), 200);

        Ok(response.get_body().to_string_lossy())
    }

    #[tokio::test]
    async fn test_globals() -> Result<(), Error> {
        setup();

        assert!(post("Hello {{ name }}").await?.contains("<div id=\"data\">Hello </div>"));
        assert!(post("{{7*7}}").await?.contains("<div id=\"data\">49</div>"));
        assert!(post("{{ config.SECRET_KEY }}")
            .await?
            .contains("<div id=\"data\">render-input-test</div>"));

        Ok(())
    }

    #[tokio::test]
    async fn test_rendered_output_is_escaped() -> Result<(), Error> {
        setup();

        // The injected template runs, but its output is text in the page.
        let body = post("{{ '<b>' | safe }}").await?;
        assert!(body.contains("<div id=\"data\">&lt;b&gt;</div>"));

        Ok(())
    }

    #[tokio::test]
    async fn test_template_error() -> Result<(), Error> {
        setup();

        assert_eq!(submit("{{ 7 * }}").await?.status().code(), 500);
        assert_eq!(submit("{{ name.upper() }}").await?.status().code(), 500);

        // Too deep to parse, but the server survives it.
        let nested = format!("{{{{ {}1{} }}}}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(submit(&nested).await?.status().code(), 500);

        let nested = format!("{}{}", "{% if 1 %}".repeat(1_000), "{% endif %}".repeat(1_000));
        assert_eq!(submit(&nested).await?.status().code(), 500);

        Ok(())
    }
}
