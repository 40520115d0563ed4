//! The same form, done right: the input is passed to the template as data,
//! so it's printed (and escaped), never compiled.
//!
//! Showing the page needs a user in the session. Without one, say on a first visit or
//! with a cookie signed by the wrong key, it's a 400 until the form is posted.
use stlab::http::Server;
use stlab::prelude::*;

#[derive(Default)]
struct Index;

#[async_trait]
impl PageController for Index {
    async fn get(&self, request: &Request) -> Result<Response, Error> {
        let user = request.session().get_required("user")?.clone();

        let mut context = Context::globals(request)?;
        context.set("user", user)?.set("data", Value::Null)?;

        Ok(Response::new().html(render_template("index.html", &context)?))
    }

    async fn post(&self, request: &Request) -> Result<Response, Error> {
        let input = request.form_data().get_required::<String>("input")?;

        // Everyone is a visitor.
        request.session().insert("user", "visitor");

        let mut context = Context::globals(request)?;
        context.set("data", input)?.set("user", "visitor")?;

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
        .secret_key("supersafesecretkey")
        .port(5003)
        .templates(concat!(env!("CARGO_MANIFEST_DIR"), "/templates")))
}

#[tokio::main]
async fn main() -> Result<(), stlab::error::Error> {
    config()?.install()?;
    Logger::init();

    Server::new(vec![route!("/" => Index)]).launch().await?;

    Ok(())
}
