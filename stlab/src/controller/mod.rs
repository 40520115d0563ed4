//! Controllers handle HTTP requests.
//!
//! A controller is a struct implementing [`Controller`]. [`PageController`] splits
//! requests by method, which is what a page with a form needs.
use async_trait::async_trait;

pub mod error;
pub mod session;

pub use error::Error;
pub use session::Session;

use crate::http::{Handler, Request, Response};

use tracing::error;

/// The HTTP controller.
///
/// The most basic version of a controller handles all requests
/// which match the path it's assigned to.
#[async_trait]
pub trait Controller: Sync + Send {
    /// Mount this controller at a path.
    fn route(self, path: &str) -> Handler
    where
        Self: Sized + 'static,
    {
        Handler::route(path, self)
    }

    /// Mount this controller at a path and everything below it.
    fn wildcard(self, path: &str) -> Handler
    where
        Self: Sized + 'static,
    {
        Handler::wildcard(path, self)
    }

    /// Handle the request, turn errors into error pages and save the session.
    /// The session is saved on error pages too, so changes made before the error stick.
    /// Called by the server; there should be no need to implement this.
    async fn handle_internal(&self, request: Request) -> Result<Response, Error> {
        match self.handle(&request).await {
            Ok(response) => Ok(response.from_request(&request)?),
            Err(err) => {
                error!("{}", err);

                let response = match err {
                    Error::Template(err) => {
                        Response::internal_error_pretty("Template error", &err.to_string())
                    }

                    err => match err.code() {
                        400 => Response::bad_request(Some(&err.to_string())),
                        413 => Response::content_too_large(),
                        _ => Response::internal_error(err),
                    },
                };

                Ok(response.from_request(&request)?)
            }
        }
    }

    /// Handle the request. Implement this function to define how your controller
    /// will respond to requests.
    async fn handle(&self, request: &Request) -> Result<Response, Error>;

    /// The name of this controller. Used for logging.
    fn controller_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Controller for a page: `GET` shows it, `POST` submits a form to it.
/// Other methods get `405 - Method Not Allowed`.
///
/// # Example
///
/// ```
/// use stlab::prelude::*;
///
/// #[derive(Default)]
/// struct Index;
///
/// #[stlab::async_trait]
/// impl PageController for Index {
///     async fn get(&self, _request: &Request) -> Result<Response, Error> {
///         Ok(Response::new().html("<form method=\"post\"></form>"))
///     }
/// }
///
/// #[stlab::async_trait]
/// impl Controller for Index {
///     async fn handle(&self, request: &Request) -> Result<Response, Error> {
///         PageController::handle(self, request).await
///     }
/// }
/// ```
#[async_trait]
#[allow(unused_variables)]
pub trait PageController: Controller {
    async fn get(&self, request: &Request) -> Result<Response, Error>;

    async fn post(&self, request: &Request) -> Result<Response, Error> {
        Ok(Response::method_not_allowed())
    }

    async fn handle(&self, request: &Request) -> Result<Response, Error> {
        if request.get() {
            PageController::get(self, request).await
        } else if request.post() {
            PageController::post(self, request).await
        } else {
            Ok(Response::method_not_allowed())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::http::request::test::{post_form, request};

    #[derive(Default)]
    struct Echo;

    #[async_trait]
    impl PageController for Echo {
        async fn get(&self, _request: &Request) -> Result<Response, Error> {
            Ok(Response::new().text("form"))
        }

        async fn post(&self, request: &Request) -> Result<Response, Error> {
            let input = request.form_data().get_required::<String>("input")?;
            let mut session = request.session().clone();
            session.insert("last", input.clone());

            Ok(Response::new().text(input).set_session(session))
        }
    }

    #[async_trait]
    impl Controller for Echo {
        async fn handle(&self, request: &Request) -> Result<Response, Error> {
            PageController::handle(self, request).await
        }
    }

    #[tokio::test]
    async fn test_page_controller() -> Result<(), Error> {
        let response = Echo.handle_internal(request("GET / HTTP/1.1\r\n\r\n").await?).await?;
        assert_eq!(response.get_body().to_string_lossy(), "form");

        let response = Echo
            .handle_internal(request("DELETE / HTTP/1.1\r\n\r\n").await?)
            .await?;
        assert_eq!(response.status().code(), 405);

        let response = Echo.handle_internal(post_form("input=hi", None).await?).await?;
        assert_eq!(response.get_body().to_string_lossy(), "hi");
        assert!(!response.get_cookies().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_parameter_is_bad_request() -> Result<(), Error> {
        let response = Echo.handle_internal(post_form("other=1", None).await?).await?;
        assert_eq!(response.status().code(), 400);
        assert!(response.get_cookies().is_empty());

        Ok(())
    }

    struct Remember;

    #[async_trait]
    impl Controller for Remember {
        async fn handle(&self, request: &Request) -> Result<Response, Error> {
            request.session().insert("seen", true);
            request.cookies().get_required("missing")?;

            Ok(Response::new())
        }
    }

    #[tokio::test]
    async fn test_session_saved_on_error_page() -> Result<(), Error> {
        let response = Remember
            .handle_internal(request("GET / HTTP/1.1\r\n\r\n").await?)
            .await?;
        assert_eq!(response.status().code(), 400);

        let cookie = response.get_cookies().get("session").expect("session cookie");
        let session = crate::crypto::SessionSerializer::from_config().loads(cookie.value(), None)?;
        assert_eq!(session["seen"], true);

        Ok(())
    }

    #[test]
    fn test_controller_name() {
        assert!(Echo.controller_name().ends_with("Echo"));
    }
}
