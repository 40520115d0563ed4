//! HTTP/1.1 server.
//!
//! Listens for requests and maps them to a handler, if any exists for the specified path.
//! If no handler is matched, return `404 - Not Found`.

use super::{Error, Handler, Request, Response, Router};

use crate::colors::{status_code, MaybeColorize};
use crate::config::get_config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio::signal::ctrl_c;
use tracing::{debug, error, info};

/// HTTP server.
pub struct Server {
    handlers: Vec<Handler>,
}

impl Server {
    /// Create new HTTP server with a list of routes and their handlers.
    pub fn new(handlers: Vec<Handler>) -> Self {
        Server { handlers }
    }

    /// Bind to the configured host and port and serve until Ctrl-C.
    pub async fn launch(self) -> Result<(), Error> {
        let config = get_config();
        let addr = format!("{}:{}", config.general.host, config.general.port);
        let listener = TcpListener::bind(addr).await?;

        self.serve(listener).await
    }

    /// Serve requests on an already bound listener until Ctrl-C.
    pub async fn serve(self, listener: TcpListener) -> Result<(), Error> {
        let router = Arc::new(Router::new(self.handlers)?);

        info!(
            "Starting {} {} {}",
            "stlab".green(),
            "HTTP".purple(),
            "server".red()
        );

        router.log_routes();

        info!("Listening on http://{}", listener.local_addr()?);

        loop {
            select! {
                _ = ctrl_c() => {
                    info!("Shutting down...");
                    return Ok(());
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let router = router.clone();
                            tokio::spawn(async move {
                                Self::handle_connection(router, stream, peer_addr).await;
                            });
                        }

                        Err(err) => error!("accept error: {}", err),
                    }
                }
            }
        }
    }

    async fn handle_connection(router: Arc<Router>, stream: TcpStream, peer_addr: SocketAddr) {
        let mut stream = BufReader::new(BufWriter::new(stream));
        debug!("{} new connection from {:?}", "http".purple(), peer_addr);

        loop {
            let request = match Request::read(peer_addr, &mut stream).await {
                Ok(request) => request,
                Err(err) => {
                    if let Error::HeadersTooLarge(_) | Error::BodyTooLarge(_) = err {
                        let response = Response::content_too_large();
                        info!("{} {}", "???".purple(), status_code(response.status().code()));
                        let _ = Self::send_response(&mut stream, response).await;
                    }

                    debug!(
                        "{} client {:?} disconnected: {}",
                        "http".purple(),
                        peer_addr,
                        err
                    );
                    return;
                }
            };

            let start = Instant::now();
            let keep_alive = request.keep_alive();

            let (response, controller_name) = match router.find(request.path()) {
                Some((handler, params)) => {
                    let request = request.clone().with_params(params);

                    let response = match handler.handle_internal(request).await {
                        Ok(response) => response,
                        Err(err) => {
                            error!("{}", err);
                            Response::internal_error(err)
                        }
                    };

                    (response, handler.controller_name())
                }

                None => (Response::not_found(), std::any::type_name::<Self>()),
            };

            let response = if keep_alive {
                response
            } else {
                response.header("connection", "close")
            };

            Self::log(&request, controller_name, &response, start.elapsed());

            if let Err(err) = Self::send_response(&mut stream, response).await {
                debug!("{} error {:?}", peer_addr, err);
                break;
            }

            if !keep_alive {
                break;
            }
        }
    }

    fn log(request: &Request, controller_name: &str, response: &Response, duration: Duration) {
        let method = request.method().to_string();
        let path = request.path().path();
        let duration = (duration.as_secs_f64() * 1000.0) as f32;

        info!(
            "{} {} {} {} ({:.3} ms)",
            method.purple(),
            path.purple(),
            controller_name.green(),
            status_code(response.status().code()),
            duration,
        );
    }

    async fn send_response(
        mut stream: impl AsyncWrite + Unpin,
        response: Response,
    ) -> Result<(), Error> {
        response.send(&mut stream).await?;
        stream.flush().await?;

        Ok(())
    }
}
