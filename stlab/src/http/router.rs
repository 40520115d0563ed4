//! HTTP request routing.
use std::sync::Arc;

use super::{Error, Handler, Params, Path, PathWithRegex};
use crate::colors::MaybeColorize;

use regex::RegexSet;
use tracing::info;

struct Route {
    path: PathWithRegex,
    handler: Handler,
}

/// Finds the handler for a request path.
#[derive(Default)]
pub struct Router {
    regex: RegexSet,
    routes: Vec<Route>,
}

impl Router {
    pub fn new(handlers: Vec<Handler>) -> Result<Self, Error> {
        let routes = handlers
            .into_iter()
            .map(|handler| {
                Ok(Route {
                    path: handler.path().clone().with_regex(handler.path_type())?,
                    handler,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let regex = RegexSet::new(routes.iter().map(|route| route.path.regex().as_str()))?;

        Ok(Self { regex, routes })
    }

    /// Find the most specific handler for the path: highest rank, then longest path.
    pub fn find(&self, path: &Path) -> Option<(&Handler, Arc<Params>)> {
        let matches = self.regex.matches(path.base());

        self.routes
            .iter()
            .enumerate()
            .filter(|(i, _)| matches.matched(*i))
            .map(|(_, route)| route)
            .max_by(|a, b| {
                let a_key = (a.handler.rank(), a.path.len());
                let b_key = (b.handler.rank(), b.path.len());
                a_key.cmp(&b_key)
            })
            .map(|route| (&route.handler, route.path.params()))
    }

    pub fn log_routes(&self) {
        let mut routes = self.routes.iter().collect::<Vec<_>>();
        routes.sort_by_key(|route| route.path.path());

        for route in routes {
            info!(
                ">> {} => {}",
                route.path.path().purple(),
                route.handler.controller_name().green()
            );
        }
    }
}
