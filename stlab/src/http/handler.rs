use super::{path::PathType, Path};
use crate::controller::Controller;

use std::ops::Deref;

/// A controller mounted at a path.
pub struct Handler {
    path: Path,
    path_type: PathType,
    controller: Box<dyn Controller>,
    rank: i64,
}

impl Handler {
    pub fn new(path: &str, controller: impl Controller + 'static, path_type: PathType) -> Self {
        Self {
            path: Path::parse(path),
            path_type,
            controller: Box::new(controller),
            rank: 0,
        }
    }

    /// Match only this path.
    pub fn route(path: &str, controller: impl Controller + 'static) -> Self {
        Self::new(path, controller, PathType::Route)
    }

    /// Match this path and everything below it. Loses to any other route that matches.
    pub fn wildcard(path: &str, controller: impl Controller + 'static) -> Self {
        Self::new(path, controller, PathType::Wildcard).with_rank(-20)
    }

    pub fn rank(&self) -> i64 {
        self.rank
    }

    pub fn with_rank(mut self, rank: i64) -> Self {
        self.rank = rank;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn path_type(&self) -> PathType {
        self.path_type
    }

    pub fn controller_name(&self) -> &'static str {
        self.controller.controller_name()
    }
}

impl Deref for Handler {
    type Target = Box<dyn Controller>;

    fn deref(&self) -> &Self::Target {
        &self.controller
    }
}
