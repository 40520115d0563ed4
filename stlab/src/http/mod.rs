//! HTTP/1.1 protocol: reading requests, writing responses, cookies, routing and the server.
pub mod body;
pub mod cookies;
pub mod error;
pub mod form_data;
pub mod handler;
pub mod head;
pub mod headers;
pub mod path;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod url;

pub use body::Body;
pub use cookies::{Cookie, CookieBuilder, Cookies, ToCookie};
pub use error::Error;
pub use form_data::FormData;
pub use handler::Handler;
pub use head::{Head, Method, Version};
pub use headers::Headers;
pub use path::{Params, Path, PathType, PathWithRegex, Query};
pub use request::Request;
pub use response::{Response, Status};
pub use router::Router;
pub use server::Server;
pub use url::{urldecode, urlencode};
