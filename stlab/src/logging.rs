//! Wrapper around `tracing_subscriber` for logging.
//!
//! Logs go to stderr at the `INFO` level unless `RUST_LOG` says otherwise.
//! Applications bringing their own subscriber shouldn't initialize the `Logger`.
//!
//! ### Example
//!
//! ```rust
//! use stlab::prelude::*;
//!
//! Logger::init();
//! ```
use crate::config::get_config;
use once_cell::sync::OnceCell;
use tracing_subscriber::{filter::LevelFilter, fmt, util::SubscriberInitExt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

pub struct Logger;

impl Logger {
    /// Configure logging application-wide.
    ///
    /// Calling this multiple times is safe. Logger will be initialized only once.
    /// Install the configuration first; this reads it.
    pub fn init() {
        INITIALIZED.get_or_init(|| {
            setup_logging(get_config().general.tty);
            get_config().log_info();
        });
    }

    /// Logging for command-line tools: warnings and errors only, unless `RUST_LOG` is set.
    pub fn init_quiet() {
        INITIALIZED.get_or_init(|| {
            let _ = fmt()
                .with_env_filter(
                    EnvFilter::builder()
                        .with_default_directive(LevelFilter::WARN.into())
                        .from_env_lossy(),
                )
                .with_writer(std::io::stderr)
                .with_target(false)
                .finish()
                .try_init();
        });
    }
}

fn setup_logging(tty: bool) {
    // A subscriber may already be installed, e.g. by a test harness.
    let _ = fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(tty)
        .with_file(false)
        .with_target(false)
        .finish()
        .try_init();
}
