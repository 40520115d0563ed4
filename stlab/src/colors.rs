//! Terminal colors that switch off when stderr isn't a terminal.
use crate::config::get_config;
use colored::Colorize;

pub trait MaybeColorize {
    fn green(&self) -> String;
    fn red(&self) -> String;
    fn purple(&self) -> String;
    fn yellow(&self) -> String;
}

fn paint(text: &str, color: fn(&str) -> colored::ColoredString) -> String {
    if get_config().general.tty {
        color(text).to_string()
    } else {
        text.to_string()
    }
}

impl MaybeColorize for &str {
    fn green(&self) -> String {
        paint(self, |s| Colorize::green(s))
    }

    fn red(&self) -> String {
        paint(self, |s| Colorize::red(s))
    }

    fn purple(&self) -> String {
        paint(self, |s| Colorize::purple(s))
    }

    fn yellow(&self) -> String {
        paint(self, |s| Colorize::yellow(s))
    }
}

impl MaybeColorize for String {
    fn green(&self) -> String {
        MaybeColorize::green(&self.as_str())
    }

    fn red(&self) -> String {
        MaybeColorize::red(&self.as_str())
    }

    fn purple(&self) -> String {
        MaybeColorize::purple(&self.as_str())
    }

    fn yellow(&self) -> String {
        MaybeColorize::yellow(&self.as_str())
    }
}

/// Color an HTTP status code the way request logs show it.
pub fn status_code(code: u16) -> String {
    let code = code.to_string();

    match code.as_bytes().first() {
        Some(b'2') | Some(b'3') => code.green(),
        Some(b'4') => code.yellow(),
        _ => code.red(),
    }
}
