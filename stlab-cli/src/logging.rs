use stlab::colors::MaybeColorize;

pub fn found(something: impl ToString) {
    eprintln!("{} {}", "found".green(), something.to_string());
}

pub fn error(something: impl ToString) {
    eprintln!("{}: {}", "error".red(), something.to_string());
}

pub fn warning(something: impl ToString) {
    eprintln!("{}: {}", "warning".yellow(), something.to_string());
}
