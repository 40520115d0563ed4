use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use stlab::crypto::KeyDerivation;
use stlab::logging::Logger;

mod cookie;
mod crack;
mod logging;
mod render;

use cookie::Signing;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show what's inside a session cookie. No secret key needed.
    Decode { cookie: String },

    /// Sign a payload into a session cookie.
    Sign {
        #[arg(long, help = "Secret key, e.g. a leaked SECRET_KEY")]
        secret: String,

        #[arg(long, help = "Session data as JSON, e.g. '{\"user\": \"admin\"}'")]
        payload: String,

        #[command(flatten)]
        signing: SigningArgs,

        #[arg(
            long,
            help = "Count timestamps from 2011 like itsdangerous < 1.0",
            default_value = "false"
        )]
        legacy_timestamp: bool,
    },

    /// Check a session cookie's signature.
    Verify {
        cookie: String,

        #[arg(long)]
        secret: String,

        #[command(flatten)]
        signing: SigningArgs,

        #[arg(long, help = "Reject cookies signed more than this many seconds ago")]
        max_age: Option<i64>,
    },

    /// Find a session cookie's secret key in a wordlist.
    Crack {
        cookie: String,

        #[arg(long, help = "File with one candidate secret per line")]
        wordlist: PathBuf,

        #[command(flatten)]
        signing: SigningArgs,

        #[arg(long, help = "Worker threads, defaults to one per CPU")]
        threads: Option<usize>,
    },

    /// Render a template string, "-" reads it from stdin.
    Render {
        template: String,

        #[arg(long = "var", value_parser = render::parse_var, help = "Template variable, name=value")]
        vars: Vec<(String, String)>,
    },
}

#[derive(clap::Args, Debug)]
struct SigningArgs {
    #[arg(long, default_value = stlab::crypto::SESSION_SALT)]
    salt: String,

    #[arg(long, default_value = "hmac", help = "hmac, django-concat, concat or none")]
    key_derivation: KeyDerivation,
}

impl SigningArgs {
    fn with_secret(self, secret: impl ToString) -> Signing {
        Signing {
            salt: self.salt,
            key_derivation: self.key_derivation,
            ..Signing::new(secret)
        }
    }
}

fn run(command: Command) -> Result<bool, cookie::Error> {
    match command {
        Command::Decode { cookie } => {
            println!("{}", cookie::decode(&cookie)?);
        }

        Command::Sign {
            secret,
            payload,
            signing,
            legacy_timestamp,
        } => {
            let signing = Signing {
                legacy_timestamp,
                ..signing.with_secret(secret)
            };
            println!("{}", cookie::sign(&signing, &payload)?);
        }

        Command::Verify {
            cookie,
            secret,
            signing,
            max_age,
        } => match cookie::verify(&signing.with_secret(secret), &cookie, max_age) {
            Ok(payload) => println!("valid: {}", payload),
            Err(err) => {
                println!("invalid: {}", err);
                return Ok(false);
            }
        },

        Command::Crack {
            cookie,
            wordlist,
            signing,
            threads,
        } => {
            let candidates = crack::wordlist(&wordlist)?;
            if candidates.is_empty() {
                logging::warning(format!("\"{}\" is empty", wordlist.display()));
            }

            match crack::crack(&signing.with_secret(""), &cookie, &candidates, threads)? {
                Some(secret) => {
                    logging::found(format!("secret key after {} candidates", candidates.len()));
                    println!("{}", secret);
                }
                None => {
                    logging::error("secret key is not in the wordlist");
                    return Ok(false);
                }
            }
        }

        Command::Render { template, vars } => {
            let template = if template == "-" {
                let mut template = String::new();
                std::io::stdin().read_to_string(&mut template)?;
                template
            } else {
                template
            };

            println!("{}", render::render(&template, &vars)?);
        }
    }

    Ok(true)
}

fn main() -> ExitCode {
    Logger::init_quiet();
    let args = Cli::parse();

    match run(args.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            logging::error(err);
            ExitCode::FAILURE
        }
    }
}
