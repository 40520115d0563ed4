//! Find the secret key of a session cookie in a wordlist.
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use stlab::crypto::decode_unverified;
use tracing::{debug, info};

use crate::cookie::{Error, Signing};

/// Candidate secrets, one per line. Wordlists aren't always valid UTF-8.
pub fn wordlist(path: &Path) -> Result<Vec<String>, Error> {
    let bytes = std::fs::read(path)?;

    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

/// Try every candidate in parallel. The search stops at the first secret that verifies.
pub fn crack(
    template: &Signing,
    cookie: &str,
    candidates: &[String],
    threads: Option<usize>,
) -> Result<Option<String>, Error> {
    let cookie = cookie.trim();

    // Not a session cookie, nothing to crack.
    decode_unverified(cookie)?;

    let pool = ThreadPoolBuilder::new()
        .num_threads(threads.unwrap_or(0))
        .build()?;

    let tried = AtomicUsize::new(0);

    info!(
        "trying {} secrets on {} threads",
        candidates.len(),
        pool.current_num_threads()
    );

    let found = pool.install(|| {
        candidates.par_iter().find_any(|secret| {
            tried.fetch_add(1, Ordering::Relaxed);

            let signing = Signing {
                secret: secret.to_string(),
                ..template.clone()
            };

            signing.serializer().loads(cookie, None).is_ok()
        })
    });

    debug!("tried {} secrets", tried.load(Ordering::Relaxed));

    Ok(found.cloned())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cookie::sign;
    use std::io::Write;
    use tempdir::TempDir;

    #[test]
    fn test_crack() -> Result<(), Error> {
        let cookie = sign(&Signing::new("supersafesecretkey"), r#"{"user":"visitor"}"#)?;

        let dir = TempDir::new("stlab-crack")?;
        let path = dir.path().join("words.txt");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "password\r\n123456\n\nsecret")?;
        for n in 0..500 {
            writeln!(file, "guess{}", n)?;
        }
        writeln!(file, "supersafesecretkey")?;

        let candidates = wordlist(&path)?;
        assert!(!candidates.contains(&String::new()));
        assert!(candidates.contains(&"password".to_string()));

        let found = crack(&Signing::new(""), &cookie, &candidates, Some(4))?;
        assert_eq!(found.as_deref(), Some("supersafesecretkey"));

        let found = crack(&Signing::new(""), &cookie, &candidates[..10], Some(2))?;
        assert_eq!(found, None);

        Ok(())
    }

    #[test]
    fn test_not_a_cookie() {
        assert!(crack(&Signing::new(""), "nope", &["nope".to_string()], None).is_err());
    }
}
