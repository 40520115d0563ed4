//! URL handling helpers.
//!
//! # Example
//!
//! ```
//! use stlab::http::{urlencode, urldecode};
//!
//! let url = "?foo=bar&hello=world%20";
//!
//! let decoded = urldecode(url);
//! let encoded = urlencode(&decoded);
//!
//! assert_eq!(decoded, "?foo=bar&hello=world ");
//! assert_eq!(encoded, "%3Ffoo%3Dbar%26hello%3Dworld%20");
//! ```

/// Decode a string encoded with percent-encoding, also known as URL encoding.
///
/// `+` decodes to a space. Escapes that aren't followed by two hex digits are kept as-is,
/// so `{% if %}` survives a round through a form that didn't encode it.
pub fn urldecode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => match (hex(bytes.get(i + 1)), hex(bytes.get(i + 2))) {
                (Some(high), Some(low)) => {
                    result.push(high << 4 | low);
                    i += 3;
                    continue;
                }
                _ => result.push(b'%'),
            },

            b'+' => result.push(b' '),

            b => result.push(b),
        }

        i += 1;
    }

    String::from_utf8_lossy(&result).to_string()
}

fn hex(b: Option<&u8>) -> Option<u8> {
    let b = *b?;
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Encode a string using percent-encoding, also known as URL encoding.
///
/// Unreserved characters (`A-Z a-z 0-9 - _ . ~`) are left alone, everything else
/// is encoded byte by byte.
pub fn urlencode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(b as char)
            }
            b => result.push_str(&format!("%{:02X}", b)),
        }
    }

    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_urldecode() {
        let url = "?foo=bar&hello=world";
        assert_eq!(urldecode(url), "?foo=bar&hello=world");

        let url = "?foo=bar&hello=world%20&apples%3Doranges";
        assert_eq!(urldecode(url), "?foo=bar&hello=world &apples=oranges");

        let url = "id%2Cpath%2Cmethod%2Cclient_ip";
        assert_eq!(urldecode(url), "id,path,method,client_ip");

        assert_eq!(urldecode("%7B%7B7*7%7D%7D"), "{{7*7}}");
        assert_eq!(urldecode("%7B%25+if+1+%25%7D"), "{% if 1 %}");
        assert_eq!(urldecode("{% if %}"), "{% if %}");
        assert_eq!(urldecode("caf%C3%A9"), "café");
        assert_eq!(urldecode("100%"), "100%");
    }

    #[test]
    fn test_urlencode() {
        let s = "hello&world=1234\nonetwo";
        let encoded = urlencode(s);
        assert_eq!(urldecode(&encoded), s);

        assert_eq!(urlencode("{{ config }}"), "%7B%7B%20config%20%7D%7D");
        assert_eq!(urlencode("é"), "%C3%A9");
    }
}
