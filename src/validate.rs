//! Form validation helpers.

use regex::Regex;
use std::sync::LazyLock;

/// Characters above ASCII accepted in internationalized addresses.
const INTL: &str = r"\x{A0}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFEF}";

static EMAIL_LOOSEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~\-]+@[a-zA-Z0-9](?:[a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("loosest email pattern is valid")
});

static EMAIL_LOOSE: LazyLock<Regex> = LazyLock::new(|| {
    let atom = format!(r"[a-zA-Z0-9!#$%&'*+/=?^_`{{|}}~\-{INTL}]+");
    let folding = r"(?:(?:[ \t]*\r\n)?[ \t]+)?";
    let quoted_char = format!(r"(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x7f\x21\x23-\x5b\x5d-\x7e{INTL}]|\\[\x01-\x09\x0b\x0c\x0d-\x7f{INTL}])");
    let local = format!(r#"(?:{atom}(?:\.{atom})*|"(?:{folding}{quoted_char})*{folding}")"#);

    let label = format!(r"(?:[a-zA-Z0-9{INTL}]|[a-zA-Z0-9{INTL}][a-zA-Z0-9\-._~{INTL}]*[a-zA-Z0-9{INTL}])");
    let tld = format!(r"(?:[a-zA-Z{INTL}]|[a-zA-Z{INTL}][a-zA-Z0-9\-._~{INTL}]*[a-zA-Z{INTL}])");

    Regex::new(&format!(r"^{local}@(?:{label}\.)+{tld}$")).expect("loose email pattern is valid")
});

static EMAIL_STRICT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    )
    .expect("strict email pattern is valid")
});

static POSTAL_CODE_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("postal code noise pattern is valid"));

static POSTAL_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[abceghjklmnprstvxy][0-9][abceghjklmnprstvwxyz]( )?[0-9][abceghjklmnprstvwxyz][0-9]$")
        .expect("postal code pattern is valid")
});

/// How much of RFC 5322 an address check accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// The WHATWG `type=email` rule; the domain needs no dot.
    Loosest,
    /// Internationalized addresses and quoted local parts.
    Loose,
    /// ASCII addresses with a TLD or an IPv4 literal.
    #[default]
    Strict,
}

/// Check `email` at the given strictness.
pub fn validate_email(email: &str, strictness: Strictness) -> bool {
    let pattern = match strictness {
        Strictness::Loosest => &EMAIL_LOOSEST,
        Strictness::Loose => &EMAIL_LOOSE,
        Strictness::Strict => &EMAIL_STRICT,
    };
    pattern.is_match(email)
}

/// Normalize and check a Canadian postal code.
///
/// Accepts `a1b2c3` and `A1B 2C3` alike. Returns the normalized code
/// (lowercase, punctuation and whitespace removed) when it is valid.
pub fn validate_postal_code(postal_code: &str) -> Option<String> {
    let normalized = POSTAL_CODE_NOISE.replace_all(&postal_code.to_lowercase(), "").into_owned();
    POSTAL_CODE.is_match(&normalized).then_some(normalized)
}
