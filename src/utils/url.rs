//! URL fragment helpers.

use std::borrow::Cow;

/// Value of `key` in the `#a=1&b=2` fragment of `url`, percent-decoded.
///
/// A key without `=` has no value. Text that does not decode to UTF-8 is
/// returned as-is.
pub fn hash_parameter<'a>(url: &'a str, key: &str) -> Option<Cow<'a, str>> {
    let (_, fragment) = url.split_once('#')?;

    fragment.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        (name == key).then(|| urlencoding::decode(value).unwrap_or(Cow::Borrowed(value)))
    })
}
