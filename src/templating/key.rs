//! Template keys and their server-side block names.

use std::fmt;

/// Identifier of a render target, conventionally a CSS selector.
///
/// The same string is used both to find DOM nodes and to name the template on
/// the server, which knows it by its [`TemplateKey::block_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey(String);

impl TemplateKey {
    /// Create a key; blank input yields `None`.
    pub fn new(key: impl AsRef<str>) -> Option<Self> {
        let key = key.as_ref().trim();
        if key.is_empty() {
            None
        } else {
            Some(Self(key.to_string()))
        }
    }

    /// The key as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Server-side block name: one leading `#` or `.` removed and `-` replaced
    /// with `_`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use common_tpl::templating::TemplateKey;
    ///
    /// let key = TemplateKey::new("#promo-banner").unwrap();
    /// assert_eq!(key.block_name(), "promo_banner");
    /// ```
    pub fn block_name(&self) -> String {
        let trimmed = self.0.strip_prefix(['#', '.']).unwrap_or(&self.0);
        trimmed.replace('-', "_")
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TemplateKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One key or many, as accepted by `tpl`.
///
/// Implemented for `&str`, `String`, slices, arrays and vectors of either, and
/// collections of [`TemplateKey`].
pub trait IntoTemplateKeys {
    /// Normalize into keys, dropping blank entries and duplicates while keeping
    /// first-seen order.
    fn into_template_keys(self) -> Vec<TemplateKey>;
}

fn collect_keys<I, S>(keys: I) -> Vec<TemplateKey>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<TemplateKey> = Vec::new();
    for key in keys.into_iter().filter_map(TemplateKey::new) {
        if !normalized.contains(&key) {
            normalized.push(key);
        }
    }
    normalized
}

impl IntoTemplateKeys for &str {
    fn into_template_keys(self) -> Vec<TemplateKey> {
        collect_keys([self])
    }
}

impl IntoTemplateKeys for String {
    fn into_template_keys(self) -> Vec<TemplateKey> {
        collect_keys([self])
    }
}

impl IntoTemplateKeys for &String {
    fn into_template_keys(self) -> Vec<TemplateKey> {
        collect_keys([self])
    }
}

impl IntoTemplateKeys for TemplateKey {
    fn into_template_keys(self) -> Vec<TemplateKey> {
        vec![self]
    }
}

impl<S: AsRef<str>> IntoTemplateKeys for Vec<S> {
    fn into_template_keys(self) -> Vec<TemplateKey> {
        collect_keys(self)
    }
}

impl<S: AsRef<str>> IntoTemplateKeys for &[S] {
    fn into_template_keys(self) -> Vec<TemplateKey> {
        collect_keys(self)
    }
}

impl<S: AsRef<str>, const N: usize> IntoTemplateKeys for [S; N] {
    fn into_template_keys(self) -> Vec<TemplateKey> {
        collect_keys(self)
    }
}
