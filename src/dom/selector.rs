//! Minimal CSS selector matching for the headless document.
//!
//! Supports comma-separated lists of compound selectors made of an optional tag
//! name followed by any number of `#id` and `.class` parts (`div#cart.open`,
//! `.csp-data`, `#promo-banner, .sidebar`). Combinators, attribute selectors
//! and pseudo-classes are not supported; a list containing one is rejected.

/// One compound selector, e.g. `input.csp-data`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    /// Required tag name, lowercase
    pub tag: Option<String>,
    /// Required id
    pub id: Option<String>,
    /// Required classes
    pub classes: Vec<String>,
}

impl CompoundSelector {
    /// Parse a single compound selector.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let mut selector = Self::default();
        let mut chars = input.char_indices().peekable();

        let tag_end = input.find(['#', '.']).unwrap_or(input.len());
        if tag_end > 0 {
            let tag = &input[..tag_end];
            if !tag.chars().all(is_name_char) {
                return None;
            }
            selector.tag = Some(tag.to_ascii_lowercase());
            while chars.peek().is_some_and(|(i, _)| *i < tag_end) {
                chars.next();
            }
        }

        while let Some((start, marker)) = chars.next() {
            let name_start = start + marker.len_utf8();
            let mut name_end = name_start;
            while let Some((i, c)) = chars.peek().copied() {
                if !is_name_char(c) {
                    break;
                }
                name_end = i + c.len_utf8();
                chars.next();
            }

            let name = &input[name_start..name_end];
            if name.is_empty() {
                return None;
            }

            match marker {
                '#' if selector.id.is_none() => selector.id = Some(name.to_string()),
                '.' => selector.classes.push(name.to_string()),
                _ => return None,
            }
        }

        Some(selector)
    }

    /// Whether an element with the given tag, id and classes matches.
    pub fn matches(&self, tag: &str, id: Option<&str>, classes: &[String]) -> bool {
        if let Some(expected) = &self.tag
            && !expected.eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if let Some(expected) = &self.id
            && id != Some(expected.as_str())
        {
            return false;
        }
        self.classes.iter().all(|class| classes.iter().any(|c| c == class))
    }
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(pub Vec<CompoundSelector>);

impl SelectorList {
    /// Parse a comma-separated selector list; `None` when any part is unsupported.
    pub fn parse(input: &str) -> Option<Self> {
        let selectors = input
            .split(',')
            .map(CompoundSelector::parse)
            .collect::<Option<Vec<_>>>()?;
        Some(Self(selectors))
    }

    /// Whether any selector in the list matches.
    pub fn matches(&self, tag: &str, id: Option<&str>, classes: &[String]) -> bool {
        self.0.iter().any(|selector| selector.matches(tag, id, classes))
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}
