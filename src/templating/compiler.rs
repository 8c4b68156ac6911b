//! Micro-template compiler.
//!
//! Templates use three tags:
//!
//! | Tag | Meaning |
//! |---|---|
//! | `{{ expr }}` | interpolate `expr` as-is |
//! | `{{- expr }}` | interpolate `expr` HTML-escaped |
//! | `{{% statement %}}` | control statement (`if`, `elif`, `else`, `endif`, `for x in xs`, `endfor`, `set`) |
//!
//! A statement may also be closed with a plain `}}`. Expressions and
//! statements use Tera syntax; the compiler lexes the template into Tera
//! source, protecting literal text that happens to contain Tera delimiters,
//! and hands it to a private [`Tera`] instance with autoescaping off.
//!
//! # Examples
//!
//! ```rust
//! use common_tpl::templating::translate;
//!
//! let source = translate("<h1>{{ title }}</h1>{{% if sale %}}<b>{{- badge }}</b>{{% endif %}}").unwrap();
//! assert_eq!(source, "<h1>{{ title }}</h1>{% if sale %}<b>{{ badge | escape }}</b>{% endif %}");
//! ```

use serde_json::Value;
use std::sync::Arc;
use tera::{Context, Tera};

use super::cache::MemoryTemplateCache;
use super::diagnostics::Diagnostics;
use super::error::format_tera_error;
use super::{TemplateError, TemplateKey};

const TEMPLATE_NAME: &str = "__common_tpl__";

/// A compiled, reusable render function.
///
/// One instance exists per checksum per process, shared by every key whose
/// manifest checksum matches.
pub struct CompiledTemplate {
    key: String,
    checksum: String,
    tera: Tera,
}

impl std::fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("key", &self.key)
            .field("checksum", &self.checksum)
            .finish()
    }
}

impl CompiledTemplate {
    /// Compile `content` without touching any cache.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] for unterminated or empty tags and for
    /// expressions or statements Tera cannot parse.
    pub fn compile(key: &str, content: &str, checksum: &str) -> Result<Self, TemplateError> {
        let source = translate(content)?;

        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_template(TEMPLATE_NAME, &source).map_err(|e| TemplateError::Syntax {
            key: key.to_string(),
            message: format_tera_error(&e),
        })?;

        Ok(Self {
            key: key.to_string(),
            checksum: checksum.to_string(),
            tera,
        })
    }

    /// Checksum of the source this was compiled from.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Apply `data`.
    ///
    /// A JSON object becomes the template context; any other value is exposed
    /// as `data`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Render`] when evaluation fails, e.g. on a
    /// missing variable.
    pub fn render(&self, data: &Value) -> Result<String, TemplateError> {
        self.render_as(&self.key, data)
    }

    /// Apply `data` for `target`.
    ///
    /// Keys sharing a checksum share one instance, so a failure is reported
    /// against `target` rather than the key that compiled it.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Render`] when evaluation fails.
    pub fn render_for(&self, target: &TemplateKey, data: &Value) -> Result<String, TemplateError> {
        self.render_as(target.as_str(), data)
    }

    fn render_as(&self, key: &str, data: &Value) -> Result<String, TemplateError> {
        let render_error = |error: tera::Error| TemplateError::Render {
            key: key.to_string(),
            message: format_tera_error(&error),
        };

        let mut context = match data {
            Value::Object(_) => Context::from_value(data.clone()).map_err(render_error)?,
            _ => Context::new(),
        };
        if !data.is_object() {
            context.insert("data", data);
        }

        self.tera.render(TEMPLATE_NAME, &context).map_err(render_error)
    }
}

/// Compiles templates and registers them in the memory cache.
#[derive(Debug, Clone)]
pub struct TemplateCompiler {
    cache: Arc<MemoryTemplateCache>,
    diagnostics: Diagnostics,
}

impl TemplateCompiler {
    /// Create a compiler registering into `cache`.
    pub fn new(cache: Arc<MemoryTemplateCache>, diagnostics: Diagnostics) -> Self {
        Self {
            cache,
            diagnostics,
        }
    }

    /// The memory cache this compiler registers into.
    pub fn cache(&self) -> &Arc<MemoryTemplateCache> {
        &self.cache
    }

    /// Compile `content` for `key` and register it under `checksum`.
    ///
    /// When a template is already compiled for `checksum`, `key` is linked to
    /// it and nothing is compiled. Failures are reported through the
    /// diagnostics and returned; they never panic.
    ///
    /// # Errors
    ///
    /// Returns the [`TemplateError`] that prevented compilation.
    pub fn compile(
        &self,
        key: &TemplateKey,
        content: &str,
        checksum: &str,
    ) -> Result<Arc<CompiledTemplate>, TemplateError> {
        if let Some(existing) = self.cache.link(key, checksum) {
            tracing::debug!("Reusing compiled template {} for {}", checksum, key);
            return Ok(existing);
        }

        match CompiledTemplate::compile(key.as_str(), content, checksum) {
            Ok(compiled) => {
                tracing::debug!("Compiled template {} for {}", checksum, key);
                Ok(self.cache.store(key, checksum, Arc::new(compiled)))
            }
            Err(e) => {
                self.diagnostics.report(&e);
                Err(e)
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tag {
    Raw,
    Escaped,
    Statement,
}

impl Tag {
    fn opener(self) -> &'static str {
        match self {
            Self::Raw => "{{",
            Self::Escaped => "{{-",
            Self::Statement => "{{%",
        }
    }
}

/// Translate micro-template source into Tera source.
///
/// # Errors
///
/// Returns [`TemplateError::Unterminated`] for a tag without a closing `}}`
/// and [`TemplateError::EmptyExpression`] for a tag with nothing inside.
pub fn translate(content: &str) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(content.len() + 16);
    let mut rest = content;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        push_text(&mut output, &rest[..start]);

        let after_open = &rest[start + 2..];
        let (tag, body_start) = match after_open.chars().next() {
            Some('-') => (Tag::Escaped, 3),
            Some('%') => (Tag::Statement, 3),
            _ => (Tag::Raw, 2),
        };

        let body_and_rest = &rest[start + body_start..];
        let Some(close) = body_and_rest.find("}}") else {
            return Err(TemplateError::Unterminated {
                tag: tag.opener().to_string(),
                offset: offset + start,
            });
        };

        let mut body = &body_and_rest[..close];
        if tag == Tag::Statement {
            body = body.strip_suffix('%').unwrap_or(body);
        }
        let body = body.trim();
        if body.is_empty() {
            return Err(TemplateError::EmptyExpression {
                tag: tag.opener().to_string(),
                offset: offset + start,
            });
        }

        match tag {
            Tag::Raw => output.push_str(&format!("{{{{ {body} }}}}")),
            Tag::Escaped => output.push_str(&format!("{{{{ {body} | escape }}}}")),
            Tag::Statement => output.push_str(&format!("{{% {body} %}}")),
        }

        let consumed = start + body_start + close + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    push_text(&mut output, rest);
    Ok(output)
}

fn push_text(output: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if text.contains("{%") || text.contains("{#") || text.ends_with('{') {
        output.push_str("{% raw %}");
        output.push_str(text);
        output.push_str("{% endraw %}");
    } else {
        output.push_str(text);
    }
}
