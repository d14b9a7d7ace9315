//! Fragment extraction from fetched documents.
//!
//! A [`SelectorRule`] names one node: optionally scoped to the first match of
//! `within`, then the first match of `select` in document order. No match is
//! [`ExtractError::NotFound`]; a match with no text and no images is
//! [`ExtractError::Empty`]. Neither is ever papered over with empty content.

pub mod normalize;

pub use normalize::{NormalizationWarning, Normalized, normalize, normalize_with_warnings};

use missal_core::Error;
use missal_core::config::{RewriteRule, SelectorRule, SourceSpec};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::fetch::Document;

/// The sub-tree of a document holding a key's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Outer HTML of the selected node.
    pub html: String,
    /// URL relative references inside the fragment resolve against.
    pub base_url: Url,
}

/// Extraction failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractError {
    #[error("no node matches {0}")]
    NotFound(String),

    #[error("node matching {0} has no content")]
    Empty(String),

    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl From<ExtractError> for Error {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::NotFound(_) => Error::FragmentNotFound(err.to_string()),
            ExtractError::Empty(_) => Error::EmptyFragment(err.to_string()),
            ExtractError::InvalidSelector { .. } => Error::InvalidInput(err.to_string()),
        }
    }
}

/// Parse a CSS selector, keeping the parser's message.
pub fn compile_selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::InvalidSelector { selector: css.to_string(), reason: e.to_string() })
}

fn describe(rule: &SelectorRule) -> String {
    match &rule.within {
        Some(scope) => format!("`{}` within `{}`", rule.select, scope),
        None => format!("`{}`", rule.select),
    }
}

fn has_content(element: &ElementRef<'_>) -> bool {
    static IMG: std::sync::LazyLock<Selector> =
        std::sync::LazyLock::new(|| Selector::parse("img").expect("BUG: hardcoded selector 'img' is invalid"));

    element.text().any(|t| !t.trim().is_empty()) || element.select(&IMG).next().is_some()
}

/// Locate the fragment `rule` names inside `doc`.
pub fn extract(doc: &Document, rule: &SelectorRule) -> Result<Fragment, ExtractError> {
    let select = compile_selector(&rule.select)?;
    let within = rule.within.as_deref().map(compile_selector).transpose()?;

    let html = Html::parse_document(&doc.body);

    let found = match within {
        Some(scope) => html
            .select(&scope)
            .next()
            .and_then(|scope| scope.select(&select).next()),
        None => html.select(&select).next(),
    };

    let Some(element) = found else {
        return Err(ExtractError::NotFound(describe(rule)));
    };

    if !has_content(&element) {
        return Err(ExtractError::Empty(describe(rule)));
    }

    Ok(Fragment { html: element.html(), base_url: doc.final_url.clone() })
}

/// Check every selector in `sources` compiles, so typos fail at startup
/// instead of on the first request.
pub fn validate_sources(sources: &[SourceSpec]) -> Result<(), Error> {
    for source in sources {
        let prefix = |e: ExtractError| Error::InvalidInput(format!("sources.{}: {e}", source.key));

        compile_selector(&source.selector.select).map_err(prefix)?;
        if let Some(scope) = &source.selector.within {
            compile_selector(scope).map_err(prefix)?;
        }
        for rule in &source.profile.rules {
            match rule {
                RewriteRule::Drop { selector } | RewriteRule::PlainTitle { selector, .. } => {
                    compile_selector(selector).map_err(prefix)?;
                }
                RewriteRule::ImageBlocks { default_width, default_height, .. } => {
                    if *default_width == 0 || *default_height == 0 {
                        return Err(Error::InvalidInput(format!(
                            "sources.{}: image_blocks default dimensions must be non-zero",
                            source.key
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}
