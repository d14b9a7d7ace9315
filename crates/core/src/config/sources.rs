//! Per-key source configuration.
//!
//! A [`SourceSpec`] tells the pipeline where a key's content lives, which node
//! holds it, how to clean it up and how long it stays valid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::content::ContentKey;
use crate::freshness::StalenessRule;

/// Everything needed to produce the content for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub key: ContentKey,

    /// Base URL of the remote document.
    pub url: String,

    /// Variant parameters appended to the URL query, in order.
    #[serde(default)]
    pub query: Vec<(String, String)>,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    pub selector: SelectorRule,

    #[serde(default)]
    pub profile: NormalizationProfile,

    pub staleness: StalenessRule,
}

/// Locates the single node holding a key's content.
///
/// `within` narrows the search to the first node it matches; `select` then
/// picks the first match in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRule {
    #[serde(default)]
    pub within: Option<String>,
    pub select: String,
}

impl SelectorRule {
    pub fn new(select: impl Into<String>) -> Self {
        Self { within: None, select: select.into() }
    }

    pub fn within(mut self, scope: impl Into<String>) -> Self {
        self.within = Some(scope.into());
        self
    }
}

/// Ordered content-specific cleanup for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationProfile {
    #[serde(default)]
    pub rules: Vec<RewriteRule>,
    #[serde(default)]
    pub redact: Vec<Redaction>,
}

/// A named structural rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RewriteRule {
    /// Remove every node matching `selector`.
    Drop { selector: String },

    /// Replace a linked title with a plain title holding only the link text.
    PlainTitle {
        selector: String,
        #[serde(default)]
        tag: Option<String>,
    },

    /// Turn each `<img>` into a self-contained responsive block.
    ImageBlocks {
        #[serde(default = "default_image_width")]
        default_width: u32,
        #[serde(default = "default_image_height")]
        default_height: u32,
        #[serde(default = "default_image_widths")]
        widths: Vec<u32>,
    },
}

impl RewriteRule {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            RewriteRule::Drop { .. } => "drop",
            RewriteRule::PlainTitle { .. } => "plain_title",
            RewriteRule::ImageBlocks { .. } => "image_blocks",
        }
    }

    pub fn image_blocks() -> Self {
        RewriteRule::ImageBlocks {
            default_width: default_image_width(),
            default_height: default_image_height(),
            widths: default_image_widths(),
        }
    }
}

/// Case-insensitive literal text to scrub from content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redaction {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
}

impl Redaction {
    pub fn remove(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), replacement: String::new() }
    }
}

fn default_image_width() -> u32 {
    800
}

fn default_image_height() -> u32 {
    533
}

fn default_image_widths() -> Vec<u32> {
    vec![300, 768, 1024]
}

const READINGS_URL: &str = "https://www.catholicireland.net/readings/";

/// Boilerplate shared by every page on the source site.
fn site_profile() -> Vec<RewriteRule> {
    vec![
        RewriteRule::Drop { selector: ".entry-meta, .post-header-meta, .breadcrumbs".into() },
        RewriteRule::Drop { selector: ".sharedaddy, .jp-relatedposts, .see-more, .archive-link".into() },
    ]
}

fn site_redactions() -> Vec<Redaction> {
    vec![Redaction::remove("catholicireland.net"), Redaction::remove("Catholic Ireland")]
}

fn readings(key: &str, feature: &str, lang: &str, staleness: StalenessRule) -> SourceSpec {
    SourceSpec {
        key: key.into(),
        url: READINGS_URL.into(),
        query: vec![("feature".into(), feature.into()), ("lang".into(), lang.into())],
        headers: BTreeMap::new(),
        selector: SelectorRule::new("div.entry-content"),
        profile: NormalizationProfile { rules: site_profile(), redact: site_redactions() },
        staleness,
    }
}

/// The content keys served out of the box.
pub fn default_sources() -> Vec<SourceSpec> {
    let mut homily_rules = site_profile();
    homily_rules.push(RewriteRule::PlainTitle { selector: "h1, h2, h3".into(), tag: None });
    homily_rules.push(RewriteRule::image_blocks());

    let mut saint_rules = site_profile();
    saint_rules.push(RewriteRule::PlainTitle { selector: "h1, h2, h3".into(), tag: None });
    saint_rules.push(RewriteRule::image_blocks());

    vec![
        SourceSpec {
            key: "sunday_homily".into(),
            url: "https://www.catholicireland.net/sunday-homily/".into(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            selector: SelectorRule::new("div.entry-content"),
            profile: NormalizationProfile { rules: homily_rules, redact: site_redactions() },
            staleness: StalenessRule::WeeklyRollover,
        },
        readings("daily_readings", "today", "english", StalenessRule::DailyRollover),
        readings("daily_readings_irish", "today", "irish", StalenessRule::DailyRollover),
        readings("sunday_readings", "sunday", "english", StalenessRule::WeeklyRollover),
        readings("sunday_readings_irish", "sunday", "irish", StalenessRule::WeeklyRollover),
        SourceSpec {
            key: "saint_of_the_day".into(),
            url: "https://www.catholicireland.net/saint-day/".into(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            selector: SelectorRule::new("div.entry-content"),
            profile: NormalizationProfile { rules: saint_rules, redact: site_redactions() },
            staleness: StalenessRule::DailyRollover,
        },
    ]
}
