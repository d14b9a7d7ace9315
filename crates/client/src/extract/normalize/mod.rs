//! Fragment normalization.
//!
//! Turns an extracted [`Fragment`] into a [`ContentValue`]:
//!
//! 1. Comments and `script`, `style`, `iframe`, `frame` and `noscript`
//!    elements are always removed.
//! 2. The profile's [`RewriteRule`]s run in order. Once a rule has removed or
//!    replaced a node, later rules never see it or its descendants.
//! 3. Redactions are applied to text and to generated text. Text is redacted
//!    per inline run, so a phrase split across inline markup such as
//!    `Catholic <b>Ireland</b>` is still caught.
//!
//! A rule that can't be applied (target absent, title without a link, image
//! without a source) is skipped with a [`NormalizationWarning`]; the rest of
//! the profile still runs. Output is byte-identical for identical input.

mod images;
mod markup;
mod redact;

use missal_core::ContentValue;
use missal_core::cache::hash::content_digest;
use missal_core::config::{NormalizationProfile, RewriteRule};
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use self::images::{ImageBlock, ImageSettings};
use self::redact::Redactor;
use super::Fragment;

/// Elements removed from every fragment.
const STRIPPED: &[&str] = &["script", "style", "iframe", "frame", "noscript"];

/// Elements that start a new line in the plain-text rendering.
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// A rule that was skipped, in whole or for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationWarning {
    pub rule: String,
    pub message: String,
}

/// Normalizer output plus whatever was skipped along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub value: ContentValue,
    pub warnings: Vec<NormalizationWarning>,
}

/// Normalize `fragment` with `profile`, discarding warnings.
pub fn normalize(fragment: &Fragment, profile: &NormalizationProfile) -> ContentValue {
    normalize_with_warnings(fragment, profile).value
}

pub fn normalize_with_warnings(fragment: &Fragment, profile: &NormalizationProfile) -> Normalized {
    let mut warnings = Vec::new();
    let rules = compile(&profile.rules, &mut warnings);

    let mut renderer = Renderer {
        rules,
        redactor: Redactor::new(&profile.redact),
        base_url: &fragment.base_url,
        html: String::with_capacity(fragment.html.len()),
        text: String::new(),
        run: Vec::new(),
        warnings,
    };

    let parsed = Html::parse_fragment(&fragment.html);
    renderer.children(parsed.root_element());
    renderer.flush();

    for rule in &renderer.rules {
        if rule.hits == 0 && rule.targets_selector() {
            renderer.warnings.push(NormalizationWarning {
                rule: rule.source.name().to_string(),
                message: format!("no node matches `{}`", rule.selector_text()),
            });
        }
    }

    for warning in &renderer.warnings {
        tracing::debug!(rule = %warning.rule, "normalization rule skipped: {}", warning.message);
    }

    let text = renderer
        .text
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let digest = content_digest(&renderer.html);
    Normalized { value: ContentValue { html: renderer.html, text, digest }, warnings: renderer.warnings }
}

enum Compiled<'p> {
    Drop(Selector),
    PlainTitle { selector: Selector, tag: Option<&'p str> },
    ImageBlocks(ImageSettings<'p>),
}

struct ActiveRule<'p> {
    source: &'p RewriteRule,
    compiled: Compiled<'p>,
    hits: usize,
}

impl ActiveRule<'_> {
    fn targets_selector(&self) -> bool {
        !matches!(self.compiled, Compiled::ImageBlocks(_))
    }

    fn selector_text(&self) -> &str {
        match self.source {
            RewriteRule::Drop { selector } | RewriteRule::PlainTitle { selector, .. } => selector,
            RewriteRule::ImageBlocks { .. } => "img",
        }
    }
}

fn compile<'p>(rules: &'p [RewriteRule], warnings: &mut Vec<NormalizationWarning>) -> Vec<ActiveRule<'p>> {
    let mut active = Vec::with_capacity(rules.len());
    for rule in rules {
        let mut skip = |message: String| {
            warnings.push(NormalizationWarning { rule: rule.name().to_string(), message });
        };

        let compiled = match rule {
            RewriteRule::Drop { selector } => match Selector::parse(selector) {
                Ok(sel) => Compiled::Drop(sel),
                Err(e) => {
                    skip(format!("invalid selector `{selector}`: {e}"));
                    continue;
                }
            },
            RewriteRule::PlainTitle { selector, tag } => {
                if let Some(tag) = tag
                    && (tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric()))
                {
                    skip(format!("invalid title tag {tag:?}"));
                    continue;
                }
                match Selector::parse(selector) {
                    Ok(sel) => Compiled::PlainTitle { selector: sel, tag: tag.as_deref() },
                    Err(e) => {
                        skip(format!("invalid selector `{selector}`: {e}"));
                        continue;
                    }
                }
            }
            RewriteRule::ImageBlocks { default_width, default_height, widths } => {
                if *default_width == 0 || *default_height == 0 {
                    skip("default dimensions must be non-zero".to_string());
                    continue;
                }
                Compiled::ImageBlocks(ImageSettings {
                    default_width: *default_width,
                    default_height: *default_height,
                    widths,
                })
            }
        };
        active.push(ActiveRule { source: rule, compiled, hits: 0 });
    }
    active
}

/// Pending output of an inline run.
enum Piece {
    Text(String),
    Markup(String),
}

/// What a rule does to one element.
enum Outcome {
    Drop,
    Title { tag: String, text: String },
    Image(ImageBlock),
    /// The rule targets this element but can't rewrite it.
    Skipped(String),
}

struct Renderer<'p> {
    rules: Vec<ActiveRule<'p>>,
    redactor: Redactor,
    base_url: &'p Url,
    html: String,
    text: String,
    run: Vec<Piece>,
    warnings: Vec<NormalizationWarning>,
}

impl Renderer<'_> {
    fn children(&mut self, parent: ElementRef<'_>) {
        for child in parent.children() {
            match child.value() {
                Node::Text(text) => self.text_node(text),
                Node::Element(_) => {
                    if let Some(element) = ElementRef::wrap(child) {
                        self.element(element);
                    }
                }
                _ => {}
            }
        }
    }

    fn text_node(&mut self, text: &str) {
        self.run.push(Piece::Text(text.to_string()));
    }

    fn inline_markup(&mut self, write: impl FnOnce(&mut String)) {
        let mut out = String::new();
        write(&mut out);
        self.run.push(Piece::Markup(out));
    }

    /// Redact the pending inline run as one text and write it out.
    fn flush(&mut self) {
        if self.run.is_empty() {
            return;
        }
        let run = std::mem::take(&mut self.run);

        let mut texts: Vec<String> = run
            .iter()
            .filter_map(|piece| match piece {
                Piece::Text(text) => Some(text.clone()),
                Piece::Markup(_) => None,
            })
            .collect();
        self.redactor.apply_across(&mut texts);

        let mut texts = texts.into_iter();
        for piece in run {
            match piece {
                Piece::Markup(tags) => self.html.push_str(&tags),
                Piece::Text(_) => {
                    let text = texts.next().unwrap_or_default();
                    markup::escape_text(&mut self.html, &text);
                    self.text.push_str(&text);
                }
            }
        }
    }

    fn element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        if STRIPPED.contains(&name) {
            return;
        }

        let mut next = 0;
        while let Some((index, outcome)) = self.first_outcome(element, next) {
            next = index + 1;
            self.rules[index].hits += 1;
            match outcome {
                Outcome::Drop => return,
                Outcome::Title { tag, text } => {
                    self.flush();
                    let text = self.redactor.apply(&text).into_owned();
                    markup::open_tag(&mut self.html, &tag, std::iter::empty::<(&str, &str)>());
                    markup::escape_text(&mut self.html, &text);
                    markup::close_tag(&mut self.html, &tag);
                    self.text.push('\n');
                    self.text.push_str(&text);
                    self.text.push('\n');
                    return;
                }
                Outcome::Image(block) => {
                    self.flush();
                    images::render(&mut self.html, &block, &self.redactor);
                    return;
                }
                Outcome::Skipped(message) => {
                    let rule = self.rules[index].source.name().to_string();
                    self.warnings.push(NormalizationWarning { rule, message });
                }
            }
        }

        if !BLOCKS.contains(&name) {
            self.inline_markup(|out| markup::open_tag(out, name, element.value().attrs()));
            if !markup::is_void(name) {
                self.children(element);
                self.inline_markup(|out| markup::close_tag(out, name));
            }
            return;
        }

        self.flush();
        self.text.push('\n');
        markup::open_tag(&mut self.html, name, element.value().attrs());
        if !markup::is_void(name) {
            self.children(element);
            self.flush();
            markup::close_tag(&mut self.html, name);
        }
        self.text.push('\n');
    }

    /// First rule at or after `from` with something to say about `element`.
    fn first_outcome(&self, element: ElementRef<'_>, from: usize) -> Option<(usize, Outcome)> {
        self.rules
            .iter()
            .enumerate()
            .skip(from)
            .find_map(|(index, rule)| self.outcome(rule, element).map(|outcome| (index, outcome)))
    }

    fn outcome(&self, rule: &ActiveRule<'_>, element: ElementRef<'_>) -> Option<Outcome> {
        match &rule.compiled {
            Compiled::Drop(selector) => selector.matches(&element).then_some(Outcome::Drop),
            Compiled::PlainTitle { selector, tag } => {
                selector.matches(&element).then(|| plain_title(element, *tag))
            }
            Compiled::ImageBlocks(settings) => {
                if element.value().name() != "img" || inside_image_block(element) {
                    return None;
                }
                Some(match images::build(element.value(), self.base_url, *settings) {
                    Ok(block) => Outcome::Image(block),
                    Err(reason) => Outcome::Skipped(reason),
                })
            }
        }
    }
}

fn plain_title(element: ElementRef<'_>, tag: Option<&str>) -> Outcome {
    static LINK: std::sync::LazyLock<Selector> =
        std::sync::LazyLock::new(|| Selector::parse("a").expect("BUG: hardcoded selector 'a' is invalid"));

    let name = element.value().name();
    let link = if name == "a" { Some(element) } else { element.select(&LINK).next() };
    let Some(link) = link else {
        return Outcome::Skipped(format!("<{name}> title has no link"));
    };

    let text = link.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return Outcome::Skipped(format!("<{name}> title link has no text"));
    }

    let tag = tag.unwrap_or(if name == "a" { "h2" } else { name });
    Outcome::Title { tag: tag.to_string(), text }
}

fn inside_image_block(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "figure" && a.value().classes().any(|c| c == images::BLOCK_CLASS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use missal_core::config::Redaction;

    fn fragment(html: &str) -> Fragment {
        Fragment { html: html.to_string(), base_url: Url::parse("https://www.example.com/saint-day/").unwrap() }
    }

    fn profile(rules: Vec<RewriteRule>) -> NormalizationProfile {
        NormalizationProfile { rules, redact: vec![] }
    }

    #[test]
    fn test_always_strips_scripts_styles_and_comments() {
        let value = normalize(
            &fragment(
                "<div><!-- tracking --><script>var x = 1;</script><style>p{}</style>\
                 <p>Reading</p><iframe src=\"/ad\"></iframe><noscript>enable js</noscript></div>",
            ),
            &NormalizationProfile::default(),
        );
        assert_eq!(value.html, "<div><p>Reading</p></div>");
        assert_eq!(value.text, "Reading");
    }

    #[test]
    fn test_drop_rule_removes_subtree() {
        let value = normalize(
            &fragment("<div><p class=\"entry-meta\">Posted <b>today</b></p><p>Body</p></div>"),
            &profile(vec![RewriteRule::Drop { selector: ".entry-meta".into() }]),
        );
        assert_eq!(value.html, "<div><p>Body</p></div>");
        assert!(!value.text.contains("today"));
    }

    #[test]
    fn test_plain_title_keeps_only_link_text() {
        let value = normalize(
            &fragment(
                "<div><h2 class=\"t\"><span>12 Mar</span> <a href=\"/st-patrick\">St  Patrick</a></h2><p>Bishop</p></div>",
            ),
            &profile(vec![RewriteRule::PlainTitle { selector: "h2".into(), tag: None }]),
        );
        assert_eq!(value.html, "<div><h2>St Patrick</h2><p>Bishop</p></div>");
        assert_eq!(value.text, "St Patrick\nBishop");
    }

    #[test]
    fn test_plain_title_with_explicit_tag() {
        let value = normalize(
            &fragment("<div><a class=\"title\" href=\"/x\">Homily</a></div>"),
            &profile(vec![RewriteRule::PlainTitle { selector: "a.title".into(), tag: Some("h3".into()) }]),
        );
        assert_eq!(value.html, "<div><h3>Homily</h3></div>");
    }

    #[test]
    fn test_image_blocks() {
        let value = normalize(
            &fragment("<div><p><img src=\"/uploads/brigid-150x150.jpg\" width=\"600\" height=\"400\" alt=\"St Brigid\"></p></div>"),
            &profile(vec![RewriteRule::image_blocks()]),
        );
        assert!(value.html.contains("<figure class=\"missal-image\" style=\"max-width:600px;margin:0 auto\">"));
        assert!(value.html.contains("aspect-ratio:600/400"));
        assert!(value.html.contains("width=\"600\""));
        assert!(value.html.contains("height=\"400\""));
        assert!(value.html.contains(
            "srcset=\"https://www.example.com/uploads/brigid-300x200.jpg 300w, \
             https://www.example.com/uploads/brigid.jpg 600w\""
        ));
        assert!(value.html.contains("sizes=\"(max-width: 600px) 100vw, 600px\""));
    }

    #[test]
    fn test_redaction_is_case_insensitive_everywhere() {
        let mut profile = profile(vec![
            RewriteRule::PlainTitle { selector: "h2".into(), tag: None },
            RewriteRule::image_blocks(),
        ]);
        profile.redact = vec![Redaction::remove("Catholic Ireland")];

        let value = normalize(
            &fragment(
                "<div><h2><a href=\"/\">Saint of the day | CATHOLIC IRELAND</a></h2>\
                 <p>From catholic ireland.</p><img src=\"/a.jpg\" alt=\"Catholic Ireland logo\"></div>",
            ),
            &profile,
        );
        assert!(!value.html.to_lowercase().contains("catholic ireland"));
        assert!(!value.text.to_lowercase().contains("catholic ireland"));
        assert!(value.html.contains("<p>From .</p>"));
    }

    #[test]
    fn test_redaction_spans_inline_markup() {
        let profile = NormalizationProfile { rules: vec![], redact: vec![Redaction::remove("Catholic Ireland")] };

        let value = normalize(
            &fragment("<div><p>Catholic <b>Ireland</b> homily</p><p>Catholic</p><p>Ireland</p></div>"),
            &profile,
        );
        assert_eq!(value.html, "<div><p><b></b> homily</p><p>Catholic</p><p>Ireland</p></div>");
        assert_eq!(value.text, "homily\nCatholic\nIreland");
    }

    #[test]
    fn test_missing_targets_warn_and_continue() {
        let normalized = normalize_with_warnings(
            &fragment("<div><h2>No link here</h2><div class=\"sharedaddy\">Share</div><p>Body</p></div>"),
            &profile(vec![
                RewriteRule::Drop { selector: ".breadcrumbs".into() },
                RewriteRule::PlainTitle { selector: "h2".into(), tag: None },
                RewriteRule::Drop { selector: ".sharedaddy".into() },
            ]),
        );

        assert_eq!(normalized.value.html, "<div><h2>No link here</h2><p>Body</p></div>");
        let rules: Vec<_> = normalized.warnings.iter().map(|w| w.rule.as_str()).collect();
        assert!(rules.contains(&"plain_title"));
        assert!(rules.contains(&"drop"));
        assert_eq!(normalized.warnings.len(), 2);
    }

    #[test]
    fn test_invalid_rule_is_skipped() {
        let normalized = normalize_with_warnings(
            &fragment("<div><p>Body</p></div>"),
            &profile(vec![RewriteRule::Drop { selector: "p[[".into() }]),
        );
        assert_eq!(normalized.value.html, "<div><p>Body</p></div>");
        assert_eq!(normalized.warnings.len(), 1);
    }

    #[test]
    fn test_earlier_rule_wins() {
        let value = normalize(
            &fragment("<div><h2 class=\"x\"><a href=\"/\">Title</a></h2></div>"),
            &profile(vec![
                RewriteRule::PlainTitle { selector: "h2".into(), tag: None },
                RewriteRule::Drop { selector: "h2.x".into() },
            ]),
        );
        assert_eq!(value.html, "<div><h2>Title</h2></div>");
    }

    #[test]
    fn test_deterministic_output() {
        let profile = missal_core::config::default_sources()
            .into_iter()
            .find(|s| s.key == "saint_of_the_day")
            .unwrap()
            .profile;
        let input = fragment(
            "<div class=\"entry-content\"><div class=\"entry-meta\">Posted</div>\
             <h2><a href=\"/s\">St Columba</a></h2><img src=\"/c-300x200.jpg\" data-x=\"1\" class=\"wp\">\
             <p>Abbot &amp; missionary</p><div class=\"sharedaddy\">Share</div></div>",
        );

        let a = normalize(&input, &profile);
        let b = normalize(&input, &profile);
        assert_eq!(a, b);
        assert_eq!(a.digest, content_digest(&a.html));
        assert!(a.html.contains("Abbot &amp; missionary"));
    }

    #[test]
    fn test_normalizing_output_is_stable() {
        let profile = missal_core::config::default_sources()
            .into_iter()
            .find(|s| s.key == "sunday_homily")
            .unwrap()
            .profile;
        let first = normalize(
            &fragment(
                "<div class=\"entry-content\"><h1><a href=\"/h\">Homily</a></h1>\
                 <p>Text &lt;here&gt; with \"quotes\"</p><img src=\"/img/h.png\" width=\"900\" height=\"600\"></div>",
            ),
            &profile,
        );
        let second = normalize(&fragment(&first.html), &profile);
        assert_eq!(first.html, second.html);
        assert_eq!(first.digest, second.digest);
    }
}
