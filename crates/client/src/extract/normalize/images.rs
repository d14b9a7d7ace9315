//! Responsive image blocks.
//!
//! Each `<img>` becomes a `<figure class="missal-image">` holding an image with
//! explicit dimensions, a fluid inline style and a `srcset` built from the
//! site's `name-{w}x{h}.ext` resize convention. The unsuffixed `name.ext` is
//! the candidate for the displayed width.

use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Element;
use url::Url;

use super::markup;
use super::redact::Redactor;

pub const BLOCK_CLASS: &str = "missal-image";

static SIZED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<stem>.+?)(?:-\d+x\d+)?\.(?P<ext>[A-Za-z0-9]+)$")
        .expect("BUG: hardcoded image name pattern is invalid")
});

#[derive(Debug, Clone, Copy)]
pub struct ImageSettings<'a> {
    pub default_width: u32,
    pub default_height: u32,
    pub widths: &'a [u32],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlock {
    pub src: String,
    pub alt: String,
    pub width: u32,
    pub height: u32,
    pub srcset: Option<String>,
}

fn dimension(value: Option<&str>) -> Option<u32> {
    let value = value?.trim();
    let value = value.strip_suffix("px").unwrap_or(value);
    value.parse::<u32>().ok().filter(|v| *v > 0)
}

/// `round(w * height / width)` without floating point.
fn scaled_height(w: u32, width: u32, height: u32) -> u32 {
    let (w, width, height) = (u64::from(w), u64::from(width), u64::from(height));
    let scaled = (2 * w * height + width) / (2 * width);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

fn sibling(src: &Url, name: &str) -> Option<Url> {
    let path = src.path();
    let dir = &path[..=path.rfind('/')?];
    let mut url = src.clone();
    url.set_path(&format!("{dir}{name}"));
    url.set_query(None);
    url.set_fragment(None);
    Some(url)
}

fn srcset(src: &Url, width: u32, height: u32, widths: &[u32]) -> Option<String> {
    let name = src.path_segments()?.next_back()?;
    let caps = SIZED_NAME.captures(name)?;
    let (stem, ext) = (&caps["stem"], &caps["ext"]);

    let mut widths: Vec<u32> = widths.iter().copied().filter(|w| *w > 0 && *w < width).collect();
    widths.sort_unstable();
    widths.dedup();

    let mut candidates = Vec::with_capacity(widths.len() + 1);
    for w in widths {
        let h = scaled_height(w, width, height);
        let url = sibling(src, &format!("{stem}-{w}x{h}.{ext}"))?;
        candidates.push(format!("{url} {w}w"));
    }
    let full = sibling(src, &format!("{stem}.{ext}"))?;
    candidates.push(format!("{full} {width}w"));
    Some(candidates.join(", "))
}

/// Build the block for `img`, or say why it can't be built.
pub fn build(img: &Element, base: &Url, settings: ImageSettings<'_>) -> Result<ImageBlock, String> {
    let raw = img
        .attr("src")
        .or_else(|| img.attr("data-src"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "image has no src".to_string())?;

    let src = base
        .join(raw)
        .map_err(|e| format!("image src {raw:?} does not resolve: {e}"))?;

    let width = dimension(img.attr("width")).unwrap_or(settings.default_width);
    let height = dimension(img.attr("height")).unwrap_or(settings.default_height);
    let alt = img.attr("alt").or_else(|| img.attr("title")).unwrap_or_default().trim().to_string();

    Ok(ImageBlock { srcset: srcset(&src, width, height, settings.widths), src: src.to_string(), alt, width, height })
}

/// Serialize `block`, redacting its alt text.
pub fn render(out: &mut String, block: &ImageBlock, redactor: &Redactor) {
    let figure_style = format!("max-width:{}px;margin:0 auto", block.width);
    markup::open_tag(out, "figure", [("class", BLOCK_CLASS), ("style", figure_style.as_str())]);

    let alt = redactor.apply(&block.alt);
    let width = block.width.to_string();
    let height = block.height.to_string();
    let style = format!("width:100%;height:auto;aspect-ratio:{}/{}", block.width, block.height);
    let sizes = format!("(max-width: {0}px) 100vw, {0}px", block.width);

    let mut attrs = vec![
        ("src", block.src.as_str()),
        ("alt", &*alt),
        ("width", width.as_str()),
        ("height", height.as_str()),
        ("style", style.as_str()),
        ("loading", "lazy"),
        ("decoding", "async"),
    ];
    if let Some(srcset) = &block.srcset {
        attrs.push(("srcset", srcset.as_str()));
        attrs.push(("sizes", sizes.as_str()));
    }
    markup::open_tag(out, "img", attrs);
    markup::close_tag(out, "figure");
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const SETTINGS: ImageSettings<'static> = ImageSettings { default_width: 800, default_height: 533, widths: &[300, 768, 1024] };

    fn img(markup: &str) -> Element {
        let html = Html::parse_fragment(markup);
        let selector = scraper::Selector::parse("img").unwrap();
        html.select(&selector).next().unwrap().value().clone()
    }

    fn base() -> Url {
        Url::parse("https://www.example.com/saint-day/").unwrap()
    }

    #[test]
    fn test_srcset_strips_size_suffix() {
        let block = build(
            &img(r#"<img src="/wp-content/uploads/patrick-600x400.jpg" width="1200" height="800">"#),
            &base(),
            SETTINGS,
        )
        .unwrap();

        assert_eq!(block.src, "https://www.example.com/wp-content/uploads/patrick-600x400.jpg");
        assert_eq!(
            block.srcset.as_deref(),
            Some(
                "https://www.example.com/wp-content/uploads/patrick-300x200.jpg 300w, \
                 https://www.example.com/wp-content/uploads/patrick-768x512.jpg 768w, \
                 https://www.example.com/wp-content/uploads/patrick-1024x683.jpg 1024w, \
                 https://www.example.com/wp-content/uploads/patrick.jpg 1200w"
            )
        );
    }

    #[test]
    fn test_thumbnail_src_lists_full_size_at_display_width() {
        let block = build(&img(r#"<img src="/a/b-150x150.jpg">"#), &base(), SETTINGS).unwrap();

        assert_eq!(block.src, "https://www.example.com/a/b-150x150.jpg");
        assert_eq!(
            block.srcset.as_deref(),
            Some(
                "https://www.example.com/a/b-300x200.jpg 300w, \
                 https://www.example.com/a/b-768x512.jpg 768w, \
                 https://www.example.com/a/b.jpg 800w"
            )
        );
    }

    #[test]
    fn test_defaults_when_dimensions_missing() {
        let block = build(&img(r#"<img src="saint.png" alt="St. Brigid">"#), &base(), SETTINGS).unwrap();
        assert_eq!((block.width, block.height), (800, 533));
        assert_eq!(block.src, "https://www.example.com/saint-day/saint.png");
        assert_eq!(block.alt, "St. Brigid");
        assert!(block.srcset.as_deref().unwrap().contains("saint-768x512.png 768w"));
        assert!(!block.srcset.as_deref().unwrap().contains("1024w"));
    }

    #[test]
    fn test_lazy_src_and_px_dimensions() {
        let block = build(&img(r#"<img data-src="/a.jpg" width="400px" height="0">"#), &base(), SETTINGS).unwrap();
        assert_eq!((block.width, block.height), (400, 533));
        assert_eq!(block.src, "https://www.example.com/a.jpg");
    }

    #[test]
    fn test_missing_src_is_reported() {
        assert!(build(&img(r#"<img alt="nothing">"#), &base(), SETTINGS).is_err());
    }

    #[test]
    fn test_no_extension_means_no_srcset() {
        let block = build(&img(r#"<img src="/image?id=4">"#), &base(), SETTINGS).unwrap();
        assert_eq!(block.srcset, None);
    }

    #[test]
    fn test_render_block() {
        let block = ImageBlock {
            src: "https://x.test/a.jpg".into(),
            alt: "A".into(),
            width: 300,
            height: 200,
            srcset: None,
        };
        let mut out = String::new();
        render(&mut out, &block, &Redactor::default());
        assert_eq!(
            out,
            "<figure class=\"missal-image\" style=\"max-width:300px;margin:0 auto\">\
             <img alt=\"A\" decoding=\"async\" height=\"200\" loading=\"lazy\" src=\"https://x.test/a.jpg\" \
             style=\"width:100%;height:auto;aspect-ratio:300/200\" width=\"300\"></figure>"
        );
    }
}
