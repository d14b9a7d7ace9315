//! Case-insensitive literal redaction.

use std::borrow::Cow;

use missal_core::config::Redaction;
use regex::{NoExpand, Regex, RegexBuilder};

/// Compiled set of redactions, applied in configuration order.
#[derive(Debug, Default)]
pub struct Redactor {
    patterns: Vec<(Regex, String)>,
}

impl Redactor {
    pub fn new(redactions: &[Redaction]) -> Self {
        let patterns = redactions
            .iter()
            .filter(|r| !r.pattern.is_empty())
            .filter_map(|r| {
                RegexBuilder::new(&regex::escape(&r.pattern))
                    .case_insensitive(true)
                    .build()
                    .ok()
                    .map(|re| (re, r.replacement.clone()))
            })
            .collect();
        Self { patterns }
    }

    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(text);
        for (re, replacement) in &self.patterns {
            if let Cow::Owned(replaced) = re.replace_all(&out, NoExpand(replacement)) {
                out = Cow::Owned(replaced);
            }
        }
        out
    }

    /// Redact across `segments` as if they were one string.
    ///
    /// Matches may span segment boundaries. A replacement lands in the segment
    /// where its match starts; the rest of the match is removed from the
    /// segments it runs into.
    pub fn apply_across(&self, segments: &mut [String]) {
        for (re, replacement) in &self.patterns {
            let joined = segments.concat();
            let matches: Vec<(usize, usize)> = re.find_iter(&joined).map(|m| (m.start(), m.end())).collect();
            if matches.is_empty() {
                continue;
            }

            let mut offset = 0;
            for segment in segments.iter_mut() {
                let (start, end) = (offset, offset + segment.len());
                offset = end;

                let mut out = String::with_capacity(segment.len());
                let mut pos = start;
                for &(m_start, m_end) in &matches {
                    if m_end <= start || m_start >= end {
                        continue;
                    }
                    out.push_str(&joined[pos..m_start.max(start)]);
                    if m_start >= start {
                        out.push_str(replacement);
                    }
                    pos = m_end.min(end);
                }
                out.push_str(&joined[pos..end]);
                *segment = out;
            }
        }
    }
}
