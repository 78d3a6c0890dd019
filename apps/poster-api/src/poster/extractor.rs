//! Parses copywriter output into `Fragments`.
//!
//! The expected format is a sequence of bracket-tagged sections:
//!
//! ```text
//! [主题凝练] 守护海洋
//! [震撼标语] 每一滴水都值得珍惜
//! [视觉隐喻] 一只手托起地球
//! [分层文案]
//! 主：减少一次性塑料
//! 副：从今天开始
//! 数据：每年800万吨塑料进入海洋
//! ```
//!
//! A section runs until the next `[` or the end of the text. The layered
//! section holds `主`/`副`/`数据` labels with full- or half-width colons; when
//! it is missing the labels are searched across the whole text.

use crate::layout::style::{FragmentKind, Fragments};

const TAG_TITLE: &str = "主题凝练";
const TAG_SLOGAN: &str = "震撼标语";
const TAG_METAPHOR: &str = "视觉隐喻";
const TAG_LAYERED: &str = "分层文案";

const LABEL_MAIN: &str = "主";
const LABEL_SUB: &str = "副";
const LABEL_DATA: &str = "数据";

pub const DEFAULT_SUMMARY_CHARS: usize = 50;

pub fn extract_fragments(copy: &str) -> Fragments {
    let mut fragments = Fragments::default();
    if copy.trim().is_empty() {
        return fragments;
    }

    fragments.main_title = section(copy, TAG_TITLE).map(collapse).unwrap_or_default();
    fragments.slogan = section(copy, TAG_SLOGAN).map(collapse).unwrap_or_default();
    fragments.visual_metaphor = section(copy, TAG_METAPHOR).map(collapse).unwrap_or_default();

    let layered = section(copy, TAG_LAYERED).unwrap_or(copy);
    fragments.main_text = labeled(layered, LABEL_MAIN, &[LABEL_SUB, LABEL_DATA])
        .map(collapse)
        .unwrap_or_default();
    fragments.sub_text = labeled(layered, LABEL_SUB, &[LABEL_MAIN, LABEL_DATA])
        .map(collapse)
        .unwrap_or_default();
    fragments.data_text = labeled(layered, LABEL_DATA, &[LABEL_MAIN, LABEL_SUB])
        .map(collapse)
        .unwrap_or_default();

    fragments
}

/// Body of `[tag]` up to the next opening bracket.
fn section<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("[{tag}]");
    let start = text.find(&open)? + open.len();
    let rest = &text[start..];
    let end = rest.find('[').unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Byte range of the first `label：` or `label:` in `text`.
fn find_label(text: &str, label: &str) -> Option<(usize, usize)> {
    [format!("{label}："), format!("{label}:")]
        .iter()
        .filter_map(|needle| text.find(needle.as_str()).map(|i| (i, i + needle.len())))
        .min_by_key(|&(start, _)| start)
}

fn labeled<'a>(text: &'a str, label: &str, stops: &[&str]) -> Option<&'a str> {
    let (_, after) = find_label(text, label)?;
    let rest = &text[after..];
    let end = stops
        .iter()
        .filter_map(|stop| find_label(rest, stop).map(|(start, _)| start))
        .min()
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain-text rendition for previews: the title in 【】, then each present
/// fragment separated by blank lines.
pub fn format_copywriting(fragments: &Fragments) -> String {
    let mut out = String::new();
    if let Some(title) = fragments.get(FragmentKind::MainTitle) {
        out.push_str(&format!("【{title}】\n\n"));
    }
    for kind in [FragmentKind::Slogan, FragmentKind::MainText, FragmentKind::SubText] {
        if let Some(text) = fragments.get(kind) {
            out.push_str(text);
            out.push_str("\n\n");
        }
    }
    if let Some(data) = fragments.get(FragmentKind::DataText) {
        out.push_str(data);
    }
    out
}

/// "title - slogan", else whichever exists, else the main text; cut to
/// `max_chars` characters with a trailing `...`.
pub fn summarize(fragments: &Fragments, max_chars: usize) -> String {
    let title = fragments.get(FragmentKind::MainTitle);
    let slogan = fragments.get(FragmentKind::Slogan);
    let summary = match (title, slogan) {
        (Some(t), Some(s)) => format!("{t} - {s}"),
        (Some(t), None) => t.to_string(),
        (None, Some(s)) => s.to_string(),
        (None, None) => fragments
            .get(FragmentKind::MainText)
            .unwrap_or_default()
            .to_string(),
    };

    if summary.chars().count() <= max_chars {
        return summary;
    }
    let keep = max_chars.saturating_sub(3);
    let mut cut: String = summary.chars().take(keep).collect();
    cut.push_str("...");
    cut
}
