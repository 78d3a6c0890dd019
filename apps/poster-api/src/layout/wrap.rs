//! Width-driven line breaking for Latin, CJK and mixed text.
//!
//! Every line is a contiguous slice of the input and separators stay at the
//! end of the line they follow, so joining the lines gives back the input.
//! Widths are always measured with trailing whitespace trimmed.
//!
//! # Strategy per remaining text
//! 1. Fits → last line.
//! 2. CJK-dominant or data text longer than 15 chars → sentence end, then the
//!    widest fitting soft break, then the longest fitting character prefix.
//! 3. Contains whitespace → greedy words.
//! 4. Otherwise → greedy characters.

use crate::layout::font_metrics::{FontDescriptor, MeasureError, TextMeasure};
use crate::layout::style::{FragmentKind, Role};

pub const ELLIPSIS: &str = "…";

/// Above this many characters, CJK and data text use punctuation-aware breaks.
const PUNCTUATION_WRAP_MIN_CHARS: usize = 15;

const SENTENCE_ENDS: &[char] = &['。', '！', '？', '；', '…', '!', '?', ';', '.'];
const CLOSERS: &[char] = &['"', '”', '\'', '’', '）', ')', '」', '』', '》', '】'];
const SOFT_BREAKS: &[char] = &[
    '，', '、', ',', '：', ':', '）', ')', '」', '』', '》', '】', '"', '”', '\'', '’', '%', '％',
    '万', '亿', '元', '个', '年', '月', '日', '倍', ' ',
];

// ────────────────────────────────────────────────────────────────────────────
// Script classification
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptMix {
    Latin,
    Mixed,
    CjkDominant,
}

/// Han, kana, hangul, CJK punctuation and full-width forms.
pub fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3000..=0x303F
        | 0x3040..=0x30FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7AF
        | 0xF900..=0xFAFF
        | 0xFF00..=0xFFEF
        | 0x20000..=0x2A6DF)
}

/// CJK-dominant when CJK codepoints are more than half of all codepoints.
pub fn classify_script(text: &str) -> ScriptMix {
    let (cjk, total) = text
        .chars()
        .fold((0usize, 0usize), |(cjk, total), c| {
            (cjk + usize::from(is_cjk(c)), total + 1)
        });
    if cjk == 0 {
        ScriptMix::Latin
    } else if cjk * 2 > total {
        ScriptMix::CjkDominant
    } else {
        ScriptMix::Mixed
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wrapping
// ────────────────────────────────────────────────────────────────────────────

struct Fitter<'a> {
    max_width: f32,
    font: &'a FontDescriptor<'a>,
    measure: &'a dyn TextMeasure,
}

impl Fitter<'_> {
    fn fits(&self, s: &str) -> Result<bool, MeasureError> {
        Ok(self.measure.measure(s.trim_end(), self.font)? <= self.max_width)
    }

    /// Byte length of the longest fitting prefix, never less than one char.
    fn char_prefix(&self, rest: &str) -> Result<usize, MeasureError> {
        let mut boundaries = rest.char_indices().map(|(i, c)| i + c.len_utf8());
        let mut best = boundaries.next().unwrap_or(rest.len());
        for end in boundaries {
            if !self.fits(&rest[..end])? {
                break;
            }
            best = end;
        }
        Ok(best)
    }

    /// Break after a whitespace run; falls back to characters when the first
    /// word alone is too wide.
    fn word_prefix(&self, rest: &str) -> Result<usize, MeasureError> {
        let mut best = None;
        for end in whitespace_run_ends(rest) {
            if end >= rest.len() || !self.fits(&rest[..end])? {
                break;
            }
            best = Some(end);
        }
        match best {
            Some(end) => Ok(end),
            None => self.char_prefix(rest),
        }
    }

    fn punctuation_prefix(&self, rest: &str) -> Result<usize, MeasureError> {
        if let Some(end) = first_sentence_end(rest) {
            if end < rest.len() && self.fits(&rest[..end])? {
                return Ok(end);
            }
        }
        let mut best = None;
        for (i, c) in rest.char_indices() {
            if !SOFT_BREAKS.contains(&c) {
                continue;
            }
            let end = i + c.len_utf8();
            if end >= rest.len() || !self.fits(&rest[..end])? {
                break;
            }
            best = Some(end);
        }
        match best {
            Some(end) => Ok(end),
            None => self.char_prefix(rest),
        }
    }
}

/// Byte offsets just past each run of whitespace.
fn whitespace_run_ends(s: &str) -> impl Iterator<Item = usize> + '_ {
    let mut chars = s.char_indices().peekable();
    std::iter::from_fn(move || {
        while let Some((i, c)) = chars.next() {
            let next_is_space = chars.peek().is_some_and(|(_, n)| n.is_whitespace());
            if c.is_whitespace() && !next_is_space {
                return Some(i + c.len_utf8());
            }
        }
        None
    })
}

/// Offset just past the first sentence-ending mark and any closing quotes or
/// brackets after it. ASCII '.' only ends a sentence before whitespace.
fn first_sentence_end(s: &str) -> Option<usize> {
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !SENTENCE_ENDS.contains(&c) {
            continue;
        }
        if c == '.' && !chars.peek().is_some_and(|(_, n)| n.is_whitespace()) {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, n)) = chars.peek() {
            if !CLOSERS.contains(&n) {
                break;
            }
            end = j + n.len_utf8();
            chars.next();
        }
        return Some(end);
    }
    None
}

/// Breaks `text` into lines no wider than `max_width` wherever the text
/// allows it. A single character wider than the budget stands alone.
pub fn wrap_text(
    text: &str,
    max_width: f32,
    kind: FragmentKind,
    font: &FontDescriptor<'_>,
    measure: &dyn TextMeasure,
) -> Result<Vec<String>, MeasureError> {
    let fitter = Fitter {
        max_width,
        font,
        measure,
    };
    let punctuation_role = kind.role() == Role::Data;
    let mut lines = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        if fitter.fits(rest)? {
            lines.push(rest.to_string());
            break;
        }
        let long = rest.chars().count() > PUNCTUATION_WRAP_MIN_CHARS;
        let cut = if long && (punctuation_role || classify_script(rest) == ScriptMix::CjkDominant)
        {
            fitter.punctuation_prefix(rest)?
        } else if rest.contains(char::is_whitespace) {
            fitter.word_prefix(rest)?
        } else {
            fitter.char_prefix(rest)?
        };
        let (line, tail) = rest.split_at(cut);
        lines.push(line.to_string());
        rest = tail;
    }
    Ok(lines)
}

// ────────────────────────────────────────────────────────────────────────────
// Truncation
// ────────────────────────────────────────────────────────────────────────────

/// Longest prefix of `text` plus an ellipsis that fits `budget`. Text that
/// already fits is returned unchanged; the bare ellipsis is the last resort.
pub fn truncate_to_width(
    text: &str,
    budget: f32,
    font: &FontDescriptor<'_>,
    measure: &dyn TextMeasure,
) -> Result<String, MeasureError> {
    if measure.measure(text.trim_end(), font)? <= budget {
        return Ok(text.to_string());
    }
    let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let candidate = |n: usize| {
        let prefix = text[..boundaries.get(n).copied().unwrap_or(text.len())].trim_end();
        format!("{prefix}{ELLIPSIS}")
    };

    // Largest n in [0, chars) such that candidate(n) fits.
    let (mut lo, mut hi) = (0usize, boundaries.len());
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if measure.measure(&candidate(mid), font)? <= budget {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(candidate(lo))
}

/// Keeps the first `keep` lines and marks the cut with an ellipsis on the last
/// kept line, truncating that line further if the ellipsis overflows it.
pub fn ellipsize_prefix(
    lines: &[String],
    keep: usize,
    budget: f32,
    font: &FontDescriptor<'_>,
    measure: &dyn TextMeasure,
) -> Result<Vec<String>, MeasureError> {
    let keep = keep.clamp(1, lines.len().max(1));
    if keep >= lines.len() {
        return Ok(lines.to_vec());
    }
    let mut kept = lines[..keep].to_vec();
    if let Some(last) = kept.last_mut() {
        let marked = format!("{}{ELLIPSIS}", last.trim_end());
        *last = if measure.measure(&marked, font)? <= budget {
            marked
        } else {
            truncate_to_width(&marked, budget, font, measure)?
        };
    }
    Ok(kept)
}
