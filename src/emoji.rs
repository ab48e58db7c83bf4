//! Emoji replacement with Twemoji SVG images
//!
//! Headless Chrome on a server rarely ships a color emoji font, so emoji in
//! text content are swapped for `<img>` tags pointing at the Twemoji SVG set
//! and sized by a small inline stylesheet.

/// Base URL of the Twemoji SVG assets
pub const TWEMOJI_BASE: &str = "https://cdn.jsdelivr.net/gh/twitter/twemoji@14.0.2/assets/svg/";

/// Stylesheet prepended to every emojified document
pub const EMOJI_STYLE: &str = "
    .emoji {
      height: 1em;
      width: 1em;
      margin: 0 .05em 0 .1em;
      vertical-align: -0.1em;
    }
  ";

const ZWJ: char = '\u{200D}';
const VS16: char = '\u{FE0F}';
const VS15: char = '\u{FE0E}';
const KEYCAP: char = '\u{20E3}';

/// Replace emoji in `html` and prefix the emoji stylesheet
pub fn emojify(html: &str) -> String {
    format!("<style>{}</style>{}", EMOJI_STYLE, replace_emoji(html))
}

/// Replace emoji in text content, leaving tags and `<style>`/`<script>`
/// bodies untouched
pub fn replace_emoji(html: &str) -> String {
    let chars: Vec<char> = html.chars().collect();
    let mut out = String::with_capacity(html.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '<' {
            let end = find_char(&chars, i, '>').map_or(chars.len(), |e| e + 1);
            let tag: String = chars[i..end].iter().collect();
            out.push_str(&tag);
            i = end;

            if let Some(name) = raw_text_element(&tag) {
                let close = format!("</{}", name);
                let rest: String = chars[i..].iter().collect();
                let body_len = find_ignore_case(&rest, &close).unwrap_or(rest.len());
                let body = &rest[..body_len];
                out.push_str(body);
                i += body.chars().count();
            }
            continue;
        }

        if let Some(len) = emoji_sequence_len(&chars[i..]) {
            let seq = &chars[i..i + len];
            let alt: String = seq.iter().collect();
            out.push_str(&format!(
                "<img class=\"emoji\" draggable=\"false\" alt=\"{}\" src=\"{}{}.svg\"/>",
                alt,
                TWEMOJI_BASE,
                icon_code(seq)
            ));
            i += len;
            continue;
        }

        out.push(c);
        i += 1;
    }

    out
}

fn find_char(chars: &[char], from: usize, needle: char) -> Option<usize> {
    chars[from..].iter().position(|&c| c == needle).map(|p| p + from)
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

/// Name of an opening `<style>` or `<script>` tag
fn raw_text_element(tag: &str) -> Option<&'static str> {
    let lower = tag.to_ascii_lowercase();
    ["style", "script"].into_iter().find(|name| {
        lower
            .strip_prefix('<')
            .and_then(|t| t.strip_prefix(name))
            .is_some_and(|rest| rest.starts_with(['>', ' ', '\t', '\n', '/']))
            && !lower.ends_with("/>")
    })
}

/// Twemoji file name: lowercase hex codepoints joined by `-`, with U+FE0F
/// dropped unless the sequence contains a ZWJ
pub fn icon_code(seq: &[char]) -> String {
    let keep_vs16 = seq.contains(&ZWJ);
    seq.iter()
        .filter(|&&c| keep_vs16 || c != VS16)
        .map(|&c| format!("{:x}", c as u32))
        .collect::<Vec<_>>()
        .join("-")
}

/// Length in chars of the emoji sequence starting at `chars[0]`, if any
fn emoji_sequence_len(chars: &[char]) -> Option<usize> {
    let first = *chars.first()?;

    if is_keycap_base(first) {
        let mut len = 1;
        if chars.get(len) == Some(&VS16) {
            len += 1;
        }
        return (chars.get(len) == Some(&KEYCAP)).then_some(len + 1);
    }

    if is_regional_indicator(first) {
        return match chars.get(1) {
            Some(&c) if is_regional_indicator(c) => Some(2),
            _ => None,
        };
    }

    if !is_pictographic(first) {
        return None;
    }
    if chars.get(1) == Some(&VS15) {
        return None;
    }
    if needs_presentation_selector(first) && chars.get(1) != Some(&VS16) {
        return None;
    }

    let mut len = 1;
    loop {
        while chars.get(len).is_some_and(|&c| is_modifier(c)) {
            len += 1;
        }
        match (chars.get(len), chars.get(len + 1)) {
            (Some(&ZWJ), Some(&next)) if is_pictographic(next) => len += 2,
            _ => break,
        }
    }
    Some(len)
}

fn is_keycap_base(c: char) -> bool {
    c.is_ascii_digit() || c == '#' || c == '*'
}

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

fn is_modifier(c: char) -> bool {
    c == VS16
        || ('\u{1F3FB}'..='\u{1F3FF}').contains(&c)
        || ('\u{E0020}'..='\u{E007F}').contains(&c)
}

/// Characters that are only emoji when followed by U+FE0F
fn needs_presentation_selector(c: char) -> bool {
    matches!(c, '\u{00A9}' | '\u{00AE}' | '\u{2122}')
}

fn is_pictographic(c: char) -> bool {
    matches!(c as u32,
        0x00A9 | 0x00AE | 0x203C | 0x2049 | 0x2122 | 0x2139
        | 0x2194..=0x2199 | 0x21A9..=0x21AA
        | 0x231A..=0x231B | 0x2328 | 0x23CF | 0x23E9..=0x23F3 | 0x23F8..=0x23FA
        | 0x24C2 | 0x25AA..=0x25AB | 0x25B6 | 0x25C0 | 0x25FB..=0x25FE
        | 0x2600..=0x27BF
        | 0x2934..=0x2935
        | 0x2B05..=0x2B07 | 0x2B1B..=0x2B1C | 0x2B50 | 0x2B55
        | 0x3030 | 0x303D | 0x3297 | 0x3299
        | 0x1F000..=0x1F1E5
        | 0x1F200..=0x1FAFF)
}
