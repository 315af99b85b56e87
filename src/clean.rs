//! Markup cleaning: strips templates, tables, HTML residue and formatting
//! from raw wiki markup while leaving `[[...]]` links intact for the
//! annotation pass. Cleaning is best-effort and never fails; anything that
//! cannot be parsed stays in the text as literal characters.

use once_cell::sync::Lazy;
use regex::Regex;

/// Tags whose content is discarded along with the tags themselves.
const GARBAGE_TAGS: &[&str] = &[
    "ref", "gallery", "timeline", "noinclude", "pre", "table", "tr", "td", "ul", "li", "ol", "dl",
    "dt", "dd", "menu", "dir",
];

/// Tags that are dropped but whose content is kept.
const WRAPPER_TAGS: &[&str] = &[
    "nowiki",
    "cite",
    "source",
    "hiero",
    "div",
    "font",
    "span",
    "strong",
    "strike",
    "blockquote",
    "tt",
    "var",
    "sup",
    "sub",
    "big",
    "small",
    "center",
    "h1",
    "h2",
    "h3",
    "em",
    "b",
    "i",
    "u",
    "a",
    "s",
    "p",
];

const SINGLE_TAGS: &[&str] = &["references", "ref", "img", "br", "hr", "li", "dt", "dd"];

static COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static GARBAGE_TAG_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    GARBAGE_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(
                r"(?si)<\s*{tag}(\s*| [^/]+?)>.*?<\s*/\s*{tag}\s*>"
            ))
            .unwrap()
        })
        .collect()
});

static WRAPPER_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    let tags = WRAPPER_TAGS.join("|");
    Regex::new(&format!(r"(?si)<\s*/?\s*(?:{tags})(\s*| [^/>]*?)>")).unwrap()
});

static SINGLE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    let tags = SINGLE_TAGS.join("|");
    Regex::new(&format!(
        r"(?si)<\s*(?:/|\\)?\s*(?:{tags})(\s*| [^>]*?)/?\\?\s*>"
    ))
    .unwrap()
});

static MATH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?si)<\s*math(\s*| [^/]+?)>.*?<\s*/\s*math\s*>").unwrap());

static CODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?si)<\s*code(\s*| [^/]+?)>.*?<\s*/\s*code\s*>").unwrap());

static HTTP_LINK_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?si)\[http.*?\]").unwrap());

static NUMERIC_ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(\d+);").unwrap());

static MULTI_SPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

static MULTI_DOT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{4,}").unwrap());

/// Matches a wikilink, capturing its display text (the part after the last
/// pipe, or the whole target). Used only for line-level token counting in
/// [`compact`]; the annotation pass does its own scanning.
static LINK_SURFACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[(?:[^\]|]*\|)?([^\]|]*)\]\]").unwrap());

/// HTML character entities decoded during cleaning. Entities not listed
/// here pass through as literal text.
static CHAR_ENTITIES: &[(&str, char)] = &[
    ("&nbsp;", '\u{00A0}'),
    ("&iexcl;", '\u{00A1}'),
    ("&cent;", '\u{00A2}'),
    ("&pound;", '\u{00A3}'),
    ("&curren;", '\u{00A4}'),
    ("&yen;", '\u{00A5}'),
    ("&sect;", '\u{00A7}'),
    ("&copy;", '\u{00A9}'),
    ("&laquo;", '\u{00AB}'),
    ("&reg;", '\u{00AE}'),
    ("&deg;", '\u{00B0}'),
    ("&plusmn;", '\u{00B1}'),
    ("&sup2;", '\u{00B2}'),
    ("&sup3;", '\u{00B3}'),
    ("&micro;", '\u{00B5}'),
    ("&para;", '\u{00B6}'),
    ("&middot;", '\u{00B7}'),
    ("&raquo;", '\u{00BB}'),
    ("&frac14;", '\u{00BC}'),
    ("&frac12;", '\u{00BD}'),
    ("&frac34;", '\u{00BE}'),
    ("&iquest;", '\u{00BF}'),
    ("&Agrave;", '\u{00C0}'),
    ("&Aacute;", '\u{00C1}'),
    ("&Acirc;", '\u{00C2}'),
    ("&Atilde;", '\u{00C3}'),
    ("&Auml;", '\u{00C4}'),
    ("&Aring;", '\u{00C5}'),
    ("&AElig;", '\u{00C6}'),
    ("&Ccedil;", '\u{00C7}'),
    ("&Egrave;", '\u{00C8}'),
    ("&Eacute;", '\u{00C9}'),
    ("&Ecirc;", '\u{00CA}'),
    ("&Euml;", '\u{00CB}'),
    ("&Igrave;", '\u{00CC}'),
    ("&Iacute;", '\u{00CD}'),
    ("&Icirc;", '\u{00CE}'),
    ("&Iuml;", '\u{00CF}'),
    ("&ETH;", '\u{00D0}'),
    ("&Ntilde;", '\u{00D1}'),
    ("&Ograve;", '\u{00D2}'),
    ("&Oacute;", '\u{00D3}'),
    ("&Ocirc;", '\u{00D4}'),
    ("&Otilde;", '\u{00D5}'),
    ("&Ouml;", '\u{00D6}'),
    ("&times;", '\u{00D7}'),
    ("&Oslash;", '\u{00D8}'),
    ("&Ugrave;", '\u{00D9}'),
    ("&Uacute;", '\u{00DA}'),
    ("&Ucirc;", '\u{00DB}'),
    ("&Uuml;", '\u{00DC}'),
    ("&Yacute;", '\u{00DD}'),
    ("&THORN;", '\u{00DE}'),
    ("&szlig;", '\u{00DF}'),
    ("&agrave;", '\u{00E0}'),
    ("&aacute;", '\u{00E1}'),
    ("&acirc;", '\u{00E2}'),
    ("&atilde;", '\u{00E3}'),
    ("&auml;", '\u{00E4}'),
    ("&aring;", '\u{00E5}'),
    ("&aelig;", '\u{00E6}'),
    ("&ccedil;", '\u{00E7}'),
    ("&egrave;", '\u{00E8}'),
    ("&eacute;", '\u{00E9}'),
    ("&ecirc;", '\u{00EA}'),
    ("&euml;", '\u{00EB}'),
    ("&igrave;", '\u{00EC}'),
    ("&iacute;", '\u{00ED}'),
    ("&icirc;", '\u{00EE}'),
    ("&iuml;", '\u{00EF}'),
    ("&eth;", '\u{00F0}'),
    ("&ntilde;", '\u{00F1}'),
    ("&ograve;", '\u{00F2}'),
    ("&oacute;", '\u{00F3}'),
    ("&ocirc;", '\u{00F4}'),
    ("&otilde;", '\u{00F5}'),
    ("&ouml;", '\u{00F6}'),
    ("&divide;", '\u{00F7}'),
    ("&oslash;", '\u{00F8}'),
    ("&ugrave;", '\u{00F9}'),
    ("&uacute;", '\u{00FA}'),
    ("&ucirc;", '\u{00FB}'),
    ("&uuml;", '\u{00FC}'),
    ("&yacute;", '\u{00FD}'),
    ("&thorn;", '\u{00FE}'),
    ("&yuml;", '\u{00FF}'),
    ("&Alpha;", '\u{0391}'),
    ("&Beta;", '\u{0392}'),
    ("&Gamma;", '\u{0393}'),
    ("&Delta;", '\u{0394}'),
    ("&Epsilon;", '\u{0395}'),
    ("&Zeta;", '\u{0396}'),
    ("&Eta;", '\u{0397}'),
    ("&Theta;", '\u{0398}'),
    ("&Iota;", '\u{0399}'),
    ("&Kappa;", '\u{039A}'),
    ("&Lambda;", '\u{039B}'),
    ("&Mu;", '\u{039C}'),
    ("&Nu;", '\u{039D}'),
    ("&Xi;", '\u{039E}'),
    ("&Omicron;", '\u{039F}'),
    ("&Pi;", '\u{03A0}'),
    ("&Rho;", '\u{03A1}'),
    ("&Sigma;", '\u{03A3}'),
    ("&Tau;", '\u{03A4}'),
    ("&Upsilon;", '\u{03A5}'),
    ("&Phi;", '\u{03A6}'),
    ("&Chi;", '\u{03A7}'),
    ("&Psi;", '\u{03A8}'),
    ("&Omega;", '\u{03A9}'),
    ("&alpha;", '\u{03B1}'),
    ("&beta;", '\u{03B2}'),
    ("&gamma;", '\u{03B3}'),
    ("&delta;", '\u{03B4}'),
    ("&epsilon;", '\u{03B5}'),
    ("&zeta;", '\u{03B6}'),
    ("&eta;", '\u{03B7}'),
    ("&theta;", '\u{03B8}'),
    ("&iota;", '\u{03B9}'),
    ("&kappa;", '\u{03BA}'),
    ("&lambda;", '\u{03BB}'),
    ("&mu;", '\u{03BC}'),
    ("&nu;", '\u{03BD}'),
    ("&xi;", '\u{03BE}'),
    ("&omicron;", '\u{03BF}'),
    ("&pi;", '\u{03C0}'),
    ("&rho;", '\u{03C1}'),
    ("&sigmaf;", '\u{03C2}'),
    ("&sigma;", '\u{03C3}'),
    ("&tau;", '\u{03C4}'),
    ("&upsilon;", '\u{03C5}'),
    ("&phi;", '\u{03C6}'),
    ("&chi;", '\u{03C7}'),
    ("&psi;", '\u{03C8}'),
    ("&omega;", '\u{03C9}'),
    ("&bull;", '\u{2022}'),
    ("&hellip;", '\u{2026}'),
    ("&prime;", '\u{2032}'),
    ("&Prime;", '\u{2033}'),
    ("&minus;", '\u{2212}'),
    ("&infin;", '\u{221E}'),
    ("&ne;", '\u{2260}'),
    ("&le;", '\u{2264}'),
    ("&ge;", '\u{2265}'),
    ("&larr;", '\u{2190}'),
    ("&uarr;", '\u{2191}'),
    ("&rarr;", '\u{2192}'),
    ("&darr;", '\u{2193}'),
    ("&harr;", '\u{2194}'),
    ("&trade;", '\u{2122}'),
    ("&euro;", '\u{20AC}'),
    ("&quot;", '\u{0022}'),
    ("&lt;", '\u{003C}'),
    ("&gt;", '\u{003E}'),
    ("&OElig;", '\u{0152}'),
    ("&oelig;", '\u{0153}'),
    ("&Scaron;", '\u{0160}'),
    ("&scaron;", '\u{0161}'),
    ("&Yuml;", '\u{0178}'),
    ("&circ;", '\u{02C6}'),
    ("&tilde;", '\u{02DC}'),
    ("&ensp;", '\u{2002}'),
    ("&emsp;", '\u{2003}'),
    ("&thinsp;", '\u{2009}'),
    ("&ndash;", '\u{2013}'),
    ("&mdash;", '\u{2014}'),
    ("&lsquo;", '\u{2018}'),
    ("&rsquo;", '\u{2019}'),
    ("&sbquo;", '\u{201A}'),
    ("&ldquo;", '\u{201C}'),
    ("&rdquo;", '\u{201D}'),
    ("&bdquo;", '\u{201E}'),
    ("&dagger;", '\u{2020}'),
    ("&Dagger;", '\u{2021}'),
    ("&permil;", '\u{2030}'),
    ("&lsaquo;", '\u{2039}'),
    ("&rsaquo;", '\u{203A}'),
];

/// Options controlling the line-level compaction pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactOptions {
    pub drop_lists: bool,
    pub drop_enumerations: bool,
    pub drop_indents: bool,
    pub drop_tables: bool,
}

/// Strips wiki markup from raw article text, preserving `[[...]]` links.
///
/// The result still carries the article's line structure; [`compact`] turns
/// it into the final prose layout.
pub fn strip_markup(text: &str) -> String {
    // Escaped tags in dump text are real tags to the cleaner.
    let text = text.replace("&lt;", "<").replace("&gt;", ">");
    let text = text.replace("<<", "\u{00AB}").replace(">>", "\u{00BB}");

    let text = COMMENT_REGEX.replace_all(&text, "");

    let mut text = text.into_owned();
    for re in GARBAGE_TAG_REGEXES.iter() {
        text = re.replace_all(&text, "").into_owned();
    }
    let text = WRAPPER_TAG_REGEX.replace_all(&text, "");
    let text = SINGLE_TAG_REGEX.replace_all(&text, "");

    let mut formula = 0u32;
    let text = MATH_REGEX.replace_all(&text, |_: &regex::Captures| {
        formula += 1;
        format!("formula_{}", formula)
    });
    let mut codice = 0u32;
    let text = CODE_REGEX.replace_all(&text, |_: &regex::Captures| {
        codice += 1;
        format!("codice_{}", codice)
    });

    let text = strip_braces(&text);

    let text = HTTP_LINK_REGEX.replace_all(&text, "").replace("[]", "");

    // Bold markers vanish, italics render as plain quotes.
    let text = text.replace("'''", "").replace("''", "\"");

    let mut text = text.replace("&amp;", "&");
    for (entity, ch) in CHAR_ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, &ch.to_string());
        }
    }
    let text = NUMERIC_ENTITY_REGEX.replace_all(&text, |caps: &regex::Captures| {
        decode_numeric_entity(&caps[1])
    });

    let text = text.replace('\t', " ");
    let text = MULTI_SPACE_REGEX.replace_all(&text, " ");
    let text = MULTI_DOT_REGEX.replace_all(&text, "...");
    text.replace(" ,", ",")
        .replace(" .", ".")
        .replace(" :", ":")
        .replace(" ;", ";")
        .replace(",,", ",")
        .replace(",.", ".")
        .replace("( ", "(")
        .replace(" )", ")")
        .replace("[ ", "[")
        .replace(" ]", "]")
        .replace("\u{00AB} ", "\u{00AB}")
        .replace(" \u{00BB}", "\u{00BB}")
}

fn decode_numeric_entity(digits: &str) -> String {
    match digits.parse::<u32>() {
        // Astral plane references are dropped, like everything else
        // the cleaner cannot render.
        Ok(code) if code < 0x10000 => char::from_u32(code)
            .map(|c| c.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Removes `{{...}}` templates and `{|...|}` tables, including nested ones.
/// An opener with no matching close is kept as literal text.
fn strip_braces(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut result = String::with_capacity(text.len());
    let mut i = 0;
    let mut run_start = 0;

    while i + 1 < bytes.len() {
        if is_brace_open(bytes[i], bytes[i + 1]) {
            match find_brace_close(bytes, i) {
                Some(end) => {
                    result.push_str(&text[run_start..i]);
                    i = end + 2;
                    run_start = i;
                }
                // Unterminated: the braces stay literal.
                None => i += 2,
            }
        } else {
            i += 1;
        }
    }

    if run_start < bytes.len() {
        result.push_str(&text[run_start..]);
    }
    result
}

fn is_brace_open(a: u8, b: u8) -> bool {
    a == b'{' && (b == b'{' || b == b'|')
}

fn is_brace_close(a: u8, b: u8) -> bool {
    (a == b'}' || a == b'|') && b == b'}'
}

/// Index of the matching close pair for the opener at `start`, counting
/// both template and table braces toward the depth.
fn find_brace_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut i = start;
    while i + 1 < bytes.len() {
        if is_brace_open(bytes[i], bytes[i + 1]) {
            depth += 1;
            i += 2;
        } else if is_brace_close(bytes[i], bytes[i + 1]) {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    None
}

/// Token count of a line with wikilinks collapsed to their display text,
/// so link-heavy lines are judged by what the reader would see.
fn display_token_count(line: &str) -> usize {
    if line.contains("[[") {
        LINK_SURFACE_REGEX
            .replace_all(line, "$1")
            .split_whitespace()
            .count()
    } else {
        line.split_whitespace().count()
    }
}

fn as_sentence(heading: &str) -> String {
    match heading.chars().last() {
        Some('!') | Some('?') | None => heading.to_string(),
        _ => format!("{}.", heading),
    }
}

/// Compacts cleaned markup into the final prose layout: the title becomes
/// the first sentence, headings become sentences opening a paragraph, list
/// markers and filler lines are dropped. Returns `None` when nothing but
/// the title survives.
pub fn compact(title: &str, text: &str, opts: &CompactOptions) -> Option<String> {
    let mut page: Vec<String> = vec![as_sentence(title.trim())];
    let mut paragraph: Vec<String> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with("==") {
            if paragraph.len() > 1 {
                page.append(&mut paragraph);
            }
            paragraph.clear();
            let heading = line.trim_matches(|c| c == '=' || c == ' ');
            paragraph.push(as_sentence(heading));
        } else if line.starts_with('*') {
            if opts.drop_lists {
                continue;
            }
            push_line(&mut page, &mut paragraph, line.trim_matches(['*', ' ']));
        } else if line.starts_with('#') {
            if opts.drop_enumerations {
                continue;
            }
            push_line(&mut page, &mut paragraph, line.trim_matches(['#', ' ']));
        } else if line.starts_with(':') {
            if opts.drop_indents {
                continue;
            }
            push_line(&mut page, &mut paragraph, line.trim_matches([':', ' ']));
        } else if line.starts_with(';') {
            push_line(&mut page, &mut paragraph, line.trim_matches([';', ' ']));
        } else if line.starts_with('{') || line.starts_with('|') {
            if opts.drop_tables {
                continue;
            }
            push_line(&mut page, &mut paragraph, line.trim_matches(['{', '|', ' ']));
        } else if line.trim_matches(['.', '-', ' ']).is_empty() {
            continue;
        } else if !line.contains('_') && display_token_count(line) < 6 {
            // Stray fragments left over from markup stripping.
            continue;
        } else if paragraph.is_empty() {
            page.push(line.to_string());
        } else {
            paragraph.push(line.to_string());
        }
    }

    if paragraph.len() > 1 {
        page.append(&mut paragraph);
    }
    if page.len() == 1 {
        return None;
    }
    Some(page.join("\n"))
}

fn push_line(page: &mut Vec<String>, paragraph: &mut Vec<String>, line: &str) {
    if line.is_empty() {
        return;
    }
    if paragraph.is_empty() {
        page.push(line.to_string());
    } else {
        paragraph.push(line.to_string());
    }
}
