//! Annotation extraction: a single forward scan over cleaned article text
//! that rewrites every retained `[[...]]` link to its surface form while
//! recording the character offset of that surface form in the output.
//!
//! Offsets are counted in characters, not bytes, matching the wire contract
//! consumed by downstream NLP tooling. The scan never backtracks: once a
//! link boundary is resolved the cursor only moves forward, so annotations
//! always come out in source order with non-decreasing offsets.

use crate::models::Annotation;
use memchr::memchr;
use rustc_hash::FxHashSet;

/// Link targets with these namespace prefixes vanish from both the text
/// and the annotation list.
const GARBAGE_LINK_PREFIXES: &[&str] = &[
    "image", "category", "file", "http", "https", "simple", "meta", "wikipedia", "media",
    "template", "portal", "user", "wikt", "wikihow", "help", "user talk", "special", "s", "b",
    "v", "q", "?",
];

const PROJECT_NAMESPACES: &[&str] = &[
    "wikipedia",
    "mediawiki",
    "wikiquote",
    "wikibooks",
    "wikisource",
    "wiktionary",
    "wikispecies",
    "wikinews",
    "wikiversity",
    "commons",
    "wikicities",
    "wikispot",
];

/// Interwiki prefixes that are stripped rather than dropped.
const ALLOWED_PREFIXES: &[&str] = &["w:", "en:"];

/// Configuration consumed by the annotation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotateOptions {
    /// Keep links whose target carries a `#fragment`. Off by default:
    /// the surface text stays, the annotation is dropped.
    pub keep_anchors: bool,
}

/// Result of annotating one article's cleaned text.
#[derive(Debug, Default)]
pub struct Annotated {
    pub text: String,
    pub annotations: Vec<Annotation>,
    /// `Category:` targets found in the body, first-seen order, deduplicated.
    pub categories: Vec<String>,
    pub anchors_dropped: u64,
    pub invalid_links: u64,
}

enum LinkOutcome {
    /// Annotate and emit the surface form.
    Keep { uri: String, surface: String },
    /// Emit the surface form only.
    SurfaceOnly(String),
    /// Remove the link from the text entirely.
    Drop,
    /// A category tag: record it and remove it from the text.
    Category(String),
}

enum LinkScan {
    /// Position of the closing `]]`.
    Close(usize),
    /// Position of a nested `[[` before any close.
    Nested(usize),
    Unterminated,
}

/// Rewrites `[[...]]` links in `text` to their surface forms, recording an
/// [`Annotation`] for each retained link. Non-link text passes through
/// verbatim.
pub fn annotate(text: &str, opts: &AnnotateOptions) -> Annotated {
    let bytes = text.as_bytes();
    let mut out = Annotated {
        text: String::with_capacity(text.len()),
        ..Default::default()
    };
    let mut seen_categories: FxHashSet<String> = FxHashSet::default();
    let mut cursor = 0usize;
    let mut i = 0usize;

    let emit = |out: &mut Annotated, cursor: &mut usize, s: &str| {
        out.text.push_str(s);
        *cursor += s.chars().count();
    };

    while i < bytes.len() {
        let open = match memchr(b'[', &bytes[i..]) {
            Some(off) => i + off,
            None => {
                emit(&mut out, &mut cursor, &text[i..]);
                break;
            }
        };

        emit(&mut out, &mut cursor, &text[i..open]);

        if !bytes[open..].starts_with(b"[[") {
            emit(&mut out, &mut cursor, "[");
            i = open + 1;
            continue;
        }

        match scan_for_close(bytes, open + 2) {
            LinkScan::Close(close) => {
                let inner = &text[open + 2..close];
                match resolve_link(inner, opts, &mut out) {
                    LinkOutcome::Keep { uri, surface } => {
                        out.annotations.push(Annotation {
                            offset: cursor,
                            uri,
                            surface_form: surface.clone(),
                        });
                        emit(&mut out, &mut cursor, &surface);
                    }
                    LinkOutcome::SurfaceOnly(surface) => {
                        emit(&mut out, &mut cursor, &surface);
                    }
                    LinkOutcome::Drop => {}
                    LinkOutcome::Category(category) => {
                        if seen_categories.insert(category.clone()) {
                            out.categories.push(category);
                        }
                    }
                }
                i = close + 2;
            }
            // Innermost pair wins: the outer `[[` is literal text and the
            // scan resumes at the nested opener.
            LinkScan::Nested(nested) => {
                emit(&mut out, &mut cursor, &text[open..nested]);
                i = nested;
            }
            LinkScan::Unterminated => {
                emit(&mut out, &mut cursor, "[[");
                i = open + 2;
            }
        }
    }

    out
}

/// Looks for the `]]` closing the link opened just before `from`, stopping
/// early if another `[[` begins first.
fn scan_for_close(bytes: &[u8], from: usize) -> LinkScan {
    let mut j = from;
    while j + 1 < bytes.len() {
        match (bytes[j], bytes[j + 1]) {
            (b']', b']') => return LinkScan::Close(j),
            (b'[', b'[') => return LinkScan::Nested(j),
            _ => j += 1,
        }
    }
    LinkScan::Unterminated
}

fn resolve_link(inner: &str, opts: &AnnotateOptions, out: &mut Annotated) -> LinkOutcome {
    let link = inner.strip_prefix(':').unwrap_or(inner);

    let mut link = link;
    for prefix in ALLOWED_PREFIXES {
        let trimmed = link.trim_start();
        if trimmed
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        {
            link = &trimmed[prefix.len()..];
            break;
        }
    }

    let parts: Vec<&str> = link.split('|').collect();
    let target = parts[0];
    let target_lower = target.trim().to_lowercase();

    if let Some(rest) = target_lower.strip_prefix("category:") {
        if !rest.trim().is_empty() {
            return LinkOutcome::Category(target.trim().to_string());
        }
        return LinkOutcome::Drop;
    }

    for prefix in GARBAGE_LINK_PREFIXES.iter().chain(PROJECT_NAMESPACES) {
        if target_lower.starts_with(prefix)
            && target_lower[prefix.len()..].starts_with(':')
        {
            return LinkOutcome::Drop;
        }
    }

    if is_cross_language(target) {
        return LinkOutcome::Drop;
    }

    let (target, surface) = match parts.as_slice() {
        [t] => (*t, *t),
        [t, s] => (*t, *s),
        _ => {
            // Pipe-heavy constructs (image options and the like) are not
            // prose; they disappear.
            out.invalid_links += 1;
            return LinkOutcome::Drop;
        }
    };

    if surface.is_empty() {
        return LinkOutcome::Drop;
    }

    let uri = target.trim();
    if uri.is_empty() {
        out.invalid_links += 1;
        return LinkOutcome::SurfaceOnly(surface.to_string());
    }

    if uri.contains('#') && !opts.keep_anchors {
        out.anchors_dropped += 1;
        return LinkOutcome::SurfaceOnly(surface.to_string());
    }

    LinkOutcome::Keep {
        uri: uri.to_string(),
        surface: surface.to_string(),
    }
}

/// Heuristic from the extractor lineage: a short all-lowercase alphabetic
/// prefix before a colon marks a cross-language link.
fn is_cross_language(target: &str) -> bool {
    match target.split_once(':') {
        Some((lang, _)) => {
            !lang.is_empty()
                && lang.len() <= 3
                && lang.chars().all(|c| c.is_ascii_lowercase() && c.is_ascii_alphabetic())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Annotated {
        annotate(text, &AnnotateOptions::default())
    }

    #[test]
    fn plain_text_passes_through() {
        let out = run("no links here.");
        assert_eq!(out.text, "no links here.");
        assert!(out.annotations.is_empty());
    }

    #[test]
    fn simple_link() {
        let out = run("[[Anarchism]] is");
        assert_eq!(out.text, "Anarchism is");
        assert_eq!(
            out.annotations,
            vec![Annotation {
                offset: 0,
                uri: "Anarchism".to_string(),
                surface_form: "Anarchism".to_string(),
            }]
        );
    }

    #[test]
    fn piped_links_with_offsets() {
        let out = run("[[Anarchism|Anarchism]] is a [[Political philosophy|political philosophy]].");
        assert_eq!(out.text, "Anarchism is a political philosophy.");
        assert_eq!(
            out.annotations,
            vec![
                Annotation {
                    offset: 0,
                    uri: "Anarchism".to_string(),
                    surface_form: "Anarchism".to_string(),
                },
                Annotation {
                    offset: 15,
                    uri: "Political philosophy".to_string(),
                    surface_form: "political philosophy".to_string(),
                },
            ]
        );
    }

    #[test]
    fn anchor_dropped_by_default() {
        let out = run("[[State (polity)#Definitions|state]]");
        assert_eq!(out.text, "state");
        assert!(out.annotations.is_empty());
        assert_eq!(out.anchors_dropped, 1);
    }

    #[test]
    fn anchor_kept_when_enabled() {
        let out = annotate(
            "[[State (polity)#Definitions|state]]",
            &AnnotateOptions { keep_anchors: true },
        );
        assert_eq!(out.text, "state");
        assert_eq!(out.annotations[0].uri, "State (polity)#Definitions");
    }

    #[test]
    fn empty_target_keeps_surface() {
        let out = run("[[|link]]");
        assert_eq!(out.text, "link");
        assert!(out.annotations.is_empty());
        assert_eq!(out.invalid_links, 1);
    }

    #[test]
    fn empty_surface_drops_link() {
        let out = run("a [[Target|]] b");
        assert_eq!(out.text, "a  b");
        assert!(out.annotations.is_empty());
    }

    #[test]
    fn multi_pipe_link_dropped() {
        let out = run("x[[File stats|opt|caption]]y");
        assert_eq!(out.text, "xy");
        assert!(out.annotations.is_empty());
    }

    #[test]
    fn category_collected_and_removed() {
        let out = run("text [[Category:Political ideologies]] more");
        assert_eq!(out.text, "text  more");
        assert_eq!(out.categories, vec!["Category:Political ideologies"]);
        assert!(out.annotations.is_empty());
    }

    #[test]
    fn categories_deduplicated_in_order() {
        let out = run("[[Category:B]][[Category:A]][[Category:B]]");
        assert_eq!(out.categories, vec!["Category:B", "Category:A"]);
    }

    #[test]
    fn file_and_image_links_vanish() {
        let out = run("a[[File:Logo.svg|thumb]]b[[Image:X.png]]c");
        assert_eq!(out.text, "abc");
        assert!(out.annotations.is_empty());
    }

    #[test]
    fn cross_language_link_vanishes() {
        let out = run("a[[fr:Anarchisme]]b");
        assert_eq!(out.text, "ab");
        assert!(out.annotations.is_empty());
    }

    #[test]
    fn allowed_prefix_stripped() {
        let out = run("[[w:Anarchism|anarchism]]");
        assert_eq!(out.text, "anarchism");
        assert_eq!(out.annotations[0].uri, "Anarchism");
    }

    #[test]
    fn leading_colon_stripped() {
        let out = run("[[:Anarchism]]");
        assert_eq!(out.annotations[0].uri, "Anarchism");
    }

    #[test]
    fn nested_brackets_innermost_wins() {
        let out = run("[[a[[b]]c]]");
        assert_eq!(out.text, "[[abc]]");
        assert_eq!(out.annotations.len(), 1);
        assert_eq!(out.annotations[0].uri, "b");
        assert_eq!(out.annotations[0].offset, 3);
    }

    #[test]
    fn unterminated_link_is_literal() {
        let out = run("a [[broken");
        assert_eq!(out.text, "a [[broken");
        assert!(out.annotations.is_empty());
    }

    #[test]
    fn single_bracket_is_literal() {
        let out = run("a [1] b");
        assert_eq!(out.text, "a [1] b");
        assert!(out.annotations.is_empty());
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let out = run("café [[Anarchism]]");
        assert_eq!(out.annotations[0].offset, 5);
        // Round trip against character indexing.
        let chars: Vec<char> = out.text.chars().collect();
        let ann = &out.annotations[0];
        let slice: String = chars[ann.offset..ann.offset + ann.surface_form.chars().count()]
            .iter()
            .collect();
        assert_eq!(slice, ann.surface_form);
    }

    #[test]
    fn offsets_non_decreasing() {
        let out = run("[[A]] x [[B]] y [[C]]");
        let offsets: Vec<usize> = out.annotations.iter().map(|a| a.offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        assert_eq!(offsets, sorted);
        assert_eq!(out.annotations.len(), 3);
    }

    #[test]
    fn uri_is_trimmed_but_case_preserved() {
        let out = run("[[ Political philosophy |ideas]]");
        assert_eq!(out.annotations[0].uri, "Political philosophy");
        assert_eq!(out.annotations[0].surface_form, "ideas");
    }

    #[test]
    fn no_uri_contains_hash_by_default() {
        let out = run("[[A#x]] [[B#y|b]] [[C]]");
        assert!(out.annotations.iter().all(|a| !a.uri.contains('#')));
        assert_eq!(out.annotations.len(), 1);
    }

    #[test]
    fn idempotent_output() {
        let text = "[[A|a]] and [[B#frag|b]] and [[Category:C]] plus [x].";
        let first = run(text);
        let second = run(text);
        assert_eq!(first.text, second.text);
        assert_eq!(first.annotations, second.annotations);
        assert_eq!(first.categories, second.categories);
    }
}
