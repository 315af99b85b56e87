//! Streaming MediaWiki dump reader. Parses `<page>` elements from a plain
//! or BZ2-compressed XML dump without ever holding the whole file in
//! memory. Encoding or structure problems inside one page fail that page
//! only; iteration continues with the next one.

use crate::models::{PageType, WikiPage};
use anyhow::{anyhow, Context, Result};
use bzip2::read::BzDecoder;
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::warn;

/// Titles in these namespaces are classified as [`PageType::Special`] and
/// skipped by the extraction driver.
pub const REJECTED_TITLE_PREFIXES: &[&str] = &[
    "Image:",
    "File:",
    "Wikipedia:",
    "Template:",
    "Portal:",
    "User:",
    "Help:",
    "Book:",
    "Draft:",
    "Module:",
    "TimedText:",
    "MediaWiki:",
];

/// First link target in a `#REDIRECT [[...]]` body.
static REDIRECT_TARGET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^|\]]+)").unwrap());

/// Which element's text content is currently being collected.
#[derive(PartialEq)]
enum Field {
    None,
    Id,
    Title,
    Text,
}

pub struct WikiReader {
    reader: Reader<Box<dyn BufRead>>,
    buf: Vec<u8>,
    done: bool,
}

impl WikiReader {
    /// Opens a dump file; `.bz2` paths are decompressed on the fly.
    pub fn new(path: &str) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open wiki dump at: {}", path))?;
        let source: Box<dyn BufRead> = if path.ends_with(".bz2") {
            Box::new(BufReader::new(BzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self {
            reader: Reader::from_reader(source),
            buf: Vec::new(),
            done: false,
        })
    }

    fn next_page(&mut self) -> Result<Option<WikiPage>> {
        let mut in_page = false;
        let mut in_revision = false;
        let mut field = Field::None;
        let mut id: Option<u32> = None;
        let mut title = String::new();
        let mut text = String::new();
        let mut redirect: Option<String> = None;
        let mut page_err: Option<anyhow::Error> = None;

        loop {
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .with_context(|| {
                    format!(
                        "XML parse error at position {}",
                        self.reader.buffer_position()
                    )
                })?;
            match event {
                Event::Start(ref e) => match e.name().as_ref() {
                    b"page" => {
                        in_page = true;
                        in_revision = false;
                        field = Field::None;
                        id = None;
                        title.clear();
                        text.clear();
                        redirect = None;
                        page_err = None;
                    }
                    b"revision" if in_page => in_revision = true,
                    b"id" if in_page && !in_revision && id.is_none() => field = Field::Id,
                    b"title" if in_page && !in_revision => field = Field::Title,
                    b"text" if in_revision => field = Field::Text,
                    _ => field = Field::None,
                },
                Event::Empty(ref e) => {
                    if in_page && e.name().as_ref() == b"redirect" {
                        for attr in e.attributes() {
                            let attr = match attr {
                                Ok(a) => a,
                                Err(e) => {
                                    page_err = Some(anyhow!("Bad redirect attribute: {}", e));
                                    continue;
                                }
                            };
                            if attr.key.as_ref() == b"title" {
                                match attr.unescape_value() {
                                    Ok(v) => redirect = Some(v.into_owned()),
                                    Err(e) => {
                                        page_err =
                                            Some(anyhow!("Bad redirect title encoding: {}", e))
                                    }
                                }
                            }
                        }
                    }
                }
                Event::Text(e) => {
                    if field == Field::None {
                        continue;
                    }
                    match e.unescape() {
                        Ok(content) => match field {
                            Field::Id => {
                                match content.trim().parse::<u32>() {
                                    Ok(parsed) => id = Some(parsed),
                                    Err(_) => {
                                        page_err =
                                            Some(anyhow!("Invalid page id: {:?}", content.trim()))
                                    }
                                }
                                field = Field::None;
                            }
                            Field::Title => title.push_str(&content),
                            Field::Text => text.push_str(&content),
                            Field::None => {}
                        },
                        Err(e) => {
                            if page_err.is_none() {
                                page_err = Some(anyhow!(
                                    "Encoding error at position {}: {}",
                                    self.reader.buffer_position(),
                                    e
                                ));
                            }
                        }
                    }
                }
                Event::CData(e) => {
                    if field == Field::Text {
                        match std::str::from_utf8(&e) {
                            Ok(content) => text.push_str(content),
                            Err(err) => {
                                if page_err.is_none() {
                                    page_err = Some(anyhow!("Invalid UTF-8 in page text: {}", err));
                                }
                            }
                        }
                    }
                }
                Event::End(ref e) => match e.name().as_ref() {
                    b"page" => {
                        self.buf.clear();
                        if let Some(err) = page_err {
                            return Err(err.context(format!("Failed to read page: {}", title)));
                        }
                        let id = match id {
                            Some(id) => id,
                            None => {
                                warn!(title = %title, "Page without id, skipping");
                                in_page = false;
                                continue;
                            }
                        };
                        let title = std::mem::take(&mut title);
                        let text = std::mem::take(&mut text);
                        let page_type = classify(&title, &text, redirect.take());
                        return Ok(Some(WikiPage {
                            id,
                            title,
                            page_type,
                            text,
                        }));
                    }
                    b"revision" => in_revision = false,
                    _ => field = Field::None,
                },
                Event::Eof => return Ok(None),
                _ => {}
            }
            self.buf.clear();
        }
    }
}

fn classify(title: &str, text: &str, redirect: Option<String>) -> PageType {
    if REJECTED_TITLE_PREFIXES.iter().any(|p| title.starts_with(p)) {
        return PageType::Special;
    }
    if let Some(target) = redirect {
        return PageType::Redirect(target);
    }
    // Older dumps mark redirects only in the page body.
    let trimmed = text.trim_start();
    if trimmed
        .get(..9)
        .is_some_and(|head| head.eq_ignore_ascii_case("#redirect"))
    {
        if let Some(caps) = REDIRECT_TARGET_REGEX.captures(trimmed) {
            return PageType::Redirect(caps[1].trim().to_string());
        }
    }
    PageType::Article
}

impl Iterator for WikiReader {
    type Item = Result<WikiPage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_page() {
            Ok(Some(page)) => Some(Ok(page)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_article() {
        assert_eq!(classify("Anarchism", "Anarchism is...", None), PageType::Article);
    }

    #[test]
    fn classify_special_by_prefix() {
        assert_eq!(
            classify("File:Logo.svg", "some file", None),
            PageType::Special
        );
        assert_eq!(
            classify("Template:Cite", "{{...}}", None),
            PageType::Special
        );
    }

    #[test]
    fn classify_redirect_element() {
        assert_eq!(
            classify("Rust", "#REDIRECT [[Rust (language)]]", Some("Rust (language)".into())),
            PageType::Redirect("Rust (language)".into())
        );
    }

    #[test]
    fn classify_redirect_from_body() {
        assert_eq!(
            classify("Rust", "#redirect [[Rust (language)]]", None),
            PageType::Redirect("Rust (language)".into())
        );
    }

    #[test]
    fn classify_redirect_body_without_link() {
        assert_eq!(classify("X", "#REDIRECT nowhere", None), PageType::Article);
    }

    #[test]
    fn category_pages_are_not_special() {
        assert_eq!(
            classify("Category:Anarchism", "[[Category:Politics]]", None),
            PageType::Article
        );
    }
}
