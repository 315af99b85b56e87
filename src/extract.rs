//! Extraction driver: streams pages from the dump, runs the per-article
//! clean/compact/annotate pipeline in parallel batches, and writes the
//! results through the output splitter. Per-article processing is pure and
//! stateless, so batches can be mapped with rayon; writes stay sequential
//! in batch order, which keeps the output deterministic.

use crate::annotate::{annotate, AnnotateOptions};
use crate::clean::{compact, strip_markup, CompactOptions};
use crate::config::{BATCH_SIZE, DEFAULT_URL_PREFIX, PROGRESS_INTERVAL};
use crate::models::{article_url, ArticleRecord, PageType, WikiPage};
use crate::output::OutputSplitter;
use crate::parser::WikiReader;
use crate::stats::ExtractionStats;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub url_prefix: String,
    pub keep_anchors: bool,
    pub compact: CompactOptions,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            keep_anchors: false,
            compact: CompactOptions::default(),
        }
    }
}

enum PageOutput {
    Record {
        url: String,
        json: String,
        annotations: u64,
        anchors_dropped: u64,
        invalid_links: u64,
    },
    Redirect {
        url: String,
        target_url: String,
    },
    CategoryPage {
        url: String,
        parent_urls: Vec<String>,
    },
    /// Article whose body compacted to nothing.
    Empty,
    /// Non-content namespace.
    Rejected,
}

/// Runs one article through the pipeline. Pure; no I/O.
fn process_page(page: WikiPage, opts: &ExtractOptions) -> Result<PageOutput> {
    let url = article_url(&page.title, &opts.url_prefix);

    match page.page_type {
        PageType::Special => Ok(PageOutput::Rejected),
        PageType::Redirect(target) => Ok(PageOutput::Redirect {
            url,
            target_url: article_url(&target, &opts.url_prefix),
        }),
        PageType::Article => {
            let annotate_opts = AnnotateOptions {
                keep_anchors: opts.keep_anchors,
            };

            if page.title.to_lowercase().starts_with("category:") {
                let cleaned = strip_markup(&page.text);
                let annotated = annotate(&cleaned, &annotate_opts);
                let parent_urls = annotated
                    .categories
                    .iter()
                    .map(|c| article_url(c, &opts.url_prefix))
                    .collect();
                return Ok(PageOutput::CategoryPage { url, parent_urls });
            }

            let cleaned = strip_markup(&page.text);
            let compacted = match compact(&page.title, &cleaned, &opts.compact) {
                Some(text) => text,
                None => return Ok(PageOutput::Empty),
            };
            let annotated = annotate(&compacted, &annotate_opts);

            let record = ArticleRecord {
                id: page.id,
                url: url.clone(),
                title: page.title,
                text: annotated.text,
                annotations: annotated.annotations,
            };
            let json = serde_json::to_string(&record)
                .with_context(|| format!("Failed to serialize record for: {}", record.title))?;

            Ok(PageOutput::Record {
                url,
                json,
                annotations: record.annotations.len() as u64,
                anchors_dropped: annotated.anchors_dropped,
                invalid_links: annotated.invalid_links,
            })
        }
    }
}

/// Streams the dump at `input` and writes extracted output under
/// `output_dir`. Returns the run's counters.
pub fn run_extraction(
    input: &str,
    output_dir: &str,
    opts: &ExtractOptions,
    compress: bool,
    max_file_size: u64,
    limit: Option<u64>,
) -> Result<ExtractionStats> {
    let reader = WikiReader::new(input)?;
    let mut splitter = OutputSplitter::new(output_dir, compress, max_file_size)?;
    let stats = ExtractionStats::new();
    let pb = ProgressBar::new_spinner();

    info!(input, output_dir, "Starting extraction");

    let mut batch: Vec<WikiPage> = Vec::with_capacity(BATCH_SIZE);
    let mut seen: u64 = 0;

    for page in reader {
        let page = match page {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable page");
                stats.inc_skipped();
                continue;
            }
        };

        seen += 1;
        if seen % PROGRESS_INTERVAL == 0 {
            pb.tick();
        }

        batch.push(page);
        if batch.len() >= BATCH_SIZE {
            flush_batch(&mut batch, opts, &mut splitter, &stats)?;
        }

        if limit.is_some_and(|limit| seen >= limit) {
            info!(limit = seen, "Page limit reached");
            break;
        }
    }
    flush_batch(&mut batch, opts, &mut splitter, &stats)?;

    pb.finish_and_clear();
    splitter.close()?;

    info!(
        pages = seen,
        articles = stats.articles(),
        annotations = stats.annotations(),
        "Extraction finished"
    );
    Ok(stats)
}

fn flush_batch(
    batch: &mut Vec<WikiPage>,
    opts: &ExtractOptions,
    splitter: &mut OutputSplitter,
    stats: &ExtractionStats,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }

    let outputs: Vec<Result<PageOutput>> = std::mem::take(batch)
        .into_par_iter()
        .map(|page| process_page(page, opts))
        .collect();

    for output in outputs {
        let output = match output {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "Skipping failed page");
                stats.inc_skipped();
                continue;
            }
        };
        match output {
            PageOutput::Record {
                url,
                json,
                annotations,
                anchors_dropped,
                invalid_links,
            } => {
                splitter.write_record(&url, &json)?;
                stats.inc_articles();
                stats.add_annotations(annotations);
                stats.add_anchors_dropped(anchors_dropped);
                stats.add_invalid_links(invalid_links);
            }
            PageOutput::Redirect { url, target_url } => {
                splitter.write_redirect(&url, &target_url)?;
                stats.inc_redirects();
            }
            PageOutput::CategoryPage { url, parent_urls } => {
                splitter.write_category_parents(&url, &parent_urls)?;
                stats.inc_category_pages();
            }
            PageOutput::Empty => stats.inc_empty(),
            PageOutput::Rejected => stats.inc_rejected(),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: u32, title: &str, text: &str) -> WikiPage {
        WikiPage {
            id,
            title: title.to_string(),
            page_type: PageType::Article,
            text: text.to_string(),
        }
    }

    #[test]
    fn article_produces_record_with_offsets() {
        let page = article(
            12,
            "Anarchism",
            "[[Anarchism|Anarchism]] is a [[Political philosophy|political philosophy]] favouring self-governed societies.",
        );
        let out = process_page(page, &ExtractOptions::default()).unwrap();
        let json = match out {
            PageOutput::Record { json, .. } => json,
            _ => panic!("expected record"),
        };

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["id"], 12);
        assert_eq!(value["url"], "http://en.wikipedia.org/wiki/Anarchism");
        assert_eq!(value["title"], "Anarchism");

        let text = value["text"].as_str().unwrap();
        assert!(text.starts_with("Anarchism.\n"));

        let annotations = value["annotations"].as_array().unwrap();
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0]["uri"], "Anarchism");
        assert_eq!(annotations[1]["uri"], "Political philosophy");

        // Offsets index into the final text (character positions).
        let chars: Vec<char> = text.chars().collect();
        for ann in annotations {
            let offset = ann["offset"].as_u64().unwrap() as usize;
            let surface = ann["surface_form"].as_str().unwrap();
            let got: String = chars[offset..offset + surface.chars().count()].iter().collect();
            assert_eq!(got, surface);
        }
    }

    #[test]
    fn special_page_is_rejected() {
        let page = WikiPage {
            id: 4,
            title: "File:Logo.svg".to_string(),
            page_type: PageType::Special,
            text: String::new(),
        };
        assert!(matches!(
            process_page(page, &ExtractOptions::default()).unwrap(),
            PageOutput::Rejected
        ));
    }

    #[test]
    fn redirect_maps_both_urls() {
        let page = WikiPage {
            id: 3,
            title: "Rust".to_string(),
            page_type: PageType::Redirect("Rust (programming language)".to_string()),
            text: "#REDIRECT [[Rust (programming language)]]".to_string(),
        };
        match process_page(page, &ExtractOptions::default()).unwrap() {
            PageOutput::Redirect { url, target_url } => {
                assert_eq!(url, "http://en.wikipedia.org/wiki/Rust");
                assert_eq!(
                    target_url,
                    "http://en.wikipedia.org/wiki/Rust_(programming_language)"
                );
            }
            _ => panic!("expected redirect"),
        }
    }

    #[test]
    fn category_page_lists_parents() {
        let page = article(
            9,
            "Category:Anarchism",
            "[[Category:Political ideologies]]\n[[Category:Political culture]]",
        );
        match process_page(page, &ExtractOptions::default()).unwrap() {
            PageOutput::CategoryPage { url, parent_urls } => {
                assert_eq!(url, "http://en.wikipedia.org/wiki/Category:Anarchism");
                assert_eq!(
                    parent_urls,
                    vec![
                        "http://en.wikipedia.org/wiki/Category:Political_ideologies",
                        "http://en.wikipedia.org/wiki/Category:Political_culture",
                    ]
                );
            }
            _ => panic!("expected category page"),
        }
    }

    #[test]
    fn empty_body_is_skipped() {
        let page = article(7, "Stub", "{{stub template only}}");
        assert!(matches!(
            process_page(page, &ExtractOptions::default()).unwrap(),
            PageOutput::Empty
        ));
    }

    #[test]
    fn keep_anchors_flows_through() {
        let page = article(
            5,
            "State",
            "The [[State (polity)#Definitions|state as defined here]] keeps coming up in political theory debates.",
        );
        let opts = ExtractOptions {
            keep_anchors: true,
            ..Default::default()
        };
        match process_page(page, &opts).unwrap() {
            PageOutput::Record { json, .. } => {
                assert!(json.contains("State (polity)#Definitions"));
            }
            _ => panic!("expected record"),
        }
    }
}
