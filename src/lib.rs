//! Annowiki: annotated plain-text extraction from Wikipedia XML dumps
//!
//! This crate turns a Wikipedia dump into one JSON record per article,
//! containing the article's cleaned plain text together with
//! offset-indexed annotations for every retained internal link:
//!
//! ```json
//! {"id":12,"url":"http://en.wikipedia.org/wiki/Anarchism","title":"Anarchism",
//!  "text":"Anarchism.\nAnarchism is a political philosophy...",
//!  "annotations":[{"offset":11,"uri":"Anarchism","surface_form":"Anarchism"}]}
//! ```
//!
//! # Pipeline
//!
//! Each article goes through three passes over its markup:
//!
//! 1. **Clean** -- strip templates, tables, HTML residue and formatting
//!    while leaving `[[...]]` links intact ([`clean::strip_markup`])
//! 2. **Compact** -- turn the cleaned markup into the final prose layout:
//!    title and headings become sentences, list markers and filler lines
//!    go away ([`clean::compact`])
//! 3. **Annotate** -- a single forward scan that rewrites each retained
//!    link to its surface form and records the character offset of that
//!    surface form in the output text ([`annotate::annotate`])
//!
//! The annotation offsets are computed against the same pass that produces
//! the final text, so `text[offset..offset+len(surface)]` always recovers
//! the surface form.
//!
//! # Architecture
//!
//! - **Streaming XML parsing** -- the dump is never loaded whole; pages
//!   come out of an event-based reader with on-the-fly BZ2 decompression
//! - **Parallel extraction** -- per-article processing is pure and
//!   stateless, so batches of pages are mapped with rayon; writes stay
//!   sequential, keeping output byte-identical across runs
//! - **Rotating output** -- records are split across size-capped files
//!   (`AA/wiki00`, ...) with an index, optionally bzip2-compressed
//!
//! # Key Modules
//!
//! - [`parser`] -- streaming XML dump reader with BZ2 decompression
//! - [`clean`] -- markup cleaning and prose compaction
//! - [`annotate`] -- link scanning and offset bookkeeping
//! - [`extract`] -- batch driver tying the pipeline together
//! - [`output`] -- rotating record files plus index/redirect/category TSVs
//! - [`models`] -- core data types (WikiPage, ArticleRecord, Annotation)
//! - [`stats`] -- thread-safe counters for the run summary
//! - [`config`] -- extraction constants
//!
//! # Example Usage
//!
//! ```bash
//! # Extract a dump into 500K record files
//! annowiki -i enwiki-latest-pages-articles.xml.bz2 -o output/
//!
//! # Compressed output, keep anchor links, 8 workers
//! annowiki -i dump.xml.bz2 -o output/ -c -k -w 8
//! ```

pub mod annotate;
pub mod clean;
pub mod config;
pub mod extract;
pub mod models;
pub mod output;
pub mod parser;
pub mod stats;
