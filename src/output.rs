//! Output file management: article records go to rotating files
//! `AA/wiki00`, `AA/wiki01`, ... capped at a configured size, optionally
//! bzip2-compressed. Alongside the record files the splitter maintains
//! `index.tsv` (url, relative path, line number), `redirects.tsv` and
//! `categories.tsv`.

use crate::config::FILES_PER_DIR;
use anyhow::{anyhow, Context, Result};
use bzip2::write::BzEncoder;
use bzip2::Compression;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

enum RecordSink {
    Plain(BufWriter<File>),
    Compressed(BufWriter<BzEncoder<File>>),
}

impl RecordSink {
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match self {
            RecordSink::Plain(w) => w.write_all(bytes),
            RecordSink::Compressed(w) => w.write_all(bytes),
        }
    }

    fn close(self) -> Result<()> {
        match self {
            RecordSink::Plain(mut w) => w.flush().context("Failed to flush record file"),
            RecordSink::Compressed(w) => {
                let encoder = w
                    .into_inner()
                    .map_err(|e| anyhow!("Failed to flush compressed record file: {}", e))?;
                encoder
                    .finish()
                    .context("Failed to finish bzip2 stream")?;
                Ok(())
            }
        }
    }
}

pub struct OutputSplitter {
    root: PathBuf,
    compress: bool,
    max_file_size: u64,
    dir_index: u32,
    file_index: u32,
    cur_file_size: u64,
    line_number: u64,
    sink: RecordSink,
    current_rel_path: String,
    index_file: BufWriter<File>,
    categories_file: BufWriter<File>,
    redirects_file: BufWriter<File>,
}

impl OutputSplitter {
    pub fn new(output_dir: &str, compress: bool, max_file_size: u64) -> Result<Self> {
        let root = PathBuf::from(output_dir);
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create output directory: {}", output_dir))?;

        let (sink, current_rel_path) = open_record_file(&root, compress, 0, 0)?;

        let index_file = open_tsv(&root, "index.tsv")?;
        let categories_file = open_tsv(&root, "categories.tsv")?;
        let redirects_file = open_tsv(&root, "redirects.tsv")?;

        Ok(Self {
            root,
            compress,
            max_file_size,
            dir_index: 0,
            file_index: 0,
            cur_file_size: 0,
            line_number: 0,
            sink,
            current_rel_path,
            index_file,
            categories_file,
            redirects_file,
        })
    }

    /// Writes one JSON record line and its index entry, rotating to a new
    /// record file when the current one would exceed the size cap.
    pub fn write_record(&mut self, url: &str, json_line: &str) -> Result<()> {
        let len = json_line.len() as u64 + 1;
        // An oversized record in a fresh file is written as-is rather than
        // rotating away from an empty file.
        if self.cur_file_size > 0 && self.cur_file_size + len > self.max_file_size {
            self.rotate()?;
        }

        self.sink
            .write_all(json_line.as_bytes())
            .context("Failed to write record")?;
        self.sink
            .write_all(b"\n")
            .context("Failed to write record")?;
        self.cur_file_size += len;

        writeln!(
            self.index_file,
            "{}\t{}\t{}",
            url, self.current_rel_path, self.line_number
        )
        .context("Failed to write index entry")?;
        self.line_number += 1;
        Ok(())
    }

    pub fn write_redirect(&mut self, url: &str, target_url: &str) -> Result<()> {
        writeln!(self.redirects_file, "{}\t{}", url, target_url)
            .context("Failed to write redirect entry")
    }

    pub fn write_category_parents(&mut self, url: &str, parent_urls: &[String]) -> Result<()> {
        for parent in parent_urls {
            writeln!(self.categories_file, "{}\t{}", url, parent)
                .context("Failed to write category entry")?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.file_index += 1;
        if self.file_index == FILES_PER_DIR {
            self.dir_index += 1;
            self.file_index = 0;
        }
        let (sink, rel_path) =
            open_record_file(&self.root, self.compress, self.dir_index, self.file_index)?;
        let old = std::mem::replace(&mut self.sink, sink);
        old.close()?;

        debug!(path = %rel_path, "Opened next record file");
        self.current_rel_path = rel_path;
        self.cur_file_size = 0;
        self.line_number = 0;
        Ok(())
    }

    pub fn close(self) -> Result<()> {
        self.sink.close()?;
        let mut index_file = self.index_file;
        index_file.flush().context("Failed to flush index.tsv")?;
        let mut categories_file = self.categories_file;
        categories_file
            .flush()
            .context("Failed to flush categories.tsv")?;
        let mut redirects_file = self.redirects_file;
        redirects_file
            .flush()
            .context("Failed to flush redirects.tsv")?;
        Ok(())
    }
}

fn open_tsv(root: &Path, name: &str) -> Result<BufWriter<File>> {
    let path = root.join(name);
    Ok(BufWriter::new(File::create(&path).with_context(|| {
        format!("Failed to create {}", path.display())
    })?))
}

/// Two-letter directory name: AA, AB, ... AZ, BA, ...
fn dir_name(dir_index: u32) -> String {
    let high = (b'A' + (dir_index / 26 % 26) as u8) as char;
    let low = (b'A' + (dir_index % 26) as u8) as char;
    format!("{}{}", high, low)
}

fn open_record_file(
    root: &Path,
    compress: bool,
    dir_index: u32,
    file_index: u32,
) -> Result<(RecordSink, String)> {
    let dir = root.join(dir_name(dir_index));
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let base = format!("wiki{:02}", file_index);
    let (file_name, rel_path) = if compress {
        let name = format!("{}.bz2", base);
        let rel = format!("{}/{}", dir_name(dir_index), name);
        (name, rel)
    } else {
        let rel = format!("{}/{}", dir_name(dir_index), base);
        (base, rel)
    };

    let file = File::create(dir.join(&file_name))
        .with_context(|| format!("Failed to create record file: {}", rel_path))?;
    let sink = if compress {
        RecordSink::Compressed(BufWriter::new(BzEncoder::new(file, Compression::default())))
    } else {
        RecordSink::Plain(BufWriter::new(file))
    };
    Ok((sink, rel_path))
}
