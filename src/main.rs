use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::info;
use url::Url;

use sitemap_extract::parser::{CONTENT_TYPE_KEY, IS_SITEMAP_KEY};
use sitemap_extract::{Document, ExtractorConfig, Metadata, OutputRecord, Pipeline};

#[derive(Parser)]
#[command(name = "sitemap-extract", about = "Extract URLs and metadata from sitemap files")]
struct Cli {
    /// Sitemap files, plain or gzipped
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// URL the document was fetched from (default: the file path)
    #[arg(long)]
    url: Option<String>,

    /// Tell the classifier up front whether the input is a sitemap
    #[arg(long)]
    is_sitemap: Option<bool>,

    /// Content type reported by the server
    #[arg(long)]
    content_type: Option<String>,

    /// Character encoding reported by the server
    #[arg(long)]
    encoding: Option<String>,

    /// Sniff the content when there is no other hint
    #[arg(long)]
    sniff: bool,

    /// Extensions to extract (IMAGE, VIDEO, NEWS, MOBILE, LINKS)
    #[arg(short, long, value_delimiter = ',')]
    extensions: Vec<String>,

    /// Drop entries last modified more than N hours ago
    #[arg(long)]
    filter_hours: Option<i64>,

    /// Upstream metadata for every input, e.g. `-m depth=1`
    #[arg(short = 'm', long = "meta", value_parser = parse_key_value)]
    metadata: Vec<(String, String)>,

    /// Metadata keys copied onto every discovered URL
    #[arg(long, value_delimiter = ',')]
    transfer: Vec<String>,
}

impl Cli {
    fn config(&self) -> anyhow::Result<ExtractorConfig> {
        let mut config = ExtractorConfig::from_env().context("Failed to read SITEMAP_* settings")?;
        if self.sniff {
            config.sniff_content = true;
        }
        if !self.extensions.is_empty() {
            config.extensions = self.extensions.clone();
        }
        if self.filter_hours.is_some() {
            config.filter_hours_since_modified = self.filter_hours;
        }
        if !self.transfer.is_empty() {
            config.metadata_transfer = self.transfer.clone();
        }
        Ok(config)
    }

    fn document(&self, path: &Path) -> anyhow::Result<Document> {
        let content =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let url = match &self.url {
            Some(url) => url.clone(),
            None => file_url(path),
        };

        let mut metadata = Metadata::new();
        for (key, value) in &self.metadata {
            metadata.add_value(key.as_str(), value.as_str());
        }
        if let Some(flag) = self.is_sitemap {
            metadata.set_value(IS_SITEMAP_KEY, flag.to_string());
        }
        if let Some(ct) = &self.content_type {
            metadata.set_value(CONTENT_TYPE_KEY, ct.as_str());
        }

        let mut doc = Document::new(url, content).with_metadata(metadata);
        if let Some(encoding) = &self.encoding {
            doc = doc.with_encoding(encoding.as_str());
        }
        Ok(doc)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    if cli.url.is_some() && cli.files.len() > 1 {
        bail!("--url can only be used with a single input file");
    }

    let pipeline = Pipeline::new(&cli.config()?).context("Invalid extractor configuration")?;

    let pb = if cli.files.len() > 1 {
        let pb = ProgressBar::new(cli.files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    // Documents are independent; run them in parallel, print in input order.
    let results: Vec<anyhow::Result<Vec<OutputRecord>>> = cli
        .files
        .par_iter()
        .map(|path| {
            let doc = cli.document(path)?;
            let processed = pipeline.process(&doc);
            pb.inc(1);
            Ok(processed.records)
        })
        .collect();
    pb.finish_and_clear();

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut documents = 0;
    let mut records = 0;
    for result in results {
        let batch = result?;
        documents += 1;
        records += batch.len();
        for record in &batch {
            serde_json::to_writer(&mut out, record)?;
            writeln!(out)?;
        }
    }
    out.flush()?;

    info!(
        documents,
        records,
        elapsed = %format_duration(t0.elapsed()),
        "Done"
    );
    Ok(())
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{}`", raw));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn file_url(path: &Path) -> String {
    std::fs::canonicalize(path)
        .ok()
        .and_then(|abs| Url::from_file_path(abs).ok())
        .map(String::from)
        .unwrap_or_else(|| path.display().to_string())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
