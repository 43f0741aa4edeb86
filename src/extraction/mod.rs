use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use reqwest::Client;

use crate::images;
use crate::telemetry::{self};
use crate::telemetry::ops::extract::Phase as ExtractPhase;

pub mod apollo;
pub mod build;
pub mod contact;
pub mod finder;
pub mod ids;
pub mod normalize;
pub mod page;
pub mod probe;
pub mod types;
mod write;

#[derive(Args)]
pub struct ExtractCmd {
    /// HTML files (or directories of them) of already-fetched listing pages
    pub paths: Vec<PathBuf>,
    /// Source URL override; useful when extracting a single saved page
    #[arg(long)] pub url: Option<String>,
    #[arg(long, default_value_t = false)] pub apply: bool,
    #[arg(long, default_value_t = 10)] pub plan_limit: usize,
    /// Skip the image enrichment stage entirely
    #[arg(long, default_value_t = false)] pub no_images: bool,
    #[arg(long, default_value_t = 10_000_000)] pub max_image_bytes: usize,
    #[arg(long, default_value_t = 20)] pub image_timeout_secs: u64,
    /// Write records here as JSONL instead of stdout
    #[arg(long)] pub out: Option<PathBuf>,
    /// Store fetched image bytes as files in this directory
    #[arg(long)] pub images_dir: Option<PathBuf>,
    /// Retain pages that yielded no record here, for offline diagnosis
    #[arg(long)] pub keep_unparsed: Option<PathBuf>,
}

pub async fn run(args: ExtractCmd) -> Result<()> {
    let log = telemetry::extract();
    let _g = log.root_span_kv([
        ("apply", args.apply.to_string()),
        ("paths", (args.paths.len() as i64).to_string()),
        ("no_images", args.no_images.to_string()),
    ]).entered();

    let files = collect_files(&args.paths)?;

    if !args.apply {
        if telemetry::config::json_mode() {
            use types::{ExtractPlan, FileSample};
            let samples: Vec<FileSample> = files.iter().take(args.plan_limit)
                .map(|p| FileSample { path: p.display().to_string() })
                .collect();
            let plan = ExtractPlan { files: files.len(), images: !args.no_images, sample_files: samples };
            log.plan(&plan)?;
        } else {
            log.info(format!("📝 Extract plan — files={} images={}", files.len(), !args.no_images));
            for p in files.iter().take(args.plan_limit) { log.info(format!("  {}", p.display())); }
            if files.len() > args.plan_limit { log.info(format!("  ... ({} more)", files.len() - args.plan_limit)); }
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    let client = Client::new();
    let caps = images::FetchCaps {
        max_bytes: args.max_image_bytes,
        timeout: Duration::from_secs(args.image_timeout_secs),
    };
    let mut sink = write::Sink::open(args.out.as_deref())?;

    let mut extracted = 0usize;
    let mut dropped = 0usize;
    let mut images_fetched = 0usize;
    let mut errors = 0usize;

    use types::PageSummary;
    let mut pages: Vec<PageSummary> = Vec::new();

    for file in &files {
        let path = file.display().to_string();
        let _page_span = log.span_kv(&ExtractPhase::Page, [("path", path.clone())]).entered();

        let html = match fs::read_to_string(file) {
            Ok(html) => html,
            Err(err) => {
                errors += 1;
                log.error_kv("unreadable page", [("path", path.clone()), ("error", err.to_string())]);
                pages.push(PageSummary { path, outcome: "unreadable".to_string(), source: None, hemnet_id: None });
                continue;
            }
        };
        let page_url = args.url.clone().unwrap_or_else(|| path.clone());

        let payloads = {
            let _s = log.span(&ExtractPhase::Probe).entered();
            probe::probe(&html)
        };
        let built = {
            let _s = log.span(&ExtractPhase::Build).entered();
            build::build(&page_url, &html, &payloads)
        };

        match built {
            Ok(mut record) => {
                if !args.no_images {
                    let _s = log.span(&ExtractPhase::Images).entered();
                    images_fetched += images::enrich(&mut record, &client, &caps).await;
                }
                if let Some(dir) = &args.images_dir {
                    write::save_images(dir, &record)?;
                }
                {
                    let _s = log.span(&ExtractPhase::WriteRecord).entered();
                    sink.write_record(&record)?;
                }
                extracted += 1;
                let source = record.source_used.map(|s| s.as_str().to_string());
                log.page_outcome(&path, "extracted", source.as_deref());
                pages.push(PageSummary { path, outcome: "extracted".to_string(), source, hemnet_id: record.hemnet_id });
            }
            Err(err) => {
                dropped += 1;
                log.warn_kv("page dropped", [
                    ("reason", err.reason().to_string()),
                    ("url", page_url.clone()),
                ]);
                if let Some(dir) = &args.keep_unparsed {
                    write::retain_page(dir, &page_url, &html, err.reason())?;
                }
                log.page_outcome(&path, err.reason(), None);
                pages.push(PageSummary { path, outcome: err.reason().to_string(), source: None, hemnet_id: None });
            }
        }
    }

    sink.flush()?;
    log.totals(extracted, dropped, images_fetched, errors);

    if telemetry::config::json_mode() {
        use types::{ExtractApply, ExtractTotals};
        let result = ExtractApply {
            totals: ExtractTotals { extracted, dropped, images: images_fetched, errors },
            pages,
        };
        log.result(&result)?;
    }
    Ok(())
}

// Files extract in sorted order so runs are reproducible.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in fs::read_dir(path)
                .with_context(|| format!("reading {}", path.display()))?
            {
                let entry = entry?;
                let p = entry.path();
                if is_html(&p) {
                    files.push(p);
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    Ok(files)
}

fn is_html(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("html") | Some("htm")
    )
}
