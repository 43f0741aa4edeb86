use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::record::{CanonicalRecord, ImageAsset};

/// Terminal stage: one flat field-name → value object per line, to stdout
/// or a file. Image bytes stay out of the stream; they go to disk via
/// `save_images`.
pub struct Sink {
    out: Box<dyn Write>,
}

impl Sink {
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let out: Box<dyn Write> = match path {
            Some(p) => Box::new(BufWriter::new(
                File::create(p).with_context(|| format!("creating {}", p.display()))?,
            )),
            None => Box::new(io::stdout()),
        };
        Ok(Sink { out })
    }

    pub fn write_record(&mut self, record: &CanonicalRecord) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        writeln!(self.out)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Write fetched image bytes next to the record stream, named by listing id.
pub fn save_images(dir: &Path, record: &CanonicalRecord) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let stem = record
        .hemnet_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "listing".to_string());

    let mut written = Vec::new();
    for (slot, asset) in [
        ("main", record.main_image.as_ref()),
        ("floorplan", record.floorplan_image.as_ref()),
    ] {
        let Some(asset) = asset else { continue };
        let path = dir.join(format!("{stem}_{slot}.{}", ext_for_mime(asset)));
        fs::write(&path, &asset.bytes).with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

fn ext_for_mime(asset: &ImageAsset) -> &'static str {
    let mime = asset
        .mime
        .as_deref()
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("");
    match mime.trim() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// Keep the raw page for offline diagnosis when nothing could be
/// extracted. One file per (page, reason); an existing file is left alone.
pub fn retain_page(dir: &Path, page_url: &str, html: &str, reason: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let slug = sanitize_slug(page_url);
    let path = dir.join(format!("{slug}_{reason}.html"));
    if !path.exists() {
        fs::write(&path, html).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(path)
}

fn sanitize_slug(page_url: &str) -> String {
    let path = match url::Url::parse(page_url) {
        Ok(u) => u.path().to_string(),
        Err(_) => page_url.to_string(),
    };
    let slug: String = path
        .trim_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if slug.is_empty() { "listing".to_string() } else { slug }
}
