use serde::Serialize;
use serde_json::Value;

/// Which embedded JSON shape a probed payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// `sold_property` object in the inline analytics array
    LegacySold,
    /// `property` object in the inline analytics array
    LegacyActive,
    /// full server-side-rendered JSON tree
    SsrTree,
    /// normalized key→object cache inside the SSR tree
    NormalizedCacheRoot,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::LegacySold => "legacy-sold",
            PayloadKind::LegacyActive => "legacy-active",
            PayloadKind::SsrTree => "ssr-tree",
            PayloadKind::NormalizedCacheRoot => "normalized-cache-root",
        }
    }
}

/// One candidate payload lifted off a page. Parsed once, consumed once.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub kind: PayloadKind,
    pub value: Value,
}

// Plan envelope types
#[derive(Serialize)]
pub struct FileSample { pub path: String }

#[derive(Serialize)]
pub struct ExtractPlan { pub files: usize, pub images: bool, pub sample_files: Vec<FileSample> }

// Apply/result envelope types
#[derive(Serialize)]
pub struct PageSummary {
    pub path: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hemnet_id: Option<i64>,
}

#[derive(Serialize)]
pub struct ExtractTotals { pub extracted: usize, pub dropped: usize, pub images: usize, pub errors: usize }

#[derive(Serialize)]
pub struct ExtractApply { pub totals: ExtractTotals, pub pages: Vec<PageSummary> }
