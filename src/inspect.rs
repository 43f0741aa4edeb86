use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::extraction::types::PayloadKind;
use crate::extraction::{apollo, finder, probe};
use crate::telemetry;
use crate::telemetry::ops::inspect::Phase as InspectPhase;

#[derive(Args, Debug)]
pub struct InspectCmd {
    /// HTML file of an already-fetched listing page
    pub path: PathBuf,
}

/// entry point for inspect: report which embedded payloads a page exposes
pub fn run(args: InspectCmd) -> Result<()> {
    let log = telemetry::inspect();
    let _g = log.root_span_kv([("path", args.path.display().to_string())]).entered();

    let html = std::fs::read_to_string(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;

    let payloads = {
        let _s = log.span(&InspectPhase::Probe).entered();
        probe::probe(&html)
    };

    let _s = log.span(&InspectPhase::Report).entered();
    println!("🔎 {}:", args.path.display());
    if payloads.is_empty() {
        println!("  no embedded payloads found");
        return Ok(());
    }

    for payload in &payloads {
        match payload.kind {
            PayloadKind::SsrTree => {
                println!("  payload: {}", payload.kind.as_str());
                match apollo::apollo_state(&payload.value) {
                    Some(state) => {
                        println!(
                            "    {}: {} keys",
                            PayloadKind::NormalizedCacheRoot.as_str(),
                            state.len()
                        );
                        match apollo::active_listing_root(state) {
                            Some(root) => println!(
                                "    active listing root: id={}",
                                root.get("id").map(|v| v.to_string()).unwrap_or_else(|| "?".into())
                            ),
                            None => println!("    no active listing root"),
                        }
                    }
                    None => match finder::find(&payload.value) {
                        Some(node) => println!(
                            "    tree search hit: id={}",
                            node.get("id").map(|v| v.to_string()).unwrap_or_else(|| "?".into())
                        ),
                        None => println!("    no property-shaped node"),
                    },
                }
            }
            _ => {
                let fields = payload.value.as_object().map(|o| o.len()).unwrap_or(0);
                println!("  payload: {} ({} fields)", payload.kind.as_str(), fields);
            }
        }
    }
    Ok(())
}
