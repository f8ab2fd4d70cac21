use std::fs;

use anyhow::Context;
use noisegraph_core::NoiseContext;
use noisegraph_soft::SoftBackend;
use serde_json::to_string_pretty;

/// Print the node registry of the software backend as JSON, or write it to
/// the path given as the first argument.
fn main() -> anyhow::Result<()> {
    let ctx = NoiseContext::new(SoftBackend::new()).context("loading the soft backend registry")?;
    let json = to_string_pretty(ctx.registry()).context("serializing the registry")?;

    match std::env::args().nth(1) {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("writing registry to {path}"))?;
            println!("wrote {} node kinds to {path}", ctx.registry().len());
        }
        None => println!("{json}"),
    }
    Ok(())
}
