use anyhow::Context;
use keeper_core::orchestrator::{Evaluator, TickPolicy};
use keeper_core::report::Reporter;

use crate::output::{print_fields, print_json};
use crate::setup::{self, ConfigArgs};

/// One read-only registry evaluation. Never submits a transaction.
pub fn run(args: &ConfigArgs, json: bool) -> anyhow::Result<()> {
    let wallet = setup::load_wallet()?;
    let config = args.effective()?;
    setup::ensure_valid(&config)?;
    let ctx = setup::build_context(&config, wallet)?;
    let registry = ctx.registry.clone();

    let evaluator = Evaluator::new(ctx, TickPolicy::from_config(&config), Reporter::new());
    let rt = tokio::runtime::Runtime::new()?;
    let decision = rt
        .block_on(evaluator.check())
        .with_context(|| format!("checking registry {registry}"))?;

    if json {
        print_json(&serde_json::json!({
            "registry": registry,
            "decision": decision,
        }))?;
    } else {
        print_fields(&[
            ("registry", registry),
            ("needed", decision.needed.to_string()),
            ("payload", format!("0x{}", hex::encode(&decision.payload))),
            ("payload_bytes", decision.payload.len().to_string()),
        ]);
    }
    Ok(())
}
