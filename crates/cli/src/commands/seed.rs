use krishi_core::Stage;
use krishi_storage::RecordStore;
use krishi_trace::{seed_demo, DEMO_PASSWORD};

use super::{print_json, CmdResult, Context};
use crate::backend::open_backend;
use crate::OutputFormat;

pub(crate) async fn cmd_seed(ctx: &Context) -> CmdResult {
    let path = ctx
        .data
        .as_deref()
        .ok_or("seed needs a data file: pass --data <file> or set KRISHI_DATA")?;
    let backend = open_backend(Some(path), ctx.prices.as_deref()).await?;
    if backend.ledger.store().count_by_stage(Stage::Harvest).await? > 0 {
        return Err(format!("'{}' already holds records", path.display()).into());
    }

    let demo = seed_demo(&backend.ledger, &backend.auth).await?;

    if ctx.quiet {
        return Ok(());
    }
    match ctx.output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "data": path.display().to_string(),
            "accounts": demo.actors.iter().map(|a| &a.email).collect::<Vec<_>>(),
            "records": demo.records.iter().map(|r| &r.record_id).collect::<Vec<_>>(),
            "password": DEMO_PASSWORD,
        })),
        OutputFormat::Text => {
            println!(
                "seeded {} accounts and {} records into {}",
                demo.actors.len(),
                demo.records.len(),
                path.display()
            );
            for actor in &demo.actors {
                println!("  {:<24} {}", actor.email, actor.role);
            }
            println!("password for every demo account: {}", DEMO_PASSWORD);
            Ok(())
        }
    }
}
