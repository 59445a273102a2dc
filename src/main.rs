use std::sync::Arc;

use call_dispatch::config::parse_var;
use call_dispatch::dispatch::Dispatcher;
use call_dispatch::{DispatcherConfig, Roster, Tier};
use futures::future::join_all;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let calls: usize =
        parse_var(&|key: &str| std::env::var(key).ok(), "CALL_DISPATCH_CALLS")?.unwrap_or(10);

    let config = DispatcherConfig::from_env()?;
    let roster = Roster::from_env()?;

    eprintln!("📞 Call Dispatch v{}", env!("CARGO_PKG_VERSION"));
    for tier in Tier::ESCALATION {
        eprintln!(
            "   {}: {} workers",
            tier,
            roster.tier(tier).map_or(0, <[_]>::len)
        );
    }
    eprintln!(
        "   Pool: {} slots, calls last {:?}..={:?}, contention: {}",
        config.pool_capacity, config.min_call_duration, config.max_call_duration, config.contention
    );
    eprintln!("   Placing {} concurrent calls\n", calls);

    let dispatcher = Arc::new(Dispatcher::new(roster, config)?);

    let attempts = (0..calls).map(|_| {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.dispatch() })
    });
    let outcomes = join_all(attempts).await;

    let mut accepted = 0;
    for outcome in outcomes {
        match outcome? {
            Ok(assignment) => {
                accepted += 1;
                eprintln!(
                    "   ✅ {} → {} #{} ({:?})",
                    assignment.call_id, assignment.tier, assignment.worker_id, assignment.duration
                );
            }
            Err(e) => eprintln!("   ❌ {}", e),
        }
    }
    eprintln!("\n   Accepted {}/{} calls, waiting for them to finish...", accepted, calls);

    dispatcher.shutdown().await;

    for load in dispatcher.load() {
        eprintln!("   {}: {}/{} busy", load.tier, load.busy, load.total);
    }

    Ok(())
}
