//! The winc payment service daemon: assembles the ledger, gateways, and
//! background workers, then runs until interrupted.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use winc_common::{shutdown::ShutdownSignal, task::NamedTask};
use winc_ledger::LedgerDb;
use winc_node::{
    config::Config,
    gateways::build_gateway_map,
    logger,
    notify::TracingSink,
    pipeline::CreditPipeline,
    pricing::FixedRatePricing,
    service::PaymentService,
    sweeper::ExpirySweeper,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();

    let config = Arc::new(Config::from_env().context("bad configuration")?);
    let ledger = LedgerDb::new();
    let gateways = build_gateway_map(&config);
    let sink = Arc::new(TracingSink);
    let shutdown = ShutdownSignal::new();

    // The HTTP layer mounts on top of this service handle.
    let _service = PaymentService::new(
        ledger.clone(),
        gateways.clone(),
        Arc::new(FixedRatePricing),
        sink.clone(),
        Vec::new(),
        Vec::new(),
        config.clone(),
        shutdown.clone(),
    );

    let pipeline = CreditPipeline::new(
        ledger.clone(),
        gateways,
        config.clone(),
        sink.clone(),
    );
    let pipeline_task = NamedTask::spawn("credit-pipeline", {
        let shutdown = shutdown.clone();
        async move { pipeline.run(shutdown).await }
    });

    let sweeper =
        ExpirySweeper::new(ledger, sink, config.sweep_interval);
    let sweeper_task = NamedTask::spawn("expiry-sweeper", {
        let shutdown = shutdown.clone();
        async move { sweeper.run(shutdown).await }
    });

    info!("winc node running; ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");
    shutdown.send();

    pipeline_task.await.context("credit pipeline task failed")?;
    sweeper_task.await.context("expiry sweeper task failed")?;
    Ok(())
}
