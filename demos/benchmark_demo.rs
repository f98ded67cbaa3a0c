//! Benchmark Engine Demo
//!
//! Walks the full engine surface: catalog seeding, a synchronous KEM run,
//! background dispatch of signature tasks, then the reporting layer.
//!
//! Run with: cargo run --example benchmark_demo

use std::time::Duration;

use pqbench::{BackendMode, Engine, EngineConfig, TaskFilter, TaskStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pqbench=info".into()),
        )
        .init();

    println!("=== pqbench Benchmark Demo ===\n");

    // -------------------------------------------------------------------------
    // 1. Engine construction (native when liboqs is present, else simulator)
    // -------------------------------------------------------------------------
    let config = EngineConfig::builder()
        .backend_mode(BackendMode::Native)
        .simulated_delay(Duration::from_millis(1))
        .build();
    let engine = Engine::builder()
        .config(config)
        .with_default_catalog(true)
        .build();

    println!("1. Engine up on the '{}' backend", engine.backend_kind());
    let supported = engine.supported_algorithms();
    println!("   KEMs: {:?}", supported.kems());
    println!("   Signatures: {:?}", supported.signatures());

    // -------------------------------------------------------------------------
    // 2. Algorithm catalog
    // -------------------------------------------------------------------------
    println!("\n2. Algorithm catalog:");
    for algorithm in engine.list_algorithms(None, true) {
        println!(
            "   [{}] {} ({}, {})",
            algorithm.id(),
            algorithm.name(),
            algorithm.category(),
            algorithm.binding_name()
        );
    }

    // -------------------------------------------------------------------------
    // 3. Synchronous KEM run
    // -------------------------------------------------------------------------
    let kyber = engine.algorithm_by_name("Kyber768").expect("catalog seeded");
    let task = engine.create_task(kyber.id(), "kyber768-demo", 25)?;
    println!(
        "\n3. Running task '{}' ({} rounds)...",
        task.name(),
        task.rounds()
    );

    let finished = engine.run_task(task.id())?;
    println!("   Status: {}", finished.status());

    // -------------------------------------------------------------------------
    // 4. Summary statistics
    // -------------------------------------------------------------------------
    if let Some(summary) = engine.summarize(task.id())? {
        println!("\n4. Summary statistics:");
        let mut metrics: Vec<_> = summary.iter().collect();
        metrics.sort_by(|a, b| a.0.cmp(b.0));
        for (metric, stats) in metrics {
            println!(
                "   {metric:18} mean={:>9.4} median={:>9.4} std={:.4} (n={})",
                stats.mean(),
                stats.median(),
                stats.std_dev(),
                stats.sample_count()
            );
        }
    }

    // -------------------------------------------------------------------------
    // 5. Background dispatch of signature tasks
    // -------------------------------------------------------------------------
    println!("\n5. Dispatching signature tasks in the background...");
    let dispatcher = engine.dispatcher();
    let dilithium = engine.algorithm_by_name("Dilithium2").expect("catalog seeded");
    let falcon = engine.algorithm_by_name("Falcon512").expect("catalog seeded");

    let dilithium_task = engine.create_task(dilithium.id(), "dilithium2-demo", 25)?;
    let falcon_task = engine.create_task(falcon.id(), "falcon512-demo", 25)?;
    dispatcher.submit(dilithium_task.id()).await?;
    dispatcher.submit(falcon_task.id()).await?;

    for task_id in [dilithium_task.id(), falcon_task.id()] {
        loop {
            let report = engine.task_status(task_id)?;
            if report.task().status().is_terminal() {
                println!(
                    "   task {} -> {} ({} samples)",
                    task_id,
                    report.task().status(),
                    report.sample_count()
                );
                break;
            }
            println!("   task {} {}% complete", task_id, report.progress());
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
    dispatcher.shutdown().await;

    // -------------------------------------------------------------------------
    // 6. Cross-algorithm comparison
    // -------------------------------------------------------------------------
    println!("\n6. Cross-algorithm comparison:");
    let comparison = engine.compare_algorithms(&[kyber.id(), dilithium.id(), falcon.id()]);
    for entry in comparison.entries() {
        let keygen = entry.metrics().get("keygen_time").copied().unwrap_or(0.0);
        let rate = entry.metrics().get("success_rate").copied().unwrap_or(0.0);
        println!(
            "   {:12} keygen={keygen:.4}ms success={rate:.1}%",
            entry.algorithm_name()
        );
    }

    let keygen_only =
        engine.compare_metric(&[kyber.id(), dilithium.id(), falcon.id()], "keygen_time");
    for entry in keygen_only.entries() {
        println!(
            "   {:12} keygen mean={:.4}ms std={:.4}",
            entry.algorithm_name(),
            entry.summary().mean(),
            entry.summary().std_dev()
        );
    }

    // -------------------------------------------------------------------------
    // 7. History and distribution
    // -------------------------------------------------------------------------
    let history = engine.history(kyber.id(), "keygen_time", 7)?;
    println!(
        "\n7. keygen_time history over {} day(s): {} completed task(s)",
        history.window_days(),
        history.points().len()
    );

    if let Some(dist) = engine.metric_distribution(task.id(), "keygen_time", 8)? {
        println!(
            "   Distribution over [{:.4}, {:.4}] ms:",
            dist.min(),
            dist.max()
        );
        for (i, count) in dist.counts().iter().enumerate() {
            println!("   bin {i}: {}", "#".repeat(usize::try_from(*count)?));
        }
    }

    // -------------------------------------------------------------------------
    // 8. Task listing
    // -------------------------------------------------------------------------
    let completed =
        engine.list_tasks(&TaskFilter::new().with_status(TaskStatus::Completed), 0, 10);
    println!("\n8. {} completed task(s) on record", completed.len());

    println!("\n=== Demo Complete ===");
    Ok(())
}
