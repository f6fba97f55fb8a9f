// src/main.rs

use taskgraph::{cli, config, demo, exec, logging, run};

#[tokio::main]
async fn main() {
    let result = if exec::is_worker_process() {
        worker_main()
    } else {
        run_main().await
    };

    if let Err(err) = result {
        eprintln!("taskgraph error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let cfg = config::load_or_default(args.config.as_deref())?;
    logging::init_logging(args.log_level.or(cfg.logging.level), cfg.logging.format)?;
    run(args, cfg).await
}

/// Started by the process pool: answer one request on stdin.
fn worker_main() -> anyhow::Result<()> {
    logging::init_logging(None, cli::LogFormat::Text)?;
    exec::serve_stdio(&demo::demo_registry()?)?;
    Ok(())
}
