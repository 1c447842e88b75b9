use bobtail_consensus_core::{
    KType,
    config::{
        ConfigBuilder,
        params::{DEVNET_PARAMS, SIMNET_PARAMS, ScoreAggregation},
    },
};
use bobtail_core::{error, info, log::init_logger, panic::configure_panic};
use clap::Parser;
use config::ParamsOverrides;
use errors::{SimError, SimResult};
use simulator::network::{BobtailNetworkSimulator, SimReport};
use std::{path::PathBuf, process::ExitCode};

mod config;
mod errors;
mod simulator;

/// Bobtail Network Simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of engine instances
    #[arg(short, long, default_value_t = 4)]
    nodes: u64,

    /// Number of miners
    #[arg(short, long, default_value_t = 8)]
    miners: u64,

    /// Network-wide subblocks per second
    #[arg(short, long, default_value_t = 10.0)]
    rate: f64,

    /// Maximal propagation delay (seconds)
    #[arg(short, long, default_value_t = 0.5)]
    delay: f64,

    /// Target simulation time (seconds)
    #[arg(short, long, default_value_t = 60)]
    sim_time: u64,

    /// Number of subblocks per strong block, overriding the network param
    #[arg(short)]
    k: Option<KType>,

    /// Aggregate subblock ranks with the geometric rather than the arithmetic mean
    #[arg(long, default_value_t = false)]
    geometric: bool,

    /// Use simnet params, which enable the KOS admission threshold
    #[arg(long, default_value_t = false)]
    simnet: bool,

    /// TOML file overriding consensus params
    #[arg(long)]
    params: Option<PathBuf>,

    /// Seed of all simulation randomness
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Logging filters, e.g. `info,bobtail_consensus=debug`
    #[arg(long = "loglevel", default_value = "info")]
    log_level: String,

    /// Avoid verbose simulation information
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = init_logger(None, &args.log_level) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }
    configure_panic();
    match run(args) {
        Ok(report) if report.converged() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> SimResult<SimReport> {
    if args.rate.is_nan() || args.rate <= 0.0 || args.delay < 0.0 {
        return Err(SimError::Args("the rate must be positive and the delay non-negative".to_string()));
    }
    let mut params = if args.simnet { SIMNET_PARAMS } else { DEVNET_PARAMS };
    if let Some(path) = args.params.as_deref() {
        ParamsOverrides::from_file(path)?.apply(&mut params);
    }
    if let Some(k) = args.k {
        params.bobtail_k = k;
    }
    if args.geometric {
        params.score_aggregation = ScoreAggregation::GeometricMean;
    }
    params.validate()?;

    let config = ConfigBuilder::new(params).apply_args(|config| config.validation_threads = 2).build();
    info!(
        "Simulating {} nodes and {} miners at {} subblocks/s with delays up to {}s [k={}, {:?}]",
        args.nodes, args.miners, args.rate, args.delay, config.bobtail_k, config.score_aggregation
    );

    let until = args.sim_time * 1000; // milliseconds
    let mut sim = BobtailNetworkSimulator::new(args.delay, args.rate, config, args.seed);
    let report = sim.init(args.nodes, args.miners, !args.quiet)?.run(until);
    print_stats(&report);
    Ok(report)
}

fn print_stats(report: &SimReport) {
    for node in report.nodes.iter() {
        let counters = &node.counters;
        println!(
            "[Node {}] height: {}, tip: {}, work: {}, linked: {}/{}, finalized: {}, adopted: {}, relayed: {}, forks: {}, stale subblocks: {}, rejected: {}, orphans buffered: {}, expired: {}",
            node.id,
            node.height,
            node.tip,
            node.chain_work,
            counters.subblocks_linked,
            counters.subblocks_submitted,
            counters.strong_blocks_finalized,
            node.adopted_blocks,
            node.relayed_blocks,
            node.forks,
            node.stale_subblocks,
            node.rejected_subblocks,
            counters.orphans_buffered,
            node.orphans_expired,
        );
    }
    let total_forks: u64 = report.nodes.iter().map(|node| node.forks).sum();
    println!("[Network] common chain height: {}, forks observed: {}, converged: {}", report.common_height, total_forks, report.converged());
}
