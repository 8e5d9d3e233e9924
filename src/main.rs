mod logging;
mod sorts;

use std::time::Instant;

use anyhow::{Result, ensure};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lapse_format::format_duration;
use lapse_timer::{TimedFn, Timer, TimerRegistry};

/// Times a batch of sorting workloads with named stopwatches and prints
/// the completion summary.
#[derive(Parser)]
#[command(name = "lapse", version, about)]
struct Cli {
    /// Number of independent slices to generate
    #[arg(long, default_value_t = 8)]
    slices: usize,

    /// Elements per slice
    #[arg(long, default_value_t = 3000)]
    slice_len: usize,

    /// RNG seed for a reproducible dataset
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Log this binary's own events at debug instead of info
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    ensure!(cli.slices >= 8, "need at least 8 slices, got {}", cli.slices);

    let run_started = Instant::now();
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut slices: Vec<Vec<i64>> = (0..cli.slices)
        .map(|_| (0..cli.slice_len).map(|_| rng.gen_range(0..100)).collect())
        .collect();

    tracing::info!(
        "sorting {} slices of {} elements (seed {})",
        cli.slices,
        cli.slice_len,
        cli.seed
    );

    // One timer backs every invocation of the wrapped sort.
    let mut selection = TimedFn::new(
        Timer::named("selection pass")
            .with_template("{D}d {H}h {M:02}m {S:02}s {MS:03}ms")
            .with_logger(|line| tracing::info!("{line}")),
        sorts::selection_sort,
    );
    selection.call(slices[7].as_mut_slice())?;

    {
        let mut batch = Timer::new()
            .with_template("{H}h {S}s {MS:03}ms")
            .with_logger(|line| tracing::info!("{line}"));
        let batch_scope = batch.scope()?;
        sorts::bubble_sort(&mut slices[0]);

        let mut merge_pass = Timer::named("merge pass").with_template("{H}h {MS:03}ms");
        let merge_scope = merge_pass.scope()?;
        let _ = sorts::merge_sort(&slices[1]);

        let mut innermost = Timer::named("inner merge");
        innermost.time(|| sorts::merge_sort(&slices[2]))?;

        let rendered = merge_scope.finish()?;
        tracing::debug!("merge pass took {rendered}");
        batch_scope.finish()?;
    }

    {
        let mut wrapper = Timer::named("second batch");
        let wrapper_scope = wrapper.scope()?;

        let mut first = Timer::new();
        first.time(|| sorts::merge_sort(&slices[3]))?;

        let _ = sorts::merge_sort(&slices[4]);

        let mut second = Timer::new();
        second.time(|| sorts::merge_sort(&slices[5]))?;

        wrapper_scope.finish()?;
    }

    let mut manual = Timer::named("manual block");
    manual.start()?;
    let _ = sorts::merge_sort(&slices[6]);
    let rendered = manual.stop()?;
    tracing::debug!("manual block took {rendered}");

    println!("timing summary, most recent first:");
    TimerRegistry::global().report(|line| println!("{line}"));
    println!(
        "total: {}",
        format_duration(run_started.elapsed(), "{M}m {S}s {MS:03}ms")?
    );

    Ok(())
}
