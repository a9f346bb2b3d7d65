use anyhow::{Context, Result};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

use target_files_diff::cli::{Cli, Commands};
use target_files_diff::config::Config;
use target_files_diff::report::{DIFFS_DIR, SUMMARY_FILE};
use target_files_diff::run::{compare_targets, extract_build_info};

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::WARN,
        (false, 0) => LevelFilter::INFO,
        (false, 1) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compare(args) => {
            init_logging(cli.verbose, args.quiet);

            let mut config = Config::load(cli.config.as_deref())
                .with_context(|| "无法读取配置文件")?;
            args.apply(&mut config);

            let outcome = compare_targets(&config, &args.target1, &args.target2)?;

            println!();
            println!("对比完成，用时 {:.1} 秒", outcome.elapsed.as_secs_f64());
            println!("  {}", outcome.report.summary());
            for (ext, count) in &outcome.report.counts {
                println!("  {}: {}", ext, count);
            }
            println!(
                "结果已写入 {} 和 {}",
                config.output_dir.join(SUMMARY_FILE).display(),
                config.output_dir.join(DIFFS_DIR).display()
            );
        }
        Commands::Extract { target_file, props } => {
            init_logging(cli.verbose, false);

            let found = extract_build_info(&target_file, &props)?;
            for (name, value) in &found {
                println!("{}={}", name, value);
            }
        }
    }

    Ok(())
}
