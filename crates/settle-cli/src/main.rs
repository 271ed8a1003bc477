// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Settle CLI: scenario runner and pipeline benchmark for the engine.

mod bench;
mod config;
mod output;
mod scenarios;

use std::env;
use std::process;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let config = Config::from_env();
    output::init(config.color);
    init_tracing(&config);

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "demo" => cmd_demo(),
        "bench" => {
            let iterations = match args.get(2) {
                Some(raw) => match raw.parse::<usize>() {
                    Ok(n) => n,
                    Err(_) => {
                        eprintln!("{}: invalid iteration count: {}", output::error_label(), raw);
                        eprintln!("Usage: settle bench [iterations]");
                        process::exit(1);
                    }
                },
                None => config.bench_iterations,
            };
            cmd_bench(iterations);
        }
        "help" | "--help" | "-h" => print_usage(),
        "version" | "--version" | "-V" => {
            println!("{} {}", output::title("settle"), output::version(VERSION));
        }
        other => {
            eprintln!("{}: unknown command: {}", output::error_label(), other);
            print_usage();
            process::exit(1);
        }
    }
}

fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn print_usage() {
    println!(
        "{} {} - deferred-value resolution engine",
        output::title("settle"),
        output::version(VERSION)
    );
    println!();
    println!("{}", output::section_header("Usage:"));
    println!("  settle {} [args]", output::arg("<command>"));
    println!();
    println!("{}", output::section_header("Commands:"));
    println!("  {}               Run the behavioral scenarios", output::command("demo"));
    println!(
        "  {} {}  Run the upload pipeline benchmark",
        output::command("bench"),
        output::arg("[iterations]")
    );
    println!("  {}               Show this help", output::command("help"));
    println!("  {}            Show version", output::command("version"));
    println!();
    println!("{}", output::section_header("Environment:"));
    println!("  SETTLE_LOG    tracing filter (default: warn)");
    println!("  NO_COLOR      disable colors");
    println!("  FORCE_COLOR   force colors");
}

fn cmd_demo() {
    let reports = scenarios::run_all();
    let mut failed = 0;

    for report in &reports {
        match &report.outcome {
            Ok(()) => println!("  {} {}", output::status_pass(), report.name),
            Err(msg) => {
                failed += 1;
                println!("  {} {}", output::status_fail(), report.name);
                println!("      {}", output::detail(msg));
            }
        }
    }

    println!();
    println!(
        "  {}, {}",
        output::passed_count(reports.len() - failed),
        output::failed_count(failed)
    );
    println!();

    if failed == 0 {
        println!("{}", output::banner_ok("Demo"));
    } else {
        eprintln!("{}", output::banner_fail("Demo", failed, "scenario"));
        process::exit(1);
    }
}

fn cmd_bench(iterations: usize) {
    let report = bench::run(iterations);
    let micros = report.elapsed.as_micros();
    let per_op = if report.iterations == 0 {
        0.0
    } else {
        micros as f64 / report.iterations as f64
    };

    println!("{}", output::section_header("Upload pipeline"));
    println!("  iterations  {}", report.iterations);
    println!("  fulfilled   {}", report.fulfilled);
    println!("  rejected    {}", report.rejected);
    println!("  tasks run   {}", report.tasks_run);
    println!("  elapsed     {:.3} ms", micros as f64 / 1000.0);
    println!("  per upload  {:.2} us", per_op);
    println!();

    if report.fulfilled == report.iterations {
        println!("{}", output::banner_ok("Bench"));
    } else {
        eprintln!(
            "{}",
            output::banner_fail("Bench", report.iterations - report.fulfilled, "upload")
        );
        process::exit(1);
    }
}
