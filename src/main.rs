use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flowguard_lib::capture::{self, CsvReplay, RandomFeatures};
use flowguard_lib::config::{DetectorConfig, MonitorConfig, DEFAULT_ALERT_LOG, DEFAULT_POLL_INTERVAL};
use flowguard_lib::processor::{Detector, StreamMonitor};
use flowguard_lib::load_detector;

/// Real-time network attack detector
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// ONNX model
    #[arg(long, default_value = "network_attack_detector_quantized.onnx")]
    model: PathBuf,

    /// Model metadata bundle (JSON)
    #[arg(long, default_value = "model_metadata.json")]
    metadata: PathBuf,

    /// CSV file to replay
    #[arg(long)]
    simulate: Option<PathBuf>,

    /// Delay between replayed samples, in seconds
    #[arg(long, default_value_t = 0.1)]
    delay: f64,

    /// Predict on random samples, one per Enter
    #[arg(long, action = ArgAction::SetTrue)]
    interactive: bool,

    /// Measure inference throughput
    #[arg(long, action = ArgAction::SetTrue)]
    benchmark: bool,

    /// Number of benchmark predictions
    #[arg(long, default_value_t = capture::DEFAULT_BENCHMARK_ITERATIONS)]
    iterations: usize,

    /// Custom output file for progress lines and the final report
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON-lines log of critical attacks
    #[arg(long, default_value = DEFAULT_ALERT_LOG)]
    alert_log: PathBuf,

    /// Confidence threshold for the high-confidence branches
    #[arg(long)]
    threshold: Option<f32>,

    /// Comma-separated low-threat classes (overrides the defaults)
    #[arg(long, value_delimiter = ',')]
    low_threat: Option<Vec<String>>,

    /// Ground-truth column dropped from the replayed CSV
    #[arg(long, default_value = capture::DEFAULT_LABEL_COLUMN)]
    label_column: String,

    /// Debug logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

impl Args {
    fn detector_config(&self) -> DetectorConfig {
        let mut config = DetectorConfig::default();
        if let Some(t) = self.threshold {
            config = config.with_threshold(t);
        }
        if let Some(classes) = &self.low_threat {
            config = config.with_low_threat_classes(classes.iter().map(|c| c.trim().to_string()));
        }
        config
    }

    /// `--simulate` without `--output` reports to `result-<csv stem>.txt`.
    fn report_path(&self) -> Option<PathBuf> {
        if let Some(out) = &self.output {
            return Some(out.clone());
        }
        self.simulate.as_deref().map(default_report_path)
    }
}

fn default_report_path(csv: &Path) -> PathBuf {
    let stem = csv.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "run".into());
    PathBuf::from(format!("result-{}.txt", stem))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if !(args.benchmark || args.simulate.is_some() || args.interactive) {
        println!("Use --simulate, --interactive or --benchmark");
        Args::command().print_help()?;
        return Ok(());
    }

    let mut detector = load_detector(&args.model, &args.metadata, args.detector_config())
        .context("Failed to initialize detector")?;

    if args.benchmark {
        let stats = capture::benchmark(&mut detector, args.iterations)?;
        println!("\nBenchmark results:");
        println!("Predictions: {}", stats.total_predictions);
        println!("Average time: {:.2} ms", stats.avg_inference_time_ms);
        match stats.throughput_per_second {
            Some(t) => println!("Throughput: {:.2} predictions/second", t),
            None => println!("Throughput: n/a"),
        }
    } else if let Some(csv) = &args.simulate {
        let report_path = args.report_path();
        if let Some(p) = &report_path {
            log::info!("Results will be saved to {}", p.display());
        }

        let interrupt = Arc::new(AtomicBool::new(false));
        {
            let interrupt = interrupt.clone();
            ctrlc::set_handler(move || {
                interrupt.store(true, Ordering::SeqCst);
            })
            .context("Error setting Ctrl+C handler")?;
        }

        let config = MonitorConfig {
            alert_log: args.alert_log.clone(),
            report_path: report_path.clone(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        };
        let mut monitor = StreamMonitor::new(detector, &config)?;
        monitor.start()?;

        let outcome = CsvReplay::open(csv, &args.label_column).and_then(|replay| {
            monitor.log_message(&format!("Loading simulation data: {}", csv.display()));
            capture::simulate(replay, &monitor, Duration::from_secs_f64(args.delay.max(0.0)), &interrupt)
        });

        match &outcome {
            Ok(summary) if !summary.interrupted => {
                let left = monitor.drain_until(&interrupt);
                if left > 0 {
                    monitor.log_message("Interrupted by user");
                    log::warn!("{} samples left unprocessed", left);
                }
            }
            Ok(_) => {}
            Err(e) => monitor.log_message(&format!("Simulation failed: {:#}", e)),
        }

        monitor.stop();
        monitor.join();
        monitor.finalize()?;

        let stats = monitor.statistics()?;
        monitor.log_message("\n=== FINAL STATISTICS ===");
        monitor.log_message(&stats.to_string());

        if let Some(p) = &report_path {
            println!("\nAnalysis complete! Results saved to: {}", p.display());
        }
        outcome?;
    } else {
        // read_line resumes after SIGINT, so leave from the handler itself
        ctrlc::set_handler(|| {
            println!("\nExiting interactive mode");
            std::process::exit(0);
        })
        .context("Error setting Ctrl+C handler")?;

        let stdin = io::stdin();
        run_interactive(&mut detector, stdin.lock(), io::stdout())?;
    }

    Ok(())
}

fn run_interactive<R: BufRead, W: Write>(detector: &mut Detector, mut input: R, mut out: W) -> Result<()> {
    let names = detector.feature_names();
    writeln!(out, "\nInteractive mode.")?;
    writeln!(
        out,
        "Required features: {:?}... (total: {})",
        &names[..names.len().min(5)],
        names.len()
    )?;

    let mut generator = RandomFeatures::new(names.to_vec());
    let mut line = String::new();

    loop {
        write!(out, "Press Enter to predict on random data ('quit', Ctrl+D or Ctrl+C to exit): ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        if matches!(line.trim(), "quit" | "exit" | "q") {
            break;
        }

        match detector.predict(&generator.sample()) {
            Ok(result) => {
                writeln!(out, "\nResult:")?;
                writeln!(out, "  Class: {}", result.predicted_class)?;
                writeln!(out, "  Confidence: {:.3}", result.confidence)?;
                writeln!(out, "  Attack: {}", result.is_attack)?;
                writeln!(out, "  Time: {:.2} ms", result.inference_time_ms)?;
                if let Some(w) = &result.normalization_warning {
                    writeln!(out, "  Warning: {}", w)?;
                }
            }
            Err(e) => log::error!("Prediction failed: {:#}", e),
        }
    }
    Ok(())
}
