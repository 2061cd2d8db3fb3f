//! `tcti-probe`: polls until the configured TCTI backend (C1) becomes
//! available, primarily for waiting on the resource-manager daemon at boot.
//! Ported from the original's `tcti-probe` utility (SUPPLEMENTARY FEATURES);
//! reuses exactly [`cryptfs_tpm2::context::Tpm::connect`] as its readiness
//! check.

use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use cryptfs_tpm2::context::Tpm;

const DEFAULT_DELAY_MS: u64 = 100;
const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Parser, Debug)]
#[command(name = "tcti-probe", version, about = "Wait for the configured TPM transport to become available")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(short, long, global = true)]
    quite: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wait for the resource manager (or configured backend) to accept a
    /// connection.
    Wait {
        #[arg(short, long = "delay", default_value_t = DEFAULT_DELAY_MS)]
        delay_ms: u64,
        #[arg(short, long = "timeout", default_value_t = DEFAULT_TIMEOUT_MS)]
        timeout_ms: u64,
    },
}

fn show_banner() {
    println!("tcti-probe {}", env!("CARGO_PKG_VERSION"));
}

/// Requests the round-robin real-time scheduling class for this thread so
/// the polling delay below is accurate. Best-effort: a process without
/// `CAP_SYS_NICE` simply keeps its default scheduling class.
fn request_accurate_delay_scheduling() {
    unsafe {
        let param = libc::sched_param {
            sched_priority: libc::sched_get_priority_max(libc::SCHED_RR),
        };
        libc::sched_setscheduler(0, libc::SCHED_RR, &param);
    }
}

/// Repeatedly attempts to connect to the configured TCTI backend until it
/// succeeds or `timeout_ms` elapses (`0` = wait forever).
fn wait(delay_ms: u64, timeout_ms: u64, verbose: bool) -> bool {
    request_accurate_delay_scheduling();

    let delay = Duration::from_millis(delay_ms.max(1));
    let deadline = (timeout_ms > 0).then(|| Instant::now() + Duration::from_millis(timeout_ms));
    let mut waited = Duration::ZERO;

    loop {
        if Tpm::connect().is_ok() {
            println!("the resource manager is ready");
            return true;
        }

        let sleep_for = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    eprintln!("timeout waiting for the resource manager");
                    return false;
                }
                delay.min(remaining)
            }
            None => delay,
        };

        std::thread::sleep(sleep_for);
        waited += sleep_for;
        if verbose {
            log::debug!("already waited {}ms for the resource manager", waited.as_millis());
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    if !cli.quite {
        show_banner();
    }

    let ok = match cli.command {
        Command::Wait { delay_ms, timeout_ms } => wait(delay_ms, timeout_ms, cli.verbose),
    };

    std::process::exit(if ok { 0 } else { 1 });
}
