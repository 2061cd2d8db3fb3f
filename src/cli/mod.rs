//! Command dispatcher, banner, and argument parsing (§6). Everything here is
//! explicitly out of scope for the core library (§1) — it only translates
//! parsed flags into calls against [`cryptfs_tpm2::api`].

pub mod io;
pub mod prompt;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use log::debug;

use cryptfs_tpm2::algorithm::HashAlg;
use cryptfs_tpm2::context::Tpm;
use cryptfs_tpm2::error::Result;
use cryptfs_tpm2::options::OptionStore;
use cryptfs_tpm2::prompt::{NonInteractive, SecretPrompter};
use cryptfs_tpm2::{api, da};

use self::prompt::Terminal;

#[derive(Parser, Debug)]
#[command(name = "cryptfs-tpm2", version, about = "Binds a filesystem passphrase to a TPM 2.0 platform root of trust", disable_help_subcommand = true)]
pub struct Cli {
    /// Show verbose/debug tracing.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Don't print the startup banner. (Spelling preserved for CLI-surface
    /// compatibility.)
    #[arg(short, long = "quite", global = true)]
    quite: bool,

    #[arg(long, global = true)]
    owner_auth: Option<String>,

    #[arg(long, global = true)]
    lockout_auth: Option<String>,

    #[arg(long, global = true)]
    key_secret: Option<String>,

    #[arg(long, global = true)]
    passphrase_secret: Option<String>,

    /// Fall back to terminal prompting when a stored authorization is wrong
    /// or missing, instead of failing immediately.
    #[arg(long, global = true)]
    interactive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[value(rename_all = "lowercase")]
pub enum Object {
    Key,
    Passphrase,
    All,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[value(rename_all = "lowercase")]
enum PassphraseObject {
    Passphrase,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a primary key, a passphrase object, or both.
    Seal {
        object: Object,
        #[arg(long)]
        pcr_bank_alg: Option<String>,
        /// A literal value, or a path to a file whose raw bytes (up to 64)
        /// are used as the payload. Omit to seal 64 random bytes.
        #[arg(long)]
        passphrase: Option<String>,
        #[arg(long)]
        no_da: bool,
    },
    /// Unseal the passphrase object.
    Unseal {
        object: PassphraseObject,
        #[arg(long)]
        pcr_bank_alg: Option<String>,
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Evict a persistent object.
    Evict { object: Object },
    /// Display help for a subcommand.
    Help { subcommand: Option<String> },
}

fn show_banner() {
    println!("cryptfs-tpm2 {}", env!("CARGO_PKG_VERSION"));
}

fn parse_bank(value: &Option<String>) -> Result<Option<HashAlg>> {
    value.as_deref().map(HashAlg::parse).transpose()
}

fn build_options(cli: &Cli) -> Result<OptionStore> {
    let mut options = OptionStore::new();
    if let Some(v) = &cli.owner_auth {
        options.set_owner_auth(v.as_bytes());
    }
    if let Some(v) = &cli.lockout_auth {
        options.set_lockout_auth(v.as_bytes());
    }
    if let Some(v) = &cli.key_secret {
        options.set_primary_key_secret(v.as_bytes());
    }
    if let Some(v) = &cli.passphrase_secret {
        options.set_passphrase_secret(v.as_bytes());
    }
    options.set_interactive(cli.interactive);
    Ok(options)
}

fn prompter(interactive: bool) -> Box<dyn SecretPrompter> {
    if interactive {
        Box::new(Terminal)
    } else {
        Box::new(NonInteractive)
    }
}

/// Parses `argv`, prints the banner unless `--quite`, and dispatches to the
/// matching subcommand. Returns the process exit code.
pub fn run() -> i32 {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    if !cli.quite {
        show_banner();
    }

    match dispatch(&cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("cryptfs-tpm2: {err}");
            1
        }
    }
}

fn dispatch(cli: &Cli) -> Result<()> {
    let mut options = build_options(cli)?;
    let mut prompter = prompter(cli.interactive);

    match &cli.command {
        Command::Seal {
            object,
            pcr_bank_alg,
            passphrase,
            no_da,
        } => {
            options.set_no_da(*no_da);
            let bank = parse_bank(pcr_bank_alg)?;
            let mut tpm = Tpm::connect()?;
            let ctx = tpm.context_mut();
            let payload = passphrase
                .as_deref()
                .map(self::io::read_passphrase_arg)
                .transpose()?
                .unwrap_or_default();

            match object {
                Object::Key => api::create_primary_key(ctx, &mut options, prompter.as_mut(), bank)?,
                Object::Passphrase => {
                    api::create_passphrase(ctx, &mut options, prompter.as_mut(), &payload, bank)?
                }
                Object::All => api::create_all(ctx, &mut options, prompter.as_mut(), &payload, bank)?,
            }
            debug!("seal complete");
            Ok(())
        }
        Command::Unseal {
            object: PassphraseObject::Passphrase,
            pcr_bank_alg,
            output,
        } => {
            let bank = parse_bank(pcr_bank_alg)?;
            let mut tpm = Tpm::connect()?;
            let ctx = tpm.context_mut();
            let bytes = api::unseal_passphrase(ctx, &mut options, prompter.as_mut(), bank)?;
            match output {
                Some(path) => self::io::write_output(path, &bytes)?,
                None => {
                    use std::io::Write;
                    std::io::stdout().write_all(&bytes)?;
                }
            }
            Ok(())
        }
        Command::Evict { object } => {
            let mut tpm = Tpm::connect()?;
            let ctx = tpm.context_mut();
            da::check_and_reset(ctx, &options, prompter.as_mut())?;
            match object {
                Object::Key => api::evict_key(ctx, &options),
                Object::Passphrase => api::evict_passphrase(ctx, &options),
                Object::All => api::evict_all(ctx, &options),
            }
        }
        Command::Help { subcommand } => {
            match subcommand {
                Some(name) => println!("{}", subcommand_help(name)),
                None => {
                    let _ = Cli::command().print_help();
                }
            }
            Ok(())
        }
    }
}

fn subcommand_help(name: &str) -> &'static str {
    match name {
        "seal" => "seal <key|passphrase|all> [--pcr-bank-alg <alg>] [--passphrase <path-or-literal>] [--no-da]",
        "unseal" => "unseal passphrase [--pcr-bank-alg <alg>] [--output <file>]",
        "evict" => "evict <key|passphrase|all>",
        _ => "unknown subcommand",
    }
}
