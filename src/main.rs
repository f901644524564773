use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ssh_crypt::config::{Mode, Settings};
use ssh_crypt::envelope;
use ssh_crypt::CryptError;

#[derive(Parser)]
#[command(
    name = "ssh-crypt",
    author = "Kaylee Beyene",
    version,
    about = "Encrypt files for the holder of an SSH key",
    long_about = "ssh-crypt encrypts a file under a fresh random key and encrypts \
                  that key to the recipient's SSH RSA public key. Send both output \
                  files; the recipient decrypts with their private key."
)]
struct Cli {
    /// File to encrypt, or the .enc file to decrypt
    input: PathBuf,

    /// Encrypt for the holder of this public key
    #[arg(
        short,
        long,
        value_name = "PATH_TO_RECIPIENT_PUBLIC_KEY",
        conflicts_with = "decrypt",
        required_unless_present = "decrypt"
    )]
    encrypt: Option<PathBuf>,

    /// Decrypt with this private key
    #[arg(short, long, value_name = "PATH_TO_PRIVATE_KEY")]
    decrypt: Option<PathBuf>,

    /// Directory for the output files [default: current directory]
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Print each step as it happens
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ssh-crypt: {:#}", err);
            ExitCode::from(exit_status(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mode = Mode::from_options(cli.encrypt, cli.decrypt)?;
    let mut settings = Settings::new(mode, cli.input)?.with_env();
    if let Some(dir) = cli.output_dir {
        settings = settings.with_output_dir(dir);
    }

    let action = match settings.mode {
        Mode::Encrypt(_) => "encrypt",
        Mode::Decrypt(_) => "decrypt",
    };
    let outcome = envelope::run(&settings)
        .with_context(|| format!("Could not {} {}", action, settings.input.display()))?;

    for path in &outcome.written {
        tracing::info!("wrote {}", path.display());
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,ssh_crypt=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn exit_status(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<CryptError>()
        .map(CryptError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}
