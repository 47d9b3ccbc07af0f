use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use nmc_cli::Color;

use crate::{create::CreateArgs, install::InstallArgs};

#[derive(Parser)]
#[command(name = "nmc-p15-tool", version, about = "APC NMC p15 tool", long_about = None)]
pub struct Cli {
    // Optional so that running without a subcommand prints help instead of an error
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(
        long,
        global = true,
        env = "NMC_P15_TOOL_DEBUG",
        help = "Enable debug logging."
    )]
    pub debug: bool,

    #[arg(
        short = 'c',
        long,
        global = true,
        value_enum,
        default_value_t = Color::Auto,
        env = "NMC_P15_TOOL_COLOR"
    )]
    pub color: Color,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(long_about = "Create APC p15 files from a PEM key and certificate.")]
    Create(CreateArgs),

    #[command(long_about = "Create APC p15 files and install them on a management card over SSH.")]
    Install(InstallArgs),
}

/// Key and certificate, each given either as a file or inline PEM.
#[derive(Args)]
pub struct PemArgs {
    #[command(flatten)]
    key: KeySource,

    #[command(flatten)]
    cert: CertSource,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct KeySource {
    #[arg(long, env = "NMC_P15_TOOL_KEYFILE", help = "Path to the PEM private key.")]
    keyfile: Option<PathBuf>,

    #[arg(
        long,
        env = "NMC_P15_TOOL_KEYPEM",
        allow_hyphen_values = true,
        hide_env_values = true,
        help = "PEM private key, inline."
    )]
    keypem: Option<String>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct CertSource {
    #[arg(long, env = "NMC_P15_TOOL_CERTFILE", help = "Path to the PEM certificate.")]
    certfile: Option<PathBuf>,

    #[arg(
        long,
        env = "NMC_P15_TOOL_CERTPEM",
        allow_hyphen_values = true,
        help = "PEM certificate, inline."
    )]
    certpem: Option<String>,
}

/// Decoded PEM inputs.
pub struct PemInput {
    pub key: Vec<u8>,
    pub cert: Vec<u8>,
}

impl PemArgs {
    pub fn read(&self) -> Result<PemInput> {
        Ok(PemInput {
            key: read_source(self.key.keyfile.as_deref(), self.key.keypem.as_deref(), "key")?,
            cert: read_source(
                self.cert.certfile.as_deref(),
                self.cert.certpem.as_deref(),
                "certificate",
            )?,
        })
    }
}

fn read_source(file: Option<&Path>, inline: Option<&str>, what: &str) -> Result<Vec<u8>> {
    match (file, inline) {
        (Some(path), _) => std::fs::read(path)
            .wrap_err_with(|| format!("failed to read {what} file {}", path.display())),
        (None, Some(pem)) => Ok(pem.as_bytes().to_vec()),
        // enforced by the argument group
        (None, None) => Err(color_eyre::eyre::eyre!("no {what} specified")),
    }
}
