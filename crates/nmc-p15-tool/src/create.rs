use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::{Result, WrapErr};
use nmc_pkcs15::{Conversion, convert};
use rand::rngs::OsRng;
use tracing::{info, warn};

use crate::{
    command::{PemArgs, PemInput},
    output::write_private_file,
};

#[derive(Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pem: PemArgs,

    #[arg(
        long,
        env = "NMC_P15_TOOL_OUTFILE",
        default_value = "apctool.p15",
        help = "Where to write the key+cert p15 file."
    )]
    outfile: PathBuf,

    #[arg(
        long,
        env = "NMC_P15_TOOL_KEYP15",
        help = "Also write the key-only p15 file (always written for keys NMC2 cannot load)."
    )]
    keyp15: bool,

    #[arg(
        long,
        env = "NMC_P15_TOOL_OUTKEYFILE",
        default_value = "apctool.key.p15",
        help = "Where to write the key-only p15 file."
    )]
    outkeyfile: PathBuf,

    #[arg(
        long,
        env = "NMC_P15_TOOL_LEGACYP15",
        help = "Also write the headered certificate-only p15 file used by old firmware."
    )]
    legacyp15: bool,

    #[arg(
        long,
        env = "NMC_P15_TOOL_OUTLEGACYFILE",
        default_value = "apctool.legacy.p15",
        help = "Where to write the legacy p15 file."
    )]
    outlegacyfile: PathBuf,
}

impl CreateArgs {
    pub fn run(self) -> Result<()> {
        let (_, conversion) = convert_pem(&self.pem)?;

        match &conversion.key_cert_p15 {
            Some(key_cert_p15) => write_private_file(&self.outfile, key_cert_p15, "key+cert p15")?,
            None => warn!(
                key_type = %conversion.key_type,
                "NMC2 cannot load this key type, skipping the key+cert p15 file"
            ),
        }

        if self.keyp15 || conversion.key_cert_p15.is_none() {
            write_private_file(&self.outkeyfile, &conversion.key_p15, "key p15")?;
        }

        if self.legacyp15 {
            match &conversion.legacy_p15 {
                Some(legacy_p15) => {
                    write_private_file(&self.outlegacyfile, legacy_p15, "legacy p15")?
                }
                None => warn!(
                    key_type = %conversion.key_type,
                    "NMC2 cannot load this key type, skipping the legacy p15 file"
                ),
            }
        }

        Ok(())
    }
}

/// Reads the PEM inputs and converts them, logging the outcome.
pub fn convert_pem(pem: &PemArgs) -> Result<(PemInput, Conversion)> {
    let input = pem.read()?;
    let conversion =
        convert(&input.key, &input.cert, &mut OsRng).wrap_err("failed to convert pem files")?;

    info!(
        key_type = %conversion.key_type,
        warnings = conversion.warnings.len(),
        "Converted key and certificate"
    );
    Ok((input, conversion))
}
