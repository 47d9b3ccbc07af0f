use clap::Args;
use color_eyre::eyre::{Result, ensure};
use nmc_cli::password_prompt_when_none;
use nmc_pkcs15::Conversion;
use nmc_ssh::{ClientConfig, DEFAULT_WEB_UI_SSL_PORT};
use tracing::warn;
use zeroize::Zeroizing;

use crate::{
    command::{PemArgs, PemInput},
    create::convert_pem,
};

const MISSING_TRANSPORT: &str =
    "install is not available, nmc-p15-tool was built without the `ssh2` feature";

#[derive(Args)]
pub struct InstallArgs {
    #[command(flatten)]
    pem: PemArgs,

    #[arg(
        long,
        env = "NMC_P15_TOOL_APCHOST",
        help = "Management card to install on, as host or host:port (default port 22)."
    )]
    apchost: String,

    #[arg(
        long,
        env = "NMC_P15_TOOL_FINGERPRINT",
        help = "SHA-256 fingerprint of the card's SSH host key, base64 or hex."
    )]
    fingerprint: String,

    #[arg(long, env = "NMC_P15_TOOL_USERNAME", help = "SSH username.")]
    username: String,

    #[arg(
        long,
        env = "NMC_P15_TOOL_PASSWORD",
        hide_env_values = true,
        help = "SSH password. Prompted for when omitted."
    )]
    password: Option<String>,

    #[arg(
        long,
        env = "NMC_P15_TOOL_RESTARTWEBUI",
        help = "Restart the card's web UI after installing so it serves the new certificate."
    )]
    restartwebui: bool,

    #[arg(
        long,
        env = "NMC_P15_TOOL_WEBUISSLPORT",
        default_value_t = DEFAULT_WEB_UI_SSL_PORT,
        help = "HTTPS port of the card's web UI, used to verify the install. 0 disables the check."
    )]
    webuisslport: u16,

    #[arg(
        long,
        env = "NMC_P15_TOOL_SKIPVERIFY",
        help = "Do not check that the web UI serves the new certificate after installing."
    )]
    skipverify: bool,

    #[arg(
        long,
        env = "NMC_P15_TOOL_INSECURECIPHER",
        help = "Allow aes128-cbc and 3des-cbc for cards that offer nothing better."
    )]
    insecurecipher: bool,
}

impl InstallArgs {
    pub fn run(self) -> Result<()> {
        ensure!(cfg!(feature = "ssh2"), MISSING_TRANSPORT);

        let (input, conversion) = convert_pem(&self.pem)?;

        if self.insecurecipher {
            warn!("Insecure ciphers are enabled (--insecurecipher). SSH with an insecure cipher is NOT secure and should NOT be used.");
        }

        let verify_port = self.verify_port();
        let password = password_prompt_when_none("SSH password:", self.password)?;
        let config = ClientConfig {
            host: self.apchost,
            username: self.username,
            password: Zeroizing::new(password),
            fingerprint: self.fingerprint,
            insecure_cipher: self.insecurecipher,
        };

        deliver(config, &input, &conversion, self.restartwebui, verify_port)
    }

    /// Web UI port to check after installing, if the check is enabled.
    fn verify_port(&self) -> Option<u16> {
        (!self.skipverify && self.webuisslport != 0).then_some(self.webuisslport)
    }
}

#[cfg(feature = "ssh2")]
fn deliver(
    config: ClientConfig,
    input: &PemInput,
    conversion: &Conversion,
    restart_web_ui: bool,
    verify_port: Option<u16>,
) -> Result<()> {
    use color_eyre::eyre::WrapErr;
    use nmc_pkcs15::pem::decode_certificate;
    use nmc_ssh::{
        Client, Ssh2Connector, WEB_UI_RESTART_DELAY, WEB_UI_SETTLE_DELAY, verify_web_ui_certificate,
    };
    use tracing::info;

    let host = config.host.clone();
    let hostname = config.hostname().to_owned();
    let connector = Ssh2Connector::new(config);
    connector
        .check()
        .wrap_err_with(|| format!("failed to connect to {host}"))?;
    info!(%host, "Connected, installing key and certificate");

    let client = Client::new(connector);
    client
        .install_ssl_cert(
            &conversion.key_p15,
            &input.cert,
            conversion.key_cert_p15.as_deref(),
        )
        .wrap_err("failed to install certificate")?;
    info!(%host, "Certificate installed");

    if restart_web_ui {
        client
            .restart_web_ui()
            .wrap_err("failed to send web UI restart command")?;
    }

    if let Some(port) = verify_port {
        info!(%hostname, port, "Verifying certificate install");
        std::thread::sleep(WEB_UI_SETTLE_DELAY);
        if restart_web_ui {
            info!("Waiting for web UI restart");
            std::thread::sleep(WEB_UI_RESTART_DELAY);
        }

        let expected = decode_certificate(&input.cert)?;
        verify_web_ui_certificate(&hostname, port, expected.raw())
            .wrap_err("failed to verify certificate install")?;
    }
    Ok(())
}

#[cfg(not(feature = "ssh2"))]
fn deliver(_: ClientConfig, _: &PemInput, _: &Conversion, _: bool, _: Option<u16>) -> Result<()> {
    Err(color_eyre::eyre::eyre!(MISSING_TRANSPORT))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::command::{Cli, Commands};

    fn install_args(extra: &[&str]) -> super::InstallArgs {
        let base = [
            "nmc-p15-tool",
            "install",
            "--keyfile",
            "key.pem",
            "--certfile",
            "cert.pem",
            "--apchost",
            "ups.local",
            "--fingerprint",
            "abc",
            "--username",
            "apc",
        ];
        let cli = Cli::try_parse_from(base.iter().chain(extra)).unwrap();
        match cli.command {
            Some(Commands::Install(args)) => args,
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_verifies_on_default_port() {
        assert_eq!(install_args(&[]).verify_port(), Some(443));
        assert_eq!(
            install_args(&["--webuisslport", "8443"]).verify_port(),
            Some(8443)
        );
    }

    #[test]
    fn test_verification_can_be_disabled() {
        assert_eq!(install_args(&["--skipverify"]).verify_port(), None);
        assert_eq!(install_args(&["--webuisslport", "0"]).verify_port(), None);
    }
}
