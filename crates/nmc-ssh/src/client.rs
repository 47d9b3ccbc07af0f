use std::{
    io::{self, Read, Write},
    time::Duration,
};

use tracing::{debug, info};

use crate::{
    SshError,
    config::{COMMAND_TIMEOUT, LOGIN_TIMEOUT},
    scp,
    shell::{CommandResponse, PromptScanner},
};

const NMC2_BUNDLE_PATH: &str = "/ssl/defaultcert.p15";
const NMC3_KEY_PATH: &str = "/ssl/nmc.key";
const NMC3_CERT_PATH: &str = "/ssl/nmc.crt";
const UPLOAD_MODE: u32 = 0o600;

/// An open SSH channel on its own connection.
pub trait Channel: Read + Write {
    /// Applies to every following blocking read and write.
    fn set_timeout(&mut self, timeout: Duration);

    /// Signals end of input and waits for the remote to close.
    fn close(&mut self) -> io::Result<()>;
}

/// Opens channels to a card. Every call is expected to use a fresh connection, the cards do not
/// cope with more than one session per connection.
pub trait Connector {
    #[allow(missing_docs)]
    type Channel: Channel;

    /// Opens a channel running `command` through an `exec` request.
    fn exec(&self, command: &str) -> Result<Self::Channel, SshError>;

    /// Opens a channel with an interactive shell and no pty.
    fn shell(&self) -> Result<Self::Channel, SshError>;
}

/// Performs certificate installs and maintenance commands on one card.
pub struct Client<C> {
    connector: C,
}

impl<C: Connector> Client<C> {
    #[allow(missing_docs)]
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    /// Writes `content` to `destination` on the card, replacing any existing file.
    pub fn upload_scp(&self, destination: &str, content: &[u8], mode: u32) -> Result<(), SshError> {
        let mut channel = self.connector.exec(&scp::sink_command(destination))?;
        scp::send_file(&mut channel, destination, content, mode)?;
        channel.close()?;

        info!(destination, bytes = content.len(), "Uploaded file");
        Ok(())
    }

    /// Runs `command` in an interactive shell and parses the card's answer.
    ///
    /// The response code is not checked, see [`CommandResponse::into_result`].
    pub fn command(&self, command: &str) -> Result<CommandResponse, SshError> {
        let mut channel = self.connector.shell()?;
        let mut scanner = PromptScanner::new();

        // login banner and first prompt
        channel.set_timeout(LOGIN_TIMEOUT);
        scanner.next_output(&mut channel)?;

        channel.write_all(format!("{command}\n").as_bytes())?;
        channel.flush()?;

        channel.set_timeout(COMMAND_TIMEOUT);
        let output = scanner.next_output(&mut channel)?;
        let response = CommandResponse::parse(&String::from_utf8_lossy(&output))?;

        // Nothing useful can be done about a card that drops the shell uncleanly.
        let _ = channel.close();

        debug!(command, code = %response.code, "Command finished");
        Ok(response)
    }

    /// Installs a converted key and certificate.
    ///
    /// Firmware without the `ssl` command (NMC2) only takes the combined `key_cert_p15` bundle
    /// at `/ssl/defaultcert.p15`. Newer firmware (NMC3) takes the key bundle and the PEM
    /// certificate as separate files and loads them with `ssl key -i` and `ssl cert -i`.
    pub fn install_ssl_cert(
        &self,
        key_p15: &[u8],
        cert_pem: &[u8],
        key_cert_p15: Option<&[u8]>,
    ) -> Result<(), SshError> {
        if self.command("ssl")?.is_unknown_command() {
            info!("Card does not know the ssl command, installing NMC2 bundle");
            let bundle = key_cert_p15.ok_or(SshError::MissingKeyCertBundle)?;
            return self.upload_scp(NMC2_BUNDLE_PATH, bundle, UPLOAD_MODE);
        }

        info!("Installing key and certificate through the ssl command");
        self.upload_scp(NMC3_KEY_PATH, key_p15, UPLOAD_MODE)?;
        self.upload_scp(NMC3_CERT_PATH, cert_pem, UPLOAD_MODE)?;

        self.command(&format!("ssl key -i {NMC3_KEY_PATH}"))?
            .into_result()?;
        self.command(&format!("ssl cert -i {NMC3_CERT_PATH}"))?
            .into_result()?;
        Ok(())
    }

    /// Restarts the card's web interface so it serves the new certificate.
    ///
    /// SSH restarts shortly after as well. Commands sent right after this one tend to hang.
    pub fn restart_web_ui(&self) -> Result<(), SshError> {
        self.command("reboot -Y")?.into_result()?;
        info!("Web UI restart requested");
        Ok(())
    }
}
