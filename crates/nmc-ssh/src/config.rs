use std::{fmt, time::Duration};

use zeroize::Zeroizing;

/// Port used when the host is given without one.
pub const DEFAULT_PORT: u16 = 22;
/// TCP connect and handshake timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(90);
/// Time allowed for the login banner and first prompt.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(20);
/// Time allowed for a command to answer. Generous, only guards against a hang.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const CLIENT_VERSION: u32 = 1;

/// Key exchange algorithms offered to the card, in preference order.
pub const KEX_ALGORITHMS: &[&str] = &[
    "curve25519-sha256",
    "curve25519-sha256@libssh.org",
    "ecdh-sha2-nistp256",
    "ecdh-sha2-nistp384",
    "ecdh-sha2-nistp521",
    "diffie-hellman-group14-sha256",
    "diffie-hellman-group14-sha1",
    // older NMC2 firmware
    "diffie-hellman-group-exchange-sha256",
];

const CIPHERS: &[&str] = &[
    "aes128-gcm@openssh.com",
    "aes256-gcm@openssh.com",
    "chacha20-poly1305@openssh.com",
    "aes128-ctr",
    "aes192-ctr",
    "aes256-ctr",
];

const INSECURE_CIPHERS: &[&str] = &["aes128-cbc", "3des-cbc"];

/// Connection settings for a single management card.
#[derive(Clone)]
pub struct ClientConfig {
    /// `host` or `host:port`.
    pub host: String,
    /// Login user.
    pub username: String,
    /// Login password.
    pub password: Zeroizing<String>,
    /// Pinned SHA-256 host key fingerprint, base64 without padding or hex.
    pub fingerprint: String,
    /// Also offer `aes128-cbc` and `3des-cbc`.
    pub insecure_cipher: bool,
}

impl ClientConfig {
    /// `host:port`, appending the default port when none was given.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, DEFAULT_PORT)
        }
    }

    /// `host` without any port.
    pub fn hostname(&self) -> &str {
        self.host
            .split_once(':')
            .map_or(self.host.as_str(), |(host, _)| host)
    }

    /// Ciphers to offer, in preference order.
    pub fn ciphers(&self) -> Vec<&'static str> {
        let mut ciphers = CIPHERS.to_vec();
        if self.insecure_cipher {
            ciphers.extend_from_slice(INSECURE_CIPHERS);
        }
        ciphers
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"********")
            .field("fingerprint", &self.fingerprint)
            .field("insecure_cipher", &self.insecure_cipher)
            .finish()
    }
}

/// Identification string sent to the server.
///
/// The cards reject versions that do not start with `SSH-2` or are shorter than 13 characters.
pub fn client_banner() -> String {
    format!(
        "SSH-2.0-nmc_p15_tool_v{} {}-{}",
        CLIENT_VERSION,
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
