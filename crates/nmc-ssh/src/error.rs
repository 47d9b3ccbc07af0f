use std::io;

use thiserror::Error;

/// Errors raised while talking to a management card.
#[derive(Debug, Error)]
pub enum SshError {
    /// The TCP connection could not be established.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        /// `host:port` that was dialed.
        address: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// The SSH library reported a failure during handshake, auth or channel setup.
    #[error("ssh session error: {0}")]
    Session(String),

    /// The server rejected the username and password.
    #[error("authentication failed for user '{0}'")]
    Authentication(String),

    /// The server did not present a host key after the handshake.
    #[error("server did not provide a host key")]
    MissingHostKey,

    /// The server's host key does not match the pinned SHA-256 fingerprint.
    #[error(
        "server returned wrong sha256 fingerprint (b64: {sha256_b64} ; hex: {sha256_hex} ; \
         md5 hex is: {md5_hint} , but is not acceptable in the fingerprint parameter)"
    )]
    FingerprintMismatch {
        /// Observed SHA-256 fingerprint, base64 without padding.
        sha256_b64: String,
        /// Observed SHA-256 fingerprint, lowercase hex.
        sha256_hex: String,
        /// Observed MD5 fingerprint as colon separated hex, as shown in the card's web UI.
        md5_hint: String,
    },

    /// The SCP sink answered a step with a non-zero status.
    #[error("scp: remote returned error ({status}: {message})")]
    ScpRemote {
        /// Status byte (1 = warning, 2 = fatal).
        status: u8,
        /// Message sent by the remote, without the trailing newline.
        message: String,
    },

    /// No prompt was seen before the shell timeout elapsed.
    #[error("shell did not return a parsable response before the timeout")]
    Timeout,

    /// The shell closed its output before sending a prompt.
    #[error("shell closed before returning a prompt")]
    UnexpectedEof,

    /// Shell output could not be split into command, code and text.
    #[error("shell returned an unparsable response: {0:?}")]
    UnparsableResponse(String),

    /// The card answered a command with a code other than `E000`.
    #[error("command '{command}' failed ({code}: {text})")]
    CommandFailed {
        /// Command as echoed by the card.
        command: String,
        /// Response code, e.g. `E102`.
        code: String,
        /// Text following the code.
        text: String,
    },

    /// The card only accepts the combined key+cert bundle but none was produced for this key.
    #[error("device requires a key+cert p15 bundle, which is not available for this key type")]
    MissingKeyCertBundle,

    /// The TLS connection to the web UI failed.
    #[error("web ui tls error: {0}")]
    Tls(#[from] rustls::Error),

    /// The host cannot be used as a TLS server name.
    #[error("invalid web ui host name '{0}'")]
    InvalidServerName(String),

    /// The web UI completed the handshake without presenting a certificate.
    #[error("web ui did not present a certificate")]
    MissingPeerCertificate,

    /// The web UI serves a certificate other than the one just installed.
    #[error("web ui leaf cert does not match new cert")]
    CertificateMismatch,

    /// Reading from or writing to the channel failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}
