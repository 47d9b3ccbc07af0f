use std::{
    io::{self, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use ssh2::{MethodType, Session};
use tracing::debug;

use crate::{
    SshError,
    client::{Channel, Connector},
    config::{CONNECT_TIMEOUT, ClientConfig, KEX_ALGORITHMS, client_banner},
    fingerprint::verify_host_key,
};

impl From<ssh2::Error> for SshError {
    fn from(e: ssh2::Error) -> Self {
        SshError::Session(e.to_string())
    }
}

/// Connects to a card over libssh2, one TCP connection per channel.
#[derive(Debug)]
pub struct Ssh2Connector {
    config: ClientConfig,
}

impl Ssh2Connector {
    #[allow(missing_docs)]
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Connects and authenticates once, to fail early on a bad address, key or password.
    pub fn check(&self) -> Result<(), SshError> {
        self.connect().map(drop)
    }

    fn connect(&self) -> Result<Session, SshError> {
        let address = self.config.address();
        let connect_error = |source| SshError::Connect {
            address: address.clone(),
            source,
        };

        let socket_addr = address
            .to_socket_addrs()
            .map_err(connect_error)?
            .next()
            .ok_or_else(|| connect_error(io::ErrorKind::NotFound.into()))?;
        let tcp = TcpStream::connect_timeout(&socket_addr, CONNECT_TIMEOUT).map_err(connect_error)?;

        let mut session = Session::new()?;
        session.set_timeout(millis(CONNECT_TIMEOUT));
        session.set_banner(&client_banner())?;
        session.method_pref(MethodType::Kex, &KEX_ALGORITHMS.join(","))?;
        let ciphers = self.config.ciphers().join(",");
        session.method_pref(MethodType::CryptCs, &ciphers)?;
        session.method_pref(MethodType::CryptSc, &ciphers)?;
        session.set_tcp_stream(tcp);
        session.handshake()?;

        let (host_key, _) = session.host_key().ok_or(SshError::MissingHostKey)?;
        verify_host_key(host_key, &self.config.fingerprint)?;

        session
            .userauth_password(&self.config.username, &self.config.password)
            .map_err(|_| SshError::Authentication(self.config.username.clone()))?;
        if !session.authenticated() {
            return Err(SshError::Authentication(self.config.username.clone()));
        }

        debug!(%address, "Connected");
        Ok(session)
    }
}

impl Connector for Ssh2Connector {
    type Channel = Ssh2Channel;

    fn exec(&self, command: &str) -> Result<Ssh2Channel, SshError> {
        let session = self.connect()?;
        let mut channel = session.channel_session()?;
        channel.exec(command)?;
        Ok(Ssh2Channel { session, channel })
    }

    fn shell(&self) -> Result<Ssh2Channel, SshError> {
        let session = self.connect()?;
        let mut channel = session.channel_session()?;
        channel.shell()?;
        Ok(Ssh2Channel { session, channel })
    }
}

/// A channel together with the session that owns its connection.
pub struct Ssh2Channel {
    session: Session,
    channel: ssh2::Channel,
}

impl Read for Ssh2Channel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.channel.read(buf)
    }
}

impl Write for Ssh2Channel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.channel.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.channel.flush()
    }
}

impl Channel for Ssh2Channel {
    fn set_timeout(&mut self, timeout: Duration) {
        self.session.set_timeout(millis(timeout));
    }

    fn close(&mut self) -> io::Result<()> {
        self.channel.send_eof()?;
        self.channel.wait_close()?;
        Ok(())
    }
}

fn millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}
