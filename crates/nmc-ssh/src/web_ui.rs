use std::{
    io,
    net::{TcpStream, ToSocketAddrs},
    sync::Arc,
    time::Duration,
};

use rustls::{
    ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme,
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::{WebPkiSupportedAlgorithms, ring, verify_tls12_signature, verify_tls13_signature},
    pki_types::{CertificateDer, ServerName, UnixTime},
};
use tracing::{debug, info};

use crate::{SshError, config::CONNECT_TIMEOUT};

/// HTTPS port of the card's web UI.
pub const DEFAULT_WEB_UI_SSL_PORT: u16 = 443;
/// Wait before checking the web UI after an install.
pub const WEB_UI_SETTLE_DELAY: Duration = Duration::from_secs(5);
/// Additional wait when the web UI was restarted.
pub const WEB_UI_RESTART_DELAY: Duration = Duration::from_secs(25);

/// Accepts whatever certificate the card serves. Handshake signatures are still checked so the
/// peer has to hold the key of the certificate it presents.
#[derive(Debug)]
struct AnyServerCertificate(WebPkiSupportedAlgorithms);

impl ServerCertVerifier for AnyServerCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.supported_schemes()
    }
}

fn client_config() -> Result<ClientConfig, SshError> {
    let provider = Arc::new(ring::default_provider());
    let verifier = AnyServerCertificate(provider.signature_verification_algorithms);

    Ok(ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth())
}

/// Completes a TLS handshake with `hostname:port` and returns the leaf certificate it serves.
pub fn fetch_web_ui_certificate(
    hostname: &str,
    port: u16,
) -> Result<CertificateDer<'static>, SshError> {
    let address = format!("{hostname}:{port}");
    let connect_error = |source| SshError::Connect {
        address: address.clone(),
        source,
    };

    let socket_addr = address
        .to_socket_addrs()
        .map_err(connect_error)?
        .next()
        .ok_or_else(|| connect_error(io::ErrorKind::NotFound.into()))?;
    let mut tcp = TcpStream::connect_timeout(&socket_addr, CONNECT_TIMEOUT).map_err(connect_error)?;
    tcp.set_read_timeout(Some(CONNECT_TIMEOUT))?;
    tcp.set_write_timeout(Some(CONNECT_TIMEOUT))?;

    let server_name = ServerName::try_from(hostname.to_owned())
        .map_err(|_| SshError::InvalidServerName(hostname.to_owned()))?;
    let mut conn = ClientConnection::new(Arc::new(client_config()?), server_name)?;
    while conn.is_handshaking() {
        conn.complete_io(&mut tcp)?;
    }

    let leaf = conn
        .peer_certificates()
        .and_then(|chain| chain.first())
        .map(|cert| cert.clone().into_owned())
        .ok_or(SshError::MissingPeerCertificate)?;

    conn.send_close_notify();
    // The certificate is already in hand, a card resetting the connection here is harmless.
    let _ = conn.complete_io(&mut tcp);

    debug!(%address, bytes = leaf.len(), "Fetched web UI certificate");
    Ok(leaf)
}

/// Checks that the web UI at `hostname:port` serves exactly the certificate `expected_der`.
pub fn verify_web_ui_certificate(
    hostname: &str,
    port: u16,
    expected_der: &[u8],
) -> Result<(), SshError> {
    let served = fetch_web_ui_certificate(hostname, port)?;
    if served.as_ref() != expected_der {
        return Err(SshError::CertificateMismatch);
    }

    info!(hostname, port, "Web UI serves the new certificate");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{net::TcpListener, thread};

    use rustls::{
        ServerConfig, ServerConnection,
        pki_types::{PrivateKeyDer, pem::PemObject},
    };

    use super::*;

    const RSA_CERT: &[u8] = include_bytes!("../../nmc-pkcs15/resources/rsa2048.cert.pem");
    const RSA_KEY: &[u8] = include_bytes!("../../nmc-pkcs15/resources/rsa2048.pkcs8.key.pem");
    const P256_CERT: &[u8] = include_bytes!("../../nmc-pkcs15/resources/p256.cert.pem");

    fn der(pem: &[u8]) -> CertificateDer<'static> {
        CertificateDer::from_pem_slice(pem).unwrap()
    }

    /// Serves `cert_pem` to a single TLS client on an ephemeral local port.
    fn serve_once(cert_pem: &[u8], key_pem: &[u8]) -> (u16, thread::JoinHandle<()>) {
        let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![der(cert_pem)], PrivateKeyDer::from_pem_slice(key_pem).unwrap())
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut tcp, _) = listener.accept().unwrap();
            let mut conn = ServerConnection::new(Arc::new(config)).unwrap();
            while conn.is_handshaking() {
                if conn.complete_io(&mut tcp).is_err() {
                    return;
                }
            }
            let _ = conn.complete_io(&mut tcp);
        });
        (port, handle)
    }

    #[test]
    fn test_fetches_served_leaf_certificate() {
        let (port, server) = serve_once(RSA_CERT, RSA_KEY);

        let served = fetch_web_ui_certificate("127.0.0.1", port).unwrap();
        assert_eq!(served, der(RSA_CERT));
        server.join().unwrap();
    }

    #[test]
    fn test_matching_certificate_verifies() {
        let (port, server) = serve_once(RSA_CERT, RSA_KEY);

        verify_web_ui_certificate("127.0.0.1", port, der(RSA_CERT).as_ref()).unwrap();
        server.join().unwrap();
    }

    #[test]
    fn test_different_certificate_is_rejected() {
        let (port, server) = serve_once(RSA_CERT, RSA_KEY);

        let result = verify_web_ui_certificate("127.0.0.1", port, der(P256_CERT).as_ref());
        assert!(matches!(result, Err(SshError::CertificateMismatch)));
        server.join().unwrap();
    }

    #[test]
    fn test_closed_port_is_a_connect_error() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let result = fetch_web_ui_certificate("127.0.0.1", port);
        assert!(matches!(result, Err(SshError::Connect { .. })));
    }
}
