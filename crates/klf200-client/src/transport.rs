//! TLS transport.
//!
//! The gateway presents a self-signed certificate, so verification is
//! disabled entirely; instead the certificate's SHA-256 fingerprint is
//! captured at handshake time and exposed read-only for callers that
//! want to pin it out of band.

use std::net::SocketAddr;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::net::TcpStream;
use tokio_rustls::rustls;
use tokio_rustls::TlsConnector;

use crate::config::Config;
use crate::error::{ClientError, Result};

/// An established TLS stream plus its connection metadata.
pub(crate) struct TlsTransport {
    /// The encrypted stream.
    pub stream: tokio_rustls::client::TlsStream<TcpStream>,
    /// Peer socket address.
    pub peer: SocketAddr,
    /// SHA-256 fingerprint of the peer certificate, hex encoded.
    pub fingerprint: Option<String>,
}

/// Dial the gateway and complete the TLS handshake.
pub(crate) async fn connect(config: &Config) -> Result<TlsTransport> {
    let tcp = TcpStream::connect((config.host.as_str(), config.port)).await?;
    let peer = tcp.peer_addr()?;

    let server_name = rustls::pki_types::ServerName::try_from(config.host.clone())
        .map_err(|_| ClientError::InvalidHost(config.host.clone()))?;

    let connector = TlsConnector::from(Arc::new(insecure_client_config()));
    let stream = connector.connect(server_name, tcp).await?;

    let fingerprint = stream
        .get_ref()
        .1
        .peer_certificates()
        .and_then(|certs| certs.first())
        .map(|cert| hex::encode(Sha256::digest(cert.as_ref())));

    tracing::debug!(%peer, fingerprint = fingerprint.as_deref(), "TLS established");

    Ok(TlsTransport { stream, peer, fingerprint })
}

/// Client config that accepts any certificate.
///
/// The KLF 200 ships a self-signed certificate with no stable chain;
/// trust is by fingerprint pinning at a higher layer, or not at all.
fn insecure_client_config() -> rustls::ClientConfig {
    rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InsecureCertVerifier))
        .with_no_client_auth()
}

/// Certificate verifier that accepts any certificate.
#[derive(Debug)]
struct InsecureCertVerifier;

impl rustls::client::danger::ServerCertVerifier for InsecureCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    // The gateway speaks TLS 1.2 only and signs its handshake with the
    // RSA key of its self-signed certificate; ECDSA P-256/P-384 cover
    // units flashed with an EC certificate.
    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
        ]
    }
}
