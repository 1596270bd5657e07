//! WebSocket transport to a gateway, optionally over TLS.
//!
//! Certificate validation is disabled on the encrypted path: load-test
//! deployments run gateways with self-signed certificates.

use anyhow::{Context, Result};
use gatesim_config::GateConfig;
use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{
    connect_async, connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

/// Established client-side WebSocket stream.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open a WebSocket connection to the given gateway.
///
/// The URL scheme and Origin header follow the gateway's encrypt flag.
/// Failures are returned to the caller; retry policy belongs to the bot.
pub async fn connect_gateway(gate: &GateConfig) -> Result<WsStream> {
    let (ws_scheme, origin_scheme) = if gate.encrypt {
        ("wss", "https")
    } else {
        ("ws", "http")
    };
    let url = format!("{ws_scheme}://{}:{}/ws", gate.host, gate.port);
    let origin = format!("{origin_scheme}://{}:{}/", gate.host, gate.port);

    let mut request = url
        .clone()
        .into_client_request()
        .with_context(|| format!("invalid gateway address {url}"))?;
    request.headers_mut().insert(
        "Origin",
        HeaderValue::from_str(&origin).context("invalid origin header")?,
    );

    debug!(%url, "connecting to gateway");

    let (stream, _response) = if gate.encrypt {
        let connector = Connector::Rustls(Arc::new(insecure_tls_config()));
        connect_async_tls_with_config(request, None, false, Some(connector))
            .await
            .with_context(|| format!("websocket connect to {url} failed"))?
    } else {
        connect_async(request)
            .await
            .with_context(|| format!("websocket connect to {url} failed"))?
    };

    Ok(stream)
}

/// rustls client config that accepts any server certificate.
fn insecure_tls_config() -> rustls::ClientConfig {
    // Install default crypto provider if not already installed
    let _ = rustls::crypto::ring::default_provider().install_default();

    rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(SkipServerVerification))
        .with_no_client_auth()
}

/// Certificate verifier that accepts all certificates (load-test only).
///
/// **WARNING:** This bypasses TLS security and should NEVER be used in
/// production.
#[derive(Debug)]
struct SkipServerVerification;

impl ServerCertVerifier for SkipServerVerification {
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
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
