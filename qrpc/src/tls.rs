//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! TLS configuration helpers.
//!
//! QUIC always runs over TLS 1.3. The server must be given a certificate;
//! these helpers cover the common sources (PEM files and self-signed
//! certificates for tests) and the matching client configurations.

use crate::config::DEFAULT_ALPN;
use std::io;
use std::sync::Arc;

/// Builds a server configuration from a self-signed certificate.
///
/// Intended for tests and local development.
///
/// # Examples
///
/// ```rust
/// let config = qrpc::tls::self_signed_server_config(vec!["localhost".to_string()]).unwrap();
/// assert_eq!(config.alpn_protocols, vec![b"qrpc".to_vec()]);
/// ```
pub fn self_signed_server_config(
    subject_alt_names: Vec<String>,
) -> Result<Arc<rustls::ServerConfig>, io::Error> {
    let cert = rcgen::generate_simple_self_signed(subject_alt_names).map_err(io::Error::other)?;
    let cert_der = cert.serialize_der().map_err(io::Error::other)?;
    let key_der = cert.serialize_private_key_der();

    server_config(
        vec![rustls::Certificate(cert_der)],
        rustls::PrivateKey(key_der),
    )
}

/// Builds a server configuration from a PEM certificate chain and a PEM
/// PKCS#8 private key.
pub fn server_config_from_pem(
    cert_pem: &[u8],
    key_pem: &[u8],
) -> Result<Arc<rustls::ServerConfig>, io::Error> {
    let certs = rustls_pemfile::certs(&mut &cert_pem[..])?;
    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "no certificate found in PEM data",
        ));
    }

    let mut keys = rustls_pemfile::pkcs8_private_keys(&mut &key_pem[..])?;
    if keys.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "no PKCS#8 private key found in PEM data",
        ));
    }

    server_config(
        certs.into_iter().map(rustls::Certificate).collect(),
        rustls::PrivateKey(keys.swap_remove(0)),
    )
}

fn server_config(
    cert_chain: Vec<rustls::Certificate>,
    key: rustls::PrivateKey,
) -> Result<Arc<rustls::ServerConfig>, io::Error> {
    let mut crypto = rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)
        .map_err(io::Error::other)?;
    crypto.alpn_protocols = vec![DEFAULT_ALPN.to_vec()];
    Ok(Arc::new(crypto))
}

/// Builds a client configuration that trusts the given DER certificates.
pub fn client_config_with_roots(
    roots: &[rustls::Certificate],
) -> Result<Arc<rustls::ClientConfig>, io::Error> {
    let mut store = rustls::RootCertStore::empty();
    for root in roots {
        store.add(root).map_err(io::Error::other)?;
    }

    let mut crypto = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(store)
        .with_no_client_auth();
    crypto.alpn_protocols = vec![DEFAULT_ALPN.to_vec()];
    Ok(Arc::new(crypto))
}

/// Builds a client configuration that accepts any server certificate.
///
/// **WARNING**: this disables server authentication. It is the client
/// default so that internal deployments with self-signed certificates work
/// out of the box; supply [`client_config_with_roots`] anywhere the network
/// is not trusted.
pub fn insecure_client_config() -> Arc<rustls::ClientConfig> {
    let mut crypto = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_custom_certificate_verifier(Arc::new(SkipServerVerification))
        .with_no_client_auth();
    crypto.alpn_protocols = vec![DEFAULT_ALPN.to_vec()];
    Arc::new(crypto)
}

#[derive(Debug)]
struct SkipServerVerification;

impl rustls::client::ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::Certificate,
        _intermediates: &[rustls::Certificate],
        _server_name: &rustls::ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: std::time::SystemTime,
    ) -> Result<rustls::client::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::ServerCertVerified::assertion())
    }
}
