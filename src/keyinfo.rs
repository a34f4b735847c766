/*
 * Copyright (c) 2021 gematik GmbH
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *    http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 */

use log::debug;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::X509;

use crate::util::{strip_pem_boundaries, wrap76};
use crate::Error;

/// Certificate chain and private key extracted from a parsed PKCS#12
/// bundle. Certificates are kept in bag iteration order (leaf first);
/// the Tizen verifier treats the first certificate as the signer and the
/// remainder as the chain, so a bundle that orders them differently is a
/// caller input problem, not something this type can detect.
pub struct Pkcs12Bundle {
    certificates: Vec<X509>,
    private_key: PKey<Private>,
}

impl Pkcs12Bundle {
    /// Parse a DER-encoded PKCS#12 bundle with the caller-supplied
    /// password.
    pub fn from_der(der: &[u8], password: &str) -> Result<Self, Error> {
        let pkcs12 = Pkcs12::from_der(der)?;
        let parsed = pkcs12.parse2(password)?;

        Self::from_parsed(parsed.pkey, parsed.cert, parsed.ca)
    }

    /// Validate and assemble a bundle from the three optional parts a
    /// parsed PKCS#12 container can yield. Split out of [`Self::from_der`]
    /// so the `InvalidKeyMaterial` checks (spec.md §7: "the PKCS#12 bundle
    /// lacks a private key or lacks any certificate") can be exercised
    /// directly in tests without needing a hand-built PKCS#12 DER blob for
    /// every combination of missing parts.
    fn from_parsed(
        pkey: Option<PKey<Private>>,
        cert: Option<X509>,
        ca: Option<Stack<X509>>,
    ) -> Result<Self, Error> {
        let private_key = pkey.ok_or(Error::InvalidKeyMaterial)?;

        let mut certificates = Vec::new();
        if let Some(cert) = cert {
            certificates.push(cert);
        }
        if let Some(chain) = ca {
            for cert in chain {
                certificates.push(cert);
            }
        }

        if certificates.is_empty() {
            return Err(Error::InvalidKeyMaterial);
        }

        debug!(
            "loaded PKCS#12 bundle: {} certificate(s), RSA private key",
            certificates.len()
        );

        Ok(Self {
            certificates,
            private_key,
        })
    }

    /// Build a bundle directly from already-parsed parts, bypassing
    /// PKCS#12 decoding. Used by callers (and tests) that already hold a
    /// certificate chain and key obtained some other way.
    pub fn from_parts(certificates: Vec<X509>, private_key: PKey<Private>) -> Self {
        Self {
            certificates,
            private_key,
        }
    }

    pub fn certificates(&self) -> &[X509] {
        &self.certificates
    }

    pub fn private_key(&self) -> &PKey<Private> {
        &self.private_key
    }
}

/// Render `<KeyInfo><X509Data>...</X509Data></KeyInfo>` with one
/// `<X509Certificate>` per certificate, in the order given.
pub fn build_keyinfo_xml(certificates: &[X509]) -> Result<String, Error> {
    let mut body = String::new();

    for cert in certificates {
        let pem = cert.to_pem()?;
        let pem = String::from_utf8(pem)?;
        let base64_body = wrap76(&strip_pem_boundaries(&pem));

        body.push_str("<X509Certificate>\n");
        body.push_str(&base64_body);
        body.push_str("\n</X509Certificate>\n");
    }

    Ok(format!("<KeyInfo>\n<X509Data>\n{}</X509Data>\n</KeyInfo>", body))
}
