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

//! Rebuilds and signs Tizen `.wgt`/`.tpk` package contents without Tizen
//! Studio: per-file SHA-512 digests, Exclusive XML Canonicalization
//! (Exc-C14N 1.0, no comments) of `<SignedInfo>`, and RSA-SHA512 signing,
//! assembled into the `AuthorSignature`/`DistributorSignature` XML-DSig
//! documents the widget-digsig profile requires.
//!
//! Archive packing, the CLI surface, and certificate-creation/CA-exchange
//! flows are not this crate's concern — it consumes an ordered file list
//! and a parsed PKCS#12 bundle, and produces an augmented file list with
//! the signature document prepended.

pub mod c14n;
mod digest;
mod error;
pub mod keyinfo;
mod role;
mod signature;
mod util;
pub mod xml;

pub use error::Error;
pub use keyinfo::Pkcs12Bundle;
pub use role::Role;
pub use signature::Signature;

/// One file inside the package being signed.
///
/// `uri` is a URL-encoded path relative to the package root (encoding is
/// the packager's concern, not this crate's); `data` is the raw bytes
/// that get digested. A sequence of these must keep its order through
/// signing, since order determines `<Reference>` order in `<SignedInfo>`.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub uri: String,
    pub data: Vec<u8>,
}

impl FileEntry {
    pub fn new(uri: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            uri: uri.into(),
            data,
        }
    }
}
