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

/// Which widget-digsig role a `Signature` is being built for.
///
/// The role picks the output filename, the `Id` attribute on the outer
/// `<Signature>` element, the `dsp:Role` URI suffix in the `<Object
/// Id="prop">` block, and the hard-coded digest of that block (constant
/// because the block's content is constant for a given role).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Author,
    Distributor,
}

impl Role {
    /// Value of the outer `<Signature Id="...">` attribute.
    pub fn id(self) -> &'static str {
        match self {
            Role::Author => "AuthorSignature",
            Role::Distributor => "DistributorSignature",
        }
    }

    /// Fixed output filename mandated by the widget-digsig profile.
    pub fn filename(self) -> &'static str {
        match self {
            Role::Author => "author-signature.xml",
            Role::Distributor => "signature1.xml",
        }
    }

    /// Suffix of the `dsp:Role` URI (`.../role-{author|distributor}`).
    pub fn role_suffix(self) -> &'static str {
        match self {
            Role::Author => "author",
            Role::Distributor => "distributor",
        }
    }

    /// Precomputed base64 SHA-512 digest of this role's `<Object
    /// Id="prop">` block, canonicalized. The block is byte-identical
    /// across every package of a given role, so this is a constant; see
    /// design note on recomputation vs. retaining it verbatim.
    pub fn prop_digest(self) -> &'static str {
        match self {
            Role::Author => {
                "aXbSAVgmAz0GsBUeZ1UmNDRrxkWhDUVGb45dZcNRq429wX3X+x6kaXT3NdNDTSNVTU+ypkysPMGvQY10fG1EWQ=="
            }
            Role::Distributor => {
                "/r5npk2VVA46QFJnejgONBEh4BWtjrtu9x/IFeLksjWyGmB/cMWKSJWQl7aU3YRQRZ3AesG8gF7qGyvKX9Snig=="
            }
        }
    }
}
