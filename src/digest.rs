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

use openssl::hash::{hash, MessageDigest};

use crate::role::Role;
use crate::util::wrap76;
use crate::{Error, FileEntry};

const DIGEST_METHOD_SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";
const C14N11: &str = "http://www.w3.org/2006/12/xml-c14n11";

/// `Base64(SHA-512(data))`, unwrapped.
pub fn digest_value(data: &[u8]) -> Result<String, Error> {
    let digest = hash(MessageDigest::sha512(), data)?;

    Ok(base64::encode(&digest))
}

/// Render one `<Reference URI="{uri}">` fragment for a package file.
pub fn render_reference(uri: &str, data: &[u8]) -> Result<String, Error> {
    let digest = wrap76(&digest_value(data)?);

    Ok(format!(
        "<Reference URI=\"{uri}\">\n\
         <DigestMethod Algorithm=\"{method}\"></DigestMethod>\n\
         <DigestValue>{digest}</DigestValue>\n\
         </Reference>",
        uri = uri,
        method = DIGEST_METHOD_SHA512,
        digest = digest,
    ))
}

/// Render the fixed `<Reference URI="#prop">` fragment, whose digest is a
/// precomputed constant for the given role (see [`Role::prop_digest`]).
pub fn render_prop_reference(role: Role) -> String {
    format!(
        "<Reference URI=\"#prop\">\n\
         <Transforms><Transform Algorithm=\"{c14n11}\"></Transform></Transforms>\n\
         <DigestMethod Algorithm=\"{method}\"></DigestMethod>\n\
         <DigestValue>{digest}</DigestValue>\n\
         </Reference>",
        c14n11 = C14N11,
        method = DIGEST_METHOD_SHA512,
        digest = wrap76(role.prop_digest()),
    )
}

/// Render all `<Reference>` fragments for `files`, in file order, followed
/// by the fixed `#prop` reference.
pub fn render_references(files: &[FileEntry], role: Role) -> Result<String, Error> {
    let mut rendered = Vec::with_capacity(files.len() + 1);

    for file in files {
        rendered.push(render_reference(&file.uri, &file.data)?);
    }
    rendered.push(render_prop_reference(role));

    Ok(rendered.join("\n"))
}
