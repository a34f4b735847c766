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

//! A minimal XML tree and parser, just capable enough to round-trip the
//! `<Signature>` documents this crate assembles and hand the `<SignedInfo>`
//! subtree to the canonicalizer. Not a general-purpose XML library: no
//! DTD, no comments, no processing instructions.

mod entity;
mod parse;

pub use parse::parse_document;

/// The implicit namespace bound to the `xml:` prefix by the XML
/// specification itself; never needs an `xmlns:xml` declaration.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local_name: String,
}

impl QName {
    pub fn unprefixed(local_name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local_name: local_name.into(),
        }
    }

    /// Qualified name as it should be written out: `prefix:local` or just
    /// `local`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attr {
    pub name: QName,
    pub namespace_uri: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub name: QName,
    pub namespace_uri: Option<String>,
    /// Non-namespace attributes only (`xmlns`/`xmlns:*` are stripped out
    /// during parsing and recorded in `ns_decls` instead).
    pub attrs: Vec<Attr>,
    /// This element's own literal `xmlns`/`xmlns:prefix` declarations, as
    /// `(prefix, uri)` pairs (`prefix` is empty for the default-namespace
    /// declaration). Consulted only by the InclusiveNamespaces PrefixList
    /// rule in the canonicalizer.
    pub ns_decls: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// First child that is an element, if any.
    pub fn first_child_element(&self) -> Option<&Element> {
        self.children.iter().find_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(String),
}
