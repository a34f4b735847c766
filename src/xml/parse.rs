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

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::entity::{decode_attribute_value, decode_text};
use super::{Attr, Element, Node, QName, XML_NAMESPACE};
use crate::Error;

#[derive(Clone)]
struct Scope {
    default_ns: String,
    prefixes: HashMap<String, String>,
}

impl Scope {
    fn root() -> Self {
        Self {
            default_ns: String::new(),
            prefixes: HashMap::new(),
        }
    }
}

/// Parse a complete XML document (after normalizing its line endings) and
/// return its document element.
pub fn parse_document(source: &str) -> Result<Element, Error> {
    let normalized = normalize_line_endings(source);
    let mut reader = Reader::from_str(&normalized);
    reader.trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<(Element, Scope)> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(start) => {
                let parent_scope = stack.last().map(|(_, s)| s.clone()).unwrap_or_else(Scope::root);
                let (element, child_scope) = build_element(start.name(), start.attributes(), parent_scope)?;
                stack.push((element, child_scope));
            }
            Event::Empty(start) => {
                let parent_scope = stack.last().map(|(_, s)| s.clone()).unwrap_or_else(Scope::root);
                let (element, _) = build_element(start.name(), start.attributes(), parent_scope)?;
                push_child(&mut stack, &mut root, Node::Element(element));
            }
            Event::End(_) => {
                let (element, _) = stack
                    .pop()
                    .ok_or_else(|| Error::MalformedInternalXml("unmatched closing tag".into()))?;

                push_child(&mut stack, &mut root, Node::Element(element));
            }
            Event::Text(text) => {
                let raw = std::str::from_utf8(text.escaped())
                    .map_err(|_| Error::MalformedInternalXml("non-UTF-8 text node".into()))?;
                let decoded = decode_text(raw)?;

                if !decoded.is_empty() {
                    if let Some((current, _)) = stack.last_mut() {
                        current.children.push(Node::Text(decoded));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    root.ok_or_else(|| Error::MalformedInternalXml("document has no element".into()))
}

fn push_child(stack: &mut Vec<(Element, Scope)>, root: &mut Option<Element>, child: Node) {
    match stack.last_mut() {
        Some((parent, _)) => parent.children.push(child),
        None => {
            if let Node::Element(element) = child {
                *root = Some(element);
            }
        }
    }
}

fn build_element(
    raw_name: &[u8],
    attributes: quick_xml::events::attributes::Attributes,
    parent_scope: Scope,
) -> Result<(Element, Scope), Error> {
    let name = std::str::from_utf8(raw_name)
        .map_err(|_| Error::MalformedInternalXml("non-UTF-8 element name".into()))?;
    let name = split_qname(name);

    let mut scope = parent_scope;
    let mut ns_decls = Vec::new();
    let mut raw_attrs = Vec::new();

    for attr in attributes {
        let attr = attr.map_err(|err| Error::MalformedInternalXml(format!("bad attribute: {}", err)))?;
        let key = std::str::from_utf8(attr.key)
            .map_err(|_| Error::MalformedInternalXml("non-UTF-8 attribute name".into()))?;
        let raw_value = std::str::from_utf8(&attr.value)
            .map_err(|_| Error::MalformedInternalXml("non-UTF-8 attribute value".into()))?;
        let value = decode_attribute_value(raw_value)?;

        if key == "xmlns" {
            scope.default_ns = value.clone();
            ns_decls.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            scope.prefixes.insert(prefix.to_string(), value.clone());
            ns_decls.push((prefix.to_string(), value));
        } else {
            raw_attrs.push((key.to_string(), value));
        }
    }

    let element_namespace = if let Some(prefix) = &name.prefix {
        scope.prefixes.get(prefix).cloned()
    } else {
        Some(scope.default_ns.clone())
    };

    let mut attrs = Vec::with_capacity(raw_attrs.len());
    for (key, value) in raw_attrs {
        let attr_name = split_qname(&key);
        let namespace_uri = match &attr_name.prefix {
            Some(prefix) if prefix == "xml" => Some(XML_NAMESPACE.to_string()),
            Some(prefix) => scope.prefixes.get(prefix).cloned(),
            None => None,
        };

        attrs.push(Attr {
            name: attr_name,
            namespace_uri,
            value,
        });
    }

    let element = Element {
        name,
        namespace_uri: element_namespace,
        attrs,
        ns_decls,
        children: Vec::new(),
    };

    Ok((element, scope))
}

fn split_qname(name: &str) -> QName {
    match name.split_once(':') {
        Some((prefix, local)) => QName {
            prefix: Some(prefix.to_string()),
            local_name: local.to_string(),
        },
        None => QName::unprefixed(name),
    }
}

/// Normalize every literal `\r\n` and lone `\r` in raw document text to
/// `\n`, mirroring XML 1.0 end-of-line handling. Entities such as
/// `&#xD;` are untouched (they are not literal carriage returns in the
/// source) and survive into parsed values as real `\r` characters.
fn normalize_line_endings(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_with_default_namespace() {
        let doc = parse_document(r#"<a xmlns="urn:x"><b>hi</b></a>"#).unwrap();

        assert_eq!(doc.name.local_name, "a");
        assert_eq!(doc.namespace_uri.as_deref(), Some("urn:x"));

        let child = doc.first_child_element().unwrap();
        assert_eq!(child.name.local_name, "b");
        assert_eq!(child.namespace_uri.as_deref(), Some("urn:x"));
    }

    #[test]
    fn resolves_prefixed_attribute_namespace() {
        let doc = parse_document(r#"<e xmlns="u" xml:lang="en"/>"#).unwrap();

        assert_eq!(doc.attrs.len(), 1);
        assert_eq!(doc.attrs[0].namespace_uri.as_deref(), Some(XML_NAMESPACE));
    }
}
