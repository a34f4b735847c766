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

//! Exclusive XML Canonicalization 1.0, without comments
//! (<http://www.w3.org/2001/10/xml-exc-c14n#>).
//!
//! This is the part a Tizen device is unforgiving about: a single
//! misplaced namespace declaration or a whitespace byte of difference in
//! `<SignedInfo>` changes the digest it signs, and the package is
//! rejected. Everything here is pure and total over the `Element`/`Node`
//! trees this crate builds; it does not know how to fail except by
//! programmer error.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::xml::{Attr, Element, Node};

/// Options accepted by [`canonicalize`].
#[derive(Debug, Default, Clone)]
pub struct Options {
    /// `InclusiveNamespaces PrefixList`: prefixes that must be declared
    /// even though Exc-C14N would otherwise drop them as unused.
    pub inclusive_namespace_prefixes: HashSet<String>,
    /// The default namespace already in effect from the (virtual)
    /// enclosing context.
    pub default_namespace: String,
    /// Fallback `prefix -> namespace URI` map consulted only when an
    /// element has a prefix but no `namespace_uri` attached by the
    /// parser.
    pub default_namespace_for_prefix: std::collections::HashMap<String, String>,
}

#[derive(Clone)]
struct Scope {
    prefixes_in_scope: HashSet<String>,
    default_namespace: String,
}

/// Canonicalize a subtree to its Exc-C14N octet string.
pub fn canonicalize(node: &Node, options: &Options) -> String {
    let mut scope = Scope {
        prefixes_in_scope: HashSet::new(),
        default_namespace: options.default_namespace.clone(),
    };

    render_node(node, options, &mut scope)
}

fn render_node(node: &Node, options: &Options, scope: &mut Scope) -> String {
    match node {
        Node::Text(text) => render_text(text),
        Node::Element(element) => render_element(element, options, scope),
    }
}

fn render_text(text: &str) -> String {
    // Line-ending normalization already happened while parsing the raw
    // document (see xml::parse::normalize_line_endings); any `\r` still
    // present here came from a character reference and must round-trip
    // through `&#xD;` rather than be reinterpreted as a line ending.
    let mut out = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }

    out
}

fn render_element(element: &Element, options: &Options, scope: &mut Scope) -> String {
    let mut child_scope = scope.clone();
    let qname = element.name.qualified();

    let mut out = String::new();
    out.push('<');
    out.push_str(&qname);
    out.push_str(&render_namespace_axis(element, options, &mut child_scope));
    out.push_str(&render_attribute_axis(element));
    out.push('>');

    for child in &element.children {
        out.push_str(&render_node(child, options, &mut child_scope));
    }

    out.push_str("</");
    out.push_str(&qname);
    out.push('>');

    out
}

fn render_namespace_axis(element: &Element, options: &Options, scope: &mut Scope) -> String {
    let mut default_decl: Option<String> = None;
    let mut prefixed: Vec<(String, String)> = Vec::new();

    match &element.name.prefix {
        Some(prefix) => {
            if !scope.prefixes_in_scope.contains(prefix) {
                let uri = element
                    .namespace_uri
                    .clone()
                    .or_else(|| options.default_namespace_for_prefix.get(prefix).cloned())
                    .unwrap_or_default();

                prefixed.push((prefix.clone(), uri));
                scope.prefixes_in_scope.insert(prefix.clone());
            }
        }
        None => {
            let element_default_ns = element.namespace_uri.clone().unwrap_or_default();

            if element_default_ns != scope.default_namespace {
                scope.default_namespace = element_default_ns.clone();
                default_decl = Some(element_default_ns);
            }
        }
    }

    for (prefix, uri) in &element.ns_decls {
        if options.inclusive_namespace_prefixes.contains(prefix) && !scope.prefixes_in_scope.contains(prefix) {
            prefixed.push((prefix.clone(), uri.clone()));
            scope.prefixes_in_scope.insert(prefix.clone());
        }
    }

    for attr in &element.attrs {
        if let Some(prefix) = &attr.name.prefix {
            if prefix != "xmlns" && prefix != "xml" && !scope.prefixes_in_scope.contains(prefix) {
                let uri = attr.namespace_uri.clone().unwrap_or_default();

                prefixed.push((prefix.clone(), uri));
                scope.prefixes_in_scope.insert(prefix.clone());
            }
        }
    }

    prefixed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::new();
    if let Some(uri) = default_decl {
        out.push_str(" xmlns=\"");
        out.push_str(&uri);
        out.push('"');
    }
    for (prefix, uri) in prefixed {
        out.push_str(" xmlns:");
        out.push_str(&prefix);
        out.push_str("=\"");
        out.push_str(&uri);
        out.push('"');
    }

    out
}

fn render_attribute_axis(element: &Element) -> String {
    let mut attrs: Vec<&Attr> = element.attrs.iter().collect();
    attrs.sort_by(attr_cmp);

    let mut out = String::new();
    for attr in attrs {
        out.push(' ');
        out.push_str(&attr.name.qualified());
        out.push_str("=\"");
        out.push_str(&escape_attr_value(&attr.value));
        out.push('"');
    }

    out
}

fn attr_cmp(a: &&Attr, b: &&Attr) -> Ordering {
    match (a.namespace_uri.is_none(), b.namespace_uri.is_none()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => {
            let key_a = format!(
                "{}{}",
                a.namespace_uri.as_deref().unwrap_or(""),
                a.name.local_name
            );
            let key_b = format!(
                "{}{}",
                b.namespace_uri.as_deref().unwrap_or(""),
                b.name.local_name
            );

            key_a.cmp(&key_b)
        }
    }
}

fn escape_attr_value(value: &str) -> String {
    // Whitespace-run collapsing already happened while decoding the
    // attribute during parsing (xml::entity::decode_attribute_value);
    // what's left here is just escaping.
    let mut out = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\r' => out.push_str("&#xD;"),
            '\n' => out.push_str("&#xA;"),
            '\t' => out.push_str("&#x9;"),
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_document;

    fn canonicalize_str(xml: &str, options: &Options) -> String {
        let element = parse_document(xml).unwrap();
        canonicalize(&Node::Element(element), options)
    }

    #[test]
    fn attribute_ordering_no_namespace_before_xml_namespace() {
        let out = canonicalize_str(
            r#"<e xmlns="u" b="2" a="1" xml:lang="en"/>"#,
            &Options::default(),
        );

        assert_eq!(out, r#"<e xmlns="u" a="1" b="2" xml:lang="en"></e>"#);
    }

    #[test]
    fn line_ending_normalization_in_text() {
        let out = canonicalize_str("<e>a\r\nb\rc\n</e>", &Options::default());

        assert_eq!(out, "<e>a\nb\nc\n</e>");
    }

    #[test]
    fn escapes_special_characters_in_attributes() {
        let out = canonicalize_str(
            r#"<e v="a &amp; b &#xA; c"/>"#,
            &Options::default(),
        );

        assert_eq!(out, r#"<e v="a &amp; b &#xA; c"></e>"#);
    }

    #[test]
    fn is_deterministic_across_repeated_calls() {
        let xml = r#"<ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:Reference URI="a"/></ds:SignedInfo>"#;
        let element = parse_document(xml).unwrap();
        let node = Node::Element(element);

        let first = canonicalize(&node, &Options::default());
        let second = canonicalize(&node, &Options::default());

        assert_eq!(first, second);
    }

    #[test]
    fn does_not_redeclare_ancestor_namespace() {
        let xml = r#"<a xmlns="urn:x"><b><c/></b></a>"#;
        let out = canonicalize_str(xml, &Options::default());

        assert_eq!(out, r#"<a xmlns="urn:x"><b><c></c></b></a>"#);
    }

    #[test]
    fn inclusive_namespace_prefixes_forces_declaration_of_an_unused_prefix() {
        let mut inclusive_namespace_prefixes = HashSet::new();
        inclusive_namespace_prefixes.insert("ds".to_string());
        let options = Options {
            inclusive_namespace_prefixes,
            ..Options::default()
        };

        // "ds" is declared but never referenced by any element or
        // attribute name in the subtree; ordinary Exc-C14N would drop it
        // as unused, but the InclusiveNamespaces PrefixList forces it.
        let out = canonicalize_str(
            r#"<e xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><child/></e>"#,
            &options,
        );

        assert_eq!(
            out,
            r#"<e xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><child></child></e>"#
        );
    }

    #[test]
    fn inclusive_namespace_prefixes_does_not_redeclare_a_prefix_already_in_scope() {
        let mut inclusive_namespace_prefixes = HashSet::new();
        inclusive_namespace_prefixes.insert("ds".to_string());
        let options = Options {
            inclusive_namespace_prefixes,
            ..Options::default()
        };

        // The child redundantly re-declares "ds" with the same URI; since
        // the parent's forced declaration already put "ds" in scope, the
        // child must not emit a second declaration for it.
        let out = canonicalize_str(
            r#"<e xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><child xmlns:ds="http://www.w3.org/2000/09/xmldsig#"/></e>"#,
            &options,
        );

        assert_eq!(
            out,
            r#"<e xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><child></child></e>"#
        );
    }
}
