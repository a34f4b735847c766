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

use crate::Error;

/// Decode an attribute value exactly the way XML attribute-value
/// normalization does: a run of *literal* whitespace (space/tab/CR/LF
/// typed directly in the source) collapses to a single space, while a
/// character or entity reference decodes to its literal character and is
/// inserted without joining an adjacent whitespace run — even if that
/// character happens to itself be whitespace. This is what lets
/// `&#xA;` survive canonicalization distinctly from a literal newline,
/// which collapses to a space.
pub fn decode_attribute_value(raw: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut in_whitespace_run = false;

    while let Some(c) = chars.next() {
        if c == '&' {
            let mut entity = String::new();
            for nc in chars.by_ref() {
                if nc == ';' {
                    break;
                }
                entity.push(nc);
            }

            out.push(resolve_entity(&entity)?);
            in_whitespace_run = false;
            continue;
        }

        match c {
            '\r' | '\n' | '\t' | ' ' => {
                if !in_whitespace_run {
                    out.push(' ');
                    in_whitespace_run = true;
                }
            }
            _ => {
                out.push(c);
                in_whitespace_run = false;
            }
        }
    }

    Ok(out)
}

/// Decode ordinary character data: no whitespace collapsing (that only
/// applies to attribute values), just entity/character reference
/// resolution.
pub fn decode_text(raw: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c == '&' {
            let mut entity = String::new();
            for nc in chars.by_ref() {
                if nc == ';' {
                    break;
                }
                entity.push(nc);
            }

            out.push(resolve_entity(&entity)?);
        } else {
            out.push(c);
        }
    }

    Ok(out)
}

fn resolve_entity(entity: &str) -> Result<char, Error> {
    let resolved = match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ if entity.starts_with("#x") || entity.starts_with("#X") => {
            let code = u32::from_str_radix(&entity[2..], 16)
                .map_err(|_| Error::MalformedInternalXml(format!("bad character reference &{};", entity)))?;

            char::from_u32(code)
                .ok_or_else(|| Error::MalformedInternalXml(format!("invalid code point &{};", entity)))?
        }
        _ if entity.starts_with('#') => {
            let code = entity[1..]
                .parse::<u32>()
                .map_err(|_| Error::MalformedInternalXml(format!("bad character reference &{};", entity)))?;

            char::from_u32(code)
                .ok_or_else(|| Error::MalformedInternalXml(format!("invalid code point &{};", entity)))?
        }
        _ => {
            return Err(Error::MalformedInternalXml(format!(
                "unknown entity &{};",
                entity
            )))
        }
    };

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_literal_whitespace_but_keeps_character_references() {
        let decoded = decode_attribute_value("a &amp; b &#xA; c").unwrap();

        assert_eq!(decoded, "a & b \n c");
    }

    #[test]
    fn collapses_runs_of_mixed_whitespace() {
        let decoded = decode_attribute_value("a\r\n\tb").unwrap();

        assert_eq!(decoded, "a b");
    }
}
