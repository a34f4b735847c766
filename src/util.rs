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

/// Insert a newline after every 76 characters, the column width the
/// widget-digsig profile wraps all base64 bodies at (digests, signature
/// values, embedded certificates).
pub fn wrap76(s: &str) -> String {
    let bytes = s.as_bytes();

    bytes
        .chunks(76)
        .map(|chunk| std::str::from_utf8(chunk).expect("base64 alphabet is ASCII"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip the `-----BEGIN/END CERTIFICATE-----` boundary lines (and any
/// existing line breaks) from a PEM-encoded certificate, leaving the raw
/// base64 body as a single line.
pub fn strip_pem_boundaries(pem: &str) -> String {
    pem.lines()
        .filter(|line| !line.starts_with("-----"))
        .collect::<Vec<_>>()
        .concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_at_76_columns() {
        let body = "a".repeat(200);
        let wrapped = wrap76(&body);

        for line in wrapped.lines() {
            assert!(line.len() <= 76);
        }
        assert_eq!(wrapped.replace('\n', ""), body);
    }

    #[test]
    fn strips_pem_boundaries_and_newlines() {
        let pem = "-----BEGIN CERTIFICATE-----\nAAAA\nBBBB\n-----END CERTIFICATE-----\n";

        assert_eq!(strip_pem_boundaries(pem), "AAAABBBB");
    }
}
