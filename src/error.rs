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

use std::string::FromUtf8Error;

use openssl::error::ErrorStack as SslError;
use quick_xml::Error as XmlError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("XML error: {0}")]
    Xml(XmlError),

    #[error("malformed internal XML: {0}")]
    MalformedInternalXml(String),

    #[error("SSL error: {0}")]
    Ssl(SslError),

    #[error("certificate PEM is not valid UTF-8: {0}")]
    InvalidPem(FromUtf8Error),

    #[error("PKCS#12 bundle does not contain a usable private key and certificate chain")]
    InvalidKeyMaterial,
}

impl From<XmlError> for Error {
    fn from(err: XmlError) -> Self {
        Self::Xml(err)
    }
}

impl From<SslError> for Error {
    fn from(err: SslError) -> Self {
        Self::Ssl(err)
    }
}

impl From<FromUtf8Error> for Error {
    fn from(err: FromUtf8Error) -> Self {
        Self::InvalidPem(err)
    }
}
