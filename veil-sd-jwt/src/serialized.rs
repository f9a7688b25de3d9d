// Copyright (C) 2024-2026  The Veil Project.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! JWS JSON serializations of SD-JWTs.
//!
//! Both envelopes carry the same base64url segments as the compact form,
//! restructured: the flattened form holds one signature, the general form
//! any number of signatures over one payload. Disclosures and the Key
//! Binding JWT travel in the (first) unprotected header.

mod flatten;
mod general;

pub use flatten::{FlattenJson, FlattenJsonHeader};
pub use general::{GeneralJson, GeneralJsonSignature};

/// Split a compact SD-JWT into its JWT, disclosure tokens and optional
/// Key Binding JWT segment, without decoding anything.
pub(crate) fn split_compact(
    encoded: &str,
) -> veil_error::Result<(&str, Vec<String>, Option<String>), crate::error::FormatError> {
    let parts: Vec<&str> = encoded.split(crate::SD_SEPARATOR).collect();
    if parts.len() < 2 {
        return Err(veil_error::Error::root(
            crate::error::FormatError::InvalidSdJwtFormat,
        ));
    }

    let jwt = parts[0];
    let kb_segment = parts[parts.len() - 1];
    let kb_jwt = (!kb_segment.is_empty()).then(|| kb_segment.to_owned());
    let disclosures = parts[1..parts.len() - 1]
        .iter()
        .map(|token| (*token).to_owned())
        .collect();

    Ok((jwt, disclosures, kb_jwt))
}

/// Split a compact JWT into its three base64url segments.
pub(crate) fn split_jwt(
    jwt: &str,
) -> veil_error::Result<(&str, &str, &str), crate::error::FormatError> {
    let parts: Vec<&str> = jwt.split('.').collect();
    let [protected, payload, signature] = parts.as_slice() else {
        return Err(veil_error::Error::root(
            crate::error::FormatError::NonParseableJwt,
        ));
    };
    Ok((*protected, *payload, *signature))
}
