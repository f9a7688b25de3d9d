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

use serde_json::Value;
use veil_error::{
    traits::{ErrorContext, ForeignBoxed},
    Error,
};

use crate::{
    error::{FormatError, SignatureError, VerifyError},
    models::into_object,
    traits::{Signer, Verifier},
    utils::{self, unix_now},
    JsonObject,
};

/// Options for JWT verification.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Current time in seconds since the epoch; wall clock when absent.
    pub current_time: Option<u64>,

    /// Allowed clock skew in seconds, applied symmetrically: it lowers the
    /// `iat`/`nbf` bounds and raises the `exp` bound.
    pub skew_seconds: u64,

    /// Claim keys (dotted paths) that must be present in the reconstructed
    /// claims; verification fails listing the missing ones.
    pub required_claim_keys: Vec<String>,

    /// When set, the presentation must carry a Key Binding JWT whose `nonce`
    /// equals this value.
    pub key_binding_nonce: Option<String>,
}

/// A JSON Web Token as a header/payload pair with an explicit signing state.
///
/// The state machine makes the encoded-cache rules explicit: a decoded token
/// remembers its original compact bytes, and signing or verifying always
/// operates on that byte-exact `<header>.<payload>` substring rather than a
/// re-serialization. Replacing the header or payload resets the token to the
/// unsigned state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jwt {
    header: JsonObject,
    payload: JsonObject,
    state: JwtState,
}

/// Signing state of a [`Jwt`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum JwtState {
    /// No signature; header and payload may still change.
    Unsigned,
    /// Signed locally; the compact form is derived on demand.
    Signed {
        /// base64url signature.
        signature: String,
    },
    /// Parsed from (or serialized to) a compact string, which is retained
    /// byte-exactly.
    Encoded {
        /// base64url signature.
        signature: String,
        /// The full compact serialization.
        compact: String,
    },
}

impl Jwt {
    /// Construct an unsigned JWT from its parts.
    pub fn new(header: JsonObject, payload: JsonObject) -> Self {
        Self {
            header,
            payload,
            state: JwtState::Unsigned,
        }
    }

    /// Parse a compact JWT string: exactly three dot-separated base64url
    /// segments, the first two holding JSON objects.
    ///
    /// The original string is retained so later signature checks cover the
    /// exact bytes that were signed.
    pub fn from_encode(compact: &str) -> veil_error::Result<Self, FormatError> {
        let parts: Vec<&str> = compact.split('.').collect();
        let [header, payload, signature] = parts.as_slice() else {
            return Err(Error::root(FormatError::NonParseableJwt)).ctx(|| compact.to_owned());
        };

        Ok(Self {
            header: decode_json_segment(header)?,
            payload: decode_json_segment(payload)?,
            state: JwtState::Encoded {
                signature: (*signature).to_owned(),
                compact: compact.to_owned(),
            },
        })
    }

    /// The JWT header.
    pub fn header(&self) -> &JsonObject {
        &self.header
    }

    /// The JWT payload.
    pub fn payload(&self) -> &JsonObject {
        &self.payload
    }

    /// The base64url signature, if the token is signed.
    pub fn signature(&self) -> Option<&str> {
        match &self.state {
            JwtState::Unsigned => None,
            JwtState::Signed { signature } | JwtState::Encoded { signature, .. } => {
                Some(signature)
            }
        }
    }

    /// Replace the header, discarding any signature and encoded form.
    pub fn set_header(&mut self, header: JsonObject) -> &mut Self {
        self.header = header;
        self.state = JwtState::Unsigned;
        self
    }

    /// Replace the payload, discarding any signature and encoded form.
    pub fn set_payload(&mut self, payload: JsonObject) -> &mut Self {
        self.payload = payload;
        self.state = JwtState::Unsigned;
        self
    }

    /// The JWS signing input: for decoded tokens the byte-exact
    /// `<header>.<payload>` substring of the original compact string,
    /// otherwise a fresh serialization of the parts.
    pub fn signing_input(&self) -> String {
        if let JwtState::Encoded { compact, .. } = &self.state {
            let end = compact.rfind('.').expect("compact form has three segments");
            return compact[..end].to_owned();
        }

        let header = utils::base64_url_encode(
            serde_json::to_string(&self.header).expect("serializing JSON objects cannot fail"),
        );
        let payload = utils::base64_url_encode(
            serde_json::to_string(&self.payload).expect("serializing JSON objects cannot fail"),
        );
        format!("{header}.{payload}")
    }

    /// Sign the token, moving it to the encoded state, and return the
    /// compact serialization.
    pub async fn sign(
        &mut self,
        signer: &dyn Signer,
    ) -> veil_error::Result<String, SignatureError> {
        let signing_input = self.signing_input();

        let signature = signer
            .sign(&signing_input)
            .await
            .foreign_boxed_err(|| SignatureError::SigningFailed)?;

        let compact = format!("{signing_input}.{signature}");
        self.state = JwtState::Encoded {
            signature,
            compact: compact.clone(),
        };

        Ok(compact)
    }

    /// The compact serialization of a signed token.
    pub fn encode(&self) -> veil_error::Result<String, FormatError> {
        match &self.state {
            JwtState::Unsigned => Err(Error::root(FormatError::UnsignedJwt)),
            JwtState::Signed { signature } => {
                Ok(format!("{}.{}", self.signing_input(), signature))
            }
            JwtState::Encoded { compact, .. } => Ok(compact.clone()),
        }
    }

    /// Verify time-based claims and the signature.
    ///
    /// Checks run in a fixed order: `iat`, `nbf` (both must not lie in the
    /// future beyond the allowed skew), `exp` (must not lie in the past
    /// beyond the skew), signature presence, and finally the signature via
    /// the [`Verifier`] capability over the byte-exact signing input.
    pub async fn verify(
        &self,
        verifier: &dyn Verifier,
        options: &VerifyOptions,
    ) -> veil_error::Result<(), crate::Error> {
        let now = options.current_time.unwrap_or_else(unix_now);
        let skew = options.skew_seconds;

        for not_before_claim in ["iat", "nbf"] {
            if let Some(moment) = time_claim(&self.payload, not_before_claim)? {
                if moment.saturating_sub(skew) > now {
                    return Err(Error::root(crate::Error::Verify(
                        VerifyError::JwtNotYetValid(now, moment),
                    )));
                }
            }
        }

        if let Some(exp) = time_claim(&self.payload, "exp")? {
            if exp.saturating_add(skew) < now {
                return Err(Error::root(crate::Error::Verify(VerifyError::JwtExpired(
                    now, exp,
                ))));
            }
        }

        let signature = match self.signature() {
            Some(signature) if !signature.is_empty() => signature,
            _ => {
                return Err(Error::root(crate::Error::Signature(
                    SignatureError::MissingSignature,
                )))
            }
        };

        let verified = verifier
            .verify(&self.signing_input(), signature)
            .await
            .foreign_boxed_err(|| crate::Error::Signature(SignatureError::InvalidJwtSignature))?;

        if !verified {
            return Err(Error::root(crate::Error::Signature(
                SignatureError::InvalidJwtSignature,
            )));
        }

        Ok(())
    }
}

fn decode_json_segment(segment: &str) -> veil_error::Result<JsonObject, FormatError> {
    let bytes = utils::base64_url_decode(segment)
        .map_err(|_| Error::root(FormatError::NonParseableJwt))?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|_| Error::root(FormatError::NonParseableJwt))?;
    match value {
        Value::Object(_) => Ok(into_object(value)),
        _ => Err(Error::root(FormatError::NonParseableJwt)),
    }
}

fn time_claim(
    payload: &JsonObject,
    name: &'static str,
) -> veil_error::Result<Option<u64>, crate::Error> {
    match payload.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            Error::root(crate::Error::Verify(VerifyError::MalformedTimeClaim(name)))
        }),
    }
}
