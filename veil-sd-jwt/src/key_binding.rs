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

use serde::{Deserialize, Serialize};
use veil_error::{
    traits::{ForeignBoxed, PropagateError},
    Error,
};

use crate::{
    error::{FormatError, KeyBindingError},
    json_object,
    jwt::Jwt,
    models::into_object,
    traits::{KbVerifier, Signer},
    JsonObject,
};

/// The required value of the Key Binding JWT header `typ` element, as
/// specified [here].
///
/// [here]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#section-4.3
pub const KB_JWT_TYP: &str = "kb+jwt";

/// Claims of the Key Binding JWT.
///
/// `sd_hash` is the digest of the presentation the KB-JWT is bound to,
/// computed over the compact serialization without the KB-JWT segment, using
/// the hash algorithm of the presented SD-JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbJwtClaims {
    /// The time at which the Key Binding JWT was issued.
    pub iat: u64,

    /// The intended receiver of the Key Binding JWT.
    pub aud: String,

    /// A verifier-chosen value ensuring the freshness of the signature.
    pub nonce: String,

    /// base64url digest over the presentation, binding this proof to it.
    pub sd_hash: String,
}

/// A Key Binding JWT: a holder-signed proof of possession bound to one
/// presentation via `sd_hash` and to one exchange via `nonce`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KbJwt {
    jwt: Jwt,
}

impl KbJwt {
    /// Build and sign a new Key Binding JWT with the fixed `kb+jwt` header
    /// type and the given signing algorithm name.
    pub async fn sign_new(
        claims: KbJwtClaims,
        alg: &str,
        signer: &dyn Signer,
    ) -> veil_error::Result<Self, KeyBindingError> {
        let header = json_object!({
            "typ": KB_JWT_TYP,
            "alg": alg,
        });
        let payload = into_object(
            serde_json::to_value(&claims).expect("serializing KB-JWT claims cannot fail"),
        );

        let mut jwt = Jwt::new(header, payload);
        jwt.sign(signer)
            .await
            .with_err(|| KeyBindingError::KbSigningFailed)?;

        Ok(Self { jwt })
    }

    /// Parse a compact Key Binding JWT.
    pub fn from_encode(compact: &str) -> veil_error::Result<Self, FormatError> {
        Ok(Self {
            jwt: Jwt::from_encode(compact)?,
        })
    }

    /// The compact serialization.
    pub fn encode(&self) -> veil_error::Result<String, FormatError> {
        self.jwt.encode()
    }

    /// The KB-JWT header.
    pub fn header(&self) -> &JsonObject {
        self.jwt.header()
    }

    /// The KB-JWT payload.
    pub fn payload(&self) -> &JsonObject {
        self.jwt.payload()
    }

    /// The `sd_hash` claim, if present and a string.
    pub fn sd_hash(&self) -> Option<&str> {
        self.jwt.payload().get("sd_hash").and_then(|v| v.as_str())
    }

    /// Verify this Key Binding JWT against the verifier's challenge.
    ///
    /// Checks, in order: the `typ` header is `kb+jwt`; the signature via the
    /// [`KbVerifier`] capability, which receives the reconstructed payload
    /// of the presented SD-JWT so it can resolve the holder's public key
    /// from the `cnf` claim; and the `nonce` claim, which must equal
    /// `expected_nonce` exactly.
    ///
    /// Matching `sd_hash` against the actual presentation is the caller's
    /// responsibility, as only the caller knows the presented serialization.
    pub async fn verify_kb(
        &self,
        verifier: &dyn KbVerifier,
        holder_payload: &JsonObject,
        expected_nonce: &str,
    ) -> veil_error::Result<(), KeyBindingError> {
        let typ = self.jwt.header().get("typ").and_then(|v| v.as_str());
        if typ != Some(KB_JWT_TYP) {
            return Err(Error::root(KeyBindingError::InvalidKbJwtTyp(
                typ.unwrap_or("<missing>").to_owned(),
            )));
        }

        let signature = match self.jwt.signature() {
            Some(signature) if !signature.is_empty() => signature,
            _ => return Err(Error::root(KeyBindingError::InvalidKbJwtSignature)),
        };

        let verified = verifier
            .verify(&self.jwt.signing_input(), signature, holder_payload)
            .await
            .foreign_boxed_err(|| KeyBindingError::InvalidKbJwtSignature)?;
        if !verified {
            return Err(Error::root(KeyBindingError::InvalidKbJwtSignature));
        }

        let nonce = self.jwt.payload().get("nonce").and_then(|v| v.as_str());
        if nonce != Some(expected_nonce) {
            return Err(Error::root(KeyBindingError::InvalidKbJwtNonce(
                nonce.unwrap_or("<missing>").to_owned(),
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{holder_cnf_payload, StubKbVerifier, StubSigner};

    fn test_claims() -> KbJwtClaims {
        KbJwtClaims {
            iat: 1700000000,
            aud: "https://verifier.example.org".to_owned(),
            nonce: "nonce-1234".to_owned(),
            sd_hash: "fake-sd-hash".to_owned(),
        }
    }

    #[tokio::test]
    async fn sign_new_sets_the_fixed_typ() {
        let kb_jwt = KbJwt::sign_new(test_claims(), "ES256", &StubSigner::holder())
            .await
            .unwrap();

        assert_eq!(kb_jwt.header()["typ"], KB_JWT_TYP);
        assert_eq!(kb_jwt.header()["alg"], "ES256");
        assert_eq!(kb_jwt.payload()["nonce"], "nonce-1234");
        assert_eq!(kb_jwt.sd_hash(), Some("fake-sd-hash"));
    }

    #[tokio::test]
    async fn verify_kb_accepts_matching_nonce() {
        let kb_jwt = KbJwt::sign_new(test_claims(), "ES256", &StubSigner::holder())
            .await
            .unwrap();

        kb_jwt
            .verify_kb(&StubKbVerifier, &holder_cnf_payload(), "nonce-1234")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn verify_kb_round_trips_through_compact() {
        let kb_jwt = KbJwt::sign_new(test_claims(), "ES256", &StubSigner::holder())
            .await
            .unwrap();

        let parsed = KbJwt::from_encode(&kb_jwt.encode().unwrap()).unwrap();

        parsed
            .verify_kb(&StubKbVerifier, &holder_cnf_payload(), "nonce-1234")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn verify_kb_rejects_wrong_nonce() {
        let kb_jwt = KbJwt::sign_new(test_claims(), "ES256", &StubSigner::holder())
            .await
            .unwrap();

        let error = kb_jwt
            .verify_kb(&StubKbVerifier, &holder_cnf_payload(), "other-nonce")
            .await
            .unwrap_err();

        assert_eq!(
            error.error,
            KeyBindingError::InvalidKbJwtNonce("nonce-1234".to_owned())
        );
    }

    #[tokio::test]
    async fn verify_kb_rejects_wrong_typ() {
        let mut jwt = Jwt::new(
            json_object!({ "typ": "JWT", "alg": "ES256" }),
            json_object!({ "nonce": "nonce-1234" }),
        );
        jwt.sign(&StubSigner::holder()).await.unwrap();
        let kb_jwt = KbJwt::from_encode(&jwt.encode().unwrap()).unwrap();

        let error = kb_jwt
            .verify_kb(&StubKbVerifier, &holder_cnf_payload(), "nonce-1234")
            .await
            .unwrap_err();

        assert_eq!(
            error.error,
            KeyBindingError::InvalidKbJwtTyp("JWT".to_owned())
        );
    }

    /// The KB verifier resolves the holder key from the outer payload's
    /// `cnf` claim; a payload bound to a different key must fail.
    #[tokio::test]
    async fn verify_kb_rejects_foreign_key() {
        let kb_jwt = KbJwt::sign_new(test_claims(), "ES256", &StubSigner::issuer())
            .await
            .unwrap();

        let error = kb_jwt
            .verify_kb(&StubKbVerifier, &holder_cnf_payload(), "nonce-1234")
            .await
            .unwrap_err();

        assert_eq!(error.error, KeyBindingError::InvalidKbJwtSignature);
    }
}
