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

//! Symbolic crypto stubs for tests.
//!
//! A "signature" is a deterministic function of the key id and the exact
//! signing input. Bulky, but it tests the important thing: over which bytes
//! and under which key a signature was produced, independent of any real
//! signature algorithm.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::{ready, BoxFuture};

use crate::{
    json_object,
    traits::{BoxError, KbVerifier, SaltGenerator, Signer, Verifier},
    utils, JsonObject,
};

fn symbolic_signature(key_id: &str, signing_input: &str) -> String {
    utils::base64_url_encode(format!("signed:{key_id}:{signing_input}"))
}

pub(crate) struct StubSigner {
    key_id: String,
}

impl StubSigner {
    pub(crate) fn new(key_id: &str) -> Self {
        Self {
            key_id: key_id.to_owned(),
        }
    }

    pub(crate) fn issuer() -> Self {
        Self::new("issuer-key")
    }

    pub(crate) fn holder() -> Self {
        Self::new("holder-key")
    }
}

impl Signer for StubSigner {
    fn sign<'a>(&'a self, signing_input: &'a str) -> BoxFuture<'a, Result<String, BoxError>> {
        Box::pin(ready(Ok(symbolic_signature(&self.key_id, signing_input))))
    }
}

pub(crate) struct StubVerifier {
    key_id: String,
}

impl StubVerifier {
    pub(crate) fn new(key_id: &str) -> Self {
        Self {
            key_id: key_id.to_owned(),
        }
    }

    pub(crate) fn issuer() -> Self {
        Self::new("issuer-key")
    }

    pub(crate) fn holder() -> Self {
        Self::new("holder-key")
    }
}

impl Verifier for StubVerifier {
    fn verify<'a>(
        &'a self,
        signing_input: &'a str,
        signature: &'a str,
    ) -> BoxFuture<'a, Result<bool, BoxError>> {
        let valid = signature == symbolic_signature(&self.key_id, signing_input);
        Box::pin(ready(Ok(valid)))
    }
}

/// Resolves the holder key id from the `cnf.jwk.kid` claim of the presented
/// payload, the way a real key binding verifier resolves `cnf.jwk`.
pub(crate) struct StubKbVerifier;

impl KbVerifier for StubKbVerifier {
    fn verify<'a>(
        &'a self,
        signing_input: &'a str,
        signature: &'a str,
        holder_payload: &'a JsonObject,
    ) -> BoxFuture<'a, Result<bool, BoxError>> {
        let key_id = holder_payload
            .get("cnf")
            .and_then(|cnf| cnf.get("jwk"))
            .and_then(|jwk| jwk.get("kid"))
            .and_then(|kid| kid.as_str());

        let valid = match key_id {
            Some(key_id) => signature == symbolic_signature(key_id, signing_input),
            None => false,
        };
        Box::pin(ready(Ok(valid)))
    }
}

/// A payload whose `cnf` claim binds the stub holder key.
pub(crate) fn holder_cnf_payload() -> JsonObject {
    json_object!({
        "cnf": {
            "jwk": {
                "kty": "EC",
                "crv": "P-256",
                "kid": "holder-key",
            },
        },
    })
}

/// Deterministic salt source: `salt-0`, `salt-1`, ...
pub(crate) struct CountingSaltGenerator(AtomicUsize);

pub(crate) fn sequential_salts() -> CountingSaltGenerator {
    CountingSaltGenerator(AtomicUsize::new(0))
}

impl SaltGenerator for CountingSaltGenerator {
    fn generate(&self, _length: usize) -> BoxFuture<'_, Result<String, BoxError>> {
        let counter = self.0.fetch_add(1, Ordering::Relaxed);
        Box::pin(ready(Ok(format!("salt-{counter}"))))
    }
}

/// Always returns the same salt, for pinning digests to known vectors.
pub(crate) struct StaticSaltGenerator(String);

impl StaticSaltGenerator {
    pub(crate) fn new(salt: &str) -> Self {
        Self(salt.to_owned())
    }
}

impl SaltGenerator for StaticSaltGenerator {
    fn generate(&self, _length: usize) -> BoxFuture<'_, Result<String, BoxError>> {
        Box::pin(ready(Ok(self.0.clone())))
    }
}
