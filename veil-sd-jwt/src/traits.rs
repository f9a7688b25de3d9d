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

//! Capability seams consumed by the SD-JWT core.
//!
//! Hashing, signing, signature verification and salt generation are external
//! collaborators: the core never implements asymmetric cryptography itself.
//! All capabilities are asynchronous -- an implementation may suspend the
//! calling task (e.g. to reach an HSM) but must not block other tasks --
//! and object safe, so a configuration can hold them as trait objects.

use futures::future::BoxFuture;

use crate::JsonObject;

mod hasher;
mod r#impl;

pub use hasher::{HashAlgorithm, Hasher, DEFAULT_HASH_ALGORITHM};
pub use r#impl::{RngSaltGenerator, Sha2Hasher, DEFAULT_SALT_LENGTH};

/// Type alias for a boxed error returned by capability implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An external signing backend producing JWS signatures.
///
/// The input is a complete JWS signing input (`<b64 header>.<b64 payload>`);
/// the output must be the base64url-encoded signature, without padding.
pub trait Signer: Send + Sync {
    /// Sign the given signing input.
    fn sign<'a>(&'a self, signing_input: &'a str) -> BoxFuture<'a, Result<String, BoxError>>;
}

/// An external backend verifying JWS signatures.
pub trait Verifier: Send + Sync {
    /// Check `signature` (base64url) over `signing_input`.
    ///
    /// Returns `Ok(true)` if the signature is valid, `Ok(false)` if it is
    /// not, and `Err(_)` only when the verifier itself fails.
    fn verify<'a>(
        &'a self,
        signing_input: &'a str,
        signature: &'a str,
    ) -> BoxFuture<'a, Result<bool, BoxError>>;
}

/// An external backend verifying Key Binding JWT signatures.
///
/// Unlike [`Verifier`], the callback also receives the reconstructed payload
/// of the presented SD-JWT, so implementations can resolve the holder's
/// public key from its `cnf` claim.
pub trait KbVerifier: Send + Sync {
    /// Check `signature` (base64url) over `signing_input`, resolving the
    /// holder key from `holder_payload`.
    fn verify<'a>(
        &'a self,
        signing_input: &'a str,
        signature: &'a str,
        holder_payload: &'a JsonObject,
    ) -> BoxFuture<'a, Result<bool, BoxError>>;
}

/// A source of disclosure salts.
///
/// Salts **MUST** be highly unpredictable; a disclosure's value is only as
/// concealed as its salt is unguessable. The `length` parameter is the
/// number of random bytes to draw before encoding.
pub trait SaltGenerator: Send + Sync {
    /// Produce a fresh salt of `length` random bytes, base64url-encoded.
    fn generate(&self, length: usize) -> BoxFuture<'_, Result<String, BoxError>>;
}
