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

use std::sync::Mutex;

use futures::future::{ready, BoxFuture};
use rand_core::{CryptoRngCore, OsRng};

use super::{BoxError, HashAlgorithm, Hasher, SaltGenerator};
use crate::utils;

/// A [`Hasher`] implementation for the SHA-2 family.
#[derive(Debug, Default, Copy, Clone)]
pub struct Sha2Hasher;

impl Hasher for Sha2Hasher {
    fn digest<'a>(
        &'a self,
        input: &'a [u8],
        alg: HashAlgorithm,
    ) -> BoxFuture<'a, Result<Vec<u8>, BoxError>> {
        let digest = match alg {
            HashAlgorithm::Sha256 => openssl::sha::sha256(input).to_vec(),
            HashAlgorithm::Sha384 => openssl::sha::sha384(input).to_vec(),
            HashAlgorithm::Sha512 => openssl::sha::sha512(input).to_vec(),
        };
        Box::pin(ready(Ok(digest)))
    }
}

/// Number of random bytes in a salt, 128 bits.
///
/// See draft sections [11.3] and [11.4] on salt entropy and length.
///
/// [11.3]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-entropy-of-the-salt
/// [11.4]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-minimum-length-of-the-salt
pub const DEFAULT_SALT_LENGTH: usize = 16;

/// A [`SaltGenerator`] drawing bytes from a [`CryptoRngCore`].
///
/// [`RngSaltGenerator::default`] uses the operating system RNG; tests may
/// wrap a seeded generator instead.
pub struct RngSaltGenerator<R>(Mutex<R>);

impl<R> RngSaltGenerator<R> {
    /// Wrap the given random number generator.
    pub fn new(rng: R) -> Self {
        Self(Mutex::new(rng))
    }
}

impl Default for RngSaltGenerator<OsRng> {
    fn default() -> Self {
        Self::new(OsRng)
    }
}

impl<R: CryptoRngCore + Send> SaltGenerator for RngSaltGenerator<R> {
    fn generate(&self, length: usize) -> BoxFuture<'_, Result<String, BoxError>> {
        let result = (|| {
            let mut bytes = vec![0u8; length];
            let mut rng = self
                .0
                .lock()
                .map_err(|_| -> BoxError { "salt generator mutex poisoned".into() })?;
            rng.try_fill_bytes(&mut bytes)
                .map_err(|error| -> BoxError { Box::new(error) })?;
            Ok(utils::base64_url_encode(bytes))
        })();
        Box::pin(ready(result))
    }
}
