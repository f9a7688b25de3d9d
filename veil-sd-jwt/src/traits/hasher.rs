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

use std::{collections::HashSet, str::FromStr};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use veil_error::Error;

use super::BoxError;
use crate::error::DecodingError;

/// The hash algorithm written into `_sd_alg` when nothing else is
/// configured.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// An identifier of the algorithm used for hashing disclosures.
///
/// The string value is the "*Hash Name String*" from the IANA [Named
/// Information Hash Algorithm Registry], as carried in the `_sd_alg` claim.
/// Parsing distinguishes names that are registered but unsupported here from
/// names that are not registered at all.
///
/// [Named Information Hash Algorithm Registry]: https://www.iana.org/assignments/named-information/named-information.xhtml
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256.
    #[serde(rename = "sha-256")]
    #[default]
    Sha256,
    /// SHA-384.
    #[serde(rename = "sha-384")]
    Sha384,
    /// SHA-512.
    #[serde(rename = "sha-512")]
    Sha512,
}

pub(crate) const SHA_256_ALG_NAME: &str = "sha-256";
pub(crate) const SHA_384_ALG_NAME: &str = "sha-384";
pub(crate) const SHA_512_ALG_NAME: &str = "sha-512";

lazy_static::lazy_static! {
    /// Hash name strings registered with IANA; names outside this set are
    /// rejected as invalid rather than merely unsupported.
    static ref IANA_HASH_ALGORITHM_NAMES: HashSet<&'static str> = [
        "sha-256",
        "sha-256-128",
        "sha-256-120",
        "sha-256-96",
        "sha-256-64",
        "sha-256-32",
        "sha-384",
        "sha-512",
        "sha3-224",
        "sha3-256",
        "sha3-384",
        "sha3-512",
        "blake2s-256",
        "blake2b-256",
        "blake2b-512",
        "k12-256",
        "k12-512",
    ]
    .into_iter()
    .collect();
}

impl HashAlgorithm {
    /// The IANA hash name string of this algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => SHA_256_ALG_NAME,
            HashAlgorithm::Sha384 => SHA_384_ALG_NAME,
            HashAlgorithm::Sha512 => SHA_512_ALG_NAME,
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error<DecodingError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            SHA_256_ALG_NAME => Ok(Self::Sha256),
            SHA_384_ALG_NAME => Ok(Self::Sha384),
            SHA_512_ALG_NAME => Ok(Self::Sha512),
            other if IANA_HASH_ALGORITHM_NAMES.contains(other) => Err(Error::root(
                DecodingError::UnsupportedHashAlgorithm(other.to_owned()),
            )),
            other => Err(Error::root(DecodingError::InvalidHashAlgorithmName(
                other.to_owned(),
            ))),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The capability used for calculating hash digests.
///
/// An implementation must support every [`HashAlgorithm`] it is asked for,
/// or return an error; SHA-256 support is mandatory for interoperability.
pub trait Hasher: Send + Sync {
    /// Compute the digest of `input` under `alg`.
    fn digest<'a>(
        &'a self,
        input: &'a [u8],
        alg: HashAlgorithm,
    ) -> BoxFuture<'a, Result<Vec<u8>, BoxError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_algorithm_serializes_as_iana_name() {
        for (alg, name) in [
            (HashAlgorithm::Sha256, "sha-256"),
            (HashAlgorithm::Sha384, "sha-384"),
            (HashAlgorithm::Sha512, "sha-512"),
        ] {
            let expected = format!("\"{}\"", name);
            assert_eq!(serde_json::to_string(&alg).unwrap(), expected);

            let deserialized: HashAlgorithm = serde_json::from_str(&expected).unwrap();
            assert_eq!(deserialized, alg);

            assert_eq!(HashAlgorithm::from_str(name).unwrap(), alg);
            assert_eq!(alg.to_string(), name);
        }
    }

    #[test]
    fn registered_but_unsupported_name_is_distinguished() {
        let error = HashAlgorithm::from_str("sha3-512").unwrap_err();
        assert_eq!(
            error.error,
            DecodingError::UnsupportedHashAlgorithm("sha3-512".to_owned())
        );

        let error = HashAlgorithm::from_str("md5").unwrap_err();
        assert_eq!(
            error.error,
            DecodingError::InvalidHashAlgorithmName("md5".to_owned())
        );
    }
}
