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

use core::fmt;

use serde_json::Value;
use veil_error::{
    traits::{ErrorContext, ForeignBoxed, ForeignError},
    Error,
};

use crate::{
    error::{DecodingError, FormatError},
    traits::{BoxError, HashAlgorithm, Hasher},
    utils,
};

/// Base64url encoded disclosure hash salt.
pub type Salt = String;

/// Base64url encoded hash value.
pub type Digest = String;

/// One concealed claim, in both parsed form and the original serialized form.
///
/// The serialized form is the base64url encoding of the JSON array
/// `[salt, key, value]` (object property) or `[salt, value]` (array element).
/// Digests are always computed over the stored serialized form, so a
/// disclosure decoded from a third party reproduces its digest byte-exactly
/// regardless of how that party formatted the JSON.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Disclosure {
    pub(crate) data: DisclosureData,
    // serialized-as-hashed
    serialized: String,
}

/// Parsed form of a disclosure.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum DisclosureData {
    /// A concealed object property.
    KeyValue {
        /// Disclosure hash salt.
        salt: Salt,
        /// Claim name of the concealed property.
        key: String,
        /// Claim value of the concealed property.
        value: Value,
    },
    /// A concealed array element.
    ArrayElement {
        /// Disclosure hash salt.
        salt: Salt,
        /// Value of the concealed element.
        value: Value,
    },
}

impl Disclosure {
    /// Construct a new [`Disclosure`] from the given `salt`, optional
    /// `claim_name` and `claim_value`.
    ///
    /// A disclosure without a claim name conceals an array element.
    pub fn new(salt: Salt, claim_name: Option<String>, claim_value: Value) -> Self {
        // Tuples serialize as JSON arrays; serializing references avoids
        // cloning the value into a temporary array.
        let rendered = match &claim_name {
            Some(name) => serde_json::to_string(&(&salt, name, &claim_value)),
            None => serde_json::to_string(&(&salt, &claim_value)),
        }
        .expect("serializing JSON values cannot fail");

        let serialized = utils::base64_url_encode(rendered);

        let data = match claim_name {
            Some(key) => DisclosureData::KeyValue {
                salt,
                key,
                value: claim_value,
            },
            None => DisclosureData::ArrayElement {
                salt,
                value: claim_value,
            },
        };

        Self { data, serialized }
    }

    /// The concealed claim value.
    pub fn value(&self) -> &Value {
        match &self.data {
            DisclosureData::KeyValue { value, .. } => value,
            DisclosureData::ArrayElement { value, .. } => value,
        }
    }

    /// The concealed claim name, for object-property disclosures.
    pub fn claim_name(&self) -> Option<&str> {
        match &self.data {
            DisclosureData::KeyValue { key, .. } => Some(key),
            DisclosureData::ArrayElement { .. } => None,
        }
    }

    /// The salt of this disclosure.
    pub fn salt(&self) -> &str {
        match &self.data {
            DisclosureData::KeyValue { salt, .. } => salt,
            DisclosureData::ArrayElement { salt, .. } => salt,
        }
    }

    /// Serialized form of [`Self`], as carried in the compact serialization.
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    /// Serialize [`Self`] into an owned [`String`].
    pub fn into_string(self) -> String {
        self.serialized
    }

    /// Compute the digest of this disclosure using the given hasher and
    /// algorithm, over the exact serialized form.
    pub async fn digest(
        &self,
        hasher: &dyn Hasher,
        alg: HashAlgorithm,
    ) -> Result<Digest, BoxError> {
        utils::base64_url_digest(self.serialized.as_bytes(), hasher, alg).await
    }
}

impl TryFrom<String> for Disclosure {
    type Error = Error<FormatError>;

    fn try_from(serialized: String) -> Result<Self, Self::Error> {
        let decoded = utils::base64_url_decode(&serialized)
            .foreign_err(|| {
                FormatError::InvalidDisclosure("token is not base64url".to_string())
            })
            .ctx(|| serialized.clone())?;

        let array: Vec<Value> = serde_json::from_slice(&decoded)
            .foreign_err(|| {
                FormatError::InvalidDisclosure("token does not decode to a JSON array".to_string())
            })
            .ctx(|| serialized.clone())?;

        let data = match array.len() {
            3 => {
                let [salt, key, value] = array.try_into().expect("length checked");
                disclosure_data_key_value(salt, key, value)
            }
            2 => {
                let [salt, value] = array.try_into().expect("length checked");
                disclosure_data_array_element(salt, value)
            }
            other => Err(Error::root(FormatError::InvalidDisclosure(format!(
                "disclosure array has invalid length {}",
                other,
            )))),
        }
        .ctx(|| serialized.clone())?;

        Ok(Self { data, serialized })
    }
}

impl TryFrom<&str> for Disclosure {
    type Error = Error<FormatError>;

    fn try_from(serialized: &str) -> Result<Self, Self::Error> {
        Self::try_from(serialized.to_owned())
    }
}

fn disclosure_data_key_value(
    salt: Value,
    key: Value,
    value: Value,
) -> veil_error::Result<DisclosureData, FormatError> {
    let Value::String(salt) = salt else {
        return Err(Error::root(FormatError::InvalidDisclosure(
            "salt is not a string".to_string(),
        )));
    };
    let Value::String(key) = key else {
        return Err(Error::root(FormatError::InvalidDisclosure(
            "key is not a string".to_string(),
        )));
    };

    Ok(DisclosureData::KeyValue { salt, key, value })
}

fn disclosure_data_array_element(
    salt: Value,
    value: Value,
) -> veil_error::Result<DisclosureData, FormatError> {
    let Value::String(salt) = salt else {
        return Err(Error::root(FormatError::InvalidDisclosure(
            "salt is not a string".to_string(),
        )));
    };

    Ok(DisclosureData::ArrayElement { salt, value })
}

impl fmt::Display for Disclosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            DisclosureData::KeyValue { salt, key, value } => {
                write!(f, "[{}, {}, {}]", salt, key, value)
            }
            DisclosureData::ArrayElement { salt, value } => write!(f, "[{}, {}]", salt, value),
        }
    }
}

/// Table of all provided disclosures, indexed by digest.
///
/// Construction precomputes every digest so the decoder can resolve hash
/// pointers with plain string lookups afterwards.
#[derive(Debug)]
pub(crate) struct DisclosureByDigestTable(pub(crate) std::collections::HashMap<Digest, usize>);

impl DisclosureByDigestTable {
    pub(crate) async fn new(
        disclosures: &[Disclosure],
        hasher: &dyn Hasher,
        alg: HashAlgorithm,
    ) -> veil_error::Result<Self, DecodingError> {
        let mut by_digest = std::collections::HashMap::new();
        for (index, disclosure) in disclosures.iter().enumerate() {
            let digest = disclosure
                .digest(hasher, alg)
                .await
                .foreign_boxed_err(|| DecodingError::HashingFailed)?;
            if by_digest.insert(digest, index).is_some() {
                return Err(Error::root(DecodingError::DisclosureDigestCollision));
            }
        }
        Ok(Self(by_digest))
    }
}
