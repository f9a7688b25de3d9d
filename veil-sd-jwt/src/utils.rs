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

use std::fmt::{self, Display};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::Value;

use crate::{
    traits::{BoxError, HashAlgorithm, Hasher},
    JsonObject, RESERVED_CLAIM_NAMES,
};

/// Returns the `base64url`-encoded string of the given `input`, without
/// padding.
pub fn base64_url_encode<T: AsRef<[u8]>>(input: T) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Decodes the given `base64url`-encoded string **without padding** into
/// bytes.
pub fn base64_url_decode<T: AsRef<[u8]>>(input: T) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(input)
}

/// Returns the `base64url`-encoded digest of `input` under the given
/// algorithm.
pub(crate) async fn base64_url_digest(
    input: &[u8],
    hasher: &dyn Hasher,
    alg: HashAlgorithm,
) -> Result<String, BoxError> {
    let digest = hasher.digest(input, alg).await?;
    Ok(base64_url_encode(digest))
}

/// Wall-clock seconds since the Unix epoch.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Render a claim path as the dotted form used in key listings and
/// presentation frames, e.g. `address.street_address` or `nationalities.0`.
pub(crate) fn dotted(path: &[String]) -> String {
    path.join(".")
}

/// Extend a dotted path prefix with one more segment.
pub(crate) fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_owned()
    } else {
        format!("{prefix}.{segment}")
    }
}

/// Navigate a mutable claim tree along raw path segments.
///
/// Each segment is interpreted against the container it lands in: a key for
/// objects, a decimal index for arrays.
pub(crate) fn locate_mut<'a>(object: &'a mut JsonObject, path: &[String]) -> Option<&'a mut Value> {
    let (head, tail) = path.split_first()?;
    let mut value = object.get_mut(head)?;
    for segment in tail {
        match value {
            Value::Object(object) => value = object.get_mut(segment)?,
            Value::Array(array) => {
                let index: usize = segment.parse().ok()?;
                value = array.get_mut(index)?;
            }
            _ => return None,
        }
    }
    Some(value)
}

/// Checks whether `key` is one of the [`RESERVED_CLAIM_NAMES`].
pub(crate) fn is_reserved_key_name(key: &str) -> Option<&'static str> {
    RESERVED_CLAIM_NAMES
        .iter()
        .find(|&name| key.eq(*name))
        .copied()
}

/// Finds the first reserved claim name used anywhere in `object`, if any.
///
/// The payload must not contain reserved claims except where the packer
/// itself writes them.
pub(crate) fn find_reserved_claim_name(object: &JsonObject) -> Option<&'static str> {
    for (claim_name, claim_value) in object {
        if let Some(name) = is_reserved_key_name(claim_name) {
            return Some(name);
        }
        if let Some(name) = find_reserved_claim_name_in_value(claim_value) {
            return Some(name);
        }
    }
    None
}

fn find_reserved_claim_name_in_value(value: &Value) -> Option<&'static str> {
    match value {
        Value::Object(object) => find_reserved_claim_name(object),
        Value::Array(array) => array.iter().find_map(find_reserved_claim_name_in_value),
        _ => None,
    }
}

/// Wrapper rendering a list as a comma-separated string, for error messages.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct VecDisplayWrapper<T>(
    /// The wrapped elements.
    pub Vec<T>,
);

impl<T: Display> Display for VecDisplayWrapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((last, without_last)) = self.0.split_last() {
            for element in without_last {
                write!(f, "{}, ", element)?;
            }
            write!(f, "{}", last)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::json_object;

    #[test]
    fn base64_url_round_trip() {
        let input = b"some bytes \xff\x00";
        let encoded = base64_url_encode(input);
        assert!(!encoded.contains('='));
        assert_eq!(base64_url_decode(&encoded).unwrap(), input);
    }

    #[test]
    fn locate_mut_interprets_segments_by_container() {
        let mut object = json_object!({
            "a": { "b": [ "x", { "c": 1 } ] },
        });

        let path = ["a", "b", "1", "c"].map(str::to_owned);
        assert_eq!(locate_mut(&mut object, &path), Some(&mut json!(1)));

        let missing = ["a", "b", "5"].map(str::to_owned);
        assert_eq!(locate_mut(&mut object, &missing), None);

        let non_index = ["a", "b", "c"].map(str::to_owned);
        assert_eq!(locate_mut(&mut object, &non_index), None);
    }

    #[test]
    fn reserved_names_are_found_recursively() {
        let object = json_object!({
            "fine": { "deep": [ { "_sd": [] } ] },
        });
        assert_eq!(find_reserved_claim_name(&object), Some("_sd"));

        let object = json_object!({
            "fine": { "deep": [ "..." ] },
        });
        assert_eq!(find_reserved_claim_name(&object), None);
    }

    #[test]
    fn vec_display_wrapper_joins_with_commas() {
        assert_eq!(VecDisplayWrapper::<String>(vec![]).to_string(), "");
        assert_eq!(
            VecDisplayWrapper(vec!["a", "b", "c"]).to_string(),
            "a, b, c"
        );
    }
}
