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

pub use serde_json::{Map, Value};

mod disclosure;
mod frame;

pub use disclosure::*;
pub use frame::*;

/// A JSON object, i.e. a mapping from [`String`] to [`Value`].
pub type JsonObject = Map<String, Value>;

/// Panics if the argument is not a JSON object.
#[inline(always)]
pub(crate) fn into_object(value: Value) -> JsonObject {
    if let Value::Object(object) = value {
        object
    } else {
        panic!("Argument wasn't an object")
    }
}

/// Helper macro with the same syntax as [`serde_json::json`] specialized for
/// constructing JSON objects.
///
/// It will construct a more specific type ([`serde_json::Map<String,Value>`])
/// than just [`serde_json::Value`] when constructing an object, and panic if
/// the syntax is valid JSON but not an object.
#[macro_export]
macro_rules! json_object {
    ($stuff:tt) => {
        match ::serde_json::json!($stuff) {
            ::serde_json::Value::Object(o) => o,
            _ => unreachable!("JSON literal wasn't an object"),
        }
    };
}

/// The claim name holding the digests of concealed object properties.
pub const SD_DIGEST: &str = "_sd";

/// The single key of an array-element digest wrapper object.
pub const SD_LIST_KEY: &str = "...";

/// The top-level claim naming the hash algorithm used for the digests.
pub const SD_ALG: &str = "_sd_alg";

/// The disclosure-frame keyword requesting decoy digests at a level.
pub const SD_DECOY: &str = "_sd_decoy";

/// Separator between the JWT, the disclosures and the key binding JWT in the
/// compact serialization.
pub const SD_SEPARATOR: char = '~';

/// Claim names with SD-JWT format semantics; they must not appear as ordinary
/// claims, neither in an issued payload nor inside disclosed values.
pub static RESERVED_CLAIM_NAMES: &[&str] = &[SD_DIGEST, SD_LIST_KEY, SD_ALG];
