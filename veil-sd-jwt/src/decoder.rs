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

use std::{
    collections::{HashMap, HashSet},
    str::FromStr,
};

use serde_json::Value;
use veil_error::Error;

use crate::{
    error::DecodingError,
    models::{Disclosure, DisclosureByDigestTable, DisclosureData, PresentationFrame},
    traits::{HashAlgorithm, Hasher, DEFAULT_HASH_ALGORITHM},
    utils::{is_reserved_key_name, join_path, VecDisplayWrapper},
    JsonObject, SD_ALG, SD_DIGEST, SD_LIST_KEY,
};

type Result<T> = veil_error::Result<T, DecodingError>;

/// Map from the dotted path of a reconstructed claim to the index of the
/// disclosure that conceals it. Only claims behind a disclosure appear.
pub(crate) type DisclosureKeymap = HashMap<String, usize>;

/// Reconstruct the full claim set from a packed payload and its disclosures,
/// following the verification procedure of the [draft].
///
/// Digests without a matching disclosure stay concealed: object properties
/// are simply absent, array-element sentinels are removed and the array
/// compacted. Every *provided* disclosure must match a digest somewhere,
/// though -- a dangling disclosure is rejected, which blocks smuggling extra
/// claims into a presentation.
///
/// The hash algorithm is taken from the payload's `_sd_alg` claim,
/// defaulting to `sha-256`.
///
/// [draft]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#section-7.1
pub async fn unpack(
    packed: &JsonObject,
    disclosures: &[Disclosure],
    hasher: &dyn Hasher,
) -> Result<JsonObject> {
    let (claims, _keymap) = decode_disclosed_claims(packed, disclosures, hasher).await?;
    Ok(claims)
}

/// As [`unpack`], but also returns the disclosure keymap used for building
/// presentations.
pub(crate) async fn decode_disclosed_claims(
    packed: &JsonObject,
    disclosures: &[Disclosure],
    hasher: &dyn Hasher,
) -> Result<(JsonObject, DisclosureKeymap)> {
    let alg = fetch_hash_algorithm(packed)?;

    let table = DisclosureByDigestTable::new(disclosures, hasher, alg).await?;
    let mut state = DecoderState {
        disclosures,
        by_digest: table.0,
        seen_digests: HashSet::new(),
    };

    let mut keymap = DisclosureKeymap::new();
    let claims = decode_object(packed, &mut state, true, "", &mut keymap)?;

    state.finalize()?;

    Ok((claims, keymap))
}

struct DecoderState<'d> {
    disclosures: &'d [Disclosure],

    /// Digests of the not-yet-used disclosures; entries are removed as hash
    /// pointers resolve, so whatever remains at the end is dangling.
    by_digest: HashMap<String, usize>,

    /// Every digest encountered in the payload or in disclosed values, to
    /// reject duplicates.
    seen_digests: HashSet<String>,
}

impl DecoderState<'_> {
    fn finalize(self) -> Result<()> {
        if !self.by_digest.is_empty() {
            let mut unused: Vec<String> = self.by_digest.into_keys().collect();
            unused.sort();
            return Err(Error::root(DecodingError::UnusedDisclosures(
                VecDisplayWrapper(unused),
            )));
        }

        Ok(())
    }
}

/// Identify the hash algorithm from the `_sd_alg` claim.
pub(crate) fn fetch_hash_algorithm(claims: &JsonObject) -> Result<HashAlgorithm> {
    let Some(value) = claims.get(SD_ALG) else {
        return Ok(DEFAULT_HASH_ALGORITHM);
    };

    let name = value
        .as_str()
        .ok_or_else(|| Error::root(DecodingError::ReservedKeyName(SD_ALG)))?;

    HashAlgorithm::from_str(name)
}

fn decode_object(
    object: &JsonObject,
    state: &mut DecoderState<'_>,
    top_level: bool,
    prefix: &str,
    keymap: &mut DisclosureKeymap,
) -> Result<JsonObject> {
    let mut decoded = JsonObject::new();

    if let Some(sd) = object.get(SD_DIGEST) {
        let sd_array = sd
            .as_array()
            .ok_or_else(|| Error::root(DecodingError::MalformedDigest(sd.to_string())))?;

        for digest in sd_array {
            let Some(index) = process_digest(digest, state)? else {
                // No matching disclosure: the claim stays concealed.
                continue;
            };

            let disclosures = state.disclosures;
            match &disclosures[index].data {
                DisclosureData::KeyValue { key, value, .. } => {
                    process_key_value(key, value, &mut decoded, state, prefix, keymap, Some(index))?
                }
                DisclosureData::ArrayElement { .. } => {
                    // A keyless disclosure cannot be spliced into an object.
                    return Err(Error::root(DecodingError::MismatchedDisclosureFormat));
                }
            }
        }
    }

    for (key, value) in object {
        if key == SD_DIGEST {
            continue;
        }
        // `_sd_alg` is format metadata at the top level; it is dropped from
        // the reconstruction rather than treated as a claim.
        if top_level && key == SD_ALG {
            continue;
        }
        process_key_value(key, value, &mut decoded, state, prefix, keymap, None)?;
    }

    Ok(decoded)
}

/// Decode `value`, insert it into `object` under `key`, and record the
/// concealing disclosure (if any) in the keymap.
fn process_key_value(
    key: &str,
    value: &Value,
    object: &mut JsonObject,
    state: &mut DecoderState<'_>,
    prefix: &str,
    keymap: &mut DisclosureKeymap,
    disclosure_index: Option<usize>,
) -> Result<()> {
    if let Some(reserved) = is_reserved_key_name(key) {
        return Err(Error::root(DecodingError::ReservedKeyName(reserved)));
    }

    let path = join_path(prefix, key);
    let decoded_value = decode_value(value, state, &path, keymap)?;

    if object.insert(key.to_owned(), decoded_value).is_some() {
        return Err(Error::root(DecodingError::DuplicateClaimName(
            key.to_owned(),
        )));
    }

    if let Some(index) = disclosure_index {
        keymap.insert(path, index);
    }

    Ok(())
}

fn decode_array(
    array: &[Value],
    state: &mut DecoderState<'_>,
    prefix: &str,
    keymap: &mut DisclosureKeymap,
) -> Result<Value> {
    let mut decoded = Vec::new();

    for element in array {
        let Some((value, disclosure_index)) = resolve_element(element, state)? else {
            // Sentinel without a matching disclosure: the element is removed
            // and the array compacted.
            continue;
        };

        // Paths use positions in the *reconstructed* array, matching what a
        // holder sees in the presented claims.
        let path = join_path(prefix, &decoded.len().to_string());
        let decoded_value = decode_value(value, state, &path, keymap)?;
        decoded.push(decoded_value);

        if let Some(index) = disclosure_index {
            keymap.insert(path, index);
        }
    }

    Ok(Value::Array(decoded))
}

/// Resolve one array element: either a plain value, a disclosed value with
/// the index of its disclosure, or `None` for an unmatched sentinel.
///
/// The returned reference borrows either from the payload (`'json`) or from
/// a disclosure (`'dis`), so the disclosure borrow is shortened to the
/// payload one.
fn resolve_element<'json, 'dis: 'json>(
    element: &'json Value,
    state: &mut DecoderState<'dis>,
) -> Result<Option<(&'json Value, Option<usize>)>> {
    let Some(object) = element.as_object() else {
        return Ok(Some((element, None)));
    };
    let Some(digest) = object.get(SD_LIST_KEY) else {
        return Ok(Some((element, None)));
    };
    if object.len() != 1 {
        return Err(Error::root(DecodingError::MalformedDigest(
            element.to_string(),
        )));
    }

    let Some(index) = process_digest(digest, state)? else {
        return Ok(None);
    };

    let disclosures = state.disclosures;
    match &disclosures[index].data {
        DisclosureData::ArrayElement { value, .. } => Ok(Some((value, Some(index)))),
        DisclosureData::KeyValue { .. } => {
            // A keyed disclosure cannot stand in for an array element.
            Err(Error::root(DecodingError::MismatchedDisclosureFormat))
        }
    }
}

fn decode_value(
    value: &Value,
    state: &mut DecoderState<'_>,
    prefix: &str,
    keymap: &mut DisclosureKeymap,
) -> Result<Value> {
    match value {
        Value::Object(object) => Ok(Value::Object(decode_object(
            object, state, false, prefix, keymap,
        )?)),
        Value::Array(array) => decode_array(array, state, prefix, keymap),
        _ => Ok(value.clone()),
    }
}

/// Check a digest for duplication and look up its disclosure, marking the
/// disclosure as used.
fn process_digest(digest: &Value, state: &mut DecoderState<'_>) -> Result<Option<usize>> {
    let digest = digest
        .as_str()
        .ok_or_else(|| Error::root(DecodingError::MalformedDigest(digest.to_string())))?;

    if !state.seen_digests.insert(digest.to_owned()) {
        return Err(Error::root(DecodingError::DuplicateDigest(
            digest.to_owned(),
        )));
    }

    Ok(state.by_digest.remove(digest))
}

/// List every claim path of the reconstructed claims in dotted form,
/// recursively, array positions included.
pub(crate) fn list_keys(claims: &JsonObject) -> Vec<String> {
    let mut keys = Vec::new();
    collect_object_keys(claims, "", &mut keys);
    keys
}

fn collect_object_keys(object: &JsonObject, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in object {
        let path = join_path(prefix, key);
        out.push(path.clone());
        collect_value_keys(value, &path, out);
    }
}

fn collect_value_keys(value: &Value, prefix: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(object) => collect_object_keys(object, prefix, out),
        Value::Array(array) => {
            for (index, element) in array.iter().enumerate() {
                let path = join_path(prefix, &index.to_string());
                out.push(path.clone());
                collect_value_keys(element, &path, out);
            }
        }
        _ => {}
    }
}

/// Select the disclosures a presentation frame reveals: the frame expands to
/// claim paths, and exactly the disclosures concealing those paths are kept.
/// Paths that match nothing are ignored.
pub(crate) fn select_disclosures(
    keymap: &DisclosureKeymap,
    frame: &PresentationFrame,
) -> Vec<usize> {
    let mut indices: Vec<usize> = frame
        .claim_paths()
        .iter()
        .filter_map(|path| keymap.get(path))
        .copied()
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;
    use crate::{json_object, models::into_object, traits::Sha2Hasher};

    async fn calculate_digest(disclosure: &Disclosure) -> String {
        disclosure
            .digest(&Sha2Hasher, HashAlgorithm::Sha256)
            .await
            .unwrap()
    }

    fn simple_disclosure(key: Option<&str>) -> Disclosure {
        Disclosure::new(
            String::new(),
            key.map(str::to_owned),
            Value::String("value".to_string()),
        )
    }

    fn disclosures_from_serialized(serialized: Vec<&str>) -> Vec<Disclosure> {
        serialized
            .into_iter()
            .map(|token| Disclosure::try_from(token).unwrap())
            .collect()
    }

    // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#name-example-flat-sd-jwt
    #[tokio::test]
    async fn flat_example_from_draft() {
        let payload = into_object(json!({
            "_sd": [
                "fOBUSQvo46yQO-wRwXBcGqvnbKIueISEL961_Sjd4do"
            ],
            "iss": "https://issuer.example.com",
            "iat": 1683000000,
            "exp": 1883000000,
            "sub": "6c5c0a49-b589-431d-bae7-219122a9ec2c",
            "_sd_alg": "sha-256"
        }));

        let disclosures = disclosures_from_serialized(vec![
            "WyIyR0xDNDJzS1F2ZUNmR2ZyeU5STjl3IiwgImFkZHJlc3MiLCB7InN0cmVldF9hZGRyZXNzIjogIlNjaHVsc3RyLiAxMiIsICJsb2NhbGl0eSI6ICJTY2h1bHBmb3J0YSIsICJyZWdpb24iOiAiU2FjaHNlbi1BbmhhbHQiLCAiY291bnRyeSI6ICJERSJ9XQ",
        ]);

        let (claims, keymap) = decode_disclosed_claims(&payload, &disclosures, &Sha2Hasher)
            .await
            .unwrap();

        assert_eq!(
            claims,
            into_object(json!({
                "address": {
                    "street_address": "Schulstr. 12",
                    "locality": "Schulpforta",
                    "region": "Sachsen-Anhalt",
                    "country": "DE"
                },
                "iss": "https://issuer.example.com",
                "iat": 1683000000,
                "exp": 1883000000,
                "sub": "6c5c0a49-b589-431d-bae7-219122a9ec2c",
            }))
        );
        assert_eq!(keymap, HashMap::from([("address".to_string(), 0)]));
    }

    // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#name-example-structured-sd-jwt
    #[tokio::test]
    async fn structured_example_from_draft() {
        let payload = into_object(json!({
            "iss": "https://issuer.example.com",
            "sub": "6c5c0a49-b589-431d-bae7-219122a9ec2c",
            "address": {
                "_sd": [
                    "6vh9bq-zS4GKM_7GpggVbYzzu6oOGXrmNVGPHP75Ud0",
                    "9gjVuXtdFROCgRrtNcGUXmF65rdezi_6Er_j76kmYyM",
                    "KURDPh4ZC19-3tiz-Df39V8eidy1oV3a3H1Da2N0g88",
                    "WN9r9dCBJ8HTCsS2jKASxTjEyW5m5x65_Z_2ro2jfXM"
                ]
            },
            "_sd_alg": "sha-256"
        }));

        let disclosures = disclosures_from_serialized(vec![
            // address.street_address
            "WyIyR0xDNDJzS1F2ZUNmR2ZyeU5STjl3IiwgInN0cmVldF9hZGRyZXNzIiwgIlNjaHVsc3RyLiAxMiJd",
            // address.locality
            "WyJlbHVWNU9nM2dTTklJOEVZbnN4QV9BIiwgImxvY2FsaXR5IiwgIlNjaHVscGZvcnRhIl0",
            // address.region
            "WyI2SWo3dE0tYTVpVlBHYm9TNXRtdlZBIiwgInJlZ2lvbiIsICJTYWNoc2VuLUFuaGFsdCJd",
            // address.country
            "WyJlSThaV205UW5LUHBOUGVOZW5IZGhRIiwgImNvdW50cnkiLCAiREUiXQ",
        ]);

        let (claims, keymap) = decode_disclosed_claims(&payload, &disclosures, &Sha2Hasher)
            .await
            .unwrap();

        assert_eq!(
            claims["address"],
            json!({
                "street_address": "Schulstr. 12",
                "locality": "Schulpforta",
                "region": "Sachsen-Anhalt",
                "country": "DE"
            })
        );
        assert_eq!(
            keymap,
            HashMap::from([
                ("address.street_address".to_string(), 0),
                ("address.locality".to_string(), 1),
                ("address.region".to_string(), 2),
                ("address.country".to_string(), 3),
            ])
        );
    }

    // https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt-13#name-example-sd-jwt-with-recursi
    #[tokio::test]
    async fn recursive_example_from_draft() {
        let payload = into_object(json!({
            "_sd": [
                "HvrKX6fPV0v9K_yCVFBiLFHsMaxcD_114Em6VT8x1lg"
            ],
            "sub": "6c5c0a49-b589-431d-bae7-219122a9ec2c",
            "_sd_alg": "sha-256"
        }));

        let disclosures = disclosures_from_serialized(vec![
            // address.street_address
            "WyIyR0xDNDJzS1F2ZUNmR2ZyeU5STjl3IiwgInN0cmVldF9hZGRyZXNzIiwgIlNjaHVsc3RyLiAxMiJd",
            // address.locality
            "WyJlbHVWNU9nM2dTTklJOEVZbnN4QV9BIiwgImxvY2FsaXR5IiwgIlNjaHVscGZvcnRhIl0",
            // address.region
            "WyI2SWo3dE0tYTVpVlBHYm9TNXRtdlZBIiwgInJlZ2lvbiIsICJTYWNoc2VuLUFuaGFsdCJd",
            // address.country
            "WyJlSThaV205UW5LUHBOUGVOZW5IZGhRIiwgImNvdW50cnkiLCAiREUiXQ",
            // address (recursive, value contains the four digests above)
            "WyJRZ19PNjR6cUF4ZTQxMmExMDhpcm9BIiwgImFkZHJlc3MiLCB7Il9zZCI6IFsiNnZoOWJxLXpTNEdLTV83R3BnZ1ZiWXp6dTZvT0dYcm1OVkdQSFA3NVVkMCIsICI5Z2pWdVh0ZEZST0NnUnJ0TmNHVVhtRjY1cmRlemlfNkVyX2o3NmttWXlNIiwgIktVUkRQaDRaQzE5LTN0aXotRGYzOVY4ZWlkeTFvVjNhM0gxRGEyTjBnODgiLCAiV045cjlkQ0JKOEhUQ3NTMmpLQVN4VGpFeVc1bTV4NjVfWl8ycm8yamZYTSJdfV0",
        ]);

        let (claims, keymap) = decode_disclosed_claims(&payload, &disclosures, &Sha2Hasher)
            .await
            .unwrap();

        assert_eq!(
            claims,
            into_object(json!({
                "address": {
                    "street_address": "Schulstr. 12",
                    "locality": "Schulpforta",
                    "region": "Sachsen-Anhalt",
                    "country": "DE"
                },
                "sub": "6c5c0a49-b589-431d-bae7-219122a9ec2c",
            }))
        );
        // The outer disclosure covers `address`; the inner ones cover its
        // fields, addressed by their reconstructed paths.
        assert_eq!(keymap["address"], 4);
        assert_eq!(keymap["address.street_address"], 0);
        assert_eq!(keymap["address.country"], 3);
    }

    #[tokio::test]
    async fn array_sentinels_resolve_and_compact() {
        let in_array = Disclosure::new(String::new(), None, json!("US"));
        let in_nested = Disclosure::new(String::new(), None, json!("DE"));

        let payload = into_object(json!({
            "nationalities": [
                "plain",
                { "...": calculate_digest(&in_array).await },
                [{ "...": calculate_digest(&in_nested).await }],
                { "...": "unmatched-digest-is-dropped" },
            ],
        }));
        let disclosures = vec![in_array, in_nested];

        let (claims, keymap) = decode_disclosed_claims(&payload, &disclosures, &Sha2Hasher)
            .await
            .unwrap();

        // "Disclose all provided" keeps order; the unmatched sentinel is
        // compacted away.
        assert_eq!(claims["nationalities"], json!(["plain", "US", ["DE"]]));
        assert_eq!(keymap["nationalities.1"], 0);
        assert_eq!(keymap["nationalities.2.0"], 1);
    }

    #[tokio::test]
    async fn disclose_none_leaves_empty_array() {
        let payload = into_object(json!({
            "list": [
                { "...": "digest-one" },
                { "...": "digest-two" },
            ],
            "_sd_alg": "sha-256"
        }));

        let (claims, keymap) = decode_disclosed_claims(&payload, &[], &Sha2Hasher)
            .await
            .unwrap();

        assert_eq!(claims["list"], json!([]));
        assert!(keymap.is_empty());
    }

    #[tokio::test]
    async fn unmatched_object_digests_stay_concealed() {
        let disclosure = simple_disclosure(Some("key"));

        let payload = into_object(json!({
            "_sd": [
                calculate_digest(&disclosure).await,
                "fOBUSQvo46yQO-wRwXBcGqvnbKIueISEL961_Sjd4d2",
                "fOBUSQvo46yQO-wRwXBcGqvnbKIueISEL961_Sjd4d3",
            ],
            "_sd_alg": "sha-256"
        }));
        let disclosures = &[disclosure];

        let (claims, _) = decode_disclosed_claims(&payload, disclosures, &Sha2Hasher)
            .await
            .unwrap();

        assert_eq!(claims, into_object(json!({ "key": "value" })));
    }

    #[tokio::test]
    async fn keyless_disclosure_in_object_is_rejected() {
        let disclosure = simple_disclosure(None);

        let payload = into_object(json!({
            "_sd": [calculate_digest(&disclosure).await],
        }));
        let disclosures = &[disclosure];

        let error = decode_disclosed_claims(&payload, disclosures, &Sha2Hasher)
            .await
            .unwrap_err();

        assert_eq!(error.error, DecodingError::MismatchedDisclosureFormat);
    }

    #[tokio::test]
    async fn keyed_disclosure_in_array_is_rejected() {
        let disclosure = simple_disclosure(Some("key"));

        let payload = into_object(json!({
            "array": [{ "...": calculate_digest(&disclosure).await }],
        }));
        let disclosures = &[disclosure];

        let error = decode_disclosed_claims(&payload, disclosures, &Sha2Hasher)
            .await
            .unwrap_err();

        assert_eq!(error.error, DecodingError::MismatchedDisclosureFormat);
    }

    #[tokio::test]
    async fn reserved_claim_names_are_rejected() {
        for reserved in [SD_DIGEST, SD_LIST_KEY, SD_ALG] {
            let disclosure = simple_disclosure(Some(reserved));
            let payload = into_object(json!({
                "_sd": [calculate_digest(&disclosure).await],
            }));
            let disclosures = &[disclosure];

            let error = decode_disclosed_claims(&payload, disclosures, &Sha2Hasher)
                .await
                .unwrap_err();

            assert_eq!(error.error, DecodingError::ReservedKeyName(reserved));
        }
    }

    #[tokio::test]
    async fn reserved_name_inside_disclosed_value_is_rejected() {
        let disclosure = Disclosure::new(
            String::new(),
            Some("a".to_string()),
            json!({ "...": 1, "b": 2 }),
        );
        let payload = into_object(json!({
            "_sd": [calculate_digest(&disclosure).await],
        }));
        let disclosures = &[disclosure];

        let error = decode_disclosed_claims(&payload, disclosures, &Sha2Hasher)
            .await
            .unwrap_err();

        assert_eq!(error.error, DecodingError::ReservedKeyName(SD_LIST_KEY));
    }

    #[tokio::test]
    async fn duplicate_claim_name_is_rejected() {
        let disclosure = simple_disclosure(Some("address"));

        let payload = into_object(json!({
            "_sd": [calculate_digest(&disclosure).await],
            "address": "already here",
            "_sd_alg": "sha-256"
        }));
        let disclosures = &[disclosure];

        let error = decode_disclosed_claims(&payload, disclosures, &Sha2Hasher)
            .await
            .unwrap_err();

        assert_eq!(
            error.error,
            DecodingError::DuplicateClaimName("address".to_string())
        );
    }

    #[tokio::test]
    async fn duplicate_digest_is_rejected() {
        let duplicated = "fOBUSQvo46yQO-wRwXBcGqvnbKIueISEL961_Sjd4d3".to_string();
        let payload = into_object(json!({
            "_sd": [duplicated.as_str()],
            "array": [{ "...": duplicated.as_str() }],
            "_sd_alg": "sha-256"
        }));

        let error = decode_disclosed_claims(&payload, &[], &Sha2Hasher)
            .await
            .unwrap_err();

        assert_eq!(error.error, DecodingError::DuplicateDigest(duplicated));
    }

    #[tokio::test]
    async fn unused_disclosure_is_rejected() {
        let used = simple_disclosure(Some("key"));
        let unused = Disclosure::new(String::new(), Some("key2".to_string()), json!(false));
        let unused_digest = calculate_digest(&unused).await;

        let payload = into_object(json!({
            "address": {
                "_sd": [calculate_digest(&used).await]
            },
            "_sd_alg": "sha-256"
        }));
        let disclosures = [used, unused];

        let error = decode_disclosed_claims(&payload, &disclosures, &Sha2Hasher)
            .await
            .unwrap_err();

        assert_eq!(
            error.error,
            DecodingError::UnusedDisclosures(VecDisplayWrapper(vec![unused_digest]))
        );
    }

    #[tokio::test]
    async fn disclosure_inside_object_inside_array() {
        let disclosure = simple_disclosure(Some("key"));

        let payload = into_object(json!({
            "address": [
                { "_sd": [calculate_digest(&disclosure).await] }
            ]
        }));
        let disclosures = &[disclosure];

        let (claims, keymap) = decode_disclosed_claims(&payload, disclosures, &Sha2Hasher)
            .await
            .unwrap();

        assert_eq!(claims["address"], json!([{ "key": "value" }]));
        assert_eq!(keymap["address.0.key"], 0);
    }

    #[tokio::test]
    async fn malformed_sentinel_with_extra_keys_is_rejected() {
        let payload = into_object(json!({
            "address": [
                { "...": "digest", "extra": 1 }
            ]
        }));

        let error = decode_disclosed_claims(&payload, &[], &Sha2Hasher)
            .await
            .unwrap_err();

        assert!(matches!(error.error, DecodingError::MalformedDigest(_)));
    }

    #[tokio::test]
    async fn non_string_digest_is_rejected() {
        let payload = into_object(json!({
            "_sd": [42],
        }));

        let error = decode_disclosed_claims(&payload, &[], &Sha2Hasher)
            .await
            .unwrap_err();

        assert_eq!(error.error, DecodingError::MalformedDigest("42".to_string()));
    }

    #[tokio::test]
    async fn non_string_sd_alg_is_rejected() {
        let payload = into_object(json!({
            "_sd": [],
            "_sd_alg": ["sha-256"]
        }));

        let error = decode_disclosed_claims(&payload, &[], &Sha2Hasher)
            .await
            .unwrap_err();

        assert_eq!(error.error, DecodingError::ReservedKeyName(SD_ALG));
    }

    #[tokio::test]
    async fn unknown_sd_alg_is_rejected() {
        let payload = into_object(json!({
            "_sd": [],
            "_sd_alg": "esh-512"
        }));

        let error = decode_disclosed_claims(&payload, &[], &Sha2Hasher)
            .await
            .unwrap_err();

        assert_eq!(
            error.error,
            DecodingError::InvalidHashAlgorithmName("esh-512".to_owned())
        );
    }

    #[test]
    fn list_keys_walks_objects_and_arrays() {
        let claims = json_object!({
            "firstname": "John",
            "data": {
                "list": ["a", { "r": "d" }],
            },
        });

        assert_eq!(
            list_keys(&claims),
            vec![
                "firstname",
                "data",
                "data.list",
                "data.list.0",
                "data.list.1",
                "data.list.1.r",
            ]
        );
    }

    #[test]
    fn select_disclosures_matches_frame_paths() {
        let keymap = DisclosureKeymap::from([
            ("a".to_string(), 0),
            ("b".to_string(), 1),
            ("b.c".to_string(), 2),
        ]);

        let frame = PresentationFrame::from_value(&json!({
            "a": true,
            "b": { "c": true },
            "never_concealed": true,
        }))
        .unwrap();

        assert_eq!(select_disclosures(&keymap, &frame), vec![0, 1, 2]);

        let partial = PresentationFrame::from_value(&json!({ "b": { "c": true } })).unwrap();
        assert_eq!(select_disclosures(&keymap, &partial), vec![1, 2]);
    }
}
