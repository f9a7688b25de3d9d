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

use std::cmp::Reverse;

use serde_json::{json, Value};
use veil_error::{traits::ForeignBoxed, Error};

use crate::{
    error::PackError,
    models::{Disclosure, DisclosureFrame, PackJob},
    traits::{HashAlgorithm, Hasher, SaltGenerator, DEFAULT_SALT_LENGTH},
    utils::{dotted, find_reserved_claim_name, locate_mut},
    JsonObject, SD_DIGEST, SD_LIST_KEY,
};

type Result<T> = veil_error::Result<T, PackError>;

/// Conceal the claims selected by `frame`, replacing them with salted
/// digests, as described in the [draft].
///
/// Returns the packed claims and the disclosures that open them. Without a
/// frame the payload passes through untouched and no disclosures are
/// produced.
///
/// Concealment is depth-first, post-order: a claim that is both recursed
/// into and concealed is packed before its own disclosure is built, so the
/// disclosure value carries the nested digests. Digests land in the `_sd`
/// array of their level in frame order; concealed array elements are
/// replaced in place by `{"...": digest}` so positions stay addressable.
/// Decoy digests requested via `_sd_decoy` are built from fresh salted
/// random values and are not returned, so they can never be opened.
///
/// # Errors
/// Packing fails if:
/// - the payload contains a reserved claim name anywhere,
/// - the frame names a claim that does not exist,
/// - the frame names a claim twice or uses a reserved name,
/// - the salt generator or the hasher fails.
///
/// [draft]: https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt#name-disclosures
pub async fn pack(
    payload: JsonObject,
    frame: Option<&DisclosureFrame>,
    hasher: &dyn Hasher,
    alg: HashAlgorithm,
    salt_generator: &dyn SaltGenerator,
) -> Result<(JsonObject, Vec<Disclosure>)> {
    let mut claims = payload;
    let Some(frame) = frame else {
        return Ok((claims, Vec::new()));
    };

    if let Some(name) = find_reserved_claim_name(&claims) {
        return Err(Error::root(PackError::ReservedClaimName(name.to_owned())));
    }

    let mut jobs = frame.pack_jobs()?;
    // Descendants strictly before ancestors; stable, so same-depth jobs keep
    // the frame's order.
    jobs.sort_by_key(|job| Reverse(job.depth()));

    let mut disclosures = Vec::new();
    for job in jobs {
        match job {
            PackJob::Conceal { path } => {
                disclosures
                    .push(conceal_claim(&mut claims, &path, hasher, alg, salt_generator).await?);
            }
            PackJob::Decoy { path, count } => {
                add_decoys(&mut claims, &path, count, hasher, alg, salt_generator).await?;
            }
        }
    }

    Ok((claims, disclosures))
}

async fn conceal_claim(
    claims: &mut JsonObject,
    path: &[String],
    hasher: &dyn Hasher,
    alg: HashAlgorithm,
    salt_generator: &dyn SaltGenerator,
) -> Result<Disclosure> {
    let salt = new_salt(salt_generator).await?;

    let (last_segment, parent_path) = path
        .split_last()
        .expect("pack jobs never carry an empty conceal path");

    // The root object is not itself a `Value`, so concealing its direct
    // children is a special case.
    if parent_path.is_empty() {
        return conceal_in_object(claims, last_segment, salt, hasher, alg, path).await;
    }

    let parent = locate_mut(claims, parent_path)
        .ok_or_else(|| Error::root(PackError::NonExistentClaim(dotted(path))))?;

    match parent {
        Value::Object(object) => {
            conceal_in_object(object, last_segment, salt, hasher, alg, path).await
        }
        Value::Array(array) => {
            let index: usize = last_segment
                .parse()
                .map_err(|_| Error::root(PackError::NonExistentClaim(dotted(path))))?;
            conceal_in_array(array, index, salt, hasher, alg, path).await
        }
        // The path leads into a scalar; there is nothing to conceal there.
        _ => Err(Error::root(PackError::NonExistentClaim(dotted(path)))),
    }
}

/// Conceal the claim at `key` of `object`: remove it, build its disclosure
/// and append the digest to the object's `_sd` array.
async fn conceal_in_object(
    object: &mut JsonObject,
    key: &str,
    salt: String,
    hasher: &dyn Hasher,
    alg: HashAlgorithm,
    path: &[String],
) -> Result<Disclosure> {
    let value = object
        .shift_remove(key)
        .ok_or_else(|| Error::root(PackError::NonExistentClaim(dotted(path))))?;

    let disclosure = Disclosure::new(salt, Some(key.to_owned()), value);
    let digest = disclosure
        .digest(hasher, alg)
        .await
        .foreign_boxed_err(|| PackError::HashingFailed)?;

    push_sd_digest(object, digest)?;

    Ok(disclosure)
}

/// Conceal the claim at `index` of `array`, replacing the element in place
/// with a `{"...": digest}` wrapper so array length and positions are
/// preserved.
async fn conceal_in_array(
    array: &mut [Value],
    index: usize,
    salt: String,
    hasher: &dyn Hasher,
    alg: HashAlgorithm,
    path: &[String],
) -> Result<Disclosure> {
    let element = array
        .get_mut(index)
        .ok_or_else(|| Error::root(PackError::NonExistentClaim(dotted(path))))?;

    // Take the value out without cloning; the slot is overwritten below.
    let value = std::mem::take(element);

    let disclosure = Disclosure::new(salt, None, value);
    let digest = disclosure
        .digest(hasher, alg)
        .await
        .foreign_boxed_err(|| PackError::HashingFailed)?;

    array[index] = json!({ SD_LIST_KEY: digest });

    Ok(disclosure)
}

async fn add_decoys(
    claims: &mut JsonObject,
    path: &[String],
    count: u32,
    hasher: &dyn Hasher,
    alg: HashAlgorithm,
    salt_generator: &dyn SaltGenerator,
) -> Result<()> {
    if path.is_empty() {
        for _ in 0..count {
            let digest = decoy_digest(hasher, alg, salt_generator).await?;
            push_sd_digest(claims, digest)?;
        }
        return Ok(());
    }

    let level = locate_mut(claims, path)
        .ok_or_else(|| Error::root(PackError::NonExistentClaim(dotted(path))))?;

    match level {
        Value::Object(object) => {
            for _ in 0..count {
                let digest = decoy_digest(hasher, alg, salt_generator).await?;
                push_sd_digest(object, digest)?;
            }
        }
        Value::Array(array) => {
            for _ in 0..count {
                let digest = decoy_digest(hasher, alg, salt_generator).await?;
                array.push(json!({ SD_LIST_KEY: digest }));
            }
        }
        _ => return Err(Error::root(PackError::NonExistentClaim(dotted(path)))),
    }

    Ok(())
}

/// A decoy digest is the digest of a real-shaped disclosure over a fresh
/// random value, indistinguishable by inspection from a genuine one. The
/// disclosure itself is dropped, so the decoy can never be opened.
async fn decoy_digest(
    hasher: &dyn Hasher,
    alg: HashAlgorithm,
    salt_generator: &dyn SaltGenerator,
) -> Result<String> {
    let salt = new_salt(salt_generator).await?;
    let filler = new_salt(salt_generator).await?;

    Disclosure::new(salt, None, Value::String(filler))
        .digest(hasher, alg)
        .await
        .foreign_boxed_err(|| PackError::HashingFailed)
}

async fn new_salt(salt_generator: &dyn SaltGenerator) -> Result<String> {
    salt_generator
        .generate(DEFAULT_SALT_LENGTH)
        .await
        .foreign_boxed_err(|| PackError::SaltGenerationFailed)
}

fn push_sd_digest(object: &mut JsonObject, digest: String) -> Result<()> {
    if let Value::Array(sd_array) = object
        .entry(SD_DIGEST)
        .or_insert(Value::Array(Vec::new()))
    {
        sd_array.push(digest.into());
        Ok(())
    } else {
        // A non-array under `_sd` can only mean the payload smuggled one in.
        Err(Error::root(PackError::ReservedClaimName(
            SD_DIGEST.to_owned(),
        )))
    }
}
