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

use std::collections::HashSet;

use serde_json::Value;
use veil_error::{traits::ErrorContext, Error};

use crate::{
    error::{FormatError, PackError},
    utils::{dotted, is_reserved_key_name},
    SD_DECOY, SD_DIGEST,
};

/// A structural description of which claims to conceal, mirroring the shape
/// of the payload.
///
/// At any level, `concealed` lists the object keys (or array indices, as
/// decimal strings) to replace with digests, `decoy_count` requests that many
/// decoy digests, and `children` are the nested frames to recurse into before
/// the level itself is processed.
///
/// Frames are typically written as JSON and parsed with
/// [`DisclosureFrame::from_value`]:
///
/// ```
/// use veil_sd_jwt::DisclosureFrame;
///
/// let frame = DisclosureFrame::from_value(&serde_json::json!({
///     "_sd": ["given_name", "family_name"],
///     "_sd_decoy": 2,
///     "address": { "_sd": ["street_address"] },
///     "nationalities": { "_sd": ["0"] },
/// }))
/// .unwrap();
/// # let _ = frame;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisclosureFrame {
    pub(crate) concealed: Vec<String>,
    pub(crate) decoy_count: u32,
    pub(crate) children: Vec<(String, DisclosureFrame)>,
}

/// One unit of packing work derived from a [`DisclosureFrame`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PackJob {
    /// Conceal the claim at `path` behind a digest.
    Conceal {
        /// Path from the payload root, one raw segment per level.
        path: Vec<String>,
    },
    /// Add `count` decoy digests to the container at `path`.
    Decoy {
        /// Path of the container level receiving the decoys.
        path: Vec<String>,
        /// Number of decoy digests to add.
        count: u32,
    },
}

impl PackJob {
    /// Depth used for ordering: descendants strictly before ancestors.
    ///
    /// A conceal at `path` edits the container *above* its last segment; a
    /// decoy at `path` edits the container *at* `path`, which is the same
    /// depth as concealing one of its children.
    pub(crate) fn depth(&self) -> usize {
        match self {
            PackJob::Conceal { path } => path.len(),
            PackJob::Decoy { path, .. } => path.len() + 1,
        }
    }
}

impl DisclosureFrame {
    /// Parse a frame from its JSON representation.
    ///
    /// The representation mirrors the payload: an object whose `_sd` entry
    /// lists claim names (or array indices) to conceal, whose `_sd_decoy`
    /// entry requests decoys, and whose remaining entries are nested frames.
    pub fn from_value(value: &Value) -> veil_error::Result<Self, PackError> {
        let Value::Object(object) = value else {
            return Err(Error::root(PackError::InvalidFrame(
                "frame must be a JSON object".to_string(),
            )));
        };

        let mut frame = Self::default();

        for (key, entry) in object {
            match key.as_str() {
                SD_DIGEST => {
                    let Value::Array(entries) = entry else {
                        return Err(Error::root(PackError::InvalidFrame(
                            "_sd must be an array".to_string(),
                        )));
                    };
                    for concealed in entries {
                        frame.concealed.push(frame_key(concealed)?);
                    }
                }
                SD_DECOY => {
                    let count = entry.as_u64().and_then(|n| u32::try_from(n).ok());
                    let Some(count) = count else {
                        return Err(Error::root(PackError::InvalidFrame(
                            "_sd_decoy must be a non-negative count".to_string(),
                        )));
                    };
                    frame.decoy_count = count;
                }
                _ => {
                    let child = Self::from_value(entry).ctx(|| format!("in frame entry {key}"))?;
                    frame.children.push((key.clone(), child));
                }
            }
        }

        Ok(frame)
    }

    /// Flatten the frame into pack jobs, checking it for reserved claim names
    /// and duplicate entries.
    ///
    /// Jobs are emitted depth-first in frame order; the encoder sorts them by
    /// descending depth so descendants are concealed before their ancestors
    /// (stable, so sibling order follows the frame).
    pub(crate) fn pack_jobs(&self) -> veil_error::Result<Vec<PackJob>, PackError> {
        let mut jobs = Vec::new();
        let mut seen = HashSet::new();
        self.collect_jobs(&mut Vec::new(), &mut jobs, &mut seen)?;
        Ok(jobs)
    }

    fn collect_jobs(
        &self,
        prefix: &mut Vec<String>,
        jobs: &mut Vec<PackJob>,
        seen: &mut HashSet<Vec<String>>,
    ) -> veil_error::Result<(), PackError> {
        for concealed in &self.concealed {
            if let Some(reserved) = is_reserved_key_name(concealed) {
                return Err(Error::root(PackError::ReservedClaimName(
                    reserved.to_owned(),
                )));
            }
            let mut path = prefix.clone();
            path.push(concealed.clone());
            if !seen.insert(path.clone()) {
                return Err(Error::root(PackError::DuplicateFrameEntry(dotted(&path))));
            }
            jobs.push(PackJob::Conceal { path });
        }

        if self.decoy_count > 0 {
            jobs.push(PackJob::Decoy {
                path: prefix.clone(),
                count: self.decoy_count,
            });
        }

        for (key, child) in &self.children {
            if let Some(reserved) = is_reserved_key_name(key) {
                return Err(Error::root(PackError::ReservedClaimName(
                    reserved.to_owned(),
                )));
            }
            prefix.push(key.clone());
            child.collect_jobs(prefix, jobs, seen)?;
            prefix.pop();
        }

        Ok(())
    }
}

fn frame_key(value: &Value) -> veil_error::Result<String, PackError> {
    match value {
        Value::String(key) => Ok(key.clone()),
        Value::Number(index) if index.is_u64() => Ok(index.to_string()),
        other => Err(Error::root(PackError::InvalidFrame(format!(
            "_sd entry {} is neither a claim name nor an index",
            other
        )))),
    }
}

/// A holder's choice of which previously concealed claims to reveal in a
/// presentation.
///
/// Mirrors the payload shape with `true`/`false` leaves; marking a nested
/// frame selects its parent as well. Entries naming claims that were never
/// concealed are ignored: a presentation can only reveal, never invent,
/// disclosures.
///
/// ```
/// use veil_sd_jwt::PresentationFrame;
///
/// let frame = PresentationFrame::from_value(&serde_json::json!({
///     "given_name": true,
///     "address": { "street_address": true },
/// }))
/// .unwrap();
/// # let _ = frame;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PresentationFrame {
    pub(crate) entries: Vec<(String, PresentationEntry)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PresentationEntry {
    Reveal(bool),
    Nested(PresentationFrame),
}

impl PresentationFrame {
    /// Parse a presentation frame from its JSON representation: an object
    /// with boolean leaves and nested frames, array indices as decimal keys.
    pub fn from_value(value: &Value) -> veil_error::Result<Self, FormatError> {
        let Value::Object(object) = value else {
            return Err(Error::root(FormatError::InvalidPresentationFrame(
                "frame must be a JSON object".to_string(),
            )));
        };

        let mut entries = Vec::new();
        for (key, entry) in object {
            let parsed = match entry {
                Value::Bool(reveal) => PresentationEntry::Reveal(*reveal),
                Value::Object(_) => PresentationEntry::Nested(
                    Self::from_value(entry).ctx(|| format!("in frame entry {key}"))?,
                ),
                other => {
                    return Err(Error::root(FormatError::InvalidPresentationFrame(format!(
                        "frame entry {} must be a boolean or a nested frame, got {}",
                        key, other
                    ))));
                }
            };
            entries.push((key.clone(), parsed));
        }

        Ok(Self { entries })
    }

    /// Expand the frame into the dotted claim paths it selects.
    ///
    /// A nested frame selects its own path in addition to its children, so
    /// recursive disclosures along the way are revealed too.
    pub(crate) fn claim_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        self.collect_paths("", &mut paths);
        paths
    }

    fn collect_paths(&self, prefix: &str, paths: &mut Vec<String>) {
        for (key, entry) in &self.entries {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match entry {
                PresentationEntry::Reveal(true) => paths.push(path),
                PresentationEntry::Reveal(false) => {}
                PresentationEntry::Nested(child) => {
                    paths.push(path.clone());
                    child.collect_paths(&path, paths);
                }
            }
        }
    }
}
