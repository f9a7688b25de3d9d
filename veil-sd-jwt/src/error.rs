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

use crate::utils::VecDisplayWrapper;

/// Top-level error type returned by the instance façades.
///
/// Every failure mode of `issue`/`present`/`verify`/`validate` is one of
/// these groups; the rendered messages are stable, so callers may match on
/// them.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum Error {
    /// A required capability is missing from the configuration.
    #[strum(to_string = "{0}")]
    Config(ConfigError),

    /// The input is not in a well-formed SD-JWT shape.
    #[strum(to_string = "{0}")]
    Format(FormatError),

    /// Concealing claims at issuance failed.
    #[strum(to_string = "{0}")]
    Pack(PackError),

    /// Reconstructing the claims from digests and disclosures failed.
    #[strum(to_string = "{0}")]
    Decoding(DecodingError),

    /// Producing or checking a JWT signature failed.
    #[strum(to_string = "{0}")]
    Signature(SignatureError),

    /// A time-based or required-claims check failed.
    #[strum(to_string = "{0}")]
    Verify(VerifyError),

    /// A key binding check failed.
    #[strum(to_string = "{0}")]
    KeyBinding(KeyBindingError),
}

impl veil_error::CoreError for Error {}

/// Errors raised when a required capability was not configured.
///
/// Each missing capability has its own message so callers can tell which
/// part of the configuration is incomplete.
#[derive(strum_macros::Display, Debug, PartialEq, Eq, Clone)]
pub enum ConfigError {
    /// No hasher was configured.
    #[strum(to_string = "Hasher not found")]
    MissingHasher,

    /// No salt generator was configured.
    #[strum(to_string = "SaltGenerator not found")]
    MissingSaltGenerator,

    /// No signer was configured.
    #[strum(to_string = "Signer not found")]
    MissingSigner,

    /// No signing algorithm name was configured.
    #[strum(to_string = "sign algorithm not specified")]
    MissingSignAlgorithm,

    /// No verifier was configured.
    #[strum(to_string = "Verifier not found")]
    MissingVerifier,

    /// No key binding signer was configured.
    #[strum(to_string = "Key Binding Signer not found")]
    MissingKbSigner,

    /// No key binding signing algorithm name was configured.
    #[strum(to_string = "Key Binding sign algorithm not specified")]
    MissingKbSignAlgorithm,

    /// No key binding verifier was configured.
    #[strum(to_string = "Key Binding Verifier not found")]
    MissingKbVerifier,
}

impl veil_error::CoreError for ConfigError {}

/// Format errors related to parsing compact strings, JWTs, disclosure tokens
/// and the JSON serializations.
#[derive(strum_macros::Display, Debug, PartialEq, Eq, Clone)]
pub enum FormatError {
    /// The compact SD-JWT string is malformed.
    #[strum(to_string = "Invalid SD-JWT format")]
    InvalidSdJwtFormat,

    /// The JWT is not three dot-separated base64url segments of JSON objects.
    #[strum(to_string = "Provided JWT is not parsable")]
    NonParseableJwt,

    /// The JWT has no signature yet and cannot be serialized.
    #[strum(to_string = "JWT is not signed")]
    UnsignedJwt,

    /// A disclosure token is malformed.
    #[strum(to_string = "Invalid disclosure: {0}")]
    InvalidDisclosure(String),

    /// A presentation frame is malformed.
    #[strum(to_string = "Invalid presentation frame: {0}")]
    InvalidPresentationFrame(String),

    /// A JSON serialization refers to a signature index that does not exist.
    #[strum(to_string = "No signature at index {0}")]
    InvalidSignatureIndex(usize),
}

impl veil_error::CoreError for FormatError {}

/// Errors raised while concealing claims during issuance.
#[derive(strum_macros::Display, Debug, PartialEq, Eq, Clone)]
pub enum PackError {
    /// The disclosure frame is not in the expected shape.
    #[strum(to_string = "Invalid disclosure frame: {0}")]
    InvalidFrame(String),

    /// The same claim is named twice in the disclosure frame.
    #[strum(to_string = "Duplicate disclosure frame entry {0}")]
    DuplicateFrameEntry(String),

    /// The payload or the frame uses a claim name with format semantics.
    #[strum(to_string = "Use of reserved claim name {0}")]
    ReservedClaimName(String),

    /// The frame names a claim that does not exist in the payload.
    #[strum(to_string = "Non existent claim {0}")]
    NonExistentClaim(String),

    /// The salt generator failed.
    #[strum(to_string = "Salt generation failed")]
    SaltGenerationFailed,

    /// The hasher failed.
    #[strum(to_string = "Hashing failed")]
    HashingFailed,
}

impl veil_error::CoreError for PackError {}

/// Errors raised while reconstructing claims from digests and disclosures.
#[derive(strum_macros::Display, Debug, PartialEq, Eq, Clone)]
pub enum DecodingError {
    /// An array-element disclosure was referenced from an `_sd` array, or an
    /// object-property disclosure from an array-element digest.
    #[strum(to_string = "Mismatched disclosure format")]
    MismatchedDisclosureFormat,

    /// A reserved claim name appeared as an ordinary claim.
    #[strum(to_string = "Reserved key name {0} usage")]
    ReservedKeyName(&'static str),

    /// A digest is not in the expected shape.
    #[strum(to_string = "Malformed digest: {0}")]
    MalformedDigest(String),

    /// Two provided disclosures hash to the same digest.
    #[strum(to_string = "Disclosure digest collision")]
    DisclosureDigestCollision,

    /// The same digest appears more than once in the payload.
    #[strum(to_string = "Duplicated digest: {0}")]
    DuplicateDigest(String),

    /// Disclosures were provided whose digests appear nowhere in the payload.
    #[strum(to_string = "Unused disclosures: {0}")]
    UnusedDisclosures(VecDisplayWrapper<String>),

    /// A disclosed claim name collides with an existing claim.
    #[strum(to_string = "Duplicate claim name: {0}")]
    DuplicateClaimName(String),

    /// The hash algorithm name is not registered.
    #[strum(to_string = "Invalid hash algorithm name: {0}")]
    InvalidHashAlgorithmName(String),

    /// The hash algorithm is registered but not supported by this
    /// implementation.
    #[strum(to_string = "Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),

    /// The hasher failed.
    #[strum(to_string = "Hashing failed")]
    HashingFailed,
}

impl veil_error::CoreError for DecodingError {}

/// Errors raised while producing or checking JWT signatures.
#[derive(strum_macros::Display, Debug, PartialEq, Eq, Clone)]
pub enum SignatureError {
    /// The signer failed to produce a signature.
    #[strum(to_string = "Signing failed")]
    SigningFailed,

    /// The JWT carries no signature.
    #[strum(to_string = "no signature in JWT")]
    MissingSignature,

    /// The signature did not verify.
    #[strum(to_string = "Invalid JWT Signature")]
    InvalidJwtSignature,
}

impl veil_error::CoreError for SignatureError {}

/// Errors raised by time-based and required-claims checks.
#[derive(strum_macros::Display, Debug, PartialEq, Eq, Clone)]
pub enum VerifyError {
    /// The `iat` or `nbf` claim lies in the future.
    #[strum(to_string = "JWT is not yet valid: current time is {0}, valid from {1}")]
    JwtNotYetValid(u64, u64),

    /// The `exp` claim lies in the past.
    #[strum(to_string = "JWT is expired: current time is {0}, expired at {1}")]
    JwtExpired(u64, u64),

    /// A time claim is present but not a number of seconds.
    #[strum(to_string = "Malformed time claim {0}")]
    MalformedTimeClaim(&'static str),

    /// Required claim keys are missing from the reconstructed claims.
    #[strum(to_string = "Missing required claim keys: {0}")]
    MissingRequiredClaimKeys(VecDisplayWrapper<String>),
}

impl veil_error::CoreError for VerifyError {}

/// Errors raised by the key binding sub-protocol.
#[derive(strum_macros::Display, Debug, PartialEq, Eq, Clone)]
pub enum KeyBindingError {
    /// Key binding was required but no KB-JWT is attached.
    #[strum(to_string = "Key Binding JWT not exist")]
    MissingKeyBinding,

    /// The KB-JWT `typ` header is not `kb+jwt`.
    #[strum(to_string = "Invalid Key Binding JWT typ: {0}")]
    InvalidKbJwtTyp(String),

    /// Signing the KB-JWT failed.
    #[strum(to_string = "Key Binding JWT signing failed")]
    KbSigningFailed,

    /// The KB-JWT signature did not verify.
    #[strum(to_string = "Invalid Key Binding JWT signature")]
    InvalidKbJwtSignature,

    /// The KB-JWT nonce does not match the verifier's challenge.
    #[strum(to_string = "Invalid Key Binding JWT nonce: {0}")]
    InvalidKbJwtNonce(String),

    /// The `sd_hash` claim does not match the presented SD-JWT.
    #[strum(to_string = "Invalid sd_hash in Key Binding JWT")]
    InvalidSdHash,
}

impl veil_error::CoreError for KeyBindingError {}

/// Result type used across the crate.
pub type Result<T, E> = veil_error::Result<T, E>;
