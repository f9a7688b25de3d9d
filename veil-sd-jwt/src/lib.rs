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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate implements Selective Disclosure JSON Web Tokens.
//!
//! An issuer signs a payload whose selected claims are replaced by salted
//! digests; a holder selectively reveals a subset of the matching
//! disclosures; a verifier reconstructs the claims and checks the issuer's
//! signature -- which stays valid no matter which subset was revealed -- and
//! optionally a key-binding proof, in accordance with the IETF draft
//! [Selective Disclosure for JWTs (SD-JWT)][1].
//!
//! [1]: <https://datatracker.ietf.org/doc/html/draft-ietf-oauth-selective-disclosure-jwt>
//!
//! # Details
//!
//! The main components of this crate are the following.
//!
//! * [`SdJwtInstance`] -- the compact-serialization façade: configure the
//!   crypto capabilities once, then `issue`/`present`/`verify`/`validate`.
//! * [`SdJwtGeneralJsonInstance`] -- the same lifecycle over the general
//!   (multi-signature) JWS JSON serialization.
//! * [`pack`]/[`unpack`] -- the disclosure engine: the recursive transforms
//!   between a claim tree and its digest-substituted form.
//! * [`serialized`] -- the flattened and general JSON envelopes.
//! * [`traits`] -- the capability seams ([`Hasher`], [`Signer`],
//!   [`Verifier`], [`KbVerifier`], [`SaltGenerator`]) every deployment
//!   plugs its own cryptography into.
//!
//! # Examples
//!
//! ```no_run
//! use veil_sd_jwt::{
//!     DisclosureFrame, PresentationFrame, RngSaltGenerator, SdJwtConfig, SdJwtInstance,
//!     Sha2Hasher,
//! };
//!
//! # async fn example(
//! #     signer: Box<dyn veil_sd_jwt::Signer>,
//! #     verifier: Box<dyn veil_sd_jwt::Verifier>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let issuer = SdJwtInstance::new(SdJwtConfig {
//!     hasher: Some(Box::new(Sha2Hasher)),
//!     salt_generator: Some(Box::new(RngSaltGenerator::default())),
//!     signer: Some(signer),
//!     sign_alg: Some("ES256".to_owned()),
//!     verifier: Some(verifier),
//!     ..Default::default()
//! });
//!
//! let credential = issuer
//!     .issue(
//!         veil_sd_jwt::json_object!({
//!             "sub": "user_42",
//!             "given_name": "John",
//!             "family_name": "Doe",
//!         }),
//!         Some(&DisclosureFrame::from_value(&serde_json::json!({
//!             "_sd": ["given_name", "family_name"],
//!         }))?),
//!         None,
//!     )
//!     .await?;
//!
//! let presentation = issuer
//!     .present(
//!         &credential,
//!         Some(&PresentationFrame::from_value(&serde_json::json!({
//!             "given_name": true,
//!         }))?),
//!         None,
//!     )
//!     .await?;
//! # let _ = presentation;
//! # Ok(())
//! # }
//! ```

mod decoder;
mod encoder;
mod error;
mod instance;
mod jwt;
mod key_binding;
mod models;
mod sd_jwt;
pub mod serialized;
#[cfg(test)]
mod test_utils;
pub mod traits;
mod utils;

pub use decoder::unpack;
pub use encoder::pack;
pub use error::{
    ConfigError, DecodingError, Error, FormatError, KeyBindingError, PackError, Result,
    SignatureError, VerifyError,
};
pub use instance::{
    GeneralJsonSignerSpec, KbOptions, SdJwtConfig, SdJwtGeneralJsonInstance, SdJwtInstance,
    ValidatedGeneralJson, ValidatedSdJwt, VerifiedGeneralJson, VerifiedKeyBinding, VerifiedSdJwt,
};
pub use jwt::{Jwt, VerifyOptions};
pub use key_binding::{KbJwt, KbJwtClaims, KB_JWT_TYP};
pub use models::*;
pub use sd_jwt::SdJwt;
pub use traits::{
    BoxError, HashAlgorithm, Hasher, KbVerifier, RngSaltGenerator, SaltGenerator, Sha2Hasher,
    Signer, Verifier, DEFAULT_HASH_ALGORITHM, DEFAULT_SALT_LENGTH,
};
pub use utils::{base64_url_decode, base64_url_encode, VecDisplayWrapper};
