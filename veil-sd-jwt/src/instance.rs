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

//! The public façades tying configuration and the core together.
//!
//! An instance holds the configured capabilities and exposes the
//! issue/present/verify/validate lifecycle; all of the hard work is
//! delegated to the packer, unpacker, JWT and serialization modules.
//!
//! Within one `present` or `verify` call the order is fixed: signature
//! verification first, then claim reconstruction, then key binding checks --
//! the later steps assume the payload already passed the earlier ones.

use veil_error::traits::{ForeignBoxed, PropagateError};

use crate::{
    decoder, encoder,
    error::{
        ConfigError, DecodingError, Error, FormatError, KeyBindingError, SignatureError,
        VerifyError,
    },
    jwt::{Jwt, VerifyOptions},
    key_binding::{KbJwt, KbJwtClaims},
    models::{DisclosureFrame, PresentationFrame},
    sd_jwt::SdJwt,
    serialized::{FlattenJson, GeneralJson},
    traits::{
        HashAlgorithm, Hasher, KbVerifier, SaltGenerator, Signer, Verifier,
        DEFAULT_HASH_ALGORITHM,
    },
    utils::{self, VecDisplayWrapper},
    JsonObject, SD_ALG,
};

type Result<T> = veil_error::Result<T, Error>;

/// Capabilities and knobs of an [`SdJwtInstance`] or
/// [`SdJwtGeneralJsonInstance`].
///
/// Every capability is optional at construction; the first operation that
/// needs a missing one fails with that capability's own
/// [`ConfigError`], never a generic error.
#[derive(Default)]
pub struct SdJwtConfig {
    /// Leave the `typ` header out of issued credentials.
    pub omit_typ: bool,
    /// Digest capability, required by every operation.
    pub hasher: Option<Box<dyn Hasher>>,
    /// Hash algorithm for issuance; [`DEFAULT_HASH_ALGORITHM`] when absent.
    pub hash_alg: Option<HashAlgorithm>,
    /// Salt source for issuance.
    pub salt_generator: Option<Box<dyn SaltGenerator>>,
    /// Issuer signing capability.
    pub signer: Option<Box<dyn Signer>>,
    /// JWS `alg` header value written when signing.
    pub sign_alg: Option<String>,
    /// Issuer signature verification capability.
    pub verifier: Option<Box<dyn Verifier>>,
    /// Holder signing capability for Key Binding JWTs.
    pub kb_signer: Option<Box<dyn Signer>>,
    /// JWS `alg` header value for Key Binding JWTs.
    pub kb_sign_alg: Option<String>,
    /// Key Binding JWT verification capability.
    pub kb_verifier: Option<Box<dyn KbVerifier>>,
}

impl SdJwtConfig {
    fn hasher(&self) -> veil_error::Result<&dyn Hasher, ConfigError> {
        self.hasher
            .as_deref()
            .ok_or_else(|| veil_error::Error::root(ConfigError::MissingHasher))
    }

    fn salt_generator(&self) -> veil_error::Result<&dyn SaltGenerator, ConfigError> {
        self.salt_generator
            .as_deref()
            .ok_or_else(|| veil_error::Error::root(ConfigError::MissingSaltGenerator))
    }

    fn signer(&self) -> veil_error::Result<&dyn Signer, ConfigError> {
        self.signer
            .as_deref()
            .ok_or_else(|| veil_error::Error::root(ConfigError::MissingSigner))
    }

    fn sign_alg(&self) -> veil_error::Result<&str, ConfigError> {
        self.sign_alg
            .as_deref()
            .ok_or_else(|| veil_error::Error::root(ConfigError::MissingSignAlgorithm))
    }

    fn verifier(&self) -> veil_error::Result<&dyn Verifier, ConfigError> {
        self.verifier
            .as_deref()
            .ok_or_else(|| veil_error::Error::root(ConfigError::MissingVerifier))
    }

    fn kb_signer(&self) -> veil_error::Result<&dyn Signer, ConfigError> {
        self.kb_signer
            .as_deref()
            .ok_or_else(|| veil_error::Error::root(ConfigError::MissingKbSigner))
    }

    fn kb_sign_alg(&self) -> veil_error::Result<&str, ConfigError> {
        self.kb_sign_alg
            .as_deref()
            .ok_or_else(|| veil_error::Error::root(ConfigError::MissingKbSignAlgorithm))
    }

    fn kb_verifier(&self) -> veil_error::Result<&dyn KbVerifier, ConfigError> {
        self.kb_verifier
            .as_deref()
            .ok_or_else(|| veil_error::Error::root(ConfigError::MissingKbVerifier))
    }
}

/// The payload of a Key Binding JWT requested at presentation time, minus
/// the `sd_hash` claim which the instance computes itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KbOptions {
    /// Issuance time of the Key Binding JWT.
    pub iat: u64,
    /// The verifier the presentation is addressed to.
    pub aud: String,
    /// The verifier-chosen nonce.
    pub nonce: String,
}

/// Result of [`SdJwtInstance::validate`]: the reconstructed claims and the
/// verified JWT header.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSdJwt {
    /// The fully reconstructed claim set.
    pub payload: JsonObject,
    /// The issuer-signed JWT header.
    pub header: JsonObject,
}

/// Result of [`SdJwtInstance::verify`].
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedSdJwt {
    /// The fully reconstructed claim set.
    pub payload: JsonObject,
    /// The issuer-signed JWT header.
    pub header: JsonObject,
    /// The verified Key Binding JWT, when key binding was required.
    pub kb: Option<VerifiedKeyBinding>,
}

/// The parts of a successfully verified Key Binding JWT.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedKeyBinding {
    /// The KB-JWT header.
    pub header: JsonObject,
    /// The KB-JWT payload.
    pub payload: JsonObject,
}

/// The compact-serialization façade: issues, presents and verifies SD-JWTs
/// as `~`-separated strings.
///
/// An instance is cheap state: configuration plus an optional credential
/// `typ`. Operations take `&self` and share no mutable state, so one
/// instance may serve concurrent tasks; only [`SdJwtInstance::config_mut`]
/// mutates, and callers must serialize its use themselves.
pub struct SdJwtInstance {
    typ: Option<String>,
    config: SdJwtConfig,
}

impl SdJwtInstance {
    /// Create an instance with the given configuration and no credential
    /// type.
    pub fn new(config: SdJwtConfig) -> Self {
        Self { typ: None, config }
    }

    /// Create an instance that writes `typ` into issued credential headers
    /// (unless `omit_typ` is set).
    pub fn with_type(typ: impl Into<String>, config: SdJwtConfig) -> Self {
        Self {
            typ: Some(typ.into()),
            config,
        }
    }

    /// Mutable access to the configuration.
    ///
    /// This is the only write path of an instance; callers sharing an
    /// instance across tasks must not reconfigure it concurrently.
    pub fn config_mut(&mut self) -> &mut SdJwtConfig {
        &mut self.config
    }

    /// Issue a credential: conceal the claims selected by `frame`, sign, and
    /// return the compact serialization.
    ///
    /// The JWT header is `{..custom_header, typ?, alg}`; `_sd_alg` is added
    /// to the payload only when a frame was supplied.
    pub async fn issue(
        &self,
        payload: JsonObject,
        frame: Option<&DisclosureFrame>,
        custom_header: Option<JsonObject>,
    ) -> Result<String> {
        let hasher = self.config.hasher().match_err(config_error)?;
        let salt_generator = self.config.salt_generator().match_err(config_error)?;
        let sign_alg = self.config.sign_alg().match_err(config_error)?;
        let signer = self.config.signer().match_err(config_error)?;

        let hash_alg = self.config.hash_alg.unwrap_or(DEFAULT_HASH_ALGORITHM);

        let (mut packed, disclosures) =
            encoder::pack(payload, frame, hasher, hash_alg, salt_generator)
                .await
                .match_err(|error| Error::Pack(error.clone()))?;

        if frame.is_some() {
            packed.insert(SD_ALG.to_owned(), hash_alg.as_str().into());
        }

        let mut header = JsonObject::new();
        if !self.config.omit_typ {
            if let Some(typ) = &self.typ {
                header.insert("typ".to_owned(), typ.as_str().into());
            }
        }
        if let Some(custom_header) = custom_header {
            for (key, value) in custom_header {
                header.insert(key, value);
            }
        }
        header.insert("alg".to_owned(), sign_alg.into());

        let mut jwt = Jwt::new(header, packed);
        jwt.sign(signer)
            .await
            .match_err(|error| Error::Signature(error.clone()))?;

        SdJwt::new(jwt, disclosures, None)
            .encode()
            .match_err(|error| Error::Format(error.clone()))
    }

    /// Derive a presentation revealing only the claims selected by `frame`,
    /// optionally attaching a Key Binding JWT.
    ///
    /// With `kb` set, the `sd_hash` claim is computed over the presentation
    /// string without the KB-JWT segment, using the hash algorithm declared
    /// in the credential's `_sd_alg`.
    pub async fn present(
        &self,
        encoded: &str,
        frame: Option<&PresentationFrame>,
        kb: Option<&KbOptions>,
    ) -> Result<String> {
        let hasher = self.config.hasher().match_err(config_error)?;

        let sd_jwt = SdJwt::from_encode(encoded).match_err(|error| Error::Format(error.clone()))?;

        let mut presented = sd_jwt
            .present(frame, hasher)
            .await
            .match_err(|error| Error::Decoding(error.clone()))?;

        let Some(kb) = kb else {
            return presented
                .encode()
                .match_err(|error| Error::Format(error.clone()));
        };

        let kb_signer = self.config.kb_signer().match_err(config_error)?;
        let kb_sign_alg = self.config.kb_sign_alg().match_err(config_error)?;

        let without_kb = SdJwt::new(presented.jwt.clone(), presented.disclosures.clone(), None);
        let sd_hash = self.calculate_sd_hash(&without_kb, hasher).await?;

        let kb_jwt = KbJwt::sign_new(
            KbJwtClaims {
                iat: kb.iat,
                aud: kb.aud.clone(),
                nonce: kb.nonce.clone(),
                sd_hash,
            },
            kb_sign_alg,
            kb_signer,
        )
        .await
        .match_err(|error| Error::KeyBinding(error.clone()))?;

        presented.kb_jwt = Some(kb_jwt);
        presented
            .encode()
            .match_err(|error| Error::Format(error.clone()))
    }

    /// Verify a presentation: [`SdJwtInstance::validate`] first, then the
    /// optional required-claims and key binding checks.
    ///
    /// With `options.key_binding_nonce` set, a Key Binding JWT must be
    /// attached; its signature, nonce and `sd_hash` are each checked with a
    /// distinguishable error.
    pub async fn verify(&self, encoded: &str, options: &VerifyOptions) -> Result<VerifiedSdJwt> {
        let hasher = self.config.hasher().match_err(config_error)?;

        let sd_jwt = SdJwt::from_encode(encoded).match_err(|error| Error::Format(error.clone()))?;

        let validated = self.validate(encoded, options).await?;

        if !options.required_claim_keys.is_empty() {
            let keys = decoder::list_keys(&validated.payload);
            let missing: Vec<String> = options
                .required_claim_keys
                .iter()
                .filter(|required| !keys.contains(required))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(veil_error::Error::root(Error::Verify(
                    VerifyError::MissingRequiredClaimKeys(VecDisplayWrapper(missing)),
                )));
            }
        }

        let Some(nonce) = &options.key_binding_nonce else {
            return Ok(VerifiedSdJwt {
                payload: validated.payload,
                header: validated.header,
                kb: None,
            });
        };

        let Some(kb_jwt) = &sd_jwt.kb_jwt else {
            return Err(veil_error::Error::root(Error::KeyBinding(
                KeyBindingError::MissingKeyBinding,
            )));
        };
        let kb_verifier = self.config.kb_verifier().match_err(config_error)?;

        kb_jwt
            .verify_kb(kb_verifier, &validated.payload, nonce)
            .await
            .match_err(|error| Error::KeyBinding(error.clone()))?;

        // Bind the proof to this very presentation: recompute the digest
        // over the KB-JWT-stripped string and compare byte-exact.
        let without_kb = SdJwt::new(sd_jwt.jwt.clone(), sd_jwt.disclosures.clone(), None);
        let sd_hash = self.calculate_sd_hash(&without_kb, hasher).await?;
        if kb_jwt.sd_hash() != Some(sd_hash.as_str()) {
            return Err(veil_error::Error::root(Error::KeyBinding(
                KeyBindingError::InvalidSdHash,
            )));
        }

        Ok(VerifiedSdJwt {
            payload: validated.payload,
            header: validated.header,
            kb: Some(VerifiedKeyBinding {
                header: kb_jwt.header().clone(),
                payload: kb_jwt.payload().clone(),
            }),
        })
    }

    /// Validate a presentation without key binding: signature and time
    /// checks on the issuer-signed JWT, then full claim reconstruction.
    pub async fn validate(&self, encoded: &str, options: &VerifyOptions) -> Result<ValidatedSdJwt> {
        let hasher = self.config.hasher().match_err(config_error)?;
        let verifier = self.config.verifier().match_err(config_error)?;

        let sd_jwt = SdJwt::from_encode(encoded).match_err(|error| Error::Format(error.clone()))?;

        sd_jwt.jwt.verify(verifier, options).await?;

        let payload = sd_jwt
            .get_claims(hasher)
            .await
            .match_err(|error| Error::Decoding(error.clone()))?;

        Ok(ValidatedSdJwt {
            payload,
            header: sd_jwt.jwt.header().clone(),
        })
    }

    /// Parse a compact SD-JWT without any verification.
    pub fn decode(&self, encoded: &str) -> Result<SdJwt> {
        SdJwt::from_encode(encoded).match_err(|error| Error::Format(error.clone()))
    }

    /// Serialize an [`SdJwt`] into the compact form.
    pub fn encode(&self, sd_jwt: &SdJwt) -> Result<String> {
        sd_jwt
            .encode()
            .match_err(|error| Error::Format(error.clone()))
    }

    /// Every claim path of the reconstructed claims, dotted.
    pub async fn keys(&self, encoded: &str) -> Result<Vec<String>> {
        let hasher = self.config.hasher().match_err(config_error)?;
        let sd_jwt = self.decode(encoded)?;
        sd_jwt
            .keys(hasher)
            .await
            .match_err(|error| Error::Decoding(error.clone()))
    }

    /// The claim paths usable in a presentation frame, sorted.
    pub async fn presentable_keys(&self, encoded: &str) -> Result<Vec<String>> {
        let hasher = self.config.hasher().match_err(config_error)?;
        let sd_jwt = self.decode(encoded)?;
        sd_jwt
            .presentable_keys(hasher)
            .await
            .match_err(|error| Error::Decoding(error.clone()))
    }

    /// Reconstruct the full claim set, without signature verification.
    pub async fn get_claims(&self, encoded: &str) -> Result<JsonObject> {
        let hasher = self.config.hasher().match_err(config_error)?;
        let sd_jwt = self.decode(encoded)?;
        sd_jwt
            .get_claims(hasher)
            .await
            .match_err(|error| Error::Decoding(error.clone()))
    }

    /// View a compact SD-JWT as its flattened JSON serialization.
    pub fn to_flatten_json(&self, encoded: &str) -> Result<FlattenJson> {
        FlattenJson::from_encode(encoded).match_err(|error| Error::Format(error.clone()))
    }

    /// View a compact SD-JWT as its general JSON serialization.
    pub fn to_general_json(&self, encoded: &str) -> Result<GeneralJson> {
        GeneralJson::from_encode(encoded).match_err(|error| Error::Format(error.clone()))
    }

    async fn calculate_sd_hash(&self, without_kb: &SdJwt, hasher: &dyn Hasher) -> Result<String> {
        let alg = decoder::fetch_hash_algorithm(without_kb.jwt.payload())
            .match_err(|error| Error::Decoding(error.clone()))?;

        let presentation = without_kb
            .encode()
            .match_err(|error| Error::Format(error.clone()))?;

        utils::base64_url_digest(presentation.as_bytes(), hasher, alg)
            .await
            .foreign_boxed_err(|| Error::Decoding(DecodingError::HashingFailed))
    }
}

/// One signer of a multi-signature issuance.
pub struct GeneralJsonSignerSpec<'a> {
    /// The signing capability.
    pub signer: &'a dyn Signer,
    /// JWS `alg` header value for this signature.
    pub alg: String,
    /// Key identifier, written into both headers.
    pub kid: Option<String>,
    /// Extra protected header entries.
    pub header: Option<JsonObject>,
}

/// Result of [`SdJwtGeneralJsonInstance::validate`]: the reconstructed
/// claims and one decoded protected header per signature.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedGeneralJson {
    /// The fully reconstructed claim set.
    pub payload: JsonObject,
    /// Decoded protected headers, one per signature.
    pub headers: Vec<JsonObject>,
}

/// Result of [`SdJwtGeneralJsonInstance::verify`].
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedGeneralJson {
    /// The fully reconstructed claim set.
    pub payload: JsonObject,
    /// Decoded protected headers, one per signature.
    pub headers: Vec<JsonObject>,
    /// The verified Key Binding JWT, when key binding was required.
    pub kb: Option<VerifiedKeyBinding>,
}

/// The general-JSON façade: one payload, any number of signatures.
///
/// Verification requires **all** signatures to be valid; a single failure
/// fails the whole call.
pub struct SdJwtGeneralJsonInstance {
    typ: Option<String>,
    config: SdJwtConfig,
}

impl SdJwtGeneralJsonInstance {
    /// Create an instance with the given configuration and no credential
    /// type.
    pub fn new(config: SdJwtConfig) -> Self {
        Self { typ: None, config }
    }

    /// Create an instance that writes `typ` into issued protected headers.
    pub fn with_type(typ: impl Into<String>, config: SdJwtConfig) -> Self {
        Self {
            typ: Some(typ.into()),
            config,
        }
    }

    /// Mutable access to the configuration; see
    /// [`SdJwtInstance::config_mut`].
    pub fn config_mut(&mut self) -> &mut SdJwtConfig {
        &mut self.config
    }

    /// Issue a credential signed by every signer in `sigs` over one packed
    /// payload.
    pub async fn issue(
        &self,
        payload: JsonObject,
        frame: Option<&DisclosureFrame>,
        sigs: &[GeneralJsonSignerSpec<'_>],
    ) -> Result<GeneralJson> {
        let hasher = self.config.hasher().match_err(config_error)?;
        let salt_generator = self.config.salt_generator().match_err(config_error)?;
        if sigs.is_empty() {
            return Err(veil_error::Error::root(Error::Config(
                ConfigError::MissingSigner,
            )));
        }

        let hash_alg = self.config.hash_alg.unwrap_or(DEFAULT_HASH_ALGORITHM);

        let (mut packed, disclosures) =
            encoder::pack(payload, frame, hasher, hash_alg, salt_generator)
                .await
                .match_err(|error| Error::Pack(error.clone()))?;

        if frame.is_some() {
            packed.insert(SD_ALG.to_owned(), hash_alg.as_str().into());
        }

        let encoded_payload = utils::base64_url_encode(
            serde_json::to_string(&packed).expect("serializing JSON objects cannot fail"),
        );

        let mut general = GeneralJson {
            payload: encoded_payload,
            disclosures: disclosures
                .into_iter()
                .map(|disclosure| disclosure.into_string())
                .collect(),
            kb_jwt: None,
            signatures: Vec::new(),
        };

        for spec in sigs {
            let mut protected = JsonObject::new();
            if !self.config.omit_typ {
                if let Some(typ) = &self.typ {
                    protected.insert("typ".to_owned(), typ.as_str().into());
                }
            }
            protected.insert("alg".to_owned(), spec.alg.as_str().into());
            if let Some(kid) = &spec.kid {
                protected.insert("kid".to_owned(), kid.as_str().into());
            }
            if let Some(extra) = &spec.header {
                for (key, value) in extra {
                    protected.insert(key.clone(), value.clone());
                }
            }

            general
                .add_signature(protected, spec.signer, spec.kid.clone())
                .await
                .match_err(|error| Error::Signature(error.clone()))?;
        }

        Ok(general)
    }

    /// Derive a presentation from a general-JSON credential, optionally
    /// attaching a Key Binding JWT.
    ///
    /// All signatures are carried over; disclosure selection runs through
    /// the first signature's compact projection.
    pub async fn present(
        &self,
        general: &GeneralJson,
        frame: Option<&PresentationFrame>,
        kb: Option<&KbOptions>,
    ) -> Result<GeneralJson> {
        let hasher = self.config.hasher().match_err(config_error)?;

        let compact = general
            .to_encoded(0)
            .match_err(|error| Error::Format(error.clone()))?;
        let sd_jwt = SdJwt::from_encode(&compact).match_err(|error| Error::Format(error.clone()))?;

        let presented = sd_jwt
            .present(frame, hasher)
            .await
            .match_err(|error| Error::Decoding(error.clone()))?;

        let mut result = GeneralJson {
            payload: general.payload.clone(),
            disclosures: presented
                .disclosures
                .iter()
                .map(|disclosure| disclosure.as_str().to_owned())
                .collect(),
            kb_jwt: None,
            signatures: general.signatures.clone(),
        };

        let Some(kb) = kb else {
            return Ok(result);
        };

        let kb_signer = self.config.kb_signer().match_err(config_error)?;
        let kb_sign_alg = self.config.kb_sign_alg().match_err(config_error)?;

        let without_kb = SdJwt::new(presented.jwt.clone(), presented.disclosures.clone(), None);
        let sd_hash = self.calculate_sd_hash(&without_kb, hasher).await?;

        let kb_jwt = KbJwt::sign_new(
            KbJwtClaims {
                iat: kb.iat,
                aud: kb.aud.clone(),
                nonce: kb.nonce.clone(),
                sd_hash,
            },
            kb_sign_alg,
            kb_signer,
        )
        .await
        .match_err(|error| Error::KeyBinding(error.clone()))?;

        result.kb_jwt = Some(
            kb_jwt
                .encode()
                .match_err(|error| Error::Format(error.clone()))?,
        );

        Ok(result)
    }

    /// Verify a general-JSON presentation: [`SdJwtGeneralJsonInstance::validate`]
    /// first, then the optional required-claims and key binding checks.
    pub async fn verify(
        &self,
        general: &GeneralJson,
        options: &VerifyOptions,
    ) -> Result<VerifiedGeneralJson> {
        let hasher = self.config.hasher().match_err(config_error)?;

        let validated = self.validate(general).await?;

        if !options.required_claim_keys.is_empty() {
            let keys = decoder::list_keys(&validated.payload);
            let missing: Vec<String> = options
                .required_claim_keys
                .iter()
                .filter(|required| !keys.contains(required))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(veil_error::Error::root(Error::Verify(
                    VerifyError::MissingRequiredClaimKeys(VecDisplayWrapper(missing)),
                )));
            }
        }

        let Some(nonce) = &options.key_binding_nonce else {
            return Ok(VerifiedGeneralJson {
                payload: validated.payload,
                headers: validated.headers,
                kb: None,
            });
        };

        let Some(kb_token) = &general.kb_jwt else {
            return Err(veil_error::Error::root(Error::KeyBinding(
                KeyBindingError::MissingKeyBinding,
            )));
        };
        let kb_verifier = self.config.kb_verifier().match_err(config_error)?;

        let kb_jwt =
            KbJwt::from_encode(kb_token).match_err(|error| Error::Format(error.clone()))?;
        kb_jwt
            .verify_kb(kb_verifier, &validated.payload, nonce)
            .await
            .match_err(|error| Error::KeyBinding(error.clone()))?;

        let compact = general
            .to_encoded(0)
            .match_err(|error| Error::Format(error.clone()))?;
        let sd_jwt = SdJwt::from_encode(&compact).match_err(|error| Error::Format(error.clone()))?;
        let without_kb = SdJwt::new(sd_jwt.jwt.clone(), sd_jwt.disclosures.clone(), None);
        let sd_hash = self.calculate_sd_hash(&without_kb, hasher).await?;
        if kb_jwt.sd_hash() != Some(sd_hash.as_str()) {
            return Err(veil_error::Error::root(Error::KeyBinding(
                KeyBindingError::InvalidSdHash,
            )));
        }

        Ok(VerifiedGeneralJson {
            payload: validated.payload,
            headers: validated.headers,
            kb: Some(VerifiedKeyBinding {
                header: kb_jwt.header().clone(),
                payload: kb_jwt.payload().clone(),
            }),
        })
    }

    /// Check every signature over the shared payload and reconstruct the
    /// claims.
    ///
    /// All signatures must verify; any single failure fails the call.
    pub async fn validate(&self, general: &GeneralJson) -> Result<ValidatedGeneralJson> {
        let hasher = self.config.hasher().match_err(config_error)?;
        let verifier = self.config.verifier().match_err(config_error)?;

        let mut headers = Vec::with_capacity(general.signatures.len());
        for entry in &general.signatures {
            let signing_input = format!("{}.{}", entry.protected, general.payload);

            let verified = verifier
                .verify(&signing_input, &entry.signature)
                .await
                .foreign_boxed_err(|| Error::Signature(SignatureError::InvalidJwtSignature))?;
            if !verified {
                return Err(veil_error::Error::root(Error::Signature(
                    SignatureError::InvalidJwtSignature,
                )));
            }

            headers.push(decode_protected_header(&entry.protected)?);
        }

        let compact = general
            .to_encoded(0)
            .match_err(|error| Error::Format(error.clone()))?;
        let sd_jwt = SdJwt::from_encode(&compact).match_err(|error| Error::Format(error.clone()))?;

        let payload = sd_jwt
            .get_claims(hasher)
            .await
            .match_err(|error| Error::Decoding(error.clone()))?;

        Ok(ValidatedGeneralJson { payload, headers })
    }

    /// Every claim path of the reconstructed claims, dotted.
    pub async fn keys(&self, general: &GeneralJson) -> Result<Vec<String>> {
        let hasher = self.config.hasher().match_err(config_error)?;
        self.to_sd_jwt(general)?
            .keys(hasher)
            .await
            .match_err(|error| Error::Decoding(error.clone()))
    }

    /// The claim paths usable in a presentation frame, sorted.
    pub async fn presentable_keys(&self, general: &GeneralJson) -> Result<Vec<String>> {
        let hasher = self.config.hasher().match_err(config_error)?;
        self.to_sd_jwt(general)?
            .presentable_keys(hasher)
            .await
            .match_err(|error| Error::Decoding(error.clone()))
    }

    /// Reconstruct the full claim set, without signature verification.
    pub async fn get_claims(&self, general: &GeneralJson) -> Result<JsonObject> {
        let hasher = self.config.hasher().match_err(config_error)?;
        self.to_sd_jwt(general)?
            .get_claims(hasher)
            .await
            .match_err(|error| Error::Decoding(error.clone()))
    }

    /// Parse a compact SD-JWT into its general JSON view, without any
    /// verification.
    pub fn decode(&self, encoded: &str) -> Result<GeneralJson> {
        GeneralJson::from_encode(encoded).match_err(|error| Error::Format(error.clone()))
    }

    /// The single-signature projection used for claim reconstruction.
    fn to_sd_jwt(&self, general: &GeneralJson) -> Result<SdJwt> {
        let compact = general
            .to_encoded(0)
            .match_err(|error| Error::Format(error.clone()))?;
        SdJwt::from_encode(&compact).match_err(|error| Error::Format(error.clone()))
    }

    /// Project the signature at `index` of a general JSON credential into
    /// the compact serialization.
    pub fn encode(&self, general: &GeneralJson, index: usize) -> Result<String> {
        general
            .to_encoded(index)
            .match_err(|error| Error::Format(error.clone()))
    }

    async fn calculate_sd_hash(&self, without_kb: &SdJwt, hasher: &dyn Hasher) -> Result<String> {
        let alg = decoder::fetch_hash_algorithm(without_kb.jwt.payload())
            .match_err(|error| Error::Decoding(error.clone()))?;

        let presentation = without_kb
            .encode()
            .match_err(|error| Error::Format(error.clone()))?;

        utils::base64_url_digest(presentation.as_bytes(), hasher, alg)
            .await
            .foreign_boxed_err(|| Error::Decoding(DecodingError::HashingFailed))
    }
}

fn config_error(error: &ConfigError) -> Error {
    Error::Config(error.clone())
}

fn decode_protected_header(protected: &str) -> Result<JsonObject> {
    let bytes = utils::base64_url_decode(protected)
        .map_err(|_| veil_error::Error::root(Error::Format(FormatError::NonParseableJwt)))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|_| veil_error::Error::root(Error::Format(FormatError::NonParseableJwt)))?;
    match value {
        serde_json::Value::Object(object) => Ok(object),
        _ => Err(veil_error::Error::root(Error::Format(
            FormatError::NonParseableJwt,
        ))),
    }
}
