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

//! Issue a credential with concealed claims, present a subset, verify it.
//!
//! Real deployments plug in asymmetric signers; to keep the example
//! self-contained, signatures here are symbolic (a keyed transcript of the
//! signing input).

use futures::future::{ready, BoxFuture};
use serde_json::json;
use veil_sd_jwt::{
    json_object, BoxError, DisclosureFrame, PresentationFrame, RngSaltGenerator, SdJwtConfig,
    SdJwtInstance, Sha2Hasher, Signer, Verifier, VerifyOptions,
};

struct ExampleSigner;

impl Signer for ExampleSigner {
    fn sign<'a>(&'a self, signing_input: &'a str) -> BoxFuture<'a, Result<String, BoxError>> {
        let signature = veil_sd_jwt::base64_url_encode(format!("example:{signing_input}"));
        Box::pin(ready(Ok(signature)))
    }
}

struct ExampleVerifier;

impl Verifier for ExampleVerifier {
    fn verify<'a>(
        &'a self,
        signing_input: &'a str,
        signature: &'a str,
    ) -> BoxFuture<'a, Result<bool, BoxError>> {
        let expected = veil_sd_jwt::base64_url_encode(format!("example:{signing_input}"));
        Box::pin(ready(Ok(signature == expected)))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let instance = SdJwtInstance::with_type(
        "example+sd-jwt",
        SdJwtConfig {
            hasher: Some(Box::new(Sha2Hasher)),
            salt_generator: Some(Box::new(RngSaltGenerator::default())),
            signer: Some(Box::new(ExampleSigner)),
            sign_alg: Some("ES256".to_owned()),
            verifier: Some(Box::new(ExampleVerifier)),
            ..Default::default()
        },
    );

    // The issuer conceals everything except `id`.
    let credential = instance
        .issue(
            json_object!({
                "id": "1234",
                "firstname": "John",
                "lastname": "Doe",
                "ssn": "123-45-6789",
            }),
            Some(&DisclosureFrame::from_value(&json!({
                "_sd": ["firstname", "lastname", "ssn"],
            }))?),
            None,
        )
        .await?;
    println!("issued credential:\n{credential}\n");

    // The holder reveals the first name only.
    let presentation = instance
        .present(
            &credential,
            Some(&PresentationFrame::from_value(&json!({
                "firstname": true,
            }))?),
            None,
        )
        .await?;
    println!("presentation:\n{presentation}\n");

    // The verifier checks the signature and reconstructs the claims.
    let verified = instance
        .verify(
            &presentation,
            &VerifyOptions {
                required_claim_keys: vec!["firstname".to_owned()],
                ..Default::default()
            },
        )
        .await?;
    println!(
        "verified claims:\n{}",
        serde_json::to_string_pretty(&verified.payload)?
    );

    Ok(())
}
