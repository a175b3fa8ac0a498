use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use lab47_api_client::{LabApiClient, ToBodyContent};
use lab47_common::constants::{FULCIO_URL, OIDC_ISSUER_URL};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::Labctl;

/// DER prefix of a SubjectPublicKeyInfo for an uncompressed P-256 point
const P256_SPKI_PREFIX: [u8; 26] = [
    0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08, 0x2a,
    0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00,
];

#[derive(Deserialize)]
struct ProviderMetadata {
    issuer: String,
    jwks_uri: String,
}

/// Check `jwt` against the keys `issuer` publishes through OIDC discovery and
/// return its claims. The audience is not checked.
pub async fn validate_token(
    client: &LabApiClient,
    issuer: &str,
    jwt: &str,
) -> Result<serde_json::Value> {
    let issuer = issuer.trim_end_matches('/');

    let metadata: ProviderMetadata = client
        .get(format!("{issuer}/.well-known/openid-configuration"))
        .await?
        .to_json()
        .await
        .context("error fetching provider configuration")?
        .into_inner();
    if metadata.issuer.trim_end_matches('/') != issuer {
        bail!(
            "issuer did not match the issuer returned by provider, expected {issuer:?} got {:?}",
            metadata.issuer
        );
    }

    let keys: JwkSet = client
        .get(&metadata.jwks_uri)
        .await?
        .to_json()
        .await
        .context("error fetching provider keys")?
        .into_inner();

    let header = decode_header(jwt).context("malformed jwt")?;
    let jwk = match header.kid.as_deref() {
        Some(kid) => keys.find(kid),
        None if keys.keys.len() == 1 => keys.keys.first(),
        None => None,
    }
    .ok_or_else(|| anyhow!("no key in {} matches the token", metadata.jwks_uri))?;
    let key = DecodingKey::from_jwk(jwk).context("unsupported provider key")?;

    let mut validation = Validation::new(header.alg);
    validation.validate_aud = false;
    validation.set_issuer(&[issuer]);

    let data = decode::<serde_json::Value>(jwt, &key, &validation)
        .context("failed to verify signature")?;

    Ok(data.claims)
}

/// The `sub` claim, read without checking the signature
fn unverified_subject(jwt: &str) -> Result<String> {
    #[derive(Deserialize)]
    struct Claims {
        #[serde(default)]
        sub: String,
    }

    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(jwt, &DecodingKey::from_secret(&[]), &validation)
        .context("malformed jwt")?;

    Ok(data.claims.sub)
}

/// DER SubjectPublicKeyInfo for an uncompressed P-256 public key
pub(crate) fn p256_spki_der(public_key: &[u8]) -> Vec<u8> {
    let mut der = Vec::with_capacity(P256_SPKI_PREFIX.len() + public_key.len());
    der.extend_from_slice(&P256_SPKI_PREFIX);
    der.extend_from_slice(public_key);

    der
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CertificateRequest {
    public_key: CertificatePublicKey,
    signed_email_address: String,
}

#[derive(Serialize)]
struct CertificatePublicKey {
    content: String,
    algorithm: &'static str,
}

/// A short-lived certificate chain issued by Fulcio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningCert {
    /// PEM, leaf first
    pub chain: String,
    /// The signed certificate timestamp, when Fulcio sent one
    pub sct: Option<String>,
}

/// Generate a throwaway P-256 key and have the Fulcio instance at
/// `fulcio_url` certify it for the identity in `jwt`.
pub async fn request_signing_cert(
    client: &LabApiClient,
    fulcio_url: &str,
    jwt: &str,
) -> Result<SigningCert> {
    let subject = unverified_subject(jwt)?;
    debug!(%subject, "requesting signing certificate");

    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
        .map_err(|_| anyhow!("error generating signing key"))?;
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
        .map_err(|error| anyhow!("error loading signing key: {error}"))?;

    // proof of possession: the subject, signed with the new key
    let proof = key_pair
        .sign(&rng, subject.as_bytes())
        .map_err(|_| anyhow!("error signing the subject"))?;

    let request = CertificateRequest {
        public_key: CertificatePublicKey {
            content: STANDARD.encode(p256_spki_der(key_pair.public_key().as_ref())),
            algorithm: "ecdsa",
        },
        signed_email_address: STANDARD.encode(proof.as_ref()),
    };

    let mut headers = HeaderMap::new();
    let mut bearer = HeaderValue::from_str(&format!("Bearer {jwt}"))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);

    let url = format!("{}/api/v1/signingCert", fulcio_url.trim_end_matches('/'));
    let response = client
        .perform(Method::POST, url, Some(headers), Some(request))
        .await?
        .error_for_api_status()
        .await
        .context("error requesting signing certificate")?;

    let sct = response
        .headers()
        .get("SCT")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    trace!(has_sct = sct.is_some(), "signing certificate issued");

    let chain = response
        .text()
        .await
        .context("error reading signing certificate")?;

    Ok(SigningCert { chain, sct })
}

impl Labctl {
    async fn fetch_personal_token(&self, client: &LabApiClient) -> Result<String> {
        let token = self.ctx.token()?;

        let jwt = client
            .personal_token(&token)
            .await
            .context("error requesting personal token")?
            .into_inner()
            .jwt;

        Ok(jwt)
    }

    pub(crate) async fn personal_token(&self, validate: bool) -> Result<()> {
        let client = self.ctx.make_api_client()?;
        let jwt = self.fetch_personal_token(&client).await?;

        println!("{jwt}");

        if validate {
            let claims = validate_token(&client, OIDC_ISSUER_URL, &jwt).await?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }

        Ok(())
    }

    pub(crate) async fn fulcio_cert(&self) -> Result<()> {
        let client = self.ctx.make_api_client()?;
        let jwt = self.fetch_personal_token(&client).await?;

        let cert = request_signing_cert(&client, FULCIO_URL, &jwt).await?;

        println!("{}", cert.chain);
        if let Some(sct) = cert.sct {
            println!("{sct}");
        }

        Ok(())
    }
}
