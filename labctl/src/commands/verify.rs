use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use sigstore::cosign::signature_layers::{CertificateSubject, SignatureLayer};
use sigstore::cosign::{ClientBuilder, CosignCapabilities};
use sigstore::crypto::{CosignVerificationKey, Signature};
use sigstore::registry::{Auth, OciReference};
use tracing::debug;

use crate::args::RegistryArgs;
use crate::roots::FulcioRoots;
use crate::Labctl;

/// What was checked, printed as a header before the per-signature lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationChecks {
    pub claims: bool,
    /// A Rekor bundle was verified offline
    pub bundle_verified: bool,
    pub transparency_log: bool,
}

impl VerificationChecks {
    pub fn header(&self) -> Vec<&'static str> {
        let mut lines = vec!["Checks:", "✅ fulcio roots"];
        if self.claims {
            lines.push("✅ cosign claims");
        }
        if self.bundle_verified {
            lines.push("✅ offline transparency log");
        } else if self.transparency_log {
            lines.push("✅ online transparency log");
        }

        lines
    }
}

/// One keyless signature that passed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSignature {
    pub subject: Option<String>,
    pub issuer: Option<String>,
    /// The simple-signing payload as stored in the registry
    pub payload: Vec<u8>,
}

#[derive(Deserialize)]
struct SimpleSigningPayload {
    #[serde(default)]
    optional: Option<HashMap<String, serde_json::Value>>,
}

impl VerifiedSignature {
    /// Lines for stdout and stderr respectively
    pub fn report(&self) -> (Vec<String>, Vec<String>) {
        let mut out = Vec::new();
        let mut err = Vec::new();

        if let Some(subject) = &self.subject {
            out.push(format!("✅ subject: {subject}"));
        }
        if let Some(issuer) = self.issuer.as_deref().filter(|issuer| !issuer.is_empty()) {
            out.push(format!("✅ issuer: {issuer}"));
        }

        match serde_json::from_slice::<SimpleSigningPayload>(&self.payload) {
            Ok(payload) => {
                let signed_by = payload
                    .optional
                    .as_ref()
                    .and_then(|optional| optional.get("signed-by"))
                    .and_then(|value| value.as_str());
                if signed_by == Some("vcr.pub") {
                    out.push("✅ vcr.pub service side signature".to_string());
                }
            }
            Err(error) => err.push(format!("error decoding the payload: {error}")),
        }

        (out, err)
    }
}

impl From<&SignatureLayer> for VerifiedSignature {
    fn from(layer: &SignatureLayer) -> Self {
        let (subject, issuer) = match &layer.certificate_signature {
            Some(cert) => {
                let subject = match &cert.subject {
                    CertificateSubject::Email(email) => email.clone(),
                    CertificateSubject::Uri(uri) => uri.clone(),
                };
                (Some(subject), cert.issuer.clone())
            }
            None => (None, None),
        };

        VerifiedSignature {
            subject,
            issuer,
            payload: layer.raw_data.clone(),
        }
    }
}

fn sigstore_auth(args: &RegistryArgs) -> Auth {
    match args.password.as_deref() {
        Some(password) if !password.is_empty() => Auth::Basic(
            args.username.clone().unwrap_or_default(),
            password.to_string(),
        ),
        _ => Auth::Anonymous,
    }
}

/// Whether the base64 `signature` over `payload` was made with `key`
fn signed_by(key: &CosignVerificationKey, signature: Option<&str>, payload: &[u8]) -> bool {
    let Some(signature) = signature else {
        return false;
    };
    key.verify_signature(Signature::Base64Encoded(signature.as_bytes()), payload)
        .is_ok()
}

/// Layers whose signature was made with the key of their Fulcio certificate
fn keyless_layers(layers: &[SignatureLayer]) -> Vec<&SignatureLayer> {
    layers
        .iter()
        .filter(|layer| {
            let Some(cert) = &layer.certificate_signature else {
                return false;
            };
            let valid = signed_by(
                &cert.verification_key,
                layer.signature.as_deref(),
                &layer.raw_data,
            );
            if !valid {
                debug!(digest = %layer.oci_digest, "signature does not match its certificate");
            }
            valid
        })
        .collect()
}

/// Fetch and check the cosign signatures of `reference` against `roots`.
/// Only signatures backed by a Fulcio certificate count.
async fn verify_signatures(
    reference: &OciReference,
    auth: &Auth,
    roots: &FulcioRoots,
) -> Result<(VerificationChecks, Vec<VerifiedSignature>)> {
    let manual = roots.manual_trust_root();
    let builder = match (roots, &manual) {
        (FulcioRoots::Tuf(root), _) => ClientBuilder::default().with_trust_repository(root.as_ref()),
        (_, Some(manual)) => ClientBuilder::default().with_trust_repository(manual),
        (FulcioRoots::File { .. }, None) => return Err(anyhow!("error loading trust roots")),
    };
    let mut client = builder
        .context("error loading trust roots")?
        .build()
        .context("error creating cosign client")?;

    let (signature_image, source_digest) = client
        .triangulate(reference, auth)
        .await
        .context("error locating signatures")?;
    debug!(%signature_image, %source_digest, "found signature image");

    let layers = client
        .trusted_signature_layers(auth, &source_digest, &signature_image)
        .await
        .context("error verifying signatures")?;

    let keyless = keyless_layers(&layers);
    if keyless.is_empty() {
        return Err(anyhow!("no matching signatures"));
    }

    let checks = VerificationChecks {
        claims: true,
        bundle_verified: keyless.iter().any(|layer| layer.bundle.is_some()),
        transparency_log: roots.has_rekor_keys(),
    };

    Ok((
        checks,
        keyless.into_iter().map(VerifiedSignature::from).collect(),
    ))
}

impl Labctl {
    pub(crate) async fn verify_sig(&self, args: RegistryArgs) -> Result<()> {
        let reference: OciReference = args
            .reference
            .parse()
            .with_context(|| format!("error parse reference: {}", args.reference))?;
        let auth = sigstore_auth(&args);
        let roots = FulcioRoots::load().await?;

        let (checks, signatures) = verify_signatures(&reference, &auth, &roots).await?;

        for line in checks.header() {
            eprintln!("{line}");
        }
        for signature in signatures {
            let (out, err) = signature.report();
            for line in out {
                println!("{line}");
            }
            for line in err {
                eprintln!("{line}");
            }
        }

        Ok(())
    }
}
