use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use oci_client::client::{ClientConfig, ClientProtocol};
use oci_client::manifest::{
    OciImageIndex, OciImageManifest, IMAGE_MANIFEST_LIST_MEDIA_TYPE, IMAGE_MANIFEST_MEDIA_TYPE,
    OCI_IMAGE_INDEX_MEDIA_TYPE, OCI_IMAGE_MEDIA_TYPE,
};
use oci_client::secrets::RegistryAuth;
use oci_client::{Client, Reference};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::args::RegistryArgs;
use crate::Labctl;

const ACCEPTED_MANIFEST_TYPES: &[&str] = &[
    OCI_IMAGE_INDEX_MEDIA_TYPE,
    OCI_IMAGE_MEDIA_TYPE,
    IMAGE_MANIFEST_LIST_MEDIA_TYPE,
    IMAGE_MANIFEST_MEDIA_TYPE,
];

/// Summary of the manifest a reference resolved to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    pub annotations: BTreeMap<String, String>,
    pub digest: String,
    #[serde(rename = "media-type")]
    pub media_type: String,
}

/// A manifest decoded according to its media type
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Manifest {
    Index(OciImageIndex),
    Image(OciImageManifest),
}

/// The fields needed to tell manifest kinds apart before decoding
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestShape {
    media_type: Option<String>,
    manifests: Option<serde_json::Value>,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
}

/// Decode a raw manifest body. OCI manifests may leave out `mediaType`, in
/// which case an index is recognised by its `manifests` list.
pub fn parse_manifest(digest: &str, body: &[u8]) -> Result<(Descriptor, Manifest)> {
    let shape: ManifestShape = serde_json::from_slice(body).context("error parsing manifest")?;

    let media_type = match shape.media_type {
        Some(media_type) => media_type,
        None if shape.manifests.is_some() => OCI_IMAGE_INDEX_MEDIA_TYPE.to_string(),
        None => OCI_IMAGE_MEDIA_TYPE.to_string(),
    };

    let manifest = match media_type.as_str() {
        IMAGE_MANIFEST_LIST_MEDIA_TYPE | OCI_IMAGE_INDEX_MEDIA_TYPE => Manifest::Index(
            serde_json::from_slice(body).context("error parsing manifest")?,
        ),
        IMAGE_MANIFEST_MEDIA_TYPE | OCI_IMAGE_MEDIA_TYPE => Manifest::Image(
            serde_json::from_slice(body).context("error parsing manifest")?,
        ),
        other => return Err(anyhow!("unknown media-type: {other}")),
    };

    Ok((
        Descriptor {
            annotations: shape.annotations,
            digest: digest.to_string(),
            media_type,
        },
        manifest,
    ))
}

/// Basic credentials when a password was given, anonymous access otherwise
pub(crate) fn registry_auth(args: &RegistryArgs) -> RegistryAuth {
    match args.password.as_deref() {
        Some(password) if !password.is_empty() => RegistryAuth::Basic(
            args.username.clone().unwrap_or_default(),
            password.to_string(),
        ),
        _ => RegistryAuth::Anonymous,
    }
}

/// Registries on the loopback interface are spoken to over plain HTTP
fn registry_protocol(reference: &Reference) -> ClientProtocol {
    let registry = reference.resolve_registry();
    let host = registry.rsplit_once(':').map_or(registry, |(host, _)| host);
    match host {
        "localhost" | "127.0.0.1" | "[::1]" => {
            ClientProtocol::HttpsExcept(vec![registry.to_string()])
        }
        _ => ClientProtocol::Https,
    }
}

fn registry_client(reference: &Reference) -> Client {
    Client::new(ClientConfig {
        protocol: registry_protocol(reference),
        ..Default::default()
    })
}

fn parse_reference(reference: &str) -> Result<Reference> {
    reference
        .parse()
        .with_context(|| format!("error parse reference: {reference}"))
}

/// Pull the manifest `reference` points at
pub async fn fetch_manifest(
    reference: &Reference,
    auth: &RegistryAuth,
) -> Result<(Descriptor, Manifest)> {
    debug!(%reference, "pulling manifest");
    let (body, digest) = registry_client(reference)
        .pull_manifest_raw(reference, auth, ACCEPTED_MANIFEST_TYPES)
        .await
        .context("error reading manifest")?;

    parse_manifest(&digest, body.as_ref())
}

/// Pull the image config of the manifest `reference` points at
pub async fn fetch_config(
    reference: &Reference,
    auth: &RegistryAuth,
) -> Result<serde_json::Value> {
    debug!(%reference, "pulling manifest and config");
    let (_manifest, _digest, config) = registry_client(reference)
        .pull_manifest_and_config(reference, auth)
        .await
        .context("error reading manifest")?;

    serde_json::from_str(&config).context("error parsing config information")
}

impl Labctl {
    pub(crate) async fn read_manifest(&self, args: RegistryArgs) -> Result<()> {
        let reference = parse_reference(&args.reference)?;
        let (descriptor, manifest) = fetch_manifest(&reference, &registry_auth(&args)).await?;

        println!("Descriptor:");
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        println!("Manifest:");
        println!("{}", serde_json::to_string_pretty(&manifest)?);

        Ok(())
    }

    pub(crate) async fn read_config(&self, args: RegistryArgs) -> Result<()> {
        let reference = parse_reference(&args.reference)?;
        let config = fetch_config(&reference, &registry_auth(&args)).await?;

        println!("{}", serde_json::to_string_pretty(&config)?);

        Ok(())
    }
}
