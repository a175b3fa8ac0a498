//! Fulcio root certificates used to check keyless signatures.
//!
//! `SIGSTORE_ROOT_FILE` names a PEM bundle that replaces the roots Sigstore
//! distributes over TUF. Bundles are still checked against Rekor keys, read
//! from `SIGSTORE_REKOR_PUBLIC_KEY` when set and from TUF otherwise.

use std::fs;
use std::path::{Path, PathBuf};

use lab47_common::constants::{REKOR_KEY_ENV, ROOT_FILE_ENV};
use rustls_pki_types::CertificateDer;
use sigstore::errors::SigstoreError;
use sigstore::trust::sigstore::SigstoreTrustRoot;
use sigstore::trust::{ManualTrustRoot, TrustRoot};
use tracing::{debug, trace};

#[derive(Debug, thiserror::Error)]
pub enum RootsError {
    #[error("error reading root PEM file: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error parsing root PEM file: {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: pem::PemError,
    },
    #[error("error creating root cert pool: no certificates in {}", path.display())]
    NoCertificates { path: PathBuf },
    #[error("no public keys in {}", path.display())]
    NoPublicKeys { path: PathBuf },
    #[error("error fetching the Sigstore trust root")]
    Tuf(#[source] SigstoreError),
}

pub enum FulcioRoots {
    /// Certificates from the bundle named by `SIGSTORE_ROOT_FILE`
    File {
        certs: Vec<CertificateDer<'static>>,
        /// DER public keys of the Rekor instances bundles may come from
        rekor_keys: Vec<Vec<u8>>,
    },
    /// The public-good instance's trust root, including its Rekor keys
    Tuf(Box<SigstoreTrustRoot>),
}

fn path_from_env(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

async fn fetch_tuf_root() -> Result<SigstoreTrustRoot, RootsError> {
    debug!("fetching the Sigstore trust root over TUF");
    SigstoreTrustRoot::new(None).await.map_err(RootsError::Tuf)
}

impl FulcioRoots {
    /// Resolve the roots from the environment
    pub async fn load() -> Result<Self, RootsError> {
        Self::from_source(path_from_env(ROOT_FILE_ENV), path_from_env(REKOR_KEY_ENV)).await
    }

    pub async fn from_source(
        root_file: Option<PathBuf>,
        rekor_key_file: Option<PathBuf>,
    ) -> Result<Self, RootsError> {
        let Some(path) = root_file else {
            return Ok(FulcioRoots::Tuf(Box::new(fetch_tuf_root().await?)));
        };

        debug!(path = %path.display(), "using Fulcio roots from file");
        let certs = load_pem_roots(&path)?;

        let rekor_keys = match rekor_key_file {
            Some(path) => {
                debug!(path = %path.display(), "using Rekor keys from file");
                load_pem_public_keys(&path)?
            }
            None => fetch_tuf_root()
                .await?
                .rekor_keys()
                .map_err(RootsError::Tuf)?
                .into_iter()
                .map(|key| key.to_vec())
                .collect(),
        };

        Ok(FulcioRoots::File { certs, rekor_keys })
    }

    /// Whether signatures can be checked against a transparency log
    pub fn has_rekor_keys(&self) -> bool {
        match self {
            FulcioRoots::File { rekor_keys, .. } => !rekor_keys.is_empty(),
            FulcioRoots::Tuf(_) => true,
        }
    }

    /// The trust root handed to the cosign client in file mode
    pub fn manual_trust_root(&self) -> Option<ManualTrustRoot<'static>> {
        match self {
            FulcioRoots::File { certs, rekor_keys } => Some(ManualTrustRoot {
                fulcio_certs: certs.clone(),
                rekor_keys: rekor_keys.clone(),
                ctfe_keys: Vec::new(),
            }),
            FulcioRoots::Tuf(_) => None,
        }
    }
}

fn read_pem_blocks(path: &Path) -> Result<Vec<pem::Pem>, RootsError> {
    let raw = fs::read(path).map_err(|source| RootsError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    pem::parse_many(raw).map_err(|source| RootsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Every `PUBLIC KEY` block in the PEM file at `path`, as DER
pub fn load_pem_public_keys(path: &Path) -> Result<Vec<Vec<u8>>, RootsError> {
    let keys: Vec<_> = read_pem_blocks(path)?
        .into_iter()
        .filter(|block| block.tag() == "PUBLIC KEY")
        .map(|block| block.into_contents())
        .collect();

    if keys.is_empty() {
        return Err(RootsError::NoPublicKeys {
            path: path.to_path_buf(),
        });
    }

    Ok(keys)
}

/// Every `CERTIFICATE` block in the PEM file at `path`
pub fn load_pem_roots(path: &Path) -> Result<Vec<CertificateDer<'static>>, RootsError> {
    let certs: Vec<_> = read_pem_blocks(path)?
        .into_iter()
        .filter(|block| block.tag() == "CERTIFICATE")
        .map(|block| CertificateDer::from(block.into_contents()))
        .collect();
    trace!(count = certs.len(), "parsed root certificates");

    if certs.is_empty() {
        return Err(RootsError::NoCertificates {
            path: path.to_path_buf(),
        });
    }

    Ok(certs)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn pem_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_pem_roots(Path::new("/definitely/not/here.pem")).unwrap_err();

        assert!(matches!(err, RootsError::Read { .. }), "got {err:?}");
    }

    #[test]
    fn file_without_certificates_is_an_error() {
        let file = pem_file("just some text\n");

        let err = load_pem_roots(file.path()).unwrap_err();

        assert!(
            matches!(err, RootsError::NoCertificates { .. }),
            "got {err:?}"
        );
        assert!(err.to_string().starts_with("error creating root cert pool"));
    }

    #[test]
    fn only_certificate_blocks_are_kept() {
        let file = pem_file(
            "-----BEGIN PUBLIC KEY-----\nAQID\n-----END PUBLIC KEY-----\n\
             -----BEGIN CERTIFICATE-----\nBAUG\n-----END CERTIFICATE-----\n",
        );

        let certs = load_pem_roots(file.path()).unwrap();

        assert_eq!(certs.len(), 1);
        assert_eq!(&certs[0][..], &[4u8, 5, 6][..]);
    }

    #[tokio::test]
    async fn root_and_rekor_files_skip_tuf() {
        let roots_file =
            pem_file("-----BEGIN CERTIFICATE-----\nBAUG\n-----END CERTIFICATE-----\n");
        let rekor_file = pem_file("-----BEGIN PUBLIC KEY-----\nAQID\n-----END PUBLIC KEY-----\n");

        let roots = FulcioRoots::from_source(
            Some(roots_file.path().to_path_buf()),
            Some(rekor_file.path().to_path_buf()),
        )
        .await
        .unwrap();

        assert!(roots.has_rekor_keys());
        let trust_root = roots.manual_trust_root().unwrap();
        assert_eq!(trust_root.fulcio_certs().unwrap().len(), 1);
        assert_eq!(trust_root.rekor_keys().unwrap(), vec![&[1u8, 2, 3][..]]);
    }

    #[tokio::test]
    async fn rekor_file_without_keys_is_an_error() {
        let roots_file =
            pem_file("-----BEGIN CERTIFICATE-----\nBAUG\n-----END CERTIFICATE-----\n");
        let rekor_file =
            pem_file("-----BEGIN CERTIFICATE-----\nBAUG\n-----END CERTIFICATE-----\n");

        let err = FulcioRoots::from_source(
            Some(roots_file.path().to_path_buf()),
            Some(rekor_file.path().to_path_buf()),
        )
        .await
        .err()
        .unwrap();

        assert!(matches!(err, RootsError::NoPublicKeys { .. }), "got {err:?}");
    }
}
