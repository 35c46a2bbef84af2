//! In-process memo of file-content digests.

use std::path::Path;

use base64::engine::general_purpose;
use base64::Engine;
use dashmap::DashMap;
use md5::{Digest, Md5};
use tracing::trace;

use crate::target::Target;

/// Memoizes the content digest of each file target for one engine
/// lifetime. A digest is `<path>:<base64(md5(content))>`, or `<path>:x`
/// when the file cannot be read, so a signature changes whenever a file
/// appears, disappears, or changes bytes.
///
/// Entries are invalidated explicitly by tasks right before they rewrite a
/// path.
///
#[derive(Debug, Default)]
pub struct HashCache {
    digests: DashMap<Target, String>,
}

impl HashCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digests for the file targets among `targets`, in input order.
    /// Abstract targets contribute nothing to signatures and are skipped.
    pub async fn hash_files(&self, root: &Path, targets: &[Target]) -> Vec<String> {
        let mut digests = Vec::with_capacity(targets.len());
        for target in targets {
            if target.is_abstract() {
                continue;
            }
            digests.push(self.digest(root, target).await);
        }
        digests
    }

    async fn digest(&self, root: &Path, target: &Target) -> String {
        if let Some(hit) = self.digests.get(target) {
            return hit.clone();
        }

        let digest = match tokio::fs::read(target.resolve_against(root)).await {
            Ok(bytes) => {
                let mut hasher = Md5::new();
                hasher.update(&bytes);
                format!(
                    "{}:{}",
                    target,
                    general_purpose::STANDARD.encode(hasher.finalize())
                )
            }
            Err(_) => format!("{}:x", target),
        };
        trace!(%target, %digest, "hashed");

        self.digests.insert(target.clone(), digest.clone());
        digest
    }

    pub fn invalidate(&self, target: &Target) {
        self.digests.remove(target);
    }

    /// Drop every memoized digest. Called between updates so a long-lived
    /// engine re-observes the filesystem.
    pub fn clear(&self) {
        self.digests.clear();
    }
}
