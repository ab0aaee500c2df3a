//! SSH public-key derivation from configured private key material.
//!
//! The public half of the connector key is injected onto every boot volume.
//! It is recovered either from the `.pub` sibling of the private key file or,
//! failing that, by asking `ssh-keygen` to derive it.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::provider::ProviderError;

/// Obtain the OpenSSH public key belonging to a private key file.
///
/// # Errors
/// Returns [`ProviderError::Key`] if neither a `.pub` sibling exists nor the
/// key material yields a public key.
pub fn public_key_for(private_key_path: &Path) -> Result<String, ProviderError> {
    let public_key_path = private_key_path.with_extension("pub");

    if public_key_path.exists() {
        debug!(path = %public_key_path.display(), "Using public key file");
        let content = std::fs::read_to_string(&public_key_path).map_err(|e| {
            ProviderError::Key(format!(
                "failed to read public key {}: {e}",
                public_key_path.display()
            ))
        })?;
        return Ok(content.trim().to_string());
    }

    // No sibling file; derive from the private key itself.
    let output = Command::new("ssh-keygen")
        .args(["-y", "-f", &private_key_path.to_string_lossy()])
        .output()
        .map_err(|e| ProviderError::Key(format!("failed to run ssh-keygen: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProviderError::Key(format!(
            "key {} does not yield a public key: {}",
            private_key_path.display(),
            stderr.trim()
        )));
    }

    let public_key = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if public_key.is_empty() {
        return Err(ProviderError::Key(format!(
            "key {} does not yield a public key",
            private_key_path.display()
        )));
    }

    info!(path = %private_key_path.display(), "Derived public key from private key");
    Ok(public_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_pub_sibling_when_present() {
        let dir = std::env::temp_dir().join("fleeting-ionos-key-test");
        std::fs::create_dir_all(&dir).unwrap();
        let key = dir.join("id_ed25519");
        std::fs::write(&key, "not a real key").unwrap();
        std::fs::write(
            dir.join("id_ed25519.pub"),
            "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAITESTKEY runner\n",
        )
        .unwrap();

        let public = public_key_for(&key).unwrap();
        assert_eq!(public, "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAITESTKEY runner");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_key_is_a_key_error() {
        let err = public_key_for(Path::new("/nonexistent/id_rsa")).unwrap_err();
        assert!(matches!(err, ProviderError::Key(_)));
    }
}
