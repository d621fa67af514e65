//! TLS certificate provisioning for the SMTP and IMAP hostnames
//!
//! A backend is chosen once per run by [`backend_for`]. Each backend derives
//! the certificate locations up front ([`CertificateBackend::paths`]) so the
//! site deployment can use them, then [`CertificateBackend::generate`]
//! produces the material. When both hostnames are equal only one
//! certificate is ever issued.

mod letsencrypt;
mod self_signed;

pub use letsencrypt::{
    LetsEncryptCertificate, RENEWAL_CRON_ENTRY, STANDALONE_AUTHENTICATOR, WEBFRONT_AUTHENTICATOR,
};
pub use self_signed::{derive_paths, SelfSignedCertificate};

use crate::distro::{Distribution, PackageManager};
use crate::exec::CommandRunner;
use crate::prompt::Prompter;
use crate::{CertificatePaths, Result, Settings, SystemLayout};
use std::path::Path;

/// Host services the backends need while generating certificates
pub struct Host<'a> {
    pub runner: &'a dyn CommandRunner,
    pub packages: &'a dyn PackageManager,
    pub prompter: &'a dyn Prompter,
    pub distribution: Distribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateOutcome {
    /// Number of certificates issued
    Generated(usize),
    /// Operator chose to keep the existing certificate
    Declined,
}

#[derive(Debug, Clone)]
pub enum CertificateBackend {
    SelfSigned(SelfSignedCertificate),
    LetsEncrypt(LetsEncryptCertificate),
}

impl CertificateBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            CertificateBackend::SelfSigned(_) => "self-signed",
            CertificateBackend::LetsEncrypt(_) => "letsencrypt",
        }
    }

    pub fn paths(&self) -> &CertificatePaths {
        match self {
            CertificateBackend::SelfSigned(backend) => backend.paths(),
            CertificateBackend::LetsEncrypt(backend) => backend.paths(),
        }
    }

    pub fn generate(&self, settings: &Settings, host: &Host<'_>) -> Result<CertificateOutcome> {
        match self {
            CertificateBackend::SelfSigned(backend) => backend.generate(settings, host),
            CertificateBackend::LetsEncrypt(backend) => backend.generate(settings, host),
        }
    }
}

/// Pick the certificate backend configured in `[certificate]`, or `None`
/// when certificate generation is disabled
pub fn backend_for(settings: &Settings, layout: &SystemLayout) -> Result<Option<CertificateBackend>> {
    if !settings.get_boolean("certificate", "generate")? {
        log::info!("Certificate generation disabled");
        return Ok(None);
    }

    let kind = if settings.has_option("certificate", "type") {
        settings.get("certificate", "type")?
    } else {
        "self-signed".to_string()
    };

    let backend = if kind == "letsencrypt" {
        CertificateBackend::LetsEncrypt(LetsEncryptCertificate::new(settings, layout)?)
    } else {
        CertificateBackend::SelfSigned(SelfSignedCertificate::new(settings, layout)?)
    };
    log::debug!("Using {} certificate backend", backend.kind());
    Ok(Some(backend))
}

/// Whether an existing certificate at `key_file` may be replaced, asking the
/// operator unless `general.force` is set
fn overwrite_existing_certificate(
    settings: &Settings,
    prompter: &dyn Prompter,
    key_file: &Path,
) -> Result<bool> {
    if key_file.exists() && !settings.get_boolean_or("general", "force", false)? {
        return prompter.confirm("Overwrite the existing SSL certificate? (y/N) ");
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPrompter;
    use crate::Error;
    use std::fs;
    use tempfile::tempdir;

    fn settings(extra: &str) -> Settings {
        Settings::parse_ini(&format!(
            "[general]\nhostname_smtp = mail.example.com\nhostname_imap = mail.example.com\n{}",
            extra
        ))
        .unwrap()
    }

    fn layout_with_ssl(root: &Path) -> SystemLayout {
        let ssl = root.join("ssl");
        fs::create_dir_all(&ssl).unwrap();
        SystemLayout {
            trust_store_dirs: vec![root.join("pki/tls"), ssl],
            letsencrypt_dir: root.join("letsencrypt"),
            ..SystemLayout::default()
        }
    }

    #[test]
    fn test_generation_disabled() {
        let dir = tempdir().unwrap();
        let settings = settings("[certificate]\ngenerate = false\ntype = letsencrypt\n");
        let backend = backend_for(&settings, &layout_with_ssl(dir.path())).unwrap();
        assert!(backend.is_none());
    }

    #[test]
    fn test_missing_certificate_section_is_fatal() {
        let dir = tempdir().unwrap();
        let err = backend_for(&settings(""), &layout_with_ssl(dir.path())).unwrap_err();
        assert!(err.is_no_section());
    }

    #[test]
    fn test_selects_self_signed_by_default() {
        let dir = tempdir().unwrap();
        let settings = settings("[certificate]\ngenerate = true\n");
        let backend = backend_for(&settings, &layout_with_ssl(dir.path()))
            .unwrap()
            .unwrap();
        assert_eq!(backend.kind(), "self-signed");
        assert_eq!(
            backend.paths().smtp.key,
            dir.path().join("ssl/private/mail.example.com.key")
        );
    }

    #[test]
    fn test_selects_letsencrypt() {
        let dir = tempdir().unwrap();
        let settings = settings("[certificate]\ngenerate = yes\ntype = letsencrypt\n");
        let backend = backend_for(&settings, &layout_with_ssl(dir.path()))
            .unwrap()
            .unwrap();
        assert_eq!(backend.kind(), "letsencrypt");
        assert_eq!(
            backend.paths().imap.cert,
            dir.path()
                .join("letsencrypt/live/mail.example.com/fullchain.pem")
        );
    }

    #[test]
    fn test_overwrite_prompt() {
        let dir = tempdir().unwrap();
        let key = dir.path().join("mail.key");
        let settings = settings("");

        // Nothing there yet: no question asked
        let prompter = ScriptedPrompter::answering(&[]);
        assert!(overwrite_existing_certificate(&settings, &prompter, &key).unwrap());
        assert!(prompter.questions().is_empty());

        fs::write(&key, "key").unwrap();
        let prompter = ScriptedPrompter::answering(&[false]);
        assert!(!overwrite_existing_certificate(&settings, &prompter, &key).unwrap());
        assert_eq!(
            prompter.questions(),
            vec!["Overwrite the existing SSL certificate? (y/N) "]
        );
    }

    #[test]
    fn test_force_skips_prompt() {
        let dir = tempdir().unwrap();
        let key = dir.path().join("mail.key");
        fs::write(&key, "key").unwrap();
        let settings = settings("force = true\n");

        let prompter = ScriptedPrompter::answering(&[]);
        assert!(overwrite_existing_certificate(&settings, &prompter, &key).unwrap());
    }

    #[test]
    fn test_no_certificate_directory() {
        let dir = tempdir().unwrap();
        let layout = SystemLayout {
            trust_store_dirs: vec![dir.path().join("missing")],
            ..SystemLayout::default()
        };
        let settings = settings("[certificate]\ngenerate = true\n");
        let err = backend_for(&settings, &layout).unwrap_err();
        assert!(matches!(err, Error::NoCertificateDirectory(_)));
    }
}
