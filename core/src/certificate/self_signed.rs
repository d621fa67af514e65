use super::{overwrite_existing_certificate, CertificateOutcome, Host};
use crate::exec::{path_to_str, CommandLine, CommandRunner};
use crate::{
    CertPair, CertificatePaths, Error, MailHostnames, MailRole, Result, Settings, SystemLayout,
};
use std::fs;
use std::path::{Path, PathBuf};

const KEY_SIZE: u32 = 4096;
const VALIDITY_DAYS: u32 = 365;

/// Self-signed certificates stored under the OS trust-store tree
#[derive(Debug, Clone)]
pub struct SelfSignedCertificate {
    hostnames: MailHostnames,
    paths: CertificatePaths,
}

impl SelfSignedCertificate {
    pub fn new(settings: &Settings, layout: &SystemLayout) -> Result<Self> {
        let hostnames = MailHostnames::from_settings(settings)?;

        // Explicitly configured paths win over derivation
        let paths = if settings.has_option("general", &MailRole::Smtp.key_key()) {
            CertificatePaths::from_settings(settings)?
        } else {
            derive_paths(&layout.trust_store_dirs, &hostnames)?
        };

        Ok(Self { hostnames, paths })
    }

    pub fn paths(&self) -> &CertificatePaths {
        &self.paths
    }

    pub fn generate(&self, settings: &Settings, host: &Host<'_>) -> Result<CertificateOutcome> {
        if !overwrite_existing_certificate(settings, host.prompter, &self.paths.smtp.key)? {
            log::info!("Keeping the existing SSL certificate");
            return Ok(CertificateOutcome::Declined);
        }

        log::info!("Generating new self-signed certificate");
        issue(host.runner, &self.hostnames.smtp, &self.paths.smtp)?;
        if self.hostnames.is_shared() {
            return Ok(CertificateOutcome::Generated(1));
        }

        issue(host.runner, &self.hostnames.imap, &self.paths.imap)?;
        Ok(CertificateOutcome::Generated(2))
    }
}

/// Certificate paths under the first existing trust-store base directory:
/// `<base>/private/<host>.key` and `<base>/certs/<host>.cert`
pub fn derive_paths(candidates: &[PathBuf], hostnames: &MailHostnames) -> Result<CertificatePaths> {
    let base = candidates.iter().find(|dir| dir.exists()).ok_or_else(|| {
        Error::NoCertificateDirectory(
            candidates
                .iter()
                .map(|dir| dir.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        )
    })?;
    log::debug!("Storing certificates under {}", base.display());

    let pair = |hostname: &str| {
        CertPair::new(
            base.join("certs").join(format!("{}.cert", hostname)),
            base.join("private").join(format!("{}.key", hostname)),
        )
    };
    Ok(CertificatePaths {
        smtp: pair(&hostnames.smtp),
        imap: pair(&hostnames.imap),
    })
}

fn issue(runner: &dyn CommandRunner, hostname: &str, pair: &CertPair) -> Result<()> {
    for file in [&pair.key, &pair.cert] {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
    }
    runner.run_checked(&openssl_request(hostname, &pair.key, &pair.cert)?)?;
    Ok(())
}

fn openssl_request(hostname: &str, key: &Path, cert: &Path) -> Result<CommandLine> {
    Ok(CommandLine::new("openssl").args([
        "req".to_string(),
        "-new".to_string(),
        "-newkey".to_string(),
        format!("rsa:{}", KEY_SIZE),
        "-days".to_string(),
        VALIDITY_DAYS.to_string(),
        "-nodes".to_string(),
        "-x509".to_string(),
        "-subj".to_string(),
        format!("/CN={}", hostname),
        "-keyout".to_string(),
        path_to_str(key)?.to_string(),
        "-out".to_string(),
        path_to_str(cert)?.to_string(),
    ]))
}
