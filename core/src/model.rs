//! Domain model types shared across provisioning steps

use crate::{Error, Result, Settings};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Packaging family of the host distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageFormat {
    #[default]
    Deb,
    Rpm,
}

impl PackageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageFormat::Deb => "deb",
            PackageFormat::Rpm => "rpm",
        }
    }

    /// Whether sites are activated through `sites-enabled` symlinks
    pub fn uses_activation_links(&self) -> bool {
        matches!(self, PackageFormat::Deb)
    }
}

/// Which mail service a hostname/certificate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailRole {
    Smtp,
    Imap,
}

impl MailRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailRole::Smtp => "smtp",
            MailRole::Imap => "imap",
        }
    }

    pub fn hostname_key(&self) -> String {
        format!("hostname_{}", self.as_str())
    }

    pub fn cert_key(&self) -> String {
        format!("tls_cert_file_{}", self.as_str())
    }

    pub fn key_key(&self) -> String {
        format!("tls_key_file_{}", self.as_str())
    }
}

/// A certificate and its private key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertPair {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl CertPair {
    pub fn new(cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        Self {
            cert: cert.into(),
            key: key.into(),
        }
    }
}

/// Certificate material locations for both mail roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePaths {
    pub smtp: CertPair,
    pub imap: CertPair,
}

impl CertificatePaths {
    /// Read explicitly configured paths from the `general` section. The IMAP
    /// pair is only read when IMAP has its own hostname; otherwise it is the
    /// SMTP pair.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let hostnames = MailHostnames::from_settings(settings)?;
        let pair = |role: MailRole| -> Result<CertPair> {
            Ok(CertPair::new(
                settings.get("general", &role.cert_key())?,
                settings.get("general", &role.key_key())?,
            ))
        };

        let smtp = pair(MailRole::Smtp)?;
        let imap = if hostnames.is_shared() {
            smtp.clone()
        } else {
            pair(MailRole::Imap)?
        };
        Ok(Self { smtp, imap })
    }
}

/// SMTP and IMAP hostnames of the installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailHostnames {
    pub smtp: String,
    pub imap: String,
}

impl MailHostnames {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let smtp = settings.get("general", &MailRole::Smtp.hostname_key())?;
        let imap = settings.get("general", &MailRole::Imap.hostname_key())?;
        validate_hostname(&smtp).map_err(Error::validation)?;
        validate_hostname(&imap).map_err(Error::validation)?;
        Ok(Self { smtp, imap })
    }

    /// SMTP and IMAP share one certificate and one virtual host
    pub fn is_shared(&self) -> bool {
        self.smtp == self.imap
    }
}

/// Validates a hostname before it ends up in file names and command lines
pub fn validate_hostname(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("Hostname cannot be empty".to_string());
    }

    if name.len() > 253 {
        return Err(format!("Hostname '{}' is longer than 253 characters", name));
    }

    let re = regex::Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)*$")
        .map_err(|e| e.to_string())?;
    if !re.is_match(name) {
        return Err(format!(
            "Hostname '{}' must contain only letters, digits, hyphens and dots",
            name
        ));
    }

    Ok(())
}
