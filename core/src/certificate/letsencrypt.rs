use super::{CertificateOutcome, Host};
use crate::distro::Distribution;
use crate::exec::{CommandLine, CommandRunner};
use crate::{CertPair, CertificatePaths, Error, MailHostnames, Result, Settings, SystemLayout};
use std::fs;

/// Renewal authenticator certbot records after a standalone request
pub const STANDALONE_AUTHENTICATOR: &str = "authenticator = standalone";
/// Renewal authenticator that works while nginx holds port 80
pub const WEBFRONT_AUTHENTICATOR: &str = "authenticator = nginx";
/// Twice-daily forced renewal, as a cron.d line
pub const RENEWAL_CRON_ENTRY: &str =
    "0 */12 * * * root certbot renew --quiet --no-self-upgrade --force-renewal\n";

/// Ubuntu release whose archive lacks a usable certbot package
const CERTBOT_PPA_RELEASE: &str = "18.04";

/// Certificates issued by Let's Encrypt through certbot
#[derive(Debug, Clone)]
pub struct LetsEncryptCertificate {
    hostnames: MailHostnames,
    paths: CertificatePaths,
    layout: SystemLayout,
}

impl LetsEncryptCertificate {
    /// Paths always point at certbot's live tree, whatever is configured
    pub fn new(settings: &Settings, layout: &SystemLayout) -> Result<Self> {
        let hostnames = MailHostnames::from_settings(settings)?;
        let pair = |hostname: &str| {
            let live = layout.letsencrypt_live_dir(hostname);
            CertPair::new(live.join("fullchain.pem"), live.join("privkey.pem"))
        };
        let paths = CertificatePaths {
            smtp: pair(&hostnames.smtp),
            imap: pair(&hostnames.imap),
        };

        Ok(Self {
            hostnames,
            paths,
            layout: layout.clone(),
        })
    }

    pub fn paths(&self) -> &CertificatePaths {
        &self.paths
    }

    /// Install certbot, request the certificates and schedule renewal.
    ///
    /// Requires port 80 to be free: certbot answers the challenge itself.
    /// Every call requests again, even if certificates already exist.
    pub fn generate(&self, settings: &Settings, host: &Host<'_>) -> Result<CertificateOutcome> {
        log::info!("Generating new certificate using letsencrypt");
        let email = settings.get("letsencrypt", "email")?;
        self.install_certbot(host)?;

        let mut issued = 0;
        for hostname in self.distinct_hostnames() {
            self.request(host.runner, hostname, &email)?;
            self.use_webfront_authenticator(hostname)?;
            issued += 1;
        }

        self.schedule_renewal()?;
        Ok(CertificateOutcome::Generated(issued))
    }

    fn distinct_hostnames(&self) -> Vec<&str> {
        if self.hostnames.is_shared() {
            vec![self.hostnames.smtp.as_str()]
        } else {
            vec![self.hostnames.smtp.as_str(), self.hostnames.imap.as_str()]
        }
    }

    pub fn install_certbot(&self, host: &Host<'_>) -> Result<()> {
        match &host.distribution {
            Distribution::Ubuntu { version } => {
                host.packages.update()?;
                host.packages.install(&["software-properties-common"])?;
                add_apt_repository(host.runner, "universe")?;
                if version == CERTBOT_PPA_RELEASE {
                    add_apt_repository(host.runner, "ppa:certbot/certbot")?;
                }
                host.packages.update()?;
                host.packages.install(&["certbot"])?;
            }
            Distribution::Debian => {
                host.packages.update()?;
                host.packages.install(&["certbot"])?;
            }
            Distribution::RedHat => {
                host.packages.install(&["certbot"])?;
            }
            Distribution::Unknown(name) => {
                return Err(Error::UnsupportedDistribution(name.clone()));
            }
        }
        Ok(())
    }

    fn request(&self, runner: &dyn CommandRunner, hostname: &str, email: &str) -> Result<()> {
        log::info!("Requesting certificate for {}", hostname);
        runner.run_checked(&CommandLine::new("certbot").args([
            "certonly",
            "-n",
            "--standalone",
            "-d",
            hostname,
            "-m",
            email,
            "--agree-tos",
        ]))?;
        Ok(())
    }

    /// Switch the renewal record of `hostname` from the standalone to the
    /// nginx authenticator. Returns whether the file changed.
    pub fn use_webfront_authenticator(&self, hostname: &str) -> Result<bool> {
        let path = self.layout.letsencrypt_renewal_file(hostname);
        let content = fs::read_to_string(&path)?;
        if !content.contains(STANDALONE_AUTHENTICATOR) {
            log::debug!("{} already uses another authenticator", path.display());
            return Ok(false);
        }
        let patched = content.replace(STANDALONE_AUTHENTICATOR, WEBFRONT_AUTHENTICATOR);
        fs::write(&path, patched)?;
        Ok(true)
    }

    pub fn schedule_renewal(&self) -> Result<()> {
        let cron_file = self.layout.renewal_cron_file();
        if let Some(parent) = cron_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&cron_file, RENEWAL_CRON_ENTRY)?;
        log::debug!("Installed renewal job {}", cron_file.display());
        Ok(())
    }
}

fn add_apt_repository(runner: &dyn CommandRunner, repository: &str) -> Result<()> {
    runner.run_checked(&CommandLine::new("add-apt-repository").args(["-y", repository]))?;
    Ok(())
}
