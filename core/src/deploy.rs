//! Idempotent nginx site deployment
//!
//! On deb hosts a site is live once `sites-enabled/<name>.conf` exists; that
//! link is the only marker checked, so an already enabled site is never
//! re-rendered, even when its template has changed since.

use crate::context::{ContextResolver, DEFAULT_APP};
use crate::exec::CommandRunner;
use crate::template::copy_from_template;
use crate::{system, CertificatePaths, PackageFormat, Result, Settings, SystemLayout};
use std::fs;
use std::path::{Path, PathBuf};

/// Runtime user of the nginx workers on deb hosts
const DEB_FRONT_USER: &str = "www-data";
const RPM_FRONT_USER: &str = "nginx";
const RPM_SOCKET_GROUP: &str = "uwsgi";

/// One site to deploy. Unset fields fall back to the SMTP hostname and
/// certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteRequest {
    pub application: String,
    pub hostname: Option<String>,
    pub tls_cert_file: Option<PathBuf>,
    pub tls_key_file: Option<PathBuf>,
    /// Server-block fragment inserted verbatim into the template
    pub extra_config: Option<String>,
    pub config_file_name: Option<String>,
}

impl SiteRequest {
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            ..Default::default()
        }
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn certificate(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.tls_cert_file = Some(cert.into());
        self.tls_key_file = Some(key.into());
        self
    }

    pub fn extra_config(mut self, extra: impl Into<String>) -> Self {
        self.extra_config = Some(extra.into());
        self
    }

    pub fn config_file_name(mut self, name: impl Into<String>) -> Self {
        self.config_file_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Rendered (and linked, on deb hosts) to the given path
    Deployed(PathBuf),
    /// Activation link already present; nothing touched
    AlreadyActive(PathBuf),
}

impl DeployOutcome {
    pub fn path(&self) -> &Path {
        match self {
            DeployOutcome::Deployed(path) | DeployOutcome::AlreadyActive(path) => path,
        }
    }

    pub fn is_deployed(&self) -> bool {
        matches!(self, DeployOutcome::Deployed(_))
    }
}

/// Renders application templates into the nginx configuration tree
pub struct SiteDeployer<'a> {
    settings: &'a Settings,
    layout: &'a SystemLayout,
    format: PackageFormat,
    certificates: &'a CertificatePaths,
    runner: &'a dyn CommandRunner,
}

impl<'a> SiteDeployer<'a> {
    pub fn new(
        settings: &'a Settings,
        layout: &'a SystemLayout,
        format: PackageFormat,
        certificates: &'a CertificatePaths,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            settings,
            layout,
            format,
            certificates,
            runner,
        }
    }

    pub fn sites_available_dir(&self) -> PathBuf {
        self.layout.nginx_config_dir.join("sites-available")
    }

    pub fn sites_enabled_dir(&self) -> PathBuf {
        self.layout.nginx_config_dir.join("sites-enabled")
    }

    pub fn conf_d_dir(&self) -> PathBuf {
        self.layout.nginx_config_dir.join("conf.d")
    }

    pub fn deploy(&self, request: &SiteRequest) -> Result<DeployOutcome> {
        let hostname = match &request.hostname {
            Some(hostname) => hostname.clone(),
            None => self.settings.get("general", "hostname_smtp")?,
        };
        let file_name = format!(
            "{}.conf",
            request.config_file_name.as_deref().unwrap_or(&hostname)
        );
        let src = self.layout.template_file(&request.application);

        match self.format {
            PackageFormat::Deb => {
                let dst = self.sites_available_dir().join(&file_name);
                let link = self.sites_enabled_dir().join(&file_name);
                // symlink_metadata also sees dangling links
                if link.symlink_metadata().is_ok() {
                    log::debug!("{} is already enabled, leaving it untouched", file_name);
                    return Ok(DeployOutcome::AlreadyActive(dst));
                }

                let context = self.context(request, &hostname)?;
                copy_from_template(&src, &dst, &context)?;
                fs::create_dir_all(self.sites_enabled_dir())?;
                activate(&dst, &link)?;

                let group = self.socket_group(&request.application)?;
                system::add_user_to_group(self.runner, DEB_FRONT_USER, &group)?;
                log::info!("Enabled nginx site {}", file_name);
                Ok(DeployOutcome::Deployed(dst))
            }
            PackageFormat::Rpm => {
                let dst = self.conf_d_dir().join(&file_name);
                let context = self.context(request, &hostname)?;
                copy_from_template(&src, &dst, &context)?;

                system::add_user_to_group(self.runner, RPM_FRONT_USER, RPM_SOCKET_GROUP)?;
                log::info!("Installed nginx configuration {}", file_name);
                Ok(DeployOutcome::Deployed(dst))
            }
        }
    }

    fn context(&self, request: &SiteRequest, hostname: &str) -> Result<crate::TemplateContext> {
        let resolver = ContextResolver::new(self.settings, self.format, self.layout);
        let mut context = resolver.resolve_with_fallback(&request.application)?;

        let smtp = &self.certificates.smtp;
        let cert = request.tls_cert_file.as_deref().unwrap_or(&smtp.cert);
        let key = request.tls_key_file.as_deref().unwrap_or(&smtp.key);

        context.insert("hostname", hostname);
        context.insert("tls_cert_file", cert.display().to_string());
        context.insert("tls_key_file", key.display().to_string());
        context.insert(
            "extra_config",
            request.extra_config.clone().unwrap_or_default(),
        );
        Ok(context)
    }

    /// Group owning the uwsgi socket of `app` on deb hosts
    fn socket_group(&self, app: &str) -> Result<String> {
        match self.settings.get(app, "user") {
            Err(e) if e.is_no_section() => self.settings.get(DEFAULT_APP, "user"),
            other => other,
        }
    }
}

#[cfg(unix)]
fn activate(dst: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(dst, link)?;
    Ok(())
}

#[cfg(not(unix))]
fn activate(_dst: &Path, link: &Path) -> Result<()> {
    Err(crate::Error::config(format!(
        "Cannot create activation link {}: symlinks require a Unix host",
        link.display()
    )))
}
