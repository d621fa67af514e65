//! nginx front end for the mail stack's web applications

use crate::deploy::{DeployOutcome, SiteDeployer, SiteRequest};
use crate::distro::PackageManager;
use crate::exec::{CommandLine, CommandRunner};
use crate::{CertificatePaths, MailHostnames, PackageFormat, Result, Settings, SystemLayout};

/// Routes autodiscover and mobileconfig requests to the automx uwsgi app
pub const AUTOMX_LOCATIONS: &str = "
    location ~* ^/autodiscover/autodiscover.xml {
        include uwsgi_params;
        uwsgi_pass automx;
    }
    location /mobileconfig {
        include uwsgi_params;
        uwsgi_pass automx;
    }
";

/// Proxies CalDAV/CardDAV requests to the local radicale server
pub const RADICALE_LOCATION: &str = "
    location /radicale/ {
        proxy_pass http://localhost:5232/; # The / is important!
        proxy_set_header X-Script-Name /radicale;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_pass_header Authorization;
    }
";

const DHPARAM_BITS: &str = "4096";

/// Summary of one [`NginxConfigurator::post_run`] pass
#[derive(Debug, Clone, Default)]
pub struct FrontEndReport {
    pub sites: Vec<DeployOutcome>,
    pub dhparam_generated: bool,
}

pub struct NginxConfigurator<'a> {
    settings: &'a Settings,
    layout: &'a SystemLayout,
    format: PackageFormat,
    runner: &'a dyn CommandRunner,
}

impl<'a> NginxConfigurator<'a> {
    pub fn new(
        settings: &'a Settings,
        layout: &'a SystemLayout,
        format: PackageFormat,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            settings,
            layout,
            format,
            runner,
        }
    }

    pub fn packages(format: PackageFormat) -> &'static [&'static str] {
        match format {
            PackageFormat::Deb => &["nginx", "ssl-cert"],
            PackageFormat::Rpm => &["nginx"],
        }
    }

    pub fn install_packages(&self, packages: &dyn PackageManager) -> Result<()> {
        packages.install(Self::packages(self.format))
    }

    /// Deploy every site of the front end, then make sure DH parameters exist
    pub fn post_run(&self, certificates: &CertificatePaths) -> Result<FrontEndReport> {
        let deployer = SiteDeployer::new(
            self.settings,
            self.layout,
            self.format,
            certificates,
            self.runner,
        );
        let hostnames = MailHostnames::from_settings(self.settings)?;
        let mut report = FrontEndReport::default();

        report.sites.push(deployer.deploy(
            &SiteRequest::new("proxy_services").config_file_name("000_proxy_services"),
        )?);

        let mut extra_config = String::new();
        if self.settings.get_boolean_or("automx", "enabled", false)? {
            let hostname = format!("autoconfig.{}", self.settings.get("general", "domain")?);
            report
                .sites
                .push(deployer.deploy(&SiteRequest::new("automx").hostname(hostname))?);
            extra_config.push_str(AUTOMX_LOCATIONS);
        }
        if self.settings.get_boolean_or("radicale", "enabled", false)? {
            extra_config.push_str(RADICALE_LOCATION);
        }

        report
            .sites
            .push(deployer.deploy(&SiteRequest::new("modoboa").extra_config(extra_config.clone()))?);

        if !hostnames.is_shared() {
            let imap = &certificates.imap;
            report.sites.push(
                deployer.deploy(
                    &SiteRequest::new("modoboa")
                        .hostname(hostnames.imap.clone())
                        .certificate(&imap.cert, &imap.key)
                        .extra_config(extra_config),
                )?,
            );
        }

        report.dhparam_generated = self.ensure_dhparam()?;
        Ok(report)
    }

    /// Generate `dhparam.pem` unless it already exists. Slow: minutes on
    /// small machines.
    pub fn ensure_dhparam(&self) -> Result<bool> {
        if self.layout.dhparam_file().exists() {
            log::debug!("{} already present", self.layout.dhparam_file().display());
            return Ok(false);
        }
        log::info!("Generating Diffie-Hellman parameters, this may take a while");
        self.runner.run_checked(
            &CommandLine::new("openssl")
                .args(["dhparam", "-dsaparam", "-out", "dhparam.pem", DHPARAM_BITS])
                .current_dir(&self.layout.nginx_config_dir),
        )?;
        Ok(true)
    }

    pub fn restart(&self) -> Result<()> {
        log::info!("Restarting nginx");
        self.runner
            .run_checked(&CommandLine::new("systemctl").args(["restart", "nginx"]))?;
        Ok(())
    }
}
