use mailgate_core::{
    backend_for, package_manager_for, CertificateOutcome, CertificatePaths, DistroInfo, Host,
    NginxConfigurator, PackageFormat, Settings, StdinPrompter, SystemLayout, SystemRunner,
};

use crate::cli::{Cli, Commands};
use crate::error::CliError;

impl Cli {
    pub fn execute(&self) -> Result<(), CliError> {
        let settings = self.load_settings()?;
        let layout = self.layout();
        if let Some(path) = &self.dump_settings {
            settings.save_to(path)?;
            log::info!("Settings written to {}", path.display());
        }

        match self.command {
            Commands::ShowPaths => show_paths(&settings, &layout),
            Commands::Certificate => {
                let session = Session::detect(&settings, &layout)?;
                session.certificate()?;
                Ok(())
            }
            Commands::Webfront => {
                let session = Session::detect(&settings, &layout)?;
                let paths = match backend_for(&settings, &layout)? {
                    Some(backend) => backend.paths().clone(),
                    None => CertificatePaths::from_settings(&settings)?,
                };
                session.webfront(&paths)
            }
            Commands::Run => {
                let session = Session::detect(&settings, &layout)?;
                let paths = session.certificate()?;
                session.webfront(&paths)
            }
        }
    }

    fn load_settings(&self) -> Result<Settings, CliError> {
        let path = self.config.clone().unwrap_or_else(Settings::default_path);
        log::debug!("Loading settings from {}", path.display());
        let mut settings = Settings::load(&path).map_err(|source| CliError::Settings {
            path: path.clone(),
            source,
        })?;

        if self.force {
            if !settings.has_section("general") {
                settings.add_section("general")?;
            }
            settings.set("general", "force", "true")?;
        }
        log::debug!("Sections: {}", settings.sections().join(", "));
        Ok(settings)
    }

    fn layout(&self) -> SystemLayout {
        let mut layout = SystemLayout::default();
        if let Some(dir) = &self.nginx_dir {
            layout.nginx_config_dir = dir.clone();
        }
        if let Some(dir) = &self.templates_dir {
            layout.templates_dir = dir.clone();
        }
        layout
    }
}

fn show_paths(settings: &Settings, layout: &SystemLayout) -> Result<(), CliError> {
    let (kind, paths) = match backend_for(settings, layout)? {
        Some(backend) => (backend.kind(), backend.paths().clone()),
        None => ("configured", CertificatePaths::from_settings(settings)?),
    };
    println!("backend:   {}", kind);
    println!("smtp cert: {}", paths.smtp.cert.display());
    println!("smtp key:  {}", paths.smtp.key.display());
    println!("imap cert: {}", paths.imap.cert.display());
    println!("imap key:  {}", paths.imap.key.display());
    Ok(())
}

/// Host facts and services shared by the provisioning commands
struct Session<'a> {
    settings: &'a Settings,
    layout: &'a SystemLayout,
    distro: DistroInfo,
    format: PackageFormat,
    runner: SystemRunner,
    prompter: StdinPrompter,
}

impl<'a> Session<'a> {
    fn detect(settings: &'a Settings, layout: &'a SystemLayout) -> Result<Self, CliError> {
        let distro = DistroInfo::parse_file(&layout.os_release)?;
        let format = distro.package_format();
        log::info!(
            "Detected {} {} ({} packages)",
            distro.distribution().display_name(),
            distro.version,
            format.as_str()
        );
        Ok(Self {
            settings,
            layout,
            distro,
            format,
            runner: SystemRunner::new(),
            prompter: StdinPrompter::new(),
        })
    }

    /// Generate certificates when enabled and return the paths the sites use
    fn certificate(&self) -> Result<CertificatePaths, CliError> {
        let Some(backend) = backend_for(self.settings, self.layout)? else {
            return Ok(CertificatePaths::from_settings(self.settings)?);
        };

        let packages = package_manager_for(self.format, &self.runner);
        let host = Host {
            runner: &self.runner,
            packages: packages.as_ref(),
            prompter: &self.prompter,
            distribution: self.distro.distribution(),
        };
        match backend.generate(self.settings, &host)? {
            CertificateOutcome::Generated(count) => {
                log::info!("Issued {} {} certificate(s)", count, backend.kind())
            }
            CertificateOutcome::Declined => log::info!("Keeping the existing certificate"),
        }
        Ok(backend.paths().clone())
    }

    fn webfront(&self, paths: &CertificatePaths) -> Result<(), CliError> {
        let packages = package_manager_for(self.format, &self.runner);
        let nginx = NginxConfigurator::new(self.settings, self.layout, self.format, &self.runner);

        nginx.install_packages(packages.as_ref())?;
        let report = nginx.post_run(paths)?;
        for site in &report.sites {
            if site.is_deployed() {
                log::info!("Deployed {}", site.path().display());
            } else {
                log::info!("{} already active", site.path().display());
            }
        }
        nginx.restart()?;
        Ok(())
    }
}
