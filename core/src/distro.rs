//! Host distribution detection and package management

use crate::exec::{CommandLine, CommandRunner};
use crate::{PackageFormat, Result};
use std::fs;
use std::path::Path;

/// Identification fields read from `/etc/os-release`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistroInfo {
    pub name: String,
    pub version: String,
    pub id: String,
    pub id_like: Vec<String>,
}

impl DistroInfo {
    /// Parse an os-release file
    pub fn parse_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Parse os-release content
    pub fn parse(content: &str) -> Self {
        let mut info = DistroInfo::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"').trim_matches('\'');
                match key.trim() {
                    "NAME" => info.name = value.to_string(),
                    "VERSION_ID" => info.version = value.to_string(),
                    "ID" => info.id = value.to_lowercase(),
                    "ID_LIKE" => {
                        info.id_like = value
                            .split_whitespace()
                            .map(|s| s.to_lowercase())
                            .collect()
                    }
                    _ => {}
                }
            }
        }

        info
    }

    pub fn distribution(&self) -> Distribution {
        if self.name == "Ubuntu" || self.id == "ubuntu" {
            return Distribution::Ubuntu {
                version: self.version.clone(),
            };
        }
        if self.name.starts_with("Debian") || self.id == "debian" {
            return Distribution::Debian;
        }
        let rhel_family = ["centos", "rhel", "rocky", "almalinux", "fedora"];
        if self.name.contains("CentOS")
            || rhel_family.contains(&self.id.as_str())
            || self.id_like.iter().any(|id| rhel_family.contains(&id.as_str()))
        {
            return Distribution::RedHat;
        }
        Distribution::Unknown(self.name.clone())
    }

    pub fn package_format(&self) -> PackageFormat {
        match self.distribution() {
            Distribution::RedHat => PackageFormat::Rpm,
            _ => PackageFormat::Deb,
        }
    }
}

/// Distribution families that need different provisioning steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Distribution {
    Ubuntu { version: String },
    Debian,
    RedHat,
    Unknown(String),
}

impl Distribution {
    pub fn display_name(&self) -> &str {
        match self {
            Distribution::Ubuntu { .. } => "Ubuntu",
            Distribution::Debian => "Debian",
            Distribution::RedHat => "Red Hat family",
            Distribution::Unknown(name) => name,
        }
    }
}

/// Package manager of the host
pub trait PackageManager {
    fn format(&self) -> PackageFormat;

    /// Refresh package indexes
    fn update(&self) -> Result<()>;

    fn install(&self, packages: &[&str]) -> Result<()>;
}

/// apt-get backend for deb-based hosts
pub struct Apt<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Apt<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    fn apt_get(&self) -> CommandLine {
        CommandLine::new("apt-get").env("DEBIAN_FRONTEND", "noninteractive")
    }
}

impl PackageManager for Apt<'_> {
    fn format(&self) -> PackageFormat {
        PackageFormat::Deb
    }

    fn update(&self) -> Result<()> {
        self.runner
            .run_checked(&self.apt_get().args(["update", "--quiet"]))?;
        Ok(())
    }

    fn install(&self, packages: &[&str]) -> Result<()> {
        log::info!("Installing packages: {}", packages.join(" "));
        self.runner.run_checked(
            &self
                .apt_get()
                .args(["install", "--quiet", "--assume-yes"])
                .args(packages.iter().copied()),
        )?;
        Ok(())
    }
}

/// yum backend for rpm-based hosts
pub struct Yum<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Yum<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }
}

impl PackageManager for Yum<'_> {
    fn format(&self) -> PackageFormat {
        PackageFormat::Rpm
    }

    fn update(&self) -> Result<()> {
        // yum refreshes metadata on install
        Ok(())
    }

    fn install(&self, packages: &[&str]) -> Result<()> {
        log::info!("Installing packages: {}", packages.join(" "));
        self.runner.run_checked(
            &CommandLine::new("yum")
                .args(["install", "-y", "--quiet"])
                .args(packages.iter().copied()),
        )?;
        Ok(())
    }
}

/// Package manager matching a packaging family
pub fn package_manager_for<'a>(
    format: PackageFormat,
    runner: &'a dyn CommandRunner,
) -> Box<dyn PackageManager + 'a> {
    match format {
        PackageFormat::Deb => Box::new(Apt::new(runner)),
        PackageFormat::Rpm => Box::new(Yum::new(runner)),
    }
}
