//! Mailgate Core Library
//!
//! This crate provides TLS certificate provisioning (self-signed or Let's
//! Encrypt) and idempotent nginx site deployment for a mail server
//! installation.

pub mod certificate;
pub mod context;
pub mod deploy;
pub mod distro;
pub mod error;
pub mod exec;
pub mod layout;
pub mod model;
pub mod nginx;
pub mod prompt;
pub mod settings;
pub mod system;
pub mod template;

#[cfg(test)]
pub(crate) mod testing;

pub use certificate::{backend_for, CertificateBackend, CertificateOutcome, Host};
pub use context::{ContextResolver, TemplateContext};
pub use deploy::{DeployOutcome, SiteDeployer, SiteRequest};
pub use distro::{package_manager_for, DistroInfo, Distribution, PackageManager};
pub use error::{Error, Result};
pub use exec::{CommandLine, CommandOutput, CommandRunner, SystemRunner};
pub use layout::SystemLayout;
pub use model::*;
pub use nginx::{FrontEndReport, NginxConfigurator};
pub use prompt::{Prompter, StdinPrompter};
pub use settings::Settings;
