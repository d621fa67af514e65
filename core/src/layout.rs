//! Filesystem locations touched during provisioning

use std::path::PathBuf;

/// Every filesystem root used by the provisioning steps
#[derive(Debug, Clone)]
pub struct SystemLayout {
    /// Candidate trust-store base directories, in priority order
    pub trust_store_dirs: Vec<PathBuf>,
    /// Root of the certbot configuration tree (`live/`, `renewal/`)
    pub letsencrypt_dir: PathBuf,
    /// Directory for cron drop-in files
    pub cron_dir: PathBuf,
    /// nginx configuration root
    pub nginx_config_dir: PathBuf,
    /// Directory holding `<app>.conf.tpl` templates
    pub templates_dir: PathBuf,
    pub os_release: PathBuf,
}

impl Default for SystemLayout {
    fn default() -> Self {
        Self {
            trust_store_dirs: vec![PathBuf::from("/etc/pki/tls"), PathBuf::from("/etc/ssl")],
            letsencrypt_dir: PathBuf::from("/etc/letsencrypt"),
            cron_dir: PathBuf::from("/etc/cron.d"),
            nginx_config_dir: PathBuf::from("/etc/nginx"),
            templates_dir: PathBuf::from("templates"),
            os_release: PathBuf::from("/etc/os-release"),
        }
    }
}

impl SystemLayout {
    pub fn letsencrypt_live_dir(&self, hostname: &str) -> PathBuf {
        self.letsencrypt_dir.join("live").join(hostname)
    }

    pub fn letsencrypt_renewal_file(&self, hostname: &str) -> PathBuf {
        self.letsencrypt_dir
            .join("renewal")
            .join(format!("{}.conf", hostname))
    }

    pub fn renewal_cron_file(&self) -> PathBuf {
        self.cron_dir.join("letsencrypt")
    }

    pub fn dhparam_file(&self) -> PathBuf {
        self.nginx_config_dir.join("dhparam.pem")
    }

    pub fn template_file(&self, app: &str) -> PathBuf {
        self.templates_dir.join(format!("{}.conf.tpl", app))
    }
}
