//! Substitution contexts for application site templates

use crate::{PackageFormat, Result, Settings, SystemLayout};
use std::collections::BTreeMap;

/// Application whose settings section stands in for templates that have no
/// section of their own
pub const DEFAULT_APP: &str = "modoboa";

/// Section holding the web front end's own settings
const FRONT_SECTION: &str = "nginx";

/// Placeholder values for one template render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    values: BTreeMap<String, String>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn extend<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Path of the uwsgi socket serving `app`
pub fn uwsgi_socket_path(format: PackageFormat, app: &str) -> String {
    match format {
        PackageFormat::Deb => format!("/run/uwsgi/app/{}_instance/socket", app),
        PackageFormat::Rpm => format!("/run/uwsgi/{}_instance.sock", app),
    }
}

/// Builds template contexts from the settings store
pub struct ContextResolver<'a> {
    settings: &'a Settings,
    format: PackageFormat,
    layout: &'a SystemLayout,
}

impl<'a> ContextResolver<'a> {
    pub fn new(settings: &'a Settings, format: PackageFormat, layout: &'a SystemLayout) -> Self {
        Self {
            settings,
            format,
            layout,
        }
    }

    /// Context for `app`. Fails with `NoSection` if `app` has no section.
    pub fn resolve(&self, app: &str) -> Result<TemplateContext> {
        let mut context = self.generic()?;
        self.add_app_fields(&mut context, app)?;
        Ok(context)
    }

    /// Context for `app`, resolved under [`DEFAULT_APP`] when `app` has no
    /// settings section
    pub fn resolve_with_fallback(&self, app: &str) -> Result<TemplateContext> {
        let mut context = self.generic()?;
        match self.add_app_fields(&mut context, app) {
            Err(e) if e.is_no_section() && app != DEFAULT_APP => {
                log::debug!("No [{}] section, using [{}] for its template", app, DEFAULT_APP);
                self.add_app_fields(&mut context, DEFAULT_APP)?;
            }
            other => other?,
        }
        Ok(context)
    }

    /// Fields shared by every template
    fn generic(&self) -> Result<TemplateContext> {
        let mut context = TemplateContext::new();
        context.extend(self.settings.items("general")?);
        if self.settings.has_section(FRONT_SECTION) {
            context.extend(self.settings.items(FRONT_SECTION)?);
        }
        context.insert("package_format", self.format.as_str());
        context.insert(
            "nginx_config_dir",
            self.layout.nginx_config_dir.display().to_string(),
        );
        Ok(context)
    }

    fn add_app_fields(&self, context: &mut TemplateContext, app: &str) -> Result<()> {
        let instance_path = self.settings.get(app, "instance_path")?;
        context.insert("app_instance_path", instance_path);
        context.insert("uwsgi_socket_path", uwsgi_socket_path(self.format, app));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn settings() -> Settings {
        Settings::parse_ini(
            "[general]\n\
             hostname_smtp = mail.example.com\n\
             domain = example.com\n\
             [nginx]\n\
             client_max_body_size = 10M\n\
             [modoboa]\n\
             instance_path = /srv/modoboa/instance\n\
             [automx]\n\
             instance_path = /srv/automx/instance\n",
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_application_section() {
        let settings = settings();
        let layout = SystemLayout::default();
        let resolver = ContextResolver::new(&settings, PackageFormat::Deb, &layout);

        let context = resolver.resolve("automx").unwrap();
        assert_eq!(context.get("app_instance_path"), Some("/srv/automx/instance"));
        assert_eq!(
            context.get("uwsgi_socket_path"),
            Some("/run/uwsgi/app/automx_instance/socket")
        );
        assert_eq!(context.get("hostname_smtp"), Some("mail.example.com"));
        assert_eq!(context.get("client_max_body_size"), Some("10M"));
        assert_eq!(context.get("package_format"), Some("deb"));
        assert_eq!(context.get("nginx_config_dir"), Some("/etc/nginx"));
    }

    #[test]
    fn test_missing_section_without_fallback() {
        let settings = settings();
        let layout = SystemLayout::default();
        let resolver = ContextResolver::new(&settings, PackageFormat::Deb, &layout);
        assert!(resolver.resolve("proxy_services").unwrap_err().is_no_section());
    }

    #[test]
    fn test_fallback_to_default_application() {
        let settings = settings();
        let layout = SystemLayout::default();
        let resolver = ContextResolver::new(&settings, PackageFormat::Rpm, &layout);

        let context = resolver.resolve_with_fallback("proxy_services").unwrap();
        assert_eq!(context.get("app_instance_path"), Some("/srv/modoboa/instance"));
        assert_eq!(
            context.get("uwsgi_socket_path"),
            Some("/run/uwsgi/modoboa_instance.sock")
        );
    }

    #[test]
    fn test_fallback_failure_propagates_no_section() {
        let settings = Settings::parse_ini("[general]\nhostname_smtp = a\n").unwrap();
        let layout = SystemLayout::default();
        let resolver = ContextResolver::new(&settings, PackageFormat::Deb, &layout);
        let err = resolver.resolve_with_fallback("proxy_services").unwrap_err();
        assert!(matches!(err, Error::NoSection(section) if section == DEFAULT_APP));
    }

    #[test]
    fn test_missing_option_is_not_retried() {
        let settings = Settings::parse_ini(
            "[general]\nhostname_smtp = a\n[radicale]\nenabled = true\n[modoboa]\ninstance_path = /srv\n",
        )
        .unwrap();
        let layout = SystemLayout::default();
        let resolver = ContextResolver::new(&settings, PackageFormat::Deb, &layout);
        let err = resolver.resolve_with_fallback("radicale").unwrap_err();
        assert!(matches!(err, Error::NoOption { .. }));
    }
}
