//! Installer settings store
//!
//! A section -> key -> string mapping loaded once at startup, in the
//! configparser dialect used by the installer's `installer.cfg`. Values may
//! reference other keys of the same section (or of `DEFAULT`) with `%(key)s`.

use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the section whose keys every other section inherits
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Maximum nesting of `%(key)s` references before giving up
const MAX_INTERPOLATION_DEPTH: usize = 10;

type Section = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    defaults: Section,
    sections: BTreeMap<String, Section>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the default settings file path
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from("installer.cfg");
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("mailgate")
            .join("installer.cfg")
    }

    /// Load settings from a file; `.toml` files are read as TOML, anything
    /// else as an INI-style installer file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::parse_ini(&content)
        }
    }

    /// Parse INI-style content
    pub fn parse_ini(content: &str) -> Result<Self> {
        let mut settings = Settings::new();
        let mut current: Option<String> = None;
        let mut last_key: Option<String> = None;

        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                last_key = None;
                continue;
            }

            // Indented lines continue the previous value
            if raw.starts_with(char::is_whitespace) {
                if let (Some(section), Some(key)) = (&current, &last_key) {
                    let section = settings.section_mut(section);
                    if let Some(value) = section.get_mut(key) {
                        if !value.is_empty() {
                            value.push('\n');
                        }
                        value.push_str(line);
                        continue;
                    }
                }
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim().to_string();
                if name.is_empty() {
                    return Err(Error::parse(format!(
                        "line {}: empty section header",
                        lineno + 1
                    )));
                }
                if name != DEFAULT_SECTION {
                    settings.sections.entry(name.clone()).or_default();
                }
                current = Some(name);
                last_key = None;
                continue;
            }

            let Some(section) = &current else {
                return Err(Error::parse(format!(
                    "line {}: key/value found before any section header",
                    lineno + 1
                )));
            };

            let split_at = line.find(['=', ':']).ok_or_else(|| {
                Error::parse(format!(
                    "line {}: expected 'key = value', got '{}'",
                    lineno + 1,
                    line
                ))
            })?;
            let key = line[..split_at].trim().to_lowercase();
            let value = line[split_at + 1..].trim().to_string();
            if key.is_empty() {
                return Err(Error::parse(format!("line {}: empty key", lineno + 1)));
            }

            settings.section_mut(section).insert(key.clone(), value);
            last_key = Some(key);
        }

        Ok(settings)
    }

    /// Parse TOML content: each top-level table is a section and scalar
    /// values are stored in their string form
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        let mut settings = Settings::new();

        for (name, value) in table {
            let toml::Value::Table(entries) = value else {
                return Err(Error::parse(format!(
                    "top-level key '{}' must be a table (section)",
                    name
                )));
            };
            if name != DEFAULT_SECTION {
                settings.sections.entry(name.clone()).or_default();
            }
            for (key, value) in entries {
                let value = match value {
                    toml::Value::String(s) => s,
                    toml::Value::Integer(i) => i.to_string(),
                    toml::Value::Float(f) => f.to_string(),
                    toml::Value::Boolean(b) => b.to_string(),
                    toml::Value::Datetime(d) => d.to_string(),
                    _ => {
                        return Err(Error::parse(format!(
                            "[{}] {}: only scalar values are supported",
                            name, key
                        )))
                    }
                };
                settings.section_mut(&name).insert(key.to_lowercase(), value);
            }
        }

        Ok(settings)
    }

    /// Save raw (uninterpolated) settings as TOML
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut all = self.sections.clone();
        if !self.defaults.is_empty() {
            all.insert(DEFAULT_SECTION.to_string(), self.defaults.clone());
        }
        let content = toml::to_string_pretty(&all)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn section_mut(&mut self, name: &str) -> &mut Section {
        if name == DEFAULT_SECTION {
            &mut self.defaults
        } else {
            self.sections.entry(name.to_string()).or_default()
        }
    }

    fn section(&self, name: &str) -> Result<&Section> {
        if name == DEFAULT_SECTION {
            return Ok(&self.defaults);
        }
        self.sections
            .get(name)
            .ok_or_else(|| Error::NoSection(name.to_string()))
    }

    /// Section names, excluding `DEFAULT`
    pub fn sections(&self) -> Vec<&str> {
        self.sections.keys().map(String::as_str).collect()
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    pub fn add_section(&mut self, section: &str) -> Result<()> {
        if section == DEFAULT_SECTION || self.has_section(section) {
            return Err(Error::config(format!("Section '{}' already exists", section)));
        }
        self.sections.insert(section.to_string(), Section::new());
        Ok(())
    }

    /// Whether `key` is set in `section` (or inherited from `DEFAULT`).
    /// A missing section simply yields false.
    pub fn has_option(&self, section: &str, key: &str) -> bool {
        let key = key.to_lowercase();
        match self.section(section) {
            Ok(values) => values.contains_key(&key) || self.defaults.contains_key(&key),
            Err(_) => false,
        }
    }

    /// Set a value; the section must already exist
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) -> Result<()> {
        if section != DEFAULT_SECTION && !self.has_section(section) {
            return Err(Error::NoSection(section.to_string()));
        }
        self.section_mut(section)
            .insert(key.to_lowercase(), value.into());
        Ok(())
    }

    /// Raw value without `%(key)s` interpolation
    pub fn get_raw(&self, section: &str, key: &str) -> Result<&str> {
        let values = self.section(section)?;
        let key = key.to_lowercase();
        values
            .get(&key)
            .or_else(|| self.defaults.get(&key))
            .map(String::as_str)
            .ok_or_else(|| Error::no_option(section, &key))
    }

    /// Interpolated value
    pub fn get(&self, section: &str, key: &str) -> Result<String> {
        let raw = self.get_raw(section, key)?;
        self.interpolate(section, key, raw, 1)
    }

    pub fn get_boolean(&self, section: &str, key: &str) -> Result<bool> {
        let value = self.get(section, key)?;
        parse_boolean(&value).ok_or_else(|| Error::InvalidBoolean {
            section: section.to_string(),
            key: key.to_string(),
            value,
        })
    }

    /// Like [`Settings::get_boolean`], but a missing section or option
    /// yields `default`
    pub fn get_boolean_or(&self, section: &str, key: &str, default: bool) -> Result<bool> {
        match self.get_boolean(section, key) {
            Err(Error::NoSection(_)) | Err(Error::NoOption { .. }) => Ok(default),
            other => other,
        }
    }

    /// All interpolated key/value pairs of a section, `DEFAULT` keys included
    pub fn items(&self, section: &str) -> Result<Vec<(String, String)>> {
        let values = self.section(section)?;
        let mut keys: Vec<&String> = self.defaults.keys().chain(values.keys()).collect();
        keys.sort();
        keys.dedup();

        keys.into_iter()
            .map(|key| Ok((key.clone(), self.get(section, key)?)))
            .collect()
    }

    fn interpolate(&self, section: &str, key: &str, raw: &str, depth: usize) -> Result<String> {
        let bad = |message: String| Error::Interpolation {
            section: section.to_string(),
            key: key.to_string(),
            message,
        };

        if depth > MAX_INTERPOLATION_DEPTH {
            return Err(bad(format!(
                "recursion limit of {} exceeded",
                MAX_INTERPOLATION_DEPTH
            )));
        }

        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];

            if let Some(tail) = rest.strip_prefix("%%") {
                out.push('%');
                rest = tail;
            } else if let Some(tail) = rest.strip_prefix("%(") {
                let end = tail
                    .find(")s")
                    .ok_or_else(|| bad(format!("unterminated reference in '{}'", raw)))?;
                let name = tail[..end].to_lowercase();
                let referenced = match self.get_raw(section, &name) {
                    Ok(value) => value,
                    Err(_) => {
                        return Err(bad(format!("option '{}' is not defined", name)));
                    }
                };
                out.push_str(&self.interpolate(section, &name, referenced, depth + 1)?);
                rest = &tail[end + 2..];
            } else {
                return Err(bad(format!(
                    "'%' must be followed by '%' or '(' in '{}'",
                    raw
                )));
            }
        }
        out.push_str(rest);

        Ok(out)
    }
}

fn parse_boolean(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = "\
# Installer settings
[DEFAULT]
tls_dir = /etc/ssl

[general]
hostname_smtp = mail.example.com
hostname_imap = %(hostname_smtp)s
domain = example.com
force = no
tls_key_file_smtp = %(tls_dir)s/private/%(hostname_smtp)s.key
motd = first line
    second line

[certificate]
generate = true
type = self-signed

[modoboa]
user = modoboa
instance_path = /srv/modoboa/instance
";

    #[test]
    fn test_parse_and_interpolate() {
        let settings = Settings::parse_ini(SAMPLE).unwrap();
        assert_eq!(settings.get("general", "hostname_imap").unwrap(), "mail.example.com");
        assert_eq!(
            settings.get("general", "tls_key_file_smtp").unwrap(),
            "/etc/ssl/private/mail.example.com.key"
        );
        assert_eq!(
            settings.get_raw("general", "hostname_imap").unwrap(),
            "%(hostname_smtp)s"
        );
        assert_eq!(settings.get("general", "motd").unwrap(), "first line\nsecond line");
        assert_eq!(settings.sections(), vec!["certificate", "general", "modoboa"]);
    }

    #[test]
    fn test_missing_section_is_distinguishable() {
        let settings = Settings::parse_ini(SAMPLE).unwrap();
        let err = settings.get("automx", "enabled").unwrap_err();
        assert!(err.is_no_section());

        let err = settings.get("general", "nope").unwrap_err();
        assert!(!err.is_no_section());
        assert!(matches!(err, Error::NoOption { .. }));
    }

    #[test]
    fn test_booleans() {
        let settings = Settings::parse_ini(SAMPLE).unwrap();
        assert!(settings.get_boolean("certificate", "generate").unwrap());
        assert!(!settings.get_boolean("general", "force").unwrap());
        assert!(matches!(
            settings.get_boolean("general", "domain"),
            Err(Error::InvalidBoolean { .. })
        ));
        assert!(!settings.get_boolean_or("automx", "enabled", false).unwrap());
        assert!(settings.get_boolean_or("general", "missing", true).unwrap());
        assert!(settings.get_boolean_or("general", "domain", false).is_err());
    }

    #[test]
    fn test_has_option_and_set() {
        let mut settings = Settings::parse_ini(SAMPLE).unwrap();
        assert!(settings.has_option("general", "domain"));
        assert!(settings.has_option("general", "tls_dir"));
        assert!(!settings.has_option("general", "tls_cert_file_smtp"));
        assert!(!settings.has_option("missing", "domain"));

        settings.set("general", "Force", "yes").unwrap();
        assert!(settings.get_boolean("general", "force").unwrap());

        assert!(settings.set("missing", "key", "value").unwrap_err().is_no_section());
        settings.add_section("missing").unwrap();
        settings.set("missing", "key", "value").unwrap();
        assert_eq!(settings.get("missing", "key").unwrap(), "value");
        assert!(settings.add_section("missing").is_err());
    }

    #[test]
    fn test_interpolation_errors() {
        let settings = Settings::parse_ini(
            "[a]\nloop = %(loop)s\nundefined = %(nothing)s\nlone = 50%\nescaped = 50%%\n",
        )
        .unwrap();
        assert!(matches!(
            settings.get("a", "loop"),
            Err(Error::Interpolation { .. })
        ));
        assert!(matches!(
            settings.get("a", "undefined"),
            Err(Error::Interpolation { .. })
        ));
        assert!(matches!(
            settings.get("a", "lone"),
            Err(Error::Interpolation { .. })
        ));
        assert_eq!(settings.get("a", "escaped").unwrap(), "50%");
    }

    #[test]
    fn test_items_include_defaults() {
        let settings = Settings::parse_ini(SAMPLE).unwrap();
        let items = settings.items("modoboa").unwrap();
        assert!(items.contains(&("tls_dir".to_string(), "/etc/ssl".to_string())));
        assert!(items.contains(&("user".to_string(), "modoboa".to_string())));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Settings::parse_ini("key = value\n").is_err());
        assert!(Settings::parse_ini("[general]\njust a line\n").is_err());
        assert!(Settings::parse_ini("[]\n").is_err());
    }

    #[test]
    fn test_toml_load_and_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("installer.toml");
        fs::write(
            &path,
            r#"
[general]
hostname_smtp = "mail.example.com"
force = false

[certificate]
generate = true
type = "letsencrypt"

[radicale]
enabled = false
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.get("certificate", "type").unwrap(), "letsencrypt");
        assert!(!settings.get_boolean("radicale", "enabled").unwrap());

        let saved = dir.path().join("out").join("settings.toml");
        settings.save_to(&saved).unwrap();
        let reloaded = Settings::load(&saved).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn test_toml_rejects_non_sections() {
        assert!(Settings::from_toml_str("hostname = \"x\"\n").is_err());
        assert!(Settings::from_toml_str("[a]\nlist = [1, 2]\n").is_err());
    }
}
