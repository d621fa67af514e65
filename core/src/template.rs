//! Configuration file templates
//!
//! Templates use `%name` or `%{name}` placeholders; `%%` is a literal
//! percent sign. Every placeholder must be present in the context.

use crate::{Error, Result, TemplateContext};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"%(?:(?P<escaped>%)|\{(?P<braced>[_A-Za-z][_A-Za-z0-9]*)\}|(?P<named>[_A-Za-z][_A-Za-z0-9]*)|(?P<invalid>))")
            .expect("placeholder pattern is valid")
    })
}

/// Substitute all placeholders of `source` from `context`
pub fn render(source: &str, context: &TemplateContext) -> Result<String> {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;

    for caps in placeholder_pattern().captures_iter(source) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        out.push_str(&source[last..whole.start]);
        last = whole.end;

        if caps.name("escaped").is_some() {
            out.push('%');
            continue;
        }

        let name = caps
            .name("braced")
            .or_else(|| caps.name("named"))
            .map(|m| m.as_str());
        match name {
            Some(name) => {
                let value = context.get(name).ok_or_else(|| {
                    Error::template(format!("no value for placeholder '%{}'", name))
                })?;
                out.push_str(value);
            }
            None => {
                let line = source[..whole.start].matches('\n').count() + 1;
                return Err(Error::template(format!(
                    "invalid placeholder at line {}",
                    line
                )));
            }
        }
    }
    out.push_str(&source[last..]);

    Ok(out)
}

/// Render the template file `src` into `dst`, prefixed with an
/// installation timestamp
pub fn copy_from_template(src: &Path, dst: &Path, context: &TemplateContext) -> Result<()> {
    if !src.is_file() {
        return Err(Error::TemplateNotFound(src.to_path_buf()));
    }
    let source = fs::read_to_string(src)?;
    let body = render(&source, context).map_err(|e| match e {
        Error::Template(msg) => Error::template(format!("{}: {}", src.display(), msg)),
        other => other,
    })?;

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    let now = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S");
    let content = format!("# This file was automatically installed on {}\n{}", now, body);
    fs::write(dst, content)?;

    log::debug!("Rendered {} -> {}", src.display(), dst.display());
    Ok(())
}
