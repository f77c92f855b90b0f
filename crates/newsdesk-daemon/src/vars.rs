//! `${VAR}` / `${VAR:-default}` interpolation for the config file.
//!
//! `$$` is a literal `$`; a bare `$NAME` is left as is.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static VAR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .expect("valid interpolation pattern")
});

/// Replace variables using `lookup`. Every unresolved name is reported.
pub fn interpolate_with<F>(input: &str, lookup: F) -> Result<String, Vec<String>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = Vec::new();

    let text = VAR_PATTERN.replace_all(input, |caps: &Captures| {
        let Some(name) = caps.get(1) else {
            return "$".to_string();
        };
        let name = name.as_str();
        let default = caps.get(2).map(|m| m.as_str());

        match (lookup(name), default) {
            (Some(value), _) if !value.is_empty() => value,
            (_, Some(default)) => default.to_string(),
            (Some(empty), None) => empty,
            (None, None) => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(text.into_owned())
    } else {
        Err(missing)
    }
}

pub fn interpolate(input: &str) -> Result<String, Vec<String>> {
    interpolate_with(input, |name| std::env::var(name).ok())
}
