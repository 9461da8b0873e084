//! `.env` file injection.

use std::path::Path;

use anyhow::Context;
use tracing::debug;

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped, an
/// optional `export ` prefix is accepted and matching quotes are stripped.
pub fn parse_env_file(content: &str) -> anyhow::Result<Vec<(String, String)>> {
    let mut vars = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid line {} in env file: {}", index + 1, raw))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Empty variable name on line {} of env file", index + 1);
        }
        vars.push((key.to_string(), unquote(value.trim()).to_string()));
    }
    Ok(vars)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Load an env file into the process environment.
///
/// Variables already set in the environment win over the file.
pub fn load_env_file(path: &Path) -> anyhow::Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read env file: {}", path.display()))?;
    let mut injected = 0;
    for (key, value) in parse_env_file(&content)? {
        if std::env::var_os(&key).is_some() {
            continue;
        }
        // SAFETY: runs while loading the definition, before any task or child process reads the environment.
        unsafe { std::env::set_var(&key, value) };
        injected += 1;
    }
    debug!("Injected {} variables from {}", injected, path.display());
    Ok(injected)
}
