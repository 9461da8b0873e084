//! Definition parser with env interpolation and helpful error messages

use anyhow::{Context, Result};
use std::path::Path;

use super::schema::DefinitionFile;

/// Parse a definition file from disk
pub fn parse_definition(path: &Path) -> Result<DefinitionFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read definition file: {}", path.display()))?;

    parse_definition_str(&content)
        .with_context(|| format!("Failed to parse definition file: {}", path.display()))
}

/// Parse definition content from string
pub fn parse_definition_str(content: &str) -> Result<DefinitionFile> {
    let content = interpolate_env(content, |name| std::env::var(name).ok())?;
    let definition: DefinitionFile =
        toml::from_str(&content).map_err(|e| enhance_toml_error(e, &content))?;

    definition.validate()?;

    Ok(definition)
}

/// Replace `${env:NAME}` references using `lookup`.
///
/// An unset variable is an error rather than an empty string, so secrets are
/// never deployed blank by accident.
pub fn interpolate_env<F>(content: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    const OPEN: &str = "${env:";

    let mut result = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find(OPEN) {
        result.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        let end = after
            .find('}')
            .ok_or_else(|| anyhow::anyhow!("Unterminated env reference: {}{}", OPEN, after))?;
        let name = after[..end].trim();
        let value = lookup(name).ok_or_else(|| {
            anyhow::anyhow!("Environment variable {} referenced in definition is not set", name)
        })?;
        result.push_str(&value);
        rest = &after[end + 1..];
    }
    result.push_str(rest);
    Ok(result)
}

/// Enhance TOML parsing errors with helpful context
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.to_string();

    let line_hint = error.span().map(|span| {
        content[..span.start.min(content.len())]
            .chars()
            .filter(|c| *c == '\n')
            .count()
            + 1
    });

    if let Some(line_num) = line_hint {
        let context = get_line_context(content, line_num);
        anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            context,
            error_msg
        )
    } else {
        anyhow::anyhow!("TOML parsing error: {}", error_msg)
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::schema::DatamodelFiles;

    #[test]
    fn test_parse_full_definition() {
        let toml = r#"
endpoint = "http://localhost:4466/blog/dev"
datamodel = ["types.graphql", "enums.graphql"]
secret = "a,b"

[subscriptions.welcome]
query = "welcome.graphql"
webhook = { url = "https://hooks.example.com", headers = { Authorization = "Bearer x" } }

[seed]
run = "node seed.js"

[hooks]
post-deploy = ["echo one", "echo two"]

[[generate]]
generator = "typescript-client"
output = "./generated"
"#;

        let def = parse_definition_str(toml).unwrap();
        assert_eq!(def.endpoint.as_deref(), Some("http://localhost:4466/blog/dev"));
        assert_eq!(
            def.datamodel,
            Some(DatamodelFiles::Many(vec![
                "types.graphql".into(),
                "enums.graphql".into()
            ]))
        );
        assert_eq!(def.hooks.post_deploy, vec!["echo one", "echo two"]);
        assert_eq!(def.subscriptions["welcome"].webhook.headers().len(), 1);
        assert_eq!(def.seed.unwrap().source(), Some("node seed.js"));
        assert_eq!(def.generate.len(), 1);
    }

    #[test]
    fn test_parse_single_datamodel_string() {
        let def = parse_definition_str("datamodel = \"datamodel.graphql\"").unwrap();
        assert_eq!(
            def.datamodel,
            Some(DatamodelFiles::One("datamodel.graphql".into()))
        );
    }

    #[test]
    fn test_parse_empty_definition() {
        let def = parse_definition_str("").unwrap();
        assert!(def.endpoint.is_none());
        assert!(def.datamodel.is_none());
        assert!(def.hooks.post_deploy.is_empty());
    }

    #[test]
    fn test_parse_error_has_line_context() {
        let err = parse_definition_str("endpoint = \"x\"\ndatamodel = [\n").unwrap_err();
        assert!(err.to_string().contains("TOML parsing error"));
    }

    #[test]
    fn test_validate_rejects_empty_webhook() {
        let toml = r#"
[subscriptions.welcome]
query = "welcome.graphql"
webhook = ""
"#;
        let err = parse_definition_str(toml).unwrap_err();
        assert!(err.to_string().contains("empty webhook url"));
    }

    #[test]
    fn test_interpolate_env() {
        let lookup = |name: &str| (name == "SECRET").then(|| "s3cr3t".to_string());
        let out = interpolate_env("secret = \"${env:SECRET}\"", lookup).unwrap();
        assert_eq!(out, "secret = \"s3cr3t\"");

        let err = interpolate_env("secret = \"${env:MISSING}\"", lookup).unwrap_err();
        assert!(err.to_string().contains("MISSING"));

        assert!(interpolate_env("${env:OPEN", lookup).is_err());
    }
}
