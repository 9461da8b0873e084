//! Small formatting and version helpers shared by the deploy steps.

use std::time::Duration;

/// Format an elapsed duration the way action suffixes show it ("420ms", "1.5s").
pub fn pretty_time(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}

/// Check whether a server version is at least `minimum`.
///
/// Server versions are not always strict semver ("1.30-beta", "1.29"), so the
/// numeric part before any channel suffix is padded to three components and
/// compared with the prerelease ignored.
pub fn satisfies_version(version: &str, minimum: &str) -> bool {
    let (Some(actual), Some(required)) = (normalize_version(version), normalize_version(minimum))
    else {
        return false;
    };
    let Ok(req) = semver::VersionReq::parse(&format!(">={}", required)) else {
        return false;
    };
    req.matches(&actual)
}

fn normalize_version(input: &str) -> Option<semver::Version> {
    let core = input.trim().trim_start_matches('v');
    let core = core.split(['-', '+']).next()?;
    let mut parts: Vec<u64> = Vec::with_capacity(3);
    for part in core.split('.') {
        parts.push(part.parse().ok()?);
    }
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    parts.resize(3, 0);
    Some(semver::Version::new(parts[0], parts[1], parts[2]))
}

/// Split a command line on single spaces into program and arguments.
///
/// Hooks and seed scripts are plain space-separated command lines; quoting is
/// not interpreted.
pub fn split_command(command: &str) -> Option<(String, Vec<String>)> {
    let mut parts = command.split(' ').filter(|part| !part.is_empty());
    let program = parts.next()?.to_string();
    let args = parts.map(str::to_string).collect();
    Some((program, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_time() {
        assert_eq!(pretty_time(Duration::from_millis(420)), "420ms");
        assert_eq!(pretty_time(Duration::from_millis(1500)), "1.5s");
    }

    #[test]
    fn test_satisfies_version_plain() {
        assert!(satisfies_version("1.29.0", "1.29.0"));
        assert!(satisfies_version("1.34.10", "1.29.0"));
        assert!(!satisfies_version("1.28.3", "1.29.0"));
    }

    #[test]
    fn test_satisfies_version_channels() {
        assert!(satisfies_version("1.30-beta", "1.29.0"));
        assert!(satisfies_version("1.29.1-alpha.3", "1.29.0"));
        assert!(satisfies_version("v1.29", "1.29.0"));
    }

    #[test]
    fn test_satisfies_version_garbage() {
        assert!(!satisfies_version("", "1.29.0"));
        assert!(!satisfies_version("latest", "1.29.0"));
    }

    #[test]
    fn test_split_command() {
        let (program, args) = split_command("npm run  seed").unwrap();
        assert_eq!(program, "npm");
        assert_eq!(args, vec!["run".to_string(), "seed".to_string()]);
        assert!(split_command("   ").is_none());
    }
}
