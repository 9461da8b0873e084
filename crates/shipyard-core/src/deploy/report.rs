//! Classification and printing of a deploy payload.

use std::collections::BTreeMap;

use crate::client::{ChangeStep, DeployPayload, ErrorDescriptor};
use crate::error::{DeployError, FORCE_FLAG_DOCS};
use crate::output::{Output, Tone};

/// What a payload means for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The cluster rejected the deployment
    Errors,
    /// Warnings were reported and `--force` was not given
    UnforcedWarnings,
    /// Continue; `ignored_warnings` when warnings were accepted via `--force`
    Proceed { ignored_warnings: bool },
}

/// Classify a payload. Errors win over warnings.
pub fn classify(payload: &DeployPayload, force: bool) -> Verdict {
    if !payload.errors.is_empty() {
        Verdict::Errors
    } else if !payload.warnings.is_empty() && !force {
        Verdict::UnforcedWarnings
    } else {
        Verdict::Proceed {
            ignored_warnings: !payload.warnings.is_empty(),
        }
    }
}

/// Print a payload and decide whether the run continues.
///
/// Returns the change steps on success. Errors and unforced warnings are
/// printed in full before the returned error, so callers need not print
/// them again.
pub fn report_payload(
    payload: &DeployPayload,
    force: bool,
    dry_run: bool,
    out: &mut dyn Output,
) -> Result<Vec<ChangeStep>, DeployError> {
    match classify(payload, force) {
        Verdict::Errors => {
            out.log("");
            out.line(Tone::Error, "Errors:");
            print_descriptors(&payload.errors, "✖", Tone::Error, out);
            out.log("");
            out.log("Deployment canceled. Please fix the above errors to continue deploying.");
            out.log(&format!(
                "Read more about deployment errors here: {}",
                FORCE_FLAG_DOCS
            ));
            return Err(DeployError::DeploymentValidation {
                count: payload.errors.len(),
            });
        }
        Verdict::UnforcedWarnings => {
            print_warnings(payload, out);
            out.log("");
            out.log(
                "If you want to ignore the warnings, please deploy with the --force flag: $ shipyard deploy --force",
            );
            out.log(&format!(
                "Read more about deployment warnings here: {}",
                FORCE_FLAG_DOCS
            ));
            return Err(DeployError::UnforcedWarnings {
                count: payload.warnings.len(),
            });
        }
        Verdict::Proceed { ignored_warnings } => {
            if ignored_warnings {
                print_warnings(payload, out);
                out.log("");
                out.log("Ignoring warnings because you provided --force.");
            }
        }
    }

    let steps = payload.resolved_steps().to_vec();
    if steps.is_empty() {
        out.log(if dry_run {
            "There are no changes."
        } else {
            "Service is already up to date."
        });
        return Ok(steps);
    }

    out.log("");
    out.line(
        Tone::Bold,
        if dry_run { "Potential changes:" } else { "Changes:" },
    );
    print_steps(&steps, out);
    out.log("");
    Ok(steps)
}

fn print_warnings(payload: &DeployPayload, out: &mut dyn Output) {
    out.log("");
    out.line(Tone::Warning, "Warnings:");
    print_descriptors(&payload.warnings, "⚠", Tone::Warning, out);
}

/// Print descriptors grouped by their `type`, in first-seen order.
fn print_descriptors(
    descriptors: &[ErrorDescriptor],
    marker: &str,
    tone: Tone,
    out: &mut dyn Output,
) {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: BTreeMap<&str, Vec<&ErrorDescriptor>> = BTreeMap::new();
    for descriptor in descriptors {
        let kind = descriptor.kind.as_str();
        if !groups.contains_key(kind) {
            order.push(kind);
        }
        groups.entry(kind).or_default().push(descriptor);
    }

    for kind in order {
        out.log("");
        out.line(Tone::Bold, &format!("  {}", kind));
        for descriptor in groups.get(kind).into_iter().flatten() {
            let text = match &descriptor.field {
                Some(field) => format!("    {} {}: {}", marker, field, descriptor.description),
                None => format!("    {} {}", marker, descriptor.description),
            };
            out.line(tone, &text);
        }
    }
}

/// Print change steps grouped by the model they touch.
fn print_steps(steps: &[ChangeStep], out: &mut dyn Output) {
    let mut current: Option<&str> = None;
    for step in steps {
        let model = step.model.as_deref().unwrap_or(step.name.as_str());
        if current != Some(model) {
            out.log("");
            out.line(Tone::Bold, &format!("  {}", model));
            current = Some(model);
        }
        out.log(&format!("    {}", describe_step(step)));
    }
}

/// One-line description of a change step
pub fn describe_step(step: &ChangeStep) -> String {
    match &step.model {
        Some(model) if model != &step.name => {
            format!("{} `{}` on `{}`", step.kind, step.name, model)
        }
        _ => format!("{} `{}`", step.kind, step.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MigrationDescriptor;
    use crate::output::MemoryOutput;

    fn descriptor(kind: &str, field: Option<&str>, description: &str) -> ErrorDescriptor {
        ErrorDescriptor {
            kind: kind.into(),
            field: field.map(str::to_string),
            description: description.into(),
        }
    }

    fn step(kind: &str, name: &str, model: Option<&str>) -> ChangeStep {
        ChangeStep {
            kind: kind.into(),
            name: name.into(),
            model: model.map(str::to_string),
        }
    }

    #[test]
    fn test_classify() {
        let errors = DeployPayload {
            errors: vec![descriptor("User", None, "bad")],
            warnings: vec![descriptor("User", None, "careful")],
            ..Default::default()
        };
        assert_eq!(classify(&errors, true), Verdict::Errors);

        let warnings = DeployPayload {
            warnings: vec![descriptor("User", None, "careful")],
            ..Default::default()
        };
        assert_eq!(classify(&warnings, false), Verdict::UnforcedWarnings);
        assert_eq!(
            classify(&warnings, true),
            Verdict::Proceed {
                ignored_warnings: true
            }
        );
        assert_eq!(
            classify(&DeployPayload::default(), false),
            Verdict::Proceed {
                ignored_warnings: false
            }
        );
    }

    #[test]
    fn test_errors_are_grouped_by_type() {
        let payload = DeployPayload {
            errors: vec![
                descriptor("User", Some("email"), "must be unique"),
                descriptor("Post", None, "missing id"),
                descriptor("User", None, "duplicate model"),
            ],
            ..Default::default()
        };
        let mut out = MemoryOutput::new();
        let err = report_payload(&payload, false, false, &mut out).unwrap_err();
        assert!(matches!(err, DeployError::DeploymentValidation { count: 3 }));

        let lines = out.lines();
        let user = lines.iter().position(|l| *l == "  User").unwrap();
        let post = lines.iter().position(|l| *l == "  Post").unwrap();
        assert!(user < post);
        assert_eq!(lines[user + 1], "    ✖ email: must be unique");
        assert_eq!(lines[user + 2], "    ✖ duplicate model");
        assert!(out.contains("Deployment canceled. Please fix the above errors"));
        assert!(out.contains(FORCE_FLAG_DOCS));
    }

    #[test]
    fn test_unforced_warnings_abort() {
        let payload = DeployPayload {
            warnings: vec![descriptor("User", None, "data loss")],
            ..Default::default()
        };
        let mut out = MemoryOutput::new();
        let err = report_payload(&payload, false, false, &mut out).unwrap_err();
        assert!(matches!(err, DeployError::UnforcedWarnings { count: 1 }));
        assert!(out.contains("Warnings:"));
        assert!(out.contains("$ shipyard deploy --force"));
    }

    #[test]
    fn test_forced_warnings_proceed() {
        let payload = DeployPayload {
            warnings: vec![descriptor("User", None, "data loss")],
            steps: Some(vec![step("DeleteField", "age", Some("User"))]),
            ..Default::default()
        };
        let mut out = MemoryOutput::new();
        let steps = report_payload(&payload, true, false, &mut out).unwrap();
        assert_eq!(steps.len(), 1);
        assert!(out.contains("Ignoring warnings because you provided --force."));
        assert!(out.contains("Changes:"));
    }

    #[test]
    fn test_no_changes_messages() {
        let mut out = MemoryOutput::new();
        report_payload(&DeployPayload::default(), false, true, &mut out).unwrap();
        assert!(out.contains("There are no changes."));

        let mut out = MemoryOutput::new();
        report_payload(&DeployPayload::default(), false, false, &mut out).unwrap();
        assert!(out.contains("Service is already up to date."));
    }

    #[test]
    fn test_nested_and_top_level_steps_print_the_same() {
        let steps = vec![
            step("CreateModel", "User", None),
            step("CreateField", "email", Some("User")),
        ];
        let top_level = DeployPayload {
            steps: Some(steps.clone()),
            ..Default::default()
        };
        let nested = DeployPayload {
            migration: Some(MigrationDescriptor { revision: 0, steps }),
            ..Default::default()
        };

        let mut a = MemoryOutput::new();
        let mut b = MemoryOutput::new();
        report_payload(&top_level, false, true, &mut a).unwrap();
        report_payload(&nested, false, true, &mut b).unwrap();
        assert_eq!(a.events(), b.events());
        assert!(a.contains("Potential changes:"));
        assert!(a.contains("CreateField `email` on `User`"));
    }
}
