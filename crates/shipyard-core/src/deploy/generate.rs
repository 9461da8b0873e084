//! Client generation after a settled migration.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::client::MigrationStatusSnapshot;
use crate::definition::GenerateEntry;
use crate::error::DeployError;
use crate::output::Output;

/// Written into every generator output directory
pub const DATAMODEL_ARTIFACT: &str = "datamodel.graphql";
pub const ENDPOINT_ARTIFACT: &str = "endpoint.json";

/// Inputs of one generation.
#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    /// Directory output paths are relative to
    pub base_dir: &'a Path,
    pub generators: &'a [GenerateEntry],
    pub datamodel: &'a str,
    pub service: &'a str,
    pub stage: &'a str,
    pub http_endpoint: &'a str,
    pub ws_endpoint: &'a str,
}

/// Produces client code for a deployed service.
pub trait ClientGenerator: Send + Sync {
    /// Generate all configured clients, returning the directories written.
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<Vec<PathBuf>, DeployError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EndpointDescriptor<'a> {
    generator: &'a str,
    service: &'a str,
    stage: &'a str,
    http_endpoint: &'a str,
    ws_endpoint: &'a str,
}

/// Writes the deployed data model and an endpoint descriptor into each
/// `[[generate]]` output directory, for client toolchains to pick up.
#[derive(Debug, Clone, Default)]
pub struct ArtifactGenerator;

impl ArtifactGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ClientGenerator for ArtifactGenerator {
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<Vec<PathBuf>, DeployError> {
        if request.generators.is_empty() {
            debug!("No generators configured");
            return Ok(Vec::new());
        }

        let mut written = Vec::with_capacity(request.generators.len());
        for entry in request.generators {
            let dir = request.base_dir.join(&entry.output);
            std::fs::create_dir_all(&dir).map_err(|e| {
                DeployError::Generate(format!("Failed to create {}: {}", dir.display(), e))
            })?;

            let descriptor = EndpointDescriptor {
                generator: &entry.generator,
                service: request.service,
                stage: request.stage,
                http_endpoint: request.http_endpoint,
                ws_endpoint: request.ws_endpoint,
            };
            let json = serde_json::to_string_pretty(&descriptor)?;

            for (name, content) in [
                (DATAMODEL_ARTIFACT, request.datamodel),
                (ENDPOINT_ARTIFACT, json.as_str()),
            ] {
                let path = dir.join(name);
                std::fs::write(&path, content).map_err(|e| {
                    DeployError::Generate(format!("Failed to write {}: {}", path.display(), e))
                })?;
            }

            debug!("Generated {} into {}", entry.generator, dir.display());
            written.push(dir);
        }
        Ok(written)
    }
}

/// Whether a hook regenerates the client on its own.
pub fn is_generate_hook(hook: &str) -> bool {
    hook.contains("generate") && hook.contains("shipyard")
}

/// Invokes the generator once a migration ended successfully.
pub struct GenerationTrigger<'a> {
    generator: &'a dyn ClientGenerator,
}

impl<'a> GenerationTrigger<'a> {
    pub fn new(generator: &'a dyn ClientGenerator) -> Self {
        Self { generator }
    }

    /// Generate if `snapshot` is success-shaped. Returns whether the
    /// generator ran.
    pub fn run(
        &self,
        snapshot: &MigrationStatusSnapshot,
        expected: usize,
        hooks: &[String],
        hooks_skipped: bool,
        request: &GenerateRequest<'_>,
        out: &mut dyn Output,
    ) -> Result<bool, DeployError> {
        if !snapshot.is_success(expected) {
            debug!(
                "Skipping client generation, migration ended with {}",
                snapshot.status.as_str()
            );
            return Ok(false);
        }

        if !hooks_skipped && hooks.iter().any(|hook| is_generate_hook(hook)) {
            out.warn(
                "Warning: The `shipyard generate` command was executed twice. The client is generated automatically after running `shipyard deploy`. It is not necessary to generate it via a `post-deploy` hook any more, you can therefore remove the hook if you do not need it otherwise.",
            );
        }

        for dir in self.generator.generate(request)? {
            out.log(&format!("Generated client in {}", dir.display()));
        }
        Ok(true)
    }
}
