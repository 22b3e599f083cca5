// src/task/image.rs

//! Image build task.
//!
//! The build context lives in `<workdir>/image/<task>/` and contains:
//! - `Dockerfile`
//! - every explicitly copied file or directory
//! - every startup script, resolved on disk or generated
//! - `entrypoint.sh`, which runs the startup scripts in order and then
//!   keeps the container alive

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::{TaskContext, TaskOutput};
use crate::config::model::ProxySection;
use crate::errors::{Result, RigError};
use crate::exec::command::{build_args, render_args};

/// Directory inside the image holding the startup scripts.
pub const STARTUP_DIR: &str = "/startup/";

/// Generated script run as the image's entrypoint.
pub const ENTRYPOINT_SCRIPT: &str = "entrypoint.sh";

/// How long the entrypoint sleeps after the startup scripts.
pub const KEEPALIVE_SECS: u64 = 24 * 60 * 60;

/// A file written into the build context from memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: String,
    pub contents: String,
}

impl GeneratedFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Everything that goes into one image.
#[derive(Debug, Clone, Default)]
pub struct ImageSpec {
    pub base_image: String,
    pub proxy: ProxySection,
    /// Packages installed with the base image's package manager.
    pub packages: Vec<String>,
    /// Startup script names, run in this order.
    pub startup_scripts: Vec<String>,
    /// Directories searched (recursively) for startup scripts.
    pub startup_paths: Vec<PathBuf>,
    /// Volume mount points declared in the image.
    pub volumes: Vec<String>,
    /// `(source on host, destination directory in image)`.
    pub copies: Vec<(PathBuf, String)>,
    /// Startup scripts produced in memory; a startup script whose name
    /// matches one of these is not looked up on disk.
    pub generated: Vec<GeneratedFile>,
}

impl ImageSpec {
    pub fn new(base_image: impl Into<String>) -> Self {
        Self {
            base_image: base_image.into(),
            ..Self::default()
        }
    }

    fn generated_named(&self, name: &str) -> Option<&GeneratedFile> {
        self.generated.iter().find(|file| file.name == name)
    }

    /// Dockerfile for this image.
    ///
    /// Order: base image, proxy environment, package install, directory
    /// creation, volume declaration, explicit copies, startup scripts,
    /// entrypoint.
    pub fn dockerfile(&self) -> String {
        let mut lines = vec![format!("FROM {}", self.base_image)];

        if let Some(http) = &self.proxy.http {
            lines.push(format!("ENV http_proxy http://{http}"));
        }
        if let Some(https) = self.proxy.https.as_ref().or(self.proxy.http.as_ref()) {
            lines.push(format!("ENV https_proxy https://{https}"));
        }
        if let Some(http) = &self.proxy.http {
            lines.push(format!(
                "RUN echo \"Acquire::http::Proxy \\\"http://{http}\\\";\" > /etc/apt/apt.conf"
            ));
        }

        if !self.packages.is_empty() {
            lines.push(format!(
                "RUN apt-get update && apt-get install -y {}",
                self.packages.join(" ")
            ));
        }

        lines.push(format!("RUN mkdir -p {STARTUP_DIR}"));
        for volume in &self.volumes {
            if let Some(parent) = parent_dir(volume) {
                lines.push(format!("RUN mkdir -p {parent}"));
            }
        }
        for (_, dst) in &self.copies {
            lines.push(format!("RUN mkdir -p {dst}"));
        }

        if !self.volumes.is_empty() {
            lines.push(format!("VOLUME {}", self.volumes.join(" ")));
        }

        for (src, dst) in &self.copies {
            lines.push(format!(
                "COPY {} {}/",
                file_name(src),
                dst.trim_end_matches('/')
            ));
        }
        for script in &self.startup_scripts {
            lines.push(format!("COPY {} {STARTUP_DIR}", script_name(script)));
        }
        lines.push(format!("COPY {ENTRYPOINT_SCRIPT} {STARTUP_DIR}"));
        lines.push(format!(
            "ENTRYPOINT [\"sh\", \"{STARTUP_DIR}{ENTRYPOINT_SCRIPT}\"]"
        ));

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    /// Entrypoint script: each startup script in order, then a long sleep.
    pub fn entrypoint(&self) -> String {
        let mut text = String::from("#!/bin/bash\n");
        for script in &self.startup_scripts {
            text.push_str(&format!("{STARTUP_DIR}{}\n", script_name(script)));
        }
        text.push_str(&format!("sleep {KEEPALIVE_SECS}\n"));
        text
    }

    /// Locate a startup script on disk.
    ///
    /// An absolute path that exists is used as is; otherwise the search
    /// paths are walked in order and the first file with a matching name
    /// wins.
    pub fn resolve_script(&self, script: &str) -> Result<PathBuf> {
        let direct = Path::new(script);
        if direct.is_absolute() {
            if direct.is_file() {
                return Ok(direct.to_path_buf());
            }
            return Err(RigError::BuildFailure(format!(
                "startup script {} does not exist",
                direct.display()
            )));
        }

        let wanted = script_name(script);
        for root in &self.startup_paths {
            let found = WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .find(|entry| entry.file_name().to_string_lossy() == wanted);
            if let Some(entry) = found {
                return Ok(entry.into_path());
            }
        }

        Err(RigError::BuildFailure(format!(
            "startup script '{script}' not found under {:?}",
            self.startup_paths
        )))
    }
}

/// Task that builds an [`ImageSpec`] into an image tagged `tag`.
#[derive(Debug, Clone)]
pub struct ImageBuildTask {
    tag: String,
    spec: ImageSpec,
}

impl ImageBuildTask {
    pub fn new(tag: impl Into<String>, spec: ImageSpec) -> Self {
        Self {
            tag: tag.into(),
            spec,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn spec(&self) -> &ImageSpec {
        &self.spec
    }

    pub(crate) async fn run(
        &mut self,
        name: &str,
        ctx: &TaskContext<'_>,
        out: &mut TaskOutput,
    ) -> Result<()> {
        let context_dir = ctx.workdir.join("image").join(name);
        ctx.reporter.task_progress(name, "preparing build context");
        self.write_context(&context_dir)?;

        ctx.reporter
            .task_progress(name, &format!("building image {}", self.tag));
        out.push_out(format!("$ {}", render_args(&build_args(&context_dir, Some(&self.tag)))));

        let result = ctx.backend.build(&context_dir, &self.tag).await?;
        out.extend(&result);
        if !result.is_success() {
            return Err(RigError::BuildFailure(format!(
                "building {} from {} exited with {}",
                self.tag,
                context_dir.display(),
                result.exit_code
            )));
        }
        Ok(())
    }

    /// Populate `dir` with the Dockerfile and every file it references.
    pub fn write_context(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        for (src, _) in &self.spec.copies {
            if !src.exists() {
                return Err(RigError::BuildFailure(format!(
                    "copy source {} does not exist",
                    src.display()
                )));
            }
            copy_into(src, &dir.join(file_name(src)))?;
        }

        for script in &self.spec.startup_scripts {
            let target = dir.join(script_name(script));
            match self.spec.generated_named(script) {
                Some(generated) => fs::write(&target, &generated.contents)?,
                None => {
                    let source = self.spec.resolve_script(script)?;
                    debug!(script = %script, source = %source.display(), "resolved startup script");
                    fs::copy(&source, &target)?;
                }
            }
            make_executable(&target)?;
        }

        let entrypoint = dir.join(ENTRYPOINT_SCRIPT);
        fs::write(&entrypoint, self.spec.entrypoint())?;
        make_executable(&entrypoint)?;

        fs::write(dir.join("Dockerfile"), self.spec.dockerfile())?;
        Ok(())
    }
}

fn script_name(script: &str) -> String {
    file_name(Path::new(script))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parent directory of an image path, or `None` for `/` and top-level paths.
fn parent_dir(path: &str) -> Option<String> {
    let parent = Path::new(path.trim_end_matches('/')).parent()?;
    let parent = parent.to_string_lossy();
    if parent.is_empty() || parent == "/" {
        None
    } else {
        Some(parent.into_owned())
    }
}

/// Copy a file, or a directory tree, to `dst`.
fn copy_into(src: &Path, dst: &Path) -> Result<()> {
    if src.is_file() {
        fs::copy(src, dst)?;
        return Ok(());
    }

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| RigError::BuildFailure(format!("walking {}: {e}", src.display())))?;
        let relative = entry.path().strip_prefix(src).map_err(anyhow::Error::from)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
