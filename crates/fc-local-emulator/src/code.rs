use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;

use tempfile::TempDir;
use zip::ZipArchive;

use fc_local_core::{FunctionDescriptor, LocalError, Runtime, RuntimeFamily};

/// Extracts a code archive into a directory.
pub trait CodeUnpacker: Send + Sync {
    fn unpack<'a>(
        &'a self,
        archive: &'a Path,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), LocalError>> + Send + 'a>>;
}

/// Extracts zip, jar and war archives with the `zip` crate.
pub struct ZipUnpacker;

impl CodeUnpacker for ZipUnpacker {
    fn unpack<'a>(
        &'a self,
        archive: &'a Path,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), LocalError>> + Send + 'a>> {
        let archive = archive.to_path_buf();
        let dest = dest.to_path_buf();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || extract_archive(&archive, &dest))
                .await
                .map_err(|e| LocalError::UnpackError(format!("Unpack task failed: {e}")))?
        })
    }
}

fn extract_archive(archive: &Path, dest: &Path) -> Result<(), LocalError> {
    let file = std::fs::File::open(archive).map_err(|e| {
        LocalError::UnpackError(format!("Failed to open {}: {e}", archive.display()))
    })?;
    let mut zip = ZipArchive::new(file).map_err(|e| {
        LocalError::UnpackError(format!("{} is not a valid archive: {e}", archive.display()))
    })?;
    zip.extract(dest).map_err(|e| {
        LocalError::UnpackError(format!("Failed to extract {}: {e}", archive.display()))
    })?;
    tracing::debug!(archive = %archive.display(), entries = zip.len(), "Archive extracted");
    Ok(())
}

/// Records archives instead of extracting them.
#[derive(Default)]
pub struct StubUnpacker {
    calls: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl StubUnpacker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl CodeUnpacker for StubUnpacker {
    fn unpack<'a>(
        &'a self,
        archive: &'a Path,
        dest: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), LocalError>> + Send + 'a>> {
        Box::pin(async move {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((archive.to_path_buf(), dest.to_path_buf()));
            }
            Ok(())
        })
    }
}

/// Code directory mounted at `/code`, plus the temp dir backing it when the
/// code had to be unpacked.
#[derive(Debug, Default)]
pub struct PreparedCode {
    dir: Option<PathBuf>,
    unpacked: Option<TempDir>,
}

impl PreparedCode {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn is_unpacked(&self) -> bool {
        self.unpacked.is_some()
    }

    /// Remove the unpacked temp dir, if any.
    pub fn cleanup(self) -> Result<(), LocalError> {
        if let Some(tmp) = self.unpacked {
            let path = tmp.path().to_path_buf();
            tmp.close()?;
            tracing::info!(dir = %path.display(), "Cleaned temporary code dir");
        }
        Ok(())
    }
}

/// Turns a descriptor's `code` into a host directory.
pub struct CodeResolver<'a> {
    unpacker: &'a dyn CodeUnpacker,
    base_dir: &'a Path,
}

impl<'a> CodeResolver<'a> {
    pub fn new(unpacker: &'a dyn CodeUnpacker, base_dir: &'a Path) -> Self {
        Self { unpacker, base_dir }
    }

    pub async fn resolve(
        &self,
        runtime: Runtime,
        descriptor: &FunctionDescriptor,
    ) -> Result<PreparedCode, LocalError> {
        let Some(src) = descriptor.code_src() else {
            return Ok(PreparedCode::none());
        };
        let resolved = if Path::new(src).is_absolute() {
            PathBuf::from(src)
        } else {
            self.base_dir.join(src)
        };

        let is_jar = src.ends_with(".jar");
        let needs_unpack = src.ends_with(".zip")
            || src.ends_with(".war")
            || (is_jar && runtime.family() == RuntimeFamily::Java);

        if needs_unpack {
            return self.unpack(&resolved).await;
        }

        if is_jar && runtime.family() == RuntimeFamily::Custom {
            if custom_bootstrap(descriptor).contains("java -jar") {
                let dir = resolved.parent().map(Path::to_path_buf).unwrap_or(resolved);
                tracing::debug!(dir = %dir.display(), "Mounting jar directory for java -jar bootstrap");
                return Ok(PreparedCode {
                    dir: Some(dir),
                    unpacked: None,
                });
            }
            return self.unpack(&resolved).await;
        }

        Ok(PreparedCode {
            dir: Some(resolved),
            unpacked: None,
        })
    }

    async fn unpack(&self, archive: &Path) -> Result<PreparedCode, LocalError> {
        let tmp = tempfile::Builder::new().prefix("fc-local-code-").tempdir()?;
        tracing::info!(
            archive = %archive.display(),
            dir = %tmp.path().display(),
            "Code is an archive, unpacking"
        );
        self.unpacker.unpack(archive, tmp.path()).await?;
        Ok(PreparedCode {
            dir: Some(tmp.path().to_path_buf()),
            unpacked: Some(tmp),
        })
    }
}

fn custom_bootstrap(descriptor: &FunctionDescriptor) -> String {
    let config = descriptor.custom_runtime_config.as_ref();
    let command = config.and_then(|c| c.command.as_deref()).unwrap_or_default();
    let args = config.and_then(|c| c.args.as_deref()).unwrap_or_default();
    format!("{} {}", command.join(" "), args.join(" "))
}
