use crate::GeneratedArtifacts;
use crate::error::{CodegenError, CodegenErrorExt};
use kreg_domain::config::CodegenConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Outcome for one generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    /// `false` when the file already held identical content and was left untouched.
    pub changed: bool,
}

/// Writes both artifacts into `config.out_dir`.
///
/// Unchanged files are not rewritten, so their modification time stays put and downstream
/// builds are not invalidated. Changed files are written to a sibling temp file and renamed
/// into place.
pub fn write_artifacts(
    artifacts: &GeneratedArtifacts,
    config: &CodegenConfig,
) -> Result<Vec<WrittenFile>, CodegenError> {
    fs::create_dir_all(&config.out_dir)
        .context(format!("creating {}", config.out_dir.display()))?;

    let written = vec![
        write_file(&config.out_dir.join(&config.concepts_file), &artifacts.concepts)?,
        write_file(&config.out_dir.join(&config.values_file), &artifacts.values)?,
    ];
    info!(
        out_dir = %config.out_dir.display(),
        changed = written.iter().filter(|f| f.changed).count(),
        "Generated sources written"
    );
    Ok(written)
}

fn write_file(path: &Path, content: &str) -> Result<WrittenFile, CodegenError> {
    if fs::read_to_string(path).is_ok_and(|existing| existing == content) {
        debug!(path = %path.display(), "Generated source unchanged");
        return Ok(WrittenFile { path: path.to_path_buf(), changed: false });
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, content).context(format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).context(format!("replacing {}", path.display()))?;
    debug!(path = %path.display(), bytes = content.len(), "Generated source written");
    Ok(WrittenFile { path: path.to_path_buf(), changed: true })
}
