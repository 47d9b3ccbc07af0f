use std::{fs::OpenOptions, io::Write, path::Path};

use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

/// Writes `content` to `path`, owner read/write only when the file is created.
pub fn write_private_file(path: &Path, content: &[u8], what: &str) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .wrap_err_with(|| format!("failed to create {what} file {}", path.display()))?;
    file.write_all(content)
        .wrap_err_with(|| format!("failed to write {what} file {}", path.display()))?;

    info!(path = %path.display(), "{what} file written");
    Ok(())
}
