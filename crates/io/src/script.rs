use std::fs;
use std::io;
use std::path::Path;

/// Write a shell script and make it executable on unix.
pub fn write_script(path: &Path, text: &str) -> io::Result<()> {
    fs::write(path, text)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }
    log::info!("wrote {}", path.display());
    Ok(())
}
