//! Startup preparation: log file, source and replica directories

use std::fs::{File, OpenOptions};
use std::io::{BufRead, Write};
use std::path::Path;

use color_eyre::Result;
use color_eyre::eyre::{WrapErr as _, bail};
use tracing::info;

/// Open the log file for appending, creating it if needed.
///
/// Returns the file and whether it was created. Runs before logging is set
/// up, so progress goes straight to stderr.
///
/// # Errors
/// Returns an error if the file cannot be created or opened.
pub fn open_log_file(path: &Path) -> Result<(File, bool)> {
    let created = !path.exists();
    if created {
        eprintln!("Log file ({}) doesn't exist. Creating it...", path.display());
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .wrap_err_with(|| format!("Could not create log file {}", path.display()))?;

    Ok((file, created))
}

/// Make sure the source directory exists, asking before creating it.
///
/// # Errors
/// Returns an error if the user declines or the directory cannot be created.
pub fn ensure_source_directory(
    path: &Path,
    confirm: impl FnOnce() -> Result<bool>,
) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    eprintln!("The given source directory ({}) doesn't exist.", path.display());
    if !confirm()? {
        bail!("Source directory is required.");
    }

    std::fs::create_dir_all(path)
        .wrap_err_with(|| format!("Could not create source directory {}", path.display()))?;
    info!("The source directory ({}) has been created.", path.display());
    Ok(())
}

/// Make sure the replica directory exists, creating it without asking.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_replica_directory(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    std::fs::create_dir_all(path)
        .wrap_err_with(|| format!("Could not create replica directory {}", path.display()))?;
    info!("The replica directory ({}) has been created.", path.display());
    Ok(())
}

/// Ask a yes/no question until a valid answer is given.
///
/// An empty answer or end of input means yes.
///
/// # Errors
/// Returns an error if reading or writing the terminal fails.
pub fn confirm(question: &str, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    loop {
        writeln!(output, "{question} (Y/n)")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(true);
        }

        match line.trim().to_lowercase().as_str() {
            "" | "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Invalid input.")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn answer(input: &str) -> (bool, String) {
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut output = Vec::new();
        let result = confirm("Create source directory?", &mut reader, &mut output).unwrap();
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_confirm_answers() {
        assert!(answer("y\n").0);
        assert!(answer("YES\n").0);
        assert!(answer("\n").0);
        assert!(answer("").0);
        assert!(!answer("n\n").0);
        assert!(!answer(" No \n").0);
    }

    #[test]
    fn test_confirm_repeats_on_invalid_input() {
        let (result, output) = answer("maybe\nn\n");
        assert!(!result);
        assert_eq!(output.matches("Create source directory? (Y/n)").count(), 2);
        assert!(output.contains("Invalid input."));
    }

    #[test]
    fn test_open_log_file_creates_and_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mirror.log");

        let (mut file, created) = open_log_file(&path).unwrap();
        assert!(created);
        writeln!(file, "first").unwrap();
        drop(file);

        let (mut file, created) = open_log_file(&path).unwrap();
        assert!(!created);
        writeln!(file, "second").unwrap();
        drop(file);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_open_log_file_in_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        assert!(open_log_file(&dir.path().join("missing/mirror.log")).is_err());
    }

    #[test]
    fn test_source_created_when_confirmed() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");

        ensure_source_directory(&source, || Ok(true)).unwrap();
        assert!(source.is_dir());
    }

    #[test]
    fn test_source_required_when_declined() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");

        let err = ensure_source_directory(&source, || Ok(false)).unwrap_err();
        assert!(err.to_string().contains("required"));
        assert!(!source.exists());
    }

    #[test]
    fn test_existing_source_is_not_prompted() {
        let dir = TempDir::new().unwrap();
        ensure_source_directory(dir.path(), || panic!("should not prompt")).unwrap();
    }

    #[test]
    fn test_replica_created_silently() {
        let dir = TempDir::new().unwrap();
        let replica = dir.path().join("a/b/replica");

        ensure_replica_directory(&replica).unwrap();
        assert!(replica.is_dir());
    }
}
