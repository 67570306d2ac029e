use anyhow::Context;
use std::fs::File;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::result::Result;
use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

/// Open a file writable, creating or truncating it
pub fn fopen_w<P: AsRef<Path>>(path: P) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .read(false)
        .truncate(true)
        .mode(0o644)
        .open(path)
}

/// Write `contents` to `path`, replacing whatever was there
pub fn write_file<P: AsRef<Path>>(path: P, contents: &[u8]) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut f = fopen_w(path).with_context(|| format!("could not open {path:?} for writing"))?;
    f.write_all(contents)
        .with_context(|| format!("could not write {path:?}"))?;
    Ok(())
}

/// Walk up from `start` and return the first directory containing a file called `marker`
///
/// `start` itself is checked first; the search ends at the filesystem root.
pub fn find_upwards<P: AsRef<Path>>(start: P, marker: &str) -> Option<PathBuf> {
    start
        .as_ref()
        .ancestors()
        .find(|dir| dir.join(marker).is_file())
        .map(Path::to_path_buf)
}

pub trait LoadValue {
    type Error;

    fn load<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>
    where
        Self: Sized;
}

pub trait StoreValue {
    type Error;

    fn store<P: AsRef<Path>>(&self, path: P) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_file_truncates() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.csv");

        write_file(&path, b"a much longer first version")?;
        write_file(&path, b"short")?;

        assert_eq!(std::fs::read_to_string(&path)?, "short");
        Ok(())
    }

    #[test]
    fn test_find_upwards() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let nested = dir.path().join("a").join("b").join("c");
        std::fs::create_dir_all(&nested)?;
        std::fs::write(dir.path().join("a").join(".marker"), "")?;

        assert_eq!(
            find_upwards(&nested, ".marker"),
            Some(dir.path().join("a"))
        );
        assert_eq!(find_upwards(&nested, ".no-such-marker"), None);
        Ok(())
    }

    #[test]
    fn test_find_upwards_ignores_directories_named_like_marker() -> anyhow::Result<()> {
        let dir = tempdir()?;
        std::fs::create_dir_all(dir.path().join(".marker"))?;
        assert_eq!(find_upwards(dir.path(), ".marker"), None);
        Ok(())
    }
}
