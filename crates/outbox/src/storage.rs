use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::{Error, Result};

/// Root of the on-disk state kept across sessions.
#[derive(Debug, Clone)]
pub struct DataPath {
    base: PathBuf,
}

impl DataPath {
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref().to_path_buf();
        Self { base }
    }

    pub fn default_base() -> Option<PathBuf> {
        dirs::data_local_dir().map(|pb| pb.join("outbox"))
    }

    pub fn default_base_or_cwd() -> PathBuf {
        use std::str::FromStr;
        Self::default_base().unwrap_or_else(|| PathBuf::from_str(".").unwrap())
    }

    /// Where relay health snapshots live.
    pub fn health(&self) -> PathBuf {
        self.base.join("health")
    }
}

impl Default for DataPath {
    fn default() -> Self {
        Self::new(Self::default_base_or_cwd())
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Directory {
    pub file_path: PathBuf,
}

impl Directory {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn get_file(&self, file_name: String) -> Result<String> {
        let filepath = self.file_path.clone().join(file_name.clone());

        if filepath.exists() && filepath.is_file() {
            Ok(fs::read_to_string(filepath)?)
        } else {
            Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Requested file was not found: {file_name}"),
            )))
        }
    }
}

/// Write the file to the directory
pub fn write_file(directory: &Path, file_name: String, data: &str) -> Result<()> {
    if !directory.exists() {
        fs::create_dir_all(directory)?
    }

    std::fs::write(directory.join(file_name), data)?;
    Ok(())
}

pub fn delete_file(directory: &Path, file_name: String) -> Result<()> {
    let file_to_delete = directory.join(file_name.clone());
    if file_to_delete.exists() && file_to_delete.is_file() {
        fs::remove_file(file_to_delete).map_err(Error::Io)
    } else {
        Err(Error::Generic(format!(
            "Requested file to delete was not found: {file_name}"
        )))
    }
}
