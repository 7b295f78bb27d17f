use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.dir.join(format!("{:x}.html", digest))
    }

    pub fn get(&self, url: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(url)) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn put(&self, url: &str, body: &str) -> io::Result<()> {
        let path = self.path_for(url);
        // a cached page is either absent or complete
        let partial = path.with_extension("part");
        fs::write(&partial, body)?;
        fs::rename(&partial, &path)
    }
}
