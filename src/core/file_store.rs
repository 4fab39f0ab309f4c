// File-backed store: one JSON object file holding the whole key space.
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::store::Store;
use crate::json::parse;

/// Entries are read once at `open`; each mutation rewrites the file under an
/// exclusive lock on `<path>.lock`. Writers in other processes are not merged.
/// A mutation whose write fails is undone in memory before the error returns.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| io_error("failed to create store directory", parent, err))?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => parse::from_str(&text, "store file").map_err(|err| err.with_path(&path))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(io_error("failed to read store file", &path, err)),
        };
        debug!(path = %path.display(), entries = entries.len(), "opened file store");

        let store = Self { path, entries };
        if !store.path.exists() {
            store.persist()?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn persist(&self) -> Result<(), Error> {
        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|err| io_error("failed to open store lock", &lock_path, err))?;
        let _guard = WriteLock::acquire(&lock_file, &lock_path)?;

        let body = parse::to_string(&self.entries, "store file")?;
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut tmp = File::create(&tmp_path)
            .map_err(|err| io_error("failed to create store temp file", &tmp_path, err))?;
        tmp.write_all(body.as_bytes())
            .and_then(|()| tmp.sync_all())
            .map_err(|err| io_error("failed to write store file", &tmp_path, err))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|err| io_error("failed to replace store file", &self.path, err))?;
        Ok(())
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(err) = self.persist() {
            match previous {
                Some(previous) => self.entries.insert(key.to_string(), previous),
                None => self.entries.remove(key),
            };
            return Err(err.with_key(key));
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        let Some(previous) = self.entries.remove(key) else {
            return Ok(());
        };
        if let Err(err) = self.persist() {
            self.entries.insert(key.to_string(), previous);
            return Err(err.with_key(key));
        }
        Ok(())
    }
}

struct WriteLock<'a> {
    file: &'a File,
}

impl<'a> WriteLock<'a> {
    fn acquire(file: &'a File, path: &Path) -> Result<Self, Error> {
        FileExt::lock_exclusive(file).map_err(|err| io_error("failed to lock store", path, err))?;
        Ok(Self { file })
    }
}

impl Drop for WriteLock<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(self.file);
    }
}

fn io_error(message: &str, path: &Path, err: io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message(message)
        .with_path(path)
        .with_source(err)
}

#[cfg(test)]
mod tests {
    use super::FileStore;
    use crate::core::error::ErrorKind;
    use crate::core::store::Store;

    #[test]
    fn open_creates_missing_file_and_parents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("store.json");
        let store = FileStore::open(&path).expect("open");
        assert!(store.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");

        let mut store = FileStore::open(&path).expect("open");
        store.set("users_list", "[1]").expect("set");
        store.set("users_detail_1", r#"{"name":"Ann"}"#).expect("set");
        store.remove("users_detail_1").expect("remove");
        drop(store);

        let reopened = FileStore::open(&path).expect("reopen");
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get("users_list").unwrap().as_deref(), Some("[1]"));
        assert_eq!(reopened.get("users_detail_1").unwrap(), None);
    }

    #[test]
    fn failed_write_leaves_entries_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        let mut store = FileStore::open(&path).expect("open");
        store.set("kept", "1").expect("set");

        // A directory at the temp path makes every persist fail.
        std::fs::create_dir(dir.path().join("store.json.tmp")).expect("block temp file");

        let err = store.set("k", "v").expect_err("write should fail");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.key(), Some("k"));
        assert_eq!(store.get("k").unwrap(), None);

        store.set("kept", "2").expect_err("overwrite should fail");
        assert_eq!(store.get("kept").unwrap().as_deref(), Some("1"));

        store.remove("kept").expect_err("remove should fail");
        assert_eq!(store.get("kept").unwrap().as_deref(), Some("1"));
        drop(store);

        let reopened = FileStore::open(&path).expect("reopen");
        assert_eq!(reopened.get("k").unwrap(), None);
        assert_eq!(reopened.get("kept").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn garbage_file_is_rejected_as_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"not json").expect("write");

        let err = FileStore::open(&path).expect_err("corrupt");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert_eq!(err.path(), Some(path.as_path()));
    }
}
