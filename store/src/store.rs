//! Generic JSON-file record store.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Directory name used for records of type `T`.
///
/// `xrate_notify::model::Subscription` becomes `Subscription`.
pub fn collection_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

struct Inner {
    dir: PathBuf,
    lock: Mutex<()>,
}

/// Concurrency-safe store for records of one type.
///
/// Cloning is cheap and clones share the same lock.
pub struct FileStore<T> {
    inner: Arc<Inner>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for FileStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _record: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for FileStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("dir", &self.inner.dir)
            .finish()
    }
}

impl<T> FileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a store rooted at `base_dir`. Nothing is touched on disk yet.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        let dir = base_dir.as_ref().join(collection_name::<T>());
        Self {
            inner: Arc::new(Inner {
                dir,
                lock: Mutex::new(()),
            }),
            _record: PhantomData,
        }
    }

    /// Directory holding this collection.
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Store `item` under `key`. Fails if the key is already taken.
    pub fn store(&self, key: &str, item: &T) -> StoreResult<()> {
        validate_key(key)?;

        let _guard = self.inner.lock.lock();
        let dir = &self.inner.dir;

        fs::create_dir_all(dir).map_err(|e| StoreError::io("creating directory", dir, e))?;

        let path = dir.join(key);
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists {
                    key: key.to_string(),
                    path,
                });
            }
            Err(e) => return Err(StoreError::io("creating file", &path, e)),
        };

        if let Err(err) = write_record(file, &path, item) {
            // Leave no partial file behind, so a retry is not rejected.
            fs::remove_file(&path).map_err(|e| StoreError::io("removing partial file", &path, e))?;
            return Err(err);
        }

        debug!(path = %path.display(), "Stored record");
        Ok(())
    }

    /// Decode every record in the collection.
    pub fn fetch_all(&self) -> StoreResult<Vec<T>> {
        let _guard = self.inner.lock.lock();
        let dir = &self.inner.dir;

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { path: dir.clone() });
            }
            Err(e) => return Err(StoreError::io("reading directory", dir, e)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io("reading directory", dir, e))?;
            let path = entry.path();

            let file_type = entry
                .file_type()
                .map_err(|e| StoreError::io("reading file type", &path, e))?;
            if file_type.is_dir() {
                continue;
            }

            let bytes = fs::read(&path).map_err(|e| StoreError::io("reading file", &path, e))?;
            let record = serde_json::from_slice(&bytes)
                .map_err(|source| StoreError::Decode { path: path.clone(), source })?;
            records.push(record);
        }

        debug!(dir = %dir.display(), count = records.len(), "Fetched records");
        Ok(records)
    }
}

fn write_record<T: Serialize>(file: fs::File, path: &Path, item: &T) -> StoreResult<()> {
    let mut writer = BufWriter::new(file);

    serde_json::to_writer(&mut writer, item).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| StoreError::io("writing file", path, e))
}

fn validate_key(key: &str) -> StoreResult<()> {
    let plain = !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\', '\0']);

    if plain {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::thread;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Person {
        name: String,
        age: u32,
    }

    fn person(name: &str, age: u32) -> Person {
        Person {
            name: name.to_string(),
            age,
        }
    }

    #[test]
    fn test_collection_name() {
        assert_eq!(collection_name::<Person>(), "Person");
        assert_eq!(collection_name::<Vec<Person>>(), "Vec");
    }

    #[test]
    fn test_store_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::<Person>::new(tmp.path());

        store.store("johndoe", &person("John Doe", 30)).unwrap();

        let path = tmp.path().join("Person").join("johndoe");
        let content = fs::read_to_string(path).unwrap();
        let decoded: Person = serde_json::from_str(&content).unwrap();
        assert_eq!(decoded, person("John Doe", 30));
    }

    #[test]
    fn test_store_is_exclusive() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::<Person>::new(tmp.path());
        let first = person("A", 1);

        store.store("a@x.com", &first).unwrap();
        let err = store.store("a@x.com", &person("B", 2)).unwrap_err();

        assert!(err.is_already_exists());
        assert_eq!(store.fetch_all().unwrap(), vec![first]);
    }

    #[test]
    fn test_fetch_all_without_collection() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::<Person>::new(tmp.path());

        let err = store.fetch_all().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_fetch_all_skips_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::<Person>::new(tmp.path());

        store.store("one", &person("One", 1)).unwrap();
        store.store("two", &person("Two", 2)).unwrap();
        fs::create_dir(store.dir().join("nested")).unwrap();

        let mut all = store.fetch_all().unwrap();
        all.sort_by_key(|p| p.age);
        assert_eq!(all, vec![person("One", 1), person("Two", 2)]);
    }

    #[test]
    fn test_fetch_all_reports_corrupt_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::<Person>::new(tmp.path());

        store.store("good", &person("Good", 1)).unwrap();
        fs::write(store.dir().join("bad"), b"{not json").unwrap();

        assert!(matches!(store.fetch_all(), Err(StoreError::Decode { .. })));
    }

    #[test]
    fn test_failed_encode_leaves_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::<HashMap<(u8, u8), u8>>::new(tmp.path());

        // Tuple keys cannot be encoded as JSON object keys.
        let bad = HashMap::from([((1, 2), 3)]);
        let err = store.store("k", &bad).unwrap_err();
        assert!(matches!(err, StoreError::Encode { .. }));
        assert!(!store.dir().join("k").exists());

        store.store("k", &HashMap::new()).unwrap();
        assert_eq!(store.fetch_all().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::<Person>::new(tmp.path());

        for key in ["", ".", "..", "a/b", "a\\b"] {
            assert!(matches!(
                store.store(key, &person("X", 1)),
                Err(StoreError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn test_concurrent_stores() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::<Person>::new(tmp.path());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    // Every thread also races for the shared key.
                    let shared = store.store("shared", &person("Shared", i)).is_ok();
                    store
                        .store(&format!("user{i}"), &person(&format!("User{i}"), i))
                        .unwrap();
                    shared
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(store.fetch_all().unwrap().len(), 17);
    }
}
