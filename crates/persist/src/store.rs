//! File-backed character persistence.
//!
//! Layout inside the store directory:
//! ```text
//! store.meta.json                      - schema version and counts
//! characters/
//!   <id>.character.cbor.zst            - CBOR+zstd compressed record
//! integrity/
//!   manifest.json                      - sha256 per character file
//! ```

use crate::{CharacterRecord, CharacterStore, StoreError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Current schema version of stored character records.
const CHARACTER_SCHEMA_VERSION: u32 = 1;

/// Metadata stored in store.meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub character_schema_version: u32,
    pub character_count: u32,
}

/// Hash of every character file, keyed by file name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: BTreeMap<String, String>,
}

/// One file per character, verified on every load.
#[derive(Debug)]
pub struct FileCharacterStore {
    root: PathBuf,
    meta: StoreMeta,
    manifest: IntegrityManifest,
}

impl FileCharacterStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("characters"))?;
        std::fs::create_dir_all(root.join("integrity"))?;

        let meta_path = root.join("store.meta.json");
        let manifest_path = root.join("integrity").join("manifest.json");

        let (meta, manifest) = if meta_path.exists() {
            let meta: StoreMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            if meta.character_schema_version != CHARACTER_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.character_schema_version,
                    expected_version: CHARACTER_SCHEMA_VERSION,
                });
            }
            let manifest: IntegrityManifest = if manifest_path.exists() {
                serde_json::from_reader(std::fs::File::open(&manifest_path)?)?
            } else {
                IntegrityManifest::default()
            };
            (meta, manifest)
        } else {
            let meta = StoreMeta {
                character_schema_version: CHARACTER_SCHEMA_VERSION,
                character_count: 0,
            };
            let manifest = IntegrityManifest::default();
            serde_json::to_writer_pretty(std::fs::File::create(&meta_path)?, &meta)?;
            serde_json::to_writer_pretty(std::fs::File::create(&manifest_path)?, &manifest)?;
            (meta, manifest)
        };

        tracing::debug!(root = %root.display(), characters = meta.character_count, "character store opened");
        Ok(Self {
            root,
            meta,
            manifest,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    /// Verify every character file against the manifest.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        for (filename, expected) in &self.manifest.entries {
            let data = std::fs::read(self.root.join("characters").join(filename))?;
            check_hash(filename, expected, &data)?;
        }
        Ok(())
    }

    fn file_name(id: &str) -> Result<String, StoreError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(format!("{id}.character.cbor.zst"))
    }

    fn save_meta(&self) -> Result<(), StoreError> {
        let path = self.root.join("store.meta.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.meta)?;
        Ok(())
    }

    fn save_manifest(&self) -> Result<(), StoreError> {
        let path = self.root.join("integrity").join("manifest.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.manifest)?;
        Ok(())
    }
}

impl CharacterStore for FileCharacterStore {
    fn load_character(&self, id: &str) -> Result<CharacterRecord, StoreError> {
        let filename = Self::file_name(id)?;
        let Some(expected) = self.manifest.entries.get(&filename) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        let compressed = std::fs::read(self.root.join("characters").join(&filename))?;
        check_hash(&filename, expected, &compressed)?;
        let cbor_bytes = zstd_decompress(&compressed)?;
        cbor_deserialize(&cbor_bytes)
    }

    fn save_character(&mut self, record: &CharacterRecord) -> Result<(), StoreError> {
        let filename = Self::file_name(&record.id)?;
        let cbor_bytes = cbor_serialize(record)?;
        let compressed = zstd_compress(&cbor_bytes)?;
        std::fs::write(self.root.join("characters").join(&filename), &compressed)?;

        let is_new = self
            .manifest
            .entries
            .insert(filename, sha256_hex(&compressed))
            .is_none();
        if is_new {
            self.meta.character_count += 1;
            self.save_meta()?;
        }
        self.save_manifest()?;
        tracing::debug!(id = %record.id, location = %record.location, "character saved");
        Ok(())
    }
}

fn check_hash(filename: &str, expected: &str, data: &[u8]) -> Result<(), StoreError> {
    let actual = sha256_hex(data);
    if actual != expected {
        return Err(StoreError::IntegrityMismatch {
            file: filename.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(data).map_err(|e| StoreError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_record;

    #[test]
    fn open_creates_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCharacterStore::open(tmp.path().join("chars")).unwrap();
        assert_eq!(store.meta().character_count, 0);
        assert!(store.root().join("characters").is_dir());
        assert!(store.root().join("integrity").is_dir());
    }

    #[test]
    fn save_then_load_after_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("chars");
        let record = sample_record("rosie");
        {
            let mut store = FileCharacterStore::open(&path).unwrap();
            store.save_character(&record).unwrap();
            store.save_character(&record).unwrap();
            assert_eq!(store.meta().character_count, 1);
        }
        let store = FileCharacterStore::open(&path).unwrap();
        assert_eq!(store.load_character("rosie").unwrap(), record);
        store.verify_integrity().unwrap();
    }

    #[test]
    fn unknown_character_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileCharacterStore::open(tmp.path()).unwrap();
        assert!(matches!(
            store.load_character("nobody"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn path_like_ids_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FileCharacterStore::open(tmp.path()).unwrap();
        let mut record = sample_record("rosie");
        record.id = "../escape".into();
        assert!(matches!(
            store.save_character(&record),
            Err(StoreError::InvalidId(_))
        ));
    }

    #[test]
    fn corruption_fails_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("chars");
        let mut store = FileCharacterStore::open(&path).unwrap();
        store.save_character(&sample_record("rosie")).unwrap();

        let file = path.join("characters").join("rosie.character.cbor.zst");
        let mut data = std::fs::read(&file).unwrap();
        if let Some(byte) = data.last_mut() {
            *byte ^= 0xff;
        }
        std::fs::write(&file, &data).unwrap();

        let store = FileCharacterStore::open(&path).unwrap();
        assert!(matches!(
            store.load_character("rosie"),
            Err(StoreError::IntegrityMismatch { .. })
        ));
        assert!(store.verify_integrity().is_err());
    }

    #[test]
    fn schema_mismatch_fails_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("chars");
        let _store = FileCharacterStore::open(&path).unwrap();

        let meta_path = path.join("store.meta.json");
        let mut meta: StoreMeta =
            serde_json::from_reader(std::fs::File::open(&meta_path).unwrap()).unwrap();
        meta.character_schema_version = 999;
        serde_json::to_writer_pretty(std::fs::File::create(&meta_path).unwrap(), &meta).unwrap();

        match FileCharacterStore::open(&path) {
            Err(StoreError::SchemaMismatch {
                file_version,
                expected_version,
            }) => {
                assert_eq!(file_version, 999);
                assert_eq!(expected_version, CHARACTER_SCHEMA_VERSION);
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }
}
