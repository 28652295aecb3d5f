//! Content hashing and the fixture hash table.
//!
//! The hash table is the single source of truth for whether an input file is
//! "known". It maps a hex digest to the canonical fixture id whose pre-baked
//! output is substituted for that input. Entries fall into three families:
//! original inputs, detargeted inputs (labels stripped) and prediction
//! outputs.
//!
//! The built-in table uses MD5 digests of the platform's devenv fixtures. A
//! table for another fixture set or another digest can be loaded from TOML:
//!
//! ```toml
//! algorithm = "sha256"
//!
//! [original]
//! "d7ef9a39…" = "af7fcc0f-7a58-4a74-bfa2-8fb6e12008eb"
//!
//! [detargeted]
//! [prediction]
//! ```

use md5::Md5;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Digest used to fingerprint fixture files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Md5,
    Sha256,
}

impl ChecksumAlgorithm {
    /// Lowercase hex digest of `data`.
    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            ChecksumAlgorithm::Md5 => hex::encode(Md5::digest(data)),
            ChecksumAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        }
    }
}

/// Which kind of fixture a hash belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureFamily {
    Original,
    Detargeted,
    Prediction,
}

impl fmt::Display for FixtureFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FixtureFamily::Original => "original",
            FixtureFamily::Detargeted => "detargeted",
            FixtureFamily::Prediction => "prediction",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub fixture_id: String,
    pub family: FixtureFamily,
}

const BUILTIN_ORIGINAL: &[(&str, &str)] = &[
    ("7182575d2f1fe035c0ce8cea70f93cd7", "af7fcc0f-7a58-4a74-bfa2-8fb6e12008eb"),
    ("86564dc69f8c9b081b5174ef562e1ac1", "8bc11648-d983-4a62-9ea2-590901f374ff"),
    ("f09058c9de0b55d482f8575f8e8e7628", "48557ec1-3205-403a-b82c-843fd9b03f5b"),
    ("ca7a7b23a4d5cb655df97378e571f7c6", "cbddd90c-f574-43d9-8d1f-b4989678a09b"),
];

const BUILTIN_DETARGETED: &[(&str, &str)] = &[
    ("41b26abe9fd63ea31a8ea325bb9fb47c", "48557ec1-3205-403a-b82c-843fd9b03f5b"),
    ("de5a7197e3e61c7987d3a64731608187", "cbddd90c-f574-43d9-8d1f-b4989678a09b"),
];

const BUILTIN_PREDICTION: &[(&str, &str)] = &[
    ("3b38668b9e0d1a8931e57d01235de01d", "48557ec1-3205-403a-b82c-843fd9b03f5b"),
    ("7be08f2103cc61f50eb485dd5c7ef0df", "8bc11648-d983-4a62-9ea2-590901f374ff"),
    ("a479fb72d25cff24112328433e39915f", "af7fcc0f-7a58-4a74-bfa2-8fb6e12008eb"),
    ("63f9156ec639f5384c069fe3c7807429", "cbddd90c-f574-43d9-8d1f-b4989678a09b"),
];

/// Immutable map from content hash to fixture.
///
/// Built once at process start and passed by reference; never mutated.
#[derive(Debug, Clone)]
pub struct HashTable {
    algorithm: ChecksumAlgorithm,
    entries: BTreeMap<String, TableEntry>,
}

#[derive(Debug, Deserialize)]
struct HashTableFile {
    algorithm: ChecksumAlgorithm,
    #[serde(default)]
    original: BTreeMap<String, String>,
    #[serde(default)]
    detargeted: BTreeMap<String, String>,
    #[serde(default)]
    prediction: BTreeMap<String, String>,
}

impl HashTable {
    /// The MD5 table of the platform's devenv fixtures.
    pub fn builtin() -> Self {
        let families = [
            (FixtureFamily::Original, BUILTIN_ORIGINAL),
            (FixtureFamily::Detargeted, BUILTIN_DETARGETED),
            (FixtureFamily::Prediction, BUILTIN_PREDICTION),
        ];
        let mut entries = BTreeMap::new();
        for (family, pairs) in families {
            for (hash, id) in pairs {
                entries.insert(
                    hash.to_string(),
                    TableEntry {
                        fixture_id: id.to_string(),
                        family,
                    },
                );
            }
        }
        Self {
            algorithm: ChecksumAlgorithm::Md5,
            entries,
        }
    }

    /// Load a table from a TOML file.
    ///
    /// Hashes are normalized to lowercase. A hash listed in two families is
    /// rejected since the lookup would be ambiguous.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&content).map_err(|reason| Error::HashTable {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn from_toml_str(content: &str) -> std::result::Result<Self, String> {
        let file: HashTableFile = toml::from_str(content).map_err(|e| e.to_string())?;

        let mut entries = BTreeMap::new();
        let families = [
            (FixtureFamily::Original, file.original),
            (FixtureFamily::Detargeted, file.detargeted),
            (FixtureFamily::Prediction, file.prediction),
        ];
        for (family, pairs) in families {
            for (hash, fixture_id) in pairs {
                let hash = hash.to_ascii_lowercase();
                if !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(format!("'{}' is not a hex digest", hash));
                }
                if entries
                    .insert(hash.clone(), TableEntry { fixture_id, family })
                    .is_some()
                {
                    return Err(format!("hash {} is listed more than once", hash));
                }
            }
        }

        if entries.is_empty() {
            return Err("table has no entries".to_string());
        }

        Ok(Self {
            algorithm: file.algorithm,
            entries,
        })
    }

    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    pub fn lookup(&self, checksum: &str) -> Option<&TableEntry> {
        self.entries.get(checksum)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A regular file whose content hash is in the table.
#[derive(Debug, Clone)]
pub struct ValidatedFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub checksum: String,
    pub fixture_id: String,
    pub family: FixtureFamily,
}

/// Hash one file and resolve it against the table.
pub fn validate_file(path: &Path, table: &HashTable) -> Result<ValidatedFile> {
    let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let checksum = table.algorithm().digest_hex(&data);

    let entry = table
        .lookup(&checksum)
        .ok_or_else(|| Error::UnknownFixture {
            file: name.clone(),
            checksum: checksum.clone(),
        })?;

    Ok(ValidatedFile {
        name,
        path: path.to_path_buf(),
        size: data.len() as u64,
        checksum,
        fixture_id: entry.fixture_id.clone(),
        family: entry.family,
    })
}

/// Validate every regular file directly inside `dir`.
///
/// Subdirectories are skipped (a `pred/` folder next to its inputs is
/// normal). Files come back sorted by name. The first unknown file aborts
/// the whole call.
pub fn validate_dir(dir: &Path, table: &HashTable) -> Result<Vec<ValidatedFile>> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
            Error::io(path, source)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        files.push(validate_file(entry.path(), table)?);
    }

    if files.is_empty() {
        return Err(Error::EmptyDirectory {
            path: dir.to_path_buf(),
        });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // md5("test-a"), md5("test-b")
    const TEST_A_MD5: &str = "21700f4bf4cd6190bbb14ea1d7312139";
    const TEST_B_MD5: &str = "2e527e143e12aeaf6d47b0ee3662900f";

    fn small_table() -> HashTable {
        HashTable::from_toml_str(&format!(
            r#"
algorithm = "md5"

[original]
"{TEST_A_MD5}" = "fixture-a"

[prediction]
"{TEST_B_MD5}" = "fixture-b"
"#
        ))
        .unwrap()
    }

    #[test]
    fn digest_hex_known_vectors() {
        assert_eq!(
            ChecksumAlgorithm::Md5.digest_hex(b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(ChecksumAlgorithm::Md5.digest_hex(b"test-a"), TEST_A_MD5);
        assert_eq!(
            ChecksumAlgorithm::Sha256.digest_hex(b"test-a"),
            "d7ef9a39720870db13b85251d2f81938233b8417e9ef596c773638c5d38fd60c"
        );
    }

    #[test]
    fn builtin_table_resolves_devenv_hashes() {
        let table = HashTable::builtin();
        assert_eq!(table.len(), 10);
        assert_eq!(table.algorithm(), ChecksumAlgorithm::Md5);

        let entry = table.lookup("7182575d2f1fe035c0ce8cea70f93cd7").unwrap();
        assert_eq!(entry.fixture_id, "af7fcc0f-7a58-4a74-bfa2-8fb6e12008eb");
        assert_eq!(entry.family, FixtureFamily::Original);

        let entry = table.lookup("de5a7197e3e61c7987d3a64731608187").unwrap();
        assert_eq!(entry.fixture_id, "cbddd90c-f574-43d9-8d1f-b4989678a09b");
        assert_eq!(entry.family, FixtureFamily::Detargeted);

        let entry = table.lookup("a479fb72d25cff24112328433e39915f").unwrap();
        assert_eq!(entry.family, FixtureFamily::Prediction);

        assert!(table.lookup("00000000000000000000000000000000").is_none());
    }

    #[test]
    fn table_rejects_duplicate_hash() {
        let err = HashTable::from_toml_str(&format!(
            "algorithm = \"md5\"\n[original]\n\"{TEST_A_MD5}\" = \"x\"\n[prediction]\n\"{TEST_A_MD5}\" = \"y\"\n"
        ))
        .unwrap_err();
        assert!(err.contains("more than once"), "{}", err);
    }

    #[test]
    fn table_rejects_empty_and_non_hex() {
        assert!(HashTable::from_toml_str("algorithm = \"md5\"").is_err());
        assert!(HashTable::from_toml_str("algorithm = \"md5\"\n[original]\n\"zz\" = \"x\"\n").is_err());
        assert!(HashTable::from_toml_str("algorithm = \"crc32\"\n[original]\n\"ab\" = \"x\"\n").is_err());
    }

    #[test]
    fn table_normalizes_uppercase_hashes() {
        let table = HashTable::from_toml_str(
            "algorithm = \"md5\"\n[original]\n\"21700F4BF4CD6190BBB14EA1D7312139\" = \"fixture-a\"\n",
        )
        .unwrap();
        assert!(table.lookup(TEST_A_MD5).is_some());
    }

    #[test]
    fn load_reads_table_from_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hashes.toml");
        fs::write(
            &path,
            format!("algorithm = \"sha256\"\n[original]\n\"{}\" = \"fixture-a\"\n",
                ChecksumAlgorithm::Sha256.digest_hex(b"test-a")),
        )
        .unwrap();

        let table = HashTable::load(&path).unwrap();
        fs::write(tmp.path().join("a.bin"), "test-a").unwrap();
        let file = validate_file(&tmp.path().join("a.bin"), &table).unwrap();
        assert_eq!(file.fixture_id, "fixture-a");

        let missing = HashTable::load(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, Error::Io { .. }));
    }

    #[test]
    fn validate_dir_returns_mapped_ids_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.h5"), "test-b").unwrap();
        fs::write(tmp.path().join("a.h5"), "test-a").unwrap();
        fs::create_dir(tmp.path().join("pred")).unwrap();
        fs::write(tmp.path().join("pred").join("ignored.h5"), "rogue").unwrap();

        let files = validate_dir(tmp.path(), &small_table()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "a.h5");
        assert_eq!(files[0].fixture_id, "fixture-a");
        assert_eq!(files[0].checksum, TEST_A_MD5);
        assert_eq!(files[0].size, 6);
        assert_eq!(files[1].name, "b.h5");
        assert_eq!(files[1].family, FixtureFamily::Prediction);
    }

    #[test]
    fn validate_dir_fails_on_unknown_content() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.h5"), "test-a").unwrap();
        fs::write(tmp.path().join("rogue.h5"), "rogue").unwrap();

        match validate_dir(tmp.path(), &small_table()).unwrap_err() {
            Error::UnknownFixture { file, checksum } => {
                assert_eq!(file, "rogue.h5");
                assert_eq!(checksum, "44ac6119a7a7a60e65a3e2b852ebd6c0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validate_dir_fails_when_only_directories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("pred")).unwrap();

        let err = validate_dir(tmp.path(), &small_table()).unwrap_err();
        assert!(matches!(err, Error::EmptyDirectory { .. }));
    }

    #[test]
    fn validate_dir_fails_on_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let err = validate_dir(&tmp.path().join("absent"), &small_table()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }), "{err}");
    }
}
