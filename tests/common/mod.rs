#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use sales_dashboard::{
    Table,
    io_utils::{LoadOptions, load_table},
};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Loads a fixture the same way the CLI does.
pub fn load_fixture(name: &str) -> Table {
    load_table(&fixture_path(name), &LoadOptions::default()).expect("load fixture")
}

/// Canonical headers in the order the cleaner and converter emit them.
pub const CANONICAL: [&str; 5] = ["date", "product", "region", "revenue", "quantity"];

pub fn canonical_table(rows: &[&[&str]]) -> Table {
    Table::from_str_rows(&CANONICAL, rows)
}

pub fn approx_eq(left: f64, right: f64) -> bool {
    (left - right).abs() < 1e-9
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file contents");
        path
    }
}
