//! Test utilities for the archive importer
//!
//! Builds mudata archives in memory so each test can start from a known-good
//! archive and change or drop single table files.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::store::MemoryStore;

mod import_tests;
mod table_tests;

pub const DATASETS_CSV: &str = "dataset,tags
ecclimate,\"{\"\"source\"\": \"\"Environment Canada\"\"}\"
";

pub const LOCATIONS_CSV: &str = "dataset,location,tags
ecclimate,kentville,\"{\"\"province\"\": \"\"NS\"\"}\"
ecclimate,greenwood,
";

pub const PARAMS_CSV: &str = "dataset,param,tags
ecclimate,maxtemp,\"{\"\"units\"\": \"\"degC\"\"}\"
ecclimate,depth,{}
";

pub const COLUMNS_CSV: &str = "dataset,table,column,tags
ecclimate,data,value,\"{\"\"type\"\": \"\"numeric\"\"}\"
ecclimate,locations,location,{}
";

/// Three typed rows (one with an absent value) and one raw row
pub const DATA_CSV: &str = "dataset,location,param,x,value,tags
ecclimate,kentville,maxtemp,2017-05-09,21.5,{}
ecclimate,kentville,maxtemp,2017-05-10 12:00,NA,{}
ecclimate,greenwood,maxtemp,2017-05-09 17:25:48 -0300,19,\"{\"\"flag\"\": \"\"E\"\"}\"
ecclimate,greenwood,depth,not-a-date,3.2,
";

/// In-memory zip archive builder
#[derive(Debug, Clone, Default)]
pub struct ArchiveBuilder {
    files: Vec<(String, String)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All five tables below a `mudata/` directory
    pub fn standard() -> Self {
        Self::new()
            .file("mudata/datasets.csv", DATASETS_CSV)
            .file("mudata/locations.csv", LOCATIONS_CSV)
            .file("mudata/params.csv", PARAMS_CSV)
            .file("mudata/columns.csv", COLUMNS_CSV)
            .file("mudata/data.csv", DATA_CSV)
    }

    /// Add a file, replacing any file already at `path`
    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.files.retain(|(p, _)| p != path);
        self.files.push((path.to_string(), content.to_string()));
        self
    }

    /// Replace the content of every file named `name`
    pub fn table(mut self, name: &str, content: &str) -> Self {
        for (path, existing) in &mut self.files {
            if path.rsplit('/').next() == Some(name) {
                *existing = content.to_string();
            }
        }
        self
    }

    /// Drop every file named `name`
    pub fn without(mut self, name: &str) -> Self {
        self.files
            .retain(|(path, _)| path.rsplit('/').next() != Some(name));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut cursor);
            let options = SimpleFileOptions::default();
            for (path, content) in &self.files {
                zip.start_file(path.as_str(), options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        cursor.into_inner()
    }

    /// Write the files below `root` as an already-extracted archive
    pub fn write_to(&self, root: &Path) {
        for (path, content) in &self.files {
            write_file(root, path, content);
        }
    }
}

pub fn write_file(root: &Path, rel_path: &str, content: &str) -> PathBuf {
    let path = root.join(rel_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Store contents ignoring the id counter, for before/after comparisons
pub fn contents(store: &MemoryStore) -> String {
    let mut snapshot = store.to_snapshot();
    snapshot.next_id = 0;
    serde_json::to_string(&snapshot).unwrap()
}
