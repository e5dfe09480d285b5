
use crate::file_utils::{canonicalize, create_dir_all, create_file};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum TempTestDir {
    System(::tempdir::TempDir),
    Custom(PathBuf),
}

impl TempTestDir {
    pub fn new(name: &str) -> TempTestDir {
        if let Ok(value) = ::std::env::var("DROP_GEN_TEMP_TEST_DIR") {
            let path = canonicalize(PathBuf::from(value)).unwrap().join(name);
            create_dir_all(&path).unwrap();
            TempTestDir::Custom(path)
        } else {
            TempTestDir::System(::tempdir::TempDir::new(name).unwrap())
        }
    }

    pub fn path(&self) -> &Path {
        match *self {
            TempTestDir::System(ref dir) => dir.path(),
            TempTestDir::Custom(ref path) => path,
        }
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).unwrap();
    }
    let mut file = create_file(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
}
