use std::path::PathBuf;

use crate::ConfigTree;


/// Path of a file under `testdata/`.
pub(crate) fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name)
}

pub(crate) fn load_fixture(name: &str) -> ConfigTree {
    ConfigTree::load(fixture(name)).unwrap()
}
