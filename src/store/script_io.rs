use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Path argument that stands for standard input.
pub const STDIN: &str = "-";

/// Read script or model text from `path`, or from stdin for `-`.
pub fn load_script(path: &Path) -> Result<String, io::Error> {
    if path.as_os_str() == STDIN {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    fs::read_to_string(path)
}

pub fn save_script(path: &Path, text: &str) -> Result<(), io::Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("filter.sieve");
        save_script(&path, "keep;\n").unwrap();
        assert_eq!(load_script(&path).unwrap(), "keep;\n");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.sieve");
        assert_eq!(load_script(&path).unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
