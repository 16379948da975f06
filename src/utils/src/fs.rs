use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use lazy_static::lazy_static;

lazy_static! {
    static ref FILE_MUTEX: Mutex<()> = Mutex::new(());
}

pub fn open_with_create_append<P: AsRef<Path>>(path: P) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
}

/// Append `content` followed by a newline to `filename`, creating the file
/// if needed. Appends from different threads do not interleave.
pub fn append_to_file<P: AsRef<Path>>(filename: P, content: &str) -> std::io::Result<()> {
    let _file_mutex = FILE_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let mut f = open_with_create_append(filename)?;
    writeln!(f, "{}", content)
}

/// Create `dir` if missing and remove a stale `dir/name`, returning the path.
pub fn fresh_file_in<P: AsRef<Path>>(dir: P, name: &str) -> std::io::Result<std::path::PathBuf> {
    std::fs::create_dir_all(&dir)?;
    let file = dir.as_ref().join(name);
    if file.exists() {
        std::fs::remove_file(&file)?;
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_file_then_append() {
        let dir = std::env::temp_dir().join(format!("utils-fs-{}", std::process::id()));
        let file = fresh_file_in(&dir, "out.txt").unwrap();
        append_to_file(&file, "first").unwrap();
        append_to_file(&file, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "first\nsecond\n");

        // a second call starts over
        let file = fresh_file_in(&dir, "out.txt").unwrap();
        assert!(!file.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
