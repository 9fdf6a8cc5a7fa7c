//! Tests for ChunkExtractor

use super::*;
use std::fs;
use tempfile::TempDir;

fn py() -> Vec<String> {
    vec!["py".to_string()]
}

#[test]
fn test_new_normalizes_extensions() {
    let extractor = ChunkExtractor::new(
        "/tmp",
        &[".PY".to_string(), "rs".to_string(), " ".to_string()],
    );
    assert_eq!(extractor.root, PathBuf::from("/tmp"));
    assert_eq!(extractor.extensions, vec!["py", "rs"]);
    assert!(extractor.exclude_patterns.is_empty());
    assert_eq!(extractor.max_file_size, u64::MAX);
    assert_eq!(extractor.max_path_length, MAX_PATH_LENGTH);
}

#[test]
fn test_builder_chaining() {
    let extractor = ChunkExtractor::new("/tmp", &py())
        .with_exclude_patterns(vec!["target".to_string()])
        .with_max_file_size(1024);
    assert_eq!(extractor.exclude_patterns, vec!["target"]);
    assert_eq!(extractor.max_file_size, 1024);
}

#[test]
fn test_nonexistent_directory() {
    let extractor = ChunkExtractor::new("/nonexistent/path/12345", &py());
    let err = extractor.chunks().err().unwrap();
    assert!(matches!(err, IndexingError::DirectoryNotFound(_)));
}

#[test]
fn test_not_a_directory() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("notadir.py");
    fs::write(&file_path, "x = 1").unwrap();

    let err = ChunkExtractor::new(&file_path, &py()).chunks().err().unwrap();
    assert!(matches!(err, IndexingError::NotADirectory(_)));
}

#[test]
fn test_empty_directory() {
    let temp_dir = TempDir::new().unwrap();
    let chunks: Vec<_> = ChunkExtractor::new(temp_dir.path(), &py())
        .chunks()
        .unwrap()
        .collect();
    assert!(chunks.is_empty());
}

#[test]
fn test_two_python_files_yield_two_chunks() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.py"), "def a():\n    return 1\n").unwrap();
    fs::write(temp_dir.path().join("b.py"), "def b():\n    return 2\n").unwrap();
    fs::write(temp_dir.path().join("README.md"), "# readme").unwrap();

    let chunks: Vec<_> = ChunkExtractor::new(temp_dir.path(), &py())
        .chunks()
        .unwrap()
        .collect();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].relative_path, "a.py");
    assert_eq!(chunks[0].content, "def a():\n    return 1\n");
    assert_eq!(chunks[1].relative_path, "b.py");
    assert_ne!(chunks[0].hash, chunks[1].hash);
}

#[test]
fn test_nested_directories() {
    let temp_dir = TempDir::new().unwrap();
    let subdir = temp_dir.path().join("pkg").join("sub");
    fs::create_dir_all(&subdir).unwrap();
    fs::write(temp_dir.path().join("root.py"), "x = 1").unwrap();
    fs::write(subdir.join("nested.py"), "y = 2").unwrap();

    let mut paths: Vec<_> = ChunkExtractor::new(temp_dir.path(), &py())
        .chunks()
        .unwrap()
        .map(|c| c.relative_path)
        .collect();
    paths.sort();

    let nested = Path::new("pkg").join("sub").join("nested.py");
    assert_eq!(paths, vec![nested.to_string_lossy().to_string(), "root.py".to_string()]);
}

#[test]
fn test_extension_match_is_case_insensitive() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("UPPER.PY"), "x = 1").unwrap();

    let count = ChunkExtractor::new(temp_dir.path(), &py())
        .chunks()
        .unwrap()
        .count();
    assert_eq!(count, 1);
}

#[test]
fn test_git_directory_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let git_dir = temp_dir.path().join(".git");
    fs::create_dir(&git_dir).unwrap();
    fs::write(git_dir.join("hook.py"), "x = 1").unwrap();
    fs::write(temp_dir.path().join("main.py"), "y = 2").unwrap();

    let chunks: Vec<_> = ChunkExtractor::new(temp_dir.path(), &py())
        .chunks()
        .unwrap()
        .collect();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].relative_path, "main.py");
}

#[test]
fn test_exclude_patterns_match_components() {
    let temp_dir = TempDir::new().unwrap();
    let build = temp_dir.path().join("build");
    fs::create_dir(&build).unwrap();
    fs::write(build.join("generated.py"), "x = 1").unwrap();
    fs::write(temp_dir.path().join("build_utils.py"), "y = 2").unwrap();

    let chunks: Vec<_> = ChunkExtractor::new(temp_dir.path(), &py())
        .with_exclude_patterns(vec!["build".to_string()])
        .chunks()
        .unwrap()
        .collect();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].relative_path, "build_utils.py");
}

#[test]
fn test_ignore_files_do_not_hide_sources() {
    let temp_dir = TempDir::new().unwrap();
    let generated = temp_dir.path().join("generated");
    fs::create_dir(&generated).unwrap();
    fs::write(temp_dir.path().join(".gitignore"), "generated/\n").unwrap();
    fs::write(temp_dir.path().join(".ignore"), "main.py\n").unwrap();
    fs::write(generated.join("api.py"), "def api():\n    pass\n").unwrap();
    fs::write(temp_dir.path().join("main.py"), "import generated.api\n").unwrap();

    let mut chunks = ChunkExtractor::new(temp_dir.path(), &py()).chunks().unwrap();
    let mut paths: Vec<_> = chunks.by_ref().map(|c| c.relative_path).collect();
    paths.sort();

    let api = Path::new("generated").join("api.py");
    assert_eq!(paths, vec![api.to_string_lossy().to_string(), "main.py".to_string()]);
    assert!(chunks.skipped().is_empty());
}

#[test]
fn test_overlong_path_is_skipped_with_record() {
    let temp_dir = TempDir::new().unwrap();
    let deep = temp_dir.path().join("a".repeat(40));
    fs::create_dir(&deep).unwrap();
    fs::write(deep.join("deep.py"), "x = 1").unwrap();
    fs::write(temp_dir.path().join("short.py"), "y = 2").unwrap();

    let mut chunks = ChunkExtractor::new(temp_dir.path(), &py())
        .with_max_path_length(32)
        .chunks()
        .unwrap();
    let collected: Vec<_> = chunks.by_ref().collect();

    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0].relative_path, "short.py");
    assert_eq!(chunks.skipped().len(), 1);
    assert!(chunks.skipped()[0].path.ends_with("deep.py"));
    assert!(matches!(
        chunks.skipped()[0].error,
        IndexingError::PathTooLong { len: 48, max: 32 }
    ));
}

#[test]
fn test_default_path_limit_matches_stored_field() {
    let temp_dir = TempDir::new().unwrap();
    let mut deep = temp_dir.path().to_path_buf();
    for i in 0..5 {
        deep.push(format!("{}{}", i, "d".repeat(219)));
    }
    fs::create_dir_all(&deep).unwrap();
    fs::write(deep.join("leaf.py"), "x = 1").unwrap();

    let mut chunks = ChunkExtractor::new(temp_dir.path(), &py()).chunks().unwrap();
    assert!(chunks.next().is_none());
    assert!(matches!(
        chunks.skipped()[0].error,
        IndexingError::PathTooLong { max: MAX_PATH_LENGTH, .. }
    ));
}

#[test]
fn test_oversized_file_is_skipped_with_record() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("small.py"), "x = 1").unwrap();
    fs::write(temp_dir.path().join("large.py"), "a".repeat(2000)).unwrap();

    let extractor = ChunkExtractor::new(temp_dir.path(), &py()).with_max_file_size(1000);
    let mut chunks = extractor.chunks().unwrap();
    let collected: Vec<_> = chunks.by_ref().collect();

    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0].relative_path, "small.py");
    assert_eq!(chunks.skipped().len(), 1);
    assert!(matches!(
        chunks.skipped()[0].error,
        IndexingError::FileTooLarge { size: 2000, max: 1000 }
    ));
}

#[test]
fn test_invalid_utf8_file_does_not_stop_the_walk() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a_bad.py"), [0xff, 0xfe, b'x', b'=', b'1']).unwrap();
    fs::write(temp_dir.path().join("b_good.py"), "y = 2").unwrap();

    let mut chunks = ChunkExtractor::new(temp_dir.path(), &py()).chunks().unwrap();
    let collected: Vec<_> = chunks.by_ref().collect();

    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0].relative_path, "b_good.py");

    let skipped = chunks.into_skipped();
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].path.ends_with("a_bad.py"));
    assert!(matches!(
        skipped[0].error,
        IndexingError::FileReadFailed { .. }
    ));
}

#[test]
fn test_binary_file_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("blob.py"), [0u8, 1, 2, 3, 4, 5, 6, 7]).unwrap();

    let mut chunks = ChunkExtractor::new(temp_dir.path(), &py()).chunks().unwrap();
    assert!(chunks.next().is_none());
    assert!(matches!(
        chunks.skipped()[0].error,
        IndexingError::BinaryFile(_)
    ));
}

#[test]
fn test_empty_file_is_ignored_silently() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("__init__.py"), "").unwrap();

    let mut chunks = ChunkExtractor::new(temp_dir.path(), &py()).chunks().unwrap();
    assert!(chunks.next().is_none());
    assert!(chunks.skipped().is_empty());
}

#[test]
fn test_chunks_are_lazy() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.py"), "x = 1").unwrap();
    fs::write(temp_dir.path().join("b.py"), "y = 2").unwrap();

    let mut chunks = ChunkExtractor::new(temp_dir.path(), &py()).chunks().unwrap();
    let first = chunks.next().unwrap();
    assert_eq!(first.relative_path, "a.py");

    // Files not yet visited can still change before they are read
    fs::write(temp_dir.path().join("b.py"), "y = 3").unwrap();
    let second = chunks.next().unwrap();
    assert_eq!(second.content, "y = 3");
}

#[test]
fn test_is_text() {
    assert!(is_text(b"fn main() {}\n"));
    assert!(is_text(b""));
    assert!(!is_text(&[0u8; 16]));
}

#[test]
fn test_calculate_hash_is_stable() {
    assert_eq!(calculate_hash("abc"), calculate_hash("abc"));
    assert_ne!(calculate_hash("abc"), calculate_hash("abd"));
    assert_eq!(calculate_hash("abc").len(), 64);
}
