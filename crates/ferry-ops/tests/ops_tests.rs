use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ferry_core::{Action, TransferError, TransferResult};
use ferry_ops::{execute_action, total_size, NoopObserver, StepObserver};
use tempfile::TempDir;

#[derive(Default)]
struct Recorder {
    checkpoints: usize,
    ticks: Vec<u64>,
}

impl StepObserver for Recorder {
    fn checkpoint(&mut self) -> TransferResult<()> {
        self.checkpoints += 1;
        Ok(())
    }

    fn advance(&mut self, bytes: u64) {
        self.ticks.push(bytes);
    }
}

/// Relative path -> contents (None for directories).
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Option<Vec<u8>>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            let relative = path.strip_prefix(root).unwrap().to_path_buf();
            if path.is_dir() {
                out.insert(relative, None);
                walk(root, &path, out);
            } else {
                out.insert(relative, Some(fs::read(&path).unwrap()));
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

fn create_tree(root: &Path) -> PathBuf {
    let tree = root.join("tree");
    fs::create_dir_all(tree.join("sub/deeper")).unwrap();
    fs::create_dir_all(tree.join("empty")).unwrap();
    fs::write(tree.join("top.txt"), b"top level").unwrap();
    fs::write(tree.join("sub/mid.bin"), vec![7u8; 1024]).unwrap();
    fs::write(tree.join("sub/deeper/leaf.txt"), b"leaf").unwrap();
    tree
}

#[test]
fn test_copy_tree_reproduces_structure() {
    let temp = TempDir::new().unwrap();
    let tree = create_tree(temp.path());
    let before = snapshot(&tree);
    let dest = temp.path().join("dest");

    let mut recorder = Recorder::default();
    execute_action(Action::Copy, &[tree.clone()], Some(&dest), &mut recorder).unwrap();

    assert_eq!(snapshot(&dest.join("tree")), before);
    assert_eq!(snapshot(&tree), before);
    assert_eq!(recorder.checkpoints, 1);
    assert_eq!(recorder.ticks.len(), 3);
    assert_eq!(recorder.ticks.iter().sum::<u64>(), total_size(&[tree]));
}

#[test]
fn test_move_tree_leaves_source_absent() {
    let temp = TempDir::new().unwrap();
    let tree = create_tree(temp.path());
    let before = snapshot(&tree);
    let dest = temp.path().join("dest");

    execute_action(Action::Move, &[tree.clone()], Some(&dest), &mut NoopObserver).unwrap();

    assert_eq!(snapshot(&dest.join("tree")), before);
    assert!(!tree.exists());
}

#[test]
fn test_archive_round_trip_is_byte_exact() {
    let temp = TempDir::new().unwrap();
    let tree = create_tree(temp.path());
    let loose = temp.path().join("loose.txt");
    fs::write(&loose, b"loose file").unwrap();
    let zip_path = temp.path().join("archives/bundle.zip");

    let mut recorder = Recorder::default();
    execute_action(
        Action::Archive,
        &[tree.clone(), loose.clone()],
        Some(&zip_path),
        &mut recorder,
    )
    .unwrap();
    assert!(zip_path.is_file());
    assert_eq!(recorder.checkpoints, 2);
    assert_eq!(recorder.ticks.len(), 4);

    let out = temp.path().join("out");
    execute_action(Action::Unarchive, &[zip_path], Some(&out), &mut NoopObserver).unwrap();

    assert_eq!(snapshot(&out.join("tree")), snapshot(&tree));
    assert_eq!(fs::read(out.join("loose.txt")).unwrap(), b"loose file");
}

#[test]
fn test_cancelled_checkpoint_stops_before_next_source() {
    struct CancelSecond(usize);

    impl StepObserver for CancelSecond {
        fn checkpoint(&mut self) -> TransferResult<()> {
            self.0 += 1;
            if self.0 > 1 {
                Err(TransferError::Cancelled)
            } else {
                Ok(())
            }
        }

        fn advance(&mut self, _bytes: u64) {}
    }

    let temp = TempDir::new().unwrap();
    let first = temp.path().join("first.txt");
    let second = temp.path().join("second.txt");
    fs::write(&first, "1").unwrap();
    fs::write(&second, "2").unwrap();
    let dest = temp.path().join("dest");

    let result = execute_action(
        Action::Copy,
        &[first, second],
        Some(&dest),
        &mut CancelSecond(0),
    );

    assert!(matches!(result, Err(TransferError::Cancelled)));
    assert!(dest.join("first.txt").exists());
    assert!(!dest.join("second.txt").exists());
}

#[test]
fn test_remove_nonexistent_is_noop() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("never/existed");
    execute_action(Action::Remove, &[missing], None, &mut NoopObserver).unwrap();
}
