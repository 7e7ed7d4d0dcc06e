//! Integration tests for single-instance lock contention.

use mtpdesk_instance::{InstanceLock, LOCK_FILE_NAME, LockFileInstance};

#[test]
fn single_instance_lock_tests_second_holder_is_refused() {
    let temp = tempfile::tempdir().expect("tempdir should be created");
    let first = LockFileInstance::in_dir(temp.path());
    let second = LockFileInstance::in_dir(temp.path());

    assert!(first.try_acquire());
    assert!(!second.try_acquire());
    assert!(!second.is_held());
    assert_eq!(second.holder_pid(), Some(std::process::id()));
}

#[test]
fn single_instance_lock_tests_release_lets_next_launch_in() {
    let temp = tempfile::tempdir().expect("tempdir should be created");
    let first = LockFileInstance::in_dir(temp.path());
    let second = LockFileInstance::in_dir(temp.path());

    assert!(first.try_acquire());
    first.release();
    first.release();

    assert!(second.try_acquire());
    assert!(temp.path().join(LOCK_FILE_NAME).exists());
}

#[test]
fn single_instance_lock_tests_creates_missing_profile_directory() {
    let temp = tempfile::tempdir().expect("tempdir should be created");
    let lock = LockFileInstance::in_dir(temp.path().join("nested").join("profile"));
    assert!(lock.try_acquire());
    assert!(lock.path().exists());
}
