//! End-to-end behavior of the MEGA backend against the mock executor.

use megapool::backends::mega::MegaBackend;
use megapool::executor::mock::MockExecutor;
use megapool::executor::RemoteCommand;
use megapool::{Backend, Config, MegapoolError};
use std::path::PathBuf;
use std::sync::Arc;

async fn pool(quotas: &[(&str, u64)]) -> (Arc<MockExecutor>, MegaBackend) {
    let mock = Arc::new(MockExecutor::new());
    let mut config = Config::new("/Root/backup");
    for (user, quota) in quotas {
        mock.add_account(user, "secret", *quota).await;
        config = config.with_account(*user, "secret");
    }

    let mut backend = MegaBackend::with_executor(config, mock.clone()).expect("valid config");
    backend.init().await.expect("init");
    (mock, backend)
}

fn volume(dir: &tempfile::TempDir, name: &str, size: usize) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, vec![7u8; size]).unwrap();
    path
}

#[tokio::test]
async fn test_backup_session() {
    let dir = tempfile::tempdir().unwrap();
    let (mock, backend) = pool(&[("alice", 100), ("bob", 50)]).await;

    backend.put(&volume(&dir, "v1", 60), "vol1.difftar.gpg").await.unwrap();
    backend.put(&volume(&dir, "v2", 45), "vol2.difftar.gpg").await.unwrap();
    backend.put(&volume(&dir, "m", 5), "full.manifest.gpg").await.unwrap();

    let mut names = backend.list().await.unwrap();
    names.sort();
    assert_eq!(
        names,
        vec!["full.manifest.gpg", "vol1.difftar.gpg", "vol2.difftar.gpg"]
    );

    // 100 -> 40 after vol1, 50 -> 5 after vol2, manifest lands on alice.
    let usage = backend.free_space().await.unwrap();
    assert_eq!(usage[0].username, "alice");
    assert_eq!(usage[0].free_bytes, 35);
    assert_eq!(usage[1].free_bytes, 5);

    let err = backend
        .put(&volume(&dir, "v3", 36), "vol3.difftar.gpg")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MegapoolError::InsufficientCapacity {
            needed: 36,
            available: 35
        }
    ));

    let restored = dir.path().join("restored");
    backend.get("vol2.difftar.gpg", &restored).await.unwrap();
    assert_eq!(std::fs::read(&restored).unwrap().len(), 45);

    backend.delete("vol2.difftar.gpg").await.unwrap();
    assert!(mock.files("bob").await.is_empty());
    assert_eq!(mock.files("alice").await.len(), 2);

    assert_eq!(mock.calls(RemoteCommand::List, "alice").await, 1);
    assert_eq!(mock.calls(RemoteCommand::List, "bob").await, 1);
}

#[tokio::test]
async fn test_unreachable_account_gets_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (mock, backend) = pool(&[("alice", 100), ("bob", 1000)]).await;
    mock.set_free_output("bob", "ERROR: Can't login").await;

    backend.put(&volume(&dir, "v", 10), "v").await.unwrap();

    assert_eq!(mock.files("alice").await, vec!["/Root/backup/v"]);
    assert!(mock.files("bob").await.is_empty());
}

#[tokio::test]
async fn test_missing_binary_surfaces_on_init() {
    use megapool::executor::megatools::MegatoolsExecutor;

    let bin = tempfile::tempdir().unwrap();
    let config = Config::single("alice", "secret", "/Root/backup");
    let executor = MegatoolsExecutor::new().with_bin_dir(bin.path());
    let mut backend = MegaBackend::with_executor(config, Arc::new(executor)).unwrap();

    let err = backend.init().await.unwrap_err();
    assert!(matches!(err, MegapoolError::BackendNotInstalled(_)));
}
