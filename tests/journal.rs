use std::fs::File;
use std::time::Duration;

use orbit_engine::config::ServerConfig;
use orbit_engine::journal::JournalFile;
use tokio::sync::oneshot;
use tokio::time::timeout;

/// Run the server briefly with a small batch size and check the journal
/// directory afterwards: sequenced files, correct metadata, and a final
/// partial flush on shutdown.
#[tokio::test]
async fn journal_files_are_batched_sequenced_and_flushed() {
    let dir = tempfile::tempdir().expect("tempdir");

    let mut config = ServerConfig::default();
    config.port = 0;
    config.tick_hz = 40.0;
    config.journal.dir = dir.path().join("logs");
    config.journal.batch_size = 5;

    let server = orbit_engine::server::bind(config).await.expect("bind");
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        server
            .serve(async {
                let _ = stopped.await;
            })
            .await
            .expect("serve");
    });

    // Let a couple of batches accumulate, then shut down cleanly.
    tokio::time::sleep(Duration::from_millis(600)).await;
    let _ = stop.send(());
    timeout(Duration::from_secs(30), handle)
        .await
        .expect("shutdown in time")
        .expect("server task");

    let mut paths: Vec<_> = std::fs::read_dir(dir.path().join("logs"))
        .expect("journal dir exists")
        .map(|entry| entry.expect("dir entry").path())
        .collect();
    paths.sort();
    assert!(paths.len() >= 2, "expected several journal files, got {paths:?}");
    assert!(paths[0].ends_with("journal_00001.json"));

    let mut total_records = 0;
    for (index, path) in paths.iter().enumerate() {
        let file: JournalFile =
            serde_json::from_reader(File::open(path).expect("open")).expect("parse");
        assert_eq!(file.metadata.file_number, index as u64 + 1);
        assert_eq!(file.metadata.total_timesteps, file.data.len());
        assert_eq!(file.metadata.epoch, "2000-01-01T12:00:00Z");
        assert!(file.metadata.end_time >= file.metadata.start_time);
        total_records += file.data.len();

        let record = &file.data[0];
        assert_eq!(record.bodies.len(), 9, "all bodies journaled");
        assert!(record.bodies.contains_key("earth"));
        assert!(record.time_scale > 0.0);
    }

    // Every full file holds exactly one batch; the tail may be partial.
    for path in &paths[..paths.len() - 1] {
        let file: JournalFile =
            serde_json::from_reader(File::open(path).expect("open")).expect("parse");
        assert_eq!(file.data.len(), 5);
    }
    assert!(total_records >= 10, "only {total_records} records journaled");
}
