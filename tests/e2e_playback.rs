//! End-to-end playback tests.
//!
//! These run the full harness against a real TCP listener on the loopback
//! interface with scripts and result logs on disk.

mod common;

use std::time::Duration;

use cascades::{Harness, HarnessError, Outcome};
use common::{config_for, spawn_target};
use tokio::time::timeout;

#[tokio::test]
async fn test_playback_single_pass() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("ping.txt");
    let results = dir.path().join("results.xml");
    std::fs::write(&script, "ping\n").unwrap();

    let (port, target) = spawn_target("Welcome\r\n", vec!["OK\r\n"]).await;
    let harness = Harness::playback(config_for(port), &script).with_output(&results);

    let outcome = timeout(Duration::from_secs(10), harness.run())
        .await
        .expect("Session timed out")
        .expect("Session failed to start");
    assert_eq!(outcome, Outcome::Success);
    assert_eq!(target.await.unwrap(), vec!["ping\n"]);

    let log = std::fs::read_to_string(&results).unwrap();
    assert_eq!(
        log,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n\
         <results>\r\n\
         \t<welcome message=\"Welcome\"/>\r\n\
         \t<command request sent=\"ping\"/>\r\n\
         \t<pass recv=\"OK\"/>\r\n\
         </results>\r\n"
    );
}

#[tokio::test]
async fn test_playback_nested_scripts_and_directives() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("main.txt");
    let results = dir.path().join("results.xml");
    std::fs::write(
        &script,
        "# login flow\n\
         cli-setting failure-ok true\n\
         call login.txt\n\
         \n\
         logout\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("login.txt"), "tap login\r\ntype secret\r\n").unwrap();

    let (port, target) =
        spawn_target("ready\n", vec!["OK\n", "ERROR: field missing\n", "OK bye\n"]).await;
    let harness = Harness::playback(config_for(port), &script).with_output(&results);

    let outcome = harness.run().await.unwrap();
    assert_eq!(outcome, Outcome::Success);
    assert_eq!(
        target.await.unwrap(),
        vec!["tap login\r\n", "type secret\r\n", "logout\n"]
    );

    let log = std::fs::read_to_string(&results).unwrap();
    assert!(log.contains("<command request sent=\"tap login\"/>"));
    assert!(log.contains("<fail recv=\"ERROR: field missing\"/>"));
    assert!(log.contains("<warning reason=\"accepted-failure\"/>"));
    assert!(log.contains("<pass recv=\"OK bye\"/>"));
    assert!(!log.contains("login flow"));
    assert!(log.ends_with("</results>\r\n"));
}

#[tokio::test]
async fn test_playback_confirmed_failure_stops_script() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("fail.txt");
    let results = dir.path().join("results.xml");
    std::fs::write(&script, "first\nsecond\n").unwrap();

    let (port, target) = spawn_target("ready\n", vec!["nope\n"]).await;
    let harness = Harness::playback(config_for(port), &script).with_output(&results);

    assert_eq!(harness.run().await.unwrap(), Outcome::Failure);
    assert_eq!(target.await.unwrap(), vec!["first\n"]);

    let log = std::fs::read_to_string(&results).unwrap();
    assert!(log.contains("<fail recv=\"nope\"/>"));
    assert!(log.contains("bytesLeftInFile=\"7\""));
}

#[tokio::test]
async fn test_playback_target_hangs_up() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("hangup.txt");
    let results = dir.path().join("results.xml");
    std::fs::write(&script, "first\nsecond\n").unwrap();

    let (port, target) = spawn_target("ready\n", vec!["OK\n"]).await;
    let harness = Harness::playback(config_for(port), &script).with_output(&results);

    assert_eq!(harness.run().await.unwrap(), Outcome::Failure);
    assert_eq!(target.await.unwrap(), vec!["first\n"]);

    let log = std::fs::read_to_string(&results).unwrap();
    assert!(log.contains("<pass recv=\"OK\"/>"));
    assert!(log.contains("\t\t<fail terminated=\"true\"/>\r\n"));
    assert!(log.ends_with("</results>\r\n"));
}

#[tokio::test]
async fn test_connect_refused_is_setup_failure() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("ping.txt");
    std::fs::write(&script, "ping\n").unwrap();

    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let harness = Harness::playback(config_for(port), &script)
        .with_output(dir.path().join("results.xml"));

    let err = harness.run().await.unwrap_err();
    assert!(matches!(err, HarnessError::Connect { .. }));
    assert!(err.is_setup_failure());
}

#[tokio::test]
async fn test_missing_root_script() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::playback(config_for(1), dir.path().join("absent.txt"))
        .with_output(dir.path().join("results.xml"));

    let err = harness.run().await.unwrap_err();
    assert!(matches!(err, HarnessError::ScriptNotFound(_)));
    assert!(!err.is_setup_failure());
}
