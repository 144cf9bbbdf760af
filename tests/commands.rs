mod common;

use common::FakeAdmin;
use gcp_sledge::commands::{backup, create, delete, describe, upgrade, CommandContext};
use gcp_sledge::config::AppConfig;

fn config() -> AppConfig {
    AppConfig {
        project_id: Some("p1".to_string()),
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_one_call_commands_issue_one_call() {
    let api = FakeAdmin::new().with_source("p1", "db", "MYSQL_5_7", "db-f1-micro");
    let config = config();
    let ctx = CommandContext::new(&api, &config, false);

    backup::run(
        &ctx,
        backup::BackupArgs {
            project: None,
            instance: "db".to_string(),
            description: backup::DEFAULT_DESCRIPTION.to_string(),
            wait: false,
        },
    )
    .await
    .unwrap();
    delete::run(
        &ctx,
        delete::DeleteArgs {
            project: None,
            instance: "old".to_string(),
            wait: false,
        },
    )
    .await
    .unwrap();

    assert_eq!(
        api.calls(),
        vec!["create_backup db on-demand-backup", "delete_instance old"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_create_with_wait_polls_until_done() {
    let api = FakeAdmin::new();
    api.script("create-op", &["PENDING", "DONE"]);
    let config = config();
    let ctx = CommandContext::new(&api, &config, false);

    create::run(
        &ctx,
        create::CreateArgs {
            project: Some("p2".to_string()),
            instance: "fresh".to_string(),
            tier: "db-f1-micro".to_string(),
            region: Some("asia-east1".to_string()),
            db_version: "MYSQL_8_0".to_string(),
            wait: true,
        },
    )
    .await
    .unwrap();

    assert_eq!(
        api.calls(),
        vec![
            "create_instance fresh",
            "get_operation create-op",
            "get_operation create-op"
        ]
    );
    let created = api.created.lock().unwrap().clone();
    assert_eq!(created[0].0, "p2");
    assert_eq!(created[0].1.region, "asia-east1");
}

#[tokio::test]
async fn test_upgrade_reads_then_patches() {
    let api = FakeAdmin::new().with_source("p1", "db", "MYSQL_5_7", "db-f1-micro");
    let config = config();
    let ctx = CommandContext::new(&api, &config, false);

    upgrade::run(
        &ctx,
        upgrade::UpgradeArgs {
            project: None,
            instance: "db".to_string(),
            db_version: Some("MYSQL_8_0".to_string()),
            tier: None,
            wait: false,
        },
    )
    .await
    .unwrap();

    assert_eq!(api.calls(), vec!["get_instance db", "patch_instance db"]);
}

#[tokio::test]
async fn test_describe_unknown_instance_fails() {
    let api = FakeAdmin::new();
    let config = config();
    let ctx = CommandContext::new(&api, &config, false);

    let err = describe::run(
        &ctx,
        describe::DescribeArgs {
            project: None,
            instance: "ghost".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(format!("{err:#}").contains("does not exist"));
}

#[tokio::test]
async fn test_dry_run_leaves_remote_untouched() {
    let api = FakeAdmin::new();
    let config = config();
    let ctx = CommandContext::new(&api, &config, true);

    delete::run(
        &ctx,
        delete::DeleteArgs {
            project: None,
            instance: "db".to_string(),
            wait: true,
        },
    )
    .await
    .unwrap();
    assert!(api.calls().is_empty());
}
