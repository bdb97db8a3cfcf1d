#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use herdsync_domain::Payload;
use herdsync_infra::database::{DbManager, SqliteQueueStore};
use herdsync_infra::submission::{HttpSubmissionClient, SubmissionClientConfig};
use tempfile::TempDir;
use wiremock::MockServer;

/// On-disk queue database that lives as long as the value.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir should be created");
        let manager = open_manager(&dir);
        Self { manager, dir }
    }

    pub fn store(&self) -> Arc<SqliteQueueStore> {
        Arc::new(SqliteQueueStore::new(Arc::clone(&self.manager)))
    }

    /// A fresh manager on the same file, as after a process restart.
    pub fn reopen(&self) -> Arc<SqliteQueueStore> {
        Arc::new(SqliteQueueStore::new(open_manager(&self.dir)))
    }

    pub fn execute(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.execute(sql, params).expect("SQL should execute");
    }

    pub fn raw_queue(&self, name: &str) -> Option<String> {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.query_row(
            "SELECT entries_json FROM offline_queues WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .ok()
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

fn open_manager(dir: &TempDir) -> Arc<DbManager> {
    let manager = DbManager::new(dir.path().join("queues.db"), 4).expect("manager should open");
    manager.run_migrations().expect("migrations should apply");
    Arc::new(manager)
}

pub fn client_for(server: &MockServer) -> Arc<HttpSubmissionClient> {
    let client = HttpSubmissionClient::new(SubmissionClientConfig {
        base_url: server.uri(),
        timeout: Duration::from_millis(500),
        max_attempts: 1,
    })
    .expect("client should build");
    Arc::new(client)
}

pub fn payment(animal_id: &str) -> Payload {
    Payload::new()
        .with_field("animalId", animal_id)
        .with_field("actionType", "ownership")
        .with_field("amount", 500)
        .with_field("phone", "254700000000")
        .with_field("timestamp", "2024-01-01T00:00:00Z")
}

pub fn ownership_change(animal_id: &str, new_owner: &str) -> Payload {
    Payload::new()
        .with_field("animalId", animal_id)
        .with_field("newOwnerId", new_owner)
        .with_field("timestamp", "2024-03-01T08:00:00Z")
}
