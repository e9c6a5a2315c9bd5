//! Integration tests for `DieselMailDirectoryRepository` against a real
//! SQLite file.
//!
//! Every test gets its own temporary database, so tests run in parallel
//! without sharing rows.

use std::sync::Arc;

use mailwire::domain::ports::{MailDirectoryRepository, MailRouting, SenderPolicy};
use mailwire::domain::{
    ContactRole, DirectoryService, ErrorCode, MailRoutingService, Privileges, SenderPolicyService,
};
use mailwire::outbound::persistence::{DbPool, DieselMailDirectoryRepository, PoolConfig};
use rstest::rstest;
use tempfile::TempDir;

const PASSWORD: &str = "correct horse battery";

struct Harness {
    dir: TempDir,
    repo: Arc<DieselMailDirectoryRepository>,
    directory: DirectoryService<DieselMailDirectoryRepository>,
    routing: Arc<MailRoutingService<DieselMailDirectoryRepository>>,
}

impl Harness {
    fn database_path(&self) -> String {
        self.dir.path().join("users.sqlite").to_string_lossy().into_owned()
    }

    /// Second, read-only view of the same database file.
    async fn read_only_repo(&self) -> Arc<DieselMailDirectoryRepository> {
        let pool = DbPool::new(PoolConfig::new(self.database_path()).read_only())
            .await
            .expect("read-only pool builds");
        Arc::new(DieselMailDirectoryRepository::new(pool))
    }

    fn sender_policy(&self) -> SenderPolicyService {
        SenderPolicyService::new(self.routing.clone())
    }

    async fn user(&self, email: &str) {
        self.directory
            .add_user(email, PASSWORD, Privileges::default())
            .await
            .expect("user added");
    }

    async fn alias(&self, source: &str, destination: &str) {
        self.directory
            .add_alias(source, destination)
            .await
            .expect("alias added");
    }

    async fn resolve(&self, address: &str) -> Option<String> {
        self.routing
            .resolve_destination(address)
            .await
            .expect("lookup succeeds")
    }
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("users.sqlite");
    let pool = DbPool::new(PoolConfig::new(path.to_string_lossy()).with_max_size(4))
        .await
        .expect("pool builds");
    let repo = Arc::new(DieselMailDirectoryRepository::new(pool));
    let directory = DirectoryService::new(Arc::clone(&repo));
    directory.initialize().await.expect("schema created");
    let routing = Arc::new(MailRoutingService::new(Arc::clone(&repo)));
    Harness {
        dir,
        repo,
        directory,
        routing,
    }
}

#[tokio::test]
async fn explicit_alias_wins_over_self_alias() {
    let h = harness().await;
    h.user("alice@ex.com").await;
    h.user("bob@ex.com").await;

    assert_eq!(h.resolve("alice@ex.com").await.as_deref(), Some("alice@ex.com"));

    h.alias("alice@ex.com", "bob@ex.com").await;

    assert_eq!(h.resolve("alice@ex.com").await.as_deref(), Some("bob@ex.com"));
    assert!(h.routing.user_exists("alice@ex.com").await.expect("lookup"));
}

#[tokio::test]
async fn sales_alias_routes_and_authorizes_alice() {
    let h = harness().await;
    h.user("alice@ex.com").await;
    h.alias("sales@ex.com", "alice@ex.com").await;
    let policy = h.sender_policy();

    assert!(h.routing.domain_has_any_recipient("ex.com").await.expect("lookup"));
    assert!(h.routing.user_exists("alice@ex.com").await.expect("lookup"));
    assert!(!h.routing.user_exists("sales@ex.com").await.expect("lookup"));
    assert_eq!(h.resolve("sales@ex.com").await.as_deref(), Some("alice@ex.com"));
    assert_eq!(h.resolve("alice@ex.com").await.as_deref(), Some("alice@ex.com"));
    assert_eq!(h.resolve("nobody@ex.com").await, None);
    assert!(
        policy
            .may_use_sender_address("alice@ex.com", "sales@ex.com")
            .await
            .expect("policy")
    );
    assert!(
        !policy
            .may_use_sender_address("bob@ex.com", "sales@ex.com")
            .await
            .expect("policy")
    );
}

#[tokio::test]
async fn sender_check_round_trips_every_destination() {
    let h = harness().await;
    h.user("alice@ex.com").await;
    h.user("carol@ex.com").await;
    h.alias("info@ex.com", "carol@ex.com").await;
    let policy = h.sender_policy();

    for address in ["alice@ex.com", "carol@ex.com", "info@ex.com"] {
        let destination = h.resolve(address).await.expect("resolves");
        assert!(
            policy
                .may_use_sender_address(&destination, address)
                .await
                .expect("policy"),
            "{destination} may send as {address}"
        );
    }
}

#[rstest]
#[case("ex.com", true)]
#[case("EX.COM", true)]
#[case("aliases.org", true)]
#[case("other.com", false)]
#[case("x.com", false)]
#[case("ex_com.net", false)]
#[case("%", false)]
#[tokio::test]
async fn domain_ownership_covers_users_and_alias_sources(
    #[case] domain: &str,
    #[case] expected: bool,
) {
    let h = harness().await;
    h.user("alice@ex.com").await;
    h.user("dave@exacom.net").await;
    h.alias("team@aliases.org", "alice@ex.com").await;

    let owned = h
        .routing
        .domain_has_any_recipient(domain)
        .await
        .expect("lookup");

    assert_eq!(owned, expected);
}

#[tokio::test]
async fn catch_all_source_claims_domain_but_not_exact_addresses() {
    let h = harness().await;
    h.user("admin@ex.com").await;
    h.alias("@catch.org", "admin@ex.com").await;

    assert!(h.routing.domain_has_any_recipient("catch.org").await.expect("lookup"));
    assert_eq!(h.resolve("@catch.org").await.as_deref(), Some("admin@ex.com"));
    assert_eq!(h.resolve("someone@catch.org").await, None);
}

#[tokio::test]
async fn chained_aliases_resolve_one_hop() {
    let h = harness().await;
    h.user("carol@ex.com").await;
    h.alias("a@ex.com", "b@ex.com").await;
    h.alias("b@ex.com", "carol@ex.com").await;

    assert_eq!(h.resolve("a@ex.com").await.as_deref(), Some("b@ex.com"));
    assert_eq!(h.resolve("b@ex.com").await.as_deref(), Some("carol@ex.com"));
}

#[tokio::test]
async fn duplicate_rows_are_rejected_and_not_overwritten() {
    let h = harness().await;
    h.user("alice@ex.com").await;
    h.user("bob@ex.com").await;
    h.alias("sales@ex.com", "alice@ex.com").await;

    let user_err = h
        .directory
        .add_user("alice@ex.com", "another password", Privileges::default())
        .await
        .expect_err("duplicate user");
    let alias_err = h
        .directory
        .add_alias("sales@ex.com", "bob@ex.com")
        .await
        .expect_err("duplicate alias");

    assert_eq!(user_err.code(), ErrorCode::ConstraintViolation);
    assert_eq!(alias_err.code(), ErrorCode::ConstraintViolation);
    assert_eq!(h.resolve("sales@ex.com").await.as_deref(), Some("alice@ex.com"));
    assert!(h.directory.authenticate("alice@ex.com", PASSWORD).await.expect("auth"));
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let h = harness().await;
    h.user("alice@ex.com").await;

    h.directory.initialize().await.expect("second initialize");

    let users = h.directory.list_users().await.expect("list");
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn lookups_compare_exact_stored_values() {
    let h = harness().await;
    h.user("Alice@Ex.com").await;

    assert!(h.routing.user_exists("alice@ex.com").await.expect("lookup"));
    assert!(!h.routing.user_exists("Alice@Ex.com").await.expect("lookup"));
    assert!(!h.routing.user_exists("").await.expect("lookup"));
}

#[tokio::test]
async fn hostile_input_is_bound_not_interpolated() {
    let h = harness().await;
    h.user("alice@ex.com").await;

    let hostile = "x' OR '1'='1";
    assert!(!h.routing.user_exists(hostile).await.expect("lookup"));
    assert_eq!(h.resolve(hostile).await, None);
    assert!(!h.routing.domain_has_any_recipient(hostile).await.expect("lookup"));
    assert_eq!(h.directory.list_users().await.expect("list").len(), 1);
}

#[tokio::test]
async fn credentials_and_privileges_round_trip() {
    let h = harness().await;
    h.user("alice@ex.com").await;

    assert!(h.directory.authenticate("alice@ex.com", PASSWORD).await.expect("auth"));
    assert!(!h.directory.authenticate("alice@ex.com", "wrong password").await.expect("auth"));
    assert!(!h.directory.authenticate("ghost@ex.com", PASSWORD).await.expect("auth"));

    h.directory
        .set_password("alice@ex.com", "a fresh password")
        .await
        .expect("password changed");
    assert!(!h.directory.authenticate("alice@ex.com", PASSWORD).await.expect("auth"));
    assert!(h.directory.authenticate("alice@ex.com", "a fresh password").await.expect("auth"));

    assert!(h.directory.grant_privilege("alice@ex.com", "admin").await.expect("grant"));
    assert!(!h.directory.grant_privilege("alice@ex.com", "admin").await.expect("grant"));
    let stored = h.repo.find_user("alice@ex.com").await.expect("find").expect("present");
    assert!(stored.privileges().contains("admin"));

    assert!(h.directory.revoke_privilege("alice@ex.com", "admin").await.expect("revoke"));
    let stored = h.repo.find_user("alice@ex.com").await.expect("find").expect("present");
    assert!(stored.privileges().is_empty());
}

#[tokio::test]
async fn removals_report_missing_rows() {
    let h = harness().await;
    h.user("alice@ex.com").await;
    h.alias("sales@ex.com", "alice@ex.com").await;

    h.directory.remove_alias("sales@ex.com").await.expect("alias removed");
    h.directory.remove_user("alice@ex.com").await.expect("user removed");

    assert_eq!(h.resolve("sales@ex.com").await, None);
    assert!(!h.routing.domain_has_any_recipient("ex.com").await.expect("lookup"));
    let err = h
        .directory
        .remove_user("alice@ex.com")
        .await
        .expect_err("already removed");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn listings_are_ordered_by_address() {
    let h = harness().await;
    h.user("carol@ex.com").await;
    h.user("alice@ex.com").await;
    h.alias("zed@ex.com", "alice@ex.com").await;
    h.alias("info@ex.com", "carol@ex.com").await;

    let users: Vec<String> = h
        .directory
        .list_users()
        .await
        .expect("list")
        .iter()
        .map(|user| user.email().to_owned())
        .collect();
    let sources: Vec<String> = h
        .directory
        .list_aliases()
        .await
        .expect("list")
        .iter()
        .map(|alias| alias.source().to_owned())
        .collect();

    assert_eq!(users, ["alice@ex.com", "carol@ex.com"]);
    assert_eq!(sources, ["info@ex.com", "zed@ex.com"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_keep_exactly_one_row_per_address() {
    let h = Arc::new(harness().await);

    let mut tasks = Vec::new();
    for n in 0..8 {
        let h = Arc::clone(&h);
        tasks.push(tokio::spawn(async move {
            let email = format!("user{}@ex.com", n % 4);
            h.directory
                .add_user(&email, PASSWORD, Privileges::default())
                .await
        }));
    }

    let mut added = 0;
    for task in tasks {
        match task.await.expect("task joins") {
            Ok(_) => added += 1,
            Err(err) => assert_eq!(err.code(), ErrorCode::ConstraintViolation),
        }
    }

    assert_eq!(added, 4);
    assert_eq!(h.directory.list_users().await.expect("list").len(), 4);
}

#[tokio::test]
async fn aliased_away_user_may_no_longer_send_as_itself() {
    let h = harness().await;
    h.user("alice@ex.com").await;
    h.user("bob@ex.com").await;
    h.alias("alice@ex.com", "bob@ex.com").await;
    let policy = h.sender_policy();

    assert!(
        !policy
            .may_use_sender_address("alice@ex.com", "alice@ex.com")
            .await
            .expect("policy")
    );
    assert!(
        policy
            .may_use_sender_address("bob@ex.com", "alice@ex.com")
            .await
            .expect("policy")
    );
}

#[tokio::test]
async fn administrative_commands_match_stored_case() {
    let h = harness().await;
    h.user("alice@ex.com").await;
    h.alias("sales@ex.com", "alice@ex.com").await;

    h.directory
        .set_password("Alice@Ex.com", "a fresh password")
        .await
        .expect("password changed");
    assert!(h.directory.authenticate("ALICE@ex.com", "a fresh password").await.expect("auth"));
    assert!(h.directory.grant_privilege("Alice@EX.com", "admin").await.expect("grant"));
    h.directory.remove_alias("Sales@Ex.com").await.expect("alias removed");
    h.directory.remove_user("ALICE@EX.COM").await.expect("user removed");

    assert!(h.directory.list_users().await.expect("list").is_empty());
    assert!(h.directory.list_aliases().await.expect("list").is_empty());
}

#[tokio::test]
async fn mail_domains_are_distinct_and_ordered() {
    let h = harness().await;
    h.user("alice@ex.com").await;
    h.user("bob@ex.com").await;
    h.user("carol@beta.org").await;
    h.alias("sales@ex.com", "alice@ex.com").await;
    h.alias("@catch.net", "alice@ex.com").await;

    let domains = h.directory.list_mail_domains().await.expect("domains");

    assert_eq!(domains, ["beta.org", "catch.net", "ex.com"]);
}

#[tokio::test]
async fn required_aliases_report_missing_contacts() {
    let h = harness().await;
    h.user("alice@ex.com").await;
    h.user("carol@beta.org").await;
    h.alias("administrator@box.ex.com", "alice@ex.com").await;
    h.alias("hostmaster@box.ex.com", "administrator@box.ex.com").await;
    h.alias("postmaster@ex.com", "administrator@box.ex.com").await;
    h.alias("@catch.net", "alice@ex.com").await;

    let checks = h
        .directory
        .check_required_aliases("box.ex.com")
        .await
        .expect("check runs");

    let report: Vec<(ContactRole, &str, Option<&str>)> = checks
        .iter()
        .map(|check| (check.role(), check.address(), check.destination()))
        .collect();
    assert_eq!(
        report,
        [
            (
                ContactRole::Administrator,
                "administrator@box.ex.com",
                Some("alice@ex.com")
            ),
            (
                ContactRole::Hostmaster,
                "hostmaster@box.ex.com",
                Some("administrator@box.ex.com")
            ),
            (ContactRole::Postmaster, "postmaster@beta.org", None),
            (ContactRole::Postmaster, "postmaster@box.ex.com", None),
            (
                ContactRole::Postmaster,
                "postmaster@ex.com",
                Some("administrator@box.ex.com")
            ),
        ]
    );
}

#[tokio::test]
async fn mailbox_user_does_not_satisfy_a_required_alias() {
    let h = harness().await;
    h.user("postmaster@ex.com").await;

    let checks = h
        .directory
        .check_required_aliases("box.ex.com")
        .await
        .expect("check runs");

    assert!(checks.iter().all(|check| !check.is_present()));
    assert!(checks.iter().any(|check| check.address() == "postmaster@ex.com"));
}

#[tokio::test]
async fn read_only_store_answers_lookups() {
    let h = harness().await;
    h.user("alice@ex.com").await;
    h.alias("sales@ex.com", "alice@ex.com").await;
    let routing = MailRoutingService::new(h.read_only_repo().await);

    assert!(routing.domain_has_any_recipient("ex.com").await.expect("lookup"));
    assert_eq!(
        routing
            .resolve_destination("sales@ex.com")
            .await
            .expect("lookup")
            .as_deref(),
        Some("alice@ex.com")
    );
}

#[tokio::test]
async fn writes_through_read_only_store_are_store_unavailable() {
    let h = harness().await;
    let directory = DirectoryService::new(h.read_only_repo().await);

    let err = directory
        .add_user("alice@ex.com", PASSWORD, Privileges::default())
        .await
        .expect_err("read-only store");

    assert_eq!(err.code(), ErrorCode::StoreUnavailable);
    assert!(h.directory.list_users().await.expect("list").is_empty());
}

#[tokio::test]
async fn uninitialized_store_is_store_unavailable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("users.sqlite");
    let pool = DbPool::new(PoolConfig::new(path.to_string_lossy()))
        .await
        .expect("pool builds");
    let routing = MailRoutingService::new(Arc::new(DieselMailDirectoryRepository::new(pool)));

    let err = routing
        .user_exists("alice@ex.com")
        .await
        .expect_err("no schema");

    assert_eq!(err.code(), ErrorCode::StoreUnavailable);
    assert!(err.is_unavailable());
}
