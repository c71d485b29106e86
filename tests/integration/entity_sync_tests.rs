use anyhow::Result;
use async_trait::async_trait;
use ivy_sync::ivy_service::RemoteSyncService;
use ivy_sync::models::{Budget, Category, EntityKind, SyncState, Syncable, Transaction};
use ivy_sync::persistency::budget_repository::BudgetRepository;
use ivy_sync::persistency::{LocalStore, WatermarkStore};
use ivy_sync::sync::SkipReason;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::common::fixtures::{
    clean_budget, deleted_budget, dirty_budget, remote_budget, test_category, test_expense,
    BrokenLocalStore,
};
use crate::common::mock_sync_service::MockSyncService;
use crate::common::setup::{TestEnv, SYNC_START};

async fn setup() -> (TestEnv, BudgetRepository, MockSyncService<Budget>) {
    let env = TestEnv::new().await.unwrap();
    let repo = env.persistency.budget_repository();
    (env, repo, MockSyncService::new())
}

// ============================================================================
// Three-phase pass
// ============================================================================

#[tokio::test]
async fn test_full_pass_upload_delete_fetch() {
    let (env, repo, remote) = setup().await;

    let a = dirty_budget("Food", 300.0);
    let b = deleted_budget("Old");
    repo.save(&a).await.unwrap();
    repo.save(&b).await.unwrap();
    env.watermarks()
        .put_watermark(EntityKind::Budget, 1000)
        .await
        .unwrap();

    let c = remote_budget("Travel", 1200.0);
    remote.insert_remote(c.clone(), 1500);

    let syncer = env.syncer(repo.clone(), remote.clone());
    let report = syncer.sync().await.unwrap();

    // A pushed once and now clean
    assert_eq!(remote.pushed(), vec![a.clone()]);
    let stored_a = repo.get_by_id(a.id).await.unwrap().unwrap();
    assert_eq!(stored_a.sync_state(), SyncState::Clean);

    // B deleted remotely and gone locally
    assert_eq!(remote.deleted_ids(), vec![b.id]);
    assert!(repo.get_by_id(b.id).await.unwrap().is_none());

    // C fetched clean
    let stored_c = repo.get_by_id(c.id).await.unwrap().unwrap();
    assert_eq!(stored_c, c);

    // watermark is the pass start, not the newest server timestamp
    let watermark = env.watermarks().get_watermark(EntityKind::Budget).await.unwrap();
    assert_eq!(watermark, SYNC_START);
    assert!(watermark >= 1500);

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.fetched, 1);
    assert_eq!(report.watermark, Some(SYNC_START));
    assert!(report.is_complete());
}

#[tokio::test]
async fn test_second_pass_is_a_no_op() {
    let (env, repo, remote) = setup().await;
    repo.save(&dirty_budget("Food", 300.0)).await.unwrap();
    repo.save(&deleted_budget("Old")).await.unwrap();
    remote.insert_remote(remote_budget("Travel", 10.0), 500);

    let syncer = env.syncer(repo.clone(), remote.clone());
    syncer.sync().await.unwrap();
    let writes_after_first = remote.write_calls();
    let snapshot = {
        let mut all = repo.find_all().await.unwrap();
        all.sort_by_key(|b| b.id);
        all
    };

    let report = syncer.sync().await.unwrap();

    assert_eq!(remote.write_calls(), writes_after_first);
    assert_eq!(report.uploaded + report.deleted + report.fetched, 0);
    let mut after = repo.find_all().await.unwrap();
    after.sort_by_key(|b| b.id);
    assert_eq!(after, snapshot);
}

#[tokio::test]
async fn test_fetch_uses_stored_watermark() {
    let (env, repo, remote) = setup().await;
    env.watermarks()
        .put_watermark(EntityKind::Budget, 1000)
        .await
        .unwrap();

    let old = remote_budget("Seen before", 1.0);
    let new = remote_budget("New", 2.0);
    remote.insert_remote(old.clone(), 900);
    remote.insert_remote(new.clone(), 1001);

    let syncer = env.syncer(repo.clone(), remote.clone());
    let report = syncer.sync().await.unwrap();

    assert_eq!(report.fetched, 1);
    assert!(repo.get_by_id(new.id).await.unwrap().is_some());
    assert!(repo.get_by_id(old.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_first_sync_fetches_everything() {
    let (env, repo, remote) = setup().await;
    remote.insert_remote(remote_budget("One", 1.0), 1);
    remote.insert_remote(remote_budget("Two", 2.0), 2);

    let syncer = env.syncer(repo.clone(), remote.clone());
    let report = syncer.sync().await.unwrap();

    assert_eq!(report.fetched, 2);
    assert_eq!(repo.find_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_fetched_record_overwrites_local_copy() {
    let (env, repo, remote) = setup().await;

    let mut local = clean_budget("Food", 100.0);
    local.amount = 150.0;
    local.mark_edited();
    repo.save(&local).await.unwrap();

    // another device wrote the same id; our upload of it fails this pass
    let mut newer = local.clone();
    newer.amount = 999.0;
    remote.insert_remote(newer, 1800);
    remote.fail_for_id(local.id);

    let syncer = env.syncer(repo.clone(), remote.clone());
    let report = syncer.sync().await.unwrap();
    assert_eq!(report.upload_failed, 1);
    assert_eq!(report.fetched, 1);

    let stored = repo.get_by_id(local.id).await.unwrap().unwrap();
    assert_eq!(stored.amount, 999.0);
    assert_eq!(stored.sync_state(), SyncState::Clean);
}

#[tokio::test]
async fn test_category_and_transaction_uploads_end_clean() {
    let (env, _repo, _remote) = setup().await;
    let categories = env.persistency.category_repository();
    let transactions = env.persistency.transaction_repository();

    let category = test_category("Groceries");
    let mut expense = test_expense(Uuid::new_v4(), 42.0);
    expense.category_id = Some(category.id);
    categories.save(&category).await.unwrap();
    transactions.save(&expense).await.unwrap();

    let category_remote = MockSyncService::<Category>::new();
    let transaction_remote = MockSyncService::<Transaction>::new();
    let category_syncer = env.syncer(categories.clone(), category_remote.clone());
    let transaction_syncer = env.syncer(transactions.clone(), transaction_remote.clone());

    assert_eq!(category_syncer.sync().await.unwrap().uploaded, 1);
    assert_eq!(transaction_syncer.sync().await.unwrap().uploaded, 1);

    assert!(category_syncer.is_synced().await.unwrap());
    assert!(transaction_syncer.is_synced().await.unwrap());
    let stored = transactions.get_by_id(expense.id).await.unwrap().unwrap();
    assert_eq!(stored.category_id, Some(category.id));
    assert_eq!(transaction_remote.pushed().len(), 1);
    assert_eq!(category_remote.pushed()[0].name, "Groceries");
}

// ============================================================================
// Local changes during a pass
// ============================================================================

#[derive(Clone, Copy)]
enum LocalChange {
    Edit(f64),
    Delete,
}

/// Remote that lets the user change the record locally while its first
/// upload is in flight
struct ChangeDuringPush {
    inner: MockSyncService<Budget>,
    repo: BudgetRepository,
    change: LocalChange,
    applied: AtomicBool,
}

#[async_trait]
impl RemoteSyncService<Budget> for ChangeDuringPush {
    async fn fetch(&self, after: i64) -> Result<Vec<Budget>> {
        self.inner.fetch(after).await
    }

    async fn push(&self, item: &Budget) -> Result<()> {
        self.inner.push(item).await?;
        if !self.applied.swap(true, Ordering::SeqCst) {
            let mut stored = self.repo.get_by_id(item.id).await?.expect("record exists");
            match self.change {
                LocalChange::Edit(amount) => {
                    stored.amount = amount;
                    stored.mark_edited();
                }
                LocalChange::Delete => stored.mark_deleted(),
            }
            self.repo.save(&stored).await?;
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.inner.delete(id).await
    }
}

fn change_during_push(
    repo: &BudgetRepository,
    remote: &MockSyncService<Budget>,
    change: LocalChange,
) -> ChangeDuringPush {
    ChangeDuringPush {
        inner: remote.clone(),
        repo: repo.clone(),
        change,
        applied: AtomicBool::new(false),
    }
}

#[tokio::test]
async fn test_edit_during_upload_stays_dirty_and_is_pushed_next_pass() {
    let (env, repo, remote) = setup().await;
    let budget = dirty_budget("Food", 300.0);
    repo.save(&budget).await.unwrap();

    let syncer = env.syncer(
        repo.clone(),
        change_during_push(&repo, &remote, LocalChange::Edit(450.0)),
    );
    let report = syncer.sync().await.unwrap();
    assert_eq!(report.uploaded, 1);

    let stored = repo.get_by_id(budget.id).await.unwrap().unwrap();
    assert_eq!(stored.amount, 450.0);
    assert_eq!(stored.sync_state(), SyncState::DirtyUpsert);
    assert!(!syncer.is_synced().await.unwrap());

    syncer.sync().await.unwrap();

    let pushed: Vec<f64> = remote.pushed().iter().map(|b| b.amount).collect();
    assert_eq!(pushed, vec![300.0, 450.0]);
    let stored = repo.get_by_id(budget.id).await.unwrap().unwrap();
    assert_eq!(stored.sync_state(), SyncState::Clean);
    assert_eq!(stored.amount, 450.0);
}

#[tokio::test]
async fn test_delete_during_upload_reaches_remote() {
    let (env, repo, remote) = setup().await;
    let budget = dirty_budget("Food", 300.0);
    repo.save(&budget).await.unwrap();

    let syncer = env.syncer(
        repo.clone(),
        change_during_push(&repo, &remote, LocalChange::Delete),
    );
    let report = syncer.sync().await.unwrap();

    // the tombstone is not overwritten as clean; the delete phase of the
    // same pass sends it
    assert_eq!(report.uploaded, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(remote.deleted_ids(), vec![budget.id]);
    assert!(remote.remote_record(budget.id).is_none());
    assert!(repo.get_by_id(budget.id).await.unwrap().is_none());
    assert!(syncer.is_synced().await.unwrap());
}

#[tokio::test]
async fn test_own_upload_is_fetched_back_when_stamped_after_watermark() {
    let (env, repo, remote) = setup().await;
    let budget = dirty_budget("Food", 300.0);
    repo.save(&budget).await.unwrap();
    // server clock runs ahead of the pass start
    remote.set_server_time(SYNC_START + 500);

    let syncer = env.syncer(repo.clone(), remote.clone());
    let first = syncer.sync().await.unwrap();
    assert_eq!(first.uploaded, 1);
    assert_eq!(first.fetched, 1);
    assert_eq!(remote.remote_record(budget.id), Some(budget.synced()));

    // the watermark is the pass start, so the same window is seen again
    let second = syncer.sync().await.unwrap();
    assert_eq!(second.fetched, 1);
    assert_eq!(remote.write_calls(), 1);
    assert_eq!(
        repo.get_by_id(budget.id).await.unwrap().unwrap(),
        budget.synced()
    );
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failed_fetch_keeps_watermark() {
    let (env, repo, remote) = setup().await;
    env.watermarks()
        .put_watermark(EntityKind::Budget, 1000)
        .await
        .unwrap();
    let a = dirty_budget("Food", 300.0);
    repo.save(&a).await.unwrap();
    remote.fail_operation("fetch");

    let syncer = env.syncer(repo.clone(), remote.clone());
    let report = syncer.sync().await.unwrap();

    assert!(report.fetch_failed);
    assert_eq!(report.watermark, None);
    assert_eq!(
        env.watermarks().get_watermark(EntityKind::Budget).await.unwrap(),
        1000
    );
    // the upload still went through
    assert!(repo.get_by_id(a.id).await.unwrap().unwrap().is_synced);

    // the missed window is fetched on the next pass
    let c = remote_budget("Missed", 5.0);
    remote.insert_remote(c.clone(), 1200);
    remote.clear_failures();
    syncer.sync().await.unwrap();
    assert!(repo.get_by_id(c.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_failed_upload_leaves_only_that_record_dirty() {
    let (env, repo, remote) = setup().await;
    let ok = dirty_budget("Food", 300.0);
    let failing = dirty_budget("Rent", 900.0);
    repo.save(&ok).await.unwrap();
    repo.save(&failing).await.unwrap();
    remote.fail_for_id(failing.id);

    let syncer = env.syncer(repo.clone(), remote.clone());
    let report = syncer.sync().await.unwrap();

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.upload_failed, 1);
    assert!(!report.is_complete());
    assert!(repo.get_by_id(ok.id).await.unwrap().unwrap().is_synced);
    assert_eq!(
        repo.get_by_id(failing.id).await.unwrap().unwrap().sync_state(),
        SyncState::DirtyUpsert
    );
    // upload failures do not hold back the fetch cursor
    assert_eq!(report.watermark, Some(SYNC_START));
    assert!(!syncer.is_synced().await.unwrap());

    remote.clear_failures();
    let report = syncer.sync().await.unwrap();
    assert_eq!(report.uploaded, 1);
    assert!(syncer.is_synced().await.unwrap());
}

#[tokio::test]
async fn test_failed_delete_keeps_tombstone() {
    let (env, repo, remote) = setup().await;
    let b = deleted_budget("Old");
    repo.save(&b).await.unwrap();
    remote.fail_operation("delete");

    let syncer = env.syncer(repo.clone(), remote.clone());
    let report = syncer.sync().await.unwrap();

    assert_eq!(report.delete_failed, 1);
    let stored = repo.get_by_id(b.id).await.unwrap().unwrap();
    assert_eq!(stored.sync_state(), SyncState::DirtyDelete);

    remote.clear_failures();
    syncer.sync().await.unwrap();
    assert!(repo.get_by_id(b.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_broken_local_store_aborts_without_watermark() {
    let (env, _repo, remote) = setup().await;
    env.watermarks()
        .put_watermark(EntityKind::Budget, 1000)
        .await
        .unwrap();

    let syncer = env.syncer(BrokenLocalStore::<Budget>::new(), remote.clone());
    assert!(syncer.sync().await.is_err());
    assert!(syncer.is_synced().await.is_err());

    assert_eq!(remote.total_calls(), 0);
    assert_eq!(
        env.watermarks().get_watermark(EntityKind::Budget).await.unwrap(),
        1000
    );
}

// ============================================================================
// Guards
// ============================================================================

#[tokio::test]
async fn test_not_logged_in_is_a_silent_no_op() {
    let (env, repo, remote) = setup().await;
    let a = dirty_budget("Food", 300.0);
    let b = deleted_budget("Old");
    repo.save(&a).await.unwrap();
    repo.save(&b).await.unwrap();
    remote.insert_remote(remote_budget("Travel", 1.0), 10);
    env.session.set_logged_in(false);

    let syncer = env.syncer(repo.clone(), remote.clone());
    let report = syncer.sync().await.unwrap();

    assert_eq!(report.skipped, Some(SkipReason::NotLoggedIn));
    assert_eq!(remote.total_calls(), 0);
    assert_eq!(repo.get_by_id(a.id).await.unwrap().unwrap(), a);
    assert_eq!(repo.get_by_id(b.id).await.unwrap().unwrap(), b);
    assert_eq!(repo.find_all().await.unwrap().len(), 1);
    assert_eq!(
        env.watermarks().get_watermark(EntityKind::Budget).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_overlapping_pass_is_skipped() {
    let (env, repo, remote) = setup().await;
    repo.save(&dirty_budget("Food", 300.0)).await.unwrap();
    remote.set_delay(Duration::from_millis(100));

    let syncer = Arc::new(env.syncer(repo.clone(), remote.clone()));
    let (first, second) = tokio::join!(syncer.sync(), syncer.sync());

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.uploaded, 1);
    assert_eq!(second.skipped, Some(SkipReason::AlreadyRunning));
    assert_eq!(remote.call_count("push"), 1);
}

// ============================================================================
// is_synced
// ============================================================================

#[tokio::test]
async fn test_is_synced_reflects_dirty_records_without_network() {
    let (env, repo, remote) = setup().await;
    let syncer = env.syncer(repo.clone(), remote.clone());

    assert!(syncer.is_synced().await.unwrap());

    repo.save(&clean_budget("Rent", 900.0)).await.unwrap();
    assert!(syncer.is_synced().await.unwrap());

    let dirty = dirty_budget("Food", 300.0);
    repo.save(&dirty).await.unwrap();
    assert!(!syncer.is_synced().await.unwrap());

    repo.save(&dirty.synced()).await.unwrap();
    repo.save(&deleted_budget("Old")).await.unwrap();
    assert!(!syncer.is_synced().await.unwrap());

    assert_eq!(remote.total_calls(), 0);
}
