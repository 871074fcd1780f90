use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use taskpad_core::{StoreError, StoreEvent, Task, TaskStore};
use uuid::Uuid;

#[test]
fn create_is_visible_on_the_next_read() {
    let store = TaskStore::open_in_memory().unwrap();

    let created = store.create("buy milk", "two liters").unwrap();
    let listed = store.list().unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], created);
    assert!(!created.is_completed);
}

#[test]
fn list_orders_newest_first_and_earlier_timestamps_go_last() {
    let store = TaskStore::open_in_memory().unwrap();

    store
        .insert(Task::with_id(Uuid::new_v4(), "middle", "", 2_000))
        .unwrap();
    store
        .insert(Task::with_id(Uuid::new_v4(), "newest", "", 3_000))
        .unwrap();
    // Earlier creation time than everything already stored: lands last.
    store
        .insert(Task::with_id(Uuid::new_v4(), "oldest", "", 1_000))
        .unwrap();

    let titles: Vec<_> = store
        .list()
        .unwrap()
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(titles, ["newest", "middle", "oldest"]);
}

#[test]
fn equal_timestamps_keep_insertion_order() {
    let store = TaskStore::open_in_memory().unwrap();

    store
        .insert(Task::with_id(Uuid::new_v4(), "first", "", 5_000))
        .unwrap();
    store
        .insert(Task::with_id(Uuid::new_v4(), "second", "", 5_000))
        .unwrap();
    store
        .insert(Task::with_id(Uuid::new_v4(), "third", "", 5_000))
        .unwrap();

    let titles: Vec<_> = store
        .list()
        .unwrap()
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(titles, ["first", "second", "third"]);
}

#[test]
fn search_empty_query_equals_list() {
    let store = TaskStore::open_in_memory().unwrap();
    store.create("alpha", "").unwrap();
    store.create("beta", "").unwrap();

    assert_eq!(store.search("").unwrap(), store.list().unwrap());
}

#[test]
fn search_matches_title_and_description_case_insensitively() {
    let store = TaskStore::open_in_memory().unwrap();
    let by_title = store.create("Buy MILK", "").unwrap();
    let by_description = store.create("errands", "milk and eggs").unwrap();
    store.create("unrelated", "walk the dog").unwrap();

    let hits = store.search("milk").unwrap();
    let ids: HashSet<_> = hits.iter().map(|task| task.id).collect();
    assert_eq!(ids, HashSet::from([by_title.id, by_description.id]));

    // Same subset regardless of query casing; order stays the listing order.
    assert_eq!(store.search("MiLk").unwrap(), hits);
    assert!(store.search("bread").unwrap().is_empty());
}

#[test]
fn update_edits_fields_but_never_identity_or_creation_time() {
    let store = TaskStore::open_in_memory().unwrap();
    let task = store.create("draft", "").unwrap();

    let mut edited = task.clone();
    edited.title = "final".to_string();
    edited.description = "done deal".to_string();
    edited.is_completed = true;
    store.update(edited).unwrap();

    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, task.id);
    assert_eq!(listed[0].created_at_ms, task.created_at_ms);
    assert_eq!(listed[0].title, "final");
    assert!(listed[0].is_completed);
}

#[test]
fn update_and_delete_on_missing_id_fail_and_leave_store_unchanged() {
    let store = TaskStore::open_in_memory().unwrap();
    store.create("keeper", "").unwrap();
    let before = store.list().unwrap();

    let ghost = Task::new("ghost", "");
    let update_err = store.update(ghost.clone()).unwrap_err();
    assert!(matches!(update_err, StoreError::NotFound(id) if id == ghost.id));

    let delete_err = store.delete(&ghost).unwrap_err();
    assert!(matches!(delete_err, StoreError::NotFound(id) if id == ghost.id));

    assert_eq!(store.list().unwrap(), before);
}

#[test]
fn delete_removes_the_task() {
    let store = TaskStore::open_in_memory().unwrap();
    let task = store.create("temp", "").unwrap();
    let keeper = store.create("keeper", "").unwrap();

    store.delete(&task).unwrap();

    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, keeper.id);
}

#[test]
fn bulk_import_failure_leaves_store_unchanged() {
    let store = TaskStore::open_in_memory().unwrap();
    store.create("pre-existing", "").unwrap();

    let shared_id = Uuid::new_v4();
    let batch = vec![
        Task::with_id(Uuid::new_v4(), "ok", "", 1),
        Task::with_id(shared_id, "dup a", "", 2),
        Task::with_id(shared_id, "dup b", "", 3),
    ];

    let err = store.bulk_import(batch).unwrap_err();
    assert!(matches!(err, StoreError::PersistFailed(_)));

    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "pre-existing");
}

#[test]
fn bulk_import_is_never_partially_visible_to_readers() {
    let store = Arc::new(TaskStore::open_in_memory().unwrap());
    store.create("pre-existing", "").unwrap();

    let batch: Vec<Task> = (0..5_000)
        .map(|step| Task::with_id(Uuid::new_v4(), format!("seed-{step}"), "", step))
        .collect();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut seen = HashSet::new();
            while !done.load(Ordering::Acquire) {
                seen.insert(store.list().unwrap().len());
            }
            seen.insert(store.list().unwrap().len());
            seen
        })
    };

    store.bulk_import(batch).unwrap();
    done.store(true, Ordering::Release);

    let seen = reader.join().unwrap();
    // Readers may observe the store before or after the import, never a
    // partially merged batch.
    for count in seen {
        assert!(
            count == 1 || count == 5_001,
            "reader observed a partially imported batch of {count} tasks"
        );
    }
}

#[test]
fn concurrent_creates_yield_distinct_ids() {
    let store = Arc::new(TaskStore::open_in_memory().unwrap());

    let mut handles = Vec::new();
    for worker in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for step in 0..5 {
                store
                    .create(format!("task-{worker}-{step}"), "")
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 40);
    let ids: HashSet<_> = listed.iter().map(|task| task.id).collect();
    assert_eq!(ids.len(), 40);
}

#[test]
fn tasks_and_seed_flag_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("taskpad.sqlite3");

    let created = {
        let store = TaskStore::open(&db_path).unwrap();
        let created = store.create("durable", "still here").unwrap();
        store.mark_seeded().unwrap();
        created
    };

    let reopened = TaskStore::open(&db_path).unwrap();
    assert_eq!(reopened.list().unwrap(), vec![created]);
    assert!(reopened.seed_completed());
}

#[test]
fn subscribers_receive_events_after_each_committed_write() {
    let store = TaskStore::open_in_memory().unwrap();
    let events = store.subscribe();

    let task = store.create("watched", "").unwrap();
    let mut edited = task.clone();
    edited.is_completed = true;
    store.update(edited.clone()).unwrap();
    store.delete(&task).unwrap();

    let timeout = Duration::from_secs(1);
    assert_eq!(
        events.recv_timeout(timeout).unwrap(),
        StoreEvent::Created(task.clone())
    );
    assert_eq!(
        events.recv_timeout(timeout).unwrap(),
        StoreEvent::Updated(edited)
    );
    assert_eq!(
        events.recv_timeout(timeout).unwrap(),
        StoreEvent::Deleted(task.id)
    );
}
