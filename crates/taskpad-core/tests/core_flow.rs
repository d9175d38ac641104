use std::sync::Arc;

use taskpad_core::store::TaskStore;
use taskpad_core::task::Task;

fn task(title: &str, due: i64) -> Task {
    Task::new(title.to_string(), String::new(), due)
}

#[test]
fn add_appends_in_order_and_publishes_each_snapshot() {
    let store = TaskStore::new();
    let sub = store.snapshot();

    let first = task("first", 1);
    let second = task("second", 2);
    store.add(first.clone());
    store.add(second.clone());

    let seen: Vec<usize> = sub.drain().iter().map(|s| s.len()).collect();
    assert_eq!(seen, vec![0, 1, 2]);
    let current = store.current();
    assert_eq!(current.as_slice(), &[first, second]);
}

#[test]
fn late_subscribers_start_from_the_latest_list() {
    let store = TaskStore::new();
    store.add(task("a", 1));
    store.add(task("b", 2));

    let late = store.snapshot();
    let first = late.try_next().expect("replayed snapshot");
    assert_eq!(first.len(), 2);
    assert!(late.try_next().is_none());
}

#[test]
fn update_replaces_in_place_and_ignores_unknown_ids() {
    let a = task("a", 1);
    let b = task("b", 2);
    let c = task("c", 3);
    let store = TaskStore::with_tasks(vec![a.clone(), b.clone(), c.clone()]);
    let sub = store.snapshot();
    let _ = sub.drain();

    let renamed = Task {
        title: "b2".to_string(),
        ..b.clone()
    };
    assert!(store.update(renamed.clone()));
    assert_eq!(store.current().as_slice(), &[a.clone(), renamed.clone(), c.clone()]);

    let before = store.current();
    assert!(!store.update(task("stranger", 9)));
    assert!(Arc::ptr_eq(&before, &store.current()));
    assert_eq!(sub.drain().len(), 1);
}

#[test]
fn delete_removes_exactly_the_match() {
    let a = task("a", 1);
    let b = task("b", 2);
    let store = TaskStore::with_tasks(vec![a.clone(), b.clone()]);

    assert!(!store.delete("missing"));
    assert_eq!(store.len(), 2);

    assert!(store.delete(&a.id));
    assert_eq!(store.current().as_slice(), &[b]);
    assert!(store.get_by_id(&a.id).is_none());
}

#[test]
fn get_by_id_sees_current_values_only() {
    let store = TaskStore::new();
    assert!(store.get_by_id("never-added").is_none());

    let original = task("Buy milk", 5);
    store.add(original.clone());
    assert_eq!(store.get_by_id(&original.id), Some(original.clone()));

    store.update(original.toggled());
    let fetched = store.get_by_id(&original.id).expect("still present");
    assert!(fetched.is_completed);
}

#[test]
fn add_toggle_delete_scenario() {
    let store = TaskStore::new();
    let milk = task("Buy milk", 1_760_000_000_000);
    store.add(milk.clone());
    assert_eq!(store.current().as_slice(), &[milk.clone()]);

    store.update(Task {
        is_completed: !milk.is_completed,
        ..milk.clone()
    });
    let current = store.current();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].id, milk.id);
    assert!(current[0].is_completed);

    store.delete(&milk.id);
    assert!(store.is_empty());
}

#[test]
fn store_handle_is_shareable_across_threads() {
    let store = Arc::new(TaskStore::new());
    let sub = store.snapshot();

    let writer = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            for i in 0..10 {
                store.add(task(&format!("t{i}"), i));
            }
        })
    };
    writer.join().expect("writer thread");

    let lengths: Vec<usize> = sub.drain().iter().map(|s| s.len()).collect();
    assert_eq!(lengths, (0..=10).collect::<Vec<usize>>());
}
