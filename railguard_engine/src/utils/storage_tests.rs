use super::*;

// ============================================================================
// Id issuing tests
// ============================================================================

#[test]
fn test_first_id_is_not_null() {
    let mut storage = Storage::new();
    let id = storage.push(10);
    assert_ne!(id, NULL_ID);
    assert_eq!(id, 1);
}

#[test]
fn test_ids_strictly_increase_and_are_never_reused() {
    let mut storage = Storage::new();
    let mut issued = Vec::new();

    for round in 0..5 {
        let a = storage.push(round);
        let b = storage.push(round + 100);
        issued.push(a);
        issued.push(b);
        storage.remove(a);
        if round % 2 == 0 {
            storage.remove(b);
        }
    }
    storage.clear();
    issued.push(storage.push(-1));

    for pair in issued.windows(2) {
        assert!(pair[0] < pair[1], "{} should be < {}", pair[0], pair[1]);
    }
}

// ============================================================================
// Lookup tests
// ============================================================================

#[test]
fn test_get_null_id_is_a_miss() {
    let mut storage = Storage::new();
    storage.push("value");
    assert!(storage.get(NULL_ID).is_none());
    assert!(storage.get_mut(NULL_ID).is_none());
    assert!(!storage.contains(NULL_ID));
}

#[test]
fn test_get_removed_id_is_a_miss() {
    let mut storage = Storage::new();
    let id = storage.push("value");
    assert_eq!(storage.get(id), Some(&"value"));

    assert_eq!(storage.remove(id), Some("value"));
    assert!(storage.get(id).is_none());
}

#[test]
fn test_get_mut_modifies_in_place() {
    let mut storage = Storage::new();
    let id = storage.push(vec![1, 2]);
    storage.get_mut(id).unwrap().push(3);
    assert_eq!(storage.get(id).unwrap().len(), 3);
}

// ============================================================================
// Removal tests
// ============================================================================

#[test]
fn test_remove_is_idempotent() {
    let mut storage = Storage::new();
    let id = storage.push(5);
    assert_eq!(storage.remove(id), Some(5));
    assert_eq!(storage.remove(id), None);
    assert_eq!(storage.remove(999), None);
    assert!(storage.is_empty());
}

#[test]
fn test_clear_keeps_ids_retired() {
    let mut storage = Storage::new();
    let a = storage.push(1);
    storage.push(2);
    storage.clear();
    assert_eq!(storage.len(), 0);

    let c = storage.push(3);
    assert!(c > a + 1);
    assert!(storage.get(a).is_none());
}

// ============================================================================
// Iteration tests
// ============================================================================

#[test]
fn test_iteration_follows_insertion_order_of_survivors() {
    let mut storage = Storage::new();
    let a = storage.push('a');
    let b = storage.push('b');
    let c = storage.push('c');
    storage.remove(b);
    let d = storage.push('d');

    let ids: Vec<Id> = storage.ids().collect();
    assert_eq!(ids, vec![a, c, d]);

    let values: String = storage.values().collect();
    assert_eq!(values, "acd");
}

#[test]
fn test_iter_mut_and_drain() {
    let mut storage = Storage::new();
    storage.push(1);
    storage.push(2);
    for (_, value) in storage.iter_mut() {
        *value *= 10;
    }

    let drained = storage.drain();
    assert_eq!(drained.iter().map(|(_, v)| *v).collect::<Vec<_>>(), vec![10, 20]);
    assert!(storage.is_empty());
}
