use super::*;

#[test]
fn shard_and_local_unpack() {
    let name = Name::new(5, 1000);
    assert_eq!(name.shard(), 5);
    assert_eq!(name.local(), 1000);

    let last = Name::new(15, Name::MAX_LOCAL);
    assert_eq!(last.shard(), 15);
    assert_eq!(last.local(), Name::MAX_LOCAL as usize);
}

#[test]
fn only_the_first_slot_of_shard_zero_is_empty() {
    assert!(Name::EMPTY.is_empty());
    assert_eq!(Name::default(), Name::EMPTY);
    assert!(!Name::new(0, 1).is_empty());
    assert!(!Name::new(1, 0).is_empty());
}

#[test]
fn debug_shows_the_slot() {
    assert_eq!(format!("{:?}", Name::EMPTY), "Name(<empty>)");
    assert_eq!(format!("{:?}", Name::new(3, 7)), "Name(3:7)");
}
