use patricia_store::{Family, PrefixMap, PrefixMapOptions};

mod common {
    use std::io::Write;

    pub fn init() {
        let _ = env_logger::builder()
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .is_test(true)
            .try_init();
    }
}

#[test]
fn basic_lpm_picks_longest_match() {
    common::init();
    let mut map = PrefixMap::new();
    map.insert("10.0.0.0/8", "a").unwrap();
    map.insert("10.1.0.0/16", "b").unwrap();
    map.insert("10.1.1.0/24", "c").unwrap();

    assert_eq!(map.get("10.1.1.5/32").unwrap(), Some(&"c"));
    assert_eq!(map.get("10.1.2.5/32").unwrap(), Some(&"b"));
    assert_eq!(map.get("10.2.0.0/16").unwrap(), Some(&"a"));
    assert_eq!(map.get("11.0.0.0/8").unwrap(), None);
}

#[test]
fn glue_node_is_created_and_removed() {
    common::init();
    let mut map = PrefixMap::new();
    // These two diverge early enough that a glue node is needed above
    // both, and neither is an ancestor of the other.
    map.insert("10.0.0.0/16", "a").unwrap();
    map.insert("10.128.0.0/16", "b").unwrap();
    assert_eq!(map.len(), 2);

    // The glue node above them carries no value of its own.
    assert!(!map.has_key("10.0.0.0/8").unwrap());

    map.delete("10.0.0.0/16").unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("10.128.5.5/32").unwrap(), Some(&"b"));
    assert!(map.get("10.0.5.5/32").unwrap().is_none());
}

#[test]
fn insert_overwrites_exact_match_value() {
    common::init();
    let mut map = PrefixMap::new();
    let prev = map.insert("192.168.0.0/24", 1).unwrap();
    assert_eq!(prev, None);
    let prev = map.insert("192.168.0.0/24", 2).unwrap();
    assert_eq!(prev, Some(1));
    assert_eq!(map.get("192.168.0.1/32").unwrap(), Some(&2));
    assert_eq!(map.len(), 1);
}

#[test]
fn v6_and_mixed_maxbits() {
    common::init();
    let mut map = PrefixMap::with_options(PrefixMapOptions {
        maxbits: 64,
        family: Family::V6,
        raw_output: false,
    });
    map.insert("2001:db8::/32", "net").unwrap();
    assert_eq!(map.get("2001:db8:1234::/48").unwrap(), Some(&"net"));

    // Beyond the configured maxbits is rejected.
    assert!(map.insert("2001:db8::/96", "too-long").is_err());
}

#[test]
fn parent_and_children_queries() {
    common::init();
    let mut map = PrefixMap::new();
    map.insert("10.0.0.0/8", "root").unwrap();
    map.insert("10.1.0.0/16", "mid").unwrap();
    map.insert("10.1.1.0/24", "leaf").unwrap();
    map.insert("10.2.0.0/16", "sibling").unwrap();

    let parent = map.parent("10.1.1.0/24").unwrap().unwrap();
    assert_eq!(parent.to_string(), "10.1.0.0/16");

    let mut children: Vec<String> = map
        .children("10.0.0.0/8")
        .unwrap()
        .into_iter()
        .map(|k| k.to_string())
        .collect();
    children.sort();
    assert_eq!(children, vec!["10.1.0.0/16", "10.1.1.0/24", "10.2.0.0/16"]);
}

#[test]
fn freeze_thaw_round_trips_random_v4_prefixes() {
    use rand::Rng;

    common::init();
    let mut map = PrefixMap::new();
    let mut rng = rand::rng();
    let mut inserted = Vec::new();
    for _ in 0..1000 {
        let octets: [u8; 4] = rng.random();
        let len: u8 = rng.random_range(8..=32);
        let prefix = patricia_store::Prefix::new(Family::V4, &octets, len)
            .expect("len is within V4 bounds");
        let key: inetnum::addr::Prefix = prefix.into();
        let text = key.to_string();
        map.insert(text.as_str(), text.clone()).unwrap();
        inserted.push(text);
    }

    map.freeze();
    assert!(map.is_frozen());
    assert!(map.insert("1.2.3.4/32", "rejected".to_string()).is_err());

    for key in &inserted {
        assert_eq!(map.get(key.as_str()).unwrap(), Some(key));
    }

    map.thaw();
    assert!(!map.is_frozen());
    map.insert("1.2.3.4/32", "accepted".to_string()).unwrap();
    assert_eq!(
        map.get("1.2.3.4/32").unwrap(),
        Some(&"accepted".to_string())
    );
}

#[test]
fn snapshot_serializes_a_frozen_map() {
    common::init();
    let mut map = PrefixMap::new();
    map.insert("172.16.0.0/12", "a".to_string()).unwrap();
    map.insert("172.16.1.0/24", "b".to_string()).unwrap();
    map.freeze();

    let snapshot = map.to_snapshot().unwrap();
    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: patricia_store::Snapshot<String> =
        serde_json::from_str(&json).unwrap();
    let mut restored_map: PrefixMap<String> =
        PrefixMap::from_snapshot(restored).unwrap();

    assert!(restored_map.is_frozen());
    assert_eq!(
        restored_map.get("172.16.1.5/32").unwrap(),
        Some(&"b".to_string())
    );
    restored_map.thaw();
    assert_eq!(restored_map.len(), 2);
}

#[test]
fn bad_key_is_reported_not_silently_dropped() {
    common::init();
    let map: PrefixMap<&str> = PrefixMap::new();
    assert!(map.get("not-a-prefix").is_err());
    assert!(!map.contains("not-a-prefix"));
}

#[test]
fn delete_of_missing_key_is_not_found() {
    common::init();
    let mut map: PrefixMap<&str> = PrefixMap::new();
    assert_eq!(
        map.delete("10.0.0.0/8"),
        Err(patricia_store::PrefixMapError::NotFound)
    );
}

#[derive(Default)]
struct CountingLifecycle {
    acquires: std::cell::RefCell<u32>,
    releases: std::cell::RefCell<u32>,
}

impl patricia_store::ValueLifecycle<i32> for CountingLifecycle {
    fn acquire(&mut self, _value: &i32) {
        *self.acquires.borrow_mut() += 1;
    }

    fn release(&mut self, _value: &i32) {
        *self.releases.borrow_mut() += 1;
    }
}

#[test]
fn value_lifecycle_hooks_stay_balanced() {
    common::init();
    let mut map = PrefixMap::with_options_and_lifecycle(
        PrefixMapOptions::default(),
        CountingLifecycle::default(),
    );

    map.insert("10.0.0.0/8", 1).unwrap();
    map.insert("10.1.0.0/16", 2).unwrap();
    // Overwrite: one acquire for the new value, one release for the old.
    map.insert("10.1.0.0/16", 3).unwrap();
    map.delete("10.0.0.0/8").unwrap();

    assert_eq!(*map.lifecycle().acquires.borrow(), 3);
    assert_eq!(*map.lifecycle().releases.borrow(), 2);
}

#[derive(Default, Clone)]
struct SharedCounts {
    acquires: std::rc::Rc<std::cell::RefCell<u32>>,
    releases: std::rc::Rc<std::cell::RefCell<u32>>,
}

impl patricia_store::ValueLifecycle<i32> for SharedCounts {
    fn acquire(&mut self, _value: &i32) {
        *self.acquires.borrow_mut() += 1;
    }

    fn release(&mut self, _value: &i32) {
        *self.releases.borrow_mut() += 1;
    }
}

#[test]
fn drop_releases_values_still_stored() {
    common::init();
    let counts = SharedCounts::default();
    {
        let mut map = PrefixMap::with_options_and_lifecycle(
            PrefixMapOptions::default(),
            counts.clone(),
        );
        map.insert("10.0.0.0/8", 1).unwrap();
        map.insert("10.1.0.0/16", 2).unwrap();
        // One of the two is removed explicitly; the other is still live
        // when `map` goes out of scope at the end of this block.
        map.delete("10.0.0.0/8").unwrap();

        assert_eq!(*counts.acquires.borrow(), 2);
        assert_eq!(*counts.releases.borrow(), 1);
    }

    // Dropping the map with one entry still stored must release it too.
    assert_eq!(*counts.acquires.borrow(), 2);
    assert_eq!(*counts.releases.borrow(), 2);
}

#[test]
fn insert_with_len_widens_without_zeroing_address_bits() {
    common::init();
    let mut map = PrefixMap::new();
    // Parsed alone, "10.1.2.3/8" would mask down to 10.0.0.0/8; the
    // override to /24 must keep the real address bits instead of
    // re-deriving them from that already-masked prefix.
    map.insert_with_len("10.1.2.3/8", 24, "widened").unwrap();

    assert!(map.has_key("10.1.2.0/24").unwrap());
    assert!(!map.has_key("10.0.0.0/8").unwrap());
    assert_eq!(map.get("10.1.2.3/32").unwrap(), Some(&"widened"));
    assert_eq!(map.get("10.1.2.255/32").unwrap(), Some(&"widened"));
    assert_eq!(map.get("10.1.3.0/32").unwrap(), None);
}
