use proptest::prelude::*;
use rustle_zabbix::version::{compare, ApiCapabilities, ZabbixVersion};
use std::cmp::Ordering;

fn version() -> impl Strategy<Value = ZabbixVersion> {
    prop::collection::vec(0u32..20, 1..5).prop_map(ZabbixVersion::new)
}

proptest! {
    #[test]
    fn comparison_is_antisymmetric(a in version(), b in version()) {
        prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
    }

    #[test]
    fn trailing_zeros_do_not_matter(a in version(), zeros in 0usize..3) {
        let mut padded = a.components().to_vec();
        padded.extend(std::iter::repeat(0).take(zeros));
        prop_assert_eq!(compare(&a, &ZabbixVersion::new(padded)), Ordering::Equal);
    }

    #[test]
    fn display_round_trips(a in version()) {
        let parsed = ZabbixVersion::parse(&a.to_string()).unwrap();
        prop_assert_eq!(parsed.components(), a.components());
    }
}

#[test]
fn test_capability_thresholds() {
    let caps = |v: &str| ApiCapabilities::for_version(&ZabbixVersion::parse(v).unwrap());

    assert_eq!(caps("6.0.21").host_groups_select, "selectGroups");
    assert_eq!(caps("6.2").host_groups_select, "selectHostGroups");
    assert_eq!(caps("6.4").proxy_name_field, "host");
    assert_eq!(caps("7.0").proxy_name_field, "name");
    assert!(!caps("7.0.5").bearer_auth_header);
    assert!(caps("7.2").bearer_auth_header);
}
