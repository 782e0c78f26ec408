// algebraic properties of flow values.

use crate::front_end::{Set, StmtId};
use crate::middle_end::analysis::*;

fn defs(ids: &[u32]) -> Set<StmtId> {
    ids.iter().map(|i| StmtId(*i)).collect()
}

#[test]
fn union_merges_common_keys() {
    let mut a = FlowValue::new();
    a.insert("x", defs(&[1]));
    a.insert("y", defs(&[2]));
    let mut b = FlowValue::new();
    b.insert("x", defs(&[3]));
    b.insert("z", defs(&[4]));

    let u = merge(&a, &b);
    assert_eq!(u.get("x"), Some(&defs(&[1, 3])));
    assert_eq!(u.get("y"), Some(&defs(&[2])));
    assert_eq!(u.get("z"), Some(&defs(&[4])));
    assert_eq!(u.len(), 3);
    // operands are untouched.
    assert_eq!(a.get("x"), Some(&defs(&[1])));
}

#[test]
fn copy_into_overwrites_destination() {
    let mut src = FlowValue::new();
    src.insert("a", defs(&[0]));
    let mut dest = FlowValue::new();
    dest.insert("b", defs(&[1]));

    src.copy_into(&mut dest);
    assert_eq!(dest, src);
    assert!(!dest.contains_key("b"));
}

#[test]
fn copies_are_independent() {
    arbtest::builder().run(|u| {
        let v: FlowValue = u.arbitrary()?;
        let original = v.clone();
        let mut copy = v.clone();
        let key: String = u.arbitrary()?;
        let id: StmtId = u.arbitrary()?;
        copy.insert(key, defs(&[id.0]));
        if let Some(k) = v.keys().next() {
            copy.remove_keys(&Set::from([k.clone()]));
        }
        assert_eq!(v, original);
        Ok(())
    });
}

#[test]
fn empty_is_union_identity() {
    arbtest::builder().run(|u| {
        let v: FlowValue = u.arbitrary()?;
        assert_eq!(v.union(&FlowValue::new(), set_union), v);
        assert_eq!(FlowValue::new().union(&v, set_union), v);
        Ok(())
    });
}

#[test]
fn removed_keys_are_gone() {
    arbtest::builder().run(|u| {
        let mut v: FlowValue = u.arbitrary()?;
        let keys: Set<String> = u.arbitrary()?;
        let before = v.clone();
        v.remove_keys(&keys);
        assert!(keys.iter().all(|k| !v.contains_key(k)));
        assert!(v
            .iter()
            .all(|(k, s)| !keys.contains(k) && before.get(k) == Some(s)));
        Ok(())
    });
}

#[test]
fn in_place_union_agrees_with_union() {
    arbtest::builder().run(|u| {
        let a: FlowValue = u.arbitrary()?;
        let b: FlowValue = u.arbitrary()?;
        let mut c = a.clone();
        c.union_with(&b, set_union);
        assert_eq!(c, merge(&a, &b));
        Ok(())
    });
}
