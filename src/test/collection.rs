use crate::{Tag, TagType};

#[test]
fn first_insert_freezes_the_element_type() {
    let list = Tag::list("l");
    assert!(list.list_type().is_none());

    list.push_value(1i32).unwrap();
    assert_eq!(list.list_type(), Some(TagType::Int));

    let err = list.push_value(2i64).unwrap_err();
    assert!(err.is_usage());
    assert_eq!(list.len(), 1);
}

#[test]
fn declared_element_type_binds_before_any_insert() {
    let list = Tag::list_of("l", TagType::String);
    assert_eq!(list.list_type(), Some(TagType::String));

    assert!(list.push_value(1i32).unwrap_err().is_usage());
    list.push_value("ok").unwrap();
}

#[test]
fn the_element_type_survives_clear() {
    let list = Tag::list("l");
    list.push_value(1i32).unwrap();
    list.clear().unwrap();

    assert_eq!(list.list_type(), Some(TagType::Int));
    assert!(list.push_value("nope").unwrap_err().is_usage());
}

#[test]
fn named_tags_are_rejected() {
    let list = Tag::list("l");
    let err = list.push(Tag::int("named", 1)).unwrap_err();
    assert!(err.is_usage());
    assert!(list.is_empty());
}

#[test]
fn a_list_member_cannot_take_a_name() {
    let list = Tag::list("l");
    let member = list.push_value(1i32).unwrap();
    assert!(member.set_name("x").unwrap_err().is_usage());
    assert_eq!(member.name(), "");
}

#[test]
fn push_all_preserves_order_and_checks_each_item() {
    let list = Tag::list("l");
    list.push_all([1i32, 2, 3]).unwrap();

    let values: Vec<i32> = list.children().iter().filter_map(|t| t.as_int()).collect();
    assert_eq!(values, [1, 2, 3]);
}

#[test]
fn push_sets_the_parent() {
    let list = Tag::list("l");
    let member = list.push_value(1i32).unwrap();
    assert!(member.parent().unwrap().ptr_eq(&list));
}

#[test]
fn set_at_reparents_and_detaches() {
    let list = Tag::list("l");
    let old = list.push_value(1i32).unwrap();
    let replacement = Tag::unnamed(9i32);

    list.set_at(0, replacement.clone()).unwrap();

    assert!(old.parent().is_none());
    assert!(replacement.parent().unwrap().ptr_eq(&list));
    assert_eq!(list.get_at(0).unwrap().as_int(), Some(9));
}

#[test]
fn set_at_enforces_the_element_type_and_bounds() {
    let list = Tag::list("l");
    list.push_value(1i32).unwrap();

    assert!(list.set_at(0, Tag::unnamed("wrong")).unwrap_err().is_usage());
    assert!(list.set_at(5, Tag::unnamed(2i32)).unwrap_err().is_usage());
}

#[test]
fn remove_at_severs_the_parent() {
    let list = Tag::list("l");
    let member = list.push_value(1i32).unwrap();

    let removed = list.remove_at(0).unwrap();
    assert!(removed.ptr_eq(&member));
    assert!(member.parent().is_none());
    assert!(list.is_empty());
}

#[test]
fn remove_tag_works_on_both_container_kinds() {
    let list = Tag::list("l");
    let member = list.push_value(1i32).unwrap();
    assert!(list.remove_tag(&member));
    assert!(!list.remove_tag(&member));

    let compound = Tag::compound("c");
    let child = compound.insert("a", 1i32).unwrap();
    assert!(compound.remove_tag(&child));
    assert!(child.parent().is_none());
    assert!(compound.get("a").is_none());
}

#[test]
fn container_ops_on_the_wrong_kind_are_usage_errors() {
    let compound = Tag::compound("c");
    assert!(compound.push(Tag::unnamed(1i32)).unwrap_err().is_usage());

    let list = Tag::list("l");
    assert!(list.add(Tag::int("a", 1)).unwrap_err().is_usage());
    assert!(list.insert("a", 1i32).unwrap_err().is_usage());
}

#[test]
fn duplicate_compound_names_are_rejected() {
    let compound = Tag::compound("c");
    compound.insert("a", 1i32).unwrap();

    let err = compound.insert("a", 2i32).unwrap_err();
    assert!(err.is_usage());
    assert_eq!(compound.len(), 1);
    assert_eq!(compound.get("a").unwrap().as_int(), Some(1));
}

#[test]
fn compound_children_may_be_heterogeneous_and_keep_order() {
    let compound = Tag::compound("c");
    compound.insert("one", 1u8).unwrap();
    compound.insert("two", "text").unwrap();
    compound.insert("three", crate::TagDictionary::new()).unwrap();

    let names: Vec<String> = compound.children().iter().map(|t| t.name()).collect();
    assert_eq!(names, ["one", "two", "three"]);
    assert!(compound.contains("two"));
    assert!(!compound.contains("missing"));
    assert!(compound.get("missing").is_none());
}

#[test]
fn compound_lookup_stays_consistent_after_removal() {
    let compound = Tag::compound("c");
    compound.insert("a", 1i32).unwrap();
    compound.insert("b", 2i32).unwrap();
    compound.insert("c", 3i32).unwrap();

    compound.remove("b").unwrap();

    assert_eq!(compound.get("a").unwrap().as_int(), Some(1));
    assert_eq!(compound.get("c").unwrap().as_int(), Some(3));
    assert_eq!(compound.get_at(1).unwrap().name(), "c");
}

#[test]
fn adding_a_prenamed_tag_keys_by_its_current_name() {
    let compound = Tag::compound("c");
    compound.add(Tag::int("abc", 7)).unwrap();
    assert_eq!(compound.get("abc").unwrap().as_int(), Some(7));
}
