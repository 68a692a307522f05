//! Tree traversal tests

mod common;

use common::*;
use content_query_sdk::{CoercedValue, EvalValue, NodeId, PositionTest};

mod navigation_tests {
    use super::*;

    #[test]
    fn test_up_and_down() {
        let session = session();
        let launch = session.node_by_id(LAUNCH);
        assert_eq!(launch.up(0).unwrap().id(), NodeId(NEWS));
        assert_eq!(launch.up(1).unwrap().id(), NodeId(HOME));
        assert_eq!(launch.up_to("homePage").unwrap().id(), NodeId(HOME));
        assert!(launch.up_to("folder").is_none());

        let home = session.node_by_id(HOME);
        assert_eq!(home.down(0).unwrap().id(), NodeId(NEWS));
        assert_eq!(home.down(1).unwrap().id(), NodeId(LAUNCH));
        assert_eq!(home.down_to("article").unwrap().id(), NodeId(LAUNCH));
        assert!(session.node_by_id(ARCHIVE).down(0).is_none());
    }

    #[test]
    fn test_siblings_of_a_loaded_node() {
        let session = session();
        let update = session.node_by_id(UPDATE);
        assert_eq!(update.next(0).unwrap().unwrap().id(), NodeId(TEASER));
        assert_eq!(update.next(1).unwrap().unwrap().id(), NodeId(RECAP));
        assert_eq!(update.previous(0).unwrap().unwrap().id(), NodeId(LAUNCH));
        assert!(update.previous(1).unwrap().is_none());
        assert_eq!(update.sibling(-1).unwrap().unwrap().id(), NodeId(LAUNCH));
        assert_eq!(update.sibling(3).unwrap().unwrap().id(), NodeId(ARCHIVE));
        assert!(update.sibling(4).unwrap().is_none());
    }

    #[test]
    fn test_sibling_type_lookups() {
        let session = session();
        let news = session.node_by_id(NEWS);
        assert_eq!(news.next_of("page").unwrap().unwrap().id(), NodeId(ABOUT));
        let contact = session.node_by_id(CONTACT);
        assert_eq!(contact.previous_of("page").unwrap().unwrap().id(), NodeId(ABOUT));
        assert_eq!(contact.sibling_of("page").unwrap().unwrap().id(), NodeId(ABOUT));
        assert!(contact.sibling_of("article").unwrap().is_none());
    }

    #[test]
    fn test_positions_inside_children() {
        let session = session();
        let articles = session.node_by_id(NEWS).children();
        let count = articles.len();
        assert_eq!(count, 5);
        for (i, node) in articles.iter().enumerate() {
            assert_eq!(node.index().unwrap(), i);
            assert_eq!(node.is_first().unwrap(), i == 0);
            assert_eq!(node.is_last().unwrap(), i == count - 1);
            assert_eq!(node.is_even().unwrap(), i % 2 == 0);
        }
        let third = articles.get(2).unwrap();
        assert!(third.is_position(2).unwrap());
        assert!(third.is(PositionTest::Odd).is_ok_and(|odd| !odd));
        assert_eq!(third.is_or(PositionTest::Last, "last", "").unwrap(), "");
    }
}

mod hierarchy_tests {
    use super::*;

    #[test]
    fn test_ancestors_of_top_level_node() {
        let session = session();
        let home = session.node_by_id(HOME);
        assert_eq!(home.ancestors_or_self().ids(), vec![NodeId(HOME)]);
        assert!(home.ancestors().is_empty());
        assert_eq!(home.ancestor_or_self().unwrap().id(), NodeId(HOME));
    }

    #[test]
    fn test_ancestors_run_from_the_top() {
        let session = session();
        let launch = session.node_by_id(LAUNCH);
        assert_eq!(
            launch.ancestors_or_self().ids(),
            vec![NodeId(HOME), NodeId(NEWS), NodeId(LAUNCH)]
        );
        assert_eq!(launch.ancestors().ids(), vec![NodeId(HOME), NodeId(NEWS)]);
        assert_eq!(launch.ancestors_at_level(1).ids(), vec![NodeId(HOME)]);
        assert_eq!(launch.ancestors_of_type("newsList").ids(), vec![NodeId(NEWS)]);
        assert_eq!(launch.ancestor_or_self_at_level(2).unwrap().id(), NodeId(NEWS));
        assert_eq!(launch.ancestor_or_self_of_type("article").unwrap().id(), NodeId(LAUNCH));
    }

    #[test]
    fn test_descendants_pre_order() {
        let session = session();
        let home = session.node_by_id(HOME);
        assert_eq!(
            home.descendants().ids(),
            vec![
                NodeId(NEWS),
                NodeId(LAUNCH),
                NodeId(UPDATE),
                NodeId(TEASER),
                NodeId(RECAP),
                NodeId(ARCHIVE),
                NodeId(ABOUT),
                NodeId(CONTACT),
            ]
        );
        assert_eq!(home.descendants_of_type("article").len(), 5);
        assert_eq!(home.descendants_or_self().get(0).unwrap().id(), NodeId(HOME));
        assert_eq!(home.descendants_at_level(3).len(), 5);
        assert!(session.node_by_id(RECAP).descendants().is_empty());
    }

    #[test]
    fn test_where_forms_compile_once() {
        let session = session();
        let home = session.node_by_id(HOME);
        let pages = home
            .descendants_where("NodeTypeAlias == @0", &[EvalValue::from("page")])
            .unwrap();
        assert_eq!(pages.ids(), vec![NodeId(ABOUT), NodeId(CONTACT)]);

        let launch = session.node_by_id(LAUNCH);
        let found = launch.ancestor_or_self_where("Level == 2", &[]).unwrap();
        assert_eq!(found.unwrap().id(), NodeId(NEWS));
        assert!(launch.ancestors_where("Name +", &[]).is_err());
    }

    #[test]
    fn test_relations() {
        let session = session();
        let home = session.node_by_id(HOME);
        let launch = session.node_by_id(LAUNCH);
        assert!(launch.is_descendant(&home));
        assert!(home.is_ancestor(&launch));
        assert!(!home.is_descendant(&launch));
        assert!(launch.is_descendant_or_self(&launch));
        assert_eq!(launch.is_equal_or(&session.node_by_id(LAUNCH), "same", "other"), "same");
        assert!(!launch.is_descendant(&session.node_by_id(ABOUT)));
    }
}

mod property_tests {
    use super::*;

    #[test]
    fn test_pascal_and_camel_aliases_resolve() {
        let session = session();
        let home = session.node_by_id(HOME);
        assert_eq!(home.get("SiteTitle"), home.get("siteTitle"));
        assert_eq!(home.get("siteTitle"), CoercedValue::from("Example Site"));
        assert!(home.has_property("BodyText"));
        assert!(!home.has_property("missing"));
    }

    #[test]
    fn test_get_is_idempotent() {
        let session = session();
        let launch = session.node_by_id(LAUNCH);
        let first = launch.get("priority");
        assert_eq!(first, CoercedValue::Int(3));
        assert_eq!(launch.get("priority"), first);
    }

    #[test]
    fn test_recursive_lookup() {
        let session = session();
        let launch = session.node_by_id(LAUNCH);
        assert_eq!(launch.get("_footerText"), CoercedValue::from("Shared footer"));
        assert!(launch.get("footerText").is_absent());
        assert!(launch.has_value("footerText", true));

        let archive = session.node_by_id(ARCHIVE);
        assert_eq!(
            archive.get_property_value("footerText", false, Some("fallback")),
            Some("fallback".to_string())
        );
    }

    #[test]
    fn test_date_editor_on_content_type() {
        let session = session();
        let launch = session.node_by_id(LAUNCH);
        assert!(matches!(launch.get("publishDate"), CoercedValue::DateTime(_)));
    }

    #[test]
    fn test_visibility() {
        let session = session();
        assert!(!session.node_by_id(ABOUT).visible());
        assert!(session.node_by_id(CONTACT).visible());
        assert!(session.node_by_id(HOME).visible());
        assert_eq!(session.node_by_id(ABOUT).get("umbracoNaviHide"), CoercedValue::Bool(true));
    }

    #[test]
    fn test_media_reference() {
        let session = session();
        let about = session.node_by_id(ABOUT);
        let logo = about.media("heroImage").unwrap();
        assert_eq!(logo.id(), NodeId(LOGO));
        assert_eq!(about.media_property("heroImage", "umbracoWidth"), CoercedValue::Int(640));
        assert!(about.media("bodyText").is_none());
    }

    #[test]
    fn test_xml_property() {
        let session = session();
        let contact = session.node_by_id(CONTACT);
        match contact.get("links") {
            CoercedValue::Xml(xml) => {
                assert_eq!(xml.root.name, "links");
                assert_eq!(xml.root.children.len(), 2);
            }
            other => panic!("expected xml, got {:?}", other),
        }
    }
}
