//! Collection operator tests

mod common;

use common::*;
use content_query_sdk::{
    Aggregate, CoercedValue, EvalValue, MemoryRepository, NodeId, QueryError, QuerySession, ValueKind,
};

mod query_tests {
    use super::*;

    #[test]
    fn test_filter_and_group_by_scenario() {
        let session = session();
        let articles = session.node_by_id(NEWS).children();

        let a = articles.filter("category == @0", &[EvalValue::from("a")]).unwrap();
        assert_eq!(a.ids(), vec![NodeId(LAUNCH), NodeId(TEASER), NodeId(ARCHIVE)]);
        assert_eq!(a.get(1).unwrap().index().unwrap(), 1);

        let groups = articles.group_by("category", &[]).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.keys(), vec![CoercedValue::from("a"), CoercedValue::from("b")]);
        assert_eq!(groups.find("b").unwrap().elements.ids(), vec![NodeId(UPDATE), NodeId(RECAP)]);
        let total: usize = groups.iter().map(|g| g.count()).sum();
        assert_eq!(total, articles.len());
    }

    #[test]
    fn test_order_by_is_non_decreasing() {
        let session = session();
        let nodes = session.node_by_id(HOME).descendants();
        let sorted = nodes
            .order_by("Level, Name", &[])
            .unwrap()
            .into_collection()
            .unwrap();
        assert_eq!(sorted.len(), nodes.len());
        let keys: Vec<(i32, String)> = sorted
            .iter()
            .map(|n| (n.level(), n.name().to_string()))
            .collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(sorted.get(0).unwrap().id(), NodeId(ABOUT));
    }

    #[test]
    fn test_order_by_mixed_kind_property() {
        let mut yaml = String::from("documents:\n  - id: 1\n    name: Root\n    type: list\n    children:\n");
        let values = ["-1", "true", "false", "-7", "-3", ""];
        for i in 0..200 {
            let properties = match values[i % values.len()] {
                "" => String::new(),
                v => format!(", properties: {{ v: \"{}\" }}", v),
            };
            yaml.push_str(&format!("      - {{ id: {}, name: N{}, type: item{} }}\n", i + 2, i, properties));
        }
        let repo = MemoryRepository::from_yaml_str(&yaml).unwrap();
        let session = QuerySession::from_memory(repo).build();
        let items = session.node_by_id(1).children();
        let sorted = items.order_by("v", &[]).unwrap().into_collection().unwrap();
        assert_eq!(sorted.len(), 200);

        let keys: Vec<CoercedValue> = sorted.iter().map(|n| n.get("v")).collect();
        assert!(keys.windows(2).all(|w| w[0].compare_total(&w[1]).is_le()));
        assert!(keys[0].is_absent());
        assert_eq!(keys[keys.len() - 1], CoercedValue::Int(-1));
    }

    #[test]
    fn test_order_by_then_by_descending() {
        let session = session();
        let articles = session.node_by_id(NEWS).children();
        let sorted = articles
            .order_by("category", &[])
            .unwrap()
            .then_by_descending("CreateDate", &[])
            .unwrap()
            .into_collection()
            .unwrap();
        assert_eq!(
            sorted.ids(),
            vec![
                NodeId(ARCHIVE),
                NodeId(TEASER),
                NodeId(LAUNCH),
                NodeId(RECAP),
                NodeId(UPDATE),
            ]
        );
    }

    #[test]
    fn test_element_operators() {
        let session = session();
        let articles = session.node_by_id(NEWS).children();
        assert_eq!(articles.first("", &[]).unwrap().id(), NodeId(LAUNCH));
        assert_eq!(articles.last("category == \"b\"", &[]).unwrap().id(), NodeId(RECAP));
        assert_eq!(articles.single("Name == \"Teaser\"", &[]).unwrap().id(), NodeId(TEASER));
        assert!(articles.single("category == \"a\"", &[]).is_err());
        assert!(articles.first_or_default("Level > 5", &[]).unwrap().is_none());
        assert!(articles.first("Level > 5", &[]).is_err());
        assert_eq!(articles.count_where("category == \"b\"", &[]).unwrap(), 2);
        assert!(articles.any_where("Name.EndsWith(\"cap\")", &[]).unwrap());
    }

    #[test]
    fn test_take_skip_and_sets() {
        let session = session();
        let articles = session.node_by_id(NEWS).children();
        let head = articles.take(2);
        let tail = articles.skip(3);
        assert_eq!(head.ids(), vec![NodeId(LAUNCH), NodeId(UPDATE)]);
        assert_eq!(tail.ids(), vec![NodeId(RECAP), NodeId(ARCHIVE)]);
        assert_eq!(head.union(&tail).len(), 4);
        assert_eq!(articles.except(&head).len(), 3);
        assert_eq!(articles.intersect(&tail).ids(), tail.ids());
        assert!(articles.skip(10).is_empty());
    }

    #[test]
    fn test_search_within_subtree() {
        let session = session();
        let hits = session.search("launch").unwrap();
        assert_eq!(hits.get(0).unwrap().id(), NodeId(LAUNCH));
        assert!(matches!(hits.get(0).unwrap().get("searchScore"), CoercedValue::Decimal(_) | CoercedValue::Int(_)));

        let news = session.node_by_id(NEWS);
        let children = news.search_children("update", false).unwrap();
        assert_eq!(children.ids(), vec![NodeId(UPDATE)]);
        assert!(session.node_by_id(ABOUT).search("launch", false).unwrap().is_empty());
    }
}

mod aggregate_tests {
    use super::*;

    #[test]
    fn test_sum_drops_minority_kinds() {
        let session = session();
        let articles = session.node_by_id(NEWS).children();
        let projection = articles.select("priority", &[]).unwrap();
        assert_eq!(projection.kind(), Some(ValueKind::Int));
        assert_eq!(articles.sum("priority", &[]).unwrap(), CoercedValue::Int(12));
        assert_eq!(articles.max("priority", &[]).unwrap(), CoercedValue::Int(5));
        assert_eq!(articles.min("priority", &[]).unwrap(), CoercedValue::Int(3));
        assert_eq!(articles.average("priority", &[]).unwrap(), CoercedValue::Decimal(4.0));
    }

    #[test]
    fn test_aggregate_errors() {
        let session = session();
        let articles = session.node_by_id(NEWS).children();
        assert!(matches!(
            articles.aggregate(Aggregate::Sum, "Name", &[]),
            Err(QueryError::AggregateTypeMismatch { .. })
        ));
        let empty = articles.filter("Level > 5", &[]).unwrap();
        assert_eq!(empty.sum("priority", &[]).unwrap(), CoercedValue::Int(0));
        assert!(matches!(
            empty.max("priority", &[]),
            Err(QueryError::EmptySequence { .. })
        ));
    }

    #[test]
    fn test_dates_aggregate() {
        let session = session();
        let articles = session.node_by_id(NEWS).children();
        let newest = articles.max("CreateDate", &[]).unwrap();
        assert_eq!(newest, CoercedValue::DateTime(session.node_by_id(ARCHIVE).create_date()));
    }

    #[test]
    fn test_positional_groups() {
        let session = session();
        let articles = session.node_by_id(NEWS).children();
        let pairs = articles.in_groups_of(2).unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs.get(2).unwrap().elements.ids(), vec![NodeId(ARCHIVE)]);
        let thirds = articles.grouped_into(3).unwrap();
        assert_eq!(thirds.iter().map(|g| g.count()).collect::<Vec<_>>(), vec![2, 2, 1]);
    }
}
