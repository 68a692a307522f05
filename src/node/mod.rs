//! Tree nodes
//!
//! A [`TreeNode`] is the queryable unit templates work with. It wraps one
//! [`BackingItem`], memoizes coerced property values and its children, and
//! keeps a weak link to the collection it currently belongs to so that
//! positional questions (index, first, last, next) can be answered.

mod position;
mod traversal;

pub use position::{PositionTest, choose};

use chrono::NaiveDateTime;
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use uuid::Uuid;

use crate::backing::BackingItem;
use crate::collection::{NodeCollection, OwnerList};
use crate::error::{QueryError, QueryResult};
use crate::expression::{EvalValue, NodeMember, Predicate};
use crate::models::{CoercedValue, ContentKind, ItemRecord, NodeId, PropertyValue};
use crate::resolver::{PropertyResolver, Resolution};
use crate::session::QuerySession;

/// Prefix of `get_property_value` aliases that probe record members only
const MEMBER_PREFIX: char = '@';

struct NodeInner {
    item: BackingItem,
    session: QuerySession,
    values: RefCell<HashMap<String, CoercedValue>>,
    children: OnceCell<NodeCollection>,
    owner: RefCell<Weak<OwnerList>>,
    siblings: OnceCell<Option<NodeCollection>>,
}

/// Cheap-clone handle over one content node
#[derive(Clone)]
pub struct TreeNode {
    inner: Rc<NodeInner>,
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Nodes are equal when they stand for the same record of the same store
impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id() && self.kind() == other.kind()
    }
}

impl TreeNode {
    pub(crate) fn new(item: BackingItem, session: QuerySession) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                item,
                session,
                values: RefCell::new(HashMap::new()),
                children: OnceCell::new(),
                owner: RefCell::new(Weak::new()),
                siblings: OnceCell::new(),
            }),
        }
    }

    pub fn item(&self) -> &BackingItem {
        &self.inner.item
    }

    pub fn session(&self) -> &QuerySession {
        &self.inner.session
    }

    /// Same handle, not merely the same record
    pub(crate) fn same_instance(&self, other: &TreeNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn record(&self) -> Option<&ItemRecord> {
        self.inner.item.record()
    }

    pub fn is_null(&self) -> bool {
        self.inner.item.is_null()
    }

    pub fn is_root(&self) -> bool {
        self.inner.item.is_root()
    }

    pub fn kind(&self) -> Option<ContentKind> {
        self.inner.item.kind()
    }

    pub fn id(&self) -> NodeId {
        self.inner.item.id()
    }

    pub fn name(&self) -> &str {
        self.inner.item.name()
    }

    pub fn node_type_alias(&self) -> &str {
        self.inner.item.node_type_alias()
    }

    pub fn level(&self) -> i32 {
        self.inner.item.level()
    }

    pub fn path(&self) -> &str {
        self.inner.item.path()
    }

    pub fn sort_order(&self) -> i32 {
        self.inner.item.sort_order()
    }

    pub fn create_date(&self) -> NaiveDateTime {
        self.inner.item.create_date()
    }

    pub fn update_date(&self) -> NaiveDateTime {
        self.inner.item.update_date()
    }

    pub fn creator_name(&self) -> &str {
        self.record().map(|r| r.creator_name.as_str()).unwrap_or_default()
    }

    pub fn writer_name(&self) -> &str {
        self.record().map(|r| r.writer_name.as_str()).unwrap_or_default()
    }

    pub fn creator_id(&self) -> i32 {
        self.record().map(|r| r.creator_id).unwrap_or_default()
    }

    pub fn writer_id(&self) -> i32 {
        self.record().map(|r| r.writer_id).unwrap_or_default()
    }

    pub fn url_name(&self) -> &str {
        self.record().map(|r| r.url_name.as_str()).unwrap_or_default()
    }

    pub fn url(&self) -> Option<&str> {
        self.record().and_then(|r| r.url.as_deref())
    }

    pub fn template(&self) -> i32 {
        self.record().map(|r| r.template).unwrap_or_default()
    }

    pub fn version(&self) -> Uuid {
        self.inner.item.version()
    }

    /// Parent node, looked up on every call
    pub fn parent(&self) -> Option<TreeNode> {
        self.inner.item.parent().map(|p| self.session().wrap(p))
    }

    /// Id of the parent; the synthetic root and null nodes have none
    pub fn parent_id(&self) -> QueryResult<NodeId> {
        let parent_id = self.inner.item.parent_id();
        if parent_id.is_none() || self.is_null() {
            return Err(QueryError::NoParent(self.id()));
        }
        Ok(parent_id)
    }

    /// Children in sort order, materialized once per node
    pub fn children(&self) -> NodeCollection {
        self.inner
            .children
            .get_or_init(|| {
                let session = self.session();
                let children = self
                    .inner
                    .item
                    .children()
                    .into_iter()
                    .map(|child| session.wrap(child));
                NodeCollection::with_session(session.clone(), children)
            })
            .clone()
    }

    /// Children whose type alias is `name` or its plural, ignoring case
    pub fn children_of_type(&self, name: &str) -> NodeCollection {
        let matching = self.children().iter().filter(|child| {
            let alias = child.node_type_alias();
            alias.eq_ignore_ascii_case(name) || plural_name(alias).eq_ignore_ascii_case(name)
        });
        NodeCollection::with_session(self.session().clone(), matching)
    }

    /// Raw property through the full resolution chain (`_alias` walks up)
    pub fn get_property(&self, alias: &str) -> Option<PropertyValue> {
        PropertyResolver::new()
            .resolve(&self.inner.item, alias)
            .into_option()
    }

    fn property_with(&self, alias: &str, recursive: bool) -> Resolution {
        let resolver = PropertyResolver::new();
        if recursive {
            resolver.recursive(&self.inner.item, alias)
        } else {
            resolver.resolve(&self.inner.item, alias)
        }
    }

    /// Coerced property value, memoized per alias
    pub fn get(&self, alias: &str) -> CoercedValue {
        if let Some(value) = self.inner.values.borrow().get(alias) {
            return value.clone();
        }
        let value = match self.get_property(alias) {
            Some(property) => self.session().coerce(&property),
            None => CoercedValue::Absent,
        };
        self.inner
            .values
            .borrow_mut()
            .insert(alias.to_string(), value.clone());
        value
    }

    /// Dynamic member lookup after the built-in members: property, then
    /// children of a matching type, then absent
    pub fn property_member(&self, name: &str) -> EvalValue {
        let value = self.get(name);
        if !value.is_absent() {
            return EvalValue::Scalar(value);
        }
        let typed = self.children_of_type(name);
        if !typed.is_empty() {
            return EvalValue::Nodes(typed);
        }
        EvalValue::ABSENT
    }

    pub fn member_value(&self, member: NodeMember) -> EvalValue {
        use NodeMember as M;

        match member {
            M::Id => EvalValue::from(self.id().get()),
            M::Name => EvalValue::from(self.name()),
            M::NodeTypeAlias => EvalValue::from(self.node_type_alias()),
            M::Level => EvalValue::from(self.level()),
            M::Path => EvalValue::from(self.path()),
            M::SortOrder => EvalValue::from(self.sort_order()),
            M::CreateDate => EvalValue::from(self.create_date()),
            M::UpdateDate => EvalValue::from(self.update_date()),
            M::CreatorName => EvalValue::from(self.creator_name()),
            M::WriterName => EvalValue::from(self.writer_name()),
            M::CreatorId => EvalValue::from(self.creator_id()),
            M::WriterId => EvalValue::from(self.writer_id()),
            M::UrlName => EvalValue::from(self.url_name()),
            M::Url => self.url().map(EvalValue::from).unwrap_or(EvalValue::ABSENT),
            M::Template => EvalValue::from(self.template()),
            M::Version => EvalValue::from(self.version().to_string()),
            M::Parent => self.parent().into(),
            M::ParentId => match self.parent_id() {
                Ok(id) => EvalValue::from(id.get()),
                Err(_) => EvalValue::ABSENT,
            },
            M::Children => self.children().into(),
            M::Visible => EvalValue::from(self.visible()),
        }
    }

    /// Whether a content property of this alias exists (Pascal or camel form)
    pub fn has_property(&self, alias: &str) -> bool {
        let resolver = PropertyResolver::new();
        resolver
            .exact(&self.inner.item, alias)
            .or_else(|| resolver.case_swapped(&self.inner.item, alias))
            .is_found()
    }

    /// Whether the property resolves to non-blank text
    pub fn has_value(&self, alias: &str, recursive: bool) -> bool {
        self.property_with(alias, recursive)
            .value()
            .is_some_and(PropertyValue::has_value)
    }

    pub fn has_value_or(&self, alias: &str, recursive: bool, if_true: &str, if_false: &str) -> String {
        choose(self.has_value(alias, recursive), if_true, if_false)
    }

    /// Whether the property is missing or carries no raw value at all
    pub fn is_null_property(&self, alias: &str, recursive: bool) -> bool {
        self.property_with(alias, recursive)
            .value()
            .is_none_or(PropertyValue::is_null)
    }

    /// Property text, or `fallback` when it is missing or blank
    ///
    /// An alias starting with `@` skips content properties and reads the
    /// record member of that name (`"@createDate"`).
    pub fn get_property_value(&self, alias: &str, recursive: bool, fallback: Option<&str>) -> Option<String> {
        let property = match alias.strip_prefix(MEMBER_PREFIX) {
            Some(member) => self.inner.item.member_property(member),
            None => self.property_with(alias, recursive).into_option(),
        };
        match property.filter(PropertyValue::has_value) {
            Some(property) => Some(property.value().to_string()),
            None => fallback.map(str::to_string),
        }
    }

    /// False only when the navigation-hide property reads `"1"`
    pub fn visible(&self) -> bool {
        let alias = &self.session().config().navi_hide_alias;
        self.get_property(alias)
            .is_none_or(|hide| hide.value().trim() != "1")
    }

    /// Media item whose id is stored in property `alias`
    pub fn media(&self, alias: &str) -> Option<TreeNode> {
        let property = self.get_property(alias)?;
        let id = NodeId::parse(property.value().trim())?;
        let media = self.session().media_by_id(id);
        (!media.is_null()).then_some(media)
    }

    /// Property `media_alias` of the media item referenced by `alias`
    pub fn media_property(&self, alias: &str, media_alias: &str) -> CoercedValue {
        self.media(alias)
            .map(|media| media.get(media_alias))
            .unwrap_or(CoercedValue::Absent)
    }

    /// Test this node alone against a predicate
    pub fn matches(&self, predicate: &Predicate) -> QueryResult<bool> {
        predicate.test(self)
    }

    pub fn matches_where(&self, text: &str, params: &[EvalValue]) -> QueryResult<bool> {
        self.session().compile_predicate(text, params)?.test(self)
    }

    /// Search this node's subtree
    pub fn search(&self, term: &str, use_wildcards: bool) -> QueryResult<NodeCollection> {
        self.session().search_within(term, self.path(), use_wildcards)
    }

    /// Search hits that are direct children of this node
    pub fn search_children(&self, term: &str, use_wildcards: bool) -> QueryResult<NodeCollection> {
        let hits = self.search(term, use_wildcards)?;
        let id = self.id();
        Ok(hits.filter_by(|hit| hit.item().parent_id() == id))
    }

    pub(crate) fn set_owner(&self, list: &Rc<OwnerList>) {
        *self.inner.owner.borrow_mut() = Rc::downgrade(list);
    }

    /// Drop the owner link if it still points at `list`
    pub(crate) fn clear_owner_if(&self, list: &Rc<OwnerList>) {
        let mut owner = self.inner.owner.borrow_mut();
        if std::ptr::eq(owner.as_ptr(), Rc::as_ptr(list)) {
            *owner = Weak::new();
        }
    }

    /// Collection this node was last added to, while it is alive
    pub fn owner(&self) -> Option<NodeCollection> {
        self.inner
            .owner
            .borrow()
            .upgrade()
            .map(NodeCollection::from_list)
    }
}

/// Plural of a type alias as used by child-type member lookup
pub fn plural_name(alias: &str) -> String {
    let lower = alias.to_ascii_lowercase();
    if ["x", "ch", "s", "sh"].iter().any(|end| lower.ends_with(end)) {
        return format!("{}es", alias);
    }
    let mut chars = lower.chars().rev();
    if let (Some('y'), Some(before)) = (chars.next(), chars.next()) {
        if !"aeiou".contains(before) {
            return format!("{}ies", &alias[..alias.len() - 1]);
        }
    }
    format!("{}s", alias)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRepository;

    fn session() -> QuerySession {
        let repo = MemoryRepository::from_yaml_str(
            r#"
documents:
  - id: 1
    name: Home
    type: home
    properties:
      siteTitle: Example
      heroImage: "100"
      umbracoNaviHide: "0"
    children:
      - id: 2
        name: News
        type: newsArea
        properties:
          umbracoNaviHide: "1"
          summary: "  "
        children:
          - id: 3
            name: First story
            type: newsItem
          - id: 4
            name: Second story
            type: newsItem
          - id: 5
            name: Gallery
            type: gallery
media:
  - id: 100
    name: Hero
    type: Image
    properties:
      umbracoWidth: "1200"
"#,
        )
        .unwrap();
        QuerySession::from_memory(repo).build()
    }

    #[test]
    fn test_plural_name() {
        assert_eq!(plural_name("newsItem"), "newsItems");
        assert_eq!(plural_name("box"), "boxes");
        assert_eq!(plural_name("church"), "churches");
        assert_eq!(plural_name("category"), "categories");
        assert_eq!(plural_name("day"), "days");
    }

    #[test]
    fn test_get_is_memoized_and_case_swapped() {
        let home = session().node_by_id(1);
        assert_eq!(home.get("SiteTitle"), home.get("siteTitle"));
        assert_eq!(home.get("siteTitle"), CoercedValue::from("Example"));
        assert!(home.get("missing").is_absent());
        assert_eq!(home.inner.values.borrow().len(), 3);
    }

    #[test]
    fn test_children_are_memoized() {
        let news = session().node_by_id(2);
        let first = news.children();
        let second = news.children();
        assert!(first.get(0).unwrap().same_instance(&second.get(0).unwrap()));
        assert_eq!(first.ids(), vec![NodeId(3), NodeId(4), NodeId(5)]);
    }

    #[test]
    fn test_child_type_member() {
        let news = session().node_by_id(2);
        match news.property_member("newsItems") {
            EvalValue::Nodes(items) => assert_eq!(items.ids(), vec![NodeId(3), NodeId(4)]),
            other => panic!("expected nodes, got {:?}", other),
        }
        assert!(news.property_member("unknownThings").is_absent());
    }

    #[test]
    fn test_visible() {
        let session = session();
        assert!(session.node_by_id(1).visible());
        assert!(!session.node_by_id(2).visible());
        assert!(session.node_by_id(3).visible());
    }

    #[test]
    fn test_parent_id() {
        let session = session();
        assert_eq!(session.node_by_id(2).parent_id().unwrap(), NodeId(1));
        assert_eq!(session.node_by_id(1).parent_id().unwrap(), NodeId::ROOT);
        assert!(matches!(session.root().parent_id(), Err(QueryError::NoParent(_))));
    }

    #[test]
    fn test_property_value_helpers() {
        let session = session();
        let news = session.node_by_id(2);
        assert!(news.has_property("summary"));
        assert!(!news.has_value("summary", false));
        assert_eq!(news.has_value_or("summary", false, "yes", "no"), "no");
        assert!(news.is_null_property("missing", false));
        assert_eq!(
            news.get_property_value("summary", false, Some("n/a")).as_deref(),
            Some("n/a")
        );
        assert_eq!(news.get_property_value("@name", false, None).as_deref(), Some("News"));

        let story = session.node_by_id(3);
        assert!(story.has_value("siteTitle", true));
        assert_eq!(
            story.get_property_value("siteTitle", true, None).as_deref(),
            Some("Example")
        );
    }

    #[test]
    fn test_media_lookup() {
        let home = session().node_by_id(1);
        let media = home.media("heroImage").unwrap();
        assert_eq!(media.name(), "Hero");
        assert_eq!(home.media_property("heroImage", "umbracoWidth"), CoercedValue::Int(1200));
        assert!(home.media("siteTitle").is_none());
    }
}
