//! Built-in members and methods known to the binder

use super::types::ExprType;

/// Attributes of a node that bind directly instead of going through property lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMember {
    Id,
    Name,
    NodeTypeAlias,
    Level,
    Path,
    SortOrder,
    CreateDate,
    UpdateDate,
    CreatorName,
    WriterName,
    CreatorId,
    WriterId,
    UrlName,
    Url,
    Template,
    Version,
    Parent,
    ParentId,
    Children,
    Visible,
}

impl NodeMember {
    /// Case-insensitive lookup of a member name
    pub fn from_name(name: &str) -> Option<Self> {
        let member = match name.to_ascii_lowercase().as_str() {
            "id" => NodeMember::Id,
            "name" => NodeMember::Name,
            "nodetypealias" => NodeMember::NodeTypeAlias,
            "level" => NodeMember::Level,
            "path" => NodeMember::Path,
            "sortorder" => NodeMember::SortOrder,
            "createdate" => NodeMember::CreateDate,
            "updatedate" => NodeMember::UpdateDate,
            "creatorname" => NodeMember::CreatorName,
            "writername" => NodeMember::WriterName,
            "creatorid" => NodeMember::CreatorId,
            "writerid" => NodeMember::WriterId,
            "urlname" => NodeMember::UrlName,
            "url" | "niceurl" => NodeMember::Url,
            "template" => NodeMember::Template,
            "version" => NodeMember::Version,
            "parent" => NodeMember::Parent,
            "parentid" => NodeMember::ParentId,
            "children" => NodeMember::Children,
            "visible" => NodeMember::Visible,
            _ => return None,
        };
        Some(member)
    }

    pub fn result_type(&self) -> ExprType {
        match self {
            NodeMember::Id
            | NodeMember::Level
            | NodeMember::SortOrder
            | NodeMember::CreatorId
            | NodeMember::WriterId
            | NodeMember::Template
            | NodeMember::ParentId => ExprType::Int,
            NodeMember::Name
            | NodeMember::NodeTypeAlias
            | NodeMember::Path
            | NodeMember::CreatorName
            | NodeMember::WriterName
            | NodeMember::UrlName
            | NodeMember::Url
            | NodeMember::Version => ExprType::String,
            NodeMember::CreateDate | NodeMember::UpdateDate => ExprType::DateTime,
            NodeMember::Parent => ExprType::Node,
            NodeMember::Children => ExprType::Nodes,
            NodeMember::Visible => ExprType::Bool,
        }
    }
}

/// Methods callable on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMethod {
    IsFirst,
    IsNotFirst,
    IsLast,
    IsNotLast,
    IsEven,
    IsNotEven,
    IsOdd,
    IsNotOdd,
    IsPosition,
    IsNotPosition,
    IsModZero,
    IsNotModZero,
    Index,
    HasValue,
    HasProperty,
    GetPropertyValue,
    Up,
    Down,
    Next,
    Previous,
    Sibling,
    AncestorOrSelf,
    AncestorsOrSelf,
    Ancestors,
    Descendants,
    DescendantsOrSelf,
    IsEqual,
    IsNotEqual,
    IsDescendant,
    IsDescendantOrSelf,
    IsAncestor,
    IsAncestorOrSelf,
}

impl NodeMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        let method = match name.to_ascii_lowercase().as_str() {
            "isfirst" => NodeMethod::IsFirst,
            "isnotfirst" => NodeMethod::IsNotFirst,
            "islast" => NodeMethod::IsLast,
            "isnotlast" => NodeMethod::IsNotLast,
            "iseven" => NodeMethod::IsEven,
            "isnoteven" => NodeMethod::IsNotEven,
            "isodd" => NodeMethod::IsOdd,
            "isnotodd" => NodeMethod::IsNotOdd,
            "isposition" => NodeMethod::IsPosition,
            "isnotposition" => NodeMethod::IsNotPosition,
            "ismodzero" => NodeMethod::IsModZero,
            "isnotmodzero" => NodeMethod::IsNotModZero,
            "index" => NodeMethod::Index,
            "hasvalue" => NodeMethod::HasValue,
            "hasproperty" => NodeMethod::HasProperty,
            "getpropertyvalue" => NodeMethod::GetPropertyValue,
            "up" => NodeMethod::Up,
            "down" => NodeMethod::Down,
            "next" => NodeMethod::Next,
            "previous" => NodeMethod::Previous,
            "sibling" => NodeMethod::Sibling,
            "ancestororself" => NodeMethod::AncestorOrSelf,
            "ancestorsorself" => NodeMethod::AncestorsOrSelf,
            "ancestors" => NodeMethod::Ancestors,
            "descendants" => NodeMethod::Descendants,
            "descendantsorself" => NodeMethod::DescendantsOrSelf,
            "isequal" => NodeMethod::IsEqual,
            "isnotequal" => NodeMethod::IsNotEqual,
            "isdescendant" => NodeMethod::IsDescendant,
            "isdescendantorself" => NodeMethod::IsDescendantOrSelf,
            "isancestor" => NodeMethod::IsAncestor,
            "isancestororself" => NodeMethod::IsAncestorOrSelf,
            _ => return None,
        };
        Some(method)
    }

    /// Methods that also take trailing `valueIfTrue[, valueIfFalse]` strings
    pub fn has_string_form(&self) -> bool {
        matches!(
            self,
            NodeMethod::IsFirst
                | NodeMethod::IsNotFirst
                | NodeMethod::IsLast
                | NodeMethod::IsNotLast
                | NodeMethod::IsEven
                | NodeMethod::IsNotEven
                | NodeMethod::IsOdd
                | NodeMethod::IsNotOdd
                | NodeMethod::IsPosition
                | NodeMethod::IsNotPosition
                | NodeMethod::IsModZero
                | NodeMethod::IsNotModZero
                | NodeMethod::HasValue
                | NodeMethod::IsEqual
                | NodeMethod::IsNotEqual
                | NodeMethod::IsDescendant
                | NodeMethod::IsDescendantOrSelf
                | NodeMethod::IsAncestor
                | NodeMethod::IsAncestorOrSelf
        )
    }

    /// Accepted argument count range, string forms included
    pub fn arity(&self) -> (usize, usize) {
        let (min, max) = self.base_arity();
        if self.has_string_form() {
            (min, max + 2)
        } else {
            (min, max)
        }
    }

    /// Number of leading arguments that are not `valueIfTrue`/`valueIfFalse`
    ///
    /// `HasValue(alias, recursive)` takes its flag only when the second
    /// argument is a boolean; `arg_is_bool` reports that per position.
    pub fn leading_args(&self, argc: usize, arg_is_bool: impl Fn(usize) -> bool) -> usize {
        match self {
            NodeMethod::HasValue if argc >= 2 && arg_is_bool(1) => 2,
            NodeMethod::HasValue => 1,
            _ => self.base_arity().1.min(argc),
        }
    }

    /// Result type for a call with the given argument types
    pub fn result_type_for(&self, args: &[ExprType]) -> ExprType {
        if !self.has_string_form() {
            return self.result_type();
        }
        if *self == NodeMethod::HasValue && args.len() >= 2 && args[1].is_open() {
            return ExprType::Dynamic;
        }
        let leading = self.leading_args(args.len(), |i| args[i] == ExprType::Bool);
        if args.len() > leading {
            ExprType::String
        } else {
            self.result_type()
        }
    }

    fn base_arity(&self) -> (usize, usize) {
        match self {
            NodeMethod::IsFirst
            | NodeMethod::IsNotFirst
            | NodeMethod::IsLast
            | NodeMethod::IsNotLast
            | NodeMethod::IsEven
            | NodeMethod::IsNotEven
            | NodeMethod::IsOdd
            | NodeMethod::IsNotOdd
            | NodeMethod::Index => (0, 0),
            NodeMethod::IsPosition
            | NodeMethod::IsNotPosition
            | NodeMethod::IsModZero
            | NodeMethod::IsNotModZero
            | NodeMethod::HasProperty
            | NodeMethod::Sibling
            | NodeMethod::IsEqual
            | NodeMethod::IsNotEqual
            | NodeMethod::IsDescendant
            | NodeMethod::IsDescendantOrSelf
            | NodeMethod::IsAncestor
            | NodeMethod::IsAncestorOrSelf => (1, 1),
            NodeMethod::HasValue | NodeMethod::GetPropertyValue => (1, 2),
            NodeMethod::Up
            | NodeMethod::Down
            | NodeMethod::Next
            | NodeMethod::Previous
            | NodeMethod::AncestorOrSelf
            | NodeMethod::AncestorsOrSelf
            | NodeMethod::Ancestors
            | NodeMethod::Descendants
            | NodeMethod::DescendantsOrSelf => (0, 1),
        }
    }

    pub fn result_type(&self) -> ExprType {
        match self {
            NodeMethod::Index => ExprType::Int,
            NodeMethod::GetPropertyValue => ExprType::String,
            NodeMethod::Up
            | NodeMethod::Down
            | NodeMethod::Next
            | NodeMethod::Previous
            | NodeMethod::Sibling
            | NodeMethod::AncestorOrSelf => ExprType::Node,
            NodeMethod::AncestorsOrSelf
            | NodeMethod::Ancestors
            | NodeMethod::Descendants
            | NodeMethod::DescendantsOrSelf => ExprType::Nodes,
            _ => ExprType::Bool,
        }
    }

    /// Methods whose single argument is another node
    pub fn takes_node(&self) -> bool {
        matches!(
            self,
            NodeMethod::IsEqual
                | NodeMethod::IsNotEqual
                | NodeMethod::IsDescendant
                | NodeMethod::IsDescendantOrSelf
                | NodeMethod::IsAncestor
                | NodeMethod::IsAncestorOrSelf
        )
    }
}

/// Methods callable on a node collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionMethod {
    Count,
    Any,
    First,
    Last,
}

impl CollectionMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(CollectionMethod::Count),
            "any" => Some(CollectionMethod::Any),
            "first" => Some(CollectionMethod::First),
            "last" => Some(CollectionMethod::Last),
            _ => None,
        }
    }

    pub fn result_type(&self) -> ExprType {
        match self {
            CollectionMethod::Count => ExprType::Int,
            CollectionMethod::Any => ExprType::Bool,
            CollectionMethod::First | CollectionMethod::Last => ExprType::Node,
        }
    }
}

/// Methods callable on text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMethod {
    Contains,
    StartsWith,
    EndsWith,
    ToLower,
    ToUpper,
    Trim,
    Length,
    IsEmpty,
    Substring,
    Replace,
}

impl StringMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        let method = match name.to_ascii_lowercase().as_str() {
            "contains" => StringMethod::Contains,
            "startswith" => StringMethod::StartsWith,
            "endswith" => StringMethod::EndsWith,
            "tolower" => StringMethod::ToLower,
            "toupper" => StringMethod::ToUpper,
            "trim" => StringMethod::Trim,
            "length" => StringMethod::Length,
            "isempty" => StringMethod::IsEmpty,
            "substring" => StringMethod::Substring,
            "replace" => StringMethod::Replace,
            _ => return None,
        };
        Some(method)
    }

    pub fn arity(&self) -> (usize, usize) {
        match self {
            StringMethod::Contains | StringMethod::StartsWith | StringMethod::EndsWith => (1, 1),
            StringMethod::Substring => (1, 2),
            StringMethod::Replace => (2, 2),
            _ => (0, 0),
        }
    }

    pub fn result_type(&self) -> ExprType {
        match self {
            StringMethod::Contains
            | StringMethod::StartsWith
            | StringMethod::EndsWith
            | StringMethod::IsEmpty => ExprType::Bool,
            StringMethod::Length => ExprType::Int,
            _ => ExprType::String,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!(NodeMember::from_name("nodeTypeAlias"), Some(NodeMember::NodeTypeAlias));
        assert_eq!(NodeMember::from_name("NICEURL"), Some(NodeMember::Url));
        assert_eq!(NodeMember::from_name("bodyText"), None);
        assert_eq!(NodeMethod::from_name("isfirst"), Some(NodeMethod::IsFirst));
        assert_eq!(StringMethod::from_name("StartsWith"), Some(StringMethod::StartsWith));
    }

    #[test]
    fn test_result_types() {
        assert_eq!(NodeMember::Parent.result_type(), ExprType::Node);
        assert_eq!(NodeMethod::Descendants.result_type(), ExprType::Nodes);
        assert_eq!(NodeMethod::IsModZero.arity(), (1, 3));
        assert_eq!(NodeMethod::Up.arity(), (0, 1));
        assert_eq!(
            NodeMethod::IsFirst.result_type_for(&[ExprType::String, ExprType::String]),
            ExprType::String
        );
        assert_eq!(NodeMethod::IsFirst.result_type_for(&[]), ExprType::Bool);
        assert_eq!(
            NodeMethod::HasValue.result_type_for(&[ExprType::String, ExprType::Bool]),
            ExprType::Bool
        );
        assert_eq!(
            NodeMethod::HasValue.result_type_for(&[ExprType::String, ExprType::String]),
            ExprType::String
        );
        assert_eq!(CollectionMethod::Count.result_type(), ExprType::Int);
    }
}
