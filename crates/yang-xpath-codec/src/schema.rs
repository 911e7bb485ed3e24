//! The schema-node collaborator the decoders walk in lockstep with the
//! serialized input (spec §4.10). The schema *loader* is out of scope
//! (spec §1's Non-goals); callers supply their own `SchemaNode`
//! implementation over whatever schema representation they already
//! load, and the codec only ever reads it.

use yang_xpath_engine::QName;

/// A leaf or leaf-list's declared type, to the extent the codec's
/// decode rules need to know about it (spec §4.10: identityref prefix
/// stripping, `empty` leaves, wide integers encoded as strings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafType {
    /// The YANG `empty` type: no value, or a single empty string.
    Empty,
    /// An `identityref`, with the module name new `prefix:ident` values
    /// are resolved against.
    Identityref {
        /// The module owning the identity this leaf is typed to.
        module: String,
    },
    /// An integer type with the given declared bit width. RFC 7951
    /// widens anything over 32 bits to a quoted string.
    Integer {
        /// Declared bit width (8, 16, 32, or 64).
        bits: u8,
    },
    /// Any other leaf type; decoded and encoded as a plain string.
    Other,
}

impl LeafType {
    /// Whether RFC 7951 must encode this type's values as JSON strings
    /// rather than bare numbers.
    pub fn is_wide_integer(&self) -> bool {
        matches!(self, LeafType::Integer { bits } if *bits > 32)
    }
}

/// What shape a schema node takes (spec §4.10's container/list/leaf
/// breakdown).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKind {
    /// A container; `presence` is `true` for a `presence` container,
    /// `false` for a non-presence one (spec's `is_non_presence_container`).
    Container {
        /// Whether this container carries a `presence` statement.
        presence: bool,
    },
    /// A list; entries are coalesced from repeated elements in XML and
    /// from a JSON array in both JSON dialects.
    List,
    /// A single-valued leaf.
    Leaf(LeafType),
    /// A leaf-list; decodes to an ordered sequence of values.
    LeafList(LeafType),
}

/// The schema tree the decoders walk alongside the serialized input,
/// and the encoders walk alongside the decoded `DataNode` tree (spec
/// §4.10, §6's Codec API `schema_root` parameter).
pub trait SchemaNode: Clone {
    /// This node's qualified name. The namespace field carries the
    /// owning module's name, which doubles as the RFC 7951
    /// module-qualification prefix (spec's "module context changes down
    /// the tree").
    fn name(&self) -> QName;

    /// This node's shape.
    fn kind(&self) -> SchemaKind;

    /// The schema children of a container or list-entry node (empty for
    /// leaves and leaf-lists).
    fn children(&self) -> Vec<Self>;

    /// Looks up a schema child by local name, ignoring module
    /// qualification (spec's lockstep walk matches by name; module
    /// qualification is a serialization detail, not an identity one).
    fn child(&self, local_name: &str) -> Option<Self> {
        self.children().into_iter().find(|c| c.name().local() == local_name)
    }

    /// The key leaves' local names, in declaration order, for a list's
    /// entry schema; empty for anything else.
    fn key_names(&self) -> Vec<String>;

    /// Whether this node belongs to the configuration tree (as opposed
    /// to operational state).
    fn is_config(&self) -> bool;
}
