//! Dependency tree structures
//!
//! A tree is an arena of token records keyed by a two-part node identifier,
//! with a child index derived while the tree is built. Token records carry
//! the ten standard CoNLL-U fields; documents with a declared column schema
//! (CoNLL-U plus) put their non-standard columns into `extras`.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::features::{Features, UNSPECIFIED};

/// Identifier of a node in a dependency tree.
///
/// `major` is the linear position, 0 only for the synthetic root. `minor`
/// is 0 for an ordinary token, the sub-index of an empty node, and for a
/// multiword span the negative width `start - end`. Positions may be
/// fractional when a document numbers inserted tokens with a decimal
/// separator of its own; only the ordering of identifiers is meaningful,
/// and the writer renumbers them contiguously on output.
#[derive(Debug, Clone, Copy)]
pub struct NodeId {
    pub major: f64,
    pub minor: f64,
}

impl NodeId {
    /// The synthetic root every annotated sentence descends from.
    pub const ROOT: NodeId = NodeId {
        major: 0.0,
        minor: 0.0,
    };

    pub fn new(major: f64, minor: f64) -> Self {
        Self { major, minor }
    }

    /// The identifier of the ordinary token at `position`.
    pub fn word(position: u32) -> Self {
        Self::new(position as f64, 0.0)
    }

    /// Parse an identifier as written in a token row: a plain position
    /// (possibly fractional, using `decsep`), a `major.sub` empty-node
    /// index, or a `start-end` multiword span.
    pub fn parse(text: &str, decsep: char) -> Option<Self> {
        if let Some((start, end)) = text.split_once('-') {
            let start = parse_position(start, decsep)?;
            let end = parse_position(end, decsep)?;
            Some(Self::new(start, start - end))
        } else if let Some((major, minor)) = text.split_once('.') {
            Some(Self::new(
                parse_position(major, decsep)?,
                parse_position(minor, decsep)?,
            ))
        } else {
            Some(Self::new(parse_position(text, decsep)?, 0.0))
        }
    }

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }

    /// A multiword-token span rather than a single token.
    pub fn is_range(&self) -> bool {
        self.minor < 0.0
    }

    /// An ordinary token: positive position, no sub-part.
    pub fn is_word(&self) -> bool {
        self.major > 0.0 && self.minor == 0.0
    }

    /// The position of the last sub-token covered by a span.
    pub fn range_end(&self) -> f64 {
        self.major - self.minor
    }
}

fn parse_position(text: &str, decsep: char) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    let value: f64 = text.replace(decsep, ".").parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

// Identifiers only ever come from parsing non-negative decimals, so there
// are no NaNs and no negative zeros: bit equality and total_cmp agree.
impl PartialEq for NodeId {
    fn eq(&self, other: &Self) -> bool {
        self.major.to_bits() == other.major.to_bits()
            && self.minor.to_bits() == other.minor.to_bits()
    }
}

impl Eq for NodeId {}

impl Hash for NodeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.major.to_bits());
        state.write_u64(self.minor.to_bits());
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .total_cmp(&other.major)
            .then(self.minor.total_cmp(&other.minor))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_range() {
            write!(f, "{}-{}", self.major, self.range_end())
        } else if self.minor != 0.0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}", self.major)
        }
    }
}

/// One column of a token row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Id,
    Form,
    Lemma,
    Upos,
    Xpos,
    Feats,
    Head,
    Deprel,
    Deps,
    Misc,
    /// A non-standard column declared by a plus document.
    Extra(String),
}

impl Column {
    fn from_name(name: &str) -> Self {
        match name {
            "id" => Column::Id,
            "form" => Column::Form,
            "lemma" => Column::Lemma,
            "upos" => Column::Upos,
            "xpos" => Column::Xpos,
            "feats" => Column::Feats,
            "head" => Column::Head,
            "deprel" => Column::Deprel,
            "deps" => Column::Deps,
            "misc" => Column::Misc,
            other => Column::Extra(other.to_string()),
        }
    }
}

/// The column layout of a document, resolved once and shared by its trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    extra_count: usize,
}

impl Default for Schema {
    /// The standard ten-column CoNLL-U layout.
    fn default() -> Self {
        Self {
            columns: vec![
                Column::Id,
                Column::Form,
                Column::Lemma,
                Column::Upos,
                Column::Xpos,
                Column::Feats,
                Column::Head,
                Column::Deprel,
                Column::Deps,
                Column::Misc,
            ],
            extra_count: 0,
        }
    }
}

impl Schema {
    /// Build a schema from a plus document's column declaration. Names are
    /// lowercased and `:` becomes `_`, so subtyped column names stay legal
    /// field names.
    pub fn from_declaration(declaration: &str) -> Self {
        let columns: Vec<Column> = declaration
            .split_whitespace()
            .map(|name| Column::from_name(&name.replace(':', "_").to_lowercase()))
            .collect();
        let extra_count = columns
            .iter()
            .filter(|c| matches!(c, Column::Extra(_)))
            .count();
        Self {
            columns,
            extra_count,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_id(&self) -> bool {
        self.columns.contains(&Column::Id)
    }

    pub fn extra_count(&self) -> usize {
        self.extra_count
    }
}

/// A token record: one row of annotation.
///
/// Standard fields missing from the document's schema keep their `_`
/// defaults. `head` is `None` for anything without a numeric head, such as
/// multiword spans.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub id: NodeId,
    pub form: String,
    pub lemma: String,
    pub upos: String,
    pub xpos: String,
    pub feats: Features,
    pub head: Option<NodeId>,
    pub deprel: String,
    pub deps: String,
    pub misc: Features,
    /// Values of the schema's extra columns, in schema order.
    pub extras: Vec<String>,
}

impl Token {
    /// An all-underspecified token at `id`. Extra columns default to `*`,
    /// the plus convention for "not annotated in this document".
    pub fn unspecified(id: NodeId, schema: &Schema) -> Self {
        Self {
            id,
            form: UNSPECIFIED.to_string(),
            lemma: UNSPECIFIED.to_string(),
            upos: UNSPECIFIED.to_string(),
            xpos: UNSPECIFIED.to_string(),
            feats: Features::new(),
            head: None,
            deprel: UNSPECIFIED.to_string(),
            deps: UNSPECIFIED.to_string(),
            misc: Features::new(),
            extras: vec!["*".to_string(); schema.extra_count()],
        }
    }

    /// The synthetic root record.
    pub fn root(schema: &Schema) -> Self {
        Self::unspecified(NodeId::ROOT, schema)
    }

    /// The relation label without its subtype: `advmod:emph` → `advmod`.
    pub fn base_deprel(&self) -> &str {
        match self.deprel.split_once(':') {
            Some((base, _)) => base,
            None => &self.deprel,
        }
    }

    /// Look up a field by schema name. `feats`/`misc` come back encoded;
    /// `id` and `head` are not addressable as strings.
    pub fn field(&self, schema: &Schema, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "form" => Some(Cow::Borrowed(&self.form)),
            "lemma" => Some(Cow::Borrowed(&self.lemma)),
            "upos" => Some(Cow::Borrowed(&self.upos)),
            "xpos" => Some(Cow::Borrowed(&self.xpos)),
            "deprel" => Some(Cow::Borrowed(&self.deprel)),
            "deps" => Some(Cow::Borrowed(&self.deps)),
            "feats" => Some(Cow::Owned(self.feats.encode())),
            "misc" => Some(Cow::Owned(self.misc.encode())),
            "id" | "head" => None,
            other => {
                let mut extras = self.extras.iter();
                for column in schema.columns() {
                    if let Column::Extra(extra_name) = column {
                        let value = extras.next()?;
                        if extra_name == other {
                            return Some(Cow::Borrowed(value));
                        }
                    }
                }
                None
            }
        }
    }
}

/// A dependency tree: the node arena plus a head-to-dependents index.
///
/// Trees are built row by row while reading and are read-only afterwards;
/// every traversal and the writer only borrow them.
#[derive(Debug, Clone)]
pub struct Tree {
    schema: Arc<Schema>,
    nodes: BTreeMap<NodeId, Token>,
    children: FxHashMap<NodeId, Vec<NodeId>>,
    edge_count: usize,
}

impl Tree {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            nodes: BTreeMap::new(),
            children: FxHashMap::default(),
            edge_count: 0,
        }
    }

    /// A fresh tree holding only the synthetic root.
    pub fn with_root(schema: Arc<Schema>) -> Self {
        let mut tree = Self::new(schema.clone());
        tree.nodes.insert(NodeId::ROOT, Token::root(&schema));
        tree
    }

    /// Insert a token, recording the head edge if the token has one. The
    /// head does not need to exist yet; rows arrive in document order.
    pub fn insert(&mut self, token: Token) {
        if let Some(head) = token.head {
            self.children.entry(head).or_default().push(token.id);
            self.edge_count += 1;
        }
        self.nodes.insert(token.id, token);
    }

    pub fn get(&self, id: NodeId) -> Option<&Token> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// The dependents of a node, in insertion (document) order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether any head edge has been recorded.
    pub fn has_syntax(&self) -> bool {
        self.edge_count > 0
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn root(&self) -> Option<&Token> {
        self.get(NodeId::ROOT)
    }

    /// All token records in identifier order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.nodes.values()
    }

    /// Ordinary tokens only, in identifier order — the positions with
    /// `major > 0` and `minor == 0`, skipping the root, multiword spans
    /// and empty nodes.
    pub fn syntactic_words(&self) -> impl Iterator<Item = &Token> {
        self.nodes.values().filter(|t| t.id.is_word())
    }
}
