//! CoNLL-U file reading and writing
//!
//! The reader turns a document into a lazy sequence of sentences, each a
//! `(metadata, tree)` pair; the writer renders a tree back into the row
//! format with contiguous token numbering. Multiword spans, empty nodes,
//! fractional positions under a configurable decimal separator, and
//! documents with a declared column schema (CoNLL-U plus) are all handled.
//! Enhanced dependencies are not.
//!
//! CoNLL-U format: https://universaldependencies.org/format.html

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Lines};
use std::path::Path;
use std::sync::Arc;

use flate2::bufread::MultiGzDecoder;
use regex::Regex;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::features::{Features, UNSPECIFIED};
use crate::tree::{Column, NodeId, Schema, Token, Tree};

/// Sentence-level comments, accumulated as `key = value` pairs.
pub type Metadata = FxHashMap<String, String>;

/// Error while reading a document.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `.` and `-` are taken by empty-node indices and multiword spans.
    #[error("the decimal separator must differ from '.' and '-'")]
    ReservedSeparator,

    #[error("bad column declaration: {0}")]
    Columns(String),

    #[error("line {line}: {message}")]
    Row { line: usize, message: String },
}

/// Reader configuration.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Prefix character of comment lines.
    pub comment: char,
    /// Comment key that starts a new sentence.
    pub sentence_key: String,
    /// Decimal separator for fractional token positions. Must not be `.`
    /// or `-`.
    pub decsep: char,
    /// Whether head annotation is expected; when off, sentences without a
    /// single head edge are still yielded.
    pub syntax: bool,
    /// Whether the document declares its own columns (CoNLL-U plus).
    pub plus: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            comment: '#',
            sentence_key: "sent_id".to_string(),
            decsep: ',',
            syntax: true,
            plus: false,
        }
    }
}

/// Iterator over the sentences of one document.
///
/// Sentences are produced one at a time, so a consumer may stop early
/// without reading the rest of the document. Each item is independent;
/// nothing is shared between yielded trees except the document schema.
pub struct CoNLLUReader<R: BufRead> {
    lines: Lines<R>,
    options: ReaderOptions,
    schema: Arc<Schema>,
    schema_pending: bool,
    meta: Metadata,
    tree: Tree,
    line_num: usize,
    done: bool,
}

impl CoNLLUReader<Box<dyn BufRead>> {
    /// Open a file, decompressing transparently when it ends in `.gz`.
    pub fn from_file(
        path: impl AsRef<Path>,
        options: ReaderOptions,
    ) -> Result<Self, ReadError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader: Box<dyn BufRead> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(BufReader::new(MultiGzDecoder::new(BufReader::new(file))))
        } else {
            Box::new(BufReader::new(file))
        };
        Self::new(reader, options)
    }
}

impl CoNLLUReader<BufReader<Cursor<String>>> {
    /// Read from an in-memory document.
    pub fn from_str(text: &str, options: ReaderOptions) -> Result<Self, ReadError> {
        Self::new(BufReader::new(Cursor::new(text.to_string())), options)
    }
}

impl<R: BufRead> CoNLLUReader<R> {
    pub fn new(reader: R, options: ReaderOptions) -> Result<Self, ReadError> {
        if matches!(options.decsep, '.' | '-') {
            return Err(ReadError::ReservedSeparator);
        }
        let schema = Arc::new(Schema::default());
        Ok(Self {
            lines: reader.lines(),
            schema_pending: options.plus,
            options,
            schema: schema.clone(),
            meta: Metadata::default(),
            tree: Tree::new(schema),
            line_num: 0,
            done: false,
        })
    }

    /// The active column schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Consume the leading `# global.columns = ...` declaration of a plus
    /// document.
    fn read_schema(&mut self) -> Result<(), ReadError> {
        self.line_num += 1;
        let line = match self.lines.next() {
            None => return Err(ReadError::Columns("empty document".to_string())),
            Some(line) => line?,
        };
        let rest = line
            .trim()
            .trim_start_matches(self.options.comment)
            .trim_start();
        let declaration = match rest.strip_prefix("global.columns") {
            Some(after) => after.trim_start_matches([' ', '=']),
            None => {
                return Err(ReadError::Columns(format!(
                    "expected a global.columns declaration, got '{}'",
                    line.trim()
                )));
            }
        };
        let schema = Schema::from_declaration(declaration);
        if !schema.has_id() {
            return Err(ReadError::Columns(
                "declared columns lack an id".to_string(),
            ));
        }
        self.schema = Arc::new(schema);
        self.tree = Tree::new(self.schema.clone());
        Ok(())
    }

    fn read_comment(&mut self, rest: &str) {
        let (key, value) = match rest.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (rest.trim(), ""),
        };
        self.meta.insert(key.to_string(), value.to_string());
        // sentence annotation starts here: a fresh tree under a fresh root
        if key == self.options.sentence_key {
            self.tree = Tree::with_root(self.schema.clone());
        }
    }

    fn read_row(&mut self, line: &str) -> Result<(), ReadError> {
        let fields: Vec<&str> = line.split('\t').collect();
        let schema = self.schema.clone();
        let mut token = Token::unspecified(NodeId::ROOT, &schema);
        let mut id_text = None;
        let mut extra_index = 0;

        for (position, column) in schema.columns().iter().enumerate() {
            let value = fields.get(position).copied();
            match column {
                Column::Id => id_text = value,
                Column::Form => set(&mut token.form, value),
                Column::Lemma => set(&mut token.lemma, value),
                Column::Upos => set(&mut token.upos, value),
                Column::Xpos => set(&mut token.xpos, value),
                Column::Deprel => set(&mut token.deprel, value),
                Column::Deps => set(&mut token.deps, value),
                Column::Feats => {
                    if let Some(value) = value {
                        token.feats = Features::decode(value);
                    }
                }
                Column::Misc => {
                    if let Some(value) = value {
                        token.misc = Features::decode(value);
                    }
                }
                // kept underspecified unless numeric: multiword spans and
                // some empty nodes have no head of their own
                Column::Head => {
                    token.head = value
                        .and_then(|value| value.parse::<u32>().ok())
                        .map(NodeId::word);
                }
                Column::Extra(_) => {
                    if let Some(value) = value {
                        token.extras[extra_index] = value.to_string();
                    }
                    extra_index += 1;
                }
            }
        }

        let id_text = id_text.ok_or_else(|| ReadError::Row {
            line: self.line_num,
            message: "row has no id field".to_string(),
        })?;
        token.id = NodeId::parse(id_text, self.options.decsep).ok_or_else(|| {
            ReadError::Row {
                line: self.line_num,
                message: format!("unparseable token id '{}'", id_text),
            }
        })?;

        self.tree.insert(token);
        Ok(())
    }

    /// Hand over the current sentence if it is worth yielding: it has
    /// syntactic structure, or syntax is not expected and it has any node
    /// at all (possibly just the root, for a comments-only sentence).
    fn flush(&mut self) -> Option<(Metadata, Tree)> {
        if !self.tree.has_syntax() && (self.options.syntax || self.tree.is_empty()) {
            return None;
        }
        let tree = std::mem::replace(&mut self.tree, Tree::new(self.schema.clone()));
        let meta = std::mem::take(&mut self.meta);
        Some((meta, tree))
    }
}

fn set(field: &mut String, value: Option<&str>) {
    if let Some(value) = value {
        *field = value.to_string();
    }
}

impl<R: BufRead> Iterator for CoNLLUReader<R> {
    type Item = Result<(Metadata, Tree), ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.schema_pending {
            self.schema_pending = false;
            if let Err(e) = self.read_schema() {
                self.done = true;
                return Some(Err(e));
            }
        }

        loop {
            self.line_num += 1;
            let line = match self.lines.next() {
                None => {
                    self.done = true;
                    return self.flush().map(Ok);
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                Some(Ok(line)) => line,
            };
            let line = line.trim_matches([' ', '\r']);

            if let Some(rest) = line.strip_prefix(self.options.comment) {
                self.read_comment(rest);
            } else if line.starts_with(|c: char| c.is_ascii_digit() && c != '0') {
                // token ids never begin with 0; anything else down here is
                // a sentence terminator
                if let Err(e) = self.read_row(line) {
                    return Some(Err(e));
                }
            } else if let Some(sentence) = self.flush() {
                return Some(Ok(sentence));
            }
        }
    }
}

/// Writer ignore rules: a token is dropped when any rule's regex matches
/// the named field.
pub type IgnoreRules = Vec<(String, Regex)>;

/// Error while rendering a tree.
#[derive(Debug, Error)]
pub enum WriteError {
    /// A head or span endpoint points at a position with no surviving
    /// token. Ignore rules must keep every referenced node.
    #[error("node {node} refers to position {target}, which has no surviving token")]
    UnmappedReference { node: NodeId, target: f64 },
}

/// Offsets that renumber surviving token positions contiguously from 1.
#[derive(Debug, Default)]
struct Deltas(FxHashMap<u64, f64>);

impl Deltas {
    fn insert(&mut self, major: f64, delta: f64) {
        self.0.insert(major.to_bits(), delta);
    }

    fn remap(&self, node: NodeId, major: f64) -> Result<i64, WriteError> {
        let delta = self
            .0
            .get(&major.to_bits())
            .copied()
            .ok_or(WriteError::UnmappedReference {
                node,
                target: major,
            })?;
        // the sum is an exact integer; rounding guards against the usual
        // binary representation of fractional positions
        Ok((major + delta).round() as i64)
    }
}

/// Render a tree as a CoNLL-U sentence block: rows joined by newlines,
/// terminated by a blank line.
///
/// Token positions are renumbered contiguously starting at 1, so gaps left
/// by ignored tokens (or fractional positions in the input) disappear.
/// With `syntax` off, every head is written as `_`.
pub fn write_tree(tree: &Tree, ignored: &IgnoreRules, syntax: bool) -> Result<String, WriteError> {
    let schema = tree.schema();
    let keep = |token: &Token| {
        !ignored.iter().any(|(field, pattern)| {
            token
                .field(schema, field)
                .is_some_and(|value| pattern.is_match(&value))
        })
    };

    let mut deltas = Deltas::default();
    deltas.insert(0.0, 0.0);
    for (position, token) in tree
        .tokens()
        .filter(|&t| t.id.is_word() && keep(t))
        .enumerate()
    {
        deltas.insert(token.id.major, (position + 1) as f64 - token.id.major);
    }

    let mut rows = Vec::new();
    for token in tree.tokens().filter(|&t| !t.id.is_root() && keep(t)) {
        rows.push(render_row(token, schema, &deltas, syntax)?);
    }

    Ok(rows.join("\n") + "\n\n")
}

fn render_row(
    token: &Token,
    schema: &Schema,
    deltas: &Deltas,
    syntax: bool,
) -> Result<String, WriteError> {
    let id_text = if token.id.is_range() {
        let start = deltas.remap(token.id, token.id.major)?;
        let end = deltas.remap(token.id, token.id.range_end())?;
        format!("{}-{}", start, end)
    } else {
        let major = deltas.remap(token.id, token.id.major)?;
        if token.id.minor != 0.0 {
            // sub-indices are kept as written; only the position moves
            format!("{}.{}", major, token.id.minor.round() as i64)
        } else {
            major.to_string()
        }
    };

    let head_text = match token.head {
        Some(head) if syntax => deltas.remap(token.id, head.major)?.to_string(),
        _ => UNSPECIFIED.to_string(),
    };

    let mut extras = token.extras.iter();
    let cells: Vec<String> = schema
        .columns()
        .iter()
        .map(|column| match column {
            Column::Id => id_text.clone(),
            Column::Form => token.form.clone(),
            Column::Lemma => token.lemma.clone(),
            Column::Upos => token.upos.clone(),
            Column::Xpos => token.xpos.clone(),
            Column::Feats => token.feats.encode(),
            Column::Head => head_text.clone(),
            Column::Deprel => token.deprel.clone(),
            Column::Deps => token.deps.clone(),
            Column::Misc => token.misc.encode(),
            Column::Extra(_) => extras
                .next()
                .cloned()
                .unwrap_or_else(|| "*".to_string()),
        })
        .collect();

    Ok(cells.join("\t"))
}
