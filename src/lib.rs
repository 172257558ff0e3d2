//! Advextract: adverb usage analytics over CoNLL-U treebanks
//!
//! Reads dependency-annotated corpora in the CoNLL-U interchange format,
//! resolves each adverb's true syntactic context through coordination and
//! other flat structures, and reports distribution, dependents,
//! morphology, coordination groups and lemma/form divergences as TSV
//! tables.

pub mod adverbs; // Adverb extraction rules over parsed trees
pub mod conllu; // CoNLL-U reading and writing
pub mod features; // Morphological feature codec and fusion
pub mod reports; // Aggregation and TSV report output
pub mod traverse; // True-head resolution, climbing, nucleus extraction
pub mod tree; // Tree data structures and token records

// Re-exports for convenience
pub use adverbs::{AdvProfile, Collection, Extractor};
pub use conllu::{CoNLLUReader, Metadata, ReadError, ReaderOptions, WriteError, write_tree};
pub use features::{Features, FusedFeatures, fuse};
pub use traverse::{Nucleus, RelSet, relation_set};
pub use tree::{NodeId, Schema, Token, Tree};
