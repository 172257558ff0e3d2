//! Adverb extraction rules
//!
//! Walks the syntactic words of each sentence, acting modulo coordination
//! and other horizontal structures, and collects the raw material the
//! reports are built from: adverb profiles, bearers of the adverbial
//! relation, the inventory of non-adverb forms, and coordinated
//! adverb-lemma pairs.

use rustc_hash::FxHashSet;

use crate::traverse::{FUNCTIONAL_POS, FUNCTIONAL_RELATIONS, RelSet, relation_set};
use crate::tree::Tree;

/// The universal dependency relations (UD v2.14).
pub const ALL_RELATIONS: &[&str] = &[
    "acl",
    "advcl",
    "advmod",
    "amod",
    "appos",
    "aux",
    "case",
    "cc",
    "ccomp",
    "clf",
    "compound",
    "conj",
    "cop",
    "csubj",
    "dep",
    "det",
    "discourse",
    "dislocated",
    "expl",
    "fixed",
    "flat",
    "goeswith",
    "iobj",
    "list",
    "mark",
    "nmod",
    "nsubj",
    "nummod",
    "obj",
    "obl",
    "orphan",
    "parataxis",
    "punct",
    "reparandum",
    "root",
    "vocative",
    "xcomp",
];

/// Relations whose bearer heads a clause. A `conj` conjunct copies the
/// function of a clause head it depends on, which is why resolution runs
/// through horizontal relations first.
pub const CLAUSE_HEADS: &[&str] = &[
    "root", "parataxis", "csubj", "ccomp", "xcomp", "advcl", "acl",
];

/// Function relations marking a periphrastic predication.
pub const VERB_FUNCTIONS: &[&str] = &["aux", "cop"];

/// Horizontal (coordination-like) structures.
pub const HORIZONTAL: &[&str] = &["conj", "flat", "fixed", "list"];

/// Labels that do not stand for usable syntactic relations.
pub const NON_RELATIONS: &[&str] = &["dep", "orphan", "punct", "reparandum", "goeswith"];

/// One observed adverb, or bearer of the adverbial relation.
#[derive(Debug, Clone, Default)]
pub struct AdvProfile {
    pub form: String,
    pub lemma: String,
    pub pos: String,
    /// Encoded morphology, `_` when unannotated.
    pub morpho: String,
    /// Base relation of the true head.
    pub deprel: String,
    /// Macro-category of what the adverb attaches to: `PRED`, `NOM`,
    /// `ROOT`, or the head's own POS tag.
    pub head: String,
    /// Sorted relations of the adverb's own functional dependents.
    pub dependents: Vec<String>,
}

/// A non-adverb word, kept to find forms shared with adverbs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormRecord {
    pub form: String,
    pub upos: String,
    pub lemma: String,
    pub morpho: String,
}

/// Everything collected from a corpus pass.
#[derive(Debug, Default)]
pub struct Collection {
    pub adverbs: Vec<AdvProfile>,
    pub adverbials: Vec<AdvProfile>,
    pub forms: FxHashSet<FormRecord>,
    /// Coordinated adverb pairs: a `conj` conjunct and its first conjunct.
    pub coordinated: Vec<(String, String)>,
}

/// Corpus scanner with its relation classes resolved once.
pub struct Extractor {
    horizontal: RelSet,
    non_relations: RelSet,
    clause_heads: RelSet,
    verb_functions: RelSet,
    /// Relations counting as the adverb's own dependents: everything
    /// except horizontal structures and non-relations.
    dependent_relations: RelSet,
    functional_relations: RelSet,
    functional_pos: RelSet,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        let horizontal = relation_set(HORIZONTAL);
        let non_relations = relation_set(NON_RELATIONS);
        let dependent_relations = ALL_RELATIONS
            .iter()
            .copied()
            .filter(|r| !horizontal.contains(r) && !non_relations.contains(r))
            .collect();
        Self {
            horizontal,
            non_relations,
            clause_heads: relation_set(CLAUSE_HEADS),
            verb_functions: relation_set(VERB_FUNCTIONS),
            dependent_relations,
            functional_relations: relation_set(FUNCTIONAL_RELATIONS),
            functional_pos: relation_set(FUNCTIONAL_POS),
        }
    }

    /// Scan one sentence, appending to `out`.
    pub fn scan_tree(&self, tree: &Tree, out: &mut Collection) {
        for word in tree.syntactic_words() {
            let Some(true_head) = tree.true_head(word.id, &self.horizontal, false) else {
                continue;
            };
            let base_relation = true_head.base_deprel();

            if word.upos == "ADV" && !self.non_relations.contains(base_relation) {
                let mut profile = AdvProfile {
                    form: word.form.to_lowercase(),
                    lemma: word.lemma.to_lowercase(),
                    pos: "ADV".to_string(),
                    morpho: word.feats.encode(),
                    deprel: base_relation.to_string(),
                    ..AdvProfile::default()
                };

                if self.clause_heads.contains(true_head.deprel.as_str()) {
                    // the adverb itself heads a clause
                    profile.head = "ROOT".to_string();
                } else {
                    if let Some(head_token) = true_head.head.and_then(|head| tree.get(head)) {
                        let head_nucleus = tree.extract_nucleus(
                            head_token.id,
                            &self.functional_relations,
                            &self.functional_pos,
                        );
                        // PRED covers synthetic and periphrastic predication
                        let predicative = self.clause_heads.contains(head_token.base_deprel())
                            || matches!(head_token.upos.as_str(), "VERB" | "AUX")
                            || head_nucleus
                                .deprels
                                .iter()
                                .any(|r| self.verb_functions.contains(r.as_str()));
                        profile.head = if predicative {
                            "PRED".to_string()
                        } else if matches!(head_token.upos.as_str(), "NOUN" | "PROPN" | "PRON") {
                            "NOM".to_string()
                        } else {
                            head_token.upos.clone()
                        };
                    }

                    if word.base_deprel() == "conj" && true_head.upos == "ADV" {
                        out.coordinated
                            .push((word.lemma.to_lowercase(), true_head.lemma.to_lowercase()));
                    }
                }

                // only local dependents: in horizontal constructions, shared
                // dependents of the whole construction stay out
                let mut dependents = tree
                    .extract_nucleus(word.id, &self.dependent_relations, &self.functional_pos)
                    .deprels;
                dependents.sort_unstable();
                profile.dependents = dependents;

                out.adverbs.push(profile);
            } else if word.upos != "ADV" {
                out.forms.insert(FormRecord {
                    form: word.form.to_lowercase(),
                    upos: word.upos.clone(),
                    lemma: word.lemma.to_lowercase(),
                    morpho: word.feats.encode(),
                });
            }

            if base_relation == "advmod" {
                out.adverbials.push(AdvProfile {
                    form: word.form.to_lowercase(),
                    lemma: word.lemma.to_lowercase(),
                    pos: word.upos.clone(),
                    morpho: word.feats.encode(),
                    deprel: "advmod".to_string(),
                    ..AdvProfile::default()
                });
            }
        }
    }
}
