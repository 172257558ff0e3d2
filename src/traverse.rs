//! Tree traversal
//!
//! Stateless operations over a built dependency tree: resolving a node's
//! true head through transparent (coordination-like) relations, climbing
//! to the nearest stopping relation, and extracting the functional
//! nucleus around a node.

use rustc_hash::FxHashSet;

use crate::features::{FusedFeatures, fuse};
use crate::tree::{NodeId, Token, Tree};

/// A set of relation labels used to steer traversal.
pub type RelSet = FxHashSet<&'static str>;

/// Build a relation set from a label list.
pub fn relation_set(relations: &[&'static str]) -> RelSet {
    relations.iter().copied().collect()
}

/// Relations that attach grammaticalized dependents to their host word.
pub const FUNCTIONAL_RELATIONS: &[&str] = &[
    "expl", "advmod", "discourse", "aux", "cop", "mark", "nummod", "det", "clf", "case", "cc",
    "punct",
];

/// Parts of speech of function words.
pub const FUNCTIONAL_POS: &[&str] = &[
    "ADV", "ADP", "AUX", "CCONJ", "DET", "INTJ", "NUM", "PART", "PRON", "SCONJ", "PUNCT",
];

/// The minimal functional subtree around a word: identifiers in linear
/// order, the parallel form/lemma/POS sequences, the fused morphology of
/// every member, and the relations of all members except the start node
/// (whose relation is external to the nucleus).
#[derive(Debug, Clone)]
pub struct Nucleus {
    pub ids: Vec<NodeId>,
    pub forms: Vec<String>,
    pub lemmas: Vec<String>,
    pub upos: Vec<String>,
    pub feats: FusedFeatures,
    pub deprels: Vec<String>,
}

impl Tree {
    /// The actual head of a node modulo coordination and other flat
    /// relations: while the node's relation is in `transparent`, move on
    /// to its head. With an empty set this is the node's own record.
    ///
    /// Relations are compared by their base label unless `subtyped`.
    /// Chains are finite in well-formed trees (the root's relation is
    /// never transparent); a chain that leaves the node set stops at the
    /// last resolvable record. `None` only when `node` itself is unknown.
    pub fn true_head(
        &self,
        node: NodeId,
        transparent: &FxHashSet<&str>,
        subtyped: bool,
    ) -> Option<&Token> {
        let mut current = self.get(node)?;
        loop {
            let relation = if subtyped {
                current.deprel.as_str()
            } else {
                current.base_deprel()
            };
            if !transparent.contains(relation) {
                return Some(current);
            }
            let next = current.head.and_then(|head| self.get(head));
            match next {
                Some(next) => current = next,
                None => return Some(current),
            }
        }
    }

    /// Climb head edges from `node` until a relation in `stop` is
    /// reached. The root relation is an implicit stop, as is running out
    /// of resolvable heads, so the climb always terminates. When
    /// `transparent` is non-empty, the relation tested at each step is
    /// the one of the node's true head.
    ///
    /// Stop labels are matched against the full relation, subtype
    /// included.
    pub fn climb(
        &self,
        node: NodeId,
        stop: &FxHashSet<&str>,
        transparent: &FxHashSet<&str>,
    ) -> NodeId {
        let mut current = node;
        loop {
            let Some(token) = self.get(current) else {
                return current;
            };
            let relation: &str = if transparent.is_empty() {
                &token.deprel
            } else {
                match self.true_head(current, transparent, false) {
                    Some(resolved) => &resolved.deprel,
                    None => return current,
                }
            };
            if relation == "root" || stop.contains(relation) {
                return current;
            }
            match token.head {
                Some(head) => current = head,
                None => return current,
            }
        }
    }

    /// Extract the nucleus around `node`: the downward closure admitting a
    /// dependent when its base relation is in `functional_relations` and
    /// its POS tag in `functional_pos`, each filter disabled by passing an
    /// empty set. Admitted dependents are expanded recursively by the same
    /// rule.
    pub fn extract_nucleus(
        &self,
        node: NodeId,
        functional_relations: &FxHashSet<&str>,
        functional_pos: &FxHashSet<&str>,
    ) -> Nucleus {
        let admitted = |id: NodeId| {
            self.get(id).is_some_and(|token| {
                (functional_relations.is_empty()
                    || functional_relations.contains(token.base_deprel()))
                    && (functional_pos.is_empty()
                        || functional_pos.contains(token.upos.as_str()))
            })
        };

        let mut members = vec![node];
        let mut frontier: Vec<NodeId> = self
            .children(node)
            .iter()
            .copied()
            .filter(|&child| admitted(child))
            .collect();
        while !frontier.is_empty() {
            members.extend(frontier.iter().copied());
            frontier = frontier
                .iter()
                .flat_map(|&parent| self.children(parent).iter().copied())
                .filter(|&child| admitted(child))
                .collect();
        }
        members.sort_unstable();

        let tokens: Vec<&Token> = members.iter().filter_map(|&id| self.get(id)).collect();
        Nucleus {
            ids: tokens.iter().map(|t| t.id).collect(),
            forms: tokens.iter().map(|t| t.form.clone()).collect(),
            lemmas: tokens.iter().map(|t| t.lemma.clone()).collect(),
            upos: tokens.iter().map(|t| t.upos.clone()).collect(),
            feats: fuse(tokens.iter().map(|t| &t.feats)),
            deprels: tokens
                .iter()
                .filter(|t| t.id != node)
                .map(|t| t.deprel.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conllu::{CoNLLUReader, ReaderOptions};

    fn tree(text: &str) -> Tree {
        let mut reader = CoNLLUReader::from_str(text, ReaderOptions::default()).unwrap();
        reader.next().unwrap().unwrap().1
    }

    const TWO_TOKEN: &str = "# sent_id = s1\n\
1\tNo\tno\tADV\tADV\t_\t2\tadvmod\t_\t_\n\
2\tva\tva\tVERB\tVERB\t_\t0\troot\t_\t_\n\
\n";

    // "corre rápido y bien": two coordinated adverbs under the verb
    const COORDINATED: &str = "# sent_id = s2\n\
1\tcorre\tcorrer\tVERB\t_\t_\t0\troot\t_\t_\n\
2\trápido\trápido\tADV\t_\t_\t1\tadvmod\t_\t_\n\
3\ty\ty\tCCONJ\t_\t_\t4\tcc\t_\t_\n\
4\tbien\tbien\tADV\t_\t_\t2\tconj:coord\t_\t_\n\
\n";

    #[test]
    fn test_true_head_with_empty_set_is_identity() {
        let tree = tree(TWO_TOKEN);
        let head = tree
            .true_head(NodeId::word(1), &RelSet::default(), false)
            .unwrap();
        assert_eq!(head.id, NodeId::word(1));
        assert_eq!(head.deprel, "advmod");
    }

    #[test]
    fn test_true_head_resolves_coordination() {
        let tree = tree(COORDINATED);
        let transparent = relation_set(&["conj", "flat", "fixed", "list"]);

        let head = tree
            .true_head(NodeId::word(4), &transparent, false)
            .unwrap();
        assert_eq!(head.id, NodeId::word(2));
        assert_eq!(head.deprel, "advmod");
        // the resolved relation is never itself transparent
        assert!(!transparent.contains(head.base_deprel()));
    }

    #[test]
    fn test_true_head_subtype_sensitive() {
        let tree = tree(COORDINATED);
        let transparent = relation_set(&["conj"]);

        // "conj:coord" only matches the set when compared by base label
        let resolved = tree
            .true_head(NodeId::word(4), &transparent, false)
            .unwrap();
        assert_eq!(resolved.id, NodeId::word(2));

        let unresolved = tree.true_head(NodeId::word(4), &transparent, true).unwrap();
        assert_eq!(unresolved.id, NodeId::word(4));
    }

    #[test]
    fn test_climb_reaches_root_relation() {
        let tree = tree(TWO_TOKEN);
        let reached = tree.climb(NodeId::word(1), &RelSet::default(), &RelSet::default());
        assert_eq!(reached, NodeId::word(2));
        assert_eq!(tree.get(reached).unwrap().deprel, "root");
    }

    #[test]
    fn test_climb_stops_at_given_relation() {
        let tree = tree(TWO_TOKEN);
        let stop = relation_set(&["advmod"]);
        assert_eq!(
            tree.climb(NodeId::word(1), &stop, &RelSet::default()),
            NodeId::word(1)
        );
    }

    #[test]
    fn test_climb_resolves_transparent_relations_first() {
        let tree = tree(COORDINATED);
        let stop = relation_set(&["advmod"]);
        let transparent = relation_set(&["conj"]);

        // token 4 is "conj:coord", but its true head's relation is advmod
        assert_eq!(
            tree.climb(NodeId::word(4), &stop, &transparent),
            NodeId::word(4)
        );
    }

    #[test]
    fn test_nucleus_of_verb_with_adverb() {
        let tree = tree(TWO_TOKEN);
        let funcrel = relation_set(&["advmod"]);
        let nucleus = tree.extract_nucleus(NodeId::word(2), &funcrel, &RelSet::default());

        assert_eq!(nucleus.ids, vec![NodeId::word(1), NodeId::word(2)]);
        assert_eq!(nucleus.forms, vec!["No", "va"]);
        assert_eq!(nucleus.deprels, vec!["advmod"]);
    }

    #[test]
    fn test_nucleus_filters_are_conjunctive() {
        let tree = tree(TWO_TOKEN);
        let funcrel = relation_set(&["advmod"]);
        let funcpos = relation_set(&["ADP"]);

        // the adverb passes the relation filter but not the POS filter
        let nucleus = tree.extract_nucleus(NodeId::word(2), &funcrel, &funcpos);
        assert_eq!(nucleus.ids, vec![NodeId::word(2)]);
        assert!(nucleus.deprels.is_empty());
    }

    #[test]
    fn test_nucleus_expands_recursively() {
        let text = "# sent_id = s3\n\
1\tde\tde\tADP\t_\t_\t3\tcase\t_\t_\n\
2\tla\tel\tDET\t_\tGender=Fem\t3\tdet\t_\t_\n\
3\tcasa\tcasa\tNOUN\t_\tGender=Fem\t4\tobl\t_\t_\n\
4\tsale\tsalir\tVERB\t_\t_\t0\troot\t_\t_\n\
\n";
        let tree = tree(text);
        let funcrel = relation_set(FUNCTIONAL_RELATIONS);
        let funcpos = relation_set(FUNCTIONAL_POS);

        let nucleus = tree.extract_nucleus(NodeId::word(3), &funcrel, &funcpos);
        assert_eq!(
            nucleus.ids,
            vec![NodeId::word(1), NodeId::word(2), NodeId::word(3)]
        );
        // fused morphology spans every member, the start node included
        assert_eq!(nucleus.feats["Gender"]["Fem"], 2);
    }

    #[test]
    fn test_nucleus_does_not_skip_over_rejected_children() {
        let text = "# sent_id = s4\n\
1\tla\tel\tDET\t_\t_\t2\tdet\t_\t_\n\
2\tcasa\tcasa\tNOUN\t_\t_\t3\tnmod\t_\t_\n\
3\tsale\tsalir\tVERB\t_\t_\t0\troot\t_\t_\n\
\n";
        let tree = tree(text);
        let funcrel = relation_set(&["det"]);

        // the determiner hangs off a rejected child and must not leak in
        let nucleus = tree.extract_nucleus(NodeId::word(3), &funcrel, &RelSet::default());
        assert_eq!(nucleus.ids, vec![NodeId::word(3)]);
    }

    #[test]
    fn test_nucleus_grows_monotonically_with_filters() {
        let tree = tree(COORDINATED);
        let narrow = relation_set(&["cc"]);
        let wide = relation_set(&["cc", "conj", "advmod"]);

        let small = tree.extract_nucleus(NodeId::word(1), &narrow, &RelSet::default());
        let large = tree.extract_nucleus(NodeId::word(1), &wide, &RelSet::default());

        assert!(small.ids.iter().all(|id| large.ids.contains(id)));
        assert!(large.ids.len() > small.ids.len());
    }
}
