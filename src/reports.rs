//! Report generation
//!
//! Aggregates the collected profiles and lays them out as TSV tables in
//! the output directory: the distribution of adverb types over head
//! categories, forms shared with other parts of speech, nominal-like
//! dependent patterns, lemma/form divergences, observed morphology, the
//! distribution of the adverbial relation, and coordination groups.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::adverbs::Collection;

/// Nominal-type dependent relations, plus the copula: a copula under an
/// adverb means the adverb is being predicated of, not metapredicating.
const NOMINAL_DEPENDENTS: &[&str] = &[
    "nmod", "appos", "nummod", "acl", "amod", "det", "clf", "case", "cop",
];

/// Minimum occurrences before a form takes part in the nominal-pattern
/// report; rarer types are noise.
const NOMINAL_THRESHOLD: usize = 5;

/// Per-form aggregates over the collected adverb profiles.
#[derive(Debug, Default)]
struct Aggregates {
    /// Adverb form types, first-seen order.
    order: Vec<String>,
    counts: FxHashMap<String, usize>,
    lemmas: FxHashMap<String, BTreeSet<String>>,
    /// Head macro-category counts, modifier categories conflated into PRED.
    heads: FxHashMap<String, FxHashMap<String, usize>>,
    dependents: FxHashMap<String, FxHashMap<String, usize>>,
}

fn aggregate(collection: &Collection) -> Aggregates {
    let mut agg = Aggregates::default();

    for adv in &collection.adverbs {
        if !agg.counts.contains_key(&adv.form) {
            agg.order.push(adv.form.clone());
        }
        *agg.counts.entry(adv.form.clone()).or_insert(0) += 1;
        agg.lemmas
            .entry(adv.form.clone())
            .or_default()
            .insert(adv.lemma.clone());

        let head = if matches!(adv.head.as_str(), "ADJ" | "DET" | "NUM" | "ADV") {
            "PRED"
        } else {
            adv.head.as_str()
        };
        *agg.heads
            .entry(adv.form.clone())
            .or_default()
            .entry(head.to_string())
            .or_insert(0) += 1;

        for relation in &adv.dependents {
            *agg.dependents
                .entry(adv.form.clone())
                .or_default()
                .entry(relation.clone())
                .or_insert(0) += 1;
        }
    }

    agg
}

/// Write all reports into `out_dir`, which must already exist.
pub fn write_reports(collection: &Collection, out_dir: &Path) -> io::Result<()> {
    let agg = aggregate(collection);

    write_distribution(&agg, out_dir)?;
    write_coincidences(collection, &agg, out_dir)?;
    let nominal_like = write_nominals(&agg, out_dir)?;
    write_lemma_divergences(&agg, out_dir)?;
    write_morphology(collection, out_dir)?;
    write_adverbials(collection, out_dir)?;
    write_coordination(collection, &nominal_like, out_dir)?;

    Ok(())
}

fn create(out_dir: &Path, name: &str) -> io::Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(out_dir.join(name))?))
}

/// `ADV_distr.tsv`: one row per adverb form type with its lemmas, its
/// frequency, and the relative frequency of each head category.
fn write_distribution(agg: &Aggregates, out_dir: &Path) -> io::Result<()> {
    let mut out = create(out_dir, "ADV_distr.tsv")?;

    let categories: Vec<&String> = agg
        .heads
        .values()
        .flat_map(|heads| heads.keys())
        .filter(|category| !category.is_empty())
        .unique()
        .sorted()
        .collect();

    writeln!(
        out,
        "Form type\tLemmas\tFrequency\t{}",
        categories.iter().join("\t")
    )?;

    for form in &agg.order {
        let count = agg.counts[form];
        let ratios = categories
            .iter()
            .map(|&category| {
                let seen = agg
                    .heads
                    .get(form)
                    .and_then(|heads| heads.get(category))
                    .copied()
                    .unwrap_or(0);
                format!("{}", seen as f64 / count as f64)
            })
            .join("\t");
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            form,
            agg.lemmas[form].iter().join(","),
            count,
            ratios
        )?;
    }

    out.flush()
}

/// `ADV_coinc.tsv`: non-adverb words whose form coincides with an adverb
/// form type.
fn write_coincidences(
    collection: &Collection,
    agg: &Aggregates,
    out_dir: &Path,
) -> io::Result<()> {
    let mut out = create(out_dir, "ADV_coinc.tsv")?;

    let shared: Vec<_> = collection
        .forms
        .iter()
        .filter(|record| agg.counts.contains_key(&record.form))
        .sorted_by(|a, b| {
            (&a.form, &a.upos, &a.lemma, &a.morpho).cmp(&(&b.form, &b.upos, &b.lemma, &b.morpho))
        })
        .collect();

    for record in shared {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            record.form, record.upos, record.lemma, record.morpho
        )?;
    }

    out.flush()
}

/// `ADV_nominals.tsv`: nominal-type dependent patterns per relation, for
/// adverb forms above the frequency threshold. Returns the forms showing
/// any such pattern.
fn write_nominals(agg: &Aggregates, out_dir: &Path) -> io::Result<FxHashSet<String>> {
    let mut out = create(out_dir, "ADV_nominals.tsv")?;

    let mut per_relation: BTreeMap<&String, Vec<(&String, f64)>> = BTreeMap::new();
    let mut nominal_like = FxHashSet::default();

    for form in &agg.order {
        let count = agg.counts[form];
        if count <= NOMINAL_THRESHOLD {
            continue;
        }
        let Some(dependents) = agg.dependents.get(form) else {
            continue;
        };
        for (relation, &seen) in dependents {
            if NOMINAL_DEPENDENTS
                .iter()
                .any(|prefix| relation.starts_with(prefix))
            {
                per_relation
                    .entry(relation)
                    .or_default()
                    .push((form, seen as f64 / count as f64));
                nominal_like.insert(form.clone());
            }
        }
    }

    for (relation, mut forms) in per_relation {
        forms.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let listing = forms
            .iter()
            .map(|(form, ratio)| format!("{}/{}", form, ratio))
            .join(" ");
        writeln!(out, "{}\t{}\n", relation, listing)?;
    }

    out.flush()?;
    Ok(nominal_like)
}

/// The prefixoid/suffixoid substitution turning string `a` into string
/// `b`, computed around their longest common substring: how many leading
/// characters of `a` are replaced by which prefix of `b`, and likewise at
/// the tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformation {
    pub strip_prefix: usize,
    pub prefix: String,
    pub strip_suffix: usize,
    pub suffix: String,
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.strip_prefix, self.prefix, self.strip_suffix, self.suffix
        )
    }
}

/// Find the transformation from `a` to `b`. Ties between equally long
/// common substrings go to the one starting earliest in `a`, then in `b`.
pub fn string_transformation(a: &str, b: &str) -> Transformation {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let mut best = (0usize, 0usize, 0usize); // (size, a start, b start)
    let mut prev = vec![0usize; b_chars.len() + 1];
    for (i, &ca) in a_chars.iter().enumerate() {
        let mut row = vec![0usize; b_chars.len() + 1];
        for (j, &cb) in b_chars.iter().enumerate() {
            if ca == cb {
                let size = prev[j] + 1;
                row[j + 1] = size;
                let candidate = (size, i + 1 - size, j + 1 - size);
                if candidate.0 > best.0
                    || (candidate.0 == best.0 && (candidate.1, candidate.2) < (best.1, best.2))
                {
                    best = candidate;
                }
            }
        }
        prev = row;
    }

    let (size, a_start, b_start) = best;
    Transformation {
        strip_prefix: a_start,
        prefix: b_chars[..b_start].iter().collect(),
        strip_suffix: a_chars.len() - a_start - size,
        suffix: b_chars[b_start + size..].iter().collect(),
    }
}

/// `ADV_difflemma.tsv`: adverb forms whose lemma differs from the form,
/// grouped by the lemma-to-form transformation.
fn write_lemma_divergences(agg: &Aggregates, out_dir: &Path) -> io::Result<()> {
    let mut out = create(out_dir, "ADV_difflemma.tsv")?;

    let mut groups: BTreeMap<String, BTreeMap<&String, BTreeSet<&String>>> = BTreeMap::new();
    for form in &agg.order {
        for lemma in &agg.lemmas[form] {
            if lemma == form {
                continue;
            }
            let key = string_transformation(lemma, form).to_string();
            groups
                .entry(key)
                .or_default()
                .entry(form)
                .or_default()
                .insert(lemma);
        }
    }

    for (transformation, by_form) in &groups {
        for (form, lemmas) in by_form {
            writeln!(out, "{}\t{}\t{}", transformation, form, lemmas.iter().join(","))?;
        }
    }

    out.flush()
}

/// `ADV_morpho.tsv`: every `Feature=Value` fragment observed on adverbs.
fn write_morphology(collection: &Collection, out_dir: &Path) -> io::Result<()> {
    let mut out = create(out_dir, "ADV_morpho.tsv")?;

    let fragments: BTreeSet<&str> = collection
        .adverbs
        .iter()
        .flat_map(|adv| adv.morpho.split('|'))
        .collect();

    for fragment in fragments {
        writeln!(out, "{}", fragment)?;
    }

    out.flush()
}

/// Normalise a counter into ratios, largest first.
fn normalised(counts: &FxHashMap<String, usize>) -> Vec<(String, f64)> {
    let total: usize = counts.values().sum();
    let mut entries: Vec<(String, f64)> = counts
        .iter()
        .map(|(key, &seen)| (key.clone(), seen as f64 / total as f64))
        .collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

/// `ADV_advmod.tsv`: what bears the adverbial relation — the normalised
/// POS distribution, then the normalised lemma distribution per POS.
fn write_adverbials(collection: &Collection, out_dir: &Path) -> io::Result<()> {
    let mut out = create(out_dir, "ADV_advmod.tsv")?;

    let mut pos_counts: FxHashMap<String, usize> = FxHashMap::default();
    let mut lemma_counts: FxHashMap<String, FxHashMap<String, usize>> = FxHashMap::default();
    for adverbial in &collection.adverbials {
        *pos_counts.entry(adverbial.pos.clone()).or_insert(0) += 1;
        *lemma_counts
            .entry(adverbial.pos.clone())
            .or_default()
            .entry(adverbial.lemma.clone())
            .or_insert(0) += 1;
    }

    let pos_distribution = normalised(&pos_counts);
    let header = pos_distribution
        .iter()
        .map(|(pos, ratio)| format!("{}\t{}", pos, ratio))
        .join("\n");
    write!(out, "{}\n\n\n", header)?;

    for (pos, _) in &pos_distribution {
        let listing = normalised(&lemma_counts[pos])
            .iter()
            .map(|(lemma, ratio)| format!("{},{}", lemma, ratio))
            .join(" ");
        write!(out, "{}\t{}\n\n", pos, listing)?;
    }

    out.flush()
}

/// `ADV_coord.tsv`: connected components of the coordinated-adverb graph,
/// largest first; nominal-like members are upper-cased.
fn write_coordination(
    collection: &Collection,
    nominal_like: &FxHashSet<String>,
    out_dir: &Path,
) -> io::Result<()> {
    let mut out = create(out_dir, "ADV_coord.tsv")?;

    let mut graph: UnGraph<String, ()> = UnGraph::new_undirected();
    let mut indices: FxHashMap<&str, NodeIndex> = FxHashMap::default();
    for (a, b) in &collection.coordinated {
        let ia = *indices
            .entry(a.as_str())
            .or_insert_with(|| graph.add_node(a.clone()));
        let ib = *indices
            .entry(b.as_str())
            .or_insert_with(|| graph.add_node(b.clone()));
        graph.add_edge(ia, ib, ());
    }

    let mut sets = UnionFind::new(graph.node_count());
    for edge in graph.edge_references() {
        sets.union(edge.source().index(), edge.target().index());
    }
    let labels = sets.into_labeling();

    let mut by_label: FxHashMap<usize, Vec<&str>> = FxHashMap::default();
    for index in graph.node_indices() {
        by_label
            .entry(labels[index.index()])
            .or_default()
            .push(graph[index].as_str());
    }
    let components: Vec<Vec<&str>> = by_label
        .into_values()
        .map(|mut members| {
            members.sort_unstable();
            members
        })
        .sorted_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)))
        .collect();

    for members in components {
        let listing = members
            .iter()
            .map(|&member| {
                if nominal_like.contains(member) {
                    member.to_uppercase()
                } else {
                    member.to_string()
                }
            })
            .join("\t");
        write!(out, "{}\n\n", listing)?;
    }

    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adverbs::{AdvProfile, FormRecord};

    #[test]
    fn test_transformation_suffix_only() {
        let t = string_transformation("rapide", "rapidement");
        assert_eq!(t.strip_prefix, 0);
        assert_eq!(t.prefix, "");
        assert_eq!(t.strip_suffix, 0);
        assert_eq!(t.suffix, "ment");
        assert_eq!(t.to_string(), "0||0|ment");
    }

    #[test]
    fn test_transformation_earliest_longest_match() {
        let t = string_transformation("buono", "bene");
        // the common substring is the initial "b"
        assert_eq!(t.strip_prefix, 0);
        assert_eq!(t.prefix, "");
        assert_eq!(t.strip_suffix, 4);
        assert_eq!(t.suffix, "ene");
    }

    #[test]
    fn test_transformation_without_common_substring() {
        let t = string_transformation("xy", "ab");
        assert_eq!(t.to_string(), "0||2|ab");
    }

    #[test]
    fn test_transformation_prefix_substitution() {
        let t = string_transformation("insperato", "sperato");
        assert_eq!(t.strip_prefix, 2);
        assert_eq!(t.prefix, "");
        assert_eq!(t.strip_suffix, 0);
        assert_eq!(t.suffix, "");
    }

    #[test]
    fn test_normalised_orders_descending() {
        let mut counts = FxHashMap::default();
        counts.insert("ADV".to_string(), 3);
        counts.insert("VERB".to_string(), 1);

        let entries = normalised(&counts);
        assert_eq!(entries[0], ("ADV".to_string(), 0.75));
        assert_eq!(entries[1], ("VERB".to_string(), 0.25));
    }

    fn profile(form: &str, lemma: &str, head: &str) -> AdvProfile {
        AdvProfile {
            form: form.to_string(),
            lemma: lemma.to_string(),
            pos: "ADV".to_string(),
            morpho: "_".to_string(),
            deprel: "advmod".to_string(),
            head: head.to_string(),
            dependents: Vec::new(),
        }
    }

    #[test]
    fn test_aggregate_conflates_modifier_heads() {
        let mut collection = Collection::default();
        collection.adverbs.push(profile("muy", "muy", "ADJ"));
        collection.adverbs.push(profile("muy", "muy", "PRED"));
        collection.adverbs.push(profile("muy", "muy", "NOM"));

        let agg = aggregate(&collection);
        assert_eq!(agg.counts["muy"], 3);
        assert_eq!(agg.heads["muy"]["PRED"], 2);
        assert_eq!(agg.heads["muy"]["NOM"], 1);
    }

    #[test]
    fn test_write_reports_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut collection = Collection::default();

        collection.adverbs.push(profile("bien", "bien", "PRED"));
        collection.adverbs.push(profile("mal", "malo", "PRED"));
        collection.adverbs.push(profile("mal", "malo", "NOM"));
        collection.forms.insert(FormRecord {
            form: "bien".to_string(),
            upos: "NOUN".to_string(),
            lemma: "bien".to_string(),
            morpho: "Number=Sing".to_string(),
        });
        collection
            .adverbials
            .push(profile("bien", "bien", "PRED"));
        collection
            .coordinated
            .push(("bien".to_string(), "mal".to_string()));

        write_reports(&collection, dir.path()).unwrap();

        let distr = std::fs::read_to_string(dir.path().join("ADV_distr.tsv")).unwrap();
        let mut lines = distr.lines();
        assert_eq!(lines.next().unwrap(), "Form type\tLemmas\tFrequency\tNOM\tPRED");
        assert_eq!(lines.next().unwrap(), "bien\tbien\t1\t0\t1");
        assert_eq!(lines.next().unwrap(), "mal\tmalo\t2\t0.5\t0.5");

        let coinc = std::fs::read_to_string(dir.path().join("ADV_coinc.tsv")).unwrap();
        assert_eq!(coinc, "bien\tNOUN\tbien\tNumber=Sing\n");

        let diff = std::fs::read_to_string(dir.path().join("ADV_difflemma.tsv")).unwrap();
        assert_eq!(diff, "0||1|\tmal\tmalo\n");

        let coord = std::fs::read_to_string(dir.path().join("ADV_coord.tsv")).unwrap();
        assert_eq!(coord, "bien\tmal\n\n");

        let advmod = std::fs::read_to_string(dir.path().join("ADV_advmod.tsv")).unwrap();
        assert!(advmod.starts_with("ADV\t1\n\n\n"));
    }

    #[test]
    fn test_coordination_components_group_transitively() {
        let dir = tempfile::tempdir().unwrap();
        let mut collection = Collection::default();
        for (a, b) in [("a", "b"), ("b", "c"), ("d", "e")] {
            collection
                .coordinated
                .push((a.to_string(), b.to_string()));
        }

        write_coordination(&collection, &FxHashSet::default(), dir.path()).unwrap();
        let coord = std::fs::read_to_string(dir.path().join("ADV_coord.tsv")).unwrap();
        assert_eq!(coord, "a\tb\tc\n\nd\te\n\n");
    }
}
