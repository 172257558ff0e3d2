//! End-to-end pipeline: parse a small corpus, extract adverbs, write the
//! reports, and round-trip a tree through the writer.

use advextract::adverbs::{Collection, Extractor};
use advextract::conllu::{CoNLLUReader, IgnoreRules, ReaderOptions, write_tree};
use advextract::reports::write_reports;

const CORPUS: &str = "# sent_id = train-1\n\
# text = El perro no corre bien .\n\
1\tEl\tel\tDET\tDET\tDefinite=Def\t2\tdet\t_\t_\n\
2\tperro\tperro\tNOUN\tNOUN\tGender=Masc\t4\tnsubj\t_\t_\n\
3\tno\tno\tADV\tADV\tPolarity=Neg\t4\tadvmod\t_\t_\n\
4\tcorre\tcorrer\tVERB\tVERB\t_\t0\troot\t_\t_\n\
5\tbien\tbien\tADV\tADV\t_\t4\tadvmod\t_\t_\n\
6\t.\t.\tPUNCT\tPUNCT\t_\t4\tpunct\t_\t_\n\
\n\
# sent_id = train-2\n\
# text = Corre rápido y bien .\n\
1\tCorre\tcorrer\tVERB\tVERB\t_\t0\troot\t_\t_\n\
2\trápido\trápido\tADV\tADV\t_\t1\tadvmod\t_\t_\n\
3\ty\ty\tCCONJ\tCCONJ\t_\t4\tcc\t_\t_\n\
4\tbien\tbien\tADV\tADV\t_\t2\tconj\t_\t_\n\
5\t.\t.\tPUNCT\tPUNCT\t_\t1\tpunct\t_\t_\n\
\n";

fn collect(text: &str) -> Collection {
    let extractor = Extractor::new();
    let mut collection = Collection::default();
    for sentence in CoNLLUReader::from_str(text, ReaderOptions::default()).unwrap() {
        let (_, tree) = sentence.unwrap();
        extractor.scan_tree(&tree, &mut collection);
    }
    collection
}

#[test]
fn corpus_to_reports() {
    let collection = collect(CORPUS);

    // two adverbs per sentence: no, bien / rápido, bien
    assert_eq!(collection.adverbs.len(), 4);
    assert!(collection.adverbs.iter().all(|adv| adv.head == "PRED"));
    assert_eq!(
        collection.coordinated,
        vec![("bien".to_string(), "rápido".to_string())]
    );

    let dir = tempfile::tempdir().unwrap();
    write_reports(&collection, dir.path()).unwrap();

    let distr = std::fs::read_to_string(dir.path().join("ADV_distr.tsv")).unwrap();
    let mut lines = distr.lines();
    assert_eq!(lines.next().unwrap(), "Form type\tLemmas\tFrequency\tPRED");
    // first-seen order: no, bien, rápido
    assert_eq!(lines.next().unwrap(), "no\tno\t1\t1");
    assert_eq!(lines.next().unwrap(), "bien\tbien\t2\t1");
    assert_eq!(lines.next().unwrap(), "rápido\trápido\t1\t1");

    let morpho = std::fs::read_to_string(dir.path().join("ADV_morpho.tsv")).unwrap();
    assert_eq!(morpho, "Polarity=Neg\n_\n");

    let coord = std::fs::read_to_string(dir.path().join("ADV_coord.tsv")).unwrap();
    assert_eq!(coord, "bien\trápido\n\n");

    let advmod = std::fs::read_to_string(dir.path().join("ADV_advmod.tsv")).unwrap();
    // every advmod bearer in this corpus is an ADV
    assert!(advmod.starts_with("ADV\t1\n"));
}

#[test]
fn writer_round_trips_through_the_reader() {
    let mut reader = CoNLLUReader::from_str(CORPUS, ReaderOptions::default()).unwrap();
    let (_, tree) = reader.next().unwrap().unwrap();

    let block = write_tree(&tree, &IgnoreRules::new(), true).unwrap();
    let text = format!("# sent_id = rt-1\n{}", block);
    let mut again = CoNLLUReader::from_str(&text, ReaderOptions::default()).unwrap();
    let (_, tree2) = again.next().unwrap().unwrap();

    assert_eq!(tree.len(), tree2.len());
    let forms: Vec<_> = tree.syntactic_words().map(|t| t.form.clone()).collect();
    let forms2: Vec<_> = tree2.syntactic_words().map(|t| t.form.clone()).collect();
    assert_eq!(forms, forms2);

    // a second rendering is byte-identical: numbering is already contiguous
    assert_eq!(block, write_tree(&tree2, &IgnoreRules::new(), true).unwrap());
}
