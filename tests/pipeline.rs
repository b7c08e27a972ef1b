// End-to-end run over a small lexicon, two external sources and some
// authored content.

use lexique_deck::{
    ArtifactWriter, CardType, IssueKind, Pipeline, PipelineConfig, PipelineError, RunSummary,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const LEXICON_HEADER: &str =
    "ortho\tlemme\tcgram\tgenre\tnombre\tfreqlemfilms2\tfreqlemlivres\tislem\tinfover";

const LEXICON_ROWS: [&str; 14] = [
    "faire\tfaire\tVER\t\t\t500\t400\t1\tinf;",
    "faisant\tfaire\tVER\t\t\t500\t400\t0\tpar:pre;",
    "parler\tparler\tVER\t\t\t50\t40\t1\tinf;",
    "beau\tbeau\tADJ\tm\ts\t100\t80\t1\t",
    "belle\tbeau\tADJ\tf\ts\t100\t80\t0\t",
    "petit\tpetit\tADJ\tm\ts\t90\t70\t1\t",
    "petite\tpetit\tADJ\tf\ts\t90\t70\t0\t",
    "chat\tchat\tNOM\tm\ts\t30\t20\t1\t",
    "chats\tchat\tNOM\tm\tp\t30\t20\t0\t",
    "acteur\tacteur\tNOM\tm\ts\t20\t10\t1\t",
    "actrice\tacteur\tNOM\tf\ts\t20\t10\t0\t",
    "pharmacien\tpharmacien\tNOM\tm\ts\t5\t5\t1\t",
    "dépanneur\tdépanneur\tNOM\tm\ts\t1\t1\t1\t",
    "vite\tvite\tADV\t\t\t40\t30\t1\t",
];

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn fixture() -> (TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let mut lexicon = String::from(LEXICON_HEADER);
    for row in LEXICON_ROWS {
        lexicon.push('\n');
        lexicon.push_str(row);
    }
    lexicon.push('\n');
    write(&root.join("data/lexique.tsv"), &lexicon);

    write(
        &root.join("sources/cameleon.csv"),
        "word,pos,definition\n\
         Dépanneur,n.m.,Petite épicerie\n\
         \"Achalant, E\",adj.,Agaçant\n\
         ,adj.,sans mot\n",
    );
    write(
        &root.join("sources/oqlf_termes.csv"),
        "Termes_Officialises,Definition,Equivalent_anglais\n\
         dépanneur (n. m.) [Québec],Commerce de proximité,convenience store\n",
    );

    write(
        &root.join("content/vocabulary.csv"),
        "French,Russian,ExampleFrench\n\
         le chat,кот,Le chat dort.\n\
         beau,красивый,\n\
         belle,красивая,\n\
         l'acteur,актёр,\n\
         la licorne,единорог,\n\
         le pharmacien,,\n",
    );
    write(
        &root.join("content/conjugation.csv"),
        "Verb,Translation,ConjSingular,ConjPlural\n\
         faire,делать,je {{c1::fais}},nous {{c1::faisons}}\n\
         Faire,делать,tu {{c1::fais}},vous {{c1::faites}}\n",
    );

    let mut config = PipelineConfig::default();
    config.paths.lexicon = root.join("data/lexique.tsv");
    config.paths.out_dir = root.join("output");
    config.paths.sources_dir = root.join("sources");
    config.paths.authored_dir = root.join("content");
    (dir, config)
}

fn run(config: &PipelineConfig) -> (Vec<lexique_deck::DeckOutcome>, RunSummary) {
    let pipeline = Pipeline::new(config.clone(), ArtifactWriter::default());
    let lexicon = pipeline.load_lexicon().unwrap();
    let mut summary = RunSummary::new();
    let decks = pipeline.run(&lexicon, &mut summary).unwrap();
    (decks, summary)
}

#[test]
fn test_full_run_join_split() {
    let (_dir, config) = fixture();
    let (decks, summary) = run(&config);

    let vocabulary = &decks[0];
    assert_eq!(vocabulary.card_type, CardType::Vocabulary);
    assert_eq!(vocabulary.complete, 4);
    assert_eq!(vocabulary.orphans, 1);
    assert!(vocabulary.aborted.is_none());

    // duplicate authored verb stops conjugation only
    let conjugation = &decks[1];
    assert!(conjugation.aborted.is_some());
    assert!(!config.cards_dir().join("conjugation.csv").exists());
    assert_eq!(summary.issue_count(IssueKind::JoinCollision), 1);
    assert!(summary.has_critical_issues());

    assert_eq!(summary.issue_count(IssueKind::MergeOrphan), 1);
    assert_eq!(summary.issue_count(IssueKind::SkippedRow), 1);

    let import = fs::read_to_string(config.cards_dir().join("vocabulary.csv")).unwrap();
    assert!(import.contains("le chat,кот,m,Le chat dort.,,,,,\n"));
    assert!(import.contains("\nbeau,красивый,adj,"));
    assert!(import.contains("\nbelle,красивая,adj,"));
    assert!(import.contains("l'acteur (m),актёр,m,"));
    assert!(!import.contains("pharmacien"));
    assert!(!import.contains("Complete"));

    let review = fs::read_to_string(config.cards_dir().join("vocabulary_review.csv")).unwrap();
    assert!(review.contains("le pharmacien,,m,,,,,,,false"));
    assert!(review.contains("le chat,кот,m,Le chat dort.,,,,,,true"));
}

#[test]
fn test_classifier_scenarios() {
    let (_dir, config) = fixture();
    run(&config);

    let exceptions = fs::read_to_string(config.classified_dir().join("exceptions.csv")).unwrap();
    assert!(exceptions.contains("\npharmacien,missing-feminine-form,open,pharmacienne,"));
    assert!(exceptions.contains("\nbeau,irregular-feminine-pattern,resolved,belle,"));
    assert!(!exceptions.contains("\nacteur,"));
    assert!(!exceptions.contains("\npetit,"));

    let forms = fs::read_to_string(config.classified_dir().join("irregular_adjective_forms.csv")).unwrap();
    assert!(forms.contains("beau,beau,m,"));
    assert!(forms.contains("beau,belle,f,"));

    let verbs = fs::read_to_string(config.classified_dir().join("verb_groups.csv")).unwrap();
    assert!(verbs.contains("faire,3,-re,faisant,"));
    assert!(verbs.contains("parler,1,regular -er,"));
}

#[test]
fn test_external_merge_snapshot() {
    let (_dir, config) = fixture();
    let (decks, _) = run(&config);

    let merged = fs::read_to_string(config.external_dir().join("merged.csv")).unwrap();
    let depanneur = merged
        .lines()
        .find(|l| l.starts_with("Dépanneur,"))
        .unwrap();
    assert!(depanneur.contains("\"cameleon,oqlf\""));
    assert!(depanneur.contains(",high,"));

    // high priority first
    let first_item = merged.lines().nth(1).unwrap();
    assert!(first_item.starts_with("Dépanneur,"));

    let manifest = fs::read_to_string(config.external_dir().join("manifest.json")).unwrap();
    assert!(manifest.contains("\"snapshot_id\""));
    assert!(manifest.contains("\"skipped_rows\": 1"));

    let expressions = &decks[2];
    assert_eq!(expressions.records, 2);
    assert_eq!(expressions.complete, 0);

    let skeleton =
        fs::read_to_string(config.cards_dir().join("expressions_skeleton.csv")).unwrap();
    assert!(skeleton.contains("le Dépanneur,m,Petite épicerie,external,1.0,high"));
}

#[test]
fn test_rerun_is_idempotent() {
    let (_dir, config) = fixture();

    run(&config);
    let exceptions = fs::read(config.classified_dir().join("exceptions.csv")).unwrap();
    let vocabulary = fs::read(config.cards_dir().join("vocabulary_review.csv")).unwrap();

    run(&config);
    assert_eq!(fs::read(config.classified_dir().join("exceptions.csv")).unwrap(), exceptions);
    assert_eq!(fs::read(config.cards_dir().join("vocabulary_review.csv")).unwrap(), vocabulary);
}

#[test]
fn test_levels_written() {
    let (_dir, config) = fixture();
    run(&config);

    let levels = config.cards_dir().join("levels");
    let a1 = fs::read_to_string(levels.join("a1_a2.csv")).unwrap();
    assert!(a1.contains("le chat,кот"));
    assert!(a1.contains("beau,красивый"));

    // every level file exists even when empty
    for level in ["b1", "b2", "c1", "autres"] {
        assert!(levels.join(format!("{}.csv", level)).exists());
    }
}

#[test]
fn test_pipeline_key_clash_keeps_card_types() {
    let (dir, config) = fixture();
    let root = dir.path();

    // noun "la belle" clashes with the adjective form "belle"
    let mut lexicon = fs::read_to_string(root.join("data/lexique.tsv")).unwrap();
    lexicon.push_str("belle\tbelle\tNOM\tf\ts\t10\t10\t1\t\n");
    write(&root.join("data/lexique.tsv"), &lexicon);

    // "tuque" (n.f.) and "la tuque" merge separately but share a card key
    write(
        &root.join("sources/curated.csv"),
        "word,pos,definition,translation\n\
         tuque,n.f.,Bonnet de laine,шапка\n\
         la tuque,,Bonnet d'hiver,\n",
    );

    let (decks, summary) = run(&config);

    assert!(decks[0].aborted.is_none());
    assert!(decks[2].aborted.is_none());
    assert_eq!(decks[2].records, 3);
    assert_eq!(summary.issue_count(IssueKind::DuplicateCardKey), 2);
    // only the authored duplicate verb collides
    assert_eq!(summary.issue_count(IssueKind::JoinCollision), 1);

    let review = fs::read_to_string(config.cards_dir().join("vocabulary_review.csv")).unwrap();
    assert!(review.contains("\nbelle,красивая,adj,"));
    assert!(!review.contains("la belle"));

    let skeleton =
        fs::read_to_string(config.cards_dir().join("expressions_skeleton.csv")).unwrap();
    assert_eq!(skeleton.lines().filter(|l| l.starts_with("la tuque,")).count(), 1);
    assert!(skeleton.contains("la tuque,expr,Bonnet d'hiver,external,0.0,medium"));
}

#[test]
fn test_missing_lexicon_is_fatal() {
    let (_dir, mut config) = fixture();
    config.paths.lexicon = config.paths.out_dir.join("nope.tsv");

    let err = Pipeline::new(config, ArtifactWriter::default())
        .load_lexicon()
        .unwrap_err();
    assert!(matches!(err, PipelineError::DataSource { .. }));
    assert!(err.is_fatal());
}
