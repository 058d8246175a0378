use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use summary_core::evaluation::{length_statistics, retrieval_accuracy, ID_PREFIX_LEN};
use summary_core::fhir::{load_conditions, load_patients};
use summary_core::summary::build_patient_summaries;
use summary_core::tokenizer::{StopWordList, TokenPattern, TokenizerOptions};
use summary_core::{IndexOptions, RetrievalIndex, SummaryStore, TopK};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build patient summaries from FHIR exports and query them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load FHIR NDJSON, write the summary CSV, evaluate and run demo queries
    Build {
        /// Directory containing MimicPatient.ndjson.gz and MimicCondition.ndjson.gz
        #[arg(long, env = "FHIR_DIR", default_value = "../mimic_iv_demo/mimic-iv-clinical-database-demo-on-fhir-2.1.0/fhir")]
        fhir_dir: PathBuf,
        /// Output CSV path
        #[arg(long, default_value = "./data/patient_summaries.csv")]
        output: PathBuf,
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Report retrieval accuracy and length statistics for a summary CSV
    Evaluate {
        #[arg(long, env = "SUMMARIES_CSV", default_value = "./data/patient_summaries.csv")]
        summaries: PathBuf,
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Rank summaries against a free-text query
    Query {
        #[arg(long, env = "SUMMARIES_CSV", default_value = "./data/patient_summaries.csv")]
        summaries: PathBuf,
        /// Query text
        #[arg(long)]
        q: String,
        /// Number of results; negative values are rejected
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        k: i64,
        #[command(flatten)]
        index: IndexArgs,
    },
}

#[derive(Args)]
struct IndexArgs {
    /// Token pattern: alphabetic or word
    #[arg(long, default_value_t = TokenPattern::Alphabetic)]
    token_pattern: TokenPattern,
    /// Stop word list: english or none
    #[arg(long, default_value = "english")]
    stop_words: StopWordList,
    /// Use 1 + ln(tf) term frequencies
    #[arg(long, default_value_t = false)]
    sublinear_tf: bool,
    /// Extra stop words, comma-separated
    #[arg(long, value_delimiter = ',')]
    extra_stop_words: Vec<String>,
    /// Strip accents before tokenizing
    #[arg(long, default_value_t = false)]
    strip_accents: bool,
    /// Apply English stemming to tokens
    #[arg(long, default_value_t = false)]
    stem: bool,
}

impl IndexArgs {
    fn options(&self) -> IndexOptions {
        IndexOptions {
            tokenizer: TokenizerOptions {
                pattern: self.token_pattern,
                stop_words: self.stop_words,
                extra_stop_words: self.extra_stop_words.clone(),
                strip_accents: self.strip_accents,
                stem: self.stem,
            },
            sublinear_tf: self.sublinear_tf,
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { fhir_dir, output, index } => build(&fhir_dir, &output, &index.options()),
        Commands::Evaluate { summaries, index } => {
            let store = SummaryStore::load_csv(&summaries)?;
            evaluate(&store, &index.options());
            Ok(())
        }
        Commands::Query { summaries, q, k, index } => {
            let store = SummaryStore::load_csv(&summaries)?;
            let top_k = TopK::try_from(k)?;
            let retrieval = RetrievalIndex::build(store.documents().map(str::to_string), &index.options());
            for hit in retrieval.query(&q, top_k) {
                let pid = store.at(hit.doc_id).map(|e| e.patient_id.as_str()).unwrap_or("unknown");
                println!("{:.4}\t{}\t{}", hit.score, pid, hit.document);
            }
            Ok(())
        }
    }
}

fn build(fhir_dir: &Path, output: &Path, options: &IndexOptions) -> Result<()> {
    if !fhir_dir.exists() {
        anyhow::bail!(
            "FHIR directory not found at {}. Set FHIR_DIR to the directory containing the NDJSON files.",
            fhir_dir.display()
        );
    }
    tracing::info!(dir = %fhir_dir.display(), "loading FHIR resources");
    let patients = load_patients(fhir_dir)?;
    tracing::info!(patients = patients.len(), "loaded patients");
    let conditions = load_conditions(fhir_dir)?;
    tracing::info!(patients = conditions.len(), "loaded condition lists");

    let store = build_patient_summaries(&patients, &conditions);
    tracing::info!(summaries = store.len(), "generated summaries");
    store
        .save_csv(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(output = %output.display(), "summaries saved");

    evaluate(&store, options);

    let retrieval = RetrievalIndex::build(store.documents().map(str::to_string), options);
    let mut queries = vec!["heart failure".to_string()];
    if let Some(first) = patients.first() {
        queries.push(first.id.chars().take(ID_PREFIX_LEN).collect());
    }
    queries.push("pneumonia diabetes".to_string());

    println!("\nExample queries:");
    for q in &queries {
        let best = retrieval
            .query(q, TopK::default())
            .first()
            .map(|hit| hit.document)
            .unwrap_or("No result");
        println!("\nQuery: {q}\nSummary: {best}\n");
    }
    Ok(())
}

fn evaluate(store: &SummaryStore, options: &IndexOptions) {
    let accuracy = retrieval_accuracy(store, options);
    println!("Retrieval accuracy (using patient ID prefix) = {:.2}%", accuracy * 100.0);
    let stats = length_statistics(store);
    println!(
        "Summary length statistics: min={:.0}, max={:.0}, mean={:.1} characters",
        stats.min, stats.max, stats.mean
    );
    tracing::debug!(stats = %serde_json::to_string(&stats).unwrap_or_default(), "length statistics");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_flags_reach_index_options() {
        let cli = Cli::try_parse_from([
            "indexer", "query", "--q", "asthma", "--extra-stop-words", "patient,Gender",
            "--strip-accents", "--stem", "--token-pattern", "word",
        ])
        .unwrap();
        let Commands::Query { index, .. } = cli.command else { panic!("expected query") };
        let opts = index.options();
        assert_eq!(opts.tokenizer.extra_stop_words, vec!["patient", "Gender"]);
        assert!(opts.tokenizer.strip_accents);
        assert!(opts.tokenizer.stem);
        assert_eq!(opts.tokenizer.pattern, TokenPattern::Word);
    }

    #[test]
    fn tokenizer_flags_default_off() {
        let cli = Cli::try_parse_from(["indexer", "evaluate"]).unwrap();
        let Commands::Evaluate { index, .. } = cli.command else { panic!("expected evaluate") };
        assert_eq!(index.options(), IndexOptions::default());
    }
}
