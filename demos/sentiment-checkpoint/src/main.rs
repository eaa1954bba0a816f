mod logger;
mod model;
mod vocab;

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use ember_params::ParameterCollection;
use ember_store::{Config, Packer, PackerConfig};
use log::LevelFilter;

use crate::model::{SentimentConfig, SentimentModel};
use crate::vocab::Vocabulary;

/// Key of the whole model in the metadata file.
const MODEL_KEY: &str = "sentiment";
/// Key of the standalone copy of the embedding table.
const EMBEDDINGS_KEY: &str = "embeddings";

const CORPUS: &[&str] = &[
    "the movie was a delight from start to finish",
    "a dull and tedious film with no heart",
    "the cast is great but the story is thin",
    "not the worst film of the year but close",
    "an honest and moving portrait of a family",
    "the jokes fall flat and the pacing drags",
];

#[derive(Parser, Debug)]
#[command(about = "Save, reload and inspect checkpoints of a sentiment model")]
struct Args {
    /// Log at debug level.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a model and save it.
    Save {
        /// Data file of the checkpoint.
        #[arg(long)]
        path: PathBuf,

        /// Maximum number of words in the vocabulary.
        #[arg(long, default_value_t = 10_000)]
        vocab_size: usize,

        /// Fractional digits of the saved values, shortest exact form when not set.
        #[arg(long)]
        precision: Option<usize>,
    },
    /// Reload a saved model and score the corpus.
    Load {
        #[arg(long)]
        path: PathBuf,
    },
    /// Print the entries of the metadata file.
    Inspect {
        #[arg(long)]
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let level = match args.verbose {
        true => LevelFilter::Debug,
        false => LevelFilter::Info,
    };
    logger::init_log(level)?;

    match args.command {
        Command::Save {
            path,
            vocab_size,
            precision,
        } => save(&path, vocab_size, precision),
        Command::Load { path } => load(&path),
        Command::Inspect { path } => inspect(&path),
    }
}

fn config_path(path: &Path) -> PathBuf {
    path.with_extension("json")
}

fn save(path: &Path, vocab_size: usize, precision: Option<usize>) -> Result<(), Box<dyn Error>> {
    let vocab = Vocabulary::from_corpus(CORPUS.iter().copied(), vocab_size);
    let config = SentimentConfig::new(vocab.len());
    config.save(config_path(path))?;

    let mut pc = ParameterCollection::new();
    let mut sentiment = pc.add_subcollection(MODEL_KEY);
    let model = SentimentModel::new(&mut sentiment, &config);
    model.initialize(42)?;

    let mut packer_config = PackerConfig::new(path.to_path_buf());
    if let Some(precision) = precision {
        packer_config = packer_config.with_float_precision(precision);
    }
    let mut packer = Packer::from_config(&packer_config);

    packer.save_collection(&sentiment, MODEL_KEY, false)?;
    packer.save_lookup_parameter(&model.embeddings, EMBEDDINGS_KEY, true)?;

    log::info!(
        "Saved {} parameters ({} values) of a {} words model to {}",
        sentiment.len(),
        sentiment.num_params(),
        vocab.len(),
        packer.data_path().display()
    );

    Ok(())
}

fn load(path: &Path) -> Result<(), Box<dyn Error>> {
    let config = SentimentConfig::load(config_path(path))?;
    let vocab = Vocabulary::from_corpus(CORPUS.iter().copied(), config.vocab_size);
    let packer = Packer::new(path);

    let mut pc = ParameterCollection::new();
    let mut sentiment = pc.add_subcollection(MODEL_KEY);
    packer.populate_collection(&mut sentiment, MODEL_KEY)?;
    let model = SentimentModel::from_collection(&sentiment, &config)?;

    let mut check = ParameterCollection::new().add_subcollection(MODEL_KEY);
    let nested = packer.load_lookup_parameter_nested(
        &mut check,
        MODEL_KEY,
        &format!("{}embeddings", sentiment.namespace()),
    )?;
    packer.populate_lookup_parameter(&nested, EMBEDDINGS_KEY)?;
    if nested.all_values() != model.embeddings.all_values() {
        return Err("Standalone embedding table differs from the model's".into());
    }

    log::info!(
        "Loaded {} parameters with a {} rows embedding table",
        sentiment.len(),
        model.embeddings.rows()
    );

    for sentence in CORPUS {
        let ids: Vec<usize> = sentence.split_whitespace().map(|w| vocab.id(w)).collect();
        let scores = model.scores(&ids)?;
        let tag = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(tag, _)| tag)
            .unwrap_or_default();
        let unknown = ids
            .iter()
            .filter(|id| vocab.word(**id) == Some(vocab::UNKNOWN))
            .count();

        println!("{tag} ({unknown} unknown) {sentence}");
    }

    Ok(())
}

fn inspect(path: &Path) -> Result<(), Box<dyn Error>> {
    let packer = Packer::new(path);

    for entry in packer.index().entries()? {
        println!("{} @ {}", entry.key, entry.offset);
        for (key, offset) in entry.children.iter() {
            println!("    {key} @ {offset}");
        }
    }

    Ok(())
}
