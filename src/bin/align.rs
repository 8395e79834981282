//! Command line tool to align a tagged dataset with a subword tokenizer

use std::sync::Arc;

use anyhow::anyhow;
use burn::{backend::NdArray, data::dataset::Dataset as _};
use burn_subword::{
    datasets::tagged,
    pipelines::token_classification::{
        Aligner, AlignerConfig, Batcher, EmptyWordPolicy, TruncationPolicy,
    },
    tokenization::{PretrainedTokenizer, SubwordTokenizer},
    vocab::BpeTokenizer,
};
use pico_args::Arguments;

const HELP: &str = "\
Usage: align DATASET (--vocab FILE | --tokenizer FILE) [OPTIONS]

Arguments:
  DATASET              A CSV file with 'words' and 'tags' columns

Options:
  -h, --help           Print help
  -v, --vocab          A tokenizer written by the 'vocab' tool
  -t, --tokenizer      A Hugging Face tokenizer.json file
  -b, --batch-size     Batch size (defaults to 2)
  -m, --max-len        Maximum aligned length, markers included
  --truncate           Drop trailing words from over-long sentences instead of rejecting them
  --unknown            Use the unknown token for words without subwords instead of rejecting them
  --no-tag             The tag shown for positions without one (defaults to '-')
";

#[derive(Debug)]
struct Args {
    dataset: String,
    vocab: Option<String>,
    tokenizer: Option<String>,
    batch_size: Option<usize>,
    max_len: Option<usize>,
    truncate: bool,
    unknown: bool,
    no_tag: Option<String>,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            vocab: pargs.opt_value_from_str(["-v", "--vocab"])?,
            tokenizer: pargs.opt_value_from_str(["-t", "--tokenizer"])?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            max_len: pargs.opt_value_from_str(["-m", "--max-len"])?,
            truncate: pargs.contains("--truncate"),
            unknown: pargs.contains("--unknown"),
            no_tag: pargs.opt_value_from_str("--no-tag")?,
            dataset: pargs.free_from_str().map_err(|e| match e {
                pico_args::Error::MissingArgument => anyhow!("Missing required argument: DATASET"),
                _ => anyhow!("{}", e),
            })?,
        };

        Ok(Some(args))
    }

    fn aligner_config(&self) -> AlignerConfig {
        let mut config = AlignerConfig::new().with_max_seq_length(self.max_len);

        if self.truncate {
            config.truncation = TruncationPolicy::DropTrailingWords;
        }

        if self.unknown {
            config.empty_word = EmptyWordPolicy::Unknown;
        }

        config
    }
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let dataset = tagged::Dataset::load(&args.dataset)?;

    match (&args.vocab, &args.tokenizer) {
        (Some(vocab), None) => run(BpeTokenizer::load(vocab)?, &dataset, &args),
        (None, Some(tokenizer)) => run(PretrainedTokenizer::from_file(tokenizer)?, &dataset, &args),
        _ => Err(anyhow!("Pass exactly one of --vocab or --tokenizer")),
    }
}

fn run<Tok: SubwordTokenizer>(
    tokenizer: Tok,
    dataset: &tagged::Dataset,
    args: &Args,
) -> anyhow::Result<()> {
    let aligner = Arc::new(Aligner::new(tokenizer, args.aligner_config()));
    let labels = dataset.labels();
    let no_tag = args.no_tag.clone().unwrap_or_else(|| "-".to_string());
    let batch_size = args.batch_size.unwrap_or(2).max(1);

    // One past the last label, so untagged positions never look like a real class
    let no_tag_id = labels.len();
    let batcher =
        Batcher::<NdArray, Tok>::new(aligner.clone(), &labels, no_tag_id, Default::default());

    let items: Vec<tagged::Item> = dataset.iter().collect();
    let mut rejected = 0;

    for (number, chunk) in items.chunks(batch_size).enumerate() {
        let alignment = batcher.align(chunk);
        let batch = &alignment.batch;

        println!("=== Batch {} ({} x {}) ===", number, batch.len(), batch.seq_length);

        for row in 0..batch.len() {
            let tokens = aligner.tokenizer().ids_to_tokens(&batch.token_ids[row]);

            println!("- Sentence {}", number * batch_size + batch.indices[row]);
            for (position, token) in tokens.iter().enumerate() {
                let carrier = if batch.tag_mask[row][position] { "*" } else { " " };
                let present = if batch.attention_mask[row][position] { "" } else { " (pad)" };
                let tag = batch.tags[row][position]
                    .and_then(|id| batcher.id2label.get(&id))
                    .map_or(no_tag.as_str(), String::as_str);

                println!(
                    "  {:>3} {} {:<16} {}{}",
                    position, carrier, token, tag, present
                );
            }
        }

        for (index, error) in &alignment.rejected {
            println!("- Sentence {} rejected: {}", number * batch_size + index, error);
        }
        rejected += alignment.rejected.len();

        let tensors = batcher.train_batch(&alignment);
        println!("  tensors: {:?}", tensors.targets.dims());
    }

    println!(
        "\nAligned {} of {} sentences with {} labels",
        items.len() - rejected,
        items.len(),
        labels.len()
    );

    Ok(())
}
