//! Command line tool to train a subword vocabulary

use std::fs;

use anyhow::anyhow;
use burn_subword::vocab::{BpeTokenizer, Trainer, TrainerConfig};
use pico_args::Arguments;

const HELP: &str = "\
Usage: vocab CORPUS [OPTIONS]

Arguments:
  CORPUS                 A text file of whitespace-separated words

Options:
  -h, --help             Print help
  -s, --vocab-size       Target number of pieces (defaults to 1000)
  -o, --output           Where to write the tokenizer (defaults to 'tokenizer.json')
  -f, --min-frequency    Stop once no pair occurs this often (defaults to 2)
  --show-corpus          Print the corpus as pieces after training
";

#[derive(Debug)]
struct Args {
    corpus: String,
    vocab_size: Option<usize>,
    output: Option<String>,
    min_frequency: Option<usize>,
    show_corpus: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            vocab_size: pargs.opt_value_from_str(["-s", "--vocab-size"])?,
            output: pargs.opt_value_from_str(["-o", "--output"])?,
            min_frequency: pargs.opt_value_from_str(["-f", "--min-frequency"])?,
            show_corpus: pargs.contains("--show-corpus"),
            corpus: pargs.free_from_str().map_err(|e| match e {
                pico_args::Error::MissingArgument => anyhow!("Missing required argument: CORPUS"),
                _ => anyhow!("{}", e),
            })?,
        };

        Ok(Some(args))
    }
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let text = fs::read_to_string(&args.corpus)
        .map_err(|e| anyhow!("Unable to read corpus {}: {}", args.corpus, e))?;

    let mut config = TrainerConfig::new(args.vocab_size.unwrap_or(1000));
    if let Some(min_frequency) = args.min_frequency {
        config.min_frequency = min_frequency;
    }

    let training = Trainer::new(config).train(text.split_whitespace());

    if args.show_corpus {
        for pieces in &training.corpus {
            let rendered: Vec<String> = pieces.iter().map(|p| p.to_string()).collect();
            println!("{}", rendered.join(" "));
        }
    }

    println!(
        "Learned {} merges, {} pieces",
        training.merges.len(),
        training.vocab.len()
    );

    let output = args.output.unwrap_or_else(|| "tokenizer.json".to_string());
    let tokenizer = BpeTokenizer::from(training);
    tokenizer.save(&output)?;

    println!("Saved tokenizer to {}", output);

    Ok(())
}
