use clap::Parser;
use color_eyre::Result;
use engine::{
    DEFAULT_MODEL, DEFAULT_TRIGGER_WORD, Generator, PredictionClient, Prompt, RetryPolicy,
    Strategy,
    replicate::{ModelRef, Replicate},
};
use nonempty::NonEmpty;

/// Runs a single prediction against the real API and prints the image reference
#[derive(clap::Parser)]
struct Arg {
    #[arg(long, env = "REPLICATE_API_TOKEN", hide_env_values = true)]
    token: String,
    prompt: String,
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: ModelRef,
    /// Only use the given strategy instead of the usual fallback order
    #[arg(long)]
    strategy: Option<Strategy>,
    #[arg(long)]
    no_file_output: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;
    let Arg {
        token,
        prompt,
        model,
        strategy,
        no_file_output,
    } = Arg::parse();

    let policy = match strategy {
        Some(strategy) => RetryPolicy::new(NonEmpty::new(strategy)),
        None => RetryPolicy::default(),
    };
    let replicate = Replicate::new(token, model).with_file_output(!no_file_output);
    let generator = Generator::new(
        Box::new(PredictionClient::new(replicate, policy)),
        DEFAULT_TRIGGER_WORD,
    );

    let image = generator.generate(&Prompt::parse(Some(prompt))?).await?;
    println!("{}", image.summary());
    Ok(())
}
