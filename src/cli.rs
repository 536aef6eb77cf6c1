use clap::{Args, Parser, Subcommand};
use ytsum::config::Overrides;
use ytsum::summarize::PromptStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "ytsum",
    about = "YouTube transcript summarizer",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub openai_api_key: Option<String>,

    /// Anthropic API key (for claude-* models)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true, global = true)]
    pub anthropic_api_key: Option<String>,

    /// Preferred caption language
    #[arg(short, long, global = true)]
    pub lang: Option<String>,

    /// Show settings and progress on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the web UI and JSON API
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Print the transcript of a video
    Transcript {
        /// YouTube video URL or video ID
        url: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Fetch a transcript and print its summary
    Summarize {
        /// YouTube video URL or video ID
        url: String,

        /// Print the summary as HTML, with fenced code in <pre><code>
        #[arg(long)]
        html: bool,

        #[command(flatten)]
        llm: LlmArgs,
    },
}

#[derive(Args, Debug, Default)]
pub struct LlmArgs {
    /// LLM model for summarization
    #[arg(long)]
    pub model: Option<String>,

    /// Ceiling for the completion token budget
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Prompt style
    #[arg(long, value_enum)]
    pub prompt: Option<PromptStyle>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        let mut overrides = Overrides {
            lang: self.lang.clone(),
            ..Overrides::default()
        };

        let llm = match &self.command {
            Command::Serve { host, port, llm } => {
                overrides.host = host.clone();
                overrides.port = *port;
                Some(llm)
            }
            Command::Summarize { llm, .. } => Some(llm),
            Command::Transcript { .. } => None,
        };

        if let Some(llm) = llm {
            overrides.model = llm.model.clone();
            overrides.max_tokens = llm.max_tokens;
            overrides.prompt_style = llm.prompt;
        }

        overrides
    }
}
