//! Interactive terminal chat over the Gemini web client
//!
//! Reads prompts from stdin and prints parsed answers. Slash commands cover
//! conversation management (reset, draft selection, share export, speech).

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use common::Config;
use gemini_web::{Answer, GeminiClient, GeminiClientBuilder};

#[derive(Parser)]
#[command(
    name = "gemini-chat",
    about = "Chat with the Gemini web front end from the terminal"
)]
struct Cli {
    /// __Secure-1PSID cookie value
    #[arg(long, env = "GEMINI_WEB_1PSID", hide_env_values = true)]
    token: Option<String>,

    /// Config file path (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Proxy URL for all requests
    #[arg(long)]
    proxy: Option<String>,

    /// Target language for answers
    #[arg(long)]
    language: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Conversation id to resume
    #[arg(long)]
    resume: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path).context("failed to load config file")?,
            None => Config::load().context("failed to load config")?,
        };
        if self.token.is_some() {
            config.token = self.token;
        }
        if self.proxy.is_some() {
            config.proxy = self.proxy;
        }
        if self.language.is_some() {
            config.language = self.language;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if self.resume.is_some() {
            config.conversation_id = self.resume;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Cli::parse().into_config()?;
    let mut client = GeminiClientBuilder::with_config(config)
        .build()
        .await
        .context("failed to establish a session")?;

    println!("Connected. Type a prompt, or /help for commands.");

    let stdin = io::stdin();
    let mut last_answer: Option<Answer> = None;

    loop {
        print!("you> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            if !run_command(command, &mut client, &mut last_answer).await? {
                break;
            }
            continue;
        }

        match client.ask(input).await {
            Ok(answer) => {
                print_answer(&answer);
                last_answer = Some(answer);
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }

    Ok(())
}

/// Returns false when the loop should stop.
async fn run_command(
    command: &str,
    client: &mut GeminiClient,
    last_answer: &mut Option<Answer>,
) -> Result<bool> {
    let (name, rest) = match command.split_once(' ') {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "exit" => return Ok(false),
        "help" => {
            println!("/new              start a new conversation");
            println!("/choices          list drafts of the last answer");
            println!("/pick <n>         continue from draft n");
            println!("/share [title]    export the last answer as a share link");
            println!("/speech <text>    synthesize speech into speech.ogg");
            println!("/state            show the conversation state");
            println!("/quit             leave");
        }
        "new" => {
            client.reset_conversation();
            println!("Started a new conversation.");
        }
        "state" => println!("{}", serde_json::to_string_pretty(client.state())?),
        "choices" => match last_answer {
            Some(answer) => {
                for (i, choice) in answer.choices.iter().enumerate() {
                    println!("[{i}] {}", choice.text().unwrap_or("<no text>"));
                }
            }
            None => println!("Nothing answered yet."),
        },
        "pick" => match last_answer {
            Some(answer) => match rest.parse::<usize>().ok().and_then(|i| answer.choices.get(i)) {
                Some(choice) => {
                    client.select_choice(choice.id.clone());
                    println!("Continuing from draft {rest}.");
                }
                None => println!("No such draft."),
            },
            None => println!("Nothing answered yet."),
        },
        "share" => match last_answer {
            Some(answer) => match client.export_conversation(answer, rest).await {
                Ok(exported) => println!("{}", exported.url),
                Err(e) => eprintln!("error: {e}"),
            },
            None => println!("Nothing answered yet."),
        },
        "speech" if !rest.is_empty() => match client.speech(rest, None).await {
            Ok(speech) => {
                std::fs::write("speech.ogg", &speech.audio)?;
                println!("Wrote speech.ogg ({} bytes).", speech.audio.len());
            }
            Err(e) => eprintln!("error: {e}"),
        },
        "speech" => println!("usage: /speech <text>"),
        _ => println!("Unknown command; try /help."),
    }
    Ok(true)
}

fn print_answer(answer: &Answer) {
    println!("\n{}\n", answer.content);

    if let (Some(lang), Some(code)) = (&answer.program_lang, &answer.code) {
        println!("--- code ({lang}) ---\n{code}\n---");
    }
    if !answer.links.is_empty() {
        println!("links:");
        for link in &answer.links {
            println!("  {link}");
        }
    }
    if !answer.images.is_empty() {
        println!("images:");
        for image in &answer.images {
            println!("  {image}");
        }
    }
    if answer.choices.len() > 1 {
        println!("({} drafts; /choices to list)", answer.choices.len());
    }
}
