// Line-oriented bridge for GUI front ends.
//
// stdin:  INPUT <text> | SYMPTOMS | SUGGEST <partial> | RESET | EXIT
// stdout: one JSON object per command. Logs go to stderr.
use dx_core::{Conversation, DiagnosisService, EngineConfig, Reply};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

const SUGGEST_LIMIT: usize = 10;

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event<'a> {
    Ready {
        diseases: usize,
        symptoms: usize,
        accuracy: f64,
    },
    Replies {
        state: dx_core::core::context::ConversationState,
        replies: Vec<Reply>,
    },
    Symptoms {
        symptoms: Vec<&'a str>,
    },
    Suggestions {
        partial: &'a str,
        symptoms: Vec<&'a str>,
    },
    Error {
        message: String,
    },
}

fn emit(out: &mut impl Write, event: &Event<'_>) -> io::Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    writeln!(out)?;
    out.flush()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let service = match EngineConfig::resolve(config_path.as_deref())
        .and_then(|config| DiagnosisService::from_config(&config))
    {
        Ok(service) => service,
        Err(e) => {
            log::error!("Startup failed: {e}");
            let _ = emit(
                &mut io::stdout(),
                &Event::Error {
                    message: e.to_string(),
                },
            );
            return ExitCode::FAILURE;
        }
    };

    match serve(&service) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Bridge I/O failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn serve(service: &DiagnosisService) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    emit(
        &mut stdout,
        &Event::Ready {
            diseases: service.report().class_counts.len(),
            symptoms: service.vocabulary().len(),
            accuracy: service.report().accuracy,
        },
    )?;

    let mut conversation = Conversation::new();
    let opening = conversation.opening();
    emit(
        &mut stdout,
        &Event::Replies {
            state: conversation.state(),
            replies: opening,
        },
    )?;

    for line in stdin.lock().lines() {
        let line = line?;
        log::debug!("bridge <- {line:?}");
        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, rest),
            None => (line.as_str(), ""),
        };

        match command {
            "INPUT" => {
                let replies = conversation.handle(service, rest);
                emit(
                    &mut stdout,
                    &Event::Replies {
                        state: conversation.state(),
                        replies,
                    },
                )?;
            }
            "SYMPTOMS" => emit(
                &mut stdout,
                &Event::Symptoms {
                    symptoms: service.known_symptoms(),
                },
            )?,
            "SUGGEST" => emit(
                &mut stdout,
                &Event::Suggestions {
                    partial: rest,
                    symptoms: service.suggest(rest, SUGGEST_LIMIT),
                },
            )?,
            "RESET" => {
                conversation = Conversation::new();
                let replies = conversation.opening();
                emit(
                    &mut stdout,
                    &Event::Replies {
                        state: conversation.state(),
                        replies,
                    },
                )?;
            }
            "EXIT" => {
                log::info!("Received EXIT, shutting down.");
                break;
            }
            other => {
                log::warn!("Unknown bridge command {other:?}");
                emit(
                    &mut stdout,
                    &Event::Error {
                        message: format!("unknown command '{other}'"),
                    },
                )?;
            }
        }
    }
    Ok(())
}
