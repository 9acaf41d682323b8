use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::style::{Color, Stylize};
use crossterm::terminal::{Clear, ClearType};
use dx_core::{Conversation, DiagnosisService, EngineConfig, Reply};
use std::io::{self, stdin, stdout, Write};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let service = match EngineConfig::resolve(config_path.as_deref())
        .and_then(|config| DiagnosisService::from_config(&config))
    {
        Ok(service) => service,
        Err(e) => {
            eprintln!("{} {e}", "[ERROR]".with(Color::Red).bold());
            eprintln!("Please check that the data files exist and are readable.");
            return ExitCode::FAILURE;
        }
    };

    let report = service.report();
    println!(
        "{}",
        format!(
            "Model ready: {} diseases, {} symptoms, hold-out accuracy {:.2}",
            report.class_counts.len(),
            service.vocabulary().len(),
            report.accuracy
        )
        .with(Color::DarkGrey)
    );

    match run(&service) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "[ERROR]".with(Color::Red).bold());
            ExitCode::FAILURE
        }
    }
}

fn run(service: &DiagnosisService) -> io::Result<()> {
    let mut conversation = Conversation::new();
    print_banner();
    print_replies(&conversation.opening())?;

    let mut input = String::new();
    while !conversation.is_finished() {
        print!("{}", "> ".with(Color::Cyan));
        stdout().flush()?;

        input.clear();
        if stdin().read_line(&mut input)? == 0 {
            break; // EOF
        }
        let line = input.trim();
        if line.eq_ignore_ascii_case("clear") {
            execute!(stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
        }
        print_replies(&conversation.handle(service, line))?;
    }
    Ok(())
}

fn print_banner() {
    let rule = "=".repeat(60);
    println!("{}", rule.as_str().with(Color::Cyan));
    println!("{}", "MEDICAL DIAGNOSIS ASSISTANT".with(Color::DarkCyan).bold());
    println!("{}", "Educational use only. Not a substitute for a doctor.".with(Color::Yellow));
    println!("{}", rule.as_str().with(Color::Cyan));
}

fn print_replies(replies: &[Reply]) -> io::Result<()> {
    let mut out = stdout().lock();
    for reply in replies {
        let text = reply.text();
        match reply {
            Reply::Prompt { .. } => writeln!(out, "{}", text.with(Color::Green))?,
            Reply::Report { .. } => writeln!(out, "{text}")?,
            Reply::NeedSymptoms { .. } => writeln!(out, "{}", text.with(Color::Yellow))?,
            Reply::Error { .. } => writeln!(out, "{}", text.with(Color::Red))?,
            Reply::Farewell { .. } => writeln!(out, "{}", text.with(Color::Magenta).bold())?,
            Reply::Saved { .. } => writeln!(out, "{}", text.with(Color::DarkGreen))?,
            Reply::Notice { .. } | Reply::Help { .. } | Reply::SymptomList { .. } => {
                writeln!(out, "{text}")?
            }
        }
    }
    out.flush()
}
