use chrono::Utc;
use medtriage_engine::{Engine, TriageReply, TriageRequest};
use medtriage_telemetry::EscalationKind;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

const HELP: &str = "Commands: /summary  /pattern  /escalate [type]  /resolve  /quit";

/// Reply as shown in the terminal
pub fn render(reply: &TriageReply) -> String {
    let mut out = String::new();
    if reply.tier > 0 {
        out.push_str(&format!("[tier {} · {}]\n", reply.tier, reply.kind.as_str()));
    }
    out.push_str(&reply.response);
    if !reply.follow_up.is_empty() {
        out.push('\n');
        for question in &reply.follow_up {
            out.push_str(&format!("\n  • {}", question));
        }
    }
    if !reply.quick_actions.is_empty() {
        let actions: Vec<String> = reply
            .quick_actions
            .iter()
            .map(|a| format!("[{}]", a))
            .collect();
        out.push_str(&format!("\n\n{}", actions.join(" ")));
    }
    out
}

enum Slash<'a> {
    Summary,
    Pattern,
    Escalate(Option<&'a str>),
    Resolve,
    Quit,
    Unknown,
}

fn parse_slash(line: &str) -> Option<Slash<'_>> {
    let rest = line.strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let command = match parts.next().unwrap_or_default() {
        "summary" => Slash::Summary,
        "pattern" => Slash::Pattern,
        "escalate" => Slash::Escalate(parts.next()),
        "resolve" => Slash::Resolve,
        "quit" | "exit" => Slash::Quit,
        _ => Slash::Unknown,
    };
    Some(command)
}

/// Returns false when the loop should stop
fn run_slash(engine: &Engine, user: &str, session: &str, command: Slash<'_>) -> anyhow::Result<bool> {
    match command {
        Slash::Summary => match engine.summary(user) {
            Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            None => println!("No conversation history"),
        },
        Slash::Pattern => {
            let days = engine.config().pattern_window_days;
            println!(
                "{}",
                serde_json::to_string_pretty(&engine.pattern(user, days))?
            );
        }
        Slash::Escalate(kind) => {
            let kind = match kind {
                Some(raw) => match raw.parse::<EscalationKind>() {
                    Ok(kind) => kind,
                    Err(e) => {
                        println!("{}", e);
                        return Ok(true);
                    }
                },
                None => EscalationKind::CallEmergency,
            };
            let entry = engine.escalate(user, session, kind, None)?;
            println!("Logged {} ({})", entry.id, entry.kind.as_str());
            println!("{}", engine.config().safety_banner());
        }
        Slash::Resolve => {
            if engine.deactivate(session)? {
                println!("Emergency session {} resolved", session);
            } else {
                println!("No emergency session open");
            }
        }
        Slash::Quit => return Ok(false),
        Slash::Unknown => println!("{}", HELP),
    }
    Ok(true)
}

pub async fn run(user: &str, session: Option<String>) -> anyhow::Result<()> {
    let (engine, _paths) = super::load_engine()?;
    let session =
        session.unwrap_or_else(|| format!("{}-{}", user, Utc::now().format("%Y%m%d%H%M%S")));

    println!("MedTriage - describe how you feel. This is not a diagnosis.");
    println!("In an emergency call {} now.", engine.config().emergency_number);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = parse_slash(line) {
            if !run_slash(&engine, user, &session, command)? {
                break;
            }
            continue;
        }

        // Ctrl-C abandons augmentation, not the reply
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let request = TriageRequest::new(user, line).with_session(session.as_str());
        let reply = engine.handle_with_cancel(&request, &cancel).await;
        watcher.abort();

        println!("\n{}", render(&reply));
    }
    Ok(())
}
