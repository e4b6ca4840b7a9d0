//! Interactive shell.
//!
//! Commands are read from stdin while the transaction log keeps printing.
//! Transfers run as tasks so a write waiting on its timeout never holds up
//! received input reports.

use std::io::stdout;
use std::sync::Arc;

use super::{open_session, CommandResult, Context, OpenSession};
use crossterm::{cursor, execute, terminal};
use hid_analyzer::command_line::{ShellCommand, HELP};
use hid_analyzer::selector::DeviceSelector;
use hid_analyzer::table;
use hid_analyzer_transport::{DeviceSession, EventSink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::warn;

pub async fn shell(ctx: &Context, selector: &DeviceSelector) -> CommandResult {
    let OpenSession {
        session,
        sink,
        mut log,
    } = open_session(ctx, selector).await?;
    let session = Arc::new(session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut transfers = JoinSet::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("Type 'help' for commands.");
    loop {
        tokio::select! {
            record = log.next() => match record {
                Some(record) => ctx.print(&record),
                None => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let command = match ShellCommand::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        sink.error(e.to_string());
                        continue;
                    }
                };
                match command {
                    ShellCommand::Quit => break,
                    ShellCommand::Help => println!("{HELP}"),
                    ShellCommand::Clear => {
                        execute!(
                            stdout(),
                            terminal::Clear(terminal::ClearType::All),
                            cursor::MoveTo(0, 0)
                        )?;
                    }
                    ShellCommand::Info => {
                        for line in table::describe(session.descriptor(), session.capabilities()) {
                            println!("{line}");
                        }
                    }
                    ShellCommand::ReadInput => {
                        if let Err(e) = session.read_input() {
                            sink.error(e.to_string());
                        }
                    }
                    transfer => {
                        transfers.spawn(run_transfer(Arc::clone(&session), sink.clone(), transfer));
                    }
                }
            }
            Some(done) = transfers.join_next() => {
                if let Err(e) = done {
                    warn!("Transfer task failed: {}", e);
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    transfers.shutdown().await;
    if let Ok(mut session) = Arc::try_unwrap(session) {
        session.disconnect();
    }
    ctx.print_all(log.drain());
    Ok(())
}

/// Run one output/feature transfer, logging its failure
async fn run_transfer(session: Arc<DeviceSession>, sink: EventSink, command: ShellCommand) {
    let result = match command {
        ShellCommand::WriteOutput { report_id, payload } => {
            session.write_output(report_id, &payload).await
        }
        ShellCommand::ReadFeature { report_id } => session.read_feature(report_id).await.map(|_| ()),
        ShellCommand::WriteFeature { report_id, payload } => {
            session.write_feature(report_id, &payload).await
        }
        _ => Ok(()),
    };
    if let Err(e) = result {
        sink.error(e.to_string());
    }
}
