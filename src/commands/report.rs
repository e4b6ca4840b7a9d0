//! Report transaction handlers.

use super::{open_session, CommandResult, Context, OpenSession};
use anyhow::anyhow;
use hid_analyzer::selector::DeviceSelector;
use hid_analyzer_transport::hex;
use hid_analyzer_transport::SessionEvent;
use tokio::sync::broadcast::error::RecvError;

/// Arm the input receive loop and print the log until Ctrl-C
pub async fn monitor(ctx: &Context, selector: &DeviceSelector) -> CommandResult {
    let OpenSession {
        mut session,
        mut log,
        ..
    } = open_session(ctx, selector).await?;
    let mut events = session.subscribe();
    session.read_input()?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut fault = None;
    loop {
        tokio::select! {
            record = log.next() => match record {
                Some(record) => ctx.print(&record),
                None => break,
            },
            event = events.recv() => match event {
                Ok(SessionEvent::Faulted(reason)) => {
                    fault = Some(reason);
                    break;
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c => break,
        }
    }

    session.disconnect();
    ctx.print_all(log.drain());
    match fault {
        Some(reason) => Err(anyhow!(reason)),
        None => Ok(()),
    }
}

/// Send one output report
pub async fn write_output(
    ctx: &Context,
    selector: &DeviceSelector,
    report_id: u8,
    payload: &str,
) -> CommandResult {
    // Malformed text fails before the device is touched
    let payload = hex::decode(payload)?;

    let mut open = open_session(ctx, selector).await?;
    let result = open.session.write_output(report_id, &payload).await;
    close(ctx, &mut open);
    Ok(result?)
}

/// Read one feature report
pub async fn read_feature(ctx: &Context, selector: &DeviceSelector, report_id: u8) -> CommandResult {
    let mut open = open_session(ctx, selector).await?;
    let result = open.session.read_feature(report_id).await;
    close(ctx, &mut open);
    result?;
    Ok(())
}

/// Send one feature report
pub async fn write_feature(
    ctx: &Context,
    selector: &DeviceSelector,
    report_id: u8,
    payload: &str,
) -> CommandResult {
    let payload = hex::decode(payload)?;

    let mut open = open_session(ctx, selector).await?;
    let result = open.session.write_feature(report_id, &payload).await;
    close(ctx, &mut open);
    Ok(result?)
}

/// Disconnect and flush the transaction log
fn close(ctx: &Context, open: &mut OpenSession) {
    open.session.disconnect();
    ctx.print_all(open.log.drain());
}
