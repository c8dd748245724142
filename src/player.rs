use std::process::{Command, Stdio};
use std::thread;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

pub const URL_PLACEHOLDER: &str = "%URL%";

/// Expands a configured command template into program + arguments. The URL
/// is appended when the template has no placeholder.
pub fn build_command(template: &[String], url: &str) -> Result<(String, Vec<String>)> {
    let Some((program, rest)) = template.split_first() else {
        return Err(anyhow!("player command is empty"));
    };
    if program.trim().is_empty() {
        return Err(anyhow!("player command is empty"));
    }
    if url.trim().is_empty() {
        return Err(anyhow!("video URL missing"));
    }

    let mut substituted = false;
    let mut args: Vec<String> = rest
        .iter()
        .map(|arg| {
            if arg.contains(URL_PLACEHOLDER) {
                substituted = true;
                arg.replace(URL_PLACEHOLDER, url)
            } else {
                arg.clone()
            }
        })
        .collect();
    if !substituted {
        args.push(url.to_string());
    }
    Ok((program.clone(), args))
}

/// Launches the player with null stdio so it cannot scribble over the UI.
/// With `detach` the child is reaped on a background thread; otherwise this
/// waits for it to exit.
pub fn launch(template: &[String], url: &str, detach: bool) -> Result<()> {
    let (program, args) = build_command(template, url)?;
    debug!(%program, ?args, "launching player");

    let mut command = Command::new(&program);
    command
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let mut child = command
        .spawn()
        .with_context(|| format!("launch {program} to play {url}"))?;

    if detach {
        thread::spawn(move || {
            if let Err(err) = child.wait() {
                warn!(error = %err, "player wait failed");
            }
        });
        return Ok(());
    }

    let status = child
        .wait()
        .with_context(|| format!("wait for {program}"))?;
    if !status.success() {
        return Err(anyhow!("{program} exited with status {status}"));
    }
    Ok(())
}
