//! External command launching and child reaping.
//!
//! Commands are fire-and-forget: each spawn detaches into its own session
//! so launched programs survive the window manager. Exited children are
//! reaped with a non-blocking waitpid poll from the event loop; the poll
//! only collects already-terminated processes and never stalls.

use std::process::Command;

/// Spawn a command line, detached from our session. Failures are logged
/// and otherwise ignored; the window manager's state is unaffected.
pub fn spawn_detached(command: &str) {
    let expanded = shellexpand::tilde(command);
    let parts: Vec<&str> = expanded.split_whitespace().collect();

    let Some((program, args)) = parts.split_first() else {
        log::warn!("Refusing to spawn empty command");
        return;
    };

    log::info!("Spawning '{}'", command);

    let mut cmd = Command::new(program);
    cmd.args(args);

    // Detach into a new session so the child outlives us and never
    // shares our controlling terminal
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }
    }

    if let Err(e) = cmd.spawn() {
        log::error!("Failed to spawn '{}': {}", command, e);
    }
}

/// Reap any children that have already exited. Non-blocking: returns as
/// soon as no terminated child remains.
pub fn reap_children() {
    #[cfg(unix)]
    unsafe {
        loop {
            let pid = libc::waitpid(-1, std::ptr::null_mut(), libc::WNOHANG);
            if pid <= 0 {
                break;
            }
            log::debug!("Reaped child process {}", pid);
        }
    }
}
