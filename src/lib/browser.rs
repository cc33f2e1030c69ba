use std::{
    io,
    process::{Command, Stdio},
};

pub trait Browser {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Opens URLs with a configured command (e.g. `firefox --new-tab`), or the
/// platform's default opener when none is set.
#[derive(Debug, Clone, Default)]
pub struct SystemBrowser {
    command: Option<String>,
}

impl SystemBrowser {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }

    fn program(&self) -> (String, Vec<String>) {
        let parts: Vec<String> = self
            .command
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        if let Some((program, args)) = parts.split_first() {
            return (program.clone(), args.to_vec());
        }
        #[cfg(target_os = "macos")]
        return ("open".to_owned(), Vec::new());
        #[cfg(target_os = "windows")]
        return (
            "cmd".to_owned(),
            vec!["/C".to_owned(), "start".to_owned(), String::new()],
        );
        #[cfg(all(not(target_os = "macos"), not(target_os = "windows")))]
        return ("xdg-open".to_owned(), Vec::new());
    }
}

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        let (program, args) = self.program();
        let status = Command::new(&program)
            .args(&args)
            .arg(url)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!("{program} exited with {status}")))
        }
    }
}
