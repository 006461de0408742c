use std::io::{self, BufRead, Write};

/// Abstraction over user-facing output and prompts.
///
/// Command modules use this trait instead of `println!`/`eprintln!` so the
/// interactive commands (`--kill`, `--generate-config`) can be driven from
/// tests with scripted answers.
pub trait UserOutput: Send + Sync {
    /// Informational line (e.g., "id: 3f2a name: airflow_worker")
    fn status(&self, message: &str);

    /// Success message (e.g., "Created file: /srv/config.yaml")
    fn success(&self, message: &str);

    /// Warning message
    fn warning(&self, message: &str);

    /// A blank line separator.
    fn blank(&self);

    /// Print `message` without a newline and read one trimmed line of input.
    fn prompt(&self, message: &str) -> io::Result<String>;
}

/// Standard CLI output: stdout/stderr, answers read from stdin.
pub struct CliOutput;

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!("{}", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn blank(&self) {
        println!();
    }

    fn prompt(&self, message: &str) -> io::Result<String> {
        print!("{}", message);
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}
