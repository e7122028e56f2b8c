use super::Host;
use crate::Result;
use crate::config::{CONFIG_FILE_NAME, Config};
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::bail;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output configuration file path
    #[arg(long, short = 'o', value_name = "PATH", default_value = CONFIG_FILE_NAME)]
    pub output: Utf8PathBuf,

    /// Overwrite the output file if it already exists
    #[arg(long)]
    pub force: bool,
}

pub fn init_config<H: Host>(host: &mut H, args: &InitArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!("'{}' already exists, use --force to overwrite it", args.output);
    }

    Config::save_default(&args.output)?;
    let _ = writeln!(host.output(), "Generated default configuration file: {}", args.output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::TestHost;

    fn output_in(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("hubtrack.toml")).unwrap()
    }

    #[test]
    fn writes_the_default_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let output = output_in(&dir);

        let mut host = TestHost::new();
        init_config(&mut host, &InitArgs { output: output.clone(), force: false }).unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, crate::config::DEFAULT_CONFIG_TOML);
        assert!(host.output_text().contains("Generated default configuration file"));
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let output = output_in(&dir);
        std::fs::write(&output, "concurrency = 2\n").unwrap();

        let mut host = TestHost::new();
        let err = init_config(&mut host, &InitArgs { output: output.clone(), force: false }).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "concurrency = 2\n");

        init_config(&mut host, &InitArgs { output: output.clone(), force: true }).unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), crate::config::DEFAULT_CONFIG_TOML);
    }
}
