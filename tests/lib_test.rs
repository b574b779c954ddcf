//! Library integration tests.

use pipewave::PipewaveError;

#[test]
fn error_types_are_public() {
    let err = PipewaveError::UnknownStep {
        id: "ghost".into(),
    };
    assert!(err.to_string().contains("ghost"));
    assert!(err.is_configuration_error());
}

#[test]
fn result_type_alias_is_public() {
    fn test_fn() -> pipewave::Result<()> {
        Ok(())
    }
    assert!(test_fn().is_ok());
}

#[test]
fn cli_types_are_public() {
    use clap::Parser;
    use pipewave::cli::{Cli, Commands};

    let cli = Cli::parse_from(["pipewave", "list", "--json"]);

    if let Some(Commands::List(args)) = cli.command {
        assert!(args.json);
    } else {
        panic!("Expected List command");
    }
}

#[test]
fn run_config_defaults_match_pipeline_policy() {
    let config = pipewave::RunConfig::default();
    assert_eq!(config.max_parallel_steps, 3);
    assert_eq!(config.default_timeout, std::time::Duration::from_secs(1800));
    assert!(config.continue_on_error);
    assert!(config.retry_failed_steps);
    assert_eq!(config.max_retries, 2);
    assert_eq!(config.max_failed_steps, None);
}
