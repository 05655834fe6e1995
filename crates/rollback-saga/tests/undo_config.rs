//! Integration tests for the configuration undo steps run with.

use std::time::Duration;

use rollback_core::{Backoff, RetryConfig, StepConfigs};
use rollback_harness::{HostError, MemoryHost};
use rollback_saga::{RollbackHandler, RollbackOptions, Saga, StepConfig, UndoConfig};

fn run_config() -> StepConfig {
    StepConfig::new()
        .with_retries(
            RetryConfig::new(4)
                .with_delay(Duration::from_millis(50))
                .with_backoff(Backoff::Linear),
        )
        .with_timeout(Duration::from_secs(10))
}

fn register_and_unwind(host: &MemoryHost, options: RollbackOptions) -> anyhow::Result<()> {
    let mut saga = Saga::new(host);
    saga.step_with_rollback(
        "provision",
        RollbackHandler::new(|| Ok(1_u8), |_: &HostError, _: &u8| Ok(())),
        options,
    )?;
    saga.rollback_all(&HostError::failed("boom"))?;
    Ok(())
}

#[test]
fn undo_inherits_run_config_by_default() -> anyhow::Result<()> {
    let host = MemoryHost::new();

    register_and_unwind(&host, RollbackOptions::new().with_config(run_config()))?;

    assert_eq!(host.log().config_of("provision"), Some(Some(run_config())));
    assert_eq!(
        host.log().config_of("Undo provision"),
        Some(Some(run_config()))
    );
    Ok(())
}

#[test]
fn undo_without_any_config_runs_unconfigured() -> anyhow::Result<()> {
    let host = MemoryHost::new();

    register_and_unwind(&host, RollbackOptions::new())?;

    assert_eq!(host.log().config_of("Undo provision"), Some(None));
    Ok(())
}

#[test]
fn explicit_undo_config_replaces_run_config() -> anyhow::Result<()> {
    let host = MemoryHost::new();
    let undo = StepConfig::new().with_timeout(Duration::from_secs(120));

    register_and_unwind(
        &host,
        RollbackOptions::new()
            .with_config(run_config())
            .with_undo(UndoConfig::Override(undo.clone())),
    )?;

    assert_eq!(host.log().config_of("provision"), Some(Some(run_config())));
    let used = host.log().config_of("Undo provision").flatten();
    assert_eq!(used, Some(undo));
    assert!(used.is_some_and(|c| c.retries.is_none()));
    Ok(())
}

#[test]
fn explicit_undo_config_applies_even_without_run_config() -> anyhow::Result<()> {
    let host = MemoryHost::new();
    let undo = StepConfig::new().with_retries(RetryConfig::new(1));

    register_and_unwind(
        &host,
        RollbackOptions::new().with_undo(UndoConfig::Override(undo.clone())),
    )?;

    assert_eq!(host.log().config_of("provision"), Some(None));
    assert_eq!(host.log().config_of("Undo provision"), Some(Some(undo)));
    Ok(())
}

#[test]
fn undo_retries_follow_undo_config() -> anyhow::Result<()> {
    let host = MemoryHost::new();
    let attempts = std::cell::Cell::new(0);
    let mut saga = Saga::new(&host);
    saga.step_with_rollback(
        "release ip",
        RollbackHandler::new(
            || Ok("10.0.0.7".to_string()),
            |_: &HostError, _: &String| {
                attempts.set(attempts.get() + 1);
                if attempts.get() < 3 {
                    Err(HostError::failed("api throttled"))
                } else {
                    Ok(())
                }
            },
        ),
        RollbackOptions::new().with_undo(UndoConfig::Override(
            StepConfig::new().with_retries(
                RetryConfig::new(5)
                    .with_delay(Duration::from_millis(100))
                    .with_backoff(Backoff::Exponential),
            ),
        )),
    )?;

    saga.rollback_all(&HostError::failed("boom"))?;

    assert_eq!(attempts.get(), 3);
    assert_eq!(
        host.log().retry_delays("Undo release ip"),
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
    Ok(())
}

#[test]
fn options_loaded_from_toml_drive_run_and_undo() -> anyhow::Result<()> {
    let configs = StepConfigs::from_toml_str(
        r#"
[steps.provision]
timeout-ms = 10000
retries = { limit = 2 }
undo = { timeout-ms = 60000 }
"#,
    )?;
    let host = MemoryHost::new();

    register_and_unwind(&host, configs.options("provision"))?;

    assert_eq!(
        host.log().config_of("provision").flatten(),
        Some(
            StepConfig::new()
                .with_retries(RetryConfig::new(2))
                .with_timeout(Duration::from_secs(10))
        )
    );
    assert_eq!(
        host.log().config_of("Undo provision").flatten(),
        Some(StepConfig::new().with_timeout(Duration::from_secs(60)))
    );
    Ok(())
}
