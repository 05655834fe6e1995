//! Integration tests for compensation ordering and registration.

use std::cell::RefCell;

use rollback_harness::{HostError, MemoryHost};
use rollback_saga::{RollbackHandler, RollbackOptions, Saga};

fn undo_into(
    log: &RefCell<Vec<String>>,
) -> impl Fn(&HostError, &String) -> Result<(), HostError> + '_ {
    move |error, value| {
        log.borrow_mut().push(format!("undo({error}, {value})"));
        Ok(())
    }
}

fn register<'h>(
    saga: &mut Saga<'h, MemoryHost>,
    log: &'h RefCell<Vec<String>>,
    name: &str,
    value: &str,
) -> Result<String, HostError> {
    let value = value.to_string();
    saga.step_with_rollback(
        name,
        RollbackHandler::new(move || Ok(value.clone()), undo_into(log)),
        RollbackOptions::new(),
    )
}

#[test]
fn three_steps_then_failure_unwind_in_reverse() -> anyhow::Result<()> {
    let host = MemoryHost::new();
    let log = RefCell::new(Vec::new());
    let mut saga = Saga::new(&host);

    register(&mut saga, &log, "A", "a")?;
    register(&mut saga, &log, "B", "b")?;
    register(&mut saga, &log, "C", "c")?;
    let failure = saga
        .step::<(), _>("D", None, || Err(HostError::failed("D exploded")))
        .expect_err("D should fail");

    saga.rollback_all(&failure)?;

    assert_eq!(
        *log.borrow(),
        vec![
            "undo(D exploded, c)",
            "undo(D exploded, b)",
            "undo(D exploded, a)",
        ]
    );
    Ok(())
}

#[test]
fn undo_runs_as_durable_steps_in_lifo_order() -> anyhow::Result<()> {
    let host = MemoryHost::new();
    let log = RefCell::new(Vec::new());
    let mut saga = Saga::new(&host);

    for (name, value) in [("first", "1"), ("second", "2"), ("third", "3"), ("fourth", "4")] {
        register(&mut saga, &log, name, value)?;
    }
    saga.rollback_all(&HostError::failed("later step failed"))?;

    assert_eq!(
        host.log().executed_steps(),
        vec![
            "first",
            "second",
            "third",
            "fourth",
            "Undo fourth",
            "Undo third",
            "Undo second",
            "Undo first",
        ]
    );
    assert!(host.ledger().contains("Undo first"));
    Ok(())
}

#[test]
fn failed_run_is_never_compensated() -> anyhow::Result<()> {
    let host = MemoryHost::new();
    let log = RefCell::new(Vec::new());
    let mut saga = Saga::new(&host);

    register(&mut saga, &log, "reserve", "seat")?;
    let failure = saga
        .step_with_rollback(
            "charge",
            RollbackHandler::new(
                || -> Result<String, HostError> { Err(HostError::failed("card declined")) },
                undo_into(&log),
            ),
            RollbackOptions::new(),
        )
        .expect_err("charge should fail");

    assert_eq!(failure, HostError::failed("card declined"));
    assert_eq!(saga.pending_steps(), vec!["reserve"]);

    saga.rollback_all(&failure)?;

    assert_eq!(*log.borrow(), vec!["undo(card declined, seat)"]);
    assert_eq!(host.log().attempts("Undo charge"), 0);
    Ok(())
}

#[test]
fn run_error_propagates_unchanged() {
    let host = MemoryHost::new();
    let log = RefCell::new(Vec::new());
    let mut saga = Saga::new(&host);

    let result: Result<String, HostError> = saga.step_with_rollback(
        "fatal",
        RollbackHandler::new(
            || Err(HostError::non_retryable("invalid itinerary")),
            undo_into(&log),
        ),
        RollbackOptions::new(),
    );

    assert_eq!(result, Err(HostError::non_retryable("invalid itinerary")));
}

#[test]
fn pass_through_steps_leave_stack_untouched() -> anyhow::Result<()> {
    let host = MemoryHost::new();
    let log = RefCell::new(Vec::new());
    let mut saga = Saga::new(&host);

    let _: u32 = saga.step("lookup customer", None, || Ok(1))?;
    register(&mut saga, &log, "A", "a")?;
    let _: u32 = saga.step("send email", None, || Ok(2))?;
    let _: u32 = saga.step("audit", None, || Ok(3))?;
    register(&mut saga, &log, "B", "b")?;
    let _: String = saga.step("notify", None, || Ok("sent".to_string()))?;

    assert_eq!(saga.pending_steps(), vec!["A", "B"]);

    saga.rollback_all(&HostError::failed("boom"))?;

    assert_eq!(*log.borrow(), vec!["undo(boom, b)", "undo(boom, a)"]);
    Ok(())
}

#[test]
fn pass_through_errors_propagate_unchanged() {
    let host = MemoryHost::new();
    let saga = Saga::new(&host);

    let result: Result<u8, HostError> =
        saga.step("lookup", None, || Err(HostError::failed("not found")));

    assert_eq!(result, Err(HostError::failed("not found")));
    assert_eq!(saga.pending(), 0);
}

#[test]
fn duplicate_names_register_independent_records() -> anyhow::Result<()> {
    let host = MemoryHost::new();
    let log = RefCell::new(Vec::new());
    let mut saga = Saga::new(&host);

    register(&mut saga, &log, "charge", "first")?;
    // The host memoizes by name, so the second run replays the first result.
    let replayed = register(&mut saga, &log, "charge", "second")?;

    assert_eq!(replayed, "first");
    assert_eq!(saga.pending_steps(), vec!["charge", "charge"]);
    Ok(())
}

#[test]
fn trigger_error_may_be_a_plain_string() -> anyhow::Result<()> {
    struct StringHost;

    impl rollback_core::StepExecutor for StringHost {
        type Error = String;

        fn execute_step<T, F>(
            &self,
            _name: &str,
            _config: Option<&rollback_core::StepConfig>,
            mut action: F,
        ) -> Result<T, String>
        where
            T: serde::Serialize + serde::de::DeserializeOwned,
            F: FnMut() -> Result<T, String>,
        {
            action()
        }
    }

    let host = StringHost;
    let seen = RefCell::new(Vec::new());
    let mut saga = Saga::new(&host);
    saga.step_with_rollback(
        "write",
        RollbackHandler::new(
            || Ok(10_i64),
            |error: &String, value: &i64| {
                seen.borrow_mut().push(format!("{error}/{value}"));
                Ok(())
            },
        ),
        RollbackOptions::new(),
    )
    .map_err(anyhow::Error::msg)?;

    saga.rollback_all(&"raw string".to_string())
        .map_err(|e| anyhow::anyhow!("{e:?}"))?;

    assert_eq!(*seen.borrow(), vec!["raw string/10"]);
    Ok(())
}
