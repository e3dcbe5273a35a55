//! End-to-end command sequence against the in-memory controller.

use charge_limiter::mock::{MemoryPersistence, MockConnector, MockSmc};
use charge_limiter::param::Selector;
use charge_limiter::service::Transition;
use charge_limiter::{ChargeLimit, ChargeLimitController, Error};

fn setup() -> (
    ChargeLimitController<MockConnector, MemoryPersistence>,
    MockSmc,
    MemoryPersistence,
) {
    let smc = MockSmc::with_register("CHWA", 0);
    let persistence = MemoryPersistence::default();
    let controller =
        ChargeLimitController::new(MockConnector::new(smc.clone()), persistence.clone())
            .with_privilege(true);
    (controller, smc, persistence)
}

fn saved(command: &[&str]) -> Option<Vec<String>> {
    Some(command.iter().map(|s| s.to_string()).collect())
}

#[test]
fn write_persist_write_unpersist() {
    let (controller, smc, persistence) = setup();

    controller.write(80).unwrap();
    assert_eq!(controller.read().unwrap(), ChargeLimit::Eighty);

    assert_eq!(controller.persist_current().unwrap(), Transition::Changed);
    assert!(persistence.is_active());
    assert_eq!(persistence.command(), saved(&["write", "80"]));

    controller.write(100).unwrap();
    assert_eq!(controller.read().unwrap(), ChargeLimit::Hundred);
    assert_eq!(persistence.command(), saved(&["write", "100"]));

    assert_eq!(controller.unpersist().unwrap(), Transition::Changed);
    assert!(!persistence.is_active());
    assert_eq!(persistence.command(), None);

    assert_eq!(smc.open_connections(), 0);
}

#[test]
fn every_call_goes_through_handle_event() {
    let (controller, smc, _) = setup();
    controller.write(80).unwrap();
    controller.read().unwrap();

    let calls = smc.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls
        .iter()
        .all(|call| call.selector == Selector::HandleEvent as u32));
    assert_eq!(calls[0].op, Selector::WriteKey as u8);
    assert_eq!(calls[1].op, Selector::ReadKey as u8);
}

#[test]
fn driver_rejection_is_not_the_privilege_precheck() {
    let (controller, smc, persistence) = setup();
    smc.set_privileged(false);

    assert!(matches!(controller.write(80), Err(Error::NotPrivileged)));
    assert_eq!(persistence.calls(), 0);
    assert_eq!(smc.open_connections(), 0);
}

#[test]
fn out_of_sync_error_names_applied_limit() {
    let (controller, _, persistence) = setup();
    controller.persist_current().unwrap();
    persistence.fail_updates(true);

    let err = controller.write(80).unwrap_err();
    assert!(err
        .to_string()
        .starts_with("charge limit set to 80 but the persisted command was not updated"));
}
