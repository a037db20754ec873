mod common;

use common::{Call, two_area_engine};
use transient_sim::error::{EngineError, SchedulerError};
use transient_sim::model::BusId;
use transient_sim::sim::event::{Event, EventSpec, KindCode};
use transient_sim::sim::scheduler::{EventScheduler, SchedulerState};

fn spec(time_s: f64, kind: KindCode, bus: u32) -> EventSpec {
    EventSpec {
        time_s,
        kind,
        bus: BusId(bus),
        to_bus: None,
        circuit: None,
        step_mw: None,
    }
}

#[test]
fn co_timed_events_share_one_advance_in_registration_order() {
    let mut engine = two_area_engine();
    let mut scheduler = EventScheduler::new();
    scheduler
        .register(Event::load_step(5.0, BusId(6500), 100.0))
        .unwrap();
    scheduler.register(Event::bus_trip(5.0, BusId(6500))).unwrap();

    let report = scheduler.run(10.0, &mut engine).unwrap();

    assert_eq!(engine.advances(), vec![5.0, 10.0]);
    assert_eq!(report.instants, vec![5.0]);
    assert_eq!(report.dispatched, 2);

    let calls = engine.calls();
    let last_load_write = calls
        .iter()
        .rposition(|c| matches!(c, Call::SetLoad(..)))
        .unwrap();
    let bus_trip = calls
        .iter()
        .position(|c| *c == Call::TripBus(BusId(6500)))
        .unwrap();
    assert!(last_load_write < bus_trip, "load step applied before bus trip: {calls:?}");
    // both records stepped by 100 / 2 before the bus went out
    assert_eq!(engine.load(6500, "1"), Some(90.0));
    assert_eq!(engine.load(6500, "2"), Some(110.0));
}

#[test]
fn load_step_is_split_evenly_over_fresh_values() {
    let mut engine = two_area_engine();
    let mut scheduler = EventScheduler::new();
    scheduler
        .register(Event::load_step(1.0, BusId(6500), 30.0))
        .unwrap();
    scheduler
        .register(Event::load_step(2.0, BusId(6500), 30.0))
        .unwrap();
    scheduler.run(3.0, &mut engine).unwrap();

    // 40 + 15 + 15, 60 + 15 + 15
    assert_eq!(engine.load(6500, "1"), Some(70.0));
    assert_eq!(engine.load(6500, "2"), Some(90.0));

    // every write is preceded by a read of the same load
    let calls = engine.calls();
    for (i, call) in calls.iter().enumerate() {
        if let Call::SetLoad(bus, id, _) = call {
            assert_eq!(calls[i - 1], Call::ReadLoad(*bus, id.clone()));
        }
    }
}

#[test]
fn branch_trip_endpoints_are_ordered() {
    let mut engine = two_area_engine();
    let mut scheduler = EventScheduler::new();
    scheduler
        .register(Event::branch_trip(0.5, BusId(6500), BusId(6000), "2"))
        .unwrap();
    scheduler.run(1.0, &mut engine).unwrap();

    assert!(
        engine
            .calls()
            .contains(&Call::TripBranch(BusId(6000), BusId(6500), "2".into()))
    );
}

#[test]
fn instants_run_in_time_order_regardless_of_registration() {
    let mut engine = two_area_engine();
    let mut scheduler = EventScheduler::new();
    for t in [3.0, 1.0, 2.0] {
        scheduler.register(Event::bus_trip(t, BusId(3))).unwrap();
    }
    let report = scheduler.run(4.0, &mut engine).unwrap();
    assert_eq!(report.instants, vec![1.0, 2.0, 3.0]);
    assert_eq!(engine.advances(), vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn unknown_kind_and_empty_bus_are_skipped_not_fatal() {
    let mut engine = two_area_engine();
    let mut scheduler = EventScheduler::new();
    scheduler
        .register_spec(spec(1.0, KindCode::Code(9), 6500))
        .unwrap();
    scheduler
        .register(Event::load_step(1.0, BusId(3), 20.0))
        .unwrap();
    scheduler
        .register(Event::load_step(1.0, BusId(6500), 20.0))
        .unwrap();

    let report = scheduler.run(2.0, &mut engine).unwrap();
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.skipped.len(), 2);
    assert!(matches!(
        report.skipped[0].reason,
        SchedulerError::UnknownEventKind { .. }
    ));
    assert!(matches!(
        report.skipped[1].reason,
        SchedulerError::NoLoadsAtBus { bus: BusId(3), .. }
    ));
    assert_eq!(engine.load(6500, "1"), Some(50.0));
}

#[test]
fn event_at_end_time_is_applied_before_final_advance() {
    let mut engine = two_area_engine();
    let mut scheduler = EventScheduler::new();
    scheduler.register(Event::bus_trip(2.0, BusId(3))).unwrap();
    scheduler.register(Event::bus_trip(2.5, BusId(1))).unwrap();

    let report = scheduler.run(2.0, &mut engine).unwrap();
    assert_eq!(
        engine.calls(),
        vec![Call::Advance(2.0), Call::TripBus(BusId(3)), Call::Advance(2.0)]
    );
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.not_reached.len(), 1);
    assert!(!engine.calls().contains(&Call::TripBus(BusId(1))));
}

#[test]
fn engine_failure_aborts_and_completes() {
    let mut engine = two_area_engine();
    engine.fail_at = Some(2.0);
    let mut scheduler = EventScheduler::new();
    scheduler.register(Event::bus_trip(1.0, BusId(3))).unwrap();
    scheduler.register(Event::bus_trip(2.0, BusId(1))).unwrap();

    let err = scheduler.run(5.0, &mut engine).unwrap_err();
    assert_eq!(
        err,
        SchedulerError::Engine(EngineError::NotConverged { time_s: 2.0 })
    );
    assert_eq!(scheduler.state(), SchedulerState::Completed);
    assert!(!engine.calls().contains(&Call::TripBus(BusId(1))));

    // locked until reset
    assert!(matches!(
        scheduler.register(Event::bus_trip(6.0, BusId(3))),
        Err(SchedulerError::Locked { .. })
    ));
    scheduler.reset();
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert!(scheduler.queue().is_empty());
}

#[test]
fn no_events_advances_straight_to_end() {
    let mut engine = two_area_engine();
    let report = EventScheduler::new().run(7.5, &mut engine).unwrap();
    assert_eq!(engine.advances(), vec![7.5]);
    assert!(report.instants.is_empty());
    assert_eq!(report.advances, 1);
}
