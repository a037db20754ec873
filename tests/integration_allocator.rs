mod common;

use common::generator;
use transient_sim::error::AllocError;
use transient_sim::model::{AreaId, GeneratorId};
use transient_sim::sim::allocator::{CapacityAllocator, TransferRequest};

fn target(plan: &transient_sim::sim::allocator::AllocationPlan, bus: u32) -> f64 {
    plan.target_mw(&GeneratorId::new(bus, "1"))
        .unwrap_or(f64::NAN)
}

#[test]
fn local_area_takes_increase_when_it_has_room() {
    let fleet = vec![
        generator(1, 1, 100.0, 150.0),
        generator(2, 1, 80.0, 80.0),
        generator(3, 2, 200.0, 400.0),
    ];
    let plan = CapacityAllocator::default()
        .allocate(&fleet, &TransferRequest::new(AreaId(1), 40.0))
        .unwrap();

    assert!((target(&plan, 1) - 140.0).abs() < 1e-9);
    assert_eq!(target(&plan, 2), 80.0);
    assert_eq!(target(&plan, 3), 200.0, "rest of system untouched");
}

#[test]
fn shortfall_without_rest_of_system() {
    let fleet = vec![generator(1, 1, 100.0, 150.0), generator(2, 1, 80.0, 80.0)];
    match CapacityAllocator::default().allocate(&fleet, &TransferRequest::new(AreaId(1), 60.0)) {
        Err(AllocError::CapacityExceeded { shortfall_mw, plan }) => {
            assert!((shortfall_mw - 10.0).abs() < 1e-9);
            assert_eq!(target(&plan, 1), 150.0);
            assert_eq!(target(&plan, 2), 80.0);
        }
        other => panic!("expected CapacityExceeded, got {other:?}"),
    }
}

#[test]
fn spill_to_rest_when_local_saturates() {
    let fleet = vec![
        generator(1, 1, 100.0, 150.0),
        generator(2, 1, 80.0, 80.0),
        generator(3, 2, 200.0, 400.0),
        generator(4, 2, 50.0, 100.0),
    ];
    let plan = CapacityAllocator::default()
        .allocate(&fleet, &TransferRequest::new(AreaId(1), 100.0))
        .unwrap();

    assert_eq!(target(&plan, 1), 150.0);
    // residual 50 over rest headroom 200 : 50
    assert!((target(&plan, 3) - 240.0).abs() < 1e-9);
    assert!((target(&plan, 4) - 60.0).abs() < 1e-9);
    assert!((plan.realized_mw - 100.0).abs() < 1e-9);
}

#[test]
fn decrease_spills_to_rest_and_saturates_at_zero() {
    let fleet = vec![generator(1, 1, 20.0, 150.0), generator(3, 2, 50.0, 400.0)];
    let plan = CapacityAllocator::default()
        .allocate(&fleet, &TransferRequest::new(AreaId(1), -50.0))
        .unwrap();
    assert_eq!(target(&plan, 1), 0.0);
    assert!((target(&plan, 3) - 20.0).abs() < 1e-9);
}

#[test]
fn insufficient_rest_saturates_everyone() {
    let fleet = vec![generator(1, 1, 20.0, 150.0), generator(3, 2, 50.0, 400.0)];
    let err = CapacityAllocator::default()
        .allocate(&fleet, &TransferRequest::new(AreaId(2), -100.0))
        .unwrap_err();
    let AllocError::CapacityExceeded { shortfall_mw, plan } = err else {
        panic!("expected CapacityExceeded");
    };
    assert!((shortfall_mw - 30.0).abs() < 1e-9);
    assert!(plan.adjustments.iter().all(|a| a.to_mw == 0.0));
}

#[test]
fn zero_delta_returns_current_state() {
    let fleet = vec![generator(1, 1, 100.0, 150.0), generator(3, 2, 200.0, 400.0)];
    let plan = CapacityAllocator::default()
        .allocate(&fleet, &TransferRequest::new(AreaId(1), 0.0))
        .unwrap();
    for (a, g) in plan.adjustments.iter().zip(&fleet) {
        assert_eq!(a.to_mw, g.p_mw);
    }
}

#[test]
fn area_without_machines_spreads_over_rest() {
    let fleet = vec![generator(1, 1, 100.0, 150.0)];
    let plan = CapacityAllocator::default()
        .allocate(&fleet, &TransferRequest::new(AreaId(14), 10.0))
        .unwrap();
    assert!((target(&plan, 1) - 110.0).abs() < 1e-9);
}

#[test]
fn nan_delta_is_rejected() {
    let fleet = vec![generator(1, 1, 100.0, 150.0)];
    assert!(matches!(
        CapacityAllocator::default().allocate(&fleet, &TransferRequest::new(AreaId(1), f64::NAN)),
        Err(AllocError::InvalidRequest { .. })
    ));
}
