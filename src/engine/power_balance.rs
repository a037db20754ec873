//! Lumped system power balance for the swing model.

/// Computes the accelerating power of the lumped system.
///
/// Load is frequency dependent: a one-per-unit frequency rise scales the
/// load by `1 + load_damping`.
///
/// # Arguments
///
/// * `pmech_mw` - Total mechanical power of in-service machines (MW)
/// * `load_mw` - Total connected load at nominal frequency (MW)
/// * `load_damping` - Load frequency sensitivity (p.u./p.u.)
/// * `freq_dev_pu` - Frequency deviation from nominal (p.u.)
///
/// # Returns
///
/// Accelerating power in MW (positive = frequency rising)
pub fn accelerating_power_mw(
    pmech_mw: f64,
    load_mw: f64,
    load_damping: f64,
    freq_dev_pu: f64,
) -> f64 {
    pmech_mw - load_mw * (1.0 + load_damping * freq_dev_pu)
}

/// Steady-state governor target for one machine under droop control.
///
/// A frequency drop raises the target by `mbase / droop` MW per p.u.;
/// the result is clamped to `[0, p_max]`.
pub fn droop_target_mw(
    setpoint_mw: f64,
    p_max_mw: f64,
    mbase_mva: f64,
    droop: f64,
    freq_dev_pu: f64,
) -> f64 {
    let response = if droop > 0.0 {
        -freq_dev_pu * mbase_mva / droop
    } else {
        0.0
    };
    (setpoint_mw + response).clamp(0.0, p_max_mw)
}
