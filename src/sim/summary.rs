//! Post-hoc frequency metrics computed from recorded channels.

use std::fmt;

use serde::Serialize;

use crate::engine::{ChannelRequest, ChannelTable};

/// Aggregate frequency response metrics derived from a complete run.
///
/// Computed post-hoc from the [`ChannelTable`] so the report always agrees
/// with the exported channel data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Nominal frequency the deviations refer to (Hz).
    pub nominal_hz: f64,
    /// Number of recorded samples.
    pub samples: usize,
    /// Time of the last sample (s).
    pub duration_s: f64,
    /// Lowest recorded frequency (Hz).
    pub nadir_hz: f64,
    /// Time of the lowest frequency (s).
    pub nadir_time_s: f64,
    /// Highest recorded frequency (Hz).
    pub peak_hz: f64,
    /// Largest rate of change of frequency magnitude (Hz/s).
    pub max_rocof_hz_per_s: f64,
    /// Last recorded frequency (Hz).
    pub final_hz: f64,
}

impl RunSummary {
    /// Computes the metrics from the system frequency channel.
    ///
    /// # Arguments
    ///
    /// * `table` - Channels read back after the run
    /// * `nominal_hz` - Nominal frequency, used when no frequency was recorded
    ///
    /// # Returns
    ///
    /// A `RunSummary`; without a frequency channel every frequency field
    /// equals `nominal_hz` and the RoCoF is zero.
    pub fn from_table(table: &ChannelTable, nominal_hz: f64) -> Self {
        let duration_s = table.time_s.last().copied().unwrap_or(0.0);
        let label = ChannelRequest::frequency().label();
        let freq = table.channel(&label).unwrap_or(&[]);

        let mut summary = Self {
            nominal_hz,
            samples: table.len(),
            duration_s,
            nadir_hz: nominal_hz,
            nadir_time_s: 0.0,
            peak_hz: nominal_hz,
            max_rocof_hz_per_s: 0.0,
            final_hz: nominal_hz,
        };
        let Some(&first) = freq.first() else {
            return summary;
        };

        summary.nadir_hz = first;
        summary.peak_hz = first;
        summary.nadir_time_s = table.time_s[0];
        for (i, &f) in freq.iter().enumerate() {
            if f < summary.nadir_hz {
                summary.nadir_hz = f;
                summary.nadir_time_s = table.time_s[i];
            }
            summary.peak_hz = summary.peak_hz.max(f);

            if i > 0 {
                let dt = table.time_s[i] - table.time_s[i - 1];
                if dt > 0.0 {
                    let rocof = ((f - freq[i - 1]) / dt).abs();
                    summary.max_rocof_hz_per_s = summary.max_rocof_hz_per_s.max(rocof);
                }
            }
        }
        summary.final_hz = freq[freq.len() - 1];
        summary
    }

    /// Largest deviation from nominal in either direction (Hz).
    pub fn max_deviation_hz(&self) -> f64 {
        (self.nominal_hz - self.nadir_hz).max(self.peak_hz - self.nominal_hz)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Frequency Summary ---")?;
        writeln!(f, "Samples:               {} over {:.3} s", self.samples, self.duration_s)?;
        writeln!(
            f,
            "Nadir:                 {:.4} Hz at t={:.3} s",
            self.nadir_hz, self.nadir_time_s
        )?;
        writeln!(f, "Peak:                  {:.4} Hz", self.peak_hz)?;
        writeln!(f, "Max deviation:         {:.4} Hz", self.max_deviation_hz())?;
        writeln!(f, "Max |RoCoF|:           {:.4} Hz/s", self.max_rocof_hz_per_s)?;
        write!(f, "Final frequency:       {:.4} Hz", self.final_hz)
    }
}
