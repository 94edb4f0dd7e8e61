//! Connectivity probe, independent of any conversion run.
//!
//! The prober shares no state with [`crate::session::ConversionSession`], so a
//! probe may overlap a run. Two probes on the same prober may not overlap:
//! the second is refused with [`ConnectivityError::AlreadyProbing`].

use crate::client::ConversionService;
use crate::error::ConnectivityError;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct ConnectivityProber {
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when the probe resolves or is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ConnectivityProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a probe is outstanding; UIs use it to disable the trigger.
    pub fn is_probing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Ask `service` whether it is up.
    pub async fn probe(&self, service: &dyn ConversionService) -> Result<(), ConnectivityError> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Err(ConnectivityError::AlreadyProbing);
        }
        let _guard = InFlight(&self.in_flight);

        info!("Testing connection to conversion service");
        match service.probe().await {
            Ok(()) => {
                info!("Conversion service is reachable");
                Ok(())
            }
            Err(e) => {
                let err = ConnectivityError::from(e);
                warn!("Connectivity probe failed: {}", err);
                Err(err)
            }
        }
    }
}
