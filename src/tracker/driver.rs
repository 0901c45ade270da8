use core::convert::Infallible;

use embassy_futures::select::{select, Either};
use embassy_time::Timer;

use super::{
    platform::{SensorPlatform, SystemClock},
    shared::SharedTracker,
};

/// Fires pulse-clears and walking checks at their deadlines so snapshots,
/// the cell and observers see the pulse drop and walking end without callers
/// ticking by hand.
///
/// Never returns; run it beside whatever feeds sensor samples. Any call on the
/// `SharedTracker` wakes it to re-read the earliest deadline.
pub async fn run_deferred<P: SensorPlatform>(
    shared: &SharedTracker<P, SystemClock>,
) -> Infallible {
    loop {
        let Some(deadline) = shared.next_deadline() else {
            shared.wait_rescheduled().await;
            continue;
        };

        match select(Timer::at(deadline), shared.wait_rescheduled()).await {
            Either::First(()) => {
                let result = shared.tick();
                if result.changed() {
                    log::debug!(
                        "step_fusion: deferred fired walking={} pulse={}",
                        result.after.walking,
                        result.after.step_pulse
                    );
                }
            }
            Either::Second(()) => {}
        }
    }
}
