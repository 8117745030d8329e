use nix::time::{clock_gettime, ClockId};
use std::time::Duration;

#[repr(transparent)]
#[derive(
    Ord, PartialOrd, Eq, PartialEq, Copy, Clone, serde::Serialize, serde::Deserialize, Debug,
)]
pub(crate) struct Timestamp(u32);

#[cfg(target_os = "linux")]
const REALTIME_CLOCK: ClockId = ClockId::CLOCK_REALTIME_COARSE;

#[cfg(not(target_os = "linux"))]
const REALTIME_CLOCK: ClockId = ClockId::CLOCK_REALTIME;

impl Timestamp {
    pub fn now() -> Self {
        // as u32 only causes problems after Sun 07 Feb 2106 07:28:15 AM CET
        let secs = clock_gettime(REALTIME_CLOCK)
            .expect("realtime clock is always available")
            .tv_sec();
        Self(secs as u32)
    }

    #[cfg(test)]
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    pub fn bottoming_sub(self, rhs: Self) -> Self {
        Self(self.0.checked_sub(rhs.0).unwrap_or(0))
    }

    pub fn elapsed_since(self, earlier: Self) -> Duration {
        Duration::from_secs(u64::from(self.bottoming_sub(earlier).0))
    }
}
