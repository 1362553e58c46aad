use std::fmt;

pub const MICROS_PER_SEC: u32 = 1_000_000;
pub const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Resolution used to store timestamps in an output file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TsPrecision {
    #[default]
    Micro,
    Nano,
}

impl TsPrecision {
    /// Number of timestamp units per second
    #[inline]
    pub const fn units_per_sec(self) -> u64 {
        match self {
            TsPrecision::Micro => MICROS_PER_SEC as u64,
            TsPrecision::Nano => NANOS_PER_SEC as u64,
        }
    }

    /// Value of the pcap-ng `if_tsresol` option for this precision
    #[inline]
    pub const fn if_tsresol(self) -> u8 {
        match self {
            TsPrecision::Micro => 6,
            TsPrecision::Nano => 9,
        }
    }

    /// Smallest precision able to hold timestamps expressed in `units` per second.
    ///
    /// Resolutions that microseconds cannot represent exactly are mapped to `Nano`.
    pub fn from_units(units: u64) -> Self {
        let micros = u64::from(MICROS_PER_SEC);
        if units != 0 && units <= micros && micros % units == 0 {
            TsPrecision::Micro
        } else {
            TsPrecision::Nano
        }
    }
}

/// Capture timestamp: seconds since the epoch and a nanosecond fraction
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Timestamp {
    pub secs: u32,
    pub nanos: u32,
}

impl Timestamp {
    /// Build Timestamp from secs and nanos
    pub const fn new(secs: u32, nanos: u32) -> Self {
        Timestamp { secs, nanos }
    }

    /// Build a Timestamp from a fraction expressed in `units` per second.
    ///
    /// A fraction larger than one second is carried into `secs`.
    pub fn from_fraction(secs: u32, frac: u64, units: u64) -> Self {
        let units = units.max(1);
        if frac >= units {
            debug!("timestamp fraction {} exceeds {} units, carried into seconds", frac, units);
        }
        let secs = secs.wrapping_add((frac / units) as u32);
        let nanos = (u128::from(frac % units) * u128::from(NANOS_PER_SEC) / u128::from(units)) as u32;
        Timestamp { secs, nanos }
    }

    /// Build a Timestamp from a pcap-ng 64-bit counter of `units` per second,
    /// shifted by `offset` seconds.
    ///
    /// Returns `None` if the result does not fit in 32-bit seconds.
    pub fn from_units(ts: u64, units: u64, offset: i64) -> Option<Self> {
        let units = units.max(1);
        let secs = i64::try_from(ts / units).ok()?.checked_add(offset)?;
        let secs = u32::try_from(secs).ok()?;
        let nanos = (u128::from(ts % units) * u128::from(NANOS_PER_SEC) / u128::from(units)) as u32;
        Some(Timestamp { secs, nanos })
    }

    /// Sub-second part, in units of `precision`
    #[inline]
    pub fn fraction(self, precision: TsPrecision) -> u32 {
        match precision {
            TsPrecision::Micro => self.nanos / 1000,
            TsPrecision::Nano => self.nanos,
        }
    }

    /// Full timestamp as a counter of `units` per second
    pub fn to_units(self, units: u64) -> u64 {
        let frac = u128::from(self.nanos) * u128::from(units) / u128::from(NANOS_PER_SEC);
        u64::from(self.secs) * units + frac as u64
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}
