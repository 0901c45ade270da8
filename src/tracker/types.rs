use core::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum SensorKind {
    Detector = 0,
    Counter = 1,
}

impl SensorKind {
    pub const ALL: [SensorKind; 2] = [SensorKind::Detector, SensorKind::Counter];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Detector => "detector",
            Self::Counter => "counter",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One raw event delivered by the platform sensor layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RawSensorSample {
    /// Total steps since device boot; resets on reboot.
    Counter { cumulative: u32 },
    /// A single detected step.
    Detector,
}

impl RawSensorSample {
    pub const fn kind(self) -> SensorKind {
        match self {
            Self::Counter { .. } => SensorKind::Counter,
            Self::Detector => SensorKind::Detector,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub struct SourceSet {
    bits: u8,
}

impl SourceSet {
    const DETECTOR_BIT: u8 = 1 << 0;
    const COUNTER_BIT: u8 = 1 << 1;
    const SUPPORTED_MASK: u8 = Self::DETECTOR_BIT | Self::COUNTER_BIT;

    pub const fn none() -> Self {
        Self { bits: 0 }
    }

    pub const fn both() -> Self {
        Self {
            bits: Self::SUPPORTED_MASK,
        }
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self {
            bits: bits & Self::SUPPORTED_MASK,
        }
    }

    pub const fn as_bits(self) -> u8 {
        self.bits
    }

    const fn bit(kind: SensorKind) -> u8 {
        match kind {
            SensorKind::Detector => Self::DETECTOR_BIT,
            SensorKind::Counter => Self::COUNTER_BIT,
        }
    }

    pub const fn with(self, kind: SensorKind) -> Self {
        Self {
            bits: self.bits | Self::bit(kind),
        }
    }

    pub const fn without(self, kind: SensorKind) -> Self {
        Self {
            bits: self.bits & !Self::bit(kind),
        }
    }

    pub const fn contains(self, kind: SensorKind) -> bool {
        self.bits & Self::bit(kind) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn iter(self) -> impl Iterator<Item = SensorKind> {
        SensorKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl fmt::Display for SourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for kind in self.iter() {
            if !first {
                f.write_str("+")?;
            }
            f.write_str(kind.label())?;
            first = false;
        }
        Ok(())
    }
}

/// Which step sources back the count. Informational only.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SensorMode {
    Hybrid,
    DetectorOnly,
    CounterOnly,
    NoSensor,
}

impl SensorMode {
    pub const fn from_sources(sources: SourceSet) -> Self {
        match (
            sources.contains(SensorKind::Detector),
            sources.contains(SensorKind::Counter),
        ) {
            (true, true) => Self::Hybrid,
            (true, false) => Self::DetectorOnly,
            (false, true) => Self::CounterOnly,
            (false, false) => Self::NoSensor,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Hybrid => "both",
            Self::DetectorOnly => "detector-only",
            Self::CounterOnly => "counter-only",
            Self::NoSensor => "none",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Hybrid => "Hybrid Mode (Counter + Detector)",
            Self::DetectorOnly => "Detector Only Mode",
            Self::CounterOnly => "Counter Only Mode",
            Self::NoSensor => "No Sensor Available",
        }
    }

    pub(crate) const fn as_u8(self) -> u8 {
        match self {
            Self::Hybrid => 0,
            Self::DetectorOnly => 1,
            Self::CounterOnly => 2,
            Self::NoSensor => 3,
        }
    }

    pub(crate) const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Hybrid),
            1 => Some(Self::DetectorOnly),
            2 => Some(Self::CounterOnly),
            3 => Some(Self::NoSensor),
            _ => None,
        }
    }
}

impl fmt::Display for SensorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SensorAccuracy {
    High,
    Medium,
    Low,
    NoContact,
    Unreliable,
    Unknown,
}

impl SensorAccuracy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::NoContact => "NO_CONTACT",
            Self::Unreliable => "UNRELIABLE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Where the published session total came from on the last dispatch.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum StepSource {
    #[default]
    None = 0,
    Detector = 1,
    Counter = 2,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum IgnoreReason {
    #[default]
    None = 0,
    NotTracking = 1,
    StaleTimeout = 2,
    AlreadyTracking = 3,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum TrackerStateId {
    #[default]
    Idle = 0,
    Still = 1,
    Walking = 2,
}

impl TrackerStateId {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Still => "still",
            Self::Walking => "walking",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeferredAction {
    ClearStepPulse,
    WalkingTimeout { generation: u64 },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrackerAction {
    Schedule {
        delay_ms: u64,
        action: DeferredAction,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActionBuffer {
    len: usize,
    slots: [Option<TrackerAction>; Self::MAX],
}

impl ActionBuffer {
    pub const MAX: usize = 4;

    pub const fn new() -> Self {
        Self {
            len: 0,
            slots: [None; Self::MAX],
        }
    }

    pub fn push(&mut self, action: TrackerAction) {
        if self.len >= Self::MAX {
            return;
        }
        self.slots[self.len] = Some(action);
        self.len += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackerAction> {
        self.slots[..self.len].iter().filter_map(Option::as_ref)
    }
}

impl Default for ActionBuffer {
    fn default() -> Self {
        Self::new()
    }
}
