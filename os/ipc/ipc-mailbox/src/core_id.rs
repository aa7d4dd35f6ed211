use core::fmt;

/// The processors taking part in the IPC fabric.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum CoreId {
    /// The application processor running the host OS.
    Host,
    /// The DSP; can stand in for the host when prototyping.
    Dsp,
    /// First M3 core of the IPU ("SysM3").
    Core0,
    /// Second M3 core of the IPU ("AppM3").
    Core1,
}

impl CoreId {
    pub const ALL: [Self; 4] = [Self::Host, Self::Dsp, Self::Core0, Self::Core1];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "HOST",
            Self::Dsp => "DSP",
            Self::Core0 => "CORE0",
            Self::Core1 => "CORE1",
        }
    }

    /// Whether this is one of the two IPU cores.
    #[must_use]
    pub const fn is_ipu(self) -> bool {
        matches!(self, Self::Core0 | Self::Core1)
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
