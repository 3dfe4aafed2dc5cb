/// Activity type as reported in the low 5 bits of the packed
/// `current_activity_type_intensity` field.
///
/// Values without a known meaning (7, 9 and anything above) are kept as
/// [`ActivityType::Unknown`] so downstream classification still sees them.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Undefined,
    Running,
    Cycling,
    Transition,
    FitnessEquipment,
    Swimming,
    Walking,
    Resting,
    Unknown(u8),
}

impl ActivityType {
    pub const RESTING_CODE: u8 = 8;

    pub fn code(self) -> u8 {
        match self {
            Self::Undefined => 0,
            Self::Running => 1,
            Self::Cycling => 2,
            Self::Transition => 3,
            Self::FitnessEquipment => 4,
            Self::Swimming => 5,
            Self::Walking => 6,
            Self::Resting => Self::RESTING_CODE,
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_resting(self) -> bool {
        matches!(self, Self::Resting)
    }
}

impl From<u8> for ActivityType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Undefined,
            1 => Self::Running,
            2 => Self::Cycling,
            3 => Self::Transition,
            4 => Self::FitnessEquipment,
            5 => Self::Swimming,
            6 => Self::Walking,
            Self::RESTING_CODE => Self::Resting,
            raw => Self::Unknown(raw),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActivityTypeIntensity {
    pub activity_type: ActivityType,
    /// Movement intensity, 0 (still) to 7.
    pub intensity: u8,
}

impl ActivityTypeIntensity {
    const TYPE_MASK: u8 = 0x1F;
    const INTENSITY_SHIFT: u8 = 5;
    const INTENSITY_MASK: u8 = 0x07;

    pub fn unpack(packed: u8) -> Self {
        Self {
            activity_type: ActivityType::from(packed & Self::TYPE_MASK),
            intensity: (packed >> Self::INTENSITY_SHIFT) & Self::INTENSITY_MASK,
        }
    }

    pub fn pack(self) -> u8 {
        (self.activity_type.code() & Self::TYPE_MASK)
            | ((self.intensity & Self::INTENSITY_MASK) << Self::INTENSITY_SHIFT)
    }
}
