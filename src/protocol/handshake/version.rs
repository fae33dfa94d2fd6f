//! Product version exchanged during the handshake.

use std::fmt;

/// Build type carried in a packed version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BuildType {
    /// Production build
    Production = 0,
    /// Engineering build
    Engineering = 1,
    /// Beta build
    Beta = 2,
}

impl BuildType {
    /// Decode a build type nibble. Unknown values are treated as engineering builds.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => BuildType::Production,
            2 => BuildType::Beta,
            _ => BuildType::Engineering,
        }
    }
}

/// Product edition carried in a packed version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Edition {
    /// Evaluation edition
    Evaluation = 0,
    /// Community edition
    Community = 1,
    /// Enterprise edition
    Enterprise = 2,
    /// Developer edition
    Developer = 3,
}

impl Edition {
    /// Decode an edition nibble. Unknown values are treated as community.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Edition::Evaluation,
            2 => Edition::Enterprise,
            3 => Edition::Developer,
            _ => Edition::Community,
        }
    }
}

/// Client or server product version.
///
/// Packed into an `i64` as:
/// - major in bits 0..8
/// - minor in bits 8..16
/// - update in bits 16..24
/// - hotfix in bits 24..32
/// - build number in bits 40..48
/// - build type in bits 44..48
/// - edition in bits 48..52
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Update number
    pub update: u8,
    /// Hotfix number
    pub hotfix: u8,
    /// Build number
    pub build_no: u16,
    /// Build type
    pub build_type: BuildType,
    /// Edition
    pub edition: Edition,
}

impl ProductVersion {
    /// Version this client speaks.
    pub const CLIENT: ProductVersion = ProductVersion {
        major: 3,
        minor: 0,
        update: 0,
        hotfix: 0,
        build_no: 39,
        build_type: BuildType::Production,
        edition: Edition::Enterprise,
    };

    /// Pack into the wire representation.
    pub fn to_i64(self) -> i64 {
        let mut packed = self.major as i64;
        packed |= (self.minor as i64) << 8;
        packed |= (self.update as i64) << 16;
        packed |= (self.hotfix as i64) << 24;
        packed |= (self.build_no as i64) << 40;
        packed |= (self.build_type as i64) << 44;
        packed |= (self.edition as i64) << 48;
        packed
    }

    /// Unpack from the wire representation.
    pub fn from_i64(packed: i64) -> Self {
        Self {
            major: (packed & 0xFF) as u8,
            minor: ((packed >> 8) & 0xFF) as u8,
            update: ((packed >> 16) & 0xFF) as u8,
            hotfix: ((packed >> 24) & 0xFF) as u8,
            build_no: ((packed >> 40) & 0xFF) as u16,
            build_type: BuildType::from_u8(((packed >> 44) & 0x0F) as u8),
            edition: Edition::from_u8(((packed >> 48) & 0x0F) as u8),
        }
    }

    /// Check whether two versions can talk to each other.
    ///
    /// Major, minor and update must match; hotfix and build are ignored.
    pub fn is_compatible_with(&self, other: &ProductVersion) -> bool {
        self.major == other.major && self.minor == other.minor && self.update == other.update
    }
}

impl fmt::Display for ProductVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{} (build {})",
            self.major, self.minor, self.update, self.hotfix, self.build_no
        )
    }
}
