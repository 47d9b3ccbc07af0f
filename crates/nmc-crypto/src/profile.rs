use std::num::NonZeroU32;

/// The fixed secrets a device firmware expects inside the envelope.
///
/// NMC firmware derives the KEK from the constant password `user` with 5000 PBKDF2-SHA256
/// iterations. This is a property of the device and is intentionally weak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    /// PBKDF2 password for the KEK.
    pub kek_password: &'static str,
    /// PBKDF2 iteration count for the KEK.
    pub kek_iterations: NonZeroU32,
}

impl DeviceProfile {
    /// Profile accepted by APC network management cards.
    pub fn apc() -> Self {
        DeviceProfile {
            kek_password: "user",
            kek_iterations: NonZeroU32::new(5000).expect("Non-zero number"),
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::apc()
    }
}
