//! # Mechanisms Equipment Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Leg joints, left leg first, ordered hip to ankle.
pub const LEG_JOINT_IDS: [JointId; 12] = [
    JointId::LeftHipYaw,
    JointId::LeftHipRoll,
    JointId::LeftHipPitch,
    JointId::LeftKnee,
    JointId::LeftAnklePitch,
    JointId::LeftAnkleRoll,
    JointId::RightHipYaw,
    JointId::RightHipRoll,
    JointId::RightHipPitch,
    JointId::RightKnee,
    JointId::RightAnklePitch,
    JointId::RightAnkleRoll,
];

/// Arm joints.
pub const ARM_JOINT_IDS: [JointId; 4] = [
    JointId::LeftShoulder,
    JointId::LeftElbow,
    JointId::RightShoulder,
    JointId::RightElbow,
];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands that are pushed to the actuator dispatcher, one frame per control tick.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MechDems {
    /// The demanded position of each joint.
    ///
    /// Units: degrees
    pub pos_deg: HashMap<JointId, f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of all joints available on the robot
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum JointId {
    LeftHipYaw,
    LeftHipRoll,
    LeftHipPitch,
    LeftKnee,
    LeftAnklePitch,
    LeftAnkleRoll,
    RightHipYaw,
    RightHipRoll,
    RightHipPitch,
    RightKnee,
    RightAnklePitch,
    RightAnkleRoll,
    LeftShoulder,
    LeftElbow,
    RightShoulder,
    RightElbow,
    HeadYaw,
    HeadPitch,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl MechDems {
    /// Create a frame holding every leg and arm joint at zero.
    pub fn zeroed() -> Self {
        let pos_deg = LEG_JOINT_IDS
            .iter()
            .chain(ARM_JOINT_IDS.iter())
            .map(|id| (*id, 0.0))
            .collect();

        Self { pos_deg }
    }

    /// Returns true if every leg joint has a demand.
    pub fn has_all_legs(&self) -> bool {
        LEG_JOINT_IDS.iter().all(|id| self.pos_deg.contains_key(id))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zeroed() {
        let dems = MechDems::zeroed();

        assert!(dems.has_all_legs());
        assert_eq!(dems.pos_deg.len(), 16);
        assert!(!dems.pos_deg.contains_key(&JointId::HeadYaw));
        assert!(!MechDems::default().has_all_legs());
    }

    #[test]
    fn test_json_keys() {
        let mut dems = MechDems::default();
        dems.pos_deg.insert(JointId::LeftKnee, 42.5);

        let json = serde_json::to_string(&dems).unwrap();
        assert_eq!(json, r#"{"pos_deg":{"LeftKnee":42.5}}"#);

        let back: MechDems = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dems);
    }
}
