//! Tunables shared by the layout, path helper, points manager and train followers.

use serde::{Deserialize, Serialize};

use crate::error::TrackError;

const RAIL_HEIGHT_M: f64 = 0.005;
pub const NODE_TOLERANCE_M: f64 = 0.001;
pub const ARC_TOLERANCE_M: f64 = 0.001;
const MAX_MOVE_ITERATIONS: usize = 100;
const CLOSEST_POINT_SAMPLES: usize = 30;
const CLOSEST_POINT_REFINE_STEPS: usize = 10;
const POINT_ANIMATION_SECS: f64 = 0.3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackConfig {
    /// Height every vehicle is pinned to, regardless of node heights.
    pub rail_height_m: f64,
    /// Two connectors closer than this share a graph node.
    pub node_tolerance_m: f64,
    /// Slack allowed when checking that a point lies on a circle.
    pub arc_tolerance_m: f64,
    /// Upper bound of edge hops processed by a single `move_by` call.
    pub max_move_iterations: usize,
    /// Coarse samples per edge in nearest point queries.
    pub closest_point_samples: usize,
    /// Sub-steps of the refining pass around the coarse best sample.
    pub closest_point_refine_steps: usize,
    /// Duration of the cosmetic blade animation of a point.
    pub point_animation_secs: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            rail_height_m: RAIL_HEIGHT_M,
            node_tolerance_m: NODE_TOLERANCE_M,
            arc_tolerance_m: ARC_TOLERANCE_M,
            max_move_iterations: MAX_MOVE_ITERATIONS,
            closest_point_samples: CLOSEST_POINT_SAMPLES,
            closest_point_refine_steps: CLOSEST_POINT_REFINE_STEPS,
            point_animation_secs: POINT_ANIMATION_SECS,
        }
    }
}

impl TrackConfig {
    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, TrackError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TrackError> {
        let positive = |field: &'static str, value: f64| {
            if value.is_finite() && 0. < value {
                Ok(())
            } else {
                Err(TrackError::InvalidConfig {
                    field,
                    reason: format!("must be a positive number, got {value}"),
                })
            }
        };
        positive("nodeToleranceM", self.node_tolerance_m)?;
        positive("arcToleranceM", self.arc_tolerance_m)?;
        positive("pointAnimationSecs", self.point_animation_secs)?;
        if !self.rail_height_m.is_finite() {
            return Err(TrackError::InvalidConfig {
                field: "railHeightM",
                reason: "must be finite".to_string(),
            });
        }
        for (field, value) in [
            ("maxMoveIterations", self.max_move_iterations),
            ("closestPointSamples", self.closest_point_samples),
            ("closestPointRefineSteps", self.closest_point_refine_steps),
        ] {
            if value == 0 {
                return Err(TrackError::InvalidConfig {
                    field,
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }
}
