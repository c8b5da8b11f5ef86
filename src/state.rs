//! Raw runner observations and their fixed-size feature encoding.

/// One upcoming obstacle as reported by the game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    /// Horizontal distance from the agent
    pub x_pos: f32,
    pub y_pos: f32,
    pub width: f32,
    pub height: f32,
}

/// Raw environment observation for one control tick. Immutable once read.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerState {
    /// Upcoming obstacles, nearest first. Only the first [TRACKED_OBSTACLES] are encoded.
    pub obstacles: Vec<Obstacle>,
    pub jumping: bool,
    /// The agent's current vertical position
    pub y_pos: f32,
    /// Game-time in milliseconds, monotonically increasing within an episode
    pub timestamp: f64,
    pub done: bool,
}

/// Number of one-hot "distance bucket" slots per obstacle.
pub const DISTANCE_BUCKETS: usize = 40;
/// One obstacle block: distance buckets plus y-position, width and height.
pub const OBSTACLE_BLOCK: usize = DISTANCE_BUCKETS + 3;
/// Number of obstacle blocks in the feature layout.
pub const TRACKED_OBSTACLES: usize = 2;
/// Two obstacle blocks followed by the jumping flag and the agent's y-position.
pub const FEATURE_SIZE: usize = TRACKED_OBSTACLES * OBSTACLE_BLOCK + 2;

pub type FeatureVector = [f32; FEATURE_SIZE];

const BUCKET_ORIGIN: f32 = 19.0;
const BUCKET_WIDTH: f32 = 16.0;

/// Quantizes an obstacle's horizontal position into one of [DISTANCE_BUCKETS]
/// buckets. Saturates at both ends - positions beyond the last bucket map to it
/// instead of wrapping.
fn distance_bucket(x_pos: f32) -> usize {
    let raw = ((x_pos - BUCKET_ORIGIN) / BUCKET_WIDTH).floor();
    raw.clamp(0.0, (DISTANCE_BUCKETS - 1) as f32) as usize
}

/// Encodes a raw observation into the fixed-length feature vector the models
/// consume.
///
/// Pure and total: identical states always yield bit-identical vectors, and a
/// state with fewer than [TRACKED_OBSTACLES] obstacles simply leaves the unused
/// blocks all-zero.
pub fn encode(state: &RunnerState) -> FeatureVector {
    let mut features = [0.0_f32; FEATURE_SIZE];

    for (i, obstacle) in state.obstacles.iter().take(TRACKED_OBSTACLES).enumerate() {
        let offset = i * OBSTACLE_BLOCK;
        features[offset + distance_bucket(obstacle.x_pos)] = 1.0;
        features[offset + DISTANCE_BUCKETS] = obstacle.y_pos;
        features[offset + DISTANCE_BUCKETS + 1] = obstacle.width;
        features[offset + DISTANCE_BUCKETS + 2] = obstacle.height;
    }

    features[FEATURE_SIZE - 2] = if state.jumping { 1.0 } else { 0.0 };
    features[FEATURE_SIZE - 1] = state.y_pos;
    features
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn state_with_obstacles(obstacles: Vec<Obstacle>) -> RunnerState {
        RunnerState {
            obstacles,
            jumping: true,
            y_pos: 93.0,
            timestamp: 1000.0,
            done: false,
        }
    }

    fn obstacle_at(x_pos: f32) -> Obstacle {
        Obstacle {
            x_pos,
            y_pos: 50.0,
            width: 17.0,
            height: 35.0,
        }
    }

    #[rstest]
    #[case(-200.0, 0)]
    #[case(0.0, 0)]
    #[case(19.0, 0)]
    #[case(34.9, 0)]
    #[case(35.0, 1)]
    #[case(19.0 + 16.0 * 39.0, 39)]
    #[case(19.0 + 16.0 * 40.0, 39)]
    #[case(10_000.0, 39)]
    fn distance_bucket_saturates(
        #[case] x_pos: f32,
        #[case] expected: usize,
    ) {
        assert_eq!(distance_bucket(x_pos), expected);
    }

    #[test]
    fn encodes_one_hot_bucket_and_numeric_fields() {
        let state = state_with_obstacles(vec![obstacle_at(100.0)]);
        let features = encode(&state);

        // (100 - 19) / 16 = 5.06 -> bucket 5
        assert_eq!(features[5], 1.0);
        assert_eq!(features[..DISTANCE_BUCKETS].iter().sum::<f32>(), 1.0);
        assert_eq!(features[DISTANCE_BUCKETS], 50.0);
        assert_eq!(features[DISTANCE_BUCKETS + 1], 17.0);
        assert_eq!(features[DISTANCE_BUCKETS + 2], 35.0);
    }

    #[test]
    fn second_obstacle_lands_in_second_block() {
        let state = state_with_obstacles(vec![obstacle_at(19.0), obstacle_at(300.0)]);
        let features = encode(&state);

        assert_eq!(features[0], 1.0);
        // (300 - 19) / 16 = 17.56 -> bucket 17 of the second block
        assert_eq!(features[OBSTACLE_BLOCK + 17], 1.0);
        assert_eq!(features[OBSTACLE_BLOCK + DISTANCE_BUCKETS], 50.0);
    }

    #[test]
    fn missing_obstacles_leave_blocks_zero() {
        let state = state_with_obstacles(vec![]);
        let features = encode(&state);

        assert!(features[..TRACKED_OBSTACLES * OBSTACLE_BLOCK].iter().all(|&v| v == 0.0));
        assert_eq!(features[FEATURE_SIZE - 2], 1.0);
        assert_eq!(features[FEATURE_SIZE - 1], 93.0);
    }

    #[test]
    fn obstacles_beyond_the_tracked_count_are_ignored() {
        let state = state_with_obstacles(vec![obstacle_at(19.0), obstacle_at(35.0), obstacle_at(600.0)]);
        let features = encode(&state);

        let one_hot_bits = features[..TRACKED_OBSTACLES * OBSTACLE_BLOCK]
            .iter()
            .filter(|&&v| v == 1.0)
            .count();
        assert_eq!(one_hot_bits, 2);
    }

    #[test]
    fn encoding_is_deterministic() {
        let state = state_with_obstacles(vec![obstacle_at(123.4), obstacle_at(456.7)]);
        assert_eq!(encode(&state), encode(&state));
    }
}
