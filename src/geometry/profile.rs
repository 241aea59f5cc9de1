// Directional distances from the mark's center to the receipt's edges

use crate::vision::Region;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];
}

/// Pixel distances measured at the working scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceProfile {
    pub left: i32,
    pub right: i32,
    pub up: i32,
    pub down: i32,
}

impl DistanceProfile {
    pub fn new(left: i32, right: i32, up: i32, down: i32) -> Self {
        Self { left, right, up, down }
    }

    pub fn get(&self, direction: Direction) -> i32 {
        match direction {
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::Up => self.up,
            Direction::Down => self.down,
        }
    }
}

fn distance(a: (i32, i32), b: (i32, i32)) -> i32 {
    let dx = (a.0 - b.0) as f64;
    let dy = (a.1 - b.1) as f64;
    dx.hypot(dy) as i32
}

/// Build the profile of one receipt.
///
/// Left and right are measured horizontally to the border's vertical edges at
/// the mark's height, up to the border's top edge, and down to the top edge of
/// the white box. Both the submitted and every reference image must have been
/// brought to the same scale first, since raw pixel distances are compared.
pub fn build_profile(mark: Region, border: Region, white_box: Region) -> DistanceProfile {
    let center = mark.center();
    DistanceProfile {
        left: distance(center, (border.x, center.1)),
        right: distance(center, (border.right(), center.1)),
        up: distance(center, (center.0, border.y)),
        down: distance(center, (center.0, white_box.y)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_profile() {
        let mark = Region::new(130, 40, 40, 21).unwrap();
        let border = Region::new(0, 0, 300, 540).unwrap();
        let white_box = Region::new(30, 180, 240, 330).unwrap();

        // center (150, 50)
        let profile = build_profile(mark, border, white_box);
        assert_eq!(profile, DistanceProfile::new(150, 150, 50, 130));
    }

    #[test]
    fn test_white_box_above_center() {
        let mark = Region::new(10, 100, 20, 20).unwrap();
        let border = Region::new(5, 5, 100, 200).unwrap();
        let white_box = Region::new(5, 60, 100, 100).unwrap();

        let profile = build_profile(mark, border, white_box);
        assert_eq!(profile.get(Direction::Left), 15);
        assert_eq!(profile.get(Direction::Right), 85);
        assert_eq!(profile.get(Direction::Up), 105);
        assert_eq!(profile.get(Direction::Down), 50);
    }
}
