//! Map coordinates and tile snapshots.

use strum::{Display, EnumIter, EnumString};

/// Tile coordinate on the world map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance `|x1 - x2| + |y1 - y2|`.
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// What occupies a tile.
///
/// Server content is decoded into this closed set once, at the transport
/// boundary. Content types the agent does not know about become `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ContentKind {
    Monster,
    Resource,
    Workshop,
    Bank,
    TasksMaster,
    GrandExchange,
    #[default]
    None,
}

/// One map cell as last seen by the world refresh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapTile {
    pub position: Position,
    pub kind: ContentKind,
    /// Content code (`ash_tree`, `chicken`, `bank`, ...); empty when `kind` is `None`.
    pub code: String,
}

impl MapTile {
    pub fn new(x: i32, y: i32, kind: ContentKind, code: impl Into<String>) -> Self {
        Self {
            position: Position::new(x, y),
            kind,
            code: code.into(),
        }
    }

    pub fn empty(x: i32, y: i32) -> Self {
        Self::new(x, y, ContentKind::None, "")
    }

    pub const fn x(&self) -> i32 {
        self.position.x
    }

    pub const fn y(&self) -> i32 {
        self.position.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = Position::new(1, 1);
        let b = Position::new(3, -1);
        assert_eq!(a.manhattan_distance(b), 4);
        assert_eq!(b.manhattan_distance(a), 4);
        assert_eq!(a.manhattan_distance(a), 0);
    }

    #[test]
    fn content_kind_uses_server_names() {
        assert_eq!(ContentKind::TasksMaster.to_string(), "tasks_master");
        assert_eq!("grand_exchange".parse::<ContentKind>().ok(), Some(ContentKind::GrandExchange));
    }
}
