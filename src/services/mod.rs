mod rooms;

pub use rooms::{RoomError, RoomService};
