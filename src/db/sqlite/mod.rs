mod rooms;

pub use rooms::SqliteRoomRepo;
