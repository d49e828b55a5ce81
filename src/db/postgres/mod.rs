mod rooms;

pub use rooms::PostgresRoomRepo;
