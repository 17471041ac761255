pub mod pairing;
pub mod rooms;
pub mod trtc;
